use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::plant::Plant;
use crate::stem::StemId;

pub mod generation;
pub mod light;

pub use light::{BoundingBox, Light};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// length added to a fully lit stem per node
    pub primary_growth_rate: f32,
    /// radius added to a fully lit stem per node
    pub secondary_growth_rate: f32,
    pub min_radius: f32,
    /// rays per side of the grid cast along each light direction
    pub ray_count: u32,
    pub ray_levels: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            primary_growth_rate: 0.4,
            secondary_growth_rate: 0.002,
            min_radius: 0.01,
            ray_count: 8,
            ray_levels: 2,
        }
    }
}

/// Light driven growth.
///
/// Every cycle measures the light reaching each stem, then grows `nodes`
/// new path curves on the lit stems and lets their parameter trees decide
/// which children and leaves appear on the new wood.
#[derive(Clone, Debug, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: GeneratorConfig) {
        self.config = config;
    }

    pub fn light(&self, plant: &Plant) -> BTreeMap<StemId, Light> {
        light::cast_rays(plant, self.config.ray_count, self.config.ray_levels)
    }

    pub fn grow(&self, plant: &mut Plant, cycles: usize, nodes: usize) -> Result<()> {
        for cycle in 0..cycles {
            let lights = self.light(plant);
            let max_rays = lights.values().map(|l| l.rays).max().unwrap_or(0);
            log::debug!(
                "cycle {cycle}: {} lit stems out of {}, {max_rays} rays at most",
                lights.len(),
                plant.stem_count()
            );
            if max_rays == 0 {
                continue;
            }

            for (&id, light) in &lights {
                if let Some(stem) = plant.stem_mut(id) {
                    stem.state_mut().concentration = light.rays as f32 / max_rays as f32;
                }
            }
            for _ in 0..nodes {
                for (&id, light) in &lights {
                    self.add_node(plant, id, light, max_rays)?;
                }
            }
        }
        Ok(())
    }

    fn add_node(&self, plant: &mut Plant, id: StemId, light: &Light, max_rays: u32) -> Result<()> {
        if plant.fork(id).is_some() {
            return Ok(());
        }
        let Some(stem) = plant.stem(id) else {
            return Ok(());
        };
        if stem.is_custom() || stem.location().is_none() || stem.path().len() < 2 {
            return Ok(());
        }

        let ratio = light.rays as f32 / max_rays as f32;
        let step = self.config.primary_growth_rate * ratio;
        if step <= 0. {
            return Ok(());
        }
        let mut path = stem.path().clone();
        let start = path.length();
        let tangent = path.direction(path.len() - 1);
        let direction = (tangent + light.direction)
            .try_normalize()
            .unwrap_or(Vec3::Y);
        let tip = path.points()[path.len() - 1];
        path.extend_to(tip + step * direction);

        let max_radius = path.max_radius() + self.config.secondary_growth_rate * ratio;
        path.set_max_radius(max_radius)?;
        let min_radius = path.min_radius().max(self.config.min_radius).min(max_radius);
        path.set_min_radius(min_radius)?;
        let end = path.length();

        plant.set_path(id, path)?;
        generation::spawn(plant, id, start, end, &self.config)?;
        if let Some(stem) = plant.stem_mut(id) {
            stem.state_mut().node += 1;
        }
        Ok(())
    }
}
