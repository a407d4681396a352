use serde::{Deserialize, Serialize};
use std::path::Path;

use plant_core::{GeneratorConfig, MeshConfig, ParameterTree, PlantConfig, StemData};

use crate::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthSection {
    #[serde(flatten)]
    pub generator: GeneratorConfig,
    pub cycles: usize,
    pub nodes: usize,
}

impl Default for GrowthSection {
    fn default() -> Self {
        let plant = PlantConfig::default();
        Self {
            generator: GeneratorConfig::default(),
            cycles: plant.cycles,
            nodes: plant.nodes,
        }
    }
}

/// Shape of the initial trunk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootSection {
    pub radius: f32,
    pub min_radius: f32,
    pub length: f32,
    pub degree: u32,
    pub resolution: usize,
    pub section_divisions: usize,
}

impl Default for RootSection {
    fn default() -> Self {
        let plant = PlantConfig::default();
        Self {
            radius: plant.radius,
            min_radius: plant.min_radius,
            length: plant.length,
            degree: plant.degree,
            resolution: plant.resolution,
            section_divisions: plant.section_divisions,
        }
    }
}

/// One node of the parameter tree. `name` is the dotted address of the
/// node, `""` for the root.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub data: StemData,
}

/// Everything needed to grow and mesh one plant species.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesConfig {
    pub generator: GrowthSection,
    pub root: RootSection,
    pub mesh: MeshConfig,
    pub parameters: Vec<ParameterEntry>,
}

impl SpeciesConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = toml::from_str(&content)?;
        log::debug!("loaded species from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parameter tree with one node per entry, siblings kept in file order.
    /// Parents must be listed before their children.
    pub fn parameter_tree(&self) -> Result<ParameterTree, ConfigError> {
        let mut tree = ParameterTree::new();
        for entry in &self.parameters {
            if !entry.name.is_empty() {
                let (parent, label) = entry.name.rsplit_once('.').unwrap_or(("", entry.name.as_str()));
                let last_sibling = tree
                    .get(parent)
                    .and_then(|p| tree.children(p).last())
                    .and_then(|c| tree.node(c))
                    .map(|n| match parent {
                        "" => n.name().to_string(),
                        _ => format!("{parent}.{}", n.name()),
                    });
                match last_sibling {
                    Some(sibling) => tree.add_sibling(&sibling, label)?,
                    None => tree.add_child(parent, label)?,
                };
            }
            tree.set_data(&entry.name, entry.data.clone())?;
        }
        Ok(tree)
    }

    pub fn plant_config(&self) -> Result<PlantConfig, ConfigError> {
        let root = &self.root;
        Ok(PlantConfig {
            radius: root.radius,
            min_radius: root.min_radius,
            length: root.length,
            degree: root.degree,
            resolution: root.resolution,
            section_divisions: root.section_divisions,
            parameters: self.parameter_tree()?,
            cycles: self.generator.cycles,
            nodes: self.generator.nodes,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_from_empty_file() {
        let config: SpeciesConfig = toml::from_str("").unwrap();
        assert_eq!(config, SpeciesConfig::default());
        let plant = config.plant_config().unwrap();
        assert_eq!(plant, PlantConfig::default());
    }

    #[test]
    fn parameter_entries() {
        let config: SpeciesConfig = toml::from_str(
            r#"
            [generator]
            ray_count = 4
            cycles = 2

            [[parameters]]
            name = ""
            density = 2.0
            seed = 7

            [[parameters]]
            name = "branches"
            length = 0.3

            [[parameters]]
            name = "roots"

            [[parameters]]
            name = "branches.twigs"
            fork = 0.5

            [parameters.leaf]
            density = 4.0
            "#,
        )
        .unwrap();
        assert_eq!(config.generator.generator.ray_count, 4);
        assert_eq!(config.generator.generator.ray_levels, 2);
        assert_eq!(config.generator.cycles, 2);

        let tree = config.parameter_tree().unwrap();
        assert_eq!(tree.names(), vec!["branches", "branches.twigs", "roots"]);
        let root = tree.data("").unwrap();
        assert_eq!((root.density, root.seed), (2., 7));
        assert_eq!(tree.data("branches").unwrap().length, 0.3);
        let twigs = tree.data("branches.twigs").unwrap();
        assert_eq!(twigs.fork, 0.5);
        assert_eq!(twigs.leaf.density, 4.);
    }

    #[test]
    fn orphan_entry() {
        let config = SpeciesConfig {
            parameters: vec![ParameterEntry {
                name: "missing.twigs".to_string(),
                data: StemData::default(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.parameter_tree(),
            Err(ConfigError::Core(plant_core::Error::UnknownParameter(_)))
        ));
    }
}
