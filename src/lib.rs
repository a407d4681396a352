use thiserror::Error;

use plant_core::{Generator, Grow, MeshBuilder, Plant, PlantMesh, Seed};

pub mod config;

pub use config::{GrowthSection, ParameterEntry, RootSection, SpeciesConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read species file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid species file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Core(#[from] plant_core::Error),
}

/// Grow a plant from a species description and build its mesh.
pub fn generate(species: &SpeciesConfig) -> Result<PlantMesh, ConfigError> {
    let plant_config = species.plant_config()?;
    let mut generator = Generator::new(species.generator.generator);
    let result = Seed
        .grow::<Plant>(&plant_config, &mut generator)?
        .grow::<PlantMesh>(&species.mesh, &mut MeshBuilder::new())?;
    log::info!(
        "{} stems, {} leaves, {} points, {} triangles",
        result.plant.stem_count(),
        result.plant.stems().map(|(_, s)| s.leaf_count()).sum::<usize>(),
        result.mesh.points.len(),
        result.mesh.triangle_count()
    );
    Ok(result)
}
