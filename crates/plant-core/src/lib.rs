pub mod error;
pub mod growing;
pub mod joint;
pub mod leaf;
pub mod meshing;
pub mod parameter_tree;
pub mod path;
pub mod plant;
pub mod spline;
pub mod stem;
pub mod utils;
pub mod wind;

pub use error::{Error, Result};
pub use growing::{Generator, GeneratorConfig, Light};
pub use joint::Joint;
pub use leaf::Leaf;
pub use meshing::{Geometry, LeafShape, Mesh, MeshBuilder, MeshConfig, Point, Segment, SegmentKind, PRIMITIVE_RESTART};
pub use parameter_tree::{LeafData, NodeId, ParameterNode, ParameterTree, StemData};
pub use path::{Intermediate, Path};
pub use plant::{Material, Plant, PlantConfig};
pub use spline::{Spline, SplineIndex};
pub use stem::{GeneratorState, Stem, StemFeature, StemId};
pub use wind::Wind;

pub trait TreePipelinePhase: Sized {
    type Previous;
    type Config;
    type Builder;
    fn generate_from(prev: Self::Previous, config: &Self::Config, builder: &mut Self::Builder) -> Result<Self>;
}

/// Chain pipeline phases: `Seed.grow::<Plant>(..)?.grow::<PlantMesh>(..)`.
pub trait Grow: Sized {
    fn grow<Next>(self, config: &Next::Config, builder: &mut Next::Builder) -> Result<Next>
    where
        Next: TreePipelinePhase<Previous = Self>,
    {
        Next::generate_from(self, config, builder)
    }
}

pub struct Seed;

impl Grow for Seed {}
impl Grow for Plant {}

impl TreePipelinePhase for Plant {
    type Previous = Seed;
    type Config = PlantConfig;
    type Builder = Generator;
    fn generate_from(_: Self::Previous, config: &Self::Config, generator: &mut Self::Builder) -> Result<Self> {
        let mut plant = Plant::with_trunk(config)?;
        generator.grow(&mut plant, config.cycles, config.nodes)?;
        log::debug!("grew {} stems", plant.stem_count());
        Ok(plant)
    }
}

/// A plant together with the mesh built from it.
#[derive(Clone, Debug)]
pub struct PlantMesh {
    pub plant: Plant,
    pub mesh: Mesh,
}

impl TreePipelinePhase for PlantMesh {
    type Previous = Plant;
    type Config = MeshConfig;
    type Builder = MeshBuilder;
    fn generate_from(plant: Self::Previous, config: &Self::Config, builder: &mut Self::Builder) -> Result<Self> {
        builder.add_plant(&plant, config);
        let mesh = builder.finish();
        Ok(PlantMesh { plant, mesh })
    }
}
