pub mod algorithms;
pub mod geometry;
pub mod mesh_builder;

pub use geometry::{Geometry, Point};
pub use mesh_builder::{LeafShape, Mesh, MeshBuilder, MeshConfig, Segment, SegmentKind, PRIMITIVE_RESTART};
