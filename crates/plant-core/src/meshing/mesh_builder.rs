use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::Range;

use super::algorithms::{mesh_between_contours, ring, ring_frames};
use super::geometry::{Geometry, Point};
use crate::plant::Plant;
use crate::stem::{Stem, StemFeature, StemId};

/// Index separating two disjoint pieces of the index buffer.
pub const PRIMITIVE_RESTART: u32 = u32::MAX;

type Ring = SmallVec<[u32; 16]>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafShape {
    #[default]
    Plane,
    PerpendicularPlanes,
}

impl LeafShape {
    pub fn geometry(self) -> Geometry {
        match self {
            LeafShape::Plane => Geometry::plane(),
            LeafShape::PerpendicularPlanes => Geometry::perpendicular_planes(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    /// shape used for leaves whose mesh index has no variant in the plant
    pub leaf_shape: LeafShape,
    pub leaves: bool,
    pub collars: bool,
    /// lower bound on the ring resolution
    pub min_section_divisions: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            leaf_shape: LeafShape::Plane,
            leaves: true,
            collars: true,
            min_section_divisions: 3,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    Stem,
    Collar,
    Leaf,
}

/// One logical piece of the mesh, drawable on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub stem: StemId,
    pub material: u32,
    pub points: Range<u32>,
    pub indices: Range<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub points: Vec<Point>,
    pub indices: Vec<u32>,
    pub segments: Vec<Segment>,
}

impl Mesh {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.segments.iter().map(|s| s.indices.len() / 3).sum()
    }

    pub fn triangles<'a>(&'a self, segment: &Segment) -> impl Iterator<Item = [u32; 3]> + 'a {
        self.indices[segment.indices.clone()]
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
    }

    pub fn segments_of(&self, kind: SegmentKind) -> impl Iterator<Item = &Segment> {
        self.segments.iter().filter(move |s| s.kind == kind)
    }
}

struct OpenSegment {
    kind: SegmentKind,
    stem: StemId,
    material: u32,
    points: u32,
    indices: usize,
}

/// Accumulates the mesh of a plant piece by piece.
#[derive(Default)]
pub struct MeshBuilder {
    mesh: Mesh,
    open: Option<OpenSegment>,
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(plant: &Plant, config: &MeshConfig) -> Mesh {
        let mut builder = Self::new();
        builder.add_plant(plant, config);
        builder.finish()
    }

    /// Take the mesh built so far, leaving the builder empty.
    pub fn finish(&mut self) -> Mesh {
        self.end();
        if self.mesh.indices.last() == Some(&PRIMITIVE_RESTART) {
            self.mesh.indices.pop();
        }
        std::mem::take(&mut self.mesh)
    }

    fn begin(&mut self, kind: SegmentKind, stem: StemId, material: u32) {
        self.end();
        self.open = Some(OpenSegment {
            kind,
            stem,
            material,
            points: self.mesh.points.len() as u32,
            indices: self.mesh.indices.len(),
        });
    }

    /// Close the open segment. A segment without triangles is dropped along
    /// with its points.
    fn end(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };
        if self.mesh.indices.len() == open.indices {
            self.mesh.points.truncate(open.points as usize);
            return;
        }
        self.mesh.segments.push(Segment {
            kind: open.kind,
            stem: open.stem,
            material: open.material,
            points: open.points..self.mesh.points.len() as u32,
            indices: open.indices..self.mesh.indices.len(),
        });
        self.mesh.indices.push(PRIMITIVE_RESTART);
    }

    fn register_points(&mut self, points: impl IntoIterator<Item = Point>) -> Ring {
        let mut result = Ring::new();
        for p in points {
            result.push(self.mesh.points.len() as u32);
            self.mesh.points.push(p);
        }
        result
    }

    fn register_triangles(&mut self, triangles: &[u32]) {
        self.mesh.indices.extend_from_slice(triangles);
    }

    fn connect(&mut self, below: &[u32], above: &[u32]) {
        let points = &self.mesh.points;
        let triangles = mesh_between_contours(|i| points[i as usize].position, below, above, false);
        self.register_triangles(&triangles);
    }

    pub fn add_plant(&mut self, plant: &Plant, config: &MeshConfig) {
        for id in plant.depth_first() {
            let Some(stem) = plant.stem(id) else {
                continue;
            };
            let Some(location) = stem.location() else {
                log::warn!("skipping mesh of misplaced stem {id:?}");
                continue;
            };
            if stem.path().len() < 2 || stem.path().length() <= 0. {
                log::debug!("stem {id:?} has a degenerate path");
                continue;
            }
            let swells = stem.parent().is_some_and(|p| {
                plant.fork(p).map_or(true, |fork| !fork.contains(&id))
            });
            self.add_stem(id, stem, location, swells, config);

            if config.collars {
                if let Some(fork) = plant.fork(id) {
                    for child in fork {
                        if let Some(c) = plant.stem(child) {
                            self.add_collar(id, stem, location, c, config);
                        }
                    }
                }
            }
            if config.leaves {
                self.add_leaves(plant, id, stem, location, config);
            }
        }
        self.end();
    }

    fn divisions(stem: &Stem, config: &MeshConfig) -> usize {
        usize::max(stem.section_divisions(), config.min_section_divisions.max(1))
    }

    fn ring_radius(stem: &Stem, index: usize, swells: bool) -> f32 {
        let path = stem.path();
        let radius = path.radius_at(index);
        let swelling = stem.swelling();
        let fade = swelling.y * path.max_radius();
        if !swells || fade <= 0. {
            return radius;
        }
        let s = path.distance_to(index) / fade;
        if s >= 1. {
            radius
        } else {
            radius * (swelling.x + (1. - swelling.x) * s)
        }
    }

    fn stem_rings(stem: &Stem, location: Vec3, swells: bool, config: &MeshConfig) -> Vec<Vec<Point>> {
        let path = stem.path();
        let divisions = Self::divisions(stem, config);
        let frames = ring_frames((0..path.len()).map(|i| path.average_direction(i)));
        frames
            .into_iter()
            .enumerate()
            .filter_map(|(i, frame)| {
                let center = location + path.get(i)?;
                let radius = Self::ring_radius(stem, i, swells);
                Some(ring(center, frame, radius, divisions, path.distance_to(i)))
            })
            .collect()
    }

    fn add_stem(&mut self, id: StemId, stem: &Stem, location: Vec3, swells: bool, config: &MeshConfig) {
        self.begin(SegmentKind::Stem, id, stem.material(StemFeature::Bark));
        let mut previous: Option<Ring> = None;
        for points in Self::stem_rings(stem, location, swells, config) {
            let current = self.register_points(points);
            if let Some(below) = previous {
                self.connect(&below, &current);
            }
            previous = Some(current);
        }
        self.end();
    }

    fn add_collar(&mut self, id: StemId, stem: &Stem, location: Vec3, child: &Stem, config: &MeshConfig) {
        let Some(child_location) = child.location() else {
            return;
        };
        if child.path().len() < 2 {
            return;
        }
        let tip = Self::stem_rings(stem, location, false, config).pop();
        let base = Self::stem_rings(child, child_location, false, config).into_iter().next();
        let (Some(tip), Some(base)) = (tip, base) else {
            return;
        };
        self.begin(SegmentKind::Collar, id, stem.material(StemFeature::Collar));
        let below = self.register_points(tip);
        let above = self.register_points(base);
        self.connect(&below, &above);
        self.end();
    }

    fn add_leaves(&mut self, plant: &Plant, id: StemId, stem: &Stem, location: Vec3, config: &MeshConfig) {
        let path = stem.path();
        let fallback = config.leaf_shape.geometry();
        for leaf in stem.leaves().iter().filter(|l| l.is_placed()) {
            let Some(anchor) = path.intermediate(leaf.position).point() else {
                continue;
            };
            let direction = path
                .intermediate_direction(leaf.position)
                .try_normalize()
                .unwrap_or(Vec3::Y);
            let mut geometry = plant.leaf_mesh(leaf.mesh).unwrap_or(&fallback).clone();
            geometry.transform(leaf.orientation(direction), leaf.scale, location + anchor);

            self.begin(SegmentKind::Leaf, id, leaf.material);
            let base = self.mesh.points.len() as u32;
            let count = geometry.points().len() as u32;
            self.register_points(geometry.points().iter().copied());
            let triangles: Vec<u32> = geometry
                .indices()
                .chunks_exact(3)
                .filter(|t| t.iter().all(|&i| i < count))
                .flatten()
                .map(|&i| base + i)
                .collect();
            self.register_triangles(&triangles);
            self.end();
        }
    }
}
