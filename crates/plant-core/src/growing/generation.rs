use glam::{Quat, Vec3};
use rand::rngs::StdRng;
use rand::{prelude::Distribution, Rng, SeedableRng};
use std::f32::consts::{FRAC_PI_4, TAU};

use super::GeneratorConfig;
use crate::error::Result;
use crate::leaf::Leaf;
use crate::parameter_tree::{LeafData, ParameterTree, StemData};
use crate::path::Path;
use crate::plant::Plant;
use crate::stem::StemId;

/// Random source of one growth step. Depends only on the parameter seed,
/// the stem handle and the node counter of the stem.
pub fn node_rng(seed: u32, stem: StemId, node: u32) -> StdRng {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&seed.to_le_bytes());
    bytes[4..12].copy_from_slice(&(stem.index() as u64).to_le_bytes());
    bytes[12..16].copy_from_slice(&node.to_le_bytes());
    StdRng::from_seed(bytes)
}

fn sample_between(rng: &mut (impl Rng + ?Sized), a: f32, b: f32) -> f32 {
    if a < b {
        rng.gen_range(a..b)
    } else {
        a
    }
}

/// Number of events for an expected value, rounding the fractional part up
/// with the matching probability.
fn stochastic_round(rng: &mut impl Rng, expected: f32) -> usize {
    if expected <= 0. {
        return 0;
    }
    let whole = expected.floor();
    let extra = rng.gen_range(0f32..1f32) < expected - whole;
    whole as usize + extra as usize
}

/// Orientation of a lateral branch relative to the frame of its parent,
/// where +Y is the parent tangent.
#[derive(Debug)]
struct LateralBranch {
    angle_variation: f32,
    noise: f32,
}

impl Distribution<Vec3> for LateralBranch {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let spread = self.angle_variation.abs() * FRAC_PI_4;
        let a: f32 = FRAC_PI_4 + rng.gen_range(-1f32..=1f32) * spread;
        let c: f32 = rng.gen_range(0f32..TAU);
        let rot = Quat::from_rotation_y(c) * Quat::from_rotation_x(a) * Quat::from_rotation_y(-c);
        let jitter = Vec3::new(
            rng.gen_range(-1f32..=1f32),
            rng.gen_range(-1f32..=1f32),
            rng.gen_range(-1f32..=1f32),
        );
        let direction = rot * Vec3::Y;
        (direction + self.noise * jitter)
            .try_normalize()
            .unwrap_or(direction)
    }
}

/// The two directions of a fork, `angle` apart, in the frame of the parent.
#[derive(Debug)]
struct ForkBranches {
    angle: f32,
}

impl Distribution<(Vec3, Vec3)> for ForkBranches {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (Vec3, Vec3) {
        let half = 0.5 * self.angle;
        let c: f32 = rng.gen_range(0f32..TAU);
        let rot1 = Quat::from_rotation_y(c) * Quat::from_rotation_x(half) * Quat::from_rotation_y(-c);
        let rot2 = Quat::from_rotation_y(c) * Quat::from_rotation_x(-half) * Quat::from_rotation_y(-c);
        (rot1 * Vec3::Y, rot2 * Vec3::Y)
    }
}

/// Leaf rotation on top of the default orientation for a given stem
/// direction, spun `azimuth` around the stem.
struct LeafOrientation<'a> {
    data: &'a LeafData,
    stem_direction: Vec3,
    azimuth: f32,
}

impl Distribution<Quat> for LeafOrientation<'_> {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Quat {
        let data = self.data;
        let base = Leaf::default_orientation(self.stem_direction);
        let mut orientation = Quat::from_axis_angle(self.stem_direction, self.azimuth) * base;

        let pitch = sample_between(rng, data.min_up, data.max_up) + data.local_up;
        let yaw = sample_between(rng, data.min_forward, data.max_forward);
        let side = orientation * Vec3::X;
        let normal = orientation * Vec3::Y;
        orientation = Quat::from_axis_angle(normal, yaw) * Quat::from_axis_angle(side, -pitch) * orientation;

        let tilt = (data.global_up - data.vertical_pull).clamp(-1., 1.);
        let blade = orientation * Vec3::Z;
        let target = if tilt >= 0. { Vec3::Y } else { Vec3::NEG_Y };
        if let Some(pulled) = blade.lerp(target, tilt.abs()).try_normalize() {
            orientation = Quat::from_rotation_arc(blade, pulled) * orientation;
        }
        (orientation * base.inverse()).normalize()
    }
}

/// Snapshot given to a child: the subtree of the first child node, or the
/// whole governing tree when there is none.
fn child_parameters(tree: &ParameterTree) -> ParameterTree {
    match tree.root().and_then(|r| tree.children(r).next()) {
        Some(first) => tree.subtree(first),
        None => tree.clone(),
    }
}

fn add_child(
    plant: &mut Plant,
    parent: StemId,
    distance: f32,
    direction: Vec3,
    length: f32,
    radius: f32,
    config: &GeneratorConfig,
) -> Result<StemId> {
    let parent_stem = plant.require(parent)?;
    let mut path = Path::straight(length * direction, parent_stem.path().spline().degree());
    path.set_resolution(parent_stem.path().resolution());
    path.set_max_radius(radius)?;
    path.set_min_radius(config.min_radius.min(radius))?;
    let parameters = child_parameters(parent_stem.parameter_tree());
    let divisions = parent_stem.section_divisions();

    let id = plant.add_stem(parent)?;
    let stem = plant.require_mut(id)?;
    stem.set_parameter_tree(parameters);
    stem.set_section_divisions(divisions);
    plant.set_path(id, path)?;
    plant.set_distance(id, distance)?;
    log::trace!("stem {id:?} spawned on {parent:?} at {distance}");
    Ok(id)
}

/// Children and leaves for the piece of stem `id` grown between the
/// distances `start` and `end`.
pub fn spawn(
    plant: &mut Plant,
    id: StemId,
    start: f32,
    end: f32,
    config: &GeneratorConfig,
) -> Result<()> {
    let stem = plant.require(id)?;
    let Some(data) = stem.parameter_tree().root_data().cloned() else {
        return Ok(());
    };
    let mut rng = node_rng(data.seed, id, stem.state().node);
    let path = stem.path().clone();
    let length = path.length();
    if length <= 0. {
        return Ok(());
    }
    let frame = |d: f32| {
        let tangent = path.intermediate_direction(d).try_normalize().unwrap_or(Vec3::Y);
        Quat::from_rotation_arc(Vec3::Y, tangent)
    };

    if data.fork > 0. && rng.gen_range(0f32..1f32) < data.fork {
        let (d1, d2) = rng.sample(ForkBranches {
            angle: data.fork_angle,
        });
        let tip = frame(length);
        let radius = path.radius_at(path.len().saturating_sub(1));
        for direction in [d1, d2] {
            add_child(plant, id, length, tip * direction, data.length, radius, config)?;
        }
        return Ok(());
    }

    spawn_laterals(plant, id, &data, &path, start, end, &mut rng, config)?;
    spawn_leaves(plant, id, &data.leaf, &path, start, end, &mut rng)
}

fn expected_count(density: f32, curve_value: Option<f32>, span: f32) -> f32 {
    density * curve_value.unwrap_or(1.).max(0.) * span
}

#[allow(clippy::too_many_arguments)]
fn spawn_laterals(
    plant: &mut Plant,
    id: StemId,
    data: &StemData,
    path: &Path,
    start: f32,
    end: f32,
    rng: &mut StdRng,
    config: &GeneratorConfig,
) -> Result<()> {
    let first = start.max(data.distance);
    if data.density <= 0. || first >= end {
        return Ok(());
    }
    let length = path.length();
    let middle = 0.5 * (first + end) / length;
    let expected = expected_count(data.density, data.density_curve.sample_y(middle), end - first);
    let branch = LateralBranch {
        angle_variation: data.angle_variation,
        noise: data.noise,
    };

    for _ in 0..stochastic_round(rng, expected) {
        let distance = sample_between(rng, first, end);
        let local = rng.sample(&branch);
        let radius = path.intermediate_radius(distance / length);
        if radius <= data.radius_threshold {
            continue;
        }
        let tangent = path.intermediate_direction(distance).try_normalize().unwrap_or(Vec3::Y);
        let direction = Quat::from_rotation_arc(Vec3::Y, tangent) * local;
        add_child(plant, id, distance, direction, data.length, data.scale * radius, config)?;
    }
    Ok(())
}

fn spawn_leaves(
    plant: &mut Plant,
    id: StemId,
    data: &LeafData,
    path: &Path,
    start: f32,
    end: f32,
    rng: &mut StdRng,
) -> Result<()> {
    let first = start.max(data.distance);
    if data.density <= 0. || data.leaves_per_node == 0 || first >= end {
        return Ok(());
    }
    let length = path.length();
    let middle = 0.5 * (first + end) / length;
    let expected = expected_count(data.density, data.density_curve.sample_y(middle), end - first);
    let per_node = data.leaves_per_node;

    for _ in 0..stochastic_round(rng, expected) {
        let position = sample_between(rng, first, end);
        let stem_direction = path.intermediate_direction(position).try_normalize().unwrap_or(Vec3::Y);
        let stem = plant.require_mut(id)?;
        let node = (stem.leaf_count() as u32 / per_node) as f32;
        for k in 0..per_node {
            let azimuth = node * data.rotation + k as f32 / per_node as f32 * TAU;
            let rotation = rng.sample(LeafOrientation {
                data,
                stem_direction,
                azimuth,
            });
            stem.add_leaf(Leaf {
                position,
                scale: data.scale,
                rotation,
                ..Default::default()
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn high_seed_bits_change_the_stream() {
        let draw = |seed: u32, stem: usize, node: u32| -> u64 { node_rng(seed, StemId(stem), node).gen() };
        assert_ne!(draw(0, 0, 0), draw(1 << 24, 0, 0));
        assert_ne!(draw(0, 0, 0), draw(1 << 31, 0, 0));
        assert_ne!(draw(1, 0, 0), draw(0, 1, 0));
        assert_ne!(draw(0, 1 << 20, 0), draw(0, 0, 1));
        assert_eq!(draw(u32::MAX, 3, 9), draw(u32::MAX, 3, 9));
    }

    #[test]
    fn rounding_keeps_the_expectation() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(stochastic_round(&mut rng, 0.), 0);
        assert_eq!(stochastic_round(&mut rng, 2.), 2);
        let total: usize = (0..2000).map(|_| stochastic_round(&mut rng, 0.25)).sum();
        assert!((400..600).contains(&total), "{total}");
    }

    #[test]
    fn lateral_angles_stay_off_the_tangent() {
        let mut rng = StdRng::seed_from_u64(1);
        let branch = LateralBranch {
            angle_variation: 0.5,
            noise: 0.,
        };
        for _ in 0..100 {
            let d: Vec3 = rng.sample(&branch);
            let angle = d.angle_between(Vec3::Y);
            assert!(angle > FRAC_PI_4 * 0.5 - 1e-4 && angle < FRAC_PI_4 * 1.5 + 1e-4);
        }
    }

    #[test]
    fn fork_directions_are_split() {
        let mut rng = StdRng::seed_from_u64(9);
        let (a, b) = rng.sample(ForkBranches { angle: 1. });
        assert!((a.angle_between(b) - 1.).abs() < 1e-4);
        assert!((a.angle_between(Vec3::Y) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn unbiased_leaf_keeps_default_orientation() {
        let data = LeafData::default();
        let mut rng = StdRng::seed_from_u64(0);
        let rotation = rng.sample(LeafOrientation {
            data: &data,
            stem_direction: Vec3::Y,
            azimuth: 0.,
        });
        assert!(rotation.angle_between(Quat::IDENTITY) < 1e-3);
    }

    #[test]
    fn seeds_are_reproducible() {
        let a: f32 = node_rng(4, StemId(2), 7).gen();
        let b: f32 = node_rng(4, StemId(2), 7).gen();
        let c: f32 = node_rng(4, StemId(2), 8).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn child_parameters_take_first_child() {
        let mut tree = ParameterTree::new();
        tree.add_child("", "branches").unwrap();
        tree.add_child("branches", "twigs").unwrap();
        let snapshot = child_parameters(&tree);
        assert_eq!(snapshot.names(), vec!["twigs".to_string()]);

        let leafless = ParameterTree::new();
        assert_eq!(child_parameters(&leafless), leafless);
    }
}
