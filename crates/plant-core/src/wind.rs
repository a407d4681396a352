use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::joint::Joint;
use crate::plant::Plant;
use crate::stem::{Stem, StemId};

/// Wind acting on a plant, and the skeleton it animates.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wind {
    pub direction: Vec3,
    pub speed: f32,
}

impl Default for Wind {
    fn default() -> Self {
        Self {
            direction: Vec3::X,
            speed: 1.,
        }
    }
}

impl Wind {
    pub fn new(direction: Vec3, speed: f32) -> Self {
        Self { direction, speed }
    }

    pub fn velocity(&self) -> Vec3 {
        self.speed * self.direction.normalize_or_zero()
    }

    /// Rebuild the joints of the whole plant and return how many were made.
    ///
    /// Each stem gets a joint on every boundary between two curves of its
    /// spline, ends included. Ids follow a depth first walk starting at 0.
    /// A joint hangs from the previous joint of its stem; the first joint of
    /// a stem hangs from the joint of the parent stem closest to, and not
    /// past, the stem base. The very first joint is its own parent.
    pub fn generate(&self, plant: &mut Plant) -> Result<usize> {
        let Some(root) = plant.root() else {
            return Ok(0);
        };
        plant.clear_joints(root)?;

        let mut next_id = 0u32;
        for id in plant.depth_first() {
            let stem = plant.require(id)?;
            let indices = Self::joint_indices(stem);
            if indices.is_empty() {
                continue;
            }
            let mut parent_id = match stem.parent() {
                Some(parent) => Self::anchor(plant, parent, stem.distance()).unwrap_or(next_id),
                None => next_id,
            };
            for index in indices {
                plant.add_joint(id, Joint::new(next_id, parent_id, index))?;
                parent_id = next_id;
                next_id += 1;
            }
        }
        log::debug!("bound {next_id} joints");
        Ok(next_id as usize)
    }

    fn joint_indices(stem: &Stem) -> Vec<usize> {
        let path = stem.path();
        let curves = path.spline().curve_count();
        if path.len() < 2 || curves == 0 {
            return Vec::new();
        }
        let degree = path.spline().degree() as usize;
        let mut indices: Vec<usize> = (0..=curves)
            .map(|c| path.to_path_index(c * degree))
            .collect();
        indices.dedup();
        indices
    }

    fn anchor(plant: &Plant, parent: StemId, distance: f32) -> Option<u32> {
        let stem = plant.stem(parent)?;
        let path = stem.path();
        stem.joints()
            .iter()
            .filter(|j| path.distance_to(j.path_index()) <= distance)
            .last()
            .or(stem.joints().first())
            .map(|j| j.id())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::path::Path;

    #[test]
    fn joints_per_curve_boundary() {
        let mut plant = Plant::new();
        let root = plant.create_root();
        let mut trunk = Path::straight(Vec3::new(0., 2., 0.), 1);
        trunk.extend_to(Vec3::new(0., 4., 0.));
        plant.set_path(root, trunk).unwrap();
        let branch = plant.add_stem(root).unwrap();
        plant
            .set_path(branch, Path::straight(Vec3::X, 3))
            .unwrap();
        plant.set_distance(branch, 3.).unwrap();

        let count = Wind::default().generate(&mut plant).unwrap();
        assert_eq!(count, 5);

        let joints = plant.stem(root).unwrap().joints();
        let summary: Vec<_> = joints
            .iter()
            .map(|j| (j.id(), j.parent_id(), j.path_index()))
            .collect();
        assert_eq!(summary, vec![(0, 0, 0), (1, 0, 2), (2, 1, 4)]);
        assert_eq!(joints[2].location(), Vec3::new(0., 4., 0.));

        let joints = plant.stem(branch).unwrap().joints();
        assert_eq!(joints[0].id(), 3);
        assert_eq!(joints[0].parent_id(), 1);
        assert_eq!(joints[1].parent_id(), 3);

        // regenerating replaces the old skeleton
        assert_eq!(Wind::default().generate(&mut plant).unwrap(), 5);
        assert_eq!(plant.stem(root).unwrap().joints().len(), 3);
    }

    #[test]
    fn empty_plant() {
        assert_eq!(Wind::default().generate(&mut Plant::new()).unwrap(), 0);
        let wind = Wind::new(Vec3::new(0., 0., 2.), 3.);
        assert_eq!(wind.velocity(), Vec3::new(0., 0., 3.));
    }
}
