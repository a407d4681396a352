use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A leaf attached to a stem.
///
/// `rotation` is applied on top of the default orientation computed from the
/// stem direction at `position`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    /// distance along the owning stem, negative when unset
    pub position: f32,
    pub scale: Vec3,
    pub rotation: Quat,
    pub material: u32,
    /// index of the leaf geometry variant in the plant
    pub mesh: u32,
}

impl Default for Leaf {
    fn default() -> Self {
        Self {
            position: -1.,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            material: 0,
            mesh: 0,
        }
    }
}

impl Leaf {
    pub fn at(position: f32) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn is_placed(&self) -> bool {
        self.position >= 0.
    }

    /// Rotation that turns the leaf normal (+Y) into the plane containing
    /// the stem direction and hanging away from it.
    pub fn stem_tilt_alignment(stem_direction: Vec3) -> Quat {
        let down = Vec3::NEG_Y;
        let side = down.cross(stem_direction).cross(stem_direction);
        match side.try_normalize() {
            Some(plane_direction) => Quat::from_rotation_arc(Vec3::Y, plane_direction),
            None => Quat::IDENTITY,
        }
    }

    pub fn default_orientation(stem_direction: Vec3) -> Quat {
        let leaf_direction = if (stem_direction - Vec3::Y).length_squared() < 1e-12 {
            Vec3::Z
        } else {
            stem_direction.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::Z)
        };
        Self::stem_tilt_alignment(stem_direction) * Quat::from_rotation_arc(Vec3::Z, leaf_direction)
    }

    pub fn orientation(&self, stem_direction: Vec3) -> Quat {
        self.rotation * Self::default_orientation(stem_direction)
    }

    /// Direction the leaf blade points to (+Z of the leaf geometry).
    pub fn direction(&self, stem_direction: Vec3) -> Vec3 {
        self.orientation(stem_direction) * Vec3::Z
    }
}
