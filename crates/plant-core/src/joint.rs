use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Skeleton marker bound to an evaluated point of a stem path.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    id: u32,
    parent_id: u32,
    path_index: usize,
    location: Vec3,
}

impl Joint {
    pub fn new(id: u32, parent_id: u32, path_index: usize) -> Self {
        Self {
            id,
            parent_id,
            path_index,
            location: Vec3::ZERO,
        }
    }

    /// Refresh the cached location after the owning path changed.
    pub fn update_location(&mut self, location: Vec3) {
        self.location = location;
    }

    pub fn id(&self) -> u32 {
        self.id
    }
    pub fn parent_id(&self) -> u32 {
        self.parent_id
    }
    pub fn path_index(&self) -> usize {
        self.path_index
    }
    /// Location relative to the owning stem.
    pub fn location(&self) -> Vec3 {
        self.location
    }
}
