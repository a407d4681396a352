use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::joint::Joint;
use crate::leaf::Leaf;
use crate::parameter_tree::ParameterTree;
use crate::path::Path;

/// Stable handle of a stem inside a [`crate::Plant`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StemId(pub(crate) usize);

impl StemId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StemFeature {
    Bark = 0,
    Collar = 1,
}

/// Bookkeeping of the growth simulation for one stem.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorState {
    /// light received during the last cycle, relative to the best lit stem
    pub concentration: f32,
    /// number of nodes grown so far
    pub node: u32,
}

/// One branch segment.
///
/// Hierarchy links are handles into the owning plant and are only changed by
/// it: `child` and `next_sibling` own their targets, `parent` and
/// `prev_sibling` are plain back references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stem {
    pub(crate) parent: Option<StemId>,
    pub(crate) child: Option<StemId>,
    pub(crate) prev_sibling: Option<StemId>,
    pub(crate) next_sibling: Option<StemId>,
    pub(crate) depth: usize,
    pub(crate) distance: f32,
    /// `None` when the stem does not sit on its parent path
    pub(crate) location: Option<Vec3>,
    pub(crate) path: Path,
    pub(crate) radius_curve: u32,
    pub(crate) swelling: Vec2,
    pub(crate) material: [u32; 2],
    pub(crate) section_divisions: usize,
    pub(crate) leaves: Vec<Leaf>,
    pub(crate) joints: Vec<Joint>,
    pub(crate) custom: bool,
    pub(crate) parameter_tree: ParameterTree,
    pub(crate) state: GeneratorState,
}

impl Default for Stem {
    fn default() -> Self {
        Self {
            parent: None,
            child: None,
            prev_sibling: None,
            next_sibling: None,
            depth: 0,
            distance: 0.,
            location: Some(Vec3::ZERO),
            path: Path::default(),
            radius_curve: 0,
            swelling: Vec2::new(1.2, 3.),
            material: [0, 0],
            section_divisions: 8,
            leaves: Vec::new(),
            joints: Vec::new(),
            custom: false,
            parameter_tree: ParameterTree::default(),
            state: GeneratorState::default(),
        }
    }
}

impl Stem {
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn parent(&self) -> Option<StemId> {
        self.parent
    }
    pub fn child(&self) -> Option<StemId> {
        self.child
    }
    pub fn next_sibling(&self) -> Option<StemId> {
        self.next_sibling
    }
    pub fn prev_sibling(&self) -> Option<StemId> {
        self.prev_sibling
    }
    /// Distance of the stem base along the parent path.
    pub fn distance(&self) -> f32 {
        self.distance
    }
    pub fn location(&self) -> Option<Vec3> {
        self.location
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn replace_path(&mut self, path: Path) {
        self.path = path;
        self.update_joints();
    }

    pub fn set_section_divisions(&mut self, divisions: usize) {
        self.section_divisions = divisions;
    }
    pub fn section_divisions(&self) -> usize {
        self.section_divisions
    }

    /// Callers must refresh descendant positions afterwards.
    pub(crate) fn set_collar_divisions(&mut self, divisions: usize) {
        self.path.set_initial_divisions(divisions);
        self.path.generate(divisions > 0);
        self.update_joints();
    }
    pub fn collar_divisions(&self) -> usize {
        self.path.initial_divisions()
    }

    pub fn set_material(&mut self, feature: StemFeature, material: u32) {
        self.material[feature as usize] = material;
    }
    pub fn material(&self, feature: StemFeature) -> u32 {
        self.material[feature as usize]
    }

    pub fn set_radius_curve(&mut self, index: u32) {
        self.radius_curve = index;
    }
    pub fn radius_curve(&self) -> u32 {
        self.radius_curve
    }

    pub fn set_min_radius(&mut self, radius: f32) -> Result<()> {
        self.path.set_min_radius(radius)
    }
    pub fn min_radius(&self) -> f32 {
        self.path.min_radius()
    }
    pub fn set_max_radius(&mut self, radius: f32) -> Result<()> {
        self.path.set_max_radius(radius)
    }
    pub fn max_radius(&self) -> f32 {
        self.path.max_radius()
    }

    /// Radius scale at the base and the length (in base radii) over which
    /// the bulge fades out.
    pub fn set_swelling(&mut self, swelling: Vec2) {
        self.swelling = swelling;
    }
    pub fn swelling(&self) -> Vec2 {
        self.swelling
    }

    pub fn set_custom(&mut self, custom: bool) {
        self.custom = custom;
    }
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn set_parameter_tree(&mut self, tree: ParameterTree) {
        self.parameter_tree = tree;
    }
    pub fn parameter_tree(&self) -> &ParameterTree {
        &self.parameter_tree
    }
    pub fn parameter_tree_mut(&mut self) -> &mut ParameterTree {
        &mut self.parameter_tree
    }

    pub fn state(&self) -> &GeneratorState {
        &self.state
    }
    pub fn state_mut(&mut self) -> &mut GeneratorState {
        &mut self.state
    }

    pub fn add_leaf(&mut self, leaf: Leaf) -> usize {
        self.leaves.push(leaf);
        self.leaves.len() - 1
    }

    pub fn insert_leaf(&mut self, leaf: Leaf, index: usize) -> Result<()> {
        if index > self.leaves.len() {
            return Err(Error::LeafIndex {
                index,
                len: self.leaves.len(),
            });
        }
        self.leaves.insert(index, leaf);
        Ok(())
    }

    pub fn leaf(&self, index: usize) -> Result<&Leaf> {
        let len = self.leaves.len();
        self.leaves.get(index).ok_or(Error::LeafIndex { index, len })
    }

    pub fn leaf_mut(&mut self, index: usize) -> Result<&mut Leaf> {
        let len = self.leaves.len();
        self.leaves.get_mut(index).ok_or(Error::LeafIndex { index, len })
    }

    pub fn remove_leaf(&mut self, index: usize) -> Result<Leaf> {
        if index >= self.leaves.len() {
            return Err(Error::LeafIndex {
                index,
                len: self.leaves.len(),
            });
        }
        Ok(self.leaves.remove(index))
    }

    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Bind a joint to the path point it refers to.
    pub fn add_joint(&mut self, mut joint: Joint) -> Result<()> {
        let index = joint.path_index();
        let location = self.path.get(index).ok_or(Error::PathIndex {
            index,
            len: self.path.len(),
        })?;
        joint.update_location(location);
        self.joints.push(joint);
        Ok(())
    }

    pub fn joint(&self, index: usize) -> Result<&Joint> {
        let len = self.joints.len();
        self.joints.get(index).ok_or(Error::JointIndex { index, len })
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn has_joints(&self) -> bool {
        !self.joints.is_empty()
    }

    pub(crate) fn clear_own_joints(&mut self) {
        self.joints.clear();
    }

    fn update_joints(&mut self) {
        for joint in self.joints.iter_mut() {
            if let Some(location) = self.path.get(joint.path_index()) {
                joint.update_location(location);
            }
        }
    }
}
