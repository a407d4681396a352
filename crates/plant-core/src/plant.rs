use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::joint::Joint;
use crate::meshing::Geometry;
use crate::parameter_tree::ParameterTree;
use crate::path::Path;
use crate::stem::{Stem, StemId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub color: [f32; 4],
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "bark".to_string(),
            color: [0.4, 0.3, 0.15, 1.0],
        }
    }
}

/// Initial trunk and growth rules of a plant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub radius: f32,
    pub min_radius: f32,
    pub length: f32,
    pub degree: u32,
    pub resolution: usize,
    pub section_divisions: usize,
    pub parameters: ParameterTree,
    pub cycles: usize,
    pub nodes: usize,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            radius: 0.2,
            min_radius: 0.01,
            length: 1.,
            degree: 3,
            resolution: 4,
            section_divisions: 8,
            parameters: ParameterTree::new(),
            cycles: 4,
            nodes: 3,
        }
    }
}

/// Arena owning every stem of one plant, plus the materials and leaf
/// geometry variants the stems refer to by index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Plant {
    stems: Vec<Option<Stem>>,
    free: Vec<usize>,
    root: Option<StemId>,
    materials: Vec<Material>,
    leaf_meshes: Vec<Geometry>,
}

impl Plant {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant with a straight vertical trunk described by `config`.
    pub fn with_trunk(config: &PlantConfig) -> Result<Self> {
        let mut plant = Self::new();
        let root = plant.create_root();
        let mut path = Path::straight(config.length * Vec3::Y, config.degree);
        path.set_resolution(config.resolution);
        path.set_max_radius(config.radius)?;
        path.set_min_radius(config.min_radius.min(config.radius))?;

        let stem = plant.require_mut(root)?;
        stem.set_section_divisions(config.section_divisions);
        stem.set_parameter_tree(config.parameters.clone());
        plant.set_path(root, path)?;
        Ok(plant)
    }

    /// Drop every stem and start over with a fresh root.
    pub fn create_root(&mut self) -> StemId {
        self.stems.clear();
        self.free.clear();
        self.stems.push(Some(Stem::default()));
        let root = StemId(0);
        self.root = Some(root);
        root
    }

    pub fn root(&self) -> Option<StemId> {
        self.root
    }

    pub fn stem(&self, id: StemId) -> Option<&Stem> {
        self.stems.get(id.0).and_then(|s| s.as_ref())
    }

    pub fn stem_mut(&mut self, id: StemId) -> Option<&mut Stem> {
        self.stems.get_mut(id.0).and_then(|s| s.as_mut())
    }

    pub(crate) fn require(&self, id: StemId) -> Result<&Stem> {
        self.stem(id).ok_or(Error::UnknownStem(id))
    }

    pub(crate) fn require_mut(&mut self, id: StemId) -> Result<&mut Stem> {
        self.stem_mut(id).ok_or(Error::UnknownStem(id))
    }

    pub fn stem_count(&self) -> usize {
        self.stems.iter().filter(|s| s.is_some()).count()
    }

    /// Live stems in handle order.
    pub fn stems(&self) -> impl Iterator<Item = (StemId, &Stem)> {
        self.stems
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (StemId(i), s)))
    }

    pub fn children(&self, id: StemId) -> impl Iterator<Item = StemId> + '_ {
        let first = self.stem(id).and_then(|s| s.child);
        std::iter::successors(first, |&c| self.stem(c).and_then(|s| s.next_sibling))
    }

    /// `id` followed by its whole subtree, depth first.
    pub fn descendants(&self, id: StemId) -> Vec<StemId> {
        let mut result = Vec::new();
        if self.stem(id).is_none() {
            return result;
        }
        let mut stack = vec![id];
        while let Some(s) = stack.pop() {
            result.push(s);
            let mut children: Vec<StemId> = self.children(s).collect();
            children.reverse();
            stack.extend(children);
        }
        result
    }

    /// Every stem reachable from the root, depth first.
    pub fn depth_first(&self) -> Vec<StemId> {
        self.root.map(|r| self.descendants(r)).unwrap_or_default()
    }

    fn alloc(&mut self, stem: Stem) -> StemId {
        match self.free.pop() {
            Some(i) => {
                self.stems[i] = Some(stem);
                StemId(i)
            }
            None => {
                self.stems.push(Some(stem));
                StemId(self.stems.len() - 1)
            }
        }
    }

    /// Attach a new stem as the first child of `parent`, at distance 0.
    pub fn add_stem(&mut self, parent: StemId) -> Result<StemId> {
        let parent_stem = self.require(parent)?;
        let stem = Stem {
            parent: Some(parent),
            next_sibling: parent_stem.child,
            depth: parent_stem.depth + 1,
            ..Default::default()
        };
        let id = self.alloc(stem);
        if let Some(next) = self.stems[id.0].as_ref().and_then(|s| s.next_sibling) {
            self.require_mut(next)?.prev_sibling = Some(id);
        }
        self.require_mut(parent)?.child = Some(id);
        self.set_distance(id, 0.)?;
        Ok(id)
    }

    /// Detach `id` from the hierarchy and free its subtree. Removing the root
    /// empties the plant.
    pub fn remove_stem(&mut self, id: StemId) -> Result<()> {
        let stem = self.require(id)?;
        let (parent, prev, next) = (stem.parent, stem.prev_sibling, stem.next_sibling);
        if Some(id) == self.root {
            self.stems.clear();
            self.free.clear();
            self.root = None;
            return Ok(());
        }

        match prev {
            Some(prev) => self.require_mut(prev)?.next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.require_mut(parent)?.child = next;
                }
            }
        }
        if let Some(next) = next {
            self.require_mut(next)?.prev_sibling = prev;
        }

        for d in self.descendants(id) {
            self.stems[d.0] = None;
            self.free.push(d.0);
        }
        Ok(())
    }

    fn location_on_parent(&self, id: StemId) -> Option<Vec3> {
        let stem = self.stem(id)?;
        let parent = self.stem(stem.parent?)?;
        let base = parent.location?;
        parent
            .path()
            .intermediate(stem.distance)
            .point()
            .map(|p| base + p)
    }

    /// Move a stem along its parent path. Descendants follow.
    pub fn set_distance(&mut self, id: StemId, distance: f32) -> Result<()> {
        let stem = self.require_mut(id)?;
        stem.distance = distance;
        if stem.parent.is_some() {
            let location = self.location_on_parent(id);
            self.require_mut(id)?.location = location;
            self.update_positions(id)?;
        }
        Ok(())
    }

    /// Replace the path of a stem, regenerate it, and refresh the
    /// positions of every descendant.
    pub fn set_path(&mut self, id: StemId, mut path: Path) -> Result<()> {
        path.generate(path.is_linear_start());
        self.require_mut(id)?.replace_path(path);
        self.update_positions(id)
    }

    /// Divisions of the collar, the straight first curve of the path.
    /// Zero turns the collar off. Descendants follow the regenerated path.
    pub fn set_collar_divisions(&mut self, id: StemId, divisions: usize) -> Result<()> {
        self.require_mut(id)?.set_collar_divisions(divisions);
        self.update_positions(id)
    }

    /// Recompute the location of every stem below `id` from its distance.
    pub fn update_positions(&mut self, id: StemId) -> Result<()> {
        self.require(id)?;
        for d in self.descendants(id).into_iter().skip(1) {
            let location = self.location_on_parent(d);
            if location.is_none() {
                log::warn!("stem {d:?} lies outside its parent path");
            }
            self.require_mut(d)?.location = location;
        }
        Ok(())
    }

    /// The first two children placed at or past the end of the stem path.
    /// A single such child is not a fork.
    pub fn fork(&self, id: StemId) -> Option<[StemId; 2]> {
        let length = self.stem(id)?.path().length();
        let mut forking = self
            .children(id)
            .filter(|&c| self.stem(c).is_some_and(|s| s.distance >= length));
        match (forking.next(), forking.next()) {
            (Some(a), Some(b)) => Some([a, b]),
            _ => None,
        }
    }

    pub fn is_descendant_of(&self, id: StemId, ancestor: StemId) -> bool {
        let mut current = self.stem(id).and_then(|s| s.parent);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.stem(c).and_then(|s| s.parent);
        }
        false
    }

    pub fn add_joint(&mut self, id: StemId, joint: Joint) -> Result<()> {
        self.require_mut(id)?.add_joint(joint)
    }

    /// Remove the joints of `id` and of its whole subtree.
    pub fn clear_joints(&mut self, id: StemId) -> Result<()> {
        for d in self.descendants(id) {
            self.require_mut(d)?.clear_own_joints();
        }
        Ok(())
    }

    pub fn add_material(&mut self, material: Material) -> u32 {
        self.materials.push(material);
        (self.materials.len() - 1) as u32
    }

    pub fn material(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn add_leaf_mesh(&mut self, geometry: Geometry) -> u32 {
        self.leaf_meshes.push(geometry);
        (self.leaf_meshes.len() - 1) as u32
    }

    pub fn leaf_mesh(&self, index: u32) -> Option<&Geometry> {
        self.leaf_meshes.get(index as usize)
    }

    pub fn leaf_meshes(&self) -> &[Geometry] {
        &self.leaf_meshes
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::spline::Spline;

    fn trunk() -> (Plant, StemId) {
        let mut plant = Plant::new();
        let root = plant.create_root();
        plant
            .set_path(root, Path::straight(Vec3::new(0., 4., 0.), 1))
            .unwrap();
        (plant, root)
    }

    #[test]
    fn depth_and_links() {
        let (mut plant, root) = trunk();
        let a = plant.add_stem(root).unwrap();
        let b = plant.add_stem(root).unwrap();
        let c = plant.add_stem(a).unwrap();

        assert_eq!(plant.stem(a).unwrap().depth(), 1);
        assert_eq!(plant.stem(c).unwrap().depth(), 2);
        assert_eq!(plant.children(root).collect::<Vec<_>>(), vec![b, a]);
        assert_eq!(plant.stem(a).unwrap().prev_sibling(), Some(b));
        assert_eq!(plant.stem(b).unwrap().next_sibling(), Some(a));
        assert_eq!(plant.stem(c).unwrap().parent(), Some(a));
        assert_eq!(plant.depth_first(), vec![root, b, a, c]);
        assert!(plant.is_descendant_of(c, root));
        assert!(!plant.is_descendant_of(root, c));
        assert!(!plant.is_descendant_of(b, a));
    }

    #[test]
    fn remove_subtree() {
        let (mut plant, root) = trunk();
        let a = plant.add_stem(root).unwrap();
        let b = plant.add_stem(root).unwrap();
        let c = plant.add_stem(root).unwrap();
        plant.add_stem(b).unwrap();
        assert_eq!(plant.stem_count(), 5);

        plant.remove_stem(b).unwrap();
        assert_eq!(plant.stem_count(), 3);
        assert_eq!(plant.children(root).collect::<Vec<_>>(), vec![c, a]);
        assert_eq!(plant.stem(a).unwrap().prev_sibling(), Some(c));
        assert!(plant.stem(b).is_none());
        assert_eq!(plant.remove_stem(b), Err(Error::UnknownStem(b)));

        let reused = plant.add_stem(a).unwrap();
        assert!(reused.index() < 5);

        plant.remove_stem(root).unwrap();
        assert_eq!(plant.stem_count(), 0);
        assert_eq!(plant.root(), None);
    }

    #[test]
    fn locations_follow_parent_edits() {
        let (mut plant, root) = trunk();
        let a = plant.add_stem(root).unwrap();
        plant
            .set_path(a, Path::straight(Vec3::new(2., 0., 0.), 1))
            .unwrap();
        let b = plant.add_stem(a).unwrap();
        plant.set_distance(a, 3.).unwrap();
        plant.set_distance(b, 1.).unwrap();
        assert_eq!(plant.stem(a).unwrap().location(), Some(Vec3::new(0., 3., 0.)));
        assert_eq!(plant.stem(b).unwrap().location(), Some(Vec3::new(1., 3., 0.)));

        plant
            .set_path(root, Path::straight(Vec3::new(0., 0., 6.), 1))
            .unwrap();
        assert_eq!(plant.stem(a).unwrap().location(), Some(Vec3::new(0., 0., 3.)));
        assert_eq!(plant.stem(b).unwrap().location(), Some(Vec3::new(1., 0., 3.)));

        plant.set_distance(a, 7.).unwrap();
        assert_eq!(plant.stem(a).unwrap().location(), None);
        assert_eq!(plant.stem(b).unwrap().location(), None);
    }

    #[test]
    fn collar_moves_children() {
        let mut plant = Plant::new();
        let root = plant.create_root();
        let spline = Spline::from_controls(
            2,
            vec![Vec3::ZERO, Vec3::new(0., 2., 0.), Vec3::new(2., 2., 0.)],
        );
        let mut path = Path::new(spline);
        path.set_resolution(8);
        plant.set_path(root, path).unwrap();
        let child = plant.add_stem(root).unwrap();
        plant.set_distance(child, 1.).unwrap();
        let before = plant.stem(child).unwrap().location().unwrap();

        plant.set_collar_divisions(root, 2).unwrap();
        let stem = plant.stem(root).unwrap();
        assert_eq!(stem.collar_divisions(), 2);
        let expected = stem.location().unwrap() + stem.path().intermediate(1.).point().unwrap();
        let actual = plant.stem(child).unwrap().location().unwrap();
        assert!((actual - expected).length() < 1e-5);
        assert!((actual - before).length() > 1e-3);
    }

    #[test]
    fn fork_needs_two_children_past_the_end() {
        let (mut plant, root) = trunk();
        let lateral = plant.add_stem(root).unwrap();
        plant.set_distance(lateral, 1.).unwrap();
        let first = plant.add_stem(root).unwrap();
        plant.set_distance(first, 4.).unwrap();
        assert_eq!(plant.fork(root), None);

        let second = plant.add_stem(root).unwrap();
        plant.set_distance(second, 4.).unwrap();
        assert_eq!(plant.fork(root), Some([second, first]));

        let third = plant.add_stem(root).unwrap();
        plant.set_distance(third, 4.).unwrap();
        assert_eq!(plant.fork(root), Some([third, second]));
    }

    #[test]
    fn clear_joints_recursively() {
        let (mut plant, root) = trunk();
        let a = plant.add_stem(root).unwrap();
        plant
            .set_path(a, Path::straight(Vec3::X, 1))
            .unwrap();
        plant.add_joint(root, Joint::new(0, 0, 1)).unwrap();
        plant.add_joint(a, Joint::new(1, 0, 0)).unwrap();
        assert_eq!(
            plant.stem(root).unwrap().joints()[0].location(),
            Vec3::new(0., 2., 0.)
        );
        plant.clear_joints(root).unwrap();
        assert!(!plant.stem(root).unwrap().has_joints());
        assert!(!plant.stem(a).unwrap().has_joints());
    }

    #[test]
    fn trunk_from_config() {
        let config = PlantConfig {
            radius: 0.3,
            length: 2.,
            section_divisions: 6,
            ..Default::default()
        };
        let plant = Plant::with_trunk(&config).unwrap();
        let root = plant.stem(plant.root().unwrap()).unwrap();
        assert!((root.path().length() - 2.).abs() < 1e-5);
        assert_eq!(root.max_radius(), 0.3);
        assert_eq!(root.section_divisions(), 6);
        assert!(root.parameter_tree().root().is_some());
    }
}
