use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spline::Spline;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafData {
    pub density_curve: Spline,
    pub scale: Vec3,
    /// leaf nodes per unit of stem length
    pub density: f32,
    /// distance along the stem before the first leaf node
    pub distance: f32,
    /// rotation around the stem between two consecutive nodes
    pub rotation: f32,
    pub min_up: f32,
    pub max_up: f32,
    pub local_up: f32,
    pub global_up: f32,
    pub min_forward: f32,
    pub max_forward: f32,
    pub vertical_pull: f32,
    pub leaves_per_node: u32,
}

impl Default for LeafData {
    fn default() -> Self {
        Self {
            density_curve: Spline::flat(1.),
            scale: Vec3::ONE,
            density: 0.,
            distance: 0.,
            rotation: std::f32::consts::PI,
            min_up: 0.,
            max_up: 0.,
            local_up: 0.,
            global_up: 0.,
            min_forward: 0.,
            max_forward: 0.,
            vertical_pull: 0.,
            leaves_per_node: 1,
        }
    }
}

/// Growth rules for the children of a stem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemData {
    pub density_curve: Spline,
    /// child stems per unit of stem length
    pub density: f32,
    /// distance along the stem before the first child
    pub distance: f32,
    /// initial length of a child stem
    pub length: f32,
    pub angle_variation: f32,
    /// no child grows where the stem is thinner than this
    pub radius_threshold: f32,
    /// child radius relative to the stem radius at its base
    pub scale: f32,
    /// probability that a growing tip splits in two
    pub fork: f32,
    pub fork_angle: f32,
    pub noise: f32,
    pub seed: u32,
    pub leaf: LeafData,
}

impl Default for StemData {
    fn default() -> Self {
        Self {
            density_curve: Spline::flat(1.),
            density: 0.,
            distance: 0.,
            length: 0.5,
            angle_variation: 0.5,
            radius_threshold: 0.01,
            scale: 0.6,
            fork: 0.,
            fork_angle: 0.5,
            noise: 0.,
            seed: 0,
            leaf: LeafData::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterNode {
    name: String,
    parent: Option<NodeId>,
    child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    data: StemData,
}

impl ParameterNode {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            child: None,
            prev_sibling: None,
            next_sibling: None,
            data: StemData::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn data(&self) -> &StemData {
        &self.data
    }
    pub fn data_mut(&mut self) -> &mut StemData {
        &mut self.data
    }
    pub fn set_data(&mut self, data: StemData) {
        self.data = data
    }
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
    pub fn child(&self) -> Option<NodeId> {
        self.child
    }
    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }
    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }
}

/// Named tree of growth rules.
///
/// Every node but the root carries a label that is unique among its
/// siblings. A node is addressed by the dotted chain of labels leading to it
/// from the root (`"branches.twigs"`), the root itself by `""`. Handles stay
/// valid until the next `remove`, which compacts the arena.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParameterTree {
    root: Option<NodeId>,
    nodes: Vec<ParameterNode>,
}

impl PartialEq for ParameterTree {
    fn eq(&self, other: &Self) -> bool {
        self.entries() == other.entries()
    }
}

impl ParameterTree {
    /// Tree holding a single root node with default data.
    pub fn new() -> Self {
        let mut tree = Self::default();
        tree.create_root();
        tree
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn root_data(&self) -> Option<&StemData> {
        self.root.and_then(|r| self.node(r)).map(|n| n.data())
    }

    /// Replace the whole tree with a single root node.
    pub fn create_root(&mut self) -> NodeId {
        self.reset();
        self.nodes.push(ParameterNode::new("", None));
        let root = NodeId(0);
        self.root = Some(root);
        root
    }

    pub fn node(&self, id: NodeId) -> Option<&ParameterNode> {
        self.nodes.get(id.0)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ParameterNode> {
        self.nodes.get_mut(id.0)
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.node(id).and_then(|n| n.child);
        std::iter::successors(first, |&c| self.nodes[c.0].next_sibling)
    }

    fn child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id).find(|&c| self.nodes[c.0].name == name)
    }

    /// Resolve a dotted name, segment by segment from the root.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        let root = self.root?;
        if name.is_empty() {
            return Some(root);
        }
        name.split('.')
            .try_fold(root, |node, segment| self.child_named(node, segment))
    }

    pub fn data(&self, name: &str) -> Option<&StemData> {
        self.get(name).map(|id| &self.nodes[id.0].data)
    }

    pub fn set_data(&mut self, name: &str, data: StemData) -> Result<()> {
        let id = self.require(name)?;
        self.nodes[id.0].data = data;
        Ok(())
    }

    fn require(&self, name: &str) -> Result<NodeId> {
        self.get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    fn check_label(name: &str) -> Result<()> {
        if name.is_empty() || name.contains('.') {
            return Err(Error::InvalidParameterName(name.to_string()));
        }
        Ok(())
    }

    /// Attach a node labelled `name` as the first child of `parent`. An empty
    /// tree gets its root created when `parent` is `""`.
    pub fn add_child(&mut self, parent: &str, name: &str) -> Result<NodeId> {
        Self::check_label(name)?;
        if self.is_empty() && parent.is_empty() {
            self.create_root();
        }
        let parent_id = self.require(parent)?;
        if self.child_named(parent_id, name).is_some() {
            return Err(Error::DuplicateParameter(name.to_string()));
        }

        let id = NodeId(self.nodes.len());
        let mut node = ParameterNode::new(name, Some(parent_id));
        node.next_sibling = self.nodes[parent_id.0].child;
        if let Some(old_first) = node.next_sibling {
            self.nodes[old_first.0].prev_sibling = Some(id);
        }
        self.nodes.push(node);
        self.nodes[parent_id.0].child = Some(id);
        Ok(id)
    }

    /// Insert a node labelled `name` right after the node at `sibling`.
    pub fn add_sibling(&mut self, sibling: &str, name: &str) -> Result<NodeId> {
        Self::check_label(name)?;
        let sibling_id = self.require(sibling)?;
        let Some(parent_id) = self.nodes[sibling_id.0].parent else {
            return Err(Error::InvalidParameterName(sibling.to_string()));
        };
        if self.child_named(parent_id, name).is_some() {
            return Err(Error::DuplicateParameter(name.to_string()));
        }

        let id = NodeId(self.nodes.len());
        let mut node = ParameterNode::new(name, Some(parent_id));
        node.prev_sibling = Some(sibling_id);
        node.next_sibling = self.nodes[sibling_id.0].next_sibling;
        if let Some(next) = node.next_sibling {
            self.nodes[next.0].prev_sibling = Some(id);
        }
        self.nodes.push(node);
        self.nodes[sibling_id.0].next_sibling = Some(id);
        Ok(id)
    }

    /// Detach and free the named subtree. Removing the root empties the tree.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(id) = self.get(name) else {
            return false;
        };
        if Some(id) == self.root {
            self.reset();
            return true;
        }

        let node = self.nodes[id.0].clone();
        match node.prev_sibling {
            Some(prev) => self.nodes[prev.0].next_sibling = node.next_sibling,
            None => {
                if let Some(parent) = node.parent {
                    self.nodes[parent.0].child = node.next_sibling;
                }
            }
        }
        if let Some(next) = node.next_sibling {
            self.nodes[next.0].prev_sibling = node.prev_sibling;
        }

        let mut removed = vec![false; self.nodes.len()];
        for d in self.descendants(id) {
            removed[d.0] = true;
        }
        self.compact(&removed);
        true
    }

    fn compact(&mut self, removed: &[bool]) {
        let mut remap = vec![None; self.nodes.len()];
        let mut next = 0;
        for (i, &gone) in removed.iter().enumerate() {
            if !gone {
                remap[i] = Some(NodeId(next));
                next += 1;
            }
        }
        let map = |id: Option<NodeId>| id.and_then(|id| remap[id.0]);

        let nodes = std::mem::take(&mut self.nodes);
        self.nodes = nodes
            .into_iter()
            .zip(removed)
            .filter(|(_, gone)| !**gone)
            .map(|(mut node, _)| {
                node.parent = map(node.parent);
                node.child = map(node.child);
                node.prev_sibling = map(node.prev_sibling);
                node.next_sibling = map(node.next_sibling);
                node
            })
            .collect();
        self.root = map(self.root);
    }

    /// `id` followed by all its descendants, depth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            result.push(n);
            let mut children: Vec<NodeId> = self.children(n).collect();
            children.reverse();
            stack.extend(children);
        }
        result
    }

    fn name_of(&self, id: NodeId) -> String {
        let mut labels = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            if Some(n) == self.root {
                break;
            }
            labels.push(self.nodes[n.0].name.as_str());
            current = self.nodes[n.0].parent;
        }
        labels.reverse();
        labels.join(".")
    }

    /// Dotted names of every node below the root, depth first.
    pub fn names(&self) -> Vec<String> {
        match self.root {
            Some(root) => self
                .descendants(root)
                .into_iter()
                .skip(1)
                .map(|id| self.name_of(id))
                .collect(),
            None => Vec::new(),
        }
    }

    fn entries(&self) -> Vec<(String, &StemData)> {
        match self.root {
            Some(root) => self
                .descendants(root)
                .into_iter()
                .map(|id| (self.name_of(id), &self.nodes[id.0].data))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Fresh tree rooted at a copy of `id`.
    pub fn subtree(&self, id: NodeId) -> ParameterTree {
        let mut tree = ParameterTree::default();
        if self.node(id).is_none() {
            return tree;
        }
        let root = tree.copy_node(self, id, None);
        tree.root = Some(root);
        tree
    }

    fn copy_node(&mut self, source: &ParameterTree, id: NodeId, parent: Option<NodeId>) -> NodeId {
        let original = &source.nodes[id.0];
        let copy = NodeId(self.nodes.len());
        let mut node = ParameterNode::new(&original.name, parent);
        node.data = original.data.clone();
        self.nodes.push(node);

        let mut previous: Option<NodeId> = None;
        for child in source.children(id) {
            let c = self.copy_node(source, child, Some(copy));
            self.nodes[c.0].prev_sibling = previous;
            match previous {
                Some(p) => self.nodes[p.0].next_sibling = Some(c),
                None => self.nodes[copy.0].child = Some(c),
            }
            previous = Some(c);
        }
        copy
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_tree() -> ParameterTree {
        let mut tree = ParameterTree::new();
        tree.add_child("", "a").unwrap();
        tree.add_child("a", "x").unwrap();
        tree.add_sibling("a", "b").unwrap();
        tree.add_sibling("a", "c").unwrap();
        tree.add_child("a.x", "deep").unwrap();
        tree
    }

    #[test]
    fn add_then_get() {
        let mut tree = ParameterTree::default();
        assert!(tree.get("a").is_none());
        let id = tree.add_child("", "a").unwrap();
        assert_eq!(tree.get("a"), Some(id));
        assert_eq!(tree.data("a"), Some(&StemData::default()));
        assert_eq!(tree.node(id).unwrap().name(), "a");
        assert!(tree.get("").is_some());
    }

    #[test]
    fn sibling_order() {
        let tree = sample_tree();
        assert_eq!(
            tree.names(),
            vec!["a", "a.x", "a.x.deep", "c", "b"]
        );
        let root = tree.root().unwrap();
        let labels: Vec<&str> = tree
            .children(root)
            .map(|c| tree.node(c).unwrap().name())
            .collect();
        assert_eq!(labels, vec!["a", "c", "b"]);

        let c = tree.get("c").unwrap();
        let node = tree.node(c).unwrap();
        assert_eq!(node.prev_sibling(), tree.get("a"));
        assert_eq!(node.next_sibling(), tree.get("b"));
    }

    #[test]
    fn child_becomes_first() {
        let mut tree = ParameterTree::new();
        tree.add_child("", "old").unwrap();
        tree.add_child("", "new").unwrap();
        let root = tree.root().unwrap();
        let first = tree.node(root).unwrap().child().unwrap();
        assert_eq!(tree.node(first).unwrap().name(), "new");
        assert_eq!(tree.node(first).unwrap().next_sibling(), tree.get("old"));
    }

    #[test]
    fn lookup_failures() {
        let mut tree = sample_tree();
        assert!(tree.get("a.y").is_none());
        assert!(tree.get("x").is_none());
        assert!(tree.get("a..x").is_none());
        assert_eq!(
            tree.add_child("missing", "z"),
            Err(Error::UnknownParameter("missing".into()))
        );
        assert_eq!(
            tree.add_child("", "b"),
            Err(Error::DuplicateParameter("b".into()))
        );
        assert_eq!(
            tree.add_child("", "with.dot"),
            Err(Error::InvalidParameterName("with.dot".into()))
        );
        assert!(tree.add_sibling("", "z").is_err());
    }

    #[test]
    fn remove_relinks_siblings() {
        let mut tree = sample_tree();
        assert!(tree.remove("c"));
        assert!(tree.get("c").is_none());
        assert!(!tree.remove("c"));
        let a = tree.get("a").unwrap();
        let b = tree.get("b").unwrap();
        assert_eq!(tree.node(a).unwrap().next_sibling(), Some(b));
        assert_eq!(tree.node(b).unwrap().prev_sibling(), Some(a));

        assert!(tree.remove("a"));
        assert!(tree.get("a.x.deep").is_none());
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.names(), vec!["b"]);
        let root = tree.root().unwrap();
        assert_eq!(tree.node(root).unwrap().child(), tree.get("b"));
        assert_eq!(tree.node(tree.get("b").unwrap()).unwrap().prev_sibling(), None);
    }

    #[test]
    fn remove_root_empties() {
        let mut tree = sample_tree();
        assert!(tree.remove(""));
        assert!(tree.is_empty());
        assert!(tree.names().is_empty());
        tree.add_child("", "again").unwrap();
        assert!(tree.get("again").is_some());
    }

    #[test]
    fn copies_are_independent() {
        let original = sample_tree();
        let mut copy = original.clone();
        assert_eq!(copy, original);

        let mut data = StemData::default();
        data.density = 4.;
        copy.set_data("a.x", data).unwrap();
        copy.remove("b");

        assert_eq!(original.data("a.x"), Some(&StemData::default()));
        assert!(original.get("b").is_some());
        assert_ne!(copy, original);
    }

    #[test]
    fn subtree_is_rooted_at_node() {
        let mut tree = sample_tree();
        let mut data = StemData::default();
        data.seed = 7;
        tree.set_data("a", data).unwrap();

        let sub = tree.subtree(tree.get("a").unwrap());
        assert_eq!(sub.root_data().map(|d| d.seed), Some(7));
        assert_eq!(sub.names(), vec!["x", "x.deep"]);
        assert_eq!(sub.len(), 3);
    }

    #[test]
    fn serialized_links_survive() {
        let mut tree = sample_tree();
        tree.remove("a.x");
        let text = toml::to_string(&tree).unwrap();
        let back: ParameterTree = toml::from_str(&text).unwrap();
        assert_eq!(back, tree);
        assert_eq!(back.names(), tree.names());
        assert_eq!(back.get("b"), tree.get("b"));
    }
}
