//! The abstract tree: a structure-only, representation-independent model of
//! one behavior tree.
//!
//! Nodes live in a flat vector and refer to their children by index. Node 0,
//! if present, is the root. Every other node appears in exactly one child
//! list. All conversions (graph scene, XML, serialized form) go through this
//! type, and it is rebuilt from scratch for every conversion.

use crate::{
    error::TreeError,
    geometry::{Point, Size},
    graph::NodeId,
    model::NodeModel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Port name to bound value or blackboard remap expression, kept verbatim.
pub type PortsMapping = BTreeMap<String, String>;

/// Execution status shown while monitoring a running tree.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    Idle,
    Success,
    Running,
    Failure,
}

#[derive(Debug, Clone)]
pub struct AbstractTreeNode {
    pub model: NodeModel,
    pub ports_mapping: PortsMapping,
    /// Position of this node in [`AbstractTree::nodes`].
    pub index: usize,
    pub instance_name: String,
    pub status: NodeStatus,
    pub size: Size,
    pub pos: Point,
    pub children_index: Vec<usize>,
    /// The scene node this one was built from or rendered as.
    pub graphic_node: Option<NodeId>,
}

impl AbstractTreeNode {
    /// A node named after its model, not yet placed in any tree.
    pub fn new(model: NodeModel) -> Self {
        Self {
            instance_name: model.registration_id.clone(),
            model,
            ports_mapping: PortsMapping::new(),
            index: 0,
            status: NodeStatus::Idle,
            size: Size::default(),
            pos: Point::default(),
            children_index: vec![],
            graphic_node: None,
        }
    }

    pub fn with_name(mut self, instance_name: impl Into<String>) -> Self {
        self.instance_name = instance_name.into();
        self
    }

    pub fn with_port(mut self, port: impl Into<String>, value: impl Into<String>) -> Self {
        self.ports_mapping.insert(port.into(), value.into());
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }
}

/// Position is layout output and does not take part in equality.
impl PartialEq for AbstractTreeNode {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.status == other.status
            && self.size == other.size
            && self.instance_name == other.instance_name
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbstractTree {
    nodes: Vec<AbstractTreeNode>,
}

impl AbstractTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `body` under a fresh `root` node, shifting every index by one.
    pub fn with_root(root: AbstractTreeNode, body: &AbstractTree) -> Self {
        let mut ret = Self::new();
        let root = ret.add_node(root);
        if body.is_empty() {
            return ret;
        }
        for node in body.nodes() {
            let mut node = node.clone();
            node.children_index.iter_mut().for_each(|child| *child += 1);
            ret.add_node(node);
        }
        ret.add_child(root, 1);
        ret
    }

    pub fn nodes(&self) -> &[AbstractTreeNode] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [AbstractTreeNode] {
        &mut self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn root(&self) -> Option<&AbstractTreeNode> {
        self.nodes.first()
    }

    pub fn node(&self, index: usize) -> Option<&AbstractTreeNode> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut AbstractTreeNode> {
        self.nodes.get_mut(index)
    }

    /// Appends a node and returns its index. The node is not linked to any parent.
    pub fn add_node(&mut self, mut node: AbstractTreeNode) -> usize {
        let index = self.nodes.len();
        node.index = index;
        self.nodes.push(node);
        index
    }

    pub fn add_child(&mut self, parent: usize, child: usize) {
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children_index.push(child);
        }
    }

    /// Appends `node` as the last child of `parent`.
    pub fn push_child(&mut self, parent: usize, node: AbstractTreeNode) -> usize {
        let index = self.add_node(node);
        self.add_child(parent, index);
        index
    }

    pub fn children(&self, index: usize) -> impl Iterator<Item = &AbstractTreeNode> {
        self.nodes
            .get(index)
            .map(|node| node.children_index.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.nodes.get(*child))
    }

    pub fn parent_of(&self, index: usize) -> Option<usize> {
        self.nodes
            .iter()
            .find(|node| node.children_index.contains(&index))
            .map(|node| node.index)
    }

    pub fn find_node(&self, instance_name: &str) -> Option<&AbstractTreeNode> {
        self.nodes
            .iter()
            .find(|node| node.instance_name == instance_name)
    }

    pub fn find_graphic(&self, id: NodeId) -> Option<&AbstractTreeNode> {
        self.nodes.iter().find(|node| node.graphic_node == Some(id))
    }

    /// Indices in pre-order starting from the root.
    pub fn depth_first(&self) -> Vec<usize> {
        let mut ret = Vec::with_capacity(self.nodes.len());
        if self.nodes.is_empty() {
            return ret;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            match seen.get_mut(index) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            ret.push(index);
            stack.extend(self.nodes[index].children_index.iter().rev());
        }
        ret
    }

    /// Indices grouped by depth, each level in left-to-right order.
    pub fn levels(&self) -> Vec<Vec<usize>> {
        let mut ret: Vec<Vec<usize>> = vec![];
        if self.nodes.is_empty() {
            return ret;
        }
        let mut seen = vec![false; self.nodes.len()];
        seen[0] = true;
        let mut current = vec![0];
        while !current.is_empty() {
            let mut next = vec![];
            for &index in &current {
                for &child in &self.nodes[index].children_index {
                    if let Some(seen) = seen.get_mut(child).filter(|seen| !**seen) {
                        *seen = true;
                        next.push(child);
                    }
                }
            }
            ret.push(std::mem::replace(&mut current, next));
        }
        ret
    }

    /// Copies the subtree rooted at `index` into a new tree rooted at 0.
    pub fn subtree(&self, index: usize) -> AbstractTree {
        fn copy(src: &AbstractTree, index: usize, dst: &mut AbstractTree) -> usize {
            let mut node = src.nodes[index].clone();
            node.children_index.clear();
            let new_index = dst.add_node(node);
            for &child in &src.nodes[index].children_index {
                let new_child = copy(src, child, dst);
                dst.add_child(new_index, new_child);
            }
            new_index
        }

        let mut ret = AbstractTree::new();
        if index < self.nodes.len() {
            copy(self, index, &mut ret);
        }
        ret
    }

    /// Checks the single-rooted tree invariant.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.nodes.is_empty() {
            return Err(TreeError::Empty);
        }
        let mut parent_count = vec![0usize; self.nodes.len()];
        for (position, node) in self.nodes.iter().enumerate() {
            if node.index != position {
                return Err(TreeError::IndexMismatch {
                    index: node.index,
                    position,
                });
            }
            for &child in &node.children_index {
                let count = parent_count
                    .get_mut(child)
                    .ok_or(TreeError::ChildOutOfBounds {
                        parent: position,
                        child,
                    })?;
                *count += 1;
                if *count > 1 {
                    return Err(TreeError::SharedChild { child });
                }
            }
        }
        if parent_count[0] != 0 {
            return Err(TreeError::RootHasParent);
        }
        let mut reached = vec![false; self.nodes.len()];
        for index in self.depth_first() {
            reached[index] = true;
        }
        match reached.iter().position(|reached| !reached) {
            Some(index) => Err(TreeError::Unreachable(index)),
            None => Ok(()),
        }
    }
}

/// Same node count, pairwise equal nodes and the same child lists.
impl PartialEq for AbstractTree {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(other.nodes.iter())
                .all(|(lhs, rhs)| lhs == rhs && lhs.children_index == rhs.children_index)
    }
}

impl Display for AbstractTree {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fn print(
            tree: &AbstractTree,
            index: usize,
            depth: usize,
            fmt: &mut Formatter,
        ) -> fmt::Result {
            let node = &tree.nodes[index];
            write!(fmt, "{:indent$}{}", "", node.instance_name, indent = depth * 2)?;
            if node.instance_name != node.model.registration_id {
                write!(fmt, " ({})", node.model.registration_id)?;
            }
            for (port, value) in &node.ports_mapping {
                write!(fmt, " {}={:?}", port, value)?;
            }
            writeln!(fmt)?;
            for &child in &node.children_index {
                print(tree, child, depth + 1, fmt)?;
            }
            Ok(())
        }

        if self.nodes.is_empty() {
            return Ok(());
        }
        print(self, 0, 0, fmt)
    }
}
