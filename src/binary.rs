//! The flat, uid-linked tree form produced by the runtime asset pipeline.
//!
//! Children refer to each other by unique id rather than by position, and
//! may refer forward, so decoding takes two passes.

use crate::{
    error::BinaryError,
    model::{NodeKind, NodeModel, NodeModels},
    port::{PortModel, PortType},
    tree::{AbstractTree, AbstractTreeNode, NodeStatus},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Serialized uid to index in the decoded [`AbstractTree`].
pub type UidMap = BTreeMap<u16, usize>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPort {
    pub name: String,
    pub direction: PortType,
    pub type_name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNodeModel {
    pub registration_name: String,
    pub kind: NodeKind,
    pub ports: Vec<SerializedPort>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub uid: u16,
    pub instance_name: String,
    pub registration_name: String,
    pub status: NodeStatus,
    pub port_remaps: Vec<(String, String)>,
    pub children_uid: Vec<u16>,
}

/// The first node is the top level node of the tree body.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializedTree {
    pub name: String,
    pub models: Vec<SerializedNodeModel>,
    pub nodes: Vec<SerializedNode>,
}

impl SerializedNodeModel {
    fn from_model(model: &NodeModel) -> Self {
        Self {
            registration_name: model.registration_id.clone(),
            kind: model.kind,
            ports: model
                .ports
                .iter()
                .map(|(name, port)| SerializedPort {
                    name: name.clone(),
                    direction: port.direction,
                    type_name: port.type_name.clone(),
                    description: port.description.clone(),
                })
                .collect(),
        }
    }

    fn to_model(&self) -> NodeModel {
        let mut ret = NodeModel::new(self.kind, &self.registration_name);
        for port in &self.ports {
            ret.ports.insert(
                port.name.clone(),
                PortModel::new(port.direction, &port.type_name).with_description(&port.description),
            );
        }
        ret
    }
}

impl SerializedTree {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BinaryError> {
        Ok(bincode::deserialize(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BinaryError> {
        Ok(bincode::serialize(self)?)
    }

    /// Serializes the body under the synthetic root of `tree` (or the whole
    /// tree if it has none). Uids are assigned in pre-order from 0.
    pub fn from_tree(tree: &AbstractTree, name: impl Into<String>) -> Result<Self, BinaryError> {
        let start = match tree.root() {
            Some(root) if root.model.is_root() => root.children_index.first().copied(),
            Some(root) => Some(root.index),
            None => None,
        };
        let body = start.map_or_else(AbstractTree::new, |start| tree.subtree(start));
        if body.len() > usize::from(u16::MAX) {
            return Err(BinaryError::TooLarge(body.len()));
        }
        let uid = |index: usize| index as u16;

        let mut models = NodeModels::new();
        let mut nodes = Vec::with_capacity(body.len());
        for node in body.nodes() {
            models
                .entry(node.model.registration_id.clone())
                .or_insert_with(|| node.model.clone());
            nodes.push(SerializedNode {
                uid: uid(node.index),
                instance_name: node.instance_name.clone(),
                registration_name: node.model.registration_id.clone(),
                status: node.status,
                port_remaps: node
                    .ports_mapping
                    .iter()
                    .map(|(port, value)| (port.clone(), value.clone()))
                    .collect(),
                children_uid: node.children_index.iter().map(|child| uid(*child)).collect(),
            });
        }

        Ok(Self {
            name: name.into(),
            models: models.values().map(SerializedNodeModel::from_model).collect(),
            nodes,
        })
    }
}

/// Decodes a serialized tree.
///
/// The first pass collects the model table and places every node, behind a
/// synthetic `Root` at index 0 whose only child is the first serialized node.
/// The second pass turns child uids into indices. Child lists that do not
/// form a single tree are refused.
pub fn tree_from_serialized(serialized: &SerializedTree) -> Result<(AbstractTree, UidMap), BinaryError> {
    if serialized.nodes.is_empty() {
        return Err(BinaryError::Empty);
    }

    let models: NodeModels = serialized
        .models
        .iter()
        .map(|model| (model.registration_name.clone(), model.to_model()))
        .collect();

    let mut tree = AbstractTree::new();
    let mut uid_map = UidMap::new();
    let root = tree.add_node(AbstractTreeNode::new(NodeModel::root()));

    for node in &serialized.nodes {
        let model = models
            .get(&node.registration_name)
            .ok_or_else(|| BinaryError::UnknownModel(node.registration_name.clone()))?;
        let mut abs_node = AbstractTreeNode::new(model.clone()).with_name(&node.instance_name);
        abs_node.status = node.status;
        abs_node.ports_mapping = node.port_remaps.iter().cloned().collect();
        let index = tree.add_node(abs_node);
        if uid_map.insert(node.uid, index).is_some() {
            return Err(BinaryError::DuplicateUid(node.uid));
        }
    }
    tree.add_child(root, 1);

    for (position, node) in serialized.nodes.iter().enumerate() {
        let children = node
            .children_uid
            .iter()
            .map(|uid| uid_map.get(uid).copied().ok_or(BinaryError::UnknownChildUid(*uid)))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(abs_node) = tree.node_mut(position + 1) {
            abs_node.children_index = children;
        }
    }
    tree.validate()?;

    debug!(
        "decoded serialized tree {:?} with {} nodes",
        serialized.name,
        serialized.nodes.len()
    );
    Ok((tree, uid_map))
}

/// Applies status updates reported by a running tree. Unknown uids are
/// skipped. Returns the number of nodes updated.
pub fn apply_status_changes(
    tree: &mut AbstractTree,
    uid_map: &UidMap,
    changes: &[(u16, NodeStatus)],
) -> usize {
    let mut applied = 0;
    for (uid, status) in changes {
        match uid_map.get(uid).and_then(|index| tree.node_mut(*index)) {
            Some(node) => {
                node.status = *status;
                applied += 1;
            }
            None => warn!("status change for unknown uid {}", uid),
        }
    }
    applied
}
