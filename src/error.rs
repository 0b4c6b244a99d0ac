use crate::graph::{ConnectionId, NodeId};
use thiserror::Error;

/// Malformed XML text, reported with the 1-based line it was found on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("XML syntax error at line {line}: {message}")]
pub struct XmlError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("Invalid tree file:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
    #[error("Node type not registered {id:?} (line {line})")]
    UnknownNode { id: String, line: usize },
    #[error("Element <{tag}> needs an ID attribute (line {line})")]
    MissingId { tag: String, line: usize },
    #[error("The tree {0:?} does not exist")]
    MissingTree(String),
}

/// Violations of the single-rooted, index-linked tree invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("The tree is empty")]
    Empty,
    #[error("Node {index} is stored at position {position}")]
    IndexMismatch { index: usize, position: usize },
    #[error("Node {parent} refers to a missing child {child}")]
    ChildOutOfBounds { parent: usize, child: usize },
    #[error("Node {child} has more than one parent")]
    SharedChild { child: usize },
    #[error("The root node is listed as a child")]
    RootHasParent,
    #[error("Node {0} is not reachable from the root")]
    Unreachable(usize),
    #[error("Node {0} has more children than its type allows")]
    TooManyChildren(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("A tree needs exactly one root node, found {0}")]
    RootCount(usize),
    #[error("Node {0:?} is not in the scene")]
    MissingNode(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum GraphError {
    #[error("Node {0:?} is not in the scene")]
    MissingNode(NodeId),
    #[error("Connection {0:?} is not in the scene")]
    MissingConnection(ConnectionId),
    #[error("Node {0:?} has no input port")]
    NoInputPort(NodeId),
    #[error("Node {0:?} has no output port")]
    NoOutputPort(NodeId),
    #[error("The port of node {0:?} accepts no more connections")]
    PortOccupied(NodeId),
    #[error("Connecting {parent:?} to {child:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum EditError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("Operation not allowed on node {node:?}: {reason}")]
    NotAllowed { node: NodeId, reason: &'static str },
    #[error("Node {0:?} is not a SubTree reference")]
    NotASubtree(NodeId),
    #[error("The subtree {name:?} cannot be expanded: {source}")]
    MalformedSubtree {
        name: String,
        #[source]
        source: TreeError,
    },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BinaryError {
    #[error("Cannot decode serialized tree: {0}")]
    Decode(#[from] bincode::Error),
    #[error("The serialized tree has no nodes")]
    Empty,
    #[error("Serialized node refers to an unknown model {0:?}")]
    UnknownModel(String),
    #[error("Serialized node refers to an unknown child uid {0}")]
    UnknownChildUid(u16),
    #[error("Serialized tree uses uid {0} twice")]
    DuplicateUid(u16),
    #[error("A tree of {0} nodes does not fit in 16-bit uids")]
    TooLarge(usize),
    #[error("Serialized nodes do not form a tree: {0}")]
    Malformed(#[from] TreeError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EditorError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Binary(#[from] BinaryError),
    #[error("Cannot serialize editor state: {0}")]
    Snapshot(#[from] serde_yaml::Error),
    #[error("No tree named {0:?} is open")]
    MissingTab(String),
    #[error("A tree named {0:?} is already open")]
    DuplicateTab(String),
    #[error("Node type {0:?} is builtin")]
    BuiltinModel(String),
    #[error("Node type {0:?} is not registered")]
    UnknownModel(String),
    #[error("Node type {id:?} is used by {count} node(s)")]
    ModelInUse { id: String, count: usize },
}
