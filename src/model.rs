use crate::port::{PortModel, PortType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Registration id of the synthetic anchor node every tree starts with.
pub const ROOT_ID: &str = "Root";

/// Category given to every node type the registry knows without a file.
pub const BUILTIN_CATEGORY: &str = "Builtin";

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Action,
    Condition,
    Control,
    Decorator,
    SubTree,
    Root,
    Undefined,
}

impl NodeKind {
    /// Kind named by a generic XML tag such as `<Action ID="...">`.
    /// Any other tag is a bare registration id and yields `Undefined`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Action" => Self::Action,
            "Condition" => Self::Condition,
            "Control" => Self::Control,
            "Decorator" => Self::Decorator,
            "SubTree" | "SubTreePlus" => Self::SubTree,
            "Root" => Self::Root,
            _ => Self::Undefined,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::Condition => "Condition",
            Self::Control => "Control",
            Self::Decorator => "Decorator",
            Self::SubTree => "SubTree",
            Self::Root => "Root",
            Self::Undefined => "Undefined",
        }
    }

    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Action | Self::Condition | Self::SubTree)
    }
}

impl Display for NodeKind {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

/// Declarative descriptor of a node type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeModel {
    pub kind: NodeKind,
    pub registration_id: String,
    pub ports: BTreeMap<String, PortModel>,
    pub category: Option<String>,
}

/// Known node types of one editing session, keyed by registration id.
pub type NodeModels = BTreeMap<String, NodeModel>;

impl NodeModel {
    pub fn new(kind: NodeKind, registration_id: impl Into<String>) -> Self {
        Self {
            kind,
            registration_id: registration_id.into(),
            ports: BTreeMap::new(),
            category: None,
        }
    }

    /// The implicit top-level anchor of every tree.
    pub fn root() -> Self {
        let mut ret = Self::new(NodeKind::Control, ROOT_ID);
        ret.category = Some(BUILTIN_CATEGORY.to_owned());
        ret
    }

    /// A reference to another tree by name.
    pub fn subtree(name: impl Into<String>) -> Self {
        Self::new(NodeKind::SubTree, name)
    }

    pub fn with_port(mut self, name: impl Into<String>, port: PortModel) -> Self {
        self.ports.insert(name.into(), port);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_root(&self) -> bool {
        self.registration_id == ROOT_ID
    }

    pub fn is_builtin(&self) -> bool {
        self.category.as_deref() == Some(BUILTIN_CATEGORY)
    }

    pub fn port(&self, name: &str) -> Option<&PortModel> {
        self.ports.get(name)
    }

    pub fn ports_of(&self, direction: PortType) -> impl Iterator<Item = (&str, &PortModel)> {
        self.ports
            .iter()
            .filter(move |(_, port)| port.direction == direction)
            .map(|(name, port)| (name.as_str(), port))
    }
}

/// Structural equality: kind, registration id and the port set with
/// direction and type name. Category, descriptions and defaults are display data.
impl PartialEq for NodeModel {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.registration_id == other.registration_id
            && self.ports.len() == other.ports.len()
            && self
                .ports
                .iter()
                .zip(other.ports.iter())
                .all(|((lname, lport), (rname, rport))| {
                    lname == rname && lport.same_signature(rport)
                })
    }
}

impl Eq for NodeModel {}
