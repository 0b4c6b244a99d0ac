use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum PortType {
    Input,
    Output,
    InOut,
}

impl PortType {
    /// Parses the tag used by `<TreeNodesModel>` port declarations.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "input_port" => Some(Self::Input),
            "output_port" => Some(Self::Output),
            "inout_port" => Some(Self::InOut),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Input => "input_port",
            Self::Output => "output_port",
            Self::InOut => "inout_port",
        }
    }
}

impl Display for PortType {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Input => write!(fmt, "Input"),
            Self::Output => write!(fmt, "Output"),
            Self::InOut => write!(fmt, "InOut"),
        }
    }
}

/// One named port on a node type.
///
/// The port name is the key under which it is stored in
/// [`crate::NodeModel::ports`], so it is not repeated here.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct PortModel {
    pub direction: PortType,
    /// Human readable type, e.g. `std::string`. Empty when unknown.
    pub type_name: String,
    pub description: String,
    pub default_value: String,
}

impl PortModel {
    pub fn new(direction: PortType, type_name: impl Into<String>) -> Self {
        Self {
            direction,
            type_name: type_name.into(),
            description: String::new(),
            default_value: String::new(),
        }
    }

    pub fn new_in(type_name: impl Into<String>) -> Self {
        Self::new(PortType::Input, type_name)
    }

    pub fn new_out(type_name: impl Into<String>) -> Self {
        Self::new(PortType::Output, type_name)
    }

    pub fn new_inout(type_name: impl Into<String>) -> Self {
        Self::new(PortType::InOut, type_name)
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = default_value.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Direction and type name agree; description and default are ignored.
    pub(crate) fn same_signature(&self, other: &Self) -> bool {
        self.direction == other.direction && self.type_name == other.type_name
    }
}
