//! Declared blackboard entries of a tree file (`<Blackboard>` block).
//!
//! The editor only keeps the declarations; values live in the runtime.

use crate::parser::Element;
use serde::{Deserialize, Serialize};

pub const BLACKBOARD_TAG: &str = "Blackboard";
const PROPERTY_TAG: &str = "Property";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlackboardProperty {
    pub name: String,
    pub type_name: String,
    pub default_value: String,
    pub suffix: String,
    pub description: String,
    pub private: bool,
    pub order: i32,
}

impl BlackboardProperty {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    fn from_element(elem: &Element, position: usize) -> Option<Self> {
        let text = |key: &str| elem.attribute(key).unwrap_or("").to_owned();
        Some(Self {
            name: elem.attribute("name")?.to_owned(),
            type_name: text("type"),
            default_value: text("default"),
            suffix: text("suffix"),
            description: text("description"),
            private: elem.attribute("private") == Some("true"),
            order: elem
                .attribute("order")
                .and_then(|order| order.trim().parse().ok())
                .unwrap_or(position as i32),
        })
    }

    fn to_element(&self) -> Element {
        Element::new(PROPERTY_TAG)
            .with_attribute("name", &self.name)
            .with_attribute("type", &self.type_name)
            .with_attribute("default", &self.default_value)
            .with_attribute("suffix", &self.suffix)
            .with_attribute("description", &self.description)
            .with_attribute("private", if self.private { "true" } else { "false" })
            .with_attribute("order", self.order.to_string())
    }
}

/// Reads every named `<Property>` of a `<Blackboard>` element, sorted by `order`.
pub fn parse_blackboard(elem: &Element) -> Vec<BlackboardProperty> {
    let mut ret: Vec<_> = elem
        .children_named(PROPERTY_TAG)
        .enumerate()
        .filter_map(|(position, property)| BlackboardProperty::from_element(property, position))
        .collect();
    ret.sort_by_key(|property| property.order);
    ret
}

pub fn blackboard_to_element(properties: &[BlackboardProperty]) -> Element {
    let mut sorted: Vec<_> = properties.iter().collect();
    sorted.sort_by_key(|property| property.order);
    let mut ret = Element::new(BLACKBOARD_TAG);
    for property in sorted {
        ret.push_child(property.to_element());
    }
    ret
}
