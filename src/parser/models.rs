use super::xml_parser::Element;
use crate::{
    model::{NodeKind, NodeModel, NodeModels, ROOT_ID},
    port::{PortModel, PortType},
};

/// Attributes of a node element that are not port bindings.
pub(crate) const RESERVED_ATTRIBUTES: [&str; 2] = ["ID", "name"];

/// Infers a node model from a `<TreeNodesModel>` entry or from a node used
/// inside a `<BehaviorTree>` body.
///
/// A generic tag (`<Action ID="Walk">`) names the kind; any other tag is the
/// registration id itself and yields [`NodeKind::Undefined`]. Ports come
/// from `<input_port>`-style children when there are any. Otherwise every
/// attribute except `ID` and `name` becomes an InOut port, so free-form
/// attributes at a usage site are treated as implicit ports.
pub fn parse_custom_model(elem: &Element) -> NodeModel {
    let kind = NodeKind::from_tag(&elem.name);
    let registration_id = elem.attribute("ID").unwrap_or(&elem.name);
    let mut model = NodeModel::new(kind, registration_id);

    let declared: Vec<_> = elem
        .children
        .iter()
        .filter_map(|child| PortType::from_tag(&child.name).map(|direction| (direction, child)))
        .collect();

    if declared.is_empty() {
        for (key, _) in &elem.attributes {
            if !RESERVED_ATTRIBUTES.contains(&key.as_str()) {
                model
                    .ports
                    .insert(key.clone(), PortModel::new(PortType::InOut, ""));
            }
        }
    } else {
        for (direction, port) in declared {
            let Some(name) = port.attribute("name") else {
                continue;
            };
            let mut port_model = PortModel::new(direction, port.attribute("type").unwrap_or(""))
                .with_description(port.text.clone());
            if let Some(default) = port.attribute("default") {
                port_model = port_model.with_default(default);
            }
            model.ports.insert(name.to_owned(), port_model);
        }
    }
    model
}

/// Union of all models declared in `<TreeNodesModel>` and all node types
/// used in any `<BehaviorTree>` body. The first occurrence of an id wins,
/// declarations are visited before usages. Every tree id is also known as
/// a SubTree model.
pub fn collect_models_from_document(root: &Element) -> NodeModels {
    let mut models = NodeModels::new();
    let mut insert = |model: NodeModel| {
        models
            .entry(model.registration_id.clone())
            .or_insert(model);
    };

    for nodes_model in root.children_named("TreeNodesModel") {
        for elem in &nodes_model.children {
            insert(parse_custom_model(elem));
        }
    }

    fn visit(elem: &Element, insert: &mut impl FnMut(NodeModel)) {
        // Legacy files wrap the tree body in a <Root> element
        if elem.name != ROOT_ID {
            insert(parse_custom_model(elem));
        }
        for child in &elem.children {
            visit(child, insert);
        }
    }

    for bt in root.children_named("BehaviorTree") {
        for elem in &bt.children {
            visit(elem, &mut insert);
        }
    }

    for bt in root.children_named("BehaviorTree") {
        if let Some(id) = bt.attribute("ID") {
            insert(NodeModel::subtree(id));
        }
    }

    models
}
