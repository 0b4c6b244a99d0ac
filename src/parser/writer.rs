use super::{
    loader::{TreeDocument, MAIN_TREE_ATTRIBUTE, MODELS_TAG, ROOT_TAG, TREE_TAG},
    models::RESERVED_ATTRIBUTES,
    xml_parser::{parse_document, Element},
};
use crate::{
    blackboard::blackboard_to_element,
    builder::tree_from_scene,
    error::{BuildError, XmlError},
    graph::{GraphView, NodeId},
    model::{NodeKind, NodeModel, NodeModels},
    tree::AbstractTree,
    Registry,
};
use std::{
    borrow::Cow,
    fmt::{self, Write},
};
use tracing::debug;

const INDENT: usize = 4;

/// Streaming XML writer with a fixed indentation, so that the same DOM always
/// produces the same bytes no matter how it was built.
pub struct XmlWriter<W> {
    out: W,
    depth: usize,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, depth: 0 }
    }

    pub fn declaration(&mut self) -> fmt::Result {
        writeln!(self.out, "<?xml version=\"1.0\"?>")
    }

    pub fn element(&mut self, elem: &Element) -> fmt::Result {
        write!(self.out, "{:indent$}<{}", "", elem.name, indent = self.depth * INDENT)?;
        for (key, value) in &elem.attributes {
            write!(self.out, " {}=\"{}\"", key, escape(value, true))?;
        }

        match (elem.children.is_empty(), elem.text.is_empty()) {
            (true, true) => writeln!(self.out, "/>"),
            (true, false) => writeln!(
                self.out,
                ">{}</{}>",
                escape(&elem.text, false),
                elem.name
            ),
            (false, _) => {
                writeln!(self.out, ">")?;
                self.depth += 1;
                if !elem.text.is_empty() {
                    writeln!(
                        self.out,
                        "{:indent$}{}",
                        "",
                        escape(&elem.text, false),
                        indent = self.depth * INDENT
                    )?;
                }
                for child in &elem.children {
                    self.element(child)?;
                }
                self.depth -= 1;
                writeln!(self.out, "{:indent$}</{}>", "", elem.name, indent = self.depth * INDENT)
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn escape(text: &str, attribute: bool) -> Cow<str> {
    let needs_escape = |c: char| matches!(c, '&' | '<' | '>') || (attribute && c == '"');
    if !text.contains(needs_escape) {
        return Cow::Borrowed(text);
    }
    let mut ret = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => ret.push_str("&amp;"),
            '<' => ret.push_str("&lt;"),
            '>' => ret.push_str("&gt;"),
            '"' if attribute => ret.push_str("&quot;"),
            c => ret.push(c),
        }
    }
    Cow::Owned(ret)
}

/// Writes a whole document: the XML declaration followed by `root`.
pub fn write_element(root: &Element) -> String {
    let mut writer = XmlWriter::new(String::new());
    writer
        .declaration()
        .and_then(|_| writer.element(root))
        .map(|_| writer.into_inner())
        .unwrap_or_default()
}

/// Parses `text` and writes it back with the canonical layout.
/// Comments, processing instructions and insignificant whitespace are dropped.
pub fn canonicalize(text: &str) -> Result<String, XmlError> {
    Ok(write_element(&parse_document(text)?))
}

fn node_to_element(tree: &AbstractTree, index: usize, registry: &Registry) -> Option<Element> {
    let node = tree.node(index)?;
    let model = &node.model;
    let id = &model.registration_id;

    let mut elem = if registry.is_builtin(id) || model.kind == NodeKind::Undefined {
        Element::new(id)
    } else {
        Element::new(model.kind.as_str()).with_attribute("ID", id)
    };
    if node.instance_name != *id {
        elem.set_attribute("name", &node.instance_name);
    }
    for (port, value) in &node.ports_mapping {
        if RESERVED_ATTRIBUTES.contains(&port.as_str()) {
            continue;
        }
        elem.set_attribute(port, value);
    }

    // A collapsed SubTree reference has no children, an expanded one holds its
    // spliced body.
    for &child in &node.children_index {
        if let Some(child) = node_to_element(tree, child, registry) {
            elem.push_child(child);
        }
    }
    Some(elem)
}

/// `<BehaviorTree ID="...">` holding the body of `tree`. The synthetic root
/// node itself is not written.
pub fn tree_to_element(tree: &AbstractTree, tree_id: &str, registry: &Registry) -> Element {
    let mut ret = Element::new(TREE_TAG).with_attribute("ID", tree_id);
    let body: Vec<usize> = match tree.root() {
        Some(root) if root.model.is_root() => root.children_index.clone(),
        Some(root) => vec![root.index],
        None => vec![],
    };
    for index in body {
        if let Some(elem) = node_to_element(tree, index, registry) {
            ret.push_child(elem);
        }
    }
    ret
}

/// Same as [`tree_to_element`] for the tree currently shown in `scene`.
pub fn scene_to_element<G>(
    scene: &G,
    root: Option<NodeId>,
    tree_id: &str,
    registry: &Registry,
) -> Result<Element, BuildError>
where
    G: GraphView + ?Sized,
{
    let tree = tree_from_scene(scene, root)?;
    Ok(tree_to_element(&tree, tree_id, registry))
}

fn model_to_element(model: &NodeModel) -> Element {
    let mut ret = Element::new(model.kind.as_str()).with_attribute("ID", &model.registration_id);
    for (name, port) in &model.ports {
        let mut port_elem = Element::new(port.direction.tag())
            .with_attribute("name", name)
            .with_text(&port.description);
        if !port.type_name.is_empty() {
            port_elem.set_attribute("type", &port.type_name);
        }
        if !port.default_value.is_empty() {
            port_elem.set_attribute("default", &port.default_value);
        }
        ret.push_child(port_elem);
    }
    ret
}

/// `<TreeNodesModel>` declaring each of `models`.
pub fn models_to_element<'a>(models: impl IntoIterator<Item = &'a NodeModel>) -> Element {
    let mut ret = Element::new(MODELS_TAG);
    for model in models {
        ret.push_child(model_to_element(model));
    }
    ret
}

/// Builds the `<root>` element of a tree file.
///
/// Declared models are the custom ones of the document and the registry,
/// except models inferred from bare tags and SubTree models standing for a
/// tree of the same document.
pub fn document_to_element(document: &TreeDocument, registry: &Registry) -> Element {
    let mut root = Element::new(ROOT_TAG);
    if let Some(main) = &document.main_tree {
        root.set_attribute(MAIN_TREE_ATTRIBUTE, main);
    }

    for (id, tree) in &document.trees {
        root.push_child(tree_to_element(tree, id, registry));
    }

    let mut declared = NodeModels::new();
    for model in document
        .custom_models
        .values()
        .chain(registry.custom_models())
    {
        let inferred = model.kind == NodeKind::Undefined || model.is_root();
        let local_tree = model.kind == NodeKind::SubTree
            && document.trees.iter().any(|(id, _)| *id == model.registration_id);
        if !inferred && !local_tree {
            declared
                .entry(model.registration_id.clone())
                .or_insert_with(|| model.clone());
        }
    }
    if !declared.is_empty() {
        root.push_child(models_to_element(declared.values()));
    }

    if !document.blackboard.is_empty() {
        root.push_child(blackboard_to_element(&document.blackboard));
    }
    root
}

/// Canonical text of a complete tree file.
pub fn write_document(document: &TreeDocument, registry: &Registry) -> String {
    let ret = write_element(&document_to_element(document, registry));
    debug!("wrote {} tree(s), {} bytes", document.trees.len(), ret.len());
    ret
}

#[cfg(test)]
mod test;
