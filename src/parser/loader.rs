use super::{
    models::{collect_models_from_document, RESERVED_ATTRIBUTES},
    xml_parser::{parse_document, Element},
};
use crate::{
    blackboard::{parse_blackboard, BlackboardProperty, BLACKBOARD_TAG},
    error::LoadError,
    model::{NodeKind, NodeModel, NodeModels, ROOT_ID},
    tree::{AbstractTree, AbstractTreeNode},
    Registry,
};
use std::collections::HashSet;
use tracing::{info, warn};

pub(crate) const ROOT_TAG: &str = "root";
pub(crate) const TREE_TAG: &str = "BehaviorTree";
pub(crate) const MODELS_TAG: &str = "TreeNodesModel";
pub(crate) const MAIN_TREE_ATTRIBUTE: &str = "main_tree_to_execute";

/// Everything a tree file holds, with each tree already in abstract form.
#[derive(Debug, Clone, Default)]
pub struct TreeDocument {
    /// Value of `main_tree_to_execute`, if the file names one.
    pub main_tree: Option<String>,
    /// Trees in file order.
    pub trees: Vec<(String, AbstractTree)>,
    /// Models found in the file that the registry did not know.
    pub custom_models: NodeModels,
    pub blackboard: Vec<BlackboardProperty>,
    /// User facing warnings, e.g. about deprecated syntax.
    pub warnings: Vec<String>,
}

impl TreeDocument {
    pub fn tree(&self, name: &str) -> Option<&AbstractTree> {
        self.trees
            .iter()
            .find(|(tree_name, _)| tree_name == name)
            .map(|(_, tree)| tree)
    }

    /// The designated main tree, or the only tree of the file.
    pub fn main_tree_name(&self) -> Option<&str> {
        match (&self.main_tree, self.trees.as_slice()) {
            (Some(main), _) => Some(main),
            (None, [(name, _)]) => Some(name),
            _ => None,
        }
    }
}

/// Elements making up the body of a `<BehaviorTree>`, skipping a legacy
/// `<Root>` wrapper.
fn tree_body(bt_root: &Element) -> (&[Element], bool) {
    match bt_root.children.as_slice() {
        [wrapper] if wrapper.name == ROOT_ID => (&wrapper.children, true),
        children => (children, false),
    }
}

fn resolve_id(elem: &Element) -> Result<&str, LoadError> {
    match (elem.attribute("ID"), NodeKind::from_tag(&elem.name)) {
        (Some(id), _) => Ok(id),
        (None, NodeKind::Undefined) => Ok(&elem.name),
        (None, _) => Err(LoadError::MissingId {
            tag: elem.name.clone(),
            line: elem.line,
        }),
    }
}

/// Builds the abstract tree of one `<BehaviorTree>` element.
///
/// Node 0 is a synthetic `Root`. Each element's model is resolved by its
/// `ID` attribute or tag name; an unknown id is an error. Attributes other
/// than `ID` and `name` become port mappings, kept as strings.
pub fn build_tree_from_xml(bt_root: &Element, models: &NodeModels) -> Result<AbstractTree, LoadError> {
    fn recurse(
        elem: &Element,
        parent: usize,
        models: &NodeModels,
        tree: &mut AbstractTree,
    ) -> Result<(), LoadError> {
        let id = resolve_id(elem)?;
        let model = models.get(id).ok_or_else(|| LoadError::UnknownNode {
            id: id.to_owned(),
            line: elem.line,
        })?;
        let mut node = AbstractTreeNode::new(model.clone());
        if let Some(name) = elem.attribute("name") {
            node.instance_name = name.to_owned();
        }
        node.ports_mapping = elem
            .attributes
            .iter()
            .filter(|(key, _)| !RESERVED_ATTRIBUTES.contains(&key.as_str()))
            .cloned()
            .collect();
        let index = tree.push_child(parent, node);
        for child in &elem.children {
            recurse(child, index, models, tree)?;
        }
        Ok(())
    }

    let (body, legacy_root) = tree_body(bt_root);
    if legacy_root {
        warn!(
            "tree {:?} wraps its body in a <Root> element, please update the file",
            bt_root.attribute("ID").unwrap_or_default()
        );
    }

    let root_model = models.get(ROOT_ID).cloned().unwrap_or_else(NodeModel::root);
    let mut tree = AbstractTree::new();
    let root = tree.add_node(AbstractTreeNode::new(root_model));
    for elem in body {
        recurse(elem, root, models, &mut tree)?;
    }
    Ok(tree)
}

/// Structural checks on a parsed document. Collects every problem found.
pub fn verify_document(root: &Element, models: &NodeModels) -> Result<(), Vec<String>> {
    fn check_node(elem: &Element, models: &NodeModels, errors: &mut Vec<String>) {
        let kind = resolve_id(elem)
            .ok()
            .and_then(|id| models.get(id))
            .map(|model| model.kind);
        let count = elem.children.len();
        let problem = match kind {
            Some(NodeKind::Action | NodeKind::Condition) if count != 0 => {
                Some("a leaf node must not have children")
            }
            Some(NodeKind::SubTree) if count != 0 => Some("a SubTree reference must not have children"),
            Some(NodeKind::Decorator) if count != 1 => Some("a Decorator must have exactly one child"),
            Some(NodeKind::Control) if count == 0 => Some("a Control node must have at least one child"),
            _ => None,
        };
        if let Some(problem) = problem {
            errors.push(format!("line {}: <{}>: {}", elem.line, elem.name, problem));
        }
        for child in &elem.children {
            check_node(child, models, errors);
        }
    }

    let mut errors = vec![];
    if root.name != ROOT_TAG {
        errors.push(format!(
            "line {}: the root element must be <{}>, found <{}>",
            root.line, ROOT_TAG, root.name
        ));
    }

    let trees: Vec<_> = root.children_named(TREE_TAG).collect();
    if trees.is_empty() {
        errors.push(format!("the document has no <{}>", TREE_TAG));
    }
    let mut seen = HashSet::new();
    for bt in &trees {
        match bt.attribute("ID") {
            Some(id) if !seen.insert(id) => {
                errors.push(format!("line {}: duplicate tree ID {:?}", bt.line, id));
            }
            Some(_) => (),
            None => errors.push(format!("line {}: <{}> without ID", bt.line, TREE_TAG)),
        }
        let (body, _) = tree_body(bt);
        if body.len() != 1 {
            errors.push(format!(
                "line {}: a tree must have exactly one top level node, found {}",
                bt.line,
                body.len()
            ));
        }
        for elem in body {
            check_node(elem, models, &mut errors);
        }
    }

    match root.attribute(MAIN_TREE_ATTRIBUTE) {
        Some(main) => {
            if !trees.iter().any(|bt| bt.attribute("ID") == Some(main)) {
                errors.push(format!("{} names an unknown tree {:?}", MAIN_TREE_ATTRIBUTE, main));
            }
        }
        None if trees.len() > 1 => {
            errors.push(format!("{} is required when there is more than one tree", MAIN_TREE_ATTRIBUTE));
        }
        None => (),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parses, verifies and converts a complete tree file.
///
/// Models declared or used in the file are resolved together with the ones
/// already in `registry`; the registry wins on conflicts. Nothing is
/// returned on error, so a caller keeps its previous state.
pub fn load_document(source: &str, registry: &Registry) -> Result<TreeDocument, LoadError> {
    let root = parse_document(source)?;

    let mut models = registry.models().clone();
    let mut custom_models = NodeModels::new();
    for (id, model) in collect_models_from_document(&root) {
        if !models.contains_key(&id) {
            models.insert(id.clone(), model.clone());
            custom_models.insert(id, model);
        }
    }

    verify_document(&root, &models).map_err(LoadError::Validation)?;

    let mut document = TreeDocument {
        main_tree: root.attribute(MAIN_TREE_ATTRIBUTE).map(str::to_owned),
        custom_models,
        ..TreeDocument::default()
    };

    for bt in root.children_named(TREE_TAG) {
        let id = bt.attribute("ID").unwrap_or_default().to_owned();
        if tree_body(bt).1 {
            document.warnings.push(format!(
                "Tree {:?} wraps its body in a <Root> element. Please fix the file.",
                id
            ));
        }
        let tree = build_tree_from_xml(bt, &models)?;
        document.trees.push((id, tree));
    }

    if let Some(blackboard) = root.child(BLACKBOARD_TAG) {
        document.blackboard = parse_blackboard(blackboard);
    }

    info!(
        "loaded {} tree(s) and {} custom model(s)",
        document.trees.len(),
        document.custom_models.len()
    );
    Ok(document)
}
