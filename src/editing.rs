//! Structural edits on a graph scene.
//!
//! Each operation runs inside a single batch, so listeners such as the undo
//! store observe one change. Operations that can be refused come with a
//! `can_*` check meant for enabling menu entries ahead of time; the operation
//! itself performs the same check and fails with [`EditError::NotAllowed`]
//! before touching the scene.

use crate::{
    builder::tree_from_scene,
    error::{EditError, GraphError, TreeError},
    geometry::{Point, Size},
    graph::{batch, ConnectionId, GraphNode, GraphView, LayoutAxis, NodeFlags, NodeId, SubtreeState},
    layout::LayoutConfig,
    model::{NodeKind, NodeModel},
    tree::{AbstractTree, AbstractTreeNode},
};
use tracing::{debug, warn};

fn editable_node<G>(scene: &G, id: NodeId) -> Result<&GraphNode, EditError>
where
    G: GraphView + ?Sized,
{
    let node = scene
        .node(id)
        .ok_or(GraphError::MissingNode(id))?;
    if node.model.is_root() {
        return Err(EditError::NotAllowed {
            node: id,
            reason: "the root node cannot be edited",
        });
    }
    if node.spliced || !node.flags.editable {
        return Err(EditError::NotAllowed {
            node: id,
            reason: "the node is locked",
        });
    }
    Ok(node)
}

fn check_substitute<G>(scene: &G, id: NodeId, model: &NodeModel) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    let node = editable_node(scene, id)?;
    if model.is_root() {
        return Err(EditError::NotAllowed {
            node: id,
            reason: "a node cannot become the root",
        });
    }
    let replacement = GraphNode::new(model.clone(), node.pos, node.size);
    if !replacement.accepts_children(scene.outgoing(id).len()) {
        return Err(EditError::NotAllowed {
            node: id,
            reason: "the new type cannot hold the existing children",
        });
    }
    Ok(())
}

pub fn can_substitute<G>(scene: &G, id: NodeId, model: &NodeModel) -> bool
where
    G: GraphView + ?Sized,
{
    check_substitute(scene, id, model).is_ok()
}

/// Instance name carried over to a replacement node. A name that was just
/// the old type's id follows the type.
fn transferred_name(old: &GraphNode, model: &NodeModel) -> String {
    if old.instance_name == old.model.registration_id {
        model.registration_id.clone()
    } else {
        old.instance_name.clone()
    }
}

/// Replaces node `id` by a new node of type `model` at the same position.
///
/// The instance name and the port values whose port also exists in `model`
/// are carried over, and the parent and children are reconnected to the
/// replacement. Returns the new node.
pub fn substitute_node<G>(scene: &mut G, id: NodeId, model: NodeModel) -> Result<NodeId, EditError>
where
    G: GraphView + ?Sized,
{
    check_substitute(scene, id, &model)?;
    batch(scene, |scene| -> Result<NodeId, EditError> {
        let parent = scene.parent(id);
        let children = scene.children(id);
        let old = scene
            .remove_node(id)
            .ok_or(GraphError::MissingNode(id))?;

        let new_id = scene.create_node(model.clone(), old.pos);
        if let Some(node) = scene.node_mut(new_id) {
            node.instance_name = transferred_name(&old, &model);
            node.ports_mapping = old
                .ports_mapping
                .into_iter()
                .filter(|(port, _)| model.ports.contains_key(port))
                .collect();
            node.flags = old.flags;
        }
        if let Some(parent) = parent {
            scene.connect(parent, new_id)?;
        }
        for child in children {
            scene.connect(new_id, child)?;
        }
        debug!("substituted {:?} by {:?} ({})", id, new_id, model.registration_id);
        Ok(new_id)
    })
}

/// Splices a new node of type `model` into an existing connection, so that it
/// becomes the child of the old parent and the parent of the old child.
pub fn insert_on_connection<G>(scene: &mut G, connection: ConnectionId, model: NodeModel) -> Result<NodeId, EditError>
where
    G: GraphView + ?Sized,
{
    let conn = scene
        .connection(connection)
        .ok_or(GraphError::MissingConnection(connection))?;
    editable_node(scene, conn.child)?;
    let probe = GraphNode::new(model.clone(), Point::default(), Size::default());
    if model.is_root() || probe.output_policy().is_none() {
        return Err(EditError::NotAllowed {
            node: conn.child,
            reason: "the inserted type cannot have a child",
        });
    }

    let parent_pos = scene.position(conn.parent).unwrap_or_default();
    let child_pos = scene.position(conn.child).unwrap_or_default();
    let pos = Point::new(
        (parent_pos.x + child_pos.x) / 2.,
        (parent_pos.y + child_pos.y) / 2.,
    );

    batch(scene, |scene| -> Result<NodeId, EditError> {
        scene.disconnect(connection);
        let new_id = scene.create_node(model, pos);
        scene.connect(conn.parent, new_id)?;
        scene.connect(new_id, conn.child)?;
        Ok(new_id)
    })
}

fn check_smart_remove<G>(scene: &G, id: NodeId) -> Result<NodeId, EditError>
where
    G: GraphView + ?Sized,
{
    editable_node(scene, id)?;
    let not_allowed = |reason: &'static str| EditError::NotAllowed { node: id, reason };
    let parent = match scene.incoming(id).as_slice() {
        [conn] => conn.parent,
        _ => return Err(not_allowed("the node must have exactly one parent")),
    };
    let parent_node = scene
        .node(parent)
        .ok_or(GraphError::MissingNode(parent))?;
    let siblings = scene.outgoing(parent).len() - 1;
    let children = scene.outgoing(id).len();
    if !parent_node.accepts_children(siblings + children) {
        return Err(not_allowed("the parent cannot take over the children"));
    }
    Ok(parent)
}

pub fn can_smart_remove<G>(scene: &G, id: NodeId) -> bool
where
    G: GraphView + ?Sized,
{
    check_smart_remove(scene, id).is_ok()
}

/// Removes a node and hands its children over to its parent.
pub fn smart_remove<G>(scene: &mut G, id: NodeId) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    let parent = check_smart_remove(scene, id)?;
    batch(scene, |scene| -> Result<(), EditError> {
        let children = scene.children(id);
        scene.remove_node(id);
        for child in children {
            scene.connect(parent, child)?;
        }
        Ok(())
    })
}

/// Result of [`create_subtree`].
#[derive(Debug, Clone)]
pub struct ExtractedSubtree {
    pub name: String,
    /// The extracted nodes under a fresh synthetic root.
    pub tree: AbstractTree,
    /// The SubTree reference that took the place of the extracted nodes.
    pub node: NodeId,
}

/// Moves the subtree rooted at `id` out of the scene and puts a reference
/// to a new tree `name` in its place.
pub fn create_subtree<G>(scene: &mut G, id: NodeId, name: &str) -> Result<ExtractedSubtree, EditError>
where
    G: GraphView + ?Sized,
{
    editable_node(scene, id)?;
    let body = tree_from_scene(scene, Some(id))?;
    let descendants = scene.descendants(id);

    batch(scene, |scene| -> Result<ExtractedSubtree, EditError> {
        for descendant in descendants {
            scene.remove_node(descendant);
        }
        let node = substitute_node(scene, id, NodeModel::subtree(name))?;
        if let Some(node) = scene.node_mut(node) {
            node.instance_name = name.to_owned();
        }
        debug!("extracted {} nodes into subtree {:?}", body.len(), name);
        Ok(ExtractedSubtree {
            name: name.to_owned(),
            tree: AbstractTree::with_root(AbstractTreeNode::new(NodeModel::root()), &body),
            node,
        })
    })
}

/// The three state changes of a SubTree reference.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SubtreeAction {
    Expand,
    Collapse,
    Refresh,
}

fn subtree_node<G>(scene: &G, id: NodeId) -> Result<&GraphNode, EditError>
where
    G: GraphView + ?Sized,
{
    let node = scene
        .node(id)
        .ok_or(GraphError::MissingNode(id))?;
    if node.model.kind != NodeKind::SubTree {
        return Err(EditError::NotASubtree(id));
    }
    Ok(node)
}

/// The top level node of a referenced tree, which must be single rooted and
/// fit in the scene as it is.
fn subtree_body<'a>(name: &str, tree: Option<&'a AbstractTree>) -> Result<(&'a AbstractTree, usize), EditError> {
    let malformed = |source| EditError::MalformedSubtree {
        name: name.to_owned(),
        source,
    };
    let tree = tree.ok_or_else(|| malformed(TreeError::Empty))?;
    tree.validate().map_err(malformed)?;
    let body = match tree.root() {
        Some(root) if root.model.is_root() => match root.children_index.as_slice() {
            [body] => *body,
            [] => return Err(malformed(TreeError::Empty)),
            _ => return Err(malformed(TreeError::TooManyChildren(root.index))),
        },
        Some(root) => root.index,
        None => return Err(malformed(TreeError::Empty)),
    };
    for node in tree.nodes() {
        let mut probe = GraphNode::new(node.model.clone(), node.pos, node.size);
        probe.subtree = SubtreeState::Expanded;
        if !probe.accepts_children(node.children_index.len()) {
            return Err(malformed(TreeError::TooManyChildren(node.index)));
        }
    }
    Ok((tree, body))
}

fn depth_step(axis: LayoutAxis, size: Size) -> Point {
    let spacing = LayoutConfig::default().level_spacing;
    match axis {
        LayoutAxis::Vertical => Point::new(0., size.height + spacing),
        LayoutAxis::Horizontal => Point::new(size.width + spacing, 0.),
    }
}

fn splice<G>(scene: &mut G, id: NodeId, tree: &AbstractTree, body: usize) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    let (anchor, anchor_size) = match scene.node_mut(id) {
        Some(node) => {
            node.subtree = SubtreeState::Expanded;
            (node.pos, node.size)
        }
        None => return Err(GraphError::MissingNode(id).into()),
    };
    let origin = tree.node(body).map(|node| node.pos).unwrap_or_default();
    let offset = anchor + depth_step(scene.axis(), anchor_size);

    fn recurse<G: GraphView + ?Sized>(
        scene: &mut G,
        tree: &AbstractTree,
        index: usize,
        parent: NodeId,
        place: &dyn Fn(Point) -> Point,
    ) -> Result<(), EditError> {
        let Some(abs_node) = tree.node(index) else {
            return Ok(());
        };
        let new_id = scene.create_node(abs_node.model.clone(), place(abs_node.pos));
        if let Some(node) = scene.node_mut(new_id) {
            node.instance_name = abs_node.instance_name.clone();
            node.ports_mapping = abs_node.ports_mapping.clone();
            if !abs_node.size.is_empty() {
                node.size = abs_node.size;
            }
            node.flags = NodeFlags::LOCKED;
            node.spliced = true;
            if !abs_node.children_index.is_empty() {
                node.subtree = SubtreeState::Expanded;
            }
        }
        let conn = scene.connect(parent, new_id)?;
        scene.set_connection_locked(conn, true);
        for &child in &abs_node.children_index {
            recurse(scene, tree, child, new_id, place)?;
        }
        Ok(())
    }

    recurse(scene, tree, body, id, &|pos| offset + (pos - origin))
}

/// Splices a locked copy of `tree`, the tree the reference names, under the
/// SubTree reference `id`. Refused without any change if `tree` is missing
/// or not a single rooted tree.
pub fn expand_subtree<G>(scene: &mut G, id: NodeId, tree: Option<&AbstractTree>) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    let node = subtree_node(scene, id)?;
    if node.subtree == SubtreeState::Expanded {
        return Ok(());
    }
    let name = node.model.registration_id.clone();
    let (tree, body) = subtree_body(&name, tree).map_err(|err| {
        warn!("{}", err);
        err
    })?;
    batch(scene, |scene| splice(scene, id, tree, body))
}

/// Deletes the spliced body of the SubTree reference `id`.
pub fn collapse_subtree<G>(scene: &mut G, id: NodeId) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    subtree_node(scene, id)?;
    let descendants = scene.descendants(id);
    batch(scene, |scene| {
        for descendant in descendants {
            scene.remove_node(descendant);
        }
        if let Some(node) = scene.node_mut(id) {
            node.subtree = SubtreeState::Collapsed;
        }
    });
    Ok(())
}

/// Collapses and expands again from the current definition in `tree`.
pub fn refresh_subtree<G>(scene: &mut G, id: NodeId, tree: Option<&AbstractTree>) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    let name = subtree_node(scene, id)?.model.registration_id.clone();
    subtree_body(&name, tree).map_err(|err| {
        warn!("{}", err);
        err
    })?;
    batch(scene, |scene| -> Result<(), EditError> {
        collapse_subtree(scene, id)?;
        expand_subtree(scene, id, tree)
    })
}

pub fn apply_subtree_action<G>(
    scene: &mut G,
    id: NodeId,
    action: SubtreeAction,
    tree: Option<&AbstractTree>,
) -> Result<(), EditError>
where
    G: GraphView + ?Sized,
{
    match action {
        SubtreeAction::Expand => expand_subtree(scene, id, tree),
        SubtreeAction::Collapse => collapse_subtree(scene, id),
        SubtreeAction::Refresh => refresh_subtree(scene, id, tree),
    }
}

/// Sets the interactivity of every node and connection of the scene.
///
/// The root stays neither movable nor selectable, and spliced subtree
/// content stays locked whatever `locked` is.
pub fn lock_editing<G>(scene: &mut G, locked: bool)
where
    G: GraphView + ?Sized,
{
    let mut spliced = vec![];
    for id in scene.node_ids() {
        if let Some(node) = scene.node_mut(id) {
            node.flags = if node.model.is_root() {
                NodeFlags::ROOT
            } else if node.spliced || locked {
                NodeFlags::LOCKED
            } else {
                NodeFlags::UNLOCKED
            };
            if node.spliced {
                spliced.push(id);
            }
        }
    }
    for conn in scene.connections() {
        scene.set_connection_locked(conn.id, locked || spliced.contains(&conn.child));
    }
}
