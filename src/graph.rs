//! The editable node graph.
//!
//! [`GraphView`] is the capability set the tree builders, the layout engine and
//! the editing operations need from a graph scene. A GUI implements it on top of
//! its own widgets; [`Scene`] is the in-memory implementation used by the
//! [`crate::Editor`] and by tests.
//!
//! Every behavior tree node has at most one input port (towards its parent) and
//! at most one output port (towards its children). A connection always runs
//! from a parent's output to a child's input.

use crate::{
    error::GraphError,
    geometry::{Point, Size},
    model::{NodeKind, NodeModel},
    tree::PortsMapping,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque handle of a scene node. Never reused within one scene.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub struct ConnectionId(pub u32);

/// Direction the tree grows in.
///
/// `Vertical` puts levels below each other and fans children out along X;
/// `Horizontal` is the transpose.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum LayoutAxis {
    #[default]
    Vertical,
    Horizontal,
}

impl LayoutAxis {
    /// Coordinate siblings are ordered by.
    pub fn principal(self, pos: Point) -> f64 {
        match self {
            Self::Vertical => pos.x,
            Self::Horizontal => pos.y,
        }
    }
}

/// How many connections an output port accepts.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConnectionPolicy {
    One,
    Many,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct NodeFlags {
    pub movable: bool,
    pub selectable: bool,
    pub editable: bool,
}

impl NodeFlags {
    pub const UNLOCKED: Self = Self {
        movable: true,
        selectable: true,
        editable: true,
    };

    pub const LOCKED: Self = Self {
        movable: false,
        selectable: true,
        editable: false,
    };

    /// The root can be neither moved nor selected, locked or not.
    pub const ROOT: Self = Self {
        movable: false,
        selectable: false,
        editable: false,
    };

    pub fn for_model(model: &NodeModel) -> Self {
        if model.is_root() {
            Self::ROOT
        } else {
            Self::UNLOCKED
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum SubtreeState {
    #[default]
    Collapsed,
    Expanded,
}

/// The data a scene keeps for each node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub model: NodeModel,
    pub instance_name: String,
    pub ports_mapping: PortsMapping,
    pub pos: Point,
    pub size: Size,
    pub flags: NodeFlags,
    /// Only meaningful for SubTree references.
    pub subtree: SubtreeState,
    /// Part of an expanded subtree body, never editable.
    pub spliced: bool,
}

impl GraphNode {
    pub fn new(model: NodeModel, pos: Point, size: Size) -> Self {
        Self {
            instance_name: model.registration_id.clone(),
            flags: NodeFlags::for_model(&model),
            model,
            ports_mapping: PortsMapping::new(),
            pos,
            size,
            subtree: SubtreeState::Collapsed,
            spliced: false,
        }
    }

    pub fn has_input(&self) -> bool {
        !self.model.is_root()
    }

    pub fn output_policy(&self) -> Option<ConnectionPolicy> {
        if self.model.is_root() {
            return Some(ConnectionPolicy::One);
        }
        match self.model.kind {
            NodeKind::Root | NodeKind::Decorator => Some(ConnectionPolicy::One),
            NodeKind::Control | NodeKind::Undefined => Some(ConnectionPolicy::Many),
            NodeKind::SubTree => match self.subtree {
                SubtreeState::Expanded => Some(ConnectionPolicy::One),
                SubtreeState::Collapsed => None,
            },
            NodeKind::Action | NodeKind::Condition => None,
        }
    }

    /// Whether the output port could hold `count` children.
    pub fn accepts_children(&self, count: usize) -> bool {
        match self.output_policy() {
            None => count == 0,
            Some(ConnectionPolicy::One) => count <= 1,
            Some(ConnectionPolicy::Many) => true,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub parent: NodeId,
    pub child: NodeId,
    pub locked: bool,
}

/// Structural change notifications.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SceneEvent {
    NodeCreated(NodeId),
    NodeDeleted(NodeId),
    NodeMoved(NodeId),
    ConnectionCreated(ConnectionId),
    ConnectionDeleted(ConnectionId),
    /// Emitted once at the end of a batch that changed anything.
    Batch,
}

pub trait GraphView {
    fn node_ids(&self) -> Vec<NodeId>;

    fn node(&self, id: NodeId) -> Option<&GraphNode>;

    /// Direct access to node data. Changes made through it emit no event.
    fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode>;

    fn connections(&self) -> Vec<Connection>;

    fn create_node(&mut self, model: NodeModel, pos: Point) -> NodeId;

    /// Removes the node together with every connection touching it.
    fn remove_node(&mut self, id: NodeId) -> Option<GraphNode>;

    fn connect(&mut self, parent: NodeId, child: NodeId) -> Result<ConnectionId, GraphError>;

    fn disconnect(&mut self, id: ConnectionId) -> Option<Connection>;

    fn set_connection_locked(&mut self, id: ConnectionId, locked: bool);

    fn set_position(&mut self, id: NodeId, pos: Point);

    fn clear(&mut self);

    fn axis(&self) -> LayoutAxis;

    /// Suppresses change events until the matching [`GraphView::end_batch`].
    /// Batches nest.
    fn begin_batch(&mut self);

    fn end_batch(&mut self);

    fn position(&self, id: NodeId) -> Option<Point> {
        self.node(id).map(|node| node.pos)
    }

    fn size(&self, id: NodeId) -> Option<Size> {
        self.node(id).map(|node| node.size)
    }

    fn set_size(&mut self, id: NodeId, size: Size) {
        if let Some(node) = self.node_mut(id) {
            node.size = size;
        }
    }

    fn connection(&self, id: ConnectionId) -> Option<Connection> {
        self.connections().into_iter().find(|conn| conn.id == id)
    }

    fn incoming(&self, id: NodeId) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|conn| conn.child == id)
            .collect()
    }

    fn outgoing(&self, id: NodeId) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|conn| conn.parent == id)
            .collect()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.incoming(id).first().map(|conn| conn.parent)
    }

    /// Children in on-screen order along the principal axis.
    fn children(&self, id: NodeId) -> Vec<NodeId> {
        let axis = self.axis();
        let mut ret: Vec<_> = self
            .outgoing(id)
            .into_iter()
            .map(|conn| conn.child)
            .collect();
        ret.sort_by(|lhs, rhs| {
            let lhs = self.position(*lhs).map_or(0., |pos| axis.principal(pos));
            let rhs = self.position(*rhs).map_or(0., |pos| axis.principal(pos));
            lhs.total_cmp(&rhs)
        });
        ret
    }

    /// Nodes without an incoming connection.
    fn roots(&self) -> Vec<NodeId> {
        let connections = self.connections();
        self.node_ids()
            .into_iter()
            .filter(|id| connections.iter().all(|conn| conn.child != *id))
            .collect()
    }

    /// Every node below `id`, in pre-order.
    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut ret = vec![];
        let mut stack = self.children(id);
        stack.reverse();
        while let Some(node) = stack.pop() {
            ret.push(node);
            let mut children = self.children(node);
            children.reverse();
            stack.extend(children);
        }
        ret
    }
}

/// Runs `f` inside a batch so listeners observe a single change.
pub fn batch<G, R>(scene: &mut G, f: impl FnOnce(&mut G) -> R) -> R
where
    G: GraphView + ?Sized,
{
    scene.begin_batch();
    let ret = f(scene);
    scene.end_batch();
    ret
}

/// Size given to nodes when nothing better is known.
pub const DEFAULT_NODE_SIZE: Size = Size::new(120., 60.);

/// An in-memory graph scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SceneData", into = "SceneData")]
pub struct Scene {
    nodes: BTreeMap<NodeId, GraphNode>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_node: u32,
    next_connection: u32,
    axis: LayoutAxis,
    node_size: Size,
    batch_depth: usize,
    batch_dirty: bool,
    events: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(LayoutAxis::default())
    }
}

impl Scene {
    pub fn new(axis: LayoutAxis) -> Self {
        Self {
            nodes: BTreeMap::new(),
            connections: BTreeMap::new(),
            next_node: 1,
            next_connection: 1,
            axis,
            node_size: DEFAULT_NODE_SIZE,
            batch_depth: 0,
            batch_dirty: false,
            events: vec![],
        }
    }

    /// Size assigned to newly created nodes.
    pub fn with_node_size(mut self, size: Size) -> Self {
        self.node_size = size;
        self
    }

    pub fn set_axis(&mut self, axis: LayoutAxis) {
        self.axis = axis;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Drains the change notifications collected so far.
    pub fn take_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn find_by_name(&self, instance_name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.instance_name == instance_name)
            .map(|(id, _)| *id)
    }

    fn notify(&mut self, event: SceneEvent) {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
        } else {
            self.events.push(event);
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.connections.values().find(|conn| conn.child == node) {
                Some(conn) => node = conn.parent,
                None => return false,
            }
        }
    }
}

impl GraphView for Scene {
    fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    fn connections(&self) -> Vec<Connection> {
        self.connections.values().copied().collect()
    }

    fn create_node(&mut self, model: NodeModel, pos: Point) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes
            .insert(id, GraphNode::new(model, pos, self.node_size));
        self.notify(SceneEvent::NodeCreated(id));
        id
    }

    fn remove_node(&mut self, id: NodeId) -> Option<GraphNode> {
        let node = self.nodes.remove(&id)?;
        let touching: Vec<_> = self
            .connections
            .values()
            .filter(|conn| conn.parent == id || conn.child == id)
            .map(|conn| conn.id)
            .collect();
        for conn in touching {
            self.disconnect(conn);
        }
        self.notify(SceneEvent::NodeDeleted(id));
        Some(node)
    }

    fn connect(&mut self, parent: NodeId, child: NodeId) -> Result<ConnectionId, GraphError> {
        let parent_node = self.nodes.get(&parent).ok_or(GraphError::MissingNode(parent))?;
        let child_node = self.nodes.get(&child).ok_or(GraphError::MissingNode(child))?;
        if !child_node.has_input() {
            return Err(GraphError::NoInputPort(child));
        }
        let existing = self
            .connections
            .values()
            .filter(|conn| conn.parent == parent)
            .count();
        match parent_node.output_policy() {
            None => return Err(GraphError::NoOutputPort(parent)),
            Some(ConnectionPolicy::One) if existing > 0 => {
                return Err(GraphError::PortOccupied(parent))
            }
            _ => (),
        }
        if self.connections.values().any(|conn| conn.child == child) {
            return Err(GraphError::PortOccupied(child));
        }
        if self.is_ancestor(child, parent) {
            return Err(GraphError::Cycle { parent, child });
        }
        let id = ConnectionId(self.next_connection);
        self.next_connection += 1;
        self.connections.insert(
            id,
            Connection {
                id,
                parent,
                child,
                locked: false,
            },
        );
        self.notify(SceneEvent::ConnectionCreated(id));
        Ok(id)
    }

    fn disconnect(&mut self, id: ConnectionId) -> Option<Connection> {
        let conn = self.connections.remove(&id)?;
        self.notify(SceneEvent::ConnectionDeleted(id));
        Some(conn)
    }

    fn set_connection_locked(&mut self, id: ConnectionId, locked: bool) {
        if let Some(conn) = self.connections.get_mut(&id) {
            conn.locked = locked;
        }
    }

    fn set_position(&mut self, id: NodeId, pos: Point) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.pos = pos;
            self.notify(SceneEvent::NodeMoved(id));
        }
    }

    fn clear(&mut self) {
        let ids = self.node_ids();
        for id in ids {
            self.remove_node(id);
        }
    }

    fn axis(&self) -> LayoutAxis {
        self.axis
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 && std::mem::take(&mut self.batch_dirty) {
            self.events.push(SceneEvent::Batch);
        }
    }
}

/// Serialized form of a [`Scene`]. Batch state and pending events are transient.
#[derive(Serialize, Deserialize)]
struct SceneData {
    axis: LayoutAxis,
    node_size: Size,
    next_node: u32,
    next_connection: u32,
    nodes: Vec<(NodeId, GraphNode)>,
    connections: Vec<Connection>,
}

impl From<Scene> for SceneData {
    fn from(scene: Scene) -> Self {
        Self {
            axis: scene.axis,
            node_size: scene.node_size,
            next_node: scene.next_node,
            next_connection: scene.next_connection,
            nodes: scene.nodes.into_iter().collect(),
            connections: scene.connections.into_values().collect(),
        }
    }
}

impl From<SceneData> for Scene {
    fn from(data: SceneData) -> Self {
        let mut ret = Scene::new(data.axis);
        ret.node_size = data.node_size;
        ret.next_node = data.next_node;
        ret.next_connection = data.next_connection;
        ret.nodes = data.nodes.into_iter().collect();
        ret.connections = data
            .connections
            .into_iter()
            .map(|conn| (conn.id, conn))
            .collect();
        ret
    }
}
