//! # behavior-tree-editor (Rust crate)
//!
//! The model behind a visual behavior tree editor: tree files, node graphs,
//! layout and structural edits, without any GUI.
//!
//!
//! ## Overview
//!
//! A behavior tree lives in three forms while it is being edited:
//!
//! * a tree file in the XML format of [BehaviorTreeCPP](https://github.com/BehaviorTree/BehaviorTree.CPP.git),
//! * a node graph the user edits, shown through the [`GraphView`] trait,
//! * the serialized form a running game reports back for monitoring.
//!
//! Every conversion between them goes through an [`AbstractTree`], a flat
//! vector of nodes that refer to their children by index. Node 0 is the root.
//!
//!
//! ## How it looks like
//!
//! Load a tree file. Node types not known to the [`Registry`] are inferred
//! from the file.
//!
//! ```rust
//! # use behavior_tree_editor::*;
//! let source = r#"
//! <root>
//!     <BehaviorTree ID="Main">
//!         <Sequence>
//!             <OpenDoor/>
//!             <WalkTo target="kitchen"/>
//!         </Sequence>
//!     </BehaviorTree>
//! </root>"#;
//! let document = load_document(source, &Registry::default()).unwrap();
//! let tree = document.tree("Main").unwrap();
//! assert_eq!(tree.len(), 4);
//! assert_eq!(tree.nodes()[3].ports_mapping["target"], "kitchen");
//! ```
//!
//! Show it in a scene and lay it out. Children are centered under their
//! parent and every level gets its own band.
//!
//! ```rust
//! # use behavior_tree_editor::*;
//! # let source = r#"<root><BehaviorTree ID="Main"><Sequence><OpenDoor/><WalkTo/></Sequence></BehaviorTree></root>"#;
//! # let document = load_document(source, &Registry::default()).unwrap();
//! let mut tree = document.tree("Main").unwrap().clone();
//! let mut scene = Scene::default();
//! scene_from_tree(&mut tree, &mut scene).unwrap();
//! reorder_scene(&mut scene, &LayoutConfig::default()).unwrap();
//!
//! let open = scene.find_by_name("OpenDoor").unwrap();
//! let walk = scene.find_by_name("WalkTo").unwrap();
//! assert!(scene.position(open).unwrap().x < scene.position(walk).unwrap().x);
//! ```
//!
//! Edits work on anything implementing [`GraphView`] and notify once per
//! operation.
//!
//! ```rust
//! # use behavior_tree_editor::*;
//! # let mut scene = Scene::default();
//! # let root = scene.create_node(NodeModel::root(), Point::default());
//! # let open = scene.create_node(NodeModel::new(NodeKind::Action, "OpenDoor"), Point::default());
//! # scene.connect(root, open).unwrap();
//! let inverter = Registry::default().get("Inverter").unwrap().clone();
//! let connection = scene.incoming(open)[0].id;
//! insert_on_connection(&mut scene, connection, inverter).unwrap();
//! assert_eq!(tree_from_scene(&scene, None).unwrap().len(), 3);
//! ```
//!
//! The [`Editor`] keeps one scene per tree of a file, and an undo history of
//! snapshots of all of them.
//!
//! ```rust
//! # use behavior_tree_editor::*;
//! let mut editor = Editor::default();
//! editor.load_xml(r#"<root><BehaviorTree ID="Main"><Sequence><OpenDoor/></Sequence></BehaviorTree></root>"#).unwrap();
//! let seq = editor.tab("Main").unwrap().find_by_name("Sequence").unwrap();
//!
//! let scene = editor.tab_mut("Main").unwrap();
//! let walk = scene.create_node(NodeModel::new(NodeKind::Action, "WalkTo"), Point::new(300., 200.));
//! scene.connect(seq, walk).unwrap();
//! editor.commit().unwrap();
//!
//! editor.undo().unwrap();
//! assert_eq!(editor.tree("Main").unwrap().len(), 3);
//! ```
//!
//!
//! ## Subtrees
//!
//! A `SubTree` node stands for another tree of the same file. It can be
//! expanded in place, showing a locked copy of that tree, and collapsed again.
//! The body of an expanded reference is never written back to the file.

mod binary;
mod blackboard;
mod builder;
mod config;
mod editing;
mod editor;
pub mod error;
mod geometry;
mod graph;
mod layout;
mod model;
pub mod parser;
mod port;
mod registry;
mod tree;
mod undo;

pub use crate::{
    binary::{
        apply_status_changes, tree_from_serialized, SerializedNode, SerializedNodeModel,
        SerializedPort, SerializedTree, UidMap,
    },
    blackboard::BlackboardProperty,
    builder::{scene_from_tree, tree_from_scene},
    config::EditorConfig,
    editing::{
        apply_subtree_action, can_smart_remove, can_substitute, collapse_subtree, create_subtree,
        expand_subtree, insert_on_connection, lock_editing, refresh_subtree, smart_remove,
        substitute_node, ExtractedSubtree, SubtreeAction,
    },
    editor::{Editor, Tabs},
    geometry::{Point, Rect, Size},
    graph::{
        batch, Connection, ConnectionId, ConnectionPolicy, GraphNode, GraphView, LayoutAxis,
        NodeFlags, NodeId, Scene, SceneEvent, SubtreeState, DEFAULT_NODE_SIZE,
    },
    layout::{apply_layout, layout_tree, reorder_scene, LayoutConfig},
    model::{NodeKind, NodeModel, NodeModels, BUILTIN_CATEGORY, ROOT_ID},
    parser::{load_document, write_document, TreeDocument},
    port::{PortModel, PortType},
    registry::{builtin_models, Registry},
    tree::{AbstractTree, AbstractTreeNode, NodeStatus, PortsMapping},
    undo::{SavedState, UndoStack, ViewState},
};
