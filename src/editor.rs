//! Session state of the editor: one scene per open tree, the main tree, the
//! declared blackboard and the undo history.

use crate::{
    binary::{tree_from_serialized, SerializedTree, UidMap},
    blackboard::BlackboardProperty,
    builder::{scene_from_tree, tree_from_scene},
    config::EditorConfig,
    editing::{self, SubtreeAction},
    error::{EditError, EditorError},
    geometry::Point,
    graph::{batch, GraphView, NodeId, Scene},
    layout::{apply_layout, layout_tree, reorder_scene},
    model::{NodeKind, NodeModel},
    parser::{load_document, write_document, TreeDocument},
    tree::AbstractTree,
    undo::{SavedState, UndoStack, ViewState},
    Registry,
};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub type Tabs = BTreeMap<String, Scene>;

#[derive(Debug)]
pub struct Editor {
    registry: Registry,
    config: EditorConfig,
    tabs: Tabs,
    main_tree: Option<String>,
    current_tab: Option<String>,
    view: ViewState,
    blackboard: Vec<BlackboardProperty>,
    undo: UndoStack,
    locked: bool,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Registry::default(), EditorConfig::default())
    }
}

fn saved_state(
    tabs: &Tabs,
    main_tree: &Option<String>,
    current_tab: &Option<String>,
    view: ViewState,
) -> Result<SavedState, EditorError> {
    let tabs = tabs
        .iter()
        .map(|(name, scene)| serde_yaml::to_string(scene).map(|blob| (name.clone(), blob)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    Ok(SavedState {
        tabs,
        main_tree: main_tree.clone(),
        current_tab: current_tab.clone(),
        view,
    })
}

/// Copy of `tree` without the spliced bodies of expanded SubTree references.
fn without_subtree_bodies(tree: &AbstractTree) -> AbstractTree {
    fn copy(src: &AbstractTree, index: usize, dst: &mut AbstractTree) -> Option<usize> {
        let node = src.node(index)?;
        let mut copied = node.clone();
        copied.children_index.clear();
        let new_index = dst.add_node(copied);
        if node.model.kind != NodeKind::SubTree {
            for &child in &node.children_index {
                if let Some(new_child) = copy(src, child, dst) {
                    dst.add_child(new_index, new_child);
                }
            }
        }
        Some(new_index)
    }

    let mut ret = AbstractTree::new();
    copy(tree, 0, &mut ret);
    ret
}

impl Editor {
    pub fn new(registry: Registry, config: EditorConfig) -> Self {
        Self {
            registry,
            config,
            tabs: Tabs::new(),
            main_tree: None,
            current_tab: None,
            view: ViewState::default(),
            blackboard: vec![],
            undo: UndoStack::new(),
            locked: false,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tab_names(&self) -> impl Iterator<Item = &str> {
        self.tabs.keys().map(String::as_str)
    }

    pub fn tab(&self, name: &str) -> Option<&Scene> {
        self.tabs.get(name)
    }

    /// Scene of an open tree for direct editing. Call [`Editor::commit`]
    /// once the change is complete.
    pub fn tab_mut(&mut self, name: &str) -> Result<&mut Scene, EditorError> {
        self.tabs
            .get_mut(name)
            .ok_or_else(|| EditorError::MissingTab(name.to_owned()))
    }

    pub fn main_tree(&self) -> Option<&str> {
        self.main_tree.as_deref()
    }

    pub fn set_main_tree(&mut self, name: &str) -> Result<(), EditorError> {
        if !self.tabs.contains_key(name) {
            return Err(EditorError::MissingTab(name.to_owned()));
        }
        self.main_tree = Some(name.to_owned());
        Ok(())
    }

    pub fn current_tab(&self) -> Option<&str> {
        self.current_tab.as_deref()
    }

    pub fn set_current_tab(&mut self, name: &str) -> Result<(), EditorError> {
        if !self.tabs.contains_key(name) {
            return Err(EditorError::MissingTab(name.to_owned()));
        }
        self.current_tab = Some(name.to_owned());
        Ok(())
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn set_view(&mut self, view: ViewState) {
        self.view = view;
    }

    pub fn blackboard(&self) -> &[BlackboardProperty] {
        &self.blackboard
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn new_scene(&self) -> Scene {
        Scene::new(self.config.axis).with_node_size(self.config.node_size)
    }

    /// A laid out scene showing `tree`.
    fn build_scene(&self, tree: &mut AbstractTree) -> Result<Scene, EditorError> {
        let mut scene = self.new_scene();
        scene_from_tree(tree, &mut scene)?;
        layout_tree(tree, self.config.axis, &self.config.layout).map_err(EditError::from)?;
        apply_layout(tree, &mut scene);
        if self.locked {
            editing::lock_editing(&mut scene, true);
        }
        scene.take_events();
        Ok(scene)
    }

    /// Opens an empty tree holding only its root node.
    pub fn create_tab(&mut self, name: &str) -> Result<&mut Scene, EditorError> {
        if self.tabs.contains_key(name) {
            return Err(EditorError::DuplicateTab(name.to_owned()));
        }
        let mut scene = self.new_scene();
        scene.create_node(NodeModel::root(), Point::default());
        if self.locked {
            editing::lock_editing(&mut scene, true);
        }
        scene.take_events();
        if self.current_tab.is_none() {
            self.current_tab = Some(name.to_owned());
        }
        Ok(self.tabs.entry(name.to_owned()).or_insert(scene))
    }

    /// Replaces every open tree with the content of a tree file and returns
    /// the warnings found while loading.
    ///
    /// The file is completely converted before anything is replaced, so on
    /// error the editor keeps its previous state.
    pub fn load_xml(&mut self, source: &str) -> Result<Vec<String>, EditorError> {
        let document = load_document(source, &self.registry)?;

        let mut tabs = Tabs::new();
        for (name, tree) in &document.trees {
            let mut tree = tree.clone();
            let scene = self.build_scene(&mut tree)?;
            tabs.insert(name.clone(), scene);
        }
        let main_tree = document.main_tree.clone();
        let current_tab = document
            .main_tree_name()
            .or_else(|| document.trees.first().map(|(name, _)| name.as_str()))
            .map(str::to_owned);
        let view = ViewState::default();
        let state = saved_state(&tabs, &main_tree, &current_tab, view)?;

        self.registry.merge(document.custom_models.into_values());
        for (name, _) in &document.trees {
            self.registry.register(NodeModel::subtree(name));
        }
        self.tabs = tabs;
        self.main_tree = main_tree;
        self.current_tab = current_tab;
        self.view = view;
        self.blackboard = document.blackboard;
        self.undo.reset(state);

        for warning in &document.warnings {
            warn!("{}", warning);
        }
        info!("opened {} tree(s)", self.tabs.len());
        Ok(document.warnings)
    }

    /// Writes every open tree as a tree file.
    ///
    /// Refused if any tree does not have exactly one root. Expanded SubTree
    /// references are written collapsed.
    pub fn save_xml(&self) -> Result<String, EditorError> {
        let mut document = TreeDocument {
            main_tree: self.main_tree.clone(),
            blackboard: self.blackboard.clone(),
            ..TreeDocument::default()
        };
        for (name, scene) in &self.tabs {
            let tree = tree_from_scene(scene, None).map_err(|err| {
                warn!("cannot save tree {:?}: {}", name, err);
                err
            })?;
            document
                .trees
                .push((name.clone(), without_subtree_bodies(&tree)));
        }
        let ret = write_document(&document, &self.registry);
        info!("saved {} tree(s)", document.trees.len());
        Ok(ret)
    }

    /// Opens the serialized form of a running tree in its own tab, replacing
    /// a tab of the same name. Returns the tree, linked to the new scene
    /// nodes, and its uid map for status updates.
    pub fn load_serialized(&mut self, bytes: &[u8]) -> Result<(AbstractTree, UidMap), EditorError> {
        let serialized = SerializedTree::from_bytes(bytes)?;
        let (mut tree, uid_map) = tree_from_serialized(&serialized)?;
        let scene = self.build_scene(&mut tree)?;

        for node in tree.nodes() {
            if !self.registry.contains(&node.model.registration_id) {
                self.registry.register(node.model.clone());
            }
        }
        self.tabs.insert(serialized.name.clone(), scene);
        self.current_tab = Some(serialized.name);
        self.commit()?;
        Ok((tree, uid_map))
    }

    pub fn snapshot(&self) -> Result<SavedState, EditorError> {
        saved_state(&self.tabs, &self.main_tree, &self.current_tab, self.view)
    }

    /// Replaces every open tree by the content of `state`. Nothing changes if
    /// any tab fails to decode.
    pub fn restore(&mut self, state: &SavedState) -> Result<(), EditorError> {
        let mut tabs = state
            .tabs
            .iter()
            .map(|(name, blob)| serde_yaml::from_str::<Scene>(blob).map(|scene| (name.clone(), scene)))
            .collect::<Result<Tabs, _>>()?;
        if self.locked {
            for scene in tabs.values_mut() {
                editing::lock_editing(scene, true);
            }
        }
        self.tabs = tabs;
        self.main_tree = state.main_tree.clone();
        self.current_tab = state.current_tab.clone();
        self.view = state.view;
        Ok(())
    }

    /// Records the current state in the undo history. Pending scene
    /// notifications are consumed. Returns `false` if nothing changed.
    pub fn commit(&mut self) -> Result<bool, EditorError> {
        for scene in self.tabs.values_mut() {
            scene.take_events();
        }
        let state = self.snapshot()?;
        Ok(self.undo.push(state))
    }

    /// Commits if any open scene reported a change since the last commit.
    pub fn on_scene_changed(&mut self) -> Result<bool, EditorError> {
        let changed = self
            .tabs
            .values_mut()
            .fold(false, |changed, scene| !scene.take_events().is_empty() || changed);
        if !changed {
            return Ok(false);
        }
        self.commit()
    }

    /// Steps back one change. The history only moves if the state could be
    /// restored.
    pub fn undo(&mut self) -> Result<bool, EditorError> {
        let Some(state) = self.undo.peek_undo().cloned() else {
            return Ok(false);
        };
        self.restore(&state)?;
        self.undo.undo();
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EditorError> {
        let Some(state) = self.undo.peek_redo().cloned() else {
            return Ok(false);
        };
        self.restore(&state)?;
        self.undo.redo();
        Ok(true)
    }

    /// Lays out the tree of tab `name` again.
    pub fn reorder(&mut self, name: &str) -> Result<(), EditorError> {
        let layout = self.config.layout;
        reorder_scene(self.tab_mut(name)?, &layout)?;
        self.commit()?;
        Ok(())
    }

    /// Moves the subtree under `node` of tab `name` into a new tree
    /// `subtree_name`, opened in its own tab. Returns the SubTree reference
    /// left in its place.
    pub fn create_subtree(&mut self, name: &str, node: NodeId, subtree_name: &str) -> Result<NodeId, EditorError> {
        if self.tabs.contains_key(subtree_name) || self.registry.contains(subtree_name) {
            return Err(EditorError::DuplicateTab(subtree_name.to_owned()));
        }
        let extracted = editing::create_subtree(self.tab_mut(name)?, node, subtree_name)?;
        let mut tree = extracted.tree;
        let scene = self.build_scene(&mut tree)?;
        self.registry.register(NodeModel::subtree(subtree_name));
        if self.main_tree.is_none() {
            self.main_tree = Some(name.to_owned());
        }
        self.tabs.insert(subtree_name.to_owned(), scene);
        self.commit()?;
        Ok(extracted.node)
    }

    /// Expands, collapses or refreshes the SubTree reference `node` of tab
    /// `name` from the tab of the tree it references.
    pub fn subtree_action(&mut self, name: &str, node: NodeId, action: SubtreeAction) -> Result<(), EditorError> {
        let scene = self
            .tab(name)
            .ok_or_else(|| EditorError::MissingTab(name.to_owned()))?;
        let definition = scene
            .node(node)
            .and_then(|node| self.tabs.get(&node.model.registration_id))
            .and_then(|referenced| tree_from_scene(referenced, None).ok());
        editing::apply_subtree_action(self.tab_mut(name)?, node, action, definition.as_ref())?;
        self.commit()?;
        Ok(())
    }

    /// Locks or unlocks every open tree.
    pub fn lock_editing(&mut self, locked: bool) {
        self.locked = locked;
        for scene in self.tabs.values_mut() {
            editing::lock_editing(scene, locked);
        }
    }

    fn model_uses(&self, id: &str) -> Vec<(String, NodeId)> {
        self.tabs
            .iter()
            .flat_map(|(name, scene)| {
                scene
                    .node_ids()
                    .into_iter()
                    .filter(move |node| {
                        scene
                            .node(*node)
                            .map_or(false, |node| node.model.registration_id == id)
                    })
                    .map(move |node| (name.clone(), node))
            })
            .collect()
    }

    /// Unregisters the custom model `id`.
    ///
    /// If nodes of that type are placed in any tree the removal needs
    /// `confirmed`, and deletes those nodes. Their children move up to the
    /// parent where it can take them, otherwise they are left unconnected.
    /// Returns how many nodes were deleted.
    pub fn remove_model(&mut self, id: &str, confirmed: bool) -> Result<usize, EditorError> {
        if self.registry.is_builtin(id) || self.registry.get(id).map_or(false, NodeModel::is_root) {
            return Err(EditorError::BuiltinModel(id.to_owned()));
        }
        if !self.registry.contains(id) {
            return Err(EditorError::UnknownModel(id.to_owned()));
        }
        let uses = self.model_uses(id);
        if !uses.is_empty() && !confirmed {
            return Err(EditorError::ModelInUse {
                id: id.to_owned(),
                count: uses.len(),
            });
        }

        for (name, node) in &uses {
            if let Some(scene) = self.tabs.get_mut(name) {
                batch(scene, |scene| -> Result<(), EditError> {
                    if editing::can_smart_remove(scene, *node) {
                        editing::smart_remove(scene, *node)
                    } else {
                        scene.remove_node(*node);
                        Ok(())
                    }
                })?;
            }
        }
        self.registry.remove(id);
        if !uses.is_empty() {
            self.commit()?;
        }
        info!("removed model {:?} and {} node(s)", id, uses.len());
        Ok(uses.len())
    }

    /// The tree shown in tab `name`.
    pub fn tree(&self, name: &str) -> Result<AbstractTree, EditorError> {
        let scene = self
            .tab(name)
            .ok_or_else(|| EditorError::MissingTab(name.to_owned()))?;
        Ok(tree_from_scene(scene, None)?)
    }
}
