//! Conversions between a graph scene and an [`AbstractTree`].

use crate::{
    error::{BuildError, GraphError},
    graph::{batch, GraphView, NodeId},
    tree::{AbstractTree, AbstractTreeNode},
};
use tracing::debug;

/// Builds an abstract tree from the scene.
///
/// Without `root_override` the scene must have exactly one node without an
/// incoming connection. Children are ordered by their on-screen position
/// along the scene's principal axis, which is what makes the serialized
/// order match what the user sees.
pub fn tree_from_scene<G>(scene: &G, root_override: Option<NodeId>) -> Result<AbstractTree, BuildError>
where
    G: GraphView + ?Sized,
{
    let root = match root_override {
        Some(root) => {
            scene.node(root).ok_or(BuildError::MissingNode(root))?;
            root
        }
        None => match scene.roots().as_slice() {
            [root] => *root,
            roots => return Err(BuildError::RootCount(roots.len())),
        },
    };

    let mut tree = AbstractTree::new();
    push_recurse(scene, root, &mut tree)?;
    debug!("built tree of {} nodes from scene", tree.len());
    Ok(tree)
}

fn push_recurse<G>(scene: &G, id: NodeId, tree: &mut AbstractTree) -> Result<usize, BuildError>
where
    G: GraphView + ?Sized,
{
    let node = scene.node(id).ok_or(BuildError::MissingNode(id))?;
    let mut abs_node = AbstractTreeNode::new(node.model.clone()).with_name(&node.instance_name);
    abs_node.ports_mapping = node.ports_mapping.clone();
    abs_node.size = node.size;
    abs_node.pos = node.pos;
    abs_node.graphic_node = Some(id);
    let index = tree.add_node(abs_node);

    for child in scene.children(id) {
        let child_index = push_recurse(scene, child, tree)?;
        tree.add_child(index, child_index);
    }
    Ok(index)
}

/// Replaces the content of the scene with one node per tree node.
///
/// Every tree node records the handle of the node created for it. Nodes
/// keep their tree position; a tree node with an empty size takes the size
/// the scene assigned, so the tree can be laid out afterwards.
pub fn scene_from_tree<G>(tree: &mut AbstractTree, scene: &mut G) -> Result<(), GraphError>
where
    G: GraphView + ?Sized,
{
    batch(scene, |scene| -> Result<(), GraphError> {
        scene.clear();
        for node in tree.nodes_mut() {
            let id = scene.create_node(node.model.clone(), node.pos);
            if let Some(graph_node) = scene.node_mut(id) {
                graph_node.instance_name = node.instance_name.clone();
                graph_node.ports_mapping = node.ports_mapping.clone();
                if node.size.is_empty() {
                    node.size = graph_node.size;
                } else {
                    graph_node.size = node.size;
                }
            }
            node.graphic_node = Some(id);
        }

        for node in tree.nodes() {
            let Some(parent) = node.graphic_node else { continue };
            for child in tree.children(node.index) {
                if let Some(child) = child.graphic_node {
                    scene.connect(parent, child)?;
                }
            }
        }
        debug!("built scene of {} nodes from tree", tree.len());
        Ok(())
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{Point, Size},
        graph::Scene,
        model::{NodeKind, NodeModel},
    };

    fn action(id: &str) -> NodeModel {
        NodeModel::new(NodeKind::Action, id)
    }

    #[test]
    fn test_children_ordered_by_screen_position() {
        let mut scene = Scene::default();
        let a = scene.create_node(NodeModel::new(NodeKind::Control, "A"), Point::new(0., 0.));
        let b = scene.create_node(action("B"), Point::new(-100., 100.));
        let c = scene.create_node(action("C"), Point::new(100., 100.));
        scene.connect(a, c).unwrap();
        scene.connect(a, b).unwrap();

        let tree = tree_from_scene(&scene, None).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.nodes()[0].graphic_node, Some(a));
        let order: Vec<_> = tree.children(0).map(|n| n.instance_name.as_str()).collect();
        assert_eq!(order, vec!["B", "C"]);

        scene.set_position(b, Point::new(300., 100.));
        let tree = tree_from_scene(&scene, None).unwrap();
        let order: Vec<_> = tree.children(0).map(|n| n.instance_name.as_str()).collect();
        assert_eq!(order, vec!["C", "B"]);
    }

    #[test]
    fn test_root_count() {
        let mut scene = Scene::default();
        assert_eq!(tree_from_scene(&scene, None), Err(BuildError::RootCount(0)));

        let a = scene.create_node(NodeModel::new(NodeKind::Control, "A"), Point::default());
        scene.create_node(action("B"), Point::default());
        assert_eq!(tree_from_scene(&scene, None), Err(BuildError::RootCount(2)));

        let sub = tree_from_scene(&scene, Some(a)).unwrap();
        assert_eq!(sub.len(), 1);
    }

    #[test]
    fn test_scene_from_tree_round_trip() {
        let mut tree = AbstractTree::new();
        let root = tree.add_node(AbstractTreeNode::new(NodeModel::root()));
        let seq = tree.push_child(
            root,
            AbstractTreeNode::new(NodeModel::new(NodeKind::Control, "Sequence")),
        );
        tree.push_child(
            seq,
            AbstractTreeNode::new(action("Say"))
                .with_name("hello")
                .with_port("text", "hi")
                .with_size(Size::new(200., 40.)),
        );

        let mut scene = Scene::default();
        scene_from_tree(&mut tree, &mut scene).unwrap();
        assert_eq!(scene.len(), 3);
        assert!(tree.nodes().iter().all(|node| node.graphic_node.is_some()));
        assert_eq!(tree.nodes()[1].size, crate::graph::DEFAULT_NODE_SIZE);

        let say = tree.nodes()[2].graphic_node.unwrap();
        assert_eq!(scene.node(say).unwrap().size, Size::new(200., 40.));

        let rebuilt = tree_from_scene(&scene, None).unwrap();
        assert_eq!(rebuilt, tree);
        assert_eq!(rebuilt.nodes()[2].ports_mapping, tree.nodes()[2].ports_mapping);
    }
}
