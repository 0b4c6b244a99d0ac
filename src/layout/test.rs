use super::*;
use crate::{
    graph::Scene,
    model::{NodeKind, NodeModel},
    tree::AbstractTreeNode,
};
use proptest::prelude::*;

const W: f64 = 100.;
const H: f64 = 60.;

fn node(id: &str, size: Size) -> AbstractTreeNode {
    AbstractTreeNode::new(NodeModel::new(NodeKind::Control, id)).with_size(size)
}

fn center_x(tree: &AbstractTree, index: usize) -> f64 {
    let node = tree.node(index).unwrap();
    node.pos.x + node.size.width / 2.
}

/// Builds a tree from a parent list, `parents[i - 1]` being the parent of node `i`.
fn tree_from_parents(parents: &[usize], sizes: &[Size]) -> AbstractTree {
    let mut tree = AbstractTree::new();
    tree.add_node(node("n0", sizes[0]));
    for (i, parent) in parents.iter().enumerate() {
        tree.push_child(*parent, node(&format!("n{}", i + 1), sizes[i + 1]));
    }
    tree
}

#[test]
fn test_children_centered_under_parent() {
    let size = Size::new(W, H);
    let mut tree = tree_from_parents(&[0, 0, 0], &[size; 4]);
    layout_tree(&mut tree, LayoutAxis::Vertical, &LayoutConfig::default()).unwrap();

    assert_eq!(tree.nodes()[0].pos, Point::new(0., 0.));
    let xs: Vec<_> = (1..4).map(|i| tree.nodes()[i].pos.x).collect();
    assert_eq!(xs, vec![-140., 0., 140.]);
    assert!(tree.nodes()[1..].iter().all(|node| node.pos.y == H + 80.));
    assert_eq!(center_x(&tree, 0), center_x(&tree, 2));
}

#[test]
fn test_parent_follows_pushed_children() {
    // Root with A and B, each with three children. B's children are pushed
    // right by A's, so B and then the root move right to stay centered.
    let size = Size::new(W, H);
    let mut tree = tree_from_parents(&[0, 0, 1, 1, 1, 2, 2, 2], &[size; 9]);
    layout_tree(&mut tree, LayoutAxis::Vertical, &LayoutConfig::default()).unwrap();

    let a_children: Vec<_> = (3..6).map(|i| tree.nodes()[i].pos.x).collect();
    assert_eq!(a_children, vec![-210., -70., 70.]);
    let b_children: Vec<_> = (6..9).map(|i| tree.nodes()[i].pos.x).collect();
    assert_eq!(b_children, vec![210., 350., 490.]);

    assert_eq!(tree.nodes()[1].pos.x, -70.);
    assert_eq!(tree.nodes()[2].pos.x, 350.);
    assert_eq!(center_x(&tree, 2), center_x(&tree, 7));
    assert_eq!(
        center_x(&tree, 0),
        (center_x(&tree, 1) + center_x(&tree, 2)) / 2.
    );
}

#[test]
fn test_levels_fit_deepest_node() {
    let mut tree = tree_from_parents(
        &[0, 0, 1],
        &[
            Size::new(W, 30.),
            Size::new(W, 120.),
            Size::new(W, 50.),
            Size::new(W, 10.),
        ],
    );
    let config = LayoutConfig {
        level_spacing: 20.,
        node_spacing: 10.,
    };
    layout_tree(&mut tree, LayoutAxis::Vertical, &config).unwrap();
    let ys: Vec<_> = tree.nodes().iter().map(|node| node.pos.y).collect();
    assert_eq!(ys, vec![0., 50., 50., 190.]);
}

#[test]
fn test_horizontal_is_transpose() {
    let sizes = [
        Size::new(W, H),
        Size::new(80., 40.),
        Size::new(120., 70.),
        Size::new(60., 30.),
    ];
    let transposed: Vec<_> = sizes
        .iter()
        .map(|size| Size::new(size.height, size.width))
        .collect();
    let mut vertical = tree_from_parents(&[0, 0, 2], &sizes);
    let mut horizontal = tree_from_parents(&[0, 0, 2], &transposed);
    let config = LayoutConfig::default();
    layout_tree(&mut vertical, LayoutAxis::Vertical, &config).unwrap();
    layout_tree(&mut horizontal, LayoutAxis::Horizontal, &config).unwrap();

    for (v, h) in vertical.nodes().iter().zip(horizontal.nodes()) {
        assert_eq!(v.pos, Point::new(h.pos.y, h.pos.x));
    }
}

#[test]
fn test_invalid_tree_is_refused() {
    let mut tree = tree_from_parents(&[0], &[Size::new(W, H); 2]);
    tree.add_child(1, 0);
    assert_eq!(
        layout_tree(&mut tree, LayoutAxis::Vertical, &LayoutConfig::default()),
        Err(TreeError::RootHasParent)
    );
    assert_eq!(
        layout_tree(&mut AbstractTree::new(), LayoutAxis::Vertical, &LayoutConfig::default()),
        Ok(())
    );
}

#[test]
fn test_reorder_scene() {
    let mut scene = Scene::default();
    let root = scene.create_node(NodeModel::root(), Point::new(500., 500.));
    let seq = scene.create_node(NodeModel::new(NodeKind::Control, "Sequence"), Point::new(3., 900.));
    let a = scene.create_node(NodeModel::new(NodeKind::Action, "A"), Point::new(-50., 10.));
    let b = scene.create_node(NodeModel::new(NodeKind::Action, "B"), Point::new(70., 10.));
    scene.connect(root, seq).unwrap();
    scene.connect(seq, a).unwrap();
    scene.connect(seq, b).unwrap();
    scene.take_events();

    let tree = reorder_scene(&mut scene, &LayoutConfig::default()).unwrap();
    assert_eq!(scene.take_events(), vec![crate::graph::SceneEvent::Batch]);
    assert_eq!(scene.position(root), Some(Point::new(0., 0.)));
    assert_eq!(scene.position(seq), Some(Point::new(0., 140.)));
    assert_eq!(scene.position(a), Some(Point::new(-80., 280.)));
    assert_eq!(scene.position(b), Some(Point::new(80., 280.)));
    assert_eq!(tree.len(), 4);

    // Already in place: nothing moves, nothing is reported
    reorder_scene(&mut scene, &LayoutConfig::default()).unwrap();
    assert!(scene.take_events().is_empty());

    scene.create_node(NodeModel::new(NodeKind::Action, "Loose"), Point::default());
    assert!(matches!(
        reorder_scene(&mut scene, &LayoutConfig::default()),
        Err(EditError::Build(_))
    ));
}

fn arb_tree() -> impl Strategy<Value = AbstractTree> {
    prop::collection::vec((any::<usize>(), 10.0f64..200., 10.0f64..120.), 1..40).prop_map(
        |nodes| {
            let sizes: Vec<_> = nodes
                .iter()
                .map(|(_, width, height)| Size::new(*width, *height))
                .collect();
            let parents: Vec<_> = nodes
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, (seed, _, _))| seed % i)
                .collect();
            tree_from_parents(&parents, &sizes)
        },
    )
}

proptest! {
    #[test]
    fn layout_is_deterministic(tree in arb_tree(), horizontal in any::<bool>()) {
        let axis = if horizontal { LayoutAxis::Horizontal } else { LayoutAxis::Vertical };
        let config = LayoutConfig::default();
        let mut first = tree.clone();
        layout_tree(&mut first, axis, &config).unwrap();
        let mut second = first.clone();
        layout_tree(&mut second, axis, &config).unwrap();
        for (lhs, rhs) in first.nodes().iter().zip(second.nodes()) {
            prop_assert_eq!(lhs.pos, rhs.pos);
        }
    }

    #[test]
    fn layout_does_not_overlap(tree in arb_tree()) {
        let config = LayoutConfig::default();
        let mut tree = tree;
        layout_tree(&mut tree, LayoutAxis::Vertical, &config).unwrap();
        let levels = tree.levels();

        for level in &levels {
            for pair in level.windows(2) {
                let left = tree.node(pair[0]).unwrap();
                let right = tree.node(pair[1]).unwrap();
                prop_assert!(
                    right.pos.x >= left.pos.x + left.size.width + config.node_spacing - 1e-9,
                    "{:?} overlaps {:?}", left.pos, right.pos
                );
            }
        }

        for pair in levels.windows(2) {
            let upper_bottom = pair[0]
                .iter()
                .map(|index| {
                    let node = tree.node(*index).unwrap();
                    node.pos.y + node.size.height
                })
                .fold(f64::MIN, f64::max);
            for index in &pair[1] {
                prop_assert!(tree.node(*index).unwrap().pos.y >= upper_bottom);
            }
        }
    }
}
