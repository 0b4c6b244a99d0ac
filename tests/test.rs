use behavior_tree_editor::{
    load_document, parser::canonicalize, scene_from_tree, tree_from_scene, write_document, Editor,
    GraphView, LayoutConfig, NodeKind, NodeModel, Point, Registry, Scene,
};
use proptest::prelude::*;

const CONCRETE: &str = r#"<root><BehaviorTree ID="Main"><Sequence><Action1/><Action2 foo="bar"/></Sequence></BehaviorTree></root>"#;

#[test]
fn test_bare_tag_document() -> anyhow::Result<()> {
    let registry = Registry::default();
    let document = load_document(CONCRETE, &registry)?;
    let tree = document.tree("Main").unwrap();
    assert_eq!(tree.len(), 4);
    let names: Vec<_> = tree
        .nodes()
        .iter()
        .map(|node| node.instance_name.as_str())
        .collect();
    assert_eq!(names, vec!["Root", "Sequence", "Action1", "Action2"]);
    assert_eq!(tree.nodes()[3].ports_mapping.get("foo").map(String::as_str), Some("bar"));

    assert_eq!(write_document(&document, &registry), canonicalize(CONCRETE)?);
    Ok(())
}

#[test]
fn test_children_follow_screen_order() -> anyhow::Result<()> {
    let mut scene = Scene::default();
    let a = scene.create_node(NodeModel::new(NodeKind::Control, "A"), Point::new(0., 0.));
    let b = scene.create_node(NodeModel::new(NodeKind::Action, "B"), Point::new(-100., 100.));
    let c = scene.create_node(NodeModel::new(NodeKind::Action, "C"), Point::new(100., 100.));
    scene.connect(a, b)?;
    scene.connect(a, c)?;

    let tree = tree_from_scene(&scene, None)?;
    assert_eq!(tree.nodes()[0].children_index, vec![1, 2]);
    assert_eq!(tree.nodes()[1].instance_name, "B");

    scene.set_position(b, Point::new(100., 100.));
    scene.set_position(c, Point::new(-100., 100.));
    let tree = tree_from_scene(&scene, None)?;
    assert_eq!(tree.nodes()[1].instance_name, "C");
    assert_eq!(tree.nodes()[2].instance_name, "B");
    Ok(())
}

#[test]
fn test_scene_without_single_root() {
    let mut scene = Scene::default();
    assert!(tree_from_scene(&scene, None).is_err());
    scene.create_node(NodeModel::new(NodeKind::Action, "A"), Point::default());
    scene.create_node(NodeModel::new(NodeKind::Action, "B"), Point::default());
    assert!(tree_from_scene(&scene, None).is_err());
}

const PATROL: &str = r#"<?xml version="1.0"?>
<!-- guard behavior -->
<root main_tree_to_execute="Patrol">
    <BehaviorTree ID="Patrol">
        <ReactiveFallback name="guard">
            <Sequence name="chase">
                <Condition ID="SeesEnemy" range="{sight}"/>
                <Action ID="MoveTo" target="{enemy}" speed="fast"/>
            </Sequence>
            <Repeat num_cycles="3">
                <SubTree ID="Walk"/>
            </Repeat>
        </ReactiveFallback>
    </BehaviorTree>
    <BehaviorTree ID="Walk">
        <Sequence>
            <Action ID="MoveTo" name="next waypoint" target="{waypoint}"/>
            <Wait seconds="2"/>
        </Sequence>
    </BehaviorTree>
    <TreeNodesModel>
        <Condition ID="SeesEnemy">
            <input_port name="range" type="double" default="10">How far to look</input_port>
        </Condition>
        <Action ID="MoveTo">
            <input_port name="target" type="Vector3"/>
            <input_port name="speed" type="std::string" default="walk"/>
        </Action>
    </TreeNodesModel>
    <Blackboard>
        <Property name="sight" type="double" default="15" order="0"/>
        <Property name="enemy" type="Vector3" order="1"/>
    </Blackboard>
</root>"#;

#[test]
fn test_round_trip_through_scene() -> anyhow::Result<()> {
    let registry = Registry::default();
    let document = load_document(PATROL, &registry)?;
    assert_eq!(document.trees.len(), 2);
    assert_eq!(document.blackboard.len(), 2);

    // Through a scene and back, without any layout
    let mut rebuilt = document.clone();
    for (_, tree) in &mut rebuilt.trees {
        let mut scene = Scene::default();
        scene_from_tree(tree, &mut scene)?;
        *tree = tree_from_scene(&scene, None)?;
    }
    let written = write_document(&rebuilt, &registry);

    let reloaded = load_document(&written, &registry)?;
    for ((name, before), (reloaded_name, after)) in document.trees.iter().zip(&reloaded.trees) {
        assert_eq!(name, reloaded_name);
        assert_eq!(before.len(), after.len());
        for (lhs, rhs) in before.nodes().iter().zip(after.nodes()) {
            assert_eq!(lhs.model, rhs.model);
            assert_eq!(lhs.instance_name, rhs.instance_name);
            assert_eq!(lhs.ports_mapping, rhs.ports_mapping);
            assert_eq!(lhs.children_index, rhs.children_index);
        }
    }
    assert_eq!(reloaded.blackboard, document.blackboard);
    assert_eq!(write_document(&reloaded, &registry), written);
    Ok(())
}

#[test]
fn test_editor_round_trip() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.load_xml(PATROL)?;
    assert_eq!(editor.main_tree(), Some("Patrol"));
    let saved = editor.save_xml()?;

    let mut reopened = Editor::default();
    reopened.load_xml(&saved)?;
    assert_eq!(reopened.save_xml()?, saved);
    Ok(())
}

#[test]
fn test_reorder_is_stable() -> anyhow::Result<()> {
    let mut editor = Editor::default();
    editor.load_xml(PATROL)?;
    let before = editor.snapshot()?;
    editor.reorder("Patrol")?;
    // Loading already laid the trees out
    assert_eq!(editor.snapshot()?, before);
    assert!(!editor.undo_stack().can_undo());

    let layout = LayoutConfig::default();
    assert_eq!(editor.config().layout, layout);
    Ok(())
}

proptest! {
    #[test]
    fn undo_restores_every_step(xs in prop::collection::vec(-500.0f64..500., 1..8)) {
        let mut editor = Editor::default();
        editor.load_xml(CONCRETE).unwrap();
        let seq = editor.tab("Main").unwrap().find_by_name("Sequence").unwrap();

        let mut states = vec![editor.snapshot().unwrap()];
        for (i, x) in xs.iter().enumerate() {
            let scene = editor.tab_mut("Main").unwrap();
            let node = scene.create_node(
                NodeModel::new(NodeKind::Action, format!("Step{}", i)),
                Point::new(*x, 300.),
            );
            scene.connect(seq, node).unwrap();
            prop_assert!(editor.on_scene_changed().unwrap());
            states.push(editor.snapshot().unwrap());
        }

        for expected in states.iter().rev().skip(1) {
            prop_assert!(editor.undo().unwrap());
            prop_assert_eq!(&editor.snapshot().unwrap(), expected);
        }
        prop_assert!(!editor.undo().unwrap());

        for expected in states.iter().skip(1) {
            prop_assert!(editor.redo().unwrap());
            prop_assert_eq!(&editor.snapshot().unwrap(), expected);
        }
        prop_assert!(!editor.redo().unwrap());
    }
}
