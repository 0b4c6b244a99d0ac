use super::*;
use crate::{
    parser::load_document,
    port::PortModel,
    tree::AbstractTreeNode,
};

#[test]
fn test_bare_tags_round_trip() {
    let source = r#"<root><BehaviorTree ID="Main"><Sequence><Action1/><Action2 foo="bar"/></Sequence></BehaviorTree></root>"#;
    let registry = Registry::default();
    let document = load_document(source, &registry).unwrap();
    let written = write_document(&document, &registry);
    assert_eq!(written, canonicalize(source).unwrap());
    assert_eq!(
        written,
        r#"<?xml version="1.0"?>
<root>
    <BehaviorTree ID="Main">
        <Sequence>
            <Action1/>
            <Action2 foo="bar"/>
        </Sequence>
    </BehaviorTree>
</root>
"#
    );
}

#[test]
fn test_canonicalize_drops_formatting() {
    let messy = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- c -->\n<root>\n\n  <a   x='1'   ><!-- inner --><b/></a>\n<c>some &amp; text</c></root>";
    assert_eq!(
        canonicalize(messy).unwrap(),
        "<?xml version=\"1.0\"?>\n<root>\n    <a x=\"1\">\n        <b/>\n    </a>\n    <c>some &amp; text</c>\n</root>\n"
    );
    assert!(canonicalize("<root>").is_err());
}

#[test]
fn test_writer_text_with_children() {
    let mut elem = Element::new("note").with_text("say \"hi\" <loud>");
    elem.push_child(Element::new("child").with_attribute("q", "a\"b"));
    let mut writer = XmlWriter::new(String::new());
    writer.element(&elem).unwrap();
    assert_eq!(
        writer.into_inner(),
        "<note>\n    say \"hi\" &lt;loud&gt;\n    <child q=\"a&quot;b\"/>\n</note>\n"
    );
}

#[test]
fn test_custom_models_and_names() {
    let source = r#"<root main_tree_to_execute="Main">
    <BehaviorTree ID="Main">
        <Fallback name="pick">
            <Action ID="Say" name="greet" text="a &lt; b"/>
            <SubTree ID="Other"/>
        </Fallback>
    </BehaviorTree>
    <BehaviorTree ID="Other">
        <AlwaysSuccess/>
    </BehaviorTree>
    <TreeNodesModel>
        <Action ID="Say">
            <input_port name="text" type="std::string" default="hello">What to say</input_port>
        </Action>
    </TreeNodesModel>
    <Blackboard>
        <Property name="mood" type="int" default="3" suffix="" description="" private="false" order="0"/>
    </Blackboard>
</root>"#;
    let registry = Registry::default();
    let document = load_document(source, &registry).unwrap();
    let written = write_document(&document, &registry);
    assert_eq!(written, canonicalize(source).unwrap());
    assert!(written.contains(r#"<Action ID="Say" name="greet" text="a &lt; b"/>"#));
    assert!(written.contains(r#"<SubTree ID="Other"/>"#));
    assert!(!written.contains(r#"<SubTree ID="Main""#));
}

#[test]
fn test_reload_is_structurally_equal() {
    let source = r#"<root main_tree_to_execute="Main">
    <BehaviorTree ID="Main">
        <ReactiveSequence>
            <Condition ID="Ready" name="ready?"/>
            <Repeat num_cycles="3">
                <Walk speed="{fast}"/>
            </Repeat>
            <Parallel success_threshold="1" failure_threshold="2">
                <AlwaysSuccess/>
                <Timeout msec="100"><Wait/></Timeout>
            </Parallel>
        </ReactiveSequence>
    </BehaviorTree>
</root>"#;
    let registry = Registry::default();
    let first = load_document(source, &registry).unwrap();
    let second = load_document(&write_document(&first, &registry), &registry).unwrap();

    let lhs = first.tree("Main").unwrap();
    let rhs = second.tree("Main").unwrap();
    assert_eq!(lhs, rhs);
    for (l, r) in lhs.nodes().iter().zip(rhs.nodes()) {
        assert_eq!(l.ports_mapping, r.ports_mapping);
        assert_eq!(l.model.registration_id, r.model.registration_id);
    }
}

#[test]
fn test_expanded_subtree_is_written_inline() {
    let registry = Registry::default();
    let mut tree = AbstractTree::new();
    let root = tree.add_node(AbstractTreeNode::new(NodeModel::root()));
    let sub = tree.push_child(root, AbstractTreeNode::new(NodeModel::subtree("Patrol")));
    tree.push_child(
        sub,
        AbstractTreeNode::new(registry.get("AlwaysSuccess").unwrap().clone()),
    );

    let elem = tree_to_element(&tree, "Main", &registry);
    let subtree = &elem.children[0];
    assert_eq!(subtree.name, "SubTree");
    assert_eq!(subtree.attribute("ID"), Some("Patrol"));
    assert_eq!(subtree.children[0].name, "AlwaysSuccess");

    tree.node_mut(sub).unwrap().children_index.clear();
    let elem = tree_to_element(&tree, "Main", &registry);
    assert!(elem.children[0].children.is_empty());
}

#[test]
fn test_reserved_port_names_are_skipped() {
    let registry = Registry::default();
    let mut tree = AbstractTree::new();
    let root = tree.add_node(AbstractTreeNode::new(NodeModel::root()));
    let mut say = AbstractTreeNode::new(NodeModel::new(NodeKind::Action, "Say")).with_name("greet");
    say.ports_mapping.insert("name".to_owned(), "other".to_owned());
    say.ports_mapping.insert("ID".to_owned(), "Dance".to_owned());
    say.ports_mapping.insert("text".to_owned(), "hi".to_owned());
    tree.push_child(root, say);

    let elem = tree_to_element(&tree, "Main", &registry);
    let say = &elem.children[0];
    assert_eq!(say.attribute("ID"), Some("Say"));
    assert_eq!(say.attribute("name"), Some("greet"));
    assert_eq!(say.attribute("text"), Some("hi"));
    assert_eq!(say.attributes.len(), 3);
}

#[test]
fn test_models_element() {
    let model = NodeModel::new(NodeKind::Decorator, "Cooldown")
        .with_port("seconds", PortModel::new_in("double").with_default("1.0"))
        .with_port("left", PortModel::new_out("").with_description("time left"));
    let elem = models_to_element([&model]);
    let text = write_element(&elem);
    assert_eq!(
        text,
        r#"<?xml version="1.0"?>
<TreeNodesModel>
    <Decorator ID="Cooldown">
        <output_port name="left">time left</output_port>
        <input_port name="seconds" type="double" default="1.0"/>
    </Decorator>
</TreeNodesModel>
"#
    );
}
