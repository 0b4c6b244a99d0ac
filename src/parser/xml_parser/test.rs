use super::*;

#[test]
fn test_attributes() {
    assert_eq!(
        attribute(r#" ID="Walk""#),
        Ok(("", ("ID".to_owned(), "Walk".to_owned())))
    );
    assert_eq!(
        attribute(" text = 'a &lt; b &amp;&amp; c'"),
        Ok(("", ("text".to_owned(), "a < b && c".to_owned())))
    );
    assert!(attribute(r#"ID="Walk""#).is_err());
}

#[test]
fn test_unescape() {
    assert_eq!(unescape("plain"), "plain");
    assert_eq!(unescape("&quot;x&quot; &apos;y&apos;"), "\"x\" 'y'");
    assert_eq!(unescape("&#65;&#x42;"), "AB");
    assert_eq!(unescape("fish & chips; &bogus;"), "fish & chips; &bogus;");
}

#[test]
fn test_nested_document() {
    let source = r#"<?xml version="1.0"?>
<!-- leading comment -->
<root main_tree_to_execute="Main">
    <BehaviorTree ID="Main">
        <Sequence name="seq">
            <Action1/>
            <!-- inside -->
            <Action2 foo="bar" />
        </Sequence>
    </BehaviorTree>
</root>
"#;
    let root = parse_document(source).unwrap();
    assert_eq!(root.name, "root");
    assert_eq!(root.line, 3);
    assert_eq!(root.attribute("main_tree_to_execute"), Some("Main"));

    let bt = root.child("BehaviorTree").unwrap();
    assert_eq!(bt.line, 4);
    let seq = &bt.children[0];
    assert_eq!(seq.name, "Sequence");
    assert_eq!(seq.attribute("name"), Some("seq"));
    assert_eq!(seq.children.len(), 2);
    assert_eq!(seq.children[1].attribute("foo"), Some("bar"));
    assert_eq!(seq.children[1].line, 8);
    assert!(seq.text.is_empty());
}

#[test]
fn test_text_and_cdata() {
    let root = parse_document(
        "<input_port name=\"goal\" type=\"Pose\">Where to <![CDATA[<go>]]> &amp; stop</input_port>",
    )
    .unwrap();
    assert_eq!(root.text, "Where to <go> & stop");
    assert_eq!(root.attribute("type"), Some("Pose"));
}

#[test]
fn test_errors_report_line() {
    let err = parse_document("<root>\n  <a>\n  </b>\n</root>").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(err.message.contains("mismatched closing tag"), "{}", err.message);

    let err = parse_document("<root>\n<a x=\"1>\n").unwrap_err();
    assert_eq!(err.line, 2);

    let err = parse_document("<root/>\n<second/>").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.message, "content after the root element");

    assert!(parse_document("").is_err());
}

#[test]
fn test_builder_helpers() {
    let mut elem = Element::new("Action").with_attribute("ID", "Walk");
    elem.set_attribute("ID", "Run");
    elem.set_attribute("speed", "3");
    assert_eq!(
        elem.attributes,
        vec![
            ("ID".to_owned(), "Run".to_owned()),
            ("speed".to_owned(), "3".to_owned())
        ]
    );
    elem.push_child(Element::new("input_port"));
    elem.push_child(Element::new("output_port"));
    elem.push_child(Element::new("input_port"));
    assert_eq!(elem.children_named("input_port").count(), 2);
}
