use textpipe::config::{Configurable, Configuration};
use textpipe::error::Error;
use textpipe::transformer::{
    ContentTransformer, DefaultParameterSubstitutionTransformer, LINE_SEPARATOR,
};
use xmltree::{Element, XMLNode};

const PARAMETER_FILE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<root version="2.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema" xmlns="http://www.informatica.com/Parameterization/1.0">
   <project name="Orders">
      <workflow name="Customer_Workflow">
         <parameter name="TEST_PARAM">100</parameter>
         <parameter name="TEST_PARAM_OTHER">200</parameter>
      </workflow>
      <workflow name="Customer_Workflow_2">
         <parameter name="TEST_PARAM">100</parameter>
         <parameter name="TEST_PARAM_OTHER_2">400</parameter>
      </workflow>
   </project>
</root>"#;

fn transformer_with(params: &[(&str, &str)]) -> DefaultParameterSubstitutionTransformer {
    let conf: Configuration = params
        .iter()
        .map(|(name, value)| (format!("transformer.parameter.{name}"), value.to_string()))
        .collect();
    let transformer = DefaultParameterSubstitutionTransformer::new();
    transformer.configure(&conf).unwrap();
    transformer
}

fn apply(transformer: &dyn ContentTransformer, xml: &str) -> String {
    let mut output = Vec::new();
    transformer.apply(&mut xml.as_bytes(), &mut output).unwrap();
    String::from_utf8(output).unwrap()
}

/// Every `(name attribute, text)` pair of the parameter elements, in document order.
fn parameters(xml: &str) -> Vec<(String, String)> {
    fn collect(element: &Element, out: &mut Vec<(String, String)>) {
        if element.name == "parameter" {
            let name = element.attributes.get("name").cloned().unwrap_or_default();
            let text = element.get_text().map(|t| t.into_owned()).unwrap_or_default();
            out.push((name, text));
        }
        for child in &element.children {
            if let XMLNode::Element(child) = child {
                collect(child, out);
            }
        }
    }

    let root = Element::parse(xml.as_bytes()).unwrap();
    let mut out = Vec::new();
    collect(&root, &mut out);
    out
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected.iter().map(|(n, t)| (n.to_string(), t.to_string())).collect()
}

#[test]
fn test_applies_value_to_matching_parameter() {
    let transformer = transformer_with(&[("TEST_PARAM", "VALUE")]);
    let xml = r#"<root><workflow><parameter name="TEST_PARAM">100</parameter><parameter name="OTHER">200</parameter></workflow></root>"#;

    let result = apply(&transformer, xml);

    assert_eq!(parameters(&result), pairs(&[("TEST_PARAM", "VALUE"), ("OTHER", "200")]));
}

#[test]
fn test_applies_value_to_every_element_with_the_name() {
    let transformer = transformer_with(&[("TEST_PARAM", "VALUE")]);

    let result = apply(&transformer, PARAMETER_FILE);

    assert_eq!(
        parameters(&result),
        pairs(&[
            ("TEST_PARAM", "VALUE"),
            ("TEST_PARAM_OTHER", "200"),
            ("TEST_PARAM", "VALUE"),
            ("TEST_PARAM_OTHER_2", "400"),
        ])
    );
}

#[test]
fn test_keeps_structure_and_namespace() {
    let transformer = transformer_with(&[("TEST_PARAM", "VALUE")]);

    let result = apply(&transformer, PARAMETER_FILE);
    let root = Element::parse(result.as_bytes()).unwrap();

    assert!(result.starts_with("<?xml"));
    assert_eq!(root.name, "root");
    assert_eq!(root.attributes.get("version").map(String::as_str), Some("2.0"));
    assert_eq!(
        root.namespace.as_deref(),
        Some("http://www.informatica.com/Parameterization/1.0")
    );
    let project = root.get_child("project").unwrap();
    assert_eq!(project.attributes.get("name").map(String::as_str), Some("Orders"));
    assert_eq!(project.children.len(), 2);
}

#[test]
fn test_output_is_indented() {
    let transformer = transformer_with(&[("A", "1")]);
    let result = apply(&transformer, r#"<root><group><parameter name="A">0</parameter></group></root>"#);

    assert!(result.contains("\n  <group>"));
    assert!(result.contains("\n    <parameter name=\"A\">1</parameter>"));
}

#[test]
fn test_unknown_parameters_are_ignored() {
    let transformer = transformer_with(&[("NOT_IN_DOCUMENT", "X")]);

    let result = apply(&transformer, PARAMETER_FILE);

    assert_eq!(parameters(&result), parameters(PARAMETER_FILE));
}

#[test]
fn test_without_parameters_document_is_unchanged() {
    let transformer = DefaultParameterSubstitutionTransformer::new();
    let result = apply(&transformer, PARAMETER_FILE);

    assert_eq!(parameters(&result), parameters(PARAMETER_FILE));
}

#[test]
fn test_other_elements_are_untouched() {
    let transformer = transformer_with(&[("A", "new")]);
    let xml = r#"<root><param name="A">old</param><parameter id="A">old</parameter><parameter name="A">old</parameter></root>"#;

    let result = apply(&transformer, xml);
    let root = Element::parse(result.as_bytes()).unwrap();

    let texts: Vec<String> = root
        .children
        .iter()
        .filter_map(|node| match node {
            XMLNode::Element(e) => Some(e),
            _ => None,
        })
        .map(|e| e.get_text().map(|t| t.into_owned()).unwrap_or_default())
        .collect();
    assert_eq!(texts, vec!["old", "old", "new"]);
}

#[test]
fn test_substitution_is_idempotent() {
    let transformer = transformer_with(&[("TEST_PARAM", "VALUE"), ("TEST_PARAM_OTHER", "<&>")]);

    let once = apply(&transformer, PARAMETER_FILE);
    let twice = apply(&transformer, &once);

    assert_eq!(once, twice);
    assert_eq!(parameters(&once)[1], ("TEST_PARAM_OTHER".to_string(), "<&>".to_string()));
}

#[test]
fn test_empty_value_clears_text() {
    let transformer = transformer_with(&[("TEST_PARAM", "")]);
    let result = apply(&transformer, PARAMETER_FILE);

    assert_eq!(parameters(&result)[0], ("TEST_PARAM".to_string(), String::new()));
}

#[test]
fn test_later_configuration_wins() {
    let transformer = transformer_with(&[("TEST_PARAM", "FIRST")]);
    transformer
        .configure(&Configuration::new().with("transformer.parameter.TEST_PARAM", "SECOND"))
        .unwrap();

    let result = apply(&transformer, PARAMETER_FILE);
    assert_eq!(parameters(&result)[0].1, "SECOND");
}

#[test]
fn test_with_parameters_constructor() {
    let transformer = DefaultParameterSubstitutionTransformer::with_parameters([("TEST_PARAM", "BUILT")]);
    let result = apply(&transformer, PARAMETER_FILE);
    assert_eq!(parameters(&result)[0].1, "BUILT");
}

#[test]
fn test_malformed_xml_writes_nothing() {
    let transformer = transformer_with(&[("TEST_PARAM", "VALUE")]);
    let mut output = Vec::new();

    let result = transformer.apply(&mut "<root><parameter name=\"A\">1</root>".as_bytes(), &mut output);

    assert!(matches!(result, Err(Error::ParseError(_))));
    assert!(output.is_empty());
}

#[test]
fn test_apply_lines_matches_stream_form() {
    let transformer = transformer_with(&[("TEST_PARAM", "VALUE")]);
    let lines: Vec<String> = PARAMETER_FILE.lines().map(str::to_string).collect();

    let result = transformer.apply_lines(&lines).unwrap();

    let streamed = apply(&transformer, &lines.join(LINE_SEPARATOR));
    assert_eq!(result.join(LINE_SEPARATOR), streamed);
    assert_eq!(parameters(&result.join(LINE_SEPARATOR))[0].1, "VALUE");
}

#[test]
fn test_apply_lines_wraps_parse_errors() {
    let transformer = DefaultParameterSubstitutionTransformer::new();
    let err = transformer.apply_lines(&["<broken".to_string()]).unwrap_err();

    match err {
        Error::TransformError { source, .. } => assert!(matches!(*source, Error::ParseError(_))),
        other => panic!("Expected TransformError, got {other:?}"),
    }
}

#[test]
fn test_keeps_comments_and_instructions_around_root() {
    let transformer = transformer_with(&[("A", "1")]);
    let xml = r#"<?xml version="1.0"?><!-- generated by deploy --><?xml-stylesheet href="params.xsl"?><root><parameter name="A">0</parameter></root><!-- end -->"#;

    let once = apply(&transformer, xml);

    let comment = once.find("<!-- generated by deploy -->").unwrap();
    let instruction = once.find(r#"<?xml-stylesheet href="params.xsl"?>"#).unwrap();
    let root = once.find("<root>").unwrap();
    let trailer = once.find("<!-- end -->").unwrap();
    assert!(comment < instruction && instruction < root && root < trailer);
    assert!(once.contains(r#"<parameter name="A">1</parameter>"#));
    assert_eq!(once.matches("<?xml ").count(), 1);

    assert_eq!(apply(&transformer, &once), once);
}

#[test]
fn test_latin1_input_is_written_as_utf8() {
    let transformer = transformer_with(&[("B", "new")]);
    let mut input = br#"<?xml version="1.0" encoding="ISO-8859-1"?><root><parameter name="A">caf"#.to_vec();
    input.push(0xE9);
    input.extend_from_slice(br#"</parameter><parameter name="B">old</parameter></root>"#);

    let mut output = Vec::new();
    transformer.apply(&mut input.as_slice(), &mut output).unwrap();
    let result = String::from_utf8(output).unwrap();

    assert!(result.contains(r#"encoding="UTF-8""#));
    assert!(!result.contains("ISO-8859-1"));
    assert_eq!(parameters(&result), pairs(&[("A", "caf\u{e9}"), ("B", "new")]));
}
