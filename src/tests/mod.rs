use crate::{Node, Options, Output, Parser};

mod extras;

/// Parses with default options, panicking on fatal errors.
#[track_caller]
fn parse(source: &str) -> Output {
    let _ = env_logger::try_init();
    Parser::new(Options::default()).parse(source).unwrap()
}

/// Parses and additionally asserts that the input produced no diagnostics.
#[track_caller]
fn parse_clean(source: &str) -> Output {
    let output = parse(source);
    assert!(
        output.diagnostics.is_empty(),
        "unexpected diagnostics for {source:?}: {:?}",
        output.diagnostics
    );
    output
}

/// Parses and returns the serialized document shape for comparison against
/// `serde_json::json!` literals.
#[track_caller]
fn shape(source: &str) -> serde_json::Value {
    serde_json::to_value(parse_clean(source).root).unwrap()
}

/// The only node among the document's children, which must be the only
/// child.
#[track_caller]
fn single(output: &Output) -> &Node {
    assert_eq!(
        output.root.children.len(),
        1,
        "expected one child: {:?}",
        output.root.children
    );
    output.root.children[0].as_node().unwrap()
}
