//! Engine behavior tests: tolerance, diagnostics, limits, extensibility.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::{parse, parse_clean, shape};
use crate::visit::{self, Visitor};
use crate::{
    AstList, ConstructKind, DiagnosticKind, Error, Failure, Node, Options, Parser, Registry,
    TagInvocation, Value,
};

#[test]
fn empty_input() {
    let output = parse_clean("");
    assert_eq!(output.root.name, "root");
    assert!(output.root.children.is_empty());
}

#[test]
fn parsing_is_deterministic() {
    let source = "== H ==\n'''b'' {{t|a|k=v}} [[L]]\n* x\n** y";
    assert_eq!(parse(source), parse(source));
}

#[test]
fn unterminated_link_degrades_to_text() {
    let output = parse("[[unterminated");
    assert_eq!(output.root.children.len(), 1);
    assert_eq!(output.root.children[0].as_text(), Some("[[unterminated"));
    assert_eq!(output.text(), "[[unterminated");
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(
        output.diagnostics[0].kind,
        DiagnosticKind::Unterminated(ConstructKind::Link)
    );
}

#[test]
fn unterminated_template_degrades_to_text() {
    let output = parse("a {{b|c");
    assert_eq!(output.text(), "a {{b|c");
    assert!(!output.diagnostics.is_empty());
}

#[test]
fn stray_closers_are_reported() {
    let output = parse("foo ]] bar }} baz |} quux");
    assert_eq!(output.root.children.len(), 1);
    assert_eq!(
        output.root.children[0].as_text(),
        Some("foo ]] bar }} baz |} quux")
    );
    let kinds = output
        .diagnostics
        .iter()
        .map(|diagnostic| &diagnostic.kind)
        .collect::<Vec<_>>();
    assert_eq!(
        kinds,
        [
            &DiagnosticKind::MismatchedCloser {
                closer: "]]",
                kind: ConstructKind::Link
            },
            &DiagnosticKind::MismatchedCloser {
                closer: "}}",
                kind: ConstructKind::Template
            },
            &DiagnosticKind::MismatchedCloser {
                closer: "|}",
                kind: ConstructKind::Table
            },
        ]
    );
}

#[test]
fn closers_inside_their_construct_are_not_stray() {
    let output = parse_clean("{{a|b}} [[c]]");
    assert!(output.diagnostics.is_empty());
}

#[test]
fn diagnostics_carry_positions() {
    let output = parse("line one\n  ]]");
    assert_eq!(output.diagnostics.len(), 1);
    let at = output.diagnostics[0].at;
    assert_eq!((at.line, at.column), (2, 3));
    assert_eq!(at.offset, 11);
    assert_eq!(output.diagnostics[0].span.into_range(), 11..13);
}

#[test]
fn strict_mode_promotes_diagnostics() {
    let parser = Parser::new(Options {
        strict: true,
        ..Options::default()
    });
    match parser.parse("[[unterminated") {
        Err(Error::Strict(diagnostic)) => {
            assert_eq!(
                diagnostic.kind,
                DiagnosticKind::Unterminated(ConstructKind::Link)
            );
        }
        other => panic!("expected a strict mode error, got {other:?}"),
    }
    assert!(parser.parse("[[fine]]").is_ok());
}

#[test]
fn strict_mode_rejects_stray_closers() {
    let parser = Parser::new(Options {
        strict: true,
        ..Options::default()
    });
    match parser.parse("foo ]] bar") {
        Err(Error::Strict(diagnostic)) => {
            assert_eq!(
                diagnostic.kind,
                DiagnosticKind::MismatchedCloser {
                    closer: "]]",
                    kind: ConstructKind::Link
                }
            );
        }
        other => panic!("expected a strict mode error, got {other:?}"),
    }
}

#[test]
fn strict_mode_rejects_unterminated_tables() {
    let parser = Parser::new(Options {
        strict: true,
        ..Options::default()
    });
    match parser.parse("{|\n| cell") {
        Err(Error::Strict(diagnostic)) => {
            assert_eq!(
                diagnostic.kind,
                DiagnosticKind::Unterminated(ConstructKind::Table)
            );
        }
        other => panic!("expected a strict mode error, got {other:?}"),
    }
    assert!(parser.parse("{|\n| cell\n|}").is_ok());
}

#[test]
fn strict_mode_rejects_unclosed_comments() {
    let parser = Parser::new(Options {
        strict: true,
        ..Options::default()
    });
    match parser.parse("a <!-- unclosed") {
        Err(Error::Strict(diagnostic)) => {
            assert_eq!(diagnostic.kind, DiagnosticKind::UnclosedComment);
        }
        other => panic!("expected a strict mode error, got {other:?}"),
    }
    assert!(parser.parse("a <!-- closed -->").is_ok());
}

#[test]
fn recursion_limit_returns_partial_tree() {
    let parser = Parser::new(Options {
        max_recursion_depth: 8,
        ..Options::default()
    });
    let source = format!("intro {}x{}", "{{a|".repeat(30), "}}".repeat(30));
    match parser.parse(&source) {
        Err(Error::RecursionLimit { partial, at }) => {
            assert_eq!(partial.root.name, "root");
            assert_eq!(at.line, 1);
        }
        other => panic!("expected the recursion limit, got {other:?}"),
    }
    // The same input parses fine with room to recurse.
    assert!(
        Parser::new(Options::default())
            .parse(&source)
            .is_ok_and(|output| output.diagnostics.is_empty())
    );
}

#[test]
fn deep_parameter_nesting_hits_the_limit() {
    let parser = Parser::new(Options {
        max_recursion_depth: 8,
        ..Options::default()
    });
    let source = format!("{}x{}", "{{{".repeat(40), "}}}".repeat(40));
    assert!(matches!(
        parser.parse(&source),
        Err(Error::RecursionLimit { .. })
    ));
}

#[test]
fn adjacent_unmatched_markers_coalesce() {
    // Every failed construct attempt falls back into one text run.
    let output = parse("[ { < ' = *");
    assert_eq!(output.root.children.len(), 1);
    assert_eq!(output.root.children[0].as_text(), Some("[ { < ' = *"));
}

#[test]
fn structural_closure() {
    // Every element anywhere in the tree is a node, text, or number, and
    // every node's children are reachable the same way.
    struct Census {
        nodes: usize,
        texts: usize,
    }

    impl Visitor<core::convert::Infallible> for Census {
        fn visit_node(&mut self, node: &Node) -> Result<(), core::convert::Infallible> {
            self.nodes += 1;
            assert!(!node.name.is_empty());
            visit::walk_node(self, node)
        }

        fn visit_text(&mut self, text: &str) -> Result<(), core::convert::Infallible> {
            self.texts += 1;
            assert!(!text.is_empty());
            Ok(())
        }
    }

    let output = parse_clean("== H ==\n{{t|[[a|''b'']]}}\n* i\n{|\n| c\n|}");
    let mut census = Census { nodes: 0, texts: 0 };
    let Ok(()) = census.visit_node(&output.root);
    assert!(census.nodes >= 10);
    assert!(census.texts >= 3);
}

#[test]
fn no_adjacent_text_elements() {
    fn check(list: &AstList) {
        for pair in list.windows(2) {
            assert!(
                !(pair[0].as_text().is_some() && pair[1].as_text().is_some()),
                "adjacent text elements: {pair:?}"
            );
        }
        for value in list {
            if let Value::Node(node) = value {
                check(&node.children);
            }
        }
    }

    for source in [
        "a ]] b ]] c",
        "[[x ''y [not-a-link] z",
        "''''q''''",
        "===== t = u =====",
    ] {
        check(&parse(source).root.children);
    }
}

#[test]
fn text_flattening() {
    let output = parse_clean("'''bold''' and [[A|B]]");
    assert_eq!(output.text(), "bold and AB");
}

#[test]
fn extension_tag_handlers() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    let parser = Parser::new(Options {
        extensions: vec![(
            "gallery".to_owned(),
            Arc::new(move |invocation: &TagInvocation<'_>| {
                counter.fetch_add(1, Ordering::Relaxed);
                assert_eq!(invocation.name, "gallery");
                assert_eq!(invocation.body, Some("a.jpg\nb.jpg"));
                let mut node = Node::new("gallery");
                for (name, value) in invocation.attrs {
                    node.set_attr(name.clone(), value.clone().unwrap_or_default());
                }
                node.children.push_text(invocation.body.unwrap_or_default());
                node
            }),
        )],
        ..Options::default()
    });

    let output = parser
        .parse("<gallery mode=\"slideshow\">a.jpg\nb.jpg</gallery>")
        .unwrap();
    assert_eq!(seen.load(Ordering::Relaxed), 1);
    let gallery = output.root.children[0].as_node().unwrap();
    assert_eq!(gallery.name, "gallery");
    assert_eq!(
        gallery.attr("mode").and_then(|a| a.as_text()),
        Some("slideshow")
    );
    assert_eq!(gallery.children[0].as_text(), Some("a.jpg\nb.jpg"));
}

#[test]
fn custom_construct_registration() {
    let mut registry = Registry::default();
    registry.register(
        "~~~~",
        ConstructKind::Custom,
        false,
        Arc::new(|ctx: &mut crate::Context<'_>| {
            if !ctx.scanner().eat("~~~~") {
                return Err(Failure::Mismatch);
            }
            Ok(Node::new("signature").into())
        }),
    );
    assert!(registry.lookup("~~~~").is_some());
    assert!(registry.lookup("~~").is_none());

    let parser = Parser::with_registry(registry, Options::default());
    let output = parser.parse("signed ~~~~ today").unwrap();
    assert_eq!(output.root.children[0].as_text(), Some("signed "));
    assert_eq!(output.root.children[1].as_node().unwrap().name, "signature");
    assert_eq!(output.root.children[2].as_text(), Some(" today"));
}

#[test]
fn unbalanced_custom_construct_is_reported() {
    // A buggy construct parser that closes a construct it never opened.
    let mut registry = Registry::default();
    registry.register(
        "@",
        ConstructKind::Custom,
        false,
        Arc::new(|ctx: &mut crate::Context<'_>| {
            ctx.scanner().eat("@");
            ctx.pop(ConstructKind::Custom)?;
            Ok(Node::new("odd").into())
        }),
    );
    let parser = Parser::with_registry(registry, Options::default());
    let output = parser.parse("@").unwrap();
    assert_eq!(output.root.children[0].as_node().unwrap().name, "odd");
    assert_eq!(
        output.diagnostics[0].kind,
        DiagnosticKind::StackMismatch {
            kind: ConstructKind::Custom
        }
    );
    let message = output.diagnostics[0].to_string();
    assert!(
        message.contains("custom construct"),
        "unhelpful message: {message}"
    );
}

#[test]
fn replacing_a_builtin_construct() {
    let mut registry = Registry::default();
    registry.register(
        "[[",
        ConstructKind::Custom,
        false,
        Arc::new(|ctx: &mut crate::Context<'_>| {
            ctx.scanner().eat("[[");
            Ok(Node::new("bracket").into())
        }),
    );
    let parser = Parser::with_registry(registry, Options::default());
    let output = parser.parse("[[x]]").unwrap();
    assert_eq!(output.root.children[0].as_node().unwrap().name, "bracket");
}

#[test]
fn empty_registry_yields_one_text_run() {
    let parser = Parser::with_registry(Registry::empty(), Options::default());
    let output = parser.parse("== H ==\n{{t}} ''i''").unwrap();
    assert_eq!(output.root.children.len(), 1);
    assert_eq!(output.root.children[0].as_text(), Some("== H ==\n{{t}} ''i''"));
    // The `}}` is still a stray closer; nothing can open a template here.
    assert_eq!(output.diagnostics.len(), 1);
}

#[test]
fn one_parser_serves_concurrent_parses() {
    let parser = Parser::new(Options::default());
    let source = "== H ==\n{{t|a}} [[b]] '''c'''";
    let expected = parser.parse(source).unwrap();
    std::thread::scope(|scope| {
        let workers = (0..4)
            .map(|_| scope.spawn(|| parser.parse(source).unwrap()))
            .collect::<Vec<_>>();
        for worker in workers {
            assert_eq!(worker.join().unwrap(), expected);
        }
    });
}

#[test]
fn unterminated_table_keeps_structure() {
    let output = parse("{|\n| kept cell");
    assert_eq!(
        serde_json::to_value(&output.root).unwrap(),
        json!({
            "name": "root",
            "children": [{
                "name": "table",
                "children": [{ "name": "row", "children": [
                    { "name": "cell", "children": ["kept cell"] },
                ] }],
            }],
        })
    );
    assert_eq!(
        output.diagnostics[0].kind,
        DiagnosticKind::Unterminated(ConstructKind::Table)
    );
}

#[test]
fn table_nested_in_list_item() {
    let output = parse_clean("* {|\n| x\n|}");
    let list = output.root.children[0].as_node().unwrap();
    let item = list.children[0].as_node().unwrap();
    let table = item.children[0].as_node().unwrap();
    assert_eq!(table.name, "table");
    let row = table.children[0].as_node().unwrap();
    assert_eq!(row.children[0].as_node().unwrap().children[0].as_text(), Some("x"));
}

#[test]
fn template_nested_in_table_cell() {
    assert_eq!(shape("{|\n| {{t|a}}\n|}"), json!({
        "name": "root",
        "children": [{
            "name": "table",
            "children": [{ "name": "row", "children": [{
                "name": "cell",
                "children": [{
                    "name": "template",
                    "children": [
                        { "name": "name", "children": ["t"] },
                        { "name": "arg", "children": ["a"] },
                    ],
                }],
            }] }],
        }],
    }));
}

#[test]
fn errors_format_usefully() {
    let output = parse("x ]]");
    let message = output.diagnostics[0].to_string();
    assert!(message.contains("1:3"), "unhelpful message: {message}");
    assert!(message.contains("]]"), "unhelpful message: {message}");
}
