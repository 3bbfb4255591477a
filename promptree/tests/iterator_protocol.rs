//! InputIterator protocol scenarios driven through the public API.

use std::collections::HashSet;
use std::thread;

use promptree::components::Registry;
use promptree::core::environment::Provider;
use promptree::core::iterator::{InputIterator, SubmitResult};
use promptree::core::renderer::{discover, render_tree};
use promptree::core::types::Values;
use promptree::test_support::{ask_text, context_for, fixed_context, values};
use promptree::tree::{Element, Node};
use serde_json::{Value, json};

/// `Prompt{ Role, Task, Ask count, Ask type, If(count>5 and admin){ Ask adminCode } }`
fn admin_tree() -> Node {
    Element::new("Prompt")
        .prop("noFormat", true)
        .prop("noConstraints", true)
        .child(Element::new("Role").child("You review access requests."))
        .child(
            Element::new("Task")
                .child("Requests: ")
                .child(Element::new("Ask.Number").prop("name", "count"))
                .child(", role: ")
                .child(
                    Element::new("Ask.Select")
                        .prop("name", "type")
                        .prop("options", json!(["user", "admin"])),
                ),
        )
        .child(
            Element::new("If")
                .prop("when", r#"=AND(count>5,type="admin")"#)
                .child(Element::new("Context").child(ask_text("adminCode"))),
        )
        .into()
}

fn drain(iterator: &mut InputIterator<'_>, answers: &[(&str, Value)]) -> Vec<String> {
    let mut asked = Vec::new();
    iterator.start().expect("start");
    while !iterator.is_done() {
        let name = iterator.current().expect("current").name.clone();
        let answer = answers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| json!("x"));
        let result = iterator.submit(answer).expect("submit");
        assert_eq!(result, SubmitResult::Accepted, "answer for {name}");
        iterator.advance().expect("advance");
        asked.push(name);
    }
    asked
}

#[test]
fn gated_input_appears_only_after_condition_holds() {
    let tree = admin_tree();
    let registry = Registry::default();
    let ctx = fixed_context();
    let mut iterator = InputIterator::new(&tree, &registry, &ctx);

    iterator.start().expect("start");
    assert_eq!(iterator.current().expect("current").name, "count");
    iterator.submit(json!("10")).expect("submit");
    iterator.advance().expect("advance");

    assert_eq!(iterator.current().expect("current").name, "type");
    iterator.submit(json!("admin")).expect("submit");
    iterator.advance().expect("advance");

    assert_eq!(iterator.current().expect("current").name, "adminCode");
    iterator.submit(json!("A-1")).expect("submit");
    iterator.advance().expect("advance");
    assert!(iterator.is_done());

    let result = render_tree(&tree, &registry, &ctx, iterator.values());
    assert!(result.ok, "{:?}", result.errors);
    assert_eq!(
        result.text,
        "You review access requests.\n\nRequests: 10, role: admin\n\nA-1"
    );
}

#[test]
fn gated_input_never_asked_when_condition_fails() {
    let tree = admin_tree();
    let registry = Registry::default();
    let ctx = fixed_context();
    let mut iterator = InputIterator::new(&tree, &registry, &ctx);
    let asked = drain(&mut iterator, &[("count", json!(3)), ("type", json!("admin"))]);
    assert_eq!(asked, vec!["count", "type"]);
}

#[test]
fn each_requirement_is_asked_once() {
    let tree = Node::fragment([
        ask_text("a"),
        Element::new("If")
            .prop("when", "a == \"x\"")
            .child(ask_text("b"))
            .into(),
        Element::new("ForEach")
            .prop("items", json!(["p", "q"]))
            .prop("as", "t")
            .child(ask_text("{{ t }}Note"))
            .into(),
    ]);
    let registry = Registry::default();
    let ctx = fixed_context();
    let mut iterator = InputIterator::new(&tree, &registry, &ctx);
    let asked = drain(&mut iterator, &[]);

    let unique: HashSet<&String> = asked.iter().collect();
    assert_eq!(unique.len(), asked.len(), "{asked:?}");
    assert_eq!(asked, vec!["a", "b", "pNote", "qNote"]);
}

#[test]
fn non_interactive_run_answers_everything_it_saw() {
    let tree = admin_tree();
    let registry = Registry::default();
    let ctx = fixed_context();
    let mut iterator = InputIterator::new(&tree, &registry, &ctx);
    let collected = iterator.run_non_interactive().expect("run");
    assert!(iterator.is_done());
    assert_eq!(
        collected,
        values([("count", json!(0)), ("type", json!(""))])
    );
    assert!(render_tree(&tree, &registry, &ctx, &collected).ok);
}

#[test]
fn non_interactive_values_render_cleanly_with_unsupplied_condition_names() {
    let tree: Node = Element::new("If")
        .prop("when", "!skip")
        .child(ask_text("x"))
        .into();
    let registry = Registry::default();
    let ctx = fixed_context();
    let mut iterator = InputIterator::new(&tree, &registry, &ctx);
    let collected = iterator.run_non_interactive().expect("run");
    assert!(iterator.is_done());
    assert!(collected.is_empty());

    let result = render_tree(&tree, &registry, &ctx, &collected);
    assert!(result.ok, "{:?}", result.errors);
    assert_eq!(result.text, "");
}

#[test]
fn foreach_discovers_templated_names_in_order() {
    let tree: Node = Element::new("ForEach")
        .prop("items", json!(["bug", "feature"]))
        .prop("as", "t")
        .child(ask_text("{{ t }}Note"))
        .into();
    let discovery = discover(&tree, &Registry::default(), &fixed_context(), &Values::new());
    let names: Vec<&str> = discovery
        .requirements
        .iter()
        .map(|req| req.name.as_str())
        .collect();
    assert_eq!(names, vec!["bugNote", "featureNote"]);
}

#[test]
fn discovery_then_final_matches_direct_final() {
    let tree = admin_tree();
    let registry = Registry::default();
    let ctx = context_for(Provider::Anthropic);
    let complete = values([
        ("count", json!(7)),
        ("type", json!("admin")),
        ("adminCode", json!("Z")),
    ]);

    let mut iterator = InputIterator::new(&tree, &registry, &ctx);
    let asked = drain(
        &mut iterator,
        &[
            ("count", json!(7)),
            ("type", json!("admin")),
            ("adminCode", json!("Z")),
        ],
    );
    assert_eq!(asked, vec!["count", "type", "adminCode"]);
    assert_eq!(iterator.values(), &complete);

    let via_iterator = render_tree(&tree, &registry, &ctx, iterator.values());
    let direct = render_tree(&tree, &registry, &ctx, &complete);
    assert_eq!(via_iterator, direct);
}

#[test]
fn parallel_renders_share_tree_and_context() {
    let tree = admin_tree();
    let registry = Registry::default();
    let ctx = context_for(Provider::OpenAi);
    let inputs = [("user", 2), ("admin", 9), ("admin", 1)];

    let texts: Vec<String> = thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|(kind, count)| {
                let (tree, registry, ctx) = (&tree, &registry, &ctx);
                scope.spawn(move || {
                    let v = values([
                        ("count", json!(count)),
                        ("type", json!(kind)),
                        ("adminCode", json!("K")),
                    ]);
                    render_tree(tree, registry, ctx, &v).text
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("join"))
            .collect()
    });

    assert!(!texts[0].contains("## Context"));
    assert!(texts[1].contains("## Context\n\nK"));
    assert!(!texts[2].contains("## Context"));
}
