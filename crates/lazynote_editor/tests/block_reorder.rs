use lazynote_editor::{
    AttrValue, Attrs, Editor, EditorConfig, EditorError, EditorSession, ExtensionRegistry, Node,
    Placement,
};
use std::time::Instant;

fn block(id: &str, text: &str) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("blockId".to_string(), AttrValue::from(id));
    Node::element("paragraph", attrs, vec![Node::text(text)])
}

fn quote(id: &str, children: Vec<Node>) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("blockId".to_string(), AttrValue::from(id));
    Node::element("blockquote", attrs, children)
}

fn session_with(blocks: Vec<Node>) -> EditorSession {
    let config = EditorConfig::default();
    let kit = ExtensionRegistry::with_builtins()
        .and_then(ExtensionRegistry::build)
        .expect("builtin kit");
    let editor = Editor::new(
        kit,
        Node::element("doc", Attrs::new(), blocks),
        config.history_limit,
    )
    .expect("editor");
    EditorSession::new(editor, config).expect("session")
}

fn order(session: &EditorSession) -> Vec<String> {
    session
        .document()
        .children()
        .iter()
        .filter_map(|node| node.block_id().map(str::to_string))
        .collect()
}

fn five_blocks() -> EditorSession {
    session_with(vec![
        block("a", "A"),
        block("b", "B"),
        block("c", "C"),
        block("d", "D"),
        block("e", "E"),
    ])
}

#[test]
fn moving_forward_accounts_for_removed_source() {
    let mut session = five_blocks();
    session
        .move_block("b", "c", Placement::After, Instant::now())
        .expect("move");
    assert_eq!(order(&session), vec!["a", "c", "b", "d", "e"]);
}

#[test]
fn moving_backward_and_to_the_edges() {
    let mut session = five_blocks();
    let now = Instant::now();
    session
        .move_block("d", "a", Placement::Before, now)
        .expect("move");
    assert_eq!(order(&session), vec!["d", "a", "b", "c", "e"]);
    session
        .move_block("d", "e", Placement::After, now)
        .expect("move");
    assert_eq!(order(&session), vec!["a", "b", "c", "e", "d"]);
}

#[test]
fn dropping_on_itself_changes_nothing() {
    let mut session = five_blocks();
    let before = session.document().clone();
    let version = session
        .move_block("c", "c", Placement::After, Instant::now())
        .expect("no-op");
    assert_eq!(version, 0);
    assert!(session.document().ptr_eq(&before));
}

#[test]
fn moving_into_own_subtree_is_cyclic() {
    let mut session = session_with(vec![
        quote("q", vec![block("inner", "inside")]),
        block("tail", "tail"),
    ]);
    let err = session
        .move_block("q", "inner", Placement::After, Instant::now())
        .expect_err("cycle");
    assert_eq!(
        err,
        EditorError::CyclicMove {
            source_id: "q".to_string(),
            target_id: "inner".to_string(),
        }
    );
}

#[test]
fn moves_across_nesting_levels_keep_ids_and_undo() {
    let mut session = session_with(vec![
        block("a", "A"),
        quote("q", vec![block("inner", "inside")]),
    ]);
    let now = Instant::now();
    session
        .move_block("a", "inner", Placement::After, now)
        .expect("move into quote");

    let quote_node = &session.document().children()[0];
    assert_eq!(quote_node.block_id(), Some("q"));
    let nested: Vec<&str> = quote_node
        .children()
        .iter()
        .filter_map(Node::block_id)
        .collect();
    assert_eq!(nested, vec!["inner", "a"]);

    assert!(session.undo(now).expect("undo"));
    assert_eq!(order(&session), vec!["a", "q"]);
}

#[test]
fn unknown_ids_are_reported() {
    let mut session = five_blocks();
    let err = session
        .move_block("missing", "a", Placement::Before, Instant::now())
        .expect_err("missing source");
    assert_eq!(err, EditorError::BlockNotFound("missing".to_string()));

    let drag = session.begin_reorder("a").expect("drag");
    let err = session
        .finish_reorder(&drag, "nowhere", Placement::After, Instant::now())
        .expect_err("missing target");
    assert_eq!(err, EditorError::BlockNotFound("nowhere".to_string()));
}
