use lazynote_editor::outline::{heading_id, slugify};
use lazynote_editor::{
    AttrValue, Attrs, EditorConfig, EditorSession, ExtensionRegistry, Node, OutlineExtractor,
    Path, Transaction,
};
use std::time::{Duration, Instant};

fn heading(level: i64, text: &str) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), AttrValue::from(level));
    Node::element("heading", attrs, vec![Node::text(text)])
}

fn paragraph(text: &str) -> Node {
    Node::element("paragraph", Attrs::new(), vec![Node::text(text)])
}

fn session_with(blocks: Vec<Node>) -> EditorSession {
    let config = EditorConfig::default();
    let kit = ExtensionRegistry::with_builtins()
        .and_then(ExtensionRegistry::build)
        .expect("builtin kit");
    let editor = lazynote_editor::Editor::new(
        kit,
        Node::element("doc", Attrs::new(), blocks),
        config.history_limit,
    )
    .expect("editor");
    EditorSession::new(editor, config).expect("session")
}

#[test]
fn nests_headings_and_derives_ids() {
    let doc = Node::element(
        "doc",
        Attrs::new(),
        vec![heading(1, "Intro"), paragraph("body"), heading(2, "Setup")],
    );
    let outline = OutlineExtractor::default().extract(&doc);

    assert_eq!(outline.items.len(), 1);
    let intro = &outline.items[0];
    assert_eq!(intro.id, "heading-1-intro-0");
    assert_eq!(intro.level, 1);
    assert_eq!(intro.children.len(), 1);
    assert_eq!(intro.children[0].id, "heading-2-setup-1");
    assert_eq!(intro.children[0].text, "Setup");
    assert_eq!(outline.assignments.len(), 2);
}

#[test]
fn level_jumps_and_shallower_headings_reparent() {
    let doc = Node::element(
        "doc",
        Attrs::new(),
        vec![
            heading(2, "A"),
            heading(4, "B"),
            heading(3, "C"),
            heading(1, "D"),
        ],
    );
    let items = OutlineExtractor::default().extract(&doc).items;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text, "A");
    let nested: Vec<&str> = items[0]
        .children
        .iter()
        .map(|item| item.text.as_str())
        .collect();
    assert_eq!(nested, vec!["B", "C"]);
    assert_eq!(items[1].text, "D");
}

#[test]
fn slugs_keep_cjk_and_strip_punctuation() {
    assert_eq!(slugify("Hello, World!", 50), "hello-world");
    assert_eq!(slugify("  安装 指南  ", 50), "安装-指南");
    assert_eq!(slugify("abcdef", 3), "abc");
    assert_eq!(heading_id(3, "!!!", 7, 50), "heading-3-7");
}

#[test]
fn ids_persist_and_extraction_is_idempotent() {
    let mut session = session_with(vec![heading(1, "Intro"), paragraph("p"), heading(2, "Setup")]);
    let start = Instant::now();
    let first = session.refresh_outline(start).expect("refresh").to_vec();
    assert_eq!(
        session.document().children()[0].attr("id"),
        Some(&AttrValue::from("heading-1-intro-0"))
    );

    let version = session.editor().version();
    let second = session.refresh_outline(start).expect("refresh").to_vec();
    assert_eq!(first, second);
    assert_eq!(session.editor().version(), version);
}

#[test]
fn stored_ids_survive_inserting_a_heading_above() {
    let mut session = session_with(vec![heading(1, "Intro"), heading(2, "Setup")]);
    let start = Instant::now();
    session.refresh_outline(start).expect("refresh");

    let tx = Transaction::new().insert(Path::from(vec![0]), vec![heading(1, "Preface")]);
    session.commit(tx, start).expect("insert");
    let outline = session
        .tick(start + Duration::from_millis(300))
        .map(|_| session.outline().to_vec())
        .expect("tick");

    let ids: Vec<&str> = outline.iter().map(|item| item.id.as_str()).collect();
    assert_eq!(ids, vec!["heading-1-preface-0", "heading-1-intro-0"]);
    assert_eq!(outline[1].children[0].id, "heading-2-setup-1");
}

#[test]
fn id_assignment_undoes_with_the_edit_that_caused_it() {
    let mut session = session_with(vec![paragraph("p")]);
    let start = Instant::now();
    let tx = Transaction::new().insert(Path::from(vec![1]), vec![heading(1, "New")]);
    session.commit(tx, start).expect("insert");
    session
        .tick(start + Duration::from_millis(300))
        .expect("tick");
    assert!(session.document().children()[1].attr("id").is_some_and(|id| !id.is_null()));
    assert_eq!(session.editor().undo_depth(), 1);

    session.undo(start).expect("undo");
    assert_eq!(session.document().children().len(), 1);
}

#[test]
fn outline_from_markup() {
    let kit = ExtensionRegistry::with_builtins()
        .and_then(ExtensionRegistry::build)
        .expect("builtin kit");
    let items = OutlineExtractor::default()
        .extract_from_markup(
            &kit.schema,
            r#"<div class="lazynote-doc"><h1 id="keep-me">Kept</h1><h2>Child</h2></div>"#,
        )
        .expect("markup");
    assert_eq!(items[0].id, "keep-me");
    assert_eq!(items[0].children[0].id, "heading-2-child-1");
}
