use lazynote_editor::{
    AttrValue, Attrs, Editor, EditorError, ExtensionRegistry, HistoryMode, Node, Path, Range,
    Step, StepError, Transaction,
};
use std::cell::RefCell;
use std::rc::Rc;

fn paragraph(text: &str) -> Node {
    Node::element("paragraph", Attrs::new(), vec![Node::text(text)])
}

fn editor_with(blocks: Vec<Node>) -> Editor {
    let kit = ExtensionRegistry::with_builtins()
        .and_then(ExtensionRegistry::build)
        .expect("builtin kit");
    Editor::new(kit, Node::element("doc", Attrs::new(), blocks), 100).expect("editor")
}

fn texts(editor: &Editor) -> Vec<String> {
    editor
        .document()
        .children()
        .iter()
        .map(Node::text_content)
        .collect()
}

#[test]
fn failing_step_rolls_back_the_whole_transaction() {
    let mut editor = editor_with(vec![paragraph("a")]);
    let before = editor.document().clone();

    let tx = Transaction::new()
        .insert(Path::from(vec![1]), vec![paragraph("b")])
        .delete(Range::new(Path::root(), 5, 6));
    let err = editor.commit(tx).expect_err("second step is out of range");
    assert!(matches!(err, EditorError::InvalidStep { index: 1, .. }));
    assert!(editor.document().ptr_eq(&before));
    assert_eq!(editor.version(), 0);
    assert!(!editor.can_undo());
}

#[test]
fn schema_violation_rejects_commit() {
    let mut editor = editor_with(vec![paragraph("a")]);
    let before = editor.document().clone();
    let tx = Transaction::new().delete(Range::new(Path::root(), 0, 1));
    let err = editor.commit(tx).expect_err("doc needs one block");
    assert!(matches!(err, EditorError::SchemaViolation(_)));
    assert!(editor.document().ptr_eq(&before));
}

#[test]
fn committed_block_ids_cannot_be_reassigned() {
    let mut editor = editor_with(vec![paragraph("a")]);
    let original = editor.document().children()[0]
        .block_id()
        .expect("id assigned on open")
        .to_string();
    let before = editor.document().clone();

    let mut attrs = Attrs::new();
    attrs.insert("blockId".to_string(), AttrValue::from("hijacked"));
    let err = editor
        .commit(Transaction::new().set_attrs(Path::from(vec![0]), attrs))
        .expect_err("reassigning a block id must fail");
    assert!(matches!(
        err,
        EditorError::InvalidStep {
            index: 0,
            source: StepError::BlockIdReassigned { .. },
        }
    ));
    assert!(editor.document().ptr_eq(&before));
    assert_eq!(editor.document().children()[0].block_id(), Some(original.as_str()));

    editor
        .commit(Transaction::new().insert(Path::from(vec![1]), vec![paragraph("b")]))
        .expect("new block gets an id");
    assert!(editor.document().children()[1].block_id().is_some());
    assert!(editor.undo().expect("undo clears the assigned id with the block"));
    assert_eq!(editor.document(), &before);
}

#[test]
fn undo_n_then_redo_n_round_trips() {
    let mut editor = editor_with(vec![paragraph("0")]);
    let initial = editor.document().clone();
    for index in 1..=3 {
        let tx = Transaction::new().insert(
            Path::from(vec![index]),
            vec![paragraph(index.to_string().as_str())],
        );
        editor.commit(tx).expect("insert");
    }
    let full = editor.document().clone();
    assert_eq!(texts(&editor), vec!["0", "1", "2", "3"]);

    for _ in 0..3 {
        assert!(editor.undo().expect("undo"));
    }
    assert_eq!(editor.document(), &initial);
    assert!(!editor.undo().expect("nothing left"));

    for _ in 0..3 {
        assert!(editor.redo().expect("redo"));
    }
    assert_eq!(editor.document(), &full);
    assert!(!editor.redo().expect("nothing left"));
}

#[test]
fn new_edit_clears_redo() {
    let mut editor = editor_with(vec![paragraph("a")]);
    editor
        .commit(Transaction::new().insert(Path::from(vec![1]), vec![paragraph("b")]))
        .expect("insert");
    editor.undo().expect("undo");
    assert!(editor.can_redo());
    editor
        .commit(Transaction::new().insert(Path::from(vec![1]), vec![paragraph("c")]))
        .expect("insert");
    assert!(!editor.can_redo());
    assert_eq!(texts(&editor), vec!["a", "c"]);
}

#[test]
fn skip_history_commits_without_undo_entry() {
    let mut editor = editor_with(vec![paragraph("a")]);
    let tx = Transaction::new()
        .with_history(HistoryMode::Skip)
        .insert(Path::from(vec![1]), vec![paragraph("remote")]);
    editor.commit(tx).expect("commit");
    assert_eq!(editor.version(), 1);
    assert!(!editor.can_undo());
}

#[test]
fn append_to_last_folds_into_previous_entry() {
    let mut editor = editor_with(vec![paragraph("a")]);
    editor
        .commit(Transaction::new().insert(Path::from(vec![1]), vec![paragraph("b")]))
        .expect("insert");
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), 2.into());
    let heading = Node::element("heading", attrs, vec![Node::text("h")]);
    editor
        .commit(
            Transaction::new()
                .with_history(HistoryMode::AppendToLast)
                .replace_range(Range::new(Path::root(), 0, 1), vec![heading]),
        )
        .expect("append");
    assert_eq!(editor.undo_depth(), 1);

    editor.undo().expect("undo");
    assert_eq!(texts(&editor), vec!["a"]);
    assert_eq!(editor.document().children()[0].type_name, "paragraph");
}

#[test]
fn text_edit_step_replaces_chars() {
    let mut editor = editor_with(vec![paragraph("héllo")]);
    let step = lazynote_editor::transform::step::text_edit(
        editor.document().root(),
        &Path::from(vec![0, 0]),
        1,
        2,
        "e",
    )
    .expect("step");
    assert!(matches!(step, Step::ReplaceRange { .. }));
    editor.commit(Transaction::from_steps(vec![step])).expect("commit");
    assert_eq!(texts(&editor), vec!["hello"]);
}

#[test]
fn observers_see_every_version() {
    let mut editor = editor_with(vec![paragraph("a")]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    editor.subscribe(Box::new(move |_: &lazynote_editor::Document, version: u64| {
        sink.borrow_mut().push(version);
    }));

    editor
        .commit(Transaction::new().insert(Path::from(vec![1]), vec![paragraph("b")]))
        .expect("insert");
    editor.undo().expect("undo");
    editor.redo().expect("redo");
    assert_eq!(*seen.borrow(), vec![1, 2, 3]);
}
