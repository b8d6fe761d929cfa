use lazynote_editor::{
    AttrValue, Attrs, EditorConfig, EditorSession, Node, OutlineItem, Path, Range, Transaction,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

fn heading(text: &str) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), AttrValue::from(1));
    Node::element("heading", attrs, vec![Node::text(text)])
}

fn config() -> EditorConfig {
    EditorConfig::from_json_str(r#"{"outline_debounce_ms": 100, "autosave_debounce_ms": 500}"#)
        .expect("config")
}

fn insert_heading(session: &mut EditorSession, text: &str, now: Instant) {
    let index = session.document().children().len();
    let tx = Transaction::new().insert(Path::from(vec![index]), vec![heading(text)]);
    session.commit(tx, now).expect("commit");
}

#[test]
fn outline_observers_fire_once_per_quiet_period() {
    let mut session = EditorSession::with_builtins(config()).expect("session");
    let calls: Rc<RefCell<Vec<Vec<String>>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&calls);
    session.on_outline(Box::new(move |items: &[OutlineItem]| {
        sink.borrow_mut()
            .push(items.iter().map(|item| item.text.clone()).collect());
    }));

    let start = Instant::now();
    insert_heading(&mut session, "One", start);
    insert_heading(&mut session, "Two", start + Duration::from_millis(50));
    session
        .tick(start + Duration::from_millis(120))
        .expect("early tick");
    assert!(calls.borrow().is_empty());

    let outcome = session
        .tick(start + Duration::from_millis(150))
        .expect("tick");
    assert!(outcome.outline_refreshed);
    assert!(!outcome.saved);
    assert_eq!(*calls.borrow(), vec![vec!["One".to_string(), "Two".to_string()]]);

    session
        .tick(start + Duration::from_millis(400))
        .expect("idle tick");
    assert_eq!(calls.borrow().len(), 1);
}

#[test]
fn autosave_persists_latest_markup_once() {
    let mut session = EditorSession::with_builtins(config()).expect("session");
    let saved: Rc<RefCell<Vec<(u64, String)>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&saved);
    session.set_sink(Box::new(move |markup: &str, version: u64| {
        sink.borrow_mut().push((version, markup.to_string()));
        Ok(())
    }));

    let start = Instant::now();
    insert_heading(&mut session, "Draft", start);
    session
        .tick(start + Duration::from_millis(100))
        .expect("outline tick");
    let outcome = session
        .tick(start + Duration::from_millis(600))
        .expect("save tick");
    assert!(outcome.saved);

    let saved = saved.borrow();
    assert_eq!(saved.len(), 1);
    let (version, markup) = &saved[0];
    assert_eq!(*version, session.editor().version());
    assert_eq!(markup, &session.markup());
    assert!(markup.contains(r#"id="heading-1-draft-0""#));
}

#[test]
fn failed_save_is_not_fatal() {
    let mut session = EditorSession::with_builtins(config()).expect("session");
    session.set_sink(Box::new(|_: &str, _: u64| Err("disk full".to_string())));
    let start = Instant::now();
    insert_heading(&mut session, "Draft", start);
    let outcome = session
        .tick(start + Duration::from_secs(1))
        .expect("tick");
    assert!(outcome.outline_refreshed);

    let outcome = session
        .tick(start + Duration::from_secs(2))
        .expect("tick");
    assert!(!outcome.saved);
    assert!(!session.has_pending_work());
}

#[test]
fn undo_and_redo_reschedule_refresh() {
    let mut session = EditorSession::with_builtins(config()).expect("session");
    let start = Instant::now();
    insert_heading(&mut session, "Gone", start);
    session
        .tick(start + Duration::from_millis(100))
        .expect("tick");
    assert_eq!(session.outline().len(), 1);

    let later = start + Duration::from_millis(200);
    session.undo(later).expect("undo");
    session
        .tick(later + Duration::from_millis(100))
        .expect("tick");
    assert!(session.outline().is_empty());

    session.redo(later).expect("redo");
    session
        .tick(later + Duration::from_millis(200))
        .expect("tick");
    assert_eq!(session.outline()[0].id, "heading-1-gone-0");
}

#[test]
fn markup_sessions_reopen_with_the_same_ids() {
    let mut session = EditorSession::with_builtins(config()).expect("session");
    let now = Instant::now();
    session
        .paste_text("# Title\n\nBody", Range::new(Path::root(), 0, 1), now)
        .expect("paste");
    let markup = session.markup();

    let reopened = EditorSession::open_markup(config(), markup.as_str()).expect("reopen");
    assert_eq!(reopened.document(), session.document());
    assert_eq!(reopened.editor().version(), 0);
}
