//! Editor session: the engine plus everything that reacts to it.
//!
//! # Responsibility
//! - Route paste, drop, typing and slash-menu input into transactions.
//! - Drive the debounced outline refresh and auto-save from host ticks.
//! - Keep the slash-menu state next to the editor it edits.
//!
//! # Invariants
//! - Every committed change re-arms both debouncers; at most one run of
//!   each is pending.
//! - Debounced work reads the document current at fire time.
//! - `close` cancels all pending work and the open slash menu.

use crate::config::EditorConfig;
use crate::extension::kernel::ExtensionRegistry;
use crate::markdown::{ingest_text, PasteKind};
use crate::model::document::Document;
use crate::model::node::{AttrValue, Attrs, Node};
use crate::model::path::{Path, Range};
use crate::outline::{OutlineExtractor, OutlineItem};
use crate::reorder::{Placement, ReorderSession};
use crate::serialize::{deserialize, serialize};
use crate::service::debounce::Debouncer;
use crate::service::editor::{empty_document, DocumentObserver, Editor};
use crate::service::error::EditorError;
use crate::suggest::{SlashKey, SlashOutcome, SlashSession, SlashTrigger, Suggestion};
use crate::transform::step::{text_edit, Step};
use crate::transform::transaction::Transaction;
use log::{info, warn};
use std::time::Instant;

/// Receives the outline after each debounced extraction.
pub trait OutlineObserver {
    fn outline_changed(&mut self, items: &[OutlineItem]);
}

impl<F> OutlineObserver for F
where
    F: FnMut(&[OutlineItem]),
{
    fn outline_changed(&mut self, items: &[OutlineItem]) {
        self(items)
    }
}

/// Persistence collaborator fed by auto-save.
pub trait DocumentSink {
    fn persist(&mut self, markup: &str, version: u64) -> Result<(), String>;
}

impl<F> DocumentSink for F
where
    F: FnMut(&str, u64) -> Result<(), String>,
{
    fn persist(&mut self, markup: &str, version: u64) -> Result<(), String> {
        self(markup, version)
    }
}

/// What one [`EditorSession::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub outline_refreshed: bool,
    pub saved: bool,
}

/// Editor plus debouncers, slash state and observers.
pub struct EditorSession {
    editor: Editor,
    config: EditorConfig,
    extractor: OutlineExtractor,
    outline_timer: Debouncer,
    autosave_timer: Debouncer,
    slash: Option<SlashSession>,
    outline: Vec<OutlineItem>,
    outline_observers: Vec<Box<dyn OutlineObserver>>,
    sink: Option<Box<dyn DocumentSink>>,
    saved_version: Option<u64>,
}

impl EditorSession {
    pub fn new(editor: Editor, config: EditorConfig) -> Result<Self, EditorError> {
        config.validate()?;
        Ok(Self {
            extractor: OutlineExtractor::new(config.slug_max_chars),
            outline_timer: Debouncer::new(config.outline_delay()),
            autosave_timer: Debouncer::new(config.autosave_delay()),
            editor,
            config,
            slash: None,
            outline: Vec::new(),
            outline_observers: Vec::new(),
            sink: None,
            saved_version: None,
        })
    }

    /// Session over an empty document with the built-in extensions.
    pub fn with_builtins(config: EditorConfig) -> Result<Self, EditorError> {
        let kit = ExtensionRegistry::with_builtins()?.build()?;
        let doc = empty_document(&kit.schema)?;
        let editor = Editor::new(kit, doc, config.history_limit)?;
        Self::new(editor, config)
    }

    /// Session over a stored document with the built-in extensions.
    pub fn open_markup(config: EditorConfig, markup: &str) -> Result<Self, EditorError> {
        let kit = ExtensionRegistry::with_builtins()?.build()?;
        let doc = deserialize(&kit.schema, markup)?;
        let editor = Editor::new(kit, doc.to_node(), config.history_limit)?;
        Self::new(editor, config)
    }

    pub fn editor(&self) -> &Editor {
        &self.editor
    }

    pub fn document(&self) -> &Document {
        self.editor.document()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Outline from the most recent extraction.
    pub fn outline(&self) -> &[OutlineItem] {
        &self.outline
    }

    pub fn on_outline(&mut self, observer: Box<dyn OutlineObserver>) {
        self.outline_observers.push(observer);
    }

    pub fn on_document(&mut self, observer: Box<dyn DocumentObserver>) {
        self.editor.subscribe(observer);
    }

    pub fn set_sink(&mut self, sink: Box<dyn DocumentSink>) {
        self.sink = Some(sink);
    }

    /// Current document as markup.
    pub fn markup(&self) -> String {
        serialize(self.editor.schema(), self.editor.document().root())
    }

    /// Commits `tx` and re-arms the debouncers when the document changed.
    pub fn commit(&mut self, tx: Transaction, now: Instant) -> Result<u64, EditorError> {
        let before = self.editor.version();
        let version = self.editor.commit(tx)?;
        if version != before {
            self.schedule(now);
        }
        Ok(version)
    }

    pub fn undo(&mut self, now: Instant) -> Result<bool, EditorError> {
        let changed = self.editor.undo()?;
        if changed {
            self.close_slash();
            self.schedule(now);
        }
        Ok(changed)
    }

    pub fn redo(&mut self, now: Instant) -> Result<bool, EditorError> {
        let changed = self.editor.redo()?;
        if changed {
            self.close_slash();
            self.schedule(now);
        }
        Ok(changed)
    }

    /// Inserts typed text at char `offset` of the text leaf at `text_path`
    /// and refreshes the slash menu for the new caret position.
    ///
    /// `text_path` may also point at a position without a text leaf (an
    /// empty text block, or next to an inline node). The text then extends
    /// the preceding text leaf when there is one, or becomes a new leaf.
    pub fn type_text(
        &mut self,
        text_path: &Path,
        offset: usize,
        text: &str,
        now: Instant,
    ) -> Result<u64, EditorError> {
        let typed = text.chars().count();
        let doc = self.editor.document().root();
        let (step, caret_path, caret) = match doc.node_at(text_path) {
            Some(node) if node.is_text() => (
                text_edit(doc, text_path, offset, offset, text),
                text_path.clone(),
                offset + typed,
            ),
            _ => match preceding_text(doc, text_path) {
                Some((leaf_path, len)) => (
                    text_edit(doc, &leaf_path, len, len, text),
                    leaf_path,
                    len + typed,
                ),
                None => (
                    Ok(Step::insert(text_path.clone(), vec![Node::text(text)])),
                    text_path.clone(),
                    typed,
                ),
            },
        };
        let step = step.map_err(|source| EditorError::InvalidStep { index: 0, source })?;
        let version = self.commit(Transaction::from_steps(vec![step]).with_origin("input"), now)?;
        self.update_slash(&caret_path, caret);
        Ok(version)
    }

    /// Opens, updates or closes the slash menu for the caret at char
    /// `caret` of the text leaf at `text_path`. Returns whether the menu
    /// is shown.
    pub fn update_slash(&mut self, text_path: &Path, caret: usize) -> bool {
        let trigger = SlashTrigger::detect(self.editor.document().root(), text_path, caret);
        match trigger {
            Some(trigger) => match self.slash.as_mut() {
                Some(session) => session.update(trigger),
                None => {
                    self.slash = Some(SlashSession::new(self.editor.catalog().clone(), trigger));
                }
            },
            None => self.slash = None,
        }
        self.show_suggestions()
    }

    pub fn show_suggestions(&self) -> bool {
        self.slash.is_some()
    }

    /// Entries matching the live query; empty when the menu is closed.
    pub fn suggestions(&self) -> Vec<&Suggestion> {
        self.slash
            .as_ref()
            .map(SlashSession::matches)
            .unwrap_or_default()
    }

    pub fn selected_suggestion(&self) -> Option<usize> {
        self.slash.as_ref().map(SlashSession::selected_index)
    }

    pub fn close_slash(&mut self) {
        self.slash = None;
    }

    /// Feeds a key to the slash menu. Returns `false` when no menu is open
    /// and the key should be handled by the host.
    pub fn handle_slash_key(&mut self, key: SlashKey, now: Instant) -> Result<bool, EditorError> {
        let Some(session) = self.slash.as_mut() else {
            return Ok(false);
        };
        match session.handle_key(key) {
            SlashOutcome::Moved(_) => Ok(true),
            SlashOutcome::Dismissed => {
                self.slash = None;
                Ok(true)
            }
            SlashOutcome::Apply(entry) => {
                let trigger = session.trigger().clone();
                self.slash = None;
                self.apply_suggestion(&entry, &trigger, now)?;
                Ok(true)
            }
        }
    }

    /// Applies the match at `index` (for pointer selection).
    pub fn choose_suggestion(&mut self, index: usize, now: Instant) -> Result<bool, EditorError> {
        let Some(session) = self.slash.take() else {
            return Ok(false);
        };
        let chosen = session.matches().get(index).map(|entry| (*entry).clone());
        match chosen {
            Some(entry) => {
                self.apply_suggestion(&entry, session.trigger(), now)?;
                Ok(true)
            }
            None => {
                self.slash = Some(session);
                Ok(false)
            }
        }
    }

    /// Replaces `range` with the nodes produced from pasted `text`.
    pub fn paste_text(
        &mut self,
        text: &str,
        range: Range,
        now: Instant,
    ) -> Result<PasteKind, EditorError> {
        let ingested = ingest_text(
            self.editor.schema(),
            text,
            self.config.markdown_paste,
        )?;
        let tx = Transaction::new()
            .with_origin("paste")
            .replace_range(range, ingested.nodes);
        self.commit(tx, now)?;
        Ok(ingested.kind)
    }

    /// Replaces `range` with an image whose `src` is a pre-processed data
    /// URI (or any URL).
    pub fn paste_image(
        &mut self,
        src: &str,
        alt: Option<&str>,
        range: Range,
        now: Instant,
    ) -> Result<u64, EditorError> {
        let mut attrs = Attrs::new();
        attrs.insert("src".to_string(), AttrValue::from(src));
        if let Some(alt) = alt {
            attrs.insert("alt".to_string(), AttrValue::from(alt));
        }
        let image = self.editor.schema().node("image", attrs, Vec::new())?;
        let tx = Transaction::new()
            .with_origin("paste")
            .replace_range(range, vec![image]);
        self.commit(tx, now)
    }

    /// Starts a drag gesture on `source_id`.
    pub fn begin_reorder(&self, source_id: &str) -> Result<ReorderSession, EditorError> {
        Ok(ReorderSession::start(self.editor.document().root(), source_id)?)
    }

    /// Completes a drag gesture.
    pub fn finish_reorder(
        &mut self,
        session: &ReorderSession,
        target_id: &str,
        placement: Placement,
        now: Instant,
    ) -> Result<u64, EditorError> {
        let tx = session.drop_on(self.editor.document().root(), target_id, placement)?;
        self.commit(tx, now)
    }

    /// Moves block `source_id` next to block `target_id`.
    pub fn move_block(
        &mut self,
        source_id: &str,
        target_id: &str,
        placement: Placement,
        now: Instant,
    ) -> Result<u64, EditorError> {
        let session = self.begin_reorder(source_id)?;
        self.finish_reorder(&session, target_id, placement, now)
    }

    /// Runs debounced work whose deadline has passed.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome, EditorError> {
        let mut outcome = TickOutcome::default();
        if self.outline_timer.poll(now) {
            self.refresh_outline(now)?;
            outcome.outline_refreshed = true;
        }
        if self.autosave_timer.poll(now) {
            outcome.saved = self.autosave();
        }
        Ok(outcome)
    }

    /// Extracts the outline now, persisting derived heading ids into the
    /// newest undo entry.
    pub fn refresh_outline(&mut self, now: Instant) -> Result<&[OutlineItem], EditorError> {
        let outline = self.extractor.extract(self.editor.document().root());
        let assigned = outline.assignments.len();
        if assigned > 0 {
            self.editor.commit(outline.assignments)?;
            self.autosave_timer.schedule(now);
        }
        info!(
            "event=outline_refresh module=session status=ok roots={} assigned={}",
            outline.items.len(),
            assigned
        );
        self.outline = outline.items;
        for observer in &mut self.outline_observers {
            observer.outline_changed(&self.outline);
        }
        Ok(&self.outline)
    }

    /// Cancels pending debounced work and closes the slash menu.
    pub fn close(&mut self) {
        self.outline_timer.cancel();
        self.autosave_timer.cancel();
        self.slash = None;
        info!(
            "event=session_close module=session status=ok version={}",
            self.editor.version()
        );
    }

    pub fn has_pending_work(&self) -> bool {
        self.outline_timer.is_pending() || self.autosave_timer.is_pending()
    }

    fn apply_suggestion(
        &mut self,
        entry: &Suggestion,
        trigger: &SlashTrigger,
        now: Instant,
    ) -> Result<u64, EditorError> {
        let tx = entry.apply(
            self.editor.schema(),
            self.editor.document().root(),
            trigger,
        )?;
        self.commit(tx, now)
    }

    fn schedule(&mut self, now: Instant) {
        self.outline_timer.schedule(now);
        self.autosave_timer.schedule(now);
    }

    fn autosave(&mut self) -> bool {
        let version = self.editor.version();
        if self.saved_version == Some(version) {
            return false;
        }
        let markup = self.markup();
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.persist(markup.as_str(), version) {
            Ok(()) => {
                self.saved_version = Some(version);
                info!(
                    "event=autosave module=session status=ok version={} bytes={}",
                    version,
                    markup.len()
                );
                true
            }
            Err(err) => {
                warn!(
                    "event=autosave module=session status=error version={} error={}",
                    version, err
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("editor", &self.editor)
            .field("config", &self.config)
            .field("show_suggestions", &self.show_suggestions())
            .field("pending", &self.has_pending_work())
            .finish()
    }
}

/// Path and char length of the text leaf right before `path`, if any.
fn preceding_text(doc: &Node, path: &Path) -> Option<(Path, usize)> {
    let (parent, index) = path.split_last()?;
    let previous = parent.child(index.checked_sub(1)?);
    let len = doc.node_at(&previous)?.text_value()?.chars().count();
    Some((previous, len))
}

#[cfg(test)]
mod tests {
    use super::EditorSession;
    use crate::config::EditorConfig;
    use crate::model::path::Path;
    use crate::suggest::SlashKey;
    use std::time::{Duration, Instant};

    #[test]
    fn typing_slash_opens_menu_and_escape_closes_it() {
        let mut session = EditorSession::with_builtins(EditorConfig::default()).expect("session");
        let now = Instant::now();
        let text_path = Path::from(vec![0, 0]);
        session
            .type_text(&text_path, 0, "/", now)
            .expect("type slash");
        assert!(session.show_suggestions());
        assert_eq!(
            session.suggestions().len(),
            session.editor().catalog().len()
        );

        assert!(session
            .handle_slash_key(SlashKey::Escape, now)
            .expect("escape"));
        assert!(!session.show_suggestions());
        assert!(!session
            .handle_slash_key(SlashKey::Enter, now)
            .expect("no menu"));
    }

    #[test]
    fn edits_inside_the_quiet_period_coalesce() {
        let mut session = EditorSession::with_builtins(EditorConfig::default()).expect("session");
        let start = Instant::now();
        let text_path = Path::from(vec![0, 0]);
        session.type_text(&text_path, 0, "a", start).expect("a");
        session
            .type_text(&text_path, 1, "b", start + Duration::from_millis(200))
            .expect("b");

        let early = session
            .tick(start + Duration::from_millis(400))
            .expect("tick");
        assert!(!early.outline_refreshed);
        let late = session
            .tick(start + Duration::from_millis(500))
            .expect("tick");
        assert!(late.outline_refreshed);
    }

    #[test]
    fn close_cancels_pending_work() {
        let mut session = EditorSession::with_builtins(EditorConfig::default()).expect("session");
        let now = Instant::now();
        session
            .type_text(&Path::from(vec![0, 0]), 0, "x", now)
            .expect("type");
        assert!(session.has_pending_work());
        session.close();
        assert!(!session.has_pending_work());
        let outcome = session.tick(now + Duration::from_secs(5)).expect("tick");
        assert!(!outcome.outline_refreshed && !outcome.saved);
    }
}
