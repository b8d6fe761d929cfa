//! Slash-command suggestions.
//!
//! # Responsibility
//! - Hold the static catalog of insertable fragments contributed by
//!   extensions.
//! - Track a live `/query` and a wrapping selection over the matches.
//! - Turn the chosen entry into one transaction.
//!
//! # Invariants
//! - Filtering preserves catalog order.
//! - Every query change resets the selection to the first match.
//! - Applying an entry removes the trigger text and inserts the fragment in
//!   the same transaction, so one undo reverts both.

use crate::extension::schema::{Schema, SchemaError};
use crate::model::node::{Node, NodeContent};
use crate::model::path::{Path, Range};
use crate::transform::step::{text_edit, Step, StepError};
use crate::transform::transaction::Transaction;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Character that opens the slash menu.
pub const SLASH: char = '/';

/// Builds the nodes a suggestion inserts.
pub type FragmentBuilder = fn(&Schema) -> Result<Vec<Node>, SchemaError>;

/// Immutable catalog entry.
#[derive(Debug, Clone)]
pub struct Suggestion {
    pub title: String,
    pub category: String,
    pub search_terms: Vec<String>,
    build: FragmentBuilder,
}

impl Suggestion {
    pub fn new(title: &str, category: &str, search_terms: &[&str], build: FragmentBuilder) -> Self {
        Self {
            title: title.to_string(),
            category: category.to_string(),
            search_terms: search_terms.iter().map(|term| term.to_string()).collect(),
            build,
        }
    }

    /// Case-insensitive substring match against title and search terms.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(query.as_str())
            || self
                .search_terms
                .iter()
                .any(|term| term.to_lowercase().contains(query.as_str()))
    }

    pub fn fragment(&self, schema: &Schema) -> Result<Vec<Node>, SchemaError> {
        (self.build)(schema)
    }

    /// Builds the transaction that replaces the trigger with this entry.
    ///
    /// The `/query` text is removed first. When that leaves the host block
    /// empty the fragment replaces it; otherwise it lands right after it.
    pub fn apply(
        &self,
        schema: &Schema,
        doc: &Node,
        trigger: &SlashTrigger,
    ) -> Result<Transaction, SuggestError> {
        let fragment = self.fragment(schema)?;
        let host = trigger
            .text_path
            .parent()
            .filter(|path| !path.is_root())
            .ok_or_else(|| SuggestError::NoHostBlock(trigger.text_path.clone()))?;

        let remove = text_edit(
            doc,
            &trigger.text_path,
            trigger.offset,
            trigger.end(),
            "",
        )?;
        let (after_remove, _) = remove.apply(schema, doc)?;
        let host_is_empty = after_remove
            .node_at(&host)
            .is_some_and(|node| node.children().is_empty());

        let mut tx = Transaction::new().with_origin("slash");
        tx.push(remove);
        if host_is_empty {
            let range = Range::single(&host).ok_or_else(|| SuggestError::NoHostBlock(host.clone()))?;
            tx.push(Step::replace_range(range, fragment));
        } else {
            let (parent, index) = host
                .split_last()
                .ok_or_else(|| SuggestError::NoHostBlock(host.clone()))?;
            tx.push(Step::insert(
                parent.child(index + 1),
                fragment,
            ));
        }
        Ok(tx)
    }
}

/// Location of an active `/query` inside a text leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlashTrigger {
    pub text_path: Path,
    /// Char offset of the slash.
    pub offset: usize,
    pub query: String,
}

impl SlashTrigger {
    /// Finds a trigger ending at `caret` (char offset) in the text leaf at
    /// `text_path`.
    ///
    /// The slash must start the leaf or follow whitespace, and the query
    /// between slash and caret must not contain whitespace.
    pub fn detect(doc: &Node, text_path: &Path, caret: usize) -> Option<Self> {
        let node = doc.node_at(text_path)?;
        let NodeContent::Text(text) = &node.content else {
            return None;
        };
        let before: Vec<char> = text.chars().take(caret).collect();
        if before.len() < caret {
            return None;
        }
        let slash = before.iter().rposition(|c| *c == SLASH)?;
        let query: String = before[slash + 1..].iter().collect();
        if query.chars().any(char::is_whitespace) {
            return None;
        }
        if slash > 0 && !before[slash - 1].is_whitespace() {
            return None;
        }
        Some(Self {
            text_path: text_path.clone(),
            offset: slash,
            query,
        })
    }

    /// Char offset just past the query.
    pub fn end(&self) -> usize {
        self.offset + 1 + self.query.chars().count()
    }
}

/// Ordered, immutable list of suggestions.
#[derive(Debug, Clone, Default)]
pub struct SuggestionCatalog {
    entries: Vec<Suggestion>,
}

impl SuggestionCatalog {
    pub fn new(entries: Vec<Suggestion>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Suggestion] {
        &self.entries
    }

    /// Entries matching `query`, in catalog order.
    pub fn filter(&self, query: &str) -> Vec<&Suggestion> {
        self.entries
            .iter()
            .filter(|entry| entry.matches(query))
            .collect()
    }

    /// Matches grouped by category, categories in first-seen order.
    pub fn grouped(&self, query: &str) -> Vec<(&str, Vec<&Suggestion>)> {
        let mut groups: Vec<(&str, Vec<&Suggestion>)> = Vec::new();
        for entry in self.filter(query) {
            match groups
                .iter_mut()
                .find(|(category, _)| *category == entry.category)
            {
                Some((_, items)) => items.push(entry),
                None => groups.push((entry.category.as_str(), vec![entry])),
            }
        }
        groups
    }
}

/// Keys the slash menu reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashKey {
    Up,
    Down,
    Enter,
    Tab,
    Escape,
}

/// Result of feeding a key to a [`SlashSession`].
#[derive(Debug, Clone)]
pub enum SlashOutcome {
    /// Selection moved; the menu stays open.
    Moved(usize),
    /// Apply this entry and close the menu.
    Apply(Suggestion),
    /// Close the menu without mutating the document.
    Dismissed,
}

/// Live slash menu: trigger, matches and selection.
#[derive(Debug, Clone)]
pub struct SlashSession {
    catalog: Arc<SuggestionCatalog>,
    trigger: SlashTrigger,
    matches: Vec<usize>,
    selected: usize,
}

impl SlashSession {
    pub fn new(catalog: Arc<SuggestionCatalog>, trigger: SlashTrigger) -> Self {
        let mut session = Self {
            catalog,
            trigger,
            matches: Vec::new(),
            selected: 0,
        };
        session.refresh();
        session
    }

    pub fn trigger(&self) -> &SlashTrigger {
        &self.trigger
    }

    /// Replaces the trigger (and query), resetting the selection.
    pub fn update(&mut self, trigger: SlashTrigger) {
        self.trigger = trigger;
        self.refresh();
    }

    pub fn set_query(&mut self, query: &str) {
        self.trigger.query = query.to_string();
        self.refresh();
    }

    pub fn query(&self) -> &str {
        self.trigger.query.as_str()
    }

    pub fn matches(&self) -> Vec<&Suggestion> {
        self.matches
            .iter()
            .filter_map(|index| self.catalog.entries().get(*index))
            .collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&Suggestion> {
        self.matches
            .get(self.selected)
            .and_then(|index| self.catalog.entries().get(*index))
    }

    pub fn handle_key(&mut self, key: SlashKey) -> SlashOutcome {
        let count = self.matches.len();
        match key {
            SlashKey::Up | SlashKey::Down if count == 0 => SlashOutcome::Moved(0),
            SlashKey::Up => {
                self.selected = (self.selected + count - 1) % count;
                SlashOutcome::Moved(self.selected)
            }
            SlashKey::Down => {
                self.selected = (self.selected + 1) % count;
                SlashOutcome::Moved(self.selected)
            }
            SlashKey::Enter | SlashKey::Tab => match self.selected() {
                Some(entry) => SlashOutcome::Apply(entry.clone()),
                None => SlashOutcome::Dismissed,
            },
            SlashKey::Escape => SlashOutcome::Dismissed,
        }
    }

    fn refresh(&mut self) {
        let query = self.trigger.query.as_str();
        self.matches = self
            .catalog
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.matches(query))
            .map(|(index, _)| index)
            .collect();
        self.selected = 0;
    }
}

/// Slash application errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestError {
    /// The trigger text is not inside a block that can host a fragment.
    NoHostBlock(Path),
    Fragment(SchemaError),
    Step(StepError),
}

impl Display for SuggestError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHostBlock(path) => write!(f, "no host block for slash trigger at {path}"),
            Self::Fragment(err) => write!(f, "suggestion fragment is invalid: {err}"),
            Self::Step(err) => write!(f, "slash trigger cannot be removed: {err}"),
        }
    }
}

impl Error for SuggestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NoHostBlock(_) => None,
            Self::Fragment(err) => Some(err),
            Self::Step(err) => Some(err),
        }
    }
}

impl From<SchemaError> for SuggestError {
    fn from(value: SchemaError) -> Self {
        Self::Fragment(value)
    }
}

impl From<StepError> for SuggestError {
    fn from(value: StepError) -> Self {
        Self::Step(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{SlashKey, SlashOutcome, SlashSession, SlashTrigger, Suggestion, SuggestionCatalog};
    use crate::model::node::{Attrs, Node};
    use crate::model::path::Path;
    use std::sync::Arc;

    fn entry(title: &str, terms: &[&str]) -> Suggestion {
        Suggestion::new(title, "test", terms, |_| Ok(Vec::new()))
    }

    fn catalog() -> Arc<SuggestionCatalog> {
        Arc::new(SuggestionCatalog::new(vec![
            entry("正文", &["text", "paragraph"]),
            entry("表格", &["table", "grid", "表格"]),
            entry("标题 1", &["h1", "heading"]),
        ]))
    }

    fn trigger(query: &str) -> SlashTrigger {
        SlashTrigger {
            text_path: Path::from(vec![0, 0]),
            offset: 0,
            query: query.to_string(),
        }
    }

    #[test]
    fn filter_is_case_insensitive_and_ordered() {
        let catalog = catalog();
        let titles: Vec<_> = catalog
            .filter("TAB")
            .into_iter()
            .map(|entry| entry.title.as_str())
            .collect();
        assert_eq!(titles, vec!["表格"]);
        assert_eq!(catalog.filter("").len(), 3);
        assert_eq!(catalog.filter("表").len(), 1);
    }

    #[test]
    fn selection_wraps_and_resets_on_query_change() {
        let mut session = SlashSession::new(catalog(), trigger(""));
        assert!(matches!(session.handle_key(SlashKey::Up), SlashOutcome::Moved(2)));
        assert!(matches!(session.handle_key(SlashKey::Down), SlashOutcome::Moved(0)));
        session.handle_key(SlashKey::Down);
        assert_eq!(session.selected_index(), 1);

        session.set_query("h");
        assert_eq!(session.selected_index(), 0);
        assert_eq!(session.matches().len(), 2);
    }

    #[test]
    fn enter_without_matches_dismisses() {
        let mut session = SlashSession::new(catalog(), trigger("zzz"));
        assert!(session.matches().is_empty());
        assert!(matches!(session.handle_key(SlashKey::Down), SlashOutcome::Moved(0)));
        assert!(matches!(session.handle_key(SlashKey::Enter), SlashOutcome::Dismissed));

        session.set_query("grid");
        match session.handle_key(SlashKey::Tab) {
            SlashOutcome::Apply(entry) => assert_eq!(entry.title, "表格"),
            other => panic!("expected apply, got {other:?}"),
        }
    }

    #[test]
    fn detects_trigger_after_whitespace_only() {
        let doc = Node::element(
            "doc",
            Attrs::new(),
            vec![Node::element(
                "paragraph",
                Attrs::new(),
                vec![Node::text("see /tab and a/b")],
            )],
        );
        let path = Path::from(vec![0, 0]);
        let found = SlashTrigger::detect(&doc, &path, 8).expect("trigger");
        assert_eq!(found.offset, 4);
        assert_eq!(found.query, "tab");
        assert_eq!(found.end(), 8);

        assert!(SlashTrigger::detect(&doc, &path, 16).is_none());
        assert!(SlashTrigger::detect(&doc, &path, 12).is_none());
        assert!(SlashTrigger::detect(&doc, &path, 99).is_none());
    }
}
