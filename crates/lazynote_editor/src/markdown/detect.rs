//! Heuristic markdown detection for pasted text.
//!
//! Detection is permissive: one signal is enough.

use once_cell::sync::Lazy;
use regex::Regex;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s{0,3}#{1,6}\s+\S").expect("valid heading regex"));
static BULLET_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*[-*+]\s+\S").expect("valid bullet regex"));
static ORDERED_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*\d{1,9}[.)]\s+\S").expect("valid ordered list regex"));
static BLOCKQUOTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s{0,3}>\s?\S").expect("valid blockquote regex"));
static BOLD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*[^*\n]+\*\*|__[^_\n]+__").expect("valid bold regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^*\w])\*[^*\s][^*\n]*\*(?:[^*]|$)|(?:^|\s)_[^_\s][^_\n]*_(?:\W|$)")
        .expect("valid italic regex")
});
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]\n]+\]\([^)\s]+(?:\s+[^)]*)?\)").expect("valid link regex"));
static INLINE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("valid inline code regex"));
static FENCED_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s{0,3}(?:```|~~~)").expect("valid fence regex"));
static HORIZONTAL_RULE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s{0,3}(?:(?:-\s*){3,}|(?:\*\s*){3,}|(?:_\s*){3,})$")
        .expect("valid rule regex")
});

/// Markdown construct recognized in plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownSignal {
    Heading,
    BulletList,
    OrderedList,
    Blockquote,
    Bold,
    Italic,
    Link,
    InlineCode,
    FencedCode,
    HorizontalRule,
}

impl MarkdownSignal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heading => "heading",
            Self::BulletList => "bullet_list",
            Self::OrderedList => "ordered_list",
            Self::Blockquote => "blockquote",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::Link => "link",
            Self::InlineCode => "inline_code",
            Self::FencedCode => "fenced_code",
            Self::HorizontalRule => "horizontal_rule",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Heading => &HEADING_RE,
            Self::BulletList => &BULLET_LIST_RE,
            Self::OrderedList => &ORDERED_LIST_RE,
            Self::Blockquote => &BLOCKQUOTE_RE,
            Self::Bold => &BOLD_RE,
            Self::Italic => &ITALIC_RE,
            Self::Link => &LINK_RE,
            Self::InlineCode => &INLINE_CODE_RE,
            Self::FencedCode => &FENCED_CODE_RE,
            Self::HorizontalRule => &HORIZONTAL_RULE_RE,
        }
    }
}

const ALL_SIGNALS: [MarkdownSignal; 10] = [
    MarkdownSignal::Heading,
    MarkdownSignal::BulletList,
    MarkdownSignal::OrderedList,
    MarkdownSignal::Blockquote,
    MarkdownSignal::Bold,
    MarkdownSignal::Italic,
    MarkdownSignal::Link,
    MarkdownSignal::InlineCode,
    MarkdownSignal::FencedCode,
    MarkdownSignal::HorizontalRule,
];

/// Every signal present in `text`.
pub fn markdown_signals(text: &str) -> Vec<MarkdownSignal> {
    ALL_SIGNALS
        .into_iter()
        .filter(|signal| signal.pattern().is_match(text))
        .collect()
}

/// Whether `text` looks like markdown.
pub fn is_markdown_like(text: &str) -> bool {
    ALL_SIGNALS
        .iter()
        .any(|signal| signal.pattern().is_match(text))
}

#[cfg(test)]
mod tests {
    use super::{is_markdown_like, markdown_signals, MarkdownSignal};

    #[test]
    fn recognizes_inline_signals() {
        let signals = markdown_signals("**bold** and a [link](http://x)");
        assert!(signals.contains(&MarkdownSignal::Bold));
        assert!(signals.contains(&MarkdownSignal::Link));
        assert!(is_markdown_like("use `cargo` here"));
        assert!(is_markdown_like("an *emphasis* word"));
    }

    #[test]
    fn recognizes_block_signals() {
        assert!(is_markdown_like("# Title"));
        assert!(is_markdown_like("intro\n- item"));
        assert!(is_markdown_like("1. first\n2. second"));
        assert!(is_markdown_like("> quote"));
        assert!(is_markdown_like("```\ncode\n```"));
        assert!(is_markdown_like("above\n\n---\n\nbelow"));
    }

    #[test]
    fn plain_prose_is_not_markdown() {
        assert!(!is_markdown_like("Just a sentence, nothing more."));
        assert!(!is_markdown_like("price: 3 * 4 = 12"));
        assert!(!is_markdown_like("snake_case_name stays plain"));
        assert!(!is_markdown_like("#hashtag without space"));
    }
}
