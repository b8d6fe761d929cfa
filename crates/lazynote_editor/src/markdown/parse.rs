//! Markdown to node-tree conversion.
//!
//! # Invariants
//! - The returned fragment is normalized and every container satisfies its
//!   content expression.
//! - Images are hoisted out of inline content to block level.
//! - Inline content that arrives directly in a list item, task item or
//!   table cell is wrapped in an implicit paragraph.

use crate::extension::schema::{Schema, SchemaError, TOP_NODE};
use crate::model::node::{AttrValue, Attrs, Mark, Node, NodeContent};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Markdown conversion failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownError {
    /// Input produced no blocks.
    Empty,
    /// A container could not be made to satisfy its content expression.
    Unsupported { type_name: String },
    /// The converted fragment does not satisfy the schema.
    Schema(SchemaError),
}

impl Display for MarkdownError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "markdown produced no content"),
            Self::Unsupported { type_name } => {
                write!(f, "markdown structure cannot be expressed as `{type_name}`")
            }
            Self::Schema(err) => write!(f, "converted markdown is invalid: {err}"),
        }
    }
}

impl Error for MarkdownError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schema(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for MarkdownError {
    fn from(value: SchemaError) -> Self {
        Self::Schema(value)
    }
}

/// Converts CommonMark (tables, strikethrough and task lists enabled) into
/// block nodes.
pub fn parse_markdown(schema: &Schema, text: &str) -> Result<Vec<Node>, MarkdownError> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new(schema);
    for event in Parser::new_ext(text, options) {
        builder.event(event)?;
    }
    builder.finish()
}

struct Frame {
    type_name: &'static str,
    attrs: Attrs,
    children: Vec<Node>,
    /// Opened without a matching start tag; dropped when left empty.
    implicit: bool,
    /// Raw text collected by code blocks.
    code: Option<String>,
}

impl Frame {
    fn new(type_name: &'static str, attrs: Attrs) -> Self {
        Self {
            type_name,
            attrs,
            children: Vec::new(),
            implicit: false,
            code: None,
        }
    }

    fn implicit(type_name: &'static str, attrs: Attrs) -> Self {
        Self {
            implicit: true,
            ..Self::new(type_name, attrs)
        }
    }
}

/// What a start event opened, so the matching end event can close it.
enum Open {
    /// Block frame at this stack index.
    Block(usize),
    Mark,
    Image,
    Ignored,
}

struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

struct TreeBuilder<'s> {
    schema: &'s Schema,
    frames: Vec<Frame>,
    opens: Vec<Open>,
    marks: Vec<Mark>,
    image: Option<PendingImage>,
}

impl<'s> TreeBuilder<'s> {
    fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            frames: vec![Frame::new(TOP_NODE, Attrs::new())],
            opens: Vec::new(),
            marks: Vec::new(),
            image: None,
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), MarkdownError> {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => {
                self.text(&text);
                Ok(())
            }
            Event::Code(code) => {
                let mut marks = self.marks.clone();
                marks.push(Mark::new("code"));
                self.inline(Node::marked_text(code.to_string(), marks));
                Ok(())
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.text(html.trim_end_matches('\n'));
                Ok(())
            }
            Event::SoftBreak => {
                self.text(" ");
                Ok(())
            }
            Event::HardBreak => {
                if self.in_code_block() {
                    self.text("\n");
                } else {
                    self.inline(Node::element("hard_break", Attrs::new(), Vec::new()));
                }
                Ok(())
            }
            Event::Rule => {
                self.close_implicit()?;
                self.top()
                    .children
                    .push(Node::element("horizontal_rule", Attrs::new(), Vec::new()));
                Ok(())
            }
            Event::TaskListMarker(checked) => {
                self.mark_task_item(checked);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn start(&mut self, tag: Tag<'_>) -> Result<(), MarkdownError> {
        let open = match tag {
            Tag::Paragraph | Tag::HtmlBlock => self.open_block(Frame::new("paragraph", Attrs::new()))?,
            Tag::Heading { level, .. } => {
                let mut attrs = Attrs::new();
                attrs.insert("level".to_string(), AttrValue::Int(level as i64));
                self.open_block(Frame::new("heading", attrs))?
            }
            Tag::BlockQuote { .. } => self.open_block(Frame::new("blockquote", Attrs::new()))?,
            Tag::CodeBlock(kind) => {
                let mut attrs = Attrs::new();
                if let CodeBlockKind::Fenced(info) = kind {
                    if let Some(language) = info.split_whitespace().next() {
                        attrs.insert("language".to_string(), AttrValue::from(language));
                    }
                }
                let mut frame = Frame::new("code_block", attrs);
                frame.code = Some(String::new());
                self.open_block(frame)?
            }
            Tag::List(Some(start)) => {
                let mut attrs = Attrs::new();
                let start = i64::try_from(start).unwrap_or(1);
                attrs.insert("start".to_string(), AttrValue::Int(start));
                self.open_block(Frame::new("ordered_list", attrs))?
            }
            Tag::List(None) => self.open_block(Frame::new("bullet_list", Attrs::new()))?,
            Tag::Item => self.open_block(Frame::new("list_item", Attrs::new()))?,
            Tag::Table(_) => self.open_block(Frame::new("table", Attrs::new()))?,
            Tag::TableHead | Tag::TableRow => {
                self.open_block(Frame::new("table_row", Attrs::new()))?
            }
            Tag::TableCell => self.open_block(Frame::new("table_cell", Attrs::new()))?,
            Tag::Emphasis => self.open_mark(Mark::new("italic")),
            Tag::Strong => self.open_mark(Mark::new("bold")),
            Tag::Strikethrough => self.open_mark(Mark::new("strike")),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut attrs = Attrs::new();
                attrs.insert("href".to_string(), AttrValue::from(dest_url.to_string()));
                if !title.is_empty() {
                    attrs.insert("title".to_string(), AttrValue::from(title.to_string()));
                }
                self.open_mark(Mark::with_attrs("link", attrs))
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
                Open::Image
            }
            _ => Open::Ignored,
        };
        self.opens.push(open);
        Ok(())
    }

    fn end(&mut self) -> Result<(), MarkdownError> {
        match self.opens.pop() {
            Some(Open::Block(index)) => {
                while self.frames.len() > index + 1 {
                    self.finish_top()?;
                }
                if self.frames.len() == index + 1 {
                    self.finish_top()?;
                }
                Ok(())
            }
            Some(Open::Mark) => {
                self.marks.pop();
                Ok(())
            }
            Some(Open::Image) => self.finish_image(),
            Some(Open::Ignored) | None => Ok(()),
        }
    }

    fn finish(mut self) -> Result<Vec<Node>, MarkdownError> {
        while self.frames.len() > 1 {
            self.finish_top()?;
        }
        let root = self.frames.pop().map(|frame| frame.children).unwrap_or_default();
        if root.is_empty() {
            return Err(MarkdownError::Empty);
        }
        let doc = self.schema.node(TOP_NODE, Attrs::new(), root)?;
        self.schema.validate(&doc)?;
        match doc.content {
            NodeContent::Children(children) => Ok(children),
            NodeContent::Text(_) => Err(MarkdownError::Empty),
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn top_type(&self) -> &'static str {
        self.frames.last().map_or(TOP_NODE, |frame| frame.type_name)
    }

    fn in_code_block(&self) -> bool {
        self.frames.last().is_some_and(|frame| frame.code.is_some())
    }

    fn open_block(&mut self, frame: Frame) -> Result<Open, MarkdownError> {
        self.close_implicit()?;
        self.frames.push(frame);
        Ok(Open::Block(self.frames.len() - 1))
    }

    fn open_mark(&mut self, mark: Mark) -> Open {
        self.marks.push(mark);
        Open::Mark
    }

    fn close_implicit(&mut self) -> Result<(), MarkdownError> {
        while self.frames.len() > 1 && self.frames.last().is_some_and(|frame| frame.implicit) {
            self.finish_top()?;
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(image) = self.image.as_mut() {
            image.alt.push_str(text);
            return;
        }
        if let Some(code) = self.frames.last_mut().and_then(|frame| frame.code.as_mut()) {
            code.push_str(text);
            return;
        }
        let node = Node::marked_text(text, self.marks.clone());
        self.inline(node);
    }

    /// Appends inline content, opening an implicit paragraph when the
    /// current container does not take inline children.
    fn inline(&mut self, node: Node) {
        if !self.schema.is_textblock(self.top_type()) {
            self.frames.push(Frame::implicit("paragraph", Attrs::new()));
        }
        let children = &mut self.top().children;
        if let (Some(last), NodeContent::Text(addition)) = (children.last_mut(), &node.content) {
            if last.marks == node.marks {
                if let NodeContent::Text(existing) = &mut last.content {
                    existing.push_str(addition);
                    return;
                }
            }
        }
        children.push(node);
    }

    fn mark_task_item(&mut self, checked: bool) {
        let item = self
            .frames
            .iter_mut()
            .rev()
            .find(|frame| frame.type_name == "list_item");
        if let Some(item) = item {
            item.type_name = "task_item";
            item.attrs
                .insert("checked".to_string(), AttrValue::Bool(checked));
        }
    }

    fn finish_image(&mut self) -> Result<(), MarkdownError> {
        let Some(image) = self.image.take() else {
            return Ok(());
        };
        let mut attrs = Attrs::new();
        attrs.insert("src".to_string(), AttrValue::from(image.src));
        if !image.alt.is_empty() {
            attrs.insert("alt".to_string(), AttrValue::from(image.alt.as_str()));
        }
        if !image.title.is_empty() {
            attrs.insert("title".to_string(), AttrValue::from(image.title));
        }
        let node = Node::element("image", attrs, Vec::new());

        let host_index = self.frames.len().saturating_sub(2);
        let can_hoist = self.frames.len() > 1
            && self.schema.is_textblock(self.top_type())
            && self.frames[host_index].type_name != "table_cell";
        if !can_hoist {
            // Cells only hold paragraphs; keep the alt text instead.
            self.inline(Node::marked_text(image.alt.as_str(), self.marks.clone()));
            return Ok(());
        }

        // Split the text block around the image.
        let Some(block) = self.frames.pop() else {
            return Ok(());
        };
        let continuation = Frame::implicit(block.type_name, block.attrs.clone());
        let host = self.top();
        if !block.children.is_empty() {
            host.children
                .push(Node::element(block.type_name, block.attrs, block.children));
        }
        host.children.push(node);
        self.frames.push(continuation);
        Ok(())
    }

    fn finish_top(&mut self) -> Result<(), MarkdownError> {
        if self.frames.len() <= 1 {
            return Ok(());
        }
        let Some(mut frame) = self.frames.pop() else {
            return Ok(());
        };
        if let Some(code) = frame.code.take() {
            let code = code.strip_suffix('\n').unwrap_or(code.as_str());
            if !code.is_empty() {
                frame.children.push(Node::text(code));
            }
        }
        if frame.implicit && frame.children.is_empty() {
            return Ok(());
        }
        retype_task_lists(&mut frame);

        if !self.schema.content_matches(frame.type_name, &frame.children) {
            frame
                .children
                .insert(0, Node::element("paragraph", Attrs::new(), Vec::new()));
            if !self.schema.content_matches(frame.type_name, &frame.children) {
                return Err(MarkdownError::Unsupported {
                    type_name: frame.type_name.to_string(),
                });
            }
        }
        let node = Node::element(frame.type_name, frame.attrs, frame.children);
        self.top().children.push(node);
        Ok(())
    }
}

/// Bullet lists holding task items become task lists; ordered lists keep
/// plain items.
fn retype_task_lists(frame: &mut Frame) {
    let has_tasks = frame
        .children
        .iter()
        .any(|child| child.type_name == "task_item");
    if !has_tasks {
        return;
    }
    match frame.type_name {
        "bullet_list" => {
            frame.type_name = "task_list";
            for child in &mut frame.children {
                if child.type_name == "list_item" {
                    child.type_name = "task_item".to_string();
                }
            }
        }
        "ordered_list" => {
            for child in &mut frame.children {
                if child.type_name == "task_item" {
                    child.type_name = "list_item".to_string();
                    child.attrs.remove("checked");
                }
            }
        }
        _ => {}
    }
}
