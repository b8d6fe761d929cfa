//! Node and mark type declarations contributed by extensions.

use crate::model::node::{AttrValue, Attrs, Mark, Node, BLOCK_ID_ATTR};
use crate::render::{DomElement, DomSpec};

/// Group name for block-level node types.
pub const GROUP_BLOCK: &str = "block";
/// Group name for inline node types (text included).
pub const GROUP_INLINE: &str = "inline";

/// Value kind accepted by one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    Any,
    Bool,
    Int,
    Str,
}

impl AttrKind {
    fn of(value: &AttrValue) -> Self {
        match value {
            AttrValue::Null => Self::Any,
            AttrValue::Bool(_) => Self::Bool,
            AttrValue::Int(_) => Self::Int,
            AttrValue::Str(_) => Self::Str,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "string",
        }
    }
}

/// Declaration for one attribute key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpec {
    /// `None` marks the attribute as required.
    pub default: Option<AttrValue>,
    pub kind: AttrKind,
}

impl AttrSpec {
    pub fn required(kind: AttrKind) -> Self {
        Self {
            default: None,
            kind,
        }
    }

    /// Nullable attribute defaulting to `null`.
    pub fn optional(kind: AttrKind) -> Self {
        Self {
            default: Some(AttrValue::Null),
            kind,
        }
    }

    pub fn with_default(value: impl Into<AttrValue>) -> Self {
        let value = value.into();
        Self {
            kind: AttrKind::of(&value),
            default: Some(value),
        }
    }

    /// Whether `value` is acceptable for this declaration.
    pub fn accepts(&self, value: &AttrValue) -> bool {
        if value.is_null() {
            return self.default.as_ref().is_some_and(AttrValue::is_null);
        }
        self.kind == AttrKind::Any || self.kind == AttrKind::of(value)
    }
}

/// Renders one node into an element template.
pub type RenderNodeFn = fn(&Node) -> DomSpec;
/// Matches an element and decodes node attributes from it.
pub type ParseNodeFn = fn(&DomElement) -> Option<Attrs>;
/// Renders one mark into an element template.
pub type RenderMarkFn = fn(&Mark) -> DomSpec;
/// Matches an element and decodes mark attributes from it.
pub type ParseMarkFn = fn(&DomElement) -> Option<Attrs>;

/// Schema rules for one node type.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub group: Option<String>,
    /// Content expression; empty for atoms and text.
    pub content: String,
    /// Attribute declarations in declaration order.
    pub attrs: Vec<(String, AttrSpec)>,
    pub is_text: bool,
    /// Whether text children may carry marks.
    pub allows_marks: bool,
    pub render: RenderNodeFn,
    pub parse: Option<ParseNodeFn>,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, render: RenderNodeFn) -> Self {
        Self {
            name: name.into(),
            group: None,
            content: String::new(),
            attrs: Vec::new(),
            is_text: false,
            allows_marks: true,
            render,
            parse: None,
        }
    }

    /// Block-level container carrying a stable `blockId`.
    pub fn block(name: impl Into<String>, render: RenderNodeFn) -> Self {
        Self::new(name, render).with_block_id()
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn content(mut self, expr: impl Into<String>) -> Self {
        self.content = expr.into();
        self
    }

    pub fn attr(mut self, key: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.push((key.into(), spec));
        self
    }

    pub fn text_leaf(mut self) -> Self {
        self.is_text = true;
        self
    }

    pub fn without_marks(mut self) -> Self {
        self.allows_marks = false;
        self
    }

    pub fn parse_with(mut self, parse: ParseNodeFn) -> Self {
        self.parse = Some(parse);
        self
    }

    pub fn with_block_id(self) -> Self {
        self.attr(BLOCK_ID_ATTR, AttrSpec::optional(AttrKind::Str))
    }

    pub fn attr_spec(&self, key: &str) -> Option<&AttrSpec> {
        self.attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, spec)| spec)
    }

    pub fn has_block_id(&self) -> bool {
        self.attr_spec(BLOCK_ID_ATTR).is_some()
    }

    pub fn is_in_group(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group)
    }
}

/// Schema rules for one mark type.
#[derive(Debug, Clone)]
pub struct MarkSpec {
    pub name: String,
    pub attrs: Vec<(String, AttrSpec)>,
    pub render: RenderMarkFn,
    pub parse: Option<ParseMarkFn>,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>, render: RenderMarkFn) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            render,
            parse: None,
        }
    }

    pub fn attr(mut self, key: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.push((key.into(), spec));
        self
    }

    pub fn parse_with(mut self, parse: ParseMarkFn) -> Self {
        self.parse = Some(parse);
        self
    }
}
