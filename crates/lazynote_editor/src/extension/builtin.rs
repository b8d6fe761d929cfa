//! First-party extensions shipped with the editor.
//!
//! Each extension declares its node/mark types (with render and parse rules
//! for the markup format) and the slash commands that insert them.

use crate::extension::kernel::EditorExtension;
use crate::extension::schema::{int_attr, Schema, SchemaError};
use crate::extension::spec::{AttrKind, AttrSpec, MarkSpec, NodeSpec, GROUP_BLOCK, GROUP_INLINE};
use crate::model::node::{AttrValue, Attrs, Mark, Node, BLOCK_ID_ATTR};
use crate::render::{DomElement, DomSpec};
use crate::suggest::Suggestion;

const CATEGORY_BASIC: &str = "基础";
const CATEGORY_LIST: &str = "列表";
const CATEGORY_ADVANCED: &str = "高级";

/// Declaration table for one first-party extension.
pub struct FirstPartyExtension {
    id: &'static str,
    nodes: fn() -> Vec<NodeSpec>,
    marks: fn() -> Vec<MarkSpec>,
    commands: fn() -> Vec<Suggestion>,
}

impl EditorExtension for FirstPartyExtension {
    fn id(&self) -> &str {
        self.id
    }

    fn nodes(&self) -> Vec<NodeSpec> {
        (self.nodes)()
    }

    fn marks(&self) -> Vec<MarkSpec> {
        (self.marks)()
    }

    fn commands(&self) -> Vec<Suggestion> {
        (self.commands)()
    }
}

/// Built-in extensions in registration order.
pub fn builtin_extensions() -> Vec<Box<dyn EditorExtension>> {
    let table = [
        FirstPartyExtension {
            id: "builtin.document",
            nodes: document_nodes,
            marks: Vec::new,
            commands: paragraph_commands,
        },
        FirstPartyExtension {
            id: "builtin.heading",
            nodes: heading_nodes,
            marks: Vec::new,
            commands: heading_commands,
        },
        FirstPartyExtension {
            id: "builtin.blockquote",
            nodes: blockquote_nodes,
            marks: Vec::new,
            commands: blockquote_commands,
        },
        FirstPartyExtension {
            id: "builtin.divider",
            nodes: divider_nodes,
            marks: Vec::new,
            commands: divider_commands,
        },
        FirstPartyExtension {
            id: "builtin.list",
            nodes: list_nodes,
            marks: Vec::new,
            commands: list_commands,
        },
        FirstPartyExtension {
            id: "builtin.task_list",
            nodes: task_nodes,
            marks: Vec::new,
            commands: task_commands,
        },
        FirstPartyExtension {
            id: "builtin.code_block",
            nodes: code_block_nodes,
            marks: Vec::new,
            commands: code_block_commands,
        },
        FirstPartyExtension {
            id: "builtin.table",
            nodes: table_nodes,
            marks: Vec::new,
            commands: table_commands,
        },
        FirstPartyExtension {
            id: "builtin.callout",
            nodes: callout_nodes,
            marks: Vec::new,
            commands: callout_commands,
        },
        FirstPartyExtension {
            id: "builtin.media",
            nodes: media_nodes,
            marks: Vec::new,
            commands: Vec::new,
        },
        FirstPartyExtension {
            id: "builtin.formatting",
            nodes: Vec::new,
            marks: formatting_marks,
            commands: Vec::new,
        },
    ];
    table
        .into_iter()
        .map(|extension| Box::new(extension) as Box<dyn EditorExtension>)
        .collect()
}

fn with_block_id(spec: DomSpec, node: &Node) -> DomSpec {
    spec.attr_opt("data-block-id", node.block_id())
}

fn block_id_from(element: &DomElement) -> Attrs {
    let mut attrs = Attrs::new();
    if let Some(id) = element.attr("data-block-id") {
        attrs.insert(BLOCK_ID_ATTR.to_string(), AttrValue::from(id));
    }
    attrs
}

fn parse_tag(element: &DomElement, tag: &str) -> Option<Attrs> {
    (element.tag == tag).then(|| block_id_from(element))
}

fn str_attr<'a>(node: &'a Node, key: &str) -> Option<&'a str> {
    node.attr(key).and_then(AttrValue::as_str)
}

fn bool_attr(node: &Node, key: &str) -> bool {
    node.attr(key).and_then(AttrValue::as_bool).unwrap_or(false)
}

fn empty_paragraph(schema: &Schema) -> Result<Node, SchemaError> {
    schema.node("paragraph", Attrs::new(), vec![])
}

fn render_inline_placeholder(_: &Node) -> DomSpec {
    DomSpec::new("span")
}

fn document_nodes() -> Vec<NodeSpec> {
    vec![
        NodeSpec::new("doc", render_doc)
            .content("block+")
            .parse_with(parse_doc),
        NodeSpec::new("text", render_inline_placeholder)
            .group(GROUP_INLINE)
            .text_leaf(),
        NodeSpec::block("paragraph", render_paragraph)
            .group(GROUP_BLOCK)
            .content("inline*")
            .parse_with(|element| parse_tag(element, "p")),
        NodeSpec::new("hard_break", render_hard_break)
            .group(GROUP_INLINE)
            .parse_with(|element| (element.tag == "br").then(Attrs::new)),
    ]
}

fn render_doc(_: &Node) -> DomSpec {
    DomSpec::new("div").attr("class", "lazynote-doc")
}

fn parse_doc(element: &DomElement) -> Option<Attrs> {
    (element.tag == "div" && element.has_class("lazynote-doc")).then(Attrs::new)
}

fn render_paragraph(node: &Node) -> DomSpec {
    with_block_id(DomSpec::new("p"), node)
}

fn render_hard_break(_: &Node) -> DomSpec {
    DomSpec::leaf("br")
}

fn paragraph_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "正文",
        CATEGORY_BASIC,
        &["text", "paragraph", "正文"],
        |schema| Ok(vec![empty_paragraph(schema)?]),
    )]
}

fn heading_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("heading", render_heading)
        .group(GROUP_BLOCK)
        .content("inline*")
        .attr("level", AttrSpec::with_default(1))
        .attr("id", AttrSpec::optional(AttrKind::Str))
        .parse_with(parse_heading)]
}

fn render_heading(node: &Node) -> DomSpec {
    let level = int_attr(node, "level", 1).clamp(1, 6);
    let spec = DomSpec::new(format!("h{level}")).attr_opt("id", str_attr(node, "id"));
    with_block_id(spec, node)
}

fn parse_heading(element: &DomElement) -> Option<Attrs> {
    let level = match element.tag.as_str() {
        "h1" => 1,
        "h2" => 2,
        "h3" => 3,
        "h4" => 4,
        "h5" => 5,
        "h6" => 6,
        _ => return None,
    };
    let mut attrs = block_id_from(element);
    attrs.insert("level".to_string(), AttrValue::Int(level));
    if let Some(id) = element.attr("id") {
        attrs.insert("id".to_string(), AttrValue::from(id));
    }
    Some(attrs)
}

fn heading(schema: &Schema, level: i64) -> Result<Vec<Node>, SchemaError> {
    let mut attrs = Attrs::new();
    attrs.insert("level".to_string(), AttrValue::Int(level));
    Ok(vec![schema.node("heading", attrs, vec![])?])
}

fn heading_commands() -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "标题 1",
            CATEGORY_BASIC,
            &["h1", "heading1", "title", "标题"],
            |schema| heading(schema, 1),
        ),
        Suggestion::new(
            "标题 2",
            CATEGORY_BASIC,
            &["h2", "heading2", "subtitle", "标题"],
            |schema| heading(schema, 2),
        ),
        Suggestion::new(
            "标题 3",
            CATEGORY_BASIC,
            &["h3", "heading3", "标题"],
            |schema| heading(schema, 3),
        ),
    ]
}

fn blockquote_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("blockquote", |node| {
        with_block_id(DomSpec::new("blockquote"), node)
    })
    .group(GROUP_BLOCK)
    .content("block+")
    .parse_with(|element| parse_tag(element, "blockquote"))]
}

fn blockquote_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "引用",
        CATEGORY_BASIC,
        &["quote", "blockquote", "引用"],
        |schema| {
            Ok(vec![schema.node(
                "blockquote",
                Attrs::new(),
                vec![empty_paragraph(schema)?],
            )?])
        },
    )]
}

fn divider_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("horizontal_rule", |node| {
        with_block_id(DomSpec::leaf("hr"), node)
    })
    .group(GROUP_BLOCK)
    .parse_with(|element| parse_tag(element, "hr"))]
}

fn divider_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "分割线",
        CATEGORY_BASIC,
        &["divider", "hr", "rule", "分割线"],
        |schema| {
            Ok(vec![
                schema.node("horizontal_rule", Attrs::new(), vec![])?,
                empty_paragraph(schema)?,
            ])
        },
    )]
}

fn list_nodes() -> Vec<NodeSpec> {
    vec![
        NodeSpec::block("bullet_list", |node| with_block_id(DomSpec::new("ul"), node))
            .group(GROUP_BLOCK)
            .content("list_item+")
            .parse_with(|element| {
                if element.attr("data-type") == Some("taskList") {
                    return None;
                }
                parse_tag(element, "ul")
            }),
        NodeSpec::block("ordered_list", render_ordered_list)
            .group(GROUP_BLOCK)
            .content("list_item+")
            .attr("start", AttrSpec::with_default(1))
            .parse_with(parse_ordered_list),
        NodeSpec::block("list_item", |node| with_block_id(DomSpec::new("li"), node))
            .content("paragraph block*")
            .parse_with(|element| {
                if element.attr("data-type") == Some("taskItem") {
                    return None;
                }
                parse_tag(element, "li")
            }),
    ]
}

fn render_ordered_list(node: &Node) -> DomSpec {
    let start = int_attr(node, "start", 1);
    let spec = if start == 1 {
        DomSpec::new("ol")
    } else {
        DomSpec::new("ol").attr("start", start.to_string())
    };
    with_block_id(spec, node)
}

fn parse_ordered_list(element: &DomElement) -> Option<Attrs> {
    let mut attrs = parse_tag(element, "ol")?;
    if let Some(start) = element.attr("start").and_then(|raw| raw.parse::<i64>().ok()) {
        attrs.insert("start".to_string(), AttrValue::Int(start));
    }
    Some(attrs)
}

fn list(schema: &Schema, list_type: &str, item_type: &str) -> Result<Vec<Node>, SchemaError> {
    let item = schema.node(item_type, Attrs::new(), vec![empty_paragraph(schema)?])?;
    Ok(vec![schema.node(list_type, Attrs::new(), vec![item])?])
}

fn list_commands() -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "无序列表",
            CATEGORY_LIST,
            &["bullet", "list", "ul", "无序"],
            |schema| list(schema, "bullet_list", "list_item"),
        ),
        Suggestion::new(
            "有序列表",
            CATEGORY_LIST,
            &["ordered", "numbered", "ol", "有序"],
            |schema| list(schema, "ordered_list", "list_item"),
        ),
    ]
}

fn task_nodes() -> Vec<NodeSpec> {
    vec![
        NodeSpec::block("task_list", |node| {
            with_block_id(DomSpec::new("ul").attr("data-type", "taskList"), node)
        })
        .group(GROUP_BLOCK)
        .content("task_item+")
        .parse_with(|element| {
            if element.attr("data-type") != Some("taskList") {
                return None;
            }
            parse_tag(element, "ul")
        }),
        NodeSpec::block("task_item", render_task_item)
            .content("paragraph block*")
            .attr("checked", AttrSpec::with_default(false))
            .parse_with(parse_task_item),
    ]
}

fn render_task_item(node: &Node) -> DomSpec {
    let checked = if bool_attr(node, "checked") {
        "true"
    } else {
        "false"
    };
    let spec = DomSpec::new("li")
        .attr("data-type", "taskItem")
        .attr("data-checked", checked);
    with_block_id(spec, node)
}

fn parse_task_item(element: &DomElement) -> Option<Attrs> {
    if element.attr("data-type") != Some("taskItem") {
        return None;
    }
    let mut attrs = parse_tag(element, "li")?;
    let checked = element.attr("data-checked") == Some("true");
    attrs.insert("checked".to_string(), AttrValue::Bool(checked));
    Some(attrs)
}

fn task_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "任务列表",
        CATEGORY_LIST,
        &["todo", "task", "checkbox", "任务"],
        |schema| list(schema, "task_list", "task_item"),
    )]
}

fn code_block_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("code_block", render_code_block)
        .group(GROUP_BLOCK)
        .content("text*")
        .without_marks()
        .attr("language", AttrSpec::optional(AttrKind::Str))
        .parse_with(parse_code_block)]
}

fn render_code_block(node: &Node) -> DomSpec {
    let code = match str_attr(node, "language") {
        Some(language) => DomSpec::new("code").attr("class", format!("language-{language}")),
        None => DomSpec::new("code"),
    };
    with_block_id(DomSpec::new("pre"), node).wrap(code)
}

fn parse_code_block(element: &DomElement) -> Option<Attrs> {
    let mut attrs = parse_tag(element, "pre")?;
    let language = element
        .inner
        .as_deref()
        .filter(|inner| inner.tag == "code")
        .and_then(|inner| inner.attr("class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|item| item.strip_prefix("language-"))
        });
    if let Some(language) = language {
        attrs.insert("language".to_string(), AttrValue::from(language));
    }
    Some(attrs)
}

fn code_block_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "代码块",
        CATEGORY_ADVANCED,
        &["code", "codeblock", "snippet", "代码"],
        |schema| Ok(vec![schema.node("code_block", Attrs::new(), vec![])?]),
    )]
}

const TABLE_ROWS: usize = 2;
const TABLE_COLUMNS: usize = 3;

fn table_nodes() -> Vec<NodeSpec> {
    vec![
        NodeSpec::block("table", |node| with_block_id(DomSpec::new("table"), node))
            .group(GROUP_BLOCK)
            .content("table_row+")
            .parse_with(|element| parse_tag(element, "table")),
        NodeSpec::block("table_row", |node| with_block_id(DomSpec::new("tr"), node))
            .content("table_cell+")
            .parse_with(|element| parse_tag(element, "tr")),
        NodeSpec::block("table_cell", |node| with_block_id(DomSpec::new("td"), node))
            .content("paragraph+")
            .parse_with(|element| {
                parse_tag(element, "td").or_else(|| parse_tag(element, "th"))
            }),
    ]
}

fn table(schema: &Schema) -> Result<Vec<Node>, SchemaError> {
    let mut rows = Vec::with_capacity(TABLE_ROWS);
    for _ in 0..TABLE_ROWS {
        let mut cells = Vec::with_capacity(TABLE_COLUMNS);
        for _ in 0..TABLE_COLUMNS {
            cells.push(schema.node("table_cell", Attrs::new(), vec![empty_paragraph(schema)?])?);
        }
        rows.push(schema.node("table_row", Attrs::new(), cells)?);
    }
    Ok(vec![schema.node("table", Attrs::new(), rows)?])
}

fn table_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "表格",
        CATEGORY_ADVANCED,
        &["table", "grid", "表格"],
        table,
    )]
}

fn callout_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("callout", render_callout)
        .group(GROUP_BLOCK)
        .content("block+")
        .attr("type", AttrSpec::with_default("info"))
        .attr("collapsed", AttrSpec::with_default(false))
        .parse_with(parse_callout)]
}

fn render_callout(node: &Node) -> DomSpec {
    let kind = str_attr(node, "type").unwrap_or("info");
    let collapsed = if bool_attr(node, "collapsed") {
        "true"
    } else {
        "false"
    };
    let spec = DomSpec::new("div")
        .attr("class", "callout")
        .attr("data-type", kind)
        .attr("data-collapsed", collapsed);
    with_block_id(spec, node)
}

fn parse_callout(element: &DomElement) -> Option<Attrs> {
    if element.tag != "div" || !element.has_class("callout") {
        return None;
    }
    let mut attrs = block_id_from(element);
    if let Some(kind) = element.attr("data-type") {
        attrs.insert("type".to_string(), AttrValue::from(kind));
    }
    let collapsed = element.attr("data-collapsed") == Some("true");
    attrs.insert("collapsed".to_string(), AttrValue::Bool(collapsed));
    Some(attrs)
}

fn callout_commands() -> Vec<Suggestion> {
    vec![Suggestion::new(
        "提示框",
        CATEGORY_ADVANCED,
        &["callout", "info", "note", "提示"],
        |schema| {
            Ok(vec![schema.node(
                "callout",
                Attrs::new(),
                vec![empty_paragraph(schema)?],
            )?])
        },
    )]
}

fn media_nodes() -> Vec<NodeSpec> {
    vec![NodeSpec::block("image", render_image)
        .group(GROUP_BLOCK)
        .attr("src", AttrSpec::required(AttrKind::Str))
        .attr("alt", AttrSpec::optional(AttrKind::Str))
        .attr("title", AttrSpec::optional(AttrKind::Str))
        .parse_with(parse_image)]
}

fn render_image(node: &Node) -> DomSpec {
    let spec = DomSpec::leaf("img")
        .attr("src", str_attr(node, "src").unwrap_or_default())
        .attr_opt("alt", str_attr(node, "alt"))
        .attr_opt("title", str_attr(node, "title"));
    with_block_id(spec, node)
}

fn parse_image(element: &DomElement) -> Option<Attrs> {
    let mut attrs = parse_tag(element, "img")?;
    let src = element.attr("src")?;
    attrs.insert("src".to_string(), AttrValue::from(src));
    for key in ["alt", "title"] {
        if let Some(value) = element.attr(key) {
            attrs.insert(key.to_string(), AttrValue::from(value));
        }
    }
    Some(attrs)
}

fn formatting_marks() -> Vec<MarkSpec> {
    vec![
        MarkSpec::new("bold", |_| DomSpec::new("strong"))
            .parse_with(|element| matches!(element.tag.as_str(), "strong" | "b").then(Attrs::new)),
        MarkSpec::new("italic", |_| DomSpec::new("em"))
            .parse_with(|element| matches!(element.tag.as_str(), "em" | "i").then(Attrs::new)),
        MarkSpec::new("underline", |_| DomSpec::new("u"))
            .parse_with(|element| (element.tag == "u").then(Attrs::new)),
        MarkSpec::new("strike", |_| DomSpec::new("s")).parse_with(|element| {
            matches!(element.tag.as_str(), "s" | "del" | "strike").then(Attrs::new)
        }),
        MarkSpec::new("code", |_| DomSpec::new("code"))
            .parse_with(|element| (element.tag == "code").then(Attrs::new)),
        MarkSpec::new("link", render_link)
            .attr("href", AttrSpec::required(AttrKind::Str))
            .attr("title", AttrSpec::optional(AttrKind::Str))
            .parse_with(parse_link),
    ]
}

fn render_link(mark: &Mark) -> DomSpec {
    let href = mark
        .attrs
        .get("href")
        .and_then(AttrValue::as_str)
        .unwrap_or_default();
    let title = mark.attrs.get("title").and_then(AttrValue::as_str);
    DomSpec::new("a").attr("href", href).attr_opt("title", title)
}

fn parse_link(element: &DomElement) -> Option<Attrs> {
    if element.tag != "a" {
        return None;
    }
    let mut attrs = Attrs::new();
    attrs.insert("href".to_string(), AttrValue::from(element.attr("href")?));
    if let Some(title) = element.attr("title") {
        attrs.insert("title".to_string(), AttrValue::from(title));
    }
    Some(attrs)
}
