use std::sync::OnceLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::node::Element;
use scraper::{Html, Node, Selector};

use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

/// Converts `ctx.dom`'s `<body>` (or the whole document if the body is
/// empty) to Markdown: ATX headings, `-` bullets, fenced code blocks with
/// inferred language, `_`/`**` emphasis, inline links, GFM tables and
/// strikethrough, and literal `\n` for `<br>` inside `<pre>`. Rewrites
/// `content_type` to `text/markdown`. An empty result is a valid empty
/// document, not an error — this recursive-descent converter has no failure
/// path, unlike a library-backed one, so the "leave content untouched on
/// error" policy has no branch to exercise here.
pub struct HtmlToMarkdown;

#[async_trait::async_trait]
impl Middleware for HtmlToMarkdown {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document> {
        if let Some(dom) = &ctx.dom {
            ctx.content = convert(dom);
            ctx.content_type = "text/markdown".to_string();
            ctx.dom = None;
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "HtmlToMarkdown"
    }
}

enum ListKind {
    Ordered(usize),
    Unordered,
}

struct MdCtx {
    list_stack: Vec<ListKind>,
    in_pre: bool,
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn lang_class_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:highlight-source-|highlight-|language-)(\w+)").unwrap())
}

pub(crate) fn convert(dom: &Html) -> String {
    let root: NodeRef<Node> = match Selector::parse("body").ok().and_then(|s| dom.select(&s).next()) {
        Some(body) if body.children().next().is_some() => *body,
        _ => dom.tree.root(),
    };

    let mut ctx = MdCtx {
        list_stack: Vec::new(),
        in_pre: false,
    };
    let mut out = String::new();
    for child in root.children() {
        render(child, &mut ctx, &mut out);
    }

    let trimmed = out.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

fn render(node: NodeRef<Node>, ctx: &mut MdCtx, out: &mut String) {
    match node.value() {
        Node::Text(text) => {
            if ctx.in_pre {
                out.push_str(text);
            } else {
                out.push_str(&whitespace_re().replace_all(text, " "));
            }
        }
        Node::Element(el) => render_element(node, el, ctx, out),
        _ => {}
    }
}

fn render_children(node: NodeRef<Node>, ctx: &mut MdCtx, out: &mut String) {
    for child in node.children() {
        render(child, ctx, out);
    }
}

fn ensure_blank_line(out: &mut String) {
    if out.is_empty() {
        return;
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    if !out.ends_with("\n\n") {
        out.push('\n');
    }
}

fn trim_trailing_spaces(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

fn render_pre_text(node: NodeRef<Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            Node::Element(_) => render_pre_text(child, out),
            _ => {}
        }
    }
}

fn lang_from_attrs(el: &Element) -> Option<String> {
    if let Some(lang) = el.attr("data-language") {
        return Some(lang.to_string());
    }
    if let Some(class) = el.attr("class") {
        if let Some(cap) = lang_class_re().captures(class) {
            return Some(cap[1].to_string());
        }
    }
    None
}

fn infer_language(node: NodeRef<Node>, el: &Element) -> Option<String> {
    if let Some(l) = lang_from_attrs(el) {
        return Some(l);
    }
    node.children().find_map(|child| match child.value() {
        Node::Element(code_el) if code_el.name() == "code" => lang_from_attrs(code_el),
        _ => None,
    })
}

fn render_table(node: NodeRef<Node>, out: &mut String) {
    ensure_blank_line(out);
    let mut rows: Vec<Vec<String>> = Vec::new();
    for descendant in node.descendants() {
        if let Node::Element(el) = descendant.value() {
            if el.name() == "tr" {
                let mut cells = Vec::new();
                for cell in descendant.children() {
                    if let Node::Element(cell_el) = cell.value() {
                        if matches!(cell_el.name(), "td" | "th") {
                            let mut text = String::new();
                            collect_text(cell, &mut text);
                            cells.push(whitespace_re().replace_all(text.trim(), " ").to_string());
                        }
                    }
                }
                rows.push(cells);
            }
        }
    }
    if rows.is_empty() {
        return;
    }
    let col_count = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    for (i, row) in rows.iter().enumerate() {
        out.push('|');
        for c in 0..col_count {
            out.push(' ');
            out.push_str(row.get(c).map(|s| s.as_str()).unwrap_or(""));
            out.push_str(" |");
        }
        out.push('\n');
        if i == 0 {
            out.push('|');
            for _ in 0..col_count {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
}

fn collect_text(node: NodeRef<Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            Node::Text(t) => out.push_str(t),
            Node::Element(_) => collect_text(child, out),
            _ => {}
        }
    }
}

fn render_element(node: NodeRef<Node>, el: &Element, ctx: &mut MdCtx, out: &mut String) {
    match el.name() {
        "script" | "style" | "noscript" | "head" => {}
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = el.name()[1..].parse::<usize>().unwrap_or(1);
            ensure_blank_line(out);
            out.push_str(&"#".repeat(level));
            out.push(' ');
            render_children(node, ctx, out);
            trim_trailing_spaces(out);
            out.push('\n');
        }
        "p" => {
            ensure_blank_line(out);
            render_children(node, ctx, out);
            trim_trailing_spaces(out);
            out.push('\n');
        }
        "div" | "section" | "article" | "main" | "header" | "footer" | "body" | "html" | "span" => {
            render_children(node, ctx, out);
        }
        "br" => {
            if ctx.in_pre {
                out.push('\n');
            } else {
                out.push_str("  \n");
            }
        }
        "hr" => {
            ensure_blank_line(out);
            out.push_str("---\n");
        }
        "strong" | "b" => {
            out.push_str("**");
            render_children(node, ctx, out);
            out.push_str("**");
        }
        "em" | "i" => {
            out.push('_');
            render_children(node, ctx, out);
            out.push('_');
        }
        "del" | "s" | "strike" => {
            out.push_str("~~");
            render_children(node, ctx, out);
            out.push_str("~~");
        }
        "a" => {
            let href = el.attr("href").unwrap_or("");
            out.push('[');
            render_children(node, ctx, out);
            out.push_str("](");
            out.push_str(href);
            out.push(')');
        }
        "code" => {
            let mut text = String::new();
            render_pre_text(node, &mut text);
            out.push('`');
            out.push_str(text.trim());
            out.push('`');
        }
        "pre" => {
            ensure_blank_line(out);
            let lang = infer_language(node, el);
            out.push_str("```");
            if let Some(l) = &lang {
                out.push_str(l);
            }
            out.push('\n');
            let was_pre = ctx.in_pre;
            ctx.in_pre = true;
            let mut text = String::new();
            render_pre_text(node, &mut text);
            ctx.in_pre = was_pre;
            out.push_str(&text);
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }
        "ul" => {
            ensure_blank_line(out);
            ctx.list_stack.push(ListKind::Unordered);
            render_children(node, ctx, out);
            ctx.list_stack.pop();
        }
        "ol" => {
            ensure_blank_line(out);
            ctx.list_stack.push(ListKind::Ordered(1));
            render_children(node, ctx, out);
            ctx.list_stack.pop();
        }
        "li" => {
            let indent = "  ".repeat(ctx.list_stack.len().saturating_sub(1));
            let marker = match ctx.list_stack.last_mut() {
                Some(ListKind::Ordered(n)) => {
                    let m = format!("{n}. ");
                    *n += 1;
                    m
                }
                _ => "- ".to_string(),
            };
            out.push_str(&indent);
            out.push_str(&marker);
            render_children(node, ctx, out);
            trim_trailing_spaces(out);
            out.push('\n');
        }
        "blockquote" => {
            ensure_blank_line(out);
            let mut inner = String::new();
            render_children(node, ctx, &mut inner);
            for line in inner.trim().lines() {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
        }
        "table" => render_table(node, out),
        "thead" | "tbody" | "tr" | "td" | "th" => {}
        _ => render_children(node, ctx, out),
    }
}
