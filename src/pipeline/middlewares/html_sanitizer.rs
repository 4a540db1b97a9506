use std::collections::HashSet;

use ego_tree::NodeId;
use scraper::{Html, Node, Selector};

use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Removes every element matching any selector in `options.exclude_selectors`
/// from `ctx.dom`. A malformed selector is skipped (pushed as a non-fatal
/// error) rather than aborting the remaining selectors.
///
/// `scraper::Html` has no node-removal API, so exclusion is implemented by
/// re-serializing the tree while skipping matched subtrees, then re-parsing
/// the result. This keeps downstream stages working against an ordinary
/// `Html` document.
pub struct HtmlSanitizer;

#[async_trait::async_trait]
impl Middleware for HtmlSanitizer {
    async fn process(&self, ctx: &mut ProcessingContext, next: Next<'_>) -> Vec<Document> {
        if let Some(dom) = ctx.dom.take() {
            if ctx.options.exclude_selectors.is_empty() {
                ctx.dom = Some(dom);
            } else {
                let mut excluded: HashSet<NodeId> = HashSet::new();
                for raw in &ctx.options.exclude_selectors {
                    match Selector::parse(raw) {
                        Ok(selector) => {
                            for el in dom.select(&selector) {
                                excluded.insert(el.id());
                            }
                        }
                        Err(e) => {
                            ctx.push_error("HtmlSanitizer", format!("invalid selector {raw:?}: {e:?}"));
                        }
                    }
                }
                let serialized = serialize_excluding(&dom, &excluded);
                ctx.dom = Some(Html::parse_document(&serialized));
            }
        }
        next.run(ctx).await
    }

    fn name(&self) -> &'static str {
        "HtmlSanitizer"
    }
}

/// `&` must be escaped first so the other two substitutions don't get
/// re-escaped. The serialized string is re-parsed as markup, so an
/// unescaped `<` followed by a letter would open a bogus tag.
fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn serialize_excluding(html: &Html, excluded: &HashSet<NodeId>) -> String {
    let mut out = String::new();
    for child in html.tree.root().children() {
        serialize_node(child, excluded, &mut out);
    }
    out
}

fn serialize_node(node: ego_tree::NodeRef<Node>, excluded: &HashSet<NodeId>, out: &mut String) {
    if excluded.contains(&node.id()) {
        return;
    }
    match node.value() {
        Node::Element(el) => {
            let name = el.name();
            out.push('<');
            out.push_str(name);
            for (attr_name, attr_value) in el.attrs() {
                out.push(' ');
                out.push_str(attr_name);
                out.push_str("=\"");
                out.push_str(&attr_value.replace('"', "&quot;"));
                out.push('"');
            }
            out.push('>');
            if !VOID_ELEMENTS.contains(&name) {
                for child in node.children() {
                    serialize_node(child, excluded, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
        Node::Text(text) => {
            out.push_str(&escape_text(text));
        }
        _ => {
            for child in node.children() {
                serialize_node(child, excluded, out);
            }
        }
    }
}
