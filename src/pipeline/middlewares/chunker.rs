use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::core::types::{Document, ProcessingContext};
use crate::pipeline::{Middleware, Next};

/// Target chunk size in characters. Splitting prefers paragraph boundaries
/// (blank lines) and falls back to a hard cut only when a single paragraph
/// exceeds the bound.
const DEFAULT_CHUNK_SIZE: usize = 2000;

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(#{1,6})\s+(.*)$").unwrap())
}

/// Splits `ctx.content` into bounded-size `Document`s, terminal stage of the
/// default chain. Each chunk inherits `metadata["title"]` and receives a
/// `metadata["path"]` array built from the heading stack directly above it
/// (e.g. `["Guide", "Installation"]` for text under `# Guide` / `## Installation`).
pub struct Chunker {
    chunk_size: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl Chunker {
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self { chunk_size }
    }
}

#[async_trait::async_trait]
impl Middleware for Chunker {
    async fn process(&self, ctx: &mut ProcessingContext, _next: Next<'_>) -> Vec<Document> {
        let title = ctx
            .metadata
            .get("title")
            .cloned()
            .unwrap_or_else(|| "Untitled".to_string());

        let segments = split_by_headings(&ctx.content);
        let mut documents = Vec::new();

        for segment in segments {
            for piece in split_to_size(&segment.text, self.chunk_size) {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                let mut metadata = std::collections::HashMap::new();
                metadata.insert("title".to_string(), Value::String(title.clone()));
                metadata.insert(
                    "path".to_string(),
                    Value::Array(segment.path.iter().cloned().map(Value::String).collect()),
                );

                documents.push(Document {
                    library: ctx.options.library.clone(),
                    version: ctx.options.version.clone(),
                    url: ctx.source.to_string(),
                    content: piece.to_string(),
                    metadata,
                    embedding: Vec::new(),
                });
            }
        }

        documents
    }

    fn name(&self) -> &'static str {
        "Chunker"
    }
}

struct Segment {
    path: Vec<String>,
    text: String,
}

/// Walks `content` line by line, tracking a heading stack, and groups the
/// body text under each heading into a `Segment` carrying the full heading
/// path above it. Text before the first heading gets an empty path.
fn split_by_headings(content: &str) -> Vec<Segment> {
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut segments = Vec::new();
    let mut current = String::new();

    let flush = |stack: &[(usize, String)], current: &mut String, segments: &mut Vec<Segment>| {
        if !current.trim().is_empty() {
            segments.push(Segment {
                path: stack.iter().map(|(_, t)| t.clone()).collect(),
                text: std::mem::take(current),
            });
        } else {
            current.clear();
        }
    };

    for line in content.lines() {
        if let Some(caps) = heading_re().captures(line) {
            flush(&stack, &mut current, &mut segments);
            let level = caps[1].len();
            let text = caps[2].trim().to_string();
            while stack.last().is_some_and(|(l, _)| *l >= level) {
                stack.pop();
            }
            stack.push((level, text));
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    flush(&stack, &mut current, &mut segments);
    segments
}

/// Splits `text` on blank-line paragraph boundaries, packing consecutive
/// paragraphs into chunks up to `chunk_size` characters; a single paragraph
/// longer than `chunk_size` is hard-split as a last resort.
fn split_to_size(text: &str, chunk_size: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text.split("\n\n").filter(|p| !p.trim().is_empty()).collect();
    let mut chunks = Vec::new();
    let mut current = String::new();

    for para in paragraphs {
        if para.len() > chunk_size {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            for hard in para.as_bytes().chunks(chunk_size) {
                chunks.push(String::from_utf8_lossy(hard).to_string());
            }
            continue;
        }

        if !current.is_empty() && current.len() + para.len() + 2 > chunk_size {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}
