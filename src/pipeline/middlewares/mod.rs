mod chunker;
mod html_link_extractor;
mod html_metadata;
mod html_parser;
mod html_sanitizer;
mod html_to_markdown;
mod json_link_extractor;
mod markdown_link_extractor;
mod markdown_metadata;

pub use chunker::Chunker;
pub use html_link_extractor::HtmlLinkExtractor;
pub use html_metadata::HtmlMetadataExtractor;
pub use html_parser::HtmlParser;
pub use html_sanitizer::HtmlSanitizer;
pub use html_to_markdown::HtmlToMarkdown;
pub use json_link_extractor::JsonLinkExtractor;
pub use markdown_link_extractor::MarkdownLinkExtractor;
pub use markdown_metadata::MarkdownMetadataExtractor;

/// Collapse runs of whitespace to a single space and trim the ends. Shared
/// by the metadata extractors (spec.md §4.C: "Collapses internal whitespace
/// to single spaces").
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
