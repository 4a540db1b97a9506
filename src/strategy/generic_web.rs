use url::Url;

use super::ScrapeStrategy;

/// Fallback strategy for arbitrary documentation sites: no registry
/// conventions, just the default scope predicate over `http(s)://` URLs.
pub struct GenericWebStrategy;

impl ScrapeStrategy for GenericWebStrategy {
    fn name(&self) -> &'static str {
        "generic_web"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.scheme(), "http" | "https")
    }
}
