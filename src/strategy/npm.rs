use url::Url;

use super::ScrapeStrategy;

/// Matches `npmjs.com/package/{name}` URLs. Seeding expands to the package's
/// registry metadata endpoint (`registry.npmjs.org/{name}`) in addition to
/// the package page itself; `JsonLinkExtractor` parses that endpoint's
/// response and follows only the `homepage`/`repository` links it declares.
pub struct NpmStrategy;

impl ScrapeStrategy for NpmStrategy {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("www.npmjs.com") | Some("npmjs.com"))
            && url.path().starts_with("/package/")
    }

    fn seed_urls(&self, start: &Url) -> Vec<Url> {
        let normalized = self.normalize(start);
        let mut seeds = vec![normalized.clone()];
        if let Some(name) = package_name(&normalized) {
            if let Ok(registry_url) = Url::parse(&format!("https://registry.npmjs.org/{name}")) {
                seeds.push(registry_url);
            }
        }
        seeds
    }
}

fn package_name(url: &Url) -> Option<String> {
    url.path().strip_prefix("/package/").map(|s| s.trim_end_matches('/').to_string())
}
