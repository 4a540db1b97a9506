use url::Url;

use super::ScrapeStrategy;

/// Matches `pypi.org/project/{name}` URLs. Seeding expands to the package's
/// JSON API endpoint (`pypi.org/pypi/{name}/json`); `JsonLinkExtractor`
/// parses that endpoint's response and follows only the
/// `project_urls`/`docs_url`/`home_page` links it declares.
pub struct PyPiStrategy;

impl ScrapeStrategy for PyPiStrategy {
    fn name(&self) -> &'static str {
        "pypi"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("pypi.org") | Some("www.pypi.org")) && url.path().starts_with("/project/")
    }

    fn seed_urls(&self, start: &Url) -> Vec<Url> {
        let normalized = self.normalize(start);
        let mut seeds = vec![normalized.clone()];
        if let Some(name) = package_name(&normalized) {
            if let Ok(json_url) = Url::parse(&format!("https://pypi.org/pypi/{name}/json")) {
                seeds.push(json_url);
            }
        }
        seeds
    }
}

fn package_name(url: &Url) -> Option<String> {
    url.path()
        .strip_prefix("/project/")
        .map(|s| s.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_json_endpoint_alongside_project_page() {
        let strategy = PyPiStrategy;
        let url = Url::parse("https://pypi.org/project/requests/").unwrap();
        let seeds = strategy.seed_urls(&url);
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[1].as_str(), "https://pypi.org/pypi/requests/json");
    }
}
