//! Per-source crawl policy (spec.md §4.D): URL normalization, scope
//! predicate, seed URL expansion, and link filtering. The registry picks the
//! first strategy whose `can_handle` matches, falling back to `GenericWeb`.

mod generic_web;
mod github;
mod local_file;
mod npm;
mod pypi;

pub use generic_web::GenericWebStrategy;
pub use github::GitHubStrategy;
pub use local_file::LocalFileStrategy;
pub use npm::NpmStrategy;
pub use pypi::PyPiStrategy;

use url::Url;

use crate::core::types::Scope;

/// A strategy answers `can_handle(url)` and supplies the scope predicate and
/// link filter the [`crate::crawler::Crawler`] uses while traversing from
/// that URL. `seed_urls` lets registry-backed strategies (GitHub, Npm, PyPi)
/// expand a single registry reference into the concrete pages to crawl.
pub trait ScrapeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn can_handle(&self, url: &Url) -> bool;

    /// Normalizes the user-supplied start URL (e.g. strips fragments).
    fn normalize(&self, url: &Url) -> Url {
        let mut normalized = url.clone();
        normalized.set_fragment(None);
        normalized
    }

    /// Expands the start URL into the concrete URL(s) to seed the crawl
    /// frontier with. Most strategies seed with just the normalized URL.
    fn seed_urls(&self, start: &Url) -> Vec<Url> {
        vec![self.normalize(start)]
    }

    /// Whether `candidate`, discovered on a page fetched from `start`,
    /// should be enqueued, per `scope` (spec.md §4.D).
    fn in_scope(&self, start: &Url, candidate: &Url, scope: Scope) -> bool {
        default_scope_predicate(start, candidate, scope)
    }
}

/// The default scope predicate shared by every web-based strategy.
pub fn default_scope_predicate(start: &Url, candidate: &Url, scope: Scope) -> bool {
    let (Some(start_host), Some(candidate_host)) = (start.host_str(), candidate.host_str()) else {
        return false;
    };

    match scope {
        Scope::Hostname => start_host.eq_ignore_ascii_case(candidate_host),
        Scope::Subpages => {
            if !start_host.eq_ignore_ascii_case(candidate_host) {
                return false;
            }
            let start_dir = directory_prefix(start.path());
            candidate.path().starts_with(&start_dir)
        }
        Scope::Domain => registrable_domain(start_host).eq_ignore_ascii_case(registrable_domain(candidate_host)),
    }
}

/// The path prefix up to (and including) the last `/`, used for `subpages`
/// scope: `/docs/guide/intro.html` → `/docs/guide/`.
fn directory_prefix(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => "/".to_string(),
    }
}

/// A crude "registrable domain" extraction: last two labels of the host,
/// e.g. `docs.example.com` → `example.com`. Good enough for scope matching
/// without pulling in a public-suffix-list dependency.
fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host.to_string()
    } else {
        labels[labels.len() - 2..].join(".")
    }
}

/// Picks the first strategy whose `can_handle` matches `url`, falling back
/// to [`GenericWebStrategy`].
pub fn select_strategy(url: &Url) -> Box<dyn ScrapeStrategy> {
    let candidates: Vec<Box<dyn ScrapeStrategy>> = vec![
        Box::new(LocalFileStrategy),
        Box::new(GitHubStrategy),
        Box::new(NpmStrategy),
        Box::new(PyPiStrategy),
    ];
    for candidate in candidates {
        if candidate.can_handle(url) {
            return candidate;
        }
    }
    Box::new(GenericWebStrategy)
}
