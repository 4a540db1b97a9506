use url::Url;

use super::ScrapeStrategy;
use crate::core::types::Scope;

const CANDIDATE_BRANCHES: &[&str] = &["main", "master"];

/// Narrows scope to a single GitHub repository: `github.com/{owner}/{repo}`.
/// `can_handle` matches both `github.com` and its `raw.githubusercontent.com`
/// mirror; `in_scope` requires the candidate to stay under the same
/// `/{owner}/{repo}` prefix regardless of the requested `Scope` or which of
/// the two hosts it's on, since crawling past the repo boundary (e.g. into a
/// sibling repo or GitHub's marketing pages) is never useful here.
pub struct GitHubStrategy;

impl ScrapeStrategy for GitHubStrategy {
    fn name(&self) -> &'static str {
        "github"
    }

    fn can_handle(&self, url: &Url) -> bool {
        matches!(url.host_str(), Some("github.com") | Some("www.github.com") | Some("raw.githubusercontent.com"))
    }

    /// `github.com/{owner}/{repo}` blob pages sit behind the same
    /// JS-rendered, occasionally auth-walled view the teacher routes around
    /// for GitHub pages; seed directly from the raw-content mirror's README
    /// and `docs/` tree instead, trying each of `CANDIDATE_BRANCHES` since
    /// the default branch isn't knowable without a prior API call. A branch
    /// that doesn't exist 404s and is dropped like any other page error.
    fn seed_urls(&self, start: &Url) -> Vec<Url> {
        let normalized = self.normalize(start);
        let Some((owner, repo)) = owner_repo(&normalized) else {
            return vec![normalized];
        };

        CANDIDATE_BRANCHES
            .iter()
            .flat_map(|branch| {
                [
                    format!("https://raw.githubusercontent.com/{owner}/{repo}/{branch}/README.md"),
                    format!("https://raw.githubusercontent.com/{owner}/{repo}/{branch}/docs/README.md"),
                ]
            })
            .filter_map(|u| Url::parse(&u).ok())
            .collect()
    }

    fn in_scope(&self, start: &Url, candidate: &Url, _scope: Scope) -> bool {
        if !self.can_handle(candidate) {
            return false;
        }
        match (owner_repo(start), owner_repo(candidate)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

fn owner_repo(url: &Url) -> Option<(String, String)> {
    let mut segments = url.path_segments()?;
    let owner = segments.next()?;
    let repo = segments.next()?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_lowercase(), repo.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_within_owner_repo_prefix_across_both_hosts() {
        let strategy = GitHubStrategy;
        let start = Url::parse("https://github.com/rust-lang/rust/blob/main/README.md").unwrap();
        let sibling = Url::parse("https://github.com/rust-lang/rust/blob/main/CONTRIBUTING.md").unwrap();
        let mirror = Url::parse("https://raw.githubusercontent.com/rust-lang/rust/main/docs/README.md").unwrap();
        let other_repo = Url::parse("https://github.com/rust-lang/cargo/blob/main/README.md").unwrap();
        let prefix_collision = Url::parse("https://github.com/rust-lang/rustc/blob/main/README.md").unwrap();

        assert!(strategy.in_scope(&start, &sibling, Scope::Hostname));
        assert!(strategy.in_scope(&start, &mirror, Scope::Hostname));
        assert!(!strategy.in_scope(&start, &other_repo, Scope::Hostname));
        assert!(!strategy.in_scope(&start, &prefix_collision, Scope::Hostname));
    }

    #[test]
    fn seed_urls_expand_to_the_raw_readme_and_docs_mirror_for_each_candidate_branch() {
        let strategy = GitHubStrategy;
        let start = Url::parse("https://github.com/rust-lang/rust").unwrap();
        let seeds = strategy.seed_urls(&start);

        assert!(seeds.iter().any(|u| u.as_str() == "https://raw.githubusercontent.com/rust-lang/rust/main/README.md"));
        assert!(seeds.iter().any(|u| u.as_str() == "https://raw.githubusercontent.com/rust-lang/rust/master/README.md"));
        assert!(seeds.iter().any(|u| u.as_str() == "https://raw.githubusercontent.com/rust-lang/rust/main/docs/README.md"));
    }
}
