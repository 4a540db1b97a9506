use url::Url;

use super::ScrapeStrategy;
use crate::core::types::Scope;

/// Accepts `file://` URLs and performs directory walking rather than link
/// discovery: scope is always "stay under the starting directory"
/// regardless of `options.scope`, since hostname/domain scoping is
/// meaningless for local paths.
pub struct LocalFileStrategy;

impl ScrapeStrategy for LocalFileStrategy {
    fn name(&self) -> &'static str {
        "local_file"
    }

    fn can_handle(&self, url: &Url) -> bool {
        url.scheme() == "file"
    }

    fn in_scope(&self, start: &Url, candidate: &Url, _scope: Scope) -> bool {
        candidate.scheme() == "file"
            && candidate
                .to_file_path()
                .ok()
                .zip(start.to_file_path().ok())
                .is_some_and(|(c, s)| {
                    let root = if s.is_dir() { s.clone() } else { s.parent().unwrap_or(&s).to_path_buf() };
                    c.starts_with(&root)
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_start_scopes_to_itself_not_its_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("page.md"), "x").unwrap();

        let start = Url::from_directory_path(dir.path()).unwrap();
        let inside = Url::from_file_path(dir.path().join("nested").join("page.md")).unwrap();
        let outside = Url::from_file_path(dir.path().parent().unwrap().join("sibling.md")).unwrap();

        let strategy = LocalFileStrategy;
        assert!(strategy.in_scope(&start, &inside, Scope::Subpages));
        assert!(!strategy.in_scope(&start, &outside, Scope::Subpages));
    }
}
