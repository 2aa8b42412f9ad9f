use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathPatternError {
    Empty { line: String },
    Glob { line: String, message: String },
}

impl Display for PathPatternError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// A line made only of `!` and `/` markers matches nothing.
fn check_not_empty(line: &str) -> Result<(), PathPatternError> {
    let body = line.strip_prefix('!').unwrap_or(line);
    if body.trim_matches('/').is_empty() {
        return Err(PathPatternError::Empty {
            line: line.to_string(),
        });
    }
    Ok(())
}

/// Adds one gitignore line to `builder`.
pub(crate) fn add_line(
    builder: &mut GitignoreBuilder,
    from: Option<PathBuf>,
    line: &str,
) -> Result<(), PathPatternError> {
    check_not_empty(line)?;
    builder
        .add_line(from, line)
        .map(|_| ())
        .map_err(|e| PathPatternError::Glob {
            line: line.to_string(),
            message: e.to_string(),
        })
}

/// Normal components of a relative path, slash-separated regardless of platform.
pub fn components(rel: &Path) -> Vec<String> {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

/// An anchored pattern matching exactly `rel`.
pub fn literal(rel: &Path) -> String {
    let mut pattern = String::new();
    for part in components(rel) {
        pattern.push('/');
        for c in part.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\' | '!' | '#') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
    }
    pattern
}

/// Ordered gitignore-style patterns where the last matching line wins.
#[derive(Debug, Clone)]
pub struct PatternSet {
    sources: Vec<String>,
    matcher: Gitignore,
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            matcher: Gitignore::empty(),
        }
    }
}

impl PatternSet {
    pub fn parse_all<I, S>(lines: I) -> Result<Self, PathPatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new("");
        let mut sources = Vec::new();
        for line in lines {
            let line = line.as_ref().trim();
            add_line(&mut builder, None, line)?;
            sources.push(line.to_string());
        }
        let matcher = builder.build().map_err(|e| PathPatternError::Glob {
            line: sources.join(" "),
            message: e.to_string(),
        })?;
        Ok(Self { sources, matcher })
    }

    /// The patterns as written, trimmed.
    pub fn patterns(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Finds the shallowest prefix of `rel` (itself included) that the set
    /// ignores, together with the deciding pattern.
    ///
    /// Once a directory is matched everything below it is covered, so a
    /// negated pattern cannot re-include a child of a matched directory.
    pub fn find(&self, rel: &Path, is_dir: bool) -> Option<(PathBuf, &str)> {
        let parts = components(rel);
        for depth in 1..=parts.len() {
            let prefix = PathBuf::from(parts[..depth].join("/"));
            let prefix_is_dir = depth < parts.len() || is_dir;
            if let Match::Ignore(glob) = self.matcher.matched(&prefix, prefix_is_dir) {
                return Some((prefix, glob.original()));
            }
        }
        None
    }

    pub fn is_match(&self, rel: &Path, is_dir: bool) -> bool {
        self.find(rel, is_dir).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(lines: &[&str]) -> PatternSet {
        PatternSet::parse_all(lines).unwrap()
    }

    #[test]
    fn suffix_pattern_matches_at_any_depth() {
        let s = set(&["*.bak"]);
        assert!(s.is_match(Path::new("main.py.bak"), false));
        assert!(s.is_match(Path::new("cogs/vcmanager.py.bak"), false));
        assert!(!s.is_match(Path::new("main.py"), false));
    }

    #[test]
    fn directory_pattern_requires_directory_and_covers_children() {
        let s = set(&["logs/"]);
        assert!(!s.is_match(Path::new("logs"), false));
        assert!(s.is_match(Path::new("logs"), true));

        let (prefix, pattern) = s.find(Path::new("logs/bot_20240101.log"), false).unwrap();
        assert_eq!(prefix, PathBuf::from("logs"));
        assert_eq!(pattern, "logs/");
    }

    #[test]
    fn slash_anchors_pattern_to_root() {
        let s = set(&["/data"]);
        assert!(s.is_match(Path::new("data"), true));
        assert!(!s.is_match(Path::new("cogs/data"), true));

        let s = set(&["cogs/*.tmp"]);
        assert!(s.is_match(Path::new("cogs/a.tmp"), false));
        assert!(!s.is_match(Path::new("other/cogs/a.tmp"), false));
    }

    #[test]
    fn star_does_not_cross_separator() {
        let s = set(&["cogs/*"]);
        assert!(s.is_match(Path::new("cogs/a.py"), false));
        assert!(s.find(Path::new("cogs/sub/a.py"), false).is_some());
        let s = set(&["/*.py"]);
        assert!(!s.is_match(Path::new("cogs/a.py"), false));
    }

    #[test]
    fn last_matching_line_wins() {
        let s = set(&["*.log", "!keep.log"]);
        assert!(s.is_match(Path::new("run.log"), false));
        assert!(!s.is_match(Path::new("keep.log"), false));

        let s = set(&["!keep.log", "*.log"]);
        assert!(s.is_match(Path::new("keep.log"), false));
    }

    #[test]
    fn dotfiles_match_wildcards() {
        let s = set(&["*"]);
        assert!(s.is_match(Path::new(".env"), false));
        let s = set(&[".env"]);
        assert!(s.is_match(Path::new(".env"), false));
        assert!(!s.is_match(Path::new(".env.example"), false));
    }

    #[test]
    fn literal_pattern_matches_only_that_path() {
        let s = set(&[literal(Path::new("predep.toml")).as_str()]);
        assert!(s.is_match(Path::new("predep.toml"), false));
        assert!(!s.is_match(Path::new("cogs/predep.toml"), false));

        assert_eq!(literal(Path::new("conf/[x].toml")), "/conf/\\[x\\].toml");
    }

    #[test]
    fn empty_pattern_is_rejected() {
        assert!(matches!(
            PatternSet::parse_all(["/"]),
            Err(PathPatternError::Empty { .. })
        ));
        assert!(matches!(
            PatternSet::parse_all(["!"]),
            Err(PathPatternError::Empty { .. })
        ));
        assert!(matches!(
            PatternSet::parse_all(["[z-a]"]),
            Err(PathPatternError::Glob { .. })
        ));
    }
}
