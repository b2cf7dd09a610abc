//! Selection of relevant source paths from `git diff` output.

/// Keeps paths under a source root with a given extension.
///
/// Git reports paths relative to the repository root. The filter keeps only
/// those below `prefix` that end in `extension`, and strips the prefix so the
/// result is relative to the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathFilter {
    prefix: String,
    extension: String,
}

impl PathFilter {
    /// Create a filter for `prefix` (e.g. `src/main/java/`) and `extension`
    /// (e.g. `.java`).
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Source root prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Required file extension.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Map one line of git output to a source-relative path, if it matches.
    pub fn select(&self, line: &str) -> Option<String> {
        let path = line.trim();
        if path.is_empty() || !path.ends_with(&self.extension) {
            return None;
        }
        path.strip_prefix(self.prefix.as_str())
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }

    /// Apply [`PathFilter::select`] to every line of `output`.
    pub fn select_all(&self, output: &str) -> Vec<String> {
        output.lines().filter_map(|line| self.select(line)).collect()
    }
}
