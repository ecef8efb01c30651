//! File-name filter applied to registry listings and to the bulk fetch.

use glob::Pattern;

/// Glob-style substring filter over repository file names.
///
/// The operator's input is wrapped as `*{input}*`, so a plain word such as
/// `Q4_K_M` matches any file containing it and explicit wildcards keep their
/// glob meaning. Input that is not a valid glob falls back to a substring
/// test with the `*` characters removed. An empty pattern matches everything.
///
/// # Examples
///
/// ```
/// use modeldock::repo::NamePattern;
///
/// let pattern = NamePattern::new("Q4_K_M");
/// assert!(pattern.matches("model.Q4_K_M.gguf"));
/// assert!(!pattern.matches("model.Q8_0.gguf"));
///
/// assert!(NamePattern::new("").matches("anything"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamePattern {
    raw: Option<String>,
    glob: Option<Pattern>,
}

impl NamePattern {
    /// Build a pattern from operator input. Surrounding whitespace is ignored.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        Self {
            raw: Some(trimmed.to_string()),
            glob: Pattern::new(&format!("*{}*", trimmed)).ok(),
        }
    }

    /// Whether this pattern accepts every file.
    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    /// The trimmed operator input, if any.
    pub fn as_str(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    /// Test a repository-relative file name.
    pub fn matches(&self, file_name: &str) -> bool {
        match (&self.raw, &self.glob) {
            (None, _) => true,
            (Some(_), Some(glob)) => glob.matches(file_name),
            (Some(raw), None) => file_name.contains(&raw.replace('*', "")),
        }
    }
}
