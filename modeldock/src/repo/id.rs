//! Validated `namespace/name` repository identifiers.

use std::fmt;

use serde::{Serialize, Serializer};

use super::ValidationError;

/// A registry repository identifier of the form `namespace/name`.
///
/// Both parts are non-empty, contain no whitespace and no path separators
/// other than the single `/` between them. The parts `.` and `..` are refused
/// because the identifier is also used to derive directories under the
/// storage root.
///
/// # Examples
///
/// ```
/// use modeldock::repo::RepoId;
///
/// let id = RepoId::parse("TheBloke/Llama-2-7B-GGUF").unwrap();
/// assert_eq!(id.namespace(), "TheBloke");
/// assert_eq!(id.name(), "Llama-2-7B-GGUF");
///
/// assert!(RepoId::parse("no-slash").is_err());
/// assert!(RepoId::parse("a/b/c").is_err());
/// assert!(RepoId::parse("a /b").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    full: String,
    split: usize,
}

impl RepoId {
    /// Parse and validate an identifier.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidRepositoryId(raw.to_string());

        if raw.is_empty() || raw.chars().any(char::is_whitespace) || raw.contains('\\') {
            return Err(invalid());
        }

        let mut parts = raw.split('/');
        let (namespace, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(ns), Some(name), None) => (ns, name),
            _ => return Err(invalid()),
        };

        if [namespace, name]
            .iter()
            .any(|part| part.is_empty() || *part == "." || *part == "..")
        {
            return Err(invalid());
        }

        Ok(Self {
            full: raw.to_string(),
            split: namespace.len(),
        })
    }

    /// The owning user or organisation.
    pub fn namespace(&self) -> &str {
        &self.full[..self.split]
    }

    /// The repository name within the namespace.
    pub fn name(&self) -> &str {
        &self.full[self.split + 1..]
    }

    /// The full `namespace/name` string.
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl Serialize for RepoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.full)
    }
}
