//! Parse failures for RS3 documents.
//!
//! A [`MalformedDocumentError`] is fatal for the single document being parsed
//! and never affects any other document. Sparse data (missing relation
//! catalog, missing `relname` or `type` attributes, relation names that do not
//! resolve against the catalog) is not an error.

use std::fmt;

/// Reason a single document could not be turned into an [`RstDocument`](crate::models::RstDocument).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedDocumentError {
    /// The content is not well-formed markup.
    Syntax(String),
    /// A required container element is absent (`rst` or `body`).
    MissingContainer(&'static str),
    /// An attribute the flat layout depends on is missing or not numeric.
    InvalidAttribute {
        element: String,
        attribute: &'static str,
        value: Option<String>,
    },
    /// Two tree elements declare the same `id` (flat layout).
    DuplicateId(u32),
    /// An element names a parent that does not exist (flat layout).
    DanglingParent { id: u32, parent: u32 },
    /// Every tree element has a parent, so there is nothing to root the tree at.
    NoRoot,
    /// Elements that cannot be reached from the root (parent cycle).
    Unreachable(usize),
    /// The tree nests deeper than the given number of levels.
    TooDeep(usize),
}

impl fmt::Display for MalformedDocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedDocumentError::Syntax(msg) => write!(f, "invalid markup: {}", msg),
            MalformedDocumentError::MissingContainer(name) => {
                write!(f, "missing <{}> container", name)
            }
            MalformedDocumentError::InvalidAttribute {
                element,
                attribute,
                value: Some(value),
            } => write!(
                f,
                "invalid {} attribute on <{}>: '{}'",
                attribute, element, value
            ),
            MalformedDocumentError::InvalidAttribute {
                element,
                attribute,
                value: None,
            } => write!(f, "<{}> is missing the {} attribute", element, attribute),
            MalformedDocumentError::DuplicateId(id) => write!(f, "duplicate node id {}", id),
            MalformedDocumentError::DanglingParent { id, parent } => {
                write!(f, "node {} references unknown parent {}", id, parent)
            }
            MalformedDocumentError::NoRoot => write!(f, "no parentless node to use as root"),
            MalformedDocumentError::Unreachable(count) => write!(
                f,
                "{} node{} not reachable from the root (parent cycle)",
                count,
                if *count == 1 { " is" } else { "s are" }
            ),
            MalformedDocumentError::TooDeep(limit) => {
                write!(f, "tree is nested deeper than {} levels", limit)
            }
        }
    }
}

impl std::error::Error for MalformedDocumentError {}

/// A batch member that failed to parse, tagged with the caller's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub id: String,
    pub error: MalformedDocumentError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.error)
    }
}

impl std::error::Error for FileFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub(crate) fn syntax(err: impl fmt::Display) -> MalformedDocumentError {
    MalformedDocumentError::Syntax(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_container() {
        let err = MalformedDocumentError::MissingContainer("body");
        assert_eq!(err.to_string(), "missing <body> container");
    }

    #[test]
    fn file_failure_prefixes_the_identifier() {
        let failure = FileFailure {
            id: "a.rs3".to_string(),
            error: MalformedDocumentError::NoRoot,
        };
        assert_eq!(
            failure.to_string(),
            "a.rs3: no parentless node to use as root"
        );
    }

    #[test]
    fn display_unreachable_pluralizes() {
        assert_eq!(
            MalformedDocumentError::Unreachable(1).to_string(),
            "1 node is not reachable from the root (parent cycle)"
        );
        assert_eq!(
            MalformedDocumentError::Unreachable(3).to_string(),
            "3 nodes are not reachable from the root (parent cycle)"
        );
    }

    #[test]
    fn display_too_deep_names_the_limit() {
        assert_eq!(
            MalformedDocumentError::TooDeep(512).to_string(),
            "tree is nested deeper than 512 levels"
        );
    }
}
