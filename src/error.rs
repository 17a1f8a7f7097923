use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Discriminant of a [`StorageError`], for callers that route on the failure
/// class without destructuring the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedPath,
    NotNormalized,
    InvalidPath,
    ConsecutiveSlashes,
    ForbiddenCharacter,
    IgnoredFile,
    TrailingSlash,
    IsDirectory,
    DoesNotExist,
    Unknown,
}

/// Failure raised by a storage while resolving a reference.
///
/// Every variant carries the original reference; path-level variants also
/// carry the decoded segments that were accepted before the failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("malformed path {reference:?}: {reason}")]
    MalformedPath { reference: String, reason: String },

    /// The reference decodes fine but is not in canonical percent-encoded
    /// form. `normalized` is the canonical form the caller should redirect to.
    #[error("path {reference:?} is not normalized, canonical form is {normalized:?}")]
    NotNormalized {
        reference: String,
        normalized: String,
    },

    /// A structured (segment array) reference violates the path-parts
    /// invariants.
    #[error("invalid path reference {reference:?}: {reason}")]
    InvalidPath { reference: String, reason: String },

    #[error("consecutive slashes in {reference:?}")]
    ConsecutiveSlashes {
        reference: String,
        parts: Vec<String>,
    },

    #[error("forbidden character {found:?} in segment {segment:?} of {reference:?}")]
    ForbiddenCharacter {
        reference: String,
        parts: Vec<String>,
        segment: String,
        found: char,
    },

    #[error("segment {segment:?} of {reference:?} matches the ignore pattern")]
    IgnoredFile {
        reference: String,
        parts: Vec<String>,
        segment: String,
    },

    #[error("trailing slash in {reference:?} but directory handling is disabled")]
    TrailingSlash {
        reference: String,
        untrailed_parts: Vec<String>,
    },

    #[error("{resolved:?} is a directory")]
    IsDirectory {
        reference: String,
        parts: Vec<String>,
        resolved: PathBuf,
    },

    #[error("{resolved:?} does not exist")]
    DoesNotExist {
        reference: String,
        parts: Vec<String>,
        resolved: PathBuf,
        #[source]
        source: Option<io::Error>,
    },

    #[error("storage error for {reference:?}")]
    Unknown {
        reference: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::MalformedPath { .. } => ErrorKind::MalformedPath,
            StorageError::NotNormalized { .. } => ErrorKind::NotNormalized,
            StorageError::InvalidPath { .. } => ErrorKind::InvalidPath,
            StorageError::ConsecutiveSlashes { .. } => ErrorKind::ConsecutiveSlashes,
            StorageError::ForbiddenCharacter { .. } => ErrorKind::ForbiddenCharacter,
            StorageError::IgnoredFile { .. } => ErrorKind::IgnoredFile,
            StorageError::TrailingSlash { .. } => ErrorKind::TrailingSlash,
            StorageError::IsDirectory { .. } => ErrorKind::IsDirectory,
            StorageError::DoesNotExist { .. } => ErrorKind::DoesNotExist,
            StorageError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The reference the failing request came in with.
    pub fn reference(&self) -> &str {
        match self {
            StorageError::MalformedPath { reference, .. }
            | StorageError::NotNormalized { reference, .. }
            | StorageError::InvalidPath { reference, .. }
            | StorageError::ConsecutiveSlashes { reference, .. }
            | StorageError::ForbiddenCharacter { reference, .. }
            | StorageError::IgnoredFile { reference, .. }
            | StorageError::TrailingSlash { reference, .. }
            | StorageError::IsDirectory { reference, .. }
            | StorageError::DoesNotExist { reference, .. }
            | StorageError::Unknown { reference, .. } => reference,
        }
    }

    /// Decoded path segments accepted before the failure, when the reference
    /// got that far.
    pub fn path_parts(&self) -> Option<&[String]> {
        match self {
            StorageError::ConsecutiveSlashes { parts, .. }
            | StorageError::ForbiddenCharacter { parts, .. }
            | StorageError::IgnoredFile { parts, .. }
            | StorageError::IsDirectory { parts, .. }
            | StorageError::DoesNotExist { parts, .. } => Some(parts),
            StorageError::TrailingSlash {
                untrailed_parts, ..
            } => Some(untrailed_parts),
            _ => None,
        }
    }

    pub(crate) fn unknown(reference: impl Into<String>, source: io::Error) -> Self {
        StorageError::Unknown {
            reference: reference.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let err = StorageError::NotNormalized {
            reference: "/a/../b".to_owned(),
            normalized: "/b".to_owned(),
        };
        assert_eq!(err.kind(), ErrorKind::NotNormalized);
        assert_eq!(err.reference(), "/a/../b");
        assert!(err.path_parts().is_none());
    }

    #[test]
    fn parts_are_exposed() {
        let err = StorageError::IgnoredFile {
            reference: "/.hidden".to_owned(),
            parts: vec![".hidden".to_owned()],
            segment: ".hidden".to_owned(),
        };
        assert_eq!(err.path_parts(), Some(&[".hidden".to_owned()][..]));
    }

    #[test]
    fn does_not_exist_keeps_source() {
        let err = StorageError::DoesNotExist {
            reference: "/gone".to_owned(),
            parts: vec!["gone".to_owned()],
            resolved: PathBuf::from("/srv/gone"),
            source: Some(io::Error::from(io::ErrorKind::NotFound)),
        };
        assert_eq!(err.kind(), ErrorKind::DoesNotExist);
        assert!(std::error::Error::source(&err).is_some());
    }
}
