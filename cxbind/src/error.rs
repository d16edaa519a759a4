//! Errors raised while turning native declarations into wrapper code.

use crate::api::native::TypeKind;

/// Convenience result alias used across the crate.
pub type Result<T, E = GenerationError> = std::result::Result<T, E>;

/// Why a single declaration could not be synthesized.
///
/// All variants are structural mismatches between the declaration and the rule set;
/// none of them is transient, so nothing is ever retried.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("unhandled type {spelling:?} of kind {kind}")]
    UnhandledTypeKind { spelling: String, kind: TypeKind },
    #[error("cannot determine the length of array member {member:?} of {record:?}")]
    UnresolvedArrayLength { record: String, member: String },
    #[error("malformed declaration {declaration:?}: {detail}")]
    MalformedDeclaration { declaration: String, detail: String },
    #[error("{name:?} is not a valid identifier in generated code")]
    InvalidIdentifier { name: String },
    #[error("{path}:{line}: {source}")]
    InvalidRecord {
        path: String,
        line: usize,
        source: serde_json::Error,
    },
    #[error("failed to read declarations: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse declarations: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerationError {
    pub fn unhandled(spelling: impl Into<String>, kind: TypeKind) -> Self {
        Self::UnhandledTypeKind {
            spelling: spelling.into(),
            kind,
        }
    }

    pub fn malformed(declaration: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedDeclaration {
            declaration: declaration.into(),
            detail: detail.into(),
        }
    }

    pub fn unresolved_length(record: impl Into<String>, member: impl Into<String>) -> Self {
        Self::UnresolvedArrayLength {
            record: record.into(),
            member: member.into(),
        }
    }
}
