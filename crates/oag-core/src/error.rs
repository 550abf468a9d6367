//! Error types for the OAG engine
//!
//! One taxonomy for every lifecycle operation:
//! - Missing resources (schema, template, graph instance, snapshot)
//! - Graph conformance failures raised when a caller's policy rejects a graph
//! - Create conflicts, unsupported export formats and out-of-range arguments
//! - Persistence and payload decoding failures

use oag_model::VersionExhausted;
use oag_store::StoreError;
use oag_validate::{IssueKind, Location, ValidationIssue};
use std::fmt::Display;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum OagError {
    /// No schema stored under the id
    #[error("schema not found: {0}")]
    SchemaNotFound(String),

    /// Template id outside the catalog
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Graph instance or snapshot missing
    #[error("{kind} not found: {id}")]
    ResourceNotFound {
        /// `oag` or `version`
        kind: &'static str,
        /// Requested id
        id: String,
    },

    /// Node type not declared by the bound schema
    #[error("entity type undefined: {0}")]
    EntityTypeUndefined(String),

    /// Edge type not declared by the bound schema
    #[error("relation type undefined: {0}")]
    RelationTypeUndefined(String),

    /// Edge endpoint matches no node
    #[error("dangling edge reference: {0}")]
    DanglingEdgeReference(String),

    /// Edge endpoint type outside the relation's endpoint types
    #[error("type constraint violation: {0}")]
    TypeConstraintViolation(String),

    /// Create conflict
    #[error("{kind} already exists: {id}")]
    DuplicateResource {
        /// Resource kind
        kind: &'static str,
        /// Conflicting id
        id: String,
    },

    /// A required value is absent
    #[error("required field missing: {0}")]
    RequiredFieldMissing(String),

    /// Export format not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Caller argument outside its accepted range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Graph refused by the acceptance policy for a reason with no dedicated variant
    #[error("rejected: {0}")]
    Rejected(String),

    /// Resource history has used up its version numbers
    #[error("version numbers exhausted for {resource}: {source}")]
    VersionExhausted {
        /// Versioned resource
        resource: String,
        /// Last number issued
        source: VersionExhausted,
    },

    /// Stored or produced payload could not be (de)serialized
    #[error("malformed {what}: {message}")]
    Serialization {
        /// What was being (de)serialized
        what: String,
        /// Underlying error
        message: String,
    },

    /// Persistence layer failure
    #[error("io failure: {0}")]
    IoFailure(#[from] StoreError),
}

/// Result alias for engine operations
pub type Result<T> = std::result::Result<T, OagError>;

impl OagError {
    /// Create resource-not-found error
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create duplicate-resource error
    pub fn duplicate(kind: &'static str, id: impl Into<String>) -> Self {
        Self::DuplicateResource {
            kind,
            id: id.into(),
        }
    }

    /// Create serialization error
    pub fn serialization(what: impl Into<String>, error: impl Display) -> Self {
        Self::Serialization {
            what: what.into(),
            message: error.to_string(),
        }
    }

    /// Map a storage error, turning not-found into `missing()`
    pub fn from_store(error: StoreError, missing: impl FnOnce() -> Self) -> Self {
        if error.is_not_found() {
            missing()
        } else {
            Self::IoFailure(error)
        }
    }

    /// Typed error for a validation finding
    #[must_use]
    pub fn from_issue(issue: &ValidationIssue) -> Self {
        let message = issue.message.clone();
        match issue.kind {
            IssueKind::EntityTypeUndefined => Self::EntityTypeUndefined(message),
            IssueKind::RelationTypeUndefined => Self::RelationTypeUndefined(message),
            IssueKind::DanglingEdgeReference => Self::DanglingEdgeReference(message),
            IssueKind::TypeConstraintViolation => Self::TypeConstraintViolation(message),
            IssueKind::MissingField | IssueKind::RequiredFieldMissing => {
                Self::RequiredFieldMissing(message)
            }
            IssueKind::DuplicateId => match &issue.location {
                Location::Node { id: Some(id), .. } => Self::duplicate("node", id.clone()),
                _ => Self::Rejected(message),
            },
            _ => Self::Rejected(message),
        }
    }

    /// Whether the caller is at fault (4xx family); otherwise 5xx
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::IoFailure(e) => matches!(e, StoreError::InvalidKey { .. }),
            Self::Serialization { .. } | Self::VersionExhausted { .. } => false,
            _ => true,
        }
    }

    /// Whether a requested resource is missing
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SchemaNotFound(_) | Self::TemplateNotFound(_) | Self::ResourceNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oag_store::ResourceKind;
    use oag_validate::ValidationReport;

    #[test]
    fn store_errors_map_by_context() {
        let missing = OagError::from_store(StoreError::not_found(ResourceKind::Schema, "s1"), || {
            OagError::SchemaNotFound("s1".into())
        });
        assert!(matches!(missing, OagError::SchemaNotFound(ref id) if id == "s1"));
        assert!(missing.is_not_found());

        let io = OagError::from_store(
            StoreError::io_error("/data", std::io::Error::other("disk")),
            || OagError::SchemaNotFound("s1".into()),
        );
        assert!(matches!(io, OagError::IoFailure(_)));
        assert!(!io.is_client_error());
    }

    #[test]
    fn issues_map_to_taxonomy() {
        let mut report = ValidationReport::new();
        report.error(
            IssueKind::DanglingEdgeReference,
            Location::Edge { index: 0, id: Some("e1".into()) },
            "edge e1 target node X not found",
        );
        report.error(
            IssueKind::DuplicateId,
            Location::Node { index: 3, id: Some("VEH-1".into()) },
            "node VEH-1 duplicates an earlier node id",
        );
        assert!(matches!(
            OagError::from_issue(&report.errors[0]),
            OagError::DanglingEdgeReference(_)
        ));
        assert!(matches!(
            OagError::from_issue(&report.errors[1]),
            OagError::DuplicateResource { kind: "node", ref id } if id == "VEH-1"
        ));
    }

    #[test]
    fn client_error_classification() {
        assert!(OagError::UnsupportedFormat("xlsx".into()).is_client_error());
        assert!(OagError::InvalidArgument("depth 9".into()).is_client_error());
        assert!(OagError::not_found("oag", "x").is_client_error());
        assert!(!OagError::serialization("oag x", "eof").is_client_error());
    }
}
