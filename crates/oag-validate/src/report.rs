//! Two-tier validation results
//!
//! Findings are partitioned into errors and warnings. Callers decide what to
//! accept through an [`AcceptancePolicy`] rather than the validator deciding.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Violates a hard invariant
    Error,
    /// Advisory
    Warning,
}

/// Category of a finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IssueKind {
    /// Node or edge lacks a required structural field
    MissingField,
    /// Two nodes share an id
    DuplicateId,
    /// Node type not declared by the schema
    EntityTypeUndefined,
    /// Edge type not declared by the schema
    RelationTypeUndefined,
    /// Edge endpoint id matches no node
    DanglingEdgeReference,
    /// Edge endpoint type outside the relation's `from`/`to`
    TypeConstraintViolation,
    /// Node lacks a value for a required property
    RequiredFieldMissing,
    /// Schema element fails a naming or format rule
    InvalidFormat,
    /// Property declares an unrecognized type
    UnknownPropertyType,
    /// Relation endpoint names an undeclared entity type
    UndefinedEndpoint,
    /// Schema declares no entity types
    EmptySchema,
    /// Entity type takes part in no relation
    IsolatedEntityType,
}

/// Where a finding applies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "at")]
pub enum Location {
    /// Node by position, with its id when present
    Node {
        /// Position in the node list
        index: usize,
        /// Node id
        id: Option<String>,
    },
    /// Edge by position, with its id when present
    Edge {
        /// Position in the edge list
        index: usize,
        /// Edge id
        id: Option<String>,
    },
    /// Schema entity type
    EntityType {
        /// Type code
        code: String,
    },
    /// Schema relation type
    RelationType {
        /// Relation code
        code: String,
    },
    /// Property on an entity or relation type
    Property {
        /// Owning type code
        owner: String,
        /// Property name
        name: String,
    },
    /// Schema as a whole
    Schema,
}

/// One finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Category
    pub kind: IssueKind,
    /// Severity
    pub severity: Severity,
    /// Where it applies
    pub location: Location,
    /// Human-readable description
    pub message: String,
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Partitioned findings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Hard failures
    pub errors: Vec<ValidationIssue>,
    /// Advisory findings
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn error(&mut self, kind: IssueKind, location: Location, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            kind,
            severity: Severity::Error,
            location,
            message: message.into(),
        });
    }

    /// Record a warning
    pub fn warning(&mut self, kind: IssueKind, location: Location, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            kind,
            severity: Severity::Warning,
            location,
            message: message.into(),
        });
    }

    /// No errors
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// No findings at all
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Whether the policy accepts this report
    #[inline]
    #[must_use]
    pub fn accepts(&self, policy: AcceptancePolicy) -> bool {
        match policy {
            AcceptancePolicy::Lenient => self.is_valid(),
            AcceptancePolicy::Strict => self.is_clean(),
        }
    }

    /// Errors of one kind
    pub fn errors_of(&self, kind: &IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        let kind = kind.clone();
        self.errors.iter().filter(move |i| i.kind == kind)
    }

    /// Warnings of one kind
    pub fn warnings_of(&self, kind: &IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        let kind = kind.clone();
        self.warnings.iter().filter(move |i| i.kind == kind)
    }
}

/// How much a caller tolerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptancePolicy {
    /// Accept when there are no errors
    #[default]
    Lenient,
    /// Accept only when there are neither errors nor warnings
    Strict,
}
