//! Resource kinds and key validation

use crate::error::StoreError;
use std::fmt::{self, Display, Formatter};

/// Namespace of a stored value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Schema definitions
    Schema,
    /// Graph instances
    Oag,
    /// Individual version snapshots
    VersionSnapshot,
    /// Per-resource version indexes
    VersionIndex,
}

impl ResourceKind {
    /// All kinds
    pub const ALL: [Self; 4] = [
        Self::Schema,
        Self::Oag,
        Self::VersionSnapshot,
        Self::VersionIndex,
    ];

    /// Stable name, also used as the directory name on disk
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Oag => "oag",
            Self::VersionSnapshot => "version-snapshot",
            Self::VersionIndex => "version-index",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that a key is usable by every backend
///
/// Keys are `/`-separated segments. Segments may not be empty, `.` or `..`,
/// and may not contain backslashes or NUL.
///
/// # Errors
/// Returns [`StoreError::InvalidKey`] describing the first problem found
pub fn validate_key(kind: ResourceKind, id: &str) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidKey {
        kind,
        id: id.to_string(),
        reason,
    };
    if id.is_empty() {
        return Err(invalid("empty key"));
    }
    if id.contains(['\\', '\0']) {
        return Err(invalid("forbidden character"));
    }
    for segment in id.split('/') {
        match segment {
            "" => return Err(invalid("empty segment")),
            "." | ".." => return Err(invalid("relative segment")),
            _ => {}
        }
    }
    Ok(())
}
