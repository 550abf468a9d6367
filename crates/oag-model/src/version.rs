//! Version numbers, snapshots and the per-resource version index
//!
//! The [`VersionIndex`] is the append log for one resource:
//! - numbering continues from a high-water mark, so numbers are never reused
//! - history is reverse-chronological
//! - branch heads are snapshots no other snapshot names as parent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Rollover bound for the minor and patch components
pub const COMPONENT_LIMIT: u32 = 100;

/// Semantic version triple assigned to snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber {
    /// Major component
    pub major: u32,
    /// Minor component, below [`COMPONENT_LIMIT`]
    pub minor: u32,
    /// Patch component, below [`COMPONENT_LIMIT`]
    pub patch: u32,
}

impl VersionNumber {
    /// Number given to the first snapshot of a resource
    pub const INITIAL: Self = Self::new(1, 0, 0);

    /// Build a version triple
    #[inline]
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Successor: bump patch, carrying into minor and major at 100
    ///
    /// `None` once the major component cannot grow any further.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let (mut major, mut minor, mut patch) = (self.major, self.minor, self.patch.checked_add(1)?);
        if patch >= COMPONENT_LIMIT {
            patch = 0;
            minor = minor.checked_add(1)?;
        }
        if minor >= COMPONENT_LIMIT {
            minor = 0;
            major = major.checked_add(1)?;
        }
        Some(Self::new(major, minor, patch))
    }
}

impl Default for VersionNumber {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl Display for VersionNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for VersionNumber {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionParseError(s.to_string());
        let mut parts = s.trim().trim_start_matches('v').split('.');
        let mut component = || -> Result<u32, VersionParseError> {
            parts
                .next()
                .ok_or_else(invalid)?
                .parse()
                .map_err(|_| invalid())
        };
        let version = Self::new(component()?, component()?, component()?);
        if parts.next().is_some() || version.minor >= COMPONENT_LIMIT || version.patch >= COMPONENT_LIMIT {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl Serialize for VersionNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Malformed version string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version number: '{0}'")]
pub struct VersionParseError(pub String);

/// No number left after the given one
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no version number after {0}")]
pub struct VersionExhausted(pub VersionNumber);

/// Kind of versioned resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// Schema definition
    Schema,
    /// Graph instance
    Oag,
}

impl ResourceType {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Oag => "oag",
        }
    }
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "schema" => Ok(Self::Schema),
            "oag" => Ok(Self::Oag),
            other => Err(format!("unknown resource type: {other}")),
        }
    }
}

/// Immutable capture of a resource's payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    /// Snapshot id
    pub id: String,
    /// Versioned resource
    pub resource_id: String,
    /// Kind of resource
    pub resource_type: ResourceType,
    /// Assigned number
    pub version: VersionNumber,
    /// Full payload
    pub data: Value,
    /// Short content digest of `data`
    pub hash: String,
    /// Author comment
    #[serde(default)]
    pub comment: String,
    /// Author
    #[serde(default = "crate::instance::default_creator")]
    pub created_by: String,
    /// Capture time
    pub created_at: DateTime<Utc>,
    /// Parent snapshot
    #[serde(default)]
    pub parent_version_id: Option<String>,
}

impl VersionSnapshot {
    /// Index entry for this snapshot
    #[must_use]
    pub fn summary(&self) -> VersionSummary {
        VersionSummary {
            id: self.id.clone(),
            version: self.version,
            comment: self.comment.clone(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            parent_version_id: self.parent_version_id.clone(),
            hash: self.hash.clone(),
        }
    }
}

/// Index entry for one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSummary {
    /// Snapshot id
    pub id: String,
    /// Assigned number
    pub version: VersionNumber,
    /// Author comment
    #[serde(default)]
    pub comment: String,
    /// Author
    #[serde(default = "crate::instance::default_creator")]
    pub created_by: String,
    /// Capture time
    pub created_at: DateTime<Utc>,
    /// Parent snapshot
    #[serde(default)]
    pub parent_version_id: Option<String>,
    /// Short content digest
    pub hash: String,
}

/// Reported branch head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Generated name, `branch-N`
    pub name: String,
    /// Head snapshot id
    pub head_version_id: String,
    /// Head snapshot number
    pub head_version: VersionNumber,
    /// Head capture time
    pub created_at: DateTime<Utc>,
}

/// Append log of snapshot summaries for one resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionIndex {
    /// Summaries in append order
    #[serde(default)]
    pub versions: Vec<VersionSummary>,
    /// Highest number ever issued, including deleted snapshots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_issued: Option<VersionNumber>,
}

impl VersionIndex {
    /// Number the next snapshot should receive
    ///
    /// # Errors
    /// [`VersionExhausted`] when the highest issued number has no successor
    pub fn next_version(&self) -> Result<VersionNumber, VersionExhausted> {
        let seen = self.versions.iter().map(|v| v.version).max();
        match self.last_issued.max(seen) {
            Some(latest) => latest.next().ok_or(VersionExhausted(latest)),
            None => Ok(VersionNumber::INITIAL),
        }
    }

    /// Most recently appended entry
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&VersionSummary> {
        self.versions.last()
    }

    /// Entry by snapshot id
    #[must_use]
    pub fn get(&self, version_id: &str) -> Option<&VersionSummary> {
        self.versions.iter().find(|v| v.id == version_id)
    }

    /// Append an entry and advance the high-water mark
    pub fn append(&mut self, summary: VersionSummary) {
        self.last_issued = self.last_issued.max(Some(summary.version));
        self.versions.push(summary);
    }

    /// Remove an entry; the high-water mark is kept
    pub fn remove(&mut self, version_id: &str) -> Option<VersionSummary> {
        let pos = self.versions.iter().position(|v| v.id == version_id)?;
        if self.last_issued.is_none() {
            self.last_issued = self.versions.iter().map(|v| v.version).max();
        }
        Some(self.versions.remove(pos))
    }

    /// Entries newest first; ties on time break by number, newest first
    #[must_use]
    pub fn history(&self, offset: usize, limit: usize) -> Vec<VersionSummary> {
        let mut ordered: Vec<&VersionSummary> = self.versions.iter().collect();
        ordered.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.version.cmp(&a.version))
        });
        ordered
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Branch heads among the newest `scan_limit` entries
    ///
    /// Walks history newest first: every child is newer than its parent, so by
    /// the time a snapshot is visited all its children have already claimed it.
    #[must_use]
    pub fn branches(&self, scan_limit: usize) -> Vec<Branch> {
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut heads = Vec::new();
        let ordered = self.history(0, scan_limit);
        for summary in &ordered {
            if !claimed.contains(summary.id.as_str()) {
                heads.push(Branch {
                    name: format!("branch-{}", heads.len() + 1),
                    head_version_id: summary.id.clone(),
                    head_version: summary.version,
                    created_at: summary.created_at,
                });
            }
            if let Some(parent) = summary.parent_version_id.as_deref() {
                claimed.insert(parent);
            }
        }
        heads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn summary(id: &str, version: VersionNumber, minute: u32, parent: Option<&str>) -> VersionSummary {
        VersionSummary {
            id: id.to_string(),
            version,
            comment: String::new(),
            created_by: "system".into(),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, minute, 0).unwrap(),
            parent_version_id: parent.map(str::to_string),
            hash: String::new(),
        }
    }

    #[test]
    fn next_rolls_over() {
        assert_eq!(VersionNumber::new(1, 0, 0).next(), Some(VersionNumber::new(1, 0, 1)));
        assert_eq!(VersionNumber::new(1, 0, 99).next(), Some(VersionNumber::new(1, 1, 0)));
        assert_eq!(VersionNumber::new(1, 99, 99).next(), Some(VersionNumber::new(2, 0, 0)));
    }

    #[test]
    fn components_stay_in_range() {
        assert!("1.0.4294967295".parse::<VersionNumber>().is_err());
        assert!("1.100.0".parse::<VersionNumber>().is_err());
        assert!("1.0.100".parse::<VersionNumber>().is_err());
        assert_eq!("4294967295.99.99".parse::<VersionNumber>().unwrap().next(), None);
        assert_eq!(VersionNumber::new(1, 0, u32::MAX).next(), None);
    }

    #[test]
    fn exhausted_index_reports_instead_of_wrapping() {
        let mut index = VersionIndex::default();
        let top = VersionNumber::new(u32::MAX, 99, 99);
        index.append(summary("a", top, 0, None));
        assert_eq!(index.next_version(), Err(VersionExhausted(top)));
    }

    #[test]
    fn parse_and_display() {
        let v: VersionNumber = "2.10.3".parse().unwrap();
        assert_eq!(v, VersionNumber::new(2, 10, 3));
        assert_eq!(v.to_string(), "2.10.3");
        assert!("1.0".parse::<VersionNumber>().is_err());
        assert!("1.0.0.0".parse::<VersionNumber>().is_err());
        assert!("a.b.c".parse::<VersionNumber>().is_err());
    }

    #[test]
    fn empty_index_starts_at_initial() {
        assert_eq!(VersionIndex::default().next_version(), Ok(VersionNumber::INITIAL));
    }

    #[test]
    fn deleted_numbers_are_not_reused() {
        let mut index = VersionIndex::default();
        index.append(summary("a", VersionNumber::new(1, 0, 0), 0, None));
        index.append(summary("b", VersionNumber::new(1, 0, 1), 1, Some("a")));
        index.remove("b");
        assert_eq!(index.next_version().unwrap(), VersionNumber::new(1, 0, 2));
    }

    #[test]
    fn legacy_index_without_high_water_mark() {
        let index: VersionIndex = serde_json::from_value(serde_json::json!({
            "versions": [{
                "id": "a", "version": "1.0.7", "createdAt": "2026-01-01T00:00:00Z", "hash": "00"
            }]
        }))
        .unwrap();
        assert_eq!(index.next_version().unwrap(), VersionNumber::new(1, 0, 8));
    }

    #[test]
    fn history_is_newest_first_and_paged() {
        let mut index = VersionIndex::default();
        index.append(summary("a", VersionNumber::new(1, 0, 0), 0, None));
        index.append(summary("b", VersionNumber::new(1, 0, 1), 1, Some("a")));
        index.append(summary("c", VersionNumber::new(1, 0, 2), 2, Some("b")));

        let ids: Vec<_> = index.history(0, 50).into_iter().map(|v| v.id).collect();
        assert_eq!(ids, ["c", "b", "a"]);
        let page: Vec<_> = index.history(1, 1).into_iter().map(|v| v.id).collect();
        assert_eq!(page, ["b"]);
    }

    #[test]
    fn linear_chain_has_one_branch() {
        let mut index = VersionIndex::default();
        index.append(summary("a", VersionNumber::new(1, 0, 0), 0, None));
        index.append(summary("b", VersionNumber::new(1, 0, 1), 1, Some("a")));
        let branches = index.branches(1000);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].head_version_id, "b");
        assert_eq!(branches[0].name, "branch-1");
    }

    #[test]
    fn rollback_forks_a_second_branch() {
        let mut index = VersionIndex::default();
        index.append(summary("a", VersionNumber::new(1, 0, 0), 0, None));
        index.append(summary("b", VersionNumber::new(1, 0, 1), 1, Some("a")));
        index.append(summary("c", VersionNumber::new(1, 0, 2), 2, Some("a")));
        let heads: Vec<_> = index
            .branches(1000)
            .into_iter()
            .map(|b| b.head_version_id)
            .collect();
        assert_eq!(heads, ["c", "b"]);
    }

    proptest! {
        #[test]
        fn successor_is_strictly_greater(major in any::<u32>(), minor in 0u32..100, patch in 0u32..100) {
            let v = VersionNumber::new(major, minor, patch);
            match v.next() {
                Some(next) => prop_assert!(next > v),
                None => prop_assert_eq!(v, VersionNumber::new(u32::MAX, 99, 99)),
            }
        }

        #[test]
        fn parsed_numbers_round_trip(major in any::<u32>(), minor in 0u32..100, patch in 0u32..100) {
            let v = VersionNumber::new(major, minor, patch);
            prop_assert_eq!(v.to_string().parse::<VersionNumber>(), Ok(v));
        }
    }
}
