//! Node classification by id prefix
//!
//! Provides [`Classifier`], an ordered, data-driven table mapping record id
//! prefixes to entity types.
//!
//! # Resolution
//! - The longest matching prefix wins; equal lengths resolve by table order
//! - A prefix shared by several types carries [`Discriminator`]s, tried in order
//! - Anything that does not resolve is [`Classification::Unclassified`] with a reason

use crate::fields::{has_truthy, non_empty_str};
use oag_model::{PropertyMap, TypeCode};
use serde::{Deserialize, Serialize};

/// Type chosen when a shared prefix's discriminating fields are present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// Resulting entity type
    pub entity_type: TypeCode,
    /// Field that must be truthy
    pub required: String,
    /// At least one of these fields must be present
    pub any_of: Vec<String>,
}

impl Discriminator {
    /// New discriminator
    #[must_use]
    pub fn new(entity_type: &str, required: &str, any_of: &[&str]) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            required: required.to_string(),
            any_of: any_of.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    fn matches(&self, record: &PropertyMap) -> bool {
        has_truthy(record, &self.required) && self.any_of.iter().any(|f| record.contains_key(f))
    }
}

/// What a prefix resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleTarget {
    /// Unambiguous type
    Type(TypeCode),
    /// Shared prefix resolved by record fields
    Discriminated(Vec<Discriminator>),
}

/// One row of the classification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRule {
    /// Id prefix, including the separator
    pub prefix: String,
    /// Resolution
    pub target: RuleTarget,
}

impl PrefixRule {
    /// Prefix mapping to a single type
    #[must_use]
    pub fn single(prefix: &str, entity_type: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            target: RuleTarget::Type(entity_type.to_string()),
        }
    }

    /// Prefix shared by several types
    #[must_use]
    pub fn discriminated(prefix: &str, discriminators: Vec<Discriminator>) -> Self {
        Self {
            prefix: prefix.to_string(),
            target: RuleTarget::Discriminated(discriminators),
        }
    }
}

/// Why a record could not be classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum UnclassifiedReason {
    /// Record has no string `id`
    MissingId,
    /// No prefix in the table matches
    NoMatchingPrefix,
    /// Prefix is shared and no discriminator matched
    Ambiguous {
        /// The shared prefix
        prefix: String,
    },
}

/// Outcome of classifying one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Resolved entity type
    Classified(TypeCode),
    /// No type could be determined
    Unclassified(UnclassifiedReason),
}

impl Classification {
    /// Resolved type, if any
    #[inline]
    #[must_use]
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Self::Classified(code) => Some(code),
            Self::Unclassified(_) => None,
        }
    }
}

/// Prefix → entity type table used by the import pipeline.
/// `TC-` is handled separately because it is shared.
const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    // project
    ("VEH-", "Vehicle"),
    ("DP-", "DomainProject"),
    ("MS-", "ProjectMilestone"),
    ("BL-", "Baseline"),
    // product
    ("PL-", "ProductLine"),
    ("PROD-", "Product"),
    ("PV-", "ProductVersion"),
    ("FEAT-", "Feature"),
    ("MOD-", "Module"),
    ("FP-", "FeaturePackage"),
    ("FPV-", "FeaturePackageVersion"),
    // requirements
    ("EPIC-", "Epic"),
    ("FR-", "FeatureRequirement"),
    ("FRV-", "FeatureRequirementVersion"),
    ("MR-", "ModuleRequirement"),
    ("MRV-", "ModuleRequirementVersion"),
    ("SSTS-", "SSTS"),
    ("PRD-", "PRDDocument"),
    // assets
    ("ASSET-", "Asset"),
    ("AV-", "AssetVersion"),
    ("AU-", "AssetUsage"),
    ("AD-", "AssetDependency"),
    // planning
    ("PI-", "PI"),
    ("SPRINT-", "Sprint"),
    ("SB-", "SprintBacklog"),
    // execution
    ("WI-", "WorkItem"),
    ("WL-", "WorkLog"),
    ("CC-", "CodeCommit"),
    ("BUILD-", "Build"),
    ("WID-", "WorkItemDependency"),
    ("WIA-", "WorkItemAttachment"),
    ("REPO-", "Repository"),
    // quality
    ("TP-", "TestPlan"),
    ("TE-", "TestExecution"),
    ("DEFECT-", "Defect"),
    // delivery
    ("ARTIFACT-", "Artifact"),
    ("RELEASE-", "Release"),
    ("DEPLOY-", "Deployment"),
    // metrics
    ("METRIC-", "Metric"),
    ("MV-", "MetricValue"),
    // organization
    ("USER-", "User"),
    ("TEAM-", "Team"),
    ("TM-", "TeamMember"),
    ("ROLE-", "Role"),
    ("UR-", "UserRole"),
];

/// Team-capacity entity type resolved from `TC-`
pub const TEAM_CAPACITY: &str = "TeamCapacity";
/// Test-case entity type resolved from `TC-`
pub const TEST_CASE: &str = "TestCase";

/// Ordered prefix classification table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    rules: Vec<PrefixRule>,
}

impl Classifier {
    /// Empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Table covering the standard id prefixes
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut classifier = Self::new();
        for (prefix, entity_type) in DEFAULT_PREFIXES {
            classifier.register(PrefixRule::single(prefix, entity_type));
        }
        classifier.register(PrefixRule::discriminated(
            "TC-",
            vec![
                Discriminator::new(TEAM_CAPACITY, "teamId", &["capacity", "availableHours"]),
                Discriminator::new(TEST_CASE, "testPlanId", &["steps", "description"]),
            ],
        ));
        classifier
    }

    /// Append a rule
    pub fn register(&mut self, rule: PrefixRule) {
        self.rules.push(rule);
    }

    /// Rules in table order
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[PrefixRule] {
        &self.rules
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Most specific rule whose prefix starts `id`
    #[must_use]
    pub fn rule_for(&self, id: &str) -> Option<&PrefixRule> {
        self.rules
            .iter()
            .filter(|rule| id.starts_with(rule.prefix.as_str()))
            .fold(None, |best: Option<&PrefixRule>, rule| match best {
                Some(b) if b.prefix.len() >= rule.prefix.len() => Some(b),
                _ => Some(rule),
            })
    }

    /// Classify a raw record by its `id`
    #[must_use]
    pub fn classify(&self, record: &PropertyMap) -> Classification {
        let Some(id) = non_empty_str(record, "id") else {
            return Classification::Unclassified(UnclassifiedReason::MissingId);
        };
        let Some(rule) = self.rule_for(id) else {
            return Classification::Unclassified(UnclassifiedReason::NoMatchingPrefix);
        };
        match &rule.target {
            RuleTarget::Type(code) => Classification::Classified(code.clone()),
            RuleTarget::Discriminated(options) => options
                .iter()
                .find(|d| d.matches(record))
                .map_or_else(
                    || {
                        Classification::Unclassified(UnclassifiedReason::Ambiguous {
                            prefix: rule.prefix.clone(),
                        })
                    },
                    |d| Classification::Classified(d.entity_type.clone()),
                ),
        }
    }

    /// Classify, falling back to `hint` when the table yields nothing
    ///
    /// A record without an id stays unclassified regardless of the hint.
    #[must_use]
    pub fn classify_with_hint(&self, record: &PropertyMap, hint: Option<&str>) -> Classification {
        match (self.classify(record), hint) {
            (Classification::Unclassified(reason), Some(hint))
                if reason != UnclassifiedReason::MissingId =>
            {
                Classification::Classified(hint.to_string())
            }
            (outcome, _) => outcome,
        }
    }
}
