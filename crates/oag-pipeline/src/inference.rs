//! Structural edge inference
//!
//! Derives edges from foreign-key fields on classified nodes using a fixed
//! catalog of [`EdgeRule`]s. Inference never fails: a rule either fires and
//! emits exactly one edge, or it does not.
//!
//! Some rules only fire alongside another key on the same node (`requires`),
//! and one only fires for a specific payload value (`when`).

use crate::fields::reference;
use oag_model::{ContentHash, Edge, Node};
use serde::Serialize;
use std::collections::HashSet;

/// Which end of the edge the node carrying the key sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Referenced node → this node (containment)
    ParentToChild,
    /// This node → referenced node (association)
    ChildToParent,
}

/// One catalog entry: `(child type, foreign key) → (relation, direction)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRule {
    /// Type of the node carrying the key
    pub child_type: &'static str,
    /// Field holding the referenced node id
    pub foreign_key: &'static str,
    /// Relation type emitted
    pub relation: &'static str,
    /// Edge orientation
    pub direction: Direction,
    /// Other keys that must also be present
    pub requires: &'static [&'static str],
    /// Field that must equal a value
    pub when: Option<(&'static str, &'static str)>,
}

const fn contains(child_type: &'static str, foreign_key: &'static str, relation: &'static str) -> EdgeRule {
    EdgeRule {
        child_type,
        foreign_key,
        relation,
        direction: Direction::ParentToChild,
        requires: &[],
        when: None,
    }
}

const fn refers(child_type: &'static str, foreign_key: &'static str, relation: &'static str) -> EdgeRule {
    EdgeRule {
        direction: Direction::ChildToParent,
        ..contains(child_type, foreign_key, relation)
    }
}

impl EdgeRule {
    const fn requiring(mut self, keys: &'static [&'static str]) -> Self {
        self.requires = keys;
        self
    }

    const fn only_when(mut self, field: &'static str, value: &'static str) -> Self {
        self.when = Some((field, value));
        self
    }

    fn applies(&self, node: &Node) -> Option<String> {
        if node.node_type != self.child_type {
            return None;
        }
        let target = reference(&node.data, self.foreign_key)?;
        if !self.requires.iter().all(|k| reference(&node.data, k).is_some()) {
            return None;
        }
        if let Some((field, value)) = self.when {
            if node.data.get(field).and_then(|v| v.as_str()) != Some(value) {
                return None;
            }
        }
        Some(target)
    }
}

/// Standard rule catalog, grouped by relation family
pub const DEFAULT_RULES: &[EdgeRule] = &[
    // project
    contains("DomainProject", "vehicleId", "has_domain_project"),
    contains("ProjectMilestone", "domainProjectId", "has_milestone"),
    contains("Baseline", "milestoneId", "has_baseline"),
    // product
    contains("Product", "productLineId", "has_product"),
    contains("ProductVersion", "productId", "has_product_version"),
    refers("ProductVersion", "baselineId", "version_relates_baseline").requiring(&["productId"]),
    contains("Feature", "productId", "has_feature"),
    contains("Feature", "parentFeatureId", "feature_hierarchy").requiring(&["productId"]),
    contains("Module", "featureId", "has_module"),
    contains("FeaturePackage", "productId", "has_feature_package"),
    contains("FeaturePackageVersion", "featurePackageId", "package_has_version"),
    // requirements
    contains("Epic", "productId", "epic_in_product"),
    contains("FeatureRequirement", "epicId", "epic_to_fr"),
    contains("FeatureRequirement", "featureId", "feature_carries_fr").requiring(&["epicId"]),
    contains("ModuleRequirement", "featureRequirementId", "fr_to_mr"),
    contains("ModuleRequirement", "moduleId", "module_carries_mr").requiring(&["featureRequirementId"]),
    contains("SSTS", "moduleRequirementId", "mr_to_ssts"),
    contains("PRDDocument", "featureRequirementId", "fr_has_prd"),
    contains("FeatureRequirementVersion", "featureRequirementId", "fr_has_version"),
    contains("ModuleRequirementVersion", "moduleRequirementId", "mr_has_version"),
    // assets
    contains("AssetVersion", "assetId", "asset_has_version"),
    contains("AssetUsage", "moduleRequirementId", "mr_uses_asset"),
    refers("AssetUsage", "assetVersionId", "usage_refers_version").requiring(&["moduleRequirementId"]),
    // planning
    contains("PI", "domainProjectId", "project_has_pi"),
    contains("Sprint", "piId", "pi_has_sprint"),
    contains("SprintBacklog", "sprintId", "sprint_has_backlog"),
    refers("SprintBacklog", "moduleRequirementId", "backlog_refers_mr").requiring(&["sprintId"]),
    // execution
    contains("WorkItem", "sprintId", "sprint_has_workitem"),
    refers("WorkItem", "moduleRequirementId", "workitem_implements_mr")
        .requiring(&["sprintId"])
        .only_when("type", "REQUIREMENT_TASK"),
    contains("WorkLog", "workItemId", "workitem_has_log"),
    contains("CodeCommit", "workItemId", "workitem_has_commit"),
    contains("Build", "codeCommitId", "commit_triggers_build"),
    // quality
    contains("TestPlan", "moduleId", "mr_has_testplan"),
    contains("TestCase", "testPlanId", "testplan_has_case"),
    contains("TestExecution", "buildId", "build_triggers_test").requiring(&["testCaseId"]),
    contains("TestExecution", "testCaseId", "case_executes").requiring(&["buildId"]),
    contains("Defect", "testExecutionId", "execution_finds_defect"),
    // delivery
    contains("Artifact", "buildId", "build_produces_artifact"),
    contains("Release", "artifactId", "artifact_releases"),
    refers("Release", "productVersionId", "release_relates_version").requiring(&["artifactId"]),
    contains("Deployment", "releaseId", "release_deploys"),
    // metrics
    contains("MetricSet", "domainProjectId", "project_has_metricset"),
    contains("Metric", "metricSetId", "metricset_has_metric"),
    contains("MetricValue", "metricId", "metric_has_value"),
    // organization
    contains("TeamMember", "userId", "user_in_team").requiring(&["teamId"]),
    contains("TeamMember", "teamId", "team_has_member").requiring(&["userId"]),
    contains("Team", "domainProjectId", "project_has_team"),
];

/// Deterministic edge id for a `(source, relation, target)` triple
#[must_use]
pub fn edge_id(source: &str, relation: &str, target: &str) -> String {
    let digest = ContentHash::compute(format!("{source}\u{0}{relation}\u{0}{target}").as_bytes());
    format!("edge_{}", &digest.short()[..10])
}

/// Edges derived from a node set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferredEdges {
    /// Emitted edges
    pub edges: Vec<Edge>,
    /// Ids of emitted edges whose referenced node is not in the node set
    pub unresolved: Vec<String>,
}

/// Rule-driven edge inference
#[derive(Debug, Clone)]
pub struct EdgeInference {
    rules: Vec<EdgeRule>,
}

impl Default for EdgeInference {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EdgeInference {
    /// Inference over a custom catalog
    #[must_use]
    pub fn new(rules: Vec<EdgeRule>) -> Self {
        Self { rules }
    }

    /// Inference over [`DEFAULT_RULES`]
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }

    /// Catalog in use
    #[inline]
    #[must_use]
    pub fn rules(&self) -> &[EdgeRule] {
        &self.rules
    }

    /// Derive edges for every node, in node order then catalog order
    ///
    /// Edges pointing at ids outside `nodes` are still emitted; their ids are
    /// listed in [`InferredEdges::unresolved`] for the validator to confirm.
    #[must_use]
    pub fn infer(&self, nodes: &[Node]) -> InferredEdges {
        let known: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        let mut out = InferredEdges::default();

        for node in nodes {
            for rule in &self.rules {
                let Some(referenced) = rule.applies(node) else {
                    continue;
                };
                let (source, target) = match rule.direction {
                    Direction::ParentToChild => (referenced.clone(), node.id.clone()),
                    Direction::ChildToParent => (node.id.clone(), referenced.clone()),
                };
                let edge = Edge::new(edge_id(&source, rule.relation, &target), source, rule.relation, target);
                if !known.contains(referenced.as_str()) {
                    tracing::debug!(
                        edge = %edge.id,
                        relation = rule.relation,
                        missing = %referenced,
                        "inferred edge references unknown node"
                    );
                    out.unresolved.push(edge.id.clone());
                }
                out.edges.push(edge);
            }
        }
        out
    }
}
