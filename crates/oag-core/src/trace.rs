//! Traceability over stored graph instances
//!
//! Walks relations upstream (towards what an entity derives from) and
//! downstream (towards what derives from it), summarizes verification of an
//! entity through its test cases, estimates the blast radius of changing it,
//! and lists the root-to-entity paths leading to it.
//!
//! Relation and type names the analyses key on come from [`TraceRules`], which
//! is part of the engine configuration.

use crate::context::EngineContext;
use crate::error::{OagError, Result};
use crate::oag::OagService;
use crate::query::GraphQuery;
use chrono::{DateTime, Utc};
use oag_model::{Edge, GraphData, Node, PropertyMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

/// Deepest walk a trace may request
pub const MAX_TRACE_DEPTH: usize = 5;

/// Depth used when the caller names none
pub const DEFAULT_TRACE_DEPTH: usize = 3;

/// Depth of the downstream walk behind a change-impact estimate
const IMPACT_DEPTH: usize = MAX_TRACE_DEPTH;

/// Names the trace analyses key on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceRules {
    /// Relation from an entity to the test cases verifying it
    pub verified_by: String,
    /// Relation from a test case to the issues it found
    pub finds: String,
    /// Test case statuses counted as passed
    pub passed_statuses: Vec<String>,
    /// Test case statuses counted as failed
    pub failed_statuses: Vec<String>,
    /// Any affected entity of these types makes a change high risk
    pub critical_types: Vec<String>,
    /// Entity types counted against `requirement_threshold`
    pub requirement_types: Vec<String>,
    /// More affected requirements than this makes a change medium risk
    pub requirement_threshold: usize,
    /// Payload fields naming people to notify
    pub owner_fields: Vec<String>,
    /// Payload fields holding effort estimates in hours
    pub effort_fields: Vec<String>,
    /// Entity types where root paths stop
    pub root_types: Vec<String>,
}

impl Default for TraceRules {
    fn default() -> Self {
        fn owned(names: &[&str]) -> Vec<String> {
            names.iter().map(ToString::to_string).collect()
        }
        Self {
            verified_by: "verified_by".to_string(),
            finds: "finds".to_string(),
            passed_statuses: owned(&["PASSED", "通过"]),
            failed_statuses: owned(&["FAILED", "失败"]),
            critical_types: owned(&["ReleasePackage"]),
            requirement_types: owned(&["SWR"]),
            requirement_threshold: 3,
            owner_fields: owned(&["owner", "PM"]),
            effort_fields: owned(&["estimated_hours", "estimatedHours"]),
            root_types: owned(&["VehicleProject", "Vehicle"]),
        }
    }
}

/// What a trace reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Upstream and downstream chains plus test coverage
    #[default]
    FullTrace,
    /// Downstream chain plus change impact
    ImpactAnalysis,
    /// Downstream chain only
    DownstreamTasks,
}

impl TraceKind {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FullTrace => "full_trace",
            Self::ImpactAnalysis => "impact_analysis",
            Self::DownstreamTasks => "downstream_tasks",
        }
    }
}

impl Display for TraceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraceKind {
    type Err = OagError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full_trace" | "full" => Ok(Self::FullTrace),
            "impact_analysis" | "impact" => Ok(Self::ImpactAnalysis),
            "downstream_tasks" | "downstream" => Ok(Self::DownstreamTasks),
            _ => Err(OagError::InvalidArgument(format!("unknown trace kind {s}"))),
        }
    }
}

/// One step of a trace chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainEntry {
    /// Hops from the queried entity, starting at 1
    pub level: usize,
    /// Reached node's type
    pub entity_type: String,
    /// Reached node's id
    pub entity_id: String,
    /// Relation type of the hop
    pub relation: String,
    /// The hop edge's `confidence`, 1.0 when unset
    pub trace_confidence: f64,
    /// Reached node's payload
    pub data: PropertyMap,
}

/// Issue reported against a test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Issue node id
    pub issue_id: String,
    /// `severity` field
    pub severity: Option<Value>,
    /// `status` field
    pub status: Option<Value>,
    /// `description` field
    pub description: Option<Value>,
}

/// Verification of one entity through its test cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCoverage {
    /// Test cases verifying the entity
    pub total_test_cases: usize,
    /// Of those, passed
    pub passed: usize,
    /// Of those, failed
    pub failed: usize,
    /// Issues the test cases found
    pub issues: Vec<IssueRef>,
}

/// Risk of changing an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Normal process
    Low,
    /// Notify owners and update tests
    Medium,
    /// Needs a change review
    High,
}

impl RiskLevel {
    /// Suggested handling
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        match self {
            Self::High => "hold a change review, scope the impact and plan detailed testing",
            Self::Medium => "notify every affected owner and update the related test cases",
            Self::Low => "limited impact, follow the normal process",
        }
    }
}

/// Estimated consequences of changing an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeImpact {
    /// Affected entity ids per type, each id once
    pub affected_entities: BTreeMap<String, Vec<String>>,
    /// Owners named on affected entities, in discovery order
    pub notified_owners: Vec<String>,
    /// Risk classification
    pub risk_level: RiskLevel,
    /// Sum of effort estimates over affected entities
    pub estimated_effort_hours: f64,
    /// Downstream chain length
    pub impact_score: usize,
    /// Suggested handling
    pub recommendation: String,
}

/// One node on a root-to-entity path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Node id
    pub id: String,
    /// Node type
    #[serde(rename = "type")]
    pub node_type: String,
    /// `title`, `project_name`, the node label, or the id
    pub label: String,
}

/// Result of [`Tracer::trace`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    /// Queried entity
    pub query_entity: Node,
    /// What was computed
    pub query_type: TraceKind,
    /// Chain depth
    pub depth: usize,
    /// When the trace ran
    pub timestamp: DateTime<Utc>,
    /// What the entity derives from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream_chain: Option<Vec<ChainEntry>>,
    /// What derives from the entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downstream_chain: Option<Vec<ChainEntry>>,
    /// Verification summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_coverage: Option<TestCoverage>,
    /// Change estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_impact: Option<ChangeImpact>,
}

/// One entry of a batch trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRequest {
    /// Entity to trace
    pub entity_id: String,
    /// What to compute
    #[serde(default, rename = "queryType")]
    pub kind: TraceKind,
    /// Chain depth
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_depth() -> usize {
    DEFAULT_TRACE_DEPTH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Upstream,
    Downstream,
}

/// Trace analyses over one graph
#[derive(Debug, Clone, Copy)]
pub struct Tracer<'a> {
    query: GraphQuery<'a>,
    rules: &'a TraceRules,
}

impl<'a> Tracer<'a> {
    /// Tracer over `graph`
    #[must_use]
    pub fn new(graph: &'a GraphData, rules: &'a TraceRules) -> Self {
        Self {
            query: GraphQuery::new(graph),
            rules,
        }
    }

    /// Run one trace
    ///
    /// # Errors
    /// [`OagError::InvalidArgument`] for a depth outside `1..=5`,
    /// [`OagError::ResourceNotFound`] if the entity is absent
    pub fn trace(&self, entity_id: &str, kind: TraceKind, depth: usize, now: DateTime<Utc>) -> Result<TraceReport> {
        check_depth(depth)?;
        let node = self.entity(entity_id)?;
        let mut report = TraceReport {
            query_entity: node.clone(),
            query_type: kind,
            depth,
            timestamp: now,
            upstream_chain: None,
            downstream_chain: Some(self.downstream(entity_id, depth)),
            test_coverage: None,
            change_impact: None,
        };
        match kind {
            TraceKind::FullTrace => {
                report.upstream_chain = Some(self.upstream(entity_id, depth));
                report.test_coverage = Some(self.coverage(entity_id));
            }
            TraceKind::ImpactAnalysis => report.change_impact = Some(self.change_impact(entity_id)),
            TraceKind::DownstreamTasks => {}
        }
        Ok(report)
    }

    /// What `entity_id` derives from, nearest first
    #[must_use]
    pub fn upstream(&self, entity_id: &str, depth: usize) -> Vec<ChainEntry> {
        self.chain(entity_id, depth, Flow::Upstream)
    }

    /// What derives from `entity_id`, nearest first
    #[must_use]
    pub fn downstream(&self, entity_id: &str, depth: usize) -> Vec<ChainEntry> {
        self.chain(entity_id, depth, Flow::Downstream)
    }

    /// Test cases verifying `entity_id` and the issues they found
    #[must_use]
    pub fn coverage(&self, entity_id: &str) -> TestCoverage {
        let rules = self.rules;
        let cases: Vec<&Node> = self
            .query
            .outgoing_edges(entity_id)
            .filter(|e| e.edge_type == rules.verified_by)
            .filter_map(|e| self.query.node(&e.target))
            .collect();

        let status_in = |node: &Node, statuses: &[String]| {
            node.field("status")
                .and_then(Value::as_str)
                .is_some_and(|s| statuses.iter().any(|t| t == s))
        };
        let mut coverage = TestCoverage {
            total_test_cases: cases.len(),
            passed: cases.iter().filter(|c| status_in(**c, &rules.passed_statuses)).count(),
            failed: cases.iter().filter(|c| status_in(**c, &rules.failed_statuses)).count(),
            issues: Vec::new(),
        };
        for case in cases {
            let found = self
                .query
                .outgoing_edges(&case.id)
                .filter(|e| e.edge_type == rules.finds)
                .filter_map(|e| self.query.node(&e.target));
            coverage.issues.extend(found.map(|issue| IssueRef {
                issue_id: issue.id.clone(),
                severity: issue.field("severity").cloned(),
                status: issue.field("status").cloned(),
                description: issue.field("description").cloned(),
            }));
        }
        coverage
    }

    /// Blast radius of changing `entity_id`
    #[must_use]
    pub fn change_impact(&self, entity_id: &str) -> ChangeImpact {
        let rules = self.rules;
        let downstream = self.downstream(entity_id, IMPACT_DEPTH);

        let mut affected: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut owners: Vec<String> = Vec::new();
        let mut effort = 0.0;
        for entry in &downstream {
            let ids = affected.entry(entry.entity_type.clone()).or_default();
            if !ids.contains(&entry.entity_id) {
                ids.push(entry.entity_id.clone());
            }
            for field in &rules.owner_fields {
                if let Some(owner) = entry.data.get(field).and_then(Value::as_str).filter(|o| !o.is_empty()) {
                    if !owners.iter().any(|o| o == owner) {
                        owners.push(owner.to_string());
                    }
                }
            }
            effort += rules
                .effort_fields
                .iter()
                .filter_map(|f| entry.data.get(f).and_then(Value::as_f64))
                .sum::<f64>();
        }

        let count_of = |types: &[String]| -> usize {
            types
                .iter()
                .filter_map(|t| affected.get(t))
                .map(Vec::len)
                .sum()
        };
        let risk_level = if count_of(&rules.critical_types) > 0 {
            RiskLevel::High
        } else if count_of(&rules.requirement_types) > rules.requirement_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        ChangeImpact {
            affected_entities: affected,
            notified_owners: owners,
            risk_level,
            estimated_effort_hours: effort,
            impact_score: downstream.len(),
            recommendation: risk_level.recommendation().to_string(),
        }
    }

    /// Every path from a root down to `entity_id`
    ///
    /// A root is a node of one of the configured root types or a node without
    /// parents. Each path starts at its root and ends at the entity.
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the entity is absent
    pub fn full_paths(&self, entity_id: &str) -> Result<Vec<Vec<PathStep>>> {
        let node = self.entity(entity_id)?;
        let mut paths = Vec::new();
        let mut current = Vec::new();
        self.climb(node, &mut current, &mut paths);
        Ok(paths)
    }

    fn climb(&self, node: &'a Node, current: &mut Vec<&'a Node>, paths: &mut Vec<Vec<PathStep>>) {
        current.push(node);
        let parents: Vec<&'a Node> = if self.rules.root_types.contains(&node.node_type) {
            Vec::new()
        } else {
            self.query
                .incoming_edges(&node.id)
                .filter_map(|e| self.query.node(&e.source))
                .filter(|p| !current.iter().any(|c| c.id == p.id))
                .collect()
        };
        if parents.is_empty() {
            paths.push(current.iter().rev().map(|n| path_step(n)).collect());
        }
        for parent in parents {
            self.climb(parent, current, paths);
        }
        current.pop();
    }

    fn entity(&self, entity_id: &str) -> Result<&'a Node> {
        self.query
            .node(entity_id)
            .ok_or_else(|| OagError::not_found("node", entity_id))
    }

    fn chain(&self, start: &str, depth: usize, flow: Flow) -> Vec<ChainEntry> {
        let mut visited = HashSet::new();
        let mut chain = Vec::new();
        self.walk(start, start, 1, depth, flow, &mut visited, &mut chain);
        chain.sort_by_key(|e| e.level);
        chain
    }

    #[allow(clippy::too_many_arguments)]
    fn walk(
        &self,
        start: &str,
        at: &str,
        level: usize,
        depth: usize,
        flow: Flow,
        visited: &mut HashSet<String>,
        chain: &mut Vec<ChainEntry>,
    ) {
        if level > depth || !visited.insert(at.to_string()) {
            return;
        }
        let hops: Vec<(&Edge, &Node)> = match flow {
            Flow::Upstream => self
                .query
                .incoming_edges(at)
                .filter_map(|e| self.query.node(&e.source).map(|n| (e, n)))
                .collect(),
            Flow::Downstream => self
                .query
                .outgoing_edges(at)
                .filter_map(|e| self.query.node(&e.target).map(|n| (e, n)))
                .collect(),
        };
        for (edge, node) in hops {
            if node.id == start {
                continue;
            }
            chain.push(ChainEntry {
                level,
                entity_type: node.node_type.clone(),
                entity_id: node.id.clone(),
                relation: edge.edge_type.clone(),
                trace_confidence: confidence(edge),
                data: node.data.clone(),
            });
            self.walk(start, &node.id, level + 1, depth, flow, visited, chain);
        }
    }
}

fn check_depth(depth: usize) -> Result<()> {
    if (1..=MAX_TRACE_DEPTH).contains(&depth) {
        Ok(())
    } else {
        Err(OagError::InvalidArgument(format!(
            "trace depth {depth} outside 1..={MAX_TRACE_DEPTH}"
        )))
    }
}

fn confidence(edge: &Edge) -> f64 {
    edge.data
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| *c != 0.0)
        .unwrap_or(1.0)
}

fn path_step(node: &Node) -> PathStep {
    let text = |name: &str| node.field(name).and_then(Value::as_str).filter(|s| !s.is_empty());
    let label = text("title")
        .or_else(|| text("project_name"))
        .or_else(|| Some(node.label.as_str()).filter(|l| !l.is_empty()))
        .unwrap_or(&node.id);
    PathStep {
        id: node.id.clone(),
        node_type: node.node_type.clone(),
        label: label.to_string(),
    }
}

/// Traces against stored instances
#[derive(Debug, Clone)]
pub struct TraceService {
    ctx: Arc<EngineContext>,
    oags: OagService,
}

impl TraceService {
    /// Service over shared collaborators
    #[must_use]
    pub fn new(ctx: Arc<EngineContext>, oags: OagService) -> Self {
        Self { ctx, oags }
    }

    /// Trace one entity of an instance
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance or entity is absent,
    /// [`OagError::InvalidArgument`] for a depth outside `1..=5`
    #[tracing::instrument(skip(self))]
    pub async fn trace(&self, oag_id: &str, entity_id: &str, kind: TraceKind, depth: usize) -> Result<TraceReport> {
        check_depth(depth)?;
        let instance = self.oags.get_oag(oag_id).await?;
        let rules = &self.ctx.config().trace;
        Tracer::new(&instance.data, rules).trace(entity_id, kind, depth, self.ctx.clock().now())
    }

    /// Trace several entities of one instance; failures stay per item
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance is absent
    pub async fn trace_batch(&self, oag_id: &str, requests: &[TraceRequest]) -> Result<Vec<Result<TraceReport>>> {
        let instance = self.oags.get_oag(oag_id).await?;
        let tracer = Tracer::new(&instance.data, &self.ctx.config().trace);
        let now = self.ctx.clock().now();
        let results: Vec<_> = requests
            .iter()
            .map(|r| tracer.trace(&r.entity_id, r.kind, r.depth, now))
            .collect();
        let failed = results.iter().filter(|r| r.is_err()).count();
        tracing::info!(oag = oag_id, total = results.len(), failed, "batch traced");
        Ok(results)
    }

    /// Root-to-entity paths
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance or entity is absent
    pub async fn full_paths(&self, oag_id: &str, entity_id: &str) -> Result<Vec<Vec<PathStep>>> {
        let instance = self.oags.get_oag(oag_id).await?;
        Tracer::new(&instance.data, &self.ctx.config().trace).full_paths(entity_id)
    }

    /// Test coverage of one entity
    ///
    /// # Errors
    /// [`OagError::ResourceNotFound`] if the instance or entity is absent
    pub async fn coverage(&self, oag_id: &str, entity_id: &str) -> Result<TestCoverage> {
        let instance = self.oags.get_oag(oag_id).await?;
        let tracer = Tracer::new(&instance.data, &self.ctx.config().trace);
        tracer.entity(entity_id)?;
        Ok(tracer.coverage(entity_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn node(id: &str, node_type: &str, data: Value) -> Node {
        let Value::Object(data) = data else { unreachable!() };
        Node::new(id, node_type).with_data(data)
    }

    fn edge(source: &str, relation: &str, target: &str) -> Edge {
        Edge::new(format!("{source}-{target}"), source, relation, target)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap()
    }

    /// VP-1 -> FEAT-1 -> SWR-1 -> MOD-1 -> PKG-1, plus tests on SWR-1
    fn graph() -> GraphData {
        GraphData::new(
            vec![
                node("VP-1", "VehicleProject", json!({"project_name": "Sedan 2027"})),
                node("FEAT-1", "Feature", json!({"title": "Lane keeping", "owner": "alice"})),
                node("SWR-1", "SWR", json!({"owner": "bob", "estimated_hours": 12})),
                node("MOD-1", "PerceptionFusion", json!({"PM": "carol", "estimatedHours": 4.5})),
                node("PKG-1", "ReleasePackage", json!({"owner": "bob"})),
                node("TC-1", "TestCase", json!({"status": "PASSED"})),
                node("TC-2", "TestCase", json!({"status": "失败"})),
                node("ISS-1", "Issue", json!({"severity": "major", "status": "open"})),
            ],
            vec![
                edge("VP-1", "has_feature", "FEAT-1"),
                edge("FEAT-1", "refined_to", "SWR-1"),
                edge("SWR-1", "implemented_by", "MOD-1")
                    .with_data(json!({"confidence": 0.8}).as_object().cloned().unwrap_or_default()),
                edge("MOD-1", "released_in", "PKG-1"),
                edge("SWR-1", "verified_by", "TC-1"),
                edge("SWR-1", "verified_by", "TC-2"),
                edge("TC-2", "finds", "ISS-1"),
            ],
        )
    }

    #[test]
    fn chains_stop_at_depth_and_sort_by_level() {
        let graph = graph();
        let rules = TraceRules::default();
        let tracer = Tracer::new(&graph, &rules);

        let down = tracer.downstream("FEAT-1", 2);
        let ids: Vec<_> = down.iter().map(|e| (e.level, e.entity_id.as_str())).collect();
        assert_eq!(ids, [(1, "SWR-1"), (2, "MOD-1"), (2, "TC-1"), (2, "TC-2")]);
        assert_eq!(down[1].trace_confidence, 0.8);
        assert_eq!(down[0].trace_confidence, 1.0);
        assert_eq!(down[0].data["owner"], json!("bob"));

        let up = tracer.upstream("MOD-1", 5);
        let ids: Vec<_> = up.iter().map(|e| e.entity_id.as_str()).collect();
        assert_eq!(ids, ["SWR-1", "FEAT-1", "VP-1"]);
    }

    #[test]
    fn cycles_do_not_loop_or_report_the_start() {
        let graph = GraphData::new(
            vec![node("A", "T", json!({})), node("B", "T", json!({}))],
            vec![edge("A", "r", "B"), edge("B", "r", "A")],
        );
        let rules = TraceRules::default();
        let down = Tracer::new(&graph, &rules).downstream("A", 5);
        assert_eq!(down.len(), 1);
        assert_eq!(down[0].entity_id, "B");
    }

    #[test]
    fn coverage_counts_statuses_and_issues() {
        let graph = graph();
        let rules = TraceRules::default();
        let coverage = Tracer::new(&graph, &rules).coverage("SWR-1");
        assert_eq!(coverage.total_test_cases, 2);
        assert_eq!(coverage.passed, 1);
        assert_eq!(coverage.failed, 1);
        assert_eq!(coverage.issues.len(), 1);
        assert_eq!(coverage.issues[0].issue_id, "ISS-1");
        assert_eq!(coverage.issues[0].severity, Some(json!("major")));
        assert_eq!(coverage.issues[0].description, None);
    }

    #[test]
    fn release_packages_make_changes_high_risk() {
        let graph = graph();
        let rules = TraceRules::default();
        let tracer = Tracer::new(&graph, &rules);

        let impact = tracer.change_impact("FEAT-1");
        assert_eq!(impact.risk_level, RiskLevel::High);
        assert_eq!(impact.affected_entities["ReleasePackage"], ["PKG-1"]);
        assert_eq!(impact.affected_entities["SWR"], ["SWR-1"]);
        assert_eq!(impact.notified_owners, ["bob", "carol"]);
        assert_eq!(impact.estimated_effort_hours, 16.5);
        assert_eq!(impact.impact_score, 6);
        assert_eq!(impact.recommendation, RiskLevel::High.recommendation());

        let leaf = tracer.change_impact("PKG-1");
        assert_eq!(leaf.risk_level, RiskLevel::Low);
        assert_eq!(leaf.impact_score, 0);
    }

    #[test]
    fn many_requirements_make_changes_medium_risk() {
        let mut nodes = vec![node("F", "Feature", json!({}))];
        let mut edges = Vec::new();
        for i in 0..4 {
            nodes.push(node(&format!("SWR-{i}"), "SWR", json!({})));
            edges.push(edge("F", "refined_to", &format!("SWR-{i}")));
        }
        let graph = GraphData::new(nodes, edges);
        let rules = TraceRules::default();
        assert_eq!(Tracer::new(&graph, &rules).change_impact("F").risk_level, RiskLevel::Medium);

        let lenient = TraceRules {
            requirement_threshold: 4,
            ..TraceRules::default()
        };
        assert_eq!(Tracer::new(&graph, &lenient).change_impact("F").risk_level, RiskLevel::Low);
    }

    #[test]
    fn report_sections_follow_kind() {
        let graph = graph();
        let rules = TraceRules::default();
        let tracer = Tracer::new(&graph, &rules);

        let full = tracer.trace("SWR-1", TraceKind::FullTrace, 3, now()).unwrap();
        assert!(full.upstream_chain.is_some() && full.test_coverage.is_some());
        assert!(full.change_impact.is_none());

        let impact = tracer.trace("SWR-1", TraceKind::ImpactAnalysis, 3, now()).unwrap();
        assert!(impact.upstream_chain.is_none() && impact.change_impact.is_some());

        let tasks = tracer.trace("SWR-1", TraceKind::DownstreamTasks, 1, now()).unwrap();
        assert_eq!(tasks.downstream_chain.map(|c| c.len()), Some(3));
        assert!(tasks.test_coverage.is_none());

        let text = serde_json::to_value(&full).unwrap();
        assert_eq!(text["query_type"], json!("full_trace"));
        assert!(text.get("change_impact").is_none());
    }

    #[test]
    fn depth_and_entity_are_checked() {
        let graph = graph();
        let rules = TraceRules::default();
        let tracer = Tracer::new(&graph, &rules);
        for depth in [0, 6] {
            let err = tracer.trace("SWR-1", TraceKind::FullTrace, depth, now()).unwrap_err();
            assert!(matches!(err, OagError::InvalidArgument(_)), "{depth}");
        }
        assert!(tracer
            .trace("NOPE", TraceKind::FullTrace, 3, now())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn paths_run_from_roots_to_entity() {
        let mut graph = graph();
        // a second, parentless origin for SWR-1
        graph.nodes.push(node("REQ-9", "Requirement", json!({"title": "Legacy"})));
        graph.edges.push(edge("REQ-9", "refined_to", "SWR-1"));

        let rules = TraceRules::default();
        let paths = Tracer::new(&graph, &rules).full_paths("MOD-1").unwrap();
        let labels: Vec<Vec<&str>> = paths
            .iter()
            .map(|p| p.iter().map(|s| s.label.as_str()).collect())
            .collect();
        assert_eq!(
            labels,
            [
                vec!["Sedan 2027", "Lane keeping", "SWR-1", "MOD-1"],
                vec!["Legacy", "SWR-1", "MOD-1"],
            ]
        );
    }

    #[test]
    fn kinds_parse_by_name() {
        assert_eq!("impact_analysis".parse::<TraceKind>().unwrap(), TraceKind::ImpactAnalysis);
        assert_eq!("downstream".parse::<TraceKind>().unwrap(), TraceKind::DownstreamTasks);
        assert!("sideways".parse::<TraceKind>().is_err());
    }
}
