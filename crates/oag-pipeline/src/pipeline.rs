//! End-to-end graph assembly
//!
//! raw records → nodes → inferred edges → synthesized edge properties

use crate::assemble::{NodeAssembler, SkippedRecord};
use crate::classifier::Classifier;
use crate::inference::EdgeInference;
use crate::synthesizer::{AuthoritativeEdges, EdgePropertySynthesizer};
use chrono::NaiveDate;
use oag_model::{GraphData, Node, PropertyMap, SchemaDefinition};
use std::collections::HashMap;

/// Graph built from a record batch, with everything that was set aside
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledGraph {
    /// Nodes and edges
    pub data: GraphData,
    /// Records that produced no node
    pub skipped: Vec<SkippedRecord>,
    /// Ids of edges referencing nodes outside the batch
    pub unresolved: Vec<String>,
}

/// Classifier, inference and synthesizer wired together
#[derive(Debug, Clone)]
pub struct GraphAssembler {
    nodes: NodeAssembler,
    inference: EdgeInference,
    synthesizer: EdgePropertySynthesizer,
}

impl GraphAssembler {
    /// Assembler with the standard tables, stamping dates with `today`
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            nodes: NodeAssembler::new(Classifier::with_defaults()),
            inference: EdgeInference::with_defaults(),
            synthesizer: EdgePropertySynthesizer::new(today),
        }
    }

    /// Replace the classification table
    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.nodes = NodeAssembler::new(classifier);
        self
    }

    /// Replace the inference catalog
    #[must_use]
    pub fn with_inference(mut self, inference: EdgeInference) -> Self {
        self.inference = inference;
        self
    }

    /// Run the pipeline over `records`
    ///
    /// Never fails: unclassifiable records are reported in `skipped`, edges to
    /// unknown nodes in `unresolved`, and every declared edge property is filled.
    pub fn assemble(
        &self,
        records: &[PropertyMap],
        schema: &SchemaDefinition,
        authoritative: Option<&AuthoritativeEdges>,
        hint: Option<&str>,
    ) -> AssembledGraph {
        let assembled = self.nodes.assemble(records, schema, hint);
        let inferred = self.inference.infer(&assembled.nodes);

        let by_id: HashMap<&str, &Node> = assembled.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        let edges = inferred
            .edges
            .into_iter()
            .map(|mut edge| {
                let source = by_id
                    .get(edge.source.as_str())
                    .map_or_else(|| Node::new(edge.source.as_str(), ""), |n| (*n).clone());
                let target = by_id
                    .get(edge.target.as_str())
                    .map_or_else(|| Node::new(edge.target.as_str(), ""), |n| (*n).clone());
                let prior = authoritative.and_then(|a| a.lookup(&edge.source, &edge.edge_type, &edge.target));
                edge.data = self
                    .synthesizer
                    .synthesize(schema, &source, &edge.edge_type, &target, prior);
                edge
            })
            .collect();

        let data = GraphData::new(assembled.nodes, edges);
        tracing::info!(
            nodes = data.nodes.len(),
            edges = data.edges.len(),
            skipped = assembled.skipped.len(),
            unresolved = inferred.unresolved.len(),
            "graph assembled"
        );
        AssembledGraph {
            data,
            skipped: assembled.skipped,
            unresolved: inferred.unresolved,
        }
    }
}
