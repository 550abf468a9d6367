//! Node assembly from raw records
//!
//! Classifies each record, keeps those whose type the schema declares, and
//! reports every dropped record with the reason it was dropped.

use crate::classifier::{Classification, Classifier, UnclassifiedReason};
use crate::fields::non_empty_str;
use oag_model::{Node, PropertyMap, SchemaDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fields consulted, in order, for a node's display label
const LABEL_FIELDS: [&str; 4] = ["name", "title", "code", "id"];

/// Why a record produced no node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SkipReason {
    /// Classifier could not determine a type
    Unclassified {
        /// Classifier explanation
        cause: UnclassifiedReason,
    },
    /// Classified type is not declared by the schema
    TypeNotInSchema {
        /// The classified type
        entity_type: String,
    },
    /// An earlier record already used this id
    DuplicateId,
}

/// A record that produced no node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    /// Position in the input
    pub index: usize,
    /// Record id, when it had one
    pub id: Option<String>,
    /// Why it was dropped
    pub reason: SkipReason,
}

/// Nodes built from a record batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledNodes {
    /// Accepted nodes, in input order
    pub nodes: Vec<Node>,
    /// Dropped records, in input order
    pub skipped: Vec<SkippedRecord>,
}

/// Display label for a record
#[must_use]
pub fn derive_label(record: &PropertyMap) -> String {
    LABEL_FIELDS
        .iter()
        .find_map(|f| non_empty_str(record, f))
        .unwrap_or_default()
        .to_string()
}

/// Builds schema-conformant nodes from raw records
#[derive(Debug, Clone, Default)]
pub struct NodeAssembler {
    classifier: Classifier,
}

impl NodeAssembler {
    /// Assembler over a classification table
    #[inline]
    #[must_use]
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Classification table in use
    #[inline]
    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Build nodes from `records`
    ///
    /// `hint` names a type to use for records the table cannot classify.
    #[must_use]
    pub fn assemble(
        &self,
        records: &[PropertyMap],
        schema: &SchemaDefinition,
        hint: Option<&str>,
    ) -> AssembledNodes {
        let mut out = AssembledNodes::default();
        let mut seen: HashSet<&str> = HashSet::new();

        for (index, record) in records.iter().enumerate() {
            let id = non_empty_str(record, "id");
            let skip = |reason| SkippedRecord {
                index,
                id: id.map(str::to_string),
                reason,
            };

            let entity_type = match self.classifier.classify_with_hint(record, hint) {
                Classification::Classified(code) => code,
                Classification::Unclassified(cause) => {
                    tracing::debug!(index, id = ?id, ?cause, "record unclassified");
                    out.skipped.push(skip(SkipReason::Unclassified { cause }));
                    continue;
                }
            };
            if schema.entity_type(&entity_type).is_none() {
                tracing::debug!(index, id = ?id, %entity_type, "type not declared by schema");
                out.skipped.push(skip(SkipReason::TypeNotInSchema { entity_type }));
                continue;
            }
            let Some(id) = id else { continue };
            if !seen.insert(id) {
                tracing::warn!(index, id, "duplicate record id");
                out.skipped.push(skip(SkipReason::DuplicateId));
                continue;
            }

            out.nodes.push(Node {
                id: id.to_string(),
                node_type: entity_type,
                label: derive_label(record),
                data: record.clone(),
            });
        }

        if !out.skipped.is_empty() {
            tracing::info!(
                accepted = out.nodes.len(),
                skipped = out.skipped.len(),
                "records skipped during node assembly"
            );
        }
        out
    }
}
