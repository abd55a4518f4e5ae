//! Family-Relationship Resolver
//!
//! Turns relationship edges into comma-joined name lists on each person's
//! record. One resolver serves any store implementing `FamilyTarget`; the
//! cycle runs it against the canonical store and then against staging.

use crate::models::FamilyFields;
use crate::types::{CanonicalStore, FamilyTarget, RelationshipStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use watchlist_common::{FamilyEdge, Result};

const CHILD_LABEL: &str = "Child/Parent";
const PARENT_LABEL: &str = "Parent/Child";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FamilyReport {
    /// Persons with at least one resolvable edge
    pub persons: usize,
    /// Persons whose record was found and updated
    pub updated: usize,
    /// Edges skipped because the counterpart name is unknown
    pub unresolved_edges: usize,
}

#[derive(Default)]
struct Lists {
    spouse: Vec<String>,
    children: Vec<String>,
    parents: Vec<String>,
    relative: Vec<String>,
}

impl Lists {
    fn into_fields(self) -> FamilyFields {
        let join = |names: Vec<String>| {
            if names.is_empty() {
                None
            } else {
                Some(names.join(", "))
            }
        };
        FamilyFields {
            spouse: join(self.spouse),
            children: join(self.children),
            parents: join(self.parents),
            relative: join(self.relative),
        }
    }
}

/// Group edges into per-person field values
///
/// Edges whose counterpart is missing from `names` are dropped. Persons with
/// no remaining edges do not appear in the result.
pub fn build_family_fields(
    edges: &[FamilyEdge],
    names: &HashMap<String, String>,
) -> (BTreeMap<String, FamilyFields>, usize) {
    let mut lists: BTreeMap<String, Lists> = BTreeMap::new();
    let mut unresolved = 0;

    for edge in edges {
        let Some(name) = names.get(&edge.relative_id) else {
            unresolved += 1;
            continue;
        };
        let entry = lists.entry(edge.person_id.clone()).or_default();
        let label = edge.relationship.as_deref().unwrap_or("");

        if label.to_lowercase().contains("spouse") {
            entry.spouse.push(name.clone());
        } else if label == CHILD_LABEL {
            entry.children.push(name.clone());
        } else if label == PARENT_LABEL {
            entry.parents.push(name.clone());
        } else {
            entry.relative.push(name.clone());
        }
    }

    let fields = lists
        .into_iter()
        .map(|(person, lists)| (person, lists.into_fields()))
        .collect();
    (fields, unresolved)
}

/// Write resolved lists onto `target`; records absent from the target are skipped
pub async fn apply_family(
    target: &dyn FamilyTarget,
    edges: &[FamilyEdge],
    names: &HashMap<String, String>,
) -> Result<FamilyReport> {
    let (fields, unresolved_edges) = build_family_fields(edges, names);
    let mut report = FamilyReport {
        persons: fields.len(),
        unresolved_edges,
        ..Default::default()
    };

    for (person_id, person_fields) in &fields {
        if target.apply_family(person_id, person_fields).await? {
            report.updated += 1;
        }
    }

    tracing::info!(
        target = target.label(),
        persons = report.persons,
        updated = report.updated,
        unresolved_edges = report.unresolved_edges,
        "Family relationships resolved"
    );
    Ok(report)
}

/// Loads edges and counterpart names once, then applies them to each target
pub struct FamilyResolver {
    relationships: Arc<dyn RelationshipStore>,
    canonical: Arc<dyn CanonicalStore>,
}

impl FamilyResolver {
    pub fn new(relationships: Arc<dyn RelationshipStore>, canonical: Arc<dyn CanonicalStore>) -> Self {
        Self {
            relationships,
            canonical,
        }
    }

    pub async fn resolve(&self, targets: &[&dyn FamilyTarget]) -> Result<Vec<FamilyReport>> {
        let edges = self.relationships.edges().await?;
        if edges.is_empty() {
            tracing::debug!("No relationship edges, skipping family resolution");
            return Ok(vec![FamilyReport::default(); targets.len()]);
        }
        let names = self.canonical.name_index().await?;

        let mut reports = Vec::with_capacity(targets.len());
        for target in targets {
            reports.push(apply_family(*target, &edges, &names).await?);
        }
        Ok(reports)
    }
}
