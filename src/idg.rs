//! Induced Disease Graph (spec.md §3, §4.4 case 5): the per-disease
//! precomputation that lets the phenotype LR engine answer partial-match
//! queries without re-walking the ontology for every query term.
//!
//! Built lazily per disease and memoized in [`IdgCache`]; a pure function
//! of `(ontology, disease)`, so concurrent callers may race to build the
//! same entry and either result is correct (spec.md §5).

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use dashmap::DashMap;

use crate::constants::PHENOTYPIC_ABNORMALITY_ROOT;
use crate::disease::{Disease, DiseaseId};
use crate::ontology::{Ontology, TermId};

/// Per-disease precomputation used by the phenotype LR engine.
#[derive(Debug, Clone)]
pub struct InducedDiseaseGraph {
    /// Union of `ancestors(d, true)` for every positively annotated term
    /// `d`.
    pub positive_closure: BTreeSet<TermId>,
    /// The disease's explicitly excluded terms.
    pub negative_set: BTreeSet<TermId>,
    /// For every ancestor `a` of some annotated term (`a` itself
    /// included), the most specific annotated term reachable through it
    /// and that term's frequency in this disease.
    pub ancestor_to_closest_annotated: HashMap<TermId, (TermId, f64)>,
}

impl InducedDiseaseGraph {
    /// Builds the IDG for one disease. Unknown terms (annotations that do
    /// not resolve in `ontology`) are skipped; the disease store already
    /// guarantees this cannot happen for a store built via
    /// [`crate::disease::DiseaseStore::build`], but the IDG stays
    /// defensive since it may also be built from ad hoc test data.
    pub fn build(disease: &Disease, ontology: &Ontology) -> Self {
        let mut positive_closure = BTreeSet::new();
        let mut ancestor_to_closest_annotated: HashMap<TermId, (TermId, f64)> = HashMap::new();

        for (term, freq) in &disease.positive {
            let Some(ancestors) = ontology.ancestors(term, true) else {
                continue;
            };
            for ancestor in &ancestors {
                match ancestor_to_closest_annotated.get(ancestor) {
                    Some((_, existing_freq)) if *existing_freq >= *freq => {}
                    _ => {
                        ancestor_to_closest_annotated
                            .insert(ancestor.clone(), (term.clone(), *freq));
                    }
                }
            }
            positive_closure.extend(ancestors);
        }

        let negative_set = disease.negative.iter().cloned().collect();

        Self {
            positive_closure,
            negative_set,
            ancestor_to_closest_annotated,
        }
    }

    /// Whether `term` is explicitly negated by the disease.
    pub fn negates(&self, term: &TermId) -> bool {
        self.negative_set.contains(term)
    }

    /// Whether `term` is directly annotated, or is an ancestor of a
    /// directly annotated term (i.e. the disease is "annotated, directly
    /// or via ancestor closure" to `term`).
    pub fn annotated_via_closure(&self, term: &TermId) -> bool {
        self.positive_closure.contains(term)
    }

    /// Case 5 of spec.md §4.4: the most specific ancestor of `query` that
    /// is also a key of `ancestor_to_closest_annotated`, excluding the
    /// ontology root. "Most specific" is approximated by ancestor-set
    /// size, which is monotone with ontology depth.
    pub fn closest_non_root_common_ancestor(
        &self,
        query: &TermId,
        ontology: &Ontology,
    ) -> Option<(TermId, TermId, f64)> {
        let root = TermId::from(PHENOTYPIC_ABNORMALITY_ROOT);
        let query_ancestors = ontology.ancestors(query, true)?;

        query_ancestors
            .iter()
            .filter(|a| **a != root)
            .filter_map(|a| {
                self.ancestor_to_closest_annotated
                    .get(a)
                    .map(|(annotated, freq)| {
                        let specificity = ontology.ancestors(a, true).map(|s| s.len()).unwrap_or(0);
                        (specificity, a.clone(), annotated.clone(), *freq)
                    })
            })
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
            .map(|(_, a, annotated, freq)| (a, annotated, freq))
    }
}

/// Concurrent insert-once cache of IDGs, keyed by disease id. Idempotent
/// build: if two threads race to build the same entry, either result is
/// kept (pure function of inputs, spec.md §5).
#[derive(Default)]
pub struct IdgCache {
    entries: DashMap<DiseaseId, Arc<InducedDiseaseGraph>>,
}

impl IdgCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&self, disease: &Disease, ontology: &Ontology) -> Arc<InducedDiseaseGraph> {
        if let Some(existing) = self.entries.get(&disease.id) {
            return Arc::clone(&existing);
        }
        let built = Arc::new(InducedDiseaseGraph::build(disease, ontology));
        self.entries.insert(disease.id.clone(), Arc::clone(&built));
        built
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
