//! Background Frequency Table (spec.md §4.3): built once by propagating
//! every disease's positive annotations up the ontology, then averaged
//! across the corpus. Read-time access applies a fixed floor.

use std::collections::HashMap;

use crate::constants::DEFAULT_BACKGROUND_PROB;
use crate::disease::DiseaseStore;
use crate::ontology::{Ontology, TermId};

/// `term_id -> background frequency`, computed once from the disease
/// store and ontology. Immutable after construction.
#[derive(Debug, Clone)]
pub struct BackgroundFrequencyTable {
    frequencies: HashMap<TermId, f64>,
}

impl BackgroundFrequencyTable {
    /// Builds the table per spec.md §4.3: for each disease, take the max
    /// frequency contributed to each ancestor by that disease's own
    /// annotations (preventing double-counting sibling annotations within
    /// one disease), sum across diseases, then divide by the disease
    /// count.
    pub fn build(diseases: &DiseaseStore, ontology: &Ontology) -> Self {
        let n = diseases.len() as f64;
        let mut sums: HashMap<TermId, f64> = HashMap::new();

        for disease in diseases.iter() {
            let mut update: HashMap<TermId, f64> = HashMap::new();
            for (term, freq) in &disease.positive {
                let Some(primary) = ontology.primary_id(term) else {
                    continue;
                };
                let Some(ancestors) = ontology.ancestors(&primary, true) else {
                    continue;
                };
                for ancestor in ancestors {
                    let entry = update.entry(ancestor).or_insert(0.0);
                    if *freq > *entry {
                        *entry = *freq;
                    }
                }
            }
            for (term, contribution) in update {
                *sums.entry(term).or_insert(0.0) += contribution;
            }
        }

        let frequencies = sums
            .into_iter()
            .map(|(term, sum)| (term, sum / n))
            .collect();

        Self { frequencies }
    }

    /// `background(t)`, floored at [`DEFAULT_BACKGROUND_PROB`].
    pub fn get(&self, term: &TermId) -> f64 {
        self.frequencies
            .get(term)
            .copied()
            .unwrap_or(DEFAULT_BACKGROUND_PROB)
            .max(DEFAULT_BACKGROUND_PROB)
    }

    /// The raw (unfloored) frequency, used by `noCommonOrganProbability`
    /// (spec.md §4.4), which needs the value before the read-time floor.
    pub fn get_raw(&self, term: &TermId) -> Option<f64> {
        self.frequencies.get(term).copied()
    }

    /// Constructs a table directly from raw frequencies, bypassing
    /// `build`. Used by tests in other modules that need exact, hand-picked
    /// background values to reproduce spec.md's worked examples.
    #[cfg(test)]
    pub(crate) fn from_raw(frequencies: HashMap<TermId, f64>) -> Self {
        Self { frequencies }
    }
}
