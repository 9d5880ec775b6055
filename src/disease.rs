//! Disease Store (spec.md §4.2): an immutable mapping from disease id to
//! its positive/negative annotations and inheritance modes, built once at
//! startup and never mutated.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::err::ConfigurationError;
use crate::ontology::{Ontology, TermId};

/// Disease identifier, e.g. `OMIM:154700`. Cheap to clone and hash.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DiseaseId(Arc<str>);

impl<S: AsRef<str>> From<S> for DiseaseId {
    fn from(s: S) -> Self {
        DiseaseId(Arc::from(s.as_ref()))
    }
}

impl std::fmt::Display for DiseaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl DiseaseId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id's namespace prefix, e.g. `OMIM` for `OMIM:154700`.
    pub fn prefix(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

/// One disease record as supplied by a collaborator, before deduplication
/// and the default-frequency rule are applied (spec.md §4.2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiseaseInput {
    pub id: DiseaseId,
    pub name: String,
    /// `(term, frequency)`; frequency `None` defaults to `1.0`.
    pub positive: Vec<(TermId, Option<f64>)>,
    #[serde(default)]
    pub negative: Vec<TermId>,
    #[serde(default)]
    pub inheritance_modes: Vec<TermId>,
}

/// An immutable disease record: positive annotations keep their order (for
/// reporting) but duplicates are collapsed to the maximum frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct Disease {
    pub id: DiseaseId,
    pub name: String,
    pub positive: Vec<(TermId, f64)>,
    pub negative: std::collections::HashSet<TermId>,
    pub inheritance_modes: std::collections::HashSet<TermId>,
}

impl Disease {
    /// Frequency of a direct positive annotation, if any.
    pub fn frequency_of(&self, term: &TermId) -> Option<f64> {
        self.positive
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, f)| *f)
    }

    pub fn is_annotated_to(&self, term: &TermId) -> bool {
        self.positive.iter().any(|(t, _)| t == term)
    }
}

/// Which disease-id prefixes are retained from collaborator input
/// (spec.md §4.2: "only diseases whose id prefix ∈ {OMIM, DECIPHER, ORPHA}
/// are retained (configurable; orphanet opt-in)").
#[derive(Clone, Debug)]
pub struct DiseaseStoreConfig {
    pub allowed_prefixes: Vec<String>,
}

impl Default for DiseaseStoreConfig {
    fn default() -> Self {
        Self {
            allowed_prefixes: vec!["OMIM".into(), "DECIPHER".into()],
        }
    }
}

impl DiseaseStoreConfig {
    /// Opts Orphanet diseases into the store, per spec.md §4.2.
    pub fn with_orphanet(mut self) -> Self {
        if !self.allowed_prefixes.iter().any(|p| p == "ORPHA") {
            self.allowed_prefixes.push("ORPHA".into());
        }
        self
    }
}

/// Immutable mapping from disease id to disease record (spec.md §4.2).
#[derive(Debug)]
pub struct DiseaseStore {
    diseases: Vec<Disease>,
    index: HashMap<DiseaseId, usize>,
}

impl DiseaseStore {
    /// Builds the store from collaborator input, applying the prefix
    /// allowlist, the default-frequency rule, and duplicate collapsing.
    /// Validates every annotated term resolves in `ontology`.
    pub fn build(
        inputs: Vec<DiseaseInput>,
        ontology: &Ontology,
        config: &DiseaseStoreConfig,
    ) -> Result<Self, ConfigurationError> {
        let mut diseases = Vec::new();

        for input in inputs {
            if !config
                .allowed_prefixes
                .iter()
                .any(|p| p.as_str() == input.id.prefix())
            {
                continue;
            }

            let mut positive: Vec<(TermId, f64)> = Vec::new();
            for (term, freq) in input.positive {
                if ontology.primary_id(&term).is_none() {
                    return Err(ConfigurationError::InconsistentDiseaseAnnotation(
                        input.id.clone(),
                        term.to_string(),
                    ));
                }
                let freq = freq.unwrap_or(1.0);
                if let Some(existing) = positive.iter_mut().find(|(t, _)| *t == term) {
                    if freq > existing.1 {
                        existing.1 = freq;
                    }
                } else {
                    positive.push((term, freq));
                }
            }

            let negative = input.negative.into_iter().collect();
            let inheritance_modes = input.inheritance_modes.into_iter().collect();

            diseases.push(Disease {
                id: input.id,
                name: input.name,
                positive,
                negative,
                inheritance_modes,
            });
        }

        if diseases.is_empty() {
            return Err(ConfigurationError::EmptyDiseaseStore);
        }

        let index = diseases
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();

        Ok(Self { diseases, index })
    }

    pub fn get(&self, id: &DiseaseId) -> Option<&Disease> {
        self.index.get(id).map(|&i| &self.diseases[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Disease> {
        self.diseases.iter()
    }

    pub fn len(&self) -> usize {
        self.diseases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diseases.is_empty()
    }
}
