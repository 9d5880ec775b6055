//! Error kinds for the engine (spec.md §7).
//!
//! `ConfigurationError` is fatal and only ever raised during construction.
//! Per-query problems (`UnknownTermError`) never abort a case; they are
//! recorded in [`EvaluationErrors`] and the offending term is dropped from
//! the computation.

use crate::disease::DiseaseId;

/// Fatal at construction: the engine refuses to build from inconsistent or
/// empty collaborator input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("ontology contains no terms")]
    EmptyOntology,
    #[error("disease store contains no diseases")]
    EmptyDiseaseStore,
    #[error("disease {0} annotated to unknown term {1}")]
    InconsistentDiseaseAnnotation(DiseaseId, String),
    #[error("ontology edge references unknown term {0}")]
    UnknownEdgeTerm(String),
}

/// Raised when the evaluator observes its cancellation token set between
/// diseases. Partial results are discarded by the caller.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("evaluation was cancelled")]
pub struct CancelledError;

/// One non-fatal problem encountered while evaluating a case: a query or
/// observed term that does not resolve in the ontology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTermError {
    /// The disease being evaluated when the problem was found, if any.
    pub disease_id: Option<DiseaseId>,
    /// The raw term string that failed to resolve.
    pub term: String,
}

/// Collects non-fatal problems across an evaluation run. Never aborts the
/// run; callers inspect it after `Evaluator::build` returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationErrors {
    pub unknown_terms: Vec<UnknownTermError>,
}

impl EvaluationErrors {
    pub fn is_empty(&self) -> bool {
        self.unknown_terms.is_empty()
    }

    pub fn push_unknown_term(&mut self, disease_id: Option<DiseaseId>, term: impl Into<String>) {
        self.unknown_terms.push(UnknownTermError {
            disease_id,
            term: term.into(),
        });
    }
}
