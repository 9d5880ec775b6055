//! Case Evaluator (spec.md §4.7): fuses phenotype and genotype LRs across
//! every disease in the store, converts pretest to posttest probability,
//! and produces a [`RankedResults`]. `par_iter()` fans the outer loop over
//! diseases out across a worker pool, exactly as the teacher's
//! `pheno::prepare::run_simulation` fans out over genes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::background::BackgroundFrequencyTable;
use crate::disease::{Disease, DiseaseId, DiseaseStore};
use crate::err::{CancelledError, EvaluationErrors};
use crate::genotype::GenotypeLrEngine;
use crate::idg::IdgCache;
use crate::lr::{phenotype_lr, phenotype_lr_excluded};
use crate::ontology::{Ontology, TermId};
use crate::result::{RankedResults, TestResult};

/// A patient's observed and explicitly excluded phenotype terms. Order is
/// preserved only for reporting (spec.md §3 `HpoCase`).
#[derive(Debug, Clone, Default)]
pub struct HpoCase {
    pub observed: Vec<TermId>,
    pub excluded: Vec<TermId>,
}

/// A cooperative cancellation signal checked between diseases (spec.md
/// §5). Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-disease pretest probabilities. Defaults to uniform `1/|diseases|`
/// (spec.md §4.7) when not supplied.
pub fn uniform_pretest(diseases: &DiseaseStore) -> HashMap<DiseaseId, f64> {
    let p = 1.0 / diseases.len() as f64;
    diseases.iter().map(|d| (d.id.clone(), p)).collect()
}

/// Builds [`RankedResults`] for one `HpoCase` against every disease in the
/// store (spec.md §4.7). `genotype` is optional: when absent, composite LR
/// is phenotype-only.
///
/// Unknown query terms are recorded in the returned [`EvaluationErrors`]
/// and dropped from the per-disease product rather than aborting the run
/// (spec.md §7).
pub fn evaluate(
    case: &HpoCase,
    diseases: &DiseaseStore,
    ontology: &Ontology,
    background: &BackgroundFrequencyTable,
    idg_cache: &IdgCache,
    genotype: Option<&GenotypeLrEngine>,
    pretest: &HashMap<DiseaseId, f64>,
    cancellation: &CancellationToken,
) -> Result<(RankedResults, EvaluationErrors), CancelledError> {
    let mut errors = EvaluationErrors::default();
    for term in case.observed.iter().chain(case.excluded.iter()) {
        if !ontology.contains(term) {
            errors.push_unknown_term(None, term.as_str());
        }
    }

    let disease_list: Vec<&Disease> = diseases.iter().collect();
    let results: Vec<Option<TestResult>> = disease_list
        .par_iter()
        .map(|disease| {
            if cancellation.is_cancelled() {
                return None;
            }
            Some(evaluate_one(
                case, disease, ontology, background, idg_cache, genotype, pretest,
            ))
        })
        .collect();

    if cancellation.is_cancelled() {
        return Err(CancelledError);
    }

    let results: Vec<TestResult> = results.into_iter().flatten().collect();
    Ok((RankedResults::new(results), errors))
}

fn evaluate_one(
    case: &HpoCase,
    disease: &Disease,
    ontology: &Ontology,
    background: &BackgroundFrequencyTable,
    idg_cache: &IdgCache,
    genotype: Option<&GenotypeLrEngine>,
    pretest: &HashMap<DiseaseId, f64>,
) -> TestResult {
    let idg = idg_cache.get_or_build(disease, ontology);

    let per_observed_lrs: Vec<_> = case
        .observed
        .iter()
        .filter_map(|q| phenotype_lr(q, disease, &idg, ontology, background))
        .collect();
    let per_excluded_lrs: Vec<_> = case
        .excluded
        .iter()
        .filter_map(|q| phenotype_lr_excluded(q, disease, &idg, ontology, background))
        .collect();

    let mut composite = 1.0_f64;
    for lr in per_observed_lrs.iter().chain(per_excluded_lrs.iter()) {
        composite *= lr.lr;
    }

    let genotype_lr = genotype.and_then(|g| g.lr_for_disease(disease));
    if let Some(g_lr) = genotype_lr {
        composite *= g_lr;
    }

    let pretest_prob = pretest.get(&disease.id).copied().unwrap_or(1.0 / 2.0);
    let pretest_odds = pretest_prob / (1.0 - pretest_prob);
    let posttest_odds = pretest_odds * composite;
    let posttest_prob = posttest_odds / (1.0 + posttest_odds);

    TestResult {
        disease_id: disease.id.clone(),
        disease_name: disease.name.clone(),
        pretest_prob,
        per_observed_lrs,
        per_excluded_lrs,
        genotype_lr,
        composite_lr: composite,
        posttest_prob,
    }
}
