//! Genotype LR Engine (spec.md §4.6): a pathogenic-variant-count Poisson
//! model against a per-gene background rate, with a ClinVar short-circuit
//! and a heuristic floor for high-background genes (e.g. HLA-B) where
//! absence of predicted-pathogenic variants must not be rewarded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

use crate::constants::{CLINVAR_PATH_LR, HEURISTIC_LOW_PATH_LR_AD, HEURISTIC_LOW_PATH_LR_AR, LR_CLAMP_EPS};
use crate::disease::Disease;
use crate::ontology::TermId;

/// Real HPO inheritance-mode term ids, used to classify a disease's
/// `inheritance_modes` set.
pub const AUTOSOMAL_DOMINANT_TERM: &str = "HP:0000006";
pub const AUTOSOMAL_RECESSIVE_TERM: &str = "HP:0000007";

/// Disease inheritance mode, as derived from its annotated inheritance
/// terms (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InheritanceMode {
    AutosomalDominant,
    AutosomalRecessive,
    Unspecified,
}

impl InheritanceMode {
    /// Classifies a disease's inheritance mode. When both dominant and
    /// recessive terms are annotated (unusual, but possible for a
    /// disease with variable inheritance), dominant takes precedence,
    /// since it yields the more conservative (lower) background lambda --
    /// an explicit choice recorded in `DESIGN.md`.
    pub fn of(disease: &Disease) -> Self {
        let dominant = TermId::from(AUTOSOMAL_DOMINANT_TERM);
        let recessive = TermId::from(AUTOSOMAL_RECESSIVE_TERM);
        if disease.inheritance_modes.contains(&dominant) {
            InheritanceMode::AutosomalDominant
        } else if disease.inheritance_modes.contains(&recessive) {
            InheritanceMode::AutosomalRecessive
        } else {
            InheritanceMode::Unspecified
        }
    }

    fn lambda_disease(self) -> f64 {
        match self {
            InheritanceMode::AutosomalDominant | InheritanceMode::Unspecified => 1.0,
            InheritanceMode::AutosomalRecessive => 2.0,
        }
    }

    fn heuristic_floor(self) -> f64 {
        match self {
            InheritanceMode::AutosomalRecessive => HEURISTIC_LOW_PATH_LR_AR,
            InheritanceMode::AutosomalDominant | InheritanceMode::Unspecified => HEURISTIC_LOW_PATH_LR_AD,
        }
    }
}

/// Observed genotype evidence for one gene in one patient (spec.md §6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenotypeObservation {
    #[serde(default)]
    pub clinvar_pathogenic_count: u32,
    #[serde(default)]
    pub sum_path_bin_score: f64,
}

/// `gene_id -> background pathogenicity rate`, supplied by a collaborator.
pub type GeneBackgroundRate = HashMap<String, f64>;

/// `disease_id -> candidate gene ids`, supplied by a collaborator.
pub type DiseaseGeneMap = HashMap<crate::disease::DiseaseId, Vec<String>>;

/// `gene_id -> observed genotype summary`, supplied by a collaborator.
pub type GenotypeObservationMap = HashMap<String, GenotypeObservation>;

/// Continuous (gamma-based) Poisson pmf, evaluated for non-integer `x` via
/// `ln_gamma`, with a clamp against non-finite results from degenerate
/// inputs.
fn poisson_pmf(x: f64, lambda: f64) -> f64 {
    let lambda = lambda.max(LR_CLAMP_EPS);
    let x = x.max(0.0);
    let ln_pmf = x * lambda.ln() - lambda - ln_gamma(x + 1.0);
    let pmf = ln_pmf.exp();
    if pmf.is_finite() {
        pmf
    } else {
        LR_CLAMP_EPS
    }
}

/// Genotype LR for one gene (spec.md §4.6).
pub fn genotype_lr(
    observation: &GenotypeObservation,
    inheritance: InheritanceMode,
    lambda_background: f64,
) -> f64 {
    if observation.clinvar_pathogenic_count >= 1 {
        return CLINVAR_PATH_LR.powi(observation.clinvar_pathogenic_count as i32);
    }

    let lambda_disease = inheritance.lambda_disease();
    let x = observation.sum_path_bin_score.max(0.0);

    if x < 1e-9 && lambda_background > lambda_disease {
        return inheritance.heuristic_floor();
    }

    let lr = poisson_pmf(x, lambda_disease) / poisson_pmf(x, lambda_background);
    lr.max(LR_CLAMP_EPS)
}

/// Collects the collaborator-supplied gene maps needed to score a
/// disease's genotype evidence, and exposes the per-disease scoring used
/// by the case evaluator (spec.md §4.7: "max over g in genes(D)").
pub struct GenotypeLrEngine<'a> {
    pub gene_background_rate: &'a GeneBackgroundRate,
    pub disease_genes: &'a DiseaseGeneMap,
    pub gene_observations: &'a GenotypeObservationMap,
}

impl<'a> GenotypeLrEngine<'a> {
    pub fn new(
        gene_background_rate: &'a GeneBackgroundRate,
        disease_genes: &'a DiseaseGeneMap,
        gene_observations: &'a GenotypeObservationMap,
    ) -> Self {
        Self {
            gene_background_rate,
            disease_genes,
            gene_observations,
        }
    }

    /// `None` if the disease has no associated genes or no genotype
    /// evidence was supplied for any of them.
    pub fn lr_for_disease(&self, disease: &Disease) -> Option<f64> {
        let genes = self.disease_genes.get(&disease.id)?;
        let inheritance = InheritanceMode::of(disease);

        genes
            .iter()
            .filter_map(|gene| {
                let observation = self.gene_observations.get(gene)?;
                let lambda_background = self.gene_background_rate.get(gene).copied().unwrap_or(0.0);
                Some(genotype_lr(observation, inheritance, lambda_background))
            })
            .fold(None, |max, lr| match max {
                None => Some(lr),
                Some(current) if lr > current => Some(lr),
                Some(current) => Some(current),
            })
    }
}
