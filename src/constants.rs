//! Normative constants for the likelihood-ratio computation.
//!
//! Every value here is fixed by the specification; the engine does not
//! learn or tune any of them.

/// Floor applied to background frequency on read.
pub const DEFAULT_BACKGROUND_PROB: f64 = 1e-4;

/// Fallback LR when a query term shares no organ-system ancestor with a
/// disease's annotations.
pub const DEFAULT_FALSE_POSITIVE_NO_COMMON_ORGAN_PROBABILITY: f64 = 0.01;

/// LR when a query term is present but the disease explicitly excludes it.
pub const EXCLUDED_IN_DISEASE_BUT_PRESENT_IN_QUERY_PROBABILITY: f64 = 1e-3;

/// LR when a query term is excluded and the disease also explicitly excludes it.
pub const EXCLUDED_IN_DISEASE_AND_EXCLUDED_IN_QUERY_PROBABILITY: f64 = 1e3;

/// Minimum "excluded frequency" used when computing the LR for an excluded
/// term that the disease otherwise annotates.
pub const FALSE_NEGATIVE_OBSERVATION_PROB: f64 = 0.01;

/// LR contributed by each ClinVar-pathogenic variant (multiplicative).
pub const CLINVAR_PATH_LR: f64 = 1000.0;

/// Heuristic genotype LR floor, autosomal dominant.
pub const HEURISTIC_LOW_PATH_LR_AD: f64 = 0.05;

/// Heuristic genotype LR floor, autosomal recessive (= 0.05^2).
pub const HEURISTIC_LOW_PATH_LR_AR: f64 = 0.0025;

/// Lower clamp applied to every genotype LR.
pub const LR_CLAMP_EPS: f64 = 1e-10;

/// Parameters of `noCommonOrganProbability` (spec.md §4.4).
pub const NO_COMMON_ORGAN_MIN: f64 = 0.002;
pub const NO_COMMON_ORGAN_MAX: f64 = 0.10;
pub const NO_COMMON_ORGAN_DEFAULT: f64 = 0.01;

/// Upper bound assumed for any raw annotation frequency; used only to
/// derive the clamp range of `noCommonOrganProbability`.
pub const MAX_REASONABLE_FREQUENCY: f64 = 1.0;

/// Background frequency threshold above which an excluded-term LR
/// computation is considered numerically unusual (spec.md §4.5 case 2).
pub const UNUSUAL_BACKGROUND_THRESHOLD: f64 = 0.99;

/// Ontology root used to stop the "non-root common ancestor" search
/// (spec.md §4.4 case 5, GLOSSARY).
pub const PHENOTYPIC_ABNORMALITY_ROOT: &str = "HP:0000118";
