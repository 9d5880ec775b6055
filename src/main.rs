//! Lirical: likelihood-ratio differential diagnosis for rare Mendelian
//! disease. A thin CLI over the core engine; all file I/O and JSON
//! deserialization happens here, never inside the core (spec.md §5).

pub mod background;
pub mod common;
pub mod constants;
pub mod disease;
pub mod err;
pub mod evaluate;
pub mod genotype;
pub mod idg;
pub mod lr;
pub mod ontology;
pub mod result;

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use clap::{Args as ClapArgs, Parser, Subcommand};
use console::Term;
use serde::Deserialize;

use background::BackgroundFrequencyTable;
use disease::{DiseaseInput, DiseaseStore, DiseaseStoreConfig};
use evaluate::{evaluate, uniform_pretest, CancellationToken, HpoCase};
use genotype::{DiseaseGeneMap, GeneBackgroundRate, GenotypeLrEngine, GenotypeObservationMap};
use idg::IdgCache;
use ontology::{Ontology, OntologyBuilder, OntologyInput, TermId};

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Likelihood-ratio differential diagnosis for rare Mendelian disease",
    long_about = "Ranks candidate diseases against a patient's observed and excluded \
                   phenotype terms, and optional genotype evidence."
)]
struct Cli {
    /// Commonly used arguments.
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run.
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rank diseases for one patient case.
    Query(QueryArgs),
}

/// Patient case as supplied on disk: term ids only, resolved against the
/// ontology at load time (spec.md §3 `HpoCase`).
#[derive(Debug, Deserialize)]
struct PatientCaseInput {
    #[serde(default)]
    observed: Vec<String>,
    #[serde(default)]
    excluded: Vec<String>,
}

/// Command line arguments for the `query` sub command.
#[derive(Debug, ClapArgs)]
pub struct QueryArgs {
    /// Path to the JSON ontology (terms + is-a edges).
    #[arg(long, required = true)]
    pub path_ontology_json: String,

    /// Path to the JSON disease store (positive/negative annotations).
    #[arg(long, required = true)]
    pub path_diseases_json: String,

    /// Path to the JSON patient case (observed/excluded term ids).
    #[arg(long, required = true)]
    pub path_case_json: String,

    /// Path to a JSON disease→genes map, for genotype scoring.
    #[arg(long)]
    pub path_disease_genes_json: Option<String>,

    /// Path to a JSON gene→background-rate map, for genotype scoring.
    #[arg(long)]
    pub path_gene_background_json: Option<String>,

    /// Path to a JSON gene→observed-genotype map, for genotype scoring.
    #[arg(long)]
    pub path_genotype_observations_json: Option<String>,

    /// Opt Orphanet diseases into the store.
    #[arg(long, default_value_t = false)]
    pub allow_orphanet: bool,

    /// Number of top-ranked diseases to print.
    #[arg(long, default_value_t = 10)]
    pub top_k: usize,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, anyhow::Error> {
    let file = File::open(path).map_err(|e| anyhow::anyhow!("could not open {path}: {e}"))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| anyhow::anyhow!("could not parse {path}: {e}"))?;
    Ok(value)
}

fn run_query(_common: &common::Args, args: &QueryArgs) -> Result<(), anyhow::Error> {
    let ontology_input: OntologyInput = read_json(&args.path_ontology_json)?;
    let ontology: Ontology = OntologyBuilder::from_input(ontology_input).build()?;

    let disease_inputs: Vec<DiseaseInput> = read_json(&args.path_diseases_json)?;
    let mut store_config = DiseaseStoreConfig::default();
    if args.allow_orphanet {
        store_config = store_config.with_orphanet();
    }
    let diseases = DiseaseStore::build(disease_inputs, &ontology, &store_config)?;

    let background = BackgroundFrequencyTable::build(&diseases, &ontology);
    let idg_cache = IdgCache::new();
    let pretest = uniform_pretest(&diseases);

    let case_input: PatientCaseInput = read_json(&args.path_case_json)?;
    let case = HpoCase {
        observed: case_input.observed.into_iter().map(TermId::from).collect(),
        excluded: case_input.excluded.into_iter().map(TermId::from).collect(),
    };

    let disease_genes: DiseaseGeneMap = match &args.path_disease_genes_json {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };
    let gene_background_rate: GeneBackgroundRate = match &args.path_gene_background_json {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };
    let gene_observations: GenotypeObservationMap = match &args.path_genotype_observations_json {
        Some(path) => read_json(path)?,
        None => HashMap::new(),
    };
    let genotype_engine = if disease_genes.is_empty() {
        None
    } else {
        Some(GenotypeLrEngine::new(
            &gene_background_rate,
            &disease_genes,
            &gene_observations,
        ))
    };

    let (ranked, errors) = evaluate(
        &case,
        &diseases,
        &ontology,
        &background,
        &idg_cache,
        genotype_engine.as_ref(),
        &pretest,
        &CancellationToken::new(),
    )
    .map_err(|e| anyhow::anyhow!(e))?;

    for problem in &errors.unknown_terms {
        tracing::warn!(term = problem.term.as_str(), "unknown term, dropped from evaluation");
    }

    for (rank_index, test_result) in ranked.top_k(args.top_k).iter().enumerate() {
        println!(
            "{:>4}. {} ({}) composite_lr={:.4} posttest_prob={:.6}",
            rank_index + 1,
            test_result.disease_id,
            test_result.disease_name,
            test_result.composite_lr,
            test_result.posttest_prob
        );
        for line in test_result.explain() {
            println!("       {line}");
        }
    }

    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();

    let term = Term::stderr();
    tracing::subscriber::with_default(collector, || {
        match &cli.command {
            Commands::Query(args) => run_query(&cli.common, args)?,
        }
        Ok::<(), anyhow::Error>(())
    })?;
    term.write_line("All done.")?;

    Ok(())
}
