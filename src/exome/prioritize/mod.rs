//! Code implementing the `exome prioritize` sub command.

pub mod annotate;
pub mod filters;
pub mod output;
pub mod pathogenicity;
pub mod results;
pub mod schema;
pub mod scoring;
pub mod transcripts;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{command, Parser};
use rayon::prelude::*;
use thousands::Separable;
use tracing::info;

use crate::common::{build_chrom_map, io::open_read_maybe_gz, trace_rss_now};

use self::annotate::{VariantAnnotator, DEFAULT_NEIGHBOR_WINDOW};
use self::filters::{
    FilterPipeline, FrequencyFilter, InheritanceFilter, KnownVariantFilter, PathogenicityFilter,
    QualityFilter, TargetFilter,
};
use self::pathogenicity::{load_predictor_store, pathogenicity_data, PredictorStore};
use self::schema::{
    AnalysisMode, ModeOfInheritance, OverallStatus, Variant, VariantEvaluation, VariantRecord,
};
use self::scoring::{DefaultContributionPolicy, ScoreCombine};
use self::transcripts::load_transcripts;

/// Command line arguments for `exome prioritize` sub command.
#[derive(Parser, Debug)]
#[command(author, version, about = "Run exome variant prioritization", long_about = None)]
pub struct Args {
    /// Path to transcript definition TSV file.
    #[arg(long, required = true)]
    pub path_transcripts: PathBuf,
    /// Path to pathogenicity predictor TSV file.
    #[arg(long, required = true)]
    pub path_pathogenicity: PathBuf,
    /// Path to gene phenotype score TSV file; genes without an entry score
    /// zero.
    #[arg(long)]
    pub path_phenotype: Option<PathBuf>,
    /// Path to input variant TSV file.
    #[arg(long, required = true)]
    pub path_input: PathBuf,
    /// Path to output TSV file.
    #[arg(long, required = true)]
    pub path_output: PathBuf,
    /// Maximal number of genes to report; all when absent.
    #[arg(long)]
    pub max_results: Option<usize>,
    /// Whether to keep failed records in the result.
    #[arg(long, value_enum, default_value_t = AnalysisMode::Full)]
    pub analysis_mode: AnalysisMode,
    /// Mode of inheritance to rank genes under.
    #[arg(long, value_enum, default_value_t = ModeOfInheritance::Any)]
    pub mode_of_inheritance: ModeOfInheritance,
    /// Minimal call quality to pass the quality filter.
    #[arg(long, default_value_t = 20.0)]
    pub min_quality: f32,
    /// Maximal population frequency in percent to pass the frequency filter.
    #[arg(long, default_value_t = 1.0)]
    pub max_frequency: f32,
    /// Minimal pathogenicity score to pass the pathogenicity filter.
    #[arg(long, default_value_t = 0.5)]
    pub min_pathogenicity: f32,
    /// Remove all variants with a dbSNP entry. Passing the flag without a
    /// value enables the filter.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub remove_known_variants: Option<bool>,
    /// Window in bp for assigning intergenic variants to a neighboring
    /// transcript.
    #[arg(long, default_value_t = DEFAULT_NEIGHBOR_WINDOW)]
    pub neighbor_window: i32,
    /// How variant-evidence and phenotype score are combined.
    #[arg(long, value_enum, default_value_t = ScoreCombine::Mean)]
    pub score_combine: ScoreCombine,
}

/// Configure the filter pipeline from the arguments.
///
/// In `PassOnly` mode every stage short-circuits; in `Full` mode all
/// stages record their verdict so the output can show each failure.
fn build_pipeline(args: &Args) -> FilterPipeline {
    let short_circuiting = args.analysis_mode == AnalysisMode::PassOnly;
    let mut pipeline = FilterPipeline::new()
        .add_stage(
            Box::new(QualityFilter {
                min_quality: args.min_quality,
            }),
            short_circuiting,
        )
        .add_stage(Box::new(TargetFilter), short_circuiting)
        .add_stage(
            Box::new(FrequencyFilter {
                max_frequency: args.max_frequency,
            }),
            short_circuiting,
        );
    if args.remove_known_variants.unwrap_or(false) {
        pipeline = pipeline.add_stage(Box::new(KnownVariantFilter), short_circuiting);
    }
    pipeline = pipeline.add_stage(
        Box::new(PathogenicityFilter {
            min_score: args.min_pathogenicity,
        }),
        short_circuiting,
    );
    if args.mode_of_inheritance != ModeOfInheritance::Any {
        pipeline = pipeline.add_stage(
            Box::new(InheritanceFilter {
                mode: args.mode_of_inheritance,
            }),
            short_circuiting,
        );
    }
    pipeline
}

/// Load the gene phenotype score table (gene symbol to score in `[0, 1]`).
fn load_phenotype_scores(path: &Path) -> Result<HashMap<String, f32>, anyhow::Error> {
    #[derive(Debug, serde::Deserialize)]
    struct PhenotypeRecord {
        gene_symbol: String,
        score: f32,
    }

    let mut result = HashMap::new();
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);
    for record in csv_reader.deserialize() {
        let record: PhenotypeRecord = record?;
        result.insert(record.gene_symbol, record.score);
    }
    Ok(result)
}

/// Load the input variant records.
fn load_variants(path: &Path) -> Result<Vec<Variant>, anyhow::Error> {
    let chrom_map = build_chrom_map();
    let mut result = Vec::new();
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);
    for record in csv_reader.deserialize() {
        let record: VariantRecord = record?;
        result.push(Variant::from_record(record, &chrom_map)?);
    }
    Ok(result)
}

/// Annotate, attach pathogenicity data, and filter one variant.
fn evaluate_variant(
    variant: Variant,
    annotator: &VariantAnnotator<'_>,
    store: &dyn PredictorStore,
    pipeline: &FilterPipeline,
) -> Result<VariantEvaluation, anyhow::Error> {
    let annotations = annotator.annotate(Some(&variant))?;
    let mut evaluation = VariantEvaluation::new(variant, annotations);
    evaluation.pathogenicity = pathogenicity_data(&evaluation, store);
    pipeline.run(&mut evaluation)?;
    Ok(evaluation)
}

/// Main entry point for `exome prioritize` sub command.
pub fn run(args_common: &crate::common::Args, args: &Args) -> Result<(), anyhow::Error> {
    let before_anything = Instant::now();
    info!("args_common = {:?}", &args_common);
    info!("args = {:?}", &args);

    info!("Loading databases...");
    let before_loading = Instant::now();
    let transcript_index = load_transcripts(&args.path_transcripts)?;
    let predictor_store = load_predictor_store(&args.path_pathogenicity)?;
    let phenotype_scores = args
        .path_phenotype
        .as_ref()
        .map(|path| load_phenotype_scores(path))
        .transpose()?
        .unwrap_or_default();
    info!(
        "...done loading databases in {:?}",
        before_loading.elapsed()
    );

    trace_rss_now();

    info!("Loading variants...");
    let variants = load_variants(&args.path_input)?;
    info!(
        "... done loading {} variants",
        variants.len().separate_with_commas()
    );

    info!("Annotating and filtering...");
    let before_filtering = Instant::now();
    let annotator = VariantAnnotator::new(&transcript_index, args.neighbor_window);
    let pipeline = build_pipeline(args);
    let evaluations = variants
        .into_par_iter()
        .map(|variant| evaluate_variant(variant, &annotator, &predictor_store, &pipeline))
        .collect::<Result<Vec<_>, _>>()?;
    let count_passed = evaluations
        .iter()
        .filter(|e| e.status() == OverallStatus::Pass)
        .count();
    info!(
        "... done filtering in {:?} ({} of {} passed)",
        before_filtering.elapsed(),
        count_passed.separate_with_commas(),
        evaluations.len().separate_with_commas()
    );

    info!("Scoring genes...");
    let before_scoring = Instant::now();
    let mut genes = scoring::group_by_gene(evaluations);
    let policy = DefaultContributionPolicy;
    genes.par_iter_mut().for_each(|gene| {
        let phenotype_score = phenotype_scores.get(&gene.symbol).copied().unwrap_or(0.0);
        scoring::score_gene(gene, phenotype_score, &policy, args.score_combine);
    });
    info!(
        "... done scoring {} genes in {:?}",
        genes.len().separate_with_commas(),
        before_scoring.elapsed()
    );

    trace_rss_now();

    info!("Selecting and writing results...");
    let mut selected = results::select(genes, args.analysis_mode, args.mode_of_inheritance);
    if let Some(max_results) = args.max_results {
        selected.truncate(max_results);
    }
    output::write_results(
        crate::common::io::open_write_maybe_gz(&args.path_output)?,
        &selected,
        args.mode_of_inheritance,
    )?;
    info!("... done writing {} genes", selected.len().separate_with_commas());

    info!(
        "All of `exome prioritize` completed in {:?}",
        before_anything.elapsed()
    );
    Ok(())
}
