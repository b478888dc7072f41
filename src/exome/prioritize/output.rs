//! TSV result writer.

use std::io::Write;

use crate::common::chrom_name;

use super::schema::{Gene, ModeOfInheritance, OverallStatus, VariantEvaluation};

/// Column headers of the result table, fixed regardless of analysis mode.
pub const HEADERS: &[&str] = &[
    "#CHROM",
    "POS",
    "REF",
    "ALT",
    "QUAL",
    "FILTER",
    "GENOTYPE",
    "COVERAGE",
    "FUNCTIONAL_CLASS",
    "HGVS",
    "GENE",
    "CADD",
    "POLYPHEN",
    "MUTATION_TASTER",
    "SIFT",
    "DBSNP_ID",
    "MAX_FREQUENCY",
    "VARIANT_SCORE",
    "GENE_PHENO_SCORE",
    "GENE_VARIANT_SCORE",
    "GENE_COMBINED_SCORE",
];

/// Placeholder written for absent values.
const MISSING: &str = ".";

/// Write the selected genes as a TSV table, one row per variant.
///
/// Gene order is preserved; within a gene, variants are written in their
/// stored (coordinate) order. The per-gene score columns repeat the score
/// record of the requested mode on every row of the gene.
pub fn write_results<W: Write>(
    writer: W,
    genes: &[Gene],
    mode: ModeOfInheritance,
) -> Result<(), anyhow::Error> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer);
    csv_writer.write_record(HEADERS)?;

    for gene in genes {
        let (pheno_score, variant_score, combined_score) = gene.scores[mode]
            .as_ref()
            .map(|score| {
                (
                    format!("{:.4}", score.phenotype_score),
                    format!("{:.4}", score.variant_score),
                    format!("{:.4}", score.combined_score),
                )
            })
            .unwrap_or_else(|| {
                (
                    MISSING.to_string(),
                    MISSING.to_string(),
                    MISSING.to_string(),
                )
            });
        for evaluation in &gene.variants {
            csv_writer.write_record(variant_record(
                evaluation,
                &gene.symbol,
                &pheno_score,
                &variant_score,
                &combined_score,
            ))?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}

/// Render one variant row.
fn variant_record(
    evaluation: &VariantEvaluation,
    gene_symbol: &str,
    pheno_score: &str,
    variant_score: &str,
    combined_score: &str,
) -> Vec<String> {
    let variant = &evaluation.variant;
    vec![
        chrom_name(variant.chrom_no),
        format!("{}", variant.pos),
        variant.reference.clone(),
        variant.alternative.clone(),
        format!("{:.1}", variant.quality),
        filter_field(evaluation),
        variant.genotype.clone(),
        format!("{}", variant.coverage),
        evaluation
            .most_severe_effect()
            .map(|effect| effect.to_string())
            .unwrap_or_else(|| MISSING.to_string()),
        hgvs_field(evaluation),
        gene_symbol.to_string(),
        predictor_field(evaluation.pathogenicity.cadd),
        predictor_field(evaluation.pathogenicity.polyphen),
        predictor_field(evaluation.pathogenicity.mutation_taster),
        predictor_field(evaluation.pathogenicity.sift),
        variant
            .dbsnp_id
            .clone()
            .unwrap_or_else(|| MISSING.to_string()),
        variant
            .max_frequency
            .map(|freq| format!("{:.4}", freq))
            .unwrap_or_else(|| MISSING.to_string()),
        format!("{:.4}", evaluation.variant_score()),
        pheno_score.to_string(),
        variant_score.to_string(),
        combined_score.to_string(),
    ]
}

/// Render the FILTER column: `PASS`, the failed stages, or `.` when the
/// variant never reached the pipeline.
fn filter_field(evaluation: &VariantEvaluation) -> String {
    match evaluation.status() {
        OverallStatus::Pass => "PASS".to_string(),
        OverallStatus::Fail => evaluation
            .failed_filters()
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(";"),
        OverallStatus::Unfiltered => MISSING.to_string(),
    }
}

/// HGVS description of the annotation carrying the most severe effect.
fn hgvs_field(evaluation: &VariantEvaluation) -> String {
    let Some(effect) = evaluation.most_severe_effect() else {
        return MISSING.to_string();
    };
    evaluation
        .annotations
        .iter()
        .find(|ann| ann.effects.contains(&effect))
        .and_then(|ann| ann.hgvs.clone())
        .unwrap_or_else(|| MISSING.to_string())
}

fn predictor_field(value: Option<f32>) -> String {
    value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| MISSING.to_string())
}
