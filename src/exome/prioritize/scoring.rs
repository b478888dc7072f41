//! Grouping of variant evaluations by gene and per-mode gene scoring.

use indexmap::IndexMap;
use strum::IntoEnumIterator;

use super::schema::{
    Gene, GeneScore, GenotypeCall, ModeOfInheritance, OverallStatus, VariantEvaluation,
};

/// How the variant-evidence score and the phenotype score are combined.
///
/// Both choices are monotonic non-decreasing in both inputs; the combined
/// score is computed independently per mode of inheritance.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ScoreCombine {
    /// Arithmetic mean of the two scores.
    #[default]
    #[strum(serialize = "MEAN")]
    #[value(name = "MEAN")]
    Mean,
    /// Product of the two scores.
    #[strum(serialize = "PRODUCT")]
    #[value(name = "PRODUCT")]
    Product,
}

impl ScoreCombine {
    /// Combine variant-evidence and phenotype score.
    pub fn combine(&self, variant_score: f32, phenotype_score: f32) -> f32 {
        match self {
            ScoreCombine::Mean => (variant_score + phenotype_score) / 2.0,
            ScoreCombine::Product => variant_score * phenotype_score,
        }
    }
}

/// Selection of the variants that contribute to a gene's score under one
/// mode of inheritance.
///
/// Implementations only see compatible, overall-PASS candidates; the
/// returned indices become the contributing set verbatim.
pub trait ContributionPolicy: Send + Sync {
    /// Select the contributing subset of `candidates` (indices into
    /// `variants`).
    fn select(
        &self,
        mode: ModeOfInheritance,
        variants: &[VariantEvaluation],
        candidates: &[usize],
    ) -> Vec<usize>;
}

/// Default contribution policy.
///
/// Dominant-style modes (and `Any`) contribute the single highest-scoring
/// variant. The recessive mode contributes one homozygous-alternate variant
/// if present, otherwise the best-scoring pair of heterozygous variants.
/// Ties are broken by coordinate and alleles for determinism.
#[derive(Debug, Clone, Default)]
pub struct DefaultContributionPolicy;

impl DefaultContributionPolicy {
    /// Order candidate indices by descending variant score, ties by
    /// coordinate then alleles.
    fn ranked(&self, variants: &[VariantEvaluation], candidates: &[usize]) -> Vec<usize> {
        let mut result = candidates.to_vec();
        result.sort_by(|&a, &b| {
            let va = &variants[a];
            let vb = &variants[b];
            vb.variant_score()
                .total_cmp(&va.variant_score())
                .then_with(|| {
                    (
                        va.variant.pos,
                        &va.variant.reference,
                        &va.variant.alternative,
                    )
                        .cmp(&(
                            vb.variant.pos,
                            &vb.variant.reference,
                            &vb.variant.alternative,
                        ))
                })
        });
        result
    }
}

impl ContributionPolicy for DefaultContributionPolicy {
    fn select(
        &self,
        mode: ModeOfInheritance,
        variants: &[VariantEvaluation],
        candidates: &[usize],
    ) -> Vec<usize> {
        let ranked = self.ranked(variants, candidates);
        match mode {
            ModeOfInheritance::AutosomalRecessive => {
                // One hom-alt hit suffices; otherwise a compound
                // heterozygous pair is required.
                if let Some(&best_hom) = ranked.iter().find(|&&idx| {
                    variants[idx].variant.genotype_call() == GenotypeCall::HomAlt
                }) {
                    return vec![best_hom];
                }
                let hets = ranked
                    .iter()
                    .copied()
                    .filter(|&idx| variants[idx].variant.genotype_call() == GenotypeCall::Het)
                    .take(2)
                    .collect::<Vec<_>>();
                if hets.len() == 2 {
                    hets
                } else {
                    Vec::new()
                }
            }
            _ => ranked.into_iter().take(1).collect(),
        }
    }
}

/// Group evaluations into genes by the gene of their first annotation.
///
/// Evaluations without any annotation (intergenic desert) cannot be
/// assigned to a gene and are dropped with a debug log. Within each gene,
/// variants are ordered by coordinate.
pub fn group_by_gene(evaluations: Vec<VariantEvaluation>) -> Vec<Gene> {
    let mut grouped: IndexMap<(String, u32), Vec<VariantEvaluation>> = IndexMap::new();
    let mut dropped = 0;
    for evaluation in evaluations.into_iter() {
        let Some(annotation) = evaluation.annotations.first() else {
            dropped += 1;
            continue;
        };
        grouped
            .entry((annotation.gene_symbol.clone(), annotation.gene_id))
            .or_default()
            .push(evaluation);
    }
    if dropped > 0 {
        tracing::debug!("{} variants without gene assignment dropped", dropped);
    }

    grouped
        .into_iter()
        .map(|((symbol, gene_id), mut variants)| {
            variants.sort_by(|a, b| {
                (
                    a.variant.chrom_no,
                    a.variant.pos,
                    &a.variant.reference,
                    &a.variant.alternative,
                )
                    .cmp(&(
                        b.variant.chrom_no,
                        b.variant.pos,
                        &b.variant.reference,
                        &b.variant.alternative,
                    ))
            });
            Gene::new(symbol, gene_id, variants)
        })
        .collect()
}

/// Score one gene under every mode of inheritance independently.
///
/// For each mode, the contributing subset of the compatible, overall-PASS
/// variants is chosen by the policy; their per-mode flags are set and the
/// `GeneScore` slot for the mode is filled. A mode without candidates
/// yields a zero-scored record with an empty contributing list.
pub fn score_gene(
    gene: &mut Gene,
    phenotype_score: f32,
    policy: &dyn ContributionPolicy,
    combine: ScoreCombine,
) {
    for mode in ModeOfInheritance::iter() {
        let candidates = gene
            .variants
            .iter()
            .enumerate()
            .filter(|(_, evaluation)| {
                evaluation.status() == OverallStatus::Pass
                    && evaluation.variant.compatible_with(mode)
            })
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let contributing = policy.select(mode, &gene.variants, &candidates);

        for &idx in &contributing {
            gene.variants[idx].contributes[mode] = true;
        }

        let (variant_score, combined_score) = if contributing.is_empty() {
            (0.0, 0.0)
        } else {
            let variant_score = contributing
                .iter()
                .map(|&idx| gene.variants[idx].variant_score())
                .sum::<f32>()
                / contributing.len() as f32;
            (variant_score, combine.combine(variant_score, phenotype_score))
        };

        gene.scores[mode] = Some(GeneScore::new(
            mode,
            gene.gene_id,
            variant_score,
            phenotype_score,
            combined_score,
            contributing,
        ));
    }
}
