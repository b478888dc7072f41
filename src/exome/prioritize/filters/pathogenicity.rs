//! Pathogenicity score filter.

use super::super::schema::{
    FilterKind, FilterResult, FilterStatus, VariantEffect, VariantEvaluation,
};
use super::VariantFilter;

/// Scores variants by predicted pathogenicity and fails those below a
/// threshold.
///
/// Missense variants are scored from the aggregated predictor data, with
/// the per-effect default as fall-back when no predictor reported; all
/// other effects receive their fixed default score.
#[derive(Debug, Clone)]
pub struct PathogenicityFilter {
    /// Minimal pathogenicity score to pass.
    pub min_score: f32,
}

impl PathogenicityFilter {
    /// Compute the pathogenicity score of the evaluation.
    fn score(&self, evaluation: &VariantEvaluation) -> f32 {
        let Some(effect) = evaluation.most_severe_effect() else {
            return 0.0;
        };
        if effect == VariantEffect::Missense {
            evaluation
                .pathogenicity
                .overall_score()
                .map(|score| score.clamp(0.0, 1.0))
                .unwrap_or_else(|| effect.default_pathogenicity_score())
        } else {
            effect.default_pathogenicity_score()
        }
    }
}

impl VariantFilter for PathogenicityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Pathogenicity
    }

    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error> {
        let score = self.score(evaluation);
        let status = if score >= self.min_score {
            FilterStatus::Pass
        } else {
            tracing::trace!(
                "variant {:?} fails pathogenicity filter (score = {}, min_score = {})",
                &evaluation.variant,
                score,
                self.min_score
            );
            FilterStatus::Fail
        };
        Ok(FilterResult::new(self.kind(), status, score))
    }
}
