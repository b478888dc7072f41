//! Call quality filter.

use super::super::schema::{FilterKind, FilterResult, FilterStatus, VariantEvaluation};
use super::VariantFilter;

/// Fails variants whose call quality is below a threshold.
#[derive(Debug, Clone)]
pub struct QualityFilter {
    /// Minimal call quality to pass.
    pub min_quality: f32,
}

impl VariantFilter for QualityFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Quality
    }

    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error> {
        let quality = evaluation.variant.quality;
        let score = if self.min_quality > 0.0 {
            (quality / self.min_quality).min(1.0)
        } else {
            1.0
        };
        let status = if quality >= self.min_quality {
            FilterStatus::Pass
        } else {
            tracing::trace!(
                "variant {:?} fails quality filter (min_quality = {})",
                &evaluation.variant,
                self.min_quality
            );
            FilterStatus::Fail
        };
        Ok(FilterResult::new(self.kind(), status, score))
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::super::super::schema::{FilterStatus, Variant, VariantEvaluation};
    use super::super::VariantFilter;
    use super::QualityFilter;

    #[rstest]
    #[case(30.0, FilterStatus::Pass, 1.0)]
    #[case(20.0, FilterStatus::Pass, 1.0)]
    #[case(10.0, FilterStatus::Fail, 0.5)]
    #[case(0.0, FilterStatus::Fail, 0.0)]
    fn evaluate(
        #[case] quality: f32,
        #[case] expected_status: FilterStatus,
        #[case] expected_score: f32,
    ) -> Result<(), anyhow::Error> {
        let filter = QualityFilter { min_quality: 20.0 };
        let evaluation = VariantEvaluation::new(
            Variant {
                quality,
                ..Default::default()
            },
            vec![],
        );

        let result = filter.evaluate(&evaluation)?;

        assert_eq!(result.status, expected_status, "quality = {}", quality);
        assert!(
            float_cmp::approx_eq!(f32, result.score, expected_score, epsilon = 1e-6),
            "quality = {}",
            quality
        );

        Ok(())
    }
}
