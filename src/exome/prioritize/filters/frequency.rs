//! Population frequency filter.

use super::super::schema::{FilterKind, FilterResult, FilterStatus, VariantEvaluation};
use super::VariantFilter;

/// Fails variants whose maximal population frequency exceeds a threshold.
///
/// The frequency fields are opaque collaborator data attached to the input
/// records; a variant without any frequency observation passes with full
/// score.
#[derive(Debug, Clone)]
pub struct FrequencyFilter {
    /// Maximal population frequency in percent to pass.
    pub max_frequency: f32,
}

impl VariantFilter for FrequencyFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Frequency
    }

    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error> {
        let Some(frequency) = evaluation.variant.max_frequency else {
            return Ok(FilterResult::new(self.kind(), FilterStatus::Pass, 1.0));
        };

        let score = (1.0 - frequency / 100.0).max(0.0);
        let status = if frequency <= self.max_frequency {
            FilterStatus::Pass
        } else {
            tracing::trace!(
                "variant {:?} fails frequency filter (max_frequency = {})",
                &evaluation.variant,
                self.max_frequency
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
    use super::FrequencyFilter;

    #[rstest]
    #[case(None, FilterStatus::Pass, 1.0)]
    #[case(Some(0.0), FilterStatus::Pass, 1.0)]
    #[case(Some(0.5), FilterStatus::Pass, 0.995)]
    #[case(Some(1.0), FilterStatus::Pass, 0.99)]
    #[case(Some(1.5), FilterStatus::Fail, 0.985)]
    #[case(Some(100.0), FilterStatus::Fail, 0.0)]
    fn evaluate(
        #[case] max_frequency: Option<f32>,
        #[case] expected_status: FilterStatus,
        #[case] expected_score: f32,
    ) -> Result<(), anyhow::Error> {
        let filter = FrequencyFilter { max_frequency: 1.0 };
        let evaluation = VariantEvaluation::new(
            Variant {
                max_frequency,
                ..Default::default()
            },
            vec![],
        );

        let result = filter.evaluate(&evaluation)?;

        assert_eq!(
            result.status, expected_status,
            "max_frequency = {:?}",
            max_frequency
        );
        assert!(
            float_cmp::approx_eq!(f32, result.score, expected_score, epsilon = 1e-6),
            "max_frequency = {:?}, score = {}",
            max_frequency,
            result.score
        );

        Ok(())
    }
}
