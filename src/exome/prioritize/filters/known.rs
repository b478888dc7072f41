//! Known-variant filter.

use super::super::schema::{FilterKind, FilterResult, FilterStatus, VariantEvaluation};
use super::VariantFilter;

/// Fails all variants with a dbSNP entry, regardless of frequency.
///
/// Only configured into the pipeline when the `remove_known_variants`
/// setting is active.
#[derive(Debug, Clone, Default)]
pub struct KnownVariantFilter;

impl VariantFilter for KnownVariantFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::KnownVariant
    }

    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error> {
        if let Some(dbsnp_id) = &evaluation.variant.dbsnp_id {
            tracing::trace!(
                "variant {:?} fails known-variant filter ({})",
                &evaluation.variant,
                dbsnp_id
            );
            Ok(FilterResult::new(self.kind(), FilterStatus::Fail, 0.0))
        } else {
            Ok(FilterResult::new(self.kind(), FilterStatus::Pass, 1.0))
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::super::super::schema::{FilterStatus, Variant, VariantEvaluation};
    use super::super::VariantFilter;
    use super::KnownVariantFilter;

    #[rstest]
    #[case(None, FilterStatus::Pass)]
    #[case(Some("rs121918506"), FilterStatus::Fail)]
    fn evaluate(
        #[case] dbsnp_id: Option<&str>,
        #[case] expected_status: FilterStatus,
    ) -> Result<(), anyhow::Error> {
        let evaluation = VariantEvaluation::new(
            Variant {
                dbsnp_id: dbsnp_id.map(|s| s.to_string()),
                ..Default::default()
            },
            vec![],
        );

        let result = KnownVariantFilter.evaluate(&evaluation)?;

        assert_eq!(result.status, expected_status, "dbsnp_id = {:?}", dbsnp_id);

        Ok(())
    }
}
