//! Functional-consequence (exome target) filter.

use super::super::schema::{FilterKind, FilterResult, FilterStatus, VariantEvaluation};
use super::VariantFilter;

/// Fails variants whose most severe effect lies outside the exonic target
/// region (UTR, intronic, non-coding, intergenic).
///
/// Variants without any annotation fail as well; with no transcript within
/// the neighbor window there is nothing to assign evidence to.
#[derive(Debug, Clone, Default)]
pub struct TargetFilter;

impl VariantFilter for TargetFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Target
    }

    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error> {
        let on_target = evaluation
            .most_severe_effect()
            .map(|effect| !effect.is_off_target())
            .unwrap_or(false);
        if on_target {
            Ok(FilterResult::new(self.kind(), FilterStatus::Pass, 1.0))
        } else {
            tracing::trace!(
                "variant {:?} fails target filter (effect = {:?})",
                &evaluation.variant,
                evaluation.most_severe_effect()
            );
            Ok(FilterResult::new(self.kind(), FilterStatus::Fail, 0.0))
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;

    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::super::super::schema::{
        Annotation, FilterStatus, Variant, VariantEffect, VariantEvaluation,
    };
    use super::super::VariantFilter;
    use super::TargetFilter;

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn evaluate_per_effect(#[case] expect_on_target: bool) -> Result<(), anyhow::Error> {
        for effect in VariantEffect::iter().filter(|e| e.is_off_target() != expect_on_target) {
            let evaluation = VariantEvaluation::new(
                Variant::default(),
                vec![Annotation {
                    transcript_id: "tx".to_string(),
                    gene_symbol: "GENE1".to_string(),
                    gene_id: 1,
                    transcript_start: 100,
                    effects: BTreeSet::from([effect]),
                    hgvs: None,
                }],
            );

            let result = TargetFilter.evaluate(&evaluation)?;

            let expected = if expect_on_target {
                FilterStatus::Pass
            } else {
                FilterStatus::Fail
            };
            assert_eq!(result.status, expected, "effect = {:?}", effect);
        }

        Ok(())
    }

    #[test]
    fn unannotated_variant_fails() -> Result<(), anyhow::Error> {
        let evaluation = VariantEvaluation::default();

        let result = TargetFilter.evaluate(&evaluation)?;

        assert_eq!(result.status, FilterStatus::Fail);

        Ok(())
    }
}
