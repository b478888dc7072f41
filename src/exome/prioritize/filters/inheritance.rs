//! Inheritance-compatibility filter.

use super::super::schema::{
    FilterKind, FilterResult, FilterStatus, ModeOfInheritance, VariantEvaluation,
};
use super::VariantFilter;

/// Fails variants not compatible with the requested mode of inheritance.
///
/// Compatibility itself is computed by the upstream pedigree analysis and
/// attached to the input records; this stage only checks membership.
#[derive(Debug, Clone)]
pub struct InheritanceFilter {
    /// The requested mode of inheritance.
    pub mode: ModeOfInheritance,
}

impl VariantFilter for InheritanceFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Inheritance
    }

    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error> {
        if evaluation.variant.compatible_with(self.mode) {
            Ok(FilterResult::new(self.kind(), FilterStatus::Pass, 1.0))
        } else {
            tracing::trace!(
                "variant {:?} fails inheritance filter (mode = {})",
                &evaluation.variant,
                self.mode
            );
            Ok(FilterResult::new(self.kind(), FilterStatus::Fail, 0.0))
        }
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::super::super::schema::{
        FilterStatus, ModeOfInheritance, Variant, VariantEvaluation,
    };
    use super::super::VariantFilter;
    use super::InheritanceFilter;

    #[rstest]
    #[case("AD;AR", ModeOfInheritance::AutosomalDominant, FilterStatus::Pass)]
    #[case("AD;AR", ModeOfInheritance::AutosomalRecessive, FilterStatus::Pass)]
    #[case("AD;AR", ModeOfInheritance::Mitochondrial, FilterStatus::Fail)]
    #[case("AD;AR", ModeOfInheritance::Any, FilterStatus::Pass)]
    #[case("", ModeOfInheritance::Any, FilterStatus::Fail)]
    #[case("", ModeOfInheritance::AutosomalDominant, FilterStatus::Fail)]
    fn evaluate(
        #[case] modes: &str,
        #[case] requested: ModeOfInheritance,
        #[case] expected_status: FilterStatus,
    ) -> Result<(), anyhow::Error> {
        let compatible_modes = modes
            .split(';')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<ModeOfInheritance>().unwrap())
            .collect();
        let evaluation = VariantEvaluation::new(
            Variant {
                compatible_modes,
                ..Default::default()
            },
            vec![],
        );
        let filter = InheritanceFilter { mode: requested };

        let result = filter.evaluate(&evaluation)?;

        assert_eq!(
            result.status, expected_status,
            "modes = {:?}, requested = {:?}",
            modes, requested
        );

        Ok(())
    }
}
