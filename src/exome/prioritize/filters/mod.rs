//! The ordered pass/fail filter pipeline applied to each
//! `VariantEvaluation`.

mod frequency;
mod inheritance;
mod known;
mod pathogenicity;
mod quality;
mod target;

pub use frequency::FrequencyFilter;
pub use inheritance::InheritanceFilter;
pub use known::KnownVariantFilter;
pub use pathogenicity::PathogenicityFilter;
pub use quality::QualityFilter;
pub use target::TargetFilter;

use super::schema::{FilterKind, FilterResult, FilterStatus, VariantEvaluation};

/// Capability of one filter stage.
pub trait VariantFilter: Send + Sync {
    /// The kind identifier of the stage.
    fn kind(&self) -> FilterKind;

    /// Evaluate the variant and return a verdict with a score.
    fn evaluate(&self, evaluation: &VariantEvaluation) -> Result<FilterResult, anyhow::Error>;
}

/// One configured stage of the pipeline.
pub struct FilterStage {
    /// The filter to run.
    pub filter: Box<dyn VariantFilter>,
    /// Whether a failure of this stage short-circuits all later stages.
    pub short_circuiting: bool,
}

/// Ordered sequence of filter stages.
#[derive(Default)]
pub struct FilterPipeline {
    /// The stages, in execution order.
    stages: Vec<FilterStage>,
}

impl FilterPipeline {
    /// Construct an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage.
    pub fn add_stage(mut self, filter: Box<dyn VariantFilter>, short_circuiting: bool) -> Self {
        self.stages.push(FilterStage {
            filter,
            short_circuiting,
        });
        self
    }

    /// Number of configured stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stage is configured.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run all stages on the evaluation, appending one `FilterResult` per
    /// evaluated stage.
    ///
    /// Once a short-circuiting stage fails the variant, all later stages
    /// are skipped and append nothing.
    pub fn run(&self, evaluation: &mut VariantEvaluation) -> Result<(), anyhow::Error> {
        let mut short_circuited = false;
        for stage in &self.stages {
            if short_circuited {
                break;
            }
            let result = stage.filter.evaluate(evaluation)?;
            if result.status == FilterStatus::Fail && stage.short_circuiting {
                short_circuited = true;
            }
            evaluation.add_filter_result(result);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::super::schema::{
        FilterKind, FilterResult, FilterStatus, OverallStatus, VariantEvaluation,
    };
    use super::{FilterPipeline, VariantFilter};

    /// Stage stub with a fixed verdict.
    struct FixedFilter {
        kind: FilterKind,
        status: FilterStatus,
    }

    impl VariantFilter for FixedFilter {
        fn kind(&self) -> FilterKind {
            self.kind
        }

        fn evaluate(
            &self,
            _evaluation: &VariantEvaluation,
        ) -> Result<FilterResult, anyhow::Error> {
            Ok(FilterResult::new(
                self.kind,
                self.status,
                match self.status {
                    FilterStatus::Pass => 1.0,
                    FilterStatus::Fail => 0.0,
                },
            ))
        }
    }

    fn fixed(kind: FilterKind, status: FilterStatus) -> Box<FixedFilter> {
        Box::new(FixedFilter { kind, status })
    }

    #[test]
    fn all_stages_append_results_without_short_circuit() -> Result<(), anyhow::Error> {
        let pipeline = FilterPipeline::new()
            .add_stage(fixed(FilterKind::Quality, FilterStatus::Pass), false)
            .add_stage(fixed(FilterKind::Target, FilterStatus::Fail), false)
            .add_stage(fixed(FilterKind::Frequency, FilterStatus::Pass), false);
        let mut evaluation = VariantEvaluation::default();

        pipeline.run(&mut evaluation)?;

        assert_eq!(evaluation.filter_results.len(), 3);
        assert_eq!(evaluation.status(), OverallStatus::Fail);

        Ok(())
    }

    #[test]
    fn short_circuiting_failure_skips_later_stages() -> Result<(), anyhow::Error> {
        let pipeline = FilterPipeline::new()
            .add_stage(fixed(FilterKind::Quality, FilterStatus::Pass), true)
            .add_stage(fixed(FilterKind::Target, FilterStatus::Fail), true)
            .add_stage(fixed(FilterKind::Frequency, FilterStatus::Pass), true);
        let mut evaluation = VariantEvaluation::default();

        pipeline.run(&mut evaluation)?;

        // The failing stage itself appends its result; later stages do not.
        assert_eq!(evaluation.filter_results.len(), 2);
        assert_eq!(
            evaluation.filter_results[1].kind,
            FilterKind::Target
        );
        assert_eq!(evaluation.status(), OverallStatus::Fail);

        Ok(())
    }

    #[test]
    fn empty_pipeline_leaves_variant_unfiltered() -> Result<(), anyhow::Error> {
        let pipeline = FilterPipeline::new();
        let mut evaluation = VariantEvaluation::default();

        pipeline.run(&mut evaluation)?;

        assert_eq!(evaluation.status(), OverallStatus::Unfiltered);

        Ok(())
    }
}
