//! Data structures for representing variants, their annotations, filter
//! results, and per-gene scores within the `exome prioritize` sub command.

use std::collections::BTreeSet;

use crate::common::strip_gt_leading_slash;

/// Select whether failed records are retained in the result view.
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
pub enum AnalysisMode {
    /// Retain all genes and variants together with their filter status.
    #[default]
    #[strum(serialize = "FULL")]
    #[value(name = "FULL")]
    Full,
    /// Retain only passing, contributing genes and variants.
    #[strum(serialize = "PASS_ONLY")]
    #[value(name = "PASS_ONLY")]
    PassOnly,
}

/// Mode of inheritance under which compatibility, contribution, and scoring
/// are evaluated independently.
#[derive(
    clap::ValueEnum,
    Clone,
    Copy,
    Debug,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    PartialEq,
    Eq,
    enum_map::Enum,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ModeOfInheritance {
    /// Autosomal dominant.
    #[strum(serialize = "AD")]
    #[value(name = "AD")]
    AutosomalDominant,
    /// Autosomal recessive.
    #[strum(serialize = "AR")]
    #[value(name = "AR")]
    AutosomalRecessive,
    /// X-linked.
    #[strum(serialize = "XL")]
    #[value(name = "XL")]
    XLinked,
    /// Mitochondrial.
    #[strum(serialize = "MT")]
    #[value(name = "MT")]
    Mitochondrial,
    /// Any mode; a variant/gene qualifies if compatible with at least one
    /// concrete mode.
    #[default]
    #[strum(serialize = "ANY")]
    #[value(name = "ANY")]
    Any,
}

/// Functional effect of a variant on a transcript.
///
/// Variants are ordered most severe first so that the minimum over a set of
/// effects is the one to report.
#[derive(
    Clone,
    Copy,
    Debug,
    strum::Display,
    strum::EnumIter,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum VariantEffect {
    /// Substitution introducing a premature stop codon.
    #[strum(serialize = "STOP_GAINED")]
    StopGained,
    /// Length-changing allele shifting the reading frame.
    #[strum(serialize = "FRAMESHIFT")]
    Frameshift,
    /// Substitution removing the stop codon.
    #[strum(serialize = "STOP_LOST")]
    StopLost,
    /// Substitution in the start codon.
    #[strum(serialize = "START_LOST")]
    StartLost,
    /// Intronic position within two bases of an exon boundary.
    #[strum(serialize = "SPLICE_REGION")]
    SpliceRegion,
    /// Amino-acid-changing substitution.
    #[strum(serialize = "MISSENSE")]
    Missense,
    /// Length-changing allele preserving the reading frame.
    #[strum(serialize = "INFRAME_INDEL")]
    InframeIndel,
    /// Silent substitution.
    #[strum(serialize = "SYNONYMOUS")]
    Synonymous,
    /// Exonic position upstream of the coding region.
    #[strum(serialize = "UTR5")]
    Utr5,
    /// Exonic position downstream of the coding region.
    #[strum(serialize = "UTR3")]
    Utr3,
    /// Exonic position on a transcript without coding sequence.
    #[strum(serialize = "NON_CODING")]
    NonCodingTranscript,
    /// Intronic position away from any splice region.
    #[strum(serialize = "INTRONIC")]
    Intronic,
    /// No overlap with any transcript; annotation references a neighbor.
    #[strum(serialize = "INTERGENIC")]
    Intergenic,
}

impl VariantEffect {
    /// Whether the effect is an amino-acid-changing substitution.
    pub fn is_missense(&self) -> bool {
        matches!(self, VariantEffect::Missense)
    }

    /// Whether the effect is outside the exonic target region.
    pub fn is_off_target(&self) -> bool {
        matches!(
            self,
            VariantEffect::Utr5
                | VariantEffect::Utr3
                | VariantEffect::NonCodingTranscript
                | VariantEffect::Intronic
                | VariantEffect::Intergenic
        )
    }

    /// Fixed pathogenicity score assigned to non-missense effects.
    ///
    /// Missense variants are scored from predictor data instead; the value
    /// returned here is the fall-back when no predictor row is available.
    pub fn default_pathogenicity_score(&self) -> f32 {
        match self {
            VariantEffect::StopGained => 0.95,
            VariantEffect::Frameshift => 0.95,
            VariantEffect::StopLost => 0.70,
            VariantEffect::StartLost => 0.95,
            VariantEffect::SpliceRegion => 0.90,
            VariantEffect::Missense => 0.60,
            VariantEffect::InframeIndel => 0.85,
            VariantEffect::Synonymous => 0.10,
            VariantEffect::Utr5
            | VariantEffect::Utr3
            | VariantEffect::NonCodingTranscript
            | VariantEffect::Intronic
            | VariantEffect::Intergenic => 0.0,
        }
    }
}

/// Genotype call of a variant in the (single) sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GenotypeCall {
    /// Homozygous reference.
    HomRef,
    /// Heterozygous.
    Het,
    /// Homozygous alternate.
    HomAlt,
    /// Not called / unknown.
    NoCall,
}

/// One input variant record as written out by the upstream ingest step.
///
/// `chrom` is the textual chromosome name; it is resolved to a chromosome
/// number when the `Variant` is constructed.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantRecord {
    /// Chromosome name, e.g., "chr10" or "10".
    pub chrom: String,
    /// 1-based position.
    pub pos: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternate allele.
    pub alternative: String,
    /// Genotype call string, e.g., "0/1".
    pub genotype: String,
    /// Call quality score.
    pub quality: f32,
    /// Total read coverage at the site.
    pub coverage: i32,
    /// dbSNP identifier, if any.
    pub dbsnp_id: Option<String>,
    /// Maximal population frequency in percent, if any.
    pub max_frequency: Option<f32>,
    /// Compatible inheritance modes as written by the upstream pedigree
    /// analysis, e.g., "AD;AR".
    pub modes: Option<String>,
}

/// A single variant call, immutable once constructed.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Variant {
    /// Chromosome number (index into `common::CHROMS`).
    pub chrom_no: u32,
    /// 1-based position.
    pub pos: i32,
    /// Reference allele.
    pub reference: String,
    /// Alternate allele.
    pub alternative: String,
    /// Genotype call string, e.g., "0/1".
    pub genotype: String,
    /// Call quality score.
    pub quality: f32,
    /// Total read coverage at the site.
    pub coverage: i32,
    /// dbSNP identifier, if any (opaque collaborator data).
    pub dbsnp_id: Option<String>,
    /// Maximal population frequency in percent, if any (opaque collaborator
    /// data).
    pub max_frequency: Option<f32>,
    /// Inheritance modes the variant is compatible with, as computed by the
    /// upstream pedigree analysis.
    pub compatible_modes: BTreeSet<ModeOfInheritance>,
}

impl Variant {
    /// Construct from a `VariantRecord`, resolving the chromosome name.
    pub fn from_record(
        record: VariantRecord,
        chrom_map: &indexmap::IndexMap<String, usize>,
    ) -> Result<Self, anyhow::Error> {
        let chrom_no = *chrom_map
            .get(&record.chrom)
            .ok_or_else(|| anyhow::anyhow!("unknown chromosome: {:?}", &record.chrom))?
            as u32;
        let compatible_modes = record
            .modes
            .as_deref()
            .unwrap_or("")
            .split(';')
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<ModeOfInheritance>()
                    .map_err(|e| anyhow::anyhow!("could not parse mode {:?}: {}", s, e))
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            chrom_no,
            pos: record.pos,
            reference: record.reference,
            alternative: record.alternative,
            genotype: record.genotype,
            quality: record.quality,
            coverage: record.coverage,
            dbsnp_id: record.dbsnp_id,
            max_frequency: record.max_frequency,
            compatible_modes,
        })
    }

    /// Interpret the genotype string.
    pub fn genotype_call(&self) -> GenotypeCall {
        match strip_gt_leading_slash(&self.genotype) {
            "0/1" | "1/0" | "0|1" | "1|0" => GenotypeCall::Het,
            "1/1" | "1|1" | "1" => GenotypeCall::HomAlt,
            "0/0" | "0|0" | "0" => GenotypeCall::HomRef,
            _ => GenotypeCall::NoCall,
        }
    }

    /// Whether the variant is compatible with the given mode.
    ///
    /// `Any` is compatible when at least one concrete mode is.
    pub fn compatible_with(&self, mode: ModeOfInheritance) -> bool {
        match mode {
            ModeOfInheritance::Any => !self.compatible_modes.is_empty(),
            _ => self.compatible_modes.contains(&mode),
        }
    }

    /// Whether reference and alternate allele are both single bases.
    pub fn is_snv(&self) -> bool {
        self.reference.len() == 1 && self.alternative.len() == 1
    }
}

/// Annotation of one variant against one transcript.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Annotation {
    /// Stable transcript identifier.
    pub transcript_id: String,
    /// Gene symbol of the transcript.
    pub gene_symbol: String,
    /// Numeric gene identifier of the transcript.
    pub gene_id: u32,
    /// Genomic start of the transcript, used for deterministic ordering.
    pub transcript_start: i32,
    /// Functional effects, ordered most severe first.
    pub effects: BTreeSet<VariantEffect>,
    /// Optional HGVS-style description.
    pub hgvs: Option<String>,
}

/// Canonical pathogenicity predictor scores for one variant.
///
/// Each slot is either absent or holds one finite value; sentinel values from
/// the raw predictor rows never reach this structure.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathogenicityData {
    /// SIFT score; lower = more damaging.
    pub sift: Option<f32>,
    /// PolyPhen score; higher = more damaging.
    pub polyphen: Option<f32>,
    /// MutationTaster score; higher = more damaging.
    pub mutation_taster: Option<f32>,
    /// Scaled CADD score; higher = more damaging.
    pub cadd: Option<f32>,
}

impl PathogenicityData {
    /// The most damaging interpretation over all present predictors, with
    /// SIFT polarity inverted, or `None` if no predictor is present.
    pub fn overall_score(&self) -> Option<f32> {
        [
            self.polyphen,
            self.mutation_taster,
            self.cadd,
            self.sift.map(|s| 1.0 - s),
        ]
        .into_iter()
        .flatten()
        .fold(None, |acc: Option<f32>, value| {
            Some(acc.map_or(value, |a| a.max(value)))
        })
    }
}

/// Identifier of a filter stage.
#[derive(
    Clone,
    Copy,
    Debug,
    strum::Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum FilterKind {
    /// Call quality filter.
    #[strum(serialize = "Quality")]
    Quality,
    /// Functional-consequence (exome target) filter.
    #[strum(serialize = "Target")]
    Target,
    /// Population frequency filter.
    #[strum(serialize = "Frequency")]
    Frequency,
    /// Known-variant (dbSNP membership) filter.
    #[strum(serialize = "KnownVariant")]
    KnownVariant,
    /// Pathogenicity score filter.
    #[strum(serialize = "Pathogenicity")]
    Pathogenicity,
    /// Inheritance-compatibility filter.
    #[strum(serialize = "Inheritance")]
    Inheritance,
}

/// Verdict of a filter stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FilterStatus {
    /// The stage passed the variant.
    Pass,
    /// The stage failed the variant.
    Fail,
}

/// Result of evaluating one filter stage for one variant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct FilterResult {
    /// The stage that produced the result.
    pub kind: FilterKind,
    /// Pass/fail verdict.
    pub status: FilterStatus,
    /// Stage-specific score in `[0, 1]`.
    pub score: f32,
}

/// Overall filter status of a variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OverallStatus {
    /// All appended results are PASS.
    Pass,
    /// At least one appended result is FAIL.
    Fail,
    /// No stage has been evaluated; excluded from scoring.
    Unfiltered,
}

/// One variant together with everything the pipeline has attached to it.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariantEvaluation {
    /// The underlying variant call.
    pub variant: Variant,
    /// Annotations against overlapping or neighboring transcripts, ordered
    /// by transcript start then transcript id.
    pub annotations: Vec<Annotation>,
    /// Canonical pathogenicity predictor scores.
    pub pathogenicity: PathogenicityData,
    /// Filter results in stage order; skipped stages append nothing.
    pub filter_results: Vec<FilterResult>,
    /// Per-mode flag whether the variant contributes to its gene's score.
    pub contributes: enum_map::EnumMap<ModeOfInheritance, bool>,
}

impl VariantEvaluation {
    /// Construct for a variant with its annotations.
    pub fn new(variant: Variant, annotations: Vec<Annotation>) -> Self {
        Self {
            variant,
            annotations,
            ..Default::default()
        }
    }

    /// Append one filter result.
    pub fn add_filter_result(&mut self, result: FilterResult) {
        self.filter_results.push(result);
    }

    /// Overall filter status over all appended results.
    pub fn status(&self) -> OverallStatus {
        if self.filter_results.is_empty() {
            OverallStatus::Unfiltered
        } else if self
            .filter_results
            .iter()
            .all(|r| r.status == FilterStatus::Pass)
        {
            OverallStatus::Pass
        } else {
            OverallStatus::Fail
        }
    }

    /// Variant score as the product of all filter scores; failed or
    /// unfiltered variants score zero.
    pub fn variant_score(&self) -> f32 {
        match self.status() {
            OverallStatus::Pass => self
                .filter_results
                .iter()
                .fold(1.0, |acc, r| acc * r.score),
            OverallStatus::Fail | OverallStatus::Unfiltered => 0.0,
        }
    }

    /// The most severe effect over all annotations, if any.
    pub fn most_severe_effect(&self) -> Option<VariantEffect> {
        self.annotations
            .iter()
            .flat_map(|ann| ann.effects.iter().copied())
            .min()
    }

    /// Whether any annotation classifies the variant as missense.
    pub fn is_missense(&self) -> bool {
        self.most_severe_effect()
            .map(|effect| effect.is_missense())
            .unwrap_or(false)
    }

    /// Kinds of the stages that failed the variant, in stage order.
    pub fn failed_filters(&self) -> Vec<FilterKind> {
        self.filter_results
            .iter()
            .filter(|r| r.status == FilterStatus::Fail)
            .map(|r| r.kind)
            .collect()
    }
}

/// Score of one gene under one mode of inheritance.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct GeneScore {
    /// The mode the score was computed under.
    pub mode: ModeOfInheritance,
    /// Numeric gene identifier.
    pub gene_id: u32,
    /// Variant-evidence score aggregated from the contributing variants.
    pub variant_score: f32,
    /// Phenotype score of the gene (opaque collaborator input).
    pub phenotype_score: f32,
    /// Combined score; zero when no variant contributes.
    pub combined_score: f32,
    /// Indices into the gene's evaluations of the contributing variants,
    /// exactly those whose per-mode flag is set.
    pub contributing: Vec<usize>,
}

/// A gene with its variant evaluations and per-mode scores.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gene {
    /// Gene symbol.
    pub symbol: String,
    /// Numeric gene identifier.
    pub gene_id: u32,
    /// The gene's variant evaluations, ordered by coordinate.
    pub variants: Vec<VariantEvaluation>,
    /// One score slot per mode of inheritance; `None` until scored.
    pub scores: enum_map::EnumMap<ModeOfInheritance, Option<GeneScore>>,
}

impl Gene {
    /// Construct an unscored gene.
    pub fn new(symbol: String, gene_id: u32, variants: Vec<VariantEvaluation>) -> Self {
        Self {
            symbol,
            gene_id,
            variants,
            scores: Default::default(),
        }
    }

    /// Combined score under the given mode, zero when unscored.
    pub fn combined_score(&self, mode: ModeOfInheritance) -> f32 {
        self.scores[mode]
            .as_ref()
            .map(|s| s.combined_score)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("0/1", GenotypeCall::Het)]
    #[case("1|0", GenotypeCall::Het)]
    #[case("1/1", GenotypeCall::HomAlt)]
    #[case("0/0", GenotypeCall::HomRef)]
    #[case("/0/1", GenotypeCall::Het)]
    #[case("./.", GenotypeCall::NoCall)]
    fn genotype_call(#[case] genotype: &str, #[case] expected: GenotypeCall) {
        let variant = Variant {
            genotype: genotype.to_string(),
            ..Default::default()
        };
        assert_eq!(variant.genotype_call(), expected);
    }

    #[rstest]
    #[case("AD", ModeOfInheritance::AutosomalDominant)]
    #[case("AR", ModeOfInheritance::AutosomalRecessive)]
    #[case("XL", ModeOfInheritance::XLinked)]
    #[case("MT", ModeOfInheritance::Mitochondrial)]
    fn mode_of_inheritance_from_str(#[case] token: &str, #[case] expected: ModeOfInheritance) {
        assert_eq!(token.parse::<ModeOfInheritance>().unwrap(), expected);
    }

    #[test]
    fn variant_from_record_resolves_chrom_and_modes() -> Result<(), anyhow::Error> {
        let chrom_map = crate::common::build_chrom_map();
        let record = VariantRecord {
            chrom: "chr10".to_string(),
            pos: 123_353_297,
            reference: "G".to_string(),
            alternative: "C".to_string(),
            genotype: "0/1".to_string(),
            quality: 2.2,
            coverage: 30,
            modes: Some("AD;AR".to_string()),
            ..Default::default()
        };

        let variant = Variant::from_record(record, &chrom_map)?;

        assert_eq!(variant.chrom_no, 9);
        assert!(variant.compatible_with(ModeOfInheritance::AutosomalDominant));
        assert!(variant.compatible_with(ModeOfInheritance::AutosomalRecessive));
        assert!(variant.compatible_with(ModeOfInheritance::Any));
        assert!(!variant.compatible_with(ModeOfInheritance::XLinked));

        Ok(())
    }

    #[test]
    fn variant_from_record_rejects_unknown_chrom() {
        let chrom_map = crate::common::build_chrom_map();
        let record = VariantRecord {
            chrom: "chr42".to_string(),
            ..Default::default()
        };

        assert!(Variant::from_record(record, &chrom_map).is_err());
    }

    #[test]
    fn empty_compatible_modes_is_incompatible_with_any() {
        let variant = Variant::default();
        assert!(!variant.compatible_with(ModeOfInheritance::Any));
    }

    #[test]
    fn overall_status_and_variant_score() {
        let mut evaluation = VariantEvaluation::default();
        assert_eq!(evaluation.status(), OverallStatus::Unfiltered);
        assert_eq!(evaluation.variant_score(), 0.0);

        evaluation.add_filter_result(FilterResult::new(
            FilterKind::Quality,
            FilterStatus::Pass,
            0.5,
        ));
        evaluation.add_filter_result(FilterResult::new(
            FilterKind::Frequency,
            FilterStatus::Pass,
            0.8,
        ));
        assert_eq!(evaluation.status(), OverallStatus::Pass);
        assert!(float_cmp::approx_eq!(
            f32,
            evaluation.variant_score(),
            0.4,
            epsilon = 1e-6
        ));

        evaluation.add_filter_result(FilterResult::new(
            FilterKind::Target,
            FilterStatus::Fail,
            0.0,
        ));
        assert_eq!(evaluation.status(), OverallStatus::Fail);
        assert_eq!(evaluation.variant_score(), 0.0);
        assert_eq!(evaluation.failed_filters(), vec![FilterKind::Target]);
    }

    #[test]
    fn most_severe_effect_orders_effects() {
        let mut evaluation = VariantEvaluation::default();
        evaluation.annotations.push(Annotation {
            transcript_id: "tx1".to_string(),
            gene_symbol: "GENE1".to_string(),
            gene_id: 1,
            transcript_start: 100,
            effects: [VariantEffect::Synonymous, VariantEffect::SpliceRegion]
                .into_iter()
                .collect(),
            hgvs: None,
        });

        assert_eq!(
            evaluation.most_severe_effect(),
            Some(VariantEffect::SpliceRegion)
        );
        assert!(!evaluation.is_missense());
    }

    #[rstest]
    #[case(None, None, None, None, None)]
    #[case(Some(0.1), None, None, None, Some(0.9))]
    #[case(Some(0.1), Some(0.5), None, None, Some(0.9))]
    #[case(None, Some(0.5), Some(0.7), Some(0.3), Some(0.7))]
    fn pathogenicity_overall_score(
        #[case] sift: Option<f32>,
        #[case] polyphen: Option<f32>,
        #[case] mutation_taster: Option<f32>,
        #[case] cadd: Option<f32>,
        #[case] expected: Option<f32>,
    ) {
        let data = PathogenicityData {
            sift,
            polyphen,
            mutation_taster,
            cadd,
        };
        match (data.overall_score(), expected) {
            (Some(actual), Some(expected)) => {
                assert!(float_cmp::approx_eq!(f32, actual, expected, epsilon = 1e-6))
            }
            (actual, expected) => assert_eq!(actual, expected),
        }
    }
}
