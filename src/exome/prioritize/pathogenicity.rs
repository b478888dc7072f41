//! Aggregation of raw pathogenicity predictor rows into one canonical
//! `PathogenicityData` per variant.

use std::{collections::HashMap, path::Path, time::Instant};

use crate::common::{build_chrom_map, io::open_read_maybe_gz};

use super::schema::{PathogenicityData, VariantEvaluation};

/// Sentinel marking a predictor slot the upstream data build never wrote.
pub const UNINITIALIZED_SCORE: f32 = -5.0;
/// Sentinel marking a predictor value the upstream data build could not
/// parse.
pub const NOPARSE_SCORE: f32 = -6.0;

/// One raw predictor reading; four optional fields in fixed order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictorRow {
    /// Raw SIFT value.
    pub sift: Option<f32>,
    /// Raw PolyPhen value.
    pub polyphen: Option<f32>,
    /// Raw MutationTaster value.
    pub mutation_taster: Option<f32>,
    /// Raw scaled CADD value.
    pub cadd: Option<f32>,
}

/// Query contract of the predictor-row source.
pub trait PredictorStore: Send + Sync {
    /// Return all raw rows for the given allele.
    ///
    /// # Errors
    ///
    /// Returns an error on connectivity or query problems; callers recover
    /// by treating the result as zero rows.
    fn lookup(
        &self,
        chrom_no: u32,
        pos: i32,
        reference: &str,
        alternative: &str,
    ) -> Result<Vec<PredictorRow>, anyhow::Error>;
}

/// One predictor record as read from the predictor TSV file.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct PredictorFileRecord {
    /// Chromosome name.
    chrom: String,
    /// 1-based position.
    pos: i32,
    /// Reference allele.
    reference: String,
    /// Alternate allele.
    alternative: String,
    /// Raw SIFT value.
    sift: Option<f32>,
    /// Raw PolyPhen value.
    polyphen: Option<f32>,
    /// Raw MutationTaster value.
    mutation_taster: Option<f32>,
    /// Raw scaled CADD value.
    cadd: Option<f32>,
}

/// In-memory predictor store backed by a TSV file.
#[derive(Debug, Default)]
pub struct TsvPredictorStore {
    /// Rows by (chromosome number, position, reference, alternative).
    rows: HashMap<(u32, i32, String, String), Vec<PredictorRow>>,
}

impl PredictorStore for TsvPredictorStore {
    fn lookup(
        &self,
        chrom_no: u32,
        pos: i32,
        reference: &str,
        alternative: &str,
    ) -> Result<Vec<PredictorRow>, anyhow::Error> {
        Ok(self
            .rows
            .get(&(chrom_no, pos, reference.to_string(), alternative.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Load the predictor store from a (maybe gzipped) TSV file.
#[tracing::instrument]
pub fn load_predictor_store(path: &Path) -> Result<TsvPredictorStore, anyhow::Error> {
    tracing::debug!("loading predictor records from {:?}...", path);

    let before_loading = Instant::now();
    let chrom_map = build_chrom_map();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);

    let mut result = TsvPredictorStore::default();
    let mut total_count = 0;
    for record in reader.deserialize() {
        let record: PredictorFileRecord = record?;
        let chrom_no = *chrom_map
            .get(&record.chrom)
            .ok_or_else(|| anyhow::anyhow!("unknown chromosome: {:?}", &record.chrom))?
            as u32;
        result
            .rows
            .entry((chrom_no, record.pos, record.reference, record.alternative))
            .or_default()
            .push(PredictorRow {
                sift: record.sift,
                polyphen: record.polyphen,
                mutation_taster: record.mutation_taster,
                cadd: record.cadd,
            });
        total_count += 1;
    }
    tracing::debug!(
        "... done loading {} records in {:?}",
        total_count,
        before_loading.elapsed(),
    );

    Ok(result)
}

/// Whether a raw predictor value is a usable observation.
fn is_valid(value: f32) -> bool {
    value.is_finite() && value != UNINITIALIZED_SCORE && value != NOPARSE_SCORE
}

/// Fold the given slot over all rows, keeping the extreme selected by
/// `pick`.
fn fold_slot(
    rows: &[PredictorRow],
    slot: impl Fn(&PredictorRow) -> Option<f32>,
    pick: impl Fn(f32, f32) -> f32,
) -> Option<f32> {
    rows.iter()
        .filter_map(&slot)
        .filter(|&value| is_valid(value))
        .fold(None, |acc, value| {
            Some(acc.map_or(value, |a| pick(a, value)))
        })
}

/// Combine raw predictor rows into one canonical record.
///
/// Multiple rows arise from alternate-transcript-specific predictions for
/// the same variant; without transcript-tissue context the most pessimistic
/// value per predictor is kept: the minimum for SIFT (lower = more
/// damaging), the maximum for the rest. A kind with no valid observation
/// stays absent.
pub fn aggregate_rows(rows: &[PredictorRow]) -> PathogenicityData {
    PathogenicityData {
        sift: fold_slot(rows, |r| r.sift, f32::min),
        polyphen: fold_slot(rows, |r| r.polyphen, f32::max),
        mutation_taster: fold_slot(rows, |r| r.mutation_taster, f32::max),
        cadd: fold_slot(rows, |r| r.cadd, f32::max),
    }
}

/// Produce the canonical pathogenicity record for one evaluated variant.
///
/// Non-missense variants short-circuit to an all-absent record without
/// consulting the store; they are assigned a fixed score downstream. Store
/// failures are logged and degrade to "no data".
pub fn pathogenicity_data(
    evaluation: &VariantEvaluation,
    store: &dyn PredictorStore,
) -> PathogenicityData {
    if !evaluation.is_missense() {
        return PathogenicityData::default();
    }

    let variant = &evaluation.variant;
    match store.lookup(
        variant.chrom_no,
        variant.pos,
        &variant.reference,
        &variant.alternative,
    ) {
        Ok(rows) => aggregate_rows(&rows),
        Err(e) => {
            tracing::warn!(
                "pathogenicity lookup failed for {}:{}{}>{}: {}; continuing without predictor data",
                crate::common::chrom_name(variant.chrom_no),
                variant.pos,
                &variant.reference,
                &variant.alternative,
                e
            );
            PathogenicityData::default()
        }
    }
}
