//! Transcript models and the chromosome-partitioned interval index over
//! them, loaded once at startup and shared read-only by all queries.

use std::{path::Path, time::Instant};

use bio::data_structures::interval_tree::ArrayBackedIntervalTree;

use crate::common::{build_chrom_map, io::open_read_maybe_gz, CHROMS};

/// Alias for the interval tree that we use.
type IntervalTree = ArrayBackedIntervalTree<i32, u32>;

/// Strand of a transcript.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Strand {
    /// Forward strand.
    #[default]
    #[serde(rename = "+")]
    Forward,
    /// Reverse strand.
    #[serde(rename = "-")]
    Reverse,
}

/// Reference annotation of one transcript's coding structure.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptModel {
    /// Stable transcript identifier.
    pub id: String,
    /// Gene symbol.
    pub gene_symbol: String,
    /// Numeric gene identifier.
    pub gene_id: u32,
    /// Chromosome number (index into `common::CHROMS`).
    pub chrom_no: u32,
    /// 1-based inclusive genomic start.
    pub start: i32,
    /// 1-based inclusive genomic end.
    pub end: i32,
    /// Strand of the transcript.
    pub strand: Strand,
    /// 1-based inclusive exon start positions, ascending.
    pub exon_starts: Vec<i32>,
    /// 1-based inclusive exon end positions, ascending.
    pub exon_ends: Vec<i32>,
    /// 1-based inclusive genomic CDS interval; `None` for non-coding
    /// transcripts.
    pub cds: Option<(i32, i32)>,
    /// Coding sequence in transcript orientation (reverse-complemented for
    /// reverse-strand transcripts); empty for non-coding transcripts.
    pub cds_sequence: String,
}

impl TranscriptModel {
    /// Whether the 1-based position lies within the transcript interval.
    pub fn contains(&self, pos: i32) -> bool {
        pos >= self.start && pos <= self.end
    }

    /// Index of the exon containing the position, if any.
    pub fn exon_at(&self, pos: i32) -> Option<usize> {
        self.exon_starts
            .iter()
            .zip(self.exon_ends.iter())
            .position(|(&start, &end)| pos >= start && pos <= end)
    }
}

/// One transcript record as read from the transcript TSV file.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct TranscriptFileRecord {
    /// Stable transcript identifier.
    id: String,
    /// Gene symbol.
    gene_symbol: String,
    /// Numeric gene identifier.
    gene_id: u32,
    /// Chromosome name.
    chrom: String,
    /// Strand, "+" or "-".
    strand: String,
    /// 1-based inclusive genomic start.
    start: i32,
    /// 1-based inclusive genomic end.
    end: i32,
    /// 1-based inclusive CDS start; empty for non-coding transcripts.
    cds_start: Option<i32>,
    /// 1-based inclusive CDS end; empty for non-coding transcripts.
    cds_end: Option<i32>,
    /// Comma-separated 1-based inclusive exon starts.
    exon_starts: String,
    /// Comma-separated 1-based inclusive exon ends.
    exon_ends: String,
    /// Coding sequence in transcript orientation.
    cds_sequence: Option<String>,
}

/// Immutable, chromosome-partitioned interval structure over transcript
/// models.
#[derive(Debug, Default)]
pub struct TranscriptIndex {
    /// Transcript models, stored by chromosome, ordered by start then id.
    pub transcripts: Vec<Vec<TranscriptModel>>,
    /// Interval trees, stored by chromosome.
    pub trees: Vec<IntervalTree>,
}

impl TranscriptIndex {
    /// Build the index from a collection of transcript models.
    pub fn new(models: Vec<TranscriptModel>) -> Self {
        let mut result = Self::default();
        for _ in CHROMS {
            result.transcripts.push(Vec::new());
            result.trees.push(IntervalTree::new());
        }

        let mut by_chrom: Vec<Vec<TranscriptModel>> = vec![Vec::new(); CHROMS.len()];
        for model in models.into_iter() {
            by_chrom[model.chrom_no as usize].push(model);
        }
        for (chrom_no, mut models) in by_chrom.into_iter().enumerate() {
            models.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
            for model in models.into_iter() {
                let key = (model.start - 1)..model.end;
                result.trees[chrom_no].insert(key, result.transcripts[chrom_no].len() as u32);
                result.transcripts[chrom_no].push(model);
            }
        }
        result.trees.iter_mut().for_each(|tree| tree.index());

        result
    }

    /// Return all transcripts overlapping the 1-based position, ordered by
    /// start then id.
    pub fn overlapping(&self, chrom_no: u32, pos: i32) -> Vec<&TranscriptModel> {
        let mut result = self.trees[chrom_no as usize]
            .find((pos - 1)..pos)
            .iter()
            .map(|cursor| &self.transcripts[chrom_no as usize][*cursor.data() as usize])
            .collect::<Vec<_>>();
        result.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
        result
    }

    /// Return the nearest non-overlapping transcript on each flank within
    /// `window` bases of the 1-based position, ordered by start then id.
    pub fn neighbors(&self, chrom_no: u32, pos: i32, window: i32) -> Vec<&TranscriptModel> {
        let begin = (pos - 1 - window).max(0);
        let end = pos + window;
        let candidates = self.trees[chrom_no as usize]
            .find(begin..end)
            .iter()
            .map(|cursor| &self.transcripts[chrom_no as usize][*cursor.data() as usize])
            .collect::<Vec<_>>();

        let left = candidates
            .iter()
            .filter(|tx| tx.end < pos)
            .copied()
            .max_by(|a, b| {
                (a.end, std::cmp::Reverse(&a.id)).cmp(&(b.end, std::cmp::Reverse(&b.id)))
            });
        let right = candidates
            .iter()
            .filter(|tx| tx.start > pos)
            .copied()
            .min_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));

        let mut result = [left, right].into_iter().flatten().collect::<Vec<_>>();
        result.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
        result
    }
}

/// Load transcript models from a (maybe gzipped) TSV file and build the
/// index.
#[tracing::instrument]
pub fn load_transcripts(path: &Path) -> Result<TranscriptIndex, anyhow::Error> {
    tracing::debug!("loading transcript records from {:?}...", path);

    let before_loading = Instant::now();
    let chrom_map = build_chrom_map();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(open_read_maybe_gz(path)?);

    let mut models = Vec::new();
    for record in reader.deserialize() {
        let record: TranscriptFileRecord = record?;
        let chrom_no = *chrom_map
            .get(&record.chrom)
            .ok_or_else(|| anyhow::anyhow!("unknown chromosome: {:?}", &record.chrom))?
            as u32;
        let strand = match record.strand.as_str() {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => anyhow::bail!("invalid strand: {:?}", &record.strand),
        };
        let cds = match (record.cds_start, record.cds_end) {
            (Some(start), Some(end)) => Some((start, end)),
            (None, None) => None,
            _ => anyhow::bail!("transcript {:?} has half-open CDS interval", &record.id),
        };
        models.push(TranscriptModel {
            id: record.id,
            gene_symbol: record.gene_symbol,
            gene_id: record.gene_id,
            chrom_no,
            start: record.start,
            end: record.end,
            strand,
            exon_starts: parse_position_list(&record.exon_starts)?,
            exon_ends: parse_position_list(&record.exon_ends)?,
            cds,
            cds_sequence: record.cds_sequence.unwrap_or_default(),
        });
    }

    let total_count = models.len();
    let result = TranscriptIndex::new(models);
    tracing::debug!(
        "... done loading {} transcripts and building trees in {:?}",
        total_count,
        before_loading.elapsed(),
    );

    Ok(result)
}

/// Parse a comma-separated list of positions.
fn parse_position_list(text: &str) -> Result<Vec<i32>, anyhow::Error> {
    text.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i32>()
                .map_err(|e| anyhow::anyhow!("could not parse position {:?}: {}", s, e))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Single-exon forward-strand transcript with the full interval coding.
    pub(crate) fn simple_transcript(
        id: &str,
        gene_symbol: &str,
        gene_id: u32,
        chrom_no: u32,
        start: i32,
        end: i32,
    ) -> TranscriptModel {
        TranscriptModel {
            id: id.to_string(),
            gene_symbol: gene_symbol.to_string(),
            gene_id,
            chrom_no,
            start,
            end,
            strand: Strand::Forward,
            exon_starts: vec![start],
            exon_ends: vec![end],
            cds: Some((start, end)),
            cds_sequence: "ATG".repeat(((end - start + 1) / 3) as usize),
        }
    }

    #[test]
    fn overlapping_finds_and_orders_transcripts() {
        let index = TranscriptIndex::new(vec![
            simple_transcript("tx-b", "GENE1", 1, 0, 100, 300),
            simple_transcript("tx-a", "GENE1", 1, 0, 100, 300),
            simple_transcript("tx-c", "GENE2", 2, 0, 200, 400),
            simple_transcript("tx-d", "GENE3", 3, 1, 100, 300),
        ]);

        let hits = index.overlapping(0, 250);
        let ids = hits.iter().map(|tx| tx.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["tx-a", "tx-b", "tx-c"]);

        assert_eq!(index.overlapping(0, 350).len(), 1);
        assert_eq!(index.overlapping(2, 250).len(), 0);
    }

    #[test]
    fn neighbors_picks_nearest_on_each_flank() {
        let index = TranscriptIndex::new(vec![
            simple_transcript("tx-left-far", "GENE1", 1, 0, 100, 200),
            simple_transcript("tx-left-near", "GENE2", 2, 0, 300, 400),
            simple_transcript("tx-right-near", "GENE3", 3, 0, 600, 700),
            simple_transcript("tx-right-far", "GENE4", 4, 0, 800, 900),
        ]);

        let hits = index.neighbors(0, 500, 10_000);
        let ids = hits.iter().map(|tx| tx.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["tx-left-near", "tx-right-near"]);
    }

    #[test]
    fn neighbors_respects_window() {
        let index = TranscriptIndex::new(vec![simple_transcript(
            "tx", "GENE1", 1, 0, 100, 200,
        )]);

        assert_eq!(index.neighbors(0, 500, 1_000).len(), 1);
        assert_eq!(index.neighbors(0, 500, 100).len(), 0);
    }

    #[test]
    fn exon_at_locates_exons() {
        let tx = TranscriptModel {
            exon_starts: vec![100, 300],
            exon_ends: vec![200, 400],
            ..Default::default()
        };

        assert_eq!(tx.exon_at(150), Some(0));
        assert_eq!(tx.exon_at(350), Some(1));
        assert_eq!(tx.exon_at(250), None);
    }
}
