//! Annotation of variants with overlapping transcripts and functional
//! effect classification.

use std::collections::BTreeSet;

use super::schema::{Annotation, Variant, VariantEffect};
use super::transcripts::{Strand, TranscriptIndex, TranscriptModel};

/// Default window for the intergenic neighbor search, in bases.
pub const DEFAULT_NEIGHBOR_WINDOW: i32 = 10_000;

/// Intronic bases on each side of an exon boundary counted as splice region.
const SPLICE_REGION_SIZE: i32 = 2;

/// Errors of the annotation contract.
#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    /// The caller handed no variant; a contract violation, not a recoverable
    /// case.
    #[error("no variant given to annotate")]
    MissingVariant,
    /// The variant's chromosome number is outside the canonical table.
    #[error("chromosome number {0} out of bounds")]
    InvalidChromosome(u32),
}

/// Annotates variants against a shared read-only `TranscriptIndex`.
#[derive(Debug)]
pub struct VariantAnnotator<'a> {
    /// The transcript index to query.
    index: &'a TranscriptIndex,
    /// Window for the intergenic neighbor search.
    neighbor_window: i32,
}

impl<'a> VariantAnnotator<'a> {
    /// Construct with the given index and neighbor search window.
    pub fn new(index: &'a TranscriptIndex, neighbor_window: i32) -> Self {
        Self {
            index,
            neighbor_window,
        }
    }

    /// Annotate the variant against all overlapping transcripts.
    ///
    /// With no overlap, the nearest neighboring transcript on each flank
    /// within the search window yields one `Intergenic` annotation each.
    /// With no neighbor either, the result is empty; this is a valid
    /// outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns `AnnotationError::MissingVariant` if `variant` is `None`.
    pub fn annotate(
        &self,
        variant: Option<&Variant>,
    ) -> Result<Vec<Annotation>, AnnotationError> {
        let variant = variant.ok_or(AnnotationError::MissingVariant)?;
        if variant.chrom_no as usize >= crate::common::CHROMS.len() {
            return Err(AnnotationError::InvalidChromosome(variant.chrom_no));
        }

        let overlapping = self.index.overlapping(variant.chrom_no, variant.pos);
        if !overlapping.is_empty() {
            return Ok(overlapping
                .into_iter()
                .map(|tx| self.annotate_transcript(variant, tx))
                .collect());
        }

        let neighbors = self
            .index
            .neighbors(variant.chrom_no, variant.pos, self.neighbor_window);
        Ok(neighbors
            .into_iter()
            .map(|tx| Annotation {
                transcript_id: tx.id.clone(),
                gene_symbol: tx.gene_symbol.clone(),
                gene_id: tx.gene_id,
                transcript_start: tx.start,
                effects: BTreeSet::from([VariantEffect::Intergenic]),
                hgvs: None,
            })
            .collect())
    }

    /// Classify the variant on one overlapping transcript.
    fn annotate_transcript(&self, variant: &Variant, tx: &TranscriptModel) -> Annotation {
        let (effects, hgvs) = classify(variant, tx);
        Annotation {
            transcript_id: tx.id.clone(),
            gene_symbol: tx.gene_symbol.clone(),
            gene_id: tx.gene_id,
            transcript_start: tx.start,
            effects,
            hgvs,
        }
    }
}

/// Classify the functional effect of a variant known to overlap the
/// transcript interval.
fn classify(
    variant: &Variant,
    tx: &TranscriptModel,
) -> (BTreeSet<VariantEffect>, Option<String>) {
    let pos = variant.pos;

    if tx.exon_at(pos).is_none() {
        // Intronic; check the distance to the flanking exon boundaries.
        let near_boundary = tx
            .exon_starts
            .iter()
            .chain(tx.exon_ends.iter())
            .any(|&boundary| (pos - boundary).abs() <= SPLICE_REGION_SIZE);
        let effect = if near_boundary {
            VariantEffect::SpliceRegion
        } else {
            VariantEffect::Intronic
        };
        return (BTreeSet::from([effect]), None);
    }

    let Some((cds_start, cds_end)) = tx.cds else {
        return (BTreeSet::from([VariantEffect::NonCodingTranscript]), None);
    };

    if pos < cds_start || pos > cds_end {
        let upstream_of_cds = pos < cds_start;
        let effect = match (upstream_of_cds, tx.strand) {
            (true, Strand::Forward) | (false, Strand::Reverse) => VariantEffect::Utr5,
            (false, Strand::Forward) | (true, Strand::Reverse) => VariantEffect::Utr3,
        };
        return (BTreeSet::from([effect]), None);
    }

    if variant.reference.len() != variant.alternative.len() {
        let delta =
            (variant.alternative.len() as i64 - variant.reference.len() as i64).unsigned_abs();
        let effect = if delta % 3 == 0 {
            VariantEffect::InframeIndel
        } else {
            VariantEffect::Frameshift
        };
        let hgvs = cds_position(tx, pos).map(|cds_pos| {
            format!(
                "{}:{}:c.{}delins{}",
                tx.gene_symbol,
                tx.id,
                cds_pos + 1,
                variant.alternative
            )
        });
        return (BTreeSet::from([effect]), hgvs);
    }

    classify_cds_snv(variant, tx)
}

/// Classify a single-base substitution within the CDS by codon translation.
fn classify_cds_snv(
    variant: &Variant,
    tx: &TranscriptModel,
) -> (BTreeSet<VariantEffect>, Option<String>) {
    let Some(cds_pos) = cds_position(tx, variant.pos) else {
        // CDS structure and exon table disagree; treat conservatively.
        tracing::warn!(
            "transcript {} has inconsistent CDS structure at {}",
            &tx.id,
            variant.pos
        );
        return (BTreeSet::from([VariantEffect::Missense]), None);
    };

    let (ref_base, alt_base) = match tx.strand {
        Strand::Forward => (
            first_base(&variant.reference),
            first_base(&variant.alternative),
        ),
        Strand::Reverse => (
            complement(first_base(&variant.reference)),
            complement(first_base(&variant.alternative)),
        ),
    };

    let codon_no = cds_pos / 3;
    let offset_in_codon = (cds_pos % 3) as usize;
    let codon_start = (codon_no * 3) as usize;
    let seq = tx.cds_sequence.as_bytes();
    if codon_start + 3 > seq.len() {
        tracing::warn!(
            "transcript {} coding sequence too short for position {}",
            &tx.id,
            variant.pos
        );
        return (BTreeSet::from([VariantEffect::Missense]), None);
    }

    let mut codon = [seq[codon_start], seq[codon_start + 1], seq[codon_start + 2]];
    if codon[offset_in_codon] != ref_base {
        tracing::warn!(
            "transcript {} coding sequence disagrees with reference allele at {}",
            &tx.id,
            variant.pos
        );
    }
    let ref_aa = translate(&codon);
    codon[offset_in_codon] = alt_base;
    let alt_aa = translate(&codon);

    let effect = if ref_aa == alt_aa {
        VariantEffect::Synonymous
    } else if alt_aa == '*' {
        VariantEffect::StopGained
    } else if ref_aa == '*' {
        VariantEffect::StopLost
    } else if codon_no == 0 {
        VariantEffect::StartLost
    } else {
        VariantEffect::Missense
    };

    let hgvs = format!(
        "{}:{}:c.{}{}>{}:p.{}{}{}",
        tx.gene_symbol,
        tx.id,
        cds_pos + 1,
        ref_base as char,
        alt_base as char,
        ref_aa,
        codon_no + 1,
        alt_aa,
    );

    (BTreeSet::from([effect]), Some(hgvs))
}

/// 0-based offset of the genomic position into the coding sequence, in
/// transcript orientation; `None` if the position is not in a coding exon
/// part.
fn cds_position(tx: &TranscriptModel, pos: i32) -> Option<i32> {
    let (cds_start, cds_end) = tx.cds?;
    if pos < cds_start || pos > cds_end {
        return None;
    }

    // Offset in genomic (plus strand) orientation.
    let mut offset = 0;
    let mut found = false;
    for (&exon_start, &exon_end) in tx.exon_starts.iter().zip(tx.exon_ends.iter()) {
        let coding_start = exon_start.max(cds_start);
        let coding_end = exon_end.min(cds_end);
        if coding_start > coding_end {
            continue;
        }
        if pos >= coding_start && pos <= coding_end {
            offset += pos - coding_start;
            found = true;
            break;
        }
        if coding_end < pos {
            offset += coding_end - coding_start + 1;
        }
    }
    if !found {
        return None;
    }

    match tx.strand {
        Strand::Forward => Some(offset),
        Strand::Reverse => {
            let coding_len = tx
                .exon_starts
                .iter()
                .zip(tx.exon_ends.iter())
                .map(|(&s, &e)| {
                    let b = s.max(cds_start);
                    let t = e.min(cds_end);
                    (t - b + 1).max(0)
                })
                .sum::<i32>();
            Some(coding_len - 1 - offset)
        }
    }
}

/// First byte of an allele string, upper-cased.
fn first_base(allele: &str) -> u8 {
    allele.as_bytes().first().copied().unwrap_or(b'N').to_ascii_uppercase()
}

/// Complement of a single base.
fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

/// Translate one codon to a one-letter amino acid code (`*` for stop, `X`
/// for codons with unknown bases).
fn translate(codon: &[u8; 3]) -> char {
    match codon {
        b"TTT" | b"TTC" => 'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => 'L',
        b"ATT" | b"ATC" | b"ATA" => 'I',
        b"ATG" => 'M',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => 'V',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => 'S',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => 'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => 'T',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => 'A',
        b"TAT" | b"TAC" => 'Y',
        b"TAA" | b"TAG" | b"TGA" => '*',
        b"CAT" | b"CAC" => 'H',
        b"CAA" | b"CAG" => 'Q',
        b"AAT" | b"AAC" => 'N',
        b"AAA" | b"AAG" => 'K',
        b"GAT" | b"GAC" => 'D',
        b"GAA" | b"GAG" => 'E',
        b"TGT" | b"TGC" => 'C',
        b"TGG" => 'W',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => 'R',
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => 'G',
        _ => 'X',
    }
}
