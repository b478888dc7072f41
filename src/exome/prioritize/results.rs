//! Selection and ordering of scored genes for output.

use strum::IntoEnumIterator;

use super::schema::{AnalysisMode, Gene, ModeOfInheritance};

/// Select and order the genes to report.
///
/// In `PassOnly` mode, genes without a contributing variant under the
/// requested mode are dropped, the surviving genes are pruned to their
/// contributing variants (with the contributing indices remapped), and
/// the score slots of all other modes are cleared. In `Full` mode every
/// gene and variant is retained.
///
/// The result is ordered by descending combined score under the requested
/// mode, ties broken by gene symbol.
pub fn select(mut genes: Vec<Gene>, analysis_mode: AnalysisMode, mode: ModeOfInheritance) -> Vec<Gene> {
    if analysis_mode == AnalysisMode::PassOnly {
        genes.retain(|gene| {
            gene.scores[mode]
                .as_ref()
                .map(|score| !score.contributing.is_empty())
                .unwrap_or(false)
        });
        for gene in &mut genes {
            prune_to_contributing(gene, mode);
        }
    }

    genes.sort_by(|a, b| {
        b.combined_score(mode)
            .total_cmp(&a.combined_score(mode))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    genes
}

/// Prune a gene to the variants contributing under `mode` and remap the
/// contributing indices accordingly.
fn prune_to_contributing(gene: &mut Gene, mode: ModeOfInheritance) {
    let contributing = gene.scores[mode]
        .as_ref()
        .map(|score| score.contributing.clone())
        .unwrap_or_default();

    let mut keep = contributing.clone();
    keep.sort();

    let mut old_to_new = std::collections::HashMap::new();
    for (new_idx, &old_idx) in keep.iter().enumerate() {
        old_to_new.insert(old_idx, new_idx);
    }

    let mut variants = Vec::with_capacity(keep.len());
    for (idx, evaluation) in std::mem::take(&mut gene.variants).into_iter().enumerate() {
        if old_to_new.contains_key(&idx) {
            variants.push(evaluation);
        }
    }
    gene.variants = variants;

    for other in ModeOfInheritance::iter() {
        if other != mode {
            gene.scores[other] = None;
        }
    }
    if let Some(score) = gene.scores[mode].as_mut() {
        score.contributing = score
            .contributing
            .iter()
            .map(|old_idx| old_to_new[old_idx])
            .collect();
    }
}
