// pipeline.rs - Runs a validated trimming plan over one alignment

use serde::Serialize;

use super::alignment::AlignmentMatrix;
use super::conservation::ConservationStatistics;
use super::gaps::GapStatistics;
use super::method::{AutomatedChoice, SequenceSelection, StrictVariant, TrimMethod, TrimPlan};
use super::similarity::SimilarityMatrix;
use super::trimming::TrimmingEngine;
use super::window::{apply_window, check_half_width};
use crate::error::{Result, TrimError};

/// External data some methods need
#[derive(Debug, Clone, Copy, Default)]
pub struct TrimInputs<'a> {
    pub similarity: Option<&'a SimilarityMatrix>,
    /// Per-column consistency of the alignment against a compare-set
    pub consistency: Option<&'a [f64]>,
}

/// Trimmed alignment plus the decisions taken on the way
#[derive(Debug, Clone)]
pub struct TrimOutcome {
    pub matrix: AlignmentMatrix,
    pub summary: TrimSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrimSummary {
    pub sequences_before: usize,
    pub columns_before: usize,
    pub sequences_after: usize,
    pub columns_after: usize,
    pub automated_choice: Option<AutomatedChoice>,
    pub cluster_threshold: Option<f64>,
}

/// Apply sequence selection, the column method, terminal-only restoration
/// and the complementary flips, in that order.
pub fn run_trim(matrix: &AlignmentMatrix, plan: &TrimPlan, inputs: &TrimInputs<'_>) -> Result<TrimOutcome> {
    let mut summary = TrimSummary {
        sequences_before: matrix.sequence_count(),
        columns_before: matrix.column_count(),
        ..TrimSummary::default()
    };

    let selected = match &plan.sequences {
        None => matrix.clone(),
        Some(selection) => {
            log::info!("Sequence selection: {}", selection.description());
            let picked = select_sequences(matrix, selection, plan, &mut summary)?;
            TrimmingEngine::new(&picked)
                .with_keep_sequences(plan.keep_sequences)
                .clean_no_all_gaps()?
        }
    };

    let engine = TrimmingEngine::new(&selected)
        .with_block_size(plan.block_size)
        .with_keep_sequences(plan.keep_sequences);

    let mut trimmed = match &plan.method {
        None => selected.clone(),
        Some(method) => {
            log::info!("Column trimming: {}", method.description());
            apply_method(&engine, method, plan, inputs, &mut summary)?
        }
    };

    if plan.terminal_only {
        trimmed = engine.terminal_only(&trimmed, plan.boundaries)?;
    }
    if plan.complementary_columns {
        trimmed = trimmed.complement(&selected, true, false);
    }

    summary.sequences_after = trimmed.sequence_count();
    summary.columns_after = trimmed.column_count();
    log::info!(
        "Trimmed {}x{} to {}x{} (sequences x columns)",
        summary.sequences_before,
        summary.columns_before,
        summary.sequences_after,
        summary.columns_after
    );

    Ok(TrimOutcome {
        matrix: trimmed,
        summary,
    })
}

fn select_sequences(
    matrix: &AlignmentMatrix,
    selection: &SequenceSelection,
    plan: &TrimPlan,
    summary: &mut TrimSummary,
) -> Result<AlignmentMatrix> {
    let engine = TrimmingEngine::new(matrix)
        .with_keep_sequences(plan.keep_sequences)
        .with_complementary(plan.complementary_sequences);

    match selection {
        SequenceSelection::Clusters(clusters) => {
            let threshold = engine.cut_point_clusters(*clusters)?;
            summary.cluster_threshold = Some(threshold);
            engine.get_clustering(threshold)
        }
        SequenceSelection::MaxIdentity(threshold) => {
            summary.cluster_threshold = Some(*threshold);
            engine.get_clustering(*threshold)
        }
        SequenceSelection::Remove(indices) => engine.remove_sequences(indices),
        SequenceSelection::Spurious {
            residue_overlap,
            sequence_overlap,
        } => engine.clean_spurious_sequences(*residue_overlap, *sequence_overlap),
    }
}

fn gap_statistics<'m>(matrix: &'m AlignmentMatrix, plan: &TrimPlan) -> Result<GapStatistics<'m>> {
    let mut gaps = GapStatistics::compute(matrix)?;
    gaps.apply_window(plan.gap_window)?;
    Ok(gaps)
}

fn conservation_statistics<'m>(
    matrix: &'m AlignmentMatrix,
    similarity: Option<&'m SimilarityMatrix>,
    gaps: &GapStatistics<'_>,
    plan: &TrimPlan,
) -> Result<ConservationStatistics<'m>> {
    let similarity = similarity.ok_or_else(|| {
        TrimError::precondition("this trimming method needs a similarity matrix")
    })?;
    let mut conservation = ConservationStatistics::new(matrix).with_similarity(similarity);
    conservation.compute(Some(gaps))?;
    conservation.apply_window(plan.similarity_window)?;
    Ok(conservation)
}

fn apply_method(
    engine: &TrimmingEngine<'_>,
    method: &TrimMethod,
    plan: &TrimPlan,
    inputs: &TrimInputs<'_>,
    summary: &mut TrimSummary,
) -> Result<AlignmentMatrix> {
    let matrix = engine.matrix();
    match method {
        TrimMethod::NoGaps => engine.clean_no_gaps(),
        TrimMethod::NoAllGaps => engine.clean_no_all_gaps(),
        TrimMethod::GappyOut => engine.clean_second_slope(&gap_statistics(matrix, plan)?),
        TrimMethod::Strict | TrimMethod::StrictPlus => {
            let variant = if *method == TrimMethod::Strict {
                StrictVariant::Strict
            } else {
                StrictVariant::StrictPlus
            };
            strict(engine, variant, plan, inputs)
        }
        TrimMethod::Automated => {
            let choice = engine.select_method();
            log::info!("Automated selection chose {:?}", choice);
            summary.automated_choice = Some(choice);
            match choice {
                AutomatedChoice::GappyOut => {
                    engine.clean_second_slope(&gap_statistics(matrix, plan)?)
                }
                AutomatedChoice::Strict => strict(engine, StrictVariant::Strict, plan, inputs),
            }
        }
        TrimMethod::Gaps {
            conservation_floor,
            gap_threshold,
        } => engine.clean_gaps(*conservation_floor, *gap_threshold, &gap_statistics(matrix, plan)?),
        TrimMethod::Conservation {
            conservation_floor,
            similarity_threshold,
        } => {
            let gaps = gap_statistics(matrix, plan)?;
            let conservation = conservation_statistics(matrix, inputs.similarity, &gaps, plan)?;
            engine.clean_conservation(*conservation_floor, *similarity_threshold, &conservation)
        }
        TrimMethod::GapsAndConservation {
            conservation_floor,
            gap_threshold,
            similarity_threshold,
        } => {
            let gaps = gap_statistics(matrix, plan)?;
            let conservation = conservation_statistics(matrix, inputs.similarity, &gaps, plan)?;
            engine.clean(
                *conservation_floor,
                *gap_threshold,
                *similarity_threshold,
                &gaps,
                &conservation,
            )
        }
        TrimMethod::Consistency {
            conservation_floor,
            consistency_threshold,
            gap_threshold,
            similarity_threshold,
        } => {
            let scores = inputs.consistency.ok_or_else(|| {
                TrimError::precondition("consistency trimming needs compare-set scores")
            })?;
            check_half_width(plan.consistency_window, scores.len())?;
            let scores = apply_window(scores, plan.consistency_window);
            let cut = engine.clean_compare_file(*consistency_threshold, *conservation_floor, &scores)?;

            let second = TrimmingEngine::new(&cut)
                .with_block_size(plan.block_size)
                .with_keep_sequences(plan.keep_sequences);
            match (gap_threshold, similarity_threshold) {
                (None, None) => Ok(cut.clone()),
                (Some(gap_threshold), None) => {
                    second.clean_gaps(*conservation_floor, *gap_threshold, &gap_statistics(&cut, plan)?)
                }
                (None, Some(similarity_threshold)) => {
                    let gaps = gap_statistics(&cut, plan)?;
                    let conservation = conservation_statistics(&cut, inputs.similarity, &gaps, plan)?;
                    second.clean_conservation(*conservation_floor, *similarity_threshold, &conservation)
                }
                (Some(gap_threshold), Some(similarity_threshold)) => {
                    let gaps = gap_statistics(&cut, plan)?;
                    let conservation = conservation_statistics(&cut, inputs.similarity, &gaps, plan)?;
                    second.clean(
                        *conservation_floor,
                        *gap_threshold,
                        *similarity_threshold,
                        &gaps,
                        &conservation,
                    )
                }
            }
        }
        TrimMethod::SelectColumns(indices) => engine.remove_columns(indices),
    }
}

fn strict(
    engine: &TrimmingEngine<'_>,
    variant: StrictVariant,
    plan: &TrimPlan,
    inputs: &TrimInputs<'_>,
) -> Result<AlignmentMatrix> {
    let matrix = engine.matrix();
    let gaps = gap_statistics(matrix, plan)?;
    let conservation = conservation_statistics(matrix, inputs.similarity, &gaps, plan)?;
    engine.clean_comb_methods(variant, &plan.strict, &gaps, &conservation)
}
