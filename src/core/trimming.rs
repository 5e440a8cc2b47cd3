// trimming.rs - Column and sequence trimming over save-arrays

use std::cmp::Ordering;

use super::alignment::{AlignmentMatrix, GAP};
use super::conservation::ConservationStatistics;
use super::gaps::GapStatistics;
use super::method::{AutomatedChoice, StrictParams, StrictVariant};
use crate::error::{Result, TrimError};

/// Identity thresholds of the automated heuristic
const AUTOMATED_GAPPYOUT_IDENTITY: f64 = 0.55;
const AUTOMATED_STRICT_IDENTITY: f64 = 0.38;
const AUTOMATED_SMALL_ALIGNMENT: usize = 20;
const AUTOMATED_MAX_IDENTITY_RANGE: (f64, f64) = (0.5, 0.65);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Columns,
    Sequences,
}

/// Produces trimmed copies of one alignment.
///
/// Every method reads the source save-arrays, never modifies the source and
/// returns a new matrix. Statistics handed to a method must have been
/// computed on the same source matrix.
#[derive(Debug, Clone)]
pub struct TrimmingEngine<'a> {
    matrix: &'a AlignmentMatrix,
    block_size: usize,
    keep_sequences: bool,
    complementary: bool,
}

impl<'a> TrimmingEngine<'a> {
    pub fn new(matrix: &'a AlignmentMatrix) -> Self {
        Self {
            matrix,
            block_size: 0,
            keep_sequences: false,
            complementary: false,
        }
    }

    /// Drop surviving column runs shorter than `block_size` after a cut
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Keep sequences left with only gaps
    pub fn with_keep_sequences(mut self, keep: bool) -> Self {
        self.keep_sequences = keep;
        self
    }

    /// Return the discarded part instead of the kept one
    pub fn with_complementary(mut self, complementary: bool) -> Self {
        self.complementary = complementary;
        self
    }

    pub fn matrix(&self) -> &'a AlignmentMatrix {
        self.matrix
    }

    fn ensure_bound(&self, other: &AlignmentMatrix, what: &str) -> Result<()> {
        if std::ptr::eq(self.matrix, other) {
            Ok(())
        } else {
            Err(TrimError::precondition(format!(
                "{} were computed on a different alignment",
                what
            )))
        }
    }

    fn ensure_length(&self, values: &[f64], what: &str) -> Result<()> {
        let expected = self.matrix.original_column_count();
        if values.len() == expected {
            Ok(())
        } else {
            Err(TrimError::precondition(format!(
                "{} has {} values for {} columns",
                what,
                values.len(),
                expected
            )))
        }
    }

    /// All-gap cleanup and the complementary flip shared by every method.
    ///
    /// The cleanup never leaves fewer than `column_floor` columns.
    fn finish(
        &self,
        mut result: AlignmentMatrix,
        selection: Selection,
        drop_all_gaps: bool,
        column_floor: usize,
    ) -> AlignmentMatrix {
        if drop_all_gaps {
            if !self.keep_sequences {
                result.remove_all_gap_sequences();
            }
            result.remove_all_gap_columns_above(column_floor);
        }
        if !self.complementary {
            return result;
        }
        match selection {
            Selection::Columns => result.complement(self.matrix, true, false),
            Selection::Sequences => result.complement(self.matrix, false, true),
        }
    }

    fn finish_columns(&self, column_save: Vec<Option<usize>>, column_floor: usize) -> AlignmentMatrix {
        let result = self
            .matrix
            .derive(column_save, self.matrix.sequence_save_array().to_vec());
        self.finish(result, Selection::Columns, true, column_floor)
    }

    /// Discard surviving runs of fewer than `block` columns
    fn remove_short_blocks(&self, column_save: &mut [Option<usize>], block: usize) {
        if block == 0 {
            return;
        }
        let mut run: Vec<usize> = Vec::new();
        for c in self.matrix.kept_columns() {
            if column_save[c].is_some() {
                run.push(c);
                continue;
            }
            if run.len() < block {
                run.iter().for_each(|&r| column_save[r] = None);
            }
            run.clear();
        }
        if run.len() < block {
            run.iter().for_each(|&r| column_save[r] = None);
        }
    }

    /// Generic column cut.
    ///
    /// `keep` decides every surviving column. When fewer than
    /// `baseline%` of the columns pass, rejected columns are taken back in
    /// `prefer` order (ties by lower index) until the floor is met. The
    /// all-gap cleanup keeps the floor. Short blocks are removed after the
    /// floor is met, so a block size can leave fewer columns than the floor.
    pub fn cut_by_value<K, P>(&self, baseline: f64, keep: K, prefer: P) -> Result<AlignmentMatrix>
    where
        K: Fn(usize) -> bool,
        P: Fn(usize, usize) -> Ordering,
    {
        self.matrix.require_aligned("column trimming")?;

        let mut column_save = self.matrix.column_save_array().to_vec();
        let source: Vec<usize> = self.matrix.kept_columns().collect();
        let mut rejected: Vec<usize> = Vec::new();
        for &c in &source {
            if !keep(c) {
                column_save[c] = None;
                rejected.push(c);
            }
        }

        let kept = source.len() - rejected.len();
        let required = ((source.len() as f64 * baseline / 100.0).ceil() as usize).min(source.len());
        if kept < required {
            rejected.sort_by(|&a, &b| prefer(a, b).then(a.cmp(&b)));
            for &c in rejected.iter().take(required - kept) {
                column_save[c] = Some(c);
            }
        }

        self.remove_short_blocks(&mut column_save, self.block_size);
        Ok(self.finish_columns(column_save, required))
    }

    /// Keep columns whose value does not exceed `cut`
    pub fn clean_by_cut_value_overpass(&self, cut: f64, baseline: f64, values: &[f64]) -> Result<AlignmentMatrix> {
        self.ensure_length(values, "cut vector")?;
        self.cut_by_value(
            baseline,
            |c| values[c] <= cut,
            |a, b| values[a].total_cmp(&values[b]),
        )
    }

    /// Keep columns whose value is above `cut`
    pub fn clean_by_cut_value_fall_behind(&self, cut: f64, baseline: f64, values: &[f64]) -> Result<AlignmentMatrix> {
        self.ensure_length(values, "cut vector")?;
        self.cut_by_value(
            baseline,
            |c| values[c] > cut,
            |a, b| values[b].total_cmp(&values[a]),
        )
    }

    /// Keep columns passing both a gap cut and a conservation cut
    pub fn clean_by_cut_value_overpass_or_equals(
        &self,
        gap_cut: f64,
        gaps: &[f64],
        baseline: f64,
        conservation_cut: f64,
        conservation: &[f64],
    ) -> Result<AlignmentMatrix> {
        self.ensure_length(gaps, "gap vector")?;
        self.ensure_length(conservation, "conservation vector")?;
        self.cut_by_value(
            baseline,
            |c| conservation[c] > conservation_cut && gaps[c] <= gap_cut,
            |a, b| {
                gaps[a]
                    .total_cmp(&gaps[b])
                    .then(conservation[b].total_cmp(&conservation[a]))
            },
        )
    }

    /// Drop columns above the allowed gap fraction, keeping at least `baseline%`
    pub fn clean_gaps(&self, baseline: f64, gap_threshold: f64, gaps: &GapStatistics<'_>) -> Result<AlignmentMatrix> {
        self.ensure_bound(gaps.matrix(), "gap statistics")?;
        let cut = gaps.cut_point(baseline, gap_threshold);
        self.clean_by_cut_value_overpass(cut, baseline, gaps.values())
    }

    /// Drop columns below the conservation cut, keeping at least `baseline%`
    pub fn clean_conservation(
        &self,
        baseline: f64,
        similarity_threshold: f64,
        conservation: &ConservationStatistics<'_>,
    ) -> Result<AlignmentMatrix> {
        self.ensure_bound(conservation.matrix(), "conservation statistics")?;
        self.ensure_computed(conservation)?;
        let cut = conservation.cut_point(baseline, similarity_threshold);
        self.clean_by_cut_value_fall_behind(cut, baseline, conservation.values())
    }

    /// Gap and conservation thresholds together
    pub fn clean(
        &self,
        baseline: f64,
        gap_threshold: f64,
        similarity_threshold: f64,
        gaps: &GapStatistics<'_>,
        conservation: &ConservationStatistics<'_>,
    ) -> Result<AlignmentMatrix> {
        self.ensure_bound(gaps.matrix(), "gap statistics")?;
        self.ensure_bound(conservation.matrix(), "conservation statistics")?;
        self.ensure_computed(conservation)?;
        let gap_cut = gaps.cut_point(baseline, gap_threshold);
        let conservation_cut = conservation.cut_point(baseline, similarity_threshold);
        self.clean_by_cut_value_overpass_or_equals(
            gap_cut,
            gaps.values(),
            baseline,
            conservation_cut,
            conservation.values(),
        )
    }

    fn ensure_computed(&self, conservation: &ConservationStatistics<'_>) -> Result<()> {
        if conservation.is_computed() {
            Ok(())
        } else {
            Err(TrimError::precondition("conservation statistics were not computed"))
        }
    }

    /// Drop columns made only of gaps
    pub fn clean_no_all_gaps(&self) -> Result<AlignmentMatrix> {
        let gaps = GapStatistics::compute(self.matrix)?;
        let limit = self.matrix.sequence_count();
        let counts = gaps.gaps_in_column();
        self.cut_by_value(0.0, |c| counts[c] < limit, |a, b| counts[a].cmp(&counts[b]))
    }

    /// Drop every column with a gap
    pub fn clean_no_gaps(&self) -> Result<AlignmentMatrix> {
        let gaps = GapStatistics::compute(self.matrix)?;
        let counts = gaps.gaps_in_column();
        self.cut_by_value(0.0, |c| counts[c] == 0, |a, b| counts[a].cmp(&counts[b]))
    }

    /// Gappyout: cut at the inflection of the gap distribution
    pub fn clean_second_slope(&self, gaps: &GapStatistics<'_>) -> Result<AlignmentMatrix> {
        self.ensure_bound(gaps.matrix(), "gap statistics")?;
        let cut = gaps.second_slope_cut_point() as f64;
        log::debug!("Gappyout gap cut point: {}", cut);
        self.clean_by_cut_value_overpass(cut, 0.0, gaps.values())
    }

    /// Strict and strictplus.
    ///
    /// The gap cut comes from the second slope and the conservation cut from
    /// a log-scale interpolation between two percentiles of the columns
    /// under the gap cut. Isolated rejected columns are rescued, then short
    /// blocks are dropped.
    pub fn clean_comb_methods(
        &self,
        variant: StrictVariant,
        params: &StrictParams,
        gaps: &GapStatistics<'_>,
        conservation: &ConservationStatistics<'_>,
    ) -> Result<AlignmentMatrix> {
        self.ensure_bound(gaps.matrix(), "gap statistics")?;
        self.ensure_bound(conservation.matrix(), "conservation statistics")?;
        self.ensure_computed(conservation)?;
        self.matrix.require_aligned("column trimming")?;

        let gap_cut = gaps.second_slope_cut_point() as f64;
        let gap_values = gaps.values();
        let mdk = conservation.values();
        let source: Vec<usize> = self.matrix.kept_columns().collect();

        let mut eligible: Vec<f64> = source
            .iter()
            .filter(|&&c| gap_values[c] <= gap_cut)
            .map(|&c| mdk[c])
            .collect();
        eligible.sort_by(|a, b| a.total_cmp(b));
        let similarity_cut = strict_similarity_cut(&eligible, params);
        log::debug!(
            "Strict cut points: gaps {}, similarity {:.6}",
            gap_cut,
            similarity_cut
        );

        let rejected: Vec<bool> = source
            .iter()
            .map(|&c| gap_values[c] > gap_cut || mdk[c] < similarity_cut)
            .collect();
        let rejected = rescue_isolated(&rejected);

        let mut column_save = self.matrix.column_save_array().to_vec();
        for (&c, &drop) in source.iter().zip(&rejected) {
            if drop {
                column_save[c] = None;
            }
        }

        let block = if self.block_size > 0 {
            self.block_size
        } else {
            params.block_size(variant, source.len())
        };
        self.remove_short_blocks(&mut column_save, block);
        Ok(self.finish_columns(column_save, 0))
    }

    /// Pick the automated path from the sequence identity distribution
    pub fn select_method(&self) -> AutomatedChoice {
        let identity = self.matrix.identity_matrix();
        let sequences: Vec<usize> = self.matrix.kept_sequences().collect();
        let n = sequences.len();
        if n < 2 {
            return AutomatedChoice::GappyOut;
        }

        let mut average = 0.0;
        let mut maximum = 0.0;
        for &i in &sequences {
            let mut row_max = 0.0f64;
            let mut row_sum = 0.0;
            for &j in sequences.iter().filter(|&&j| j != i) {
                row_max = row_max.max(identity[i][j]);
                row_sum += identity[i][j];
            }
            average += row_sum / (n - 1) as f64;
            maximum += row_max;
        }
        average /= n as f64;
        maximum /= n as f64;

        let (low, high) = AUTOMATED_MAX_IDENTITY_RANGE;
        let choice = if average >= AUTOMATED_GAPPYOUT_IDENTITY {
            AutomatedChoice::GappyOut
        } else if average <= AUTOMATED_STRICT_IDENTITY {
            AutomatedChoice::Strict
        } else if n <= AUTOMATED_SMALL_ALIGNMENT {
            AutomatedChoice::GappyOut
        } else if (low..=high).contains(&maximum) {
            AutomatedChoice::GappyOut
        } else {
            AutomatedChoice::Strict
        };
        log::debug!(
            "Identity average {:.4}, maximum {:.4}: {:?}",
            average,
            maximum,
            choice
        );
        choice
    }

    /// Keep columns whose consistency is above both `cutpoint` and the floor value
    pub fn clean_compare_file(&self, cutpoint: f64, baseline: f64, scores: &[f64]) -> Result<AlignmentMatrix> {
        self.ensure_length(scores, "consistency vector")?;
        let mut sorted: Vec<f64> = self.matrix.kept_columns().map(|c| scores[c]).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let cut = match sorted.len() {
            0 => cutpoint,
            n => {
                let position = (((n - 1) as f64 * (100.0 - baseline) / 100.0) as usize).min(n - 1);
                cutpoint.min(sorted[position])
            }
        };
        self.clean_by_cut_value_fall_behind(cut, baseline, scores)
    }

    /// Fraction of surviving columns where each sequence agrees with enough others.
    ///
    /// A pair agrees on a column when both residues are equal or both are
    /// valid residues. A column counts when at least
    /// `ceil(overlap * (sequences - 1))` partners agree. Discarded sequences
    /// score zero.
    pub fn spurious_vector(&self, overlap: f64) -> Result<Vec<f64>> {
        self.matrix.require_aligned("spurious sequence detection")?;
        let sequences: Vec<usize> = self.matrix.kept_sequences().collect();
        let columns: Vec<usize> = self.matrix.kept_columns().collect();
        let required = (overlap * sequences.len().saturating_sub(1) as f64).ceil() as usize;

        let mut vector = vec![0.0; self.matrix.original_sequence_count()];
        if columns.is_empty() {
            return Ok(vector);
        }
        for &i in &sequences {
            let supported = columns
                .iter()
                .filter(|&&c| {
                    let own = self.matrix.residue(i, c);
                    let hits = sequences
                        .iter()
                        .filter(|&&k| k != i)
                        .filter(|&&k| {
                            let other = self.matrix.residue(k, c);
                            own == other
                                || (self.matrix.is_valid_residue(own)
                                    && self.matrix.is_valid_residue(other))
                        })
                        .count();
                    hits >= required
                })
                .count();
            vector[i] = supported as f64 / columns.len() as f64;
        }
        Ok(vector)
    }

    /// Drop sequences whose overlap falls below `sequence_overlap`.
    ///
    /// All-gap columns left behind are not removed here.
    pub fn clean_spurious_sequences(&self, residue_overlap: f64, sequence_overlap: f64) -> Result<AlignmentMatrix> {
        let vector = self.spurious_vector(residue_overlap)?;
        let mut sequence_save = self.matrix.sequence_save_array().to_vec();
        for s in self.matrix.kept_sequences() {
            if vector[s] < sequence_overlap {
                sequence_save[s] = None;
            }
        }
        Ok(self.select_sequences(sequence_save))
    }

    /// Apply a sequence save-array without all-gap cleanup
    pub(crate) fn select_sequences(&self, sequence_save: Vec<Option<usize>>) -> AlignmentMatrix {
        let result = self
            .matrix
            .derive(self.matrix.column_save_array().to_vec(), sequence_save);
        self.finish(result, Selection::Sequences, false, 0)
    }

    /// Discard the listed original columns
    pub fn remove_columns(&self, indices: &[usize]) -> Result<AlignmentMatrix> {
        let bound = self.matrix.original_column_count();
        let mut column_save = self.matrix.column_save_array().to_vec();
        for &index in indices {
            if index >= bound {
                return Err(TrimError::OutOfRange { index, bound });
            }
            column_save[index] = None;
        }
        let result = self
            .matrix
            .derive(column_save, self.matrix.sequence_save_array().to_vec());
        Ok(self.finish(result, Selection::Columns, true, 0))
    }

    /// Discard the listed original sequences
    pub fn remove_sequences(&self, indices: &[usize]) -> Result<AlignmentMatrix> {
        let bound = self.matrix.original_sequence_count();
        let mut sequence_save = self.matrix.sequence_save_array().to_vec();
        for &index in indices {
            if index >= bound {
                return Err(TrimError::OutOfRange { index, bound });
            }
            sequence_save[index] = None;
        }
        let result = self
            .matrix
            .derive(self.matrix.column_save_array().to_vec(), sequence_save);
        Ok(self.finish(result, Selection::Sequences, true, 0))
    }

    /// Restore the interior of a trimmed result so only the ends stay trimmed.
    ///
    /// The interior spans from the first to the last column without gaps in
    /// the trimmed sequences, or the explicit `boundaries`. Only columns that
    /// survive in the source are restored.
    pub fn terminal_only(&self, trimmed: &AlignmentMatrix, boundaries: Option<(usize, usize)>) -> Result<AlignmentMatrix> {
        let total = self.matrix.original_column_count();
        if trimmed.original_column_count() != total
            || trimmed.original_sequence_count() != self.matrix.original_sequence_count()
        {
            return Err(TrimError::precondition(
                "terminal-only restoration needs a result derived from the same alignment",
            ));
        }

        let (left, right) = match boundaries {
            Some((left, right)) => {
                if right >= total {
                    return Err(TrimError::OutOfRange {
                        index: right,
                        bound: total,
                    });
                }
                if left >= right {
                    return Err(TrimError::InfeasibleConfig(format!(
                        "left boundary {} must be lower than right boundary {}",
                        left, right
                    )));
                }
                (left, right)
            }
            None => {
                let sequences: Vec<usize> = trimmed.kept_sequences().collect();
                let gap_free =
                    |c: &usize| sequences.iter().all(|&s| self.matrix.residue(s, *c) != GAP);
                let columns: Vec<usize> = self.matrix.kept_columns().collect();
                match (
                    columns.iter().copied().find(gap_free),
                    columns.iter().rev().copied().find(gap_free),
                ) {
                    (Some(left), Some(right)) => (left, right),
                    _ => return Ok(trimmed.clone()),
                }
            }
        };

        let mut column_save = trimmed.column_save_array().to_vec();
        for c in left..=right {
            if self.matrix.is_column_kept(c) {
                column_save[c] = Some(c);
            }
        }
        Ok(trimmed.derive(column_save, trimmed.sequence_save_array().to_vec()))
    }
}

/// Similarity cut of the strict methods from the sorted eligible scores
fn strict_similarity_cut(sorted: &[f64], params: &StrictParams) -> f64 {
    let n = sorted.len();
    let mut upper = 0.0f64;
    let mut lower = 0.0f64;
    for (j, &value) in sorted.iter().rev().enumerate() {
        let percentile = (j + 1) as f64 / n as f64 * 100.0;
        if percentile <= params.upper_percentile {
            upper = value;
        }
        if percentile <= params.lower_percentile {
            lower = value;
        }
    }

    let (start, end) = (upper.log10(), lower.log10());
    let cut = 10f64.powf((start - end) / params.log_divisor + end);
    if cut.is_finite() {
        cut
    } else {
        0.0
    }
}

/// Rescue rejected positions whose neighbourhood is mostly kept.
///
/// Interior positions look two to each side and need at most one rejected
/// neighbour. Positions next to the ends use three neighbours and the ends
/// two; those narrower windows need every neighbour kept. Decisions use the
/// statuses before any rescue.
fn rescue_isolated(rejected: &[bool]) -> Vec<bool> {
    let m = rejected.len();
    let mut result = rejected.to_vec();
    if m < 3 {
        return result;
    }
    let r = |p: usize| rejected[p] as usize;

    for p in 0..m {
        if !rejected[p] {
            continue;
        }
        let rescued = match (m, p) {
            (3, 0) => r(1) + r(2) == 0,
            (3, 1) => r(0) + r(2) == 0,
            (3, _) => r(0) + r(1) == 0,
            (4, 0) => r(1) + r(2) == 0,
            (4, 1) => r(0) + r(2) + r(3) == 0,
            (4, 2) => r(0) + r(1) + r(3) == 0,
            (4, _) => r(1) + r(2) == 0,
            (_, 0) => r(1) + r(2) == 0,
            (_, 1) => r(0) + r(2) + r(3) == 0,
            (_, p) if p == m - 2 => r(m - 4) + r(m - 3) + r(m - 1) == 0,
            (_, p) if p == m - 1 => r(m - 3) + r(m - 2) == 0,
            (_, p) => r(p - 2) + r(p - 1) + r(p + 1) + r(p + 2) <= 1,
        };
        if rescued {
            result[p] = false;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{protein_fixture, PROTEIN_GAPS};
    use crate::core::similarity::SimilarityMatrix;

    fn zero_gap_columns() -> Vec<usize> {
        PROTEIN_GAPS
            .iter()
            .enumerate()
            .filter(|(_, &g)| g == 0)
            .map(|(c, _)| c)
            .collect()
    }

    #[test]
    fn test_overpass_regression() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let trimmed = TrimmingEngine::new(&matrix)
            .clean_by_cut_value_overpass(0.5, 0.5, gaps.values())
            .unwrap();

        let mut expected = vec![12, 13, 14, 19, 20];
        expected.extend(23..=29);
        expected.push(40);
        expected.extend(46..=59);
        assert_eq!(trimmed.column_correspondence(), expected);
        for (i, entry) in trimmed.column_save_array().iter().enumerate() {
            match entry {
                Some(index) => assert_eq!(*index, i),
                None => assert!(!expected.contains(&i)),
            }
        }
        assert_eq!(trimmed.sequence_count(), 6);
    }

    #[test]
    fn test_gap_floor_is_honoured() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let engine = TrimmingEngine::new(&matrix);
        for floor in [10.0, 30.0, 50.0, 70.0, 90.0, 95.0, 100.0] {
            let trimmed = engine.clean_gaps(floor, 0.0, &gaps).unwrap();
            let required = (60.0 * floor / 100.0f64).ceil() as usize;
            assert!(
                trimmed.column_count() >= required,
                "floor {} kept {}",
                floor,
                trimmed.column_count()
            );
        }
    }

    #[test]
    fn test_full_floor_keeps_recovered_all_gap_columns() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let engine = TrimmingEngine::new(&matrix);

        let trimmed = engine.clean_gaps(95.0, 0.0, &gaps).unwrap();
        assert_eq!(trimmed.column_count(), 57);
        assert!(trimmed.is_column_kept(15));
        for c in [16, 17, 30] {
            assert!(!trimmed.is_column_kept(c));
        }

        let trimmed = engine.clean_gaps(100.0, 0.0, &gaps).unwrap();
        assert_eq!(trimmed.column_count(), 60);
    }

    #[test]
    fn test_blocks_apply_after_floor_recovery() {
        let matrix =
            AlignmentMatrix::from_pairs(&[("a", "ACDEFGHI"), ("b", "ACDEFGHI")]).unwrap();
        let values = [0.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];

        // 0 and 2 pass, 1 and 3 are recovered into one run of four
        let trimmed = TrimmingEngine::new(&matrix)
            .with_block_size(4)
            .clean_by_cut_value_overpass(0.0, 50.0, &values)
            .unwrap();
        assert_eq!(trimmed.column_correspondence(), vec![0, 1, 2, 3]);

        let trimmed = TrimmingEngine::new(&matrix)
            .with_block_size(5)
            .clean_by_cut_value_overpass(0.0, 50.0, &values)
            .unwrap();
        assert_eq!(trimmed.column_count(), 0);
    }

    #[test]
    fn test_floor_recovery_prefers_fewest_gaps() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let trimmed = TrimmingEngine::new(&matrix)
            .clean_gaps(50.0, 0.0, &gaps)
            .unwrap();
        // 27 gap-free columns plus the first three single-gap columns
        let mut expected = zero_gap_columns();
        expected.extend([11, 18, 22]);
        expected.sort_unstable();
        assert_eq!(trimmed.column_correspondence(), expected);
    }

    #[test]
    fn test_no_all_gaps_is_idempotent() {
        let matrix = protein_fixture();
        let once = TrimmingEngine::new(&matrix).clean_no_all_gaps().unwrap();
        assert_eq!(once.column_count(), 56);
        for c in [15, 16, 17, 30] {
            assert!(!once.is_column_kept(c));
        }
        let twice = TrimmingEngine::new(&once).clean_no_all_gaps().unwrap();
        assert_eq!(once.column_save_array(), twice.column_save_array());
        assert_eq!(once.sequence_save_array(), twice.sequence_save_array());
    }

    #[test]
    fn test_no_gaps() {
        let matrix = protein_fixture();
        let trimmed = TrimmingEngine::new(&matrix).clean_no_gaps().unwrap();
        assert_eq!(trimmed.column_correspondence(), zero_gap_columns());
    }

    #[test]
    fn test_second_slope() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let trimmed = TrimmingEngine::new(&matrix)
            .clean_second_slope(&gaps)
            .unwrap();
        assert_eq!(trimmed.column_count(), 36);
        assert!(trimmed.kept_columns().all(|c| PROTEIN_GAPS[c] <= 1));
    }

    #[test]
    fn test_short_blocks_are_dropped() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let trimmed = TrimmingEngine::new(&matrix)
            .with_block_size(3)
            .clean_by_cut_value_overpass(0.5, 0.5, gaps.values())
            .unwrap();
        let mut expected = vec![12, 13, 14];
        expected.extend(23..=29);
        expected.extend(46..=59);
        assert_eq!(trimmed.column_correspondence(), expected);
    }

    #[test]
    fn test_complementary_columns() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let kept = TrimmingEngine::new(&matrix)
            .clean_by_cut_value_overpass(0.5, 0.5, gaps.values())
            .unwrap();
        let flipped = TrimmingEngine::new(&matrix)
            .with_complementary(true)
            .clean_by_cut_value_overpass(0.5, 0.5, gaps.values())
            .unwrap();
        assert_eq!(kept.column_count() + flipped.column_count(), 60);
        assert!(flipped.kept_columns().all(|c| !kept.is_column_kept(c)));
    }

    #[test]
    fn test_statistics_from_another_matrix_are_rejected() {
        let matrix = protein_fixture();
        let other = protein_fixture();
        let gaps = GapStatistics::compute(&other).unwrap();
        assert!(matches!(
            TrimmingEngine::new(&matrix).clean_second_slope(&gaps),
            Err(TrimError::Precondition(_))
        ));
        assert!(matches!(
            TrimmingEngine::new(&matrix).clean_by_cut_value_overpass(0.5, 0.0, &[0.0; 3]),
            Err(TrimError::Precondition(_))
        ));
    }

    #[test]
    fn test_uncomputed_conservation_is_rejected() {
        let matrix = protein_fixture();
        let similarity = SimilarityMatrix::default_amino_acid();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        assert!(matches!(
            TrimmingEngine::new(&matrix).clean_comb_methods(
                StrictVariant::Strict,
                &StrictParams::default(),
                &gaps,
                &conservation
            ),
            Err(TrimError::Precondition(_))
        ));
    }

    #[test]
    fn test_strict_regression() {
        let matrix = protein_fixture();
        let similarity = SimilarityMatrix::default_amino_acid();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        conservation.compute(Some(&gaps)).unwrap();
        let engine = TrimmingEngine::new(&matrix);
        let params = StrictParams::default();

        let strict = engine
            .clean_comb_methods(StrictVariant::Strict, &params, &gaps, &conservation)
            .unwrap();
        let mut expected: Vec<usize> = (20..=25).collect();
        expected.extend(47..=59);
        assert_eq!(strict.column_correspondence(), expected);

        // Sixty columns give the minimum variable block of three
        let plus = engine
            .clean_comb_methods(StrictVariant::StrictPlus, &params, &gaps, &conservation)
            .unwrap();
        let mut expected: Vec<usize> = (20..=25).collect();
        expected.extend(38..=40);
        expected.extend(47..=59);
        assert_eq!(plus.column_correspondence(), expected);
    }

    #[test]
    fn test_select_method() {
        let matrix = protein_fixture();
        assert_eq!(
            TrimmingEngine::new(&matrix).select_method(),
            AutomatedChoice::Strict
        );

        let close = AlignmentMatrix::from_pairs(&[
            ("a", "MKVLAAGIVL"),
            ("b", "MKVLAAGIVL"),
            ("c", "MKVLSAGIVL"),
        ])
        .unwrap();
        assert_eq!(
            TrimmingEngine::new(&close).select_method(),
            AutomatedChoice::GappyOut
        );
    }

    #[test]
    fn test_remove_columns() {
        let matrix = protein_fixture();
        let engine = TrimmingEngine::new(&matrix);
        let indices: Vec<usize> = (0..10).collect();
        let trimmed = engine.remove_columns(&indices).unwrap();
        // The four all-gap columns go as well
        assert_eq!(trimmed.column_count(), 46);
        assert!(matches!(
            engine.remove_columns(&[60]),
            Err(TrimError::OutOfRange { index: 60, bound: 60 })
        ));
    }

    #[test]
    fn test_remove_sequences_and_complement() {
        let matrix = protein_fixture();
        let trimmed = TrimmingEngine::new(&matrix).remove_sequences(&[5]).unwrap();
        assert_eq!(trimmed.sequence_count(), 5);
        assert!(!trimmed.is_sequence_kept(5));
        // Only Sequence5 has residues in columns 0..8
        assert!((0..8).all(|c| !trimmed.is_column_kept(c)));

        let flipped = TrimmingEngine::new(&matrix)
            .with_complementary(true)
            .remove_sequences(&[5])
            .unwrap();
        assert_eq!(flipped.sequence_save_array(), &[None, None, None, None, None, Some(5)]);

        assert!(matches!(
            TrimmingEngine::new(&matrix).remove_sequences(&[6]),
            Err(TrimError::OutOfRange { index: 6, bound: 6 })
        ));
    }

    #[test]
    fn test_spurious_sequences() {
        let matrix = AlignmentMatrix::from_pairs(&[
            ("a", "MKVLAAG---"),
            ("b", "MKVLAAG---"),
            ("c", "MKVLSAG---"),
            ("d", "-------WWW"),
        ])
        .unwrap();
        let engine = TrimmingEngine::new(&matrix);
        let vector = engine.spurious_vector(0.5).unwrap();
        assert_eq!(vector[0], 1.0);
        assert_eq!(vector[3], 0.0);

        let trimmed = engine.clean_spurious_sequences(0.5, 0.5).unwrap();
        assert_eq!(trimmed.sequence_save_array(), &[Some(0), Some(1), Some(2), None]);
        // Columns only "d" filled stay until a no-all-gaps pass
        assert_eq!(trimmed.column_count(), 10);
        let cleaned = TrimmingEngine::new(&trimmed).clean_no_all_gaps().unwrap();
        assert_eq!(cleaned.column_count(), 7);
    }

    #[test]
    fn test_terminal_only() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let engine = TrimmingEngine::new(&matrix);
        let trimmed = engine
            .clean_by_cut_value_overpass(0.5, 0.5, gaps.values())
            .unwrap();

        let restored = engine.terminal_only(&trimmed, None).unwrap();
        assert_eq!(restored.column_correspondence(), (12..60).collect::<Vec<_>>());

        let explicit = engine.terminal_only(&trimmed, Some((5, 20))).unwrap();
        assert!((5..=20).all(|c| explicit.is_column_kept(c)));
        assert!(!explicit.is_column_kept(4));

        assert!(matches!(
            engine.terminal_only(&trimmed, Some((20, 5))),
            Err(TrimError::InfeasibleConfig(_))
        ));
        assert!(matches!(
            engine.terminal_only(&trimmed, Some((0, 60))),
            Err(TrimError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_compare_file_cut() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "MKVLA"), ("b", "MKVLA")]).unwrap();
        let scores = [0.9, 0.2, 0.6, 0.4, 1.0];
        let trimmed = TrimmingEngine::new(&matrix)
            .clean_compare_file(0.5, 0.0, &scores)
            .unwrap();
        assert_eq!(trimmed.column_correspondence(), vec![0, 2, 4]);
    }

    #[test]
    fn test_rescue_isolated() {
        let rejected = [false, false, true, false, false, true, true, true, false, false];
        assert_eq!(
            rescue_isolated(&rejected),
            vec![false, false, false, false, false, true, true, true, false, false]
        );
        // Two adjacent rejections each see a single rejected neighbour
        assert_eq!(
            rescue_isolated(&[false, false, false, true, true, false, false, false]),
            vec![false; 8]
        );
        assert_eq!(
            rescue_isolated(&[true, false, false, false, true]),
            vec![false, false, false, false, false]
        );
        assert_eq!(rescue_isolated(&[true, false]), vec![true, false]);
    }

    #[test]
    fn test_strict_similarity_cut() {
        let params = StrictParams::default();
        let values: Vec<f64> = (1..=10).map(|v| v as f64 / 10.0).collect();
        // Top 20% anchor is 0.9, top 80% anchor is 0.3
        let expected = 10f64.powf((0.9f64.log10() - 0.3f64.log10()) / 10.0 + 0.3f64.log10());
        assert!((strict_similarity_cut(&values, &params) - expected).abs() < 1e-12);
        assert_eq!(strict_similarity_cut(&[], &params), 0.0);
    }
}
