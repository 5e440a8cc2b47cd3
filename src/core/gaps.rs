// gaps.rs - Per-column gap statistics and the gap-based cut points

use rayon::prelude::*;

use super::alignment::{AlignmentMatrix, GAP};
use super::window::{apply_window, check_half_width};
use crate::error::Result;

/// Gap counts of one alignment, optionally smoothed by a moving window.
///
/// Counts cover every original column but only the surviving sequences.
/// Histogram-based cut points consider surviving columns only.
#[derive(Debug, Clone)]
pub struct GapStatistics<'a> {
    matrix: &'a AlignmentMatrix,
    gaps_in_column: Vec<usize>,
    values: Vec<f64>,
    half_width: usize,
}

impl<'a> GapStatistics<'a> {
    /// Count gaps per column; fails on unaligned input
    pub fn compute(matrix: &'a AlignmentMatrix) -> Result<Self> {
        matrix.require_aligned("gap statistics")?;

        let sequences: Vec<usize> = matrix.kept_sequences().collect();
        let gaps_in_column: Vec<usize> = (0..matrix.original_column_count())
            .into_par_iter()
            .map(|c| {
                sequences
                    .iter()
                    .filter(|&&s| matrix.residue(s, c) == GAP)
                    .count()
            })
            .collect();
        let values = gaps_in_column.iter().map(|&g| g as f64).collect();

        Ok(Self {
            matrix,
            gaps_in_column,
            values,
            half_width: 0,
        })
    }

    /// Smooth the raw counts. The window always starts from the raw counts.
    pub fn apply_window(&mut self, half_width: usize) -> Result<()> {
        check_half_width(half_width, self.matrix.original_column_count())?;
        let raw: Vec<f64> = self.gaps_in_column.iter().map(|&g| g as f64).collect();
        self.values = apply_window(&raw, half_width);
        self.half_width = half_width;
        Ok(())
    }

    pub fn matrix(&self) -> &'a AlignmentMatrix {
        self.matrix
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Raw gap count per original column
    pub fn gaps_in_column(&self) -> &[usize] {
        &self.gaps_in_column
    }

    /// Windowed gap score per original column (raw counts when no window is set)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Total number of gaps over surviving columns
    pub fn total_gaps(&self) -> usize {
        self.matrix
            .kept_columns()
            .map(|c| self.gaps_in_column[c])
            .sum()
    }

    /// Number of surviving columns per (rounded) gap score, indexed `0..=sequences`
    pub fn histogram(&self) -> Vec<usize> {
        let sequences = self.matrix.sequence_count();
        let mut histogram = vec![0usize; sequences + 1];
        for c in self.matrix.kept_columns() {
            let bucket = (self.values[c].round() as usize).min(sequences);
            histogram[bucket] += 1;
        }
        histogram
    }

    /// Highest non-empty histogram bucket
    pub fn max_gaps(&self) -> usize {
        self.histogram()
            .iter()
            .rposition(|&count| count > 0)
            .unwrap_or(0)
    }

    /// Gap score cut combining a gap-fraction threshold with a column floor.
    ///
    /// `baseline` is the percentage of columns to keep at minimum and
    /// `gap_fraction` the largest fraction of gaps a column may carry. The
    /// floor cut is the interpolated gap count at which the cumulative
    /// histogram reaches `baseline%` of the columns; the larger cut wins.
    pub fn cut_point(&self, baseline: f64, gap_fraction: f64) -> f64 {
        let sequences = self.matrix.sequence_count() as f64;
        let columns = self.matrix.column_count();
        let threshold_cut = sequences * gap_fraction;

        let minimum = ((columns as f64 * baseline / 100.0).round() as usize).min(columns);
        let histogram = self.histogram();

        let mut accumulated = 0usize;
        let mut bucket = 0usize;
        for (gaps, count) in histogram.iter().enumerate() {
            bucket = gaps;
            accumulated += count;
            if accumulated >= minimum {
                break;
            }
        }

        let floor_cut = if histogram[bucket] > 0 {
            bucket as f64 - (accumulated - minimum) as f64 / histogram[bucket] as f64
        } else {
            0.0
        };

        floor_cut.max(threshold_cut)
    }

    /// Inflection point of the gap distribution used by the gappyout method.
    ///
    /// Walks consecutive non-empty histogram buckets `(pprev, prev, act)`,
    /// computes the slope between `pprev` and `act` and keeps the `pprev`
    /// where the ratio against the previous slope is largest.
    pub fn second_slope_cut_point(&self) -> usize {
        let histogram = self.histogram();
        let max_gaps = self.max_gaps();
        let sequences = self.matrix.sequence_count() as f64;
        let columns = self.matrix.column_count() as f64;

        let points: Vec<usize> = (0..=max_gaps).filter(|&g| histogram[g] > 0).collect();
        let mut cut = points.first().copied().unwrap_or(0);
        let mut slopes: Vec<Option<f64>> = vec![None; max_gaps + 1];
        let mut steepest = -1.0f64;

        for window in points.windows(3) {
            let (pprev, prev, act) = (window[0], window[1], window[2]);
            let slope = ((act - pprev) as f64 / sequences)
                / ((histogram[act] + histogram[prev]) as f64 / columns);
            slopes[act] = Some(slope);

            if let Some(reference) = slopes[pprev].or(slopes[prev]) {
                let ratio = slope / reference;
                if ratio > steepest {
                    steepest = ratio;
                    cut = pprev;
                }
            }
        }

        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{protein_fixture, PROTEIN_GAPS};
    use crate::error::TrimError;

    #[test]
    fn test_fixture_gap_counts() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        assert_eq!(gaps.gaps_in_column(), &PROTEIN_GAPS[..]);
        assert!(gaps
            .gaps_in_column()
            .iter()
            .all(|&g| g <= matrix.sequence_count()));
    }

    #[test]
    fn test_zero_window_keeps_counts() {
        let matrix = protein_fixture();
        let mut gaps = GapStatistics::compute(&matrix).unwrap();
        gaps.apply_window(0).unwrap();
        let expected: Vec<f64> = PROTEIN_GAPS.iter().map(|&g| g as f64).collect();
        assert_eq!(gaps.values(), &expected[..]);
    }

    #[test]
    fn test_window_is_recomputed_from_raw_counts() {
        let matrix = protein_fixture();
        let mut once = GapStatistics::compute(&matrix).unwrap();
        once.apply_window(2).unwrap();
        let mut twice = GapStatistics::compute(&matrix).unwrap();
        twice.apply_window(2).unwrap();
        twice.apply_window(2).unwrap();
        assert_eq!(once.values(), twice.values());
        assert_eq!(once.values()[0], 5.0);
        assert_eq!(once.values()[12], (2.0 + 1.0 + 0.0 + 0.0 + 0.0) / 5.0);
    }

    #[test]
    fn test_window_guard() {
        let matrix = protein_fixture();
        let mut gaps = GapStatistics::compute(&matrix).unwrap();
        assert!(matches!(
            gaps.apply_window(16),
            Err(TrimError::InfeasibleConfig(_))
        ));
    }

    #[test]
    fn test_unaligned_input_fails() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "AC-T"), ("b", "AC")]).unwrap();
        assert!(matches!(
            GapStatistics::compute(&matrix),
            Err(TrimError::Precondition(_))
        ));
    }

    #[test]
    fn test_histogram_and_totals() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let histogram = gaps.histogram();
        assert_eq!(histogram, vec![27, 9, 1, 0, 3, 16, 4]);
        assert_eq!(histogram.iter().sum::<usize>(), 60);
        assert_eq!(gaps.max_gaps(), 6);
        assert_eq!(gaps.total_gaps(), PROTEIN_GAPS.iter().sum::<usize>());
    }

    #[test]
    fn test_cut_point_threshold_and_floor() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        // Threshold dominates: half of six sequences
        assert_eq!(gaps.cut_point(0.0, 0.5), 3.0);
        // Floor dominates: 90% of 60 columns is 54, reached in bucket 5 with 56
        let cut = gaps.cut_point(90.0, 0.0);
        assert!((cut - (5.0 - 2.0 / 16.0)).abs() < 1e-12);
    }

    #[test]
    fn test_second_slope_cut_point() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        assert_eq!(gaps.second_slope_cut_point(), 1);
    }
}
