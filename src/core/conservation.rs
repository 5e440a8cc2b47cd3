// conservation.rs - Mean-distance (MDK) conservation scores per column

use rayon::prelude::*;

use super::alignment::AlignmentMatrix;
use super::gaps::GapStatistics;
use super::similarity::SimilarityMatrix;
use super::window::{apply_window, check_half_width};
use crate::error::{Result, TrimError};

/// Columns with at least this fraction of gaps score zero
const GAP_SENTINEL_FRACTION: f64 = 0.8;

/// Per-column conservation of an alignment.
///
/// Each column scores `exp(-Q)` where `Q` is the identity-weighted mean
/// distance between every pair of valid residues in the column. Pairs of
/// near-identical sequences weigh little, so redundancy does not inflate the
/// score. A similarity matrix must be bound before computing.
#[derive(Debug, Clone)]
pub struct ConservationStatistics<'a> {
    matrix: &'a AlignmentMatrix,
    similarity: Option<&'a SimilarityMatrix>,
    mdk: Vec<f64>,
    values: Vec<f64>,
    half_width: usize,
    computed: bool,
}

impl<'a> ConservationStatistics<'a> {
    pub fn new(matrix: &'a AlignmentMatrix) -> Self {
        Self {
            matrix,
            similarity: None,
            mdk: Vec::new(),
            values: Vec::new(),
            half_width: 0,
            computed: false,
        }
    }

    /// Bind the residue similarity table
    pub fn with_similarity(mut self, similarity: &'a SimilarityMatrix) -> Self {
        self.similarity = Some(similarity);
        self
    }

    pub fn is_bound(&self) -> bool {
        self.similarity.is_some()
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    pub fn matrix(&self) -> &'a AlignmentMatrix {
        self.matrix
    }

    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Score every original column over the surviving sequences.
    ///
    /// With gap statistics, columns whose gap score reaches 80% of the
    /// sequences are set to zero without scoring. The gap statistics must
    /// belong to the same alignment.
    pub fn compute(&mut self, gaps: Option<&GapStatistics<'_>>) -> Result<()> {
        let similarity = self.similarity.ok_or_else(|| {
            TrimError::precondition("conservation statistics need a similarity matrix")
        })?;
        let matrix = self.matrix;
        if let Some(gaps) = gaps {
            if !std::ptr::eq(matrix, gaps.matrix()) {
                return Err(TrimError::precondition(
                    "gap statistics were computed on a different alignment",
                ));
            }
        }
        matrix.require_aligned("conservation statistics")?;

        let sequences: Vec<usize> = matrix.kept_sequences().collect();
        let identity = matrix.identity_matrix();
        let gap_limit = GAP_SENTINEL_FRACTION * sequences.len() as f64;
        let gap_values = gaps.map(|g| g.values());

        let mdk = (0..matrix.original_column_count())
            .into_par_iter()
            .map(|column| {
                if let Some(values) = gap_values {
                    if values[column] >= gap_limit {
                        return Ok(0.0);
                    }
                }
                column_mdk(matrix, similarity, &identity, &sequences, column)
            })
            .collect::<Result<Vec<f64>>>()?;

        log::debug!(
            "Conservation computed for {} columns over {} sequences",
            mdk.len(),
            sequences.len()
        );

        self.values = mdk.clone();
        self.mdk = mdk;
        self.half_width = 0;
        self.computed = true;
        Ok(())
    }

    /// Smooth the raw scores; always restarts from the unwindowed values
    pub fn apply_window(&mut self, half_width: usize) -> Result<()> {
        if !self.computed {
            return Err(TrimError::precondition(
                "conservation must be computed before windowing",
            ));
        }
        check_half_width(half_width, self.matrix.original_column_count())?;
        self.values = apply_window(&self.mdk, half_width);
        self.half_width = half_width;
        Ok(())
    }

    /// Unwindowed scores per original column
    pub fn mdk(&self) -> &[f64] {
        &self.mdk
    }

    /// Windowed scores per original column (raw when no window is set)
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Conservation cut combining a similarity threshold with a column floor.
    ///
    /// The threshold cut is the largest surviving-column score strictly below
    /// `threshold`; the floor cut is the score that keeps `baseline%` of the
    /// columns. The smaller of the two is returned.
    pub fn cut_point(&self, baseline: f64, threshold: f64) -> f64 {
        let mut sorted: Vec<f64> = self
            .matrix
            .kept_columns()
            .filter_map(|c| self.values.get(c).copied())
            .collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        let threshold_cut = sorted
            .iter()
            .rev()
            .find(|&&v| v < threshold)
            .copied()
            .unwrap_or(f64::NEG_INFINITY);

        let last = sorted.len() - 1;
        let position = ((last as f64 * (100.0 - baseline) / 100.0) as usize).min(last);

        sorted[position].min(threshold_cut)
    }
}

fn column_mdk(
    matrix: &AlignmentMatrix,
    similarity: &SimilarityMatrix,
    identity: &[Vec<f64>],
    sequences: &[usize],
    column: usize,
) -> Result<f64> {
    let mut numerator = 0.0;
    let mut denominator = 0.0;

    for (x, &a) in sequences.iter().enumerate() {
        let ra = matrix.residue(a, column);
        if !matrix.is_valid_residue(ra) {
            continue;
        }
        for &b in &sequences[x + 1..] {
            let rb = matrix.residue(b, column);
            if !matrix.is_valid_residue(rb) {
                continue;
            }
            let weight = 1.0 - identity[a][b];
            numerator += weight * similarity.distance(ra, rb)?;
            denominator += weight;
        }
    }

    if denominator == 0.0 {
        return Ok(0.0);
    }
    let q = numerator / denominator;
    Ok(if q < 0.0 { 1.0 } else { (-q).exp() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{protein_fixture, PROTEIN_GAPS};

    fn small_dna() -> AlignmentMatrix {
        AlignmentMatrix::from_pairs(&[("a", "AAC"), ("b", "AAG"), ("c", "ATG")]).unwrap()
    }

    #[test]
    fn test_unbound_compute_fails() {
        let matrix = small_dna();
        let mut conservation = ConservationStatistics::new(&matrix);
        assert!(!conservation.is_bound());
        assert!(matches!(
            conservation.compute(None),
            Err(TrimError::Precondition(_))
        ));
        assert!(matches!(
            conservation.apply_window(0),
            Err(TrimError::Precondition(_))
        ));
    }

    #[test]
    fn test_weighted_mean_distance() {
        let matrix = small_dna();
        let similarity = SimilarityMatrix::default_nucleotide();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        conservation.compute(None).unwrap();

        let values = conservation.values();
        assert_eq!(values[0], 1.0);
        // Distinct identity-table symbols sit sqrt(2) apart; weights are 1/3, 2/3, 1/3
        let expected = (-(0.75 * 2f64.sqrt())).exp();
        assert!((values[1] - expected).abs() < 1e-12);
        assert!((values[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn test_gappy_columns_score_zero() {
        let matrix = protein_fixture();
        let similarity = SimilarityMatrix::default_amino_acid();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        conservation.compute(Some(&gaps)).unwrap();

        for (column, &g) in PROTEIN_GAPS.iter().enumerate() {
            let value = conservation.values()[column];
            assert!((0.0..=1.0).contains(&value));
            if g >= 5 {
                assert_eq!(value, 0.0, "column {}", column);
            }
        }
        // Invariant column of leucines
        assert_eq!(conservation.values()[51], 1.0);
    }

    #[test]
    fn test_gaps_from_other_alignment_rejected() {
        let matrix = protein_fixture();
        let narrow = small_dna();
        let gaps = GapStatistics::compute(&narrow).unwrap();
        let similarity = SimilarityMatrix::default_amino_acid();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        assert!(matches!(
            conservation.compute(Some(&gaps)),
            Err(TrimError::Precondition(_))
        ));
        assert!(!conservation.is_computed());
    }

    #[test]
    fn test_residue_outside_alphabet_fails() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "MKJV"), ("b", "MKLV")]).unwrap();
        let similarity = SimilarityMatrix::default_amino_acid();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        assert!(matches!(
            conservation.compute(None),
            Err(TrimError::Precondition(_))
        ));
    }

    #[test]
    fn test_cut_point() {
        let matrix = small_dna();
        let similarity = SimilarityMatrix::default_nucleotide();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        conservation.compute(None).unwrap();

        let low = (-(0.75 * 2f64.sqrt())).exp();
        assert!((conservation.cut_point(50.0, 0.5) - low).abs() < 1e-12);
        assert_eq!(conservation.cut_point(0.0, 0.2), f64::NEG_INFINITY);
        // Floor only: keeping everything means cutting at the lowest score
        assert!((conservation.cut_point(100.0, 2.0) - low).abs() < 1e-12);
    }

    #[test]
    fn test_window_restarts_from_raw_scores() {
        let matrix = protein_fixture();
        let similarity = SimilarityMatrix::default_amino_acid();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        conservation.compute(None).unwrap();
        let raw = conservation.mdk().to_vec();

        conservation.apply_window(3).unwrap();
        let once = conservation.values().to_vec();
        conservation.apply_window(3).unwrap();
        assert_eq!(conservation.values(), &once[..]);

        conservation.apply_window(0).unwrap();
        assert_eq!(conservation.values(), &raw[..]);
    }
}
