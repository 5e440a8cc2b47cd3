// clustering.rs - Representative sequences by identity clustering

use super::alignment::{AlignmentMatrix, GAP};
use super::trimming::TrimmingEngine;
use crate::error::{Result, TrimError};

/// Consecutive bisection steps with an unchanged cluster count before giving up
const STALE_STEPS: usize = 10;
/// Hard stop for the bisection
const MAX_STEPS: usize = 200;

impl<'a> TrimmingEngine<'a> {
    /// Surviving sequences that represent every cluster at `threshold`.
    ///
    /// Sequences are visited by decreasing ungapped length (ties by lower
    /// index). A sequence joins an existing representative when their
    /// identity exceeds `threshold`, otherwise it becomes a representative.
    /// A threshold of zero or below puts every sequence in one cluster.
    pub fn representative_sequences(&self, threshold: f64) -> Vec<usize> {
        let identity = self.matrix().identity_matrix();
        let order = length_order(self.matrix());
        representatives(&identity, &order, threshold)
    }

    /// Keep only the cluster representatives at `threshold`
    pub fn get_clustering(&self, threshold: f64) -> Result<AlignmentMatrix> {
        self.matrix().require_aligned("sequence clustering")?;
        let representatives = self.representative_sequences(threshold);
        log::debug!(
            "{} representatives at identity {:.4}",
            representatives.len(),
            threshold
        );
        let mut sequence_save = vec![None; self.matrix().original_sequence_count()];
        for s in representatives {
            sequence_save[s] = Some(s);
        }
        Ok(self.select_sequences(sequence_save))
    }

    /// Identity threshold yielding `clusters` representatives.
    ///
    /// Bisects between the lowest and highest pairwise identity starting
    /// from the mean identity. The search stops on an exact hit or after the
    /// count stays unchanged for too many steps, returning the last threshold.
    pub fn cut_point_clusters(&self, clusters: usize) -> Result<f64> {
        let matrix = self.matrix();
        matrix.require_aligned("sequence clustering")?;
        let n = matrix.sequence_count();
        if clusters == 0 || clusters > n {
            return Err(TrimError::InfeasibleConfig(format!(
                "cannot build {} clusters from {} sequences",
                clusters, n
            )));
        }
        if clusters == n {
            return Ok(1.0);
        }
        if clusters == 1 {
            return Ok(0.0);
        }

        let identity = matrix.identity_matrix();
        let sequences: Vec<usize> = matrix.kept_sequences().collect();
        let mut lowest = f64::MAX;
        let mut highest = f64::MIN;
        let mut threshold = 0.0;
        for &i in &sequences {
            let others = sequences.iter().filter(|&&j| j != i).map(|&j| identity[i][j]);
            let mut sum = 0.0;
            for value in others {
                lowest = lowest.min(value);
                highest = highest.max(value);
                sum += value;
            }
            threshold += sum / (n - 1) as f64;
        }
        threshold /= n as f64;

        let order = length_order(matrix);
        let mut previous = 0usize;
        let mut stale = 0usize;
        for _ in 0..MAX_STEPS {
            let count = representatives(&identity, &order, threshold).len();
            if count == clusters || stale > STALE_STEPS {
                break;
            }
            if count > clusters {
                highest = threshold;
            } else {
                lowest = threshold;
            }
            threshold = (highest + lowest) / 2.0;

            if count != previous {
                previous = count;
                stale = 0;
            } else {
                stale += 1;
            }
        }

        log::info!(
            "Identity threshold {:.6} selected for {} clusters",
            threshold,
            clusters
        );
        Ok(threshold)
    }
}

/// Surviving sequences by decreasing ungapped length over surviving columns
fn length_order(matrix: &AlignmentMatrix) -> Vec<usize> {
    let columns: Vec<usize> = matrix.kept_columns().collect();
    let mut order: Vec<(usize, usize)> = matrix
        .kept_sequences()
        .map(|s| {
            let length = columns
                .iter()
                .filter(|&&c| matrix.residue(s, c) != GAP)
                .count();
            (s, length)
        })
        .collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    order.into_iter().map(|(s, _)| s).collect()
}

fn representatives(identity: &[Vec<f64>], order: &[usize], threshold: f64) -> Vec<usize> {
    let mut chosen: Vec<usize> = Vec::new();
    for &s in order {
        let joins = |&r: &usize| threshold <= 0.0 || identity[s][r] > threshold;
        if !chosen.iter().any(joins) {
            chosen.push(s);
        }
    }
    chosen.sort_unstable();
    chosen
}
