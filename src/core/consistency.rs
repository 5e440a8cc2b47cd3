// consistency.rs - Column consistency between alternative alignments of one sequence set

use rayon::prelude::*;
use std::collections::HashMap;

use super::alignment::{AlignmentMatrix, GAP};
use crate::error::{Result, TrimError};

/// Residue numbering of an alignment.
///
/// Entry `(row, column)` is the 1-based position of the residue within its
/// ungapped sequence, or 0 for a gap. Rows follow the surviving sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidueIndexMatrix {
    rows: Vec<Vec<usize>>,
    columns: usize,
}

impl ResidueIndexMatrix {
    pub fn from_alignment(matrix: &AlignmentMatrix) -> Self {
        let columns = matrix.original_column_count();
        let rows = matrix
            .kept_sequences()
            .map(|s| {
                let mut position = 0usize;
                (0..columns)
                    .map(|c| {
                        if matrix.residue(s, c) != GAP {
                            position += 1;
                            position
                        } else {
                            0
                        }
                    })
                    .collect()
            })
            .collect();
        Self { rows, columns }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> usize {
        self.rows[row][column]
    }

    /// Column holding residue number `residue` of sequence `row`
    pub fn find_column(&self, row: usize, residue: usize) -> Option<usize> {
        self.rows[row].iter().position(|&r| r == residue)
    }

    /// Rows permuted so that row `i` of the result is row `order[i]` of `self`
    pub fn reordered(&self, order: &[usize]) -> Self {
        Self {
            rows: order.iter().map(|&i| self.rows[i].clone()).collect(),
            columns: self.columns,
        }
    }
}

/// Result of choosing the most consistent alignment
#[derive(Debug, Clone)]
pub struct ConsistencyReport {
    /// Index of the chosen alignment
    pub selected: usize,
    /// Mean column score of every candidate
    pub aggregates: Vec<f64>,
    /// Column scores of the chosen alignment
    pub scores: Vec<f64>,
}

/// Scores each column of a reference alignment by how many of its residue
/// pairs are also aligned together in the other alignments.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsistencyComparator;

impl ConsistencyComparator {
    pub fn new() -> Self {
        Self
    }

    /// Score every candidate against the rest and pick the highest mean.
    ///
    /// Ties keep the lowest index.
    pub fn compare_and_choose(&self, alignments: &[AlignmentMatrix]) -> Result<ConsistencyReport> {
        let first = alignments.first().ok_or_else(|| {
            TrimError::precondition("consistency comparison needs at least one alignment")
        })?;
        for alignment in alignments {
            alignment.require_aligned("consistency comparison")?;
        }

        let reference_names = kept_names(first);
        let indices = alignments
            .iter()
            .map(|alignment| {
                let order = correspondence(&reference_names, alignment)?;
                Ok(ResidueIndexMatrix::from_alignment(alignment).reordered(&order))
            })
            .collect::<Result<Vec<_>>>()?;

        let all_scores: Vec<Vec<f64>> = (0..indices.len())
            .into_par_iter()
            .map(|i| {
                let others: Vec<&ResidueIndexMatrix> = indices
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i)
                    .map(|(_, m)| m)
                    .collect();
                column_scores(&indices[i], &others)
            })
            .collect();

        let aggregates: Vec<f64> = all_scores
            .iter()
            .map(|scores| {
                if scores.is_empty() {
                    0.0
                } else {
                    scores.iter().sum::<f64>() / scores.len() as f64
                }
            })
            .collect();

        let mut selected = 0usize;
        let mut best = 0.0f64;
        for (i, &aggregate) in aggregates.iter().enumerate() {
            if aggregate > best {
                best = aggregate;
                selected = i;
            }
        }

        log::info!(
            "Alignment {} is the most consistent (mean column score {:.4})",
            selected,
            aggregates[selected]
        );

        let scores = all_scores[selected].clone();
        Ok(ConsistencyReport {
            selected,
            aggregates,
            scores,
        })
    }

    /// Column scores of `selected` against every alignment in `alignments`
    pub fn force_comparison(
        &self,
        alignments: &[AlignmentMatrix],
        selected: &AlignmentMatrix,
    ) -> Result<Vec<f64>> {
        selected.require_aligned("consistency comparison")?;
        let names = kept_names(selected);
        let reference = ResidueIndexMatrix::from_alignment(selected);

        let others = alignments
            .iter()
            .map(|alignment| {
                alignment.require_aligned("consistency comparison")?;
                let order = correspondence(&names, alignment)?;
                Ok(ResidueIndexMatrix::from_alignment(alignment).reordered(&order))
            })
            .collect::<Result<Vec<_>>>()?;

        let refs: Vec<&ResidueIndexMatrix> = others.iter().collect();
        Ok(column_scores(&reference, &refs))
    }
}

fn kept_names(matrix: &AlignmentMatrix) -> Vec<&str> {
    matrix.kept_sequences().map(|s| matrix.name(s)).collect()
}

/// Row of `other` (in its own surviving-row numbering) for each reference name
fn correspondence(reference: &[&str], other: &AlignmentMatrix) -> Result<Vec<usize>> {
    let names = kept_names(other);
    if names.len() != reference.len() {
        return Err(TrimError::SequenceSetMismatch(format!(
            "{} sequences against {}",
            names.len(),
            reference.len()
        )));
    }

    let mut rows: HashMap<&str, usize> = HashMap::with_capacity(names.len());
    for (row, &name) in names.iter().enumerate() {
        if rows.insert(name, row).is_some() {
            return Err(TrimError::SequenceSetMismatch(format!(
                "duplicated sequence name '{}'",
                name
            )));
        }
    }

    reference
        .iter()
        .map(|name| {
            rows.get(name).copied().ok_or_else(|| {
                TrimError::SequenceSetMismatch(format!("sequence '{}' is missing", name))
            })
        })
        .collect()
}

/// Fraction of residue pairs of each reference column that the other
/// alignments also place in one column
fn column_scores(reference: &ResidueIndexMatrix, others: &[&ResidueIndexMatrix]) -> Vec<f64> {
    let rows = reference.row_count();
    (0..reference.column_count())
        .map(|column| {
            let mut hits = 0usize;
            let mut pairs = 0usize;
            for k in 0..rows {
                let residue = reference.get(k, column);
                if residue == 0 {
                    continue;
                }
                for other in others {
                    let found = other.find_column(k, residue);
                    for m in (k + 1)..rows {
                        let partner = reference.get(m, column);
                        if partner == 0 {
                            continue;
                        }
                        pairs += 1;
                        if let Some(c) = found {
                            if other.get(m, c) == partner {
                                hits += 1;
                            }
                        }
                    }
                }
            }
            if pairs == 0 {
                0.0
            } else {
                hits as f64 / pairs as f64
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::consistency_fixture;

    #[test]
    fn test_residue_numbering() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "M-KV"), ("b", "MK-V")]).unwrap();
        let index = ResidueIndexMatrix::from_alignment(&matrix);
        assert_eq!(index.rows, vec![vec![1, 0, 2, 3], vec![1, 2, 0, 3]]);
        assert_eq!(index.find_column(0, 2), Some(2));
        assert_eq!(index.find_column(1, 4), None);
    }

    #[test]
    fn test_identical_alignments_are_fully_consistent() {
        let sets = consistency_fixture();
        let copies = vec![sets[0].clone(), sets[0].clone()];
        let report = ConsistencyComparator::new().compare_and_choose(&copies).unwrap();
        assert_eq!(report.selected, 0);
        assert_eq!(report.aggregates, vec![1.0, 1.0]);
        assert!(report.scores.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_choice_is_deterministic() {
        let sets = consistency_fixture();
        let comparator = ConsistencyComparator::new();
        let first = comparator.compare_and_choose(&sets).unwrap();
        let second = comparator.compare_and_choose(&sets).unwrap();
        assert_eq!(first.selected, second.selected);
        assert_eq!(first.aggregates, second.aggregates);
        assert_eq!(first.scores.len(), sets[first.selected].original_column_count());
        assert!(first.scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_row_order_does_not_matter() {
        let sets = consistency_fixture();
        let comparator = ConsistencyComparator::new();
        let forward = comparator.force_comparison(&sets[1..], &sets[0]).unwrap();
        let shuffled = vec![sets[2].clone(), sets[1].clone()];
        let again = comparator.force_comparison(&shuffled, &sets[0]).unwrap();
        assert_eq!(forward, again);
    }

    #[test]
    fn test_mismatched_sets_are_rejected() {
        let sets = consistency_fixture();
        let renamed = AlignmentMatrix::from_pairs(&[
            ("s1", "MKVLAAG"),
            ("s2", "MKVILAG"),
            ("s3", "MVILAAG"),
            ("s9", "MKVILAG"),
        ])
        .unwrap();
        let smaller =
            AlignmentMatrix::from_pairs(&[("s1", "MKVLAAG"), ("s2", "MKVILAG")]).unwrap();
        let comparator = ConsistencyComparator::new();

        assert!(matches!(
            comparator.compare_and_choose(&[sets[0].clone(), renamed]),
            Err(TrimError::SequenceSetMismatch(_))
        ));
        assert!(matches!(
            comparator.force_comparison(&[smaller], &sets[0]),
            Err(TrimError::SequenceSetMismatch(_))
        ));
    }

    #[test]
    fn test_unaligned_candidate_is_rejected() {
        let sets = consistency_fixture();
        let ragged = AlignmentMatrix::from_pairs(&[
            ("s1", "MKVLAAG"),
            ("s2", "MKVILAG--"),
            ("s3", "MVILAAG"),
            ("s4", "MKVILAG"),
        ])
        .unwrap();
        assert!(matches!(
            ConsistencyComparator::new().compare_and_choose(&[sets[0].clone(), ragged]),
            Err(TrimError::Precondition(_))
        ));
    }
}
