// alignment.rs - Alignment matrix, save-arrays and sequence type detection

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, TrimError};

/// Gap symbol
pub const GAP: u8 = b'-';

const DNA_SYMBOLS: &[u8] = b"AGCTN";
const RNA_SYMBOLS: &[u8] = b"AGCUN";
const DEGENERATE_SYMBOLS: &[u8] = b"RYKMSWBDHV";

/// Number of non-gap residues per sequence inspected by type detection
const TYPE_SAMPLE_SIZE: usize = 100;
const NUCLEOTIDE_MIN_FRACTION: f64 = 0.95;

/// Residue alphabet of an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceType {
    AminoAcid,
    Dna,
    Rna,
    DegenerateDna,
    DegenerateRna,
}

impl FromStr for SequenceType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aa" | "protein" | "amino-acid" => Ok(SequenceType::AminoAcid),
            "dna" => Ok(SequenceType::Dna),
            "rna" => Ok(SequenceType::Rna),
            "dna-deg" | "degenerate-dna" => Ok(SequenceType::DegenerateDna),
            "rna-deg" | "degenerate-rna" => Ok(SequenceType::DegenerateRna),
            _ => Err(format!(
                "Invalid sequence type: {}. Use: aa, dna, rna, dna-deg, rna-deg",
                s
            )),
        }
    }
}

impl SequenceType {
    pub fn description(&self) -> &str {
        match self {
            SequenceType::AminoAcid => "Amino acids",
            SequenceType::Dna => "Nucleotides (DNA)",
            SequenceType::Rna => "Nucleotides (RNA)",
            SequenceType::DegenerateDna => "Degenerate nucleotides (DNA)",
            SequenceType::DegenerateRna => "Degenerate nucleotides (RNA)",
        }
    }

    /// Symbol used for an undetermined residue
    pub fn indetermination(&self) -> u8 {
        match self {
            SequenceType::AminoAcid => b'X',
            _ => b'N',
        }
    }

    pub fn is_nucleotide(&self) -> bool {
        !matches!(self, SequenceType::AminoAcid)
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, SequenceType::DegenerateDna | SequenceType::DegenerateRna)
    }

    /// Guess the alphabet from the first residues of every sequence.
    ///
    /// A single sequence whose sample is below 95% nucleotides makes the whole
    /// alignment amino acid. Otherwise every sequence votes DNA or RNA and the
    /// majority wins (DNA on ties). Degenerate IUPAC symbols anywhere in a
    /// nucleotide alignment promote it to the degenerate variant.
    pub fn detect<S: AsRef<[u8]>>(sequences: &[S]) -> Self {
        let mut dna_votes = 0usize;
        let mut rna_votes = 0usize;

        for sequence in sequences {
            let sample: Vec<u8> = sequence
                .as_ref()
                .iter()
                .filter(|&&c| c != GAP)
                .take(TYPE_SAMPLE_SIZE)
                .map(|c| c.to_ascii_uppercase())
                .collect();
            if sample.is_empty() {
                continue;
            }

            let total = sample.len() as f64;
            let dna_hits = sample.iter().filter(|c| DNA_SYMBOLS.contains(c)).count();
            let rna_hits = sample.iter().filter(|c| RNA_SYMBOLS.contains(c)).count();

            if (dna_hits as f64 / total) < NUCLEOTIDE_MIN_FRACTION
                && (rna_hits as f64 / total) < NUCLEOTIDE_MIN_FRACTION
            {
                return SequenceType::AminoAcid;
            }
            if rna_hits > dna_hits {
                rna_votes += 1;
            } else {
                dna_votes += 1;
            }
        }

        let degenerate = sequences.iter().any(|s| {
            s.as_ref()
                .iter()
                .any(|c| DEGENERATE_SYMBOLS.contains(&c.to_ascii_uppercase()))
        });

        match (rna_votes > dna_votes, degenerate) {
            (true, true) => SequenceType::DegenerateRna,
            (true, false) => SequenceType::Rna,
            (false, true) => SequenceType::DegenerateDna,
            (false, false) => SequenceType::Dna,
        }
    }
}

/// One named row of an alignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub name: String,
    pub residues: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(name: impl Into<String>, residues: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            residues: residues.into(),
        }
    }

    /// Number of non-gap symbols
    pub fn ungapped_len(&self) -> usize {
        self.residues.iter().filter(|&&c| c != GAP).count()
    }
}

/// A multiple sequence alignment plus the column and sequence save-arrays.
///
/// Residues are never rewritten. Trimming produces a new matrix that shares the
/// original rows and differs only in its save-arrays: entry `i` is `Some(i)`
/// when original column (or sequence) `i` survives and `None` otherwise.
#[derive(Debug, Clone)]
pub struct AlignmentMatrix {
    records: Vec<SequenceRecord>,
    column_save: Vec<Option<usize>>,
    sequence_save: Vec<Option<usize>>,
    aligned: bool,
    sequence_type: SequenceType,
}

impl AlignmentMatrix {
    /// Build a matrix from loaded records. Residues are upper-cased.
    pub fn new(mut records: Vec<SequenceRecord>) -> Result<Self> {
        if records.is_empty() {
            return Err(TrimError::precondition(
                "an alignment needs at least one sequence",
            ));
        }

        for record in &mut records {
            record.residues.make_ascii_uppercase();
        }

        let width = records.iter().map(|r| r.residues.len()).max().unwrap_or(0);
        let aligned = records.iter().all(|r| r.residues.len() == width);
        let sequence_type = SequenceType::detect(
            &records.iter().map(|r| r.residues.as_slice()).collect::<Vec<_>>(),
        );

        Ok(Self {
            column_save: (0..width).map(Some).collect(),
            sequence_save: (0..records.len()).map(Some).collect(),
            records,
            aligned,
            sequence_type,
        })
    }

    /// Convenience constructor from `(name, residues)` pairs
    pub fn from_pairs<N: AsRef<str>, S: AsRef<[u8]>>(pairs: &[(N, S)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|(name, residues)| SequenceRecord::new(name.as_ref(), residues.as_ref()))
                .collect(),
        )
    }

    /// Override the detected alphabet
    pub fn with_sequence_type(mut self, sequence_type: SequenceType) -> Self {
        self.sequence_type = sequence_type;
        self
    }

    pub(crate) fn derive(
        &self,
        column_save: Vec<Option<usize>>,
        sequence_save: Vec<Option<usize>>,
    ) -> Self {
        Self {
            records: self.records.clone(),
            column_save,
            sequence_save,
            aligned: self.aligned,
            sequence_type: self.sequence_type,
        }
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    pub fn name(&self, sequence: usize) -> &str {
        &self.records[sequence].name
    }

    /// Residue at an original position; rows shorter than the widest row read as gaps
    pub fn residue(&self, sequence: usize, column: usize) -> u8 {
        self.records[sequence]
            .residues
            .get(column)
            .copied()
            .unwrap_or(GAP)
    }

    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    pub fn sequence_type(&self) -> SequenceType {
        self.sequence_type
    }

    /// Neither a gap nor the indetermination symbol
    pub fn is_valid_residue(&self, residue: u8) -> bool {
        residue != GAP && residue != self.sequence_type.indetermination()
    }

    pub fn original_sequence_count(&self) -> usize {
        self.records.len()
    }

    pub fn original_column_count(&self) -> usize {
        self.column_save.len()
    }

    pub fn sequence_count(&self) -> usize {
        self.sequence_save.iter().filter(|s| s.is_some()).count()
    }

    pub fn column_count(&self) -> usize {
        self.column_save.iter().filter(|s| s.is_some()).count()
    }

    pub fn column_save_array(&self) -> &[Option<usize>] {
        &self.column_save
    }

    pub fn sequence_save_array(&self) -> &[Option<usize>] {
        &self.sequence_save
    }

    pub fn is_column_kept(&self, column: usize) -> bool {
        matches!(self.column_save.get(column), Some(Some(_)))
    }

    pub fn is_sequence_kept(&self, sequence: usize) -> bool {
        matches!(self.sequence_save.get(sequence), Some(Some(_)))
    }

    pub fn kept_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.column_save.iter().filter_map(|c| *c)
    }

    pub fn kept_sequences(&self) -> impl Iterator<Item = usize> + '_ {
        self.sequence_save.iter().filter_map(|s| *s)
    }

    /// Fail unless every row has the same length
    pub fn require_aligned(&self, operation: &str) -> Result<()> {
        if self.aligned {
            Ok(())
        } else {
            Err(TrimError::precondition(format!(
                "{} requires an aligned input (all sequences of equal length)",
                operation
            )))
        }
    }

    /// Original column index of every surviving column, in order
    pub fn column_correspondence(&self) -> Vec<usize> {
        self.kept_columns().collect()
    }

    /// Surviving rows restricted to surviving columns
    pub fn trimmed_records(&self) -> Vec<SequenceRecord> {
        let columns = self.column_correspondence();
        self.kept_sequences()
            .map(|s| {
                let residues = columns.iter().map(|&c| self.residue(s, c)).collect::<Vec<u8>>();
                SequenceRecord::new(self.records[s].name.clone(), residues)
            })
            .collect()
    }

    /// Swap kept and discarded entries among those kept in `within`
    pub fn complement(&self, within: &AlignmentMatrix, columns: bool, sequences: bool) -> Self {
        let flip = |own: &[Option<usize>], scope: &[Option<usize>]| -> Vec<Option<usize>> {
            own.iter()
                .zip(scope)
                .enumerate()
                .map(|(i, (kept, in_scope))| match (kept, in_scope) {
                    (_, None) => None,
                    (Some(_), Some(_)) => None,
                    (None, Some(_)) => Some(i),
                })
                .collect()
        };

        let column_save = if columns {
            flip(&self.column_save, &within.column_save)
        } else {
            self.column_save.clone()
        };
        let sequence_save = if sequences {
            flip(&self.sequence_save, &within.sequence_save)
        } else {
            self.sequence_save.clone()
        };
        self.derive(column_save, sequence_save)
    }

    /// Drop surviving sequences made only of gaps over the surviving columns
    pub(crate) fn remove_all_gap_sequences(&mut self) {
        let columns: Vec<usize> = self.kept_columns().collect();
        for s in 0..self.records.len() {
            if self.sequence_save[s].is_none() {
                continue;
            }
            if columns.iter().all(|&c| self.residue(s, c) == GAP) {
                self.sequence_save[s] = None;
            }
        }
    }

    /// Drop surviving columns made only of gaps over the surviving sequences
    pub(crate) fn remove_all_gap_columns(&mut self) {
        self.remove_all_gap_columns_above(0);
    }

    /// Drop all-gap columns while at least `floor` columns survive.
    ///
    /// All-gap columns needed to reach the floor are kept by lower index.
    pub(crate) fn remove_all_gap_columns_above(&mut self, floor: usize) {
        let sequences: Vec<usize> = self.kept_sequences().collect();
        let all_gap: Vec<usize> = self
            .kept_columns()
            .filter(|&c| sequences.iter().all(|&s| self.residue(s, c) == GAP))
            .collect();
        let informative = self.column_count() - all_gap.len();
        let spared = floor.saturating_sub(informative);
        for &c in all_gap.iter().skip(spared) {
            self.column_save[c] = None;
        }
    }

    /// Pairwise identity between surviving sequences over surviving columns.
    ///
    /// Rows and columns use original sequence indices; entries involving a
    /// discarded sequence and the diagonal are zero.
    pub fn identity_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.records.len();
        let sequences: Vec<usize> = self.kept_sequences().collect();
        let columns: Vec<usize> = self.kept_columns().collect();

        (0..n)
            .into_par_iter()
            .map(|i| {
                let mut row = vec![0.0; n];
                if !self.is_sequence_kept(i) {
                    return row;
                }
                for &j in &sequences {
                    if j != i {
                        row[j] = self.pair_identity(i, j, &columns);
                    }
                }
                row
            })
            .collect()
    }

    /// Equal residues over positions where at least one of the pair is a valid residue
    fn pair_identity(&self, a: usize, b: usize, columns: &[usize]) -> f64 {
        let mut hits = 0usize;
        let mut span = 0usize;
        for &c in columns {
            let (x, y) = (self.residue(a, c), self.residue(b, c));
            if self.is_valid_residue(x) || self.is_valid_residue(y) {
                span += 1;
                if x == y {
                    hits += 1;
                }
            }
        }
        if span == 0 {
            0.0
        } else {
            hits as f64 / span as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::protein_fixture;

    #[test]
    fn test_sequence_type_detection() {
        assert_eq!(SequenceType::detect(&["ACGT-ACGTN", "ACG--ACGTA"]), SequenceType::Dna);
        assert_eq!(SequenceType::detect(&["ACGU-ACGUN", "ACGUUACG-A"]), SequenceType::Rna);
        assert_eq!(SequenceType::detect(&["ACGTRACGTA", "ACGTTACGTA"]), SequenceType::AminoAcid);
        assert_eq!(
            SequenceType::detect(&["ACGTACGTACGTACGTACGTACGTR", "ACGTACGTACGTACGTACGTACGTA"]),
            SequenceType::DegenerateDna
        );
        assert_eq!(SequenceType::detect(&["MKVLAAGIVL", "MKILAAG-VL"]), SequenceType::AminoAcid);
    }

    #[test]
    fn test_sequence_type_from_str() {
        assert_eq!(SequenceType::from_str("AA").unwrap(), SequenceType::AminoAcid);
        assert_eq!(SequenceType::from_str("rna-deg").unwrap(), SequenceType::DegenerateRna);
        assert!(SequenceType::from_str("xyz").is_err());
        assert_eq!(SequenceType::AminoAcid.indetermination(), b'X');
        assert_eq!(SequenceType::Dna.indetermination(), b'N');
    }

    #[test]
    fn test_new_matrix_keeps_everything() {
        let matrix = protein_fixture();
        assert!(matrix.is_aligned());
        assert_eq!(matrix.original_sequence_count(), 6);
        assert_eq!(matrix.original_column_count(), 60);
        assert_eq!(matrix.column_count(), 60);
        assert_eq!(matrix.sequence_type(), SequenceType::AminoAcid);
        assert!(matrix
            .column_save_array()
            .iter()
            .enumerate()
            .all(|(i, c)| *c == Some(i)));
    }

    #[test]
    fn test_unaligned_input_is_flagged() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "ACGT"), ("b", "ACG")]).unwrap();
        assert!(!matrix.is_aligned());
        assert_eq!(matrix.residue(1, 3), GAP);
        assert!(matches!(
            matrix.require_aligned("gap statistics"),
            Err(TrimError::Precondition(_))
        ));
    }

    #[test]
    fn test_empty_alignment_is_rejected() {
        assert!(AlignmentMatrix::new(Vec::new()).is_err());
    }

    #[test]
    fn test_residues_are_uppercased() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "acgt"), ("b", "ACgT")]).unwrap();
        assert_eq!(matrix.records()[0].residues, b"ACGT".to_vec());
        assert_eq!(matrix.records()[1].residues, b"ACGT".to_vec());
    }

    #[test]
    fn test_remove_all_gap_rows_and_columns() {
        let mut matrix =
            AlignmentMatrix::from_pairs(&[("a", "A-C-"), ("b", "----"), ("c", "G-T-")]).unwrap();
        matrix.remove_all_gap_sequences();
        matrix.remove_all_gap_columns();
        assert_eq!(matrix.sequence_save_array(), &[Some(0), None, Some(2)]);
        assert_eq!(matrix.column_save_array(), &[Some(0), None, Some(2), None]);

        let trimmed = matrix.trimmed_records();
        assert_eq!(trimmed.len(), 2);
        assert_eq!(trimmed[0].residues, b"AC".to_vec());
        assert_eq!(trimmed[1].residues, b"GT".to_vec());
        assert_eq!(matrix.column_correspondence(), vec![0, 2]);
    }

    #[test]
    fn test_all_gap_columns_spared_for_floor() {
        let base =
            AlignmentMatrix::from_pairs(&[("a", "A-C--"), ("b", "G-T--")]).unwrap();

        let mut matrix = base.clone();
        matrix.remove_all_gap_columns_above(3);
        assert_eq!(matrix.column_correspondence(), vec![0, 1, 2]);

        let mut matrix = base.clone();
        matrix.remove_all_gap_columns_above(1);
        assert_eq!(matrix.column_correspondence(), vec![0, 2]);

        let mut matrix = base;
        matrix.remove_all_gap_columns_above(9);
        assert_eq!(matrix.column_count(), 5);
    }

    #[test]
    fn test_complement_within_scope() {
        let source = AlignmentMatrix::from_pairs(&[("a", "ACGTA"), ("b", "ACGTA")]).unwrap();
        let scope = source.derive(
            vec![Some(0), Some(1), Some(2), None, Some(4)],
            vec![Some(0), Some(1)],
        );
        let trimmed = source.derive(
            vec![Some(0), None, Some(2), None, None],
            vec![Some(0), Some(1)],
        );
        let flipped = trimmed.complement(&scope, true, false);
        assert_eq!(
            flipped.column_save_array(),
            &[None, Some(1), None, None, Some(4)]
        );
        assert_eq!(flipped.sequence_save_array(), &[Some(0), Some(1)]);
    }

    #[test]
    fn test_identity_matrix_is_symmetric() {
        let matrix = AlignmentMatrix::from_pairs(&[
            ("a", "ACGTACGT"),
            ("b", "ACGTACGA"),
            ("c", "ACGT----"),
        ])
        .unwrap();
        let identity = matrix.identity_matrix();
        assert_eq!(identity[0][0], 0.0);
        assert!((identity[0][1] - 7.0 / 8.0).abs() < 1e-12);
        assert!((identity[0][2] - 4.0 / 8.0).abs() < 1e-12);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(identity[i][j], identity[j][i]);
            }
        }
    }
}
