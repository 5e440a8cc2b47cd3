// similarity.rs - Residue similarity tables and their Euclidean distances

use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::alignment::SequenceType;
use crate::error::{Result, TrimError};

const AMINO_ACID_SYMBOLS: &[u8] = b"ARNDCQEGHILKMFPSTWYV";
const NUCLEOTIDE_SYMBOLS: &[u8] = b"ACGTU";
const DEGENERATE_SYMBOLS: &[u8] = b"ACGTURYKMSWBDHV";

#[rustfmt::skip]
const BLOSUM62: [[f64; 20]; 20] = [
    [ 4., -1., -2., -2.,  0., -1., -1.,  0., -2., -1., -1., -1., -1., -2., -1.,  1.,  0., -3., -2.,  0.],
    [-1.,  5.,  0., -2., -3.,  1.,  0., -2.,  0., -3., -2.,  2., -1., -3., -2., -1., -1., -3., -2., -3.],
    [-2.,  0.,  6.,  1., -3.,  0.,  0.,  0.,  1., -3., -3.,  0., -2., -3., -2.,  1.,  0., -4., -2., -3.],
    [-2., -2.,  1.,  6., -3.,  0.,  2., -1., -1., -3., -4., -1., -3., -3., -1.,  0., -1., -4., -3., -3.],
    [ 0., -3., -3., -3.,  9., -3., -4., -3., -3., -1., -1., -3., -1., -2., -3., -1., -1., -2., -2., -1.],
    [-1.,  1.,  0.,  0., -3.,  5.,  2., -2.,  0., -3., -2.,  1.,  0., -3., -1.,  0., -1., -2., -1., -2.],
    [-1.,  0.,  0.,  2., -4.,  2.,  5., -2.,  0., -3., -3.,  1., -2., -3., -1.,  0., -1., -3., -2., -2.],
    [ 0., -2.,  0., -1., -3., -2., -2.,  6., -2., -4., -4., -2., -3., -3., -2.,  0., -2., -2., -3., -3.],
    [-2.,  0.,  1., -1., -3.,  0.,  0., -2.,  8., -3., -3., -1., -2., -1., -2., -1., -2., -2.,  2., -3.],
    [-1., -3., -3., -3., -1., -3., -3., -4., -3.,  4.,  2., -3.,  1.,  0., -3., -2., -1., -3., -1.,  3.],
    [-1., -2., -3., -4., -1., -2., -3., -4., -3.,  2.,  4., -2.,  2.,  0., -3., -2., -1., -2., -1.,  1.],
    [-1.,  2.,  0., -1., -3.,  1.,  1., -2., -1., -3., -2.,  5., -1., -3., -1.,  0., -1., -3., -2., -2.],
    [-1., -1., -2., -3., -1.,  0., -2., -3., -2.,  1.,  2., -1.,  5.,  0., -2., -1., -1., -1., -1.,  1.],
    [-2., -3., -3., -3., -2., -3., -3., -3., -1.,  0.,  0., -3.,  0.,  6., -4., -2., -2.,  1.,  3., -1.],
    [-1., -2., -2., -1., -3., -1., -1., -2., -2., -3., -3., -1., -2., -4.,  7., -1., -1., -4., -3., -2.],
    [ 1., -1.,  1.,  0., -1.,  0.,  0.,  0., -1., -2., -2.,  0., -1., -2., -1.,  4.,  1., -3., -2., -2.],
    [ 0., -1.,  0., -1., -1., -1., -1., -2., -2., -1., -1., -1., -1., -2., -1.,  1.,  5., -2., -2.,  0.],
    [-3., -3., -4., -4., -2., -2., -3., -2., -2., -3., -2., -3., -1.,  1., -4., -3., -2., 11.,  2., -3.],
    [-2., -2., -2., -3., -2., -1., -2., -3.,  2., -1., -1., -2., -1.,  3., -3., -2., -2.,  2.,  7., -1.],
    [ 0., -3., -3., -3., -1., -2., -2., -3., -3.,  3.,  1., -2.,  1., -1., -2., -2.,  0., -3., -1.,  4.],
];

/// IUPAC codes: each ambiguity row spreads one weight over its component bases and itself
const DEGENERATE_COMPONENTS: [(u8, &[u8], f64); 10] = [
    (b'R', b"AG", 0.25),
    (b'Y', b"CTU", 0.25),
    (b'K', b"GTU", 0.25),
    (b'M', b"AC", 0.25),
    (b'S', b"CG", 0.25),
    (b'W', b"ATU", 0.25),
    (b'B', b"CGTU", 1.0 / 6.0),
    (b'D', b"AGTU", 1.0 / 6.0),
    (b'H', b"ACTU", 1.0 / 6.0),
    (b'V', b"ACG", 1.0 / 6.0),
];

/// Built-in tables selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMatrix {
    Blosum62,
    NucleotideIdentity,
    DegenerateNucleotide,
    DegenerateNucleotideIdentity,
}

impl FromStr for BuiltinMatrix {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blosum62" => Ok(BuiltinMatrix::Blosum62),
            "nt" | "nucleotide" => Ok(BuiltinMatrix::NucleotideIdentity),
            "nt-degenerate" | "degenerated_nt" => Ok(BuiltinMatrix::DegenerateNucleotide),
            "degenerated_nt_identity" => Ok(BuiltinMatrix::DegenerateNucleotideIdentity),
            _ => Err(format!(
                "Unknown similarity matrix: {}. Use: blosum62, nt, nt-degenerate, degenerated_nt_identity",
                s
            )),
        }
    }
}

impl BuiltinMatrix {
    pub fn description(&self) -> &str {
        match self {
            BuiltinMatrix::Blosum62 => "BLOSUM62 amino acid similarity",
            BuiltinMatrix::NucleotideIdentity => "Nucleotide identity (ACGTU)",
            BuiltinMatrix::DegenerateNucleotide => "Degenerate nucleotide similarity (IUPAC)",
            BuiltinMatrix::DegenerateNucleotideIdentity => "Degenerate nucleotide identity (IUPAC)",
        }
    }

    pub fn build(&self) -> SimilarityMatrix {
        match self {
            BuiltinMatrix::Blosum62 => SimilarityMatrix::default_amino_acid(),
            BuiltinMatrix::NucleotideIdentity => SimilarityMatrix::default_nucleotide(),
            BuiltinMatrix::DegenerateNucleotide => SimilarityMatrix::default_degenerate_nucleotide(),
            BuiltinMatrix::DegenerateNucleotideIdentity => {
                SimilarityMatrix::from_table(DEGENERATE_SYMBOLS, identity_table(DEGENERATE_SYMBOLS.len()))
            }
        }
    }
}

/// Square similarity table over `A`..`Z` symbols plus the derived distance table.
///
/// The distance between two symbols is the Euclidean distance between their
/// columns of the similarity table, so it is symmetric with a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    symbols: Vec<u8>,
    index: [Option<usize>; 26],
    similarity: Vec<Vec<f64>>,
    distance: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    /// BLOSUM62
    pub fn default_amino_acid() -> Self {
        let table = BLOSUM62.iter().map(|row| row.to_vec()).collect();
        Self::from_table(AMINO_ACID_SYMBOLS, table)
    }

    /// Identity over `ACGTU`
    pub fn default_nucleotide() -> Self {
        Self::from_table(NUCLEOTIDE_SYMBOLS, identity_table(NUCLEOTIDE_SYMBOLS.len()))
    }

    /// IUPAC-aware table over `ACGTURYKMSWBDHV`
    pub fn default_degenerate_nucleotide() -> Self {
        let n = DEGENERATE_SYMBOLS.len();
        let mut table = identity_table(n);
        for (code, bases, weight) in DEGENERATE_COMPONENTS {
            let row = position(DEGENERATE_SYMBOLS, code);
            table[row] = vec![0.0; n];
            for &base in bases {
                table[row][position(DEGENERATE_SYMBOLS, base)] = weight;
            }
            table[row][row] = weight;
        }
        Self::from_table(DEGENERATE_SYMBOLS, table)
    }

    /// Default table for an alphabet
    pub fn for_sequence_type(sequence_type: SequenceType) -> Self {
        match sequence_type {
            SequenceType::AminoAcid => Self::default_amino_acid(),
            SequenceType::Dna | SequenceType::Rna => Self::default_nucleotide(),
            SequenceType::DegenerateDna | SequenceType::DegenerateRna => {
                Self::default_degenerate_nucleotide()
            }
        }
    }

    /// Load a user table
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| TrimError::io(path.display().to_string(), e))?;
        content.parse()
    }

    fn from_table(symbols: &[u8], similarity: Vec<Vec<f64>>) -> Self {
        let mut index = [None; 26];
        for (i, &symbol) in symbols.iter().enumerate() {
            index[(symbol - b'A') as usize] = Some(i);
        }

        let n = symbols.len();
        let mut distance = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in (i + 1)..n {
                let sum: f64 = (0..n)
                    .map(|k| {
                        let delta = similarity[k][j] - similarity[k][i];
                        delta * delta
                    })
                    .sum();
                distance[i][j] = sum.sqrt();
                distance[j][i] = distance[i][j];
            }
        }

        Self {
            symbols: symbols.to_vec(),
            index,
            similarity,
            distance,
        }
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    fn lookup(&self, residue: u8) -> Result<usize> {
        if !residue.is_ascii_uppercase() {
            return Err(TrimError::precondition(format!(
                "residue '{}' is not an uppercase letter",
                residue as char
            )));
        }
        self.index[(residue - b'A') as usize].ok_or_else(|| {
            TrimError::precondition(format!(
                "residue '{}' is not defined in the similarity matrix",
                residue as char
            ))
        })
    }

    /// Distance between two residues; both must belong to the loaded alphabet
    pub fn distance(&self, a: u8, b: u8) -> Result<f64> {
        let (i, j) = (self.lookup(a)?, self.lookup(b)?);
        Ok(self.distance[i][j])
    }

    /// Raw similarity score between two residues
    pub fn similarity(&self, a: u8, b: u8) -> Result<f64> {
        let (i, j) = (self.lookup(a)?, self.lookup(b)?);
        Ok(self.similarity[i][j])
    }
}

impl FromStr for SimilarityMatrix {
    type Err = TrimError;

    /// Header line of symbols, then one row per symbol with an optional leading
    /// symbol. Rows either all carry the symbol or none do.
    fn from_str(content: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| TrimError::Format("the file is empty".to_string()))?;
        let symbols: Vec<u8> = header
            .bytes()
            .filter(|c| !c.is_ascii_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if symbols.is_empty() {
            return Err(TrimError::Format("the symbol header is empty".to_string()));
        }

        let mut seen = [false; 26];
        for &symbol in &symbols {
            if !symbol.is_ascii_uppercase() {
                return Err(TrimError::Format(format!(
                    "symbol '{}' is not a letter",
                    symbol as char
                )));
            }
            let slot = (symbol - b'A') as usize;
            if seen[slot] {
                return Err(TrimError::Format(format!(
                    "symbol '{}' appears twice in the header",
                    symbol as char
                )));
            }
            seen[slot] = true;
        }

        let n = symbols.len();
        let mut table: Vec<Option<Vec<f64>>> = vec![None; n];
        let mut labelled: Option<bool> = None;

        for (i, line) in lines.enumerate() {
            if i >= n {
                return Err(TrimError::Format(format!(
                    "more than {} rows for {} symbols",
                    n, n
                )));
            }
            let mut tokens: Vec<&str> = line.split_whitespace().collect();
            let first_is_label = tokens
                .first()
                .map(|t| t.starts_with(|c: char| c.is_ascii_alphabetic()))
                .unwrap_or(false);
            match labelled {
                None => labelled = Some(first_is_label),
                Some(previous) if previous != first_is_label => {
                    return Err(TrimError::Format(format!(
                        "row {} mixes labelled and unlabelled rows",
                        i + 1
                    )))
                }
                _ => {}
            }

            let row = if first_is_label {
                let label = tokens.remove(0).as_bytes()[0].to_ascii_uppercase();
                symbols.iter().position(|&s| s == label).ok_or_else(|| {
                    TrimError::Format(format!("row label '{}' is not in the header", label as char))
                })?
            } else {
                i
            };

            if tokens.len() != n {
                return Err(TrimError::Format(format!(
                    "row {} has {} values, expected {}",
                    i + 1,
                    tokens.len(),
                    n
                )));
            }
            let values = tokens
                .iter()
                .map(|t| {
                    t.parse::<f64>()
                        .map_err(|_| TrimError::Format(format!("'{}' is not a number", t)))
                })
                .collect::<Result<Vec<f64>>>()?;

            if table[row].is_some() {
                return Err(TrimError::Format(format!(
                    "row '{}' is defined twice",
                    symbols[row] as char
                )));
            }
            table[row] = Some(values);
        }

        let mut similarity = table
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                row.ok_or_else(|| {
                    TrimError::Format(format!("missing row for '{}'", symbols[i] as char))
                })
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        for i in 0..n {
            for j in (i + 1)..n {
                if similarity[i][j] != similarity[j][i] {
                    let mean = (similarity[i][j] + similarity[j][i]) / 2.0;
                    similarity[i][j] = mean;
                    similarity[j][i] = mean;
                }
            }
        }

        Ok(Self::from_table(&symbols, similarity))
    }
}

fn identity_table(n: usize) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect()
}

fn position(symbols: &[u8], symbol: u8) -> usize {
    symbols.iter().position(|&s| s == symbol).unwrap_or(0)
}
