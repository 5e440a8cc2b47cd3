// method.rs - Trimming methods, sequence selections and the run plan

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Column trimming method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrimMethod {
    /// Drop every column with at least one gap
    NoGaps,
    /// Drop only columns made entirely of gaps
    NoAllGaps,
    /// Gap cut at the inflection of the gap distribution
    GappyOut,
    /// Gap inflection combined with a conservation cut
    Strict,
    /// Same as `Strict` with a wider block size
    StrictPlus,
    /// Pick `GappyOut` or `Strict` from sequence identity
    Automated,
    /// Gap fraction threshold with a column floor
    Gaps {
        conservation_floor: f64,
        gap_threshold: f64,
    },
    /// Conservation threshold with a column floor
    Conservation {
        conservation_floor: f64,
        similarity_threshold: f64,
    },
    /// Both gap and conservation thresholds
    GapsAndConservation {
        conservation_floor: f64,
        gap_threshold: f64,
        similarity_threshold: f64,
    },
    /// Consistency threshold against alternative alignments, optionally
    /// followed by a gap or gap-and-conservation pass
    Consistency {
        conservation_floor: f64,
        consistency_threshold: f64,
        gap_threshold: Option<f64>,
        similarity_threshold: Option<f64>,
    },
    /// Remove the listed original columns
    SelectColumns(Vec<usize>),
}

impl FromStr for TrimMethod {
    type Err = String;

    /// Parameterless methods only; thresholded variants are built from options
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nogaps" => Ok(TrimMethod::NoGaps),
            "noallgaps" => Ok(TrimMethod::NoAllGaps),
            "gappyout" => Ok(TrimMethod::GappyOut),
            "strict" => Ok(TrimMethod::Strict),
            "strictplus" => Ok(TrimMethod::StrictPlus),
            "automated1" | "automated" => Ok(TrimMethod::Automated),
            _ => Err(format!(
                "Invalid method: {}. Use: nogaps, noallgaps, gappyout, strict, strictplus, automated1",
                s
            )),
        }
    }
}

impl TrimMethod {
    pub fn description(&self) -> &str {
        match self {
            TrimMethod::NoGaps => "Remove all columns containing gaps",
            TrimMethod::NoAllGaps => "Remove columns composed only of gaps",
            TrimMethod::GappyOut => "Gap distribution inflection (gappyout)",
            TrimMethod::Strict => "Gap inflection plus conservation (strict)",
            TrimMethod::StrictPlus => "Gap inflection plus conservation, larger blocks (strictplus)",
            TrimMethod::Automated => "Heuristic choice between gappyout and strict (automated1)",
            TrimMethod::Gaps { .. } => "Gap threshold",
            TrimMethod::Conservation { .. } => "Similarity threshold",
            TrimMethod::GapsAndConservation { .. } => "Gap and similarity thresholds",
            TrimMethod::Consistency { .. } => "Consistency threshold",
            TrimMethod::SelectColumns(_) => "Explicit column removal",
        }
    }

    /// Whether the method reads conservation statistics
    pub fn needs_similarity(&self) -> bool {
        match self {
            TrimMethod::Strict
            | TrimMethod::StrictPlus
            | TrimMethod::Automated
            | TrimMethod::Conservation { .. }
            | TrimMethod::GapsAndConservation { .. } => true,
            TrimMethod::Consistency {
                similarity_threshold,
                ..
            } => similarity_threshold.is_some(),
            _ => false,
        }
    }

    pub fn needs_consistency(&self) -> bool {
        matches!(self, TrimMethod::Consistency { .. })
    }
}

/// Outcome of the automated heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutomatedChoice {
    GappyOut,
    Strict,
}

/// Which combined method to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrictVariant {
    /// Fixed block size
    Strict,
    /// Block size proportional to the alignment width
    StrictPlus,
}

/// Tuned constants of the strict and strictplus methods
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrictParams {
    pub strict_block: usize,
    pub variable_block_fraction: f64,
    pub variable_block_min: usize,
    pub variable_block_max: usize,
    /// Percentile of the best-conserved columns used as the upper anchor
    pub upper_percentile: f64,
    /// Percentile used as the lower anchor
    pub lower_percentile: f64,
    /// Divisor applied to the log-distance between the anchors
    pub log_divisor: f64,
}

impl Default for StrictParams {
    fn default() -> Self {
        Self {
            strict_block: 5,
            variable_block_fraction: 0.01,
            variable_block_min: 3,
            variable_block_max: 12,
            upper_percentile: 20.0,
            lower_percentile: 80.0,
            log_divisor: 10.0,
        }
    }
}

impl StrictParams {
    /// Block size for a variant over `columns` surviving columns
    pub fn block_size(&self, variant: StrictVariant, columns: usize) -> usize {
        match variant {
            StrictVariant::Strict => self.strict_block,
            StrictVariant::StrictPlus => {
                let proportional = (columns as f64 * self.variable_block_fraction).round() as usize;
                proportional.clamp(self.variable_block_min, self.variable_block_max)
            }
        }
    }
}

/// Sequence-level selection applied before column trimming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SequenceSelection {
    /// Keep this many cluster representatives
    Clusters(usize),
    /// Keep representatives at this identity threshold
    MaxIdentity(f64),
    /// Remove the listed original sequences
    Remove(Vec<usize>),
    /// Drop sequences poorly supported by the rest
    Spurious {
        residue_overlap: f64,
        sequence_overlap: f64,
    },
}

impl SequenceSelection {
    pub fn description(&self) -> &str {
        match self {
            SequenceSelection::Clusters(_) => "Fixed number of cluster representatives",
            SequenceSelection::MaxIdentity(_) => "Representatives at an identity threshold",
            SequenceSelection::Remove(_) => "Explicit sequence removal",
            SequenceSelection::Spurious { .. } => "Spurious sequence removal",
        }
    }
}

/// Everything one trimming run needs besides the alignment itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimPlan {
    pub method: Option<TrimMethod>,
    pub sequences: Option<SequenceSelection>,
    /// Half-widths of the moving windows; zero disables
    pub gap_window: usize,
    pub similarity_window: usize,
    pub consistency_window: usize,
    /// Minimum run of surviving columns; zero disables
    pub block_size: usize,
    /// Restrict trimming to the alignment ends
    pub terminal_only: bool,
    /// Fixed interior kept by `terminal_only`
    pub boundaries: Option<(usize, usize)>,
    pub complementary_columns: bool,
    pub complementary_sequences: bool,
    /// Keep sequences that end up all gaps
    pub keep_sequences: bool,
    pub strict: StrictParams,
}

impl Default for TrimPlan {
    fn default() -> Self {
        Self {
            method: None,
            sequences: None,
            gap_window: 0,
            similarity_window: 0,
            consistency_window: 0,
            block_size: 0,
            terminal_only: false,
            boundaries: None,
            complementary_columns: false,
            complementary_sequences: false,
            keep_sequences: false,
            strict: StrictParams::default(),
        }
    }
}
