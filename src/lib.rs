// lib.rs - msatrim library root

//! # msatrim - Gap, conservation and consistency driven alignment trimming
//!
//! This library removes poorly aligned columns and unwanted sequences from
//! multiple sequence alignments. Trimming never rewrites residues: every
//! result is the input alignment plus two save-arrays telling which original
//! columns and sequences survive.
//!
//! ## Features
//!
//! - **Gap statistics**: per-column gap counts, histograms and the gappyout inflection
//! - **Conservation**: mean-distance scores under BLOSUM62, nucleotide or custom matrices
//! - **Consistency**: column agreement against alternative alignments of the same sequences
//! - **Automated methods**: gappyout, strict, strictplus and automated1
//! - **Sequence selection**: clustering by identity, spurious sequences and explicit lists
//! - **Parallel**: per-column statistics computed with rayon
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use msatrim::prelude::*;
//!
//! let matrix = load_alignment(std::path::Path::new("alignment.fasta"))?;
//! let similarity = SimilarityMatrix::for_sequence_type(matrix.sequence_type());
//!
//! let plan = TrimPlan {
//!     method: Some(TrimMethod::Automated),
//!     ..TrimPlan::default()
//! };
//! let inputs = TrimInputs {
//!     similarity: Some(&similarity),
//!     consistency: None,
//! };
//! let outcome = run_trim(&matrix, &plan, &inputs).map_err(|e| e.to_string())?;
//! println!("kept columns: {:?}", outcome.matrix.column_correspondence());
//! # Ok::<(), String>(())
//! ```

pub mod cli;
pub mod core;
pub mod data;
pub mod error;
pub mod output;

// Convenience prelude for common imports
pub mod prelude {
    pub use crate::cli::{validate_args, Args, ValidationResult};
    pub use crate::core::{
        run_trim, AlignmentMatrix, ConservationStatistics, ConsistencyComparator, GapStatistics,
        SequenceSelection, SequenceType, SimilarityMatrix, TrimInputs, TrimMethod, TrimPlan,
        TrimmingEngine,
    };
    pub use crate::data::{load_alignment, load_compare_set, SequenceFilter};
    pub use crate::error::TrimError;
    pub use crate::output::{write_alignment_file, OutputFormat};
}

// Re-export main types at the root level for convenience
pub use core::{AlignmentMatrix, GapStatistics, ConservationStatistics, TrimmingEngine};
pub use error::{Result, TrimError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

