// mod.rs - Statistics and trimming core

pub mod alignment;
pub mod clustering;
pub mod consistency;
pub mod conservation;
pub mod gaps;
pub mod method;
pub mod pipeline;
pub mod similarity;
pub mod trimming;
pub mod window;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export main types for convenience
pub use alignment::{AlignmentMatrix, SequenceRecord, SequenceType, GAP};
pub use consistency::{ConsistencyComparator, ConsistencyReport, ResidueIndexMatrix};
pub use conservation::ConservationStatistics;
pub use gaps::GapStatistics;
pub use method::{
    AutomatedChoice, SequenceSelection, StrictParams, StrictVariant, TrimMethod, TrimPlan,
};
pub use pipeline::{run_trim, TrimInputs, TrimOutcome, TrimSummary};
pub use similarity::{BuiltinMatrix, SimilarityMatrix};
pub use trimming::TrimmingEngine;
