// mod.rs - Input loading and selection helpers

pub mod filters;
pub mod loaders;
pub mod ranges;

pub use filters::SequenceFilter;
pub use loaders::{load_alignment, load_compare_set};
pub use ranges::parse_index_list;
