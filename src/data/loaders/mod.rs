// mod.rs - Input file loaders

pub mod fasta;

pub use fasta::{load_alignment, load_compare_set, read_alignment, read_compare_set_list};
