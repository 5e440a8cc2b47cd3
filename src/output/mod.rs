// mod.rs - Output writers: trimmed alignments, statistics tables and run summaries

pub mod alignment;
pub mod stats;
pub mod summary;

pub use alignment::{format_column_numbering, write_alignment, write_alignment_file, OutputFormat};
pub use stats::{collect_tables, write_tables, write_tables_file, StatTable, StatsRequest};
pub use summary::{write_summary_json, CompareSetSummary, RunSummary};

use std::fs::{create_dir_all, File};
use std::io::BufWriter;
use std::path::Path;

/// Ensure parent directory exists before creating file
fn ensure_parent_dir(file_path: &Path) -> Result<(), String> {
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent).map_err(|e| {
                format!("Failed to create parent directory '{}': {}", parent.display(), e)
            })?;
        }
    }
    Ok(())
}

/// Buffered writer on a fresh output file
pub(crate) fn create_output(file_path: &Path) -> Result<BufWriter<File>, String> {
    ensure_parent_dir(file_path)?;
    let file = File::create(file_path)
        .map_err(|e| format!("Failed to create output file '{}': {}", file_path.display(), e))?;
    Ok(BufWriter::new(file))
}

/// Comment lines that open every statistics report
pub fn run_header(command_line: &str) -> Vec<String> {
    vec![
        format!("# Command: {}", command_line),
        format!("# Generated: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
        format!("# msatrim v{}", env!("CARGO_PKG_VERSION")),
    ]
}
