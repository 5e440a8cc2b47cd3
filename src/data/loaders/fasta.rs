// fasta.rs - FASTA alignment and compare-set loaders

use bio::io::fasta;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::core::{AlignmentMatrix, SequenceRecord};

/// Parse FASTA records from any reader. `source` only labels error messages.
pub fn read_alignment<R: Read>(reader: R, source: &str) -> Result<AlignmentMatrix, String> {
    let reader = fasta::Reader::new(reader);
    let mut records = Vec::new();

    for record_result in reader.records() {
        let record = record_result
            .map_err(|e| format!("Invalid FASTA record in {}: {}", source, e))?;
        records.push(SequenceRecord::new(record.id(), record.seq().to_vec()));
    }

    if records.is_empty() {
        return Err(format!("No sequences found in {}", source));
    }

    AlignmentMatrix::new(records).map_err(|e| format!("{}: {}", source, e))
}

/// Load one alignment from a FASTA file
pub fn load_alignment(path: &Path) -> Result<AlignmentMatrix, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open alignment file {}: {}", path.display(), e))?;
    let matrix = read_alignment(BufReader::new(file), &path.display().to_string())?;

    log::debug!(
        "Loaded {} sequences x {} columns from {} (aligned: {})",
        matrix.sequence_count(),
        matrix.column_count(),
        path.display(),
        matrix.is_aligned()
    );
    Ok(matrix)
}

/// Paths listed in a compare-set file, one per line.
///
/// Blank lines and `#` comments are skipped. A relative path that does not
/// exist as given is looked up next to the list file.
pub fn read_compare_set_list(list_path: &Path) -> Result<Vec<PathBuf>, String> {
    let file = File::open(list_path)
        .map_err(|e| format!("Failed to open compare-set file '{}': {}", list_path.display(), e))?;
    let base = list_path.parent().unwrap_or_else(|| Path::new(""));

    let mut paths = Vec::new();
    for (line_num, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| {
            format!("Failed to read line {} from '{}': {}", line_num + 1, list_path.display(), e)
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let candidate = PathBuf::from(trimmed);
        if candidate.is_relative() && !candidate.exists() {
            paths.push(base.join(candidate));
        } else {
            paths.push(candidate);
        }
    }
    Ok(paths)
}

/// Load every alignment of a compare-set in parallel, keeping list order
pub fn load_compare_set(list_path: &Path) -> Result<Vec<(PathBuf, AlignmentMatrix)>, String> {
    let paths = read_compare_set_list(list_path)?;
    if paths.len() < 2 {
        return Err(format!(
            "Compare-set '{}' lists {} alignment(s); at least 2 are needed",
            list_path.display(),
            paths.len()
        ));
    }

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} alignments loaded")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let alignments = paths
        .par_iter()
        .map(|path| {
            let matrix = load_alignment(path)?;
            pb.inc(1);
            Ok((path.clone(), matrix))
        })
        .collect::<Result<Vec<_>, String>>();

    pb.finish_and_clear();
    let alignments = alignments?;
    log::info!(
        "Compare-set loaded: {} alignments from {}",
        alignments.len(),
        list_path.display()
    );
    Ok(alignments)
}
