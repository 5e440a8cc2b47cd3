// alignment.rs - Trimmed alignment writers

use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use super::create_output;
use crate::core::AlignmentMatrix;

/// Residues per FASTA line
const FASTA_LINE_WIDTH: usize = 60;
/// Minimum width of the PHYLIP name field
const PHYLIP_NAME_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Fasta,
    Phylip,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fasta" | "fa" => Ok(OutputFormat::Fasta),
            "phylip" | "phy" => Ok(OutputFormat::Phylip),
            _ => Err(format!("Invalid output format: {}. Use: fasta, phylip", s)),
        }
    }
}

impl OutputFormat {
    pub fn description(&self) -> &str {
        match self {
            OutputFormat::Fasta => "FASTA, 60 residues per line",
            OutputFormat::Phylip => "Sequential PHYLIP",
        }
    }
}

/// Write the surviving rows and columns of `matrix`
pub fn write_alignment<W: Write>(
    writer: &mut W,
    matrix: &AlignmentMatrix,
    format: OutputFormat,
) -> Result<(), String> {
    let records = matrix.trimmed_records();
    match format {
        OutputFormat::Fasta => {
            for record in &records {
                writeln!(writer, ">{}", record.name).map_err(|e| format!("Write error: {}", e))?;
                for line in record.residues.chunks(FASTA_LINE_WIDTH) {
                    writer.write_all(line).map_err(|e| format!("Write error: {}", e))?;
                    writeln!(writer).map_err(|e| format!("Write error: {}", e))?;
                }
            }
        }
        OutputFormat::Phylip => {
            if !matrix.is_aligned() {
                return Err("PHYLIP output needs aligned sequences".to_string());
            }
            let width = records
                .iter()
                .map(|r| r.name.len() + 1)
                .max()
                .unwrap_or(0)
                .max(PHYLIP_NAME_WIDTH);
            writeln!(writer, " {} {}", matrix.sequence_count(), matrix.column_count())
                .map_err(|e| format!("Write error: {}", e))?;
            for record in &records {
                write!(writer, "{:<width$}", record.name, width = width)
                    .map_err(|e| format!("Write error: {}", e))?;
                writer.write_all(&record.residues).map_err(|e| format!("Write error: {}", e))?;
                writeln!(writer).map_err(|e| format!("Write error: {}", e))?;
            }
        }
    }
    Ok(())
}

pub fn write_alignment_file(
    file_path: &Path,
    matrix: &AlignmentMatrix,
    format: OutputFormat,
) -> Result<(), String> {
    let mut writer = create_output(file_path)?;
    write_alignment(&mut writer, matrix, format)?;
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    println!(
        "✅ Trimmed alignment written to: {} ({} sequences x {} columns, {})",
        file_path.display(),
        matrix.sequence_count(),
        matrix.column_count(),
        format.description()
    );
    Ok(())
}

/// Original indices of the surviving columns, comma separated
pub fn format_column_numbering(matrix: &AlignmentMatrix) -> String {
    matrix
        .column_correspondence()
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
