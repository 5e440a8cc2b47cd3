// summary.rs - Machine readable run summary

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use super::create_output;
use crate::core::{AlignmentMatrix, TrimPlan, TrimSummary};

/// Outcome of a compare-set consistency run
#[derive(Debug, Clone, Serialize)]
pub struct CompareSetSummary {
    pub files: Vec<String>,
    /// Mean column consistency of every file; empty when the alignment was forced
    pub aggregates: Vec<f64>,
    /// Alignment the consistency scores belong to
    pub selected: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub version: &'static str,
    pub generated: DateTime<Utc>,
    pub command: &'a str,
    pub input: String,
    pub output: Option<String>,
    pub plan: &'a TrimPlan,
    pub outcome: &'a TrimSummary,
    pub compare_set: Option<CompareSetSummary>,
    /// Original indices of the surviving columns
    pub kept_columns: Vec<usize>,
    pub kept_sequences: Vec<String>,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        command: &'a str,
        input: String,
        plan: &'a TrimPlan,
        outcome: &'a TrimSummary,
        trimmed: &AlignmentMatrix,
    ) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            generated: Utc::now(),
            command,
            input,
            output: None,
            plan,
            outcome,
            compare_set: None,
            kept_columns: trimmed.column_correspondence(),
            kept_sequences: trimmed
                .kept_sequences()
                .map(|s| trimmed.name(s).to_string())
                .collect(),
        }
    }
}

pub fn write_summary_json(file_path: &Path, summary: &RunSummary<'_>) -> Result<(), String> {
    let mut writer = create_output(file_path)?;
    serde_json::to_writer_pretty(&mut writer, summary)
        .map_err(|e| format!("Failed to serialize run summary: {}", e))?;
    writeln!(writer).map_err(|e| format!("Write error: {}", e))?;
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    println!("📊 Run summary written to: {}", file_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{run_trim, TrimInputs, TrimMethod};

    #[test]
    fn test_summary_json_fields() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "MK-V"), ("b", "MKAV")]).unwrap();
        let plan = TrimPlan {
            method: Some(TrimMethod::NoGaps),
            ..TrimPlan::default()
        };
        let outcome = run_trim(&matrix, &plan, &TrimInputs::default()).unwrap();
        let summary = RunSummary::new(
            "msatrim -i in.fasta --nogaps",
            "in.fasta".to_string(),
            &plan,
            &outcome.summary,
            &outcome.matrix,
        );

        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["kept_columns"], serde_json::json!([0, 1, 3]));
        assert_eq!(value["kept_sequences"], serde_json::json!(["a", "b"]));
        assert_eq!(value["outcome"]["columns_before"], 4);
        assert_eq!(value["outcome"]["columns_after"], 3);
        assert_eq!(value["plan"]["method"], "NoGaps");
        assert!(value["compare_set"].is_null());
    }

    #[test]
    fn test_write_summary_json() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "MK")]).unwrap();
        let plan = TrimPlan::default();
        let outcome = run_trim(&matrix, &plan, &TrimInputs::default()).unwrap();
        let summary = RunSummary::new("msatrim", "in.fasta".to_string(), &plan, &outcome.summary, &outcome.matrix);

        let path = std::env::temp_dir()
            .join(format!("msatrim-summary-{}", std::process::id()))
            .join("run.json");
        write_summary_json(&path, &summary).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["input"], "in.fasta");
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
