// stats.rs - Tab separated statistics tables

use std::io::Write;
use std::path::Path;

use super::{create_output, run_header};
use crate::core::window::{apply_window, check_half_width};
use crate::core::{
    AlignmentMatrix, ConservationStatistics, GapStatistics, TrimInputs, TrimPlan, TrimmingEngine,
};

/// Statistics tables requested on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsRequest {
    pub gaps_per_column: bool,
    pub gap_totals: bool,
    pub conservation_per_column: bool,
    pub conservation_totals: bool,
    pub identity: bool,
    pub overlap: bool,
    pub consistency_per_column: bool,
    pub consistency_totals: bool,
}

impl StatsRequest {
    pub fn any(&self) -> bool {
        self.gaps_per_column
            || self.gap_totals
            || self.conservation_per_column
            || self.conservation_totals
            || self.identity
            || self.overlap
            || self.consistency_per_column
            || self.consistency_totals
    }

    pub fn needs_gaps(&self) -> bool {
        self.gaps_per_column || self.gap_totals || self.needs_similarity()
    }

    pub fn needs_similarity(&self) -> bool {
        self.conservation_per_column || self.conservation_totals
    }

    pub fn needs_consistency(&self) -> bool {
        self.consistency_per_column || self.consistency_totals
    }
}

/// Build the requested tables for `matrix`, windowed as in `plan`
pub fn collect_tables(
    request: &StatsRequest,
    matrix: &AlignmentMatrix,
    plan: &TrimPlan,
    inputs: &TrimInputs<'_>,
    residue_overlap: f64,
) -> Result<Vec<StatTable>, String> {
    let mut tables = Vec::new();

    if request.needs_gaps() {
        let mut gaps = GapStatistics::compute(matrix).map_err(|e| e.to_string())?;
        gaps.apply_window(plan.gap_window).map_err(|e| e.to_string())?;
        if request.gaps_per_column {
            tables.push(StatTable::gaps_per_column(&gaps));
        }
        if request.gap_totals {
            tables.push(StatTable::gap_totals(&gaps));
        }

        if request.needs_similarity() {
            let similarity = inputs
                .similarity
                .ok_or("Conservation statistics need a similarity matrix")?;
            let mut conservation = ConservationStatistics::new(matrix).with_similarity(similarity);
            conservation.compute(Some(&gaps)).map_err(|e| e.to_string())?;
            conservation
                .apply_window(plan.similarity_window)
                .map_err(|e| e.to_string())?;
            if request.conservation_per_column {
                tables.push(StatTable::conservation_per_column(&conservation));
            }
            if request.conservation_totals {
                tables.push(StatTable::conservation_totals(&conservation));
            }
        }
    }

    if request.identity {
        matrix
            .require_aligned("identity statistics")
            .map_err(|e| e.to_string())?;
        tables.push(StatTable::identity(matrix));
    }

    if request.overlap {
        let vector = TrimmingEngine::new(matrix)
            .spurious_vector(residue_overlap)
            .map_err(|e| e.to_string())?;
        tables.push(StatTable::overlap(matrix, &vector));
    }

    if request.needs_consistency() {
        let scores = inputs
            .consistency
            .ok_or("Consistency statistics need a compare-set")?;
        if scores.len() != matrix.original_column_count() {
            return Err(format!(
                "Consistency vector has {} entries for {} columns",
                scores.len(),
                matrix.original_column_count()
            ));
        }
        check_half_width(plan.consistency_window, scores.len()).map_err(|e| e.to_string())?;
        let scores = apply_window(scores, plan.consistency_window);
        if request.consistency_per_column {
            tables.push(StatTable::consistency_per_column(matrix, &scores));
        }
        if request.consistency_totals {
            tables.push(StatTable::consistency_totals(matrix, &scores));
        }
    }

    Ok(tables)
}

/// One titled table of a statistics report
#[derive(Debug, Clone, PartialEq)]
pub struct StatTable {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl StatTable {
    fn new(title: &str, headers: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Gaps per surviving column
    pub fn gaps_per_column(gaps: &GapStatistics<'_>) -> Self {
        let matrix = gaps.matrix();
        let sequences = matrix.sequence_count().max(1) as f64;
        let mut table = Self::new("Gaps per column", &["column", "gaps", "gap_score", "gap_fraction"]);
        for c in matrix.kept_columns() {
            let score = gaps.values()[c];
            table.push(vec![
                c.to_string(),
                gaps.gaps_in_column()[c].to_string(),
                format!("{:.4}", score),
                format!("{:.6}", score / sequences),
            ]);
        }
        table
    }

    /// Columns accumulated per gap count
    pub fn gap_totals(gaps: &GapStatistics<'_>) -> Self {
        let matrix = gaps.matrix();
        let sequences = matrix.sequence_count().max(1) as f64;
        let columns = matrix.column_count().max(1) as f64;
        let mut table = Self::new(
            "Gap distribution",
            &[
                "gaps_per_column",
                "gap_fraction",
                "columns",
                "columns_pct",
                "cumulative_columns",
                "cumulative_pct",
            ],
        );
        let mut cumulative = 0usize;
        for (count, &hits) in gaps.histogram().iter().enumerate() {
            if hits == 0 {
                continue;
            }
            cumulative += hits;
            table.push(vec![
                count.to_string(),
                format!("{:.6}", count as f64 / sequences),
                hits.to_string(),
                format!("{:.2}", 100.0 * hits as f64 / columns),
                cumulative.to_string(),
                format!("{:.2}", 100.0 * cumulative as f64 / columns),
            ]);
        }
        table
    }

    pub fn conservation_per_column(conservation: &ConservationStatistics<'_>) -> Self {
        Self::per_column(
            "Conservation per column",
            "similarity",
            conservation.matrix(),
            conservation.values(),
        )
    }

    pub fn conservation_totals(conservation: &ConservationStatistics<'_>) -> Self {
        Self::distribution(
            "Conservation distribution",
            "similarity",
            conservation.matrix(),
            conservation.values(),
        )
    }

    pub fn consistency_per_column(matrix: &AlignmentMatrix, scores: &[f64]) -> Self {
        Self::per_column("Consistency per column", "consistency", matrix, scores)
    }

    pub fn consistency_totals(matrix: &AlignmentMatrix, scores: &[f64]) -> Self {
        Self::distribution("Consistency distribution", "consistency", matrix, scores)
    }

    /// Mean and maximum identity of every surviving sequence to the others
    pub fn identity(matrix: &AlignmentMatrix) -> Self {
        let identity = matrix.identity_matrix();
        let sequences: Vec<usize> = matrix.kept_sequences().collect();
        let mut table = Self::new(
            "Sequence identity",
            &["sequence", "mean_identity", "max_identity", "closest"],
        );
        for &i in &sequences {
            let others: Vec<usize> = sequences.iter().copied().filter(|&j| j != i).collect();
            let mean = if others.is_empty() {
                0.0
            } else {
                others.iter().map(|&j| identity[i][j]).sum::<f64>() / others.len() as f64
            };
            let closest = others
                .iter()
                .copied()
                .fold(None, |best: Option<usize>, j| match best {
                    Some(b) if identity[i][b] >= identity[i][j] => Some(b),
                    _ => Some(j),
                });
            let (max, closest_name) = match closest {
                Some(j) => (identity[i][j], matrix.name(j).to_string()),
                None => (0.0, "-".to_string()),
            };
            table.push(vec![
                matrix.name(i).to_string(),
                format!("{:.6}", mean),
                format!("{:.6}", max),
                closest_name,
            ]);
        }
        table
    }

    /// Spurious-sequence overlap of every surviving sequence
    pub fn overlap(matrix: &AlignmentMatrix, vector: &[f64]) -> Self {
        let mut table = Self::new("Sequence overlap", &["sequence", "overlap"]);
        for s in matrix.kept_sequences() {
            table.push(vec![matrix.name(s).to_string(), format!("{:.6}", vector[s])]);
        }
        table
    }

    fn per_column(title: &str, label: &str, matrix: &AlignmentMatrix, values: &[f64]) -> Self {
        let mut table = Self::new(title, &["column", label]);
        for c in matrix.kept_columns() {
            table.push(vec![c.to_string(), format!("{:.6}", values[c])]);
        }
        table
    }

    /// Surviving columns grouped by score, ascending, with running totals
    fn distribution(title: &str, label: &str, matrix: &AlignmentMatrix, values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = matrix.kept_columns().map(|c| values[c]).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let columns = sorted.len().max(1) as f64;

        let mut groups: Vec<(String, usize)> = Vec::new();
        for value in sorted {
            let key = format!("{:.6}", value);
            match groups.last_mut() {
                Some((last, count)) if *last == key => *count += 1,
                _ => groups.push((key, 1)),
            }
        }

        let mut table = Self::new(
            title,
            &[label, "columns", "columns_pct", "cumulative_columns", "cumulative_pct"],
        );
        let mut cumulative = 0usize;
        for (key, count) in groups {
            cumulative += count;
            table.push(vec![
                key,
                count.to_string(),
                format!("{:.2}", 100.0 * count as f64 / columns),
                cumulative.to_string(),
                format!("{:.2}", 100.0 * cumulative as f64 / columns),
            ]);
        }
        table
    }
}

/// Write the run header followed by every table, tab separated
pub fn write_tables<W: Write>(
    writer: &mut W,
    command_line: &str,
    tables: &[StatTable],
) -> Result<(), String> {
    for line in run_header(command_line) {
        writeln!(writer, "{}", line).map_err(|e| format!("Write error: {}", e))?;
    }

    for table in tables {
        writeln!(writer, "## {}", table.title).map_err(|e| format!("Write error: {}", e))?;
        let mut tsv = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .flexible(false)
            .from_writer(&mut *writer);
        tsv.write_record(&table.headers)
            .map_err(|e| format!("Write error: {}", e))?;
        for row in &table.rows {
            tsv.write_record(row).map_err(|e| format!("Write error: {}", e))?;
        }
        tsv.flush().map_err(|e| format!("Flush error: {}", e))?;
    }
    Ok(())
}

pub fn write_tables_file(
    file_path: &Path,
    command_line: &str,
    tables: &[StatTable],
) -> Result<(), String> {
    let mut writer = create_output(file_path)?;
    write_tables(&mut writer, command_line, tables)?;
    writer.flush().map_err(|e| format!("Flush error: {}", e))?;
    println!("📊 Statistics written to: {}", file_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::protein_fixture;
    use crate::core::SimilarityMatrix;

    #[test]
    fn test_gap_totals_accumulate() {
        let matrix = protein_fixture();
        let gaps = GapStatistics::compute(&matrix).unwrap();
        let table = StatTable::gap_totals(&gaps);

        let counts: Vec<&str> = table.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(counts, vec!["0", "1", "2", "4", "5", "6"]);
        assert_eq!(table.rows[0][2], "27");
        assert_eq!(table.rows[0][3], "45.00");
        let last = table.rows.last().unwrap();
        assert_eq!(last[4], "60");
        assert_eq!(last[5], "100.00");
    }

    #[test]
    fn test_gaps_per_column_skips_discarded_columns() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "M-K-"), ("b", "MAK-")]).unwrap();
        let trimmed = crate::core::TrimmingEngine::new(&matrix)
            .clean_no_all_gaps()
            .unwrap();
        let gaps = GapStatistics::compute(&trimmed).unwrap();
        let table = StatTable::gaps_per_column(&gaps);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1], vec!["1", "1", "1.0000", "0.500000"]);
    }

    #[test]
    fn test_conservation_distribution_groups_equal_scores() {
        let matrix = protein_fixture();
        let similarity = SimilarityMatrix::default_amino_acid();
        let mut conservation = ConservationStatistics::new(&matrix).with_similarity(&similarity);
        conservation.compute(None).unwrap();
        let table = StatTable::conservation_totals(&conservation);

        let total: usize = table.rows.iter().map(|r| r[1].parse::<usize>().unwrap()).sum();
        assert_eq!(total, 60);
        assert_eq!(table.rows.last().unwrap()[3], "60");
        assert_eq!(table.rows.last().unwrap()[0], "1.000000");
    }

    #[test]
    fn test_identity_table() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "MKVL"), ("b", "MKVI"), ("c", "MRAI")]).unwrap();
        let table = StatTable::identity(&matrix);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0][0], "a");
        assert_eq!(table.rows[0][2], "0.750000");
        assert_eq!(table.rows[0][3], "b");
    }

    #[test]
    fn test_collect_tables_in_request_order() {
        let matrix = protein_fixture();
        let similarity = SimilarityMatrix::default_amino_acid();
        let request = StatsRequest {
            gap_totals: true,
            conservation_per_column: true,
            overlap: true,
            ..StatsRequest::default()
        };
        let inputs = TrimInputs {
            similarity: Some(&similarity),
            consistency: None,
        };
        let tables = collect_tables(&request, &matrix, &TrimPlan::default(), &inputs, 0.5).unwrap();
        let titles: Vec<&str> = tables.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Gap distribution", "Conservation per column", "Sequence overlap"]
        );
        assert_eq!(tables[1].rows.len(), 60);
        assert_eq!(tables[2].rows.len(), 6);
    }

    #[test]
    fn test_collect_tables_missing_inputs() {
        let matrix = protein_fixture();
        let plan = TrimPlan::default();
        let conservation = StatsRequest {
            conservation_totals: true,
            ..StatsRequest::default()
        };
        assert!(collect_tables(&conservation, &matrix, &plan, &TrimInputs::default(), 0.5).is_err());

        let consistency = StatsRequest {
            consistency_per_column: true,
            ..StatsRequest::default()
        };
        let short = vec![1.0; 10];
        let inputs = TrimInputs {
            similarity: None,
            consistency: Some(&short),
        };
        assert!(collect_tables(&consistency, &matrix, &plan, &inputs, 0.5).is_err());
    }

    #[test]
    fn test_write_tables() {
        let matrix = AlignmentMatrix::from_pairs(&[("a", "MK"), ("b", "MR")]).unwrap();
        let mut buffer = Vec::new();
        write_tables(
            &mut buffer,
            "msatrim -i in.fasta --sident",
            &[StatTable::identity(&matrix)],
        )
        .unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Command: msatrim -i in.fasta --sident");
        assert!(lines[1].starts_with("# Generated: "));
        assert_eq!(lines[3], "## Sequence identity");
        assert_eq!(lines[4], "sequence\tmean_identity\tmax_identity\tclosest");
        assert_eq!(lines[5], "a\t0.500000\t0.500000\tb");
    }
}
