// main.rs - CLI entry point

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use msatrim::cli::Config;
use msatrim::output::{
    collect_tables, format_column_numbering, write_alignment, write_alignment_file,
    write_summary_json, write_tables, write_tables_file, CompareSetSummary, RunSummary,
};
use msatrim::prelude::*;

/// Column consistency of the alignment picked from a compare-set
struct CompareSetRun {
    scores: Vec<f64>,
    summary: CompareSetSummary,
}

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let mut args: Args = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    // Handle generate config first
    if args.generate_config {
        let sample_config = Config::generate_sample();
        println!("{}", sample_config);
        println!("\n💡 Save this content to a .toml file and use --config /path/to/config.toml");
        return Ok(());
    }

    // Load configuration file if specified
    if let Some(config_path) = args.config.clone() {
        args = args.with_config_file(&config_path)?;
    }

    let validation = validate_args(&args)?;
    init_logging(validation.log_level)?;

    // Trimmed alignment goes to stdout when nothing else is asked for
    let alignment_to_stdout = validation.output.is_none()
        && !validation.stats.any()
        && validation.stats_json.is_none()
        && !args.colnumbering;
    if !alignment_to_stdout {
        println!("✂️  msatrim v{}", msatrim::VERSION);
    }

    // Configure thread pool
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
        log::info!("Threads: {}", n);
    } else {
        log::info!("Threads: {} (auto-detected)", rayon::current_num_threads());
    }

    let total_start = Instant::now();
    let mut plan = validation.plan.clone();

    // Load the alignment, or pick one from the compare-set
    let (matrix, compare_set, input_label) = match &validation.compareset {
        Some(list) => {
            let (matrix, run) = run_compare_set(list, validation.forceselect.as_deref())?;
            let label = run.summary.selected.clone();
            (matrix, Some(run), label)
        }
        None => {
            let input = validation
                .input
                .as_ref()
                .ok_or("--input or --compareset is required")?;
            (load_alignment(input)?, None, input.display().to_string())
        }
    };
    log::info!(
        "Alignment: {} sequences x {} columns, {} ({})",
        matrix.sequence_count(),
        matrix.column_count(),
        matrix.sequence_type().description(),
        if matrix.is_aligned() { "aligned" } else { "unaligned" }
    );

    // Resolve name filters into the removal list
    if validation.sequence_filter.is_active() {
        let rejected = validation.sequence_filter.rejected(&matrix);
        if let Some(SequenceSelection::Remove(indices)) = &mut plan.sequences {
            indices.extend(rejected);
            indices.sort_unstable();
            indices.dedup();
        }
    }

    let needs_similarity = plan
        .method
        .as_ref()
        .map(|m| m.needs_similarity())
        .unwrap_or(false)
        || validation.stats.needs_similarity();
    let similarity = if needs_similarity {
        let similarity = validation.matrix.resolve(matrix.sequence_type())?;
        log::info!("Similarity matrix over {} symbols", similarity.len());
        Some(similarity)
    } else {
        None
    };

    let inputs = TrimInputs {
        similarity: similarity.as_ref(),
        consistency: compare_set.as_ref().map(|run| run.scores.as_slice()),
    };

    // Statistics describe the input alignment
    if validation.stats.any() {
        let tables = collect_tables(
            &validation.stats,
            &matrix,
            &plan,
            &inputs,
            validation.stats_residue_overlap,
        )?;
        match &validation.stats_output {
            Some(path) => write_tables_file(path, &command_line, &tables)?,
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                write_tables(&mut handle, &command_line, &tables)?;
            }
        }
    }

    let trim_start = Instant::now();
    let outcome = run_trim(&matrix, &plan, &inputs).map_err(|e| e.to_string())?;
    log::debug!("Trimming took {:.3}s", trim_start.elapsed().as_secs_f64());

    if let Some(choice) = outcome.summary.automated_choice {
        log::info!("automated1 selected {:?}", choice);
    }
    if let Some(threshold) = outcome.summary.cluster_threshold {
        log::info!("Cluster identity threshold: {:.6}", threshold);
    }

    if alignment_to_stdout {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write_alignment(&mut handle, &outcome.matrix, validation.format)?;
        handle.flush().map_err(|e| format!("Flush error: {}", e))?;
    } else if let Some(output) = &validation.output {
        write_alignment_file(output, &outcome.matrix, validation.format)?;
    }

    if args.colnumbering {
        println!("#ColumnsMap\t{}", format_column_numbering(&outcome.matrix));
    }

    if let Some(path) = &validation.stats_json {
        let mut summary = RunSummary::new(
            &command_line,
            input_label,
            &plan,
            &outcome.summary,
            &outcome.matrix,
        );
        summary.output = validation.output.as_ref().map(|p| p.display().to_string());
        summary.compare_set = compare_set.map(|run| run.summary);
        write_summary_json(path, &summary)?;
    }

    if !alignment_to_stdout {
        println!(
            "✅ Kept {}/{} sequences and {}/{} columns",
            outcome.summary.sequences_after,
            outcome.summary.sequences_before,
            outcome.summary.columns_after,
            outcome.summary.columns_before
        );
        println!("⏱️  Total time: {:.2}s", total_start.elapsed().as_secs_f64());
    }
    Ok(())
}

fn init_logging(level: LevelFilter) -> Result<(), String> {
    TermLogger::init(
        level,
        Default::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Load a compare-set and score either the forced alignment or the most consistent one
fn run_compare_set(
    list: &Path,
    forced: Option<&Path>,
) -> Result<(AlignmentMatrix, CompareSetRun), String> {
    let (paths, mut alignments): (Vec<PathBuf>, Vec<AlignmentMatrix>) =
        load_compare_set(list)?.into_iter().unzip();
    let files: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    let comparator = ConsistencyComparator::new();

    match forced {
        Some(path) => {
            let matrix = load_alignment(path)?;
            let scores = comparator
                .force_comparison(&alignments, &matrix)
                .map_err(|e| e.to_string())?;
            let mean = if scores.is_empty() {
                0.0
            } else {
                scores.iter().sum::<f64>() / scores.len() as f64
            };
            log::info!("{}: mean consistency {:.6}", path.display(), mean);
            let run = CompareSetRun {
                scores,
                summary: CompareSetSummary {
                    files,
                    aggregates: Vec::new(),
                    selected: path.display().to_string(),
                },
            };
            Ok((matrix, run))
        }
        None => {
            let report = comparator
                .compare_and_choose(&alignments)
                .map_err(|e| e.to_string())?;
            for (file, aggregate) in files.iter().zip(&report.aggregates) {
                log::info!("{}: mean consistency {:.6}", file, aggregate);
            }
            println!("🏆 Most consistent alignment: {}", files[report.selected]);
            let matrix = alignments.swap_remove(report.selected);
            let run = CompareSetRun {
                scores: report.scores,
                summary: CompareSetSummary {
                    selected: files[report.selected].clone(),
                    files,
                    aggregates: report.aggregates,
                },
            };
            Ok((matrix, run))
        }
    }
}
