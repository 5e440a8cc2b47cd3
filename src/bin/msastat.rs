// msastat.rs - Statistics-only companion of msatrim

use std::path::PathBuf;
use std::str::FromStr;

use argh::FromArgs;
use log::LevelFilter;
use simplelog::{ColorChoice, TermLogger, TerminalMode};

use msatrim::cli::MatrixChoice;
use msatrim::core::BuiltinMatrix;
use msatrim::output::{collect_tables, write_tables, write_tables_file, StatsRequest};
use msatrim::prelude::*;

#[derive(FromArgs)]
/// msastat - Gap, conservation and identity statistics of an alignment
struct StatArgs {
    /// input alignment in FASTA format
    #[argh(option, short = 'i')]
    input: String,

    /// write the tables to this file instead of stdout
    #[argh(option, short = 'o')]
    output: Option<String>,

    /// similarity matrix file
    #[argh(option)]
    matrix: Option<String>,

    /// built-in similarity matrix: blosum62, nt, nt-degenerate, degenerated_nt_identity
    #[argh(option)]
    alternative_matrix: Option<String>,

    /// half-width of the gap and similarity windows
    #[argh(option, default = "0")]
    window: usize,

    /// residue overlap used by the overlap table (0.0-1.0, default: 0.5)
    #[argh(option, default = "0.5")]
    resoverlap: f64,

    /// print every table
    #[argh(switch)]
    all: bool,

    /// print gaps per column
    #[argh(switch)]
    sgc: bool,

    /// print the gap distribution
    #[argh(switch)]
    sgt: bool,

    /// print conservation per column
    #[argh(switch)]
    scc: bool,

    /// print the conservation distribution
    #[argh(switch)]
    sct: bool,

    /// print the sequence identity summary
    #[argh(switch)]
    sident: bool,

    /// print the per-sequence overlap
    #[argh(switch)]
    soverlap: bool,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    threads: Option<usize>,

    /// log level: off, error, warn, info, debug, trace (default: warn)
    #[argh(option, default = "String::from(\"warn\")")]
    log_level: String,
}

fn main() {
    if let Err(e) = run_main() {
        eprintln!("❌ ERROR: {}", e);
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), String> {
    let args: StatArgs = argh::from_env();
    let command_line = std::env::args().collect::<Vec<String>>().join(" ");

    let level = LevelFilter::from_str(&args.log_level)
        .map_err(|_| format!("Invalid log level '{}'", args.log_level))?;
    TermLogger::init(level, Default::default(), TerminalMode::Stderr, ColorChoice::Auto)
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| format!("Failed to configure thread pool: {}", e))?;
    }
    if !(0.0..=1.0).contains(&args.resoverlap) {
        return Err("--resoverlap must be between 0 and 1".to_string());
    }

    let request = if args.all {
        StatsRequest {
            gaps_per_column: true,
            gap_totals: true,
            conservation_per_column: true,
            conservation_totals: true,
            identity: true,
            overlap: true,
            ..StatsRequest::default()
        }
    } else {
        StatsRequest {
            gaps_per_column: args.sgc,
            gap_totals: args.sgt,
            conservation_per_column: args.scc,
            conservation_totals: args.sct,
            identity: args.sident,
            overlap: args.soverlap,
            ..StatsRequest::default()
        }
    };
    if !request.any() {
        return Err("No statistics requested (use --all or any of --sgc, --sgt, --scc, --sct, --sident, --soverlap)".to_string());
    }

    let matrix = load_alignment(&PathBuf::from(&args.input))?;
    log::info!(
        "{}: {} sequences x {} columns, {}",
        args.input,
        matrix.sequence_count(),
        matrix.column_count(),
        matrix.sequence_type().description()
    );

    let choice = match (&args.matrix, &args.alternative_matrix) {
        (Some(_), Some(_)) => {
            return Err("--matrix is not compatible with --alternative-matrix".to_string());
        }
        (Some(path), None) => MatrixChoice::File(PathBuf::from(path)),
        (None, Some(name)) => MatrixChoice::Builtin(BuiltinMatrix::from_str(name)?),
        (None, None) => MatrixChoice::Default,
    };
    let similarity = if request.needs_similarity() {
        Some(choice.resolve(matrix.sequence_type())?)
    } else {
        None
    };

    let plan = TrimPlan {
        gap_window: args.window,
        similarity_window: args.window,
        ..TrimPlan::default()
    };
    let inputs = TrimInputs {
        similarity: similarity.as_ref(),
        consistency: None,
    };
    let tables = collect_tables(&request, &matrix, &plan, &inputs, args.resoverlap)?;

    match &args.output {
        Some(path) => write_tables_file(&PathBuf::from(path), &command_line, &tables)?,
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            write_tables(&mut handle, &command_line, &tables)?;
        }
    }
    Ok(())
}
