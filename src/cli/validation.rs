// validation.rs - Turn raw arguments into a closed trimming plan

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use regex::Regex;

use crate::cli::args::Args;
use crate::core::{
    BuiltinMatrix, SequenceSelection, SequenceType, SimilarityMatrix, TrimMethod, TrimPlan,
};
use crate::data::{parse_index_list, SequenceFilter};
use crate::output::{OutputFormat, StatsRequest};

/// Residue overlap used by the overlap table when no spurious cut is requested
pub const DEFAULT_STATS_RESIDUE_OVERLAP: f64 = 0.5;

/// Where the similarity matrix comes from
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixChoice {
    /// Picked from the detected sequence type
    Default,
    Builtin(BuiltinMatrix),
    File(PathBuf),
}

impl MatrixChoice {
    pub fn resolve(&self, sequence_type: SequenceType) -> Result<SimilarityMatrix, String> {
        match self {
            MatrixChoice::Default => Ok(SimilarityMatrix::for_sequence_type(sequence_type)),
            MatrixChoice::Builtin(builtin) => Ok(builtin.build()),
            MatrixChoice::File(path) => {
                SimilarityMatrix::from_file(path).map_err(|e| e.to_string())
            }
        }
    }
}

pub struct ValidationResult {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub compareset: Option<PathBuf>,
    pub forceselect: Option<PathBuf>,
    pub plan: TrimPlan,
    pub sequence_filter: SequenceFilter,
    pub matrix: MatrixChoice,
    pub stats: StatsRequest,
    pub stats_output: Option<PathBuf>,
    pub stats_json: Option<PathBuf>,
    /// Residue overlap for the overlap table
    pub stats_residue_overlap: f64,
    pub log_level: LevelFilter,
}

/// Validate all command line arguments
pub fn validate_args(args: &Args) -> Result<ValidationResult, String> {
    let log_level = LevelFilter::from_str(&args.log_level)
        .map_err(|_| format!("Invalid log level '{}'. Use: off, error, warn, info, debug, trace", args.log_level))?;
    let format = OutputFormat::from_str(&args.format)?;

    if args.threads == Some(0) {
        return Err("--threads must be at least 1".to_string());
    }

    // Inputs
    if args.compareset.is_some() && args.input.is_some() {
        return Err("--input is not compatible with --compareset (use --forceselect to score a given alignment)".to_string());
    }
    if args.compareset.is_none() && args.input.is_none() {
        return Err("--input or --compareset is required".to_string());
    }
    if args.forceselect.is_some() && args.compareset.is_none() {
        return Err("--forceselect requires --compareset".to_string());
    }

    let method = validate_method(args)?;
    let mut plan = TrimPlan {
        method,
        sequences: validate_sequence_selection(args)?,
        keep_sequences: args.keepseqs,
        ..TrimPlan::default()
    };

    // Windows
    if args.window.is_some()
        && (args.gapwindow.is_some() || args.simwindow.is_some() || args.conwindow.is_some())
    {
        return Err("--window is not compatible with --gapwindow, --simwindow or --conwindow".to_string());
    }
    plan.gap_window = args.gapwindow.or(args.window).unwrap_or(0);
    plan.similarity_window = args.simwindow.or(args.window).unwrap_or(0);
    plan.consistency_window = args.conwindow.or(args.window).unwrap_or(0);
    if args.conwindow.is_some() && args.compareset.is_none() {
        return Err("--conwindow requires --compareset".to_string());
    }

    // Block size
    if let Some(block) = args.block {
        if block == 0 {
            return Err("--block must be at least 1".to_string());
        }
        match &plan.method {
            None
            | Some(TrimMethod::NoGaps)
            | Some(TrimMethod::NoAllGaps)
            | Some(TrimMethod::SelectColumns(_)) => {
                return Err("--block requires a threshold or automated trimming method".to_string());
            }
            Some(_) => plan.block_size = block,
        }
    }

    // Terminal-only trimming
    if let Some(boundaries) = &args.boundaries {
        if !args.terminalonly {
            return Err("--boundaries requires --terminalonly".to_string());
        }
        plan.boundaries = Some(parse_boundaries(boundaries)?);
    }
    if args.terminalonly && plan.method.is_none() {
        return Err("--terminalonly requires a column trimming method".to_string());
    }
    plan.terminal_only = args.terminalonly;

    // Sequence name filters are resolved into a removal list once the alignment is loaded
    let sequence_filter = build_sequence_filter(args)?;
    if sequence_filter.is_active() {
        match &plan.sequences {
            None => plan.sequences = Some(SequenceSelection::Remove(Vec::new())),
            Some(SequenceSelection::Remove(_)) => {}
            Some(_) => {
                return Err("Sequence name filters are only compatible with --selectseqs".to_string());
            }
        }
    }

    // Complementary output
    if args.complementary && plan.method.is_none() {
        return Err("--complementary requires a column trimming method".to_string());
    }
    if args.complementseq && plan.sequences.is_none() {
        return Err("--complementseq requires a sequence selection".to_string());
    }
    plan.complementary_columns = args.complementary;
    plan.complementary_sequences = args.complementseq;

    // Similarity matrix
    let matrix = match (&args.matrix, &args.alternative_matrix) {
        (Some(_), Some(_)) => {
            return Err("--matrix is not compatible with --alternative-matrix".to_string());
        }
        (Some(path), None) => MatrixChoice::File(PathBuf::from(path)),
        (None, Some(name)) => MatrixChoice::Builtin(BuiltinMatrix::from_str(name)?),
        (None, None) => MatrixChoice::Default,
    };

    // Statistics
    let stats = StatsRequest {
        gaps_per_column: args.sgc,
        gap_totals: args.sgt,
        conservation_per_column: args.scc,
        conservation_totals: args.sct,
        identity: args.sident,
        overlap: args.soverlap,
        consistency_per_column: args.sfc,
        consistency_totals: args.sft,
    };
    if stats.needs_consistency() && args.compareset.is_none() {
        return Err("--sfc and --sft require --compareset".to_string());
    }
    if args.stats_output.is_some() && !stats.any() {
        return Err("--stats-output requires at least one statistics table".to_string());
    }
    let stats_residue_overlap = match &plan.sequences {
        Some(SequenceSelection::Spurious { residue_overlap, .. }) => *residue_overlap,
        _ => DEFAULT_STATS_RESIDUE_OVERLAP,
    };

    Ok(ValidationResult {
        input: args.input.as_ref().map(PathBuf::from),
        output: args.output.as_ref().map(PathBuf::from),
        format,
        compareset: args.compareset.as_ref().map(PathBuf::from),
        forceselect: args.forceselect.as_ref().map(PathBuf::from),
        plan,
        sequence_filter,
        matrix,
        stats,
        stats_output: args.stats_output.as_ref().map(PathBuf::from),
        stats_json: args.stats_json.as_ref().map(PathBuf::from),
        stats_residue_overlap,
        log_level,
    })
}

fn validate_method(args: &Args) -> Result<Option<TrimMethod>, String> {
    let manual = args.gap_threshold.is_some()
        || args.similarity_threshold.is_some()
        || args.consistency_threshold.is_some();
    let chosen = [
        args.nogaps,
        args.noallgaps,
        args.gappyout,
        args.strict,
        args.strictplus,
        args.automated1,
        manual,
        args.selectcols.is_some(),
    ]
    .iter()
    .filter(|&&set| set)
    .count();
    if chosen > 1 {
        return Err("Only one column trimming method can be used: --nogaps, --noallgaps, --gappyout, --strict, --strictplus, --automated1, thresholds or --selectcols".to_string());
    }

    if args.cons.is_some() && !manual {
        return Err("--cons requires --gap-threshold, --similarity-threshold or --consistency-threshold".to_string());
    }
    let floor = args.cons.unwrap_or(0.0);
    check_range("--cons", floor, 100.0)?;
    let gap_threshold = match args.gap_threshold {
        Some(gt) => {
            check_range("--gap-threshold", gt, 1.0)?;
            // Columns may keep at most this fraction of gaps
            Some(1.0 - gt)
        }
        None => None,
    };
    if let Some(st) = args.similarity_threshold {
        check_range("--similarity-threshold", st, 1.0)?;
    }

    if let Some(ct) = args.consistency_threshold {
        check_range("--consistency-threshold", ct, 1.0)?;
        if args.compareset.is_none() {
            return Err("--consistency-threshold requires --compareset".to_string());
        }
        return Ok(Some(TrimMethod::Consistency {
            conservation_floor: floor,
            consistency_threshold: ct,
            gap_threshold,
            similarity_threshold: args.similarity_threshold,
        }));
    }

    let method = match (gap_threshold, args.similarity_threshold) {
        (Some(gap_threshold), Some(similarity_threshold)) => Some(TrimMethod::GapsAndConservation {
            conservation_floor: floor,
            gap_threshold,
            similarity_threshold,
        }),
        (Some(gap_threshold), None) => Some(TrimMethod::Gaps {
            conservation_floor: floor,
            gap_threshold,
        }),
        (None, Some(similarity_threshold)) => Some(TrimMethod::Conservation {
            conservation_floor: floor,
            similarity_threshold,
        }),
        (None, None) if args.nogaps => Some(TrimMethod::NoGaps),
        (None, None) if args.noallgaps => Some(TrimMethod::NoAllGaps),
        (None, None) if args.gappyout => Some(TrimMethod::GappyOut),
        (None, None) if args.strict => Some(TrimMethod::Strict),
        (None, None) if args.strictplus => Some(TrimMethod::StrictPlus),
        (None, None) if args.automated1 => Some(TrimMethod::Automated),
        (None, None) => match &args.selectcols {
            Some(list) => Some(TrimMethod::SelectColumns(parse_index_list(list)?)),
            None => None,
        },
    };
    Ok(method)
}

fn validate_sequence_selection(args: &Args) -> Result<Option<SequenceSelection>, String> {
    let spurious = args.resoverlap.is_some() || args.seqoverlap.is_some();
    let chosen = [
        args.clusters.is_some(),
        args.maxidentity.is_some(),
        spurious,
        args.selectseqs.is_some(),
    ]
    .iter()
    .filter(|&&set| set)
    .count();
    if chosen > 1 {
        return Err("Only one sequence selection can be used: --clusters, --maxidentity, --resoverlap/--seqoverlap or --selectseqs".to_string());
    }

    if let Some(clusters) = args.clusters {
        if clusters == 0 {
            return Err("--clusters must be at least 1".to_string());
        }
        return Ok(Some(SequenceSelection::Clusters(clusters)));
    }
    if let Some(identity) = args.maxidentity {
        check_range("--maxidentity", identity, 1.0)?;
        return Ok(Some(SequenceSelection::MaxIdentity(identity)));
    }
    if spurious {
        let (Some(residue_overlap), Some(sequence_overlap)) = (args.resoverlap, args.seqoverlap) else {
            return Err("--resoverlap and --seqoverlap must be used together".to_string());
        };
        check_range("--resoverlap", residue_overlap, 1.0)?;
        check_range("--seqoverlap", sequence_overlap, 100.0)?;
        return Ok(Some(SequenceSelection::Spurious {
            residue_overlap,
            sequence_overlap: sequence_overlap / 100.0,
        }));
    }
    if let Some(list) = &args.selectseqs {
        return Ok(Some(SequenceSelection::Remove(parse_index_list(list)?)));
    }
    Ok(None)
}

fn build_sequence_filter(args: &Args) -> Result<SequenceFilter, String> {
    let include_regex = match &args.include_seqs {
        Some(pattern) => Some(Regex::new(pattern).map_err(|e| format!("Invalid include_seqs regex: {}", e))?),
        None => None,
    };
    let exclude_regex = match &args.exclude_seqs {
        Some(pattern) => Some(Regex::new(pattern).map_err(|e| format!("Invalid exclude_seqs regex: {}", e))?),
        None => None,
    };
    let include_names = match &args.include_seqs_list {
        Some(file_path) => Some(load_set_from_file(file_path)?),
        None => None,
    };
    let exclude_names = match &args.exclude_seqs_list {
        Some(file_path) => Some(load_set_from_file(file_path)?),
        None => None,
    };

    Ok(SequenceFilter {
        include_regex,
        exclude_regex,
        include_names,
        exclude_names,
    })
}

fn check_range(option: &str, value: f64, max: f64) -> Result<(), String> {
    if !(0.0..=max).contains(&value) {
        return Err(format!("{} must be between 0 and {}", option, max));
    }
    Ok(())
}

/// Parse "left,right" column boundaries
fn parse_boundaries(value: &str) -> Result<(usize, usize), String> {
    let (left, right) = value
        .split_once(',')
        .ok_or_else(|| format!("Invalid boundaries '{}': expected \"left,right\"", value))?;
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid boundary '{}' in '{}'", s.trim(), value))
    };
    Ok((parse(left)?, parse(right)?))
}

/// Load a set of strings from a file (one per line)
fn load_set_from_file(file_path: &str) -> Result<HashSet<String>, String> {
    let file = File::open(file_path)
        .map_err(|e| format!("Failed to open filter file '{}': {}", file_path, e))?;

    let reader = BufReader::new(file);
    let mut set = HashSet::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Failed to read line {} from '{}': {}",
                                           line_num + 1, file_path, e))?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            set.insert(trimmed.to_string());
        }
    }

    Ok(set)
}
