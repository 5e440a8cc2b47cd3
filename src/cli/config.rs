// config.rs - Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    // Input/Output
    pub input: Option<String>,
    pub output: Option<String>,
    pub format: Option<String>,
    pub compareset: Option<String>,
    pub forceselect: Option<String>,

    // Column trimming: one of "nogaps", "noallgaps", "gappyout", "strict",
    // "strictplus", "automated1"
    pub method: Option<String>,
    pub gap_threshold: Option<f64>,
    pub similarity_threshold: Option<f64>,
    pub consistency_threshold: Option<f64>,
    pub cons: Option<f64>,
    pub selectcols: Option<String>,

    // Sequence selection
    pub clusters: Option<usize>,
    pub maxidentity: Option<f64>,
    pub resoverlap: Option<f64>,
    pub seqoverlap: Option<f64>,
    pub selectseqs: Option<String>,
    pub include_seqs: Option<String>,
    pub exclude_seqs: Option<String>,
    pub include_seqs_list: Option<String>,
    pub exclude_seqs_list: Option<String>,

    // Windows and blocks
    pub window: Option<usize>,
    pub gapwindow: Option<usize>,
    pub simwindow: Option<usize>,
    pub conwindow: Option<usize>,
    pub block: Option<usize>,

    // Similarity
    pub matrix: Option<String>,
    pub alternative_matrix: Option<String>,

    // Flags
    pub terminalonly: Option<bool>,
    pub boundaries: Option<String>,
    pub complementary: Option<bool>,
    pub complementseq: Option<bool>,
    pub keepseqs: Option<bool>,
    pub colnumbering: Option<bool>,

    // Statistics
    pub stats: Option<Vec<String>>,
    pub stats_output: Option<String>,
    pub stats_json: Option<String>,

    // Runtime
    pub threads: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        // stderr keeps a piped alignment on stdout clean
        eprintln!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        fs::write(path, content)
            .map_err(|e| format!("Failed to write config file '{}': {}", path.display(), e))?;

        println!("📄 Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Generate a sample configuration file with comments
    pub fn generate_sample() -> String {
        r#"# msatrim.toml - Configuration file for msatrim
# Command line arguments will override these settings

# =============================================================================
# INPUT/OUTPUT
# =============================================================================

# Input alignment (FASTA)
input = "/path/to/alignment.fasta"

# Trimmed alignment
output = "trimmed.fasta"

# Output format: fasta, phylip
format = "fasta"

# Alternative alignments of the same sequences, one path per line
# compareset = "alignments.txt"

# =============================================================================
# COLUMN TRIMMING
# =============================================================================

# Automated method: nogaps, noallgaps, gappyout, strict, strictplus, automated1
method = "automated1"

# Manual thresholds (use instead of method)
# gap_threshold = 0.9
# similarity_threshold = 0.001
# consistency_threshold = 0.5

# Minimum percentage of columns to keep with manual thresholds
# cons = 60.0

# Columns to remove
# selectcols = "0-10,200-210"

# =============================================================================
# SEQUENCE SELECTION
# =============================================================================

# clusters = 10
# maxidentity = 0.9
# resoverlap = 0.75
# seqoverlap = 80.0
# selectseqs = "0,3"
# include_seqs = "^human_"
# exclude_seqs = "partial"

# =============================================================================
# WINDOWS AND BLOCKS
# =============================================================================

# window = 1
# gapwindow = 2
# simwindow = 2
# conwindow = 2
# block = 5

# =============================================================================
# SIMILARITY
# =============================================================================

# Similarity matrix file, or a built-in one:
# blosum62, nt, nt-degenerate, degenerated_nt_identity
# matrix = "custom.mat"
# alternative_matrix = "degenerated_nt_identity"

# =============================================================================
# FLAGS
# =============================================================================

terminalonly = false
# boundaries = "10,250"
complementary = false
complementseq = false
keepseqs = false
colnumbering = false

# =============================================================================
# STATISTICS
# =============================================================================

# Any of: sgc, sgt, scc, sct, sident, soverlap, sfc, sft
# stats = ["sgt", "sident"]
# stats_output = "stats.tsv"
# stats_json = "summary.json"

# =============================================================================
# RUNTIME
# =============================================================================

# Number of threads (omit for auto-detection)
# threads = 8

# off, error, warn, info, debug, trace
log_level = "info"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::generate_sample()).unwrap();
        assert_eq!(config.method.as_deref(), Some("automated1"));
        assert_eq!(config.format.as_deref(), Some("fasta"));
        assert_eq!(config.terminalonly, Some(false));
        assert!(config.gap_threshold.is_none());
    }

    #[test]
    fn test_config_file_round_trip() {
        let path = std::env::temp_dir().join(format!("msatrim-config-{}.toml", std::process::id()));
        let config = Config {
            input: Some("aln.fasta".to_string()),
            gap_threshold: Some(0.8),
            stats: Some(vec!["sgt".to_string()]),
            ..Config::default()
        };
        config.to_file(&path).unwrap();
        assert_eq!(Config::from_file(&path).unwrap(), config);
        std::fs::remove_file(&path).ok();
    }
}
