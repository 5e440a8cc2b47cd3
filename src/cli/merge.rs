// merge.rs - Merge configuration file with CLI arguments

use std::str::FromStr;

use crate::cli::{Args, Config};
use crate::core::TrimMethod;

impl Args {
    /// Merge with configuration from file
    /// CLI arguments take precedence over config file values.
    /// Unknown method or statistic names in the config are errors.
    pub fn merge_with_config(mut self, config: Config) -> Result<Self, String> {
        // Input/Output
        if self.input.is_none() {
            self.input = config.input;
        }
        if self.output.is_none() {
            self.output = config.output;
        }
        if self.format == "fasta" {
            if let Some(format) = config.format {
                self.format = format;
            }
        }
        if self.compareset.is_none() {
            self.compareset = config.compareset;
        }
        if self.forceselect.is_none() {
            self.forceselect = config.forceselect;
        }

        // Column trimming: a configured method only applies when the command
        // line names none
        let cli_method = self.nogaps
            || self.noallgaps
            || self.gappyout
            || self.strict
            || self.strictplus
            || self.automated1
            || self.gap_threshold.is_some()
            || self.similarity_threshold.is_some()
            || self.consistency_threshold.is_some()
            || self.selectcols.is_some();
        if !cli_method {
            if let Some(name) = config.method.as_deref() {
                match TrimMethod::from_str(name)? {
                    TrimMethod::NoGaps => self.nogaps = true,
                    TrimMethod::NoAllGaps => self.noallgaps = true,
                    TrimMethod::GappyOut => self.gappyout = true,
                    TrimMethod::Strict => self.strict = true,
                    TrimMethod::StrictPlus => self.strictplus = true,
                    TrimMethod::Automated => self.automated1 = true,
                    other => return Err(format!("Invalid method: {:?}", other)),
                }
            }
            self.gap_threshold = config.gap_threshold;
            self.similarity_threshold = config.similarity_threshold;
            self.consistency_threshold = config.consistency_threshold;
            self.selectcols = config.selectcols;
        }
        if self.cons.is_none() {
            self.cons = config.cons;
        }

        // Sequence selection
        if self.clusters.is_none() {
            self.clusters = config.clusters;
        }
        if self.maxidentity.is_none() {
            self.maxidentity = config.maxidentity;
        }
        if self.resoverlap.is_none() {
            self.resoverlap = config.resoverlap;
        }
        if self.seqoverlap.is_none() {
            self.seqoverlap = config.seqoverlap;
        }
        if self.selectseqs.is_none() {
            self.selectseqs = config.selectseqs;
        }
        if self.include_seqs.is_none() {
            self.include_seqs = config.include_seqs;
        }
        if self.exclude_seqs.is_none() {
            self.exclude_seqs = config.exclude_seqs;
        }
        if self.include_seqs_list.is_none() {
            self.include_seqs_list = config.include_seqs_list;
        }
        if self.exclude_seqs_list.is_none() {
            self.exclude_seqs_list = config.exclude_seqs_list;
        }

        // Windows and blocks
        if self.window.is_none() {
            self.window = config.window;
        }
        if self.gapwindow.is_none() {
            self.gapwindow = config.gapwindow;
        }
        if self.simwindow.is_none() {
            self.simwindow = config.simwindow;
        }
        if self.conwindow.is_none() {
            self.conwindow = config.conwindow;
        }
        if self.block.is_none() {
            self.block = config.block;
        }

        // Similarity
        if self.matrix.is_none() && self.alternative_matrix.is_none() {
            self.matrix = config.matrix;
            self.alternative_matrix = config.alternative_matrix;
        }

        // Flags (CLI flags take precedence, config only sets if not explicitly set)
        if !self.terminalonly && config.terminalonly.unwrap_or(false) {
            self.terminalonly = true;
        }
        if self.boundaries.is_none() {
            self.boundaries = config.boundaries;
        }
        if !self.complementary && config.complementary.unwrap_or(false) {
            self.complementary = true;
        }
        if !self.complementseq && config.complementseq.unwrap_or(false) {
            self.complementseq = true;
        }
        if !self.keepseqs && config.keepseqs.unwrap_or(false) {
            self.keepseqs = true;
        }
        if !self.colnumbering && config.colnumbering.unwrap_or(false) {
            self.colnumbering = true;
        }

        // Statistics
        if !self.wants_stats() {
            for name in config.stats.unwrap_or_default() {
                match name.to_lowercase().as_str() {
                    "sgc" => self.sgc = true,
                    "sgt" => self.sgt = true,
                    "scc" => self.scc = true,
                    "sct" => self.sct = true,
                    "sident" => self.sident = true,
                    "soverlap" => self.soverlap = true,
                    "sfc" => self.sfc = true,
                    "sft" => self.sft = true,
                    other => {
                        return Err(format!(
                            "Invalid statistic: {}. Use: sgc, sgt, scc, sct, sident, soverlap, sfc, sft",
                            other
                        ))
                    }
                }
            }
        }
        if self.stats_output.is_none() {
            self.stats_output = config.stats_output;
        }
        if self.stats_json.is_none() {
            self.stats_json = config.stats_json;
        }

        // Runtime
        if self.threads.is_none() {
            self.threads = config.threads;
        }
        if self.log_level == "info" {
            if let Some(level) = config.log_level {
                self.log_level = level;
            }
        }

        Ok(self)
    }

    /// Load configuration and merge with CLI args
    pub fn with_config_file(self, config_path: &str) -> Result<Self, String> {
        let config = Config::from_file(config_path)?;
        self.merge_with_config(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_fills_unset_values() {
        let config = Config {
            input: Some("aln.fasta".to_string()),
            method: Some("strict".to_string()),
            block: Some(4),
            stats: Some(vec!["sgt".to_string(), "sident".to_string()]),
            log_level: Some("debug".to_string()),
            ..Config::default()
        };
        let args = Args::empty().merge_with_config(config).unwrap();
        assert_eq!(args.input.as_deref(), Some("aln.fasta"));
        assert!(args.strict);
        assert_eq!(args.block, Some(4));
        assert!(args.sgt && args.sident && !args.sgc);
        assert_eq!(args.log_level, "debug");
    }

    #[test]
    fn test_command_line_wins() {
        let mut args = Args::empty();
        args.input = Some("cli.fasta".to_string());
        args.gap_threshold = Some(0.7);
        args.format = "phylip".to_string();

        let config = Config {
            input: Some("config.fasta".to_string()),
            method: Some("gappyout".to_string()),
            similarity_threshold: Some(0.1),
            format: Some("fasta".to_string()),
            ..Config::default()
        };
        let args = args.merge_with_config(config).unwrap();
        assert_eq!(args.input.as_deref(), Some("cli.fasta"));
        assert!(!args.gappyout);
        assert_eq!(args.gap_threshold, Some(0.7));
        assert!(args.similarity_threshold.is_none());
        assert_eq!(args.format, "phylip");
    }

    #[test]
    fn test_unknown_configured_method_is_an_error() {
        let config = Config {
            method: Some("gapyout".to_string()),
            ..Config::default()
        };
        let err = Args::empty().merge_with_config(config).unwrap_err();
        assert!(err.contains("Invalid method: gapyout"), "{}", err);

        let config = Config {
            method: Some("GappyOut".to_string()),
            ..Config::default()
        };
        assert!(Args::empty().merge_with_config(config).unwrap().gappyout);
    }

    #[test]
    fn test_unknown_configured_statistic_is_an_error() {
        let config = Config {
            stats: Some(vec!["sgt".to_string(), "sgx".to_string()]),
            ..Config::default()
        };
        let err = Args::empty().merge_with_config(config).unwrap_err();
        assert!(err.contains("Invalid statistic: sgx"), "{}", err);
    }
}
