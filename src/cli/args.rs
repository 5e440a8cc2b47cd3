// args.rs - Command line arguments definition

use argh::FromArgs;

#[derive(FromArgs, Debug)]
/// msatrim - Gap, conservation and consistency driven alignment trimming
pub struct Args {
    /// input alignment in FASTA format
    #[argh(option, short = 'i')]
    pub input: Option<String>,

    /// output file for the trimmed alignment
    #[argh(option, short = 'o')]
    pub output: Option<String>,

    /// output format: fasta, phylip (default: fasta)
    #[argh(option, default = "String::from(\"fasta\")")]
    pub format: String,

    /// file listing alternative alignments of the same sequences, one path per line
    #[argh(option)]
    pub compareset: Option<String>,

    /// alignment scored against the compare-set instead of the most consistent one
    #[argh(option)]
    pub forceselect: Option<String>,

    /// remove every column containing gaps
    #[argh(switch)]
    pub nogaps: bool,

    /// remove columns composed only of gaps
    #[argh(switch)]
    pub noallgaps: bool,

    /// trim at the inflection of the gap distribution
    #[argh(switch)]
    pub gappyout: bool,

    /// combine the gap inflection with a conservation cut
    #[argh(switch)]
    pub strict: bool,

    /// like --strict with blocks proportional to the alignment width
    #[argh(switch)]
    pub strictplus: bool,

    /// choose gappyout or strict from the sequence identity distribution
    #[argh(switch)]
    pub automated1: bool,

    /// minimum fraction of sequences without a gap in a kept column (0.0-1.0)
    #[argh(option)]
    pub gap_threshold: Option<f64>,

    /// minimum column similarity score (0.0-1.0)
    #[argh(option)]
    pub similarity_threshold: Option<f64>,

    /// minimum column consistency against the compare-set (0.0-1.0)
    #[argh(option)]
    pub consistency_threshold: Option<f64>,

    /// minimum percentage of columns to keep (0-100)
    #[argh(option)]
    pub cons: Option<f64>,

    /// keep this many cluster representatives
    #[argh(option)]
    pub clusters: Option<usize>,

    /// keep representatives at this identity threshold (0.0-1.0)
    #[argh(option)]
    pub maxidentity: Option<f64>,

    /// fraction of other sequences a residue must agree with (0.0-1.0)
    #[argh(option)]
    pub resoverlap: Option<f64>,

    /// minimum percentage of agreeing residues per sequence (0-100)
    #[argh(option)]
    pub seqoverlap: Option<f64>,

    /// columns to remove, e.g. "0,4-10"
    #[argh(option)]
    pub selectcols: Option<String>,

    /// sequences to remove, e.g. "{ 2, 5-7 }"
    #[argh(option)]
    pub selectseqs: Option<String>,

    /// keep only sequences whose name matches regex pattern
    #[argh(option)]
    pub include_seqs: Option<String>,

    /// remove sequences whose name matches regex pattern
    #[argh(option)]
    pub exclude_seqs: Option<String>,

    /// keep only sequences listed in a file (one name per line)
    #[argh(option)]
    pub include_seqs_list: Option<String>,

    /// remove sequences listed in a file (one name per line)
    #[argh(option)]
    pub exclude_seqs_list: Option<String>,

    /// half-width of every statistics window
    #[argh(option)]
    pub window: Option<usize>,

    /// half-width of the gap window
    #[argh(option)]
    pub gapwindow: Option<usize>,

    /// half-width of the similarity window
    #[argh(option)]
    pub simwindow: Option<usize>,

    /// half-width of the consistency window
    #[argh(option)]
    pub conwindow: Option<usize>,

    /// minimum run of kept columns
    #[argh(option)]
    pub block: Option<usize>,

    /// only trim the alignment ends
    #[argh(switch)]
    pub terminalonly: bool,

    /// fixed interior kept by --terminalonly, e.g. "10,250"
    #[argh(option)]
    pub boundaries: Option<String>,

    /// output the removed columns instead of the kept ones
    #[argh(switch)]
    pub complementary: bool,

    /// output the removed sequences instead of the kept ones
    #[argh(switch)]
    pub complementseq: bool,

    /// keep sequences left with only gaps
    #[argh(switch)]
    pub keepseqs: bool,

    /// similarity matrix file
    #[argh(option)]
    pub matrix: Option<String>,

    /// built-in similarity matrix: blosum62, nt, nt-degenerate, degenerated_nt_identity
    #[argh(option)]
    pub alternative_matrix: Option<String>,

    /// print gaps per column
    #[argh(switch)]
    pub sgc: bool,

    /// print the gap distribution
    #[argh(switch)]
    pub sgt: bool,

    /// print conservation per column
    #[argh(switch)]
    pub scc: bool,

    /// print the conservation distribution
    #[argh(switch)]
    pub sct: bool,

    /// print the sequence identity summary
    #[argh(switch)]
    pub sident: bool,

    /// print the per-sequence overlap
    #[argh(switch)]
    pub soverlap: bool,

    /// print consistency per column
    #[argh(switch)]
    pub sfc: bool,

    /// print the consistency distribution
    #[argh(switch)]
    pub sft: bool,

    /// write statistics tables to this file instead of stdout
    #[argh(option)]
    pub stats_output: Option<String>,

    /// write a JSON run summary to this file
    #[argh(option)]
    pub stats_json: Option<String>,

    /// print the original index of every kept column
    #[argh(switch)]
    pub colnumbering: bool,

    /// number of threads (default: auto-detect)
    #[argh(option)]
    pub threads: Option<usize>,

    /// log level: off, error, warn, info, debug, trace (default: info)
    #[argh(option, default = "String::from(\"info\")")]
    pub log_level: String,

    /// configuration file (TOML format)
    #[argh(option)]
    pub config: Option<String>,

    /// generate a sample configuration file and exit
    #[argh(switch)]
    pub generate_config: bool,
}

impl Args {
    /// Arguments with every option unset, as if invoked with no flags
    pub fn empty() -> Self {
        Self {
            input: None,
            output: None,
            format: String::from("fasta"),
            compareset: None,
            forceselect: None,
            nogaps: false,
            noallgaps: false,
            gappyout: false,
            strict: false,
            strictplus: false,
            automated1: false,
            gap_threshold: None,
            similarity_threshold: None,
            consistency_threshold: None,
            cons: None,
            clusters: None,
            maxidentity: None,
            resoverlap: None,
            seqoverlap: None,
            selectcols: None,
            selectseqs: None,
            include_seqs: None,
            exclude_seqs: None,
            include_seqs_list: None,
            exclude_seqs_list: None,
            window: None,
            gapwindow: None,
            simwindow: None,
            conwindow: None,
            block: None,
            terminalonly: false,
            boundaries: None,
            complementary: false,
            complementseq: false,
            keepseqs: false,
            matrix: None,
            alternative_matrix: None,
            sgc: false,
            sgt: false,
            scc: false,
            sct: false,
            sident: false,
            soverlap: false,
            sfc: false,
            sft: false,
            stats_output: None,
            stats_json: None,
            colnumbering: false,
            threads: None,
            log_level: String::from("info"),
            config: None,
            generate_config: false,
        }
    }

    /// Whether any statistics table was requested
    pub fn wants_stats(&self) -> bool {
        self.sgc
            || self.sgt
            || self.scc
            || self.sct
            || self.sident
            || self.soverlap
            || self.sfc
            || self.sft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trimming_flags() {
        let args = Args::from_args(
            &["msatrim"],
            &["-i", "in.fasta", "-o", "out.phy", "--format", "phylip", "--gappyout", "--block", "4"],
        )
        .unwrap();
        assert_eq!(args.input.as_deref(), Some("in.fasta"));
        assert_eq!(args.format, "phylip");
        assert!(args.gappyout);
        assert_eq!(args.block, Some(4));
        assert!(!args.wants_stats());
    }

    #[test]
    fn test_parse_thresholds_and_stats() {
        let args = Args::from_args(
            &["msatrim"],
            &["-i", "in.fasta", "--gap-threshold", "0.9", "--cons", "60", "--sgt", "--sident"],
        )
        .unwrap();
        assert_eq!(args.gap_threshold, Some(0.9));
        assert_eq!(args.cons, Some(60.0));
        assert!(args.sgt && args.sident);
        assert!(args.wants_stats());
        assert_eq!(args.log_level, "info");
    }
}
