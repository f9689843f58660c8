//! Command line argument parsing for the aktstk CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{InvalidIdPolicy, PipelineConfig};
use crate::error::Result;

/// aktstk - Clean, tag and merge a corpus of funding requests
#[derive(Parser, Debug, Clone)]
#[command(name = "aktstk")]
#[command(about = "Clean a corpus of funding requests, tag it with UDPipe and join tokens to metadata")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct AktstkArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Summary output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl AktstkArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the whole pipeline and write the tagged corpus
    Run(RunArgs),

    /// Load and clean the corpus without tagging it
    Clean(CleanArgs),
}

/// Options shared by every command that cleans a corpus.
#[derive(Parser, Debug, Clone)]
pub struct CorpusArgs {
    /// Corpus file (.csv, .tsv, .jsonl)
    #[arg(short, long, value_name = "CORPUS")]
    pub input: PathBuf,

    /// Pipeline configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Literal prefix in front of act numbers
    #[arg(long)]
    pub act_prefix: Option<String>,

    /// What to do with act numbers that do not parse
    #[arg(long, value_name = "POLICY")]
    pub on_invalid_id: Option<InvalidIdArg>,

    /// Minimum raw character length (inclusive)
    #[arg(long)]
    pub min_length: Option<usize>,

    /// Maximum raw character length (inclusive)
    #[arg(long)]
    pub max_length: Option<usize>,

    /// Write quarantined records here
    #[arg(long, value_name = "FILE")]
    pub quarantine_output: Option<PathBuf>,
}

impl CorpusArgs {
    /// Build the effective configuration: file values, then flag overrides.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(prefix) = &self.act_prefix {
            config.corpus.act_prefix = prefix.clone();
        }
        if let Some(policy) = self.on_invalid_id {
            config.corpus.on_invalid_id = policy.into();
        }
        if let Some(min_length) = self.min_length {
            config.filter.min_length = min_length;
        }
        if let Some(max_length) = self.max_length {
            config.filter.max_length = max_length;
        }

        Ok(config)
    }
}

/// Arguments for a full run
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Output table (.csv or .jsonl)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    /// UDPipe model file
    #[arg(short, long, value_name = "MODEL", env = "AKTSTK_MODEL")]
    pub model: PathBuf,

    /// UDPipe executable
    #[arg(long, default_value = "udpipe", env = "AKTSTK_UDPIPE")]
    pub udpipe_bin: PathBuf,

    /// Directory for cached annotations
    #[arg(long, default_value = ".aktstk-cache")]
    pub cache_dir: PathBuf,

    /// Disable the annotation cache
    #[arg(long, conflicts_with = "overwrite")]
    pub no_cache: bool,

    /// Recompute annotations even if cached
    #[arg(long)]
    pub overwrite: bool,

    /// Number of annotation workers
    #[arg(short, long)]
    pub parallelism: Option<usize>,
}

impl RunArgs {
    /// The corpus configuration with annotation flags applied.
    pub fn to_config(&self) -> Result<PipelineConfig> {
        let mut config = self.corpus.to_config()?;
        if let Some(parallelism) = self.parallelism {
            config.annotation.parallelism = parallelism;
        }
        if self.overwrite {
            config.annotation.overwrite = true;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Arguments for cleaning only
#[derive(Parser, Debug, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Cleaned corpus output (.csv or .jsonl)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,
}

/// Invalid act number policy as a CLI value
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidIdArg {
    /// Fail the run
    Reject,
    /// Set the record aside and continue
    Quarantine,
}

impl From<InvalidIdArg> for InvalidIdPolicy {
    fn from(arg: InvalidIdArg) -> Self {
        match arg {
            InvalidIdArg::Reject => InvalidIdPolicy::Reject,
            InvalidIdArg::Quarantine => InvalidIdPolicy::Quarantine,
        }
    }
}

/// Output formats for the run summary
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args() {
        let args = AktstkArgs::try_parse_from([
            "aktstk",
            "-vv",
            "run",
            "--input",
            "corpus.csv",
            "--output",
            "tagged.csv",
            "--model",
            "danish.udpipe",
            "--parallelism",
            "4",
            "--min-length",
            "500",
            "--on-invalid-id",
            "quarantine",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 2);
        let Command::Run(run) = args.command else {
            panic!("Expected run command");
        };

        let config = run.to_config().unwrap();
        assert_eq!(config.annotation.parallelism, 4);
        assert_eq!(config.filter.min_length, 500);
        assert_eq!(config.filter.max_length, 5000);
        assert_eq!(config.corpus.on_invalid_id, InvalidIdPolicy::Quarantine);
        assert_eq!(run.udpipe_bin, PathBuf::from("udpipe"));
        assert!(!run.no_cache);
    }

    #[test]
    fn test_clean_args() {
        let args = AktstkArgs::try_parse_from([
            "aktstk",
            "--quiet",
            "--format",
            "json",
            "clean",
            "-i",
            "corpus.jsonl",
            "-o",
            "clean.jsonl",
        ])
        .unwrap();

        assert_eq!(args.verbosity(), 0);
        assert_eq!(args.output_format, OutputFormat::Json);
        assert!(matches!(args.command, Command::Clean(_)));
    }

    #[test]
    fn test_inverted_bounds_fail_validation() {
        let args = AktstkArgs::try_parse_from([
            "aktstk",
            "run",
            "-i",
            "corpus.csv",
            "-o",
            "out.csv",
            "-m",
            "model.udpipe",
            "--min-length",
            "9000",
        ])
        .unwrap();

        let Command::Run(run) = args.command else {
            panic!("Expected run command");
        };
        assert!(run.to_config().is_err());
    }

    #[test]
    fn test_no_cache_conflicts_with_overwrite() {
        let result = AktstkArgs::try_parse_from([
            "aktstk",
            "run",
            "-i",
            "corpus.csv",
            "-o",
            "out.csv",
            "-m",
            "model.udpipe",
            "--no-cache",
            "--overwrite",
        ]);
        assert!(result.is_err());
    }
}
