//! Command implementations for the aktstk CLI.

use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::annotation::cache::AnnotationCache;
use crate::annotation::udpipe::UdpipeAnnotator;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::corpus::clean_corpus;
use crate::corpus::document::RawDocument;
use crate::corpus::loader::load_corpus;
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::storage::write_table;

/// Execute a CLI command.
pub fn execute_command(args: AktstkArgs) -> Result<()> {
    match &args.command {
        Command::Run(run_args) => run_pipeline(run_args, &args),
        Command::Clean(clean_args) => clean_only(clean_args, &args),
    }
}

fn write_quarantine(path: Option<&Path>, quarantined: &[RawDocument]) -> Result<Option<String>> {
    match path {
        Some(path) => {
            write_table(path, quarantined, None)?;
            Ok(Some(path.display().to_string()))
        }
        None => Ok(None),
    }
}

/// Run the full pipeline.
fn run_pipeline(args: &RunArgs, cli_args: &AktstkArgs) -> Result<()> {
    let config = args.to_config()?;
    let raw = load_corpus(&args.corpus.input, None)?;

    let annotator = UdpipeAnnotator::new(&args.udpipe_bin, &args.model)?;
    let mut pipeline = Pipeline::new(config, Arc::new(annotator))?;
    if args.no_cache {
        info!("Annotation cache disabled");
    } else {
        pipeline = pipeline.with_cache(AnnotationCache::new(&args.cache_dir)?);
    }

    let output = pipeline.run(raw)?;
    output.corpus.check_unique_metadata()?;

    let rows_written = write_table(&args.output, output.corpus.rows(), None)?;
    let quarantine_output = write_quarantine(
        args.corpus.quarantine_output.as_deref(),
        &output.quarantined,
    )?;

    output_result(
        "Tagged corpus written",
        &RunSummary {
            output: args.output.display().to_string(),
            rows_written,
            quarantine_output,
            report: output.report,
        },
        cli_args,
    )
}

/// Load and clean a corpus, writing the documents that would be tagged.
fn clean_only(args: &CleanArgs, cli_args: &AktstkArgs) -> Result<()> {
    let config = args.corpus.to_config()?;
    config.validate()?;
    let raw = load_corpus(&args.corpus.input, None)?;

    let cleaned = clean_corpus(raw, &config)?;

    let documents_written = write_table(&args.output, &cleaned.documents, None)?;
    let quarantine_output = write_quarantine(
        args.corpus.quarantine_output.as_deref(),
        &cleaned.quarantined,
    )?;

    output_result(
        "Cleaned corpus written",
        &CleanSummary {
            output: args.output.display().to_string(),
            documents_written,
            quarantine_output,
            report: cleaned.report,
        },
        cli_args,
    )
}
