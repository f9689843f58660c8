//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{AktstkArgs, OutputFormat};
use crate::corpus::CleaningReport;
use crate::error::Result;
use crate::pipeline::PipelineReport;

/// Result structure for a full run.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    pub output: String,
    pub rows_written: usize,
    pub quarantine_output: Option<String>,
    pub report: PipelineReport,
}

/// Result structure for a cleaning run.
#[derive(Debug, Serialize, Deserialize)]
pub struct CleanSummary {
    pub output: String,
    pub documents_written: usize,
    pub quarantine_output: Option<String>,
    pub report: CleaningReport,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &AktstkArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &AktstkArgs) -> Result<()> {
    if args.verbosity() == 0 {
        return Ok(());
    }

    println!("{message}");
    println!();

    // Convert to JSON value for easier manipulation
    let value = serde_json::to_value(result)?;
    print_value(&value, 0);
    Ok(())
}

fn print_value(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(obj) => {
            for (key, value) in obj {
                let label = key.replace('_', " ");
                match value {
                    serde_json::Value::Object(_) => {
                        println!("{pad}{label}:");
                        print_value(value, indent + 1);
                    }
                    serde_json::Value::Null => println!("{pad}{label}: -"),
                    serde_json::Value::String(s) => println!("{pad}{label}: {s}"),
                    other => println!("{pad}{label}: {other}"),
                }
            }
        }
        other => println!("{pad}{other}"),
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &AktstkArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    println!("{json}");
    Ok(())
}
