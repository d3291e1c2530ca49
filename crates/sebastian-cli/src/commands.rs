use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sebastian_core::BatchName;

#[derive(Debug, Parser)]
#[command(name = "sebastian")]
#[command(about = "Merge and verify localization batch workbooks", long_about = None)]
pub struct Cli {
    /// Folder holding the `{YYMMDD}_{BATCH}` batch folders (overrides the configured root)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Answer yes to every overwrite question
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Log at debug level unless TRACING_LEVEL says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the batch folders found under the root and their completeness
    Scan,
    /// Merge the selected batches into one workbook per language
    MergeBatches {
        /// Batch loaded first; its rows keep their positions
        #[arg(long, default_value = "REGULAR")]
        base: BatchName,
        /// Batches to merge, e.g. REGULAR EXTRA0 EXTRA1
        #[arg(required = true, num_args = 2..)]
        batches: Vec<BatchName>,
    },
    /// Put the original quoting back into a CSV exported by an external editor
    RestoreCsv {
        #[arg(long)]
        original: PathBuf,
        #[arg(long)]
        export: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Compare two snapshot folders and write the changed Targets to a workbook
    Diff {
        #[arg(long)]
        old: PathBuf,
        #[arg(long)]
        new: PathBuf,
        /// Defaults to `{YYYYMMDDHHMMSS}_DIFF.xlsx` in the current folder
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print configuration values
    PrintConfig,
}
