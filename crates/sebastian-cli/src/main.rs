mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use sebastian_core::config::{load_configuration, AppConfig};
use sebastian_core::csv_restore::restore_csv_quotes;
use sebastian_core::diff::{diff_file_name, legacy_diff};
use sebastian_core::{
    spawn_merge, BatchMerger, BatchName, Error, MergeSelection, ProgressReporter, WorkerEvent,
};
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();

    let _guard = logging::init_logger(args.verbose);

    let config = match load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };
    let reporter = CliReporter::new(args.yes || config.assume_yes);

    let result = match args.command {
        Some(Commands::Scan) => {
            resolve_root(args.root.as_deref(), &config).and_then(|root| run_scan(&root))
        }
        Some(Commands::MergeBatches { base, batches }) => resolve_root(args.root.as_deref(), &config)
            .and_then(|root| run_merge(&root, &config, MergeSelection::new(batches, base), &reporter)),
        Some(Commands::RestoreCsv {
            original,
            export,
            output,
        }) => run_restore(&original, &export, &output, &reporter),
        Some(Commands::Diff { old, new, output }) => {
            let output = output.unwrap_or_else(|| PathBuf::from(diff_file_name(&Local::now())));
            run_diff(&old, &new, &output, &reporter)
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        reporter.clear();
        match err.downcast_ref::<Error>() {
            Some(core) if core.is_cancelled() => {
                warn!("{}", "Cancelled, nothing was written".yellow());
            }
            Some(core) => {
                error!("[{}] {:#}", core.code().red(), err);
                process::exit(1);
            }
            None => {
                error!("{:#}", err);
                process::exit(1);
            }
        }
    }
}

fn resolve_root(arg: Option<&Path>, config: &AppConfig) -> Result<PathBuf> {
    arg.map(Path::to_path_buf)
        .or_else(|| config.root_folder.as_ref().map(PathBuf::from))
        .context("No root folder: pass --root or set root_folder in the configuration")
}

fn run_scan(root: &Path) -> Result<()> {
    let merger = BatchMerger::new(root);
    let batches = merger.scan()?;

    println!("Batches under {}:", root.display());
    for batch in batches.values() {
        let state = if batch.is_valid() {
            "complete".green()
        } else if !batch.duplicate_languages.is_empty() {
            let langs: Vec<String> = batch
                .duplicate_languages
                .keys()
                .map(|l| l.to_string())
                .collect();
            format!("duplicate files for {}", langs.join(", ")).yellow()
        } else {
            let langs: Vec<String> = batch
                .missing_languages
                .iter()
                .map(|l| l.to_string())
                .collect();
            format!("missing {}", langs.join(", ")).red()
        };
        println!(
            "  {:<8} {:<20} {}/7 files  {}",
            batch.name.to_string().cyan(),
            batch.folder_name(),
            batch.file_count(),
            state
        );
    }
    Ok(())
}

fn run_merge(
    root: &Path,
    config: &AppConfig,
    selection: MergeSelection,
    reporter: &CliReporter,
) -> Result<()> {
    let merger = BatchMerger::new(root).with_output_dir(config.output_dir(root));
    let names: Vec<String> = selection.batches.iter().map(BatchName::to_string).collect();
    info!("Merging {} from {}", names.join(", "), root.display());

    reporter.start("Merging");
    let handle = spawn_merge(merger, selection);
    for event in handle.events().iter() {
        match event {
            WorkerEvent::Progress { percent, message } => reporter.on_progress(percent, &message),
            WorkerEvent::ConfirmOverwrite { files, reply } => {
                // the worker treats a dropped reply as "no"
                let _ = reply.send(reporter.confirm_overwrite(&files));
            }
        }
    }
    let outcome = handle.join().context("Merge failed")?;
    reporter.finish(&format!(
        "Merged {} batch(es) in {:.2}s",
        outcome.batch_order.len(),
        (outcome.finished_at - outcome.started_at).num_milliseconds() as f64 / 1000.0
    ));

    let order: Vec<String> = outcome.batch_order.iter().map(BatchName::to_string).collect();
    info!("Batch order: {}", order.join(" -> ").cyan());
    info!(
        "{} duplicate KEY(s) resolved, {} row(s) removed per language",
        format!("{}", outcome.resolutions.len()).red(),
        format!("{}", outcome.removed_rows()).red(),
    );
    for (lang, count) in &outcome.final_counts {
        info!("  {:<6} {} rows", lang.to_string(), format!("{}", count).green());
    }
    if outcome.misaligned_rows > 0 {
        warn!(
            "{} row(s) carry a different KEY than EN at the same position",
            format!("{}", outcome.misaligned_rows).yellow()
        );
    }
    for path in outcome.output_files.values() {
        info!("Wrote {}", path.display());
    }
    info!("Log: {}", outcome.log_path.display());
    Ok(())
}

fn run_restore(original: &Path, export: &Path, output: &Path, reporter: &CliReporter) -> Result<()> {
    reporter.start("Restoring");
    let outcome = restore_csv_quotes(original, export, output, reporter)
        .with_context(|| format!("Restoring quotes into {}", output.display()))?;
    reporter.finish(&format!(
        "Restored {} of {} field(s)",
        outcome.restored_count(),
        outcome.total_fields
    ));
    if !outcome.warnings.is_empty() {
        warn!(
            "{} quoting warning(s), see the report",
            format!("{}", outcome.warnings.len()).yellow()
        );
    }
    info!("Output: {}", outcome.output_path.display());
    info!("Report: {}", outcome.report_path.display());
    Ok(())
}

fn run_diff(old: &Path, new: &Path, output: &Path, reporter: &CliReporter) -> Result<()> {
    reporter.start("Comparing");
    let outcome = legacy_diff(old, new, output, reporter).with_context(|| {
        format!("Comparing {} with {}", old.display(), new.display())
    })?;
    reporter.finish(&format!("{} changed Target(s)", outcome.total_changes()));
    for (lang, count) in outcome.changes.iter().filter(|(_, n)| **n > 0) {
        info!("  {:<6} {}", lang.to_string(), format!("{}", count).green());
    }
    info!("Wrote {}", outcome.output_path.display());
    Ok(())
}

pub(crate) fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => eprint!("{} (Y/n): ", prompt),
            Some(false) | None => eprint!("{} (y/N): ", prompt),
        }
        io::stderr().flush()?;

        if io::stdin().read_line(&mut input)? == 0 {
            // stdin closed
            return Ok(default.unwrap_or(false));
        }

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
