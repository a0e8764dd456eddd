//! Batch pass over existing receipts and the watch loop.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use receipt_core::{
    select_change_source, FileOutcome, OcrEngine, ReceiptScanner, RecordSink, ScannerConfig,
};

pub async fn run(config: ScannerConfig, process_existing: bool) -> anyhow::Result<()> {
    let scanner = ReceiptScanner::from_config(config);

    if process_existing {
        tokio::task::block_in_place(|| process_existing_files(&scanner))?;
    }

    if scanner.config().dry_run {
        info!("Dry run finished, not watching for new files");
        return Ok(());
    }

    watch(scanner).await
}

fn process_existing_files<E, S>(scanner: &ReceiptScanner<E, S>) -> anyhow::Result<()>
where
    E: OcrEngine,
    S: RecordSink,
{
    let start = Instant::now();
    let files = scanner.enumerate()?;

    if files.is_empty() {
        println!(
            "{} No existing receipts in {}",
            style("ℹ").blue(),
            scanner.config().watch_dir.display()
        );
        return Ok(());
    }

    println!(
        "{} Found {} existing receipts to process",
        style("ℹ").blue(),
        files.len()
    );

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} receipts")?
            .progress_chars("=>-"),
    );

    let mut failed: Vec<(PathBuf, String)> = Vec::new();
    let summary = scanner.process_paths(&files, |path, outcome| {
        if let FileOutcome::Failed(message) = outcome {
            failed.push((path.to_path_buf(), message.clone()));
        }
        progress.inc(1);
    });

    progress.finish_with_message("Complete");

    println!();
    println!(
        "{} Processed {} receipts in {:?}",
        style("✓").green(),
        summary.total(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} skipped",
        style(summary.processed).green(),
        style(summary.failed).red(),
        summary.skipped
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for (path, message) in &failed {
            println!("  - {}: {}", path.display(), message);
        }
    }

    Ok(())
}

async fn watch<E, S>(scanner: ReceiptScanner<E, S>) -> anyhow::Result<()>
where
    E: OcrEngine + Send + 'static,
    S: RecordSink + Send + 'static,
{
    let config = scanner.config();
    let mut source = select_change_source(config.watch_mode, config.poll_interval())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => signal_flag.store(true, Ordering::SeqCst),
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    println!(
        "{} Watching {} (press Ctrl-C to stop)",
        style("ℹ").blue(),
        config.watch_dir.display()
    );

    tokio::task::spawn_blocking(move || scanner.run(source.as_mut(), &shutdown)).await??;

    println!("{} Stopped", style("✓").green());
    Ok(())
}
