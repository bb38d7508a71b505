//! TFS blame - prints per-line authorship of TFVC-tracked files as JSON
//!
//! # Usage
//! ```bash
//! tfs-blame src/Foo.cs src/Bar.cs                      # Blame with the bundled annotate tool
//! tfs-blame --annotate-path C:\tools\Annotate.exe a.cs # Use another annotate executable
//! tfs-blame -D sonar.tfs.sonarTfsAnnotatePath=... a.cs # Same, as a raw setting
//! tfs-blame properties                                 # List supported settings
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tfs_blame::{
    count_lines, Batch, BlameCommand, BlameLine, BlameOptions, CollectingOutput, InputFile,
    Settings, TfsConfiguration, SONAR_TFS_ANNOTATE_PROP_KEY,
};

/// TFS blame - per-line authorship for TFVC workspaces
#[derive(Parser)]
#[command(name = "tfs-blame")]
#[command(about = "Blame files tracked by Team Foundation version control", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Files to blame, relative to the base directory
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,

    /// Base directory of the scan
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Annotate executable to use instead of the bundled one
    #[arg(long, value_name = "PATH")]
    annotate_path: Option<String>,

    /// Raw setting, e.g. -D sonar.tfs.sonarTfsAnnotatePath=C:\tools\Annotate.exe
    #[arg(short = 'D', value_name = "KEY=VALUE", value_parser = Settings::parse_pair)]
    define: Vec<(String, String)>,

    /// Number of annotate processes run in parallel (default: CPUs + 1)
    #[arg(long)]
    threads: Option<usize>,

    /// Give up on a single file after this many seconds (default: no limit)
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the supported settings as JSON
    Properties,
}

#[derive(Serialize)]
struct FileBlame<'a> {
    path: &'a str,
    lines: &'a [BlameLine],
}

fn build_batch(base_dir: &Path, files: &[PathBuf]) -> anyhow::Result<Batch> {
    let mut batch = Batch::new(base_dir);
    for file in files {
        let absolute = if file.is_absolute() {
            file.clone()
        } else {
            base_dir.join(file)
        };
        let content = std::fs::read(&absolute)
            .with_context(|| format!("Failed to read {}", absolute.display()))?;
        let relative = absolute
            .strip_prefix(base_dir)
            .unwrap_or(&absolute)
            .to_string_lossy()
            .to_string();
        if !batch.push(InputFile::new(relative, absolute, count_lines(&content))) {
            tracing::debug!("Ignoring duplicate file {}", file.display());
        }
    }
    Ok(batch)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Properties) = cli.command {
        println!("{}", serde_json::to_string_pretty(&TfsConfiguration::properties())?);
        return Ok(());
    }

    if cli.files.is_empty() {
        eprintln!("Usage: tfs-blame [OPTIONS] <FILES>...");
        eprintln!("       tfs-blame properties");
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut settings: Settings = cli.define.into_iter().collect();
    if let Some(path) = cli.annotate_path {
        settings.set(SONAR_TFS_ANNOTATE_PROP_KEY, path);
    }

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let base_dir = std::fs::canonicalize(&base_dir).unwrap_or(base_dir);
    let batch = build_batch(&base_dir, &cli.files)?;

    let command = BlameCommand::new(TfsConfiguration::new(settings)).with_options(BlameOptions {
        pool_size: cli.threads,
        timeout: cli.timeout_secs.map(Duration::from_secs),
        temp_root: None,
    });

    let output = Arc::new(CollectingOutput::new());
    let runtime = command.runtime()?;
    let result = runtime.block_on(async {
        let interrupt = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        command.blame_until(&batch, output.clone(), interrupt).await
    });
    runtime.shutdown_background();
    result?;

    // Print in the order the files were given, not the order they finished.
    let results = output.snapshot();
    let report: Vec<FileBlame> = batch
        .files
        .iter()
        .filter_map(|file| {
            results
                .iter()
                .find(|(done, _)| done == file)
                .map(|(done, lines)| FileBlame {
                    path: done.relative_path(),
                    lines,
                })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
