//! ScriptCut - Transcript-Driven Video Editing
//!
//! Entry point for the scriptcut CLI: transcribe a video, then trim it,
//! extract its bloopers, or resync edited lines with a cloned voice.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scriptcut::cli::{Args, Commands};
use scriptcut::config::Config;
use scriptcut::pipeline::{Pipeline, RunReport};
use scriptcut::workspace;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Transcribe { input, output } => {
            info!("Transcribing video: {}", input.display());

            let pipeline = Pipeline::from_config(config)?;
            let transcript = pipeline.transcribe_video(&input).await?;

            tokio::fs::write(&output, transcript.to_lines()).await?;
            println!(
                "Wrote {} transcript lines to {}",
                transcript.len(),
                output.display()
            );
        }
        Commands::Trim { input, transcript } => {
            info!("Trimming video: {}", input.display());

            let edited = tokio::fs::read_to_string(&transcript).await?;
            let pipeline = Pipeline::from_config(config)?;
            let report = pipeline.run_trim(&input, &edited).await?;

            print_report(&report);
        }
        Commands::Bloopers {
            input,
            original,
            kept,
        } => {
            info!("Extracting bloopers from: {}", input.display());

            let original_text = tokio::fs::read_to_string(&original).await?;
            let kept_text = tokio::fs::read_to_string(&kept).await?;
            let pipeline = Pipeline::from_config(config)?;
            let report = pipeline.run_bloopers(&input, &original_text, &kept_text).await?;

            print_report(&report);
        }
        Commands::Resync {
            input,
            original,
            edited,
        } => {
            info!("Resyncing edited transcript against: {}", input.display());

            let original_text = tokio::fs::read_to_string(&original).await?;
            let edited_text = tokio::fs::read_to_string(&edited).await?;
            let pipeline = Pipeline::from_config(config)?;
            let report = pipeline.run_resync(&input, &original_text, &edited_text).await?;

            print_report(&report);
        }
        Commands::Clean { hours } => {
            let removed = workspace::sweep(&config.workspace.base_dir, hours)?;
            println!("Removed {} stale run workspaces", removed);
        }
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    println!("{}", report.summary());
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let app_dir = std::env::current_dir()?.join(".scriptcut");
    let log_dir = app_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive the process
    let file_appender = rolling::daily(&log_dir, "scriptcut.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
