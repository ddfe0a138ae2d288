use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe a video into an editable timestamped transcript
    Transcribe {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output transcript text file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Cut a video down to the transcript lines the user kept
    Trim {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Edited transcript file (the lines to keep)
        #[arg(short, long)]
        transcript: PathBuf,
    },

    /// Extract the removed lines instead of the kept ones
    Bloopers {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Original transcript file
        #[arg(long)]
        original: PathBuf,

        /// Edited transcript file (the lines that were kept)
        #[arg(long)]
        kept: PathBuf,
    },

    /// Diff two transcript versions and resynthesize changed lines
    Resync {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Original transcript file
        #[arg(long)]
        original: PathBuf,

        /// Edited transcript file (same line count as the original)
        #[arg(long)]
        edited: PathBuf,
    },

    /// Sweep old run workspaces
    Clean {
        /// Remove workspaces older than this many hours
        #[arg(long, default_value = "1")]
        hours: u64,
    },
}
