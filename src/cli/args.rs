//! CLI argument definitions using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// recap - Concise summaries and key takeaways from long video transcripts
#[derive(Parser, Debug)]
#[command(name = "recap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a transcript
    Summarize {
        /// Transcript file ("-" or omitted reads stdin)
        input: Option<PathBuf>,

        /// Write the summary to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override segmenter.threshold_percentile (0.0-1.0)
        #[arg(short, long)]
        percentile: Option<f64>,
    },

    /// Show how a transcript would be split into chunks
    Chunks {
        /// Transcript file ("-" or omitted reads stdin)
        input: Option<PathBuf>,

        /// Override segmenter.threshold_percentile (0.0-1.0)
        #[arg(short, long)]
        percentile: Option<f64>,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., segmenter.threshold_percentile)
        key: String,

        /// Value to set
        value: String,
    },
}
