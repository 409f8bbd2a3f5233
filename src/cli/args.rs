use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::api::ModelKind;
use crate::constants::DEFAULT_RATING;

#[derive(Parser, Debug)]
#[command(name = "sentiscope")]
#[command(version)]
#[command(about = "Client for the review sentiment analysis service", long_about = None)]
pub struct Cli {
    /// Base URL of the analysis service (overrides the config file)
    #[arg(long, global = true, env = "SENTISCOPE_API_URL")]
    pub api_url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe the service once and show its health report
    Health,
    /// Keep probing the service and print every status change
    Watch {
        /// Seconds between probes (defaults to the configured interval)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Predict the sentiment of one review
    Analyze {
        text: String,
        #[arg(short, long, value_enum)]
        model: Option<ModelKind>,
    },
    /// Check one review for signs of being fake
    Fake {
        text: String,
        /// Star rating given with the review (1-5)
        #[arg(short, long, default_value_t = DEFAULT_RATING)]
        rating: u8,
    },
    /// Analyze several reviews in one request
    Batch {
        /// Reviews to analyze
        texts: Vec<String>,
        /// Read additional reviews from a file, one per line
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        model: Option<ModelKind>,
    },
    /// Run one review through every model and compare
    Compare { text: String },
    /// Show dataset statistics and model performance
    Stats,
    /// List the models the service offers
    Models,
    /// Predict how helpful a review will be
    Helpfulness {
        text: String,
        #[arg(long, default_value_t = 0)]
        helpful_votes: u32,
        #[arg(long, default_value_t = 0)]
        total_votes: u32,
    },
    /// Initialize configuration
    Init,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
}
