use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "authorcheck")]
#[command(
    author,
    version,
    about = "Human vs AI text classification: training harness and prediction server"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve predictions over HTTP
    Serve {
        /// Serving configuration file
        #[arg(short, long, default_value = "serve.yaml")]
        config: PathBuf,

        /// Local model artifact (overrides MODEL_PATH)
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Remote artifact source (overrides MODEL_URL)
        #[arg(long)]
        model_url: Option<String>,

        /// Listen address, e.g. 0.0.0.0:8000
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Train (or reuse) every registered algorithm and compare them
    Train {
        /// Harness configuration file
        #[arg(short, long, default_value = "train.yaml")]
        config: PathBuf,

        /// Cleaned dataset CSV
        #[arg(long)]
        data: Option<PathBuf>,

        /// Artifact directory
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Results CSV
        #[arg(long)]
        results: Option<PathBuf>,

        /// Only run these algorithms (comma-separated)
        #[arg(long, value_delimiter = ',')]
        algorithms: Vec<String>,
    },

    /// Clean a raw dataset for training
    Clean {
        /// Raw dataset CSV
        #[arg(short, long, default_value = "data/raw/AI_Human.csv")]
        input: PathBuf,

        /// Cleaned output CSV
        #[arg(short, long, default_value = "data/cleaned/AI_Human_cleaned.csv")]
        output: PathBuf,
    },

    /// Download the serving artifact if it is not present yet
    Fetch {
        /// Serving configuration file
        #[arg(short, long, default_value = "serve.yaml")]
        config: PathBuf,

        /// Local model artifact (overrides MODEL_PATH)
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Remote artifact source (overrides MODEL_URL)
        #[arg(long)]
        model_url: Option<String>,
    },
}
