//! Modelflat Command Line Interface
//!
//! Exports trained classifiers, supplied as JSON node/coefficient arrays,
//! into flat tables for the embedded inference engine.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modelflat_export::{
    export_forest, export_pairwise_to_path, export_tree_to_path, ExportConfig,
    PairwiseLinearModel, TreeArrays,
};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "modelflat")]
#[command(about = "Export trained classifiers as flat delimited tables", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML export configuration
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a decision tree
    Tree {
        /// JSON file with the flattened tree arrays
        #[arg(short, long, value_name = "PATH")]
        model: PathBuf,
        /// Class names in class-count index order: a comma list, a JSON array or a .json file
        #[arg(long, value_name = "CLASSES")]
        classes: String,
        /// Output table
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Export a one-vs-one linear classifier
    Svm {
        /// JSON file with classes, intercepts and coefficients
        #[arg(short, long, value_name = "PATH")]
        model: PathBuf,
        /// Output table
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Export a random forest as a directory of tree tables
    Forest {
        /// JSON file with an array of flattened trees
        #[arg(long, value_name = "PATH")]
        models: PathBuf,
        /// Class names in class-count index order: a comma list, a JSON array or a .json file
        #[arg(long, value_name = "CLASSES")]
        classes: String,
        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    run(cli)?;

    info!("✓ Export completed successfully");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Tree {
            model,
            classes,
            output,
        } => {
            let tree: TreeArrays = read_json(&model)?;
            let class_names = parse_classes(&classes)?;
            info!(
                "Exporting tree with {} nodes to {}",
                tree.node_count(),
                output.display()
            );
            export_tree_to_path(&tree, &class_names, &output, &config)
                .with_context(|| format!("Failed to export tree to {}", output.display()))?;
        }
        Commands::Svm { model, output } => {
            let svm: PairwiseLinearModel = read_json(&model)?;
            info!(
                "Exporting {} class pairs to {}",
                svm.pair_count(),
                output.display()
            );
            let header = export_pairwise_to_path(&svm, &output, &config)
                .with_context(|| format!("Failed to export model to {}", output.display()))?;
            println!("{}", header.join(","));
        }
        Commands::Forest {
            models,
            classes,
            output,
        } => {
            let trees: Vec<TreeArrays> = read_json(&models)?;
            let class_names = parse_classes(&classes)?;
            let paths = export_forest(&trees, &class_names, &output, &config)
                .with_context(|| format!("Failed to export forest to {}", output.display()))?;
            for path in paths {
                println!("{}", path.display());
            }
        }
    }

    Ok(())
}

/// Class names from an inline JSON array, a `.json` file or a comma list
fn parse_classes(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    let names: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Failed to parse class names as a JSON array")?
    } else if trimmed.ends_with(".json") {
        read_json(Path::new(trimmed))?
    } else {
        trimmed.split(',').map(|name| name.trim().to_string()).collect()
    };

    if names.is_empty() || names.iter().any(String::is_empty) {
        anyhow::bail!("Class names must be non-empty: '{raw}'");
    }
    Ok(names)
}

fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    let config = match path {
        Some(path) => ExportConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ExportConfig::default(),
    };
    config
        .apply_env()
        .context("Invalid MODELFLAT_* environment override")
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}
