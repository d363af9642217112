//! Command-line interface definitions and argument parsing

use crate::model::{InitStrategy, KMeansConfig};
use clap::Parser;
use std::path::PathBuf;

/// Cluster the rows of a delimited numeric table with k-means
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input file; the first line is a header and is skipped
    #[arg(short, long)]
    pub input: PathBuf,

    /// Field separator: a single character, `\t` or `tab`
    #[arg(short, long, default_value = "tab", value_parser = parse_separator)]
    pub separator: char,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value = "2")]
    pub clusters: usize,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value = "300")]
    pub max_iters: usize,

    /// Tolerance for K-Means convergence
    #[arg(long, default_value = "1e-4")]
    pub tolerance: f64,

    /// Centroid seeding strategy
    #[arg(long, value_enum, default_value_t = InitStrategy::FirstRows)]
    pub init: InitStrategy,

    /// Write a cluster scatter plot (and a `_sizes` bar chart) to this PNG path
    #[arg(short, long)]
    pub plot: Option<PathBuf>,

    /// Print the ingested table before clustering
    #[arg(long)]
    pub show_table: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Clustering parameters taken from the command line.
    pub fn config(&self) -> KMeansConfig {
        KMeansConfig::new(self.clusters)
            .with_max_iterations(self.max_iters)
            .with_tolerance(self.tolerance)
            .with_init(self.init)
    }
}

/// Accept a literal single character, or the names `\t`, `tab` and `comma`.
fn parse_separator(value: &str) -> Result<char, String> {
    match value {
        "\\t" | "tab" => return Ok('\t'),
        "comma" => return Ok(','),
        _ => {}
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(format!(
            "separator must be one ASCII character, `\\t` or `tab`, got {:?}",
            value
        )),
    }
}
