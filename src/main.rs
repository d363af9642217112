//! kmeans-table: cluster the rows of a delimited numeric file
//!
//! Loads the table, runs k-means, prints one cluster per row and a summary,
//! and optionally writes PNG charts.

use anyhow::{Context, Result};
use clap::Parser;
use kmeans_table::{render_assignments, render_summary, viz, Args, KMeans, Table};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let start_time = Instant::now();

    let table = Table::from_path(&args.input, args.separator)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    info!(
        rows = table.row_count(),
        cols = table.col_count(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "data loaded"
    );

    if args.show_table {
        print!("{}", table);
    }

    let model_start = Instant::now();
    let outcome = KMeans::new(args.config())
        .fit(&table)
        .context("k-means clustering failed")?;
    info!(
        elapsed_ms = model_start.elapsed().as_millis() as u64,
        "model fitted"
    );

    print!("{}", render_assignments(&table, &outcome.assignments));
    println!();
    print!("{}", render_summary(&table, &outcome));

    if let Some(plot_path) = &args.plot {
        let sizes_path = viz::generate_visualization_report(&table, &outcome, plot_path)?;
        println!("\nMain plot saved to: {}", plot_path.display());
        println!("Cluster sizes saved to: {}", sizes_path.display());
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "pipeline complete"
    );

    Ok(())
}

/// Log to stderr; `RUST_LOG` applies when no `-v` flag is given.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
