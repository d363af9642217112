//! Cluster charts rendered to PNG with Plotters
//!
//! Charts carry no text so they render without system fonts.

use crate::data::Table;
use crate::model::KMeansOutcome;
use anyhow::Context;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::info;

/// Color palette for different clusters
static CLUSTER_COLORS: [RGBColor; 5] = [RED, BLUE, GREEN, YELLOW, MAGENTA];

fn cluster_color(cluster: usize) -> &'static RGBColor {
    CLUSTER_COLORS.get(cluster).unwrap_or(&BLACK)
}

/// Scatter plot of the first two columns, colored by cluster, with centroids as squares.
///
/// A single-column table is plotted against a zero y coordinate.
pub fn create_cluster_plot(table: &Table, outcome: &KMeansOutcome, output_path: &Path) -> anyhow::Result<()> {
    if table.is_empty() || table.col_count() == 0 {
        anyhow::bail!("nothing to plot: table has no values");
    }

    let y_col = usize::from(table.col_count() > 1);
    let point = |row: &[f64]| (row[0], if y_col == 1 { row[1] } else { 0.0 });
    let points: Vec<(f64, f64)> = table.rows().map(point).collect();
    let centers: Vec<(f64, f64)> = outcome
        .centroids
        .outer_iter()
        .map(|c| (c[0], if y_col == 1 { c[1] } else { 0.0 }))
        .collect();

    let (x_min, x_max) = padded_bounds(points.iter().chain(&centers).map(|p| p.0));
    let (y_min, y_max) = padded_bounds(points.iter().chain(&centers).map(|p| p.1));
    let half = ((x_max - x_min).min(y_max - y_min)) * 0.01;

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    for (&(x, y), &cluster) in points.iter().zip(&outcome.assignments) {
        let color = cluster_color(cluster);
        chart.draw_series(std::iter::once(Circle::new((x, y), 4, color.filled())))?;
    }

    for (cluster, &(x, y)) in centers.iter().enumerate() {
        let color = cluster_color(cluster);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x - half, y - half), (x + half, y + half)],
            color.filled(),
        )))?;
    }

    root.present()
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!(path = %output_path.display(), "cluster plot saved");

    Ok(())
}

/// Bar chart of the number of rows in each cluster.
pub fn create_cluster_size_chart(outcome: &KMeansOutcome, output_path: &Path) -> anyhow::Result<()> {
    let cluster_sizes = outcome.cluster_sizes();
    let max_size = cluster_sizes.iter().copied().max().unwrap_or(1).max(1) as f64;
    let n_clusters = outcome.n_clusters().max(1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .build_cartesian_2d(-0.5f64..(n_clusters - 0.5), 0f64..(max_size * 1.1))?;

    for (cluster, &size) in cluster_sizes.iter().enumerate() {
        let color = cluster_color(cluster);
        chart.draw_series(std::iter::once(Rectangle::new(
            [(cluster as f64 - 0.4, 0.0), (cluster as f64 + 0.4, size as f64)],
            color.filled(),
        )))?;
    }

    root.present()
        .with_context(|| format!("failed to write {}", output_path.display()))?;
    info!(path = %output_path.display(), "cluster size chart saved");

    Ok(())
}

/// Write the scatter plot to `base_output_path` and the size chart next to it.
///
/// Returns the path of the size chart (`<stem>_sizes.png`).
pub fn generate_visualization_report(
    table: &Table,
    outcome: &KMeansOutcome,
    base_output_path: &Path,
) -> anyhow::Result<PathBuf> {
    create_cluster_plot(table, outcome, base_output_path)?;

    let stem = base_output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clusters".to_string());
    let size_chart_path = base_output_path.with_file_name(format!("{}_sizes.png", stem));
    create_cluster_size_chart(outcome, &size_chart_path)?;

    Ok(size_chart_path)
}

/// Min and max of `values` widened by 5% of the span (or 0.5 when flat).
fn padded_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = if max > min { (max - min) * 0.05 } else { 0.5 };
    (min - pad, max + pad)
}
