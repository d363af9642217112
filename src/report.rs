//! Plain-text rendering of clustering results

use crate::data::Table;
use crate::model::KMeansOutcome;
use std::fmt;

/// Per-row cluster listing: the row label (or its index when the label is blank) and its cluster.
#[derive(Debug, Clone, Copy)]
pub struct Assignments<'a> {
    pub table: &'a Table,
    pub assignments: &'a [usize],
}

impl fmt::Display for Assignments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (row, cluster) in self.assignments.iter().enumerate() {
            match self.table.label(row).filter(|label| !label.trim().is_empty()) {
                Some(label) => writeln!(f, "{}\t{}", label, cluster)?,
                None => writeln!(f, "{}\t{}", row, cluster)?,
            }
        }
        Ok(())
    }
}

/// Run statistics: termination, cluster sizes, inertia and centroids.
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a> {
    pub table: &'a Table,
    pub outcome: &'a KMeansOutcome,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (table, outcome) = (self.table, self.outcome);
        let total = table.row_count().max(1) as f64;

        writeln!(f, "=== Cluster Statistics ===")?;
        writeln!(
            f,
            "Termination: {:?} after {} iteration(s), final shift {:.6}",
            outcome.termination, outcome.iterations, outcome.shift
        )?;
        writeln!(f, "Number of clusters: {}", outcome.n_clusters())?;
        writeln!(f, "Total rows: {}", table.row_count())?;
        writeln!(
            f,
            "Within-cluster sum of squares (Inertia): {:.4}",
            outcome.inertia(table)
        )?;

        writeln!(f, "\nCluster sizes:")?;
        for (cluster, &size) in outcome.cluster_sizes().iter().enumerate() {
            let percentage = size as f64 / total * 100.0;
            writeln!(f, "  Cluster {}: {} rows ({:.1}%)", cluster, size, percentage)?;
        }

        writeln!(f, "\nCentroids:")?;
        for (cluster, centroid) in outcome.centroids.outer_iter().enumerate() {
            write!(f, "  {}", cluster)?;
            for value in centroid.iter() {
                write!(f, "\t{:.4}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

pub fn render_assignments(table: &Table, assignments: &[usize]) -> String {
    Assignments { table, assignments }.to_string()
}

pub fn render_summary(table: &Table, outcome: &KMeansOutcome) -> String {
    Summary { table, outcome }.to_string()
}
