//! K-Means clustering over a [`Table`]

use crate::data::Table;
use crate::error::Error;
use crate::Result;
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use tracing::{debug, info};

/// How the first centroids are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[non_exhaustive]
pub enum InitStrategy {
    /// Rows `0..k` of the table, verbatim
    #[default]
    FirstRows,
}

/// Why the iteration loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Centroid shift fell strictly below the tolerance
    Converged,
    /// `max_iterations` rounds ran without converging
    Exhausted,
}

/// Parameters for a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Upper bound on assign/update rounds
    pub max_iterations: usize,
    /// Stop once the centroid shift norm is strictly below this value
    pub tolerance: f64,
    /// Centroid seeding
    pub init: InitStrategy,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 2,
            max_iterations: 300,
            tolerance: 1e-4,
            init: InitStrategy::default(),
        }
    }
}

impl KMeansConfig {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Check the parameters against the table they will run on.
    pub fn validate(&self, table: &Table) -> Result<()> {
        let row_count = table.row_count();
        if self.k == 0 {
            return Err(Error::InvalidClusterCount { k: 0, row_count });
        }
        if row_count == 0 || table.col_count() == 0 {
            return Err(Error::EmptyInput {
                row_count,
                col_count: table.col_count(),
            });
        }
        if self.k > row_count {
            return Err(Error::InvalidClusterCount { k: self.k, row_count });
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                value: self.max_iterations.to_string(),
                constraint: "must be at least 1",
            });
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                value: self.tolerance.to_string(),
                constraint: "must be a positive finite number",
            });
        }
        Ok(())
    }
}

/// Result of a fitted model: assignments plus the centroids behind them.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansOutcome {
    /// Cluster index in `[0, k)` for every table row
    pub assignments: Vec<usize>,
    /// Final centroids, one row per cluster (`k x col_count`)
    pub centroids: Array2<f64>,
    /// Number of assign/update rounds that ran
    pub iterations: usize,
    /// Centroid shift norm measured in the last round
    pub shift: f64,
    pub termination: Termination,
}

impl KMeansOutcome {
    pub fn n_clusters(&self) -> usize {
        self.centroids.nrows()
    }

    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }

    /// Number of rows assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters()];
        for &label in &self.assignments {
            if label < sizes.len() {
                sizes[label] += 1;
            }
        }
        sizes
    }

    /// Assign a new point to its nearest centroid.
    pub fn predict(&self, point: &[f64]) -> Result<usize> {
        if point.len() != self.centroids.ncols() {
            return Err(Error::DimensionMismatch {
                expected: self.centroids.ncols(),
                found: point.len(),
            });
        }
        Ok(nearest_centroid(ArrayView1::from(point), &self.centroids))
    }

    /// Within-cluster sum of squared distances for the table this outcome was fitted on.
    ///
    /// Rows whose assignment is not a valid cluster index are left out.
    pub fn inertia(&self, table: &Table) -> f64 {
        let k = self.n_clusters();
        table
            .rows()
            .zip(&self.assignments)
            .filter(|(_, &cluster)| cluster < k)
            .map(|(row, &cluster)| {
                row.iter()
                    .zip(self.centroids.row(cluster))
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
            })
            .sum()
    }

    /// Mean silhouette coefficient over the first `sample_size` rows.
    pub fn silhouette_sample(&self, table: &Table, sample_size: usize) -> f64 {
        let rows: Vec<&[f64]> = table.rows().take(sample_size).collect();
        let n_samples = rows.len().min(self.assignments.len());
        if n_samples < 2 {
            return 0.0;
        }

        let k = self.n_clusters();
        let mut silhouette_sum = 0.0;

        for i in 0..n_samples {
            let own = self.assignments[i];
            let mut same = (0.0, 0usize);
            let mut other = vec![(0.0, 0usize); k];

            for j in 0..n_samples {
                if i == j {
                    continue;
                }
                let distance = euclidean_distance(rows[i], rows[j]);
                let label = self.assignments[j];
                if label == own {
                    same.0 += distance;
                    same.1 += 1;
                } else if label < k {
                    other[label].0 += distance;
                    other[label].1 += 1;
                }
            }

            let a_i = if same.1 == 0 { 0.0 } else { same.0 / same.1 as f64 };
            let b_i = other
                .iter()
                .filter(|(_, count)| *count > 0)
                .map(|(sum, count)| sum / *count as f64)
                .fold(f64::INFINITY, f64::min);

            silhouette_sum += if b_i.is_infinite() || (a_i == 0.0 && b_i == 0.0) {
                0.0
            } else {
                (b_i - a_i) / a_i.max(b_i)
            };
        }

        silhouette_sum / n_samples as f64
    }
}

/// Deterministic Lloyd's k-means.
///
/// Each round assigns every row to its nearest centroid (lowest index wins
/// ties), then moves each centroid to the mean of its rows. A cluster that
/// receives no rows keeps its previous centroid. The loop ends when the
/// Euclidean norm of all centroid movement is strictly below the tolerance,
/// or after `max_iterations` rounds.
#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    pub fn new(config: KMeansConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Run the assign/update loop on `table` without modifying it.
    pub fn fit(&self, table: &Table) -> Result<KMeansOutcome> {
        self.config.validate(table)?;
        let data = table.view()?;

        let mut centroids = initial_centroids(data, self.config.k, self.config.init);
        let mut iterations = 0;

        let (assignments, shift, termination) = loop {
            iterations += 1;

            let assignments = assign(data, &centroids);
            let updated = update(data, &assignments, &centroids);
            let shift = centroid_shift(&centroids, &updated);
            centroids = updated;

            debug!(iteration = iterations, shift, "k-means round complete");

            if shift < self.config.tolerance {
                break (assignments, shift, Termination::Converged);
            }
            if iterations >= self.config.max_iterations {
                break (assignments, shift, Termination::Exhausted);
            }
        };

        info!(
            k = self.config.k,
            iterations,
            shift,
            termination = ?termination,
            "k-means finished"
        );

        Ok(KMeansOutcome {
            assignments,
            centroids,
            iterations,
            shift,
            termination,
        })
    }
}

/// Cluster `table` into `k` groups and return one cluster index per row.
///
/// # Arguments
/// * `table` - Input rows, read only
/// * `k` - Number of clusters, `1..=table.row_count()`
/// * `max_iterations` - Upper bound on rounds
/// * `tolerance` - Convergence threshold on centroid movement
pub fn cluster(table: &Table, k: usize, max_iterations: usize, tolerance: f64) -> Result<Vec<usize>> {
    let config = KMeansConfig::new(k)
        .with_max_iterations(max_iterations)
        .with_tolerance(tolerance);
    Ok(KMeans::new(config).fit(table)?.assignments)
}

/// Euclidean norm of the element-wise difference of two centroid sets.
pub fn centroid_shift(old: &Array2<f64>, new: &Array2<f64>) -> f64 {
    debug_assert_eq!(old.shape(), new.shape());
    old.iter()
        .zip(new.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn initial_centroids(data: ArrayView2<'_, f64>, k: usize, init: InitStrategy) -> Array2<f64> {
    match init {
        InitStrategy::FirstRows => data.slice(s![..k, ..]).to_owned(),
    }
}

fn assign(data: ArrayView2<'_, f64>, centroids: &Array2<f64>) -> Vec<usize> {
    data.outer_iter()
        .map(|row| nearest_centroid(row, centroids))
        .collect()
}

/// Mean of the rows in each cluster; empty clusters keep their old centroid.
fn update(data: ArrayView2<'_, f64>, assignments: &[usize], centroids: &Array2<f64>) -> Array2<f64> {
    let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
    let mut counts = vec![0usize; centroids.nrows()];

    for (row, &cluster) in data.outer_iter().zip(assignments) {
        sums.row_mut(cluster).scaled_add(1.0, &row);
        counts[cluster] += 1;
    }

    let mut updated = centroids.clone();
    for (cluster, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let mean = &sums.row(cluster) / count as f64;
        updated.row_mut(cluster).assign(&mean);
    }
    updated
}

fn nearest_centroid(point: ArrayView1<'_, f64>, centroids: &Array2<f64>) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;

    for (cluster, centroid) in centroids.outer_iter().enumerate() {
        let distance = point
            .iter()
            .zip(centroid.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt();

        if distance < best_distance {
            best_distance = distance;
            best = cluster;
        }
    }

    best
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use proptest::prelude::*;

    fn table(rows: &[&[f64]]) -> Table {
        let labels = (0..rows.len()).map(|i| format!("r{}", i)).collect();
        let cols = rows.first().map_or(0, |row| row.len());
        let values = rows.iter().flat_map(|row| row.iter().copied()).collect();
        Table::from_parts(labels, values, cols).unwrap()
    }

    fn two_groups() -> Table {
        table(&[
            &[1.0, 1.0],
            &[8.0, 8.0],
            &[1.5, 2.0],
            &[9.0, 8.5],
            &[0.5, 1.0],
            &[8.0, 9.0],
        ])
    }

    #[test]
    fn test_two_well_separated_groups() {
        let outcome = KMeans::new(KMeansConfig::new(2)).fit(&two_groups()).unwrap();

        assert_eq!(outcome.assignments, vec![0, 1, 0, 1, 0, 1]);
        assert!(outcome.converged());
        assert_eq!(outcome.cluster_sizes(), vec![3, 3]);
        assert!((outcome.centroids[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((outcome.centroids[[1, 1]] - 25.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_cluster_is_global_mean() {
        let data = table(&[&[1.0, 2.0], &[3.0, 4.0], &[5.0, 9.0]]);
        let outcome = KMeans::new(KMeansConfig::new(1)).fit(&data).unwrap();

        assert_eq!(outcome.assignments, vec![0, 0, 0]);
        assert_eq!(outcome.centroids, array![[3.0, 5.0]]);
        assert!(outcome.converged());
        // Round one moves the seed onto the mean; convergence needs a shift strictly
        // below the tolerance, which only round two can measure.
        assert!(outcome.iterations <= 2);
        assert_eq!(outcome.shift, 0.0);
    }

    #[test]
    fn test_k_equal_to_row_count_gives_singletons() {
        let data = table(&[&[0.0], &[10.0], &[3.0], &[7.0]]);
        let outcome = KMeans::new(KMeansConfig::new(4)).fit(&data).unwrap();

        assert_eq!(outcome.assignments, vec![0, 1, 2, 3]);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.cluster_sizes(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn test_ties_go_to_lowest_index() {
        let centroids = array![[0.0], [2.0], [2.0]];
        let point = array![1.0];
        assert_eq!(nearest_centroid(point.view(), &centroids), 0);

        let point = array![2.0];
        assert_eq!(nearest_centroid(point.view(), &centroids), 1);
    }

    #[test]
    fn test_empty_cluster_keeps_previous_centroid() {
        let data = table(&[&[1.0, 1.0], &[3.0, 3.0]]);
        let centroids = array![[0.0, 0.0], [9.0, 9.0]];
        let updated = update(data.view().unwrap(), &[0, 0], &centroids);

        assert_eq!(updated, array![[2.0, 2.0], [9.0, 9.0]]);
    }

    #[test]
    fn test_duplicate_seeds_tie_to_first_cluster() {
        // Rows 0 and 1 are identical, so the first round gives cluster 1 nothing.
        let data = table(&[&[1.0, 1.0], &[1.0, 1.0], &[5.0, 5.0]]);
        let config = KMeansConfig::new(2).with_max_iterations(1);
        let outcome = KMeans::new(config).fit(&data).unwrap();

        assert_eq!(outcome.assignments, vec![0, 0, 0]);
        assert_eq!(outcome.centroids.row(1).to_vec(), vec![1.0, 1.0]);
        assert_eq!(outcome.cluster_sizes(), vec![3, 0]);
    }

    #[test]
    fn test_exhausts_iteration_budget() {
        let data = two_groups();
        let config = KMeansConfig::new(2).with_max_iterations(1);
        let outcome = KMeans::new(config).fit(&data).unwrap();

        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.termination, Termination::Exhausted);
        assert_eq!(outcome.assignments.len(), data.row_count());
    }

    #[test]
    fn test_invalid_cluster_count() {
        let data = two_groups();

        let result = cluster(&data, 0, 100, 1e-4);
        assert!(matches!(result, Err(Error::InvalidClusterCount { k: 0, .. })));

        let result = cluster(&data, 7, 100, 1e-4);
        assert!(matches!(
            result,
            Err(Error::InvalidClusterCount { k: 7, row_count: 6 })
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        let result = cluster(&Table::new(), 1, 100, 1e-4);
        assert!(matches!(result, Err(Error::EmptyInput { .. })));

        let no_columns = Table::from_parts(vec!["a".into(), "b".into()], vec![], 0).unwrap();
        let result = cluster(&no_columns, 1, 100, 1e-4);
        assert!(matches!(
            result,
            Err(Error::EmptyInput {
                row_count: 2,
                col_count: 0
            })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let data = two_groups();

        let result = cluster(&data, 2, 0, 1e-4);
        assert!(matches!(
            result,
            Err(Error::InvalidParameter { name: "max_iterations", .. })
        ));

        for tolerance in [0.0, -1.0, f64::NAN] {
            let result = cluster(&data, 2, 10, tolerance);
            assert!(matches!(
                result,
                Err(Error::InvalidParameter { name: "tolerance", .. })
            ));
        }
    }

    #[test]
    fn test_centroid_shift() {
        let a = array![[0.0, 0.0], [1.0, 1.0]];
        let b = array![[3.0, 0.0], [1.0, 5.0]];

        assert_eq!(centroid_shift(&a, &a), 0.0);
        assert_eq!(centroid_shift(&a, &b), 5.0);
    }

    #[test]
    fn test_predict_and_inertia() {
        let data = two_groups();
        let outcome = KMeans::new(KMeansConfig::new(2)).fit(&data).unwrap();

        assert_eq!(outcome.predict(&[0.0, 0.0]).unwrap(), 0);
        assert_eq!(outcome.predict(&[10.0, 10.0]).unwrap(), 1);
        assert!(matches!(
            outcome.predict(&[1.0]),
            Err(Error::DimensionMismatch { expected: 2, found: 1 })
        ));

        let inertia = outcome.inertia(&data);
        assert!(inertia >= 0.0 && inertia.is_finite());

        let silhouette = outcome.silhouette_sample(&data, 100);
        assert!(silhouette > 0.5 && silhouette <= 1.0);
    }

    #[test]
    fn test_inertia_skips_unknown_clusters() {
        let data = two_groups();
        let mut outcome = KMeans::new(KMeansConfig::new(2)).fit(&data).unwrap();
        let full = outcome.inertia(&data);

        outcome.assignments[1] = 5;
        let partial = outcome.inertia(&data);
        assert!(partial.is_finite());
        assert!(partial <= full);
        assert_eq!(outcome.cluster_sizes(), vec![3, 2]);
    }

    #[test]
    fn test_fit_leaves_table_untouched() {
        let data = two_groups();
        let before = data.clone();
        cluster(&data, 2, 50, 1e-6).unwrap();
        assert_eq!(data, before);
    }

    proptest! {
        #[test]
        fn prop_fit_is_deterministic(
            values in proptest::collection::vec(-100.0f64..100.0, 2..60),
            k in 1usize..4,
        ) {
            let cols = 2;
            let rows = values.len() / cols;
            prop_assume!(rows >= k);
            let labels = (0..rows).map(|i| i.to_string()).collect();
            let data = Table::from_parts(labels, values[..rows * cols].to_vec(), cols).unwrap();

            let first = cluster(&data, k, 50, 1e-6).unwrap();
            let second = cluster(&data, k, 50, 1e-6).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), rows);
            prop_assert!(first.iter().all(|&label| label < k));
        }
    }
}
