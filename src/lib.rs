//! kmeans-table: load a delimited numeric table and cluster its rows with k-means
//!
//! The [`Table`] store keeps labelled rows in one row-major buffer. The
//! [`KMeans`] engine reads a table without modifying it and returns one
//! cluster index per row.

pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod report;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::Table;
pub use error::Error;
pub use model::{centroid_shift, cluster, InitStrategy, KMeans, KMeansConfig, KMeansOutcome, Termination};
pub use report::{render_assignments, render_summary, Assignments, Summary};
pub use viz::generate_visualization_report;

/// Common result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
