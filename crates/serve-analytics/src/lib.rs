//! Analytics over the in-memory dataset.
//!
//! A closed catalog of named metrics, each a pure function of the dataset
//! and the current date, plus the fixed-shape dashboard snapshot.

pub mod metrics;
pub mod snapshot;

pub use metrics::Metric;
pub use snapshot::MetricsSnapshot;
