//! The fixed in-memory dataset and the generic collection query engine.
//!
//! The dataset stands in for a real database: it is built once at process
//! start, immutable for the life of the process, and read-only from all
//! request handlers.

pub mod dataset;
pub mod query;
pub mod records;

pub use dataset::{CollectionName, Dataset};
pub use query::{execute_raw, QueryRequest};
