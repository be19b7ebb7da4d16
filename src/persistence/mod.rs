//! Persistence for signal suppression keys

pub mod suppression;

pub use suppression::{InMemorySuppressionStore, PostgresSuppressionStore};
