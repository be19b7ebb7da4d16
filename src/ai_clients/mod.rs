//! AI client integrations for signal commentary

pub mod analyst;

pub use analyst::{AnalystClient, AnalystConfig};
