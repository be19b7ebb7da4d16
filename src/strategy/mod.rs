//! Statistics, anomaly detectors and the per-symbol orchestrator

pub mod analyzer;
pub mod detectors;
pub mod stats;

pub use analyzer::{analyze, build_context};
pub use detectors::{
    detect_long_short_ratio, detect_open_interest, detect_volume, Z_SCORE_THRESHOLD,
};
