pub mod adapters;
pub mod ai_clients;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod services;
pub mod strategy;

pub use config::AppConfig;
pub use domain::{MarketSnapshot, Signal, SignalKind};
pub use error::{Result, SentinelError};
pub use services::{Monitor, MonitorMetrics, RunReport, SignalPipeline};
