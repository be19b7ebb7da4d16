pub mod metrics;
pub mod monitor;
pub mod pipeline;
pub mod traits;

pub use metrics::MonitorMetrics;
pub use monitor::{Monitor, MonitorSettings, RunReport};
pub use pipeline::{PipelineConfig, PipelineOutcome, SignalPipeline};
pub use traits::{MarketDataSource, SignalAnalyst, SignalNotifier, SuppressionStore};
