//! Run loop: fetch, analyze and dispatch every configured symbol

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use super::metrics::MonitorMetrics;
use super::pipeline::{PipelineOutcome, SignalPipeline};
use super::traits::MarketDataSource;
use crate::domain::{lenient_fallback_count, Signal};
use crate::error::Result;
use crate::strategy;

/// Fixed data window for one check
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub symbols: Vec<String>,
    /// Kline interval / statistics period, e.g. "15m"
    pub interval: String,
    /// Number of intervals to fetch
    pub lookback: usize,
}

/// Totals for one pass over the symbol list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub symbols_checked: usize,
    pub symbols_failed: usize,
    pub signals_detected: usize,
    pub suppressed: usize,
    pub sent: usize,
    pub enriched: usize,
    pub send_failed: usize,
}

impl RunReport {
    fn record(&mut self, outcome: PipelineOutcome) {
        match outcome {
            PipelineOutcome::Suppressed => self.suppressed += 1,
            PipelineOutcome::Sent { enriched } => {
                self.sent += 1;
                if enriched {
                    self.enriched += 1;
                }
            }
            PipelineOutcome::NotificationFailed => self.send_failed += 1,
        }
    }
}

pub struct Monitor {
    settings: MonitorSettings,
    source: Arc<dyn MarketDataSource>,
    pipeline: SignalPipeline,
    metrics: Arc<MonitorMetrics>,
}

impl Monitor {
    pub fn new(
        settings: MonitorSettings,
        source: Arc<dyn MarketDataSource>,
        pipeline: SignalPipeline,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        Self {
            settings,
            source,
            pipeline,
            metrics,
        }
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    /// One pass over every symbol. A failing symbol never aborts the others.
    pub async fn run_once(&self) -> RunReport {
        info!(symbols = self.settings.symbols.len(), "starting check");
        MonitorMetrics::inc(&self.metrics.runs);
        let lenient_before = lenient_fallback_count();

        let mut report = RunReport::default();
        for symbol in &self.settings.symbols {
            report.symbols_checked += 1;
            MonitorMetrics::inc(&self.metrics.symbols_checked);

            if let Err(e) = self.check_symbol(symbol, &mut report).await {
                error!(symbol = %symbol, "failed to check symbol: {}", e);
                report.symbols_failed += 1;
                MonitorMetrics::inc(&self.metrics.symbols_failed);
            }
        }

        let lenient = lenient_fallback_count().saturating_sub(lenient_before);
        if lenient > 0 {
            warn!(count = lenient, "numeric fields defaulted to 0 during this run");
        }
        info!(
            checked = report.symbols_checked,
            failed = report.symbols_failed,
            signals = report.signals_detected,
            sent = report.sent,
            suppressed = report.suppressed,
            "check complete"
        );
        info!("metrics: {}", self.metrics.summary());
        report
    }

    /// Run forever on a fixed cadence until `shutdown` resolves.
    ///
    /// The first pass starts immediately; a pass is never interrupted midway.
    pub async fn run_every<F>(&self, every: Duration, shutdown: F)
    where
        F: std::future::Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, stopping monitor");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }
    }

    /// Fetch and analyze without notifying
    pub async fn scan(&self, symbol: &str) -> Result<(Vec<Signal>, String)> {
        let snapshot = self
            .source
            .fetch(symbol, &self.settings.interval, self.settings.lookback)
            .await?;
        Ok((
            strategy::analyze(&snapshot),
            strategy::build_context(&snapshot),
        ))
    }

    #[instrument(skip(self, report))]
    async fn check_symbol(&self, symbol: &str, report: &mut RunReport) -> Result<()> {
        info!("fetching market data");
        let snapshot = self
            .source
            .fetch(symbol, &self.settings.interval, self.settings.lookback)
            .await?;

        let signals = strategy::analyze(&snapshot);
        if signals.is_empty() {
            info!("no signals");
            return Ok(());
        }

        info!(count = signals.len(), "signals detected");
        report.signals_detected += signals.len();
        MonitorMetrics::add(&self.metrics.signals_detected, signals.len() as u64);

        let context = strategy::build_context(&snapshot);
        for signal in signals {
            let outcome = self.pipeline.process(signal, &context).await;
            report.record(outcome);
        }
        Ok(())
    }
}
