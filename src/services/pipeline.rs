//! Dedup/notify pipeline for detected signals.
//!
//! Per signal: suppressed if its key is live in the store, otherwise
//! optionally enriched by the analyst, sent, and on success remembered
//! for the suppression TTL. Failures are logged and confined to the one signal.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::metrics::MonitorMetrics;
use super::traits::{SignalAnalyst, SignalNotifier, SuppressionStore};
use crate::domain::Signal;

/// Tunables for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long a delivered signal stays suppressed
    pub suppression_ttl: Duration,
    /// Upper bound on one enrichment call
    pub enrichment_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            suppression_ttl: Duration::from_secs(3600),
            enrichment_timeout: Duration::from_secs(45),
        }
    }
}

/// Terminal state of one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Key still live in the store, nothing sent
    Suppressed,
    /// Delivered; `enriched` tells whether AI text was attached
    Sent { enriched: bool },
    /// Delivery failed; dropped for this run and not remembered
    NotificationFailed,
}

pub struct SignalPipeline {
    notifier: Arc<dyn SignalNotifier>,
    store: Option<Arc<dyn SuppressionStore>>,
    analyst: Option<Arc<dyn SignalAnalyst>>,
    config: PipelineConfig,
    metrics: Arc<MonitorMetrics>,
}

impl SignalPipeline {
    pub fn new(
        notifier: Arc<dyn SignalNotifier>,
        config: PipelineConfig,
        metrics: Arc<MonitorMetrics>,
    ) -> Self {
        Self {
            notifier,
            store: None,
            analyst: None,
            config,
            metrics,
        }
    }

    /// Enable suppression; without a store nothing is ever suppressed
    pub fn with_store(mut self, store: Arc<dyn SuppressionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Enable AI enrichment
    pub fn with_analyst(mut self, analyst: Arc<dyn SignalAnalyst>) -> Self {
        self.analyst = Some(analyst);
        self
    }

    /// Drive one signal to a terminal state
    pub async fn process(&self, signal: Signal, context: &str) -> PipelineOutcome {
        let key = signal.suppression_key();

        if self.is_suppressed(&key).await {
            info!(key = %key, "signal already sent within suppression window, skipping");
            MonitorMetrics::inc(&self.metrics.signals_suppressed);
            return PipelineOutcome::Suppressed;
        }

        info!(
            symbol = %signal.symbol,
            kind = %signal.kind,
            "signal: {}",
            signal.description
        );

        let (signal, enriched) = match self.enrich(&signal, context).await {
            Some(analysis) => (signal.with_analysis(analysis), true),
            None => (signal, false),
        };

        if let Err(e) = self.notifier.send(&signal).await {
            error!(key = %key, "failed to send notification: {}", e);
            MonitorMetrics::inc(&self.metrics.notifications_failed);
            return PipelineOutcome::NotificationFailed;
        }
        MonitorMetrics::inc(&self.metrics.notifications_sent);

        self.remember(&key).await;
        PipelineOutcome::Sent { enriched }
    }

    /// Read failures count as "not suppressed"
    async fn is_suppressed(&self, key: &str) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.exists(key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(key, "suppression lookup failed, treating as not suppressed: {}", e);
                MonitorMetrics::inc(&self.metrics.suppression_errors);
                false
            }
        }
    }

    async fn enrich(&self, signal: &Signal, context: &str) -> Option<String> {
        let analyst = self.analyst.as_ref()?;
        let timeout = self.config.enrichment_timeout;

        match tokio::time::timeout(timeout, analyst.analyze(signal, context)).await {
            Ok(Ok(analysis)) => {
                debug!(symbol = %signal.symbol, chars = analysis.len(), "AI analysis attached");
                Some(analysis)
            }
            Ok(Err(e)) => {
                warn!(symbol = %signal.symbol, "AI analysis failed: {}", e);
                MonitorMetrics::inc(&self.metrics.enrichments_failed);
                None
            }
            Err(_) => {
                warn!(
                    symbol = %signal.symbol,
                    "AI analysis timed out after {}s",
                    timeout.as_secs_f64()
                );
                MonitorMetrics::inc(&self.metrics.enrichments_failed);
                None
            }
        }
    }

    /// Best-effort; the notification is already out
    async fn remember(&self, key: &str) {
        let Some(store) = &self.store else {
            return;
        };
        let ttl = self.config.suppression_ttl;
        match store.put(key, ttl).await {
            Ok(()) => info!(key, ttl_secs = ttl.as_secs(), "signal cached"),
            Err(e) => {
                warn!(key, "failed to record suppression key: {}", e);
                MonitorMetrics::inc(&self.metrics.suppression_errors);
            }
        }
    }
}
