mod main_runtime;

use clap::Parser;
use market_sentinel::adapters::{BinanceFuturesClient, FeishuNotifier};
use market_sentinel::ai_clients::AnalystClient;
use market_sentinel::cli::{self, Cli, Commands};
use market_sentinel::config::{normalize_symbols, AppConfig, SuppressionBackend};
use market_sentinel::error::{Result, SentinelError};
use market_sentinel::persistence::{InMemorySuppressionStore, PostgresSuppressionStore};
use market_sentinel::services::{
    Monitor, MonitorMetrics, SignalPipeline, SuppressionStore,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use main_runtime::{init_logging, init_logging_simple, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match AppConfig::load_from(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", cli.config.display(), e);
            return Err(e.into());
        }
    };

    match cli.command() {
        Commands::Scan { symbol } => {
            init_logging_simple();
            run_scan(&config, &symbol).await
        }
        Commands::Run => {
            init_logging(&config.logging);
            let (monitor, _) = build_monitor(&config, true).await?;
            let report = monitor.run_once().await;
            info!(?report, "run finished");
            Ok(())
        }
        Commands::Daemon {
            interval_secs,
            announce,
        } => {
            init_logging(&config.logging);
            let every = Duration::from_secs(
                interval_secs.unwrap_or(config.monitor.schedule_interval_secs).max(1),
            );
            let (monitor, notifier) = build_monitor(&config, false).await?;
            if announce {
                notifier
                    .notify_startup(&config.monitor.symbols, &config.summary())
                    .await;
            }
            info!(every_secs = every.as_secs(), "daemon started");
            monitor.run_every(every, shutdown_signal()).await;
            info!("final metrics: {}", monitor.metrics().summary());
            Ok(())
        }
    }
}

async fn build_monitor(config: &AppConfig, one_shot: bool) -> Result<(Monitor, FeishuNotifier)> {
    let validation = if one_shot {
        config.validate_one_shot()
    } else {
        config.validate()
    };
    if let Err(errors) = validation {
        for e in &errors {
            error!("Invalid configuration: {}", e);
        }
        return Err(SentinelError::InvalidConfig(errors));
    }
    if config.ai_partially_configured() {
        warn!("AI settings are incomplete (endpoint, model and key are all needed), enrichment disabled");
    }
    info!(
        symbols = %config.monitor.symbols.join(","),
        "configuration loaded: {}",
        config.summary()
    );

    let metrics = Arc::new(MonitorMetrics::new());
    let source = Arc::new(BinanceFuturesClient::new(
        config.exchange.base_url.clone(),
        Duration::from_secs(config.exchange.timeout_secs),
    )?);
    let notifier = FeishuNotifier::new(
        config.notifier.webhook_url.clone(),
        Duration::from_secs(config.notifier.timeout_secs),
    )?;

    let mut pipeline = SignalPipeline::new(
        Arc::new(notifier.clone()),
        config.pipeline_config(),
        metrics.clone(),
    );
    if let Some(store) = build_store(config).await? {
        pipeline = pipeline.with_store(store);
    }
    if config.ai.is_enabled() {
        pipeline = pipeline.with_analyst(Arc::new(AnalystClient::new(config.analyst_config())?));
    }

    Ok((
        Monitor::new(config.monitor_settings(), source, pipeline, metrics),
        notifier,
    ))
}

async fn build_store(config: &AppConfig) -> Result<Option<Arc<dyn SuppressionStore>>> {
    match config.suppression.backend {
        SuppressionBackend::None => {
            warn!("Suppression disabled, every detected signal will be sent");
            Ok(None)
        }
        SuppressionBackend::Memory => Ok(Some(Arc::new(InMemorySuppressionStore::new()))),
        SuppressionBackend::Postgres => {
            let url = config.suppression.database_url.as_deref().ok_or_else(|| {
                SentinelError::InvalidConfig(vec![
                    "suppression.database_url is required for the postgres backend".to_string(),
                ])
            })?;
            let store = PostgresSuppressionStore::connect(
                url,
                config.suppression.max_connections,
                Duration::from_secs(config.suppression.acquire_timeout_secs),
            )
            .await?;
            Ok(Some(Arc::new(store)))
        }
    }
}

async fn run_scan(config: &AppConfig, symbol: &str) -> Result<()> {
    let symbol = normalize_symbols([symbol])
        .pop()
        .ok_or_else(|| SentinelError::InvalidConfig(vec!["symbol must not be empty".to_string()]))?;

    let metrics = Arc::new(MonitorMetrics::new());
    let source = Arc::new(BinanceFuturesClient::new(
        config.exchange.base_url.clone(),
        Duration::from_secs(config.exchange.timeout_secs),
    )?);
    // Scans never notify; the webhook may be unset.
    let notifier = FeishuNotifier::new(
        config.notifier.webhook_url.clone(),
        Duration::from_secs(config.notifier.timeout_secs),
    )?;
    let pipeline = SignalPipeline::new(Arc::new(notifier), config.pipeline_config(), metrics.clone());
    let mut settings = config.monitor_settings();
    settings.symbols = vec![symbol.clone()];
    let monitor = Monitor::new(settings, source, pipeline, metrics);

    let (signals, context) = monitor.scan(&symbol).await?;
    println!("{} ({} x {})\n", symbol, config.monitor.lookback, config.monitor.interval);
    println!("{}\n", cli::render_signals(&signals));
    println!("{}", context);
    Ok(())
}
