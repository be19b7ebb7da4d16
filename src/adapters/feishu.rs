//! Feishu (Lark) webhook notifications
//!
//! Signals go out as interactive cards; plain text is used for operational
//! messages such as the startup announcement.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::domain::{Signal, SignalKind};
use crate::error::{Result, SentinelError};
use crate::services::SignalNotifier;

/// Card timestamps are rendered in China Standard Time
const CST_OFFSET_SECS: i32 = 8 * 3600;

/// Feishu notification client
#[derive(Clone)]
pub struct FeishuNotifier {
    client: Client,
    webhook_url: String,
}

#[derive(Serialize)]
struct FeishuMessage {
    msg_type: String,
    content: FeishuContent,
}

#[derive(Serialize)]
struct FeishuContent {
    text: String,
}

#[derive(Debug, Serialize)]
struct FeishuCard {
    msg_type: &'static str,
    card: CardBody,
}

#[derive(Debug, Serialize)]
struct CardBody {
    header: CardHeader,
    elements: Vec<CardElement>,
}

#[derive(Debug, Serialize)]
struct CardHeader {
    title: CardText,
    template: &'static str,
}

#[derive(Debug, Serialize)]
struct CardText {
    tag: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "tag", rename_all = "lowercase")]
enum CardElement {
    Div { text: CardText },
    Hr,
    Note { elements: Vec<CardText> },
}

impl CardElement {
    fn markdown(content: String) -> Self {
        CardElement::Div {
            text: CardText {
                tag: "lark_md",
                content,
            },
        }
    }
}

impl FeishuNotifier {
    /// Create a new Feishu notifier
    pub fn new(webhook_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentinelError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
        })
    }

    /// Send a text message to Feishu
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let message = FeishuMessage {
            msg_type: "text".to_string(),
            content: FeishuContent {
                text: text.to_string(),
            },
        };
        self.post(&message).await
    }

    /// Send a signal as an interactive card
    pub async fn send_signal(&self, signal: &Signal) -> Result<()> {
        self.post(&signal_card(signal)).await?;
        info!(
            "Sent {} signal for {} to Feishu",
            signal.kind, signal.symbol
        );
        Ok(())
    }

    /// Send startup notification
    pub async fn notify_startup(&self, symbols: &[String], config_summary: &str) {
        let text = format!(
            "🚀 Market Sentinel Started\n\
             Symbols: {}\n\
             {}",
            symbols.join(", "),
            config_summary
        );

        if let Err(e) = self.send_message(&text).await {
            error!("Failed to send startup notification: {}", e);
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, body: &T) -> Result<()> {
        let resp = self
            .client
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!("Feishu request failed: {}", e);
                SentinelError::Notification(e.to_string())
            })?;

        if resp.status().is_success() {
            debug!("Feishu notification sent successfully");
            Ok(())
        } else {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!("Feishu notification failed: {} - {}", status, body);
            Err(SentinelError::Notification(format!("HTTP {}: {}", status, body)))
        }
    }
}

#[async_trait]
impl SignalNotifier for FeishuNotifier {
    async fn send(&self, signal: &Signal) -> Result<()> {
        self.send_signal(signal).await
    }
}

fn card_template(kind: SignalKind) -> &'static str {
    match kind {
        SignalKind::Volume | SignalKind::OpenInterest => "orange",
        SignalKind::LongShortRatio => "purple",
        SignalKind::Composite => "blue",
    }
}

/// Bold every bracketed section header, e.g. `【核心信号】`
fn emphasize_sections(analysis: &str) -> String {
    analysis.replace('【', "**【").replace('】', "】**")
}

fn format_cst(timestamp: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(CST_OFFSET_SECS) {
        Some(cst) => timestamp
            .with_timezone(&cst)
            .format("%Y-%m-%d %H:%M:%S CST")
            .to_string(),
        None => timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

fn signal_card(signal: &Signal) -> FeishuCard {
    let mut elements = vec![CardElement::markdown(signal.description.clone()), CardElement::Hr];

    if let Some(analysis) = signal.ai_analysis.as_deref().filter(|a| !a.is_empty()) {
        elements.push(CardElement::markdown(format!(
            "**🤖 AI Analysis**\n{}",
            emphasize_sections(analysis)
        )));
        elements.push(CardElement::Hr);
    }

    elements.push(CardElement::Note {
        elements: vec![CardText {
            tag: "plain_text",
            content: format!("Time: {}", format_cst(signal.timestamp)),
        }],
    });

    FeishuCard {
        msg_type: "interactive",
        card: CardBody {
            header: CardHeader {
                title: CardText {
                    tag: "plain_text",
                    content: format!("📈 {} Signal: {}", signal.symbol, signal.kind.label()),
                },
                template: card_template(signal.kind),
            },
            elements,
        },
    }
}
