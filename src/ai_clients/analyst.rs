//! OpenAI-compatible chat client that writes market commentary for signals

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::Signal;
use crate::error::{Result, SentinelError};
use crate::services::SignalAnalyst;

const SYSTEM_PROMPT: &str = "You are a professional crypto market analyst. Your task is to \
provide a concise and insightful analysis in Chinese based on the data provided. Your entire \
response must follow this three-section format strictly: \"【核心信号】\", \"【市场背景】\", and \
\"【潜在影响】\". Be concise and straight to the point.";

/// Analyst client configuration
#[derive(Debug, Clone)]
pub struct AnalystConfig {
    /// Full chat-completions URL
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl AnalystConfig {
    /// Enrichment needs all three of endpoint, model and key
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.model.is_empty() && !self.api_key.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct AnalystClient {
    config: AnalystConfig,
    http: Client,
}

impl AnalystClient {
    pub fn new(config: AnalystConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SentinelError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Send a system + user prompt pair, returning the first choice
    pub async fn chat(&self, system: &str, user: &str) -> Result<String> {
        if !self.is_configured() {
            return Err(SentinelError::Analysis(
                "AI endpoint, model name, or API key is not set".to_string(),
            ));
        }

        debug!(model = %self.config.model, "Sending request to AI endpoint");

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let err = SentinelError::from_response(response).await;
            warn!("AI API error: {}", err);
            return Err(err);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| SentinelError::Analysis(format!("Failed to parse AI response: {}", e)))?;

        first_choice(chat)
    }
}

#[async_trait]
impl SignalAnalyst for AnalystClient {
    async fn analyze(&self, signal: &Signal, context: &str) -> Result<String> {
        self.chat(SYSTEM_PROMPT, &user_prompt(signal, context)).await
    }
}

fn user_prompt(signal: &Signal, context: &str) -> String {
    format!(
        "A trading signal was detected for {}.\n\n\
         **Detected Signal:**\n\
         - Signal Type: {}\n\
         - Description: {}\n\n\
         **Market Context Data:**\n{}\n\n\
         Now, please provide your analysis based on the instructions.",
        signal.symbol,
        signal.kind.label(),
        signal.description,
        context
    )
}

fn first_choice(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| SentinelError::Analysis("received empty response from AI API".to_string()))?;
    debug!("AI response received: {} chars", content.len());
    Ok(content)
}
