//! Remote summarizer using OpenAI-compatible APIs
//!
//! Implements the Summarizer trait for any OpenAI-compatible chat completion
//! endpoint with configurable URL, model, and API key via environment
//! variable.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SummarizerConfig;
use crate::summarizer::prompts::{summary_prompt, SYSTEM_PROMPT};
use crate::summarizer::types::SummarizerError;
use crate::summarizer::Summarizer;

/// Remote summarizer using OpenAI-compatible HTTP APIs
#[derive(Debug)]
pub struct RemoteSummarizer {
    client: Client,
    config: SummarizerConfig,
    api_key: String,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl RemoteSummarizer {
    /// Create a new remote summarizer with the given configuration
    ///
    /// Reads the API key from the environment variable named by
    /// `config.api_key_env`. Returns an error if it is not set or if no API
    /// URL is configured.
    pub fn new(config: &SummarizerConfig) -> Result<Self, SummarizerError> {
        if config.api_url.is_empty() {
            return Err(SummarizerError::Config(
                "summarizer.api_url is not set".to_string(),
            ));
        }

        let api_key = env::var(&config.api_key_env).map_err(|_| {
            SummarizerError::Config(format!(
                "API key env var '{}' not set",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SummarizerError::Api(e.to_string()))?;

        info!(
            "RemoteSummarizer initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Call the remote API, backing off exponentially on 429 and transport errors
    async fn call_api(&self, prompt: &str) -> Result<String, SummarizerError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        debug!("Calling remote API at: {}", url);

        let max_attempts = self.config.max_retries.max(1);
        let mut delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut last_error = None;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        "Request failed on attempt {}/{}: {}",
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    last_error = Some(e.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(
                    "Rate limited on attempt {}/{}, waiting {:?}",
                    attempt + 1,
                    max_attempts,
                    delay
                );
                last_error = Some(format!("API returned {status}"));
                continue;
            }

            if status.is_server_error() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SummarizerError::UpstreamUnavailable(format!(
                    "API returned {status}: {error_text}"
                )));
            }

            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(SummarizerError::Api(format!(
                    "API returned {status}: {error_text}"
                )));
            }

            let completion: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| SummarizerError::InvalidResponse(e.to_string()))?;

            return completion
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| SummarizerError::InvalidResponse("No choices returned".to_string()));
        }

        Err(SummarizerError::UpstreamUnavailable(format!(
            "Failed after {} attempts: {}",
            max_attempts,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }
}

#[async_trait]
impl Summarizer for RemoteSummarizer {
    async fn summarize(&self, text: &str) -> Result<String, SummarizerError> {
        let summary = self.call_api(&summary_prompt(text)).await?;
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(SummarizerError::InvalidResponse(
                "Model returned an empty summary".to_string(),
            ));
        }
        Ok(summary.to_string())
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
