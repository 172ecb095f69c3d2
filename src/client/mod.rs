use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc::Sender;

use crate::chat::ChatMessage;
use crate::sse::SseParser;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Rate limit exceeded. Please try again in a moment.")]
    RateLimited,
    #[error("Usage limit reached. Please add credits to continue.")]
    QuotaExceeded,
    #[error("{0}")]
    Rejected(String),
}

/// Consumes the relay's SSE stream and accumulates the assistant reply.
///
/// Every UI surface goes through this one consumer; the bearer key injected
/// at construction decides what the caller is allowed to do.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Sends the conversation and streams deltas on `tx` as they decode,
    /// returning the full accumulated reply at the end.
    ///
    /// A transport failure mid-stream returns `Err`; the partial accumulation
    /// is dropped with it rather than surfacing a truncated reply as complete.
    pub async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        tx: Sender<String>,
    ) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!("{}/v1/study-chat", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "messages": messages }))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(str::to_string));
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimited,
                StatusCode::PAYMENT_REQUIRED => ChatError::QuotaExceeded,
                _ => ChatError::Rejected(
                    reason.unwrap_or_else(|| format!("Request failed with status {}", status)),
                ),
            });
        }

        let mut parser = SseParser::new();
        let mut assistant_content = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| ChatError::Network(e.to_string()))?;
            for delta in parser.push(&bytes) {
                assistant_content.push_str(&delta);
                let _ = tx.send(delta).await;
            }
            if parser.is_done() {
                break;
            }
        }

        for delta in parser.finish() {
            assistant_content.push_str(&delta);
            let _ = tx.send(delta).await;
        }

        Ok(assistant_content)
    }
}
