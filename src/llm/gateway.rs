use reqwest::Client;
use serde_json::json;
use tracing::error;

use crate::chat::ChatMessage;
use crate::config::LlmConfig;
use crate::llm::LlmError;

/// Thin client for the hosted completion gateway. The relay never touches the
/// streamed body; it hands the raw response straight through so frame
/// boundaries reach the consumer byte-exact.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GatewayClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Forwards the validated conversation, system prompt prepended, with
    /// `stream: true`. On 2xx the raw response is returned for passthrough.
    pub async fn stream_completion(
        &self,
        messages: &[ChatMessage],
        system_prompt: &str,
    ) -> Result<reqwest::Response, LlmError> {
        let mut final_messages = vec![json!({
            "role": "system",
            "content": system_prompt,
        })];
        for msg in messages {
            final_messages.push(json!({
                "role": msg.role.as_str(),
                "content": msg.content,
            }));
        }

        let body = json!({
            "model": self.model,
            "messages": final_messages,
            "stream": true,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("AI gateway error: {} {}", status, text);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited);
            }
            if status == reqwest::StatusCode::PAYMENT_REQUIRED {
                return Err(LlmError::QuotaExceeded);
            }
            return Err(LlmError::Api(format!("Gateway Error {}", status)));
        }

        Ok(response)
    }
}
