use actix_web::{post, web, HttpMessage, HttpRequest, HttpResponse, Result as WebResult};
use futures_util::StreamExt;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::api::middleware::AuthedKey;
use crate::chat::validate_messages;
use crate::config::AppConfig;
use crate::llm::{GatewayClient, LlmError};

/// Streaming relay: validate, forward with the tutoring system prompt
/// prepended, and pipe the upstream SSE body back unmodified. No buffering,
/// no re-encoding, no retries; closing the connection aborts the passthrough.
#[post("/v1/study-chat")]
pub async fn study_chat(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    gateway: web::Data<GatewayClient>,
    body: web::Bytes,
) -> WebResult<HttpResponse> {
    let parsed: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return Ok(HttpResponse::BadRequest()
                .json(json!({ "error": "Invalid JSON in request body" })))
        }
    };

    if !parsed.is_object() {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "error": "Request body must be an object" })));
    }

    let messages_value = parsed.get("messages").unwrap_or(&Value::Null);
    let messages = match validate_messages(messages_value) {
        Ok(messages) => messages,
        Err(e) => {
            warn!("validation error: {}", e);
            return Ok(HttpResponse::BadRequest().json(json!({ "error": e.to_string() })));
        }
    };

    let caller = req
        .extensions()
        .get::<AuthedKey>()
        .map(|key| key.0.clone())
        .unwrap_or_default();
    info!(
        "Processing study chat request for key {} with {} messages",
        caller,
        messages.len()
    );

    match gateway
        .stream_completion(&messages, &config.chat.system_prompt)
        .await
    {
        Ok(upstream) => {
            let stream = upstream
                .bytes_stream()
                .map(|chunk| chunk.map_err(actix_web::error::ErrorInternalServerError));
            Ok(HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(stream))
        }
        Err(LlmError::RateLimited) => Ok(HttpResponse::TooManyRequests()
            .json(json!({ "error": "Rate limit exceeded. Please try again in a moment." }))),
        Err(LlmError::QuotaExceeded) => Ok(HttpResponse::PaymentRequired()
            .json(json!({ "error": "Usage limit reached. Please add credits to continue." }))),
        Err(e) => {
            error!("study chat upstream error: {}", e);
            Ok(HttpResponse::InternalServerError()
                .json(json!({ "error": "Failed to get AI response" })))
        }
    }
}
