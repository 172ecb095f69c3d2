use serde_json::Value;
use thiserror::Error;

use crate::chat::{ChatMessage, Role, MAX_MESSAGES, MAX_MESSAGE_LENGTH};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Messages must be an array")]
    InvalidShape,
    #[error("At least one message is required")]
    EmptyInput,
    #[error("Maximum 50 messages allowed")]
    TooManyMessages,
    #[error("Message {index} is invalid")]
    InvalidMessageShape { index: usize },
    #[error("Message {index} has invalid role. Must be 'user' or 'assistant'")]
    InvalidRole { index: usize },
    #[error("Message {index} content must be a string")]
    InvalidContentType { index: usize },
    #[error("Message {index} content cannot be empty")]
    EmptyContent { index: usize },
    #[error("Message {index} exceeds maximum length of 5000 characters")]
    ContentTooLong { index: usize },
}

/// Checks an arbitrary decoded JSON value claimed to be a message list and
/// returns it normalized (content trimmed, roles narrowed to the enum).
///
/// Pure and fail-fast: the first offending element aborts validation, with its
/// 1-based position reported in the error message.
pub fn validate_messages(value: &Value) -> Result<Vec<ChatMessage>, ValidationError> {
    let list = match value.as_array() {
        Some(list) => list,
        None => return Err(ValidationError::InvalidShape),
    };

    if list.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    if list.len() > MAX_MESSAGES {
        return Err(ValidationError::TooManyMessages);
    }

    let mut validated = Vec::with_capacity(list.len());
    for (i, entry) in list.iter().enumerate() {
        let index = i + 1;

        let obj = match entry.as_object() {
            Some(obj) => obj,
            None => return Err(ValidationError::InvalidMessageShape { index }),
        };

        let role = obj
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
            .ok_or(ValidationError::InvalidRole { index })?;

        let content = obj
            .get("content")
            .and_then(Value::as_str)
            .ok_or(ValidationError::InvalidContentType { index })?;

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyContent { index });
        }
        if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(ValidationError::ContentTooLong { index });
        }

        validated.push(ChatMessage {
            role,
            content: trimmed.to_string(),
        });
    }

    Ok(validated)
}
