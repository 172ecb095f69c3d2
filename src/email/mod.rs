use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::EmailConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Mail API Error: {0}")]
    Api(String),
}

/// Delivery is an external collaborator; the trait keeps it injectable so the
/// account flow works the same against a real provider or the log fallback.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_deletion_confirmation(
        &self,
        to: &str,
        confirm_url: &str,
        expires_in_hours: u32,
    ) -> Result<(), MailError>;
}

pub fn deletion_email_html(confirm_url: &str, expires_in_hours: u32) -> String {
    let expiry = if expires_in_hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{} hours", expires_in_hours)
    };
    format!(
        "<p>We received a request to permanently delete your StudyBuddy account.</p>\
         <p><strong>Warning: this action is irreversible.</strong> All chat history and sessions will be deleted.</p>\
         <p><a href=\"{confirm_url}\">Confirm Account Deletion</a></p>\
         <p>This link will expire in {expiry}. If you did not request this, you can safely ignore this email.</p>"
    )
}

/// Sends through a Resend-style HTTP email API.
pub struct HttpMailer {
    client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_deletion_confirmation(
        &self,
        to: &str,
        confirm_url: &str,
        expires_in_hours: u32,
    ) -> Result<(), MailError> {
        let body = json!({
            "from": self.from,
            "to": [to],
            "subject": "Confirm Account Deletion - StudyBuddy",
            "html": deletion_email_html(confirm_url, expires_in_hours),
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(MailError::Api(format!("{}: {}", status, text)));
        }

        Ok(())
    }
}

/// Used when no email section is configured; logs the link instead of sending.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_deletion_confirmation(
        &self,
        to: &str,
        confirm_url: &str,
        _expires_in_hours: u32,
    ) -> Result<(), MailError> {
        info!("email not configured; deletion confirmation for {}: {}", to, confirm_url);
        Ok(())
    }
}

pub fn from_config(config: &Option<EmailConfig>) -> Arc<dyn Mailer> {
    match config {
        Some(cfg) => Arc::new(HttpMailer::new(cfg)),
        None => Arc::new(LogMailer),
    }
}
