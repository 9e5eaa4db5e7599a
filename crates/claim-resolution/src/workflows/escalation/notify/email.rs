use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use tracing::{info, warn};

use crate::config::EmailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EmailError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
    #[error("email rejected by provider: {0}")]
    Rejected(String),
    #[error("email delivery timed out after {0:?}")]
    TimedOut(Duration),
}

/// Email-sending collaborator. Success means the provider accepted the message.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError>;
}

/// Development outbox used when no provider is configured.
///
/// Plain notices are logged and count as handled. Messages carrying an attachment are
/// deliverables and fail, so callers see the undelivered package.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        if let Some(attachment) = &email.attachment {
            warn!(
                to = %email.to,
                subject = %email.subject,
                attachment = %attachment.file_name,
                attachment_bytes = attachment.bytes.len(),
                "attachment not delivered: no email provider configured"
            );
            return Err(EmailError::Transport("no email provider configured".to_string()));
        }

        info!(
            to = %email.to,
            subject = %email.subject,
            "email not delivered: no email provider configured"
        );
        Ok(())
    }
}

/// JSON email API client (`{from, to, subject, text, attachments: [{filename, content}]}`).
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    /// `None` when the email API is not configured.
    pub fn from_config(config: &EmailConfig, timeout: Duration) -> Result<Option<Self>, EmailError> {
        let (Some(api_url), Some(api_key)) = (config.api_url.clone(), config.api_key.clone()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EmailError::Transport(err.to_string()))?;

        Ok(Some(Self {
            client,
            api_url,
            api_key,
            from: config.from.clone(),
        }))
    }

    fn payload(&self, email: &OutboundEmail) -> serde_json::Value {
        let attachments: Vec<_> = email
            .attachment
            .iter()
            .map(|attachment| {
                json!({
                    "filename": attachment.file_name,
                    "content_type": attachment.content_type,
                    "content": STANDARD.encode(&attachment.bytes),
                })
            })
            .collect();

        json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "text": email.body,
            "attachments": attachments,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, email: OutboundEmail) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.payload(&email))
            .send()
            .await
            .map_err(|err| EmailError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(EmailError::Transport(format!("{status}: {body}")))
        } else {
            Err(EmailError::Rejected(format!("{status}: {body}")))
        }
    }
}
