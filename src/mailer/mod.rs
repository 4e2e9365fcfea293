//! Transactional email through the MailerSend API.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

use crate::core::AppConfig;

/// Outcome of a send attempt that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: bool,
    pub status_code: Option<u16>,
    pub diagnostic: Option<String>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Email sender is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Email request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        recipient_name: &str,
    ) -> Result<DeliveryReport, DeliveryError>;
}

pub struct MailerSend {
    api_url: String,
    api_key: String,
    sender_name: String,
    sender_email: String,
}

impl MailerSend {
    pub fn new(api_url: &str, api_key: &str, sender_name: &str, sender_email: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            sender_name: sender_name.to_string(),
            sender_email: sender_email.to_string(),
        }
    }
}

impl From<&AppConfig> for MailerSend {
    fn from(config: &AppConfig) -> Self {
        MailerSend::new(
            &config.mailersend_api_url,
            &config.mailersend_api_key,
            &config.sender_name,
            &config.sender_email,
        )
    }
}

#[async_trait]
impl EmailSender for MailerSend {
    async fn send(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        recipient_name: &str,
    ) -> Result<DeliveryReport, DeliveryError> {
        if self.api_key.is_empty() {
            return Err(DeliveryError::NotConfigured("MAILERSEND_API_KEY is not set"));
        }
        if self.sender_email.is_empty() {
            return Err(DeliveryError::NotConfigured("MAILERSEND_SENDER_EMAIL is not set"));
        }

        let payload = json!({
            "from": {"email": self.sender_email, "name": self.sender_name},
            "to": [{"email": to, "name": recipient_name}],
            "subject": subject,
            "text": body,
            "html": html_body(body),
        });

        let res = reqwest::Client::new()
            .post(format!("{}/v1/email", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        // MailerSend queues accepted messages and answers 202 with an
        // empty body
        let status = res.status();
        let delivered = status == reqwest::StatusCode::ACCEPTED;
        let diagnostic = if delivered {
            None
        } else {
            let body = res.text().await.unwrap_or_default();
            tracing::error!("MailerSend rejected email to {}: {} {}", to, status, body);
            Some(body)
        };

        Ok(DeliveryReport {
            delivered,
            status_code: Some(status.as_u16()),
            diagnostic,
        })
    }
}

/// Wraps model-written plain text in a paragraph. The text is escaped
/// since it echoes user input.
fn html_body(text: &str) -> String {
    let escaped = handlebars::html_escape(text).replace('\n', "<br>");
    format!("<p>{}</p>", escaped)
}
