// src/services/email.rs

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{
    common::error::AppError,
    models::settings::EmailSettings,
    services::reminder_messages::EmailMessage,
};

/// Outbound email. Errors are always `AppError::Transport`.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, settings: &EmailSettings, message: &EmailMessage) -> Result<(), AppError>;
}

/// Resend-compatible HTTP provider. The key and sender stored in the email
/// settings take precedence over the ones from the environment.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct HttpEmailTransport {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    from_address: Option<String>,
}

impl HttpEmailTransport {
    pub fn new(client: Client, api_url: String, api_key: Option<String>, from_address: Option<String>) -> Self {
        Self { client, api_url, api_key, from_address }
    }

    fn resolve_key<'a>(&'a self, settings: &'a EmailSettings) -> Option<&'a str> {
        non_blank(settings.api_key.as_deref()).or_else(|| non_blank(self.api_key.as_deref()))
    }

    fn resolve_sender(&self, settings: &EmailSettings) -> Option<String> {
        let address = non_blank(settings.from_address.as_deref())
            .or_else(|| non_blank(self.from_address.as_deref()))?;

        Some(match non_blank(settings.from_name.as_deref()) {
            Some(name) => format!("{name} <{address}>"),
            None => address.to_string(),
        })
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(&self, settings: &EmailSettings, message: &EmailMessage) -> Result<(), AppError> {
        let api_key = self
            .resolve_key(settings)
            .ok_or_else(|| AppError::Transport("Email provider API key is not configured.".into()))?;
        let from = self
            .resolve_sender(settings)
            .ok_or_else(|| AppError::Transport("Sender address is not configured.".into()))?;

        let payload = json!({
            "from": from,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "email provider request failed");
                AppError::Transport("Email provider request failed.".into())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(to = %message.to, "reminder email accepted by provider");
            return Ok(());
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let reason = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown provider error");
        Err(AppError::Transport(format!("Email provider error ({status}): {reason}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpEmailTransport {
        HttpEmailTransport::new(
            Client::new(),
            "http://localhost/emails".into(),
            Some("env-key".into()),
            Some("dues@example.org".into()),
        )
    }

    #[test]
    fn stored_settings_override_environment() {
        let t = transport();
        let mut settings = EmailSettings::default();
        assert_eq!(t.resolve_key(&settings), Some("env-key"));
        assert_eq!(t.resolve_sender(&settings).as_deref(), Some("dues@example.org"));

        settings.api_key = Some("db-key".into());
        settings.from_address = Some("office@example.org".into());
        settings.from_name = Some("Community Centre".into());
        assert_eq!(t.resolve_key(&settings), Some("db-key"));
        assert_eq!(
            t.resolve_sender(&settings).as_deref(),
            Some("Community Centre <office@example.org>")
        );
    }

    #[test]
    fn blank_stored_values_fall_back_to_environment() {
        let t = transport();
        let settings = EmailSettings {
            api_key: Some("   ".into()),
            from_address: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(t.resolve_key(&settings), Some("env-key"));
        assert_eq!(t.resolve_sender(&settings).as_deref(), Some("dues@example.org"));
    }

    #[tokio::test]
    async fn missing_key_is_a_transport_error() {
        let t = HttpEmailTransport::new(Client::new(), "http://localhost/emails".into(), None, None);
        let message = EmailMessage {
            to: "a@example.org".into(),
            to_name: "A".into(),
            subject: "s".into(),
            html: "h".into(),
        };
        let err = t.send(&EmailSettings::default(), &message).await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
