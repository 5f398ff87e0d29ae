// src/models/settings.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInfo {
    #[schema(example = "Community Centre")]
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrganizationPayload {
    #[validate(length(min = 1, message = "Organization name is required."))]
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub website: Option<String>,
}

/// Where members can pay; rendered into every reminder.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: Uuid,
    #[schema(example = "FPS")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "FPS ID 1234567")]
    pub details: Option<String>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub description: Option<String>,
    pub details: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettings {
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub api_key: Option<String>,

    #[schema(example = "dues@example.org")]
    pub from_address: Option<String>,
    pub from_name: Option<String>,

    #[schema(example = "Payment reminder")]
    pub reminder_subject: String,

    /// HTML template with `{{member_name}}`-style placeholders.
    pub reminder_template: Option<String>,

    pub automated_reminders: bool,
    pub upcoming_window_days: i32,

    pub updated_at: Option<DateTime<Utc>>,
}

impl EmailSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            from_address: None,
            from_name: None,
            reminder_subject: "Payment reminder".to_string(),
            reminder_template: None,
            automated_reminders: false,
            upcoming_window_days: 7,
            updated_at: None,
        }
    }
}

/// Public view; never echoes the key back.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailSettingsView {
    #[serde(flatten)]
    pub settings: EmailSettings,
    pub api_key_configured: bool,
}

impl From<EmailSettings> for EmailSettingsView {
    fn from(settings: EmailSettings) -> Self {
        let api_key_configured = settings.has_api_key();
        Self { settings, api_key_configured }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmailSettingsPayload {
    /// Leave empty to keep the stored key.
    pub api_key: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    #[validate(length(min = 1, message = "Subject is required."))]
    pub reminder_subject: String,
    #[serde(default)]
    pub automated_reminders: bool,
    #[validate(range(min = 1, max = 60, message = "Window must be between 1 and 60 days."))]
    pub upcoming_window_days: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplatePayload {
    #[validate(length(min = 1, message = "Template cannot be empty."))]
    pub template: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestEmailPayload {
    #[validate(email(message = "Invalid email address."))]
    pub to: String,
}
