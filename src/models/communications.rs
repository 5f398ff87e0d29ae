// src/models/communications.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "communication_channel")]
pub enum Channel {
    Email,
    WhatsApp,
}

/// `Requested` means the compose window was handed to an admin (WhatsApp
/// click-to-chat); it only becomes `Delivered` once someone confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "communication_status")]
pub enum CommunicationStatus {
    Requested,
    Delivered,
    Failed,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationLogEntry {
    pub id: Uuid,
    pub channel: Channel,

    #[serde(rename = "type")]
    #[schema(example = "Payment Reminder")]
    pub kind: String,

    pub member_id: Option<Uuid>,
    pub member_email: Option<String>,
    pub member_name: String,

    pub message: String,
    pub status: CommunicationStatus,
    pub date: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Insert shape for the communication log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCommunicationLog {
    pub channel: Channel,
    pub kind: String,
    pub member_id: Option<Uuid>,
    pub member_email: Option<String>,
    pub member_name: String,
    pub message: String,
    pub status: CommunicationStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reminder_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderType {
    Overdue,
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reminder_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Sent,
    Failed,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReminderLogEntry {
    pub id: Uuid,
    pub member_id: Option<Uuid>,
    pub member_email: String,
    pub reminder_type: ReminderType,

    #[sqlx(try_from = "i64", rename = "amount_minor")]
    #[schema(value_type = String, example = "$250.00")]
    pub amount: Money,

    pub invoice_count: i32,
    pub sent_at: DateTime<Utc>,
    pub status: ReminderStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReminderLog {
    pub member_id: Option<Uuid>,
    pub member_email: String,
    pub reminder_type: ReminderType,
    pub amount: Money,
    pub invoice_count: i32,
    pub status: ReminderStatus,
    pub error: Option<String>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendReminderPayload {
    pub member_id: Option<Uuid>,

    #[serde(default)]
    pub send_to_all: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceReminderPayload {
    #[schema(example = "INV-2025-004")]
    pub invoice_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetryRemindersPayload {
    /// Specific failed entries; all failed entries when absent.
    pub ids: Option<Vec<Uuid>>,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub member_id: Uuid,
    pub member_name: String,
    pub channel: Channel,
    pub status: CommunicationStatus,

    #[schema(value_type = String, example = "$250.00")]
    pub total_due: Money,
    pub invoice_count: usize,

    /// Click-to-chat link for WhatsApp dispatches.
    pub chat_url: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDispatchReport {
    pub requested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub outcomes: Vec<DispatchOutcome>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RetryReport {
    pub retried: usize,
    pub sent: usize,
    pub failed: usize,
}
