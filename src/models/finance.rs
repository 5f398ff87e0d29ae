// src/models/finance.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::{
    date::{deserialize_lenient_opt, CalendarDate},
    money::Money,
};

// --- Enums (mapped to Postgres types) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn is_outstanding(self) -> bool {
        matches!(self, InvoiceStatus::Unpaid | InvoiceStatus::Overdue)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_status")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Paid,
    Rejected,
}

impl PaymentStatus {
    /// Money that actually arrived.
    pub fn is_settled(self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Paid)
    }
}

// --- Invoices ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    #[schema(example = "INV-2025-004")]
    pub id: String,

    /// Absent on legacy rows, which are matched by email or name instead.
    pub member_id: Option<Uuid>,

    #[schema(example = "Yusuf Rahman")]
    pub member_name: String,

    pub member_email: Option<String>,

    #[schema(example = "Nov 2025")]
    pub period: String,

    #[sqlx(try_from = "i64", rename = "amount_minor")]
    #[schema(value_type = String, example = "$250.00")]
    pub amount: Money,

    /// Stored status. Use the reconciliation engine for the effective one.
    pub status: InvoiceStatus,

    #[schema(value_type = Option<String>, format = Date, example = "2025-11-30")]
    pub due: Option<CalendarDate>,

    pub method: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub screenshot: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    pub member_id: Uuid,

    #[validate(length(min = 1, message = "Period is required."))]
    #[schema(example = "Nov 2025")]
    pub period: String,

    #[schema(value_type = String, example = "$250.00")]
    pub amount: Money,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub due: Option<CalendarDate>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoicePayload {
    #[validate(length(min = 1, message = "Period is required."))]
    pub period: String,

    #[schema(value_type = String, example = "$250.00")]
    pub amount: Money,

    pub status: InvoiceStatus,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub due: Option<CalendarDate>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkInvoicePaidPayload {
    #[validate(length(min = 1, message = "Payment method is required."))]
    #[schema(example = "FPS")]
    pub method: String,

    pub reference: Option<String>,
    pub screenshot: Option<String>,

    #[serde(default)]
    pub paid_to_admin: bool,
    pub paid_to_admin_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<CalendarDate>,
}

// --- Payments ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,

    pub member_id: Option<Uuid>,

    /// Member display name.
    #[schema(example = "Yusuf Rahman")]
    pub member: String,

    #[schema(example = "INV-2025-004")]
    pub invoice_id: Option<String>,

    #[sqlx(try_from = "i64", rename = "amount_minor")]
    #[schema(value_type = String, example = "$250.00")]
    pub amount: Money,

    /// Raw method as entered. Display through the payment method normalizer.
    #[schema(example = "Bank Transfer")]
    pub method: Option<String>,

    pub paid_to_admin: bool,
    pub paid_to_admin_name: Option<String>,

    pub status: PaymentStatus,

    #[schema(value_type = Option<String>, format = Date, example = "2025-01-15")]
    pub date: Option<CalendarDate>,

    pub screenshot: Option<String>,
    pub reference: Option<String>,

    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

/// Insert shape for payments; approval fields are filled only for payments
/// recorded as already settled.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub member_id: Option<Uuid>,
    pub member: String,
    pub invoice_id: Option<String>,
    pub amount: Money,
    pub method: Option<String>,
    pub paid_to_admin: bool,
    pub paid_to_admin_name: Option<String>,
    pub status: PaymentStatus,
    pub date: Option<CalendarDate>,
    pub screenshot: Option<String>,
    pub reference: Option<String>,
    pub approved_by: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentPayload {
    pub member_id: Uuid,

    pub invoice_id: Option<String>,

    #[schema(value_type = String, example = "$250.00")]
    pub amount: Money,

    #[validate(length(min = 1, message = "Payment method is required."))]
    pub method: String,

    #[serde(default)]
    pub paid_to_admin: bool,
    pub paid_to_admin_name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<CalendarDate>,

    pub screenshot: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectPaymentPayload {
    #[validate(length(min = 1, message = "A rejection reason is required."))]
    #[schema(example = "Screenshot does not match the amount")]
    pub reason: String,
}

/// Payment as listed on the dashboard, with the normalized method label.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,

    #[schema(example = "Online Payment")]
    pub display_method: String,
}

/// Invoice as listed on the dashboard, with the reconciled status.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    #[serde(flatten)]
    pub invoice: Invoice,

    pub effective_status: InvoiceStatus,

    #[schema(example = "N/A")]
    pub display_method: String,
}

// --- Donations ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    pub id: Uuid,

    #[schema(example = "Anonymous")]
    pub donor_name: String,

    pub is_member: bool,
    pub member_id: Option<Uuid>,

    #[sqlx(try_from = "i64", rename = "amount_minor")]
    #[schema(value_type = String, example = "$100.00")]
    pub amount: Money,

    pub method: Option<String>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-03-10")]
    pub date: Option<CalendarDate>,

    pub reference: Option<String>,
    pub screenshot: Option<String>,
    pub notes: Option<String>,

    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationPayload {
    #[validate(length(min = 1, message = "Donor name is required."))]
    pub donor_name: String,

    #[serde(default)]
    pub is_member: bool,
    pub member_id: Option<Uuid>,

    #[schema(value_type = String, example = "$100.00")]
    pub amount: Money,

    pub method: Option<String>,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<CalendarDate>,

    pub reference: Option<String>,
    pub screenshot: Option<String>,
    pub notes: Option<String>,
}
