// src/models/members.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        date::{deserialize_lenient_opt, CalendarDate},
        money::{serialize_balance, Money},
    },
    models::finance::{InvoiceView, PaymentView},
};

// --- Enums (mapped to Postgres types) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "member_status")]
pub enum MemberStatus {
    Active,
    Inactive,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_type")]
pub enum SubscriptionType {
    Lifetime,
    #[serde(rename = "Yearly + Janaza Fund")]
    #[sqlx(rename = "Yearly + Janaza Fund")]
    YearlyJanazaFund,
}

impl SubscriptionType {
    /// Yearly dues used by the report's expected-collection figure.
    pub fn annual_rate(self) -> Money {
        match self {
            SubscriptionType::Lifetime => Money::from_major(250),
            SubscriptionType::YearlyJanazaFund => Money::from_major(500),
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: Uuid,

    #[schema(example = "Yusuf Rahman")]
    pub name: String,

    #[schema(example = "yusuf@example.org")]
    pub email: String,

    #[schema(example = "+85291234567")]
    pub phone: Option<String>,

    pub status: MemberStatus,

    /// Cached projection of the outstanding invoices.
    #[sqlx(try_from = "i64", rename = "balance_minor")]
    #[serde(serialize_with = "serialize_balance")]
    #[schema(value_type = String, example = "$250.00 Outstanding")]
    pub balance: Money,

    pub subscription_type: SubscriptionType,

    #[schema(value_type = Option<String>, format = Date, example = "2026-01-01")]
    pub next_due: Option<CalendarDate>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-01-03")]
    pub last_payment: Option<CalendarDate>,

    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    #[schema(example = "Yusuf Rahman")]
    pub name: String,

    #[validate(email(message = "Invalid email address."))]
    #[schema(example = "yusuf@example.org")]
    pub email: String,

    pub phone: Option<String>,

    #[serde(default = "default_member_status")]
    pub status: MemberStatus,

    pub subscription_type: SubscriptionType,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub next_due: Option<CalendarDate>,
}

fn default_member_status() -> MemberStatus {
    MemberStatus::Pending
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,

    #[validate(email(message = "Invalid email address."))]
    pub email: String,

    pub phone: Option<String>,

    pub status: MemberStatus,

    pub subscription_type: SubscriptionType,

    #[serde(default, deserialize_with = "deserialize_lenient_opt")]
    #[schema(value_type = Option<String>, format = Date)]
    pub next_due: Option<CalendarDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSubscriptionPayload {
    pub subscription_type: SubscriptionType,
}

/// Member with its reconciled billing history.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: Member,

    #[schema(value_type = String, example = "$250.00")]
    pub outstanding: Money,

    pub invoices: Vec<InvoiceView>,
    pub payments: Vec<PaymentView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_labels_match_dashboard() {
        let parsed: SubscriptionType = serde_json::from_str(r#""Yearly + Janaza Fund""#).unwrap();
        assert_eq!(parsed, SubscriptionType::YearlyJanazaFund);
        assert_eq!(
            serde_json::to_string(&SubscriptionType::Lifetime).unwrap(),
            r#""Lifetime""#
        );
    }

    #[test]
    fn annual_rates() {
        assert_eq!(SubscriptionType::Lifetime.annual_rate(), Money::from_major(250));
        assert_eq!(SubscriptionType::YearlyJanazaFund.annual_rate(), Money::from_major(500));
    }
}
