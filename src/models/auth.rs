// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "admin_role")]
pub enum AdminRole {
    Owner,
    Admin,
    Finance,
    Viewer,
}

impl AdminRole {
    pub fn as_str(self) -> &'static str {
        match self {
            AdminRole::Owner => "Owner",
            AdminRole::Admin => "Admin",
            AdminRole::Finance => "Finance",
            AdminRole::Viewer => "Viewer",
        }
    }

    pub fn can_manage_members(self) -> bool {
        matches!(self, AdminRole::Owner | AdminRole::Admin)
    }

    /// Invoice and donation writes.
    pub fn can_manage_billing(self) -> bool {
        matches!(self, AdminRole::Owner | AdminRole::Admin)
    }

    pub fn can_approve_payments(self) -> bool {
        matches!(self, AdminRole::Owner | AdminRole::Admin | AdminRole::Finance)
    }

    pub fn can_send_reminders(self) -> bool {
        matches!(self, AdminRole::Owner | AdminRole::Admin | AdminRole::Finance)
    }

    /// Organization, payment methods and email provider settings.
    pub fn can_manage_settings(self) -> bool {
        matches!(self, AdminRole::Owner | AdminRole::Admin)
    }

    /// Hard deletes and admin account management.
    pub fn is_owner(self) -> bool {
        self == AdminRole::Owner
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: Uuid,

    #[schema(example = "Aisha Khan")]
    pub name: String,

    #[schema(example = "aisha@example.org")]
    pub email: String,

    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,

    pub role: AdminRole,
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub admin: AdminUser,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
    pub role: AdminRole,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAdminPayload {
    #[validate(length(min = 1, message = "Name is required."))]
    pub name: String,
    pub role: AdminRole,
    pub active: bool,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: Option<String>,
}

// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub role: AdminRole,
    pub exp: usize,
    pub iat: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_is_owner() {
        assert!(AdminRole::Owner.is_owner());
        assert!(!AdminRole::Admin.is_owner());
    }

    #[test]
    fn finance_can_approve_but_not_edit_members() {
        assert!(AdminRole::Finance.can_approve_payments());
        assert!(!AdminRole::Finance.can_manage_members());
        assert!(!AdminRole::Viewer.can_send_reminders());
    }
}
