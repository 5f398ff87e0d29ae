// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::SessionContext,
    models::auth::AdminRole,
};

/// A role rule checked before a handler runs.
pub trait PermissionDef: Send + Sync + 'static {
    fn action() -> &'static str;
    fn allows(role: AdminRole) -> bool;
}

/// Guard extractor: resolves the session and rejects roles `T` does not allow.
pub struct RequirePermission<T>(pub SessionContext, PhantomData<T>);

impl<T> RequirePermission<T> {
    pub fn session(&self) -> &SessionContext {
        &self.0
    }
}

impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_request_parts(parts, state).await?;
        session.require(T::allows, T::action())?;
        Ok(RequirePermission(session, PhantomData))
    }
}

// ---
// Permissions
// ---

pub struct PermMembersWrite;
impl PermissionDef for PermMembersWrite {
    fn action() -> &'static str { "manage members" }
    fn allows(role: AdminRole) -> bool { role.can_manage_members() }
}

pub struct PermBillingWrite;
impl PermissionDef for PermBillingWrite {
    fn action() -> &'static str { "manage invoices and donations" }
    fn allows(role: AdminRole) -> bool { role.can_manage_billing() }
}

pub struct PermPaymentsApprove;
impl PermissionDef for PermPaymentsApprove {
    fn action() -> &'static str { "review payments" }
    fn allows(role: AdminRole) -> bool { role.can_approve_payments() }
}

pub struct PermRemindersSend;
impl PermissionDef for PermRemindersSend {
    fn action() -> &'static str { "send reminders" }
    fn allows(role: AdminRole) -> bool { role.can_send_reminders() }
}

pub struct PermSettingsWrite;
impl PermissionDef for PermSettingsWrite {
    fn action() -> &'static str { "change settings" }
    fn allows(role: AdminRole) -> bool { role.can_manage_settings() }
}

pub struct PermOwner;
impl PermissionDef for PermOwner {
    fn action() -> &'static str { "perform owner-only actions" }
    fn allows(role: AdminRole) -> bool { role.is_owner() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_table() {
        assert!(PermPaymentsApprove::allows(AdminRole::Finance));
        assert!(!PermBillingWrite::allows(AdminRole::Finance));
        assert!(!PermOwner::allows(AdminRole::Admin));
        assert!(PermMembersWrite::allows(AdminRole::Admin));
        assert!(!PermRemindersSend::allows(AdminRole::Viewer));
        assert!(!PermSettingsWrite::allows(AdminRole::Finance));
    }
}
