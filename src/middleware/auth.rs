// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::auth::AdminRole};

/// The signed-in admin, resolved from the bearer token on every request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub admin_id: Uuid,
    pub admin_name: String,
    pub role: AdminRole,
}

impl SessionContext {
    pub fn require(&self, allowed: fn(AdminRole) -> bool, action: &'static str) -> Result<(), AppError> {
        if allowed(self.role) {
            Ok(())
        } else {
            tracing::warn!(admin_id = %self.admin_id, role = self.role.as_str(), action, "permission denied");
            Err(AppError::Forbidden(self.role.as_str().to_string(), action))
        }
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<SessionContext>() {
            return Ok(session.clone());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidToken)?;

        let app_state = AppState::from_ref(state);
        let admin = app_state.auth_service.validate_token(bearer.token()).await?;

        let session = SessionContext {
            admin_id: admin.id,
            admin_name: admin.name,
            role: admin.role,
        };
        parts.extensions.insert(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: AdminRole) -> SessionContext {
        SessionContext { admin_id: Uuid::from_u128(1), admin_name: "Aisha".into(), role }
    }

    #[test]
    fn require_maps_denials_to_forbidden() {
        assert!(session(AdminRole::Finance).require(AdminRole::can_approve_payments, "approve payments").is_ok());

        let err = session(AdminRole::Viewer)
            .require(AdminRole::can_manage_members, "edit members")
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(role, "edit members") if role == "Viewer"));
    }
}
