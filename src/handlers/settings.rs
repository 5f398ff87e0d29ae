// src/handlers/settings.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::SessionContext,
        rbac::{PermSettingsWrite, RequirePermission},
    },
    models::settings::{
        EmailSettingsView, EmailTemplatePayload, OrganizationInfo, PaymentMethod, PaymentMethodPayload,
        TestEmailPayload, UpdateEmailSettingsPayload, UpdateOrganizationPayload,
    },
};

// GET /api/settings/organization
#[utoipa::path(
    get,
    path = "/api/settings/organization",
    tag = "Settings",
    responses((status = 200, description = "Organization details", body = OrganizationInfo)),
    security(("api_jwt" = []))
)]
pub async fn get_organization(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let info = app_state.settings_repo.get_organization(&app_state.db_pool).await?;
    Ok((StatusCode::OK, Json(info)))
}

// PUT /api/settings/organization
#[utoipa::path(
    put,
    path = "/api/settings/organization",
    tag = "Settings",
    request_body = UpdateOrganizationPayload,
    responses((status = 200, description = "Organization saved", body = OrganizationInfo)),
    security(("api_jwt" = []))
)]
pub async fn update_organization(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<UpdateOrganizationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let info = app_state
        .settings_repo
        .upsert_organization(&app_state.db_pool, &payload)
        .await?;
    Ok((StatusCode::OK, Json(info)))
}

// ---
// Payment methods
// ---

#[utoipa::path(
    get,
    path = "/api/settings/payment-methods",
    tag = "Settings",
    responses((status = 200, description = "Configured payment methods", body = Vec<PaymentMethod>)),
    security(("api_jwt" = []))
)]
pub async fn list_payment_methods(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let methods = app_state.settings_repo.list_payment_methods(&app_state.db_pool).await?;
    Ok((StatusCode::OK, Json(methods)))
}

#[utoipa::path(
    post,
    path = "/api/settings/payment-methods",
    tag = "Settings",
    request_body = PaymentMethodPayload,
    responses((status = 201, description = "Payment method created", body = PaymentMethod)),
    security(("api_jwt" = []))
)]
pub async fn create_payment_method(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<PaymentMethodPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let method = app_state
        .settings_repo
        .create_payment_method(&app_state.db_pool, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(method)))
}

#[utoipa::path(
    put,
    path = "/api/settings/payment-methods/{id}",
    tag = "Settings",
    request_body = PaymentMethodPayload,
    params(("id" = Uuid, Path, description = "Payment method id")),
    responses((status = 200, description = "Payment method updated", body = PaymentMethod)),
    security(("api_jwt" = []))
)]
pub async fn update_payment_method(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentMethodPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let method = app_state
        .settings_repo
        .update_payment_method(&app_state.db_pool, id, &payload)
        .await?
        .ok_or(AppError::NotFound("Payment method"))?;
    Ok((StatusCode::OK, Json(method)))
}

#[utoipa::path(
    delete,
    path = "/api/settings/payment-methods/{id}",
    tag = "Settings",
    params(("id" = Uuid, Path, description = "Payment method id")),
    responses((status = 204, description = "Payment method deleted")),
    security(("api_jwt" = []))
)]
pub async fn delete_payment_method(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if !app_state.settings_repo.delete_payment_method(&app_state.db_pool, id).await? {
        return Err(AppError::NotFound("Payment method").into());
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---
// Email provider
// ---

#[utoipa::path(
    get,
    path = "/api/email-settings",
    tag = "Settings",
    responses((status = 200, description = "Email settings without the API key", body = EmailSettingsView)),
    security(("api_jwt" = []))
)]
pub async fn get_email_settings(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let settings = app_state.settings_repo.get_email_settings(&app_state.db_pool).await?;
    Ok((StatusCode::OK, Json(EmailSettingsView::from(settings))))
}

#[utoipa::path(
    post,
    path = "/api/email-settings",
    tag = "Settings",
    request_body = UpdateEmailSettingsPayload,
    responses((status = 200, description = "Email settings saved", body = EmailSettingsView)),
    security(("api_jwt" = []))
)]
pub async fn update_email_settings(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<UpdateEmailSettingsPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let settings = app_state
        .settings_repo
        .upsert_email_settings(&app_state.db_pool, &payload)
        .await?;
    tracing::info!(automated = settings.automated_reminders, "email settings updated");
    Ok((StatusCode::OK, Json(EmailSettingsView::from(settings))))
}

#[utoipa::path(
    post,
    path = "/api/email-settings/template",
    tag = "Settings",
    request_body = EmailTemplatePayload,
    responses((status = 200, description = "Reminder template saved", body = EmailSettingsView)),
    security(("api_jwt" = []))
)]
pub async fn save_email_template(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<EmailTemplatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let settings = app_state
        .settings_repo
        .save_email_template(&app_state.db_pool, &payload.template)
        .await?;
    Ok((StatusCode::OK, Json(EmailSettingsView::from(settings))))
}

#[utoipa::path(
    post,
    path = "/api/email-settings/test",
    tag = "Settings",
    request_body = TestEmailPayload,
    responses(
        (status = 200, description = "Test email accepted by the provider"),
        (status = 502, description = "Email provider failed")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_test_email(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermSettingsWrite>,
    Json(payload): Json<TestEmailPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    app_state.communication_service.send_test_email(&payload.to).await?;
    Ok((StatusCode::OK, Json(json!({ "sent": true }))))
}
