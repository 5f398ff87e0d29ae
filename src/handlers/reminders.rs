// src/handlers/reminders.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::SessionContext,
        rbac::{PermRemindersSend, RequirePermission},
    },
    models::communications::{
        BulkDispatchReport, CommunicationLogEntry, DispatchOutcome, ReminderLogEntry, RetryReport,
        RetryRemindersPayload, SendReminderPayload,
    },
};

enum Target {
    One(Uuid),
    All,
}

fn target(payload: &SendReminderPayload) -> Result<Target, AppError> {
    match (payload.send_to_all, payload.member_id) {
        (true, _) => Ok(Target::All),
        (false, Some(id)) => Ok(Target::One(id)),
        (false, None) => Err(AppError::InvalidInput("Provide a memberId or set sendToAll.".into())),
    }
}

#[utoipa::path(
    post,
    path = "/api/reminders/send",
    tag = "Reminders",
    request_body = SendReminderPayload,
    responses(
        (status = 200, description = "Single dispatch outcome or bulk report", body = BulkDispatchReport),
        (status = 422, description = "Nothing outstanding to remind about"),
        (status = 502, description = "Email provider failed")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_email_reminders(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRemindersSend>,
    Json(payload): Json<SendReminderPayload>,
) -> Result<Response, ApiError> {
    let service = &app_state.communication_service;
    let response = match target(&payload)? {
        Target::One(id) => (StatusCode::OK, Json(service.email_member(id).await?)).into_response(),
        Target::All => (StatusCode::OK, Json(service.email_all().await?)).into_response(),
    };
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/reminders/whatsapp",
    tag = "Reminders",
    request_body = SendReminderPayload,
    responses(
        (status = 200, description = "Click-to-chat links, logged as Requested", body = DispatchOutcome),
        (status = 422, description = "Nothing outstanding to remind about")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_whatsapp_reminders(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRemindersSend>,
    Json(payload): Json<SendReminderPayload>,
) -> Result<Response, ApiError> {
    let service = &app_state.communication_service;
    let response = match target(&payload)? {
        Target::One(id) => (StatusCode::OK, Json(service.whatsapp_member(id).await?)).into_response(),
        Target::All => (StatusCode::OK, Json(service.whatsapp_all().await?)).into_response(),
    };
    Ok(response)
}

#[utoipa::path(
    post,
    path = "/api/reminders/retry",
    tag = "Reminders",
    request_body = RetryRemindersPayload,
    responses((status = 200, description = "Retry summary", body = RetryReport)),
    security(("api_jwt" = []))
)]
pub async fn retry_failed_reminders(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRemindersSend>,
    Json(payload): Json<RetryRemindersPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .communication_service
        .retry_failed(payload.ids.as_deref())
        .await?;
    Ok((StatusCode::OK, Json(report)))
}

#[utoipa::path(
    get,
    path = "/api/reminders/logs",
    tag = "Reminders",
    responses((status = 200, description = "Reminder log, newest first", body = Vec<ReminderLogEntry>)),
    security(("api_jwt" = []))
)]
pub async fn list_reminder_logs(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let logs = app_state.communication_service.list_reminders().await?;
    Ok((StatusCode::OK, Json(logs)))
}

#[utoipa::path(
    get,
    path = "/api/communications",
    tag = "Communications",
    responses((status = 200, description = "Communication log, newest first", body = Vec<CommunicationLogEntry>)),
    security(("api_jwt" = []))
)]
pub async fn list_communications(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state.communication_service.list_communications().await?;
    Ok((StatusCode::OK, Json(entries)))
}

#[utoipa::path(
    put,
    path = "/api/communications/{id}/confirm",
    tag = "Communications",
    params(("id" = Uuid, Path, description = "Communication log id")),
    responses(
        (status = 200, description = "Marked Delivered", body = CommunicationLogEntry),
        (status = 400, description = "Entry is not awaiting confirmation")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_communication(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRemindersSend>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let entry = app_state.communication_service.confirm_communication(id).await?;
    Ok((StatusCode::OK, Json(entry)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_to_all_wins_over_member_id() {
        let payload = SendReminderPayload { member_id: Some(Uuid::from_u128(1)), send_to_all: true };
        assert!(matches!(target(&payload), Ok(Target::All)));
    }

    #[test]
    fn target_is_required() {
        let payload = SendReminderPayload { member_id: None, send_to_all: false };
        assert!(matches!(target(&payload), Err(AppError::InvalidInput(_))));
    }
}
