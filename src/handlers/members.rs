// src/handlers/members.rs

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
        rbac::{PermMembersWrite, PermOwner, RequirePermission},
    },
    models::members::{
        ChangeSubscriptionPayload, CreateMemberPayload, Member, MemberDetail, UpdateMemberPayload,
    },
};

#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Members",
    responses((status = 200, description = "All members", body = Vec<Member>)),
    security(("api_jwt" = []))
)]
pub async fn list_members(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let members = app_state.member_service.list().await?;
    Ok((StatusCode::OK, Json(members)))
}

#[utoipa::path(
    get,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 200, description = "Member with invoices and payments", body = MemberDetail),
        (status = 404, description = "Member not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_member(
    State(app_state): State<AppState>,
    _session: SessionContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state.member_service.detail(id).await?;
    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Members",
    request_body = CreateMemberPayload,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 409, description = "Email already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_member(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMembersWrite>,
    Json(payload): Json<CreateMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let member = app_state.member_service.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

#[utoipa::path(
    put,
    path = "/api/members/{id}",
    tag = "Members",
    request_body = UpdateMemberPayload,
    params(("id" = Uuid, Path, description = "Member id")),
    responses((status = 200, description = "Member updated", body = Member)),
    security(("api_jwt" = []))
)]
pub async fn update_member(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMembersWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMemberPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let member = app_state.member_service.update(id, &payload).await?;
    Ok((StatusCode::OK, Json(member)))
}

#[utoipa::path(
    put,
    path = "/api/members/{id}/approve",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    responses((status = 200, description = "Member is active", body = Member)),
    security(("api_jwt" = []))
)]
pub async fn approve_member(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMembersWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let member = app_state.member_service.approve(id).await?;
    Ok((StatusCode::OK, Json(member)))
}

#[utoipa::path(
    put,
    path = "/api/members/{id}/subscription",
    tag = "Members",
    request_body = ChangeSubscriptionPayload,
    params(("id" = Uuid, Path, description = "Member id")),
    responses((status = 200, description = "Subscription changed", body = Member)),
    security(("api_jwt" = []))
)]
pub async fn change_subscription(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMembersWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeSubscriptionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let member = app_state
        .member_service
        .change_subscription(id, payload.subscription_type)
        .await?;
    Ok((StatusCode::OK, Json(member)))
}

#[utoipa::path(
    delete,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = Uuid, Path, description = "Member id")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 403, description = "Only owners can delete members")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_member(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermOwner>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.member_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/members/sync-balances",
    tag = "Members",
    responses((status = 200, description = "Number of balances rewritten")),
    security(("api_jwt" = []))
)]
pub async fn sync_balances(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermMembersWrite>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state.finance_service.resync_all_balances().await?;
    Ok((StatusCode::OK, Json(json!({ "updated": updated }))))
}
