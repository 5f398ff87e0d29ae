// src/handlers/auth.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::SessionContext,
        rbac::{PermOwner, RequirePermission},
    },
    models::auth::{AdminUser, AuthResponse, CreateAdminPayload, LoginPayload, UpdateAdminPayload},
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let response = app_state.auth_service.login(&payload.email, &payload.password).await?;
    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The signed-in admin", body = AdminUser),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let admin = app_state.auth_service.get_admin(session.admin_id).await?;
    Ok((StatusCode::OK, Json(admin)))
}

// ---
// Admin accounts (Owner only)
// ---

#[utoipa::path(
    get,
    path = "/api/admins",
    tag = "Admins",
    responses((status = 200, description = "Admin accounts", body = Vec<AdminUser>)),
    security(("api_jwt" = []))
)]
pub async fn list_admins(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermOwner>,
) -> Result<impl IntoResponse, ApiError> {
    let admins = app_state.auth_service.list_admins().await?;
    Ok((StatusCode::OK, Json(admins)))
}

#[utoipa::path(
    post,
    path = "/api/admins",
    tag = "Admins",
    request_body = CreateAdminPayload,
    responses(
        (status = 201, description = "Admin created", body = AdminUser),
        (status = 409, description = "Email already in use")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_admin(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermOwner>,
    Json(payload): Json<CreateAdminPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let admin = app_state.auth_service.create_admin(&payload).await?;
    Ok((StatusCode::CREATED, Json(admin)))
}

#[utoipa::path(
    put,
    path = "/api/admins/{id}",
    tag = "Admins",
    request_body = UpdateAdminPayload,
    params(("id" = Uuid, Path, description = "Admin id")),
    responses((status = 200, description = "Admin updated", body = AdminUser)),
    security(("api_jwt" = []))
)]
pub async fn update_admin(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermOwner>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdminPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let admin = app_state.auth_service.update_admin(id, &payload).await?;
    Ok((StatusCode::OK, Json(admin)))
}

#[utoipa::path(
    delete,
    path = "/api/admins/{id}",
    tag = "Admins",
    params(("id" = Uuid, Path, description = "Admin id")),
    responses((status = 204, description = "Admin deleted")),
    security(("api_jwt" = []))
)]
pub async fn delete_admin(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermOwner>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.auth_service.delete_admin(id, guard.session().admin_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
