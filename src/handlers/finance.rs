// src/handlers/finance.rs

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
        rbac::{PermBillingWrite, PermPaymentsApprove, PermRemindersSend, RequirePermission},
    },
    models::{
        communications::{DispatchOutcome, InvoiceReminderPayload},
        finance::{
            CreateInvoicePayload, CreatePaymentPayload, Donation, DonationPayload, Invoice, InvoiceView,
            MarkInvoicePaidPayload, Payment, PaymentView, RejectPaymentPayload, UpdateInvoicePayload,
        },
    },
};

// ---
// Invoices
// ---

#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    responses((status = 200, description = "Invoices with reconciled status", body = Vec<InvoiceView>)),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let invoices = app_state.finance_service.list_invoices().await?;
    Ok((StatusCode::OK, Json(invoices)))
}

#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = String, Path, description = "Invoice id, e.g. INV-2025-004")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceView),
        (status = 404, description = "Invoice not found")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    _session: SessionContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let invoice = app_state.finance_service.get_invoice(&id).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = CreateInvoicePayload,
    responses((status = 201, description = "Invoice created", body = Invoice)),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let invoice = app_state.finance_service.create_invoice(&payload).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    request_body = UpdateInvoicePayload,
    params(("id" = String, Path, description = "Invoice id")),
    responses((status = 200, description = "Invoice updated", body = Invoice)),
    security(("api_jwt" = []))
)]
pub async fn update_invoice(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBillingWrite>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateInvoicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let invoice = app_state.finance_service.update_invoice(&id, &payload).await?;
    Ok((StatusCode::OK, Json(invoice)))
}

#[utoipa::path(
    delete,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 204, description = "Invoice deleted"),
        (status = 409, description = "Paid invoices cannot be deleted")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_invoice(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBillingWrite>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.finance_service.delete_invoice(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/invoices/{id}/mark-paid",
    tag = "Invoices",
    request_body = MarkInvoicePaidPayload,
    params(("id" = String, Path, description = "Invoice id")),
    responses((status = 200, description = "Invoice settled", body = Invoice)),
    security(("api_jwt" = []))
)]
pub async fn mark_invoice_paid(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermPaymentsApprove>,
    Path(id): Path<String>,
    Json(payload): Json<MarkInvoicePaidPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let invoice = app_state
        .finance_service
        .mark_invoice_paid(&id, &payload, &guard.session().admin_name)
        .await?;
    Ok((StatusCode::OK, Json(invoice)))
}

#[utoipa::path(
    post,
    path = "/api/invoices/send-reminder",
    tag = "Invoices",
    request_body = InvoiceReminderPayload,
    responses(
        (status = 200, description = "Reminder emailed to the invoice's member", body = DispatchOutcome),
        (status = 422, description = "Member has nothing outstanding"),
        (status = 502, description = "Email provider failed")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_invoice_reminder(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermRemindersSend>,
    Json(payload): Json<InvoiceReminderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = app_state
        .communication_service
        .email_invoice_member(payload.invoice_id.trim())
        .await?;
    Ok((StatusCode::OK, Json(outcome)))
}

// ---
// Payments
// ---

#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "Payments",
    responses((status = 200, description = "All payments", body = Vec<PaymentView>)),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let payments = app_state.finance_service.list_payments().await?;
    Ok((StatusCode::OK, Json(payments)))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    tag = "Payments",
    request_body = CreatePaymentPayload,
    responses((status = 201, description = "Payment submitted for review", body = Payment)),
    security(("api_jwt" = []))
)]
pub async fn submit_payment(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPaymentsApprove>,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let payment = app_state.finance_service.submit_payment(&payload).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}/approve",
    tag = "Payments",
    params(("id" = Uuid, Path, description = "Payment id")),
    responses((status = 200, description = "Payment approved", body = Payment)),
    security(("api_jwt" = []))
)]
pub async fn approve_payment(
    State(app_state): State<AppState>,
    guard: RequirePermission<PermPaymentsApprove>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let payment = app_state
        .finance_service
        .approve_payment(id, &guard.session().admin_name)
        .await?;
    Ok((StatusCode::OK, Json(payment)))
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}/reject",
    tag = "Payments",
    request_body = RejectPaymentPayload,
    params(("id" = Uuid, Path, description = "Payment id")),
    responses((status = 200, description = "Payment rejected", body = Payment)),
    security(("api_jwt" = []))
)]
pub async fn reject_payment(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermPaymentsApprove>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let payment = app_state.finance_service.reject_payment(id, payload.reason.trim()).await?;
    Ok((StatusCode::OK, Json(payment)))
}

// ---
// Donations
// ---

#[utoipa::path(
    get,
    path = "/api/donations",
    tag = "Donations",
    responses((status = 200, description = "All donations", body = Vec<Donation>)),
    security(("api_jwt" = []))
)]
pub async fn list_donations(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let donations = app_state.finance_service.list_donations().await?;
    Ok((StatusCode::OK, Json(donations)))
}

#[utoipa::path(
    post,
    path = "/api/donations",
    tag = "Donations",
    request_body = DonationPayload,
    responses((status = 201, description = "Donation recorded", body = Donation)),
    security(("api_jwt" = []))
)]
pub async fn create_donation(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBillingWrite>,
    Json(payload): Json<DonationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let donation = app_state.finance_service.create_donation(&payload).await?;
    Ok((StatusCode::CREATED, Json(donation)))
}

#[utoipa::path(
    put,
    path = "/api/donations/{id}",
    tag = "Donations",
    request_body = DonationPayload,
    params(("id" = Uuid, Path, description = "Donation id")),
    responses((status = 200, description = "Donation updated", body = Donation)),
    security(("api_jwt" = []))
)]
pub async fn update_donation(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBillingWrite>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DonationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let donation = app_state.finance_service.update_donation(id, &payload).await?;
    Ok((StatusCode::OK, Json(donation)))
}

#[utoipa::path(
    delete,
    path = "/api/donations/{id}",
    tag = "Donations",
    params(("id" = Uuid, Path, description = "Donation id")),
    responses((status = 204, description = "Donation deleted")),
    security(("api_jwt" = []))
)]
pub async fn delete_donation(
    State(app_state): State<AppState>,
    _guard: RequirePermission<PermBillingWrite>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state.finance_service.delete_donation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
