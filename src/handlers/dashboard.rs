// src/handlers/dashboard.rs

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    common::{
        date::{CalendarDate, DateRange},
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::auth::SessionContext,
    models::dashboard::{DashboardOverview, ReportQuery, ReportStats},
};

fn parse_range(query: &ReportQuery) -> Result<DateRange, AppError> {
    query
        .range()
        .ok_or_else(|| AppError::InvalidInput("Provide a valid date range with from <= to.".into()))
}

fn attachment_name(range: &DateRange, extension: &str) -> String {
    format!("attachment; filename=\"collections_{}_{}.{extension}\"", range.from, range.to)
}

// GET /api/dashboard
#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Top cards, 12-month collections and recent payments", body = DashboardOverview),
        (status = 401, description = "Not signed in")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_overview(
    State(app_state): State<AppState>,
    _session: SessionContext,
) -> Result<impl IntoResponse, ApiError> {
    let overview = app_state.dashboard_service.overview(CalendarDate::today()).await?;
    Ok((StatusCode::OK, Json(overview)))
}

// GET /api/reports
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "Reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Collection statistics for the range", body = ReportStats),
        (status = 400, description = "Invalid range")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_report(
    State(app_state): State<AppState>,
    _session: SessionContext,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = app_state.dashboard_service.report(parse_range(&query)?).await?;
    Ok((StatusCode::OK, Json(stats)))
}

// GET /api/reports/export.csv
#[utoipa::path(
    get,
    path = "/api/reports/export.csv",
    tag = "Reports",
    params(ReportQuery),
    responses((status = 200, description = "CSV export", content_type = "text/csv")),
    security(("api_jwt" = []))
)]
pub async fn export_csv(
    State(app_state): State<AppState>,
    _session: SessionContext,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let range = parse_range(&query)?;
    let bytes = app_state.dashboard_service.export_csv(range).await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (header::CONTENT_DISPOSITION, attachment_name(&range, "csv")),
    ];
    Ok((headers, bytes).into_response())
}

// GET /api/reports/export.pdf
#[utoipa::path(
    get,
    path = "/api/reports/export.pdf",
    tag = "Reports",
    params(ReportQuery),
    responses((status = 200, description = "PDF export", content_type = "application/pdf")),
    security(("api_jwt" = []))
)]
pub async fn export_pdf(
    State(app_state): State<AppState>,
    _session: SessionContext,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let range = parse_range(&query)?;
    let bytes = app_state.dashboard_service.export_pdf(range).await?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, attachment_name(&range, "pdf")),
    ];
    Ok((headers, bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversed_range_is_rejected() {
        let query = ReportQuery { from: "2025-12-31".into(), to: "2025-01-01".into() };
        assert!(matches!(parse_range(&query), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn attachment_names_carry_the_range() {
        let query = ReportQuery { from: "2025-01-01".into(), to: "2025-06-30".into() };
        let range = parse_range(&query).unwrap();
        assert_eq!(
            attachment_name(&range, "csv"),
            "attachment; filename=\"collections_2025-01-01_2025-06-30.csv\""
        );
    }
}
