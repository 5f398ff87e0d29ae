// src/main.rs

use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let app_state = AppState::new(config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("database migrations failed")?;
    tracing::info!("database migrations applied");

    if let (Some(email), Some(password)) = (
        app_state.config.bootstrap_owner_email.as_deref(),
        app_state.config.bootstrap_owner_password.as_deref(),
    ) {
        app_state.auth_service.bootstrap_owner(email, password).await?;
    }

    if app_state.config.scheduler_enabled {
        tokio::spawn(services::scheduler::run_reminder_scheduler(
            app_state.finance_service.clone(),
            app_state.communication_service.clone(),
            Duration::from_secs(app_state.config.scheduler_interval_secs),
        ));
    }

    let auth_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::get_me));

    let admin_routes = Router::new()
        .route("/", get(handlers::auth::list_admins).post(handlers::auth::create_admin))
        .route("/{id}", put(handlers::auth::update_admin).delete(handlers::auth::delete_admin));

    let member_routes = Router::new()
        .route("/", get(handlers::members::list_members).post(handlers::members::create_member))
        .route("/sync-balances", post(handlers::members::sync_balances))
        .route(
            "/{id}",
            get(handlers::members::get_member)
                .put(handlers::members::update_member)
                .delete(handlers::members::delete_member),
        )
        .route("/{id}/approve", put(handlers::members::approve_member))
        .route("/{id}/subscription", put(handlers::members::change_subscription));

    let invoice_routes = Router::new()
        .route("/", get(handlers::finance::list_invoices).post(handlers::finance::create_invoice))
        .route("/send-reminder", post(handlers::finance::send_invoice_reminder))
        .route(
            "/{id}",
            get(handlers::finance::get_invoice)
                .put(handlers::finance::update_invoice)
                .delete(handlers::finance::delete_invoice),
        )
        .route("/{id}/mark-paid", put(handlers::finance::mark_invoice_paid));

    let payment_routes = Router::new()
        .route("/", get(handlers::finance::list_payments).post(handlers::finance::submit_payment))
        .route("/{id}/approve", put(handlers::finance::approve_payment))
        .route("/{id}/reject", put(handlers::finance::reject_payment));

    let donation_routes = Router::new()
        .route("/", get(handlers::finance::list_donations).post(handlers::finance::create_donation))
        .route(
            "/{id}",
            put(handlers::finance::update_donation).delete(handlers::finance::delete_donation),
        );

    let reminder_routes = Router::new()
        .route("/send", post(handlers::reminders::send_email_reminders))
        .route("/whatsapp", post(handlers::reminders::send_whatsapp_reminders))
        .route("/retry", post(handlers::reminders::retry_failed_reminders))
        .route("/logs", get(handlers::reminders::list_reminder_logs));

    let communication_routes = Router::new()
        .route("/", get(handlers::reminders::list_communications))
        .route("/{id}/confirm", put(handlers::reminders::confirm_communication));

    let report_routes = Router::new()
        .route("/", get(handlers::dashboard::get_report))
        .route("/export.csv", get(handlers::dashboard::export_csv))
        .route("/export.pdf", get(handlers::dashboard::export_pdf));

    let settings_routes = Router::new()
        .route(
            "/organization",
            get(handlers::settings::get_organization).put(handlers::settings::update_organization),
        )
        .route(
            "/payment-methods",
            get(handlers::settings::list_payment_methods).post(handlers::settings::create_payment_method),
        )
        .route(
            "/payment-methods/{id}",
            put(handlers::settings::update_payment_method).delete(handlers::settings::delete_payment_method),
        );

    let email_settings_routes = Router::new()
        .route(
            "/",
            get(handlers::settings::get_email_settings).post(handlers::settings::update_email_settings),
        )
        .route("/template", post(handlers::settings::save_email_template))
        .route("/test", post(handlers::settings::send_test_email));

    let upload_routes = Router::new()
        .route("/screenshot", post(handlers::uploads::upload_screenshot))
        .layer(DefaultBodyLimit::max(handlers::uploads::MAX_UPLOAD_BYTES + 64 * 1024));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/dashboard", get(handlers::dashboard::get_overview))
        .nest("/api/auth", auth_routes)
        .nest("/api/admins", admin_routes)
        .nest("/api/members", member_routes)
        .nest("/api/invoices", invoice_routes)
        .nest("/api/payments", payment_routes)
        .nest("/api/donations", donation_routes)
        .nest("/api/reminders", reminder_routes)
        .nest("/api/communications", communication_routes)
        .nest("/api/reports", report_routes)
        .nest("/api/settings", settings_routes)
        .nest("/api/email-settings", email_settings_routes)
        .nest("/api/upload", upload_routes)
        .route("/uploads/{name}", get(handlers::uploads::serve_upload))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state.clone());

    let addr = app_state.config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(address = %listener.local_addr()?, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not listen for the shutdown signal");
    }
}
