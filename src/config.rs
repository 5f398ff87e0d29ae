// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{AdminRepository, CommunicationRepository, FinanceRepository, MemberRepository, SettingsRepository},
    services::{
        auth::AuthService,
        communication_service::CommunicationService,
        dashboard_service::DashboardService,
        email::{EmailTransport, HttpEmailTransport},
        finance_service::FinanceService,
        member_service::MemberService,
        reminder_service::{CommunicationSink, ReminderCoordinator},
    },
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub public_base_url: String,
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub email_from: Option<String>,
    pub whatsapp_stagger_ms: u64,
    pub scheduler_enabled: bool,
    pub scheduler_interval_secs: u64,
    pub pdf_font_dir: String,
    pub bootstrap_owner_email: Option<String>,
    pub bootstrap_owner_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_or("HOST", "0.0.0.0");
        let port = env_parse_or("PORT", 3000);

        Ok(Self {
            database_url: env_required("DATABASE_URL")?,
            jwt_secret: env_required("JWT_SECRET")?,
            public_base_url: env_opt("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            host,
            port,
            upload_dir: env_or("UPLOAD_DIR", "./uploads"),
            email_api_url: env_or("EMAIL_API_URL", "https://api.resend.com/emails"),
            email_api_key: env_opt("EMAIL_API_KEY"),
            email_from: env_opt("EMAIL_FROM"),
            whatsapp_stagger_ms: env_parse_or("WHATSAPP_STAGGER_MS", 1000),
            scheduler_enabled: env_parse_bool_or("REMINDER_SCHEDULER_ENABLED", false),
            scheduler_interval_secs: env_parse_or("REMINDER_SCHEDULER_INTERVAL_SECS", 3600).max(60),
            pdf_font_dir: env_or("PDF_FONT_DIR", "./fonts"),
            bootstrap_owner_email: env_opt("BOOTSTRAP_OWNER_EMAIL"),
            bootstrap_owner_password: env_opt("BOOTSTRAP_OWNER_PASSWORD"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_required(key: &str) -> anyhow::Result<String> {
    env_opt(key).with_context(|| format!("{key} must be set"))
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    env_opt(key)
        .and_then(|raw| raw.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_parse_bool_or(key: &str, default: bool) -> bool {
    parse_bool(env_opt(key).as_deref()).unwrap_or(default)
}

fn parse_bool(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => Some(true),
        Some("0" | "false" | "no" | "off") => Some(false),
        _ => None,
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub settings_repo: SettingsRepository,
    pub auth_service: AuthService,
    pub member_service: MemberService,
    pub finance_service: FinanceService,
    pub dashboard_service: DashboardService,
    pub communication_service: CommunicationService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("could not connect to the database")?;

        tracing::info!("database connection established");

        let admin_repo = AdminRepository::new(db_pool.clone());
        let member_repo = MemberRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let communication_repo = CommunicationRepository::new(db_pool.clone());

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("could not build the HTTP client")?;
        let transport: Arc<dyn EmailTransport> = Arc::new(HttpEmailTransport::new(
            http_client,
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        ));
        let sink: Arc<dyn CommunicationSink> = Arc::new(communication_repo.clone());
        let coordinator = ReminderCoordinator::new(
            transport.clone(),
            sink,
            Duration::from_millis(config.whatsapp_stagger_ms),
        );

        let auth_service = AuthService::new(admin_repo, config.jwt_secret.clone());
        let member_service = MemberService::new(member_repo.clone(), finance_repo.clone());
        let finance_service = FinanceService::new(finance_repo.clone(), member_repo.clone());
        let dashboard_service = DashboardService::new(
            member_repo.clone(),
            finance_repo.clone(),
            settings_repo.clone(),
            config.pdf_font_dir.clone(),
        );
        let communication_service = CommunicationService::new(
            member_repo,
            finance_repo,
            settings_repo.clone(),
            communication_repo,
            coordinator,
            transport,
        );

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            settings_repo,
            auth_service,
            member_service,
            finance_service,
            dashboard_service,
            communication_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_flags_accept_common_spellings() {
        assert_eq!(parse_bool(Some("YES")), Some(true));
        assert_eq!(parse_bool(Some("off")), Some(false));
        assert_eq!(parse_bool(Some("maybe")), None);
        assert_eq!(parse_bool(None), None);
    }
}
