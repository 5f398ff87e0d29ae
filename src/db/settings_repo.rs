// src/db/settings_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::settings::{
        EmailSettings, OrganizationInfo, PaymentMethod, PaymentMethodPayload, UpdateEmailSettingsPayload,
        UpdateOrganizationPayload,
    },
};

const EMAIL_COLUMNS: &str = r#"
    api_key, from_address, from_name, reminder_subject, reminder_template,
    automated_reminders, upcoming_window_days, updated_at
"#;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  ORGANIZATION
    // =========================================================================

    /// Defaults until the row is first saved.
    pub async fn get_organization<'e, E>(&self, executor: E) -> Result<OrganizationInfo, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let info = sqlx::query_as::<_, OrganizationInfo>(
            "SELECT name, address, phone, email, website, updated_at FROM organization_info WHERE id = 1",
        )
        .fetch_optional(executor)
        .await?;

        Ok(info.unwrap_or_default())
    }

    pub async fn upsert_organization<'e, E>(
        &self,
        executor: E,
        input: &UpdateOrganizationPayload,
    ) -> Result<OrganizationInfo, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let info = sqlx::query_as::<_, OrganizationInfo>(
            r#"
            INSERT INTO organization_info (id, name, address, phone, email, website)
            VALUES (1, $1, $2, $3, $4, $5)
            ON CONFLICT (id)
            DO UPDATE SET
                name = EXCLUDED.name,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                website = EXCLUDED.website,
                updated_at = NOW()
            RETURNING name, address, phone, email, website, updated_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.address.as_deref())
        .bind(input.phone.as_deref())
        .bind(input.email.as_deref())
        .bind(input.website.as_deref())
        .fetch_one(executor)
        .await?;

        Ok(info)
    }

    // =========================================================================
    //  PAYMENT METHODS
    // =========================================================================

    pub async fn list_payment_methods<'e, E>(&self, executor: E) -> Result<Vec<PaymentMethod>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let methods = sqlx::query_as::<_, PaymentMethod>(
            "SELECT id, name, description, details, active, created_at FROM payment_methods ORDER BY name ASC",
        )
        .fetch_all(executor)
        .await?;

        Ok(methods)
    }

    pub async fn create_payment_method<'e, E>(
        &self,
        executor: E,
        input: &PaymentMethodPayload,
    ) -> Result<PaymentMethod, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let method = sqlx::query_as::<_, PaymentMethod>(
            r#"
            INSERT INTO payment_methods (name, description, details, active)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, details, active, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.details.as_deref())
        .bind(input.active)
        .fetch_one(executor)
        .await?;

        Ok(method)
    }

    pub async fn update_payment_method<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &PaymentMethodPayload,
    ) -> Result<Option<PaymentMethod>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let method = sqlx::query_as::<_, PaymentMethod>(
            r#"
            UPDATE payment_methods
            SET name = $2, description = $3, details = $4, active = $5
            WHERE id = $1
            RETURNING id, name, description, details, active, created_at
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(input.description.as_deref())
        .bind(input.details.as_deref())
        .bind(input.active)
        .fetch_optional(executor)
        .await?;

        Ok(method)
    }

    pub async fn delete_payment_method<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM payment_methods WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  EMAIL SETTINGS
    // =========================================================================

    pub async fn get_email_settings<'e, E>(&self, executor: E) -> Result<EmailSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, EmailSettings>(&format!(
            "SELECT {EMAIL_COLUMNS} FROM email_settings WHERE id = 1"
        ))
        .fetch_optional(executor)
        .await?;

        Ok(settings.unwrap_or_default())
    }

    /// An empty or missing API key keeps the stored one.
    pub async fn upsert_email_settings<'e, E>(
        &self,
        executor: E,
        input: &UpdateEmailSettingsPayload,
    ) -> Result<EmailSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let api_key = input.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty());

        let settings = sqlx::query_as::<_, EmailSettings>(&format!(
            r#"
            INSERT INTO email_settings (id, api_key, from_address, from_name, reminder_subject, automated_reminders, upcoming_window_days)
            VALUES (1, $1, $2, $3, $4, $5, $6)
            ON CONFLICT (id)
            DO UPDATE SET
                api_key = COALESCE(EXCLUDED.api_key, email_settings.api_key),
                from_address = EXCLUDED.from_address,
                from_name = EXCLUDED.from_name,
                reminder_subject = EXCLUDED.reminder_subject,
                automated_reminders = EXCLUDED.automated_reminders,
                upcoming_window_days = EXCLUDED.upcoming_window_days,
                updated_at = NOW()
            RETURNING {EMAIL_COLUMNS}
            "#
        ))
        .bind(api_key)
        .bind(input.from_address.as_deref())
        .bind(input.from_name.as_deref())
        .bind(input.reminder_subject.trim())
        .bind(input.automated_reminders)
        .bind(input.upcoming_window_days)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }

    pub async fn save_email_template<'e, E>(&self, executor: E, template: &str) -> Result<EmailSettings, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let settings = sqlx::query_as::<_, EmailSettings>(&format!(
            r#"
            INSERT INTO email_settings (id, reminder_template)
            VALUES (1, $1)
            ON CONFLICT (id)
            DO UPDATE SET reminder_template = EXCLUDED.reminder_template, updated_at = NOW()
            RETURNING {EMAIL_COLUMNS}
            "#
        ))
        .bind(template)
        .fetch_one(executor)
        .await?;

        Ok(settings)
    }
}
