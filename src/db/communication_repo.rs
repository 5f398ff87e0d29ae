// src/db/communication_repo.rs

use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, error::AppError},
    models::communications::{
        CommunicationLogEntry, CommunicationStatus, NewCommunicationLog, NewReminderLog, ReminderLogEntry,
    },
    services::reminder_service::CommunicationSink,
};

const COMMUNICATION_COLUMNS: &str = r#"
    id, channel, kind, member_id, member_email, member_name, message, status,
    date, confirmed_at
"#;

const REMINDER_COLUMNS: &str = r#"
    id, member_id, member_email, reminder_type, amount_minor, invoice_count,
    sent_at, status, error
"#;

#[derive(Clone)]
pub struct CommunicationRepository {
    pool: PgPool,
}

impl CommunicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  COMMUNICATION LOG
    // =========================================================================

    pub async fn list_communications<'e, E>(&self, executor: E) -> Result<Vec<CommunicationLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, CommunicationLogEntry>(&format!(
            "SELECT {COMMUNICATION_COLUMNS} FROM communication_logs ORDER BY date DESC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    pub async fn insert_communication<'e, E>(
        &self,
        executor: E,
        entry: &NewCommunicationLog,
    ) -> Result<CommunicationLogEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, CommunicationLogEntry>(&format!(
            r#"
            INSERT INTO communication_logs (channel, kind, member_id, member_email, member_name, message, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMMUNICATION_COLUMNS}
            "#
        ))
        .bind(entry.channel)
        .bind(&entry.kind)
        .bind(entry.member_id)
        .bind(entry.member_email.as_deref())
        .bind(&entry.member_name)
        .bind(&entry.message)
        .bind(entry.status)
        .fetch_one(executor)
        .await?;

        Ok(row)
    }

    /// Requested -> Delivered. Entries in any other state are left untouched
    /// and `None` is returned.
    pub async fn confirm_delivery<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<CommunicationLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, CommunicationLogEntry>(&format!(
            r#"
            UPDATE communication_logs
            SET status = $2, confirmed_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {COMMUNICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(CommunicationStatus::Delivered)
        .bind(CommunicationStatus::Requested)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    pub async fn find_communication<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<CommunicationLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, CommunicationLogEntry>(&format!(
            "SELECT {COMMUNICATION_COLUMNS} FROM communication_logs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(row)
    }

    // =========================================================================
    //  REMINDER LOG
    // =========================================================================

    pub async fn list_reminders<'e, E>(&self, executor: E) -> Result<Vec<ReminderLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, ReminderLogEntry>(&format!(
            "SELECT {REMINDER_COLUMNS} FROM reminder_logs ORDER BY sent_at DESC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    /// Failed entries not yet retried, optionally narrowed to `ids`.
    pub async fn pending_failures<'e, E>(
        &self,
        executor: E,
        ids: Option<&[Uuid]>,
    ) -> Result<Vec<ReminderLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, ReminderLogEntry>(&format!(
            r#"
            SELECT {REMINDER_COLUMNS} FROM reminder_logs
            WHERE status = 'failed' AND retried_at IS NULL
              AND ($1::UUID[] IS NULL OR id = ANY($1))
            ORDER BY sent_at ASC
            "#
        ))
        .bind(ids)
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    /// Successful reminders whose `sent_at` falls on `day` (UTC).
    pub async fn sent_on<'e, E>(&self, executor: E, day: CalendarDate) -> Result<Vec<ReminderLogEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entries = sqlx::query_as::<_, ReminderLogEntry>(&format!(
            r#"
            SELECT {REMINDER_COLUMNS} FROM reminder_logs
            WHERE status = 'sent' AND (sent_at AT TIME ZONE 'UTC')::DATE = $1
            "#
        ))
        .bind(day.naive())
        .fetch_all(executor)
        .await?;

        Ok(entries)
    }

    pub async fn mark_retried<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE reminder_logs SET retried_at = NOW() WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn insert_reminder<'e, E>(&self, executor: E, entry: &NewReminderLog) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO reminder_logs (member_id, member_email, reminder_type, amount_minor, invoice_count, status, error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.member_id)
        .bind(&entry.member_email)
        .bind(entry.reminder_type)
        .bind(entry.amount.minor_units())
        .bind(entry.invoice_count)
        .bind(entry.status)
        .bind(entry.error.as_deref())
        .execute(executor)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CommunicationSink for CommunicationRepository {
    async fn log_communication(&self, entry: NewCommunicationLog) -> Result<CommunicationLogEntry, AppError> {
        self.insert_communication(&self.pool, &entry).await
    }

    async fn log_reminder(&self, entry: NewReminderLog) -> Result<(), AppError> {
        self.insert_reminder(&self.pool, &entry).await
    }

    async fn reminders_sent_on(&self, day: CalendarDate) -> Result<Vec<ReminderLogEntry>, AppError> {
        self.sent_on(&self.pool, day).await
    }
}
