// src/db/member_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, error::AppError, money::Money},
    models::members::{CreateMemberPayload, Member, MemberStatus, SubscriptionType, UpdateMemberPayload},
};

const MEMBER_COLUMNS: &str = r#"
    id, name, email, phone, status, balance_minor, subscription_type,
    next_due, last_payment, created_at
"#;

fn map_unique_email(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some("members_email_key") {
            return AppError::EmailAlreadyExists;
        }
    }
    e.into()
}

#[derive(Clone)]
pub struct MemberRepository {
    pool: PgPool,
}

impl MemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn list<'e, E>(&self, executor: E) -> Result<Vec<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let members = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY name ASC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(members)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(member)
    }

    pub async fn create<'e, E>(&self, executor: E, input: &CreateMemberPayload) -> Result<Member, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            INSERT INTO members (name, email, phone, status, subscription_type, next_due)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(input.name.trim())
        .bind(input.email.trim())
        .bind(input.phone.as_deref())
        .bind(input.status)
        .bind(input.subscription_type)
        .bind(input.next_due)
        .fetch_one(executor)
        .await
        .map_err(map_unique_email)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &UpdateMemberPayload,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Member>(&format!(
            r#"
            UPDATE members
            SET name = $2, email = $3, phone = $4, status = $5,
                subscription_type = $6, next_due = $7
            WHERE id = $1
            RETURNING {MEMBER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(input.email.trim())
        .bind(input.phone.as_deref())
        .bind(input.status)
        .bind(input.subscription_type)
        .bind(input.next_due)
        .fetch_optional(executor)
        .await
        .map_err(map_unique_email)
    }

    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: MemberStatus,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET status = $2 WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        Ok(member)
    }

    pub async fn set_subscription<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        subscription: SubscriptionType,
    ) -> Result<Option<Member>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let member = sqlx::query_as::<_, Member>(&format!(
            "UPDATE members SET subscription_type = $2 WHERE id = $1 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(id)
        .bind(subscription)
        .fetch_optional(executor)
        .await?;

        Ok(member)
    }

    /// Writes back the cached balance.
    pub async fn set_balance<'e, E>(&self, executor: E, id: Uuid, balance: Money) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE members SET balance_minor = $2 WHERE id = $1")
            .bind(id)
            .bind(balance.minor_units())
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn set_last_payment<'e, E>(&self, executor: E, id: Uuid, on: CalendarDate) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE members SET last_payment = $2 WHERE id = $1")
            .bind(id)
            .bind(on)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
