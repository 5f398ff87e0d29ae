// src/db/finance_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, error::AppError, money::Money},
    models::{
        finance::{
            Donation, DonationPayload, Invoice, InvoiceStatus, MarkInvoicePaidPayload, NewPayment, Payment,
            PaymentStatus, UpdateInvoicePayload,
        },
        members::Member,
    },
};

const INVOICE_COLUMNS: &str = r#"
    id, member_id, member_name, member_email, period, amount_minor, status,
    due, method, reference, notes, screenshot, created_at
"#;

const PAYMENT_COLUMNS: &str = r#"
    id, member_id, member, invoice_id, amount_minor, method, paid_to_admin,
    paid_to_admin_name, status, date, screenshot, reference, approved_by,
    approved_at, rejection_reason, created_at
"#;

const DONATION_COLUMNS: &str = r#"
    id, donor_name, is_member, member_id, amount_minor, method, date,
    reference, screenshot, notes, created_at
"#;

#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    //  INVOICES
    // =========================================================================

    pub async fn list_invoices<'e, E>(&self, executor: E) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(invoices)
    }

    pub async fn find_invoice<'e, E>(&self, executor: E, id: &str) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(invoice)
    }

    /// Ids already issued for `year`, for sequence generation.
    pub async fn invoice_ids_for_year<'e, E>(&self, executor: E, year: i32) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM invoices WHERE id LIKE $1")
            .bind(format!("INV-{year}-%"))
            .fetch_all(executor)
            .await?;

        Ok(ids)
    }

    /// Serializes id generation until the surrounding transaction ends.
    pub async fn lock_invoice_sequence<'e, E>(&self, executor: E) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext('invoice_sequence'))")
            .execute(executor)
            .await?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_invoice<'e, E>(
        &self,
        executor: E,
        id: &str,
        member: &Member,
        period: &str,
        amount: Money,
        due: Option<CalendarDate>,
        notes: Option<&str>,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (id, member_id, member_name, member_email, period, amount_minor, status, due, notes)
            VALUES ($1, $2, $3, $4, $5, $6, 'Unpaid', $7, $8)
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(member.id)
        .bind(&member.name)
        .bind(&member.email)
        .bind(period)
        .bind(amount.minor_units())
        .bind(due)
        .bind(notes)
        .fetch_one(executor)
        .await?;

        Ok(invoice)
    }

    pub async fn update_invoice<'e, E>(
        &self,
        executor: E,
        id: &str,
        input: &UpdateInvoicePayload,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET period = $2, amount_minor = $3, status = $4, due = $5, notes = $6
            WHERE id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.period)
        .bind(input.amount.minor_units())
        .bind(input.status)
        .bind(input.due)
        .bind(input.notes.as_deref())
        .fetch_optional(executor)
        .await?;

        Ok(invoice)
    }

    pub async fn mark_invoice_paid<'e, E>(
        &self,
        executor: E,
        id: &str,
        input: &MarkInvoicePaidPayload,
    ) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET status = 'Paid', method = $2, reference = $3, screenshot = COALESCE($4, screenshot)
            WHERE id = $1
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&input.method)
        .bind(input.reference.as_deref())
        .bind(input.screenshot.as_deref())
        .fetch_optional(executor)
        .await?;

        Ok(invoice)
    }

    pub async fn set_invoice_status<'e, E>(&self, executor: E, ids: &[String], status: InvoiceStatus) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("UPDATE invoices SET status = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(status)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_invoices<'e, E>(&self, executor: E, ids: &[String]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("DELETE FROM invoices WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    /// Clears the email on a member's invoices ahead of the member row going away.
    pub async fn detach_member_invoices<'e, E>(&self, executor: E, member_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE invoices SET member_email = NULL WHERE member_id = $1")
            .bind(member_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_invoice<'e, E>(&self, executor: E, id: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  PAYMENTS
    // =========================================================================

    pub async fn list_payments<'e, E>(&self, executor: E) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY date DESC NULLS LAST, created_at DESC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    pub async fn find_payment<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    pub async fn insert_payment<'e, E>(&self, executor: E, input: &NewPayment) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (
                member_id, member, invoice_id, amount_minor, method,
                paid_to_admin, paid_to_admin_name, status, date,
                screenshot, reference, approved_by, approved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    CASE WHEN $12::TEXT IS NULL THEN NULL ELSE NOW() END)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(input.member_id)
        .bind(&input.member)
        .bind(input.invoice_id.as_deref())
        .bind(input.amount.minor_units())
        .bind(input.method.as_deref())
        .bind(input.paid_to_admin)
        .bind(input.paid_to_admin_name.as_deref())
        .bind(input.status)
        .bind(input.date)
        .bind(input.screenshot.as_deref())
        .bind(input.reference.as_deref())
        .bind(input.approved_by.as_deref())
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    /// Pending -> Completed. Any other state is left untouched and `None` is
    /// returned.
    pub async fn approve_payment<'e, E>(&self, executor: E, id: Uuid, approved_by: &str) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2, approved_by = $3, approved_at = NOW(), rejection_reason = NULL
            WHERE id = $1 AND status = $4
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(PaymentStatus::Completed)
        .bind(approved_by)
        .bind(PaymentStatus::Pending)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    pub async fn reject_payment<'e, E>(&self, executor: E, id: Uuid, reason: &str) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            r#"
            UPDATE payments
            SET status = $2, rejection_reason = $3, approved_by = NULL, approved_at = NULL
            WHERE id = $1
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(PaymentStatus::Rejected)
        .bind(reason)
        .fetch_optional(executor)
        .await?;

        Ok(payment)
    }

    // =========================================================================
    //  DONATIONS
    // =========================================================================

    pub async fn list_donations<'e, E>(&self, executor: E) -> Result<Vec<Donation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let donations = sqlx::query_as::<_, Donation>(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations ORDER BY date DESC NULLS LAST, created_at DESC"
        ))
        .fetch_all(executor)
        .await?;

        Ok(donations)
    }

    pub async fn insert_donation<'e, E>(&self, executor: E, input: &DonationPayload) -> Result<Donation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let donation = sqlx::query_as::<_, Donation>(&format!(
            r#"
            INSERT INTO donations (donor_name, is_member, member_id, amount_minor, method, date, reference, screenshot, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DONATION_COLUMNS}
            "#
        ))
        .bind(input.donor_name.trim())
        .bind(input.is_member)
        .bind(input.member_id)
        .bind(input.amount.minor_units())
        .bind(input.method.as_deref())
        .bind(input.date)
        .bind(input.reference.as_deref())
        .bind(input.screenshot.as_deref())
        .bind(input.notes.as_deref())
        .fetch_one(executor)
        .await?;

        Ok(donation)
    }

    pub async fn update_donation<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &DonationPayload,
    ) -> Result<Option<Donation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let donation = sqlx::query_as::<_, Donation>(&format!(
            r#"
            UPDATE donations
            SET donor_name = $2, is_member = $3, member_id = $4, amount_minor = $5,
                method = $6, date = $7, reference = $8, screenshot = $9, notes = $10
            WHERE id = $1
            RETURNING {DONATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.donor_name.trim())
        .bind(input.is_member)
        .bind(input.member_id)
        .bind(input.amount.minor_units())
        .bind(input.method.as_deref())
        .bind(input.date)
        .bind(input.reference.as_deref())
        .bind(input.screenshot.as_deref())
        .bind(input.notes.as_deref())
        .fetch_optional(executor)
        .await?;

        Ok(donation)
    }

    pub async fn delete_donation<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM donations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
