// src/services/finance_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, error::AppError},
    db::{FinanceRepository, MemberRepository},
    models::finance::{
        CreateInvoicePayload, CreatePaymentPayload, Donation, DonationPayload, Invoice, InvoiceStatus,
        InvoiceView, MarkInvoicePaidPayload, NewPayment, Payment, PaymentStatus, PaymentView,
        UpdateInvoicePayload,
    },
    services::{
        payment_methods::{display_method, normalize_method},
        reconciliation::{balance_writeback, next_invoice_id, resolve_invoice_member, SettledInvoices},
    },
};

/// Only a Pending payment can be approved.
pub fn ensure_pending(payment: &Payment) -> Result<(), AppError> {
    match payment.status {
        PaymentStatus::Pending => Ok(()),
        PaymentStatus::Completed => Err(AppError::PaymentNotPending("already completed")),
        PaymentStatus::Paid => Err(AppError::PaymentNotPending("already paid")),
        PaymentStatus::Rejected => Err(AppError::PaymentNotPending("rejected")),
    }
}

/// Unpaid invoices past their due date, skipping any an approved payment
/// already covers.
pub fn overdue_candidates(invoices: &[Invoice], payments: &[Payment], today: CalendarDate) -> Vec<String> {
    let settled = SettledInvoices::from_payments(payments);
    invoices
        .iter()
        .filter(|inv| inv.status == InvoiceStatus::Unpaid)
        .filter(|inv| inv.due.is_some_and(|due| due < today))
        .filter(|inv| settled.status_of(inv) != InvoiceStatus::Paid)
        .map(|inv| inv.id.clone())
        .collect()
}

pub fn invoice_views(invoices: Vec<Invoice>, payments: &[Payment]) -> Vec<InvoiceView> {
    let settled = SettledInvoices::from_payments(payments);
    invoices
        .into_iter()
        .map(|invoice| InvoiceView {
            effective_status: settled.status_of(&invoice),
            display_method: normalize_method(invoice.method.as_deref(), false, None),
            invoice,
        })
        .collect()
}

pub fn payment_views(payments: Vec<Payment>) -> Vec<PaymentView> {
    payments
        .into_iter()
        .map(|payment| PaymentView { display_method: display_method(&payment), payment })
        .collect()
}

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
    members: MemberRepository,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository, members: MemberRepository) -> Self {
        Self { repo, members }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    /// Rewrites the cached balance of `member_ids` (all members when `None`)
    /// from their outstanding invoices. Returns how many rows changed.
    pub async fn sync_balances(&self, conn: &mut PgConnection, member_ids: Option<&[Uuid]>) -> Result<usize, AppError> {
        let members = self.members.list(&mut *conn).await?;
        let invoices = self.repo.list_invoices(&mut *conn).await?;
        let payments = self.repo.list_payments(&mut *conn).await?;

        let mut changed = 0;
        for member in members
            .iter()
            .filter(|m| member_ids.is_none_or(|ids| ids.contains(&m.id)))
        {
            if let Some(balance) = balance_writeback(member, &invoices, &payments) {
                self.members.set_balance(&mut *conn, member.id, balance).await?;
                tracing::debug!(member_id = %member.id, balance = %balance, "member balance re-synced");
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub async fn resync_all_balances(&self) -> Result<usize, AppError> {
        let mut conn = self.pool().acquire().await?;
        let changed = self.sync_balances(&mut conn, None).await?;
        if changed > 0 {
            tracing::info!(changed, "member balances re-synced");
        }
        Ok(changed)
    }

    /// Member owning `invoice`, by id or the legacy email/name fallback.
    async fn invoice_owner(&self, conn: &mut PgConnection, invoice: &Invoice) -> Result<Option<Uuid>, AppError> {
        if invoice.member_id.is_some() {
            return Ok(invoice.member_id);
        }
        let members = self.members.list(&mut *conn).await?;
        Ok(resolve_invoice_member(invoice, &members).map(|m| m.id))
    }

    // =========================================================================
    //  INVOICES
    // =========================================================================

    pub async fn list_invoices(&self) -> Result<Vec<InvoiceView>, AppError> {
        let invoices = self.repo.list_invoices(self.pool()).await?;
        let payments = self.repo.list_payments(self.pool()).await?;
        Ok(invoice_views(invoices, &payments))
    }

    pub async fn get_invoice(&self, id: &str) -> Result<InvoiceView, AppError> {
        let invoice = self.repo.find_invoice(self.pool(), id).await?.ok_or(AppError::NotFound("Invoice"))?;
        let payments = self.repo.list_payments(self.pool()).await?;
        Ok(invoice_views(vec![invoice], &payments).remove(0))
    }

    pub async fn create_invoice(&self, input: &CreateInvoicePayload) -> Result<Invoice, AppError> {
        let mut tx = self.pool().begin().await?;

        let member = self
            .members
            .find_by_id(&mut *tx, input.member_id)
            .await?
            .ok_or(AppError::NotFound("Member"))?;

        self.repo.lock_invoice_sequence(&mut *tx).await?;
        let year = CalendarDate::today().year();
        let existing = self.repo.invoice_ids_for_year(&mut *tx, year).await?;
        let id = next_invoice_id(existing.iter().map(String::as_str), year);

        let invoice = self
            .repo
            .insert_invoice(
                &mut *tx,
                &id,
                &member,
                input.period.trim(),
                input.amount,
                input.due,
                input.notes.as_deref(),
            )
            .await?;

        self.sync_balances(&mut tx, Some(std::slice::from_ref(&member.id))).await?;
        tx.commit().await?;

        tracing::info!(invoice_id = %invoice.id, member_id = %member.id, amount = %invoice.amount, "invoice created");
        Ok(invoice)
    }

    pub async fn update_invoice(&self, id: &str, input: &UpdateInvoicePayload) -> Result<Invoice, AppError> {
        let mut tx = self.pool().begin().await?;

        let invoice = self
            .repo
            .update_invoice(&mut *tx, id, input)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;

        if let Some(owner) = self.invoice_owner(&mut tx, &invoice).await? {
            self.sync_balances(&mut tx, Some(std::slice::from_ref(&owner))).await?;
        }
        tx.commit().await?;

        Ok(invoice)
    }

    /// Paid invoices, stored or effective, are kept for the record.
    pub async fn delete_invoice(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        let invoice = self.repo.find_invoice(&mut *tx, id).await?.ok_or(AppError::NotFound("Invoice"))?;
        let payments = self.repo.list_payments(&mut *tx).await?;
        if SettledInvoices::from_payments(&payments).status_of(&invoice) == InvoiceStatus::Paid {
            return Err(AppError::PaidInvoiceImmutable);
        }

        let owner = self.invoice_owner(&mut tx, &invoice).await?;
        self.repo.delete_invoice(&mut *tx, id).await?;
        if let Some(owner) = owner {
            self.sync_balances(&mut tx, Some(std::slice::from_ref(&owner))).await?;
        }
        tx.commit().await?;

        tracing::info!(invoice_id = %id, "invoice deleted");
        Ok(())
    }

    /// Records a Completed payment for the invoice and settles it.
    pub async fn mark_invoice_paid(
        &self,
        id: &str,
        input: &MarkInvoicePaidPayload,
        recorded_by: &str,
    ) -> Result<Invoice, AppError> {
        let mut tx = self.pool().begin().await?;

        let invoice = self.repo.find_invoice(&mut *tx, id).await?.ok_or(AppError::NotFound("Invoice"))?;
        let payments = self.repo.list_payments(&mut *tx).await?;
        if SettledInvoices::from_payments(&payments).status_of(&invoice) == InvoiceStatus::Paid {
            return Err(AppError::InvalidInput("Invoice is already paid.".into()));
        }

        let owner = self.invoice_owner(&mut tx, &invoice).await?;
        let paid_on = input.date.unwrap_or_else(CalendarDate::today);

        self.repo
            .insert_payment(
                &mut *tx,
                &NewPayment {
                    member_id: owner,
                    member: invoice.member_name.clone(),
                    invoice_id: Some(invoice.id.clone()),
                    amount: invoice.amount,
                    method: Some(input.method.trim().to_string()),
                    paid_to_admin: input.paid_to_admin,
                    paid_to_admin_name: input.paid_to_admin_name.clone(),
                    status: PaymentStatus::Completed,
                    date: Some(paid_on),
                    screenshot: input.screenshot.clone(),
                    reference: input.reference.clone(),
                    approved_by: Some(recorded_by.to_string()),
                },
            )
            .await?;

        let updated = self
            .repo
            .mark_invoice_paid(&mut *tx, id, input)
            .await?
            .ok_or(AppError::NotFound("Invoice"))?;

        if let Some(owner) = owner {
            self.members.set_last_payment(&mut *tx, owner, paid_on).await?;
            self.sync_balances(&mut tx, Some(std::slice::from_ref(&owner))).await?;
        }
        tx.commit().await?;

        tracing::info!(invoice_id = %id, recorded_by = %recorded_by, "invoice marked paid");
        Ok(updated)
    }

    /// Flips past-due Unpaid invoices to Overdue.
    pub async fn mark_overdue(&self, today: CalendarDate) -> Result<u64, AppError> {
        let invoices = self.repo.list_invoices(self.pool()).await?;
        let payments = self.repo.list_payments(self.pool()).await?;
        let ids = overdue_candidates(&invoices, &payments, today);

        let flipped = self.repo.set_invoice_status(self.pool(), &ids, InvoiceStatus::Overdue).await?;
        if flipped > 0 {
            tracing::info!(count = flipped, "invoices marked overdue");
        }
        Ok(flipped)
    }

    // =========================================================================
    //  PAYMENTS
    // =========================================================================

    pub async fn list_payments(&self) -> Result<Vec<PaymentView>, AppError> {
        let payments = self.repo.list_payments(self.pool()).await?;
        Ok(payment_views(payments))
    }

    /// A member-submitted payment, Pending until reviewed.
    pub async fn submit_payment(&self, input: &CreatePaymentPayload) -> Result<Payment, AppError> {
        let member = self
            .members
            .find_by_id(self.pool(), input.member_id)
            .await?
            .ok_or(AppError::NotFound("Member"))?;

        if let Some(invoice_id) = input.invoice_id.as_deref() {
            self.repo
                .find_invoice(self.pool(), invoice_id)
                .await?
                .ok_or(AppError::NotFound("Invoice"))?;
        }

        let payment = self
            .repo
            .insert_payment(
                self.pool(),
                &NewPayment {
                    member_id: Some(member.id),
                    member: member.name.clone(),
                    invoice_id: input.invoice_id.clone(),
                    amount: input.amount,
                    method: Some(input.method.trim().to_string()),
                    paid_to_admin: input.paid_to_admin,
                    paid_to_admin_name: input.paid_to_admin_name.clone(),
                    status: PaymentStatus::Pending,
                    date: Some(input.date.unwrap_or_else(CalendarDate::today)),
                    screenshot: input.screenshot.clone(),
                    reference: input.reference.clone(),
                    approved_by: None,
                },
            )
            .await?;

        tracing::info!(payment_id = %payment.id, member_id = %member.id, "payment submitted for review");
        Ok(payment)
    }

    pub async fn approve_payment(&self, id: Uuid, approved_by: &str) -> Result<Payment, AppError> {
        let mut tx = self.pool().begin().await?;

        let previous = self.repo.find_payment(&mut *tx, id).await?.ok_or(AppError::NotFound("Payment"))?;
        ensure_pending(&previous)?;
        let payment = self
            .repo
            .approve_payment(&mut *tx, id, approved_by)
            .await?
            .ok_or(AppError::PaymentNotPending("no longer pending"))?;

        if let Some(invoice_id) = payment.invoice_id.clone() {
            self.repo.set_invoice_status(&mut *tx, &[invoice_id], InvoiceStatus::Paid).await?;
        }
        if let Some(member_id) = payment.member_id {
            let paid_on = payment.date.unwrap_or_else(CalendarDate::today);
            self.members.set_last_payment(&mut *tx, member_id, paid_on).await?;
            self.sync_balances(&mut tx, Some(std::slice::from_ref(&member_id))).await?;
        }
        tx.commit().await?;

        tracing::info!(payment_id = %id, approved_by = %approved_by, "payment approved");
        Ok(payment)
    }

    /// Rejecting an approved payment reopens its invoice when nothing else
    /// settles it.
    pub async fn reject_payment(&self, id: Uuid, reason: &str) -> Result<Payment, AppError> {
        let mut tx = self.pool().begin().await?;

        let previous = self.repo.find_payment(&mut *tx, id).await?.ok_or(AppError::NotFound("Payment"))?;
        let payment = self
            .repo
            .reject_payment(&mut *tx, id, reason.trim())
            .await?
            .ok_or(AppError::NotFound("Payment"))?;

        if let (true, Some(invoice_id)) = (previous.status.is_settled(), payment.invoice_id.as_deref()) {
            let payments = self.repo.list_payments(&mut *tx).await?;
            let still_settled = payments
                .iter()
                .any(|p| p.status.is_settled() && p.invoice_id.as_deref() == Some(invoice_id));
            if !still_settled {
                self.repo
                    .set_invoice_status(&mut *tx, &[invoice_id.to_string()], InvoiceStatus::Unpaid)
                    .await?;
            }
        }
        if let Some(member_id) = payment.member_id {
            self.sync_balances(&mut tx, Some(std::slice::from_ref(&member_id))).await?;
        }
        tx.commit().await?;

        tracing::info!(payment_id = %id, "payment rejected");
        Ok(payment)
    }

    // =========================================================================
    //  DONATIONS
    // =========================================================================

    pub async fn list_donations(&self) -> Result<Vec<Donation>, AppError> {
        self.repo.list_donations(self.pool()).await
    }

    pub async fn create_donation(&self, input: &DonationPayload) -> Result<Donation, AppError> {
        let donation = self.repo.insert_donation(self.pool(), input).await?;
        tracing::info!(donation_id = %donation.id, amount = %donation.amount, "donation recorded");
        Ok(donation)
    }

    pub async fn update_donation(&self, id: Uuid, input: &DonationPayload) -> Result<Donation, AppError> {
        self.repo
            .update_donation(self.pool(), id, input)
            .await?
            .ok_or(AppError::NotFound("Donation"))
    }

    pub async fn delete_donation(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete_donation(self.pool(), id).await? {
            return Err(AppError::NotFound("Donation"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{date, invoice, payment};

    #[test]
    fn only_pending_payments_can_be_approved() {
        let pending = payment(Some(1), Some("INV-2025-001"), "$250.00", PaymentStatus::Pending, Some("2025-11-01"));
        assert!(ensure_pending(&pending).is_ok());

        for status in [PaymentStatus::Completed, PaymentStatus::Paid, PaymentStatus::Rejected] {
            let mut p = pending.clone();
            p.status = status;
            assert!(matches!(ensure_pending(&p), Err(AppError::PaymentNotPending(_))));
        }
    }

    #[test]
    fn overdue_skips_settled_and_future_invoices() {
        let mut past = invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Unpaid);
        past.due = Some(date("2025-10-31"));
        let mut covered = invoice("INV-2025-002", Some(2), "$250.00", InvoiceStatus::Unpaid);
        covered.due = Some(date("2025-10-31"));
        let mut future = invoice("INV-2025-003", Some(3), "$250.00", InvoiceStatus::Unpaid);
        future.due = Some(date("2025-12-31"));
        let mut already = invoice("INV-2025-004", Some(4), "$250.00", InvoiceStatus::Overdue);
        already.due = Some(date("2025-01-31"));
        let undated = invoice("INV-2025-005", Some(5), "$250.00", InvoiceStatus::Unpaid);

        let payments = vec![payment(
            Some(2),
            Some("INV-2025-002"),
            "$250.00",
            PaymentStatus::Completed,
            Some("2025-10-20"),
        )];

        let ids = overdue_candidates(&[past, covered, future, already, undated], &payments, date("2025-11-15"));
        assert_eq!(ids, vec!["INV-2025-001".to_string()]);
    }

    #[test]
    fn views_carry_effective_status_and_label() {
        let mut inv = invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Unpaid);
        inv.method = Some("PayMe".into());
        let payments = vec![payment(Some(1), Some("INV-2025-001"), "$250.00", PaymentStatus::Paid, None)];

        let views = invoice_views(vec![inv], &payments);
        assert_eq!(views[0].invoice.status, InvoiceStatus::Unpaid);
        assert_eq!(views[0].effective_status, InvoiceStatus::Paid);
        assert_eq!(views[0].display_method, "Online Payment");

        let listed = payment_views(payments);
        assert_eq!(listed[0].display_method, "Online Payment");
    }
}
