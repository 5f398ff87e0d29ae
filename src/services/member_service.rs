// src/services/member_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{FinanceRepository, MemberRepository},
    models::finance::{Invoice, Payment},
    models::members::{
        CreateMemberPayload, Member, MemberDetail, MemberStatus, SubscriptionType, UpdateMemberPayload,
    },
    services::{
        finance_service::{invoice_views, payment_views},
        reconciliation::{invoice_belongs_to, member_outstanding_balance, SettledInvoices},
    },
};

#[derive(Clone)]
pub struct MemberService {
    repo: MemberRepository,
    finance: FinanceRepository,
}

impl MemberService {
    pub fn new(repo: MemberRepository, finance: FinanceRepository) -> Self {
        Self { repo, finance }
    }

    fn pool(&self) -> &PgPool {
        self.repo.pool()
    }

    pub async fn list(&self) -> Result<Vec<Member>, AppError> {
        self.repo.list(self.pool()).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Member, AppError> {
        self.repo.find_by_id(self.pool(), id).await?.ok_or(AppError::NotFound("Member"))
    }

    /// The member plus the invoices and payments attributed to them.
    pub async fn detail(&self, id: Uuid) -> Result<MemberDetail, AppError> {
        let member = self.get(id).await?;
        let invoices = self.finance.list_invoices(self.pool()).await?;
        let payments = self.finance.list_payments(self.pool()).await?;

        let outstanding = member_outstanding_balance(&member, &invoices, &payments);
        let own_invoices: Vec<_> = invoices.into_iter().filter(|inv| invoice_belongs_to(inv, &member)).collect();
        let invoice_rows = invoice_views(own_invoices, &payments);
        let own_payments: Vec<_> = payments.into_iter().filter(|p| p.member_id == Some(member.id)).collect();

        Ok(MemberDetail {
            member,
            outstanding,
            invoices: invoice_rows,
            payments: payment_views(own_payments),
        })
    }

    pub async fn create(&self, input: &CreateMemberPayload) -> Result<Member, AppError> {
        let member = self.repo.create(self.pool(), input).await?;
        tracing::info!(member_id = %member.id, status = ?member.status, "member created");
        Ok(member)
    }

    pub async fn update(&self, id: Uuid, input: &UpdateMemberPayload) -> Result<Member, AppError> {
        self.repo
            .update(self.pool(), id, input)
            .await?
            .ok_or(AppError::NotFound("Member"))
    }

    /// Pending -> Active. Already active members are returned unchanged.
    pub async fn approve(&self, id: Uuid) -> Result<Member, AppError> {
        let member = self.get(id).await?;
        if member.status == MemberStatus::Active {
            return Ok(member);
        }
        let member = self
            .repo
            .set_status(self.pool(), id, MemberStatus::Active)
            .await?
            .ok_or(AppError::NotFound("Member"))?;

        tracing::info!(member_id = %id, "member approved");
        Ok(member)
    }

    pub async fn change_subscription(&self, id: Uuid, subscription: SubscriptionType) -> Result<Member, AppError> {
        let member = self
            .repo
            .set_subscription(self.pool(), id, subscription)
            .await?
            .ok_or(AppError::NotFound("Member"))?;

        tracing::info!(member_id = %id, subscription = ?subscription, "subscription changed");
        Ok(member)
    }

    /// Open invoices go with the member. Settled ones stay for the books but
    /// lose the email, so a later member with the same address does not pick
    /// them up through the legacy email match.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        let invoices = self.finance.list_invoices(&mut *tx).await?;
        let payments = self.finance.list_payments(&mut *tx).await?;
        let open = open_invoice_ids(id, &invoices, &payments);

        let removed = self.finance.delete_invoices(&mut *tx, &open).await?;
        self.finance.detach_member_invoices(&mut *tx, id).await?;
        if !self.repo.delete(&mut *tx, id).await? {
            return Err(AppError::NotFound("Member"));
        }
        tx.commit().await?;

        tracing::info!(member_id = %id, open_invoices_removed = removed, "member deleted");
        Ok(())
    }
}

/// Invoices linked to the member by id whose effective status is still open.
fn open_invoice_ids(member_id: Uuid, invoices: &[Invoice], payments: &[Payment]) -> Vec<String> {
    let settled = SettledInvoices::from_payments(payments);
    invoices
        .iter()
        .filter(|inv| inv.member_id == Some(member_id))
        .filter(|inv| settled.status_of(inv).is_outstanding())
        .map(|inv| inv.id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::finance::{InvoiceStatus, PaymentStatus},
        services::fixtures::{id, invoice, payment},
    };

    #[test]
    fn only_linked_open_invoices_are_removed_with_the_member() {
        let invoices = vec![
            invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Unpaid),
            invoice("INV-2025-002", Some(1), "$250.00", InvoiceStatus::Overdue),
            invoice("INV-2025-003", Some(1), "$250.00", InvoiceStatus::Paid),
            invoice("INV-2025-004", Some(2), "$250.00", InvoiceStatus::Unpaid),
            invoice("INV-2025-005", None, "$250.00", InvoiceStatus::Unpaid),
        ];
        // approved payment settles 002 even though it is still stored as Overdue
        let payments = vec![payment(Some(1), Some("INV-2025-002"), "$250.00", PaymentStatus::Completed, Some("2025-11-01"))];

        assert_eq!(open_invoice_ids(id(1), &invoices, &payments), vec!["INV-2025-001".to_string()]);
    }
}
