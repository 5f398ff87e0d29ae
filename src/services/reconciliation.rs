// src/services/reconciliation.rs
//
// Ground truth for invoice and member financial status. Stored invoice status
// can lag behind an approved payment, so every balance, badge and reminder
// decision reads status through this module.

use std::collections::HashSet;

use crate::{
    common::money::Money,
    models::{
        finance::{Invoice, InvoiceStatus, Payment},
        members::Member,
    },
};

/// Invoice ids that have at least one Completed/Paid payment linked.
pub struct SettledInvoices<'a> {
    ids: HashSet<&'a str>,
}

impl<'a> SettledInvoices<'a> {
    pub fn from_payments(payments: &'a [Payment]) -> Self {
        let ids = payments
            .iter()
            .filter(|p| p.status.is_settled())
            .filter_map(|p| p.invoice_id.as_deref())
            .collect();
        Self { ids }
    }

    pub fn status_of(&self, invoice: &Invoice) -> InvoiceStatus {
        if self.ids.contains(invoice.id.as_str()) {
            InvoiceStatus::Paid
        } else {
            invoice.status
        }
    }
}

/// Paid if any settled payment points at the invoice, otherwise the stored
/// status unchanged.
pub fn effective_invoice_status(invoice: &Invoice, payments: &[Payment]) -> InvoiceStatus {
    let settled = payments
        .iter()
        .any(|p| p.status.is_settled() && p.invoice_id.as_deref() == Some(invoice.id.as_str()));
    if settled { InvoiceStatus::Paid } else { invoice.status }
}

fn same_text(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());
    !a.is_empty() && a.eq_ignore_ascii_case(b)
}

/// Whether `invoice` is billed to `member`.
///
/// Rows carrying a member id match on it only. Legacy rows without one fall
/// back to the email, then the name. Two members sharing an email will both
/// claim such a row.
pub fn invoice_belongs_to(invoice: &Invoice, member: &Member) -> bool {
    match invoice.member_id {
        Some(id) => id == member.id,
        None => {
            invoice
                .member_email
                .as_deref()
                .is_some_and(|email| same_text(email, &member.email))
                || same_text(&invoice.member_name, &member.name)
        }
    }
}

/// First known member the invoice can be attributed to, by id, email or name.
pub fn resolve_invoice_member<'m>(invoice: &Invoice, members: &'m [Member]) -> Option<&'m Member> {
    if let Some(id) = invoice.member_id {
        if let Some(member) = members.iter().find(|m| m.id == id) {
            return Some(member);
        }
    }
    if let Some(email) = invoice.member_email.as_deref() {
        if let Some(member) = members.iter().find(|m| same_text(email, &m.email)) {
            return Some(member);
        }
    }
    members.iter().find(|m| same_text(&invoice.member_name, &m.name))
}

/// The member's Unpaid/Overdue invoices, by effective status.
pub fn outstanding_invoices<'i>(
    member: &Member,
    invoices: &'i [Invoice],
    payments: &[Payment],
) -> Vec<&'i Invoice> {
    let settled = SettledInvoices::from_payments(payments);
    invoices
        .iter()
        .filter(|inv| invoice_belongs_to(inv, member))
        .filter(|inv| settled.status_of(inv).is_outstanding())
        .collect()
}

/// Sum of the member's outstanding invoice amounts. Zero means settled.
pub fn member_outstanding_balance(member: &Member, invoices: &[Invoice], payments: &[Payment]) -> Money {
    let total: Money = outstanding_invoices(member, invoices, payments)
        .into_iter()
        .map(|inv| inv.amount)
        .sum();
    if total.is_positive() { total } else { Money::ZERO }
}

/// New cached balance for `member` when it drifted from the invoices.
pub fn balance_writeback(member: &Member, invoices: &[Invoice], payments: &[Payment]) -> Option<Money> {
    let computed = member_outstanding_balance(member, invoices, payments);
    (computed.minor_units() != member.balance.minor_units()).then_some(computed)
}

/// Next `INV-<year>-<seq>` id: highest sequence seen for `year`, plus one.
pub fn next_invoice_id<'a, I>(existing_ids: I, year: i32) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = format!("INV-{year}-");
    let max_seq = existing_ids
        .into_iter()
        .filter_map(|id| id.strip_prefix(&prefix))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{prefix}{:03}", max_seq + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::finance::PaymentStatus;
    use crate::services::fixtures::{invoice, member, payment};

    #[test]
    fn settled_payment_overrides_stored_status() {
        let inv = invoice("inv1", Some(1), "$250.00", InvoiceStatus::Unpaid);
        for status in [PaymentStatus::Completed, PaymentStatus::Paid] {
            let p = payment(Some(1), Some("inv1"), "$250.00", status, Some("2025-01-15"));
            assert_eq!(effective_invoice_status(&inv, &[p]), InvoiceStatus::Paid);
        }
    }

    #[test]
    fn pending_or_rejected_payment_keeps_stored_status() {
        let inv = invoice("inv1", Some(1), "$250.00", InvoiceStatus::Overdue);
        let payments = vec![
            payment(Some(1), Some("inv1"), "$250.00", PaymentStatus::Pending, None),
            payment(Some(1), Some("inv1"), "$250.00", PaymentStatus::Rejected, None),
            payment(Some(1), Some("inv2"), "$250.00", PaymentStatus::Completed, None),
        ];
        assert_eq!(effective_invoice_status(&inv, &payments), InvoiceStatus::Overdue);
        assert_eq!(
            SettledInvoices::from_payments(&payments).status_of(&inv),
            InvoiceStatus::Overdue
        );
    }

    #[test]
    fn completed_payment_clears_member_balance() {
        let m1 = member(1, "Yusuf", "yusuf@example.org", "$250.00");
        let invoices = vec![invoice("inv1", Some(1), "$250.00", InvoiceStatus::Unpaid)];
        let payments = vec![payment(Some(1), Some("inv1"), "$250.00", PaymentStatus::Completed, None)];

        assert_eq!(effective_invoice_status(&invoices[0], &payments), InvoiceStatus::Paid);
        assert_eq!(member_outstanding_balance(&m1, &invoices, &payments), Money::ZERO);
        assert_eq!(balance_writeback(&m1, &invoices, &payments), Some(Money::ZERO));
    }

    #[test]
    fn sums_unpaid_and_overdue_only() {
        let m1 = member(1, "Yusuf", "yusuf@example.org", "$0");
        let invoices = vec![
            invoice("a", Some(1), "$250.00", InvoiceStatus::Unpaid),
            invoice("b", Some(1), "$100.50", InvoiceStatus::Overdue),
            invoice("c", Some(1), "$999.00", InvoiceStatus::Paid),
            invoice("d", Some(2), "$40.00", InvoiceStatus::Unpaid),
            invoice("e", Some(1), "garbage", InvoiceStatus::Unpaid),
        ];
        assert_eq!(
            member_outstanding_balance(&m1, &invoices, &[]),
            Money::from_minor(35_050)
        );
    }

    #[test]
    fn member_without_open_invoices_owes_nothing() {
        let m1 = member(1, "Yusuf", "yusuf@example.org", "$0");
        let invoices = vec![invoice("c", Some(1), "$999.00", InvoiceStatus::Paid)];
        assert_eq!(member_outstanding_balance(&m1, &invoices, &[]), Money::ZERO);
        assert_eq!(balance_writeback(&m1, &invoices, &[]), None);
    }

    #[test]
    fn legacy_invoices_match_by_email_then_name() {
        let m1 = member(1, "Yusuf Rahman", "yusuf@example.org", "$0");

        let mut by_email = invoice("a", None, "$10.00", InvoiceStatus::Unpaid);
        by_email.member_name = "Someone Else".into();
        by_email.member_email = Some("YUSUF@example.org".into());

        let mut by_name = invoice("b", None, "$20.00", InvoiceStatus::Unpaid);
        by_name.member_name = "yusuf rahman".into();
        by_name.member_email = None;

        let mut other_member = invoice("c", Some(2), "$40.00", InvoiceStatus::Unpaid);
        other_member.member_email = Some("yusuf@example.org".into());

        let invoices = vec![by_email, by_name, other_member];
        assert_eq!(
            member_outstanding_balance(&m1, &invoices, &[]),
            Money::from_major(30)
        );
    }

    #[test]
    fn resolves_invoice_member_by_id_email_or_name() {
        let members = vec![
            member(1, "Yusuf", "yusuf@example.org", "$0"),
            member(2, "Amina", "amina@example.org", "$0"),
        ];
        let mut inv = invoice("a", None, "$10.00", InvoiceStatus::Overdue);
        inv.member_name = "Nobody".into();
        inv.member_email = Some("amina@example.org".into());
        assert_eq!(resolve_invoice_member(&inv, &members).map(|m| m.name.as_str()), Some("Amina"));

        inv.member_email = None;
        assert!(resolve_invoice_member(&inv, &members).is_none());
    }

    #[test]
    fn invoice_ids_continue_from_highest_sequence() {
        let ids = ["INV-2025-001", "INV-2025-003"];
        assert_eq!(next_invoice_id(ids, 2025), "INV-2025-004");
    }

    #[test]
    fn invoice_ids_ignore_other_years_and_junk() {
        let ids = ["INV-2024-050", "INV-2025-abc", "inv-2025-009", "INV-2025-"];
        assert_eq!(next_invoice_id(ids, 2025), "INV-2025-001");
        assert_eq!(next_invoice_id(["INV-2026-999"], 2026), "INV-2026-1000");
    }
}
