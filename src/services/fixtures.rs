// src/services/fixtures.rs
//
// Snapshot builders shared by the engine and coordinator tests.

use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, money::Money},
    models::{
        finance::{Donation, Invoice, InvoiceStatus, Payment, PaymentStatus},
        members::{Member, MemberStatus, SubscriptionType},
    },
};

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub fn date(raw: &str) -> CalendarDate {
    CalendarDate::parse_lenient(raw).expect("fixture date")
}

pub fn member(n: u128, name: &str, email: &str, balance: &str) -> Member {
    Member {
        id: id(n),
        name: name.to_string(),
        email: email.to_string(),
        phone: Some(format!("+852 9000 {n:04}")),
        status: MemberStatus::Active,
        balance: Money::parse_lenient(balance),
        subscription_type: SubscriptionType::Lifetime,
        next_due: None,
        last_payment: None,
        created_at: None,
    }
}

pub fn invoice(inv_id: &str, member_n: Option<u128>, amount: &str, status: InvoiceStatus) -> Invoice {
    Invoice {
        id: inv_id.to_string(),
        member_id: member_n.map(id),
        member_name: format!("Member {}", member_n.unwrap_or(0)),
        member_email: None,
        period: "Nov 2025".to_string(),
        amount: Money::parse_lenient(amount),
        status,
        due: None,
        method: None,
        reference: None,
        notes: None,
        screenshot: None,
        created_at: None,
    }
}

pub fn payment(
    member_n: Option<u128>,
    invoice_id: Option<&str>,
    amount: &str,
    status: PaymentStatus,
    on: Option<&str>,
) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        member_id: member_n.map(id),
        member: format!("Member {}", member_n.unwrap_or(0)),
        invoice_id: invoice_id.map(str::to_string),
        amount: Money::parse_lenient(amount),
        method: Some("FPS".to_string()),
        paid_to_admin: false,
        paid_to_admin_name: None,
        status,
        date: on.and_then(CalendarDate::parse_lenient),
        screenshot: None,
        reference: None,
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
        created_at: None,
    }
}

pub fn donation(amount: &str, on: Option<&str>) -> Donation {
    Donation {
        id: Uuid::new_v4(),
        donor_name: "Anonymous".to_string(),
        is_member: false,
        member_id: None,
        amount: Money::parse_lenient(amount),
        method: Some("Cash".to_string()),
        date: on.and_then(CalendarDate::parse_lenient),
        reference: None,
        screenshot: None,
        notes: None,
        created_at: None,
    }
}
