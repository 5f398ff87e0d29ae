// src/services/reminder_messages.rs
//
// Channel templates for payment reminders. Email is HTML with `{{key}}`
// placeholders (the template is editable from the email settings); WhatsApp is
// plain text using WhatsApp's `*bold*` markup.

use crate::{
    common::{date::CalendarDate, money::Money},
    models::{
        finance::{Invoice, InvoiceStatus},
        members::Member,
        settings::{OrganizationInfo, PaymentMethod},
    },
};

pub const REMINDER_KIND: &str = "Payment Reminder";
pub const UPCOMING_KIND: &str = "Upcoming Payment Reminder";

pub const DEFAULT_EMAIL_TEMPLATE: &str = r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto;">
<p>Dear {{member_name}},</p>
<p>This is a reminder from {{organization_name}} that you have {{invoice_count}} outstanding invoice(s) totalling <strong>{{total_due}}</strong>.</p>
{{invoice_list}}
<h3>How to pay</h3>
{{payment_methods}}
<p>If you have already paid, please ignore this message.</p>
<p>Thank you,<br/>{{organization_name}}</p>
</div>"#;

/// An invoice paired with its reconciled status.
#[derive(Debug, Clone, Copy)]
pub struct DueInvoice<'a> {
    pub invoice: &'a Invoice,
    pub status: InvoiceStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

pub fn organization_name(org: &OrganizationInfo) -> &str {
    org.name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or("Membership Office")
}

pub fn total_due(invoices: &[DueInvoice<'_>]) -> Money {
    invoices.iter().map(|d| d.invoice.amount).sum()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn status_label(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Unpaid => "Unpaid",
        InvoiceStatus::Paid => "Paid",
        InvoiceStatus::Overdue => "Overdue",
    }
}

fn due_label(due: Option<CalendarDate>) -> String {
    due.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
}

fn active_methods(methods: &[PaymentMethod]) -> impl Iterator<Item = &PaymentMethod> {
    methods.iter().filter(|m| m.active)
}

/// Replaces every `{{key}}` in `template` in one pass. Substituted values are
/// never scanned again; unknown placeholders are kept as written.
pub fn render_template(template: &str, values: &[(&str, String)]) -> String {
    let mut body = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        body.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            body.push_str(&rest[start..]);
            return body;
        };
        let key = after[..end].trim();
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => body.push_str(value),
            None => body.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    body.push_str(rest);
    body
}

fn invoice_table_html(invoices: &[DueInvoice<'_>]) -> String {
    let mut rows = String::new();
    for due in invoices {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(&due.invoice.id),
            escape_html(&due.invoice.period),
            due.invoice.amount,
            status_label(due.status),
            due_label(due.invoice.due),
        ));
    }
    format!(
        "<table style=\"width:100%; border-collapse:collapse;\">\
         <tr><th>Invoice</th><th>Period</th><th>Amount</th><th>Status</th><th>Due</th></tr>{rows}</table>"
    )
}

fn payment_methods_html(methods: &[PaymentMethod]) -> String {
    let items: Vec<String> = active_methods(methods)
        .map(|m| {
            let details = m.details.as_deref().unwrap_or_default();
            if details.is_empty() {
                format!("<li><strong>{}</strong></li>", escape_html(&m.name))
            } else {
                format!("<li><strong>{}</strong>: {}</li>", escape_html(&m.name), escape_html(details))
            }
        })
        .collect();
    if items.is_empty() {
        return "<p>Please contact the office for payment details.</p>".to_string();
    }
    format!("<ul>{}</ul>", items.join(""))
}

pub fn outstanding_email(
    member: &Member,
    invoices: &[DueInvoice<'_>],
    methods: &[PaymentMethod],
    org: &OrganizationInfo,
    subject: &str,
    template: Option<&str>,
) -> EmailMessage {
    let template = template.filter(|t| !t.trim().is_empty()).unwrap_or(DEFAULT_EMAIL_TEMPLATE);
    let html = render_template(
        template,
        &[
            ("member_name", escape_html(&member.name)),
            ("organization_name", escape_html(organization_name(org))),
            ("invoice_count", invoices.len().to_string()),
            ("total_due", total_due(invoices).to_string()),
            ("invoice_list", invoice_table_html(invoices)),
            ("payment_methods", payment_methods_html(methods)),
        ],
    );

    EmailMessage {
        to: member.email.clone(),
        to_name: member.name.clone(),
        subject: subject.to_string(),
        html,
    }
}

pub fn upcoming_email(
    member: &Member,
    next_due: CalendarDate,
    methods: &[PaymentMethod],
    org: &OrganizationInfo,
    subject: &str,
) -> EmailMessage {
    let html = format!(
        "<div style=\"font-family: sans-serif; max-width: 600px; margin: 0 auto;\">\
         <p>Dear {name},</p>\
         <p>Your {plan} subscription with {org} is due on <strong>{next_due}</strong> \
         ({rate} per year).</p><h3>How to pay</h3>{methods}<p>Thank you,<br/>{org}</p></div>",
        name = escape_html(&member.name),
        plan = match member.subscription_type {
            crate::models::members::SubscriptionType::Lifetime => "Lifetime",
            crate::models::members::SubscriptionType::YearlyJanazaFund => "Yearly + Janaza Fund",
        },
        org = escape_html(organization_name(org)),
        rate = member.subscription_type.annual_rate(),
        methods = payment_methods_html(methods),
    );

    EmailMessage {
        to: member.email.clone(),
        to_name: member.name.clone(),
        subject: subject.to_string(),
        html,
    }
}

pub fn whatsapp_text(
    member: &Member,
    invoices: &[DueInvoice<'_>],
    methods: &[PaymentMethod],
    org: &OrganizationInfo,
) -> String {
    let mut text = format!(
        "Dear {},\n\nThis is a friendly reminder from *{}* that you have *{}* outstanding invoice(s) totalling *{}*:\n\n",
        member.name,
        organization_name(org),
        invoices.len(),
        total_due(invoices),
    );
    for due in invoices {
        text.push_str(&format!(
            "• {} ({}): {} - {}\n",
            due.invoice.id,
            due.invoice.period,
            due.invoice.amount,
            status_label(due.status)
        ));
    }

    text.push_str("\n*Payment methods*\n");
    let mut any = false;
    for method in active_methods(methods) {
        any = true;
        match method.details.as_deref().filter(|d| !d.is_empty()) {
            Some(details) => text.push_str(&format!("• {}: {}\n", method.name, details)),
            None => text.push_str(&format!("• {}\n", method.name)),
        }
    }
    if !any {
        text.push_str("Please contact the office for payment details.\n");
    }
    text.push_str("\nIf you have already paid, please ignore this message. Thank you.");
    text
}

/// Click-to-chat link for `phone`, or `None` when it has no digits.
pub fn whatsapp_chat_url(phone: &str, text: &str) -> Option<String> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
    Some(format!("https://wa.me/{digits}?text={}", encoded.replace('+', "%20")))
}

/// One-line summary kept in the communication log.
pub fn log_summary(invoices: &[DueInvoice<'_>]) -> String {
    let ids: Vec<&str> = invoices.iter().map(|d| d.invoice.id.as_str()).collect();
    format!(
        "Reminder for {} invoice(s) totalling {}: {}",
        invoices.len(),
        total_due(invoices),
        ids.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{invoice, member};
    use uuid::Uuid;

    fn fps() -> PaymentMethod {
        PaymentMethod {
            id: Uuid::new_v4(),
            name: "FPS".into(),
            description: None,
            details: Some("FPS ID 1234567".into()),
            active: true,
            created_at: None,
        }
    }

    fn org() -> OrganizationInfo {
        OrganizationInfo { name: Some("Community Centre".into()), ..Default::default() }
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let html = render_template(
            "<p>Dear {{member_name}}, you owe {{ total_due }}. {{unknown}} {{",
            &[
                ("member_name", "{{total_due}}".to_string()),
                ("total_due", "$250.00".to_string()),
            ],
        );
        assert_eq!(html, "<p>Dear {{total_due}}, you owe $250.00. {{unknown}} {{");
    }

    #[test]
    fn email_lists_invoices_and_methods() {
        let m = member(1, "Yusuf <Y>", "yusuf@example.org", "$0");
        let a = invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Overdue);
        let b = invoice("INV-2025-002", Some(1), "$100.00", InvoiceStatus::Unpaid);
        let due = [
            DueInvoice { invoice: &a, status: InvoiceStatus::Overdue },
            DueInvoice { invoice: &b, status: InvoiceStatus::Unpaid },
        ];

        let email = outstanding_email(&m, &due, &[fps()], &org(), "Payment reminder", None);
        assert_eq!(email.to, "yusuf@example.org");
        assert!(email.html.contains("Yusuf &lt;Y&gt;"));
        assert!(email.html.contains("<strong>$350.00</strong>"));
        assert!(email.html.contains("INV-2025-002"));
        assert!(email.html.contains("FPS ID 1234567"));
        assert!(!email.html.contains("{{"));
    }

    #[test]
    fn custom_template_is_used() {
        let m = member(1, "Yusuf", "yusuf@example.org", "$0");
        let a = invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Unpaid);
        let due = [DueInvoice { invoice: &a, status: InvoiceStatus::Unpaid }];
        let email = outstanding_email(&m, &due, &[], &org(), "Dues", Some("Hi {{member_name}}, {{total_due}}"));
        assert_eq!(email.html, "Hi Yusuf, $250.00");
    }

    #[test]
    fn whatsapp_text_uses_bold_markup() {
        let m = member(1, "Yusuf", "yusuf@example.org", "$0");
        let a = invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Overdue);
        let due = [DueInvoice { invoice: &a, status: InvoiceStatus::Overdue }];
        let text = whatsapp_text(&m, &due, &[fps()], &org());
        assert!(text.contains("*Community Centre*"));
        assert!(text.contains("*$250.00*"));
        assert!(text.contains("• INV-2025-001 (Nov 2025): $250.00 - Overdue"));
        assert!(text.contains("• FPS: FPS ID 1234567"));
    }

    #[test]
    fn chat_url_keeps_digits_and_encodes_text() {
        let url = whatsapp_chat_url("+852 9123-4567", "Dear A & B *x*").unwrap();
        assert_eq!(url, "https://wa.me/85291234567?text=Dear%20A%20%26%20B%20*x*");
        assert!(whatsapp_chat_url("n/a", "hi").is_none());
    }
}
