// src/services/report_export.rs

use genpdf::{elements, style, Element};

use crate::{
    common::error::AppError,
    models::{dashboard::ReportStats, finance::PaymentView},
};

const FONT_FAMILY: &str = "Roboto";

fn pdf_error(e: impl ToString) -> AppError {
    AppError::InternalServerError(anyhow::Error::msg(e.to_string()))
}

fn summary_rows(stats: &ReportStats) -> Vec<(&'static str, String)> {
    vec![
        ("From", stats.from.to_string()),
        ("To", stats.to.to_string()),
        ("Collected", stats.collected.to_string()),
        ("Payments", stats.payments_total.to_string()),
        ("Donations", stats.donations_total.to_string()),
        ("Expected", stats.expected.to_string()),
        ("Outstanding", stats.outstanding.to_string()),
        ("Average per member", stats.average_per_member.to_string()),
        ("Collection rate", format!("{:.1}%", stats.collection_rate)),
        ("Active members", stats.active_members.to_string()),
        ("Payment count", stats.payments_count.to_string()),
        ("Donation count", stats.donations_count.to_string()),
    ]
}

/// Summary block, method mix, then one row per payment in range.
pub fn report_csv(stats: &ReportStats, payments: &[PaymentView]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());

    writer.write_record(["Metric", "Value"])?;
    for (label, value) in summary_rows(stats) {
        writer.write_record([label, value.as_str()])?;
    }

    writer.write_record(["Method", "Payments"])?;
    for entry in &stats.method_mix {
        writer.write_record([entry.label.clone(), entry.value.to_string()])?;
    }

    writer.write_record(["Date", "Member", "Invoice", "Amount", "Method", "Status", "Reference"])?;
    for row in payments {
        let p = &row.payment;
        writer.write_record([
            p.date.map(|d| d.to_string()).unwrap_or_default(),
            p.member.clone(),
            p.invoice_id.clone().unwrap_or_default(),
            p.amount.to_string(),
            row.display_method.clone(),
            format!("{:?}", p.status),
            p.reference.clone().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))
}

pub fn report_pdf(
    stats: &ReportStats,
    payments: &[PaymentView],
    organization: &str,
    font_dir: &str,
) -> Result<Vec<u8>, AppError> {
    let font_family = genpdf::fonts::from_files(font_dir, FONT_FAMILY, None)
        .map_err(|_| AppError::FontNotFound(format!("{FONT_FAMILY} fonts not found in {font_dir}")))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Collections report {} to {}", stats.from, stats.to));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    doc.push(elements::Paragraph::new(organization).styled(style::Style::new().bold().with_font_size(18)));
    doc.push(
        elements::Paragraph::new(format!("Collections report: {} to {}", stats.from, stats.to))
            .styled(style::Style::new().with_font_size(12)),
    );
    doc.push(elements::Break::new(1.5));

    let bold = style::Style::new().bold();

    let mut summary = elements::TableLayout::new(vec![3, 2]);
    summary.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    for (label, value) in summary_rows(stats).into_iter().skip(2) {
        summary
            .row()
            .element(elements::Paragraph::new(label).styled(bold))
            .element(elements::Paragraph::new(value))
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(summary);
    doc.push(elements::Break::new(1.5));

    if !stats.method_mix.is_empty() {
        doc.push(elements::Paragraph::new("Payment methods").styled(style::Style::new().bold().with_font_size(14)));
        for entry in &stats.method_mix {
            doc.push(elements::Paragraph::new(format!("{}: {}", entry.label, entry.value)));
        }
        doc.push(elements::Break::new(1.5));
    }

    doc.push(elements::Paragraph::new("Payments").styled(style::Style::new().bold().with_font_size(14)));
    let mut table = elements::TableLayout::new(vec![2, 4, 3, 2, 3, 2]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    table
        .row()
        .element(elements::Paragraph::new("Date").styled(bold))
        .element(elements::Paragraph::new("Member").styled(bold))
        .element(elements::Paragraph::new("Invoice").styled(bold))
        .element(elements::Paragraph::new("Amount").styled(bold))
        .element(elements::Paragraph::new("Method").styled(bold))
        .element(elements::Paragraph::new("Status").styled(bold))
        .push()
        .map_err(pdf_error)?;

    for row in payments {
        let p = &row.payment;
        table
            .row()
            .element(elements::Paragraph::new(p.date.map(|d| d.to_string()).unwrap_or_default()))
            .element(elements::Paragraph::new(p.member.clone()))
            .element(elements::Paragraph::new(p.invoice_id.clone().unwrap_or_default()))
            .element(elements::Paragraph::new(p.amount.to_string()))
            .element(elements::Paragraph::new(row.display_method.clone()))
            .element(elements::Paragraph::new(format!("{:?}", p.status)))
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(table);

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::money::Money,
        models::{dashboard::MethodMixEntry, finance::PaymentStatus},
        services::{
            finance_service::payment_views,
            fixtures::{date, payment},
        },
    };

    fn stats() -> ReportStats {
        ReportStats {
            from: date("2025-01-01"),
            to: date("2025-12-31"),
            collected: Money::from_major(350),
            payments_total: Money::from_major(250),
            donations_total: Money::from_major(100),
            expected: Money::from_major(500),
            outstanding: Money::from_major(250),
            average_per_member: Money::from_major(175),
            collection_rate: 70.0,
            payments_count: 1,
            donations_count: 1,
            active_members: 2,
            method_mix: vec![MethodMixEntry { label: "Online Payment".into(), value: 1 }],
        }
    }

    #[test]
    fn csv_contains_summary_and_payment_rows() {
        let rows = payment_views(vec![payment(
            Some(1),
            Some("INV-2025-001"),
            "$250.00",
            PaymentStatus::Completed,
            Some("2025-03-01"),
        )]);
        let bytes = report_csv(&stats(), &rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Metric,Value\n"));
        assert!(text.contains("Collected,$350.00\n"));
        assert!(text.contains("Collection rate,70.0%\n"));
        assert!(text.contains("Online Payment,1\n"));
        let expected = format!(
            "2025-03-01,Member 1,INV-2025-001,$250.00,{},Completed,\n",
            rows[0].display_method
        );
        assert!(text.contains(&expected));
    }

    #[test]
    fn pdf_without_fonts_is_reported() {
        let err = report_pdf(&stats(), &[], "Community Centre", "/nonexistent-font-dir").unwrap_err();
        assert!(matches!(err, AppError::FontNotFound(_)));
    }
}
