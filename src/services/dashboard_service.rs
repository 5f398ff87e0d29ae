// src/services/dashboard_service.rs

use sqlx::PgPool;

use crate::{
    common::{
        date::{CalendarDate, DateRange},
        error::AppError,
    },
    db::{FinanceRepository, MemberRepository, SettingsRepository},
    models::{
        dashboard::{DashboardOverview, ReportStats},
        finance::{Payment, PaymentView},
    },
    services::{
        finance_service::payment_views,
        metrics::{dashboard_metrics, monthly_collections_series, report_stats},
        reminder_messages::organization_name,
        report_export::{report_csv, report_pdf},
    },
};

const RECENT_PAYMENTS: usize = 5;

/// Newest first; undated payments sink to the bottom.
fn recent_payments(mut payments: Vec<Payment>, limit: usize) -> Vec<Payment> {
    payments.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
    payments.truncate(limit);
    payments
}

fn payments_in_range(payments: Vec<Payment>, range: DateRange) -> Vec<PaymentView> {
    let mut rows: Vec<Payment> = payments
        .into_iter()
        .filter(|p| range.contains_opt(p.date.as_ref()))
        .collect();
    rows.sort_by(|a, b| a.date.cmp(&b.date));
    payment_views(rows)
}

#[derive(Clone)]
pub struct DashboardService {
    members: MemberRepository,
    finance: FinanceRepository,
    settings: SettingsRepository,
    font_dir: String,
}

impl DashboardService {
    pub fn new(
        members: MemberRepository,
        finance: FinanceRepository,
        settings: SettingsRepository,
        font_dir: String,
    ) -> Self {
        Self { members, finance, settings, font_dir }
    }

    fn pool(&self) -> &PgPool {
        self.finance.pool()
    }

    pub async fn overview(&self, today: CalendarDate) -> Result<DashboardOverview, AppError> {
        let members = self.members.list(self.pool()).await?;
        let invoices = self.finance.list_invoices(self.pool()).await?;
        let payments = self.finance.list_payments(self.pool()).await?;

        let metrics = dashboard_metrics(&members, &invoices, &payments, today);
        let monthly_collections = monthly_collections_series(&payments, today);

        Ok(DashboardOverview {
            metrics,
            monthly_collections,
            recent_payments: payment_views(recent_payments(payments, RECENT_PAYMENTS)),
        })
    }

    pub async fn report(&self, range: DateRange) -> Result<ReportStats, AppError> {
        let (stats, _) = self.report_with_payments(range).await?;
        Ok(stats)
    }

    async fn report_with_payments(&self, range: DateRange) -> Result<(ReportStats, Vec<PaymentView>), AppError> {
        let members = self.members.list(self.pool()).await?;
        let invoices = self.finance.list_invoices(self.pool()).await?;
        let donations = self.finance.list_donations(self.pool()).await?;
        let payments = self.finance.list_payments(self.pool()).await?;

        let stats = report_stats(&members, &invoices, &donations, &payments, range);
        Ok((stats, payments_in_range(payments, range)))
    }

    pub async fn export_csv(&self, range: DateRange) -> Result<Vec<u8>, AppError> {
        let (stats, rows) = self.report_with_payments(range).await?;
        let bytes = report_csv(&stats, &rows)?;
        tracing::info!(from = %range.from, to = %range.to, rows = rows.len(), "csv report exported");
        Ok(bytes)
    }

    pub async fn export_pdf(&self, range: DateRange) -> Result<Vec<u8>, AppError> {
        let (stats, rows) = self.report_with_payments(range).await?;
        let organization = self.settings.get_organization(self.pool()).await?;
        let title = organization_name(&organization).to_string();

        let font_dir = self.font_dir.clone();
        let bytes = tokio::task::spawn_blocking(move || report_pdf(&stats, &rows, &title, &font_dir))
            .await
            .map_err(|e| AppError::InternalServerError(e.into()))??;

        tracing::info!(from = %range.from, to = %range.to, bytes = bytes.len(), "pdf report exported");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::finance::PaymentStatus,
        services::fixtures::{date, payment},
    };

    #[test]
    fn recent_payments_are_newest_first() {
        let payments = vec![
            payment(Some(1), None, "$10", PaymentStatus::Completed, Some("2025-01-10")),
            payment(Some(2), None, "$20", PaymentStatus::Completed, None),
            payment(Some(3), None, "$30", PaymentStatus::Completed, Some("2025-03-01")),
            payment(Some(4), None, "$40", PaymentStatus::Pending, Some("2025-02-01")),
        ];

        let recent = recent_payments(payments, 3);
        let members: Vec<_> = recent.iter().map(|p| p.member.as_str()).collect();
        assert_eq!(members, ["Member 3", "Member 4", "Member 1"]);
    }

    #[test]
    fn range_filter_keeps_dated_rows_in_order() {
        let payments = vec![
            payment(Some(1), None, "$10", PaymentStatus::Completed, Some("2025-06-10")),
            payment(Some(2), None, "$20", PaymentStatus::Completed, None),
            payment(Some(3), None, "$30", PaymentStatus::Completed, Some("2025-02-01")),
            payment(Some(4), None, "$40", PaymentStatus::Completed, Some("2024-12-31")),
        ];
        let range = DateRange::new(date("2025-01-01"), date("2025-12-31"));

        let rows = payments_in_range(payments, range);
        let members: Vec<_> = rows.iter().map(|r| r.payment.member.as_str()).collect();
        assert_eq!(members, ["Member 3", "Member 1"]);
    }
}
