// src/models/dashboard.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::common::{
    date::{CalendarDate, DateRange},
    money::Money,
};
use crate::models::finance::PaymentView;

// 1. Top cards
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    #[schema(value_type = String)]
    pub total_collected: Money,
    #[schema(value_type = String)]
    pub collected_this_month: Money,
    #[schema(value_type = String)]
    pub collected_this_year: Money,
    #[schema(value_type = String)]
    pub total_outstanding: Money,
    pub overdue_member_count: usize,
    #[schema(value_type = String)]
    pub expected_annual: Money,
    pub member_count: usize,
}

// 2. Collections bar chart (trailing 12 months)
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCollection {
    #[schema(example = "Nov 2025")]
    pub label: String,
    pub year: i32,
    pub month: u32,
    #[schema(value_type = String)]
    pub value: Money,
    pub count: usize,
    /// Bar height relative to the busiest month, 0..=100.
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub metrics: DashboardMetrics,
    pub monthly_collections: Vec<MonthlyCollection>,
    pub recent_payments: Vec<PaymentView>,
}

// 3. Reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MethodMixEntry {
    #[schema(example = "Online Payment")]
    pub label: String,
    pub value: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    #[schema(value_type = String, format = Date)]
    pub from: CalendarDate,
    #[schema(value_type = String, format = Date)]
    pub to: CalendarDate,

    #[schema(value_type = String)]
    pub collected: Money,
    #[schema(value_type = String)]
    pub payments_total: Money,
    #[schema(value_type = String)]
    pub donations_total: Money,
    #[schema(value_type = String)]
    pub expected: Money,
    #[schema(value_type = String)]
    pub outstanding: Money,
    #[schema(value_type = String)]
    pub average_per_member: Money,

    /// Percent of `expected` collected, 0 when nothing was expected.
    pub collection_rate: f64,

    pub payments_count: usize,
    pub donations_count: usize,
    pub active_members: usize,

    pub method_mix: Vec<MethodMixEntry>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    #[param(example = "2025-01-01")]
    pub from: String,
    #[param(example = "2025-12-31")]
    pub to: String,
}

impl ReportQuery {
    pub fn range(&self) -> Option<DateRange> {
        let from = CalendarDate::parse_lenient(&self.from)?;
        let to = CalendarDate::parse_lenient(&self.to)?;
        let range = DateRange::new(from, to);
        range.is_valid().then_some(range)
    }
}
