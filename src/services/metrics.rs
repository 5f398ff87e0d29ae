// src/services/metrics.rs
//
// Dashboard and report aggregates, recomputed from fresh snapshots on every
// request. Aggregation is best-effort: undated records fall out of dated
// buckets and unreadable amounts already arrived as zero.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::{
    common::{
        date::{CalendarDate, DateRange},
        money::Money,
    },
    models::{
        dashboard::{DashboardMetrics, MethodMixEntry, MonthlyCollection, ReportStats},
        finance::{Donation, Invoice, InvoiceStatus, Payment},
        members::{Member, MemberStatus},
    },
    services::{
        payment_methods::display_method,
        reconciliation::{resolve_invoice_member, SettledInvoices},
    },
};

/// Flat per-member yearly expectation shown on the dashboard card. Differs
/// from the per-subscription rates used by reports; both are kept as-is.
pub const EXPECTED_ANNUAL_PER_MEMBER: i64 = 800;

/// Rate used when per-member expectations sum to zero.
pub const FALLBACK_ANNUAL_RATE: i64 = 250;

pub const NO_PAYMENTS_LABEL: &str = "No payments";

const DAYS_PER_YEAR: f64 = 365.25;

fn default_member_start() -> CalendarDate {
    CalendarDate::from_ymd(2025, 1, 1).unwrap_or_else(|| CalendarDate::new(NaiveDate::MIN))
}

fn settled(payments: &[Payment]) -> impl Iterator<Item = &Payment> {
    payments.iter().filter(|p| p.status.is_settled())
}

/// Sum of cached member balances that are positive.
pub fn cached_outstanding(members: &[Member]) -> Money {
    members
        .iter()
        .map(|m| m.balance)
        .filter(Money::is_positive)
        .sum()
}

pub fn dashboard_metrics(
    members: &[Member],
    invoices: &[Invoice],
    payments: &[Payment],
    today: CalendarDate,
) -> DashboardMetrics {
    let mut total_collected = Money::ZERO;
    let mut collected_this_month = Money::ZERO;
    let mut collected_this_year = Money::ZERO;

    for payment in settled(payments) {
        total_collected += payment.amount;
        if let Some(date) = payment.date {
            if date.year() == today.year() {
                collected_this_year += payment.amount;
                if date.same_month(&today) {
                    collected_this_month += payment.amount;
                }
            }
        }
    }

    let settled_invoices = SettledInvoices::from_payments(payments);
    let overdue_members: HashSet<_> = invoices
        .iter()
        .filter(|inv| settled_invoices.status_of(inv) == InvoiceStatus::Overdue)
        .filter_map(|inv| resolve_invoice_member(inv, members))
        .map(|m| m.id)
        .collect();

    DashboardMetrics {
        total_collected,
        collected_this_month,
        collected_this_year,
        total_outstanding: cached_outstanding(members),
        overdue_member_count: overdue_members.len(),
        expected_annual: Money::from_major(members.len() as i64 * EXPECTED_ANNUAL_PER_MEMBER),
        member_count: members.len(),
    }
}

/// Twelve calendar months ending at `today`'s month, oldest first.
pub fn monthly_collections_series(payments: &[Payment], today: CalendarDate) -> Vec<MonthlyCollection> {
    let end_index = today.year() * 12 + today.month() as i32 - 1;

    let mut buckets: Vec<(i32, u32, Money, usize)> = (0..12)
        .map(|offset| {
            let index = end_index - 11 + offset;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1, Money::ZERO, 0)
        })
        .collect();

    for payment in settled(payments) {
        let Some(date) = payment.date else { continue };
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|(y, m, _, _)| *y == date.year() && *m == date.month())
        {
            bucket.2 += payment.amount;
            bucket.3 += 1;
        }
    }

    let peak = buckets
        .iter()
        .map(|(_, _, value, _)| value.minor_units())
        .max()
        .unwrap_or(0)
        .max(1);

    buckets
        .into_iter()
        .map(|(year, month, value, count)| {
            let label = NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format("%b %Y").to_string())
                .unwrap_or_default();
            let percentage = (value.minor_units().max(0) as f64 / peak as f64 * 100.0).clamp(0.0, 100.0);
            MonthlyCollection { label, year, month, value, count, percentage }
        })
        .collect()
}

fn whole_years(days: i64) -> i64 {
    if days <= 0 {
        return 0;
    }
    (days as f64 / DAYS_PER_YEAR).ceil() as i64
}

fn expected_for_member(member: &Member, range: &DateRange) -> Money {
    let joined = member
        .created_at
        .map(|ts| CalendarDate::new(ts.date_naive()))
        .unwrap_or_else(default_member_start);
    let start = joined.max(range.from);
    let years = whole_years(start.days_inclusive(&range.to));
    let rate = member.subscription_type.annual_rate();
    Money::from_minor(rate.minor_units().saturating_mul(years))
}

fn method_mix(in_range: &[&Payment]) -> Vec<MethodMixEntry> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for payment in in_range {
        *counts.entry(display_method(payment)).or_default() += 1;
    }
    if counts.is_empty() {
        return vec![MethodMixEntry { label: NO_PAYMENTS_LABEL.to_string(), value: 0 }];
    }
    let mut mix: Vec<MethodMixEntry> = counts
        .into_iter()
        .map(|(label, value)| MethodMixEntry { label, value })
        .collect();
    mix.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
    mix
}

pub fn report_stats(
    members: &[Member],
    _invoices: &[Invoice],
    donations: &[Donation],
    payments: &[Payment],
    range: DateRange,
) -> ReportStats {
    let in_range_payments: Vec<&Payment> = payments
        .iter()
        .filter(|p| range.contains_opt(p.date.as_ref()))
        .collect();
    let in_range_donations: Vec<&Donation> = donations
        .iter()
        .filter(|d| range.contains_opt(d.date.as_ref()))
        .collect();

    let payments_total: Money = in_range_payments
        .iter()
        .filter(|p| p.status.is_settled())
        .map(|p| p.amount)
        .sum();
    let donations_total: Money = in_range_donations.iter().map(|d| d.amount).sum();
    let collected = payments_total + donations_total;

    let active: Vec<&Member> = members
        .iter()
        .filter(|m| m.status == MemberStatus::Active)
        .collect();

    let mut expected: Money = active.iter().map(|m| expected_for_member(m, &range)).sum();
    if expected.is_zero() && !active.is_empty() {
        let years = whole_years(range.from.days_inclusive(&range.to));
        expected = Money::from_major(active.len() as i64 * FALLBACK_ANNUAL_RATE * years);
    }

    let average_per_member = if active.is_empty() {
        Money::ZERO
    } else {
        Money::from_decimal_whole(collected.to_decimal() / Decimal::from(active.len() as u64))
    };

    let collection_rate = if expected.is_positive() {
        let rate = collected.to_decimal() / expected.to_decimal() * Decimal::ONE_HUNDRED;
        rate.round_dp(1).to_f64().unwrap_or(0.0)
    } else {
        0.0
    };

    ReportStats {
        from: range.from,
        to: range.to,
        collected,
        payments_total,
        donations_total,
        expected,
        outstanding: cached_outstanding(members),
        average_per_member,
        collection_rate,
        payments_count: in_range_payments.len(),
        donations_count: in_range_donations.len(),
        active_members: active.len(),
        method_mix: method_mix(&in_range_payments),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{finance::PaymentStatus, members::SubscriptionType};
    use crate::services::fixtures::{date, donation, invoice, member, payment};
    use chrono::{TimeZone, Utc};

    fn range(from: &str, to: &str) -> DateRange {
        DateRange::new(date(from), date(to))
    }

    #[test]
    fn dashboard_buckets_settled_payments_by_date() {
        let payments = vec![
            payment(Some(1), None, "$100.00", PaymentStatus::Completed, Some("2025-11-03")),
            payment(Some(1), None, "$50.00", PaymentStatus::Paid, Some("2025-02-10")),
            payment(Some(2), None, "$25.00", PaymentStatus::Paid, Some("2024-11-20")),
            payment(Some(2), None, "$999.00", PaymentStatus::Pending, Some("2025-11-04")),
            payment(Some(2), None, "$10.00", PaymentStatus::Completed, None),
        ];
        let metrics = dashboard_metrics(&[], &[], &payments, date("2025-11-15"));
        assert_eq!(metrics.total_collected, Money::from_major(185));
        assert_eq!(metrics.collected_this_year, Money::from_major(150));
        assert_eq!(metrics.collected_this_month, Money::from_major(100));
    }

    #[test]
    fn dashboard_uses_cached_balances_and_counts_overdue_members() {
        let members = vec![
            member(1, "Yusuf", "yusuf@example.org", "$250.00 Outstanding"),
            member(2, "Amina", "amina@example.org", "$0"),
            member(3, "Bilal", "bilal@example.org", "$100 Outstanding"),
        ];
        let mut legacy = invoice("d", None, "$40.00", InvoiceStatus::Overdue);
        legacy.member_name = "Bilal".into();
        let invoices = vec![
            invoice("a", Some(1), "$250.00", InvoiceStatus::Overdue),
            invoice("b", Some(1), "$250.00", InvoiceStatus::Overdue),
            invoice("c", Some(2), "$250.00", InvoiceStatus::Overdue),
            legacy,
            invoice("e", Some(99), "$250.00", InvoiceStatus::Overdue),
        ];
        // Member 2's overdue invoice was actually paid.
        let payments = vec![payment(Some(2), Some("c"), "$250.00", PaymentStatus::Completed, None)];

        let metrics = dashboard_metrics(&members, &invoices, &payments, date("2025-11-15"));
        assert_eq!(metrics.total_outstanding, Money::from_major(350));
        assert_eq!(metrics.overdue_member_count, 2);
        assert_eq!(metrics.expected_annual, Money::from_major(2_400));
        assert_eq!(metrics.member_count, 3);
    }

    #[test]
    fn series_has_twelve_months_oldest_first() {
        let payments = vec![
            payment(Some(1), None, "$200.00", PaymentStatus::Completed, Some("2025-11-01")),
            payment(Some(1), None, "$50.00", PaymentStatus::Paid, Some("2025-03-31")),
            payment(Some(1), None, "$50.00", PaymentStatus::Paid, Some("2025-03-01")),
            payment(Some(1), None, "$70.00", PaymentStatus::Paid, Some("2024-11-30")),
            payment(Some(1), None, "$70.00", PaymentStatus::Rejected, Some("2025-10-30")),
        ];
        let series = monthly_collections_series(&payments, date("2025-11-15"));

        assert_eq!(series.len(), 12);
        assert_eq!(series[0].label, "Dec 2024");
        assert_eq!(series[11].label, "Nov 2025");
        assert_eq!(series[11].value, Money::from_major(200));
        assert_eq!(series[11].percentage, 100.0);

        let march = series.iter().find(|m| m.month == 3).unwrap();
        assert_eq!(march.count, 2);
        assert_eq!(march.percentage, 50.0);
        assert!(series.iter().all(|m| (0.0..=100.0).contains(&m.percentage)));
        assert_eq!(series.iter().map(|m| m.count).sum::<usize>(), 3);
    }

    #[test]
    fn series_wraps_year_boundary_and_handles_empty_input() {
        let series = monthly_collections_series(&[], date("2026-01-10"));
        assert_eq!(series.len(), 12);
        assert_eq!((series[0].year, series[0].month), (2025, 2));
        assert_eq!((series[11].year, series[11].month), (2026, 1));
        assert!(series.iter().all(|m| m.percentage == 0.0));
    }

    #[test]
    fn series_peak_is_full_height_even_below_one_unit() {
        let payments = vec![payment(Some(1), None, "$0.40", PaymentStatus::Paid, Some("2025-11-01"))];
        let series = monthly_collections_series(&payments, date("2025-11-15"));
        assert_eq!(series[11].percentage, 100.0);
    }

    #[test]
    fn report_on_empty_collections() {
        let stats = report_stats(&[], &[], &[], &[], range("2025-01-01", "2025-12-31"));
        assert_eq!(stats.collected, Money::ZERO);
        assert_eq!(stats.expected, Money::ZERO);
        assert_eq!(stats.average_per_member, Money::ZERO);
        assert_eq!(
            stats.method_mix,
            vec![MethodMixEntry { label: "No payments".into(), value: 0 }]
        );
    }

    #[test]
    fn report_collects_single_january_payment() {
        let payments = vec![payment(Some(1), None, "$100.00", PaymentStatus::Paid, Some("2025-01-15"))];
        let stats = report_stats(&[], &[], &[], &payments, range("2025-01-01", "2025-01-31"));
        assert_eq!(stats.collected, Money::from_major(100));
        assert_eq!(stats.payments_count, 1);
        assert_eq!(
            stats.method_mix,
            vec![MethodMixEntry { label: "Online Payment".into(), value: 1 }]
        );
    }

    #[test]
    fn report_average_rounds_the_exact_quotient() {
        let members = vec![
            member(1, "Yusuf", "yusuf@example.org", "$0"),
            member(2, "Amina", "amina@example.org", "$0"),
        ];
        let payments = vec![payment(Some(1), None, "$200.99", PaymentStatus::Completed, Some("2025-01-15"))];
        let stats = report_stats(&members, &[], &[], &payments, range("2025-01-01", "2025-01-31"));

        assert_eq!(stats.active_members, 2);
        assert_eq!(stats.average_per_member, Money::from_major(100));
    }

    #[test]
    fn report_window_is_inclusive_and_adds_donations() {
        let payments = vec![
            payment(Some(1), None, "$10.00", PaymentStatus::Completed, Some("2025-01-31T22:00:00Z")),
            payment(Some(1), None, "$20.00", PaymentStatus::Paid, Some("2025-01-01")),
            payment(Some(1), None, "$40.00", PaymentStatus::Pending, Some("2025-01-10")),
            payment(Some(1), None, "$80.00", PaymentStatus::Paid, Some("2025-02-01")),
            payment(Some(1), None, "$80.00", PaymentStatus::Paid, None),
        ];
        let donations = vec![donation("$5.00", Some("2025-01-20")), donation("$500", None)];
        let stats = report_stats(&[], &[], &donations, &payments, range("2025-01-01", "2025-01-31"));

        assert_eq!(stats.payments_total, Money::from_major(30));
        assert_eq!(stats.donations_total, Money::from_major(5));
        assert_eq!(stats.collected, Money::from_major(35));
        // the pending one is still an in-range payment for the method mix
        assert_eq!(stats.payments_count, 3);
        assert_eq!(stats.donations_count, 1);
    }

    #[test]
    fn report_expected_uses_subscription_rates() {
        let mut lifetime = member(1, "Yusuf", "yusuf@example.org", "$0");
        lifetime.created_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let mut yearly = member(2, "Amina", "amina@example.org", "$0");
        yearly.subscription_type = SubscriptionType::YearlyJanazaFund;
        let mut inactive = member(3, "Bilal", "bilal@example.org", "$0");
        inactive.status = MemberStatus::Inactive;

        let payments = vec![payment(Some(1), None, "$301.00", PaymentStatus::Paid, Some("2025-05-01"))];
        let stats = report_stats(
            &[lifetime, yearly, inactive],
            &[],
            &[],
            &payments,
            range("2025-01-01", "2025-12-31"),
        );

        assert_eq!(stats.active_members, 2);
        assert_eq!(stats.expected, Money::from_major(750));
        assert_eq!(stats.average_per_member, Money::from_major(151));
        assert_eq!(stats.collection_rate, 40.1);
    }

    #[test]
    fn report_expected_falls_back_when_members_join_after_window() {
        let mut late = member(1, "Yusuf", "yusuf@example.org", "$0");
        late.created_at = Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
        let stats = report_stats(&[late], &[], &[], &[], range("2025-01-01", "2025-06-30"));
        assert_eq!(stats.expected, Money::from_major(250));
    }

    #[test]
    fn report_method_mix_groups_normalized_methods() {
        let mut cash = payment(Some(1), None, "$10.00", PaymentStatus::Paid, Some("2025-01-02"));
        cash.paid_to_admin = true;
        let mut cheque = payment(Some(1), None, "$10.00", PaymentStatus::Paid, Some("2025-01-03"));
        cheque.method = Some("Cheque".into());
        let mut bank = payment(Some(1), None, "$10.00", PaymentStatus::Paid, Some("2025-01-04"));
        bank.method = Some("Bank Transfer".into());
        let fps = payment(Some(1), None, "$10.00", PaymentStatus::Paid, Some("2025-01-05"));

        let stats = report_stats(&[], &[], &[], &[cash, cheque, bank, fps], range("2025-01-01", "2025-01-31"));
        let mix: Vec<(&str, usize)> = stats.method_mix.iter().map(|e| (e.label.as_str(), e.value)).collect();
        assert_eq!(mix, vec![("Online Payment", 2), ("Cash", 1), ("Cheque", 1)]);
    }
}
