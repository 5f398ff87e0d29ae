// src/services/scheduler.rs

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::{
    common::{date::CalendarDate, error::AppError},
    services::{communication_service::CommunicationService, finance_service::FinanceService},
};

/// Periodic upkeep: overdue flags, cached balances, then automated reminders
/// when they are switched on in the email settings.
pub async fn run_reminder_scheduler(
    finance: FinanceService,
    communications: CommunicationService,
    every: Duration,
) {
    tracing::info!(interval_secs = every.as_secs(), "reminder scheduler started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if let Err(e) = run_once(&finance, &communications, CalendarDate::today()).await {
            tracing::error!(error = %e, "scheduler pass failed");
        }
    }
}

async fn run_once(
    finance: &FinanceService,
    communications: &CommunicationService,
    today: CalendarDate,
) -> Result<(), AppError> {
    finance.mark_overdue(today).await?;
    finance.resync_all_balances().await?;

    if !communications.automated_reminders_enabled().await? {
        return Ok(());
    }

    let report = communications.run_automated(today).await?;
    if report.requested > 0 {
        tracing::info!(
            requested = report.requested,
            succeeded = report.succeeded,
            failed = report.failed,
            "scheduler: automated reminders sent"
        );
    }
    Ok(())
}
