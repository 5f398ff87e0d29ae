// src/services/communication_service.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, error::AppError},
    db::{CommunicationRepository, FinanceRepository, MemberRepository, SettingsRepository},
    models::communications::{
        BulkDispatchReport, CommunicationLogEntry, DispatchOutcome, ReminderLogEntry, RetryReport,
    },
    services::{
        email::EmailTransport,
        reconciliation::resolve_invoice_member,
        reminder_messages::{organization_name, EmailMessage},
        reminder_service::{ReminderCoordinator, ReminderSnapshot},
    },
};

/// Loads fresh snapshots from the database and hands them to the coordinator.
#[derive(Clone)]
pub struct CommunicationService {
    members: MemberRepository,
    finance: FinanceRepository,
    settings: SettingsRepository,
    logs: CommunicationRepository,
    coordinator: ReminderCoordinator,
    transport: Arc<dyn EmailTransport>,
}

impl CommunicationService {
    pub fn new(
        members: MemberRepository,
        finance: FinanceRepository,
        settings: SettingsRepository,
        logs: CommunicationRepository,
        coordinator: ReminderCoordinator,
        transport: Arc<dyn EmailTransport>,
    ) -> Self {
        Self { members, finance, settings, logs, coordinator, transport }
    }

    pub async fn snapshot(&self, today: CalendarDate) -> Result<ReminderSnapshot, AppError> {
        let pool = self.logs.pool();
        Ok(ReminderSnapshot {
            members: self.members.list(pool).await?,
            invoices: self.finance.list_invoices(pool).await?,
            payments: self.finance.list_payments(pool).await?,
            payment_methods: self.settings.list_payment_methods(pool).await?,
            organization: self.settings.get_organization(pool).await?,
            email_settings: self.settings.get_email_settings(pool).await?,
            today: Some(today),
        })
    }

    pub async fn email_member(&self, member_id: Uuid) -> Result<DispatchOutcome, AppError> {
        let snap = self.snapshot(CalendarDate::today()).await?;
        self.coordinator.email_member(&snap, member_id).await
    }

    pub async fn email_all(&self) -> Result<BulkDispatchReport, AppError> {
        let snap = self.snapshot(CalendarDate::today()).await?;
        self.coordinator.email_all(&snap).await
    }

    /// Emails the member the invoice belongs to, resolved by id or by name/email.
    pub async fn email_invoice_member(&self, invoice_id: &str) -> Result<DispatchOutcome, AppError> {
        let snap = self.snapshot(CalendarDate::today()).await?;
        let invoice = snap
            .invoices
            .iter()
            .find(|inv| inv.id == invoice_id)
            .ok_or(AppError::NotFound("Invoice"))?;
        let member_id = resolve_invoice_member(invoice, &snap.members)
            .map(|m| m.id)
            .ok_or(AppError::NotFound("Member"))?;

        self.coordinator.email_member(&snap, member_id).await
    }

    pub async fn whatsapp_member(&self, member_id: Uuid) -> Result<DispatchOutcome, AppError> {
        let snap = self.snapshot(CalendarDate::today()).await?;
        self.coordinator.whatsapp_member(&snap, member_id).await
    }

    pub async fn whatsapp_all(&self) -> Result<BulkDispatchReport, AppError> {
        let snap = self.snapshot(CalendarDate::today()).await?;
        self.coordinator.whatsapp_all(&snap).await
    }

    /// Re-sends failed reminders that were not retried yet. Retried entries are
    /// marked so they are not picked up twice.
    pub async fn retry_failed(&self, ids: Option<&[Uuid]>) -> Result<RetryReport, AppError> {
        let failed = self.logs.pending_failures(self.logs.pool(), ids).await?;
        if failed.is_empty() {
            return Ok(RetryReport::default());
        }

        let snap = self.snapshot(CalendarDate::today()).await?;
        let report = self.coordinator.retry_failed(&snap, &failed).await;

        let retried: Vec<Uuid> = failed.iter().map(|entry| entry.id).collect();
        self.logs.mark_retried(self.logs.pool(), &retried).await?;

        Ok(report)
    }

    pub async fn run_automated(&self, today: CalendarDate) -> Result<BulkDispatchReport, AppError> {
        let snap = self.snapshot(today).await?;
        Ok(self.coordinator.run_automated(&snap).await)
    }

    pub async fn automated_reminders_enabled(&self) -> Result<bool, AppError> {
        let settings = self.settings.get_email_settings(self.logs.pool()).await?;
        Ok(settings.automated_reminders)
    }

    pub async fn list_communications(&self) -> Result<Vec<CommunicationLogEntry>, AppError> {
        self.logs.list_communications(self.logs.pool()).await
    }

    pub async fn list_reminders(&self) -> Result<Vec<ReminderLogEntry>, AppError> {
        self.logs.list_reminders(self.logs.pool()).await
    }

    /// Second phase of a WhatsApp dispatch: Requested -> Delivered.
    pub async fn confirm_communication(&self, id: Uuid) -> Result<CommunicationLogEntry, AppError> {
        if let Some(entry) = self.logs.confirm_delivery(self.logs.pool(), id).await? {
            tracing::info!(communication_id = %id, "delivery confirmed");
            return Ok(entry);
        }

        match self.logs.find_communication(self.logs.pool(), id).await? {
            None => Err(AppError::NotFound("Communication")),
            Some(entry) => Err(AppError::InvalidInput(format!(
                "Only requested messages can be confirmed (current status: {:?}).",
                entry.status
            ))),
        }
    }

    pub async fn send_test_email(&self, to: &str) -> Result<(), AppError> {
        let pool = self.logs.pool();
        let settings = self.settings.get_email_settings(pool).await?;
        let organization = self.settings.get_organization(pool).await?;
        let org = organization_name(&organization);

        let message = EmailMessage {
            to: to.trim().to_string(),
            to_name: to.trim().to_string(),
            subject: format!("{org}: test email"),
            html: format!(
                "<p>This is a test email from {org}.</p><p>Your email settings are working.</p>"
            ),
        };

        self.transport.send(&settings, &message).await?;
        tracing::info!(to = %message.to, "test email sent");
        Ok(())
    }
}

