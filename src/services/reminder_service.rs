// src/services/reminder_service.rs
//
// Reminder dispatch: picks the members who owe money, renders the channel
// message, hands it to the transport and records the outcome. Reads only the
// snapshot it is given; writes only through the communication sink.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::{date::CalendarDate, error::AppError, money::Money},
    models::{
        communications::{
            BulkDispatchReport, Channel, CommunicationLogEntry, CommunicationStatus, DispatchOutcome,
            NewCommunicationLog, NewReminderLog, ReminderLogEntry, ReminderStatus,
            ReminderType, RetryReport,
        },
        finance::{Invoice, InvoiceStatus, Payment},
        members::Member,
        settings::{EmailSettings, OrganizationInfo, PaymentMethod},
    },
    services::{
        email::EmailTransport,
        reconciliation::{invoice_belongs_to, SettledInvoices},
        reminder_messages::{self as messages, DueInvoice, EmailMessage},
    },
};

/// Where dispatch outcomes are recorded.
#[async_trait]
pub trait CommunicationSink: Send + Sync {
    async fn log_communication(&self, entry: NewCommunicationLog) -> Result<CommunicationLogEntry, AppError>;
    async fn log_reminder(&self, entry: NewReminderLog) -> Result<(), AppError>;
    /// Reminders sent successfully on `day`.
    async fn reminders_sent_on(&self, day: CalendarDate) -> Result<Vec<ReminderLogEntry>, AppError>;
}

/// Everything one dispatch needs, loaded fresh per request.
#[derive(Debug, Clone, Default)]
pub struct ReminderSnapshot {
    pub members: Vec<Member>,
    pub invoices: Vec<Invoice>,
    pub payments: Vec<Payment>,
    pub payment_methods: Vec<PaymentMethod>,
    pub organization: OrganizationInfo,
    pub email_settings: EmailSettings,
    pub today: Option<CalendarDate>,
}

impl ReminderSnapshot {
    fn member(&self, id: Uuid) -> Result<&Member, AppError> {
        self.members.iter().find(|m| m.id == id).ok_or(AppError::NotFound("Member"))
    }

    /// The member's Unpaid/Overdue invoices by effective status.
    pub fn due_invoices(&self, member: &Member) -> Vec<DueInvoice<'_>> {
        let settled = SettledInvoices::from_payments(&self.payments);
        self.invoices
            .iter()
            .filter(|inv| invoice_belongs_to(inv, member))
            .map(|invoice| DueInvoice { invoice, status: settled.status_of(invoice) })
            .filter(|due| due.status.is_outstanding())
            .collect()
    }

    fn reminder_type(&self, invoices: &[DueInvoice<'_>]) -> ReminderType {
        let past_due = |due: &DueInvoice<'_>| match (due.invoice.due, self.today) {
            (Some(due_on), Some(today)) => due_on < today,
            _ => false,
        };
        if invoices.iter().any(|d| d.status == InvoiceStatus::Overdue || past_due(d)) {
            ReminderType::Overdue
        } else {
            ReminderType::Upcoming
        }
    }
}

fn already_reminded(sent: &[ReminderLogEntry], member: &Member, reminder_type: ReminderType) -> bool {
    sent.iter().any(|entry| {
        entry.reminder_type == reminder_type
            && (entry.member_id == Some(member.id) || entry.member_email.eq_ignore_ascii_case(&member.email))
    })
}

fn has_phone(member: &Member) -> bool {
    member
        .phone
        .as_deref()
        .is_some_and(|p| p.chars().any(|c| c.is_ascii_digit()))
}

#[derive(Clone)]
pub struct ReminderCoordinator {
    transport: Arc<dyn EmailTransport>,
    sink: Arc<dyn CommunicationSink>,
    whatsapp_stagger: Duration,
}

impl ReminderCoordinator {
    pub fn new(
        transport: Arc<dyn EmailTransport>,
        sink: Arc<dyn CommunicationSink>,
        whatsapp_stagger: Duration,
    ) -> Self {
        Self { transport, sink, whatsapp_stagger }
    }

    // =========================================================================
    //  EMAIL
    // =========================================================================

    /// Emails one member. A transport failure is logged and then returned.
    pub async fn email_member(&self, snap: &ReminderSnapshot, member_id: Uuid) -> Result<DispatchOutcome, AppError> {
        let member = snap.member(member_id)?;
        let invoices = snap.due_invoices(member);
        if invoices.is_empty() {
            return Err(AppError::NoOutstandingInvoices);
        }

        let outcome = self.email_outstanding(snap, member, &invoices).await;
        match outcome.status {
            CommunicationStatus::Failed => Err(AppError::Transport(
                outcome.error.unwrap_or_else(|| "Email delivery failed.".into()),
            )),
            _ => Ok(outcome),
        }
    }

    /// Emails every member with a cached balance above zero.
    pub async fn email_all(&self, snap: &ReminderSnapshot) -> Result<BulkDispatchReport, AppError> {
        let eligible = self.eligible(snap, |m| m.balance.is_positive());
        if eligible.is_empty() {
            return Err(AppError::NoOutstandingInvoices);
        }

        let mut report = BulkDispatchReport {
            requested: eligible.len(),
            skipped: snap.members.iter().filter(|m| m.balance.is_positive()).count() - eligible.len(),
            ..Default::default()
        };
        for (member, invoices) in eligible {
            let outcome = self.email_outstanding(snap, member, &invoices).await;
            record(&mut report, outcome);
        }

        tracing::info!(
            sent = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "bulk email reminders finished"
        );
        Ok(report)
    }

    /// Re-sends the members behind failed reminder log entries, once per member.
    pub async fn retry_failed(&self, snap: &ReminderSnapshot, failed: &[ReminderLogEntry]) -> RetryReport {
        let mut report = RetryReport::default();
        let mut seen: Vec<Uuid> = Vec::new();

        for entry in failed.iter().filter(|e| e.status == ReminderStatus::Failed) {
            report.retried += 1;

            let member = snap.members.iter().find(|m| {
                entry.member_id == Some(m.id) || m.email.eq_ignore_ascii_case(entry.member_email.trim())
            });
            let Some(member) = member else {
                tracing::warn!(email = %entry.member_email, "retry skipped, member no longer exists");
                report.failed += 1;
                continue;
            };
            if seen.contains(&member.id) {
                report.sent += 1;
                continue;
            }
            seen.push(member.id);

            let invoices = snap.due_invoices(member);
            if invoices.is_empty() {
                // Settled since the failure; nothing left to remind about.
                report.sent += 1;
                continue;
            }
            match self.email_outstanding(snap, member, &invoices).await.status {
                CommunicationStatus::Failed => report.failed += 1,
                _ => report.sent += 1,
            }
        }
        report
    }

    /// Scheduled pass: overdue reminders for members who owe, upcoming
    /// reminders for settled members whose next due date falls in the window.
    /// A member gets at most one reminder of each type per day.
    pub async fn run_automated(&self, snap: &ReminderSnapshot) -> BulkDispatchReport {
        let mut report = BulkDispatchReport::default();

        let sent_today = match snap.today {
            Some(today) => match self.sink.reminders_sent_on(today).await {
                Ok(sent) => sent,
                Err(e) => {
                    tracing::error!(error = %e, "could not load today's reminder log, skipping automated run");
                    return report;
                }
            },
            None => Vec::new(),
        };

        for (member, invoices) in self.eligible(snap, |m| m.balance.is_positive()) {
            if already_reminded(&sent_today, member, snap.reminder_type(&invoices)) {
                report.skipped += 1;
                continue;
            }
            report.requested += 1;
            let outcome = self.email_outstanding(snap, member, &invoices).await;
            record(&mut report, outcome);
        }

        let Some(today) = snap.today else {
            return report;
        };
        let window = i64::from(snap.email_settings.upcoming_window_days.max(0));
        for member in snap.members.iter().filter(|m| !m.balance.is_positive()) {
            let Some(next_due) = member.next_due else { continue };
            let days_left = next_due.naive().signed_duration_since(today.naive()).num_days();
            if !(0..=window).contains(&days_left) {
                continue;
            }
            if already_reminded(&sent_today, member, ReminderType::Upcoming) {
                report.skipped += 1;
                continue;
            }
            report.requested += 1;
            let outcome = self.email_upcoming(snap, member, next_due).await;
            record(&mut report, outcome);
        }

        tracing::info!(
            sent = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "automated reminders finished"
        );
        report
    }

    async fn email_outstanding(
        &self,
        snap: &ReminderSnapshot,
        member: &Member,
        invoices: &[DueInvoice<'_>],
    ) -> DispatchOutcome {
        let settings = &snap.email_settings;
        let message = messages::outstanding_email(
            member,
            invoices,
            &snap.payment_methods,
            &snap.organization,
            &settings.reminder_subject,
            settings.reminder_template.as_deref(),
        );
        let total_due = messages::total_due(invoices);

        self.deliver_email(
            member,
            message,
            messages::REMINDER_KIND,
            messages::log_summary(invoices),
            snap.reminder_type(invoices),
            total_due,
            invoices.len(),
            settings,
        )
        .await
    }

    async fn email_upcoming(&self, snap: &ReminderSnapshot, member: &Member, next_due: CalendarDate) -> DispatchOutcome {
        let settings = &snap.email_settings;
        let message = messages::upcoming_email(
            member,
            next_due,
            &snap.payment_methods,
            &snap.organization,
            &settings.reminder_subject,
        );
        let amount = member.subscription_type.annual_rate();

        self.deliver_email(
            member,
            message,
            messages::UPCOMING_KIND,
            format!("Upcoming payment of {amount} due on {next_due}"),
            ReminderType::Upcoming,
            amount,
            0,
            settings,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver_email(
        &self,
        member: &Member,
        message: EmailMessage,
        kind: &str,
        summary: String,
        reminder_type: ReminderType,
        total_due: Money,
        invoice_count: usize,
        settings: &EmailSettings,
    ) -> DispatchOutcome {
        let result = self.transport.send(settings, &message).await;
        let error = result.err().map(|e| match e {
            AppError::Transport(msg) => msg,
            other => other.to_string(),
        });
        let status = if error.is_some() { CommunicationStatus::Failed } else { CommunicationStatus::Delivered };

        if let Some(err) = &error {
            tracing::warn!(member_id = %member.id, error = %err, "reminder email failed");
        }

        self.write_logs(
            NewCommunicationLog {
                channel: Channel::Email,
                kind: kind.to_string(),
                member_id: Some(member.id),
                member_email: Some(member.email.clone()),
                member_name: member.name.clone(),
                message: summary,
                status,
            },
            Some(NewReminderLog {
                member_id: Some(member.id),
                member_email: member.email.clone(),
                reminder_type,
                amount: total_due,
                invoice_count: i32::try_from(invoice_count).unwrap_or(i32::MAX),
                status: if error.is_some() { ReminderStatus::Failed } else { ReminderStatus::Sent },
                error: error.clone(),
            }),
        )
        .await;

        DispatchOutcome {
            member_id: member.id,
            member_name: member.name.clone(),
            channel: Channel::Email,
            status,
            total_due,
            invoice_count,
            chat_url: None,
            error,
        }
    }

    // =========================================================================
    //  WHATSAPP
    // =========================================================================

    /// Builds the click-to-chat link for one member and logs it as Requested.
    pub async fn whatsapp_member(&self, snap: &ReminderSnapshot, member_id: Uuid) -> Result<DispatchOutcome, AppError> {
        let member = snap.member(member_id)?;
        if !has_phone(member) {
            return Err(AppError::InvalidInput("Member has no phone number.".into()));
        }
        let invoices = snap.due_invoices(member);
        if invoices.is_empty() {
            return Err(AppError::NoOutstandingInvoices);
        }
        Ok(self.whatsapp_outstanding(snap, member, &invoices).await)
    }

    /// One link per member with a balance and a phone, spaced by the stagger.
    /// Runs to completion once started.
    pub async fn whatsapp_all(&self, snap: &ReminderSnapshot) -> Result<BulkDispatchReport, AppError> {
        let targeted = |m: &Member| m.balance.is_positive() && has_phone(m);
        let eligible = self.eligible(snap, targeted);
        if eligible.is_empty() {
            return Err(AppError::NoOutstandingInvoices);
        }

        let mut report = BulkDispatchReport {
            requested: eligible.len(),
            skipped: snap.members.iter().filter(|&m| targeted(m)).count() - eligible.len(),
            ..Default::default()
        };
        for (index, (member, invoices)) in eligible.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.whatsapp_stagger).await;
            }
            let outcome = self.whatsapp_outstanding(snap, member, &invoices).await;
            record(&mut report, outcome);
        }

        tracing::info!(requested = report.requested, skipped = report.skipped, "bulk whatsapp reminders prepared");
        Ok(report)
    }

    async fn whatsapp_outstanding(
        &self,
        snap: &ReminderSnapshot,
        member: &Member,
        invoices: &[DueInvoice<'_>],
    ) -> DispatchOutcome {
        let text = messages::whatsapp_text(member, invoices, &snap.payment_methods, &snap.organization);
        let chat_url = member
            .phone
            .as_deref()
            .and_then(|phone| messages::whatsapp_chat_url(phone, &text));
        let status = if chat_url.is_some() { CommunicationStatus::Requested } else { CommunicationStatus::Failed };
        let total_due = messages::total_due(invoices);

        self.write_logs(
            NewCommunicationLog {
                channel: Channel::WhatsApp,
                kind: messages::REMINDER_KIND.to_string(),
                member_id: Some(member.id),
                member_email: Some(member.email.clone()),
                member_name: member.name.clone(),
                message: messages::log_summary(invoices),
                status,
            },
            None,
        )
        .await;

        DispatchOutcome {
            member_id: member.id,
            member_name: member.name.clone(),
            channel: Channel::WhatsApp,
            status,
            total_due,
            invoice_count: invoices.len(),
            error: chat_url.is_none().then(|| "Phone number has no digits.".to_string()),
            chat_url,
        }
    }

    // =========================================================================
    //  SHARED
    // =========================================================================

    fn eligible<'s, F>(&self, snap: &'s ReminderSnapshot, targeted: F) -> Vec<(&'s Member, Vec<DueInvoice<'s>>)>
    where
        F: Fn(&Member) -> bool,
    {
        snap.members
            .iter()
            .filter(|&m| targeted(m))
            .map(|m| (m, snap.due_invoices(m)))
            .filter(|(_, invoices)| !invoices.is_empty())
            .collect()
    }

    /// The message already left; a failed log write must not turn into a
    /// failed dispatch.
    async fn write_logs(&self, communication: NewCommunicationLog, reminder: Option<NewReminderLog>) {
        if let Err(e) = self.sink.log_communication(communication).await {
            tracing::error!(error = %e, "failed to record communication log entry");
        }
        if let Some(reminder) = reminder {
            if let Err(e) = self.sink.log_reminder(reminder).await {
                tracing::error!(error = %e, "failed to record reminder log entry");
            }
        }
    }
}

fn record(report: &mut BulkDispatchReport, outcome: DispatchOutcome) {
    match outcome.status {
        CommunicationStatus::Failed => report.failed += 1,
        _ => report.succeeded += 1,
    }
    report.outcomes.push(outcome);
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::{
        models::finance::PaymentStatus,
        services::fixtures::{date, id, invoice, member, payment},
    };

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<EmailMessage>>,
        reject: Vec<String>,
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send(&self, _settings: &EmailSettings, message: &EmailMessage) -> Result<(), AppError> {
            if self.reject.contains(&message.to) {
                return Err(AppError::Transport("mailbox unavailable".into()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemorySink {
        communications: Mutex<Vec<NewCommunicationLog>>,
        reminders: Mutex<Vec<NewReminderLog>>,
    }

    #[async_trait]
    impl CommunicationSink for MemorySink {
        async fn log_communication(&self, entry: NewCommunicationLog) -> Result<CommunicationLogEntry, AppError> {
            self.communications.lock().unwrap().push(entry.clone());
            Ok(CommunicationLogEntry {
                id: Uuid::new_v4(),
                channel: entry.channel,
                kind: entry.kind,
                member_id: entry.member_id,
                member_email: entry.member_email,
                member_name: entry.member_name,
                message: entry.message,
                status: entry.status,
                date: Utc::now(),
                confirmed_at: None,
            })
        }

        async fn log_reminder(&self, entry: NewReminderLog) -> Result<(), AppError> {
            self.reminders.lock().unwrap().push(entry);
            Ok(())
        }

        // Every recorded entry counts as sent on the day asked about.
        async fn reminders_sent_on(&self, _day: CalendarDate) -> Result<Vec<ReminderLogEntry>, AppError> {
            let reminders = self.reminders.lock().unwrap();
            Ok(reminders
                .iter()
                .filter(|r| r.status == ReminderStatus::Sent)
                .map(|r| ReminderLogEntry {
                    id: Uuid::new_v4(),
                    member_id: r.member_id,
                    member_email: r.member_email.clone(),
                    reminder_type: r.reminder_type,
                    amount: r.amount,
                    invoice_count: r.invoice_count,
                    sent_at: Utc::now(),
                    status: r.status,
                    error: r.error.clone(),
                })
                .collect())
        }
    }

    fn coordinator(transport: Arc<RecordingTransport>, sink: Arc<MemorySink>) -> ReminderCoordinator {
        ReminderCoordinator::new(transport, sink, Duration::from_secs(1))
    }

    fn snapshot() -> ReminderSnapshot {
        let mut settled = member(3, "Bilal", "bilal@example.org", "$0");
        settled.next_due = Some(date("2025-11-20"));

        ReminderSnapshot {
            members: vec![
                member(1, "Yusuf", "yusuf@example.org", "$250.00"),
                member(2, "Amina", "amina@example.org", "$100.00"),
                settled,
            ],
            invoices: vec![
                invoice("INV-2025-001", Some(1), "$250.00", InvoiceStatus::Overdue),
                invoice("INV-2025-002", Some(2), "$100.00", InvoiceStatus::Unpaid),
                invoice("INV-2025-003", Some(3), "$250.00", InvoiceStatus::Paid),
            ],
            today: Some(date("2025-11-15")),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_whatsapp_logs_one_requested_entry_per_member() {
        let transport = Arc::new(RecordingTransport::default());
        let sink = Arc::new(MemorySink::default());
        let started = tokio::time::Instant::now();

        let report = coordinator(transport.clone(), sink.clone())
            .whatsapp_all(&snapshot())
            .await
            .unwrap();

        assert_eq!(report.requested, 2);
        assert_eq!(report.succeeded, 2);
        assert!(report.outcomes.iter().all(|o| o.chat_url.as_deref().is_some_and(|u| u.starts_with("https://wa.me/852"))));
        assert!(started.elapsed() >= Duration::from_secs(1));

        let logs = sink.communications.lock().unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.channel == Channel::WhatsApp && l.status == CommunicationStatus::Requested));
        assert!(transport.sent.lock().unwrap().is_empty());
        assert!(sink.reminders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_eligible_set_writes_nothing() {
        let transport = Arc::new(RecordingTransport::default());
        let sink = Arc::new(MemorySink::default());
        let mut snap = snapshot();
        snap.payments = vec![
            payment(Some(1), Some("INV-2025-001"), "$250.00", PaymentStatus::Completed, Some("2025-11-01")),
            payment(Some(2), Some("INV-2025-002"), "$100.00", PaymentStatus::Paid, Some("2025-11-02")),
        ];

        let c = coordinator(transport.clone(), sink.clone());
        assert!(matches!(c.whatsapp_all(&snap).await, Err(AppError::NoOutstandingInvoices)));
        assert!(matches!(c.email_all(&snap).await, Err(AppError::NoOutstandingInvoices)));
        assert!(matches!(c.email_member(&snap, id(1)).await, Err(AppError::NoOutstandingInvoices)));

        assert!(sink.communications.lock().unwrap().is_empty());
        assert!(sink.reminders.lock().unwrap().is_empty());
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_failed_email_does_not_stop_the_rest() {
        let transport = Arc::new(RecordingTransport {
            reject: vec!["yusuf@example.org".into()],
            ..Default::default()
        });
        let sink = Arc::new(MemorySink::default());

        let report = coordinator(transport.clone(), sink.clone())
            .email_all(&snapshot())
            .await
            .unwrap();

        assert_eq!((report.requested, report.succeeded, report.failed), (2, 1, 1));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);

        let reminders = sink.reminders.lock().unwrap();
        let failed = reminders.iter().find(|r| r.status == ReminderStatus::Failed).unwrap();
        assert_eq!(failed.member_email, "yusuf@example.org");
        assert_eq!(failed.reminder_type, ReminderType::Overdue);
        assert_eq!(failed.error.as_deref(), Some("mailbox unavailable"));

        let sent = reminders.iter().find(|r| r.status == ReminderStatus::Sent).unwrap();
        assert_eq!(sent.amount, Money::from_major(100));
        assert_eq!(sent.invoice_count, 1);
    }

    #[tokio::test]
    async fn single_email_failure_surfaces_after_logging() {
        let transport = Arc::new(RecordingTransport {
            reject: vec!["amina@example.org".into()],
            ..Default::default()
        });
        let sink = Arc::new(MemorySink::default());

        let err = coordinator(transport, sink.clone())
            .email_member(&snapshot(), id(2))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Transport(ref m) if m == "mailbox unavailable"));
        assert_eq!(sink.communications.lock().unwrap()[0].status, CommunicationStatus::Failed);
    }

    #[tokio::test]
    async fn settled_invoice_is_not_reminded() {
        let transport = Arc::new(RecordingTransport::default());
        let sink = Arc::new(MemorySink::default());
        let mut snap = snapshot();
        // Stored status still Overdue, but an approved payment covers it.
        snap.payments = vec![payment(
            Some(1),
            Some("INV-2025-001"),
            "$250.00",
            PaymentStatus::Completed,
            Some("2025-11-01"),
        )];

        let report = coordinator(transport.clone(), sink).email_all(&snap).await.unwrap();
        assert_eq!(report.requested, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(transport.sent.lock().unwrap()[0].to, "amina@example.org");
    }

    #[tokio::test]
    async fn whatsapp_requires_a_phone() {
        let mut snap = snapshot();
        snap.members[0].phone = None;
        let c = coordinator(Arc::default(), Arc::default());
        assert!(matches!(c.whatsapp_member(&snap, id(1)).await, Err(AppError::InvalidInput(_))));
        assert!(matches!(c.whatsapp_member(&snap, id(9)).await, Err(AppError::NotFound("Member"))));
    }

    #[tokio::test]
    async fn automated_run_covers_overdue_and_upcoming() {
        let transport = Arc::new(RecordingTransport::default());
        let sink = Arc::new(MemorySink::default());

        let report = coordinator(transport.clone(), sink.clone())
            .run_automated(&snapshot())
            .await;

        assert_eq!(report.requested, 3);
        let reminders = sink.reminders.lock().unwrap();
        let upcoming: Vec<_> = reminders.iter().filter(|r| r.reminder_type == ReminderType::Upcoming).collect();
        assert_eq!(upcoming.len(), 2);
        assert!(upcoming.iter().any(|r| r.member_email == "bilal@example.org" && r.invoice_count == 0));
    }

    #[tokio::test]
    async fn automated_run_sends_each_reminder_once_per_day() {
        let transport = Arc::new(RecordingTransport {
            reject: vec!["amina@example.org".into()],
            ..Default::default()
        });
        let sink = Arc::new(MemorySink::default());
        let c = coordinator(transport.clone(), sink.clone());

        let first = c.run_automated(&snapshot()).await;
        assert_eq!((first.requested, first.succeeded, first.failed), (3, 2, 1));

        let second = c.run_automated(&snapshot()).await;
        assert_eq!((second.requested, second.skipped), (1, 2));
        // Only the failed delivery is attempted again.
        assert_eq!(second.outcomes[0].member_name, "Amina");
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn retry_resends_once_per_member() {
        let transport = Arc::new(RecordingTransport::default());
        let sink = Arc::new(MemorySink::default());
        let failed = |n: u128, email: &str| ReminderLogEntry {
            id: Uuid::new_v4(),
            member_id: Some(id(n)),
            member_email: email.into(),
            reminder_type: ReminderType::Overdue,
            amount: Money::from_major(250),
            invoice_count: 1,
            sent_at: Utc::now(),
            status: ReminderStatus::Failed,
            error: Some("timeout".into()),
        };
        let entries = vec![
            failed(1, "yusuf@example.org"),
            failed(1, "yusuf@example.org"),
            failed(42, "gone@example.org"),
        ];

        let report = coordinator(transport.clone(), sink).retry_failed(&snapshot(), &entries).await;
        assert_eq!((report.retried, report.sent, report.failed), (3, 2, 1));
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }
}
