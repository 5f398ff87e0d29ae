// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::login,
        handlers::auth::get_me,

        // --- Admins ---
        handlers::auth::list_admins,
        handlers::auth::create_admin,
        handlers::auth::update_admin,
        handlers::auth::delete_admin,

        // --- Members ---
        handlers::members::list_members,
        handlers::members::get_member,
        handlers::members::create_member,
        handlers::members::update_member,
        handlers::members::approve_member,
        handlers::members::change_subscription,
        handlers::members::delete_member,
        handlers::members::sync_balances,

        // --- Invoices ---
        handlers::finance::list_invoices,
        handlers::finance::get_invoice,
        handlers::finance::create_invoice,
        handlers::finance::update_invoice,
        handlers::finance::delete_invoice,
        handlers::finance::mark_invoice_paid,
        handlers::finance::send_invoice_reminder,

        // --- Payments ---
        handlers::finance::list_payments,
        handlers::finance::submit_payment,
        handlers::finance::approve_payment,
        handlers::finance::reject_payment,

        // --- Donations ---
        handlers::finance::list_donations,
        handlers::finance::create_donation,
        handlers::finance::update_donation,
        handlers::finance::delete_donation,

        // --- Reminders ---
        handlers::reminders::send_email_reminders,
        handlers::reminders::send_whatsapp_reminders,
        handlers::reminders::retry_failed_reminders,
        handlers::reminders::list_reminder_logs,
        handlers::reminders::list_communications,
        handlers::reminders::confirm_communication,

        // --- Dashboard ---
        handlers::dashboard::get_overview,
        handlers::dashboard::get_report,
        handlers::dashboard::export_csv,
        handlers::dashboard::export_pdf,

        // --- Settings ---
        handlers::settings::get_organization,
        handlers::settings::update_organization,
        handlers::settings::list_payment_methods,
        handlers::settings::create_payment_method,
        handlers::settings::update_payment_method,
        handlers::settings::delete_payment_method,
        handlers::settings::get_email_settings,
        handlers::settings::update_email_settings,
        handlers::settings::save_email_template,
        handlers::settings::send_test_email,

        // --- Uploads ---
        handlers::uploads::upload_screenshot,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::AdminRole,
            models::auth::AdminUser,
            models::auth::LoginPayload,
            models::auth::AuthResponse,
            models::auth::CreateAdminPayload,
            models::auth::UpdateAdminPayload,

            // --- Members ---
            models::members::MemberStatus,
            models::members::SubscriptionType,
            models::members::Member,
            models::members::MemberDetail,
            models::members::CreateMemberPayload,
            models::members::UpdateMemberPayload,
            models::members::ChangeSubscriptionPayload,

            // --- Finance ---
            models::finance::InvoiceStatus,
            models::finance::PaymentStatus,
            models::finance::Invoice,
            models::finance::InvoiceView,
            models::finance::CreateInvoicePayload,
            models::finance::UpdateInvoicePayload,
            models::finance::MarkInvoicePaidPayload,
            models::finance::Payment,
            models::finance::PaymentView,
            models::finance::CreatePaymentPayload,
            models::finance::RejectPaymentPayload,
            models::finance::Donation,
            models::finance::DonationPayload,

            // --- Communications ---
            models::communications::Channel,
            models::communications::CommunicationStatus,
            models::communications::CommunicationLogEntry,
            models::communications::ReminderType,
            models::communications::ReminderStatus,
            models::communications::ReminderLogEntry,
            models::communications::SendReminderPayload,
            models::communications::InvoiceReminderPayload,
            models::communications::RetryRemindersPayload,
            models::communications::DispatchOutcome,
            models::communications::BulkDispatchReport,
            models::communications::RetryReport,

            // --- Dashboard ---
            models::dashboard::DashboardMetrics,
            models::dashboard::MonthlyCollection,
            models::dashboard::DashboardOverview,
            models::dashboard::MethodMixEntry,
            models::dashboard::ReportStats,

            // --- Settings ---
            models::settings::OrganizationInfo,
            models::settings::UpdateOrganizationPayload,
            models::settings::PaymentMethod,
            models::settings::PaymentMethodPayload,
            models::settings::EmailSettings,
            models::settings::EmailSettingsView,
            models::settings::UpdateEmailSettingsPayload,
            models::settings::EmailTemplatePayload,
            models::settings::TestEmailPayload,

            // --- Uploads ---
            handlers::uploads::UploadResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Sign-in and session"),
        (name = "Admins", description = "Admin accounts and roles"),
        (name = "Members", description = "Member roster and subscriptions"),
        (name = "Invoices", description = "Dues invoices"),
        (name = "Payments", description = "Payment submissions and review"),
        (name = "Donations", description = "Donations"),
        (name = "Reminders", description = "Email and WhatsApp payment reminders"),
        (name = "Communications", description = "Outbound message log"),
        (name = "Dashboard", description = "Collection metrics"),
        (name = "Reports", description = "Date-range reports and exports"),
        (name = "Settings", description = "Organization, payment methods and email provider"),
        (name = "Uploads", description = "Payment screenshots")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
