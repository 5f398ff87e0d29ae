pub mod auth;
pub mod communication_service;
pub mod dashboard_service;
pub mod email;
pub mod finance_service;
pub mod member_service;
pub mod metrics;
pub mod payment_methods;
pub mod reconciliation;
pub mod reminder_messages;
pub mod reminder_service;
pub mod report_export;
pub mod scheduler;

#[cfg(test)]
pub mod fixtures;
