pub mod auth;
pub mod dashboard;
pub mod finance;
pub mod members;
pub mod reminders;
pub mod settings;
pub mod uploads;
