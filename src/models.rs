pub mod auth;
pub mod communications;
pub mod dashboard;
pub mod finance;
pub mod members;
pub mod settings;
