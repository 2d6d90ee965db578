//! Vacancy Intake: a conversational job application bot.

pub mod bot;
pub mod channels;
pub mod config;
pub mod crm;
pub mod error;
pub mod intake;
pub mod locale;
pub mod render;
pub mod server;
