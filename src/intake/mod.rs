//! Vacancy application intake: the per-user conversation core.
//!
//! A user picks a language, browses vacancies and applies by sending their
//! name, phone contact, CV document and a voice note, in that order. The
//! machine validates the order, and on the last step assembles a lead for the
//! CRM sink and resets the session so the user can apply again.

pub mod catalog;
pub mod event;
pub mod language;
pub mod machine;
pub mod session;
pub mod state;
pub mod submission;

pub use catalog::{Vacancy, VacancyCatalog, VacancyId};
pub use event::{CallbackData, IntakeEvent};
pub use language::LanguageCode;
pub use machine::{Directive, IntakeMachine, Notice, Reply};
pub use session::SessionStore;
pub use state::{Stage, UserId, UserSession};
pub use submission::{Ack, LeadPayload, LeadRecord, LeadSink, assemble, spawn_submission};
