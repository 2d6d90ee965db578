//! Conversation state machine. Sequences the application steps per user.
//!
//! Each stage accepts exactly one event shape. Anything else is either a
//! reminder (text while a file is expected) or silently ignored; the only
//! user-visible error is a stale vacancy id.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::catalog::{Vacancy, VacancyCatalog};
use super::event::IntakeEvent;
use super::language::LanguageCode;
use super::session::SessionStore;
use super::state::{Stage, UserId, UserSession};
use super::submission::{LeadRecord, assemble};
use crate::error::{CatalogError, IntakeError};

/// A recoverable problem shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    VacancyUnavailable,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VacancyUnavailable => write!(f, "vacancy unavailable"),
        }
    }
}

/// What the rendering layer should present next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    ShowLanguageMenu,
    ShowVacancyList,
    ShowVacancyDetail(Arc<Vacancy>),
    PromptName,
    PromptPhone,
    PromptCv,
    RepromptCv,
    PromptVoice,
    RepromptVoice,
    /// Application finished. The session has already been reset.
    Submit(LeadRecord),
    ShowError(Notice),
    Ignore,
}

impl Directive {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ShowLanguageMenu => "show_language_menu",
            Self::ShowVacancyList => "show_vacancy_list",
            Self::ShowVacancyDetail(_) => "show_vacancy_detail",
            Self::PromptName => "prompt_name",
            Self::PromptPhone => "prompt_phone",
            Self::PromptCv => "prompt_cv",
            Self::RepromptCv => "reprompt_cv",
            Self::PromptVoice => "prompt_voice",
            Self::RepromptVoice => "reprompt_voice",
            Self::Submit(_) => "submit",
            Self::ShowError(_) => "show_error",
            Self::Ignore => "ignore",
        }
    }
}

/// A directive together with the language it should be rendered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub language: LanguageCode,
    pub directive: Directive,
}

/// Drives every user's application through the stages.
pub struct IntakeMachine {
    store: Arc<SessionStore>,
    catalog: Arc<VacancyCatalog>,
}

impl IntakeMachine {
    pub fn new(store: Arc<SessionStore>, catalog: Arc<VacancyCatalog>) -> Self {
        Self { store, catalog }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn catalog(&self) -> &Arc<VacancyCatalog> {
        &self.catalog
    }

    /// Apply one inbound event to a user's session.
    ///
    /// The user's session stays locked for the whole step. On an internal
    /// error the user's application is discarded; other users are untouched.
    pub async fn transition(
        &self,
        user_id: UserId,
        event: IntakeEvent,
    ) -> Result<Reply, IntakeError> {
        let mut session = self.store.lock(user_id).await;
        let from = session.stage;
        let kind = event.kind();

        match step(&mut session, &self.catalog, event) {
            Ok(directive) => {
                if matches!(directive, Directive::Ignore) {
                    debug!(user_id, stage = %from, event = kind, "Event ignored");
                } else {
                    info!(
                        user_id,
                        from = %from,
                        to = %session.stage,
                        event = kind,
                        directive = directive.kind(),
                        "Transition"
                    );
                }
                Ok(Reply {
                    language: session.language,
                    directive,
                })
            }
            Err(e) => {
                error!(user_id, stage = %from, event = kind, error = %e, "Application aborted");
                session.reset_application();
                Err(e)
            }
        }
    }
}

/// One synchronous transition over an already-locked session.
fn step(
    session: &mut UserSession,
    catalog: &VacancyCatalog,
    event: IntakeEvent,
) -> Result<Directive, IntakeError> {
    use IntakeEvent::*;
    use Stage::*;

    let directive = match (session.stage, event) {
        (_, StartRequested) => {
            session.restart_application();
            Directive::ShowLanguageMenu
        }
        (_, LanguageChosen(code)) => {
            session.restart_application();
            session.language = code;
            Directive::ShowVacancyList
        }
        (Idle, VacancyChosen(id)) => match catalog.lookup(id) {
            Ok(vacancy) => {
                session.selected_vacancy_id = Some(id);
                Directive::ShowVacancyDetail(vacancy)
            }
            Err(CatalogError::NotFound { .. }) => {
                info!(user_id = session.user_id, vacancy_id = id, "Stale vacancy selected");
                Directive::ShowError(Notice::VacancyUnavailable)
            }
            Err(e) => {
                error!(user_id = session.user_id, vacancy_id = id, error = %e, "Vacancy lookup failed");
                Directive::ShowError(Notice::VacancyUnavailable)
            }
        },
        (Idle, ApplyRequested) => {
            session.advance_to(AwaitingName)?;
            Directive::PromptName
        }
        (Idle, BackRequested) => Directive::ShowVacancyList,
        (AwaitingName, TextReceived(text)) => {
            session.full_name = Some(text.trim().to_string());
            session.advance_to(AwaitingPhone)?;
            Directive::PromptPhone
        }
        (AwaitingPhone, ContactReceived(phone)) => {
            session.phone = Some(phone);
            session.advance_to(AwaitingCv)?;
            Directive::PromptCv
        }
        (AwaitingCv, DocumentReceived(cv_ref)) => {
            session.cv_ref = Some(cv_ref);
            session.advance_to(AwaitingVoice)?;
            Directive::PromptVoice
        }
        (AwaitingCv, TextReceived(_)) => Directive::RepromptCv,
        (AwaitingVoice, VoiceReceived(voice_ref)) => {
            session.voice_ref = Some(voice_ref);
            session.advance_to(Completed)?;
            let vacancy = session
                .selected_vacancy_id
                .and_then(|id| catalog.lookup(id).ok());
            let lead = assemble(session, vacancy.as_deref())?;
            session.reset_application();
            Directive::Submit(lead)
        }
        (AwaitingVoice, TextReceived(_)) => Directive::RepromptVoice,
        _ => Directive::Ignore,
    };

    Ok(directive)
}
