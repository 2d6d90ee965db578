//! Inbound events and the callback payload grammar.
//!
//! Transports decode platform updates into [`IntakeEvent`]s before anything
//! reaches the state machine. Button payloads go through [`CallbackData`], so
//! a malformed payload is rejected at the boundary instead of mid-transition.

use std::str::FromStr;

use super::catalog::VacancyId;
use super::language::LanguageCode;

/// Something the user did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeEvent {
    /// `/start`: show the language picker.
    StartRequested,
    LanguageChosen(LanguageCode),
    VacancyChosen(VacancyId),
    ApplyRequested,
    BackRequested,
    TextReceived(String),
    ContactReceived(String),
    DocumentReceived(String),
    VoiceReceived(String),
}

impl IntakeEvent {
    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartRequested => "start_requested",
            Self::LanguageChosen(_) => "language_chosen",
            Self::VacancyChosen(_) => "vacancy_chosen",
            Self::ApplyRequested => "apply_requested",
            Self::BackRequested => "back_requested",
            Self::TextReceived(_) => "text_received",
            Self::ContactReceived(_) => "contact_received",
            Self::DocumentReceived(_) => "document_received",
            Self::VoiceReceived(_) => "voice_received",
        }
    }
}

/// Payload attached to an inline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackData {
    Language(LanguageCode),
    Vacancy(VacancyId),
    StartApplication,
    BackToVacancies,
}

impl CallbackData {
    pub fn into_event(self) -> IntakeEvent {
        match self {
            Self::Language(code) => IntakeEvent::LanguageChosen(code),
            Self::Vacancy(id) => IntakeEvent::VacancyChosen(id),
            Self::StartApplication => IntakeEvent::ApplyRequested,
            Self::BackToVacancies => IntakeEvent::BackRequested,
        }
    }
}

impl std::fmt::Display for CallbackData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Language(code) => write!(f, "lang_{code}"),
            Self::Vacancy(id) => write!(f, "vacancy_{id}"),
            Self::StartApplication => write!(f, "start_application"),
            Self::BackToVacancies => write!(f, "back_to_vacancies"),
        }
    }
}

impl FromStr for CallbackData {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start_application" => return Ok(Self::StartApplication),
            "back_to_vacancies" => return Ok(Self::BackToVacancies),
            _ => {}
        }
        if let Some(code) = s.strip_prefix("lang_") {
            return code.parse().map(Self::Language);
        }
        if let Some(id) = s.strip_prefix("vacancy_") {
            return id
                .parse()
                .map(Self::Vacancy)
                .map_err(|e| format!("invalid vacancy id {id:?}: {e}"));
        }
        Err(format!("unrecognized callback data: {s:?}"))
    }
}
