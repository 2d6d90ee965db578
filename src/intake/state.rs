//! Application state machine stages and per-user session data.

use serde::{Deserialize, Serialize};

use super::catalog::VacancyId;
use super::language::LanguageCode;
use crate::error::IntakeError;

/// Chat platform user identifier.
pub type UserId = i64;

/// The stages of an application.
///
/// Progresses linearly: Idle → AwaitingName → AwaitingPhone → AwaitingCv →
/// AwaitingVoice → Completed, and Completed immediately falls back to Idle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    AwaitingVacancySelection,
    AwaitingName,
    AwaitingPhone,
    AwaitingCv,
    AwaitingVoice,
    Completed,
}

impl Stage {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, target),
            (Idle, AwaitingName)
                | (AwaitingVacancySelection, AwaitingName)
                | (AwaitingName, AwaitingPhone)
                | (AwaitingPhone, AwaitingCv)
                | (AwaitingCv, AwaitingVoice)
                | (AwaitingVoice, Completed)
                | (Completed, Idle)
        )
    }

}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::AwaitingVacancySelection => "awaiting_vacancy_selection",
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingPhone => "awaiting_phone",
            Self::AwaitingCv => "awaiting_cv",
            Self::AwaitingVoice => "awaiting_voice",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Everything the bot knows about one user's conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: UserId,
    pub language: LanguageCode,
    pub stage: Stage,
    pub selected_vacancy_id: Option<VacancyId>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub cv_ref: Option<String>,
    pub voice_ref: Option<String>,
}

impl UserSession {
    /// A fresh session: idle, default language, nothing selected.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            language: LanguageCode::default(),
            stage: Stage::Idle,
            selected_vacancy_id: None,
            full_name: None,
            phone: None,
            cv_ref: None,
            voice_ref: None,
        }
    }

    /// Move to `target`, refusing anything outside the linear progression.
    pub fn advance_to(&mut self, target: Stage) -> Result<(), IntakeError> {
        if !self.stage.can_transition_to(target) {
            return Err(IntakeError::InvalidTransition {
                from: self.stage,
                to: target,
            });
        }
        self.stage = target;
        Ok(())
    }

    /// Clear every application field and go back to `Idle`. Language survives.
    pub fn reset_application(&mut self) {
        *self = Self {
            language: self.language,
            ..Self::new(self.user_id)
        };
    }

    /// Drop the collected answers and go back to `Idle`, keeping the language
    /// and the selected vacancy so an already shown Apply button still works.
    pub fn restart_application(&mut self) {
        *self = Self {
            language: self.language,
            selected_vacancy_id: self.selected_vacancy_id,
            ..Self::new(self.user_id)
        };
    }
}
