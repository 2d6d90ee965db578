//! Supported interface languages.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A language the bot can talk in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageCode {
    #[default]
    En,
    Ru,
    Uz,
}

impl LanguageCode {
    /// All languages, in menu order.
    pub const ALL: [LanguageCode; 3] = [Self::En, Self::Ru, Self::Uz];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
            Self::Uz => "uz",
        }
    }

    /// Label shown on the language picker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::En => "🇬🇧 English",
            Self::Ru => "🇷🇺 Русский",
            Self::Uz => "🇺🇿 Oʻzbekcha",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "ru" => Ok(Self::Ru),
            "uz" => Ok(Self::Uz),
            other => Err(format!("unsupported language code: {other:?}")),
        }
    }
}
