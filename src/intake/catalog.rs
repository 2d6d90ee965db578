//! Vacancy catalog. Immutable, loaded once at startup and shared by all sessions.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::language::LanguageCode;
use crate::error::CatalogError;

/// Vacancy identifier as it appears in the catalog file and callback payloads.
pub type VacancyId = u32;

/// A single job opening with per-language texts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vacancy {
    pub id: VacancyId,
    pub titles: HashMap<LanguageCode, String>,
    #[serde(default)]
    pub requirements: HashMap<LanguageCode, String>,
    #[serde(default)]
    pub questions: HashMap<LanguageCode, Vec<String>>,
}

impl Vacancy {
    /// Title in `lang`, falling back to English, then to any translation.
    pub fn title(&self, lang: LanguageCode) -> &str {
        localized(&self.titles, lang).map_or("", String::as_str)
    }

    /// Requirements text in `lang` (same fallback as [`Vacancy::title`]).
    pub fn requirements(&self, lang: LanguageCode) -> &str {
        localized(&self.requirements, lang).map_or("", String::as_str)
    }

    /// Screening questions in `lang`, in catalog order.
    pub fn questions(&self, lang: LanguageCode) -> &[String] {
        localized(&self.questions, lang)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

fn localized<T>(map: &HashMap<LanguageCode, T>, lang: LanguageCode) -> Option<&T> {
    map.get(&lang)
        .or_else(|| map.get(&LanguageCode::En))
        .or_else(|| LanguageCode::ALL.iter().find_map(|l| map.get(l)))
}

/// Read-only lookup of vacancies by id, preserving load order for display.
#[derive(Debug, Clone, Default)]
pub struct VacancyCatalog {
    vacancies: Vec<Arc<Vacancy>>,
    index: HashMap<VacancyId, usize>,
}

impl VacancyCatalog {
    /// Build a catalog, rejecting duplicate ids.
    pub fn new(vacancies: Vec<Vacancy>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        let mut index = HashMap::with_capacity(vacancies.len());
        for (pos, vacancy) in vacancies.iter().enumerate() {
            if !seen.insert(vacancy.id) {
                return Err(CatalogError::DuplicateId { id: vacancy.id });
            }
            index.insert(vacancy.id, pos);
        }
        Ok(Self {
            vacancies: vacancies.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// Parse a JSON array of vacancies.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let vacancies: Vec<Vacancy> = serde_json::from_str(raw)?;
        if vacancies.is_empty() {
            return Err(CatalogError::Empty);
        }
        Self::new(vacancies)
    }

    /// Load the catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            count = catalog.len(),
            "Vacancy catalog loaded"
        );
        Ok(catalog)
    }

    /// Find a vacancy by id.
    pub fn lookup(&self, id: VacancyId) -> Result<Arc<Vacancy>, CatalogError> {
        self.index
            .get(&id)
            .map(|&pos| Arc::clone(&self.vacancies[pos]))
            .ok_or(CatalogError::NotFound { id })
    }

    /// All vacancies in load order.
    pub fn list(&self) -> &[Arc<Vacancy>] {
        &self.vacancies
    }

    pub fn len(&self) -> usize {
        self.vacancies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vacancies.is_empty()
    }
}
