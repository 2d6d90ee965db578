//! HTTP endpoints for health checks and catalog inspection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::intake::{LanguageCode, SessionStore, VacancyCatalog, VacancyId};

/// Shared state for the HTTP routes.
#[derive(Clone)]
pub struct ServerState {
    pub catalog: Arc<VacancyCatalog>,
    pub store: Arc<SessionStore>,
}

/// One row of `GET /api/vacancies`.
#[derive(Debug, Serialize)]
struct VacancySummary {
    id: VacancyId,
    titles: HashMap<LanguageCode, String>,
}

/// Build the HTTP routes.
pub fn intake_routes(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/vacancies", get(list_vacancies))
        .route("/api/vacancies/{id}", get(get_vacancy))
        .with_state(state)
}

async fn health(State(state): State<ServerState>) -> impl IntoResponse {
    let sessions = state.store.len().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": "vacancy-intake",
        "vacancies": state.catalog.len(),
        "sessions": sessions,
    }))
}

/// GET /api/vacancies
///
/// Vacancy ids and titles in catalog order.
async fn list_vacancies(State(state): State<ServerState>) -> impl IntoResponse {
    let summaries: Vec<VacancySummary> = state
        .catalog
        .list()
        .iter()
        .map(|v| VacancySummary {
            id: v.id,
            titles: v.titles.clone(),
        })
        .collect();
    Json(summaries)
}

/// GET /api/vacancies/{id}
///
/// The full vacancy record, or 404.
async fn get_vacancy(
    State(state): State<ServerState>,
    Path(id): Path<VacancyId>,
) -> impl IntoResponse {
    match state.catalog.lookup(id) {
        Ok(vacancy) => Json(serde_json::to_value(&*vacancy).unwrap_or_default()).into_response(),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
