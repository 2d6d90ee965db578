//! Turns a finished session into a lead for the CRM.
//!
//! The comments block and the webhook body are parsed on the CRM side, so the
//! labels and their order here must stay exactly as they are.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::catalog::Vacancy;
use super::state::UserSession;
use crate::error::{IntakeError, SubmitError};

/// Title used when the selected vacancy is no longer in the catalog.
pub const UNKNOWN_VACANCY_TITLE: &str = "Unknown vacancy";

/// Suffix appended to the lead title in the CRM.
const LEAD_TITLE_SUFFIX: &str = " — Telegram Application";

/// Normalized application handed to the CRM sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadRecord {
    /// Vacancy title in the applicant's language.
    pub title: String,
    pub name: String,
    pub phone: String,
    pub comments_block: String,
}

/// Build a lead from a completed session.
///
/// Fails only when a required field is missing, which the state machine's
/// stage ordering rules out.
pub fn assemble(
    session: &UserSession,
    vacancy: Option<&Vacancy>,
) -> Result<LeadRecord, IntakeError> {
    let name = required(&session.full_name, "full_name")?;
    let phone = required(&session.phone, "phone")?;
    let cv_ref = required(&session.cv_ref, "cv_ref")?;
    let voice_ref = required(&session.voice_ref, "voice_ref")?;

    let title = vacancy
        .map(|v| v.title(session.language))
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_VACANCY_TITLE)
        .to_string();

    let comments_block =
        format!("Vacancy: {title}\nCV File ID: {cv_ref}\nVoice File ID: {voice_ref}");

    Ok(LeadRecord {
        title,
        name: name.to_string(),
        phone: phone.to_string(),
        comments_block,
    })
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, IntakeError> {
    field
        .as_deref()
        .ok_or(IntakeError::IncompleteApplication { missing: name })
}

// ── Webhook payload ─────────────────────────────────────────────────

/// Body of a `crm.lead.add` webhook call.
#[derive(Debug, Clone, Serialize)]
pub struct LeadPayload {
    pub fields: LeadFields,
    pub params: LeadParams,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct LeadFields {
    pub title: String,
    pub name: String,
    pub phone: Vec<PhoneEntry>,
    pub comments: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct PhoneEntry {
    pub value: String,
    #[serde(rename = "VALUE_TYPE")]
    pub value_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct LeadParams {
    pub register_sonet_event: String,
}

impl From<&LeadRecord> for LeadPayload {
    fn from(lead: &LeadRecord) -> Self {
        Self {
            fields: LeadFields {
                title: format!("{}{LEAD_TITLE_SUFFIX}", lead.title),
                name: lead.name.clone(),
                phone: vec![PhoneEntry {
                    value: lead.phone.clone(),
                    value_type: "WORK".to_string(),
                }],
                comments: lead.comments_block.clone(),
            },
            params: LeadParams {
                register_sonet_event: "Y".to_string(),
            },
        }
    }
}

// ── Sink ────────────────────────────────────────────────────────────

/// Acknowledgement from a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// CRM-side id of the created lead, when the sink reports one.
    pub lead_id: Option<u64>,
}

/// Where completed applications go. Implementations own any retry policy.
#[async_trait]
pub trait LeadSink: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, lead: &LeadRecord) -> Result<Ack, SubmitError>;
}

/// Submit a lead in the background. Failures are logged and dropped.
///
/// Returns the task handle so callers (mostly tests) can wait for it.
pub fn spawn_submission(sink: Arc<dyn LeadSink>, lead: LeadRecord) -> JoinHandle<()> {
    let submission_id = Uuid::new_v4();
    tokio::spawn(async move {
        tracing::debug!(%submission_id, sink = sink.name(), title = %lead.title, "Submitting lead");
        match sink.submit(&lead).await {
            Ok(ack) => tracing::info!(
                %submission_id,
                sink = sink.name(),
                lead_id = ?ack.lead_id,
                "Lead submitted"
            ),
            Err(e) => tracing::error!(
                %submission_id,
                sink = sink.name(),
                error = %e,
                "Lead submission failed; lead dropped"
            ),
        }
    })
}
