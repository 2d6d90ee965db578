//! CRM sinks: a Bitrix24 inbound webhook and a log-only fallback.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::error::SubmitError;
use crate::intake::submission::{Ack, LeadPayload, LeadRecord, LeadSink};

/// Posts leads to a Bitrix24 `crm.lead.add` webhook. One attempt per lead.
pub struct BitrixWebhookSink {
    url: SecretString,
    timeout: Duration,
    client: reqwest::Client,
}

impl BitrixWebhookSink {
    pub fn new(url: SecretString, timeout: Duration) -> Self {
        Self {
            url,
            timeout,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LeadSink for BitrixWebhookSink {
    fn name(&self) -> &str {
        "bitrix24"
    }

    async fn submit(&self, lead: &LeadRecord) -> Result<Ack, SubmitError> {
        let payload = LeadPayload::from(lead);

        let resp = self
            .client
            .post(self.url.expose_secret())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmitError::Timeout {
                        timeout: self.timeout,
                    }
                } else {
                    // Strip the URL: the webhook path embeds the access token.
                    SubmitError::Unreachable(e.without_url().to_string())
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            SubmitError::InvalidResponse(format!("failed to read body: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| SubmitError::InvalidResponse(format!("{e}: {body}")))?;

        if let Some(err) = data.get("error") {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                body: err.to_string(),
            });
        }

        Ok(Ack {
            lead_id: data.get("result").and_then(|v| {
                v.as_u64()
                    .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            }),
        })
    }
}

/// Logs leads instead of sending them. Used when no webhook is configured.
pub struct LogSink;

#[async_trait]
impl LeadSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn submit(&self, lead: &LeadRecord) -> Result<Ack, SubmitError> {
        tracing::info!(
            title = %lead.title,
            name = %lead.name,
            phone = %lead.phone,
            comments = %lead.comments_block,
            "Lead received (no CRM webhook configured)"
        );
        Ok(Ack::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead() -> LeadRecord {
        LeadRecord {
            title: "Cook".into(),
            name: "Ann".into(),
            phone: "+1".into(),
            comments_block: "Vacancy: Cook\nCV File ID: a\nVoice File ID: b".into(),
        }
    }

    #[test]
    fn sink_names() {
        let sink = BitrixWebhookSink::new(
            SecretString::from("http://127.0.0.1:1/hook"),
            Duration::from_secs(1),
        );
        assert_eq!(sink.name(), "bitrix24");
        assert_eq!(LogSink.name(), "log");
    }

    #[tokio::test]
    async fn log_sink_always_acks() {
        assert_eq!(LogSink.submit(&lead()).await.unwrap(), Ack::default());
    }

    #[tokio::test]
    async fn unreachable_webhook_is_submit_error() {
        // Port 1 is never listening.
        let sink = BitrixWebhookSink::new(
            SecretString::from("http://127.0.0.1:1/rest/1/secret/crm.lead.add.json"),
            Duration::from_secs(2),
        );
        let err = sink.submit(&lead()).await.unwrap_err();
        match err {
            SubmitError::Unreachable(msg) => assert!(!msg.contains("secret")),
            SubmitError::Timeout { .. } => {}
            other => panic!("unexpected error: {other}"),
        }
    }
}
