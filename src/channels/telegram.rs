//! Telegram transport using Bot API long-polling.
//!
//! Messages (text, contact, document, voice) and inline-button callbacks are
//! decoded into intake events here; nothing platform-specific leaks past
//! this module.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};

use super::{ChatTransport, InboundUpdate, UpdateStream};
use crate::error::ChannelError;
use crate::intake::{CallbackData, IntakeEvent};
use crate::render::{Keyboard, OutgoingMessage};

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Telegram transport. Connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: SecretString,
    allowed_users: Vec<String>,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token,
            allowed_users,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.bot_token, method)
    }

    /// Send a text message, splitting at Telegram's 4096 char limit.
    /// The keyboard goes on the last chunk.
    async fn send_message(
        &self,
        chat_id: &str,
        message: &OutgoingMessage,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(&message.text, TELEGRAM_MAX_MESSAGE_LENGTH);
        let markup = reply_markup(&message.keyboard);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.iter().enumerate() {
            let markup = if i == last { markup.as_ref() } else { None };
            self.send_message_chunk(chat_id, chunk, markup, message.markdown)
                .await?;
        }
        Ok(())
    }

    /// Send a single message chunk (≤4096 chars), Markdown-first with fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        markup: Option<&Value>,
        markdown: bool,
    ) -> Result<(), ChannelError> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = markup {
            body["reply_markup"] = markup.clone();
        }

        let mut markdown_status = None;
        if markdown {
            let mut markdown_body = body.clone();
            markdown_body["parse_mode"] = Value::String("Markdown".into());

            let resp = self.post("sendMessage", &markdown_body).await?;
            if resp.status().is_success() {
                return Ok(());
            }

            let status = resp.status();
            tracing::warn!(
                status = ?status,
                "Telegram sendMessage with Markdown failed; retrying without parse_mode"
            );
            markdown_status = Some(status);
        }

        let resp = self.post("sendMessage", &body).await?;
        if !resp.status().is_success() {
            let plain_err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: match markdown_status {
                    Some(status) => {
                        format!("sendMessage failed (markdown: {status}, plain: {plain_err})")
                    }
                    None => format!("sendMessage failed: {plain_err}"),
                },
            });
        }

        Ok(())
    }

    async fn post(&self, method: &str, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.without_url().to_string(),
            })
    }
}

// ── Transport implementation ────────────────────────────────────────

#[async_trait]
impl ChatTransport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<UpdateStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_users = self.allowed_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for updates...");

            loop {
                let body = json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message", "callback_query"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {}", e.without_url());
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {}", e.without_url());
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let Some(results) = data.get("result").and_then(Value::as_array) else {
                    let description = data
                        .get("description")
                        .and_then(Value::as_str)
                        .unwrap_or("no result");
                    tracing::warn!("Telegram getUpdates failed: {description}");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(inbound) = decode_update(update, &allowed_users) else {
                        continue;
                    };

                    if tx.send(inbound).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, chat_id: &str, message: &OutgoingMessage) -> Result<(), ChannelError> {
        self.send_message(chat_id, message).await
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), ChannelError> {
        let resp = self
            .post(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        if !resp.status().is_success() {
            tracing::debug!(status = ?resp.status(), "answerCallbackQuery failed");
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: e.without_url().to_string(),
            })?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }
}

// ── Decoding ────────────────────────────────────────────────────────

fn api_url(token: &SecretString, method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{method}", token.expose_secret())
}

/// Decode one `getUpdates` entry. Returns `None` for updates the bot does not
/// handle, unauthorized senders and malformed button payloads.
fn decode_update(update: &Value, allowed_users: &[String]) -> Option<InboundUpdate> {
    if let Some(query) = update.get("callback_query") {
        return decode_callback(query, allowed_users);
    }
    decode_message(update.get("message")?, allowed_users)
}

fn decode_message(message: &Value, allowed_users: &[String]) -> Option<InboundUpdate> {
    let from = message.get("from")?;
    let user_id = authorized_user(from, allowed_users)?;
    let chat_id = message.get("chat")?.get("id")?.as_i64()?.to_string();

    let file_id = |kind: &str| {
        message
            .get(kind)
            .and_then(|d| d.get("file_id"))
            .and_then(Value::as_str)
            .map(String::from)
    };

    let event = if let Some(text) = message.get("text").and_then(Value::as_str) {
        match text.trim() {
            "/start" => IntakeEvent::StartRequested,
            cmd if cmd.starts_with('/') => {
                tracing::debug!(user_id, command = cmd, "Ignoring unknown command");
                return None;
            }
            _ => IntakeEvent::TextReceived(text.to_string()),
        }
    } else if let Some(phone) = message
        .get("contact")
        .and_then(|c| c.get("phone_number"))
        .and_then(Value::as_str)
    {
        IntakeEvent::ContactReceived(phone.to_string())
    } else if let Some(id) = file_id("document") {
        IntakeEvent::DocumentReceived(id)
    } else if let Some(id) = file_id("voice") {
        IntakeEvent::VoiceReceived(id)
    } else {
        return None;
    };

    Some(InboundUpdate::new(user_id, chat_id, event))
}

fn decode_callback(query: &Value, allowed_users: &[String]) -> Option<InboundUpdate> {
    let from = query.get("from")?;
    let user_id = authorized_user(from, allowed_users)?;
    let callback_id = query.get("id")?.as_str()?;
    let chat_id = query
        .get("message")
        .and_then(|m| m.get("chat"))
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)
        .unwrap_or(user_id)
        .to_string();

    let raw = query.get("data").and_then(Value::as_str).unwrap_or_default();
    let data: CallbackData = match raw.parse() {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Dropping malformed callback payload");
            return None;
        }
    };

    Some(InboundUpdate::new(user_id, chat_id, data.into_event()).with_callback_id(callback_id))
}

/// Numeric user id of `from`, if the sender passes the allowlist.
fn authorized_user(from: &Value, allowed_users: &[String]) -> Option<i64> {
    let user_id = from.get("id").and_then(Value::as_i64)?;
    let username = from
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let user_id_str = user_id.to_string();

    if !check_user_allowed(allowed_users, [username, user_id_str.as_str()]) {
        tracing::warn!(
            "Telegram: ignoring update from unauthorized user: username={username}, user_id={user_id}"
        );
        return None;
    }
    Some(user_id)
}

/// Check if any identity in the iterator matches the allowed users list.
fn check_user_allowed<'a>(
    allowed_users: &[String],
    identities: impl IntoIterator<Item = &'a str>,
) -> bool {
    let ids: Vec<&str> = identities.into_iter().collect();
    allowed_users
        .iter()
        .any(|u| u == "*" || ids.contains(&u.as_str()))
}

/// Bot API `reply_markup` for a keyboard, if any.
fn reply_markup(keyboard: &Keyboard) -> Option<Value> {
    match keyboard {
        Keyboard::None => None,
        Keyboard::Inline(rows) => {
            let rows: Vec<Vec<Value>> = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|b| json!({ "text": b.label, "callback_data": b.data.to_string() }))
                        .collect()
                })
                .collect();
            Some(json!({ "inline_keyboard": rows }))
        }
        Keyboard::RequestContact { label } => Some(json!({
            "keyboard": [[{ "text": label, "request_contact": true }]],
            "resize_keyboard": true,
            "one_time_keyboard": true
        })),
        Keyboard::Remove => Some(json!({ "remove_keyboard": true })),
    }
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut cut = max_len;
        while !remaining.is_char_boundary(cut) {
            cut -= 1;
        }

        // Find a good split point
        let chunk = &remaining[..cut];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(cut);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { cut } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
