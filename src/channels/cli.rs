//! CLI transport, a stdin/stdout REPL for trying the flow locally.
//!
//! Buttons and attachments are typed as slash commands:
//! `/start`, `/lang ru`, `/vacancy 1`, `/apply`, `/back`,
//! `/contact +998901234567`, `/doc file123`, `/voice voice456`.
//! Any other line is sent as plain text.

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{ChatTransport, InboundUpdate, UpdateStream};
use crate::error::ChannelError;
use crate::intake::{CallbackData, IntakeEvent, UserId};
use crate::render::{Keyboard, OutgoingMessage};

/// The single local user the CLI speaks for.
pub const CLI_USER_ID: UserId = 1;

/// A simple CLI transport that reads from stdin and writes to stdout.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn one input line into an event.
pub fn parse_line(line: &str) -> Result<IntakeEvent, String> {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Ok(IntakeEvent::TextReceived(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let need_arg = |what: &str| {
        if arg.is_empty() {
            Err(format!("/{name} needs {what}"))
        } else {
            Ok(arg.to_string())
        }
    };

    match name {
        "start" => Ok(IntakeEvent::StartRequested),
        "lang" => format!("lang_{arg}")
            .parse::<CallbackData>()
            .map(CallbackData::into_event),
        "vacancy" => format!("vacancy_{arg}")
            .parse::<CallbackData>()
            .map(CallbackData::into_event),
        "apply" => Ok(IntakeEvent::ApplyRequested),
        "back" => Ok(IntakeEvent::BackRequested),
        "contact" => need_arg("a phone number").map(IntakeEvent::ContactReceived),
        "doc" => need_arg("a file reference").map(IntakeEvent::DocumentReceived),
        "voice" => need_arg("a file reference").map(IntakeEvent::VoiceReceived),
        other => Err(format!("unknown command /{other}")),
    }
}

#[async_trait]
impl ChatTransport for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<UpdateStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        match parse_line(&line) {
                            Ok(event) => {
                                let update = InboundUpdate::new(
                                    CLI_USER_ID,
                                    CLI_USER_ID.to_string(),
                                    event,
                                );
                                if tx.send(update).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                eprintln!("⚠️  {e}");
                                eprint!("> ");
                            }
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn send(&self, _chat_id: &str, message: &OutgoingMessage) -> Result<(), ChannelError> {
        println!("\n{}", message.text);
        match &message.keyboard {
            Keyboard::Inline(rows) => {
                for button in rows.iter().flatten() {
                    println!("  [{}]  {}", button.label, cli_hint(&button.data));
                }
            }
            Keyboard::RequestContact { label } => println!("  [{label}]  /contact <phone>"),
            Keyboard::Remove | Keyboard::None => {}
        }
        println!();
        eprint!("> ");
        Ok(())
    }
}

/// The command that stands in for pressing a button.
fn cli_hint(data: &CallbackData) -> String {
    match data {
        CallbackData::Language(code) => format!("/lang {code}"),
        CallbackData::Vacancy(id) => format!("/vacancy {id}"),
        CallbackData::StartApplication => "/apply".to_string(),
        CallbackData::BackToVacancies => "/back".to_string(),
    }
}
