use std::sync::Arc;

use anyhow::Context;

use vacancy_intake::bot::IntakeBot;
use vacancy_intake::channels::{ChatTransport, CliChannel, TelegramChannel};
use vacancy_intake::config::BotConfig;
use vacancy_intake::crm::{BitrixWebhookSink, LogSink};
use vacancy_intake::intake::{IntakeMachine, LeadSink, SessionStore, VacancyCatalog};
use vacancy_intake::server::{ServerState, intake_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("📋 Vacancy Intake v{}", env!("CARGO_PKG_VERSION"));

    // ── Catalog ─────────────────────────────────────────────────────────
    let catalog = Arc::new(
        VacancyCatalog::load(&config.vacancies_path).with_context(|| {
            format!(
                "failed to load vacancies from {}",
                config.vacancies_path.display()
            )
        })?,
    );
    eprintln!(
        "   Vacancies: {} from {}",
        catalog.len(),
        config.vacancies_path.display()
    );

    let store = SessionStore::new();
    let machine = Arc::new(IntakeMachine::new(Arc::clone(&store), Arc::clone(&catalog)));

    // ── CRM sink ────────────────────────────────────────────────────────
    let sink: Arc<dyn LeadSink> = match config.crm_webhook_url.clone() {
        Some(url) => {
            eprintln!("   CRM: Bitrix24 webhook (timeout {:?})", config.crm_timeout);
            Arc::new(BitrixWebhookSink::new(url, config.crm_timeout))
        }
        None => {
            eprintln!("   CRM: disabled (leads are logged only)");
            Arc::new(LogSink)
        }
    };

    // ── HTTP ────────────────────────────────────────────────────────────
    if config.http_port != 0 {
        let app = intake_routes(ServerState {
            catalog: Arc::clone(&catalog),
            store: Arc::clone(&store),
        });
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port)).await?;
        eprintln!("   HTTP: http://0.0.0.0:{}/health", config.http_port);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "HTTP server stopped");
            }
        });
    }

    // ── Transport ───────────────────────────────────────────────────────
    let transport: Arc<dyn ChatTransport> = match config.telegram_token.clone() {
        Some(token) => {
            eprintln!(
                "   Telegram: enabled (allowed: {})",
                if config.allowed_users.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    config.allowed_users.join(", ")
                }
            );
            Arc::new(TelegramChannel::new(token, config.allowed_users.clone()))
        }
        None => {
            eprintln!("   Telegram: disabled (TELEGRAM_BOT_TOKEN not set), using CLI");
            eprintln!("   Try /start, /lang en, /vacancy 1, /apply ...\n");
            Arc::new(CliChannel::new())
        }
    };

    IntakeBot::new(machine, transport, sink).run().await?;

    Ok(())
}
