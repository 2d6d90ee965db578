//! Bot loop tests with an in-memory transport and sink.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use vacancy_intake::bot::IntakeBot;
use vacancy_intake::channels::{ChatTransport, InboundUpdate, UpdateStream};
use vacancy_intake::error::{ChannelError, SubmitError};
use vacancy_intake::intake::{
    Ack, CallbackData, IntakeEvent, IntakeMachine, LanguageCode, LeadRecord, LeadSink,
    SessionStore, Stage, VacancyCatalog,
};
use vacancy_intake::locale::Text;
use vacancy_intake::render::{Keyboard, OutgoingMessage};

const CATALOG: &str = r#"[
    {"id": 1, "titles": {"en": "Sales Manager", "ru": "Менеджер по продажам"}},
    {"id": 2, "titles": {"en": "Warehouse Operator"}}
]"#;

#[derive(Default)]
struct RecordingTransport {
    queued: Mutex<Vec<InboundUpdate>>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    acked: Mutex<Vec<String>>,
}

impl RecordingTransport {
    fn with_updates(updates: Vec<InboundUpdate>) -> Self {
        Self {
            queued: Mutex::new(updates),
            ..Default::default()
        }
    }

    async fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|(_, m)| m.text.clone())
            .collect()
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&self) -> Result<UpdateStream, ChannelError> {
        let updates = std::mem::take(&mut *self.queued.lock().await);
        Ok(Box::pin(futures::stream::iter(updates)))
    }

    async fn send(&self, chat_id: &str, message: &OutgoingMessage) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .await
            .push((chat_id.to_string(), message.clone()));
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), ChannelError> {
        self.acked.lock().await.push(callback_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSink {
    leads: Mutex<Vec<LeadRecord>>,
    fail: bool,
}

#[async_trait]
impl LeadSink for RecordingSink {
    fn name(&self) -> &str {
        "recording"
    }

    async fn submit(&self, lead: &LeadRecord) -> Result<Ack, SubmitError> {
        self.leads.lock().await.push(lead.clone());
        if self.fail {
            Err(SubmitError::Unreachable("connection refused".into()))
        } else {
            Ok(Ack { lead_id: Some(17) })
        }
    }
}

/// Holds every submission until released.
#[derive(Default)]
struct GatedSink {
    release: Notify,
    submitted: Mutex<Vec<LeadRecord>>,
}

#[async_trait]
impl LeadSink for GatedSink {
    fn name(&self) -> &str {
        "gated"
    }

    async fn submit(&self, lead: &LeadRecord) -> Result<Ack, SubmitError> {
        self.release.notified().await;
        self.submitted.lock().await.push(lead.clone());
        Ok(Ack::default())
    }
}

struct Harness {
    bot: IntakeBot,
    store: Arc<SessionStore>,
    transport: Arc<RecordingTransport>,
    sink: Arc<RecordingSink>,
}

fn harness(transport: RecordingTransport, sink: RecordingSink) -> Harness {
    let store = SessionStore::new();
    let catalog = Arc::new(VacancyCatalog::from_json(CATALOG).unwrap());
    let machine = Arc::new(IntakeMachine::new(Arc::clone(&store), catalog));
    let transport = Arc::new(transport);
    let sink = Arc::new(sink);
    let bot = IntakeBot::new(
        machine,
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        Arc::clone(&sink) as Arc<dyn LeadSink>,
    );
    Harness {
        bot,
        store,
        transport,
        sink,
    }
}

fn application(user_id: i64, lang: LanguageCode) -> Vec<InboundUpdate> {
    let chat = user_id.to_string();
    vec![
        InboundUpdate::new(user_id, &chat, IntakeEvent::StartRequested),
        InboundUpdate::new(
            user_id,
            &chat,
            CallbackData::Language(lang).into_event(),
        )
        .with_callback_id(format!("cb-lang-{user_id}")),
        InboundUpdate::new(user_id, &chat, CallbackData::Vacancy(1).into_event())
            .with_callback_id(format!("cb-vac-{user_id}")),
        InboundUpdate::new(user_id, &chat, CallbackData::StartApplication.into_event())
            .with_callback_id(format!("cb-apply-{user_id}")),
        InboundUpdate::new(user_id, &chat, IntakeEvent::TextReceived("Ivan Petrov".into())),
        InboundUpdate::new(
            user_id,
            &chat,
            IntakeEvent::ContactReceived("+998901234567".into()),
        ),
        InboundUpdate::new(user_id, &chat, IntakeEvent::DocumentReceived("file123".into())),
        InboundUpdate::new(user_id, &chat, IntakeEvent::VoiceReceived("voice456".into())),
    ]
}

#[tokio::test]
async fn full_application_is_rendered_and_submitted() {
    let h = harness(RecordingTransport::default(), RecordingSink::default());

    let mut submissions = Vec::new();
    for update in application(55, LanguageCode::Ru) {
        if let Some(task) = h.bot.handle(update).await {
            submissions.push(task);
        }
    }
    assert_eq!(submissions.len(), 1);
    for task in submissions {
        task.await.unwrap();
    }

    let texts = h.transport.texts().await;
    assert_eq!(texts.len(), 8);
    assert_eq!(texts[0], Text::ChooseLanguage.get(LanguageCode::En));
    assert_eq!(texts[1], Text::AvailableVacancies.get(LanguageCode::Ru));
    assert!(texts[2].contains("Менеджер по продажам"));
    assert_eq!(texts[3], Text::StartApplication.get(LanguageCode::Ru));
    assert_eq!(texts[4], Text::SharePhone.get(LanguageCode::Ru));
    assert_eq!(texts[7], Text::ApplicationComplete.get(LanguageCode::Ru));

    let sent = h.transport.sent.lock().await;
    assert!(sent.iter().all(|(chat, _)| chat == "55"));
    assert!(matches!(sent[4].1.keyboard, Keyboard::RequestContact { .. }));
    drop(sent);

    assert_eq!(
        *h.transport.acked.lock().await,
        vec!["cb-lang-55", "cb-vac-55", "cb-apply-55"]
    );

    let leads = h.sink.leads.lock().await;
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].title, "Менеджер по продажам");
    assert_eq!(leads[0].name, "Ivan Petrov");
    assert_eq!(leads[0].phone, "+998901234567");

    assert_eq!(h.store.get(55).await.stage, Stage::Idle);
}

#[tokio::test]
async fn ignored_events_send_nothing() {
    let h = harness(RecordingTransport::default(), RecordingSink::default());

    let task = h
        .bot
        .handle(InboundUpdate::new(9, "9", IntakeEvent::VoiceReceived("v".into())))
        .await;
    assert!(task.is_none());
    assert!(h.transport.texts().await.is_empty());
}

#[tokio::test]
async fn sink_failure_still_confirms_to_user() {
    let sink = RecordingSink {
        fail: true,
        ..Default::default()
    };
    let h = harness(RecordingTransport::default(), sink);

    for update in application(3, LanguageCode::En) {
        if let Some(task) = h.bot.handle(update).await {
            task.await.unwrap();
        }
    }

    // One attempt, no retry; the user is told the application went through.
    assert_eq!(h.sink.leads.lock().await.len(), 1);
    assert_eq!(
        h.transport.texts().await.last().map(String::as_str),
        Some(Text::ApplicationComplete.get(LanguageCode::En))
    );
    assert_eq!(h.store.get(3).await.stage, Stage::Idle);
}

#[tokio::test]
async fn completion_reply_does_not_wait_for_sink() {
    let store = SessionStore::new();
    let catalog = Arc::new(VacancyCatalog::from_json(CATALOG).unwrap());
    let machine = Arc::new(IntakeMachine::new(Arc::clone(&store), catalog));
    let transport = Arc::new(RecordingTransport::default());
    let sink = Arc::new(GatedSink::default());
    let bot = IntakeBot::new(
        machine,
        Arc::clone(&transport) as Arc<dyn ChatTransport>,
        Arc::clone(&sink) as Arc<dyn LeadSink>,
    );

    let mut submission = None;
    for update in application(12, LanguageCode::En) {
        let handled = tokio::time::timeout(Duration::from_secs(2), bot.handle(update))
            .await
            .expect("handle must not block on the sink");
        if let Some(task) = handled {
            submission = Some(task);
        }
    }
    let submission = submission.expect("last update should start a submission");

    // The sink is still parked, yet the user already has the completion message.
    assert!(!submission.is_finished());
    assert!(sink.submitted.lock().await.is_empty());
    assert_eq!(
        transport.texts().await.last().map(String::as_str),
        Some(Text::ApplicationComplete.get(LanguageCode::En))
    );

    sink.release.notify_one();
    tokio::time::timeout(Duration::from_secs(2), submission)
        .await
        .expect("sink should finish once released")
        .unwrap();
    assert_eq!(sink.submitted.lock().await.len(), 1);
}

#[tokio::test]
async fn stale_vacancy_button_shows_notice() {
    let h = harness(RecordingTransport::default(), RecordingSink::default());

    h.bot
        .handle(InboundUpdate::new(
            4,
            "4",
            CallbackData::Vacancy(999).into_event(),
        ))
        .await;

    assert_eq!(
        h.transport.texts().await,
        vec![Text::VacancyUnavailable.get(LanguageCode::En).to_string()]
    );
    assert_eq!(h.store.get(4).await.stage, Stage::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn run_processes_interleaved_users() {
    let mut updates = Vec::new();
    let a = application(100, LanguageCode::Ru);
    let b = application(200, LanguageCode::En);
    for (x, y) in a.into_iter().zip(b) {
        updates.push(x);
        updates.push(y);
    }

    let h = harness(
        RecordingTransport::with_updates(updates),
        RecordingSink::default(),
    );
    let Harness {
        bot,
        transport,
        sink,
        ..
    } = h;

    bot.run().await.unwrap();

    // Workers keep draining after the stream ends.
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if sink.leads.lock().await.len() == 2 && transport.sent.lock().await.len() == 16 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("both applications should be submitted and answered");

    let mut leads = sink.leads.lock().await.clone();
    leads.sort_by(|a, b| a.title.cmp(&b.title));
    assert_eq!(leads[0].title, "Sales Manager");
    assert_eq!(leads[1].title, "Менеджер по продажам");

    let sent = transport.sent.lock().await;
    for chat in ["100", "200"] {
        let texts: Vec<&str> = sent
            .iter()
            .filter(|(c, _)| c == chat)
            .map(|(_, m)| m.text.as_str())
            .collect();
        assert_eq!(texts.len(), 8, "chat {chat} got {texts:?}");
    }
}
