//! Bot loop: routes inbound updates through the state machine and back out.
//!
//! Every user gets a worker task fed by an unbounded queue, so one user's
//! updates are handled strictly in arrival order while different users run
//! concurrently. A worker that sits idle closes its queue and exits; the next
//! update for that user starts a fresh one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channels::{ChatTransport, InboundUpdate};
use crate::error::ChannelError;
use crate::intake::{Directive, IntakeMachine, LeadSink, UserId, spawn_submission};
use crate::render::{render, render_internal_error};

/// How long a user's worker waits for the next update before exiting.
pub const DEFAULT_WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Wires a transport, the intake machine and a lead sink together.
pub struct IntakeBot {
    machine: Arc<IntakeMachine>,
    transport: Arc<dyn ChatTransport>,
    sink: Arc<dyn LeadSink>,
    worker_idle_timeout: Duration,
}

impl IntakeBot {
    pub fn new(
        machine: Arc<IntakeMachine>,
        transport: Arc<dyn ChatTransport>,
        sink: Arc<dyn LeadSink>,
    ) -> Self {
        Self {
            machine,
            transport,
            sink,
            worker_idle_timeout: DEFAULT_WORKER_IDLE_TIMEOUT,
        }
    }

    pub fn with_worker_idle_timeout(mut self, timeout: Duration) -> Self {
        self.worker_idle_timeout = timeout;
        self
    }

    /// Consume the transport's updates until the stream ends.
    pub async fn run(self) -> Result<(), ChannelError> {
        if let Err(e) = self.transport.health_check().await {
            warn!(transport = self.transport.name(), error = %e, "Transport health check failed");
        }

        let mut updates = self.transport.start().await?;
        info!(
            transport = self.transport.name(),
            sink = self.sink.name(),
            "Intake bot started"
        );

        let (exited_tx, mut exited_rx) = mpsc::unbounded_channel();
        let mut pool = WorkerPool::new(Arc::new(self), exited_tx);

        loop {
            tokio::select! {
                update = updates.next() => match update {
                    Some(update) => pool.dispatch(update),
                    None => break,
                },
                Some(user_id) = exited_rx.recv() => pool.reap(user_id),
            }
        }

        info!(workers = pool.len(), "Update stream ended");
        Ok(())
    }

    /// Handle one update end to end.
    ///
    /// Returns the background sink task when the update completed an
    /// application. The completion message is sent without waiting for it.
    pub async fn handle(&self, update: InboundUpdate) -> Option<JoinHandle<()>> {
        if let Some(callback_id) = &update.callback_id {
            if let Err(e) = self.transport.acknowledge(callback_id).await {
                warn!(user_id = update.user_id, error = %e, "Failed to acknowledge callback");
            }
        }

        let (message, submission) =
            match self.machine.transition(update.user_id, update.event).await {
                Ok(reply) => {
                    let submission = match &reply.directive {
                        Directive::Submit(lead) => {
                            Some(spawn_submission(Arc::clone(&self.sink), lead.clone()))
                        }
                        _ => None,
                    };
                    (render(&reply, self.machine.catalog()), submission)
                }
                Err(_) => {
                    let language = self.machine.store().get(update.user_id).await.language;
                    (Some(render_internal_error(language)), None)
                }
            };

        if let Some(message) = message {
            if let Err(e) = self.transport.send(&update.chat_id, &message).await {
                warn!(user_id = update.user_id, error = %e, "Failed to deliver reply");
            }
        }

        submission
    }
}

/// A running per-user worker.
struct UserWorker {
    tx: mpsc::UnboundedSender<InboundUpdate>,
    task: JoinHandle<()>,
}

/// Per-user workers keyed by user id. Entries are removed once their worker
/// has exited, which the worker reports on `exited`.
struct WorkerPool {
    bot: Arc<IntakeBot>,
    workers: HashMap<UserId, UserWorker>,
    exited: mpsc::UnboundedSender<UserId>,
}

impl WorkerPool {
    fn new(bot: Arc<IntakeBot>, exited: mpsc::UnboundedSender<UserId>) -> Self {
        Self {
            bot,
            workers: HashMap::new(),
            exited,
        }
    }

    fn len(&self) -> usize {
        self.workers.len()
    }

    /// Queue an update on its user's worker, starting one if needed.
    fn dispatch(&mut self, update: InboundUpdate) {
        let user_id = update.user_id;
        let (update, previous) = match self.workers.remove(&user_id) {
            Some(worker) => match worker.tx.send(update) {
                Ok(()) => {
                    self.workers.insert(user_id, worker);
                    return;
                }
                // Worker closed its queue (idle or panicked); start a fresh one below.
                Err(mpsc::error::SendError(update)) => (update, Some(worker.task)),
            },
            None => (update, None),
        };

        let worker = self.spawn(user_id, previous);
        if worker.tx.send(update).is_err() {
            warn!(user_id, "Dropping update: worker failed to start");
        }
        self.workers.insert(user_id, worker);
    }

    /// Forget a worker that reported its exit. A replacement started since
    /// then still has an open queue and is kept.
    fn reap(&mut self, user_id: UserId) {
        if self
            .workers
            .get(&user_id)
            .is_some_and(|worker| worker.tx.is_closed())
        {
            self.workers.remove(&user_id);
            debug!(user_id, "User worker reaped");
        }
    }

    /// Start a worker. It waits for `previous` first so updates the old worker
    /// was still draining are handled before any new ones.
    fn spawn(&self, user_id: UserId, previous: Option<JoinHandle<()>>) -> UserWorker {
        let (tx, mut rx) = mpsc::unbounded_channel::<InboundUpdate>();
        let bot = Arc::clone(&self.bot);
        let exited = self.exited.clone();
        let idle_timeout = bot.worker_idle_timeout;

        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    warn!(user_id, error = %e, "Previous user worker failed");
                }
            }
            debug!(user_id, "User worker started");

            loop {
                match tokio::time::timeout(idle_timeout, rx.recv()).await {
                    Ok(Some(update)) => {
                        bot.handle(update).await;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        // Refuse new sends, then finish what was already queued.
                        rx.close();
                        while let Ok(update) = rx.try_recv() {
                            bot.handle(update).await;
                        }
                        break;
                    }
                }
            }

            debug!(user_id, "User worker stopped");
            let _ = exited.send(user_id);
        });

        UserWorker { tx, task }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::time::timeout;

    use super::*;
    use crate::channels::UpdateStream;
    use crate::crm::LogSink;
    use crate::intake::{IntakeEvent, SessionStore, Stage, VacancyCatalog};
    use crate::render::OutgoingMessage;

    struct SilentTransport;

    #[async_trait]
    impl ChatTransport for SilentTransport {
        fn name(&self) -> &str {
            "silent"
        }

        async fn start(&self) -> Result<UpdateStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty::<InboundUpdate>()))
        }

        async fn send(
            &self,
            _chat_id: &str,
            _message: &OutgoingMessage,
        ) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn pool(idle: Duration) -> (WorkerPool, mpsc::UnboundedReceiver<UserId>, Arc<SessionStore>) {
        let store = SessionStore::new();
        let catalog =
            VacancyCatalog::from_json(r#"[{"id": 1, "titles": {"en": "Cashier"}}]"#).unwrap();
        let machine = Arc::new(IntakeMachine::new(Arc::clone(&store), Arc::new(catalog)));
        let bot = IntakeBot::new(machine, Arc::new(SilentTransport), Arc::new(LogSink))
            .with_worker_idle_timeout(idle);
        let (exited_tx, exited_rx) = mpsc::unbounded_channel();
        (WorkerPool::new(Arc::new(bot), exited_tx), exited_rx, store)
    }

    #[tokio::test]
    async fn idle_worker_is_removed_from_pool() {
        let (mut pool, mut exited, store) = pool(Duration::from_millis(20));

        pool.dispatch(InboundUpdate::new(7, "7", IntakeEvent::VacancyChosen(1)));
        assert_eq!(pool.len(), 1);

        let user_id = timeout(Duration::from_secs(2), exited.recv())
            .await
            .expect("worker should exit when idle")
            .unwrap();
        assert_eq!(user_id, 7);

        pool.reap(user_id);
        assert_eq!(pool.len(), 0);
        assert_eq!(store.get(7).await.selected_vacancy_id, Some(1));
    }

    #[tokio::test]
    async fn busy_worker_is_not_reaped() {
        let (mut pool, _exited, _store) = pool(Duration::from_secs(60));

        pool.dispatch(InboundUpdate::new(8, "8", IntakeEvent::StartRequested));
        pool.reap(8);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn update_after_idle_exit_starts_new_worker() {
        let (mut pool, mut exited, store) = pool(Duration::from_millis(20));

        pool.dispatch(InboundUpdate::new(9, "9", IntakeEvent::VacancyChosen(1)));
        timeout(Duration::from_secs(2), exited.recv())
            .await
            .expect("worker should exit when idle");

        // Not reaped yet: the closed queue refuses the send and a fresh worker takes over.
        pool.dispatch(InboundUpdate::new(9, "9", IntakeEvent::ApplyRequested));
        assert_eq!(pool.len(), 1);

        timeout(Duration::from_secs(2), exited.recv())
            .await
            .expect("replacement worker should exit when idle");
        let session = store.get(9).await;
        assert_eq!(session.stage, Stage::AwaitingName);
        assert_eq!(session.selected_vacancy_id, Some(1));
    }
}
