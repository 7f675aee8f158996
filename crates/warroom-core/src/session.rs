//! Session: the single serialization point of the bus.
//!
//! A session owns the scheduler (and through it the store, registry, and
//! question tracker) behind one mutex, so every `submit`/`interrupt`/
//! `resume`/`answer` is linearized with respect to state transitions and
//! appends. Delivery to observers goes through a broadcast channel that never
//! blocks writers: a slow observer lags, gets dropped by the channel, and
//! re-syncs by reconnecting with its message-id cursor.
//!
//! Sessions are independent values; run as many concurrently as you like.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;
use warroom_proto::{
    Message, MessageDraft, ParticipantId, ParticipantState, Question, QuestionId, Result,
};

use crate::config::SessionConfig;
use crate::scheduler::{SchedulerState, TurnScheduler};
use crate::store::MessageStore;
use crate::transcript::{TranscriptError, TranscriptLog};

/// Unique identifier for a session.
pub type SessionId = Uuid;

struct Inner {
    scheduler: TurnScheduler,
    /// Highest message id already pushed to subscribers.
    last_broadcast: u64,
}

/// A live session. Cheap to clone; clones share the same underlying state.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<Message>,
}

impl Session {
    /// Creates a session from configuration.
    ///
    /// When a transcript path is configured, any existing file is replayed
    /// first: the id counter, introduction progress, and still-pending
    /// questions are restored, and subsequent appends continue the file.
    pub fn new(config: SessionConfig) -> std::result::Result<Self, TranscriptError> {
        let store = match &config.transcript_path {
            Some(path) => {
                let log = TranscriptLog::new(path);
                let messages = log.replay()?;
                if !messages.is_empty() {
                    tracing::info!(
                        path = %path.display(),
                        messages = messages.len(),
                        "Recovered session transcript"
                    );
                }
                MessageStore::recovered(messages, log)
            }
            None => MessageStore::new(),
        };

        let scheduler = TurnScheduler::with_store(&config, store);
        let last_broadcast = scheduler.store().next_id() - 1;
        let (events, _) = broadcast::channel(config.delivery_buffer.max(1));

        Ok(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            inner: Arc::new(Mutex::new(Inner {
                scheduler,
                last_broadcast,
            })),
            events,
        })
    }

    /// The session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// When the session was created (this process, not the transcript).
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Submits a message draft. On acceptance the stored message is returned
    /// and pushed to subscribers; rejections have no side effects.
    pub fn submit(&self, draft: MessageDraft) -> Result<Message> {
        let mut inner = self.lock();
        let result = inner.scheduler.submit(draft);
        self.notify(&mut inner);
        result
    }

    /// Explicit "hold on": pauses every agent. Idempotent.
    pub fn interrupt(&self, by: ParticipantId) -> Result<()> {
        self.lock().scheduler.interrupt(by)
    }

    /// Resumes a paused session.
    pub fn resume(&self) -> Result<()> {
        self.lock().scheduler.resume()
    }

    /// Answers a pending question on behalf of `from`.
    pub fn answer_from(
        &self,
        id: QuestionId,
        from: ParticipantId,
        response: &str,
    ) -> Result<Question> {
        let mut inner = self.lock();
        let result = inner.scheduler.answer(id, from, response);
        self.notify(&mut inner);
        result
    }

    /// Answers a pending question as the user — the common case.
    pub fn answer(&self, id: QuestionId, response: &str) -> Result<Question> {
        self.answer_from(id, ParticipantId::User, response)
    }

    /// Expires overdue questions now. The scheduler also sweeps lazily on
    /// every submit/answer; this exists for scheduled sweeps so a completely
    /// idle session still unblocks.
    pub fn expire_stale(&self) {
        let mut inner = self.lock();
        inner.scheduler.expire_stale();
        self.notify(&mut inner);
    }

    /// All messages with `id > last_id`, exactly-once under polling.
    pub fn read_since(&self, last_id: u64) -> Vec<Message> {
        self.lock().scheduler.store().read_since(last_id)
    }

    /// The full transcript.
    pub fn transcript(&self) -> Vec<Message> {
        self.lock().scheduler.store().all().to_vec()
    }

    /// Number of messages in the transcript.
    pub fn message_count(&self) -> usize {
        self.lock().scheduler.store().len()
    }

    /// Subscribes an observer at a cursor: returns the backlog after
    /// `last_id` plus a live receiver for everything that follows.
    ///
    /// Both are taken under the session lock, so no message can fall between
    /// the backlog and the live stream. The receiver yields each message at
    /// most once and in id order; if the observer falls behind the channel
    /// capacity it receives a lag error and should reconnect with its cursor.
    pub fn subscribe(&self, last_id: u64) -> (Vec<Message>, broadcast::Receiver<Message>) {
        let inner = self.lock();
        let receiver = self.events.subscribe();
        let backlog = inner.scheduler.store().read_since(last_id);
        (backlog, receiver)
    }

    /// Current scheduler state.
    pub fn state(&self) -> SchedulerState {
        self.lock().scheduler.state()
    }

    /// The participant holding the current interrupt, if paused.
    pub fn current_interrupt(&self) -> Option<ParticipantId> {
        self.lock().scheduler.current_interrupt()
    }

    /// Snapshot of every participant's state.
    pub fn participants(&self) -> Vec<(ParticipantId, ParticipantState)> {
        self.lock().scheduler.registry().snapshot()
    }

    /// State of a single participant.
    pub fn participant_state(&self, id: ParticipantId) -> Result<ParticipantState> {
        self.lock().scheduler.registry().get_state(id)
    }

    /// A question by id, whatever its status.
    pub fn question(&self, id: QuestionId) -> Option<Question> {
        self.lock().scheduler.tracker().get(id).cloned()
    }

    /// All currently pending questions.
    pub fn pending_questions(&self) -> Vec<Question> {
        self.lock()
            .scheduler
            .tracker()
            .pending()
            .into_iter()
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-transition; the transcript can no
        // longer be trusted, so halting is the correct response.
        self.inner.lock().expect("session state poisoned")
    }

    /// Pushes every not-yet-delivered message to subscribers, in id order.
    fn notify(&self, inner: &mut Inner) {
        for message in inner.scheduler.store().read_since(inner.last_broadcast) {
            inner.last_broadcast = message.id;
            // No live subscribers is fine; pollers catch up via read_since.
            let _ = self.events.send(message);
        }
    }
}
