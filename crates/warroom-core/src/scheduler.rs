//! Turn scheduling: who may emit a message, and when.
//!
//! The scheduler drives a session through its phases. Every session starts in
//! an introduction round where each configured agent speaks exactly once, in
//! order, optionally gating on a question to the user. After the round the
//! discussion opens: anyone may speak, but a user message always wins — it
//! freezes every agent until an explicit resume ("hold on" semantics).
//!
//! The scheduler is the sole writer of the message store, the participant
//! registry, and the question tracker. Callers that are not allowed to speak
//! get a fast [`BusError::Rejected`] and are expected to retry later; they
//! are never blocked waiting.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use warroom_proto::{
    BusError, Message, MessageDraft, MessageType, ParticipantId, ParticipantState, Question,
    QuestionId, Result,
};

use crate::config::SessionConfig;
use crate::questions::QuestionTracker;
use crate::registry::ParticipantRegistry;
use crate::store::MessageStore;

/// Content recorded for a question that expired unanswered.
const NO_RESPONSE: &str = "(no response)";

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Agents are introducing themselves in the configured order.
    Introduction,
    /// A pending question is open; its asker (and, during introductions,
    /// the whole round) is blocked until it resolves.
    AwaitingAnswer,
    /// Free discussion; any participant may emit at any time.
    OpenDiscussion,
    /// A user interrupt froze all agents until resume.
    Paused,
}

/// The turn-taking state machine for one session.
pub struct TurnScheduler {
    store: MessageStore,
    registry: ParticipantRegistry,
    tracker: QuestionTracker,
    order: Vec<ParticipantId>,
    next_intro: usize,
    interrupted_by: Option<ParticipantId>,
}

impl TurnScheduler {
    /// Creates a scheduler with a fresh, empty message store.
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_store(config, MessageStore::new())
    }

    /// Creates a scheduler over an existing store, reconstructing the
    /// introduction progress and still-pending questions from its contents.
    ///
    /// Pause state is not part of the transcript; a recovered session always
    /// starts unpaused.
    pub fn with_store(config: &SessionConfig, store: MessageStore) -> Self {
        let order = config.introduction_order.clone();
        let mut tracker = QuestionTracker::new(config.question_timeout());
        let mut registry = ParticipantRegistry::new();

        let mut next_intro = 0;
        let mut open_questions: Vec<Question> = Vec::new();
        for message in store.all() {
            if message.kind == MessageType::Introduction
                && next_intro < order.len()
                && message.from == order[next_intro]
            {
                next_intro += 1;
            }
            if let Some(question) = &message.question {
                open_questions.push(question.clone());
            }
            if message.kind == MessageType::Answer {
                if let Some(resolved) = message.in_reply_to {
                    open_questions.retain(|q| q.id != resolved);
                }
            }
        }

        for question in open_questions {
            let _ = registry.set_state(question.asked_by, ParticipantState::AwaitingAnswer);
            tracker.restore(question);
        }

        Self {
            store,
            registry,
            tracker,
            order,
            next_intro,
            interrupted_by: None,
        }
    }

    /// The current observable state.
    pub fn state(&self) -> SchedulerState {
        if self.interrupted_by.is_some() {
            SchedulerState::Paused
        } else if self.tracker.has_pending() {
            SchedulerState::AwaitingAnswer
        } else if self.next_intro < self.order.len() {
            SchedulerState::Introduction
        } else {
            SchedulerState::OpenDiscussion
        }
    }

    /// The participant whose interrupt is currently holding the session, if any.
    pub fn current_interrupt(&self) -> Option<ParticipantId> {
        self.interrupted_by
    }

    /// Read access to the message store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Read access to the participant registry.
    pub fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// Read access to the question tracker.
    pub fn tracker(&self) -> &QuestionTracker {
        &self.tracker
    }

    /// Validates a draft against the current state and, on acceptance,
    /// appends it to the store. Rejections have no side effects.
    pub fn submit(&mut self, draft: MessageDraft) -> Result<Message> {
        draft.validate()?;
        self.check_sender_kind(&draft)?;
        self.sweep_expired();

        if self.interrupted_by.is_some() {
            self.submit_paused(draft)
        } else if self.next_intro < self.order.len() {
            self.submit_introduction(draft)
        } else {
            self.submit_open(draft)
        }
    }

    /// Explicit pause trigger. Idempotent: interrupting an already paused
    /// session is a no-op.
    pub fn interrupt(&mut self, by: ParticipantId) -> Result<()> {
        if by != ParticipantId::User {
            return Err(BusError::Rejected(format!("{by} cannot interrupt")));
        }
        if self.interrupted_by.is_some() {
            return Ok(());
        }
        if self.next_intro < self.order.len() {
            return Err(BusError::Rejected(
                "cannot interrupt during introductions".to_string(),
            ));
        }
        self.pause(by);
        Ok(())
    }

    /// Explicit resume trigger. Fails with [`BusError::NotPaused`] if the
    /// session is not paused; state is unchanged in that case.
    pub fn resume(&mut self) -> Result<()> {
        if self.interrupted_by.is_none() {
            return Err(BusError::NotPaused);
        }
        self.interrupted_by = None;
        self.registry.set_all_agents(ParticipantState::Idle);
        for asked_by in self.pending_askers() {
            let _ = self
                .registry
                .set_state(asked_by, ParticipantState::AwaitingAnswer);
        }
        info!("Session resumed; agents may speak again");
        Ok(())
    }

    /// Accepts the answer to a pending question and appends it to the
    /// transcript as an `answer` message from `from`.
    pub fn answer(
        &mut self,
        id: QuestionId,
        from: ParticipantId,
        response: &str,
    ) -> Result<Question> {
        self.sweep_expired();

        if self.interrupted_by.is_some() && from.is_agent() {
            return Err(BusError::Rejected(
                "session is paused; agents cannot answer".to_string(),
            ));
        }

        let asked_by = self
            .tracker
            .get(id)
            .filter(|q| q.is_pending())
            .map(|q| q.asked_by)
            .ok_or(BusError::QuestionNotFound(id))?;

        let draft = MessageDraft::new(from, asked_by, MessageType::Answer, response);
        draft.validate()?;

        let question = self.tracker.answer(id, response)?;
        self.store.append(&draft, None, Some(id))?;
        self.release_asker(asked_by);

        debug!(question = %id, from = %from, "Question answered");
        Ok(question)
    }

    /// Expires every overdue pending question, recording an implicit
    /// "no response" answer for each. Called lazily on submit/answer and
    /// available to callers for scheduled sweeps.
    pub fn expire_stale(&mut self) {
        self.sweep_expired();
    }

    fn submit_paused(&mut self, draft: MessageDraft) -> Result<Message> {
        match draft.from {
            ParticipantId::User | ParticipantId::System => self.accept(&draft),
            _ => Err(BusError::Rejected(
                "session is paused; awaiting resume".to_string(),
            )),
        }
    }

    fn submit_introduction(&mut self, draft: MessageDraft) -> Result<Message> {
        match draft.from {
            ParticipantId::System => return self.accept(&draft),
            ParticipantId::User => {
                return Err(BusError::Rejected(
                    "introductions in progress; answer the open question or wait".to_string(),
                ));
            }
            _ => {}
        }

        if self.tracker.has_pending() {
            return Err(BusError::Rejected(
                "introduction blocked until the pending question is resolved".to_string(),
            ));
        }

        let expected = self.order[self.next_intro];
        if draft.from != expected {
            return if self.order[..self.next_intro].contains(&draft.from) {
                Err(BusError::Rejected(format!(
                    "{} already introduced",
                    draft.from
                )))
            } else {
                Err(BusError::Rejected(format!(
                    "waiting for {expected} to introduce"
                )))
            };
        }

        if draft.kind != MessageType::Introduction {
            return Err(BusError::Rejected(
                "only introductions are accepted during the introduction round".to_string(),
            ));
        }

        let message = self.accept(&draft)?;
        self.next_intro += 1;
        if self.next_intro == self.order.len() {
            debug!("All agents introduced");
        }
        Ok(message)
    }

    fn submit_open(&mut self, draft: MessageDraft) -> Result<Message> {
        if draft.kind == MessageType::Introduction {
            return Err(BusError::Rejected(
                "the introduction round is over".to_string(),
            ));
        }

        let message = self.accept(&draft)?;

        // A user message always wins: freeze every agent until resume.
        if draft.from == ParticipantId::User {
            self.pause(draft.from);
        }

        Ok(message)
    }

    /// Rejects sender/kind pairs that are never valid in any state, so the
    /// caller learns not to retry them.
    fn check_sender_kind(&self, draft: &MessageDraft) -> Result<()> {
        let allowed = match draft.from {
            ParticipantId::User => matches!(
                draft.kind,
                MessageType::UserInput | MessageType::Question
            ),
            ParticipantId::System => draft.kind == MessageType::System,
            _ => !matches!(
                draft.kind,
                MessageType::UserInput | MessageType::System | MessageType::Answer
            ),
        };
        if !allowed {
            if draft.kind == MessageType::Answer {
                return Err(BusError::InvalidMessage(
                    "answers are submitted via the answer operation".to_string(),
                ));
            }
            return Err(BusError::InvalidMessage(format!(
                "{} cannot send {:?} messages",
                draft.from, draft.kind
            )));
        }
        Ok(())
    }

    /// Opens the embedded question (if any), appends, and updates speaker
    /// states.
    fn accept(&mut self, draft: &MessageDraft) -> Result<Message> {
        let question = match &draft.question {
            Some(q) => Some(self.tracker.open(draft.from, q.options.clone())?),
            None => None,
        };
        let has_question = question.is_some();

        let message = self.store.append(draft, question, None)?;

        for (id, state) in self.registry.snapshot() {
            if state == ParticipantState::Speaking {
                let _ = self.registry.set_state(id, ParticipantState::Idle);
            }
        }
        let new_state = if has_question {
            ParticipantState::AwaitingAnswer
        } else {
            ParticipantState::Speaking
        };
        let _ = self.registry.set_state(draft.from, new_state);

        Ok(message)
    }

    fn pause(&mut self, by: ParticipantId) {
        self.interrupted_by = Some(by);
        self.registry.set_all_agents(ParticipantState::Paused);
        info!(by = %by, "Hold on: all agents paused");
    }

    fn sweep_expired(&mut self) {
        let expired = self.tracker.expire_stale(Utc::now());
        for question in expired {
            // Expiry counts as an implicit "no response" answer so observers
            // and transcript replay see the question resolve.
            let draft = MessageDraft::new(
                ParticipantId::System,
                question.asked_by,
                MessageType::Answer,
                NO_RESPONSE,
            );
            match self.store.append(&draft, None, Some(question.id)) {
                Ok(_) => debug!(question = %question.id, "Question expired unanswered"),
                Err(e) => debug!(question = %question.id, error = %e, "Expiry record failed"),
            }
            self.release_asker(question.asked_by);
        }
    }

    /// Clears a resolved question's hold on its asker, respecting an active
    /// pause.
    fn release_asker(&mut self, asked_by: ParticipantId) {
        let state = if self.interrupted_by.is_some() && asked_by.is_agent() {
            ParticipantState::Paused
        } else {
            ParticipantState::Idle
        };
        let _ = self.registry.set_state(asked_by, state);
    }

    fn pending_askers(&self) -> Vec<ParticipantId> {
        self.tracker.pending().iter().map(|q| q.asked_by).collect()
    }
}
