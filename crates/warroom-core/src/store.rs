//! Append-only, strictly ordered message store.
//!
//! The store is the single source of truth for "what happened when": ids are
//! dense and strictly increasing, entries are immutable, and `read_since`
//! gives pollers exactly-once delivery without any client-side dedup keys.
//! A cursor of `0` reads from the beginning; the first stored message has
//! id 1.

use chrono::Utc;
use warroom_proto::{Message, MessageDraft, Question, QuestionId, Result};

use crate::transcript::TranscriptLog;

/// In-memory append-only message log, optionally backed by a JSONL transcript.
#[derive(Debug, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    transcript: Option<TranscriptLog>,
}

impl MessageStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with replayed messages and backed by a
    /// transcript log for subsequent appends.
    pub fn recovered(messages: Vec<Message>, transcript: TranscriptLog) -> Self {
        Self {
            messages,
            transcript: Some(transcript),
        }
    }

    /// Attaches a transcript log; every subsequent append is mirrored to it.
    pub fn attach_transcript(&mut self, transcript: TranscriptLog) {
        self.transcript = Some(transcript);
    }

    /// The id the next appended message will receive (`largest seen + 1`).
    pub fn next_id(&self) -> u64 {
        self.messages.last().map_or(0, |m| m.id) + 1
    }

    /// Appends an accepted draft, assigning the next id and stamping the
    /// append time. Fails only on a malformed draft, before any mutation.
    ///
    /// `question` is the opened question record for question-bearing
    /// messages; `in_reply_to` links an answer to the question it resolves.
    ///
    /// # Panics
    ///
    /// Panics if the id sequence would go backwards. That indicates a store
    /// bug corrupting the transcript order, the one condition that must halt
    /// the session rather than continue.
    pub fn append(
        &mut self,
        draft: &MessageDraft,
        question: Option<Question>,
        in_reply_to: Option<QuestionId>,
    ) -> Result<Message> {
        draft.validate()?;

        let message = Message {
            id: self.next_id(),
            from: draft.from,
            to: draft.to,
            kind: draft.kind,
            content: draft.content.clone(),
            timestamp: Utc::now(),
            question,
            in_reply_to,
            importance: draft.importance,
        };

        if let Some(last) = self.messages.last() {
            assert!(
                message.id > last.id,
                "message id {} not greater than last id {}",
                message.id,
                last.id
            );
        }

        if let Some(transcript) = &self.transcript {
            if let Err(e) = transcript.append(&message) {
                tracing::warn!(
                    path = %transcript.path().display(),
                    error = %e,
                    "Failed to persist message to transcript"
                );
            }
        }

        self.messages.push(message.clone());
        Ok(message)
    }

    /// Returns all messages with `id > last_id`, in ascending id order.
    ///
    /// Polling twice with the same cursor and no intervening append returns
    /// the identical sequence; after one append the same cursor returns
    /// exactly the one new message.
    pub fn read_since(&self, last_id: u64) -> Vec<Message> {
        let start = self.messages.partition_point(|m| m.id <= last_id);
        self.messages[start..].to_vec()
    }

    /// The full transcript, for reconstruction after disconnect.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
