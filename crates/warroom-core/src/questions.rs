//! Question/answer tracking: 1:1 pairing with cooperative expiry.
//!
//! Exactly one answer resolves a question; late answers to resolved or
//! unknown questions come back as [`BusError::QuestionNotFound`], which
//! callers treat as a recoverable no-op. Expiry turns a silent user into an
//! implicit "no response" so the scheduler can never deadlock on an
//! unanswered question.

use chrono::{DateTime, Duration, Utc};
use warroom_proto::{BusError, ParticipantId, Question, QuestionId, QuestionStatus, Result};

/// Tracks every question opened in a session.
#[derive(Debug)]
pub struct QuestionTracker {
    questions: Vec<Question>,
    timeout: Option<Duration>,
}

impl QuestionTracker {
    /// Creates a tracker with the given expiry grace period (`None` disables
    /// expiry).
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            questions: Vec::new(),
            timeout,
        }
    }

    /// Opens a pending question for `asked_by`.
    ///
    /// At most one question per asker may be pending at a time; a second open
    /// is rejected as a turn violation.
    pub fn open(
        &mut self,
        asked_by: ParticipantId,
        options: Option<Vec<String>>,
    ) -> Result<Question> {
        if self.pending_for(asked_by).is_some() {
            return Err(BusError::Rejected(format!(
                "{asked_by} already has a pending question"
            )));
        }
        let question = Question::open(asked_by, options);
        self.questions.push(question.clone());
        Ok(question)
    }

    /// Re-opens a question recovered from a transcript, keeping its original
    /// id and asked-at time so expiry still applies after a restart.
    pub(crate) fn restore(&mut self, question: Question) {
        self.questions.push(question);
    }

    /// Accepts the answer for a pending question.
    ///
    /// Unknown ids and already-resolved questions fail with
    /// [`BusError::QuestionNotFound`] without altering the stored record; an
    /// answer outside a closed option set fails with
    /// [`BusError::InvalidMessage`] and leaves the question pending.
    pub fn answer(&mut self, id: QuestionId, response: &str) -> Result<Question> {
        let question = self
            .questions
            .iter_mut()
            .find(|q| q.id == id && q.is_pending())
            .ok_or(BusError::QuestionNotFound(id))?;

        if !question.accepts(response) {
            return Err(BusError::InvalidMessage(format!(
                "answer {response:?} is not one of the accepted options"
            )));
        }

        question.status = QuestionStatus::Answered;
        question.response = Some(response.to_string());
        Ok(question.clone())
    }

    /// Expires a single pending question.
    pub fn expire(&mut self, id: QuestionId) -> Result<Question> {
        let question = self
            .questions
            .iter_mut()
            .find(|q| q.id == id && q.is_pending())
            .ok_or(BusError::QuestionNotFound(id))?;

        question.status = QuestionStatus::Expired;
        Ok(question.clone())
    }

    /// Expires every pending question whose grace period has elapsed at
    /// `now`, returning the expired records. No-op when expiry is disabled.
    pub fn expire_stale(&mut self, now: DateTime<Utc>) -> Vec<Question> {
        let Some(timeout) = self.timeout else {
            return Vec::new();
        };

        let mut expired = Vec::new();
        for question in &mut self.questions {
            if question.is_pending() && now - question.asked_at >= timeout {
                question.status = QuestionStatus::Expired;
                expired.push(question.clone());
            }
        }
        expired
    }

    /// Looks up a question by id.
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// The pending question for a given asker, if any.
    pub fn pending_for(&self, asked_by: ParticipantId) -> Option<&Question> {
        self.questions
            .iter()
            .find(|q| q.asked_by == asked_by && q.is_pending())
    }

    /// All currently pending questions, oldest first.
    pub fn pending(&self) -> Vec<&Question> {
        self.questions.iter().filter(|q| q.is_pending()).collect()
    }

    /// Returns true if any question is still pending.
    pub fn has_pending(&self) -> bool {
        self.questions.iter().any(|q| q.is_pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> QuestionTracker {
        QuestionTracker::new(Some(Duration::seconds(300)))
    }

    #[test]
    fn test_exactly_one_answer_succeeds() {
        let mut tracker = tracker();
        let q = tracker.open(ParticipantId::Market, None).unwrap();

        let answered = tracker.answer(q.id, "sure").unwrap();
        assert_eq!(answered.status, QuestionStatus::Answered);
        assert_eq!(answered.response.as_deref(), Some("sure"));

        // Second answer fails and does not alter the stored record.
        let err = tracker.answer(q.id, "changed my mind").unwrap_err();
        assert!(matches!(err, BusError::QuestionNotFound(_)));
        let stored = tracker.get(q.id).unwrap();
        assert_eq!(stored.response.as_deref(), Some("sure"));
    }

    #[test]
    fn test_answer_unknown_id_not_found() {
        let mut tracker = tracker();
        let err = tracker.answer(uuid::Uuid::new_v4(), "hello").unwrap_err();
        assert!(matches!(err, BusError::QuestionNotFound(_)));
    }

    #[test]
    fn test_answer_outside_options_leaves_pending() {
        let mut tracker = tracker();
        let q = tracker
            .open(
                ParticipantId::Market,
                Some(vec!["aggressive".to_string(), "conservative".to_string()]),
            )
            .unwrap();

        let err = tracker.answer(q.id, "reckless").unwrap_err();
        assert!(matches!(err, BusError::InvalidMessage(_)));
        assert!(tracker.get(q.id).unwrap().is_pending());

        assert!(tracker.answer(q.id, "aggressive").is_ok());
    }

    #[test]
    fn test_one_pending_per_asker() {
        let mut tracker = tracker();
        tracker.open(ParticipantId::Market, None).unwrap();

        let err = tracker.open(ParticipantId::Market, None).unwrap_err();
        assert!(matches!(err, BusError::Rejected(_)));

        // A different asker is unaffected.
        assert!(tracker.open(ParticipantId::Risk, None).is_ok());
    }

    #[test]
    fn test_asker_freed_after_resolution() {
        let mut tracker = tracker();
        let q = tracker.open(ParticipantId::Market, None).unwrap();
        tracker.answer(q.id, "yes").unwrap();
        assert!(tracker.open(ParticipantId::Market, None).is_ok());
    }

    #[test]
    fn test_expire_stale_respects_grace_period() {
        let mut tracker = tracker();
        let q = tracker.open(ParticipantId::Market, None).unwrap();

        // Within the grace period nothing expires.
        assert!(tracker.expire_stale(Utc::now()).is_empty());

        let expired = tracker.expire_stale(Utc::now() + Duration::seconds(301));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, q.id);
        assert_eq!(
            tracker.get(q.id).unwrap().status,
            QuestionStatus::Expired
        );

        // An expired question cannot be answered.
        let err = tracker.answer(q.id, "too late").unwrap_err();
        assert!(matches!(err, BusError::QuestionNotFound(_)));
    }

    #[test]
    fn test_expiry_disabled() {
        let mut tracker = QuestionTracker::new(None);
        tracker.open(ParticipantId::Market, None).unwrap();
        let expired = tracker.expire_stale(Utc::now() + Duration::days(365));
        assert!(expired.is_empty());
        assert!(tracker.has_pending());
    }

    #[test]
    fn test_explicit_expire() {
        let mut tracker = tracker();
        let q = tracker.open(ParticipantId::Explainer, None).unwrap();
        let expired = tracker.expire(q.id).unwrap();
        assert_eq!(expired.status, QuestionStatus::Expired);
        assert!(!tracker.has_pending());
    }
}
