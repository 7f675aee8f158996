//! Question records for human-in-the-loop interaction.
//!
//! A question is opened when a `question`-typed message is appended and is
//! resolved by exactly one answer, or expired after the configured grace
//! period. Expiry counts as an implicit "no response" answer so a silent user
//! can never deadlock a session.

use crate::ParticipantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique question identifier, generated at creation.
pub type QuestionId = Uuid;

/// Lifecycle status of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    #[default]
    Pending,
    Answered,
    Expired,
}

/// A question embedded in a message, tracked until answered or expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub asked_by: ParticipantId,
    /// Closed set of acceptable answers; `None` accepts any free text.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<String>>,
    pub status: QuestionStatus,
    /// When the question was opened; basis for expiry.
    pub asked_at: DateTime<Utc>,
    /// The accepted answer text, set when `status == Answered`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response: Option<String>,
}

impl Question {
    /// Opens a new pending question with a freshly generated id.
    pub fn open(asked_by: ParticipantId, options: Option<Vec<String>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            asked_by,
            options,
            status: QuestionStatus::Pending,
            asked_at: Utc::now(),
            response: None,
        }
    }

    /// Returns true while the question still blocks its asker.
    pub fn is_pending(&self) -> bool {
        self.status == QuestionStatus::Pending
    }

    /// Returns true if `answer` is acceptable for this question.
    ///
    /// Free-text questions accept anything; option questions accept only an
    /// exact member of the set.
    pub fn accepts(&self, answer: &str) -> bool {
        match &self.options {
            None => true,
            Some(options) => options.iter().any(|o| o == answer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_generates_unique_pending() {
        let a = Question::open(ParticipantId::Market, None);
        let b = Question::open(ParticipantId::Market, None);
        assert_ne!(a.id, b.id);
        assert!(a.is_pending());
        assert!(a.response.is_none());
    }

    #[test]
    fn test_free_text_accepts_anything() {
        let q = Question::open(ParticipantId::Strategy, None);
        assert!(q.accepts("whatever you like"));
    }

    #[test]
    fn test_options_are_a_closed_set() {
        let q = Question::open(
            ParticipantId::Market,
            Some(vec!["aggressive".to_string(), "conservative".to_string()]),
        );
        assert!(q.accepts("aggressive"));
        assert!(q.accepts("conservative"));
        assert!(!q.accepts("reckless"));
        assert!(!q.accepts("Aggressive"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&QuestionStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&QuestionStatus::Expired).unwrap(),
            "\"expired\""
        );
    }
}
