//! Typed message records for the bus transcript.
//!
//! A [`MessageDraft`] is what participants submit; the message store turns an
//! accepted draft into an immutable [`Message`] by assigning the next id and
//! stamping the append time. Drafts are validated at the scheduler boundary
//! so malformed shapes never propagate downstream.

use crate::{BusError, ParticipantId, Question, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message target: a specific participant or everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Recipient {
    /// The reserved broadcast target, serialized as `"all"`.
    All,
    /// A single participant.
    Participant(ParticipantId),
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::All => f.write_str("all"),
            Recipient::Participant(id) => f.write_str(id.as_str()),
        }
    }
}

impl FromStr for Recipient {
    type Err = BusError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            Ok(Recipient::All)
        } else {
            s.parse().map(Recipient::Participant)
        }
    }
}

impl From<Recipient> for String {
    fn from(r: Recipient) -> Self {
        r.to_string()
    }
}

impl TryFrom<String> for Recipient {
    type Error = BusError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ParticipantId> for Recipient {
    fn from(id: ParticipantId) -> Self {
        Recipient::Participant(id)
    }
}

/// The closed set of message types on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Introduction,
    Analysis,
    Strategy,
    RiskAssessment,
    Execution,
    Explanation,
    UserInput,
    System,
    Question,
    Answer,
}

impl MessageType {
    /// Returns the wire name of the message type.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Introduction => "introduction",
            MessageType::Analysis => "analysis",
            MessageType::Strategy => "strategy",
            MessageType::RiskAssessment => "risk_assessment",
            MessageType::Execution => "execution",
            MessageType::Explanation => "explanation",
            MessageType::UserInput => "user_input",
            MessageType::System => "system",
            MessageType::Question => "question",
            MessageType::Answer => "answer",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational message weight; never affects scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

/// An immutable entry in the session transcript.
///
/// Once appended the record never changes; the store never reorders or
/// deletes entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Strictly increasing, dense, assigned by the store at append time.
    pub id: u64,
    pub from: ParticipantId,
    pub to: Recipient,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    /// Wall-clock append time. Monotonic non-decreasing with `id`, but id
    /// order is the authoritative ordering.
    pub timestamp: DateTime<Utc>,
    /// Embedded question, present on `question` messages and on
    /// `introduction` messages that open with one.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub question: Option<Question>,
    /// For `answer` messages: the question this answer resolves.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub in_reply_to: Option<crate::QuestionId>,
    #[serde(default)]
    pub importance: Importance,
}

/// Question payload on a draft. The id is generated server-side when the
/// draft is accepted, so submitters only supply the optional answer set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    /// Closed set of acceptable answers; `None` accepts any free text.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<String>>,
}

/// A message as submitted by a participant, before the store assigns an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub from: ParticipantId,
    pub to: Recipient,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub question: Option<QuestionDraft>,
    #[serde(default)]
    pub importance: Importance,
}

impl MessageDraft {
    /// Creates a plain draft with default importance and no question.
    pub fn new(
        from: ParticipantId,
        to: impl Into<Recipient>,
        kind: MessageType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to: to.into(),
            kind,
            content: content.into(),
            question: None,
            importance: Importance::default(),
        }
    }

    /// Attaches a question payload (the draft kind must be [`MessageType::Question`]).
    pub fn with_question(mut self, options: Option<Vec<String>>) -> Self {
        self.question = Some(QuestionDraft { options });
        self
    }

    /// Sets the informational importance.
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Validates the draft shape.
    ///
    /// A `question` message must carry a question payload; an `introduction`
    /// message may carry one (an agent greeting the user with an opening
    /// question); every other kind must not. An options list must not be
    /// empty, and content must be non-blank. Shape errors are rejected here,
    /// before any mutation.
    pub fn validate(&self) -> Result<()> {
        match (self.kind, &self.question) {
            (MessageType::Question, None) => {
                return Err(BusError::InvalidMessage(
                    "question message without question payload".to_string(),
                ));
            }
            (MessageType::Question | MessageType::Introduction, Some(q)) => {
                if q.options.as_ref().is_some_and(|opts| opts.is_empty()) {
                    return Err(BusError::InvalidMessage(
                        "question options must not be empty".to_string(),
                    ));
                }
            }
            (_, Some(_)) => {
                return Err(BusError::InvalidMessage(format!(
                    "question payload on {:?} message",
                    self.kind
                )));
            }
            (_, None) => {}
        }

        if self.content.trim().is_empty() {
            return Err(BusError::InvalidMessage("empty content".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_wire_format() {
        assert_eq!(serde_json::to_string(&Recipient::All).unwrap(), "\"all\"");
        assert_eq!(
            serde_json::to_string(&Recipient::Participant(ParticipantId::Risk)).unwrap(),
            "\"risk\""
        );

        let parsed: Recipient = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(parsed, Recipient::All);
        let parsed: Recipient = serde_json::from_str("\"market\"").unwrap();
        assert_eq!(parsed, Recipient::Participant(ParticipantId::Market));
    }

    #[test]
    fn test_recipient_unknown_rejected() {
        let result: std::result::Result<Recipient, _> = serde_json::from_str("\"everyone\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_message_type_snake_case() {
        assert_eq!(
            serde_json::to_string(&MessageType::RiskAssessment).unwrap(),
            "\"risk_assessment\""
        );
        assert_eq!(
            serde_json::to_string(&MessageType::UserInput).unwrap(),
            "\"user_input\""
        );
    }

    #[test]
    fn test_valid_plain_draft() {
        let draft = MessageDraft::new(
            ParticipantId::Market,
            Recipient::All,
            MessageType::Analysis,
            "BTC is consolidating",
        );
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_question_kind_requires_payload() {
        let draft = MessageDraft::new(
            ParticipantId::Market,
            ParticipantId::User,
            MessageType::Question,
            "Aggressive or conservative?",
        );
        let err = draft.validate().unwrap_err();
        assert!(matches!(err, BusError::InvalidMessage(_)));
    }

    #[test]
    fn test_introduction_may_embed_question() {
        let draft = MessageDraft::new(
            ParticipantId::Market,
            ParticipantId::User,
            MessageType::Introduction,
            "I'm the market agent. Aggressive or conservative?",
        )
        .with_question(Some(vec![
            "aggressive".to_string(),
            "conservative".to_string(),
        ]));
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_payload_on_non_question_rejected() {
        let draft = MessageDraft::new(
            ParticipantId::Market,
            Recipient::All,
            MessageType::Analysis,
            "hm",
        )
        .with_question(None);
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_empty_options_rejected() {
        let draft = MessageDraft::new(
            ParticipantId::Market,
            ParticipantId::User,
            MessageType::Question,
            "pick one",
        )
        .with_question(Some(vec![]));
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_blank_content_rejected() {
        let draft = MessageDraft::new(
            ParticipantId::Risk,
            Recipient::All,
            MessageType::RiskAssessment,
            "   ",
        );
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_json_shape() {
        let json = r#"{
            "from": "user",
            "to": "all",
            "type": "user_input",
            "content": "hold on, I want lower risk"
        }"#;
        let draft: MessageDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.from, ParticipantId::User);
        assert_eq!(draft.importance, Importance::Medium);
        assert!(draft.question.is_none());
    }
}
