//! The fixed participant roster and per-participant scheduler states.
//!
//! The roster is a closed set known at session start; there is no dynamic
//! registration. `user` and `system` are reserved: they never introduce
//! themselves and follow different turn rules than the five agents.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the fixed named actors in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantId {
    Market,
    Strategy,
    Risk,
    Executor,
    Explainer,
    User,
    System,
}

impl ParticipantId {
    /// Every participant, in roster order.
    pub const ALL: [ParticipantId; 7] = [
        ParticipantId::Market,
        ParticipantId::Strategy,
        ParticipantId::Risk,
        ParticipantId::Executor,
        ParticipantId::Explainer,
        ParticipantId::User,
        ParticipantId::System,
    ];

    /// The five agent participants, in default introduction order.
    pub const AGENTS: [ParticipantId; 5] = [
        ParticipantId::Market,
        ParticipantId::Strategy,
        ParticipantId::Risk,
        ParticipantId::Executor,
        ParticipantId::Explainer,
    ];

    /// Returns the participant id as a string slice.
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantId::Market => "market",
            ParticipantId::Strategy => "strategy",
            ParticipantId::Risk => "risk",
            ParticipantId::Executor => "executor",
            ParticipantId::Explainer => "explainer",
            ParticipantId::User => "user",
            ParticipantId::System => "system",
        }
    }

    /// Returns true for the five decision-making agents (not `user`/`system`).
    pub fn is_agent(self) -> bool {
        !matches!(self, ParticipantId::User | ParticipantId::System)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipantId {
    type Err = crate::BusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "market" => Ok(ParticipantId::Market),
            "strategy" => Ok(ParticipantId::Strategy),
            "risk" => Ok(ParticipantId::Risk),
            "executor" => Ok(ParticipantId::Executor),
            "explainer" => Ok(ParticipantId::Explainer),
            "user" => Ok(ParticipantId::User),
            "system" => Ok(ParticipantId::System),
            other => Err(crate::BusError::UnknownParticipant(other.to_string())),
        }
    }
}

/// Scheduler-visible state of a participant.
///
/// Transitions happen only via scheduler actions; external callers read these
/// but never write them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    /// Not currently holding or waiting on a turn.
    #[default]
    Idle,
    /// Emitted the most recently accepted message.
    Speaking,
    /// Has an open question and may not ask another until it resolves.
    AwaitingAnswer,
    /// Frozen by a user interrupt; submissions are rejected.
    Paused,
}
