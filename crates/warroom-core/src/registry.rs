//! Participant registry: the fixed roster and per-participant state.
//!
//! The registry is owned by the turn scheduler, which is its sole writer.
//! Everything else reads.

use std::collections::HashMap;
use warroom_proto::{BusError, ParticipantId, ParticipantState, Result};

/// Tracks the fixed roster and the scheduler-visible state of each member.
#[derive(Debug)]
pub struct ParticipantRegistry {
    states: HashMap<ParticipantId, ParticipantState>,
}

impl ParticipantRegistry {
    /// Creates a registry over the full fixed roster, everyone idle.
    pub fn new() -> Self {
        Self::with_roster(ParticipantId::ALL)
    }

    /// Creates a registry over a restricted roster.
    pub fn with_roster(roster: impl IntoIterator<Item = ParticipantId>) -> Self {
        Self {
            states: roster
                .into_iter()
                .map(|id| (id, ParticipantState::Idle))
                .collect(),
        }
    }

    /// Returns the state of a participant.
    pub fn get_state(&self, id: ParticipantId) -> Result<ParticipantState> {
        self.states
            .get(&id)
            .copied()
            .ok_or_else(|| BusError::UnknownParticipant(id.to_string()))
    }

    /// Sets the state of a participant. Scheduler-only.
    pub(crate) fn set_state(&mut self, id: ParticipantId, state: ParticipantState) -> Result<()> {
        match self.states.get_mut(&id) {
            Some(slot) => {
                *slot = state;
                Ok(())
            }
            None => Err(BusError::UnknownParticipant(id.to_string())),
        }
    }

    /// Sets every agent participant to the given state. Scheduler-only.
    pub(crate) fn set_all_agents(&mut self, state: ParticipantState) {
        for (id, slot) in &mut self.states {
            if id.is_agent() {
                *slot = state;
            }
        }
    }

    /// Returns true if the roster contains the participant.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.states.contains_key(&id)
    }

    /// The fixed roster, in canonical order.
    pub fn all_ids(&self) -> Vec<ParticipantId> {
        ParticipantId::ALL
            .into_iter()
            .filter(|id| self.states.contains_key(id))
            .collect()
    }

    /// Snapshot of every participant's state, in canonical order.
    pub fn snapshot(&self) -> Vec<(ParticipantId, ParticipantState)> {
        self.all_ids()
            .into_iter()
            .map(|id| (id, self.states[&id]))
            .collect()
    }
}

impl Default for ParticipantRegistry {
    fn default() -> Self {
        Self::new()
    }
}
