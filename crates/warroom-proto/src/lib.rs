//! # warroom-proto
//!
//! Shared types and error definitions for the War Room message bus.
//!
//! This crate provides the foundational abstractions used across all War Room
//! crates, including:
//! - The fixed participant roster and per-participant states
//! - The typed message and question records
//! - The bus error taxonomy

mod error;
mod message;
mod participant;
mod question;

pub use error::{BusError, Result};
pub use message::{Importance, Message, MessageDraft, MessageType, QuestionDraft, Recipient};
pub use participant::{ParticipantId, ParticipantState};
pub use question::{Question, QuestionId, QuestionStatus};
