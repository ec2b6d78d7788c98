//! Multi-participant conversations for roundtable.
//!
//! This crate provides:
//!
//! - **Turn engine**: drives an ordered set of participants through
//!   sequential rounds, threading one context string between turns
//! - **Transcript**: the ordered record of a session's turns, and its
//!   stable human-readable rendering
//! - **Memory loop**: a single answered prompt folded into a persisted
//!   memory blob by a second, summarizing participant

pub mod compose;
pub mod engine;
pub mod error;
pub mod memory;
pub mod render;
pub mod turn;

pub use compose::{ContextComposer, LabelledEcho, TopicContinuation};
pub use engine::{TurnEngine, respond_once};
pub use error::{MemoryError, SessionAborted, SessionError};
pub use memory::{
    MEMORY_SEED, MEMORY_SEPARATOR, MemoryLoop, MemoryOutcome, MemoryState, summary_prompt,
};
pub use render::render;
pub use turn::{Transcript, Turn};
