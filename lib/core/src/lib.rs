//! Core types shared by every roundtable crate.
//!
//! This crate provides the rootcause-based `Result` alias and the
//! strongly-typed identifiers used to correlate sessions, backend
//! invocations and notification subscriptions in logs.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{InvocationId, ParseIdError, SessionId, SubscriptionId};
