//! Event-triggered flows for roundtable.
//!
//! An archive announces every file it creates. This crate turns those
//! announcements into notification streams and provides:
//!
//! - **Triggers**: [`ChannelTrigger`] (in-process) and [`NatsTrigger`]
//!   (a NATS subject per archive source)
//! - **One-shot subscription**: [`once`] takes the first matching
//!   notification and stops listening before anything acts on it
//! - **Summarize on event**: [`SummarizeOnEvent`] fetches the announced
//!   content, has a participant summarize it and archives the summary

pub mod channel;
pub mod error;
pub mod nats;
pub mod notification;
pub mod once;
pub mod summarize;
pub mod trigger;

pub use channel::ChannelTrigger;
pub use error::TriggerError;
pub use nats::{DEFAULT_SUBJECT_PREFIX, NatsTrigger};
pub use notification::{Notification, SourceFilter};
pub use once::once;
pub use summarize::{EventOutcome, SummarizeOnEvent, summary_request};
pub use trigger::{EventTrigger, Subscription};
