//! Context composition between turns.
//!
//! After each turn the running context is replaced, never merged, by
//! `compose(prior_output)`. Composers must be pure: the same output always
//! yields the same next context.

/// Builds the next turn's context from the previous turn's output.
pub trait ContextComposer: Send + Sync {
    /// Returns the context handed to the next participant.
    fn compose(&self, prior_output: &str) -> String;
}

impl<F> ContextComposer for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn compose(&self, prior_output: &str) -> String {
        self(prior_output)
    }
}

/// Echoes the prior output verbatim behind a fixed label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelledEcho;

impl ContextComposer for LabelledEcho {
    fn compose(&self, prior_output: &str) -> String {
        format!("Previous response: {prior_output}")
    }
}

/// Keeps a discussion anchored to its original topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicContinuation {
    topic: String,
}

impl TopicContinuation {
    /// Creates a composer for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    /// The topic under discussion.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The opening prompt for the first participant.
    #[must_use]
    pub fn seed_prompt(&self) -> String {
        format!(
            "Let's discuss the following topic: {}. Please share your thoughts.",
            self.topic
        )
    }
}

impl ContextComposer for TopicContinuation {
    fn compose(&self, prior_output: &str) -> String {
        format!(
            "Previous response: {prior_output}\n\nPlease continue the discussion about {}.",
            self.topic
        )
    }
}
