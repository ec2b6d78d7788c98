//! The trigger abstraction.

use crate::error::TriggerError;
use crate::notification::{Notification, SourceFilter};
use async_trait::async_trait;
use futures::Stream;
use futures::stream::BoxStream;
use roundtable_core::SubscriptionId;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// A source of file-added notifications.
#[async_trait]
pub trait EventTrigger: Send + Sync {
    /// Starts listening for notifications accepted by `filter`.
    ///
    /// Only notifications delivered after this returns are observed.
    async fn subscribe(&self, filter: &SourceFilter) -> Result<Subscription, TriggerError>;

    /// Delivers `notification` to current subscribers.
    async fn publish(&self, notification: &Notification) -> Result<(), TriggerError>;
}

/// A live subscription. Dropping it, or calling [`Subscription::unsubscribe`],
/// stops delivery.
pub struct Subscription {
    id: SubscriptionId,
    filter: SourceFilter,
    stream: BoxStream<'static, Notification>,
}

impl Subscription {
    /// Wraps an already-filtered notification stream.
    #[must_use]
    pub fn new(filter: SourceFilter, stream: BoxStream<'static, Notification>) -> Self {
        Self {
            id: SubscriptionId::new(),
            filter,
            stream,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn filter(&self) -> &SourceFilter {
        &self.filter
    }

    /// Stops listening. Nothing published afterwards reaches this subscription.
    pub fn unsubscribe(self) {
        debug!(subscription = %self.id, source = %self.filter.source(), "unsubscribed");
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl Stream for Subscription {
    type Item = Notification;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}
