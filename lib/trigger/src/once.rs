//! One-shot subscriptions.

use crate::error::TriggerError;
use crate::notification::{Notification, SourceFilter};
use crate::trigger::EventTrigger;
use futures::StreamExt;
use tracing::{info, instrument};

/// Waits for the first notification accepted by `filter`, then unsubscribes.
///
/// The subscription is gone before this returns, so whatever the caller
/// does with the notification (including archiving files that announce
/// themselves on the same source) cannot be observed by it.
///
/// # Errors
///
/// Returns `TriggerError::StreamClosed` if the stream ends first, or the
/// trigger's error if subscribing fails.
#[instrument(skip(trigger), fields(source = %filter.source()))]
pub async fn once<T>(trigger: &T, filter: &SourceFilter) -> Result<Notification, TriggerError>
where
    T: EventTrigger + ?Sized,
{
    let mut subscription = trigger.subscribe(filter).await?;
    info!(subscription = %subscription.id(), "waiting for notification");

    let first = subscription.next().await;
    subscription.unsubscribe();

    first.ok_or_else(|| TriggerError::StreamClosed {
        source: filter.source().to_string(),
    })
}
