//! Customer-scoped change feed over engagement score rows.
//!
//! The feed contract mirrors a realtime backend channel: subscribers get
//! insert-style events filtered to one customer id, and dropping the
//! subscription releases the channel deterministically.

use tokio::sync::broadcast;
use tracing::debug;

use gearbook_core::domain::customer::CustomerId;
use gearbook_core::domain::engagement::ScoreEvent;

pub trait ScoreFeed: Send + Sync {
    fn subscribe(&self, customer_id: CustomerId) -> ScoreSubscription;
}

/// A live subscription to one customer's score events. The underlying
/// receiver is released on drop.
pub struct ScoreSubscription {
    customer_id: CustomerId,
    receiver: broadcast::Receiver<ScoreEvent>,
}

impl ScoreSubscription {
    /// Waits for the next event for this subscription's customer.
    /// Returns `None` once the feed shuts down. A slow consumer that
    /// lags the channel skips ahead rather than erroring out.
    pub async fn next(&mut self) -> Option<ScoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.customer_id == self.customer_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(customer_id = %self.customer_id, skipped, "score feed lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Broadcast-backed feed used in-process; a deployment would swap in a
/// transport-backed implementation of [`ScoreFeed`].
#[derive(Clone)]
pub struct InProcessScoreFeed {
    sender: broadcast::Sender<ScoreEvent>,
}

impl InProcessScoreFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an insert event. Events with no live subscriber are
    /// dropped, matching change-feed semantics.
    pub fn publish(&self, event: ScoreEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for InProcessScoreFeed {
    fn default() -> Self {
        Self::new(64)
    }
}

impl ScoreFeed for InProcessScoreFeed {
    fn subscribe(&self, customer_id: CustomerId) -> ScoreSubscription {
        ScoreSubscription { customer_id, receiver: self.sender.subscribe() }
    }
}
