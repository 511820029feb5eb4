//! Live engagement score for one customer.
//!
//! The synchronizer subscribes to the change feed before pulling the
//! baseline aggregate, so no event falls into the gap; anything buffered
//! while the pull is in flight is applied afterwards. The last observed
//! value wins regardless of source.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use gearbook_core::domain::customer::CustomerId;
use gearbook_core::domain::engagement::{EngagementScore, ScoreSource};
use gearbook_db::realtime::ScoreFeed;
use gearbook_db::repositories::EngagementStore;

use crate::errors::SessionError;

#[derive(Debug)]
pub struct EngagementScoreSynchronizer {
    score: watch::Receiver<EngagementScore>,
    listener: JoinHandle<()>,
}

impl EngagementScoreSynchronizer {
    /// Attaches to the feed and pulls the stored aggregate as the starting
    /// value. A failed pull releases the feed subscription and surfaces as
    /// a persistence error.
    pub async fn start(
        customer_id: CustomerId,
        store: Arc<dyn EngagementStore>,
        feed: &dyn ScoreFeed,
    ) -> Result<Self, SessionError> {
        let mut subscription = feed.subscribe(customer_id);
        let baseline = store.aggregate_score(&customer_id).await?;

        let (publisher, score) =
            watch::channel(EngagementScore { value: baseline, source: ScoreSource::Polled });

        let listener = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                publisher.send_replace(EngagementScore {
                    value: event.value,
                    source: ScoreSource::Streamed,
                });
            }
            debug!(%customer_id, "score feed closed");
        });

        Ok(Self { score, listener })
    }

    pub fn current(&self) -> EngagementScore {
        *self.score.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngagementScore> {
        self.score.clone()
    }

    /// Detaches from the feed and waits for the listener to wind down.
    pub async fn close(mut self) {
        self.listener.abort();
        let _ = (&mut self.listener).await;
    }
}

// Dropping the synchronizer releases the feed subscription with it.
impl Drop for EngagementScoreSynchronizer {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;

    use gearbook_core::domain::customer::CustomerId;
    use gearbook_core::domain::engagement::{ScoreEvent, ScoreSource};
    use gearbook_db::realtime::InProcessScoreFeed;
    use gearbook_db::repositories::{EngagementStore, InMemoryEngagementStore, RepositoryError};

    use super::EngagementScoreSynchronizer;
    use crate::errors::SessionError;

    fn event(customer_id: CustomerId, value: f64) -> ScoreEvent {
        ScoreEvent { customer_id, value, recorded_at: Utc::now() }
    }

    #[tokio::test]
    async fn the_baseline_aggregate_is_published_on_start() {
        let store = Arc::new(InMemoryEngagementStore::new());
        let feed = InProcessScoreFeed::default();
        let customer_id = CustomerId::new();
        store.seed_score(customer_id, 42.0).await;

        let sync = EngagementScoreSynchronizer::start(customer_id, store as _, &feed)
            .await
            .expect("baseline pull succeeds");

        let score = sync.current();
        assert_eq!(score.value, 42.0);
        assert_eq!(score.source, ScoreSource::Polled);
    }

    #[tokio::test]
    async fn streamed_events_replace_the_baseline() {
        let store = Arc::new(InMemoryEngagementStore::new());
        let feed = InProcessScoreFeed::default();
        let customer_id = CustomerId::new();
        store.seed_score(customer_id, 42.0).await;

        let sync = EngagementScoreSynchronizer::start(customer_id, store as _, &feed)
            .await
            .expect("baseline pull succeeds");
        let mut watcher = sync.subscribe();

        feed.publish(event(customer_id, 57.0));
        watcher.changed().await.expect("publisher alive");

        let score = sync.current();
        assert_eq!(score.value, 57.0);
        assert_eq!(score.source, ScoreSource::Streamed);
    }

    #[tokio::test(start_paused = true)]
    async fn events_buffered_during_the_pull_still_win() {
        /// Aggregate read slow enough for the feed to get a word in first.
        struct SlowStore(InMemoryEngagementStore);

        #[async_trait::async_trait]
        impl EngagementStore for SlowStore {
            async fn aggregate_score(&self, id: &CustomerId) -> Result<f64, RepositoryError> {
                tokio::time::sleep(Duration::from_millis(100)).await;
                self.0.aggregate_score(id).await
            }

            async fn record_event(&self, event: ScoreEvent) -> Result<(), RepositoryError> {
                self.0.record_event(event).await
            }
        }

        let inner = InMemoryEngagementStore::new();
        let feed = InProcessScoreFeed::default();
        let customer_id = CustomerId::new();
        inner.seed_score(customer_id, 42.0).await;
        let store = Arc::new(SlowStore(inner));

        let feed_for_publish = feed.clone();
        let starting = tokio::spawn(async move {
            EngagementScoreSynchronizer::start(customer_id, store as _, &feed_for_publish).await
        });

        // Let the task subscribe and block on the pull, then publish.
        tokio::time::sleep(Duration::from_millis(10)).await;
        feed.publish(event(customer_id, 57.0));

        let sync = starting.await.expect("task runs").expect("start succeeds");
        let mut watcher = sync.subscribe();
        if sync.current().source == ScoreSource::Polled {
            watcher.changed().await.expect("buffered event arrives");
        }

        let score = sync.current();
        assert_eq!(score.value, 57.0);
        assert_eq!(score.source, ScoreSource::Streamed);
    }

    #[tokio::test]
    async fn close_releases_the_feed_subscription() {
        let store = Arc::new(InMemoryEngagementStore::new());
        let feed = InProcessScoreFeed::default();

        let sync = EngagementScoreSynchronizer::start(CustomerId::new(), store as _, &feed)
            .await
            .expect("start succeeds");
        assert_eq!(feed.subscriber_count(), 1);

        sync.close().await;
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn a_failed_baseline_pull_releases_the_subscription() {
        let store = Arc::new(InMemoryEngagementStore::new());
        store.set_fail_reads(true);
        let feed = InProcessScoreFeed::default();

        let error = EngagementScoreSynchronizer::start(CustomerId::new(), store as _, &feed)
            .await
            .expect_err("pull fails");

        assert!(matches!(error, SessionError::Persistence(_)));
        assert_eq!(feed.subscriber_count(), 0);
    }
}
