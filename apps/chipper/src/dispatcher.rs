use std::sync::Arc;
use std::time::Duration;

use chipper_core::contracts::{truncate_summary, NotificationPayload, PublicationEvent};
use chipper_core::error::ChipperError;
use chipper_core::traits::{ContentStore, FavoriteLedger, NotificationChannel};
use tracing::{error, info, warn};

/// Result of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans one publication event out to the author's followers.
///
/// The channel is injected so the fan-out logic and the mail transport stay
/// independently testable. Each follower gets its own immutable payload and
/// its own bounded send; one failed send never blocks the others.
pub struct NotificationDispatcher {
    ledger: Arc<dyn FavoriteLedger>,
    store: Arc<dyn ContentStore>,
    channel: Arc<dyn NotificationChannel>,
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        ledger: Arc<dyn FavoriteLedger>,
        store: Arc<dyn ContentStore>,
        channel: Arc<dyn NotificationChannel>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            store,
            channel,
            send_timeout,
        }
    }

    pub async fn dispatch(&self, event: &PublicationEvent) -> Result<DispatchOutcome, ChipperError> {
        // 1. Author gone between publish and dispatch is a no-op, not an error
        let Some(author) = self.store.fetch_user(&event.author_id).await? else {
            info!(
                "📭 Dispatch skipped: author {} no longer exists (post {})",
                event.author_id, event.post_id
            );
            return Ok(DispatchOutcome::default());
        };

        // 2. Follower resolution reads the ledger at dispatch time
        let follower_ids = self.ledger.list_followers_of_user(&author.id).await?;
        if follower_ids.is_empty() {
            return Ok(DispatchOutcome::default());
        }

        // 3. One batch read for every follower profile; followers deleted
        //    since favoriting simply drop out here
        let followers = self.store.fetch_users(&follower_ids).await?;
        let summary = truncate_summary(&event.post_summary);

        // 4. Independent sends, each with its own payload and timeout
        let sends = followers.iter().map(|follower| {
            let payload = NotificationPayload {
                follower_id: follower.id.clone(),
                follower_name: follower.name.clone(),
                follower_email: follower.email.clone(),
                author_name: author.name.clone(),
                post_id: event.post_id.clone(),
                post_title: event.post_title.clone(),
                post_summary: summary.clone(),
            };
            let channel = self.channel.clone();
            let send_timeout = self.send_timeout;

            async move {
                match tokio::time::timeout(send_timeout, channel.deliver(&payload)).await {
                    Ok(Ok(())) => true,
                    Ok(Err(e)) => {
                        error!(
                            "❌ Notification delivery failed for {}: {}",
                            payload.follower_id, e
                        );
                        false
                    }
                    Err(_) => {
                        error!(
                            "⏱️ Notification delivery timed out for {} after {:?}",
                            payload.follower_id, send_timeout
                        );
                        false
                    }
                }
            }
        });

        let results = futures::future::join_all(sends).await;
        let delivered = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - delivered;

        if failed > 0 {
            warn!(
                "Post {} fan-out finished with {} of {} sends failed",
                event.post_id,
                failed,
                results.len()
            );
        }

        Ok(DispatchOutcome { delivered, failed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chipper_core::contracts::SUMMARY_MAX_CHARS;
    use chipper_core::traits::TargetKind;
    use infrastructure::content_store::SqliteContentStore;
    use infrastructure::favorite_ledger::SqliteFavoriteLedger;
    use tokio::sync::Mutex;

    /// Channel double that records payloads and can fail for chosen followers.
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<NotificationPayload>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl NotificationChannel for RecordingChannel {
        async fn deliver(&self, payload: &NotificationPayload) -> Result<(), ChipperError> {
            if self.fail_for.as_deref() == Some(payload.follower_id.as_str()) {
                return Err(ChipperError::Delivery {
                    recipient: payload.follower_id.clone(),
                    source: anyhow::anyhow!("simulated transport error"),
                });
            }
            self.sent.lock().await.push(payload.clone());
            Ok(())
        }
    }

    struct Fixture {
        ledger: Arc<SqliteFavoriteLedger>,
        store: Arc<SqliteContentStore>,
        _tmp: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let tmp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = tmp_dir.path().join("test.db");
        let db_path_str = db_path.to_str().expect("Invalid path");

        Fixture {
            ledger: Arc::new(SqliteFavoriteLedger::new(db_path_str).await.unwrap()),
            store: Arc::new(SqliteContentStore::new(db_path_str).await.unwrap()),
            _tmp: tmp_dir,
        }
    }

    fn dispatcher_with(
        fixture: &Fixture,
        channel: Arc<RecordingChannel>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(
            fixture.ledger.clone(),
            fixture.store.clone(),
            channel,
            Duration::from_secs(5),
        )
    }

    fn event_for(author_id: &str, post_id: &str, title: &str, body: &str) -> PublicationEvent {
        PublicationEvent {
            author_id: author_id.to_string(),
            post_id: post_id.to_string(),
            post_title: title.to_string(),
            post_summary: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_fan_out_notifies_followers_only() {
        let fixture = setup().await;
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = dispatcher_with(&fixture, channel.clone());

        let follower = fixture.store.create_user("Ada", "ada@example.com").await.unwrap();
        let author = fixture.store.create_user("Grace", "grace@example.com").await.unwrap();
        let _stranger = fixture.store.create_user("Carl", "carl@example.com").await.unwrap();

        fixture
            .ledger
            .insert(&follower.id, TargetKind::User, &author.id)
            .await
            .unwrap();

        let outcome = dispatcher
            .dispatch(&event_for(&author.id, "post-1", "On Compilers", "Body"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome { delivered: 1, failed: 0 });

        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].follower_id, follower.id);
        assert_eq!(sent[0].author_name, "Grace");
        assert_eq!(sent[0].post_title, "On Compilers");
        assert_eq!(sent[0].post_id, "post-1");
    }

    #[tokio::test]
    async fn test_failed_send_does_not_block_others() {
        let fixture = setup().await;

        let a1 = fixture.store.create_user("A1", "a1@example.com").await.unwrap();
        let a2 = fixture.store.create_user("A2", "a2@example.com").await.unwrap();
        let author = fixture.store.create_user("Grace", "grace@example.com").await.unwrap();

        fixture.ledger.insert(&a1.id, TargetKind::User, &author.id).await.unwrap();
        fixture.ledger.insert(&a2.id, TargetKind::User, &author.id).await.unwrap();

        let channel = Arc::new(RecordingChannel {
            sent: Mutex::new(Vec::new()),
            fail_for: Some(a1.id.clone()),
        });
        let dispatcher = dispatcher_with(&fixture, channel.clone());

        let outcome = dispatcher
            .dispatch(&event_for(&author.id, "post-1", "Title", "Body"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome { delivered: 1, failed: 1 });

        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].follower_id, a2.id);
    }

    #[tokio::test]
    async fn test_missing_author_is_silent_noop() {
        let fixture = setup().await;
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = dispatcher_with(&fixture, channel.clone());

        let outcome = dispatcher
            .dispatch(&event_for("ghost-author", "post-1", "Title", "Body"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::default());
        assert!(channel.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_no_followers_is_silent_noop() {
        let fixture = setup().await;
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = dispatcher_with(&fixture, channel.clone());

        let author = fixture.store.create_user("Grace", "grace@example.com").await.unwrap();

        let outcome = dispatcher
            .dispatch(&event_for(&author.id, "post-1", "Title", "Body"))
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::default());
        assert!(channel.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_summary_truncated_for_payload() {
        let fixture = setup().await;
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = dispatcher_with(&fixture, channel.clone());

        let follower = fixture.store.create_user("Ada", "ada@example.com").await.unwrap();
        let author = fixture.store.create_user("Grace", "grace@example.com").await.unwrap();
        fixture
            .ledger
            .insert(&follower.id, TargetKind::User, &author.id)
            .await
            .unwrap();

        let long_body = "z".repeat(SUMMARY_MAX_CHARS * 2);
        dispatcher
            .dispatch(&event_for(&author.id, "post-1", "Title", &long_body))
            .await
            .unwrap();

        let sent = channel.sent.lock().await;
        assert_eq!(sent[0].post_summary.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(sent[0].post_summary.ends_with("..."));
    }
}
