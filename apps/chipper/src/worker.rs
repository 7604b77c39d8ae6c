use std::sync::Arc;

use chipper_core::traits::{NotificationQueue, QueuedEvent};
use infrastructure::notification_queue::SqliteNotificationQueue;
use tracing::{error, info, warn};

use crate::dispatcher::NotificationDispatcher;

/// How many poll ticks pass between stalled-claim sweeps
const RECLAIM_EVERY_TICKS: u64 = 12;

/// Polls the durable queue and runs one dispatch task per claimed event.
/// Claims are independent, so several events fan out in parallel; the queue's
/// status guard keeps any single event on exactly one task at a time.
pub struct NotificationWorker {
    queue: Arc<SqliteNotificationQueue>,
    dispatcher: Arc<NotificationDispatcher>,
    poll_secs: u64,
    reclaim_after_minutes: i64,
}

impl NotificationWorker {
    pub fn new(
        queue: Arc<SqliteNotificationQueue>,
        dispatcher: Arc<NotificationDispatcher>,
        poll_secs: u64,
        reclaim_after_minutes: i64,
    ) -> Self {
        Self {
            queue,
            dispatcher,
            poll_secs,
            reclaim_after_minutes,
        }
    }

    pub async fn start_loop(self: Arc<Self>) {
        info!("📣 NotificationWorker: starting dispatch loop...");
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(self.poll_secs));
        let mut ticks: u64 = 0;

        loop {
            interval.tick().await;
            ticks += 1;

            // 1. Periodically hand stalled claims back to the queue
            if ticks % RECLAIM_EVERY_TICKS == 0 {
                match self.queue.reclaim_stalled(self.reclaim_after_minutes).await {
                    Ok(0) => {}
                    Ok(n) => warn!("♻️ NotificationWorker: requeued {} stalled event(s)", n),
                    Err(e) => error!("❌ NotificationWorker: stalled-claim sweep failed: {}", e),
                }
            }

            // 2. Drain everything that is currently pending
            loop {
                match self.queue.dequeue().await {
                    Ok(Some(queued)) => {
                        let worker = self.clone();
                        tokio::spawn(async move {
                            worker.process(queued).await;
                        });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!("❌ NotificationWorker: failed to dequeue event: {}", e);
                        break;
                    }
                }
            }
        }
    }

    async fn process(&self, queued: QueuedEvent) {
        match self.dispatcher.dispatch(&queued.event).await {
            Ok(outcome) => {
                info!(
                    "✅ Event {}: notified {} follower(s), {} failed (post {})",
                    queued.id, outcome.delivered, outcome.failed, queued.event.post_id
                );
                if let Err(e) = self.queue.complete(&queued.id).await {
                    error!("❌ NotificationWorker: failed to complete event {}: {}", queued.id, e);
                }
            }
            Err(e) => {
                error!("🚨 Event {} dispatch failed: {}", queued.id, e);
                if let Err(mark_err) = self.queue.fail(&queued.id, &e.to_string()).await {
                    error!(
                        "❌ NotificationWorker: failed to mark event {} as failed: {}",
                        queued.id, mark_err
                    );
                }
            }
        }
    }
}
