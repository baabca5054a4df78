//! Periodic digest delivery.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::bot::{system_clock, Clock};
use crate::channels::{Channel, OutgoingMessage};
use crate::config::DigestSchedule;
use crate::error::TaskError;
use crate::tasks::{DigestComposer, TaskService};

/// Outcome of one digest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DigestReport {
    pub delivered: usize,
    pub failed: usize,
    /// The run stopped early because shutdown was requested.
    pub cancelled: bool,
}

/// Sends the digest to every known user.
pub struct DigestRunner {
    channel: Arc<dyn Channel>,
    service: TaskService,
    composer: DigestComposer,
    utc_offset: FixedOffset,
    clock: Clock,
}

impl DigestRunner {
    pub fn new(channel: Arc<dyn Channel>, service: TaskService, utc_offset: FixedOffset) -> Self {
        Self {
            channel,
            composer: DigestComposer::new(service.clone()),
            service,
            utc_offset,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<FixedOffset> {
        (self.clock)().with_timezone(&self.utc_offset)
    }

    /// Compose and send one digest per user, sequentially.
    ///
    /// A failure for one user is logged and counted; the run goes on.
    /// Cancellation is checked between users.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<DigestReport, TaskError> {
        let users = self.service.list_users().await?;
        let now = self.now();
        let mut report = DigestReport::default();

        for user in users {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let text = match self.composer.compose(user.id, now).await {
                Ok(text) => text,
                Err(e) => {
                    error!(user_id = user.id, error = %e, "Failed to compose digest");
                    report.failed += 1;
                    continue;
                }
            };

            // Private chat ids equal Telegram user ids.
            let msg = OutgoingMessage::html(user.telegram_id, text);
            match self.channel.send(msg).await {
                Ok(()) => {
                    debug!(user_id = user.id, "Digest delivered");
                    report.delivered += 1;
                }
                Err(e) => {
                    warn!(user_id = user.id, error = %e, "Failed to deliver digest");
                    report.failed += 1;
                }
            }
        }

        info!(
            delivered = report.delivered,
            failed = report.failed,
            cancelled = report.cancelled,
            "Digest run finished"
        );
        Ok(report)
    }
}

/// Run the digest on `schedule`, re-planning whenever it changes, until
/// `cancel` fires.
pub fn spawn_digest_scheduler(
    runner: Arc<DigestRunner>,
    mut schedule: watch::Receiver<DigestSchedule>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        // Stays false once every sender is gone; the last schedule keeps running.
        let mut watching = true;

        loop {
            let delay = schedule.borrow_and_update().next_delay(runner.now());
            debug!(delay_secs = delay.as_secs(), "Next digest scheduled");

            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = schedule.changed(), if watching => {
                    match changed {
                        Ok(()) => info!(schedule = %*schedule.borrow(), "Digest schedule updated"),
                        Err(_) => watching = false,
                    }
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = runner.run_once(&cancel).await {
                        error!(error = %e, "Digest run failed");
                    }
                }
            }
        }

        info!("Digest scheduler stopped");
    })
}
