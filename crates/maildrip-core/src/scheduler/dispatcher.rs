//! Dispatch loop
//!
//! A recurring pass over the store and the delivery queue: discover newly
//! scheduled campaigns, evaluate every queued entry against the retry
//! policy, and drive delivery attempts. All per-campaign failures are
//! folded into attempt bookkeeping; nothing escapes a pass.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use maildrip_storage::models::CampaignStatus;
use maildrip_storage::store::CampaignStore;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use super::policy::{Disposition, RetryPolicy};
use super::queue::DeliveryQueue;
use crate::credentials::CredentialProvider;
use crate::transport::{EmailTransport, SendRequest, TransportError};

/// Why a single delivery attempt failed. Every variant is retryable; the
/// attempt budget is what makes failures terminal.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("delivery credentials are expired")]
    CredentialsExpired,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] maildrip_common::Error),
}

/// How an attempt resolved when it did not fail
enum AttemptOutcome {
    /// Sent now, or found already sent
    Delivered,
    /// Campaign vanished or left the scheduled state; forget the entry
    Dropped,
}

/// The scheduled-campaign dispatcher.
///
/// Owns the delivery queue outright; the queue mutex doubles as the
/// re-entrancy guard, so an on-demand trigger overlapping a timer tick
/// coalesces into a no-op.
pub struct Dispatcher {
    store: Arc<dyn CampaignStore>,
    transport: Arc<dyn EmailTransport>,
    credentials: Arc<dyn CredentialProvider>,
    policy: RetryPolicy,
    queue: Mutex<DeliveryQueue>,
}

impl Dispatcher {
    /// Create a new dispatcher with an empty queue
    pub fn new(
        store: Arc<dyn CampaignStore>,
        transport: Arc<dyn EmailTransport>,
        credentials: Arc<dyn CredentialProvider>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            credentials,
            policy,
            queue: Mutex::new(DeliveryQueue::new()),
        }
    }

    /// Number of campaigns currently queued
    pub async fn queued(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Run the dispatch loop until the task is aborted. Each pass runs to
    /// completion before the next tick fires.
    pub async fn run(self: Arc<Self>, poll_interval: StdDuration) {
        let mut ticker = interval(poll_interval);

        info!(
            interval_secs = poll_interval.as_secs(),
            max_attempts = self.policy.max_attempts,
            "dispatch loop started"
        );

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One evaluation pass at the current wall clock. Zero-argument and
    /// idempotent, safe to invoke on demand between timer ticks.
    pub async fn run_once(&self) {
        self.run_once_at(Utc::now()).await;
    }

    /// One evaluation pass at an explicit clock reading
    pub async fn run_once_at(&self, now: DateTime<Utc>) {
        let Ok(mut queue) = self.queue.try_lock() else {
            debug!("dispatch pass already in progress, skipping");
            return;
        };

        if let Err(e) = self.discover(&mut queue).await {
            error!(error = %e, "failed to discover scheduled campaigns");
        }

        self.evaluate_all(&mut queue, now).await;
    }

    /// Re-scan the store and admit scheduled campaigns not yet queued.
    /// Admission is idempotent, which is what makes discovery safe to run
    /// on every tick and after a restart that lost the queue.
    async fn discover(&self, queue: &mut DeliveryQueue) -> maildrip_common::Result<()> {
        let scheduled = self.store.list_by_status(CampaignStatus::Scheduled).await?;
        for campaign in &scheduled {
            queue.admit(campaign);
        }
        Ok(())
    }

    /// Evaluate every entry independently. One entry's failure must not
    /// block or roll back evaluation of its siblings.
    async fn evaluate_all(&self, queue: &mut DeliveryQueue, now: DateTime<Utc>) {
        for id in queue.ids() {
            let Some(entry) = queue.get(&id) else {
                continue;
            };

            match self.policy.disposition(entry, now) {
                Disposition::NotDue | Disposition::Backoff => {}
                Disposition::Expired => {
                    warn!(campaign_id = %id, "campaign missed its delivery window");
                    self.mark_terminal(&id, CampaignStatus::Expired).await;
                    queue.remove(&id);
                }
                Disposition::Exhausted => {
                    warn!(campaign_id = %id, "campaign exhausted its attempt budget");
                    self.mark_terminal(&id, CampaignStatus::Failed).await;
                    queue.remove(&id);
                }
                Disposition::Attempt => match self.attempt_delivery(&id, now).await {
                    Ok(AttemptOutcome::Delivered) | Ok(AttemptOutcome::Dropped) => {
                        queue.remove(&id);
                    }
                    Err(e) => {
                        warn!(campaign_id = %id, error = %e, "delivery attempt failed");
                        if let Some(entry) = queue.get_mut(&id) {
                            entry.record_failure(now);
                        }
                    }
                },
            }
        }
    }

    async fn mark_terminal(&self, id: &str, status: CampaignStatus) {
        if let Err(e) = self.store.update_status(id, status).await {
            error!(campaign_id = %id, error = %e, "failed to persist terminal status");
        }
    }

    /// Perform one send attempt for a due campaign
    async fn attempt_delivery(
        &self,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<AttemptOutcome, DeliveryError> {
        // Re-check the store before sending: the campaign may have been
        // deleted or moved out of the scheduled state since admission.
        let Some(campaign) = self.store.get(id).await? else {
            info!(campaign_id = %id, "campaign no longer exists, dropping from queue");
            return Ok(AttemptOutcome::Dropped);
        };

        match campaign.status {
            // Idempotency guard: already sent, nothing to resend
            CampaignStatus::Completed => return Ok(AttemptOutcome::Delivered),
            CampaignStatus::Scheduled | CampaignStatus::Running => {}
            other => {
                info!(campaign_id = %id, status = %other, "campaign left the scheduled state, dropping");
                return Ok(AttemptOutcome::Dropped);
            }
        }

        let credentials = self.credentials.current();
        if !credentials.is_valid(now) {
            // Refresh happens out-of-band; a later pass may find a live token
            return Err(DeliveryError::CredentialsExpired);
        }

        self.store
            .update_status(id, CampaignStatus::Running)
            .await?;

        let request = SendRequest {
            recipients: campaign.recipients.clone(),
            subject: campaign.subject.clone(),
            body: campaign.body.clone(),
            sender_email: campaign.user_email.clone(),
        };

        match self.transport.send(&request, &credentials).await {
            Ok(response) => {
                self.store
                    .record_delivery(id, &response.tracking_ids)
                    .await?;
                info!(
                    campaign_id = %id,
                    recipients = request.recipients.len(),
                    "campaign delivered"
                );
                Ok(AttemptOutcome::Delivered)
            }
            Err(e) => {
                // Restore `scheduled` so discovery still finds the campaign
                // after a restart that lost the queue
                if let Err(restore) = self
                    .store
                    .update_status(id, CampaignStatus::Scheduled)
                    .await
                {
                    error!(campaign_id = %id, error = %restore, "failed to restore scheduled status");
                }
                Err(e.into())
            }
        }
    }
}
