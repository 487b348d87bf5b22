//! In-memory delivery queue

use chrono::{DateTime, Utc};
use maildrip_common::types::CampaignId;
use maildrip_storage::models::Campaign;
use tracing::debug;

/// Bookkeeping for one scheduled campaign awaiting delivery.
///
/// Never persisted; a process restart recomputes attempts from zero after
/// the next discovery pass.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub campaign_id: CampaignId,
    pub scheduled_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_attempt_at: DateTime<Utc>,
}

impl QueueEntry {
    fn new(campaign_id: CampaignId, scheduled_at: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            scheduled_at,
            attempts: 0,
            // Epoch start, so the first evaluation is never throttled by backoff
            last_attempt_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// Record a failed delivery attempt
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.attempts += 1;
        self.last_attempt_at = now;
    }
}

/// Process-local working set of campaigns awaiting delivery.
///
/// Owned by exactly one dispatcher (single writer); a campaign id appears
/// at most once. Entries leave only on a terminal outcome.
#[derive(Debug, Default)]
pub struct DeliveryQueue {
    entries: Vec<QueueEntry>,
}

impl DeliveryQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a campaign id is already queued
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.campaign_id == id)
    }

    /// Admit a campaign if and only if it is scheduled, carries a schedule
    /// time, and is not already queued. Idempotent; returns true when an
    /// entry was added.
    pub fn admit(&mut self, campaign: &Campaign) -> bool {
        if !campaign.is_queueable() {
            return false;
        }
        // is_queueable guarantees the schedule time is present
        let Some(scheduled_at) = campaign.scheduled_date_time else {
            return false;
        };
        if self.contains(&campaign.id) {
            return false;
        }

        debug!(campaign_id = %campaign.id, %scheduled_at, "admitted campaign to delivery queue");
        self.entries
            .push(QueueEntry::new(campaign.id.clone(), scheduled_at));
        true
    }

    pub fn get(&self, id: &str) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| e.campaign_id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut QueueEntry> {
        self.entries.iter_mut().find(|e| e.campaign_id == id)
    }

    /// Remove an entry after a terminal outcome
    pub fn remove(&mut self, id: &str) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| e.campaign_id == id)?;
        Some(self.entries.remove(index))
    }

    /// Snapshot of queued ids in discovery order
    pub fn ids(&self) -> Vec<CampaignId> {
        self.entries.iter().map(|e| e.campaign_id.clone()).collect()
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }
}
