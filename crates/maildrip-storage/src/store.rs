//! Campaign store abstraction
//!
//! The store is the single source of truth across process restarts; the
//! delivery queue never holds authoritative state beyond its own attempt
//! bookkeeping.

use async_trait::async_trait;
use maildrip_common::Result;

use crate::models::{Campaign, CampaignStatus, StatsPatch};

/// Campaign store trait
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// List all campaigns, newest first
    async fn list(&self) -> Result<Vec<Campaign>>;

    /// List campaigns in a given status
    async fn list_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>>;

    /// Fetch one campaign by id
    async fn get(&self, id: &str) -> Result<Option<Campaign>>;

    /// Upsert by id. `created_at` is preserved for existing records;
    /// `updated_at` is refreshed.
    async fn save(&self, campaign: &Campaign) -> Result<()>;

    /// Update only the status, refreshing `updated_at`. Returns the updated
    /// record, or None when the campaign does not exist.
    async fn update_status(&self, id: &str, status: CampaignStatus) -> Result<Option<Campaign>>;

    /// Apply a partial stats update. Device fingerprints merge as an
    /// append-if-absent union; counters are overwritten when present.
    async fn update_stats(&self, id: &str, patch: StatsPatch) -> Result<()>;

    /// Record a successful delivery: one tracking id per recipient,
    /// `stats.sent` set to the recipient count, status `completed`.
    async fn record_delivery(&self, id: &str, tracking_ids: &[String]) -> Result<()>;
}
