//! In-memory campaign store
//!
//! Backs the "memory" database backend and the test suites. Same contract
//! as the PostgreSQL store, with a process-lifetime HashMap behind it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use maildrip_common::{Error, Result};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Campaign, CampaignStatus, StatsPatch};
use crate::store::CampaignStore;

/// In-memory campaign store
#[derive(Default)]
pub struct MemoryCampaignStore {
    campaigns: RwLock<HashMap<String, Campaign>>,
}

impl MemoryCampaignStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a campaign entirely (dashboard delete)
    pub async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.campaigns.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn list(&self) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut all: Vec<Campaign> = campaigns.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn list_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut matching: Vec<Campaign> = campaigns
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn get(&self, id: &str) -> Result<Option<Campaign>> {
        Ok(self.campaigns.read().await.get(id).cloned())
    }

    async fn save(&self, campaign: &Campaign) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        let mut record = campaign.clone();
        if let Some(existing) = campaigns.get(&campaign.id) {
            record.created_at = existing.created_at;
        }
        record.updated_at = Utc::now();
        debug!(campaign_id = %record.id, status = %record.status, "saved campaign");
        campaigns.insert(record.id.clone(), record);
        Ok(())
    }

    async fn update_status(&self, id: &str, status: CampaignStatus) -> Result<Option<Campaign>> {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.get_mut(id) {
            Some(campaign) => {
                campaign.status = status;
                campaign.updated_at = Utc::now();
                Ok(Some(campaign.clone()))
            }
            None => Ok(None),
        }
    }

    async fn update_stats(&self, id: &str, patch: StatsPatch) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("campaign {}", id)))?;
        campaign.stats.apply(patch);
        campaign.updated_at = Utc::now();
        Ok(())
    }

    async fn record_delivery(&self, id: &str, tracking_ids: &[String]) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("campaign {}", id)))?;
        campaign.tracking_ids = tracking_ids.to_vec();
        campaign.stats.sent = tracking_ids.len() as u32;
        campaign.status = CampaignStatus::Completed;
        campaign.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateCampaign, DeviceFingerprint};
    use maildrip_common::types::Recipient;
    use pretty_assertions::assert_eq;

    fn campaign(name: &str) -> Campaign {
        Campaign::new(CreateCampaign {
            user_id: "u1".into(),
            name: name.into(),
            campaign_type: "promo".into(),
            subject: "Hi".into(),
            body: "Body".into(),
            recipients: vec![Recipient::new("Ada", "ada@example.com")],
            start_date: None,
            end_date: None,
            is_recurring: false,
            is_scheduled: true,
            scheduled_date_time: Some(Utc::now()),
            target_audience: "all".into(),
            user_email: "sender@example.com".into(),
            description: None,
        })
    }

    #[tokio::test]
    async fn test_save_and_get() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("one");
        store.save(&campaign).await.unwrap();

        let fetched = store.get(&campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "one");
        assert_eq!(fetched.status, CampaignStatus::Scheduled);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_preserves_created_at() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("one");
        store.save(&campaign).await.unwrap();
        let first = store.get(&campaign.id).await.unwrap().unwrap();

        let mut edited = first.clone();
        edited.created_at = Utc::now();
        edited.name = "renamed".into();
        store.save(&edited).await.unwrap();

        let second = store.get(&campaign.id).await.unwrap().unwrap();
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name, "renamed");
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let store = MemoryCampaignStore::new();
        let scheduled = campaign("scheduled");
        let mut done = campaign("done");
        done.status = CampaignStatus::Completed;
        store.save(&scheduled).await.unwrap();
        store.save(&done).await.unwrap();

        let listed = store
            .list_by_status(CampaignStatus::Scheduled)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "scheduled");
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_stats_merges_fingerprints() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("one");
        store.save(&campaign).await.unwrap();

        let patch = StatsPatch {
            opened: Some(1),
            device_info: vec![DeviceFingerprint::new("mobile", "iOS", "Safari")],
            ..Default::default()
        };
        store.update_stats(&campaign.id, patch.clone()).await.unwrap();
        store.update_stats(&campaign.id, patch).await.unwrap();

        let fetched = store.get(&campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.stats.opened, 1);
        assert_eq!(fetched.stats.device_info.len(), 1);

        let missing = store.update_stats("missing", StatsPatch::default()).await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_record_delivery() {
        let store = MemoryCampaignStore::new();
        let campaign = campaign("one");
        store.save(&campaign).await.unwrap();

        let tracking = vec!["tr1".to_string(), "tr2".to_string()];
        store.record_delivery(&campaign.id, &tracking).await.unwrap();

        let fetched = store.get(&campaign.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, CampaignStatus::Completed);
        assert_eq!(fetched.tracking_ids, tracking);
        assert_eq!(fetched.stats.sent, 2);
    }
}
