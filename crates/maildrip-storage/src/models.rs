//! Campaign data model

use chrono::{DateTime, Utc};
use maildrip_common::types::{CampaignId, Recipient};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Campaign lifecycle status
///
/// One enum across the whole system; the wire and database form is
/// lowercase. Only `scheduled` campaigns pass through the delivery queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Completed,
    Failed,
    Expired,
}

impl CampaignStatus {
    /// Terminal statuses never re-enter the delivery queue
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CampaignStatus::Completed | CampaignStatus::Failed | CampaignStatus::Expired
        )
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "draft"),
            CampaignStatus::Scheduled => write!(f, "scheduled"),
            CampaignStatus::Running => write!(f, "running"),
            CampaignStatus::Completed => write!(f, "completed"),
            CampaignStatus::Failed => write!(f, "failed"),
            CampaignStatus::Expired => write!(f, "expired"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(CampaignStatus::Draft),
            "scheduled" => Ok(CampaignStatus::Scheduled),
            "running" => Ok(CampaignStatus::Running),
            "completed" => Ok(CampaignStatus::Completed),
            "failed" => Ok(CampaignStatus::Failed),
            "expired" => Ok(CampaignStatus::Expired),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Distinct device fingerprint observed through tracking callbacks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFingerprint {
    pub device: String,
    pub os: String,
    pub browser: String,
}

impl DeviceFingerprint {
    /// Create a new fingerprint
    pub fn new(
        device: impl Into<String>,
        os: impl Into<String>,
        browser: impl Into<String>,
    ) -> Self {
        Self {
            device: device.into(),
            os: os.into(),
            browser: browser.into(),
        }
    }

    fn matches(&self, other: &DeviceFingerprint) -> bool {
        self.device == other.device && self.os == other.os && self.browser == other.browser
    }
}

/// Engagement counters for a campaign
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
    #[serde(default)]
    pub sent: u32,
    #[serde(default)]
    pub opened: u32,
    #[serde(default)]
    pub clicked: u32,
    #[serde(default)]
    pub converted: u32,
    #[serde(default)]
    pub device_info: Vec<DeviceFingerprint>,
}

impl CampaignStats {
    /// Append-if-absent union keyed by (device, os, browser).
    ///
    /// Returns true when the fingerprint was new. The collection only ever
    /// grows; repeated merges with overlapping data are idempotent.
    pub fn merge_device(&mut self, fingerprint: DeviceFingerprint) -> bool {
        if self.device_info.iter().any(|d| d.matches(&fingerprint)) {
            return false;
        }
        self.device_info.push(fingerprint);
        true
    }

    /// Apply a partial stats update
    pub fn apply(&mut self, patch: StatsPatch) {
        if let Some(sent) = patch.sent {
            self.sent = sent;
        }
        if let Some(opened) = patch.opened {
            self.opened = opened;
        }
        if let Some(clicked) = patch.clicked {
            self.clicked = clicked;
        }
        if let Some(converted) = patch.converted {
            self.converted = converted;
        }
        for fingerprint in patch.device_info {
            self.merge_device(fingerprint);
        }
    }
}

/// Partial stats update applied through the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPatch {
    pub sent: Option<u32>,
    pub opened: Option<u32>,
    pub clicked: Option<u32>,
    pub converted: Option<u32>,
    #[serde(default)]
    pub device_info: Vec<DeviceFingerprint>,
}

/// Campaign record as persisted by the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: CampaignId,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<Recipient>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub is_scheduled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_date_time: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub stats: CampaignStats,
    pub tracking_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub target_audience: String,
    pub user_email: String,
    pub description: Option<String>,
}

impl Campaign {
    /// Build a new campaign record from create input.
    ///
    /// The campaign starts `scheduled` only when both the flag and the
    /// schedule time are present; everything else starts as a draft. A
    /// campaign with `is_scheduled == false` must never carry `scheduled`.
    pub fn new(input: CreateCampaign) -> Self {
        let now = Utc::now();
        let status = if input.is_scheduled && input.scheduled_date_time.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Draft
        };

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            name: input.name,
            campaign_type: input.campaign_type,
            subject: input.subject,
            body: input.body,
            recipients: input.recipients,
            start_date: input.start_date,
            end_date: input.end_date,
            is_recurring: input.is_recurring,
            is_scheduled: input.is_scheduled,
            scheduled_date_time: input.scheduled_date_time,
            status,
            stats: CampaignStats::default(),
            tracking_ids: Vec::new(),
            created_at: now,
            updated_at: now,
            target_audience: input.target_audience,
            user_email: input.user_email,
            description: input.description,
        }
    }

    /// Whether this campaign is eligible for the delivery queue
    pub fn is_queueable(&self) -> bool {
        self.status == CampaignStatus::Scheduled
            && self.is_scheduled
            && self.scheduled_date_time.is_some()
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaign {
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub campaign_type: String,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<Recipient>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub is_scheduled: bool,
    pub scheduled_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub target_audience: String,
    pub user_email: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_input(scheduled: bool) -> CreateCampaign {
        CreateCampaign {
            user_id: "u1".into(),
            name: "Spring sale".into(),
            campaign_type: "promo".into(),
            subject: "Hello".into(),
            body: "<p>Hi</p>".into(),
            recipients: vec![Recipient::new("Ada", "ada@example.com")],
            start_date: None,
            end_date: None,
            is_recurring: false,
            is_scheduled: scheduled,
            scheduled_date_time: scheduled.then(Utc::now),
            target_audience: "all".into(),
            user_email: "sender@example.com".into(),
            description: None,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Scheduled,
            CampaignStatus::Running,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
            CampaignStatus::Expired,
        ] {
            let parsed: CampaignStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Scheduled".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!CampaignStatus::Scheduled.is_terminal());
        assert!(!CampaignStatus::Running.is_terminal());
        assert!(CampaignStatus::Expired.is_terminal());
        assert!(CampaignStatus::Failed.is_terminal());
        assert!(CampaignStatus::Completed.is_terminal());
    }

    #[test]
    fn test_new_campaign_scheduled_only_with_flag_and_time() {
        let scheduled = Campaign::new(create_input(true));
        assert_eq!(scheduled.status, CampaignStatus::Scheduled);
        assert!(scheduled.is_queueable());

        let draft = Campaign::new(create_input(false));
        assert_eq!(draft.status, CampaignStatus::Draft);
        assert!(!draft.is_queueable());

        let mut input = create_input(true);
        input.scheduled_date_time = None;
        let no_time = Campaign::new(input);
        assert_eq!(no_time.status, CampaignStatus::Draft);
    }

    #[test]
    fn test_merge_device_idempotent() {
        let mut stats = CampaignStats::default();
        let fp = DeviceFingerprint::new("mobile", "iOS", "Safari");

        assert!(stats.merge_device(fp.clone()));
        assert!(!stats.merge_device(fp.clone()));
        assert_eq!(stats.device_info.len(), 1);

        // Differing in any one field makes it a distinct fingerprint
        assert!(stats.merge_device(DeviceFingerprint::new("mobile", "iOS", "Chrome")));
        assert_eq!(stats.device_info.len(), 2);
    }

    #[test]
    fn test_stats_apply_patch() {
        let mut stats = CampaignStats::default();
        stats.apply(StatsPatch {
            sent: Some(5),
            opened: Some(2),
            clicked: None,
            converted: None,
            device_info: vec![
                DeviceFingerprint::new("desktop", "Linux", "Firefox"),
                DeviceFingerprint::new("desktop", "Linux", "Firefox"),
            ],
        });

        assert_eq!(stats.sent, 5);
        assert_eq!(stats.opened, 2);
        assert_eq!(stats.clicked, 0);
        assert_eq!(stats.device_info.len(), 1);
    }

    #[test]
    fn test_campaign_serde_layout() {
        let campaign = Campaign::new(create_input(false));
        let value = serde_json::to_value(&campaign).unwrap();

        assert!(value.get("userId").is_some());
        assert!(value.get("type").is_some());
        assert_eq!(value["status"], "draft");
        assert_eq!(value["stats"]["deviceInfo"], serde_json::json!([]));
        assert!(value.get("trackingIds").is_some());
        // Unset schedule time is omitted entirely
        assert!(value.get("scheduledDateTime").is_none());
    }
}
