//! PostgreSQL campaign store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use maildrip_common::{Error, Result};
use sqlx::{FromRow, PgPool};

use crate::models::{Campaign, CampaignStats, CampaignStatus, StatsPatch};
use crate::store::CampaignStore;

/// PostgreSQL-backed campaign store
#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

/// Raw campaign row; status and JSONB columns are converted at the boundary
/// so the rest of the system only ever sees typed values.
#[derive(FromRow)]
struct CampaignRow {
    id: String,
    user_id: String,
    name: String,
    campaign_type: String,
    subject: String,
    body: String,
    recipients: serde_json::Value,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    is_recurring: bool,
    is_scheduled: bool,
    scheduled_date_time: Option<DateTime<Utc>>,
    status: String,
    stats: serde_json::Value,
    tracking_ids: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    target_audience: String,
    user_email: String,
    description: Option<String>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = Error;

    fn try_from(row: CampaignRow) -> Result<Self> {
        let status: CampaignStatus = row
            .status
            .parse()
            .map_err(|e: String| Error::Database(e))?;
        let recipients = serde_json::from_value(row.recipients)
            .map_err(|e| Error::Database(format!("Invalid recipients column: {}", e)))?;
        let stats = serde_json::from_value(row.stats)
            .map_err(|e| Error::Database(format!("Invalid stats column: {}", e)))?;
        let tracking_ids = serde_json::from_value(row.tracking_ids)
            .map_err(|e| Error::Database(format!("Invalid tracking_ids column: {}", e)))?;

        Ok(Campaign {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            campaign_type: row.campaign_type,
            subject: row.subject,
            body: row.body,
            recipients,
            start_date: row.start_date,
            end_date: row.end_date,
            is_recurring: row.is_recurring,
            is_scheduled: row.is_scheduled,
            scheduled_date_time: row.scheduled_date_time,
            status,
            stats,
            tracking_ids,
            created_at: row.created_at,
            updated_at: row.updated_at,
            target_audience: row.target_audience,
            user_email: row.user_email,
            description: row.description,
        })
    }
}

impl PgCampaignStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: sqlx::Error) -> Error {
        Error::Database(e.to_string())
    }

    fn encode<T: serde::Serialize>(value: &T, what: &str) -> Result<serde_json::Value> {
        serde_json::to_value(value)
            .map_err(|e| Error::Internal(format!("Failed to encode {}: {}", what, e)))
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn list(&self) -> Result<Vec<Campaign>> {
        let rows: Vec<CampaignRow> =
            sqlx::query_as("SELECT * FROM campaigns ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(Self::db_err)?;

        rows.into_iter().map(Campaign::try_from).collect()
    }

    async fn list_by_status(&self, status: CampaignStatus) -> Result<Vec<Campaign>> {
        let rows: Vec<CampaignRow> = sqlx::query_as(
            "SELECT * FROM campaigns WHERE status = $1 ORDER BY created_at DESC",
        )
        .bind(status.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        rows.into_iter().map(Campaign::try_from).collect()
    }

    async fn get(&self, id: &str) -> Result<Option<Campaign>> {
        let row: Option<CampaignRow> = sqlx::query_as("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;

        row.map(Campaign::try_from).transpose()
    }

    async fn save(&self, campaign: &Campaign) -> Result<()> {
        let recipients = Self::encode(&campaign.recipients, "recipients")?;
        let stats = Self::encode(&campaign.stats, "stats")?;
        let tracking_ids = Self::encode(&campaign.tracking_ids, "tracking ids")?;

        sqlx::query(
            r#"
            INSERT INTO campaigns (
                id, user_id, name, campaign_type, subject, body, recipients,
                start_date, end_date, is_recurring, is_scheduled,
                scheduled_date_time, status, stats, tracking_ids,
                created_at, updated_at, target_audience, user_email, description
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, NOW(), $17, $18, $19)
            ON CONFLICT (id) DO UPDATE SET
                user_id = EXCLUDED.user_id,
                name = EXCLUDED.name,
                campaign_type = EXCLUDED.campaign_type,
                subject = EXCLUDED.subject,
                body = EXCLUDED.body,
                recipients = EXCLUDED.recipients,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                is_recurring = EXCLUDED.is_recurring,
                is_scheduled = EXCLUDED.is_scheduled,
                scheduled_date_time = EXCLUDED.scheduled_date_time,
                status = EXCLUDED.status,
                stats = EXCLUDED.stats,
                tracking_ids = EXCLUDED.tracking_ids,
                target_audience = EXCLUDED.target_audience,
                user_email = EXCLUDED.user_email,
                description = EXCLUDED.description,
                updated_at = NOW()
            "#,
        )
        .bind(&campaign.id)
        .bind(&campaign.user_id)
        .bind(&campaign.name)
        .bind(&campaign.campaign_type)
        .bind(&campaign.subject)
        .bind(&campaign.body)
        .bind(&recipients)
        .bind(campaign.start_date)
        .bind(campaign.end_date)
        .bind(campaign.is_recurring)
        .bind(campaign.is_scheduled)
        .bind(campaign.scheduled_date_time)
        .bind(campaign.status.to_string())
        .bind(&stats)
        .bind(&tracking_ids)
        .bind(campaign.created_at)
        .bind(&campaign.target_audience)
        .bind(&campaign.user_email)
        .bind(&campaign.description)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(())
    }

    async fn update_status(&self, id: &str, status: CampaignStatus) -> Result<Option<Campaign>> {
        let row: Option<CampaignRow> = sqlx::query_as(
            r#"
            UPDATE campaigns SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.map(Campaign::try_from).transpose()
    }

    async fn update_stats(&self, id: &str, patch: StatsPatch) -> Result<()> {
        // Read-modify-write under a row lock so the fingerprint union is
        // applied atomically against concurrent tracking callbacks.
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;

        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT stats FROM campaigns WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Self::db_err)?;

        let (stats_value,) = row.ok_or_else(|| Error::NotFound(format!("campaign {}", id)))?;
        let mut stats: CampaignStats = serde_json::from_value(stats_value)
            .map_err(|e| Error::Database(format!("Invalid stats column: {}", e)))?;
        stats.apply(patch);

        sqlx::query("UPDATE campaigns SET stats = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(Self::encode(&stats, "stats")?)
            .execute(&mut *tx)
            .await
            .map_err(Self::db_err)?;

        tx.commit().await.map_err(Self::db_err)?;
        Ok(())
    }

    async fn record_delivery(&self, id: &str, tracking_ids: &[String]) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE campaigns SET
                tracking_ids = $2,
                stats = jsonb_set(stats, '{sent}', to_jsonb($3::int)),
                status = 'completed',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Self::encode(&tracking_ids, "tracking ids")?)
        .bind(tracking_ids.len() as i32)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("campaign {}", id)));
        }
        Ok(())
    }
}
