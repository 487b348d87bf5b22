//! Admin/API surface
//!
//! A small router over the campaign store and the dispatcher: health,
//! campaign create/fetch, and an on-demand dispatch trigger.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use maildrip_common::Error;
use maildrip_core::Dispatcher;
use maildrip_storage::models::{Campaign, CampaignStatus, CreateCampaign};
use maildrip_storage::store::CampaignStore;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state
pub struct AppState {
    pub store: Arc<dyn CampaignStore>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/dispatch", post(trigger_dispatch))
        .route("/api/v1/campaigns", get(list_campaigns))
        .route("/api/v1/campaigns", post(create_campaign))
        .route("/api/v1/campaigns/:id", get(get_campaign))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error payload returned to API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// API error wrapper carrying the HTTP mapping of the domain error
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ErrorResponse {
            error: self.0.code(),
            message: self.0.to_string(),
        });
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    queued: usize,
}

/// Basic health check, with the current delivery queue depth
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        queued: state.dispatcher.queued().await,
    })
}

#[derive(Debug, Serialize)]
struct DispatchResponse {
    status: &'static str,
}

/// Trigger one dispatch pass without waiting for the next timer tick.
/// Coalesces with an in-flight pass, so hammering this endpoint is harmless.
async fn trigger_dispatch(State(state): State<Arc<AppState>>) -> (StatusCode, Json<DispatchResponse>) {
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.run_once().await;
    });
    (
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            status: "dispatch pass triggered",
        }),
    )
}

async fn list_campaigns(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Campaign>>, ApiError> {
    let campaigns = state.store.list().await?;
    Ok(Json(campaigns))
}

/// Create a campaign. A scheduled campaign gets an immediate dispatch pass
/// so a past-due schedule is honored without waiting for the next tick.
async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(input): Json<CreateCampaign>,
) -> Result<(StatusCode, Json<Campaign>), ApiError> {
    if input.recipients.is_empty() {
        return Err(Error::Validation("campaign has no recipients".into()).into());
    }

    let campaign = Campaign::new(input);
    state.store.save(&campaign).await?;
    info!(campaign_id = %campaign.id, status = %campaign.status, "campaign created");

    if campaign.status == CampaignStatus::Scheduled {
        let dispatcher = state.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.run_once().await;
        });
    }

    Ok((StatusCode::CREATED, Json(campaign)))
}

async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Campaign>, ApiError> {
    let campaign = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("campaign {}", id)))?;
    Ok(Json(campaign))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_api_error_maps_domain_status() {
        let err = ApiError(Error::NotFound("campaign c1".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err = ApiError(Error::Validation("campaign has no recipients".into()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
