//! Read-only JSON mirror of the reconciled registry
//!
//! The view layer renders from these endpoints and reports its focus state
//! back through `POST /api/focus`; nothing here mutates site data.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::channel::ChannelState;
use crate::registry::StateHandle;
use crate::site::{Site, SiteMessage};

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub state: StateHandle,
    pub focus_tx: watch::Sender<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connection: ChannelState,
    pub sites: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FocusRequest {
    pub focused: bool,
}

/// Build the dashboard axum router
pub fn build_router(state: StateHandle, focus_tx: watch::Sender<bool>) -> Router {
    let dashboard_state = DashboardState { state, focus_tx };

    Router::new()
        .route("/api/sites", get(sites_handler))
        .route("/api/sites/{id}/messages", get(messages_handler))
        .route("/api/status", get(status_handler))
        .route("/api/focus", post(focus_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(dashboard_state)
}

async fn sites_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    let sites: Vec<Site> = state.sites().into_iter().cloned().collect();
    Json(sites)
}

async fn messages_handler(
    State(dashboard): State<DashboardState>,
    Path(site_id): Path<i64>,
) -> Result<Json<Vec<SiteMessage>>, StatusCode> {
    let state = dashboard.state.read().await;
    if state.site(site_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let messages = state.messages(site_id).unwrap_or_default().to_vec();
    Ok(Json(messages))
}

async fn status_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let state = dashboard.state.read().await;
    Json(StatusResponse {
        connection: state.connection(),
        sites: state.len(),
    })
}

async fn focus_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<FocusRequest>,
) -> StatusCode {
    tracing::debug!("View layer reports focused={}", request.focused);
    // send_replace never fails even with no live engine receiver
    dashboard.focus_tx.send_replace(request.focused);
    StatusCode::NO_CONTENT
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}
