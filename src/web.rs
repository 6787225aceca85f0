//! HTTP API for configuring the bot and starting fights.
//!
//! Endpoints:
//! - POST /configure — form submission with credentials, prefix and admin ID
//! - POST /fight     — activate an armed fight session
//! - GET  /status    — configuration and login state

use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::bot::{ActivationError, FightPlan};
use crate::service::Service;

/// Form body for POST /configure.
#[derive(Debug, Deserialize)]
pub struct ConfigureForm {
    /// Session credentials as JSON text.
    pub cookies: String,
    pub prefix: Option<String>,
    #[serde(rename = "adminID")]
    pub admin_id: String,
}

/// JSON body for POST /fight.
#[derive(Debug, Deserialize)]
pub struct FightRequest {
    #[serde(rename = "threadID")]
    pub thread_id: String,
    #[serde(rename = "haterName")]
    pub hater_name: String,
    /// Newline-delimited lines to cycle through.
    pub messages: String,
    /// Seconds between messages.
    pub delay: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub configured: bool,
    pub initialized: bool,
    pub prefix: Option<String>,
}

pub fn router(service: Arc<Service>) -> Router {
    Router::new()
        .route("/configure", post(configure))
        .route("/fight", post(fight))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// POST /configure — save settings and (re)start the bot.
pub async fn configure(
    State(service): State<Arc<Service>>,
    Form(form): Form<ConfigureForm>,
) -> impl IntoResponse {
    match service.configure(&form.cookies, form.prefix.as_deref(), &form.admin_id).await {
        Ok(()) => (StatusCode::OK, "Bot configured successfully! Starting...".to_string()),
        Err(e) => {
            warn!("Configuration error: {e}");
            (
                StatusCode::BAD_REQUEST,
                "Error: Invalid configuration. Please check your input.".to_string(),
            )
        }
    }
}

/// POST /fight — start the timer for an armed conversation.
pub async fn fight(
    State(service): State<Arc<Service>>,
    Json(req): Json<FightRequest>,
) -> impl IntoResponse {
    let plan = FightPlan::new(&req.hater_name, &req.messages, req.delay);
    match service.activate_fight(&req.thread_id, plan).await {
        Ok(()) => (StatusCode::OK, "Fight mode activated!".to_string()),
        Err(e) => {
            let status = match e {
                ActivationError::NoActiveSession => StatusCode::BAD_REQUEST,
                ActivationError::NotInitialized => StatusCode::INTERNAL_SERVER_ERROR,
            };
            info!("Fight activation for {} rejected: {e}", req.thread_id);
            (status, e.to_string())
        }
    }
}

/// GET /status
pub async fn status(State(service): State<Arc<Service>>) -> impl IntoResponse {
    let config = service.config().await;
    Json(StatusResponse {
        configured: config.is_some(),
        initialized: service.is_initialized().await,
        prefix: config.map(|c| c.prefix),
    })
}
