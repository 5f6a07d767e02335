//! The purchase-request endpoint.
//!
//! `POST /purchase-request` runs one agent turn: a request-scoped telemetry
//! collector is created here, handed to the runtime, and reduced to tool
//! steps once the turn completes. Session continuity rides on an HttpOnly
//! cookie.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use procura_agent::runtime::{AgentError, AgentRuntime};
use procura_core::errors::{ApplicationError, DomainError, InterfaceError};
use procura_core::telemetry::{reduce, TelemetryCollector};

use crate::dto::{map_history, render_telemetry, AgentReply, ErrorReply};

const SESSION_COOKIE: &str = "session_id";

#[derive(Clone)]
pub struct ApiState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseRequestBody {
    pub prompt: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DebugQuery {
    #[serde(default)]
    pub debug: bool,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/purchase-request", post(process_purchase_request))
        .with_state(ApiState { runtime })
}

pub async fn process_purchase_request(
    State(state): State<ApiState>,
    Query(query): Query<DebugQuery>,
    headers: HeaderMap,
    Json(body): Json<PurchaseRequestBody>,
) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    let prompt = body.prompt.trim().to_string();
    if prompt.is_empty() {
        return error_response(
            &ApplicationError::from(DomainError::EmptyPrompt).into_interface(correlation_id),
        );
    }

    let session_id =
        session_id_from_headers(&headers).unwrap_or_else(|| Uuid::new_v4().to_string());

    info!(
        event_name = "api.purchase_request.received",
        correlation_id = %correlation_id,
        session_id = %session_id,
        "processing purchase request"
    );

    let collector = TelemetryCollector::new();
    let outcome = match state.runtime.process_request(&session_id, &prompt, &collector).await {
        Ok(outcome) => outcome,
        Err(turn_error) => {
            error!(
                event_name = "api.purchase_request.failed",
                correlation_id = %correlation_id,
                session_id = %session_id,
                error = %turn_error,
                "agent turn failed"
            );
            return error_response(&application_error(turn_error).into_interface(correlation_id));
        }
    };

    let entries = collector.snapshot();
    let reply = AgentReply::from_completion(
        &outcome.completion,
        session_id.clone(),
        map_history(&outcome.transcript),
        reduce(&entries),
        query.debug.then(|| render_telemetry(&entries)),
    );

    let mut response = (StatusCode::OK, Json(reply)).into_response();
    if let Ok(cookie) = header::HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax"
    )) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

fn application_error(turn_error: AgentError) -> ApplicationError {
    match turn_error {
        AgentError::Llm(inner) => ApplicationError::Integration(inner.to_string()),
        AgentError::Session(inner) => ApplicationError::Persistence(inner.to_string()),
    }
}

fn error_response(interface: &InterfaceError) -> Response {
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = ErrorReply {
        error: interface.user_message().to_string(),
        correlation_id: interface.correlation_id().to_string(),
    };
    (status, Json(body)).into_response()
}
