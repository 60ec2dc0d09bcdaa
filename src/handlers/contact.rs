use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{ContactError, DispatchError, SENT_MESSAGE};
use crate::metrics::{RATE_LIMITED, REQUEST_TOTAL, VALIDATION_FAILURES};
use crate::models::Submission;
use crate::state::AppState;
use crate::validator::validate;

// POST /contact
pub async fn contact_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    REQUEST_TOTAL.inc();

    // computed once, attached to every outcome
    let cors = state.cors.resolve_headers(origin(request.headers()));
    let key = client_key(&request, state.config.trusted_proxy_hops);

    match process(&state, &key, request).await {
        Ok(()) => {
            (StatusCode::OK, cors, Json(json!({ "message": SENT_MESSAGE }))).into_response()
        }
        Err(err) => {
            log_failure(&key, &err);
            error_response(err, cors)
        }
    }
}

// OPTIONS /contact
pub async fn preflight_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    (StatusCode::NO_CONTENT, state.cors.resolve_headers(origin(&headers)))
}

async fn process(state: &AppState, key: &str, request: Request) -> Result<(), ContactError> {
    state.rate_limiter.admit(key, state.config.rate_limit)?;

    let route = state.route()?;

    let body = axum::body::to_bytes(request.into_body(), state.config.max_body_bytes)
        .await
        .map_err(|e| DispatchError::Body(e.to_string()))?;
    let submission: Submission = serde_json::from_slice(&body).map_err(DispatchError::from)?;
    debug!(
        client = %key,
        attachments = submission.attachments.len(),
        has_subject = submission.subject.is_some(),
        "Parsed contact submission"
    );

    let submission = validate(submission)?;
    state.dispatcher.dispatch(submission, &route).await?;
    Ok(())
}

// Key used to bucket rate-limit counters for this request.
//
// Each trusted proxy appends the address it received the request from, so
// only the rightmost `trusted_proxy_hops` entries of X-Forwarded-For can be
// believed; anything to their left is whatever the client chose to send.
// With no trusted proxies, or too few entries, the peer address is used.
pub fn client_key(request: &Request, trusted_proxy_hops: usize) -> String {
    if trusted_proxy_hops > 0 {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| forwarded_hop(v, trusted_proxy_hops));
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// Nth entry from the right, if there are that many and it is an address
fn forwarded_hop(header: &str, hops: usize) -> Option<IpAddr> {
    header
        .rsplit(',')
        .nth(hops - 1)
        .map(str::trim)
        .and_then(|hop| hop.parse().ok())
}

fn origin(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::ORIGIN).and_then(|v| v.to_str().ok())
}

fn log_failure(key: &str, err: &ContactError) {
    match err {
        ContactError::RateLimited(e) => {
            RATE_LIMITED.inc();
            warn!(
                client = %key,
                retry_after_secs = e.retry_after.as_secs(),
                "Request rate limited"
            );
        }
        ContactError::Config(e) => error!(error = %e, "Email delivery not configured"),
        ContactError::Validation(e) => {
            VALIDATION_FAILURES.inc();
            info!(client = %key, error = %e, "Validation failed");
        }
        // provider failures are logged by the dispatcher
        ContactError::Dispatch(DispatchError::Body(_) | DispatchError::Parse(_)) => {
            warn!(client = %key, error = %err, "Unreadable contact submission");
        }
        ContactError::Dispatch(_) => {}
    }
}

fn error_response(err: ContactError, mut headers: HeaderMap) -> Response {
    let status = err.status();
    let message = err.public_message();

    match err {
        ContactError::RateLimited(e) => {
            let secs = e.retry_after.as_secs_f64().ceil() as u64;
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs.max(1)));
            (status, headers, Json(json!({ "error": message }))).into_response()
        }
        // operator-facing, sent as plain text
        ContactError::Config(_) => (status, headers, message).into_response(),
        _ => (status, headers, Json(json!({ "error": message }))).into_response(),
    }
}
