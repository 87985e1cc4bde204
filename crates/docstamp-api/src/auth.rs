//! # Group Authorization Middleware
//!
//! The identity layer in front of this service forwards the caller's
//! groups in the `MU-AUTH-ALLOWED-GROUPS` header as a JSON array:
//!
//! ```text
//! MU-AUTH-ALLOWED-GROUPS: [{"name":"public"},{"name":"admin","variables":[]}]
//! ```
//!
//! A request passes when any of its groups is one of the configured
//! authorized groups. With no authorized groups configured the check is
//! disabled (development mode).

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::AppError;

/// Header carrying the caller's groups.
pub const ALLOWED_GROUPS_HEADER: &str = "mu-auth-allowed-groups";

const FORBIDDEN_MESSAGE: &str = "You don't have the required access rights to stamp documents";

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Groups allowed through. Empty disables the check.
    pub authorized_groups: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AllowedGroup {
    name: String,
}

/// Parse the group names out of an allowed-groups header value.
pub fn parse_allowed_groups(header: &str) -> Result<Vec<String>, String> {
    serde_json::from_str::<Vec<AllowedGroup>>(header)
        .map(|groups| groups.into_iter().map(|g| g.name).collect())
        .map_err(|e| format!("malformed {ALLOWED_GROUPS_HEADER} header: {e}"))
}

/// Whether any of the caller's groups is authorized.
pub fn is_authorized(caller_groups: &[String], authorized: &[String]) -> bool {
    caller_groups.iter().any(|g| authorized.contains(g))
}

/// Reject callers outside the authorized groups with 403.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();
    if config.authorized_groups.is_empty() {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(ALLOWED_GROUPS_HEADER)
        .and_then(|v| v.to_str().ok());

    let groups = match header.map(parse_allowed_groups) {
        Some(Ok(groups)) => groups,
        Some(Err(reason)) => {
            tracing::warn!(reason = %reason, "authorization failed");
            return forbidden_response();
        }
        None => {
            tracing::warn!("authorization failed: missing allowed-groups header");
            return forbidden_response();
        }
    };

    if is_authorized(&groups, &config.authorized_groups) {
        next.run(request).await
    } else {
        tracing::warn!(groups = ?groups, "authorization failed: no authorized group");
        forbidden_response()
    }
}

fn forbidden_response() -> Response {
    AppError::Forbidden(FORBIDDEN_MESSAGE.to_string()).into_response()
}
