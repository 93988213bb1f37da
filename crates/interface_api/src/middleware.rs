//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use domain_expense::Principal;

use crate::error::ApiError;
use crate::AppState;

/// Authentication middleware
///
/// Validates the bearer token and loads the acting [`Principal`] into the
/// request extensions. Unknown users are treated like bad tokens.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        warn!("Missing or invalid Authorization header");
        return ApiError::Unauthorized.into_response();
    };

    let user_id = match crate::auth::validate_token(token, &state.config.jwt_secret)
        .and_then(|claims| claims.user_id())
    {
        Ok(user_id) => user_id,
        Err(e) => {
            warn!("Token validation failed: {:?}", e);
            return ApiError::Unauthorized.into_response();
        }
    };

    match state.directory.get_principal(user_id).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) if e.is_not_found() => {
            warn!(user_id = %user_id, "Token subject is not a known user");
            ApiError::Unauthorized.into_response()
        }
        Err(e) => ApiError::from(domain_expense::ExpenseError::from(e)).into_response(),
    }
}

/// Audit logging middleware
///
/// Logs every API request with the acting principal
pub async fn audit_middleware(
    State(_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let user_id = request
        .extensions()
        .get::<Principal>()
        .map(|p| p.id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        uri = %uri,
        user = %user_id,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}
