/// Authentication and request-context helpers
use crate::{
    account::ValidatedSession,
    context::AppContext,
    error::{PortalError, PortalResult},
};
use axum::http::HeaderMap;

/// Header carrying the opaque per-client session reference used by the
/// checkout round trip
pub const CLIENT_SESSION_HEADER: &str = "x-intake-session";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::to_string))
}

/// Extract the client session reference, if the front end sent one
pub fn extract_client_ref(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CLIENT_SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Require authentication - extract session or return 401
pub async fn require_auth(ctx: &AppContext, headers: &HeaderMap) -> PortalResult<ValidatedSession> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| PortalError::Authentication("Missing authorization header".to_string()))?;

    ctx.account_manager.validate_access_token(&token).await
}

/// Optional authentication - invalid or missing tokens resolve to None
pub async fn optional_auth(ctx: &AppContext, headers: &HeaderMap) -> Option<ValidatedSession> {
    let token = extract_bearer_token(headers)?;
    ctx.account_manager.validate_access_token(&token).await.ok()
}

/// Require an authenticated admin account
pub async fn require_admin(ctx: &AppContext, headers: &HeaderMap) -> PortalResult<ValidatedSession> {
    let session = require_auth(ctx, headers).await?;
    if !session.is_admin {
        return Err(PortalError::Authorization(
            "Admin access required".to_string(),
        ));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc123token".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), Some("abc123token".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("authorization", "abc123token".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_client_ref_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_SESSION_HEADER, "client-42".parse().unwrap());
        assert_eq!(extract_client_ref(&headers), Some("client-42".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_SESSION_HEADER, "".parse().unwrap());
        assert_eq!(extract_client_ref(&headers), None);
    }
}
