/// Account endpoints: registration, login, sessions, and the user dashboard
use crate::{
    api::middleware::{extract_client_ref, require_auth},
    account::{
        CreateAccountRequest, CreateAccountResponse, CreateSessionRequest, SessionInfo,
        SessionResponse,
    },
    context::AppContext,
    db::models::SubmissionRecord,
    error::{PortalError, PortalResult},
};
use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/account/create", post(create_account))
        .route("/api/account/login", post(login))
        .route("/api/account/logout", post(logout))
        .route("/api/account/session", get(get_session))
        .route("/api/account/submissions", get(list_own_submissions))
}

/// Create an account and link prior anonymous intake history to it
async fn create_account(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> PortalResult<Json<CreateAccountResponse>> {
    req.validate()
        .map_err(|e| PortalError::Validation(e.to_string()))?;

    let client_ref = extract_client_ref(&headers);

    let account = ctx
        .account_manager
        .create_account(req.email, req.password, req.full_name)
        .await?;

    // Re-key anonymous payments/submissions to the new account. A linking
    // failure is reported in the response body but never undoes the account:
    // the linker is idempotent and the UI can retry.
    let linking = ctx
        .linker
        .link(&account.id, &account.email, client_ref.as_deref())
        .await;

    let session = ctx.account_manager.create_session(&account.id).await?;

    Ok(Json(CreateAccountResponse {
        account_id: account.id,
        email: account.email,
        access_token: session.access_token,
        linking,
    }))
}

/// Login endpoint
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<CreateSessionRequest>,
) -> PortalResult<Json<SessionResponse>> {
    let (account, session) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(SessionResponse {
        account_id: account.id,
        email: account.email,
        access_token: session.access_token,
        consultation_paid: account.consultation_paid,
    }))
}

/// Logout endpoint
async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> PortalResult<Json<serde_json::Value>> {
    let validated = require_auth(&ctx, &headers).await?;

    ctx.account_manager
        .delete_session(&validated.session_id)
        .await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

/// Session info endpoint (user dashboard header)
async fn get_session(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> PortalResult<Json<SessionInfo>> {
    let validated = require_auth(&ctx, &headers).await?;

    let account = ctx.account_manager.get_account(&validated.account_id).await?;

    Ok(Json(SessionInfo {
        account_id: account.id,
        email: account.email,
        full_name: account.full_name,
        consultation_paid: account.consultation_paid,
        is_admin: account.is_admin,
    }))
}

/// The authenticated client's own submissions (user dashboard)
async fn list_own_submissions(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> PortalResult<Json<Vec<SubmissionRecord>>> {
    let validated = require_auth(&ctx, &headers).await?;

    let submissions = ctx.recorder.list_for_account(&validated.account_id).await?;

    Ok(Json(submissions))
}
