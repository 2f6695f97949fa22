/// HTTP API endpoints
///
/// Routes are grouped by concern; each submodule exposes a `routes()`
/// function merged into the main router in `crate::server`.

pub mod account;
pub mod admin;
pub mod billing;
pub mod health;
pub mod intake;
pub mod middleware;

use crate::context::AppContext;
use axum::Router;

/// Build all API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(intake::routes())
        .merge(account::routes())
        .merge(billing::routes())
        .merge(admin::routes())
        .merge(health::routes())
}
