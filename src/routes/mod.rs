pub mod account;
pub mod admin;

use axum::routing::{delete, get};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Account
        .route("/api/v1/account", delete(account::delete_account))
        // Admin
        .route("/api/v1/admin/cleanup", get(admin::list_cleanup))
}
