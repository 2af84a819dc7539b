pub mod envelope;
pub mod session_cookie;

pub(crate) mod context;
pub(crate) mod handlers;
pub(crate) mod proxy_responses;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};

pub use context::GatewayContext;
pub use envelope::Operation;
pub use session_cookie::SESSION_COOKIE;

use crate::gateway::SessionRegistry;

// -----------------------------------------------------------------------------
// ----- Router ----------------------------------------------------------------

/// HTTP surface: each `/api` route becomes one backend call on the caller's
/// session.
pub fn router(registry: Arc<SessionRegistry>, secure_cookies: bool) -> Router {
    let ctx = GatewayContext::new(registry, secure_cookies);

    let api = Router::new()
        .route("/types", get(handlers::list_types))
        .route("/by-type/{tipo}", get(handlers::list_by_type))
        .route("/item/{sku}", get(handlers::get_item))
        .route("/search", get(handlers::search))
        .route("/cart", get(handlers::show_cart))
        .route("/cart/add", post(handlers::add_to_cart))
        .route("/checkout", post(handlers::checkout))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            session_cookie::ensure_session,
        ));

    Router::new()
        .route("/health/ping", get(handlers::ping))
        .route("/admin/sessions", get(handlers::sessions))
        .nest("/api", api)
        .with_state(ctx)
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
