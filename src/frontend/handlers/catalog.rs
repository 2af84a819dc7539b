use axum::Extension;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::frontend::context::GatewayContext;
use crate::frontend::envelope::Operation;
use crate::frontend::proxy_responses::forward;
use crate::shared_types::SessionId;

// -----------------------------------------------------------------------------
// ----- Catalog Handlers ------------------------------------------------------

pub(crate) async fn list_types(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
) -> Response {
    forward(&ctx, &sid, Operation::ListTypes).await
}

pub(crate) async fn list_by_type(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
    Path(tipo): Path<String>,
) -> Response {
    forward(&ctx, &sid, Operation::ListByType { tipo }).await
}

pub(crate) async fn get_item(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
    Path(sku): Path<String>,
) -> Response {
    forward(&ctx, &sid, Operation::GetItem { sku }).await
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    #[serde(default)]
    q: String,
}

pub(crate) async fn search(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
    Query(params): Query<SearchParams>,
) -> Response {
    let q = params.q.trim().to_string();
    forward(&ctx, &sid, Operation::Search { q }).await
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
