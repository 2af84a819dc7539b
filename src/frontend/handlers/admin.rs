use axum::Json;
use axum::extract::State;

use crate::frontend::context::GatewayContext;
use crate::gateway::RegistryStats;

// -----------------------------------------------------------------------------
// ----- Admin Handlers --------------------------------------------------------

pub(crate) async fn sessions(State(ctx): State<GatewayContext>) -> Json<RegistryStats> {
    Json(ctx.registry.stats())
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
