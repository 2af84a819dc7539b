// Proxy responses are HTTP replies produced by the gateway itself, rather than
// bodies forwarded verbatim from the backend.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

use crate::errors::CallError;
use crate::shared_types::SessionId;

use super::context::GatewayContext;
use super::envelope::Operation;

pub(crate) const INVALID_PARAMETERS: &str = "invalid parameters";

// -----------------------------------------------------------------------------
// ----- Forwarding ------------------------------------------------------------

/// Send `op` on the caller's session and relay whatever comes back.
pub(crate) async fn forward(ctx: &GatewayContext, sid: &SessionId, op: Operation) -> Response {
    let request = op.envelope();

    match ctx.registry.send(sid, &request, Default::default()).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => {
            warn!("[{sid}] {} failed: {err}", op.code());
            bad_gateway(&err)
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Local Responses -------------------------------------------------------

pub(crate) fn bad_gateway(err: &CallError) -> Response {
    error_body(StatusCode::BAD_GATEWAY, err.to_string())
}

pub(crate) fn invalid_parameters() -> Response {
    error_body(StatusCode::BAD_REQUEST, INVALID_PARAMETERS.to_string())
}

fn error_body(status: StatusCode, error: String) -> Response {
    (status, Json(json!({ "ok": false, "error": error }))).into_response()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
