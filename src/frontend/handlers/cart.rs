use axum::Extension;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use serde_json::Value;

use crate::frontend::context::GatewayContext;
use crate::frontend::envelope::Operation;
use crate::frontend::proxy_responses::{forward, invalid_parameters};
use crate::shared_types::SessionId;

// -----------------------------------------------------------------------------
// ----- Cart Handlers ---------------------------------------------------------

pub(crate) async fn add_to_cart(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
    body: Bytes,
) -> Response {
    let Some(op) = parse_add_to_cart(&body) else {
        return invalid_parameters();
    };

    forward(&ctx, &sid, op).await
}

pub(crate) async fn show_cart(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
) -> Response {
    forward(&ctx, &sid, Operation::ShowCart).await
}

/// An empty body checks out without client details.
pub(crate) async fn checkout(
    State(ctx): State<GatewayContext>,
    Extension(sid): Extension<SessionId>,
    body: Bytes,
) -> Response {
    let Some(op) = parse_checkout(&body) else {
        return invalid_parameters();
    };

    forward(&ctx, &sid, op).await
}

// -----------------------------------------------------------------------------
// ----- Body Parsing ----------------------------------------------------------

fn parse_add_to_cart(body: &[u8]) -> Option<Operation> {
    let value: Value = serde_json::from_slice(body).ok()?;

    let sku = value.get("sku")?.as_str()?;
    if sku.trim().is_empty() {
        return None;
    }

    let cant = positive_integer(value.get("cant")?)?;

    Some(Operation::AddToCart {
        sku: sku.to_string(),
        cant,
    })
}

fn parse_checkout(body: &[u8]) -> Option<Operation> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Some(Operation::Checkout { cliente: None });
    }

    let value: Value = serde_json::from_slice(body).ok()?;
    let cliente = value
        .as_object()?
        .get("cliente")
        .filter(|c| !c.is_null())
        .cloned();

    Some(Operation::Checkout { cliente })
}

/// `2` and `2.0` are accepted; `0`, `-1`, `1.5` and `"2"` are not.
fn positive_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return (n > 0).then_some(n);
    }

    let f = value.as_f64()?;
    if f >= 1.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        return Some(f as u64);
    }

    None
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
