use axum::Json;
use serde_json::{Value, json};

pub(crate) async fn ping() -> Json<Value> {
    Json(json!({ "ok": true }))
}
