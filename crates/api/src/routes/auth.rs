use axum::extract::Path;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// Authentication procedures are not served here; the route exists so the
/// auth rate-limit budget applies to them.
pub(super) async fn not_implemented(Path(procedure): Path<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(json!({
            "error": "Not Implemented",
            "message": format!("auth procedure '{procedure}' is not available"),
        })),
    )
}
