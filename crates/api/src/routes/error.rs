use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lorekeep_domain::LorekeepError;
use serde::Serialize;
use tracing::warn;

use crate::utils::logging::error_label;

/// Handler error; renders as a JSON body with a status matching the
/// error kind.
#[derive(Debug)]
pub struct ApiError(pub LorekeepError);

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            LorekeepError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LorekeepError::NotFound(_) => StatusCode::NOT_FOUND,
            LorekeepError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            LorekeepError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            LorekeepError::Database(_) | LorekeepError::Config(_) | LorekeepError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<LorekeepError> for ApiError {
    fn from(err: LorekeepError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let label = error_label(&self.0);
        if status.is_server_error() {
            warn!(error_kind = label, error = %self.0, "request failed");
        }
        (status, Json(ErrorBody { error: label, message: self.0.to_string() })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_error_kinds_to_statuses() {
        let cases = [
            (LorekeepError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (LorekeepError::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (LorekeepError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status_code(), expected);
        }
    }
}
