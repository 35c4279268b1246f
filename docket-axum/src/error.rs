use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docket_core::DocketError;
use serde_json::json;

/// Transport wrapper that turns any `anyhow::Error` into a JSON response.
#[derive(Debug)]
pub struct DocketAxumError(pub anyhow::Error);

impl From<anyhow::Error> for DocketAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<DocketError> for DocketAxumError {
    fn from(e: DocketError) -> Self {
        Self(e.into_anyhow())
    }
}

impl From<JsonRejection> for DocketAxumError {
    fn from(rejection: JsonRejection) -> Self {
        DocketError::bad_request("Failed to parse the request body as JSON")
            .with_data(json!({ "_schema": [rejection.body_text()] }))
            .into()
    }
}

impl IntoResponse for DocketAxumError {
    fn into_response(self) -> Response {
        // Search the whole chain so `.context(..)` layers keep the original kind.
        let safe = match DocketError::from_anyhow(&self.0) {
            Some(docket) => {
                if docket.is_configuration() {
                    tracing::error!(kind = docket.name(), error = %format!("{:#}", self.0), "tenancy misconfiguration");
                } else if docket.code() >= 500 {
                    tracing::error!(error = %format!("{:#}", self.0), "request failed");
                } else {
                    tracing::debug!(kind = docket.name(), message = %docket.message, "request rejected");
                }
                docket.sanitize_for_client()
            }
            None => {
                tracing::error!(error = %format!("{:#}", self.0), "unhandled error");
                DocketError::general_error(self.0.to_string()).sanitize_for_client()
            }
        };

        let status = StatusCode::from_u16(safe.code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
