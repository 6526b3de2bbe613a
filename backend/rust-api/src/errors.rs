use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Caller-visible error taxonomy. Validation, conflict and prerequisite
/// failures carry specific messages; internal errors are logged and
/// collapsed to a generic message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    MissingPrerequisite(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Conflict(_) => (StatusCode::BAD_REQUEST, "conflict"),
            ApiError::MissingPrerequisite(_) => (StatusCode::BAD_REQUEST, "missing_prerequisite"),
            ApiError::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "Internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        let cases = [
            (ApiError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("dup".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::MissingPrerequisite("pre first".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::ServiceUnavailable("offline".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status_and_code().0, expected);
        }
    }

    #[test]
    fn conflict_and_validation_share_status_but_not_code() {
        // The HTTP interface reports both as 400; the code field keeps
        // them distinguishable for clients.
        let conflict = ApiError::Conflict("Assessment already submitted".into());
        let validation = ApiError::Validation("bad length".into());
        assert_eq!(conflict.status_and_code().0, validation.status_and_code().0);
        assert_ne!(conflict.status_and_code().1, validation.status_and_code().1);
    }
}
