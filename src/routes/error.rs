use actix_web::{error, http::StatusCode, HttpRequest, HttpResponse};
use validator::Validate;

use crate::core::MatchError;
use crate::models::ErrorResponse;

impl error::ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            MatchError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            // A duplicate active match means pair serialization failed
            MatchError::Conflict(_) | MatchError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error, message) = match self {
            MatchError::NotFound(msg) => ("not_found", msg.clone()),
            MatchError::InvalidArgument(msg) => ("invalid_argument", msg.clone()),
            MatchError::Unavailable(_) => (
                "unavailable",
                "Service temporarily unavailable".to_string(),
            ),
            MatchError::Conflict(_) | MatchError::Internal(_) => {
                ("internal_error", "Internal server error".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(ErrorResponse {
            error: error.to_string(),
            message,
            status_code: status.as_u16(),
        })
    }
}

/// Run `validator` rules on a request, mapping failures to a 400
pub fn validate<T: Validate>(value: &T) -> Result<(), MatchError> {
    value.validate().map_err(|errors| {
        tracing::info!("Validation failed: {}", errors);
        MatchError::InvalidArgument(errors.to_string())
    })
}

/// JSON error response for payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Query payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle path segment errors
pub fn handle_path_error(err: error::PathError, req: &HttpRequest) -> actix_web::Error {
    tracing::info!("Path error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_path".to_string(),
        message: format!("Invalid path: {}", err),
        status_code: 400,
    }
    .into()
}
