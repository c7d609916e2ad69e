//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that
//! converts into `AppError` becomes an `HttpAppError` via `?` and renders as
//! `{error, message?, hint?, code}` with the status the error reports.

use crate::auth::AuthError;
use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use upgate_core::{AppError, ErrorMetadata, LogLevel};
use upgate_storage::StorageError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            error: err.client_message(),
            message: err.detail_message(),
            hint: err.hint().map(String::from),
            code: err.error_code().to_string(),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from upgate-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidRequest(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Request rejected");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Request rejected");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        (status, Json(ErrorResponse::from(app_error))).into_response()
    }
}

// Convert domain errors to HttpAppError (avoids orphan rule: we impl for local HttpAppError)

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(AppError::UpstreamStorage(err.to_string()))
    }
}

impl From<AuthError> for HttpAppError {
    fn from(err: AuthError) -> Self {
        HttpAppError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upgate_core::VerificationFailure;

    #[test]
    fn test_from_storage_error_is_upstream() {
        let HttpAppError(app_err) = StorageError::SigningFailed("signBlob returned 403".to_string()).into();
        match app_err {
            AppError::UpstreamStorage(msg) => assert!(msg.contains("signBlob returned 403")),
            _ => panic!("Expected UpstreamStorage variant"),
        }
    }

    #[test]
    fn test_timeout_is_upstream() {
        let HttpAppError(app_err) = StorageError::Timeout("deadline".to_string()).into();
        assert_eq!(app_err.http_status_code(), 500);
        assert_eq!(app_err.error_code(), "UPSTREAM_STORAGE_ERROR");
    }

    #[test]
    fn test_access_denied_body() {
        let err = AppError::AccessDenied {
            reason: "Email 'x@y.com' is not authorized to access this application".to_string(),
        };
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["error"], "Access Denied");
        assert_eq!(
            json["message"],
            "Email 'x@y.com' is not authorized to access this application"
        );
        assert_eq!(json["hint"], "Contact the administrator to request access");
        assert_eq!(json["code"], "ACCESS_DENIED");
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let err = AppError::verification(VerificationFailure::Unknown, "key set unreachable");
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["error"], "Authentication failed: key set unreachable");
        assert!(json.get("message").is_none());
        assert!(json.get("hint").is_none());
    }

    #[test]
    fn test_status_mapping() {
        let response = HttpAppError(AppError::MissingOrMalformedCredential).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = HttpAppError(AppError::InvalidRequest("filename is required".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = HttpAppError(AppError::AccessDenied { reason: "no".into() }).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = AppError::Internal("route is not behind the identity gate".to_string());
        assert_eq!(err.http_status_code(), 500);
        let json = serde_json::to_value(ErrorResponse::from(&err)).unwrap();
        assert_eq!(json["error"], "An internal error occurred");
        assert_eq!(json["code"], "INTERNAL_ERROR");
    }
}
