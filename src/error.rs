//! Error handler for devroom.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("storage operation failed: {0}")]
    Sql(#[from] SQLxError),

    #[error("an account already exists with this email")]
    AlreadyExists,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    NotFound,

    #[error("caller is not allowed to act on behalf of this user")]
    Forbidden,

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("token could not be processed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("internal server error, {details}")]
    Internal {
        details: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("invalid 'Authorization' header")]
    Unauthorized,
}

impl ServerError {
    /// Stable label used on logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Validation(_) | ServerError::Axum(_) => "validation",
            ServerError::AlreadyExists => "already_exists",
            ServerError::InvalidCredentials => "invalid_credentials",
            ServerError::NotFound => "not_found",
            ServerError::Forbidden => "forbidden",
            ServerError::Unauthorized => "unauthorized",
            ServerError::Sql(_) => "operation_failed",
            ServerError::Crypto(_) | ServerError::Token(_) | ServerError::Internal { .. } => {
                "internal"
            },
        }
    }
}

/// Structure for detailed error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    r#type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    instance: Option<String>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update `title` field.
    pub fn title(mut self, title: &str) -> Self {
        self.title = title.into();
        self
    }

    /// Add detailed error.
    pub fn details(mut self, description: &str) -> Self {
        self.detail = description.into();
        self
    }

    /// Automatically add errors field.
    pub fn errors(mut self, errors: &ValidationErrors) -> Self {
        self.errors = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/problem+json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            r#type: None,
            title: "Internal server error.".to_owned(),
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            detail: String::default(),
            instance: None,
            errors: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string()),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default()
            .title("There were validation errors with your request.")
            .details(&self.to_string())
            .status(StatusCode::BAD_REQUEST);

        let response = match &self {
            ServerError::Validation(validation_errors) => response.errors(validation_errors),

            ServerError::AlreadyExists => response
                .title("Account already exists.")
                .status(StatusCode::CONFLICT),

            ServerError::InvalidCredentials => response
                .title("Invalid credentials.")
                .status(StatusCode::UNAUTHORIZED),

            ServerError::Unauthorized => response
                .title("Missing or invalid 'Authorization' header.")
                .status(StatusCode::UNAUTHORIZED),

            ServerError::Forbidden => response
                .title("Forbidden.")
                .status(StatusCode::FORBIDDEN),

            ServerError::NotFound => response
                .title("Resource not found.")
                .status(StatusCode::NOT_FOUND),

            // Storage details stay in logs.
            ServerError::Sql(err) => {
                tracing::error!(error = %err, "storage operation failed");

                ResponseError::default()
                    .title("Operation failed.")
                    .details("The operation could not be completed, please retry later.")
            },

            ServerError::Crypto(err) => {
                tracing::error!(error = %err, "cryptographic operation failed");

                ResponseError::default()
            },

            ServerError::Token(err) => {
                tracing::error!(error = %err, "token could not be issued");

                ResponseError::default()
            },

            ServerError::Internal { details, source } => {
                tracing::error!(err = ?source, %details, "server returned 500 status");

                ResponseError::default()
            },

            ServerError::Axum(_) => response,
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/problem+json")
        .body(
            serde_json::json!({
                "type": null,
                "title": "Internal server error.",
                "status": StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "detail": null,
                "instance": null,
                "errors": null,
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(body_of(ServerError::AlreadyExists).await.0, StatusCode::CONFLICT);
        assert_eq!(
            body_of(ServerError::InvalidCredentials).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(body_of(ServerError::Unauthorized).await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(body_of(ServerError::Forbidden).await.0, StatusCode::FORBIDDEN);
        assert_eq!(body_of(ServerError::NotFound).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_storage_error_is_not_leaked() {
        let (status, body) =
            body_of(ServerError::Sql(SQLxError::Protocol("secret table layout".into()))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["title"], "Operation failed.");
        assert!(!body.to_string().contains("secret table layout"));
    }
}
