//! Error types for StudyHall services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling
//!
//! The upstream AI mappings (429 -> 429, 402 -> 402, everything else -> 500)
//! are part of the client contract and must not change.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    MissingField,
    InvalidFormat,
    EmptyExtraction,

    // Authentication errors (2xxx)
    Unauthorized,
    InvalidToken,
    ExpiredToken,

    // Authorization errors (3xxx)
    Forbidden,
    OwnershipMismatch,

    // Resource errors (4xxx)
    NotFound,
    ProfileNotFound,
    CustomerNotFound,

    // Rate limiting & credits (6xxx)
    RateLimited,
    UpstreamRateLimited,
    UpstreamCredits,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // External service errors (8xxx)
    AiServiceError,
    UpstreamParseError,
    BillingError,
    WebhookSignatureError,
    StorageError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::MissingField => 1002,
            ErrorCode::InvalidFormat => 1003,
            ErrorCode::EmptyExtraction => 1004,

            // Auth (2xxx)
            ErrorCode::Unauthorized => 2001,
            ErrorCode::InvalidToken => 2002,
            ErrorCode::ExpiredToken => 2003,

            // Authz (3xxx)
            ErrorCode::Forbidden => 3001,
            ErrorCode::OwnershipMismatch => 3002,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ProfileNotFound => 4002,
            ErrorCode::CustomerNotFound => 4003,

            // Rate limits & credits (6xxx)
            ErrorCode::RateLimited => 6001,
            ErrorCode::UpstreamRateLimited => 6002,
            ErrorCode::UpstreamCredits => 6003,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // External (8xxx)
            ErrorCode::AiServiceError => 8001,
            ErrorCode::UpstreamParseError => 8002,
            ErrorCode::BillingError => 8003,
            ErrorCode::WebhookSignatureError => 8004,
            ErrorCode::StorageError => 8005,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Required field missing: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("No readable text detected in the supplied file")]
    EmptyExtraction,

    // Authentication errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Invalid bearer token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    // Authorization errors
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Record does not belong to the current owner")]
    OwnershipMismatch,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Profile not found for user {user_id}")]
    ProfileNotFound { user_id: String },

    #[error("No billing customer exists for this account")]
    CustomerNotFound,

    // Rate limiting & credits
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    #[error("AI service is receiving too many requests, retry shortly")]
    UpstreamRateLimited,

    #[error("AI credits exhausted, add credits to continue")]
    UpstreamCredits,

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // External service errors
    #[error("AI service error")]
    AiService { message: String },

    #[error("Failed to parse model output as JSON")]
    UpstreamParse { raw: String },

    #[error("Billing provider error: {message}")]
    Billing { message: String },

    #[error("Webhook signature verification failed: {message}")]
    WebhookSignature { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::MissingField { .. } => ErrorCode::MissingField,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::EmptyExtraction => ErrorCode::EmptyExtraction,
            AppError::Unauthorized { .. } => ErrorCode::Unauthorized,
            AppError::InvalidToken => ErrorCode::InvalidToken,
            AppError::ExpiredToken => ErrorCode::ExpiredToken,
            AppError::Forbidden { .. } => ErrorCode::Forbidden,
            AppError::OwnershipMismatch => ErrorCode::OwnershipMismatch,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ProfileNotFound { .. } => ErrorCode::ProfileNotFound,
            AppError::CustomerNotFound => ErrorCode::CustomerNotFound,
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::UpstreamRateLimited => ErrorCode::UpstreamRateLimited,
            AppError::UpstreamCredits => ErrorCode::UpstreamCredits,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::AiService { .. } => ErrorCode::AiServiceError,
            AppError::UpstreamParse { .. } => ErrorCode::UpstreamParseError,
            AppError::Billing { .. } => ErrorCode::BillingError,
            AppError::WebhookSignature { .. } => ErrorCode::WebhookSignatureError,
            AppError::Storage { .. } => ErrorCode::StorageError,
            AppError::HttpClient(_) => ErrorCode::AiServiceError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. }
            | AppError::MissingField { .. }
            | AppError::InvalidFormat { .. }
            | AppError::EmptyExtraction
            | AppError::WebhookSignature { .. } => StatusCode::BAD_REQUEST,

            // 401 Unauthorized
            AppError::Unauthorized { .. } | AppError::InvalidToken | AppError::ExpiredToken => {
                StatusCode::UNAUTHORIZED
            }

            // 402 Payment Required
            AppError::UpstreamCredits => StatusCode::PAYMENT_REQUIRED,

            // 403 Forbidden
            AppError::Forbidden { .. } | AppError::OwnershipMismatch => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::ProfileNotFound { .. }
            | AppError::CustomerNotFound => StatusCode::NOT_FOUND,

            // 429 Too Many Requests
            AppError::RateLimited { .. } | AppError::UpstreamRateLimited => {
                StatusCode::TOO_MANY_REQUESTS
            }

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::DatabaseConnection { .. }
            | AppError::AiService { .. }
            | AppError::UpstreamParse { .. }
            | AppError::Storage { .. }
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::Billing { .. } | AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Extra payload attached to the error response body.
    ///
    /// Parse failures carry the raw model output so callers can diagnose
    /// what the model actually returned.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::UpstreamParse { raw } => Some(serde_json::json!({ "raw": raw })),
            _ => None,
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let details = self.details();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details,
                request_id: None, // Filled by middleware
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_rate_mapping() {
        let err = AppError::UpstreamRateLimited;
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.code(), ErrorCode::UpstreamRateLimited);
        assert!(err.to_string().contains("retry shortly"));
    }

    #[test]
    fn test_upstream_credits_mapping() {
        let err = AppError::UpstreamCredits;
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
        assert!(err.to_string().contains("credits"));
    }

    #[test]
    fn test_parse_error_carries_raw_output() {
        let err = AppError::UpstreamParse {
            raw: "no json here".into(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let details = err.details().expect("details");
        assert_eq!(details["raw"], "no json here");
    }

    #[test]
    fn test_empty_extraction_is_client_error() {
        let err = AppError::EmptyExtraction;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_webhook_signature_rejected_with_400() {
        let err = AppError::WebhookSignature {
            message: "bad v1".into(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
