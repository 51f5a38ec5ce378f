//! Error responses.
//!
//! # Status mapping
//! - 400: malformed domain name, disabled feature
//! - 409: duplicate domain
//! - 404: unknown domain
//! - 502: the proxy or the certificate authority failed
//! - 500: everything else (filesystem, store, rollback)

use std::path::PathBuf;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::activation::ActivationError;
use crate::domain::ValidationError;
use crate::error::{CreateFailure, PanelError, Stage, TlsError};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error kind.
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leftover_root: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error,
                stage: None,
                message: message.into(),
                leftover_root: None,
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
    }
}

fn classify_activation(err: &ActivationError) -> (StatusCode, &'static str) {
    match err {
        ActivationError::ConfigRejected(_)
        | ActivationError::ReloadFailed(_)
        | ActivationError::Timeout { .. }
        | ActivationError::Unavailable(_) => (StatusCode::BAD_GATEWAY, "proxy_failure"),
        ActivationError::Io { .. } | ActivationError::RollbackFailed { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "activation_io")
        }
    }
}

fn classify(err: &PanelError) -> (StatusCode, &'static str) {
    match err {
        PanelError::Validation(ValidationError::InvalidFormat { .. }) => {
            (StatusCode::BAD_REQUEST, "invalid_domain")
        }
        PanelError::Validation(ValidationError::DuplicateDomain(_)) => {
            (StatusCode::CONFLICT, "duplicate_domain")
        }
        PanelError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        PanelError::Activation(e) => classify_activation(e),
        PanelError::Tls(TlsError::Disabled) => (StatusCode::BAD_REQUEST, "tls_disabled"),
        PanelError::Tls(TlsError::Activation(e)) => classify_activation(e),
        PanelError::Tls(TlsError::Issuance(_) | TlsError::Timeout(_) | TlsError::InvalidMaterial(_)) => {
            (StatusCode::BAD_GATEWAY, "certificate_failure")
        }
        PanelError::Tls(_) => (StatusCode::INTERNAL_SERVER_ERROR, "tls_internal"),
        PanelError::Provision(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provision_failure"),
        PanelError::Render(_) => (StatusCode::INTERNAL_SERVER_ERROR, "render_failure"),
        PanelError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_failure"),
    }
}

impl From<PanelError> for ApiError {
    fn from(err: PanelError) -> Self {
        let (status, error) = classify(&err);
        Self {
            status,
            body: ErrorBody {
                error,
                stage: Some(err.stage()),
                message: err.to_string(),
                leftover_root: None,
            },
        }
    }
}

impl From<CreateFailure> for ApiError {
    fn from(failure: CreateFailure) -> Self {
        let mut api = ApiError::from(failure.error);
        api.body.leftover_root = failure.leftover_root;
        api
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::IssuanceError;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(PanelError, StatusCode)> = vec![
            (
                ValidationError::InvalidFormat {
                    input: "../x".into(),
                    reason: "path separator",
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (ValidationError::DuplicateDomain("a.com".into()).into(), StatusCode::CONFLICT),
            (PanelError::NotFound("a.com".into()), StatusCode::NOT_FOUND),
            (ActivationError::ReloadFailed("x".into()).into(), StatusCode::BAD_GATEWAY),
            (
                TlsError::Issuance(IssuanceError::Failed("rate limited".into())).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (TlsError::Disabled.into(), StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status, expected);
        }
    }

    #[test]
    fn test_create_failure_reports_leftover_root() {
        let failure = CreateFailure {
            error: ActivationError::ConfigRejected("bad".into()).into(),
            leftover_root: Some(PathBuf::from("/var/www/a.com/public_html")),
        };
        let api = ApiError::from(failure);
        let json = serde_json::to_value(&api.body).unwrap();

        assert_eq!(json["error"], "proxy_failure");
        assert_eq!(json["stage"], "activate");
        assert_eq!(json["leftover_root"], "/var/www/a.com/public_html");
    }
}
