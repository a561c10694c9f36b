//! Error types for the HTTP surface.

use axum::Json;
use axum::http::header::WWW_AUTHENTICATE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::patlite::{CommandName, Options, ValidationError};
use crate::transport::TransportError;

pub const BASIC_REALM: &str = r#"Basic realm="Restricted Area""#;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Unknown route or command name.
    #[error("not found")]
    NotFound,

    /// Peer address outside the allow-list.
    #[error("forbidden")]
    Forbidden,

    #[error("not authorized")]
    Unauthorized,

    #[error("invalid payload: {0}")]
    BadPayload(String),

    /// Options failed validation; nothing was executed.
    #[error("{source}")]
    Invalid {
        command: CommandName,
        parameter: Options,
        #[source]
        source: ValidationError,
    },

    #[error("{source}")]
    Transport {
        command: CommandName,
        #[source]
        source: TransportError,
    },
}

impl GatewayError {
    /// - NotFound: 404
    /// - Forbidden: 403
    /// - Unauthorized: 401 (with Basic challenge)
    /// - BadPayload: 400
    /// - Invalid: 412
    /// - Transport: 502
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadPayload(_) => StatusCode::BAD_REQUEST,
            Self::Invalid { .. } => StatusCode::PRECONDITION_FAILED,
            Self::Transport { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::NotFound => json!({ "error": "not found" }),
            Self::Invalid {
                command,
                parameter,
                source,
            } => json!({
                "status": "error",
                "command": command,
                "parameter": parameter,
                "invalid": source.keys(),
                "message": source.message(),
            }),
            Self::Transport { command, source } => json!({
                "status": "error",
                "command": command,
                "error": source.to_string(),
            }),
            other => json!({ "error": other.to_string() }),
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Unauthorized) {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static(BASIC_REALM));
        }
        response
    }
}
