/* src/error.rs */

use thiserror::Error;

/// Result type alias for operations that may fail with `GateError`.
pub type Result<T> = std::result::Result<T, GateError>;

/// Errors surfaced by the gate.
///
/// Resolving an address never fails; missing request data simply yields no
/// address. The only runtime failure is a policy rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The resolved client address was refused by the configured list.
    #[error("Access forbidden for client {}", .ip.as_deref().unwrap_or("<unknown>"))]
    Forbidden { ip: Option<String> },

    /// A configured forwarding header name is not a valid HTTP token.
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        match self {
            GateError::Forbidden { .. } => StatusCode::FORBIDDEN.into_response(),
            GateError::InvalidHeaderName(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}
