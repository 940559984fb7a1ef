//! Route provider error types.

use std::fmt;

/// Errors from resolving a trip into route geometry.
#[derive(Debug)]
pub enum RouteError {
    /// Location text could not be resolved to a coordinate or road position.
    /// Never retried.
    LocationNotFound(String),

    /// Upstream service unreachable, timed out, or returned a server error.
    UpstreamUnavailable {
        service: &'static str,
        message: String,
    },

    /// Upstream service asked us to slow down.
    RateLimited { service: &'static str },

    /// Upstream answered, but not with anything we can use. Never retried.
    InvalidResponse {
        service: &'static str,
        message: String,
        body: Option<String>,
    },

    /// HTTP client could not be constructed.
    Client(reqwest::Error),
}

impl RouteError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RouteError::UpstreamUnavailable { .. } | RouteError::RateLimited { .. }
        )
    }

    pub(crate) fn unavailable(service: &'static str, err: impl fmt::Display) -> Self {
        RouteError::UpstreamUnavailable {
            service,
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid(service: &'static str, message: impl Into<String>) -> Self {
        RouteError::InvalidResponse {
            service,
            message: message.into(),
            body: None,
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::LocationNotFound(location) => {
                write!(f, "location not found: {location}")
            }
            RouteError::UpstreamUnavailable { service, message } => {
                write!(f, "{service} unavailable: {message}")
            }
            RouteError::RateLimited { service } => write!(f, "rate limited by {service}"),
            RouteError::InvalidResponse {
                service,
                message,
                body,
            } => {
                write!(f, "invalid response from {service}: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            RouteError::Client(e) => write!(f, "HTTP client error: {e}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouteError::Client(e) => Some(e),
            _ => None,
        }
    }
}
