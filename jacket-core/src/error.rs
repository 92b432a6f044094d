use thiserror::Error;

/// Errors surfaced to the person filling in the form, or to an HTTP client.
///
/// The `Display` text is the message shown to the user, so it never carries
/// a variant prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Missing or malformed input, caught before any external call.
    #[error("{0}")]
    Validation(String),

    /// An upstream provider answered with a non-success status or a payload
    /// we could not use.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// A provider could not be constructed (usually a missing API key).
    #[error("{0}")]
    Config(String),

    /// Anything else: transport failures, unexpected panics in glue code.
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::Upstream { status, .. } if (400..=599).contains(status) => *status,
            ServiceError::Upstream { .. } => 502,
            ServiceError::Config(_) | ServiceError::Internal(_) => 500,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ServiceError::upstream(status.as_u16(), err.to_string()),
            None => ServiceError::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_internal() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        let err = ServiceError::from(err);
        assert!(matches!(err, ServiceError::Internal(_)));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn display_is_the_bare_message() {
        let err = ServiceError::upstream(401, "Invalid API key");
        assert_eq!(err.to_string(), "Invalid API key");

        let err = ServiceError::validation("Missing or invalid data in request body.");
        assert_eq!(err.to_string(), "Missing or invalid data in request body.");
    }

    #[test]
    fn status_codes() {
        assert_eq!(ServiceError::validation("x").status_code(), 400);
        assert_eq!(ServiceError::upstream(429, "slow down").status_code(), 429);
        assert_eq!(ServiceError::upstream(200, "bad payload").status_code(), 502);
        assert_eq!(ServiceError::Config("no key".into()).status_code(), 500);
        assert_eq!(ServiceError::internal("boom").status_code(), 500);
    }
}
