// Typed failures for each component, plus the coarse categories the
// orchestrator and the console use to describe them.

use std::fmt;
use std::path::PathBuf;

/// Broad classes of failure a run can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// DNS, TLS, timeout or refused connection on any network call.
    Connectivity,
    /// The portal markup no longer matches what we scan for.
    ProtocolParse,
    /// Missing, invalid or expired session token.
    Session,
    /// Username/password rejected.
    Credential,
    /// Arithmetic challenge answer rejected.
    Challenge,
    /// Course payload not a JSON array or not decodable.
    Payload,
    /// Bad local input: proxy list lines, empty prompts, config values.
    Input,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Connectivity => "connectivity",
            ErrorCategory::ProtocolParse => "protocol parse",
            ErrorCategory::Session => "session",
            ErrorCategory::Credential => "credential",
            ErrorCategory::Challenge => "challenge",
            ErrorCategory::Payload => "payload",
            ErrorCategory::Input => "input",
        };
        f.write_str(name)
    }
}

/// A failed network exchange. Only the message survives, since callers
/// treat every transport failure the same way.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

/// Login handshake failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Failed to connect to portal: {0}")]
    ConnectionFailed(String),

    #[error("Failed to parse portal form values: {0}")]
    ParseFailed(String),

    #[error("Failed to retrieve session cookie from portal")]
    NoSession,

    #[error("Username or password is incorrect")]
    BadCredentials,

    #[error("Portal verification failed. Please try again.")]
    ChallengeRejected,

    #[error("Could not determine login status. Please try again.")]
    Unknown,
}

impl AuthError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuthError::ConnectionFailed(_) => ErrorCategory::Connectivity,
            AuthError::ParseFailed(_) => ErrorCategory::ProtocolParse,
            AuthError::NoSession => ErrorCategory::Session,
            AuthError::BadCredentials => ErrorCategory::Credential,
            AuthError::ChallengeRejected => ErrorCategory::Challenge,
            AuthError::Unknown => ErrorCategory::ProtocolParse,
        }
    }
}

/// Course listing failures. None of these are retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    ConnectionFailed(String),

    #[error("Session expired or unauthorized")]
    SessionExpired,

    #[error("Failed to fetch courses (HTTP {0})")]
    HttpError(u16),

    #[error("Invalid course data format: {0}")]
    MalformedPayload(String),
}

impl FetchError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            FetchError::ConnectionFailed(_) => ErrorCategory::Connectivity,
            FetchError::SessionExpired => ErrorCategory::Session,
            FetchError::HttpError(_) => ErrorCategory::Connectivity,
            FetchError::MalformedPayload(_) => ErrorCategory::Payload,
        }
    }
}

/// Reading the proxy list from disk.
#[derive(Debug, thiserror::Error)]
pub enum ProxyListError {
    #[error("Proxy file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("Error reading proxy file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProxyListError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Input
    }
}

/// Writing the PDF report.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(String),
}
