use std::fmt;
use thiserror::Error;

/// Errors raised while building or validating a [`crate::config::BamConfig`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid server: {0}")]
    InvalidServer(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid retry count: {0}")]
    InvalidRetries(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

/// Lookups that must be unique but returned several candidates.
///
/// Each class carries its own exit code so automation can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguityKind {
    /// More than one `Server` with the same display name
    ServerName,
    /// More than one `NetworkServerInterface` for a server or keyword
    ServerInterface,
}

impl fmt::Display for AmbiguityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerName => write!(f, "server"),
            Self::ServerInterface => write!(f, "server interface"),
        }
    }
}

#[derive(Error, Debug)]
pub enum BamError {
    // Session and transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error from {operation}: {message}")]
    Api { operation: String, message: String },

    #[error("Invalid response from {operation}: {message}")]
    InvalidResponse { operation: String, message: String },

    // Per-line identifier errors
    #[error("not a valid CIDR: {0}")]
    InvalidCidr(String),

    #[error("not a supported CIDR: {0}")]
    UnsupportedCidr(String),

    #[error("unsupported zone depth: {0}")]
    UnsupportedZoneDepth(String),

    #[error("invalid reverse zone name: {0}")]
    InvalidZoneName(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("a View is required to resolve zone name {0}")]
    MissingView(String),

    // Run-aborting lookup errors
    #[error("found more than one {kind} for {name}: {}", candidates.join(", "))]
    Ambiguous {
        kind: AmbiguityKind,
        name: String,
        candidates: Vec<String>,
    },

    #[error("server not found: {0}")]
    ServerNotFound(String),

    #[error("server interface not found: {0}")]
    InterfaceNotFound(String),

    #[error("configuration not found: {0}")]
    ConfigurationNotFound(String),

    #[error("view not found: {0}")]
    ViewNotFound(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BamError {
    /// Whether this error must abort the whole run.
    ///
    /// Per-line errors are reported and the caller moves on to the next token.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            BamError::InvalidCidr(_)
                | BamError::UnsupportedCidr(_)
                | BamError::UnsupportedZoneDepth(_)
                | BamError::InvalidZoneName(_)
                | BamError::InvalidIdentifier(_)
                | BamError::MissingView(_)
        )
    }

    /// Process exit status for a fatal error
    pub fn exit_code(&self) -> i32 {
        match self {
            BamError::Ambiguous {
                kind: AmbiguityKind::ServerInterface,
                ..
            } => 3,
            BamError::InterfaceNotFound(_) => 4,
            BamError::Ambiguous {
                kind: AmbiguityKind::ServerName,
                ..
            } => 5,
            BamError::ServerNotFound(_)
            | BamError::ConfigurationNotFound(_)
            | BamError::ViewNotFound(_) => 6,
            _ => 1,
        }
    }

    pub(crate) fn api(operation: &str, message: impl Into<String>) -> Self {
        BamError::Api {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_response(operation: &str, message: impl Into<String>) -> Self {
        BamError::InvalidResponse {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BamError {
    fn from(err: reqwest::Error) -> Self {
        BamError::Transport(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BamError>;
