//! Error types and error categorization.
//!
//! Configuration problems are fatal at startup. Action errors are caught at the
//! leaf-action boundary, categorized for metrics and logged; they never abort
//! a virtual user's session.

use std::fmt;
use thiserror::Error;

/// Errors in the load test setup: task weights, profiles, env vars and config files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Task group '{group}': task '{task}' has weight 0, weights must be positive")]
    ZeroWeight { group: String, task: String },

    #[error("Task group '{group}' has no tasks to select from")]
    EmptyGroup { group: String },

    #[error("Task group '{group}' contains only exit tasks")]
    NoRunnableTask { group: String },

    #[error("Root task group '{group}' cannot contain an exit task")]
    ExitAtRoot { group: String },

    #[error("Weight override '{0}' does not name a task")]
    UnknownWeightOverride(String),

    #[error("Unknown user profile: '{0}'. Expected one of: web, api, errorhandling")]
    UnknownProfile(String),

    #[error("Missing required configuration: {0}")]
    MissingVar(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ConfigError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Invalid session lifecycle transitions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session has not been started")]
    NotStarted,

    #[error("session has already been started")]
    AlreadyStarted,

    #[error("session has been terminated")]
    Terminated,
}

/// Failure of a leaf action. Logged and counted, then the session moves on.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: unexpected HTTP {status}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("{endpoint}: response body is not valid JSON for this call: {source}")]
    ResponseParse {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{endpoint}: no {what} to choose from")]
    EmptyCollection { endpoint: String, what: &'static str },

    #[error("{endpoint}: response is missing '{field}'")]
    MissingField { endpoint: String, field: &'static str },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ActionError {
    /// HTTP status code carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ActionError::UnexpectedStatus { status, .. } => Some(*status),
            ActionError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ActionError::Transport { source, .. } => ErrorCategory::from_reqwest_error(source),
            ActionError::UnexpectedStatus { status, .. } => {
                ErrorCategory::from_status_code(*status).unwrap_or(ErrorCategory::OtherError)
            }
            ActionError::ResponseParse { .. }
            | ActionError::EmptyCollection { .. }
            | ActionError::MissingField { .. } => ErrorCategory::ParseError,
            ActionError::Session(_) => ErrorCategory::OtherError,
        }
    }
}

/// Categories of action failures, used as metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP 4xx errors (client errors)
    ClientError,

    /// HTTP 5xx errors (server errors)
    ServerError,

    /// Network connectivity errors (DNS, connection refused, etc.)
    NetworkError,

    /// Request timeout errors
    TimeoutError,

    /// TLS/SSL certificate errors
    TlsError,

    /// Response bodies that could not be used (bad JSON, empty lists)
    ParseError,

    /// Other/unknown errors
    OtherError,
}

impl ErrorCategory {
    /// Categorize an HTTP status code. Returns None for 2xx/3xx.
    pub fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            200..=399 => None,
            400..=499 => Some(ErrorCategory::ClientError),
            500..=599 => Some(ErrorCategory::ServerError),
            _ => Some(ErrorCategory::OtherError),
        }
    }

    /// Categorize a reqwest error.
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            ErrorCategory::TimeoutError
        } else if error.is_connect() || error.is_request() || error.is_body() {
            ErrorCategory::NetworkError
        } else if error.is_decode() {
            ErrorCategory::ParseError
        } else if error.is_redirect() {
            ErrorCategory::ClientError
        } else {
            let error_msg = error.to_string().to_lowercase();

            if error_msg.contains("certificate")
                || error_msg.contains("tls")
                || error_msg.contains("ssl")
            {
                ErrorCategory::TlsError
            } else if error_msg.contains("dns") || error_msg.contains("connect") {
                ErrorCategory::NetworkError
            } else {
                ErrorCategory::OtherError
            }
        }
    }

    /// Prometheus label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::TimeoutError => "timeout_error",
            ErrorCategory::TlsError => "tls_error",
            ErrorCategory::ParseError => "parse_error",
            ErrorCategory::OtherError => "other_error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "HTTP 4xx Client Errors",
            ErrorCategory::ServerError => "HTTP 5xx Server Errors",
            ErrorCategory::NetworkError => "Network/Connection Errors",
            ErrorCategory::TimeoutError => "Request Timeout Errors",
            ErrorCategory::TlsError => "TLS/SSL Certificate Errors",
            ErrorCategory::ParseError => "Unusable Response Bodies",
            ErrorCategory::OtherError => "Other/Unknown Errors",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
