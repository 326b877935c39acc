//! Error types for YunoHost operations.
//!
//! Errors are categorized from the CLI's stderr so that transient failures
//! (lock contention, network) can be retried and the rest reported as-is.

use thiserror::Error;

/// Categories of YunoHost errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Another YunoHost command holds the lock (transient, retryable)
    Busy,
    /// Network-related errors while fetching app sources (transient, retryable)
    Network,
    /// App or instance not found
    NotFound,
    /// Arguments rejected by YunoHost (unknown group, invalid domain, ...)
    Validation,
    /// Not running with enough privileges
    Permission,
    /// The yunohost executable is missing
    YunohostNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Busy | Self::Network)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Busy => "YunoHost is busy",
            Self::Network => "Network connectivity issue",
            Self::NotFound => "App not found",
            Self::Validation => "Invalid arguments",
            Self::Permission => "Permission denied",
            Self::YunohostNotFound => "YunoHost not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Busy => "Wait for the running YunoHost operation to finish and try again",
            Self::Network => "Check the server's internet connection and try again",
            Self::NotFound => "Check the app name or instance id with 'yunohost app list'",
            Self::Validation => "Check domain, path, groups and settings against the app manifest",
            Self::Permission => "Run as root",
            Self::YunohostNotFound => "Run this tool on a YunoHost server or pass --yunohost",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during YunoHost operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Another YunoHost command is running
    #[error("yunohost is busy: {message}")]
    Busy {
        /// Message from the CLI
        message: String,
    },

    /// Network-related error
    #[error("network error: {message}")]
    Network {
        /// Message from the CLI
        message: String,
    },

    /// App or instance not found
    #[error("app not found: {name}")]
    NotFound {
        /// Name or id that could not be found
        name: String,
    },

    /// Arguments rejected by YunoHost
    #[error("invalid request: {message}")]
    Validation {
        /// Message from the CLI
        message: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Message from the CLI
        message: String,
    },

    /// The yunohost executable could not be found
    #[error("yunohost executable not found at {0}")]
    YunohostNotFound(String),

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
        /// Exit status of the failed command
        exit_code: Option<i32>,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Busy { .. } => ErrorCategory::Busy,
            Error::Network { .. } => ErrorCategory::Network,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Validation { .. } => ErrorCategory::Validation,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::YunohostNotFound(_) => ErrorCategory::YunohostNotFound,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Exit status of the failed command, if known
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::CommandFailed { exit_code, .. } => *exit_code,
            _ => None,
        }
    }

    /// Create an error from yunohost command output.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_yunohost_output(stderr: &str, app: Option<&str>, exit_code: Option<i32>) -> Self {
        let stderr_lower = stderr.to_lowercase();
        let message = stderr.trim().to_string();

        if stderr_lower.contains("another yunohost command is running")
            || stderr_lower.contains("waiting for lock")
            || stderr_lower.contains("unable to acquire the lock")
        {
            return Error::Busy { message };
        }

        if stderr_lower.contains("could not resolve")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("connection reset")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("failed to download")
            || stderr_lower.contains("unable to fetch")
            || stderr_lower.contains("temporary failure in name resolution")
        {
            return Error::Network { message };
        }

        if stderr_lower.contains("could not find")
            || stderr_lower.contains("unknown app")
            || stderr_lower.contains("is not installed")
        {
            return Error::NotFound {
                name: app.unwrap_or("unknown").to_string(),
            };
        }

        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("must be run as root")
            || stderr_lower.contains("operation not permitted")
        {
            return Error::Permission { message };
        }

        if stderr_lower.contains("unknown group")
            || stderr_lower.contains("unknown user")
            || stderr_lower.contains("invalid")
            || stderr_lower.contains("is not a valid")
            || stderr_lower.contains("already used by")
            || stderr_lower.contains("domain unknown")
            || stderr_lower.contains("is required")
        {
            return Error::Validation { message };
        }

        Error::CommandFailed {
            message: format!(
                "yunohost command failed{}",
                app.map(|a| format!(" for {a}")).unwrap_or_default()
            ),
            stderr: message,
            exit_code,
        }
    }
}

/// Result type for YunoHost operations.
pub type Result<T> = std::result::Result<T, Error>;
