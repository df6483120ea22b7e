//! CLI-specific error types
//!
//! Store failures keep their own code so that clients see
//! `SEARCHDOC_NOT_FOUND` and friends unchanged.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::store::{StoreError, StoreErrorCode};

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Request line is not a valid request
    BadRequest,
    /// Already initialized
    AlreadyInitialized,
    /// Not initialized
    NotInitialized,
    /// A store operation failed
    Store(StoreErrorCode),
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "SEARCHDOC_CLI_CONFIG_ERROR",
            Self::IoError => "SEARCHDOC_CLI_IO_ERROR",
            Self::BadRequest => "SEARCHDOC_CLI_BAD_REQUEST",
            Self::AlreadyInitialized => "SEARCHDOC_CLI_ALREADY_INITIALIZED",
            Self::NotInitialized => "SEARCHDOC_CLI_NOT_INITIALIZED",
            Self::Store(code) => code.code(),
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BadRequest, msg)
    }

    pub fn already_initialized() -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            "Data directory already initialized",
        )
    }

    pub fn not_initialized() -> Self {
        Self::new(
            CliErrorCode::NotInitialized,
            "Data directory not initialized. Run 'searchdoc init' first.",
        )
    }

    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        let message = match e.engine_error() {
            Some(source) => format!("{} ({})", e.message(), source),
            None => e.message().to_string(),
        };
        Self::new(CliErrorCode::Store(e.code()), message)
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
