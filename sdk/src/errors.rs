//! Error types and handling
//!
//! This module provides the error types used throughout the Gleaner engine.
//! All errors implement the `GleanerErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! All error messages are scrubbed to ensure:
//! - No secrets (API tokens, passwords) are included
//! - All messages are safe to display to end users and to store in the
//!   run summary's reasoning trail

use thiserror::Error;

/// Trait for Gleaner error extensions
///
/// This trait provides additional context for errors, including
/// user-friendly hints and recoverability information.
pub trait GleanerErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are downgraded to reasoning-log entries by the
    /// scheduler; non-recoverable ones abort before the run starts.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// This enum covers the spec'd error taxonomy:
///
/// - **Configuration**: missing/malformed settings; fatal, before the
///   state machine starts
/// - **Authentication**: absent or rejected credentials; recovered at
///   the Connecting state as "adapter not connected"
/// - **Transient I/O**: timeouts and server errors; retried with bounded
///   backoff, surfaced only after retries exhaust
///
/// Scope exhaustion and throttle signals are deliberately *not* errors;
/// they are modeled as ordinary return values on the adapter contract.
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Authentication errors
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    // Transient I/O errors
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    // Browser session errors
    #[error("Browser session error: {0}")]
    Browser(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GleanerErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::MissingCredentials(_) => {
                "Set the platform's credential environment variables before running"
            }
            Self::AuthRejected(_) => "The platform rejected the credentials. Check them and retry",
            Self::Http { .. } => "The platform returned an error response. It may recover shortly",
            Self::Timeout(_) => "The platform took too long to respond. Try again later",
            Self::RetriesExhausted { .. } => {
                "The platform kept failing after several retries. Check your network"
            }
            Self::Browser(_) => "Browser automation failed. Check that Chrome is installed",
            Self::Serialization(_) => "Received data in an unexpected shape",
            Self::Io(_) => "A file operation failed. Check permissions and disk space",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Config errors abort before the state machine starts
            Self::Config(_) => false,

            // Everything else is downgraded to a reasoning entry somewhere
            Self::MissingCredentials(_)
            | Self::AuthRejected(_)
            | Self::Http { .. }
            | Self::Timeout(_)
            | Self::RetriesExhausted { .. }
            | Self::Browser(_)
            | Self::Serialization(_)
            | Self::Io(_) => true,
        }
    }
}
