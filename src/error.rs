//! Error handling module for keysmith
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.

use thiserror::Error;

/// Main error type for keysmith
#[derive(Error, Debug)]
pub enum SetupError {
    /// IO errors (file operations, permissions, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Option/flag parse errors (bad switch token)
    #[error("Flag error: {0}")]
    Flag(String),

    /// Security-state storage errors (unreadable or unwritable state file)
    #[error("State error: {0}")]
    State(String),

    /// External toolchain invocation exited non-zero
    #[error(
        "Command failed: {command} (exit status {status})\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}"
    )]
    Tool {
        /// Rendered command line that was executed.
        command: String,
        /// Exit status code (-1 if terminated by signal).
        status: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Certificate verification against the authority failed
    #[error("Verification error: {0}")]
    Verify(String),

    /// Terminal interaction errors (prompt machinery, not mismatches)
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for keysmith operations
pub type Result<T> = std::result::Result<T, SetupError>;

// Convenient error constructors
impl SetupError {
    /// Create a flag parse error
    pub fn flag(msg: impl Into<String>) -> Self {
        Self::Flag(msg.into())
    }

    /// Create a state storage error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a verification error
    pub fn verify(msg: impl Into<String>) -> Self {
        Self::Verify(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }

    /// Exit code the process should terminate with for this error.
    ///
    /// A failing external tool propagates its own exit status; everything
    /// else maps to 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Tool { status, .. } if *status > 0 => *status,
            _ => 1,
        }
    }
}
