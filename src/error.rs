// Error handling framework for ddprov
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::TracedLanguage;

pub type Result<T> = std::result::Result<T, ProvisionError>;

/// Main error type for ddprov with the full provisioning error hierarchy
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("client configuration missing: {variable}")]
    ClientConfigMissing { variable: String },

    #[error("workspace unavailable: {path}")]
    Workspace { path: PathBuf, message: String },

    #[error("toolchain unsupported: {0}")]
    Toolchain(#[from] Box<ToolchainError>),

    #[error("command execution failed: {0}")]
    Command(#[from] Box<CommandError>),

    #[error("artifact download failed: {0}")]
    Download(#[from] Box<DownloadError>),

    #[error("artifact signature invalid: {0}")]
    Signature(#[from] Box<SignatureError>),

    #[error("no provisioner registered for language: {language}")]
    UnregisteredLanguage { language: TracedLanguage },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Toolchain detection and compatibility errors
///
/// The coordinator treats every variant as a per-language skip rather than
/// a failure of the whole provisioning aggregate.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("{tool} not found on the execution node")]
    NotFound {
        tool: String,
        language: TracedLanguage,
    },

    #[error("{tool} version {found} is below the minimum supported {minimum}")]
    UnsupportedVersion {
        tool: String,
        found: String,
        minimum: String,
    },

    #[error("malformed version string: {value}")]
    MalformedVersion { value: String },
}

/// External command execution errors with captured process context
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn command: {command}")]
    SpawnFailed { command: String, error: String },

    #[error("command failed with exit code {exit_code:?}: {command}")]
    ExecutionFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("command timed out after {duration:?}: {command}")]
    Timeout {
        command: String,
        duration: Duration,
        stderr: String,
    },

    #[error("output capture failed for {command}: {message}")]
    OutputCapture { command: String, message: String },

    #[error("unexpected output from {command}: {message}")]
    UnexpectedOutput {
        command: String,
        message: String,
        output: String,
    },
}

/// Agent artifact download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {error}")]
    RequestFailed { url: String, error: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to write {url} to {path}: {error}")]
    WriteFailed {
        url: String,
        path: PathBuf,
        error: String,
    },
}

/// Detached-signature verification errors
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature verification failed for {artifact}")]
    VerificationFailed { artifact: PathBuf },

    #[error("malformed signature material: {message}")]
    Malformed { message: String },
}

impl ProvisionError {
    /// Whether the coordinator should skip the offending language instead
    /// of aborting the whole aggregate.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            ProvisionError::Toolchain(_) | ProvisionError::UnregisteredLanguage { .. }
        )
    }
}

// Convenience conversions so the layers can use `?` without boxing at the
// call site.
impl From<ToolchainError> for ProvisionError {
    fn from(err: ToolchainError) -> Self {
        ProvisionError::Toolchain(Box::new(err))
    }
}

impl From<CommandError> for ProvisionError {
    fn from(err: CommandError) -> Self {
        ProvisionError::Command(Box::new(err))
    }
}

impl From<DownloadError> for ProvisionError {
    fn from(err: DownloadError) -> Self {
        ProvisionError::Download(Box::new(err))
    }
}

impl From<SignatureError> for ProvisionError {
    fn from(err: SignatureError) -> Self {
        ProvisionError::Signature(Box::new(err))
    }
}
