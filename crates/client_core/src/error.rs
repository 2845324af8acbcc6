//! Error taxonomy for the analysis workflow.

use shared::error::ContractViolation;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// User-correctable selection problems; never touch the network.
    Validation,
    /// Non-2xx responses and connection failures.
    Transport,
    /// A successful exchange that omitted required fields.
    Contract,
    /// Calls that arrive in a state that cannot accept them.
    Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No file selected.")]
    NoFileSelected,
    #[error("Unsupported file type.")]
    UnsupportedType { mime_type: String },
    #[error("File too large. Max {max_mb} MB.")]
    TooLarge { size_bytes: u64, max_mb: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Please select a file.")]
    NoFileSelected,
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error("Failed to download output (HTTP {status}).")]
    Download { status: u16 },
    #[error("{0}")]
    Transport(String),
    #[error("An analysis is already in progress.")]
    SubmissionInFlight,
    #[error("submission was superseded before it completed")]
    Superseded,
    #[error("workflow has been torn down")]
    TornDown,
}

impl WorkflowError {
    pub fn analysis_failed(status: u16) -> Self {
        WorkflowError::Http {
            status,
            message: format!("Analysis failed (HTTP {status})."),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            WorkflowError::Validation(_) | WorkflowError::NoFileSelected => {
                ErrorCategory::Validation
            }
            WorkflowError::Http { .. }
            | WorkflowError::Download { .. }
            | WorkflowError::Transport(_) => ErrorCategory::Transport,
            WorkflowError::Contract(_) => ErrorCategory::Contract,
            WorkflowError::SubmissionInFlight
            | WorkflowError::Superseded
            | WorkflowError::TornDown => ErrorCategory::Lifecycle,
        }
    }

    /// The single message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            "Unexpected error.".to_string()
        } else {
            message
        }
    }
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WorkflowError::Transport("Request timed out.".to_string())
        } else if err.is_connect() {
            WorkflowError::Transport(format!("Could not reach the analysis service: {err}"))
        } else {
            WorkflowError::Transport(err.to_string())
        }
    }
}
