//! Client-side upload and analysis workflow.
//!
//! A [`WorkflowController`] validates a selected image or video, keeps
//! memory-backed handles for the preview and the downloaded result, and drives
//! the `predict → download → delete` exchange with the analysis service.

use std::sync::Arc;

pub mod config;
pub mod controller;
pub mod error;
pub mod resources;
pub mod state;
pub mod transport;
pub mod validator;

pub use config::{load_settings, ClientSettings};
pub use controller::WorkflowController;
pub use error::{ErrorCategory, ValidationError, WorkflowError};
pub use resources::{Blob, HandleRegistry, ObjectUrl, RegistryStats};
pub use state::{AnalysisJob, FileSummary, ResultView, SelectedFile, WorkflowSnapshot};
pub use transport::{AnalysisApi, DownloadedOutput, HttpAnalysisApi};

/// Controller talking HTTP to the service described by `settings`.
pub fn http_controller(settings: &ClientSettings) -> Result<WorkflowController, WorkflowError> {
    let api = HttpAnalysisApi::new(settings)?;
    Ok(WorkflowController::new(Arc::new(api)))
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
