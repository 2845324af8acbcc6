//! Upload and analysis workflow controller.
//!
//! The controller owns the selected file, both display handles and the
//! status. All state lives behind one mutex that is never held across a
//! network call. Each submission captures the generation it started under;
//! after every suspension point it re-checks that generation, and a stale
//! outcome is dropped instead of applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::{
    domain::{JobId, WorkflowStatus},
    error::ContractViolation,
};
use tracing::{debug, info, warn};

use crate::{
    error::{ErrorCategory, WorkflowError},
    resources::{Blob, HandleRegistry, ObjectUrl, ResourceManager, SlotKind},
    state::{AnalysisJob, ResultView, SelectedFile, WorkflowSnapshot, WorkflowState},
    transport::AnalysisApi,
    validator,
};

struct ControllerInner {
    state: WorkflowState,
    resources: ResourceManager,
}

impl ControllerInner {
    /// Drops the current job and result handle. A job that never got its
    /// cleanup request is signalled now so it does not outlive its result.
    fn discard_result(&mut self, api: &dyn AnalysisApi) {
        self.resources.clear(SlotKind::Result);
        self.state.result_media_type = None;
        self.state.result_content_type = None;
        self.state.job = None;
        if let Some(job_id) = self.state.pending_cleanup.take() {
            debug!(job_id = %job_id, "signalling cleanup for superseded job");
            api.signal_delete(&job_id);
        }
    }

    fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            status: self.state.status,
            error: self.state.error.clone(),
            file: self.state.file.as_ref().map(SelectedFile::summary),
            preview: self.resources.current(SlotKind::Preview).cloned(),
            result: self
                .resources
                .current(SlotKind::Result)
                .cloned()
                .map(|url| ResultView {
                    url,
                    media_type: self.state.result_media_type.clone(),
                    content_type: self.state.result_content_type.clone(),
                }),
            job: self.state.job.clone(),
            pending_cleanup: self.state.pending_cleanup.clone(),
            torn_down: self.state.torn_down,
        }
    }
}

pub struct WorkflowController {
    api: Arc<dyn AnalysisApi>,
    inner: Mutex<ControllerInner>,
}

impl WorkflowController {
    pub fn new(api: Arc<dyn AnalysisApi>) -> Self {
        Self::with_registry(api, HandleRegistry::new())
    }

    /// Shares a handle registry with other owners, such as a view that
    /// resolves handles to bytes.
    pub fn with_registry(api: Arc<dyn AnalysisApi>, registry: Arc<HandleRegistry>) -> Self {
        Self {
            api,
            inner: Mutex::new(ControllerInner {
                state: WorkflowState::default(),
                resources: ResourceManager::new(registry),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, ControllerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.inner().snapshot()
    }

    pub fn status(&self) -> WorkflowStatus {
        self.inner().state.status
    }

    pub fn registry(&self) -> Arc<HandleRegistry> {
        Arc::clone(self.inner().resources.registry())
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.inner().resources.registry().resolve(url)
    }

    /// Replaces the selection. A submission still in flight is abandoned:
    /// its outcome will be discarded when it resumes.
    pub fn select(&self, candidate: Option<SelectedFile>) -> Result<WorkflowStatus, WorkflowError> {
        let mut inner = self.inner();
        if inner.state.torn_down {
            return Err(WorkflowError::TornDown);
        }

        if inner.state.status.is_in_flight() {
            info!("selection changed while a submission is in flight; abandoning it");
        }
        inner.state.invalidate_in_flight();
        inner.discard_result(self.api.as_ref());

        match validator::validate(candidate.as_ref()) {
            Err(err) => {
                debug!(error = %err, "rejected selection");
                inner.resources.clear(SlotKind::Preview);
                inner.state.file = None;
                inner.state.status = WorkflowStatus::InvalidSelection;
                inner.state.error = Some(err.to_string());
                Ok(WorkflowStatus::InvalidSelection)
            }
            Ok(()) => {
                let Some(file) = candidate else {
                    return Err(WorkflowError::NoFileSelected);
                };
                info!(
                    name = %file.name,
                    mime_type = %file.mime_type,
                    size_bytes = file.size_bytes,
                    "file selected"
                );
                inner.resources.set(SlotKind::Preview, file.to_blob());
                inner.state.file = Some(file);
                inner.state.status = WorkflowStatus::Ready;
                inner.state.error = None;
                Ok(WorkflowStatus::Ready)
            }
        }
    }

    /// Clears selection, preview and result and returns to `idle`.
    pub fn reset(&self) -> Result<(), WorkflowError> {
        let mut inner = self.inner();
        if inner.state.torn_down {
            return Err(WorkflowError::TornDown);
        }
        inner.state.invalidate_in_flight();
        inner.discard_result(self.api.as_ref());
        inner.resources.clear(SlotKind::Preview);
        inner.state.file = None;
        inner.state.error = None;
        inner.state.status = WorkflowStatus::Idle;
        Ok(())
    }

    /// Runs one full submission: upload and predict, download the output into
    /// a result handle, then ask the server to delete its copy.
    pub async fn submit(&self) -> Result<AnalysisJob, WorkflowError> {
        let (generation, file) = {
            let mut inner = self.inner();
            if inner.state.torn_down {
                return Err(WorkflowError::TornDown);
            }
            if inner.state.status.is_in_flight() {
                return Err(WorkflowError::SubmissionInFlight);
            }

            let file = match inner.state.file.clone() {
                Some(file) if validator::validate(Some(&file)).is_ok() => file,
                _ => {
                    let err = WorkflowError::NoFileSelected;
                    inner.state.fail(err.user_message());
                    return Err(err);
                }
            };

            let generation = inner.state.invalidate_in_flight();
            inner.discard_result(self.api.as_ref());
            inner.state.status = WorkflowStatus::Submitting;
            inner.state.error = None;
            (generation, file)
        };

        info!(name = %file.name, generation, "submitting file for analysis");

        let response = match self.api.predict(&file).await {
            Ok(response) => response,
            Err(err) => return Err(self.finish_failure(generation, err)),
        };

        let job = AnalysisJob::from_response(response);
        {
            let mut inner = self.inner();
            if !inner.state.is_current(generation) {
                drop(inner);
                return Err(self.abandon(job.job_id.as_ref()));
            }
            inner.state.pending_cleanup = job.job_id.clone();
            inner.state.job = Some(job.clone());
        }

        let Some(download_url) = job.download_url.clone() else {
            let err = ContractViolation::MissingDownloadUrl.into();
            return Err(self.finish_failure(generation, err));
        };

        let output = match self.api.fetch_output(&download_url).await {
            Ok(output) => output,
            Err(err) => return Err(self.finish_failure(generation, err)),
        };

        let cleanup = {
            let mut inner = self.inner();
            if !inner.state.is_current(generation) {
                // Whoever superseded us already took the recorded job for cleanup.
                debug!(generation, "discarding output of superseded submission");
                return Err(WorkflowError::Superseded);
            }

            let media_type = job.output_type.clone().or(output.content_type.clone());
            let url = inner
                .resources
                .set(SlotKind::Result, Blob::new(output.bytes, media_type.clone()));
            info!(
                handle = %url,
                media_type = media_type.as_deref().unwrap_or("unknown"),
                label = job.label.as_deref().unwrap_or(""),
                "analysis succeeded"
            );
            inner.state.result_media_type = media_type;
            inner.state.result_content_type = output.content_type;
            inner.state.status = WorkflowStatus::Succeeded;
            inner.state.pending_cleanup.clone()
        };

        // The job stays recorded until the delete resolves, so a submission
        // dropped at this await still leaves it for teardown.
        if let Some(job_id) = cleanup {
            if let Err(err) = self.api.delete_job(&job_id).await {
                debug!(job_id = %job_id, "best-effort job cleanup failed: {err}");
            }
            let mut inner = self.inner();
            if inner.state.pending_cleanup.as_ref() == Some(&job_id) {
                inner.state.pending_cleanup = None;
            }
        }

        Ok(job)
    }

    /// Releases both handles and fires a deletion signal for any job that
    /// still has a server-side copy. Safe to call more than once.
    pub fn teardown(&self) {
        let mut inner = self.inner();
        if inner.state.torn_down {
            return;
        }
        inner.state.invalidate_in_flight();
        inner.state.torn_down = true;
        inner.resources.clear_all();
        inner.state.file = None;
        inner.state.result_media_type = None;
        inner.state.result_content_type = None;
        if let Some(job_id) = inner.state.pending_cleanup.take() {
            info!(job_id = %job_id, "teardown: signalling job cleanup");
            self.api.signal_delete(&job_id);
        }
        info!("workflow torn down");
    }

    fn finish_failure(&self, generation: u64, err: WorkflowError) -> WorkflowError {
        let mut inner = self.inner();
        if !inner.state.is_current(generation) {
            debug!(error = %err, "discarding failure of superseded submission");
            return WorkflowError::Superseded;
        }

        match err.category() {
            ErrorCategory::Contract => {
                warn!(error = %err, "analysis service broke the response contract")
            }
            ErrorCategory::Transport => warn!(error = %err, "analysis failed"),
            ErrorCategory::Validation | ErrorCategory::Lifecycle => {
                debug!(error = %err, "analysis rejected")
            }
        }
        inner.state.fail(err.user_message());
        err
    }

    /// A superseded submission still owns the job it created; nobody else
    /// will ever display or delete it.
    fn abandon(&self, job_id: Option<&JobId>) -> WorkflowError {
        if let Some(job_id) = job_id {
            debug!(job_id = %job_id, "signalling cleanup for abandoned job");
            self.api.signal_delete(job_id);
        }
        WorkflowError::Superseded
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
