//! Observable workflow state and the values the view renders from.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use shared::{
    domain::{JobId, MediaKind, WorkflowStatus},
    protocol::PredictResponse,
};

use crate::resources::{Blob, ObjectUrl};

/// A file chosen by the user, held entirely in memory.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    /// Declared size; validation only looks at this, never at `data`.
    pub size_bytes: u64,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: data.len() as u64,
            data,
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            size_bytes: self.size_bytes,
        }
    }

    pub(crate) fn to_blob(&self) -> Blob {
        Blob::new(self.data.clone(), Some(self.mime_type.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileSummary {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0 / 1024.0
    }
}

/// Metadata of a job the service accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisJob {
    pub job_id: Option<JobId>,
    pub label: Option<String>,
    pub output_type: Option<String>,
    pub download_url: Option<String>,
    pub confidence: Option<f32>,
    pub frames_processed: Option<u32>,
    pub received_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn from_response(response: PredictResponse) -> Self {
        let response = response.normalized();
        Self {
            job_id: response.job_id,
            label: response.label,
            output_type: response.output_type,
            download_url: response.download_url,
            confidence: response.confidence,
            frames_processed: response.frames_processed,
            received_at: Utc::now(),
        }
    }

    pub fn display_label(&self) -> Option<String> {
        self.label.as_ref().map(|label| label.to_uppercase())
    }

    pub fn is_fake(&self) -> bool {
        self.display_label().as_deref() == Some("FAKE")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub url: ObjectUrl,
    /// Reported output type, or the download's content type when none was reported.
    pub media_type: Option<String>,
    /// Content type the download itself carried.
    pub content_type: Option<String>,
}

impl ResultView {
    /// Video when either the reported type or the downloaded bytes say so.
    pub fn media_kind(&self) -> MediaKind {
        let is_video = [&self.media_type, &self.content_type]
            .into_iter()
            .flatten()
            .any(|value| MediaKind::from_mime(value) == MediaKind::Video);
        if is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

/// Read-only copy of the workflow handed to the view.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSnapshot {
    pub status: WorkflowStatus,
    pub error: Option<String>,
    pub file: Option<FileSummary>,
    pub preview: Option<ObjectUrl>,
    pub result: Option<ResultView>,
    pub job: Option<AnalysisJob>,
    pub pending_cleanup: Option<JobId>,
    pub torn_down: bool,
}

impl WorkflowSnapshot {
    pub fn can_submit(&self) -> bool {
        !self.torn_down && self.file.is_some() && !self.status.is_in_flight()
    }
}

#[derive(Debug, Default)]
pub(crate) struct WorkflowState {
    pub(crate) status: WorkflowStatus,
    pub(crate) error: Option<String>,
    pub(crate) file: Option<SelectedFile>,
    pub(crate) result_media_type: Option<String>,
    pub(crate) result_content_type: Option<String>,
    pub(crate) job: Option<AnalysisJob>,
    /// Job whose server-side copy has not been asked to delete yet.
    pub(crate) pending_cleanup: Option<JobId>,
    /// Bumped whenever an in-flight submission must stop touching state.
    pub(crate) generation: u64,
    pub(crate) torn_down: bool,
}

impl WorkflowState {
    pub(crate) fn invalidate_in_flight(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.torn_down && self.generation == generation
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.status = WorkflowStatus::Failed;
        self.error = Some(message.into());
    }
}
