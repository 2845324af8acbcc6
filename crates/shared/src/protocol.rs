use serde::{Deserialize, Serialize};

use crate::domain::JobId;

/// Body of a successful `POST /predict`.
///
/// Every field is optional on the wire; the client decides which omissions
/// are contract violations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames_processed: Option<u32>,
}

impl PredictResponse {
    /// Treats empty strings the same as absent fields.
    pub fn normalized(mut self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }
        self.job_id = self.job_id.filter(|id| !id.as_str().trim().is_empty());
        self.label = non_empty(self.label);
        self.output_type = non_empty(self.output_type);
        self.download_url = non_empty(self.download_url);
        self
    }
}
