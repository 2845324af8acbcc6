//! HTTP contract with the analysis service.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    header::{CACHE_CONTROL, CONTENT_TYPE, PRAGMA},
    multipart::{Form, Part},
    Body, Client, Response,
};
use shared::{
    domain::JobId,
    error::{ApiErrorBody, ContractViolation},
    protocol::PredictResponse,
};
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::{normalize_base_url, ClientSettings},
    error::WorkflowError,
    state::SelectedFile,
};

#[derive(Debug, Clone)]
pub struct DownloadedOutput {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Remote side of the workflow.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Uploads the file and returns the raw prediction payload.
    async fn predict(&self, file: &SelectedFile) -> Result<PredictResponse, WorkflowError>;

    /// Downloads the rendered output behind a server-relative `download_url`.
    async fn fetch_output(&self, download_url: &str) -> Result<DownloadedOutput, WorkflowError>;

    async fn delete_job(&self, job_id: &JobId) -> Result<(), WorkflowError>;

    /// Requests deletion without waiting. Must return immediately; delivery is
    /// not confirmed.
    fn signal_delete(&self, job_id: &JobId);
}

pub struct HttpAnalysisApi {
    http: Client,
    base_url: String,
    sample_every: Option<u32>,
}

impl HttpAnalysisApi {
    pub fn new(settings: &ClientSettings) -> Result<Self, WorkflowError> {
        let base_url = normalize_base_url(&settings.api_base_url);
        Url::parse(&base_url).map_err(|err| {
            WorkflowError::Transport(format!("invalid API base URL '{base_url}': {err}"))
        })?;

        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            sample_every: settings.sample_every,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL joined with a server-relative path. Absolute URLs are a
    /// contract violation: output is only ever fetched from the configured
    /// service.
    pub fn resolve_download_url(&self, download_url: &str) -> Result<Url, ContractViolation> {
        let download_url = download_url.trim();
        if Url::parse(download_url).is_ok() {
            return Err(ContractViolation::InvalidDownloadUrl(format!(
                "{download_url}: expected a path relative to the API base URL"
            )));
        }

        let candidate = if download_url.starts_with('/') {
            format!("{}{download_url}", self.base_url)
        } else {
            format!("{}/{download_url}", self.base_url)
        };

        Url::parse(&candidate)
            .map_err(|err| ContractViolation::InvalidDownloadUrl(format!("{candidate}: {err}")))
    }

    fn delete_url(&self, job_id: &JobId) -> Result<Url, WorkflowError> {
        let mut url = Url::parse(&self.base_url).map_err(|err| {
            WorkflowError::Transport(format!("invalid API base URL '{}': {err}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                WorkflowError::Transport(format!(
                    "API base URL '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("delete")
            .push(job_id.as_str());
        Ok(url)
    }

    async fn error_from_response(response: Response) -> WorkflowError {
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap_or_default();
        match ApiErrorBody::parse(&body) {
            Some(message) => WorkflowError::Http { status, message },
            None => WorkflowError::analysis_failed(status),
        }
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn predict(&self, file: &SelectedFile) -> Result<PredictResponse, WorkflowError> {
        let part = Part::stream_with_length(Body::from(file.data.clone()), file.data.len() as u64)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = Form::new().part("file", part);

        let mut request = self.http.post(format!("{}/predict", self.base_url));
        if let Some(sample_every) = self.sample_every {
            request = request.query(&[("sample_every", sample_every)]);
        }

        let response = request.multipart(form).send().await?;
        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            warn!(error = %err, "prediction request rejected");
            return Err(err);
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<PredictResponse>(&body)
            .map_err(|err| ContractViolation::MalformedBody(err.to_string()).into())
    }

    async fn fetch_output(&self, download_url: &str) -> Result<DownloadedOutput, WorkflowError> {
        let url = self.resolve_download_url(download_url)?;
        let response = self
            .http
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "output download rejected");
            return Err(WorkflowError::Download {
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .filter(|value| !value.is_empty());
        let bytes = response.bytes().await?;

        Ok(DownloadedOutput {
            bytes,
            content_type,
        })
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<(), WorkflowError> {
        let url = self.delete_url(job_id)?;
        let response = self.http.delete(url).send().await?;
        if !response.status().is_success() {
            return Err(WorkflowError::Http {
                status: response.status().as_u16(),
                message: format!("job deletion returned HTTP {}", response.status().as_u16()),
            });
        }
        Ok(())
    }

    fn signal_delete(&self, job_id: &JobId) {
        let url = match self.delete_url(job_id) {
            Ok(url) => url,
            Err(err) => {
                debug!(job_id = %job_id, "skipping teardown cleanup: {err}");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!(job_id = %job_id, "no async runtime available; teardown cleanup not sent");
            return;
        };

        let http = self.http.clone();
        let job_id = job_id.clone();
        runtime.spawn(async move {
            if let Err(err) = http.delete(url).send().await {
                debug!(job_id = %job_id, "teardown cleanup failed: {err}");
            }
        });
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
