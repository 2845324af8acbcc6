use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error body returned by the analysis service on non-2xx responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ApiErrorBody {
    /// Human-readable message carried by `detail`, if any.
    ///
    /// A plain string is used verbatim; a validation list contributes the
    /// `msg` of its first entry.
    pub fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
            Value::Array(items) => items
                .first()
                .and_then(|item| item.get("msg"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn parse(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<ApiErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message())
    }
}

/// A successful exchange whose payload breaks the client/server contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("Missing download_url from API response.")]
    MissingDownloadUrl,
    #[error("Invalid download_url in API response: {0}")]
    InvalidDownloadUrl(String),
    #[error("Malformed API response: {0}")]
    MalformedBody(String),
}
