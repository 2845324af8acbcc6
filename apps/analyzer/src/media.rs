//! Reading a selection from disk and naming the exported result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use client_core::{validator, SelectedFile};
use shared::domain::MediaKind;

pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Builds the selection for `path`. Bytes are only read once the metadata
/// passes validation, so a rejected file is never loaded into memory.
pub async fn load_selected_file(path: &Path, mime_override: Option<&str>) -> Result<SelectedFile> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to stat '{}'", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("'{}' is not a regular file", path.display());
    }

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = mime_override
        .map(str::to_string)
        .unwrap_or_else(|| guess_mime_type(path));

    let mut file = SelectedFile {
        name,
        mime_type,
        size_bytes: metadata.len(),
        data: Default::default(),
    };
    if validator::validate(Some(&file)).is_err() {
        return Ok(file);
    }

    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    file.size_bytes = data.len() as u64;
    file.data = data.into();
    Ok(file)
}

pub fn default_output_path(kind: MediaKind) -> PathBuf {
    PathBuf::from(format!("deepfake_output.{}", kind.file_extension()))
}
