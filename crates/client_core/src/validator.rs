//! Selection gate: MIME allow-list and size ceiling.

use crate::{error::ValidationError, state::SelectedFile};

pub const MAX_SIZE_MB: u64 = 250;
pub const MAX_SIZE_BYTES: u64 = MAX_SIZE_MB * 1024 * 1024;

pub const ACCEPTED_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/webp",
    "image/bmp",
    "image/gif",
    "video/mp4",
    "video/quicktime",
    "video/x-matroska",
    "video/webm",
    "video/x-msvideo",
];

pub fn is_accepted_type(mime_type: &str) -> bool {
    ACCEPTED_TYPES.contains(&mime_type)
}

/// Checks a candidate's metadata. Type is checked before size.
pub fn validate(candidate: Option<&SelectedFile>) -> Result<(), ValidationError> {
    let Some(file) = candidate else {
        return Err(ValidationError::NoFileSelected);
    };

    if !is_accepted_type(&file.mime_type) {
        return Err(ValidationError::UnsupportedType {
            mime_type: file.mime_type.clone(),
        });
    }

    if file.size_bytes > MAX_SIZE_BYTES {
        return Err(ValidationError::TooLarge {
            size_bytes: file.size_bytes,
            max_mb: MAX_SIZE_MB,
        });
    }

    Ok(())
}

#[cfg(test)]
#[path = "tests/validator_tests.rs"]
mod tests;
