//! Remembers that the research-output disclaimer was accepted.
//!
//! Acceptance only controls whether the disclaimer is printed again; it
//! never blocks an analysis.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

const APP_DIR: &str = "media_analyzer";
const CONSENT_FILE: &str = "disclaimer_accepted";

pub const DISCLAIMER: &str = "\
Important disclaimer
  Results produced by this system are research outputs only. They are not definitive.
  - Do not use the prediction as legal evidence or as the sole basis for decisions
    with legal, financial, or life-impacting consequences.
  - The heatmap or annotated media highlights regions the model found suspicious;
    it does not prove manipulation.
  - False positives and false negatives are possible. Confirm findings with
    independent technical or legal experts before acting on them.
  Re-run with --accept-disclaimer to stop showing this notice.";

pub fn consent_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR).join(CONSENT_FILE))
}

pub fn is_accepted(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|raw| raw.trim() == "true")
        .unwrap_or(false)
}

pub fn record_acceptance(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create consent directory '{}'", parent.display())
        })?;
    }
    fs::write(path, "true")
        .with_context(|| format!("failed to write consent flag '{}'", path.display()))
}

/// Prints the disclaimer unless it was accepted before, and records
/// acceptance when `accept` is set.
pub fn show_disclaimer_if_needed(path: Option<&Path>, accept: bool) {
    let Some(path) = path else {
        if !accept {
            eprintln!("{DISCLAIMER}");
        }
        return;
    };

    if is_accepted(path) {
        return;
    }

    if accept {
        if let Err(err) = record_acceptance(path) {
            tracing::warn!("could not persist disclaimer acceptance: {err:#}");
        }
    } else {
        eprintln!("{DISCLAIMER}");
    }
}
