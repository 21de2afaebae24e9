//! Snapshot file output.
//!
//! The snapshot is serialized as pretty-printed UTF-8 JSON into a sibling
//! temp file which is then renamed over the target, so an interrupted run
//! never leaves a truncated snapshot behind.

use std::path::{Path, PathBuf};

use crate::{Error, Snapshot};

/// Write `snapshot` to `path`, creating parent directories as needed.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');

    let tmp = temp_path(path);
    if let Err(e) = std::fs::write(&tmp, json.as_bytes()).and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }

    tracing::debug!(path = %path.display(), bytes = json.len(), "snapshot written");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
