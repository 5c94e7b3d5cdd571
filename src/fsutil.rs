//! Filesystem helpers — directory creation and atomic writes.

use crate::error::{Error, Result};
use std::path::Path;

/// Create a directory and its parents if absent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .map_err(|e| Error::io(format!("cannot create dir {}", path.display()), e))
}

/// Write `contents` atomically (write to temp, then rename).
///
/// A failed write leaves any previous file at `path` untouched.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = std::fs::write(&tmp_path, contents) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(Error::io(format!("cannot write {}", tmp_path.display()), e));
    }
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        Error::io(
            format!(
                "cannot rename {} → {}",
                tmp_path.display(),
                path.display()
            ),
            e,
        )
    })
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}
