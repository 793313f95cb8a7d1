//! Atomic file writes
//!
//! State and cache documents are replaced with write-to-temp-then-rename so
//! a crash mid-write leaves the previous document intact.

use crate::error::{PhpsmithError, PhpsmithResult};
use std::path::Path;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Write content atomically to a file.
pub async fn write_atomic(path: &Path, content: &[u8]) -> PhpsmithResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| PhpsmithError::io(format!("creating {}", parent.display()), e))?;
    }

    // Same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(&temp_name);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .await
        .map_err(|e| PhpsmithError::io(format!("opening {}", temp_path.display()), e))?;

    file.write_all(content)
        .await
        .map_err(|e| PhpsmithError::io(format!("writing {}", temp_path.display()), e))?;
    file.sync_all()
        .await
        .map_err(|e| PhpsmithError::io(format!("syncing {}", temp_path.display()), e))?;
    drop(file);

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(PhpsmithError::io(format!("replacing {}", path.display()), e));
    }

    Ok(())
}

/// Serialize a value as pretty JSON and write it atomically
pub async fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> PhpsmithResult<()> {
    let content = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &content).await
}
