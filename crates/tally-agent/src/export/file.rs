//! File sink: a temp file next to `<path>` is written and synced, then
//! renamed over `<path>`.
//!
//! Readers of `<path>` see either the previous snapshot or the new one. Each
//! write uses its own temp name, so two writers never share a half-written file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tally_core::error::{Result, TallyError};
use tally_core::Snapshot;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::SnapshotSink;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/<app_name>_metrics.json`
    pub fn for_app(dir: impl AsRef<Path>, app_name: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{app_name}_metrics.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> Result<PathBuf> {
        let name = self.path.file_name().ok_or_else(|| {
            TallyError::ExportFailure(format!("snapshot path has no file name: {}", self.path.display()))
        })?;
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut tmp = OsString::from(name);
        tmp.push(format!(".{}.{seq}.tmp", std::process::id()));
        Ok(self.path.with_file_name(tmp))
    }
}

fn io_err(what: &str, path: &Path, e: std::io::Error) -> TallyError {
    TallyError::ExportFailure(format!("{what} {} failed: {e}", path.display()))
}

async fn replace_with(tmp: &Path, path: &Path, body: &[u8]) -> Result<()> {
    let mut file = fs::File::create(tmp)
        .await
        .map_err(|e| io_err("create", tmp, e))?;
    file.write_all(body)
        .await
        .map_err(|e| io_err("write", tmp, e))?;
    file.sync_all()
        .await
        .map_err(|e| io_err("sync", tmp, e))?;
    drop(file);

    fs::rename(tmp, path)
        .await
        .map_err(|e| io_err("rename", tmp, e))
}

#[async_trait]
impl SnapshotSink for FileSink {
    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let body = snapshot.to_json_pretty()?;
        let tmp = self.tmp_path()?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| io_err("create dir", dir, e))?;
        }

        if let Err(e) = replace_with(&tmp, &self.path, &body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
