//! Per-check outcome history.
//!
//! Every committed probe outcome is appended as one JSON line to
//! `<dir>/<id>.log`. Rotation moves live logs aside so they never grow
//! without bound; each archive is the gzip of the log, stored as base64
//! text.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use checks::{Check, CheckId, now_millis};
use common::{Error, Result};
use flate2::{Compression, write::GzEncoder};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const LOG_EXT: &str = "log";
const ARCHIVE_EXT: &str = "gz.b64";
const PENDING_EXT: &str = "log.pending";

/// Receives committed outcomes for durable per-check history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Journal: Send + Sync {
    /// Append one committed record.
    async fn append(&self, id: &CheckId, check: &Check) -> Result<()>;
}

/// Journal writing JSON lines under a directory
pub struct FileJournal {
    dir: PathBuf,
}

impl FileJournal {
    /// Create a journal writing to `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the journal directory if needed.
    pub async fn setup_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        info!(dir = %self.dir.display(), "Journal directory has been set up");
        Ok(())
    }

    fn log_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, LOG_EXT))
    }

    /// Names (without extension) of all live logs.
    pub async fn log_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == LOG_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Compress every non-empty live log to `<name>_<millis>.gz.b64`.
    ///
    /// The live log is moved aside before it is read, so outcomes appended
    /// meanwhile start a fresh log. Returns the number of logs archived. A
    /// log that fails to archive is reported and skipped.
    pub async fn rotate(&self) -> Result<usize> {
        let stamp = now_millis();
        let mut rotated = 0;

        for name in self.log_names().await? {
            match self.archive(&name, stamp).await {
                Ok(true) => rotated += 1,
                Ok(false) => {}
                Err(e) => warn!(log = %name, error = %e, "Unable to rotate log"),
            }
        }

        info!(rotated, "Journal rotation finished");
        Ok(rotated)
    }

    async fn archive(&self, name: &str, stamp: i64) -> Result<bool> {
        let live = self.log_path(name);
        if fs::metadata(&live).await?.len() == 0 {
            return Ok(false);
        }

        let pending = self.dir.join(format!("{}_{}.{}", name, stamp, PENDING_EXT));
        fs::rename(&live, &pending).await?;

        let contents = fs::read(&pending).await?;
        let encoded = tokio::task::spawn_blocking(move || encode_archive(&contents))
            .await
            .map_err(|e| Error::other(format!("Compression task failed: {}", e)))??;

        let archived = self.dir.join(format!("{}_{}.{}", name, stamp, ARCHIVE_EXT));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&archived)
            .await?;
        file.write_all(encoded.as_bytes()).await?;
        file.flush().await?;
        fs::remove_file(&pending).await?;

        debug!(log = %live.display(), archive = %archived.display(), "Log rotated");
        Ok(true)
    }
}

/// Gzip `contents` and encode the result as base64 text.
fn encode_archive(contents: &[u8]) -> std::io::Result<String> {
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(contents)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

#[async_trait]
impl Journal for FileJournal {
    async fn append(&self, id: &CheckId, check: &Check) -> Result<()> {
        let mut line = serde_json::to_vec(check)?;
        line.push(b'\n');

        let path = self.log_path(id.as_str());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::other(format!("Unable to open '{}': {}", path.display(), e)))?;
        file.write_all(&line)
            .await
            .map_err(|e| Error::other(format!("Unable to append to '{}': {}", path.display(), e)))?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checks::CheckMethod;

    fn decode_archive(path: &Path) -> String {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let text = std::fs::read_to_string(path).unwrap();
        let compressed = STANDARD.decode(text.trim()).unwrap();
        let mut restored = String::new();
        GzDecoder::new(&compressed[..])
            .read_to_string(&mut restored)
            .unwrap();
        restored
    }

    fn outcome(status: u16) -> Check {
        let mut check = Check::new("http://example.com", CheckMethod::Get, None);
        check.req_time = Some(100);
        check.res_time = Some(150);
        check.status_code = Some(status);
        check
    }

    #[tokio::test]
    async fn test_append_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FileJournal::new(dir.path());
        let id = CheckId::generate();

        journal.append(&id, &outcome(200)).await.unwrap();
        journal.append(&id, &outcome(503)).await.unwrap();

        let contents = std::fs::read_to_string(dir.path().join(format!("{}.log", id))).unwrap();
        let lines: Vec<Check> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![outcome(200), outcome(503)]);
    }

    #[tokio::test]
    async fn test_append_to_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FileJournal::new(dir.path().join("absent"));
        assert!(journal.append(&CheckId::generate(), &outcome(200)).await.is_err());
    }

    #[tokio::test]
    async fn test_rotate_archives_non_empty_logs() {
        let dir = tempfile::tempdir().unwrap();
        let journal = FileJournal::new(dir.path());
        let busy = CheckId::generate();
        let idle = CheckId::generate();

        journal.append(&busy, &outcome(200)).await.unwrap();
        journal.append(&busy, &outcome(503)).await.unwrap();
        std::fs::write(dir.path().join(format!("{}.log", idle)), "").unwrap();

        let mut expected = vec![busy.to_string(), idle.to_string()];
        expected.sort();
        assert_eq!(journal.log_names().await.unwrap(), expected);

        assert_eq!(journal.rotate().await.unwrap(), 1);
        assert_eq!(journal.log_names().await.unwrap(), vec![idle.to_string()]);

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert!(!files.iter().any(|name| name.ends_with(".pending")));
        let archived: Vec<_> = files.iter().filter(|name| name.ends_with(".gz.b64")).collect();
        assert_eq!(archived.len(), 1);
        assert!(archived[0].starts_with(&format!("{}_", busy)));

        let restored = decode_archive(&dir.path().join(archived[0]));
        let lines: Vec<Check> = restored
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines, vec![outcome(200), outcome(503)]);

        // The next outcome starts a fresh log.
        journal.append(&busy, &outcome(201)).await.unwrap();
        assert_eq!(journal.log_names().await.unwrap().len(), 2);
    }
}
