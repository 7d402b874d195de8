use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, trace, warn};

use crate::errors::{IndexError, Result};
use crate::hash::{ContentHash, ContentHasher};
use crate::manifest::{FileRecord, Manifest};

/// Configuration for the tree scanner
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Whether to follow symbolic links to files and directories
    pub follow_symlinks: bool,
    /// Read buffer size used while hashing
    pub buffer_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: true,
            buffer_size: 64 * 1024,
        }
    }
}

/// Builds a `Manifest` of every regular file below a root directory.
///
/// Any unreadable file or directory aborts the scan: a partial view of the
/// local tree would make the diff schedule deletions for files that exist.
pub struct TreeScanner {
    root: PathBuf,
    config: ScannerConfig,
}

impl TreeScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self::with_config(root, ScannerConfig::default())
    }

    pub fn with_config(root: impl AsRef<Path>, config: ScannerConfig) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and hash every file.
    ///
    /// A missing root yields an empty manifest.
    pub async fn scan(&self) -> Result<Manifest> {
        info!("Scanning local tree: {}", self.root.display());

        match fs::metadata(&self.root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(IndexError::scan(
                    &self.root,
                    std::io::Error::new(std::io::ErrorKind::Other, "not a directory"),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Root {} does not exist, empty manifest", self.root.display());
                return Ok(Manifest::new());
            }
            Err(e) => return Err(IndexError::scan(&self.root, e)),
        }

        let mut manifest = Manifest::new();
        let mut visited = HashSet::new();
        visited.insert(
            fs::canonicalize(&self.root)
                .await
                .map_err(|e| IndexError::scan(&self.root, e))?,
        );
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = fs::read_dir(&dir)
                .await
                .map_err(|e| IndexError::scan(&dir, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| IndexError::scan(&dir, e))?
            {
                let path = entry.path();
                let Some(meta) = self.entry_metadata(&path).await? else {
                    continue;
                };

                if meta.is_dir() {
                    let canonical = fs::canonicalize(&path)
                        .await
                        .map_err(|e| IndexError::scan(&path, e))?;
                    if !visited.insert(canonical) {
                        warn!(
                            "Skipping {}: directory already scanned (symlink loop)",
                            path.display()
                        );
                        continue;
                    }
                    pending.push(path);
                } else if meta.is_file() {
                    let record = self.scan_file(&path, &meta).await?;
                    trace!("Scanned {} -> {}", record.path, record.content_hash);
                    manifest.insert(record);
                }
            }
        }

        info!(
            "Scan complete: {} files in {}",
            manifest.len(),
            self.root.display()
        );
        Ok(manifest)
    }

    /// Metadata for a directory entry, or `None` when it should be skipped
    async fn entry_metadata(&self, path: &Path) -> Result<Option<std::fs::Metadata>> {
        let link_meta = fs::symlink_metadata(path)
            .await
            .map_err(|e| IndexError::scan(path, e))?;

        if !link_meta.file_type().is_symlink() {
            return Ok(Some(link_meta));
        }
        if !self.config.follow_symlinks {
            trace!("Skipping symlink {}", path.display());
            return Ok(None);
        }

        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Skipping dangling symlink {}", path.display());
                Ok(None)
            }
            Err(e) => Err(IndexError::scan(path, e)),
        }
    }

    async fn scan_file(&self, path: &Path, meta: &std::fs::Metadata) -> Result<FileRecord> {
        let relative = self.relative_path(path)?;
        let content_hash = self.hash_file(path).await?;

        let mut record = FileRecord::new(relative, content_hash).with_local_path(path);
        record.changed_at = changed_at(meta);
        Ok(record)
    }

    async fn hash_file(&self, path: &Path) -> Result<ContentHash> {
        let mut file = fs::File::open(path)
            .await
            .map_err(|e| IndexError::scan(path, e))?;
        let mut hasher = ContentHasher::new();
        let mut buffer = vec![0u8; self.config.buffer_size.max(1)];

        loop {
            let read = file
                .read(&mut buffer)
                .await
                .map_err(|e| IndexError::scan(path, e))?;
            if read == 0 {
                break;
            }
            hasher.update(&buffer[..read]);
        }

        Ok(hasher.finalize())
    }

    fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| IndexError::InvalidPath(path.display().to_string()))?;

        let mut segments = Vec::new();
        for component in relative.components() {
            let segment = component
                .as_os_str()
                .to_str()
                .ok_or_else(|| IndexError::InvalidPath(path.display().to_string()))?;
            segments.push(segment);
        }
        Ok(segments.join("/"))
    }
}

/// Modification time in whole seconds, falling back to creation time
fn changed_at(meta: &std::fs::Metadata) -> Option<i64> {
    let time = meta.modified().or_else(|_| meta.created()).ok()?;
    unix_seconds(time)
}

fn unix_seconds(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok())
}
