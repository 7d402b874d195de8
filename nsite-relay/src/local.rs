//! Directory-backed event log
//!
//! Events are stored one JSON object per line in `<dir>/events.jsonl`.
//! Appends are serialized through an in-process lock; the file is only ever
//! appended to, so earlier records are never rewritten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::event::Event;
use crate::network::{snapshot, EventNetwork, Filter};

const LOG_FILE: &str = "events.jsonl";

pub struct LocalEventLog {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl LocalEventLog {
    /// Open (creating if needed) the log stored under `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        let path = dir.join(LOG_FILE);
        info!("Event log at {}", path.display());

        Ok(Self {
            path,
            append_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<Event>> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut events = Vec::new();
        for (number, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => events.push(event),
                // a torn final line from an interrupted append is not fatal
                Err(e) => warn!("Skipping unreadable line {} of event log: {}", number + 1, e),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl EventNetwork for LocalEventLog {
    async fn fetch(&self, filter: &Filter) -> Result<Vec<Event>> {
        let events = self.read_all().await?;
        let matched = snapshot(&events, filter);
        debug!("Fetched {} of {} stored events", matched.len(), events.len());
        Ok(matched)
    }

    async fn publish(&self, event: Event) -> Result<String> {
        event.verify()?;

        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended event {} (kind {})", event.id, event.kind);
        Ok(event.id)
    }
}
