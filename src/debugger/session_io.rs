//! Debugger session export/import and on-disk persistence (spec §4.I,
//! §6 persisted state): `{version, timestamp, breakpoints[], pauseOnExceptions, metadata?}`
//! written to `./debugger-sessions/session-<epochMillis>.json`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Breakpoint, PauseOnExceptions};
use crate::error::{Result, ServerError};

pub const SESSIONS_DIR: &str = "./debugger-sessions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub breakpoints: Vec<Breakpoint>,
    pub pause_on_exceptions: PauseOnExceptions,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedSessionInfo {
    pub path: String,
    pub file_name: String,
    pub modified: chrono::DateTime<chrono::Utc>,
}

/// Writes `snapshot` to `path`, or `./debugger-sessions/session-<epochMillis>.json`
/// when `path` is `None`.
pub async fn save_session(snapshot: &SessionSnapshot, path: Option<&str>) -> Result<String> {
    let target = match path {
        Some(p) => PathBuf::from(p),
        None => {
            tokio::fs::create_dir_all(SESSIONS_DIR).await?;
            let epoch_millis = snapshot.timestamp.timestamp_millis();
            Path::new(SESSIONS_DIR).join(format!("session-{epoch_millis}.json"))
        }
    };

    let json = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(&target, json).await?;
    Ok(target.to_string_lossy().into_owned())
}

pub async fn load_session_from_file(path: &str) -> Result<SessionSnapshot> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        ServerError::NotFound(format!("session file `{path}` could not be read: {e}"))
    })?;
    let snapshot: SessionSnapshot = serde_json::from_str(&contents)?;
    Ok(snapshot)
}

/// Scans `./debugger-sessions` for `session-*.json` files, sorted
/// newest-first by modification time.
pub async fn list_saved_sessions() -> Result<Vec<SavedSessionInfo>> {
    let dir = Path::new(SESSIONS_DIR);
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut infos = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !(file_name.starts_with("session-") && file_name.ends_with(".json")) {
            continue;
        }
        let metadata = entry.metadata().await?;
        let modified: chrono::DateTime<chrono::Utc> = metadata.modified()?.into();
        infos.push(SavedSessionInfo {
            path: path.to_string_lossy().into_owned(),
            file_name: file_name.to_string(),
            modified,
        });
    }

    infos.sort_by(|a, b| b.modified.cmp(&a.modified));
    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let snapshot = SessionSnapshot {
            version: "1.0".to_string(),
            timestamp: chrono::Utc::now(),
            breakpoints: vec![],
            pause_on_exceptions: PauseOnExceptions::Uncaught,
            metadata: None,
        };

        let saved_path = save_session(&snapshot, Some(path.to_str().unwrap())).await.unwrap();
        let loaded = load_session_from_file(&saved_path).await.unwrap();
        assert_eq!(loaded.version, "1.0");
        assert_eq!(loaded.pause_on_exceptions, PauseOnExceptions::Uncaught);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = load_session_from_file("/nonexistent/path/session.json").await.unwrap_err();
        assert_eq!(err.category(), "not_found");
    }
}
