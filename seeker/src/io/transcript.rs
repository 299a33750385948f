//! Session transcript artifacts under `.seeker/sessions/`.
//!
//! Written once at session end for observability. The loop never reads these
//! back; they are not session state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::history::History;

/// Summary metadata written next to the history log.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMeta {
    pub session_id: String,
    /// Stable outcome label (`accepted`, `no_result`, `exhausted`, ...).
    pub outcome: String,
    pub requests: u32,
    pub units: u64,
    pub duration_ms: Option<u64>,
}

/// Artifact locations for one session.
#[derive(Debug, Clone)]
pub struct TranscriptPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub history_path: PathBuf,
}

impl TranscriptPaths {
    pub fn new(root: &Path, session_id: &str) -> Self {
        let dir = root.join("sessions").join(session_id);
        Self {
            dir: dir.clone(),
            meta_path: dir.join("meta.json"),
            history_path: dir.join("history.json"),
        }
    }
}

/// Write the transcript artifacts for one finished session.
pub fn write_transcript(
    root: &Path,
    history: &History,
    meta: &TranscriptMeta,
) -> Result<TranscriptPaths> {
    let paths = TranscriptPaths::new(root, &meta.session_id);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create transcript dir {}", paths.dir.display()))?;

    // Write in deterministic order to keep artifacts stable.
    write_json(&paths.meta_path, meta)?;
    write_json(&paths.history_path, history)?;
    Ok(paths)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value)?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TurnRecord;

    #[test]
    fn transcript_paths_are_stable() {
        let paths = TranscriptPaths::new(Path::new(".seeker"), "session-1");
        assert!(paths.dir.ends_with(Path::new("sessions/session-1")));
        assert!(paths.meta_path.ends_with("meta.json"));
        assert!(paths.history_path.ends_with("history.json"));
    }

    #[test]
    fn writes_meta_and_history() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut history = History::new();
        history.push(TurnRecord::Prompt {
            text: "find a flight".to_string(),
        });
        let meta = TranscriptMeta {
            session_id: "session-1".to_string(),
            outcome: "no_result".to_string(),
            requests: 2,
            units: 5,
            duration_ms: Some(10),
        };

        let paths = write_transcript(temp.path(), &history, &meta).expect("write");
        let meta_raw = fs::read_to_string(&paths.meta_path).expect("read meta");
        assert!(meta_raw.contains("\"no_result\""));
        let history_raw = fs::read_to_string(&paths.history_path).expect("read history");
        assert!(history_raw.contains("find a flight"));
    }
}
