//! The conversation transcript: an ordered, append-only log of turns.
//!
//! The transcript is persisted after every mutation as a JSON array of
//! [`Turn`] at a fixed file path, so a restarted client resumes the same
//! conversation. Corrupt or missing data loads as an empty transcript; a
//! failed write is logged and never surfaced to the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// File name used for the persisted transcript inside the data directory.
pub const TRANSCRIPT_FILE: &str = "transcript.json";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry in the transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Append-only turn log, optionally backed by a file.
///
/// Individual turns are never edited or removed; the only bulk operation is
/// [`Transcript::clear`].
#[derive(Debug, Default)]
pub struct Transcript {
    turns: Vec<Turn>,
    path: Option<PathBuf>,
}

impl Transcript {
    /// A transcript that lives only for this process. Used in tests and when
    /// persistence is not wanted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the transcript stored at `path`, falling back to an empty
    /// transcript when the file is missing or does not parse.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let turns = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<Turn>>(&bytes) {
                Ok(turns) => turns,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "stored transcript did not parse; starting empty");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            turns,
            path: Some(path),
        }
    }

    /// Appends a turn and persists the new snapshot.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.save();
    }

    /// Removes every turn and persists the empty snapshot.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.save();
    }

    /// Read-only ordered snapshot of the turns.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = write_atomically(path, &self.turns) {
            warn!(path = %path.display(), error = %err, "failed to persist transcript");
        }
    }
}

/// Writes the snapshot to a temp file and renames it into place, so a crash
/// mid-write never leaves a half-written transcript behind.
fn write_atomically(path: &Path, turns: &[Turn]) -> std::io::Result<()> {
    let bytes = serde_json::to_vec_pretty(turns)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes)?;
    match fs::rename(&tmp_path, path) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if path.exists() {
                fs::remove_file(path)?;
                fs::rename(&tmp_path, path)?;
                Ok(())
            } else {
                Err(rename_err)
            }
        }
    }
}
