// Persisted session record
// The marker file is the only channel between muzak invocations: whoever
// starts playback writes it, whoever stops playback reads and removes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One running playback session: the player's process-group id, when it
/// began, and which track it is looping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopMarker {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub track: PathBuf,
}

impl StopMarker {
    pub fn new(pid: u32, track: PathBuf) -> Self {
        Self {
            pid,
            started_at: Utc::now(),
            track,
        }
    }

    /// Write the marker atomically: serialize to a temp sibling, then rename
    /// over the target, so a concurrent `stop` never reads a half-written
    /// record.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)
    }

    /// Read the marker if one exists. A file that fails to parse is treated
    /// as absent and removed, so one bad write cannot wedge future sessions.
    /// The same goes for a pid no player could have: the default marker
    /// location is world-writable, and pid 0 aimed at `kill` would address
    /// this process's own group.
    pub fn load(path: &Path) -> io::Result<Option<StopMarker>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        match serde_json::from_str::<StopMarker>(&contents) {
            Ok(marker) if marker.pid > 1 => Ok(Some(marker)),
            Ok(marker) => {
                warn!(
                    "discarding session marker with implausible pid {} at {}",
                    marker.pid,
                    path.display()
                );
                Self::clear(path)?;
                Ok(None)
            }
            Err(e) => {
                warn!(
                    "discarding unreadable session marker at {}: {e}",
                    path.display()
                );
                Self::clear(path)?;
                Ok(None)
            }
        }
    }

    /// Remove the marker. Already-absent is fine; `stop` may race another
    /// invocation cleaning up the same session.
    pub fn clear(path: &Path) -> io::Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
