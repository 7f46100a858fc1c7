// Error taxonomy for muzak sessions.
// A stale Stop Marker (recorded player already gone) is deliberately not an
// error - stop treats it as "nothing to stop" and only logs it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MuzakError {
    /// The library directory is missing or holds no supported audio files.
    #[error("no audio files found in {}", dir.display())]
    LibraryEmpty { dir: PathBuf },

    /// No known playback command exists on this system.
    #[error("no audio player available on this system (tried: {tried})")]
    UnsupportedPlatform { tried: String },

    /// A playback command was resolved but refused to spawn.
    #[error("failed to launch audio player '{player}'")]
    PlaybackLaunch {
        player: String,
        #[source]
        source: io::Error,
    },

    /// Filesystem trouble while listing the library, as opposed to the
    /// library simply being empty.
    #[error("could not read library directory {}", dir.display())]
    Scan {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}
