// External playback process management
// muzak never decodes audio itself - it hands the file to whatever player
// the OS provides and keeps a handle on the resulting process group.

use crate::error::MuzakError;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Playback commands tried in order on this platform. First word is the
/// binary looked up on PATH, the rest are its arguments; the track path is
/// appended at spawn time.
#[cfg(target_os = "macos")]
const PLAYER_CANDIDATES: &[&str] = &["afplay"];

#[cfg(all(unix, not(target_os = "macos")))]
const PLAYER_CANDIDATES: &[&str] = &[
    "mpv --no-video --really-quiet",
    "ffplay -nodisp -autoexit -loglevel quiet",
    "paplay",
    "aplay -q",
];

#[cfg(not(unix))]
const PLAYER_CANDIDATES: &[&str] = &[];

/// An external audio-playback invocation: a program plus its fixed
/// arguments, without the track path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    program: String,
    args: Vec<String>,
}

impl PlayerCommand {
    /// Split a command line like "mpv --no-video" on whitespace. Returns
    /// `None` for a blank string.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?.to_string();
        Some(Self {
            program,
            args: parts.map(String::from).collect(),
        })
    }

    /// Resolve the playback command: an explicit config override wins, a
    /// blank or missing override falls back to platform auto-detection.
    ///
    /// The override gets the same PATH lookup as the detection candidates.
    /// Handing `sh` a missing binary would spawn fine and die on its first
    /// loop iteration, turning a config typo into a silently dead session.
    pub fn resolve(configured: Option<&str>) -> Result<Self, MuzakError> {
        if let Some(player) = configured.and_then(Self::parse) {
            if find_in_path(&player.program).is_none() {
                return Err(MuzakError::UnsupportedPlatform {
                    tried: player.program,
                });
            }
            debug!("using configured player: {}", player);
            return Ok(player);
        }
        Self::detect()
    }

    /// Pick the first candidate player whose binary exists on PATH.
    pub fn detect() -> Result<Self, MuzakError> {
        for candidate in PLAYER_CANDIDATES.iter().copied().filter_map(Self::parse) {
            if find_in_path(&candidate.program).is_some() {
                debug!("detected player: {}", candidate);
                return Ok(candidate);
            }
        }

        let tried = PLAYER_CANDIDATES
            .iter()
            .filter_map(|candidate| candidate.split_whitespace().next())
            .collect::<Vec<_>>()
            .join(", ");
        Err(MuzakError::UnsupportedPlatform {
            tried: if tried.is_empty() {
                "none for this platform".to_string()
            } else {
                tried
            },
        })
    }

    /// Launch the player against `track` as a detached background process,
    /// looping the track for the whole session (a background session that
    /// goes quiet after one three-minute track defeats the purpose).
    ///
    /// The loop lives in a small `sh` wrapper; `"$@"` keeps the track path
    /// out of shell-quoting trouble, and `|| exit` stops the loop if the
    /// player itself fails so a broken command cannot spin.
    ///
    /// The child gets its own process group, so the returned pid doubles as
    /// the group id: stopping kills the shell loop and the current player
    /// child together, and terminal signals aimed at the tool never reach
    /// the player.
    pub fn spawn_looping(&self, track: &Path) -> Result<u32, MuzakError> {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(r#"while :; do "$@" || exit; done"#)
            .arg("muzak-player")
            .arg(&self.program)
            .args(&self.args)
            .arg(track)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|e| MuzakError::PlaybackLaunch {
            player: self.to_string(),
            source: e,
        })?;

        debug!("spawned looping player (pid {}): {} {:?}", child.id(), self, track);
        Ok(child.id())
    }
}

impl fmt::Display for PlayerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Locate an executable on PATH, the same lookup the shell would do. A
/// program containing a path separator is taken as an explicit path and
/// only checked for being executable.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let candidate = PathBuf::from(program);
        return is_executable(&candidate).then_some(candidate);
    }

    let path_var = env::var_os("PATH")?;
    for dir in env::split_paths(&path_var) {
        let candidate = dir.join(program);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Check whether a recorded player process is alive without disturbing
/// it (signal 0).
#[cfg(unix)]
pub fn process_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
pub fn process_alive(_pid: u32) -> bool {
    false
}

/// SIGTERM the whole player process group. Returns whether anything was
/// there to receive it - a group that already exited is not an error.
#[cfg(unix)]
pub fn terminate_group(pid: u32) -> bool {
    unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGTERM) == 0 }
}

#[cfg(not(unix))]
pub fn terminate_group(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_program_and_args() {
        let player = PlayerCommand::parse("mpv --no-video --really-quiet").unwrap();
        assert_eq!(player.program, "mpv");
        assert_eq!(player.args, vec!["--no-video", "--really-quiet"]);
        assert_eq!(player.to_string(), "mpv --no-video --really-quiet");

        assert!(PlayerCommand::parse("").is_none());
        assert!(PlayerCommand::parse("   ").is_none());
    }

    #[test]
    fn path_lookup_finds_real_binaries_only() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("muzak-test-no-such-binary").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn path_lookup_accepts_an_explicit_executable_path() {
        let sh = find_in_path("sh").unwrap();
        let explicit = sh.to_str().unwrap();

        assert_eq!(find_in_path(explicit), Some(sh.clone()));
        assert!(find_in_path("/no/such/dir/muzak-player").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn resolve_rejects_an_override_missing_from_path() {
        let err = PlayerCommand::resolve(Some("muzak-no-such-player-xyz --flag")).unwrap_err();
        assert!(matches!(err, MuzakError::UnsupportedPlatform { .. }));

        let player = PlayerCommand::resolve(Some("tail -f")).unwrap();
        assert_eq!(player.to_string(), "tail -f");
    }

    #[cfg(unix)]
    #[test]
    fn looping_player_runs_detached_until_its_group_is_terminated() {
        // `tail -f` stands in for a player: accepts a file argument and
        // blocks forever, like a track that never ends.
        let player = PlayerCommand::parse("tail -f").unwrap();
        let pid = player.spawn_looping(Path::new("/dev/null")).unwrap();

        // Give the shell a beat to come up before aiming at its group.
        std::thread::sleep(std::time::Duration::from_millis(30));
        assert!(process_alive(pid));
        assert!(terminate_group(pid));

        // Reap the shell (it is this test process's child); in real use the
        // starting invocation has long exited and init does this.
        let mut status = 0;
        let reaped = unsafe { libc::waitpid(pid as libc::pid_t, &mut status, 0) };
        assert_eq!(reaped, pid as libc::pid_t);
        assert!(!process_alive(pid));
    }

    #[cfg(unix)]
    #[test]
    fn failing_player_does_not_spin_forever() {
        // `false` rejects the track immediately; the loop must bail rather
        // than hammer it.
        let player = PlayerCommand::parse("false").unwrap();
        let pid = player.spawn_looping(Path::new("/dev/null")).unwrap();

        let mut status = 0;
        let reaped = unsafe { libc::waitpid(pid as libc::pid_t, &mut status, 0) };
        assert_eq!(reaped, pid as libc::pid_t);
        assert!(!process_alive(pid));
    }
}
