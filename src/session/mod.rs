// Session control - the verbs behind every muzak invocation
// One session = one looping player process plus one marker file. Separate
// invocations (start in one shell, stop in another, hook start/stop from a
// host program) coordinate through the marker alone.

pub mod marker;

pub use marker::StopMarker;

use crate::audio::{player, MusicScanner, PlayerCommand};
use crate::config::Config;
use crate::error::MuzakError;
use crate::signals::ShutdownSignals;
use crate::ui;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a stop request found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotPlaying,
}

pub struct Muzak {
    config: Config,
    scanner: MusicScanner,
}

impl Muzak {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            scanner: MusicScanner::new(),
        }
    }

    /// Start playback in the background and return immediately, leaving the
    /// marker behind for a later `stop`.
    pub fn start_detached(&self, quiet: bool) -> Result<()> {
        let marker = self.launch()?;
        if !quiet {
            println!("🎵 Now playing: {}", track_name(&marker.track));
            println!("   Stop with 'muzak stop'");
        }
        Ok(())
    }

    /// Start playback and watch the keyboard until the user dismisses the
    /// session. Without a terminal on stdin this degrades to a detached
    /// start.
    pub fn start_interactive(&self, signals: &ShutdownSignals) -> Result<()> {
        let marker = self.launch()?;
        println!("🎵 Now playing: {}", track_name(&marker.track));

        if !ui::stdin_is_tty() {
            println!("   No terminal on stdin; stop with 'muzak stop'");
            return Ok(());
        }

        println!("   Press ESC or q to stop");
        let outcome = ui::wait_for_stop(signals);

        // Whatever ended the wait, the player must not outlive the session.
        self.stop(true)?;
        let reason = outcome?;
        debug!("interactive session ended: {:?}", reason);
        println!("🔇 Music stopped");
        Ok(())
    }

    /// Run a foreground task with music behind it, then stop the music and
    /// hand the task's exit status back.
    ///
    /// Playback failures here are fatal before the task starts: `run` is an
    /// explicit request for music, not a best-effort decoration.
    pub fn run_with_music(&self, command_line: &[String], signals: &ShutdownSignals) -> Result<i32> {
        let marker = self.launch()?;
        println!("🎵 Now playing: {}", track_name(&marker.track));

        let result = self.run_command(command_line, signals);
        self.stop(true)?;
        let code = result?;
        debug!("task finished with exit code {code}");
        Ok(code)
    }

    /// Stop the recorded session, if any. A marker whose process is already
    /// gone (crash, reboot) is cleaned up and reported as not playing.
    pub fn stop(&self, quiet: bool) -> Result<StopOutcome> {
        let Some(marker) = StopMarker::load(&self.config.marker_path)? else {
            if !quiet {
                println!("🔇 No music is playing");
            }
            return Ok(StopOutcome::NotPlaying);
        };

        if !player::process_alive(marker.pid) {
            warn!("session marker is stale (pid {} is gone), clearing it", marker.pid);
            StopMarker::clear(&self.config.marker_path)?;
            if !quiet {
                println!("🔇 No music is playing");
            }
            return Ok(StopOutcome::NotPlaying);
        }

        player::terminate_group(marker.pid);
        StopMarker::clear(&self.config.marker_path)?;
        info!(
            "stopped playback of {} (pid {})",
            marker.track.display(),
            marker.pid
        );
        if !quiet {
            println!("🔇 Music stopped");
        }
        Ok(StopOutcome::Stopped)
    }

    /// Lifecycle hook entry: begin playback and return immediately. On
    /// success a small JSON acknowledgement goes to stdout for the host to
    /// consume; an empty library or a broken player is a real (non-zero)
    /// failure the host gets to see.
    pub fn hook_start(&self) -> Result<()> {
        self.start_detached(true)?;
        println!("{}", serde_json::json!({ "allow": true }));
        Ok(())
    }

    /// Lifecycle hook exit: silent, best-effort stop.
    pub fn hook_stop(&self) -> Result<()> {
        if let Err(e) = self.stop(true) {
            warn!("hook stop failed: {e:#}");
        }
        Ok(())
    }

    /// Pick a track, spawn the looping player and persist the marker.
    /// Back-to-back starts replace the music instead of layering it, but
    /// the recorded session is only stopped once this start is past its own
    /// failure points: a bad library or an unresolvable player must leave
    /// whatever is playing untouched.
    fn launch(&self) -> Result<StopMarker> {
        let files = self.scanner.scan_directory(&self.config.music_dir)?;
        let track = self
            .scanner
            .pick_random(&files)
            .ok_or_else(|| MuzakError::LibraryEmpty {
                dir: self.config.music_dir.clone(),
            })?;
        let player = PlayerCommand::resolve(self.config.player.as_deref())?;

        if self.stop(true)? == StopOutcome::Stopped {
            debug!("replaced a running session");
        }

        let pid = player.spawn_looping(track)?;

        let marker = StopMarker::new(pid, track.clone());
        if let Err(e) = marker.write(&self.config.marker_path) {
            // Without a marker nobody could ever stop this player.
            player::terminate_group(pid);
            return Err(e).context("failed to record the playback session");
        }

        info!(
            "started playback of {} with {} (pid {})",
            track.display(),
            player,
            pid
        );
        Ok(marker)
    }

    /// Run the task through the shell and poll it to completion, forwarding
    /// a shutdown signal once so Ctrl+C or kill lands on the task too.
    fn run_command(&self, command_line: &[String], signals: &ShutdownSignals) -> Result<i32> {
        let joined = command_line.join(" ");
        debug!("running task: {joined}");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&joined)
            .spawn()
            .with_context(|| format!("failed to run '{joined}'"))?;

        let mut forwarded = false;
        loop {
            if let Some(status) = child
                .try_wait()
                .context("failed to check on the running task")?
            {
                return Ok(exit_code(&status));
            }
            if signals.is_raised() && !forwarded {
                forwarded = true;
                forward_term(child.id());
            }
            std::thread::sleep(Duration::from_millis(150));
        }
    }
}

fn track_name(track: &Path) -> String {
    track
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| track.display().to_string())
}

/// The task's own exit code, or the shell convention of 128 + signal when
/// it was killed.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(unix)]
fn forward_term(pid: u32) {
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
fn forward_term(_pid: u32) {}
