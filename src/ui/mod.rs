// Terminal input watcher - the face of an interactive muzak session
// No alternate screen and no drawing: the terminal stays as-is, we only
// borrow raw mode so single keypresses arrive without Enter.

use crate::signals::ShutdownSignals;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::tty::IsTty;
use std::io;
use std::time::Duration;

/// Why an interactive session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Escape,
    Quit,
    CtrlC,
    /// SIGINT/SIGTERM/SIGHUP rather than a keypress.
    Interrupted,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Restore the terminal even on early return or panic.
        let _ = disable_raw_mode();
    }
}

/// Whether stdin is a terminal at all. Under a pipe or a CI runner there is
/// no keyboard to watch.
pub fn stdin_is_tty() -> bool {
    io::stdin().is_tty()
}

/// Map a key event to a stop request, if it is one. Only key presses count;
/// kitty-style release events must not double-fire.
pub fn stop_reason_for(key: &KeyEvent) -> Option<StopReason> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Esc => Some(StopReason::Escape),
        KeyCode::Char(c) if c.eq_ignore_ascii_case(&'c') && key.modifiers.contains(KeyModifiers::CONTROL) => {
            // In raw mode Ctrl+C arrives here as a key, not as SIGINT.
            Some(StopReason::CtrlC)
        }
        KeyCode::Char(c) if c.eq_ignore_ascii_case(&'q') => Some(StopReason::Quit),
        _ => None,
    }
}

/// Block until the user asks to stop (ESC, q or Ctrl+C) or a shutdown
/// signal arrives. Raw mode is held only for the duration of the wait.
pub fn wait_for_stop(signals: &ShutdownSignals) -> Result<StopReason> {
    let _raw = RawModeGuard::new()?;

    loop {
        if signals.is_raised() {
            return Ok(StopReason::Interrupted);
        }

        // Short poll timeout keeps signal checks responsive without
        // spinning the CPU.
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if let Some(reason) = stop_reason_for(&key) {
                    return Ok(reason);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn stop_keys_are_recognized() {
        assert_eq!(
            stop_reason_for(&press(KeyCode::Esc, KeyModifiers::NONE)),
            Some(StopReason::Escape)
        );
        assert_eq!(
            stop_reason_for(&press(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(StopReason::Quit)
        );
        assert_eq!(
            stop_reason_for(&press(KeyCode::Char('Q'), KeyModifiers::SHIFT)),
            Some(StopReason::Quit)
        );
        assert_eq!(
            stop_reason_for(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(StopReason::CtrlC)
        );
    }

    #[test]
    fn other_keys_keep_the_session_running() {
        assert_eq!(stop_reason_for(&press(KeyCode::Char('x'), KeyModifiers::NONE)), None);
        assert_eq!(stop_reason_for(&press(KeyCode::Char('c'), KeyModifiers::NONE)), None);
        assert_eq!(stop_reason_for(&press(KeyCode::Enter, KeyModifiers::NONE)), None);
    }

    #[test]
    fn key_releases_are_ignored() {
        let release = KeyEvent::new_with_kind(
            KeyCode::Char('q'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(stop_reason_for(&release), None);
    }
}
