// Muzak Library - Core modules for background music sessions
// Modular design makes it easy to swap out components

pub mod audio;   // track scanning and the external player process
pub mod config;  // settings and file locations
pub mod error;   // what can go wrong, with paths attached
pub mod session; // start/stop/run/hook orchestration
pub mod signals; // process shutdown flags
pub mod ui;      // keyboard watcher for interactive sessions

// Export the stuff other modules actually use
pub use audio::{MusicScanner, PlayerCommand};
pub use config::Config;
pub use error::MuzakError;
pub use session::{Muzak, StopMarker, StopOutcome};
pub use signals::ShutdownSignals;
