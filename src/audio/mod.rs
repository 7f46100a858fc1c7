pub mod player;
pub mod scanner;

pub use player::PlayerCommand;
pub use scanner::MusicScanner;

/// File extensions eligible for random selection, matched case-insensitively.
/// No metadata beyond the path is read - if it has the right extension, it's
/// a muzak file.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "aac", "flac", "ogg"];
