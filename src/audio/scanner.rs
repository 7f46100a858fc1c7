use super::SUPPORTED_EXTENSIONS;
use crate::error::MuzakError;
use rand::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Clone)]
pub struct MusicScanner {
    supported_extensions: Vec<String>,
}

impl MusicScanner {
    pub fn new() -> Self {
        Self {
            supported_extensions: SUPPORTED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// List the eligible audio files directly inside `dir`. Non-recursive:
    /// a session picks from the library's top level only.
    ///
    /// A missing directory and a directory with no matching files both
    /// report `LibraryEmpty`; actual filesystem failures while reading the
    /// directory surface as `Scan` instead.
    pub fn scan_directory<P: AsRef<Path>>(&self, dir: P) -> Result<Vec<PathBuf>, MuzakError> {
        let dir = dir.as_ref();

        match fs::metadata(dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                // A plain file where the library should be - nothing to play.
                return Err(MuzakError::LibraryEmpty {
                    dir: dir.to_path_buf(),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MuzakError::LibraryEmpty {
                    dir: dir.to_path_buf(),
                });
            }
            Err(e) => {
                return Err(MuzakError::Scan {
                    dir: dir.to_path_buf(),
                    source: e,
                });
            }
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(dir).max_depth(1).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                // Depth 0 means the directory itself could not be read.
                Err(e) if e.depth() == 0 => {
                    return Err(MuzakError::Scan {
                        dir: dir.to_path_buf(),
                        source: e.into(),
                    });
                }
                // One unreadable entry (dangling symlink, permission hole)
                // must not make the whole library unplayable.
                Err(e) => {
                    debug!("skipping unreadable library entry: {e}");
                    continue;
                }
            };
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            // Skip hidden files (dotfiles)
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
            {
                continue;
            }

            if self.is_supported_file(path) {
                files.push(path.to_path_buf());
            }
        }

        if files.is_empty() {
            return Err(MuzakError::LibraryEmpty {
                dir: dir.to_path_buf(),
            });
        }

        Ok(files)
    }

    /// Pick one track uniformly at random. Every `start` re-scans and
    /// re-selects, so back-to-back sessions may repeat a track.
    pub fn pick_random<'a>(&self, files: &'a [PathBuf]) -> Option<&'a PathBuf> {
        files.choose(&mut thread_rng())
    }

    fn is_supported_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let normalized = ext.to_ascii_lowercase();
                self.supported_extensions.contains(&normalized)
            })
            .unwrap_or(false)
    }
}

impl Default for MusicScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"not really audio").unwrap();
        path
    }

    #[test]
    fn missing_directory_is_an_empty_library() {
        let scanner = MusicScanner::new();
        let result = scanner.scan_directory("/definitely/not/a/real/library");
        assert!(matches!(result, Err(MuzakError::LibraryEmpty { .. })));
    }

    #[test]
    fn directory_without_audio_is_an_empty_library() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "cover.jpg");

        let scanner = MusicScanner::new();
        let result = scanner.scan_directory(dir.path());
        assert!(matches!(result, Err(MuzakError::LibraryEmpty { .. })));
    }

    #[test]
    fn only_supported_extensions_are_listed() {
        let dir = tempdir().unwrap();
        let track = touch(dir.path(), "track.mp3");
        for i in 0..9 {
            touch(dir.path(), &format!("junk{i}.txt"));
        }

        let scanner = MusicScanner::new();
        let files = scanner.scan_directory(dir.path()).unwrap();
        assert_eq!(files, vec![track.clone()]);

        // With a single eligible file, selection has no choice to make.
        for _ in 0..20 {
            assert_eq!(scanner.pick_random(&files), Some(&track));
        }
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "LOUD.MP3");
        touch(dir.path(), "Mellow.FlAc");

        let scanner = MusicScanner::new();
        let files = scanner.scan_directory(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn subdirectories_are_not_descended() {
        let dir = tempdir().unwrap();
        touch(dir.path(), "top.ogg");

        let nested = dir.path().join("deeper");
        fs::create_dir(&nested).unwrap();
        touch(&nested, "buried.mp3");

        // A directory with an audio-looking name is still a directory.
        fs::create_dir(dir.path().join("fake.mp3")).unwrap();

        let scanner = MusicScanner::new();
        let files = scanner.scan_directory(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("top.ogg")]);
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlinks_are_skipped() {
        let dir = tempdir().unwrap();
        let track = touch(dir.path(), "track.mp3");

        std::os::unix::fs::symlink(
            dir.path().join("no-such-target.mp3"),
            dir.path().join("dangling.mp3"),
        )
        .unwrap();

        // The broken link is unreadable once followed; the rest of the
        // library must still play.
        let scanner = MusicScanner::new();
        let files = scanner.scan_directory(dir.path()).unwrap();
        assert_eq!(files, vec![track]);
    }

    #[test]
    fn dotfiles_are_skipped() {
        let dir = tempdir().unwrap();
        touch(dir.path(), ".hidden.mp3");
        touch(dir.path(), "visible.mp3");

        let scanner = MusicScanner::new();
        let files = scanner.scan_directory(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("visible.mp3")]);
    }

    #[test]
    fn selection_is_roughly_uniform() {
        let dir = tempdir().unwrap();
        for name in ["a.mp3", "b.wav", "c.ogg"] {
            touch(dir.path(), name);
        }

        let scanner = MusicScanner::new();
        let files = scanner.scan_directory(dir.path()).unwrap();

        let mut counts: HashMap<&PathBuf, u32> = HashMap::new();
        for _ in 0..300 {
            let picked = scanner.pick_random(&files).unwrap();
            *counts.entry(picked).or_default() += 1;
        }

        // Statistical, not exact: each of three tracks expects ~100 of 300
        // picks; a count below 40 is a seven-sigma fluke.
        assert_eq!(counts.len(), 3);
        for (_, count) in counts {
            assert!(count > 40, "selection badly skewed: {count}/300");
        }
    }
}
