//! Scoped ownership of files a merge run creates.
//!
//! Every intermediate, metadata file and extracted cover is registered with
//! an [`ArtifactScope`] before the tool that writes it is started. Leaving the
//! scope removes whatever was registered, on success and on every error path
//! alike, unless the caller asked to keep intermediates.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Owns the files created during one merge run.
#[derive(Debug)]
pub struct ArtifactScope {
    paths: Vec<PathBuf>,
    keep: bool,
    released: bool,
}

impl ArtifactScope {
    /// `keep` retains tracked files when the scope ends.
    pub fn new(keep: bool) -> Self {
        Self {
            paths: Vec::new(),
            keep,
            released: false,
        }
    }

    /// Registers a path. Call before the file is created so a failure while
    /// writing it still triggers removal.
    pub fn track(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    /// Tracked paths in registration order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn keeps_files(&self) -> bool {
        self.keep
    }

    /// Ends the scope now, returning how many files were removed.
    pub fn release(mut self) -> usize {
        self.cleanup()
    }

    fn cleanup(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;

        if self.keep {
            debug!("Keeping {} intermediate file(s)", self.paths.len());
            return 0;
        }

        self.paths
            .iter()
            .filter(|path| remove_if_present(path))
            .count()
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Removes the final output unless disarmed. Guards the merge step so a
/// half-written audiobook never survives a failed run.
#[derive(Debug)]
pub struct OutputGuard {
    path: PathBuf,
    armed: bool,
}

impl OutputGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The output is complete; keep it.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for OutputGuard {
    fn drop(&mut self) {
        if self.armed && remove_if_present(&self.path) {
            warn!("Removed incomplete output {}", self.path.display());
        }
    }
}

/// Deletes a file, treating "already gone" as success. Returns whether a file
/// was actually removed.
fn remove_if_present(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Failed to remove {}: {}", path.display(), e);
            false
        }
    }
}
