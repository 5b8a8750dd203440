//! Per-request scratch directories
//!
//! Every request gets its own directory under the workspace root. A
//! [`Workspace`] is a guard: it is removed by an explicit [`Workspace::close`]
//! or, failing that, when it is dropped. Removal happens at most once.

use path_absolutize::Absolutize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

const NAME_PREFIX: &str = "mediadrop-";
const MAX_OPEN_ATTEMPTS: usize = 8;

/// Allocates request-exclusive directories under a common root
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = root
            .absolutize()
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory ahead of the first request.
    pub async fn prepare(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Create an empty, uniquely named workspace.
    ///
    /// `create_dir` fails on an existing name, so two callers can never end
    /// up sharing a directory.
    pub async fn open(&self) -> io::Result<Workspace> {
        tokio::fs::create_dir_all(&self.root).await?;

        for _ in 0..MAX_OPEN_ATTEMPTS {
            let path = self
                .root
                .join(format!("{}{}", NAME_PREFIX, Uuid::new_v4().simple()));
            match tokio::fs::create_dir(&path).await {
                Ok(()) => {
                    debug!("Opened workspace {}", path.display());
                    return Ok(Workspace::new(path));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "could not allocate a unique workspace directory",
        ))
    }

    /// Remove a workspace; see [`Workspace::close`].
    pub async fn close(&self, workspace: &Workspace) -> io::Result<()> {
        workspace.close().await
    }
}

/// Request-scoped directory, removed exactly once
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    closed: AtomicBool,
}

impl Workspace {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            closed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Whether `candidate` lives directly or indirectly inside this workspace
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }

    /// Recursively delete the directory.
    ///
    /// Idempotent: later calls, and a directory that is already gone, are
    /// not errors. A failed removal leaves the guard open so `Drop` tries
    /// again.
    pub async fn close(&self) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => {
                self.closed.store(true, Ordering::Release);
                debug!("Closed workspace {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.closed.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to remove workspace {}: {}", self.path.display(), e);
                Err(e)
            }
        }
    }

    /// Delete everything inside the workspace but keep the directory.
    pub async fn discard_contents(&self) -> io::Result<()> {
        let mut entries = tokio::fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let result = if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };
            match result {
                Ok(()) => debug!("Discarded {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if *self.closed.get_mut() {
            return;
        }
        *self.closed.get_mut() = true;

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed workspace {} on drop", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove workspace {}: {}", self.path.display(), e),
        }
    }
}
