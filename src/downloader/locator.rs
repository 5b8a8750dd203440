//! Artifact locator
//!
//! The engine's predicted filename is only a best guess: post-processing
//! changes extensions and the engine sanitizes names on its own. Resolution
//! order:
//! 1. predicted base path with the post-processed extension
//! 2. predicted path verbatim
//! 3. directory scan, skipping partial downloads; newest file wins
//!
//! Nothing found is a `NoArtifactProduced` failure.

use crate::downloader::workspace::Workspace;
use crate::extractor::models::{ExtractionSuccess, PostProcess};
use crate::utils::error::AcquireError;
use crate::utils::filename::suggested_filename;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Suffixes the engine uses for in-progress transfers
const PARTIAL_SUFFIXES: &[&str] = &[".part", ".ytdl", ".temp", ".tmp"];

/// Final, fully written file handed to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArtifact {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub format_id: String,
}

impl ResolvedArtifact {
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Non-fatal inconsistency the caller should log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateWarning {
    AmbiguousCandidates { chosen: PathBuf, others: Vec<PathBuf> },
}

impl fmt::Display for LocateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateWarning::AmbiguousCandidates { chosen, others } => write!(
                f,
                "{} candidate files in workspace, picked most recent {} over {:?}",
                others.len() + 1,
                chosen.display(),
                others
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Located {
    pub artifact: ResolvedArtifact,
    pub warning: Option<LocateWarning>,
}

/// Whether the file name carries an in-progress marker
pub fn is_partial(path: &Path) -> bool {
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy().to_lowercase(),
        None => return false,
    };
    PARTIAL_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.contains(".part-frag")
}

/// Find the file a successful extraction produced.
pub async fn locate(
    workspace: &Workspace,
    success: &ExtractionSuccess,
    post_process: Option<PostProcess>,
) -> Result<Located, AcquireError> {
    let predicted = &success.predicted_path;
    let mut candidates = Vec::with_capacity(2);
    if let Some(pp) = post_process {
        let expected = predicted.with_extension(pp.final_extension());
        if &expected != predicted {
            candidates.push(expected);
        }
    }
    candidates.push(predicted.clone());

    for candidate in candidates {
        if !workspace.contains(&candidate) {
            debug!("Ignoring candidate outside workspace: {}", candidate.display());
            continue;
        }
        if is_partial(&candidate) {
            continue;
        }
        if let Some((size, _)) = complete_file(&candidate).await {
            debug!("Artifact found at predicted location {}", candidate.display());
            return Ok(Located {
                artifact: build_artifact(candidate, size, success),
                warning: None,
            });
        }
    }

    debug!(
        "Predicted {} not found, scanning {}",
        predicted.display(),
        workspace.path().display()
    );
    let mut found = scan(workspace.path()).await?;
    if found.is_empty() {
        return Err(AcquireError::NoArtifactProduced(format!(
            "engine reported {} but the workspace holds no complete file",
            predicted
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        )));
    }

    // newest first; name breaks mtime ties
    found.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    let mut found = found.into_iter();
    let chosen = found.next().ok_or_else(|| {
        AcquireError::NoArtifactProduced("workspace scan returned no candidates".to_string())
    })?;
    let others: Vec<PathBuf> = found.map(|c| c.path).collect();

    let warning = (!others.is_empty()).then(|| LocateWarning::AmbiguousCandidates {
        chosen: chosen.path.clone(),
        others,
    });

    Ok(Located {
        artifact: build_artifact(chosen.path, chosen.size, success),
        warning,
    })
}

struct Candidate {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

async fn complete_file(path: &Path) -> Option<(u64, SystemTime)> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    Some((meta.len(), modified))
}

async fn scan(dir: &Path) -> Result<Vec<Candidate>, AcquireError> {
    let mut found = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_partial(&path) {
            continue;
        }
        if let Some((size, modified)) = complete_file(&path).await {
            found.push(Candidate {
                path,
                size,
                modified,
            });
        }
    }
    Ok(found)
}

fn build_artifact(path: PathBuf, size: u64, success: &ExtractionSuccess) -> ResolvedArtifact {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let title = if success.title.trim().is_empty() {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    } else {
        success.title.clone()
    };

    ResolvedArtifact {
        filename: suggested_filename(&title, &extension),
        path,
        size,
        format_id: success.chosen_format_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::workspace::WorkspaceManager;
    use crate::utils::config::{AudioCodec, Container};
    use crate::utils::error::FailureKind;
    use std::time::Duration;
    use tempfile::TempDir;

    fn success(predicted: PathBuf, title: &str) -> ExtractionSuccess {
        ExtractionSuccess {
            predicted_path: predicted,
            title: title.to_string(),
            chosen_format_id: "251".to_string(),
        }
    }

    const MP3: PostProcess = PostProcess::ExtractAudio {
        codec: AudioCodec::Mp3,
        bitrate_kbps: 192,
    };

    fn touch(path: &Path, age_secs: u64) {
        std::fs::write(path, b"media").unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_partial_markers() {
        assert!(is_partial(Path::new("/w/a.webm.part")));
        assert!(is_partial(Path::new("/w/a.mp4.ytdl")));
        assert!(is_partial(Path::new("/w/a.f137.mp4.part-Frag12")));
        assert!(is_partial(Path::new("/w/a.temp")));
        assert!(!is_partial(Path::new("/w/a.mp4")));
        assert!(!is_partial(Path::new("/w/party.mp3")));
    }

    #[tokio::test]
    async fn test_post_processed_extension_preferred() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("foo.mp3"), 0);

        let located = locate(&ws, &success(ws.path().join("foo.webm"), "foo"), Some(MP3))
            .await
            .unwrap();

        assert_eq!(located.artifact.path, ws.path().join("foo.mp3"));
        assert_eq!(located.artifact.filename, "foo.mp3");
        assert!(located.warning.is_none());
    }

    #[tokio::test]
    async fn test_converted_file_wins_over_leftover_source() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("foo.webm"), 0);
        touch(&ws.path().join("foo.mp3"), 10);

        let located = locate(&ws, &success(ws.path().join("foo.webm"), "foo"), Some(MP3))
            .await
            .unwrap();
        assert_eq!(located.artifact.path, ws.path().join("foo.mp3"));
    }

    #[tokio::test]
    async fn test_predicted_path_verbatim() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("Clip.mp4"), 0);

        let merge = PostProcess::Merge {
            container: Container::Mkv,
        };
        let located = locate(&ws, &success(ws.path().join("Clip.mp4"), "Clip: Live"), Some(merge))
            .await
            .unwrap();

        assert_eq!(located.artifact.path, ws.path().join("Clip.mp4"));
        assert_eq!(located.artifact.filename, "Clip_ Live.mp4");
        assert_eq!(located.artifact.size, 5);
        assert_eq!(located.artifact.format_id, "251");
    }

    #[tokio::test]
    async fn test_scan_skips_partials() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("Renamed by engine.mkv"), 5);
        touch(&ws.path().join("Renamed by engine.mkv.part"), 0);

        let located = locate(&ws, &success(ws.path().join("Original.mp4"), ""), None)
            .await
            .unwrap();

        assert_eq!(located.artifact.path, ws.path().join("Renamed by engine.mkv"));
        assert_eq!(located.artifact.filename, "Renamed by engine.mkv");
        assert!(located.warning.is_none());
    }

    #[tokio::test]
    async fn test_scan_picks_newest_and_warns() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("old.mp4"), 60);
        touch(&ws.path().join("new.mp4"), 1);

        let located = locate(&ws, &success(ws.path().join("missing.mp4"), "t"), None)
            .await
            .unwrap();

        assert_eq!(located.artifact.path, ws.path().join("new.mp4"));
        match located.warning {
            Some(LocateWarning::AmbiguousCandidates { chosen, others }) => {
                assert_eq!(chosen, ws.path().join("new.mp4"));
                assert_eq!(others, vec![ws.path().join("old.mp4")]);
            }
            None => panic!("expected an ambiguity warning"),
        }
    }

    #[tokio::test]
    async fn test_equal_mtimes_pick_greatest_name() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        let stamp = SystemTime::now() - Duration::from_secs(30);
        for name in ["b.mp4", "a.mp4", "c.mkv"] {
            let path = ws.path().join(name);
            std::fs::write(&path, b"media").unwrap();
            std::fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(stamp)
                .unwrap();
        }

        let located = locate(&ws, &success(ws.path().join("missing.mp4"), "t"), None)
            .await
            .unwrap();

        assert_eq!(located.artifact.path, ws.path().join("c.mkv"));
        match located.warning {
            Some(LocateWarning::AmbiguousCandidates { chosen, others }) => {
                assert_eq!(chosen, ws.path().join("c.mkv"));
                assert_eq!(others, vec![ws.path().join("b.mp4"), ws.path().join("a.mp4")]);
            }
            None => panic!("expected an ambiguity warning"),
        }
    }

    #[tokio::test]
    async fn test_predicted_path_outside_workspace_ignored() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        touch(&outside.path().join("elsewhere.mp4"), 0);
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("inside.mp4"), 0);

        let located = locate(&ws, &success(outside.path().join("elsewhere.mp4"), "t"), None)
            .await
            .unwrap();
        assert_eq!(located.artifact.path, ws.path().join("inside.mp4"));
    }

    #[tokio::test]
    async fn test_no_artifact_produced() {
        let root = TempDir::new().unwrap();
        let ws = WorkspaceManager::new(root.path()).open().await.unwrap();
        touch(&ws.path().join("foo.webm.part"), 0);

        let err = locate(&ws, &success(ws.path().join("foo.webm"), "foo"), Some(MP3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::NoArtifactProduced);
    }
}
