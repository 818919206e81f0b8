//! Artifacts produced by slide stages.
//!
//! An artifact is any durable stage output (clip, script, audio) addressed by
//! a filesystem path.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Reference to an artifact on disk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(PathBuf);

impl ArtifactRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// File name component, lossily converted (empty if the path has none)
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for ArtifactRef {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for ArtifactRef {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

/// Name of the clip produced for a 0-based slide index.
///
/// Clip names embed the 1-based slide number; merge ordering depends on it.
pub fn clip_file_name(slide_index: usize) -> String {
    format!("slide{}_lecture.mp4", slide_index + 1)
}

/// Checks whether an artifact reference points at usable output
pub trait ArtifactResolver: Send + Sync {
    fn is_resolvable(&self, artifact: &ArtifactRef) -> bool;
}

/// Resolver backed by the local filesystem: the file must exist and be non-empty
#[derive(Debug, Default, Clone, Copy)]
pub struct FsResolver;

impl ArtifactResolver for FsResolver {
    fn is_resolvable(&self, artifact: &ArtifactRef) -> bool {
        std::fs::metadata(artifact.path())
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }
}
