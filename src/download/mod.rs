//! Download execution: job types, yt-dlp wrapper and the engine

pub mod engine;
pub mod ytdlp;

pub use engine::execute;

use std::path::PathBuf;

use tempfile::TempDir;
use url::Url;

use crate::session::{MediaKind, QualityTier};

/// Ephemeral description of one background extraction job
///
/// Built from a dispatched session and dropped when the job finishes;
/// never persisted.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub token: String,
    pub url: Url,
    pub kind: MediaKind,
    pub tier: QualityTier,
    /// Hard byte-size ceiling, enforced before and after download
    pub max_bytes: u64,
}

/// A finished, size-verified artifact ready for delivery
///
/// Owns its temporary workspace: the downloaded file stays on disk exactly
/// as long as the `Artifact` value lives, and the workspace directory is
/// removed when it is dropped, on every exit path.
#[derive(Debug)]
pub struct Artifact {
    pub path: PathBuf,
    pub title: String,
    pub kind: MediaKind,
    pub size_bytes: u64,
    _workspace: TempDir,
}

impl Artifact {
    pub(crate) fn new(path: PathBuf, title: String, kind: MediaKind, size_bytes: u64, workspace: TempDir) -> Self {
        Self {
            path,
            title,
            kind,
            size_bytes,
            _workspace: workspace,
        }
    }
}
