//! Download execution engine
//!
//! `execute` runs one job inside a scoped temporary workspace: yt-dlp
//! downloads under the format and size constraints, the produced file is
//! renamed to a sanitized, truncated title, and the byte ceiling is
//! verified against the real file before anything is offered for delivery.
//! The workspace is a `TempDir`, removed on drop on every exit path.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::validation::{sanitize_filename, truncate_title};
use crate::download::{ytdlp, Artifact, DownloadJob};
use crate::session::MediaKind;

/// Runs one extraction job to completion
///
/// Called from a spawned task per job so the event-handling path never
/// blocks on a download.
pub async fn execute(job: &DownloadJob) -> AppResult<Artifact> {
    let workspace = tempfile::tempdir()?;
    log::info!("Workspace for token {}: {}", job.token, workspace.path().display());

    let outcome = ytdlp::run(job, workspace.path()).await?;

    if outcome.size_limit_hit {
        // The pre-download filter refused every matching stream
        return Err(AppError::SizeLimitExceeded { limit: job.max_bytes });
    }

    finalize_artifact(workspace, outcome.info.title, job.kind, job.max_bytes)
}

/// Turns a populated workspace into a verified artifact
///
/// Locates the downloaded file, renames it to a sanitized truncated title
/// and enforces the byte ceiling against the measured size. Consumes the
/// workspace; on any error it is dropped and its contents removed.
pub(crate) fn finalize_artifact(
    workspace: TempDir,
    title: Option<String>,
    kind: MediaKind,
    max_bytes: u64,
) -> AppResult<Artifact> {
    let downloaded = find_output_file(workspace.path())?;

    let size_bytes = fs::metadata(&downloaded)?.len();
    if size_bytes > max_bytes {
        log::warn!(
            "Artifact {} is {} bytes, over the {} byte ceiling - discarding",
            downloaded.display(),
            size_bytes,
            max_bytes
        );
        return Err(AppError::SizeLimitExceeded { limit: max_bytes });
    }

    let ext = downloaded
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(match kind {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "m4a",
        })
        .to_string();

    let raw_title = title
        .or_else(|| {
            downloaded
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| "download".to_string());
    let title = truncate_title(&sanitize_filename(&raw_title), config::download::TITLE_MAX_CHARS);

    let final_path = workspace.path().join(format!("{}.{}", title, ext));
    if final_path != downloaded {
        fs::rename(&downloaded, &final_path)?;
    }

    log::info!("Artifact ready: {} ({} bytes)", final_path.display(), size_bytes);
    Ok(Artifact::new(final_path, title, kind, size_bytes, workspace))
}

/// Locates the extractor's output inside the workspace
///
/// yt-dlp may pick a different container than the template suggested, so
/// instead of trusting a predicted path the engine takes the largest
/// regular file in the directory (merge leftovers are tiny by comparison).
fn find_output_file(dir: &Path) -> AppResult<PathBuf> {
    let mut best: Option<(u64, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let size = meta.len();
        if best.as_ref().map(|(s, _)| size > *s).unwrap_or(true) {
            best = Some((size, entry.path()));
        }
    }

    best.map(|(_, path)| path)
        .ok_or_else(|| AppError::Extraction("extractor produced no output file".to_string()))
}
