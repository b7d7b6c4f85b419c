//! yt-dlp subprocess wrapper
//!
//! Builds the format selector and argument list for one job, runs the
//! binary inside the job's workspace and interprets its output. The binary
//! path comes from `config::YTDL_BIN`.

use std::path::Path;

use serde::Deserialize;
use tokio::process::Command as TokioCommand;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::DownloadJob;
use crate::session::{MediaKind, QualityTier};

/// Marker yt-dlp prints when --max-filesize aborts a download
const SIZE_LIMIT_MARKER: &str = "larger than max-filesize";

/// Subset of the info JSON yt-dlp prints with --print-json
#[derive(Debug, Default, Deserialize)]
pub struct YtdlpInfo {
    pub title: Option<String>,
    pub ext: Option<String>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
}

/// Result of one yt-dlp run over a job workspace
#[derive(Debug)]
pub struct RunOutcome {
    /// Parsed info JSON, when yt-dlp produced one
    pub info: YtdlpInfo,
    /// The pre-download size filter rejected every matching stream
    pub size_limit_hit: bool,
}

/// Format selector for the requested kind and tier
///
/// Video: best video stream at or below the tier's height, merged with the
/// best compatible audio, falling back to the best muxed stream under the
/// height cap. Audio: best audio stream at or below the tier's bitrate,
/// falling back to the best available audio.
pub fn format_selector(kind: MediaKind, tier: QualityTier) -> String {
    match kind {
        MediaKind::Video => format!(
            "bestvideo[height<={h}]+bestaudio/best[height<={h}]",
            h = tier.value()
        ),
        MediaKind::Audio => format!("bestaudio[abr<={b}]/bestaudio", b = tier.value()),
    }
}

/// Argument list for one job, downloading into `out_dir`
///
/// The output template truncates the title inside yt-dlp already; the
/// engine re-sanitizes the final filename after the fact.
pub fn build_args(job: &DownloadJob, out_dir: &Path) -> Vec<String> {
    let template = format!(
        "{}/%(title).{}s.%(ext)s",
        out_dir.display(),
        config::download::TITLE_MAX_CHARS
    );

    let mut args = vec![
        "--format".to_string(),
        format_selector(job.kind, job.tier),
        "--max-filesize".to_string(),
        job.max_bytes.to_string(),
        "--no-playlist".to_string(),
        "--no-progress".to_string(),
        "--print-json".to_string(),
        "--output".to_string(),
        template,
    ];

    match job.kind {
        MediaKind::Video => {
            args.push("--merge-output-format".to_string());
            args.push("mp4".to_string());
        }
        MediaKind::Audio => {
            args.push("--extract-audio".to_string());
            args.push("--audio-format".to_string());
            args.push("m4a".to_string());
        }
    }

    args.push(job.url.as_str().to_string());
    args
}

/// Runs yt-dlp for one job inside its workspace
///
/// A non-zero exit surfaces `ExtractionFailed` carrying the extractor's own
/// error line; the size-limit pre-filter is reported through the outcome so
/// the engine can translate it, never silently.
pub async fn run(job: &DownloadJob, out_dir: &Path) -> AppResult<RunOutcome> {
    let ytdl_bin = &*config::YTDL_BIN;
    let args = build_args(job, out_dir);

    log::info!(
        "Running {} for token {} (kind={}, tier={})",
        ytdl_bin,
        job.token,
        job.kind.as_str(),
        job.tier.value()
    );
    log::debug!("yt-dlp args: {}", args.join(" "));

    let output = TokioCommand::new(ytdl_bin)
        .args(&args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| AppError::Extraction(format!("failed to start {}: {}", ytdl_bin, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if !output.status.success() {
        let cause = error_cause(&stderr);
        log::warn!("yt-dlp failed for token {} (exit {:?}): {}", job.token, output.status.code(), cause);
        return Err(AppError::Extraction(cause));
    }

    let info = parse_info_json(&stdout).unwrap_or_default();
    log::debug!(
        "Extractor reported title={:?} ext={:?} size={:?}",
        info.title,
        info.ext,
        info.filesize.or(info.filesize_approx)
    );
    let size_limit_hit = stdout.contains(SIZE_LIMIT_MARKER) || stderr.contains(SIZE_LIMIT_MARKER);

    Ok(RunOutcome { info, size_limit_hit })
}

/// Picks the info JSON line out of yt-dlp stdout
///
/// --print-json writes one JSON object per downloaded entry; with
/// --no-playlist that is at most one line among the progress noise.
fn parse_info_json(stdout: &str) -> Option<YtdlpInfo> {
    stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

/// Extracts a user-presentable cause from yt-dlp stderr
///
/// Prefers the last "ERROR:" line; falls back to the last non-empty line so
/// a failure never surfaces without cause text.
fn error_cause(stderr: &str) -> String {
    let last_error = stderr
        .lines()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
        .map(|line| line.trim_start().trim_start_matches("ERROR:").trim().to_string());

    last_error
        .or_else(|| stderr.lines().rev().find(|l| !l.trim().is_empty()).map(|l| l.trim().to_string()))
        .unwrap_or_else(|| "extractor produced no error output".to_string())
}
