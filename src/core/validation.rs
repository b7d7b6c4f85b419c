//! URL and filename validation utilities
//!
//! Inbound text must match the URL grammar before a session is created;
//! extractor-produced filenames are sanitized and truncated before the
//! artifact is renamed and sent.

use crate::core::error::{AppError, AppResult};
use lazy_regex::{lazy_regex, Lazy, Regex};
use url::Url;

/// URL grammar for inbound links: http(s) scheme, optional `www.`, a host
/// whose labels are valid DNS labels with an alphabetic top-level label,
/// then an optional port and path/query/fragment.
static URL_RE: Lazy<Regex> = lazy_regex!(
    r"^https?://(www\.)?([A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,6}(:\d+)?([/?#]\S*)?$"i
);

/// Validates an inbound link against the URL grammar
///
/// # Returns
/// * `Ok(Url)` - parsed URL ready to hand to the extractor
/// * `Err(AppError::InvalidUrl)` - input fails the grammar; no session may be created
///
/// # Examples
/// ```
/// use fetchka::core::validation::validate_url;
///
/// assert!(validate_url("https://example.com/watch?v=abc123").is_ok());
/// assert!(validate_url("ftp://example.com/file").is_err());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(input: &str) -> AppResult<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !URL_RE.is_match(trimmed) {
        return Err(AppError::InvalidUrl(input.to_string()));
    }
    Ok(Url::parse(trimmed)?)
}

/// Replaces filesystem- and transport-unsafe characters with `_`
///
/// Covers path separators, reserved characters and ASCII control characters.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_ascii_control() => '_',
            c => c,
        })
        .collect()
}

/// Truncates a title to at most `max_chars` characters, respecting char
/// boundaries, and trims trailing whitespace left by the cut
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    title.chars().take(max_chars).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_plain_https_url() {
        assert!(validate_url("https://example.com/watch?v=abc123").is_ok());
    }

    #[test]
    fn accepts_www_and_http() {
        assert!(validate_url("http://www.example.com").is_ok());
        assert!(validate_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_ok());
        assert!(validate_url("https://youtu.be/dQw4w9WgXcQ").is_ok());
    }

    #[test]
    fn rejects_free_text() {
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(validate_url("ftp://example.com/file").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn rejects_empty_and_schemeless_input() {
        assert!(validate_url("").is_err());
        assert!(validate_url("   ").is_err());
        assert!(validate_url("example.com/watch").is_err());
    }

    #[test]
    fn rejects_host_without_valid_tld() {
        assert!(validate_url("https://localhost").is_err());
        assert!(validate_url("https://example.toolongtld").is_err());
    }

    #[test]
    fn sanitizes_reserved_characters() {
        assert_eq!(sanitize_filename("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_filename("plain title.mp4"), "plain title.mp4");
    }

    #[test]
    fn sanitizes_control_characters() {
        assert_eq!(sanitize_filename("bad\u{0}name\ttab"), "bad_name_tab");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_title("hello world", 5), "hello");
        assert_eq!(truncate_title("привет мир", 6), "привет");
        assert_eq!(truncate_title("short", 64), "short");
        assert_eq!(truncate_title("cut   ", 4), "cut");
    }
}
