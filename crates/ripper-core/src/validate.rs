//! Allow-list validation of submitted media URLs.

use url::Url;

use crate::job::SourceType;

const YOUTUBE_HOSTS: &[&str] = &[
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "youtu.be",
    "music.youtube.com",
];

const SOUNDCLOUD_HOSTS: &[&str] = &["soundcloud.com", "www.soundcloud.com", "m.soundcloud.com"];

/// Hosts accepted for a given source.
pub fn allowed_hosts(source: SourceType) -> &'static [&'static str] {
    match source {
        SourceType::Youtube => YOUTUBE_HOSTS,
        SourceType::Soundcloud => SOUNDCLOUD_HOSTS,
    }
}

/// Returns true only for `http(s)` URLs whose host is on the allow-list of
/// `source`. Unparseable input is simply invalid.
pub fn is_valid_source_url(raw: &str, source: SourceType) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    match url.host_str() {
        Some(host) if !host.is_empty() => allowed_hosts(source).contains(&host),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_youtube_hosts() {
        assert!(is_valid_source_url("https://youtu.be/abc123", SourceType::Youtube));
        assert!(is_valid_source_url(
            "https://www.youtube.com/watch?v=abc123",
            SourceType::Youtube
        ));
        assert!(is_valid_source_url(
            "http://music.youtube.com/watch?v=x",
            SourceType::Youtube
        ));
    }

    #[test]
    fn test_rejects_lookalike_paths() {
        assert!(!is_valid_source_url("https://evil.com/youtube.com", SourceType::Youtube));
        assert!(!is_valid_source_url(
            "https://youtube.com.evil.com/watch",
            SourceType::Youtube
        ));
    }

    #[test]
    fn test_rejects_wrong_source() {
        assert!(!is_valid_source_url("https://youtu.be/abc123", SourceType::Soundcloud));
        assert!(!is_valid_source_url(
            "https://soundcloud.com/artist/track",
            SourceType::Youtube
        ));
        assert!(is_valid_source_url(
            "https://soundcloud.com/artist/track",
            SourceType::Soundcloud
        ));
    }

    #[test]
    fn test_rejects_bad_schemes_and_garbage() {
        assert!(!is_valid_source_url("ftp://youtube.com/x", SourceType::Youtube));
        assert!(!is_valid_source_url("javascript:alert(1)", SourceType::Youtube));
        assert!(!is_valid_source_url("youtube.com/watch?v=1", SourceType::Youtube));
        assert!(!is_valid_source_url("", SourceType::Youtube));
        assert!(!is_valid_source_url("https://", SourceType::Youtube));
    }

    #[test]
    fn test_host_matching_is_case_insensitive() {
        // the URL parser lowercases hosts
        assert!(is_valid_source_url("https://YouTu.be/abc", SourceType::Youtube));
    }
}
