//! URL to embeddable descriptor resolution.
//!
//! Each platform has its own extractor so the matching rules can be tested
//! in isolation. [`resolve`] is pure: the same input always produces the same
//! descriptor, and the input string is never modified.

use serde::{Deserialize, Serialize};
use url::Url;

/// Length of a YouTube video id.
pub const YOUTUBE_ID_LEN: usize = 11;

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";
const INSTAGRAM_EMBED_BASE: &str = "https://www.instagram.com/p/";

/// Platform an embed URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Generic,
}

/// Platform classification plus the iframe-embeddable URL for a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedDescriptor {
    pub platform: Platform,
    pub embed_url: String,
}

impl EmbedDescriptor {
    /// Descriptor that embeds the raw URL as-is.
    pub fn generic(url: &str) -> Self {
        Self {
            platform: Platform::Generic,
            embed_url: url.to_string(),
        }
    }
}

/// Resolve a raw link URL into an embed descriptor.
///
/// Unparseable URLs resolve to [`Platform::Generic`] with the raw string.
pub fn resolve(url: &str) -> EmbedDescriptor {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return EmbedDescriptor::generic(url);
    };

    if let Some(id) = youtube_video_id(&parsed) {
        return EmbedDescriptor {
            platform: Platform::Youtube,
            embed_url: format!("{YOUTUBE_EMBED_BASE}{id}"),
        };
    }

    if let Some(id) = instagram_post_id(&parsed) {
        return EmbedDescriptor {
            platform: Platform::Instagram,
            embed_url: format!("{INSTAGRAM_EMBED_BASE}{id}/embed"),
        };
    }

    EmbedDescriptor::generic(url)
}

fn host_matches(url: &Url, domain: &str) -> bool {
    match url.host_str() {
        Some(host) => {
            let host = host.to_ascii_lowercase();
            host == domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => false,
    }
}

fn is_youtube_id(candidate: &str) -> bool {
    candidate.len() == YOUTUBE_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Extract the video id from a YouTube watch, short-link or shorts URL.
pub fn youtube_video_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if host_matches(url, "youtu.be") {
        return segments
            .next()
            .filter(|id| is_youtube_id(id))
            .map(str::to_string);
    }

    if !host_matches(url, "youtube.com") {
        return None;
    }

    if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
        return is_youtube_id(&id).then(|| id.into_owned());
    }

    match (segments.next(), segments.next()) {
        (Some("shorts" | "embed" | "live"), Some(id)) if is_youtube_id(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Extract the post id following `/p/` from an Instagram URL.
pub fn instagram_post_id(url: &Url) -> Option<String> {
    if !host_matches(url, "instagram.com") {
        return None;
    }

    // The url crate has already split off `?` and `#`.
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "p" {
            return segments
                .next()
                .filter(|id| !id.is_empty())
                .map(str::to_string);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_watch_url() {
        let desc = resolve("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(desc.platform, Platform::Youtube);
        assert_eq!(desc.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn test_youtube_watch_url_with_extra_params() {
        let desc = resolve("https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=42");
        assert_eq!(desc.platform, Platform::Youtube);
        assert_eq!(desc.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn test_youtube_short_link() {
        let desc = resolve("https://youtu.be/dQw4w9WgXcQ?si=abc");
        assert_eq!(desc.platform, Platform::Youtube);
        assert_eq!(desc.embed_url, "https://www.youtube.com/embed/dQw4w9WgXcQ");
    }

    #[test]
    fn test_youtube_shorts_path() {
        let desc = resolve("https://www.youtube.com/shorts/aBcDeFgHi_-");
        assert_eq!(desc.embed_url, "https://www.youtube.com/embed/aBcDeFgHi_-");
    }

    #[test]
    fn test_youtube_invalid_id_is_generic() {
        let url = "https://www.youtube.com/watch?v=short";
        let desc = resolve(url);
        assert_eq!(desc, EmbedDescriptor::generic(url));
    }

    #[test]
    fn test_youtube_lookalike_host_is_generic() {
        let url = "https://notyoutube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(resolve(url).platform, Platform::Generic);
    }

    #[test]
    fn test_instagram_post() {
        let desc = resolve("https://www.instagram.com/p/CxYz123AbC/?utm_source=ig_web");
        assert_eq!(desc.platform, Platform::Instagram);
        assert_eq!(desc.embed_url, "https://www.instagram.com/p/CxYz123AbC/embed");
    }

    #[test]
    fn test_instagram_post_with_fragment() {
        let desc = resolve("https://instagram.com/p/Abc_123#comments");
        assert_eq!(desc.embed_url, "https://www.instagram.com/p/Abc_123/embed");
    }

    #[test]
    fn test_instagram_profile_is_generic() {
        let url = "https://www.instagram.com/someone/";
        assert_eq!(resolve(url), EmbedDescriptor::generic(url));
    }

    #[test]
    fn test_generic_url_is_unchanged() {
        let url = "https://Example.com/some/Path?q=1#frag";
        let desc = resolve(url);
        assert_eq!(desc.platform, Platform::Generic);
        assert_eq!(desc.embed_url, url);
    }

    #[test]
    fn test_malformed_url_is_generic() {
        let raw = "not a url at all";
        assert_eq!(resolve(raw), EmbedDescriptor::generic(raw));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.instagram.com/p/CxYz123AbC/",
            "https://example.com",
            "::::",
        ] {
            assert_eq!(resolve(url), resolve(url));
        }
    }
}
