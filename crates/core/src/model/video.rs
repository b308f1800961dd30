use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("bare video id pattern"));

static URL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]{11}).*")
        .expect("video url pattern")
});

/// Identifier of a lesson video on the hosting platform.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Resolves a raw backend value into a video id.
    ///
    /// An 11-character token is taken as-is; otherwise the id is extracted from
    /// a recognized share, watch or embed URL. Returns `None` when nothing
    /// matches, which the viewer shows as "video unavailable".
    #[must_use]
    pub fn resolve(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if BARE_ID.is_match(raw) {
            return Some(Self(raw.to_owned()));
        }
        URL_ID
            .captures(raw)
            .and_then(|caps| caps.get(2))
            .map(|m| Self(m.as_str().to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Player URL for an embedded frame.
    #[must_use]
    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?rel=0&modestbranding=1&enablejsapi=1",
            self.0
        )
    }
}

impl fmt::Debug for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VideoId({})", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn bare_id_is_kept() {
        assert_eq!(VideoId::resolve(ID).unwrap().as_str(), ID);
    }

    #[test]
    fn share_and_watch_urls_resolve_to_same_id() {
        for raw in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1",
        ] {
            assert_eq!(VideoId::resolve(raw).unwrap().as_str(), ID, "{raw}");
        }
    }

    #[test]
    fn unrecognized_values_are_absent() {
        assert!(VideoId::resolve("").is_none());
        assert!(VideoId::resolve("not a video").is_none());
        assert!(VideoId::resolve("https://example.com/lesson/12").is_none());
        assert!(VideoId::resolve("dQw4w9WgXc").is_none());
    }
}
