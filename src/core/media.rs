//! 從原始內容擷取媒體參照：YouTube、Spotify、Soundslice 與自架影片。
//!
//! 讀取的是正規化之前的原始字串，與 [`crate::core::normalize`] 彼此獨立。

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const INSTRUMENTS: &str = "soundslice|guitar|bass|piano|ukulele|mandolin|banjo|drums|notation";

pub(crate) static INSTRUMENT_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\[\s*(?:{INSTRUMENTS})\b[^\]]*\]")).unwrap());
pub(crate) static INSTRUMENT_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\[/\s*(?:{INSTRUMENTS})\s*\]")).unwrap());

static YOUTUBE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^"'\s<>]*?&(?:amp;)?)?v=|embed/|v/|shorts/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)"#,
    )
    .unwrap()
});

static SPOTIFY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)open\.spotify\.com/(?:embed/)?(?:intl-[a-z]{2}/)?(track|album|playlist|artist)/([A-Za-z0-9]+)",
    )
    .unwrap()
});

static SOUNDSLICE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r#"(?i)\[\s*(?:{INSTRUMENTS})\b[^\]]*?\burl\s*=\s*(?:["']|&quot;|&#8221;|&#8243;)?([^"'\s\]&]+)"#
    ))
    .unwrap()
});
static SOUNDSLICE_BARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?soundslice\.com/slices/[A-Za-z0-9_-]+/?").unwrap()
});

static EMBED_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:data-)?embed[-_]key\s*=\s*["']?([A-Za-z0-9_-]+)"#).unwrap()
});
static BUCKET_VIDEO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)https?://[A-Za-z0-9.-]*(?:amazonaws\.com|storage\.googleapis\.com|b-cdn\.net|digitaloceanspaces\.com|r2\.dev)/[^\s"'<>\]]*?\.(?:mp4|mov|m4v|webm)\b(?:\?[^\s"'<>\]]*)?"#,
    )
    .unwrap()
});

/// `embed/videoseries?list=` 是播放清單，不是影片 id
const PLAYLIST_EMBED_ID: &str = "videoseries";

pub const EMBED_KEY_PREFIX: &str = "embed:";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaRefs {
    pub youtube: Vec<String>,
    pub spotify: Vec<String>,
    pub soundslice: Option<String>,
    pub hosted_video: Option<String>,
}

impl MediaRefs {
    /// 課程單元的主要影音：Soundslice > 自架影片 > 第一個 YouTube
    pub fn primary_video(&self) -> Option<String> {
        self.soundslice
            .clone()
            .or_else(|| self.hosted_video.clone())
            .or_else(|| self.youtube.first().cloned())
    }

    pub fn is_empty(&self) -> bool {
        self.youtube.is_empty()
            && self.spotify.is_empty()
            && self.soundslice.is_none()
            && self.hosted_video.is_none()
    }
}

pub fn extract_media(raw: &str) -> MediaRefs {
    MediaRefs {
        youtube: youtube_urls(raw),
        spotify: spotify_urls(raw),
        soundslice: soundslice_url(raw),
        hosted_video: hosted_video(raw),
    }
}

/// 依影片 id 去重，輸出 `watch?v=` 形式
pub fn youtube_urls(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    YOUTUBE_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let id = caps[1].to_string();
            if id.eq_ignore_ascii_case(PLAYLIST_EMBED_ID) {
                return None;
            }
            seen.insert(id.clone())
                .then(|| format!("https://www.youtube.com/watch?v={}", id))
        })
        .collect()
}

/// 依 `{type}/{id}` 去重
pub fn spotify_urls(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    SPOTIFY_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let key = format!("{}/{}", caps[1].to_ascii_lowercase(), &caps[2]);
            seen.insert(key.clone())
                .then(|| format!("https://open.spotify.com/{}", key))
        })
        .collect()
}

pub fn soundslice_url(raw: &str) -> Option<String> {
    SOUNDSLICE_TAG_RE
        .captures(raw)
        .map(|caps| caps[1].to_string())
        .or_else(|| SOUNDSLICE_BARE_RE.find(raw).map(|m| m.as_str().to_string()))
}

pub fn hosted_video(raw: &str) -> Option<String> {
    EMBED_KEY_RE
        .captures(raw)
        .map(|caps| format!("{}{}", EMBED_KEY_PREFIX, &caps[1]))
        .or_else(|| BUCKET_VIDEO_RE.find(raw).map(|m| m.as_str().to_string()))
}
