//! WordPress 內容的輕量化：解碼實體並把受限的 HTML 子集轉成純文字（含少量 markdown）。

use crate::core::media::{INSTRUMENT_CLOSE_RE, INSTRUMENT_TAG_RE};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ENTITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(#?[A-Za-z0-9]+);").unwrap());

static BLOCK_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--\s*/?wp:.*?-->").unwrap());

static BOLD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:strong|b)(?:\s[^>]*)?>(.*?)</(?:strong|b)\s*>").unwrap()
});
static ITALIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(?:em|i)(?:\s[^>]*)?>(.*?)</(?:em|i)\s*>").unwrap());
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static BARE_ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a(?:\s[^>]*)?>(.*?)</a\s*>").unwrap());

static LIST_ITEM_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<li(?:\s[^>]*)?>").unwrap());
static LIST_ITEM_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</li\s*>").unwrap());

static STRUCTURAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(?:p|div|span|ul|ol|h[1-6]|blockquote)(?:\s[^>]*)?>|<br\s*/?>").unwrap()
});

static EMBED_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)<figure\b[^>]*wp-block-embed[^>]*>.*?</figure\s*>").unwrap(),
        Regex::new(r"(?is)<iframe\b.*?</iframe\s*>").unwrap(),
        Regex::new(r"(?is)<iframe\b[^>]*>").unwrap(),
        Regex::new(r"(?is)<video\b.*?</video\s*>").unwrap(),
        Regex::new(r"(?is)<object\b.*?</object\s*>").unwrap(),
        Regex::new(r"(?i)<embed\b[^>]*>").unwrap(),
        Regex::new(r"(?is)\[embed\b[^\]]*\].*?\[/embed\]").unwrap(),
        Regex::new(r"(?is)\[video\b[^\]]*\](?:.*?\[/video\])?").unwrap(),
    ]
});

static HTML_COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static LEFTOVER_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?[a-z][a-z0-9]*(?:\s[^>]*)?/?>").unwrap());

static MULTI_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn entity_replacement(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "#039" | "#39" | "apos" => "'",
        "nbsp" | "#160" => " ",
        "ndash" | "#8211" => "–",
        "mdash" | "#8212" => "—",
        "lsquo" | "#8216" => "‘",
        "rsquo" | "#8217" => "’",
        "ldquo" | "#8220" => "“",
        "rdquo" | "#8221" => "”",
        "hellip" | "#8230" => "…",
        _ => return None,
    };
    Some(decoded)
}

/// 單次掃描解碼固定的實體表；未知實體原樣保留
pub fn decode_entities(text: &str) -> String {
    ENTITY_RE
        .replace_all(text, |caps: &Captures| match entity_replacement(&caps[1]) {
            Some(decoded) => decoded.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// 把原始 HTML 內容轉成輕量文字。步驟順序不可調換。
pub fn normalize_content(raw: &str) -> String {
    // 1. 實體解碼必須先於所有標籤比對
    let text = decode_entities(raw);

    // 2. 區塊註解標記，內容保留
    let text = BLOCK_COMMENT_RE.replace_all(&text, "");

    // 3. 行內格式
    let text = BOLD_RE.replace_all(&text, |caps: &Captures| wrap_inline(&caps[1], "**"));
    let text = ITALIC_RE.replace_all(&text, |caps: &Captures| wrap_inline(&caps[1], "*"));
    let text = ANCHOR_RE.replace_all(&text, |caps: &Captures| {
        let href = caps[1].trim();
        let label = caps[2].trim();
        if label.is_empty() {
            href.to_string()
        } else {
            format!("[{}]({})", label, href)
        }
    });
    let text = BARE_ANCHOR_RE.replace_all(&text, "$1");

    // 4. 清單項目
    let text = LIST_ITEM_OPEN_RE.replace_all(&text, "\n• ");
    let text = LIST_ITEM_CLOSE_RE.replace_all(&text, "");

    // 5. 結構標籤 → 換行
    let text = STRUCTURAL_RE.replace_all(&text, "\n");

    // 6. 內嵌播放器整段移除（URL 由 media 模組另外擷取）
    let mut text = text.into_owned();
    for re in EMBED_RES.iter() {
        text = re.replace_all(&text, "").into_owned();
    }
    let text = INSTRUMENT_TAG_RE.replace_all(&text, "");
    let text = INSTRUMENT_CLOSE_RE.replace_all(&text, "");
    let text = HTML_COMMENT_RE.replace_all(&text, "");
    let text = LEFTOVER_TAG_RE.replace_all(&text, "");

    // 7. 空白整理
    collapse_whitespace(&text)
}

fn wrap_inline(inner: &str, marker: &str) -> String {
    let inner = inner.trim();
    if inner.is_empty() {
        String::new()
    } else {
        format!("{marker}{inner}{marker}")
    }
}

fn collapse_whitespace(text: &str) -> String {
    let trimmed_lines = text
        .replace("\r\n", "\n")
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    MULTI_NEWLINE_RE
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}
