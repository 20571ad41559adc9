//! WordPress (LearnDash) 匯出文件的寬鬆掃描。
//!
//! 不做 schema 驗證：缺欄位的 item 直接略過，未知的 post type 也不報錯。

use crate::core::media::extract_media;
use crate::core::normalize::{decode_entities, normalize_content};
use crate::domain::model::{
    EntityKind, ParsedCourse, ParsedExport, ParsedLesson, ParsedModule, RawExportItem,
    WpCourseTable,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static ITEM_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<item\b[^>]*>").unwrap());
static TITLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap());
static POST_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<wp:post_id>\s*(?:<!\[CDATA\[)?\s*(\d+)").unwrap()
});
static POST_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<wp:post_type>(.*?)</wp:post_type>").unwrap());
static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<wp:status>(.*?)</wp:status>").unwrap());
static MENU_ORDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<wp:menu_order>\s*(?:<!\[CDATA\[)?\s*(-?\d+)").unwrap()
});
static CONTENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<content:encoded>(.*?)</content:encoded>").unwrap());
static POSTMETA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)<wp:postmeta>\s*<wp:meta_key>(.*?)</wp:meta_key>\s*<wp:meta_value>(.*?)</wp:meta_value>",
    )
    .unwrap()
});
static CDATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static LD_COURSE_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ld_course_(\d+)$").unwrap());

#[derive(Debug, Clone, Default)]
pub struct ExportExtraction {
    pub items: Vec<RawExportItem>,
    pub courses: WpCourseTable,
}

/// 切出每個 item 的內文；未閉合的 item 在下一個 `<item>` 前截斷
fn item_blocks(document: &str) -> Vec<&str> {
    let starts: Vec<(usize, usize)> = ITEM_OPEN_RE
        .find_iter(document)
        .map(|m| (m.start(), m.end()))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let limit = starts
                .get(i + 1)
                .map(|&(next_start, _)| next_start)
                .unwrap_or(document.len());
            let body = &document[body_start..limit];
            body.find("</item>").map_or(body, |end| &body[..end])
        })
        .collect()
}

fn unwrap_cdata(value: &str) -> String {
    CDATA_RE.replace_all(value, "$1").into_owned()
}

fn field(re: &Regex, block: &str) -> Option<String> {
    re.captures(block).map(|caps| unwrap_cdata(&caps[1]))
}

fn parse_ref_id(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|id| *id > 0)
}

fn extract_item(block: &str) -> Option<RawExportItem> {
    let kind = EntityKind::from_post_type(&field(&POST_TYPE_RE, block)?)?;

    if field(&STATUS_RE, block).is_some_and(|status| status.trim() == "trash") {
        return None;
    }

    let raw_title = field(&TITLE_RE, block)?.trim().to_string();
    if raw_title.is_empty() {
        return None;
    }

    let wp_id = POST_ID_RE.captures(block)?[1].parse::<u64>().ok()?;
    let raw_content = field(&CONTENT_RE, block).unwrap_or_default();
    let menu_order = MENU_ORDER_RE
        .captures(block)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .unwrap_or(0);

    let mut course_ref_id = None;
    let mut ld_course_ref = None;
    let mut parent_module_ref_id = None;
    for caps in POSTMETA_RE.captures_iter(block) {
        let key = unwrap_cdata(&caps[1]);
        let value = unwrap_cdata(&caps[2]);
        match key.trim() {
            "course_id" => course_ref_id = course_ref_id.or(parse_ref_id(&value)),
            "lesson_id" if kind == EntityKind::Lesson => {
                parent_module_ref_id = parent_module_ref_id.or(parse_ref_id(&value))
            }
            other => {
                if let Some(key_caps) = LD_COURSE_KEY_RE.captures(other) {
                    ld_course_ref = ld_course_ref.or(parse_ref_id(&key_caps[1]));
                }
            }
        }
    }

    Some(RawExportItem {
        wp_id,
        kind,
        raw_title,
        raw_content,
        course_ref_id: course_ref_id.or(ld_course_ref),
        parent_module_ref_id,
        menu_order,
    })
}

/// 第一階段：掃描所有 item，同時建立課程 id → 標題對照表
pub fn extract_items(document: &str) -> ExportExtraction {
    let mut extraction = ExportExtraction::default();
    let mut dropped = 0usize;

    for block in item_blocks(document) {
        match extract_item(block) {
            Some(item) => {
                if item.kind == EntityKind::Course {
                    extraction
                        .courses
                        .insert(item.wp_id, clean_title(&item.raw_title));
                }
                extraction.items.push(item);
            }
            None => dropped += 1,
        }
    }

    tracing::debug!(
        "Extracted {} export items ({} skipped), {} courses",
        extraction.items.len(),
        dropped,
        extraction.courses.len()
    );
    extraction
}

fn clean_title(raw_title: &str) -> String {
    decode_entities(raw_title).trim().to_string()
}

/// 第二階段：解析參照並對每筆內容做正規化與媒體擷取
pub fn parse_export(document: &str) -> ParsedExport {
    let ExportExtraction { items, courses } = extract_items(document);

    // 課程、模組、單元在文件中的順序不固定，所以參照在這裡才解析
    let module_courses: HashMap<u64, Option<u64>> = items
        .iter()
        .filter(|item| item.kind == EntityKind::Module)
        .map(|item| (item.wp_id, item.course_ref_id))
        .collect();

    let mut parsed = ParsedExport {
        course_table: courses,
        ..ParsedExport::default()
    };

    for item in items {
        let title = clean_title(&item.raw_title);
        match item.kind {
            EntityKind::Course => parsed.courses.push(ParsedCourse {
                title,
                wp_id: item.wp_id,
                order: item.menu_order,
            }),
            EntityKind::Module => {
                let media = extract_media(&item.raw_content);
                parsed.modules.push(ParsedModule {
                    title,
                    wp_id: item.wp_id,
                    wp_course_id: item.course_ref_id,
                    formatted_description: normalize_content(&item.raw_content),
                    youtube_urls: media.youtube,
                    spotify_urls: media.spotify,
                    order: item.menu_order,
                });
            }
            EntityKind::Lesson => {
                let media = extract_media(&item.raw_content);
                // 單元自己的課程參照優先，缺少時才沿用所屬模組的課程
                let wp_course_id = item.course_ref_id.or_else(|| {
                    item.parent_module_ref_id
                        .and_then(|module_id| module_courses.get(&module_id).copied().flatten())
                });
                parsed.lessons.push(ParsedLesson {
                    title,
                    wp_id: item.wp_id,
                    wp_course_id,
                    wp_module_id: item.parent_module_ref_id,
                    formatted_content: normalize_content(&item.raw_content),
                    video_url: media.primary_video(),
                    soundslice_url: media.soundslice,
                    order: item.menu_order,
                });
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, post_type: &str, title: &str, content: &str, meta: &[(&str, &str)]) -> String {
        let meta: String = meta
            .iter()
            .map(|(k, v)| {
                format!(
                    "<wp:postmeta><wp:meta_key><![CDATA[{k}]]></wp:meta_key>\
                     <wp:meta_value><![CDATA[{v}]]></wp:meta_value></wp:postmeta>"
                )
            })
            .collect();
        format!(
            "<item><title><![CDATA[{title}]]></title>\
             <content:encoded><![CDATA[{content}]]></content:encoded>\
             <wp:post_id>{id}</wp:post_id><wp:menu_order>{id}</wp:menu_order>\
             <wp:status><![CDATA[publish]]></wp:status>\
             <wp:post_type><![CDATA[{post_type}]]></wp:post_type>{meta}</item>"
        )
    }

    fn channel(items: &[String]) -> String {
        format!("<rss><channel>{}</channel></rss>", items.join("\n"))
    }

    #[test]
    fn test_extract_keeps_three_kinds_only() {
        let doc = channel(&[
            item(10, "sfwd-courses", "Blues Guitar", "", &[]),
            item(11, "sfwd-lessons", "Intro", "", &[("course_id", "10")]),
            item(12, "sfwd-topic", "Turnarounds", "", &[("course_id", "10"), ("lesson_id", "11")]),
            item(13, "attachment", "cover.jpg", "", &[]),
            item(14, "sfwd-quiz", "Quiz 1", "", &[]),
        ]);
        let extraction = extract_items(&doc);
        assert_eq!(extraction.items.len(), 3);
        assert_eq!(extraction.courses.get(&10).map(String::as_str), Some("Blues Guitar"));

        let lesson = &extraction.items[2];
        assert_eq!(lesson.kind, EntityKind::Lesson);
        assert_eq!(lesson.course_ref_id, Some(10));
        assert_eq!(lesson.parent_module_ref_id, Some(11));
    }

    #[test]
    fn test_items_missing_required_fields_are_dropped() {
        let no_type = "<item><title>Orphan</title><wp:post_id>5</wp:post_id></item>".to_string();
        let doc = channel(&[
            item(1, "sfwd-lessons", "   ", "", &[]),
            no_type,
            "<item><title>Broken".to_string(),
            item(2, "sfwd-lessons", "Kept", "", &[]),
        ]);
        let extraction = extract_items(&doc);
        assert_eq!(extraction.items.len(), 1);
        assert_eq!(extraction.items[0].raw_title, "Kept");
    }

    #[test]
    fn test_trashed_items_are_ignored() {
        let trashed = item(3, "sfwd-lessons", "Old module", "", &[])
            .replace("publish", "trash");
        let extraction = extract_items(&channel(&[trashed]));
        assert!(extraction.items.is_empty());
    }

    #[test]
    fn test_ld_course_meta_key_fallback() {
        let doc = channel(&[item(20, "sfwd-lessons", "Rhythm", "", &[("ld_course_7", "7")])]);
        let extraction = extract_items(&doc);
        assert_eq!(extraction.items[0].course_ref_id, Some(7));
    }

    #[test]
    fn test_references_resolve_regardless_of_order() {
        // 單元出現在模組與課程之前，且單元本身沒有課程參照
        let doc = channel(&[
            item(32, "sfwd-topic", "Shuffle", "<p>Swing it.</p>", &[("lesson_id", "31")]),
            item(31, "sfwd-lessons", "Rhythm &amp; Feel", "", &[("course_id", "30")]),
            item(30, "sfwd-courses", "Blues Guitar", "", &[]),
        ]);
        let parsed = parse_export(&doc);
        assert_eq!(parsed.courses.len(), 1);
        assert_eq!(parsed.modules[0].title, "Rhythm & Feel");
        assert_eq!(parsed.lessons[0].wp_course_id, Some(30));
        assert_eq!(parsed.lessons[0].wp_module_id, Some(31));
        assert_eq!(parsed.lessons[0].formatted_content, "Swing it.");
        assert_eq!(parsed.course_title(parsed.lessons[0].wp_course_id), "Blues Guitar");
    }

    #[test]
    fn test_lesson_course_reference_beats_module_nesting() {
        let doc = channel(&[
            item(41, "sfwd-lessons", "Intro", "", &[("course_id", "40")]),
            item(42, "sfwd-topic", "Moved", "", &[("course_id", "50"), ("lesson_id", "41")]),
        ]);
        let parsed = parse_export(&doc);
        assert_eq!(parsed.lessons[0].wp_course_id, Some(50));
    }

    #[test]
    fn test_parse_export_captures_media_separately() {
        let content = r#"<p>Intro text.</p><iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe>
<iframe src="https://open.spotify.com/embed/album/1DFixLWuPkv3KT3TnV35m3"></iframe>"#;
        let doc = channel(&[item(60, "sfwd-lessons", "Listening", content, &[("course_id", "1")])]);
        let parsed = parse_export(&doc);
        let module = &parsed.modules[0];
        assert_eq!(module.formatted_description, "Intro text.");
        assert_eq!(module.youtube_urls, vec!["https://www.youtube.com/watch?v=dQw4w9WgXcQ"]);
        assert_eq!(module.spotify_urls, vec!["https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3"]);
        assert_eq!(module.order, 60);
    }
}
