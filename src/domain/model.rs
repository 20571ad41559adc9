use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 匯出文件中保留的三種實體
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Course,
    Module,
    Lesson,
}

impl EntityKind {
    /// LearnDash 的 lesson/topic 在現行 schema 中對應 module/lesson
    pub fn from_post_type(post_type: &str) -> Option<Self> {
        match post_type.trim() {
            "sfwd-courses" | "course" => Some(Self::Course),
            "sfwd-lessons" | "module" => Some(Self::Module),
            "sfwd-topic" | "lesson" => Some(Self::Lesson),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawExportItem {
    pub wp_id: u64,
    pub kind: EntityKind,
    pub raw_title: String,
    pub raw_content: String,
    pub course_ref_id: Option<u64>,
    pub parent_module_ref_id: Option<u64>,
    pub menu_order: i64,
}

/// wp course id → 課程標題
pub type WpCourseTable = HashMap<u64, String>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCourse {
    pub title: String,
    pub wp_id: u64,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedModule {
    pub title: String,
    pub wp_id: u64,
    pub wp_course_id: Option<u64>,
    pub formatted_description: String,
    pub youtube_urls: Vec<String>,
    pub spotify_urls: Vec<String>,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedLesson {
    pub title: String,
    pub wp_id: u64,
    pub wp_course_id: Option<u64>,
    pub wp_module_id: Option<u64>,
    pub formatted_content: String,
    pub video_url: Option<String>,
    pub soundslice_url: Option<String>,
    pub order: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedExport {
    pub course_table: WpCourseTable,
    pub courses: Vec<ParsedCourse>,
    pub modules: Vec<ParsedModule>,
    pub lessons: Vec<ParsedLesson>,
}

impl ParsedExport {
    pub fn course_title(&self, wp_course_id: Option<u64>) -> &str {
        wp_course_id
            .and_then(|id| self.course_table.get(&id))
            .map(String::as_str)
            .unwrap_or("(no course)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbCourse {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbModule {
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbLesson {
    pub id: String,
    pub module_id: String,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}

/// 單次執行讀入的資料庫快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DbSnapshot {
    #[serde(default)]
    pub courses: Vec<DbCourse>,
    #[serde(default)]
    pub modules: Vec<DbModule>,
    #[serde(default)]
    pub lessons: Vec<DbLesson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateTarget {
    Module,
    Lesson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateField {
    Description,
    Content,
    VideoUrl,
}

impl UpdateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Content => "content",
            Self::VideoUrl => "video_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedUpdate {
    pub target: UpdateTarget,
    pub id: String,
    pub title: String,
    pub field: UpdateField,
    pub value: String,
}

/// modules 表的 upsert 列；course_id/title 沿用現值，只有 description 是新值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulePatch {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPatch {
    pub id: String,
    pub module_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}
