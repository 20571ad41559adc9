//! 三層身分比對：課程用子字串、模組與單元用 (課程, 正規化標題) 精確比對。
//!
//! 所有查找表都是單次執行的值，由呼叫端依序傳入各階段。

use crate::core::normalize::decode_entities;
use crate::domain::model::{DbCourse, DbLesson, DbModule, DbSnapshot, ParsedExport, ParsedLesson, ParsedModule};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
// 例如 "The Blues – 3.05"、"Shuffle - 12:30"
static TIMECODE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[-–—]\s*\d{1,2}[.:]\d{2}$").unwrap());

pub fn normalize_title(title: &str) -> String {
    let decoded = decode_entities(title).to_lowercase();
    let collapsed = WHITESPACE_RE.replace_all(decoded.trim(), " ");
    TIMECODE_SUFFIX_RE.replace(&collapsed, "").trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseMatch {
    pub wp_course_id: u64,
    pub wp_title: String,
    pub db_course_id: String,
    pub db_title: String,
}

/// wp course id → 對應的資料庫課程
pub type CourseMap = HashMap<u64, CourseMatch>;

/// (db course id, 正規化標題) → db id
pub type ScopedTitleIndex = HashMap<(String, String), String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnmatchedSample {
    pub total: usize,
    pub sample: Vec<String>,
}

impl UnmatchedSample {
    fn record(&mut self, path: String, cap: usize) {
        self.total += 1;
        if self.sample.len() < cap {
            self.sample.push(path);
        }
    }
}

#[derive(Debug, Clone)]
pub struct MatchedModule<'a> {
    pub parsed: &'a ParsedModule,
    pub db_module_id: String,
}

#[derive(Debug, Clone)]
pub struct MatchedLesson<'a> {
    pub parsed: &'a ParsedLesson,
    pub db_lesson_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome<'a> {
    pub courses: CourseMap,
    pub unmatched_courses: Vec<String>,
    pub modules: Vec<MatchedModule<'a>>,
    pub lessons: Vec<MatchedLesson<'a>>,
    pub unmatched_modules: UnmatchedSample,
    pub unmatched_lessons: UnmatchedSample,
}

/// 課程層：任一方的正規化標題包含另一方即成立，第一個符合者勝出
pub fn match_courses(parsed: &ParsedExport, db_courses: &[DbCourse]) -> (CourseMap, Vec<String>) {
    let db_normalized: Vec<(&DbCourse, String)> = db_courses
        .iter()
        .map(|course| (course, normalize_title(&course.title)))
        .filter(|(_, normalized)| !normalized.is_empty())
        .collect();

    let mut map = CourseMap::new();
    let mut unmatched = Vec::new();

    for wp_course in &parsed.courses {
        let wp_normalized = normalize_title(&wp_course.title);
        let hit = if wp_normalized.is_empty() {
            None
        } else {
            db_normalized.iter().find(|(_, db_title)| {
                db_title.contains(wp_normalized.as_str()) || wp_normalized.contains(db_title.as_str())
            })
        };

        match hit {
            Some((db_course, _)) => {
                tracing::debug!("Course '{}' → '{}'", wp_course.title, db_course.title);
                map.insert(
                    wp_course.wp_id,
                    CourseMatch {
                        wp_course_id: wp_course.wp_id,
                        wp_title: wp_course.title.clone(),
                        db_course_id: db_course.id.clone(),
                        db_title: db_course.title.clone(),
                    },
                );
            }
            None => {
                tracing::debug!("Course '{}' has no match", wp_course.title);
                unmatched.push(wp_course.title.clone());
            }
        }
    }

    (map, unmatched)
}

pub fn build_module_index(modules: &[DbModule]) -> ScopedTitleIndex {
    let mut index = ScopedTitleIndex::new();
    for module in modules {
        index
            .entry((module.course_id.clone(), normalize_title(&module.title)))
            .or_insert_with(|| module.id.clone());
    }
    index
}

/// 資料庫的單元只記錄 module_id，先經由模組換算出課程
pub fn build_lesson_index(modules: &[DbModule], lessons: &[DbLesson]) -> ScopedTitleIndex {
    let module_course: HashMap<&str, &str> = modules
        .iter()
        .map(|module| (module.id.as_str(), module.course_id.as_str()))
        .collect();

    let mut index = ScopedTitleIndex::new();
    for lesson in lessons {
        let Some(course_id) = module_course.get(lesson.module_id.as_str()) else {
            continue;
        };
        index
            .entry((course_id.to_string(), normalize_title(&lesson.title)))
            .or_insert_with(|| lesson.id.clone());
    }
    index
}

fn lookup(index: &ScopedTitleIndex, course: Option<&CourseMatch>, title: &str) -> Option<String> {
    let course = course?;
    index
        .get(&(course.db_course_id.clone(), normalize_title(title)))
        .cloned()
}

pub fn match_all<'a>(
    parsed: &'a ParsedExport,
    snapshot: &DbSnapshot,
    unmatched_cap: usize,
) -> MatchOutcome<'a> {
    let (courses, unmatched_courses) = match_courses(parsed, &snapshot.courses);
    let module_index = build_module_index(&snapshot.modules);
    let lesson_index = build_lesson_index(&snapshot.modules, &snapshot.lessons);

    let mut outcome = MatchOutcome {
        courses,
        unmatched_courses,
        ..MatchOutcome::default()
    };

    // 課程未對應時，底下所有模組與單元一律視為未對應
    for module in &parsed.modules {
        let course = module.wp_course_id.and_then(|id| outcome.courses.get(&id));
        match lookup(&module_index, course, &module.title) {
            Some(db_module_id) => outcome.modules.push(MatchedModule {
                parsed: module,
                db_module_id,
            }),
            None => {
                let path = format!("{} > {}", parsed.course_title(module.wp_course_id), module.title);
                tracing::debug!("Unmatched module: {}", path);
                outcome.unmatched_modules.record(path, unmatched_cap);
            }
        }
    }

    let module_titles: HashMap<u64, &str> = parsed
        .modules
        .iter()
        .map(|module| (module.wp_id, module.title.as_str()))
        .collect();

    for lesson in &parsed.lessons {
        let course = lesson.wp_course_id.and_then(|id| outcome.courses.get(&id));
        match lookup(&lesson_index, course, &lesson.title) {
            Some(db_lesson_id) => outcome.lessons.push(MatchedLesson {
                parsed: lesson,
                db_lesson_id,
            }),
            None => {
                let course_title = parsed.course_title(lesson.wp_course_id);
                let path = match lesson.wp_module_id.and_then(|id| module_titles.get(&id)) {
                    Some(module_title) => {
                        format!("{} > {} > {}", course_title, module_title, lesson.title)
                    }
                    None => format!("{} > {}", course_title, lesson.title),
                };
                tracing::debug!("Unmatched lesson: {}", path);
                outcome.unmatched_lessons.record(path, unmatched_cap);
            }
        }
    }

    outcome
}
