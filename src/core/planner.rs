//! 差異規劃：只填補空白或過短的欄位，絕不覆寫已有的內容。

use crate::core::matcher::MatchOutcome;
use crate::domain::model::{
    DbLesson, DbModule, DbSnapshot, LessonPatch, ModulePatch, ParsedModule, ProposedUpdate,
    UpdateField, UpdateTarget,
};
use crate::domain::ports::Thresholds;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub module_patches: Vec<ModulePatch>,
    pub lesson_patches: Vec<LessonPatch>,
    pub proposals: Vec<ProposedUpdate>,
    pub lesson_video_fills: usize,
    pub lesson_content_fills: usize,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.module_patches.is_empty() && self.lesson_patches.is_empty()
    }
}

fn char_len(value: Option<&str>) -> usize {
    value.map(|v| v.trim().chars().count()).unwrap_or(0)
}

fn same_text(current: Option<&str>, proposed: &str) -> bool {
    current.is_some_and(|c| c.trim() == proposed.trim())
}

/// 描述文字後面附上擷取到的媒體網址，避免內嵌播放器被移除後遺失
pub fn compose_module_description(module: &ParsedModule) -> String {
    let mut value = module.formatted_description.trim().to_string();
    let media: Vec<&str> = module
        .youtube_urls
        .iter()
        .chain(module.spotify_urls.iter())
        .map(String::as_str)
        .collect();
    if !media.is_empty() {
        value.push_str("\n\n");
        value.push_str(&media.join("\n"));
    }
    value
}

fn plan_module(module: &ParsedModule, current: &DbModule, thresholds: &Thresholds) -> Option<ModulePatch> {
    if char_len(Some(&module.formatted_description)) <= thresholds.module_source_floor {
        return None;
    }
    let existing = current.description.as_deref();
    if char_len(existing) >= thresholds.module_existing_floor {
        return None;
    }

    let description = compose_module_description(module);
    if same_text(existing, &description) {
        return None;
    }

    Some(ModulePatch {
        id: current.id.clone(),
        course_id: current.course_id.clone(),
        title: current.title.clone(),
        description,
    })
}

fn plan_lesson(
    video_url: Option<&str>,
    content: &str,
    current: &DbLesson,
    thresholds: &Thresholds,
) -> Option<LessonPatch> {
    let existing_video = current.video_url.as_deref();
    let video_fill = match video_url {
        Some(url) if char_len(existing_video) == 0 && !same_text(existing_video, url) => {
            Some(url.to_string())
        }
        _ => None,
    };

    let existing_content = current.content.as_deref();
    let content_fill = (char_len(Some(content)) > thresholds.lesson_source_floor
        && char_len(existing_content) < thresholds.lesson_existing_floor
        && !same_text(existing_content, content))
    .then(|| content.trim().to_string());

    if video_fill.is_none() && content_fill.is_none() {
        return None;
    }

    Some(LessonPatch {
        id: current.id.clone(),
        module_id: current.module_id.clone(),
        title: current.title.clone(),
        content: content_fill,
        video_url: video_fill,
    })
}

/// 對每個已對應的實體決定要補哪些欄位。同一個 db id 每次執行最多只補一次。
pub fn plan_updates(outcome: &MatchOutcome<'_>, snapshot: &DbSnapshot, thresholds: &Thresholds) -> ReconcilePlan {
    let modules_by_id: HashMap<&str, &DbModule> = snapshot
        .modules
        .iter()
        .map(|module| (module.id.as_str(), module))
        .collect();
    let lessons_by_id: HashMap<&str, &DbLesson> = snapshot
        .lessons
        .iter()
        .map(|lesson| (lesson.id.as_str(), lesson))
        .collect();

    let mut plan = ReconcilePlan::default();
    let mut seen_modules = HashSet::new();
    let mut seen_lessons = HashSet::new();

    for matched in &outcome.modules {
        let Some(current) = modules_by_id.get(matched.db_module_id.as_str()) else {
            continue;
        };
        if !seen_modules.insert(current.id.as_str()) {
            continue;
        }
        if let Some(patch) = plan_module(matched.parsed, current, thresholds) {
            tracing::debug!("Module '{}' ({}) description fill queued", current.title, current.id);
            plan.proposals.push(ProposedUpdate {
                target: UpdateTarget::Module,
                id: patch.id.clone(),
                title: patch.title.clone(),
                field: UpdateField::Description,
                value: patch.description.clone(),
            });
            plan.module_patches.push(patch);
        }
    }

    for matched in &outcome.lessons {
        let Some(current) = lessons_by_id.get(matched.db_lesson_id.as_str()) else {
            continue;
        };
        if !seen_lessons.insert(current.id.as_str()) {
            continue;
        }
        let parsed = matched.parsed;
        let Some(patch) = plan_lesson(
            parsed.video_url.as_deref(),
            &parsed.formatted_content,
            current,
            thresholds,
        ) else {
            continue;
        };

        if let Some(video_url) = &patch.video_url {
            plan.lesson_video_fills += 1;
            plan.proposals.push(ProposedUpdate {
                target: UpdateTarget::Lesson,
                id: patch.id.clone(),
                title: patch.title.clone(),
                field: UpdateField::VideoUrl,
                value: video_url.clone(),
            });
        }
        if let Some(content) = &patch.content {
            plan.lesson_content_fills += 1;
            plan.proposals.push(ProposedUpdate {
                target: UpdateTarget::Lesson,
                id: patch.id.clone(),
                title: patch.title.clone(),
                field: UpdateField::Content,
                value: content.clone(),
            });
        }
        tracing::debug!(
            "Lesson '{}' ({}) fill queued: video_url={}, content={}",
            current.title,
            current.id,
            patch.video_url.is_some(),
            patch.content.is_some()
        );
        plan.lesson_patches.push(patch);
    }

    plan
}
