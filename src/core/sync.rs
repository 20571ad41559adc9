use crate::core::extract::parse_export;
use crate::core::matcher::{match_all, UnmatchedSample};
use crate::core::planner::{plan_updates, ReconcilePlan};
use crate::domain::model::{DbSnapshot, ParsedExport, ProposedUpdate, UpdateField, UpdateTarget};
use crate::domain::ports::{ContentStore, SyncSettings};
use crate::utils::error::Result;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyModule {
    pub id: String,
    pub title: String,
    pub course_title: String,
    pub has_description: bool,
    pub order_index: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditCourseGroup {
    pub course_id: String,
    pub course_title: String,
    pub empty_module_count: usize,
    pub modules: Vec<EmptyModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub total_courses: usize,
    pub total_modules: usize,
    pub total_lessons: usize,
    pub empty_module_count: usize,
    pub courses: Vec<AuditCourseGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseTotals {
    pub courses: usize,
    pub modules: usize,
    pub lessons: usize,
    pub modules_with_description: usize,
    pub modules_with_media: usize,
    pub lessons_with_content: usize,
    pub lessons_with_video: usize,
    pub lessons_with_soundslice: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSample {
    pub wp_id: u64,
    pub title: String,
    pub description_length: usize,
    pub youtube_count: usize,
    pub spotify_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSample {
    pub wp_id: u64,
    pub title: String,
    pub module_count: usize,
    pub lesson_count: usize,
    pub modules: Vec<ModuleSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub totals: ParseTotals,
    pub courses: Vec<CourseSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WpCounts {
    pub courses: usize,
    pub modules: usize,
    pub lessons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreview {
    pub target: UpdateTarget,
    pub id: String,
    pub title: String,
    pub field: UpdateField,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub dry_run: bool,
    pub wp: WpCounts,
    pub courses_mapped: usize,
    pub module_updates_queued: usize,
    pub lesson_updates_queued: usize,
    pub lesson_video_fills: usize,
    pub lesson_content_fills: usize,
    pub modules_written: usize,
    pub lessons_written: usize,
    pub unmatched_courses: Vec<String>,
    pub unmatched_modules: UnmatchedSample,
    pub unmatched_lessons: UnmatchedSample,
    pub sample_updates: Vec<UpdatePreview>,
}

#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub report: SyncReport,
    pub plan: ReconcilePlan,
}

fn preview(value: &str) -> String {
    if value.chars().count() <= PREVIEW_CHARS {
        value.to_string()
    } else {
        let truncated: String = value.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", truncated)
    }
}

fn sample_updates(proposals: &[ProposedUpdate], limit: usize) -> Vec<UpdatePreview> {
    proposals
        .iter()
        .take(limit)
        .map(|update| UpdatePreview {
            target: update.target,
            id: update.id.clone(),
            title: update.title.clone(),
            field: update.field,
            preview: preview(&update.value),
        })
        .collect()
}

pub struct SyncEngine<S: ContentStore> {
    store: S,
    settings: SyncSettings,
}

impl<S: ContentStore> SyncEngine<S> {
    pub fn new(store: S, settings: SyncSettings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// 三個讀取彼此獨立，同時送出
    pub async fn load_snapshot(&self) -> Result<DbSnapshot> {
        let (courses, modules, lessons) = tokio::try_join!(
            self.store.fetch_courses(),
            self.store.fetch_modules(),
            self.store.fetch_lessons()
        )?;
        tracing::info!(
            "📥 Loaded {} courses, {} modules, {} lessons from store",
            courses.len(),
            modules.len(),
            lessons.len()
        );
        Ok(DbSnapshot {
            courses,
            modules,
            lessons,
        })
    }

    /// 找出沒有任何單元的模組，依課程分組，最嚴重的課程排前面
    pub async fn audit(&self) -> Result<AuditReport> {
        tracing::info!("🔍 Auditing modules without lessons");
        let snapshot = self.load_snapshot().await?;

        let populated: HashSet<&str> = snapshot
            .lessons
            .iter()
            .map(|lesson| lesson.module_id.as_str())
            .collect();
        let course_titles: HashMap<&str, &str> = snapshot
            .courses
            .iter()
            .map(|course| (course.id.as_str(), course.title.as_str()))
            .collect();

        let mut groups: HashMap<&str, Vec<EmptyModule>> = HashMap::new();
        for module in &snapshot.modules {
            if populated.contains(module.id.as_str()) {
                continue;
            }
            let course_title = course_titles
                .get(module.course_id.as_str())
                .copied()
                .unwrap_or("(unknown course)");
            groups
                .entry(module.course_id.as_str())
                .or_default()
                .push(EmptyModule {
                    id: module.id.clone(),
                    title: module.title.clone(),
                    course_title: course_title.to_string(),
                    has_description: module
                        .description
                        .as_deref()
                        .is_some_and(|d| !d.trim().is_empty()),
                    order_index: module.order_index,
                });
        }

        let mut courses: Vec<AuditCourseGroup> = groups
            .into_iter()
            .map(|(course_id, mut modules)| {
                modules.sort_by_key(|module| module.order_index);
                AuditCourseGroup {
                    course_id: course_id.to_string(),
                    course_title: modules[0].course_title.clone(),
                    empty_module_count: modules.len(),
                    modules,
                }
            })
            .collect();
        courses.sort_by(|a, b| {
            b.empty_module_count
                .cmp(&a.empty_module_count)
                .then_with(|| a.course_title.cmp(&b.course_title))
        });

        let empty_module_count = courses.iter().map(|group| group.empty_module_count).sum();
        tracing::info!(
            "📊 {} empty modules across {} courses",
            empty_module_count,
            courses.len()
        );

        Ok(AuditReport {
            total_courses: snapshot.courses.len(),
            total_modules: snapshot.modules.len(),
            total_lessons: snapshot.lessons.len(),
            empty_module_count,
            courses,
        })
    }

    /// 只解析匯出文件，不碰資料庫
    pub fn parse_xml(&self, xml: &str) -> ParseReport {
        let parsed = parse_export(xml);
        tracing::info!(
            "📄 Parsed export: {} courses, {} modules, {} lessons",
            parsed.courses.len(),
            parsed.modules.len(),
            parsed.lessons.len()
        );
        summarize_export(&parsed, &self.settings)
    }

    pub async fn sync_content(&self, xml: &str, dry_run: bool) -> Result<SyncOutcome> {
        tracing::info!(
            "🚀 Starting content sync ({})",
            if dry_run { "dry run" } else { "apply" }
        );

        let parsed = parse_export(xml);
        let snapshot = self.load_snapshot().await?;

        let outcome = match_all(&parsed, &snapshot, self.settings.limits.unmatched_sample);
        tracing::info!(
            "🔗 Mapped {}/{} courses, {} modules, {} lessons",
            outcome.courses.len(),
            parsed.courses.len(),
            outcome.modules.len(),
            outcome.lessons.len()
        );

        let plan = plan_updates(&outcome, &snapshot, &self.settings.thresholds);
        tracing::info!(
            "📝 Queued {} module updates, {} lesson updates",
            plan.module_patches.len(),
            plan.lesson_patches.len()
        );

        let (modules_written, lessons_written) = if dry_run {
            (0, 0)
        } else {
            self.apply(&plan).await?
        };

        let report = SyncReport {
            dry_run,
            wp: WpCounts {
                courses: parsed.courses.len(),
                modules: parsed.modules.len(),
                lessons: parsed.lessons.len(),
            },
            courses_mapped: outcome.courses.len(),
            module_updates_queued: plan.module_patches.len(),
            lesson_updates_queued: plan.lesson_patches.len(),
            lesson_video_fills: plan.lesson_video_fills,
            lesson_content_fills: plan.lesson_content_fills,
            modules_written,
            lessons_written,
            unmatched_courses: outcome.unmatched_courses.clone(),
            unmatched_modules: outcome.unmatched_modules.clone(),
            unmatched_lessons: outcome.unmatched_lessons.clone(),
            sample_updates: sample_updates(&plan.proposals, self.settings.limits.update_sample),
        };

        Ok(SyncOutcome { report, plan })
    }

    /// 模組與單元的 upsert 互不相依；中途失敗時下次執行會重新計算差異
    async fn apply(&self, plan: &ReconcilePlan) -> Result<(usize, usize)> {
        let written = tokio::try_join!(
            async {
                if plan.module_patches.is_empty() {
                    Ok(0)
                } else {
                    self.store.upsert_modules(&plan.module_patches).await
                }
            },
            async {
                if plan.lesson_patches.is_empty() {
                    Ok(0)
                } else {
                    self.store.upsert_lessons(&plan.lesson_patches).await
                }
            }
        )?;
        tracing::info!("💾 Wrote {} modules, {} lessons", written.0, written.1);
        Ok(written)
    }
}

fn summarize_export(parsed: &ParsedExport, settings: &SyncSettings) -> ParseReport {
    let totals = ParseTotals {
        courses: parsed.courses.len(),
        modules: parsed.modules.len(),
        lessons: parsed.lessons.len(),
        modules_with_description: parsed
            .modules
            .iter()
            .filter(|m| !m.formatted_description.is_empty())
            .count(),
        modules_with_media: parsed
            .modules
            .iter()
            .filter(|m| !m.youtube_urls.is_empty() || !m.spotify_urls.is_empty())
            .count(),
        lessons_with_content: parsed
            .lessons
            .iter()
            .filter(|l| !l.formatted_content.is_empty())
            .count(),
        lessons_with_video: parsed.lessons.iter().filter(|l| l.video_url.is_some()).count(),
        lessons_with_soundslice: parsed
            .lessons
            .iter()
            .filter(|l| l.soundslice_url.is_some())
            .count(),
    };

    let courses = parsed
        .courses
        .iter()
        .take(settings.limits.course_sample)
        .map(|course| {
            let modules: Vec<_> = parsed
                .modules
                .iter()
                .filter(|m| m.wp_course_id == Some(course.wp_id))
                .collect();
            CourseSample {
                wp_id: course.wp_id,
                title: course.title.clone(),
                module_count: modules.len(),
                lesson_count: parsed
                    .lessons
                    .iter()
                    .filter(|l| l.wp_course_id == Some(course.wp_id))
                    .count(),
                modules: modules
                    .iter()
                    .take(settings.limits.modules_per_course)
                    .map(|m| ModuleSample {
                        wp_id: m.wp_id,
                        title: m.title.clone(),
                        description_length: m.formatted_description.chars().count(),
                        youtube_count: m.youtube_urls.len(),
                        spotify_count: m.spotify_urls.len(),
                    })
                    .collect(),
            }
        })
        .collect();

    ParseReport { totals, courses }
}
