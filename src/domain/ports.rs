use crate::domain::model::{DbCourse, DbLesson, DbModule, LessonPatch, ModulePatch};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 課程資料的關聯式儲存；只有讀取與以 id 為鍵的 upsert
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch_courses(&self) -> Result<Vec<DbCourse>>;
    async fn fetch_modules(&self) -> Result<Vec<DbModule>>;
    async fn fetch_lessons(&self) -> Result<Vec<DbLesson>>;

    /// 回傳實際寫入的列數
    async fn upsert_modules(&self, patches: &[ModulePatch]) -> Result<usize>;
    async fn upsert_lessons(&self, patches: &[LessonPatch]) -> Result<usize>;
}

/// 讓執行期才決定的儲存後端（`Box<dyn ContentStore>`）也能交給引擎
#[async_trait]
impl<T: ContentStore + ?Sized> ContentStore for Box<T> {
    async fn fetch_courses(&self) -> Result<Vec<DbCourse>> {
        (**self).fetch_courses().await
    }

    async fn fetch_modules(&self) -> Result<Vec<DbModule>> {
        (**self).fetch_modules().await
    }

    async fn fetch_lessons(&self) -> Result<Vec<DbLesson>> {
        (**self).fetch_lessons().await
    }

    async fn upsert_modules(&self, patches: &[ModulePatch]) -> Result<usize> {
        (**self).upsert_modules(patches).await
    }

    async fn upsert_lessons(&self, patches: &[LessonPatch]) -> Result<usize> {
        (**self).upsert_lessons(patches).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub module_source_floor: usize,
    pub module_existing_floor: usize,
    pub lesson_source_floor: usize,
    pub lesson_existing_floor: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            module_source_floor: 20,
            module_existing_floor: 50,
            lesson_source_floor: 20,
            lesson_existing_floor: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLimits {
    pub unmatched_sample: usize,
    pub update_sample: usize,
    pub course_sample: usize,
    pub modules_per_course: usize,
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            unmatched_sample: 30,
            update_sample: 5,
            course_sample: 10,
            modules_per_course: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSettings {
    pub thresholds: Thresholds,
    pub limits: ReportLimits,
}

pub trait ConfigProvider: Send + Sync {
    fn settings(&self) -> SyncSettings;
    fn output_path(&self) -> &str;
}
