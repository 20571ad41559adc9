use crate::domain::model::{DbCourse, DbLesson, DbModule, DbSnapshot, LessonPatch, ModulePatch};
use crate::domain::ports::{ContentStore, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// 以記憶體快照實作的儲存；可從 JSON 檔載入並寫回
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Arc<Mutex<DbSnapshot>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new(snapshot: DbSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        let data = storage.read_file(path).await?;
        let snapshot: DbSnapshot = serde_json::from_slice(&data)?;
        tracing::debug!(
            "Loaded snapshot {} ({} courses, {} modules, {} lessons)",
            path,
            snapshot.courses.len(),
            snapshot.modules.len(),
            snapshot.lessons.len()
        );
        Ok(Self::new(snapshot))
    }

    pub async fn persist<S: Storage>(&self, storage: &S, path: &str) -> Result<()> {
        let snapshot = self.snapshot.lock().await;
        let json = serde_json::to_vec_pretty(&*snapshot)?;
        storage.write_file(path, &json).await
    }

    pub async fn snapshot(&self) -> DbSnapshot {
        self.snapshot.lock().await.clone()
    }

    /// 累計寫入的列數
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch_courses(&self) -> Result<Vec<DbCourse>> {
        Ok(self.snapshot.lock().await.courses.clone())
    }

    async fn fetch_modules(&self) -> Result<Vec<DbModule>> {
        Ok(self.snapshot.lock().await.modules.clone())
    }

    async fn fetch_lessons(&self) -> Result<Vec<DbLesson>> {
        Ok(self.snapshot.lock().await.lessons.clone())
    }

    async fn upsert_modules(&self, patches: &[ModulePatch]) -> Result<usize> {
        let mut snapshot = self.snapshot.lock().await;
        for patch in patches {
            match snapshot.modules.iter_mut().find(|m| m.id == patch.id) {
                Some(module) => {
                    module.course_id = patch.course_id.clone();
                    module.title = patch.title.clone();
                    module.description = Some(patch.description.clone());
                }
                None => snapshot.modules.push(DbModule {
                    id: patch.id.clone(),
                    course_id: patch.course_id.clone(),
                    title: patch.title.clone(),
                    description: Some(patch.description.clone()),
                    order_index: 0,
                }),
            }
        }
        self.writes.fetch_add(patches.len(), Ordering::SeqCst);
        Ok(patches.len())
    }

    async fn upsert_lessons(&self, patches: &[LessonPatch]) -> Result<usize> {
        let mut snapshot = self.snapshot.lock().await;
        for patch in patches {
            match snapshot.lessons.iter_mut().find(|l| l.id == patch.id) {
                Some(lesson) => {
                    lesson.module_id = patch.module_id.clone();
                    lesson.title = patch.title.clone();
                    if let Some(content) = &patch.content {
                        lesson.content = Some(content.clone());
                    }
                    if let Some(video_url) = &patch.video_url {
                        lesson.video_url = Some(video_url.clone());
                    }
                }
                None => snapshot.lessons.push(DbLesson {
                    id: patch.id.clone(),
                    module_id: patch.module_id.clone(),
                    title: patch.title.clone(),
                    content: patch.content.clone(),
                    video_url: patch.video_url.clone(),
                }),
            }
        }
        self.writes.fetch_add(patches.len(), Ordering::SeqCst);
        Ok(patches.len())
    }
}
