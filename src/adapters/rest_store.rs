//! PostgREST 相容的 HTTP 儲存（例如 Supabase 的 `/rest/v1`）。

use crate::domain::model::{DbCourse, DbLesson, DbModule, LessonPatch, ModulePatch};
use crate::domain::ports::ContentStore;
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const PAGE_SIZE: usize = 1000;

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    pub fn with_timeout(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }

    async fn check(response: Response, table: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::store(format!("{} on {}: {}", status, table, body.trim())))
    }

    /// 逐頁讀取，直到某頁少於 PAGE_SIZE 筆
    async fn select<T: DeserializeOwned + Send>(&self, table: &str, columns: &str) -> Result<Vec<T>> {
        let mut rows = Vec::new();
        loop {
            tracing::debug!("GET {} offset={}", table, rows.len());
            let response = self
                .client
                .get(self.table_url(table))
                .query(&[
                    ("select", columns.to_string()),
                    ("order", "id".to_string()),
                    ("limit", PAGE_SIZE.to_string()),
                    ("offset", rows.len().to_string()),
                ])
                .header("apikey", &self.api_key)
                .bearer_auth(&self.api_key)
                .send()
                .await?;

            let page: Vec<T> = Self::check(response, table).await?.json().await?;
            let page_len = page.len();
            rows.extend(page);
            if page_len < PAGE_SIZE {
                return Ok(rows);
            }
        }
    }

    async fn upsert<T: Serialize + Sync>(&self, table: &str, rows: &[T]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        tracing::debug!("POST {} upsert of {} rows", table, rows.len());
        let response = self
            .client
            .post(self.table_url(table))
            .query(&[("on_conflict", "id")])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(response, table).await?;
        Ok(rows.len())
    }
}

#[async_trait]
impl ContentStore for RestStore {
    async fn fetch_courses(&self) -> Result<Vec<DbCourse>> {
        self.select("courses", "id,title").await
    }

    async fn fetch_modules(&self) -> Result<Vec<DbModule>> {
        self.select("modules", "id,course_id,title,description,order_index")
            .await
    }

    async fn fetch_lessons(&self) -> Result<Vec<DbLesson>> {
        self.select("lessons", "id,module_id,title,content,video_url")
            .await
    }

    async fn upsert_modules(&self, patches: &[ModulePatch]) -> Result<usize> {
        self.upsert("modules", patches).await
    }

    /// 批次內每列的欄位必須一致，所以依欄位組合分批送出
    async fn upsert_lessons(&self, patches: &[LessonPatch]) -> Result<usize> {
        let both: Vec<&LessonPatch> = patches
            .iter()
            .filter(|p| p.content.is_some() && p.video_url.is_some())
            .collect();
        let content_only: Vec<&LessonPatch> = patches
            .iter()
            .filter(|p| p.content.is_some() && p.video_url.is_none())
            .collect();
        let video_only: Vec<&LessonPatch> = patches
            .iter()
            .filter(|p| p.content.is_none() && p.video_url.is_some())
            .collect();

        let mut written = 0;
        for batch in [both, content_only, video_only] {
            written += self.upsert("lessons", &batch).await?;
        }
        Ok(written)
    }
}
