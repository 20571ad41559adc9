use crate::app::rpc::ActionOutput;
use crate::domain::ports::Storage;
use crate::utils::error::{Result, SyncError};
use chrono::Utc;
use serde_json::json;

pub const PROPOSALS_FILE: &str = "proposed_updates.csv";

/// 將每次執行的結果寫到輸出目錄：`<action>_report.json`，同步時另附提案 CSV
pub struct ReportWriter<S: Storage> {
    storage: S,
    write_csv: bool,
}

impl<S: Storage> ReportWriter<S> {
    pub fn new(storage: S, write_csv: bool) -> Self {
        Self { storage, write_csv }
    }

    pub fn report_file(output: &ActionOutput) -> String {
        format!("{}_report.json", output.action().as_str().replace('-', "_"))
    }

    /// 回傳寫出的檔名
    pub async fn write(&self, output: &ActionOutput) -> Result<Vec<String>> {
        let mut written = Vec::new();

        let document = json!({
            "action": output.action().as_str(),
            "generatedAt": Utc::now().to_rfc3339(),
            "report": output.payload()?,
        });
        let report_file = Self::report_file(output);
        self.storage
            .write_file(&report_file, &serde_json::to_vec_pretty(&document)?)
            .await?;
        written.push(report_file);

        if let ActionOutput::Sync(outcome) = output {
            if self.write_csv {
                let mut writer = csv::Writer::from_writer(Vec::new());
                for proposal in &outcome.plan.proposals {
                    writer.serialize(proposal)?;
                }
                let data = writer
                    .into_inner()
                    .map_err(|e| SyncError::IoError(e.into_error()))?;
                self.storage.write_file(PROPOSALS_FILE, &data).await?;
                written.push(PROPOSALS_FILE.to_string());
            }
        }

        tracing::debug!("Wrote report files: {:?}", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::ReconcilePlan;
    use crate::core::sync::{AuditReport, SyncOutcome, SyncReport, WpCounts};
    use crate::core::matcher::UnmatchedSample;
    use crate::domain::model::{ProposedUpdate, UpdateField, UpdateTarget};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .ok_or_else(|| SyncError::IoError(std::io::ErrorKind::NotFound.into()))
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    fn sync_output() -> ActionOutput {
        let mut plan = ReconcilePlan::default();
        plan.proposals.push(ProposedUpdate {
            target: UpdateTarget::Lesson,
            id: "l-1".to_string(),
            title: "Turnarounds".to_string(),
            field: UpdateField::VideoUrl,
            value: "https://youtu.be/abc".to_string(),
        });
        ActionOutput::Sync(SyncOutcome {
            report: SyncReport {
                dry_run: true,
                wp: WpCounts::default(),
                courses_mapped: 0,
                module_updates_queued: 0,
                lesson_updates_queued: 1,
                lesson_video_fills: 1,
                lesson_content_fills: 0,
                modules_written: 0,
                lessons_written: 0,
                unmatched_courses: vec![],
                unmatched_modules: UnmatchedSample::default(),
                unmatched_lessons: UnmatchedSample::default(),
                sample_updates: vec![],
            },
            plan,
        })
    }

    #[tokio::test]
    async fn test_sync_writes_report_and_csv() {
        let storage = MockStorage::default();
        let writer = ReportWriter::new(storage.clone(), true);

        let files = writer.write(&sync_output()).await.unwrap();
        assert_eq!(files, vec!["sync_content_report.json", PROPOSALS_FILE]);

        let csv = String::from_utf8(storage.read_file(PROPOSALS_FILE).await.unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("target,id,title,field,value"));
        assert_eq!(
            lines.next(),
            Some("lesson,l-1,Turnarounds,video_url,https://youtu.be/abc")
        );

        let report: serde_json::Value = serde_json::from_slice(
            &storage.read_file("sync_content_report.json").await.unwrap(),
        )
        .unwrap();
        assert_eq!(report["action"], "sync-content");
        assert_eq!(report["report"]["lessonVideoFills"], 1);
    }

    #[tokio::test]
    async fn test_csv_can_be_disabled() {
        let writer = ReportWriter::new(MockStorage::default(), false);
        let files = writer.write(&sync_output()).await.unwrap();
        assert_eq!(files, vec!["sync_content_report.json"]);
    }

    #[tokio::test]
    async fn test_audit_has_no_csv() {
        let output = ActionOutput::Audit(AuditReport {
            total_courses: 0,
            total_modules: 0,
            total_lessons: 0,
            empty_module_count: 0,
            courses: vec![],
        });
        let files = ReportWriter::new(MockStorage::default(), true)
            .write(&output)
            .await
            .unwrap();
        assert_eq!(files, vec!["audit_report.json"]);
    }
}
