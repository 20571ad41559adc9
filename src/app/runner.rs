//! 命令列流程：設定 → 開啟儲存 → 執行 → 寫報表 → 快照存回。

use crate::adapters::{LocalStorage, MemoryStore, RestStore};
use crate::app::report::ReportWriter;
use crate::app::rpc::{execute, ActionOutput, RpcRequest, SyncAction};
use crate::config::{StoreKind, SyncConfig};
use crate::core::sync::SyncEngine;
use crate::domain::ports::{ConfigProvider, ContentStore, Storage};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::Validate;
use std::time::Duration;

#[cfg(feature = "cli")]
use crate::config::CliConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// 快照模式下需要在寫入後存回檔案
pub type SnapshotHandle = Option<(MemoryStore, String)>;

#[cfg(feature = "cli")]
pub async fn run(cli: &CliConfig) -> Result<ActionOutput> {
    let mut config = match &cli.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    cli.apply_overrides(&mut config);

    // 驗證配置
    config.validate()?;

    let files = LocalStorage::new(String::new());
    let xml_content = match cli.xml_path() {
        Some(path) => Some(String::from_utf8_lossy(&files.read_file(path).await?).into_owned()),
        None => None,
    };
    let request = RpcRequest {
        action: Some(cli.action().to_string()),
        xml_content,
        dry_run: Some(cli.dry_run()),
    }
    .validate()?;

    let (store, snapshot) = open_store(&config, request.action(), &files).await?;
    let engine = SyncEngine::new(store, config.settings());
    let output = execute(&engine, request).await?;

    let writer = ReportWriter::new(
        LocalStorage::new(config.output_path().to_string()),
        config.write_csv(),
    );
    for file in writer.write(&output).await? {
        tracing::info!("📁 Report saved to: {}/{}", config.output_path(), file);
    }

    if let (Some((memory, path)), ActionOutput::Sync(outcome)) = (&snapshot, &output) {
        if !outcome.report.dry_run {
            memory.persist(&files, path).await?;
            tracing::info!("💾 Snapshot updated: {}", path);
        }
    }

    Ok(output)
}

pub async fn open_store(
    config: &SyncConfig,
    action: SyncAction,
    files: &LocalStorage,
) -> Result<(Box<dyn ContentStore>, SnapshotHandle)> {
    let Some(store) = &config.store else {
        // 只解析匯出檔時不需要資料庫
        if action == SyncAction::ParseXml {
            return Ok((Box::new(MemoryStore::default()), None));
        }
        return Err(SyncError::MissingConfigError {
            field: "store".to_string(),
        });
    };

    match store.kind {
        StoreKind::Rest => {
            let url = store.url.clone().ok_or_else(|| SyncError::MissingConfigError {
                field: "store.url".to_string(),
            })?;
            let api_key = store
                .api_key
                .clone()
                .ok_or_else(|| SyncError::MissingConfigError {
                    field: "store.api_key".to_string(),
                })?;
            let timeout = store.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
            tracing::info!("🌐 Using REST store at {}", url);
            let rest = RestStore::with_timeout(url, api_key, Duration::from_secs(timeout))?;
            Ok((Box::new(rest), None))
        }
        StoreKind::Snapshot => {
            let path = store
                .snapshot_path
                .clone()
                .ok_or_else(|| SyncError::MissingConfigError {
                    field: "store.snapshot_path".to_string(),
                })?;
            tracing::info!("📂 Using snapshot store {}", path);
            let memory = MemoryStore::load(files, &path).await?;
            Ok((Box::new(memory.clone()), Some((memory, path))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    fn files() -> LocalStorage {
        LocalStorage::new(String::new())
    }

    #[tokio::test]
    async fn test_parse_xml_runs_without_store() {
        let config = SyncConfig::default();
        assert!(config.store.is_none());

        let (store, snapshot) = open_store(&config, SyncAction::ParseXml, &files())
            .await
            .unwrap();
        assert!(store.fetch_courses().await.unwrap().is_empty());
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn test_store_actions_require_store_config() {
        let config = SyncConfig::default();

        for action in [SyncAction::Audit, SyncAction::SyncContent] {
            let err = open_store(&config, action, &files()).await.err().unwrap();
            assert!(matches!(
                err,
                SyncError::MissingConfigError { ref field } if field == "store"
            ));
        }
    }

    #[tokio::test]
    async fn test_snapshot_store_without_path() {
        let mut config = SyncConfig::default();
        config.store = Some(StoreConfig {
            kind: StoreKind::Snapshot,
            url: None,
            api_key: None,
            snapshot_path: None,
            timeout_seconds: None,
        });

        let err = open_store(&config, SyncAction::Audit, &files()).await.err().unwrap();
        assert!(matches!(
            err,
            SyncError::MissingConfigError { ref field } if field == "store.snapshot_path"
        ));
    }
}
