//! 單一 RPC 端點：`{ action, xmlContent?, dryRun? }` → `{ success, ... }`。
//!
//! 輸入錯誤回 400 且不做任何處理；解析或存取儲存時的意外錯誤只在這裡攔截一次，回 500。

use crate::core::sync::{AuditReport, ParseReport, SyncEngine, SyncOutcome};
use crate::domain::ports::ContentStore;
use crate::utils::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub action: Option<String>,
    pub xml_content: Option<String>,
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Audit,
    ParseXml,
    SyncContent,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audit => "audit",
            Self::ParseXml => "parse-xml",
            Self::SyncContent => "sync-content",
        }
    }
}

impl FromStr for SyncAction {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "audit" => Ok(Self::Audit),
            "parse-xml" => Ok(Self::ParseXml),
            "sync-content" => Ok(Self::SyncContent),
            other => Err(SyncError::invalid_request(format!("Unknown action: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedRequest {
    Audit,
    ParseXml { xml: String },
    SyncContent { xml: String, dry_run: bool },
}

impl ValidatedRequest {
    pub fn action(&self) -> SyncAction {
        match self {
            Self::Audit => SyncAction::Audit,
            Self::ParseXml { .. } => SyncAction::ParseXml,
            Self::SyncContent { .. } => SyncAction::SyncContent,
        }
    }
}

impl RpcRequest {
    pub fn from_value(body: Value) -> Result<Self> {
        if !body.is_object() {
            return Err(SyncError::invalid_request("Request body must be a JSON object"));
        }
        serde_json::from_value(body)
            .map_err(|e| SyncError::invalid_request(format!("Invalid request body: {}", e)))
    }

    pub fn validate(self) -> Result<ValidatedRequest> {
        let action: SyncAction = self
            .action
            .as_deref()
            .ok_or_else(|| SyncError::invalid_request("Missing action"))?
            .parse()?;

        if action == SyncAction::Audit {
            return Ok(ValidatedRequest::Audit);
        }

        let xml = self
            .xml_content
            .filter(|xml| !xml.trim().is_empty())
            .ok_or_else(|| {
                SyncError::invalid_request(format!("xmlContent is required for {}", action.as_str()))
            })?;

        Ok(match action {
            SyncAction::ParseXml => ValidatedRequest::ParseXml { xml },
            // 只有明確傳入 dryRun: false 才會寫入
            _ => ValidatedRequest::SyncContent {
                xml,
                dry_run: self.dry_run.unwrap_or(true),
            },
        })
    }
}

#[derive(Debug, Clone)]
pub enum ActionOutput {
    Audit(AuditReport),
    Parse(ParseReport),
    Sync(SyncOutcome),
}

impl ActionOutput {
    pub fn action(&self) -> SyncAction {
        match self {
            Self::Audit(_) => SyncAction::Audit,
            Self::Parse(_) => SyncAction::ParseXml,
            Self::Sync(_) => SyncAction::SyncContent,
        }
    }

    pub fn payload(&self) -> Result<Value> {
        let value = match self {
            Self::Audit(report) => serde_json::to_value(report)?,
            Self::Parse(report) => serde_json::to_value(report)?,
            Self::Sync(outcome) => serde_json::to_value(&outcome.report)?,
        };
        Ok(value)
    }
}

pub async fn execute<S: ContentStore>(
    engine: &SyncEngine<S>,
    request: ValidatedRequest,
) -> Result<ActionOutput> {
    match request {
        ValidatedRequest::Audit => Ok(ActionOutput::Audit(engine.audit().await?)),
        ValidatedRequest::ParseXml { xml } => Ok(ActionOutput::Parse(engine.parse_xml(&xml))),
        ValidatedRequest::SyncContent { xml, dry_run } => {
            Ok(ActionOutput::Sync(engine.sync_content(&xml, dry_run).await?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcReply {
    pub status: u16,
    pub body: Value,
}

impl RpcReply {
    pub fn success(payload: Value) -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        match payload {
            Value::Object(fields) => body.extend(fields),
            other => {
                body.insert("result".to_string(), other);
            }
        }
        Self {
            status: 200,
            body: Value::Object(body),
        }
    }

    pub fn failure(error: &SyncError) -> Self {
        Self {
            status: error.status_code(),
            body: json!({ "success": false, "error": error.to_string() }),
        }
    }
}

pub async fn dispatch<S: ContentStore>(engine: &SyncEngine<S>, body: Value) -> RpcReply {
    let request = match RpcRequest::from_value(body).and_then(RpcRequest::validate) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejected request: {}", e);
            return RpcReply::failure(&e);
        }
    };

    let action = request.action();
    match execute(engine, request).await.and_then(|output| output.payload()) {
        Ok(payload) => RpcReply::success(payload),
        Err(e) => {
            tracing::error!("❌ {} failed: {}", action.as_str(), e);
            RpcReply::failure(&e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use crate::domain::model::DbSnapshot;
    use crate::domain::ports::SyncSettings;

    fn engine() -> SyncEngine<MemoryStore> {
        SyncEngine::new(MemoryStore::new(DbSnapshot::default()), SyncSettings::default())
    }

    #[test]
    fn test_validate_defaults_to_dry_run() {
        let request = RpcRequest {
            action: Some("sync-content".to_string()),
            xml_content: Some("<rss/>".to_string()),
            dry_run: None,
        };
        assert_eq!(
            request.validate().unwrap(),
            ValidatedRequest::SyncContent {
                xml: "<rss/>".to_string(),
                dry_run: true
            }
        );
    }

    #[test]
    fn test_audit_does_not_need_xml() {
        let request = RpcRequest {
            action: Some("audit".to_string()),
            ..RpcRequest::default()
        };
        assert_eq!(request.validate().unwrap(), ValidatedRequest::Audit);
    }

    #[tokio::test]
    async fn test_missing_action_is_400() {
        let reply = dispatch(&engine(), json!({ "xmlContent": "<rss/>" })).await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["success"], false);
        assert_eq!(reply.body["error"], "Missing action");
    }

    #[tokio::test]
    async fn test_unknown_action_is_400() {
        let reply = dispatch(&engine(), json!({ "action": "delete-everything" })).await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["error"], "Unknown action: delete-everything");
    }

    #[tokio::test]
    async fn test_missing_xml_is_400() {
        let reply = dispatch(&engine(), json!({ "action": "parse-xml", "xmlContent": "  " })).await;
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["error"], "xmlContent is required for parse-xml");

        let reply = dispatch(&engine(), json!({ "action": "sync-content" })).await;
        assert_eq!(reply.status, 400);
    }

    #[tokio::test]
    async fn test_non_object_body_is_400() {
        let reply = dispatch(&engine(), json!(["audit"])).await;
        assert_eq!(reply.status, 400);

        let reply = dispatch(&engine(), json!({ "action": 42 })).await;
        assert_eq!(reply.status, 400);
    }

    #[tokio::test]
    async fn test_success_flattens_payload() {
        let reply = dispatch(&engine(), json!({ "action": "audit" })).await;
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body["success"], true);
        assert_eq!(reply.body["emptyModuleCount"], 0);
    }
}
