use crate::config::toml_config::{ReportConfig, StoreConfig, StoreKind, SyncConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "wp-content-sync")]
#[command(about = "Reconcile a WordPress course export with the course database")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: CliCommand,

    #[arg(long, global = true, help = "TOML config file")]
    pub config: Option<String>,

    #[arg(long, global = true, help = "Use a JSON snapshot file as the course database")]
    pub snapshot: Option<String>,

    #[arg(
        long,
        global = true,
        help = "PostgREST base URL; the key is read from STORE_API_KEY"
    )]
    pub store_url: Option<String>,

    #[arg(long, global = true)]
    pub output_path: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// 列出資料庫中沒有任何單元的模組
    Audit,
    /// 只解析匯出檔並顯示統計
    ParseXml {
        #[arg(long)]
        xml: String,
    },
    /// 比對並更新；未加 --apply 時只預覽
    SyncContent {
        #[arg(long)]
        xml: String,
        #[arg(long)]
        apply: bool,
    },
}

impl CliConfig {
    pub fn action(&self) -> &'static str {
        match self.command {
            CliCommand::Audit => "audit",
            CliCommand::ParseXml { .. } => "parse-xml",
            CliCommand::SyncContent { .. } => "sync-content",
        }
    }

    pub fn xml_path(&self) -> Option<&str> {
        match &self.command {
            CliCommand::Audit => None,
            CliCommand::ParseXml { xml } | CliCommand::SyncContent { xml, .. } => Some(xml),
        }
    }

    pub fn dry_run(&self) -> bool {
        !matches!(self.command, CliCommand::SyncContent { apply: true, .. })
    }

    /// 命令列參數優先於設定檔
    pub fn apply_overrides(&self, config: &mut SyncConfig) {
        if let Some(path) = &self.snapshot {
            config.store = Some(StoreConfig {
                kind: StoreKind::Snapshot,
                url: None,
                api_key: None,
                snapshot_path: Some(path.clone()),
                timeout_seconds: None,
            });
        } else if let Some(url) = &self.store_url {
            let timeout_seconds = config.store.as_ref().and_then(|s| s.timeout_seconds);
            config.store = Some(StoreConfig {
                kind: StoreKind::Rest,
                url: Some(url.clone()),
                api_key: std::env::var("STORE_API_KEY").ok(),
                snapshot_path: None,
                timeout_seconds,
            });
        }

        if let Some(output_path) = &self.output_path {
            config
                .report
                .get_or_insert_with(ReportConfig::default)
                .output_path = Some(output_path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;

    #[test]
    fn test_sync_defaults_to_dry_run() {
        let cli = CliConfig::parse_from(["wp-content-sync", "sync-content", "--xml", "export.xml"]);
        assert_eq!(cli.action(), "sync-content");
        assert_eq!(cli.xml_path(), Some("export.xml"));
        assert!(cli.dry_run());

        let cli = CliConfig::parse_from([
            "wp-content-sync",
            "sync-content",
            "--xml",
            "export.xml",
            "--apply",
        ]);
        assert!(!cli.dry_run());
    }

    #[test]
    fn test_snapshot_override_replaces_store() {
        let cli = CliConfig::parse_from([
            "wp-content-sync",
            "audit",
            "--snapshot",
            "db.json",
            "--output-path",
            "./out",
        ]);
        let mut config = SyncConfig::from_toml_str(
            "[store]\nkind = \"rest\"\nurl = \"https://abc.supabase.co\"\napi_key = \"k\"\n",
        )
        .unwrap();

        cli.apply_overrides(&mut config);

        let store = config.store.as_ref().unwrap();
        assert_eq!(store.kind, StoreKind::Snapshot);
        assert_eq!(store.snapshot_path.as_deref(), Some("db.json"));
        assert_eq!(config.output_path(), "./out");
        assert_eq!(cli.xml_path(), None);
    }

    #[test]
    fn test_audit_help_describes_lessonless_modules() {
        use clap::CommandFactory;

        let command = CliConfig::command();
        let audit = command
            .get_subcommands()
            .find(|sub| sub.get_name() == "audit")
            .unwrap();
        let about = audit.get_about().unwrap().to_string();
        assert!(about.contains("沒有任何單元"));
        assert!(!about.contains("描述"));
    }
}
