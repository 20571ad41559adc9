use crate::domain::ports::{ConfigProvider, ReportLimits, SyncSettings, Thresholds};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_required_field,
    validate_resolved_secret, validate_url, Validate,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

const DEFAULT_OUTPUT_PATH: &str = "./sync-output";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    pub store: Option<StoreConfig>,
    pub thresholds: Option<ThresholdConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Rest,
    Snapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub snapshot_path: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub module_source_floor: Option<usize>,
    pub module_existing_floor: Option<usize>,
    pub lesson_source_floor: Option<usize>,
    pub lesson_existing_floor: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output_path: Option<String>,
    pub unmatched_sample: Option<usize>,
    pub update_sample: Option<usize>,
    pub course_sample: Option<usize>,
    pub modules_per_course: Option<usize>,
    pub write_csv: Option<bool>,
}

impl SyncConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${STORE_API_KEY})；未設定的變數原樣保留
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn thresholds(&self) -> Thresholds {
        let defaults = Thresholds::default();
        let Some(t) = &self.thresholds else {
            return defaults;
        };
        Thresholds {
            module_source_floor: t.module_source_floor.unwrap_or(defaults.module_source_floor),
            module_existing_floor: t.module_existing_floor.unwrap_or(defaults.module_existing_floor),
            lesson_source_floor: t.lesson_source_floor.unwrap_or(defaults.lesson_source_floor),
            lesson_existing_floor: t.lesson_existing_floor.unwrap_or(defaults.lesson_existing_floor),
        }
    }

    pub fn report_limits(&self) -> ReportLimits {
        let defaults = ReportLimits::default();
        let Some(r) = &self.report else {
            return defaults;
        };
        ReportLimits {
            unmatched_sample: r.unmatched_sample.unwrap_or(defaults.unmatched_sample),
            update_sample: r.update_sample.unwrap_or(defaults.update_sample),
            course_sample: r.course_sample.unwrap_or(defaults.course_sample),
            modules_per_course: r.modules_per_course.unwrap_or(defaults.modules_per_course),
        }
    }

    pub fn write_csv(&self) -> bool {
        self.report.as_ref().and_then(|r| r.write_csv).unwrap_or(true)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(store) = &self.store {
            match store.kind {
                StoreKind::Rest => {
                    let url = validate_required_field("store.url", &store.url)?;
                    validate_url("store.url", url)?;
                    let api_key = validate_required_field("store.api_key", &store.api_key)?;
                    validate_resolved_secret("store.api_key", api_key)?;
                }
                StoreKind::Snapshot => {
                    let path = validate_required_field("store.snapshot_path", &store.snapshot_path)?;
                    validate_path("store.snapshot_path", path)?;
                }
            }
            if let Some(timeout) = store.timeout_seconds {
                validate_range("store.timeout_seconds", timeout, 1, 900)?;
            }
        }

        validate_path("report.output_path", self.output_path())?;

        let limits = self.report_limits();
        validate_positive_number("report.unmatched_sample", limits.unmatched_sample, 1)?;
        validate_positive_number("report.course_sample", limits.course_sample, 1)?;

        let t = self.thresholds();
        validate_range("thresholds.module_source_floor", t.module_source_floor, 0, 10_000)?;
        validate_range("thresholds.module_existing_floor", t.module_existing_floor, 0, 10_000)?;
        validate_range("thresholds.lesson_source_floor", t.lesson_source_floor, 0, 10_000)?;
        validate_range("thresholds.lesson_existing_floor", t.lesson_existing_floor, 0, 10_000)?;

        Ok(())
    }
}

impl ConfigProvider for SyncConfig {
    fn settings(&self) -> SyncSettings {
        SyncSettings {
            thresholds: self.thresholds(),
            limits: self.report_limits(),
        }
    }

    fn output_path(&self) -> &str {
        self.report
            .as_ref()
            .and_then(|r| r.output_path.as_deref())
            .unwrap_or(DEFAULT_OUTPUT_PATH)
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[store]
kind = "rest"
url = "https://abc.supabase.co"
api_key = "service-role-key"

[thresholds]
module_existing_floor = 80

[report]
output_path = "./reports"
unmatched_sample = 10
write_csv = false
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.store.as_ref().unwrap().kind, StoreKind::Rest);
        assert_eq!(config.thresholds().module_existing_floor, 80);
        assert_eq!(config.thresholds().module_source_floor, 20);
        assert_eq!(config.report_limits().unmatched_sample, 10);
        assert_eq!(config.report_limits().update_sample, 5);
        assert_eq!(config.output_path(), "./reports");
        assert!(!config.write_csv());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SyncConfig::from_toml_str("").unwrap();
        assert_eq!(config.settings(), SyncSettings::default());
        assert_eq!(config.output_path(), DEFAULT_OUTPUT_PATH);
        assert!(config.write_csv());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("WP_SYNC_TEST_STORE_KEY", "secret-from-env");

        let toml_content = r#"
[store]
kind = "rest"
url = "https://abc.supabase.co"
api_key = "${WP_SYNC_TEST_STORE_KEY}"
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.store.unwrap().api_key.as_deref(),
            Some("secret-from-env")
        );

        std::env::remove_var("WP_SYNC_TEST_STORE_KEY");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let toml_content = r#"
[store]
kind = "rest"
url = "https://abc.supabase.co"
api_key = "${WP_SYNC_TEST_NEVER_SET}"
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_snapshot_store_requires_path() {
        let config = SyncConfig::from_toml_str("[store]\nkind = \"snapshot\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[store]
kind = "snapshot"
snapshot_path = "db.json"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = SyncConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.store.unwrap().snapshot_path.as_deref(), Some("db.json"));
    }
}
