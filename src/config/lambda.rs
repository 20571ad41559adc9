use crate::domain::ports::{ConfigProvider, ReportLimits, SyncSettings, Thresholds};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{
    validate_positive_number, validate_range, validate_resolved_secret, validate_url, Validate,
};
use std::env;
use std::str::FromStr;

const LAMBDA_OUTPUT_PATH: &str = "/tmp/wp-content-sync";

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub store_url: String,
    pub store_api_key: String,
    pub timeout_seconds: u64,
    pub thresholds: Thresholds,
    pub limits: ReportLimits,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Thresholds::default();
        let limits = ReportLimits::default();
        Ok(Self {
            store_url: required("STORE_URL")?,
            store_api_key: required("STORE_API_KEY")?,
            timeout_seconds: optional("STORE_TIMEOUT_SECONDS", 30)?,
            thresholds: Thresholds {
                module_source_floor: optional("MODULE_SOURCE_FLOOR", defaults.module_source_floor)?,
                module_existing_floor: optional(
                    "MODULE_EXISTING_FLOOR",
                    defaults.module_existing_floor,
                )?,
                lesson_source_floor: optional("LESSON_SOURCE_FLOOR", defaults.lesson_source_floor)?,
                lesson_existing_floor: optional(
                    "LESSON_EXISTING_FLOOR",
                    defaults.lesson_existing_floor,
                )?,
            },
            limits: ReportLimits {
                unmatched_sample: optional("UNMATCHED_SAMPLE", limits.unmatched_sample)?,
                ..limits
            },
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| SyncError::ConfigError {
        message: format!("{} environment variable is required", name),
    })
}

fn optional<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SyncError::InvalidConfigValueError {
                field: name.to_string(),
                value: raw.clone(),
                reason: "Not a valid number".to_string(),
            }),
        Err(_) => Ok(default),
    }
}

impl ConfigProvider for LambdaConfig {
    fn settings(&self) -> SyncSettings {
        SyncSettings {
            thresholds: self.thresholds,
            limits: self.limits,
        }
    }

    fn output_path(&self) -> &str {
        LAMBDA_OUTPUT_PATH
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_url("STORE_URL", &self.store_url)?;
        validate_resolved_secret("STORE_API_KEY", &self.store_api_key)?;
        validate_range("STORE_TIMEOUT_SECONDS", self.timeout_seconds, 1, 900)?;
        validate_positive_number("UNMATCHED_SAMPLE", self.limits.unmatched_sample, 1)?;

        tracing::info!("✅ Lambda configuration validation passed");
        Ok(())
    }
}
