use crate::domain::model::UnauthorizedPolicy;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::{
    validate_endpoint_path, validate_path, validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3500";
pub const PRODUCTION_BASE_URL: &str = "https://acme-be.vercel.app";
pub const DEFAULT_TOKEN_FILE: &str = ".acme-console/session.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_auth_path")]
    pub auth_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default = "default_token_file")]
    pub token_file: String,
    #[serde(default)]
    pub unauthorized_policy: UnauthorizedPolicy,
    #[serde(default)]
    pub clear_on_exit: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_auth_path() -> String {
    "/auth".to_string()
}

fn default_refresh_path() -> String {
    "/refresh".to_string()
}

fn default_token_file() -> String {
    DEFAULT_TOKEN_FILE.to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            auth_path: default_auth_path(),
            refresh_path: default_refresh_path(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            unauthorized_policy: UnauthorizedPolicy::default(),
            clear_on_exit: false,
        }
    }
}

impl ConsoleConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConsoleError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConsoleError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ACME_API_BASE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConsoleError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds, 1)?;
        validate_endpoint_path("api.auth_path", &self.api.auth_path)?;
        validate_endpoint_path("api.refresh_path", &self.api.refresh_path)?;
        validate_path("session.token_file", &self.session.token_file)?;

        if let Some(level) = &self.logging.level {
            let valid_levels = ["trace", "debug", "info", "warn", "error"];
            if !valid_levels.contains(&level.as_str()) {
                return Err(ConsoleError::InvalidConfigValueError {
                    field: "logging.level".to_string(),
                    value: level.clone(),
                    reason: format!("Valid levels: {}", valid_levels.join(", ")),
                });
            }
        }

        Ok(())
    }
}

impl ConfigProvider for ConsoleConfig {
    fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    fn auth_path(&self) -> &str {
        &self.api.auth_path
    }

    fn refresh_path(&self) -> &str {
        &self.api.refresh_path
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.api.timeout_seconds
    }

    fn token_file(&self) -> &str {
        &self.session.token_file
    }

    fn unauthorized_policy(&self) -> UnauthorizedPolicy {
        self.session.unauthorized_policy
    }

    fn clear_on_exit(&self) -> bool {
        self.session.clear_on_exit
    }
}

impl Validate for ConsoleConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
