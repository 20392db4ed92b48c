use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_path, validate_range, validate_secret, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub database: DatabaseConfig,
    pub wave: WaveConfig,
    pub bigcommerce: BigCommerceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveConfig {
    #[serde(default = "default_wave_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: String,
    #[serde(default)]
    pub business_id: String,
    pub page_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    /// JSON snapshot to read instead of calling the API.
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigCommerceConfig {
    #[serde(default = "default_bigcommerce_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub store_hash: String,
    #[serde(default)]
    pub api_token: String,
    pub per_page: Option<u32>,
    pub fetch_line_items: Option<bool>,
    pub timeout_seconds: Option<u64>,
    pub snapshot: Option<String>,
}

fn default_wave_endpoint() -> String {
    "https://gql.waveapps.com/graphql/public".to_string()
}

fn default_bigcommerce_base_url() -> String {
    "https://api.bigcommerce.com".to_string()
}

impl WaveConfig {
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(100)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    fn validate_section(&self) -> Result<()> {
        if let Some(snapshot) = &self.snapshot {
            return validate_path("wave.snapshot", snapshot);
        }

        validate_url("wave.endpoint", &self.endpoint)?;
        validate_secret("wave.api_token", &self.api_token)?;
        validate_secret("wave.business_id", &self.business_id)?;
        validate_range("wave.page_size", self.page_size(), 1, 200)?;
        validate_range("wave.timeout_seconds", self.timeout_seconds(), 1, 600)
    }
}

impl BigCommerceConfig {
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(250)
    }

    pub fn fetch_line_items(&self) -> bool {
        self.fetch_line_items.unwrap_or(false)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    fn validate_section(&self) -> Result<()> {
        if let Some(snapshot) = &self.snapshot {
            return validate_path("bigcommerce.snapshot", snapshot);
        }

        validate_url("bigcommerce.base_url", &self.base_url)?;
        validate_secret("bigcommerce.store_hash", &self.store_hash)?;
        validate_secret("bigcommerce.api_token", &self.api_token)?;
        // API 單頁上限 250
        validate_range("bigcommerce.per_page", self.per_page(), 1, 250)?;
        validate_range("bigcommerce.timeout_seconds", self.timeout_seconds(), 1, 600)
    }
}

impl SyncConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${WAVE_API_TOKEN})，未設定的變數保持原樣交給驗證處理
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        validate_path("database.path", &self.database.path)?;
        self.wave.validate_section()?;
        self.bigcommerce.validate_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[database]
path = "./crm.db"

[wave]
api_token = "wave-token"
business_id = "biz-1"

[bigcommerce]
store_hash = "abc123"
api_token = "bc-token"
fetch_line_items = true
"#;

    #[test]
    fn test_parse_basic_config_with_defaults() {
        let config = SyncConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.database.path, "./crm.db");
        assert_eq!(config.wave.endpoint, "https://gql.waveapps.com/graphql/public");
        assert_eq!(config.wave.page_size(), 100);
        assert_eq!(config.bigcommerce.base_url, "https://api.bigcommerce.com");
        assert_eq!(config.bigcommerce.per_page(), 250);
        assert!(config.bigcommerce.fetch_line_items());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CRM_SYNC_TEST_WAVE_TOKEN", "from-env");

        let toml_content = BASIC.replace("\"wave-token\"", "\"${CRM_SYNC_TEST_WAVE_TOKEN}\"");
        let config = SyncConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.wave.api_token, "from-env");

        std::env::remove_var("CRM_SYNC_TEST_WAVE_TOKEN");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let toml_content = BASIC.replace("\"bc-token\"", "\"${CRM_SYNC_TEST_NEVER_SET}\"");
        let config = SyncConfig::from_toml_str(&toml_content).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bigcommerce.api_token"));
    }

    #[test]
    fn test_snapshot_skips_credential_checks() {
        let toml_content = r#"
[database]
path = "./crm.db"

[wave]
snapshot = "./snapshots/wave.json"

[bigcommerce]
snapshot = "./snapshots/bigcommerce.json"
"#;
        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_page_size() {
        let toml_content = BASIC.replace("fetch_line_items = true", "per_page = 500");
        let config = SyncConfig::from_toml_str(&toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(SyncConfig::from_toml_str("[database\npath=").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = SyncConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.bigcommerce.store_hash, "abc123");
    }
}
