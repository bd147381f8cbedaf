use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_ROUNDS: u32 = 5;
pub const DEFAULT_POLICY_RETRIES: u32 = 2;
pub const DEFAULT_SCHEMA_RETRIES: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProvidersConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub budgets: BudgetConfig,
    #[serde(default)]
    pub data: DataConfig,
}

/// Primary answers first; the fallback only sees a ticket after the
/// primary has been given up on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub primary: ProviderSettings,
    pub fallback: ProviderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub name: String,
    pub base_url: String,
    /// Environment variable holding the API key, never the key itself
    pub api_key_env: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_tool_calls: Option<bool>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub enable_jitter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_policy_retries")]
    pub policy_retries: u32,
    #[serde(default = "default_schema_retries")]
    pub schema_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DataConfig {
    pub dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    crate::provider::retry::DEFAULT_MAX_RETRIES
}

fn default_base_delay_ms() -> u64 {
    crate::provider::retry::DEFAULT_BASE_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    crate::provider::retry::DEFAULT_MAX_DELAY_MS
}

fn default_true() -> bool {
    true
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_policy_retries() -> u32 {
    DEFAULT_POLICY_RETRIES
}

fn default_schema_retries() -> u32 {
    DEFAULT_SCHEMA_RETRIES
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save()?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .context("Could not determine home directory")?;

        Ok(home.join(".triagemate").join("config.toml"))
    }

    /// Directory holding the JSON data files
    pub fn data_dir(&self) -> PathBuf {
        self.data
            .dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Point the data loader somewhere else, used by the --data-dir flag
    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.data.dir = Some(dir);
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: ProvidersConfig::default(),
            retry: RetryConfig::default(),
            budgets: BudgetConfig::default(),
            data: DataConfig::default(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            primary: ProviderSettings {
                name: "openai".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                model: "gpt-4o-mini".to_string(),
                parallel_tool_calls: None,
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
            fallback: ProviderSettings {
                name: "groq".to_string(),
                base_url: "https://api.groq.com/openai/v1".to_string(),
                api_key_env: "GROQ_API_KEY".to_string(),
                model: "llama-3.1-8b-instant".to_string(),
                parallel_tool_calls: Some(false),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            },
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            enable_jitter: true,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        BudgetConfig {
            max_rounds: DEFAULT_MAX_ROUNDS,
            policy_retries: DEFAULT_POLICY_RETRIES,
            schema_retries: DEFAULT_SCHEMA_RETRIES,
        }
    }
}
