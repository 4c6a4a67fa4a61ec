use imlo_ai::GeminiConfig;
use imlo_ledger::LedgerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// One word per line
    #[serde(default = "default_dictionary_path")]
    pub dictionary_path: PathBuf,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub ai: GeminiConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_dictionary_path() -> PathBuf {
    PathBuf::from("dictionary.txt")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            dictionary_path: default_dictionary_path(),
            ledger: LedgerConfig::default(),
            ai: GeminiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read the TOML file if one is given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                let config: AppConfig = toml::from_str(&contents)?;
                log::info!("Loaded config from {}", path.display());
                config
            }
            None => AppConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Empty variables are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("INITIAL_TOKENS") {
            self.ledger.initial_tokens = parse_u64("INITIAL_TOKENS", &v)?;
        }
        if let Some(v) = get("TOKENS_PER_PAYMENT") {
            self.ledger.tokens_per_payment = parse_u64("TOKENS_PER_PAYMENT", &v)?;
        }
        if let Some(v) = get("PAYMENT_AMOUNT") {
            self.ledger.payment_amount = v;
        }
        if let Some(v) = get("CURRENCY") {
            self.ledger.currency = v;
        }
        if let Some(v) = get("PAYMENT_RECEIVER") {
            self.ledger.payment_receiver = v;
        }
        if let Some(v) = get("PAYMENT_CARD") {
            self.ledger.payment_card = v;
        }
        if let Some(v) = get("PAYMENT_CARD_LAST4") {
            self.ledger.payment_card_last4 = Some(v);
        }
        if let Some(v) = get("PAYMENT_PROVIDER") {
            self.ledger.payment_provider = v;
        }
        if let Some(v) = get("AI_API_KEY") {
            self.ai.api_key = v;
        }
        if let Some(v) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("DICTIONARY_PATH") {
            self.dictionary_path = PathBuf::from(v);
        }
        Ok(())
    }
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
}
