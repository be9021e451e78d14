use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

pub const DEFAULT_BINANCE_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_STOCKLIST_SOURCE_URL: &str = "https://www.nasdaqtrader.com/dynamic/SymDir";
pub const DEFAULT_YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// Exchange API credentials
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExchangeSettings {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
}

// Telegram bot used for notifications
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct SettingsYaml {
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
    pub stocklist_source_url: Option<String>,
    pub yahoo_chart_url: Option<String>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct Settings {
    pub exchange_api_key: Option<String>,
    pub exchange_api_secret: Option<String>,
    pub exchange_base_url: String,
    pub exchange_rate_limit_per_minute: u32,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub stocklist_source_url: String,
    pub yahoo_chart_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_yaml_struct(SettingsYaml::default())
    }
}

impl Settings {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Ok(Self::from_env())
        }
    }

    // Load configuration from YAML file
    pub fn from_yaml(file_path: &str) -> Result<Self> {
        let yaml_content = fs::read_to_string(file_path)
            .map_err(|e| AppError::Config(format!("Failed to read config file {}: {}", file_path, e)))?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self> {
        let yaml_config: SettingsYaml = serde_yaml::from_str(yaml_content)?;
        Ok(Self::from_yaml_struct(yaml_config))
    }

    fn from_yaml_struct(yaml_config: SettingsYaml) -> Self {
        Self {
            exchange_api_key: non_empty(yaml_config.exchange.api_key),
            exchange_api_secret: non_empty(yaml_config.exchange.api_secret),
            exchange_base_url: yaml_config
                .exchange
                .base_url
                .unwrap_or_else(|| DEFAULT_BINANCE_BASE_URL.to_string()),
            exchange_rate_limit_per_minute: yaml_config.exchange.rate_limit_per_minute.unwrap_or(120),
            telegram_bot_token: non_empty(yaml_config.telegram.bot_token),
            telegram_chat_id: non_empty(yaml_config.telegram.chat_id),
            stocklist_source_url: yaml_config
                .stocklist_source_url
                .unwrap_or_else(|| DEFAULT_STOCKLIST_SOURCE_URL.to_string()),
            yahoo_chart_url: yaml_config
                .yahoo_chart_url
                .unwrap_or_else(|| DEFAULT_YAHOO_CHART_URL.to_string()),
        }
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Self {
        let yaml_config = SettingsYaml {
            exchange: ExchangeSettings {
                api_key: env::var("BINANCE_API_KEY").ok(),
                api_secret: env::var("BINANCE_API_SECRET").ok(),
                base_url: env::var("BINANCE_BASE_URL").ok(),
                rate_limit_per_minute: env::var("BINANCE_RATE_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            telegram: TelegramSettings {
                bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
                chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            },
            stocklist_source_url: env::var("STOCKLIST_SOURCE_URL").ok(),
            yahoo_chart_url: env::var("YAHOO_CHART_URL").ok(),
        };
        Self::from_yaml_struct(yaml_config)
    }

    pub fn has_exchange_credentials(&self) -> bool {
        self.exchange_api_key.is_some() && self.exchange_api_secret.is_some()
    }

    pub fn has_telegram(&self) -> bool {
        self.telegram_bot_token.is_some() && self.telegram_chat_id.is_some()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.exchange_base_url, DEFAULT_BINANCE_BASE_URL);
        assert_eq!(settings.exchange_rate_limit_per_minute, 120);
        assert!(!settings.has_exchange_credentials());
        assert!(!settings.has_telegram());
    }

    #[test]
    fn test_from_yaml_str() {
        let yaml = r#"
exchange:
  api_key: "key"
  api_secret: "secret"
  base_url: "https://testnet.binance.vision"
telegram:
  bot_token: "123:abc"
  chat_id: "  "
stocklist_source_url: "http://localhost:9000"
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert!(settings.has_exchange_credentials());
        assert_eq!(settings.exchange_base_url, "https://testnet.binance.vision");
        assert_eq!(settings.telegram_chat_id, None);
        assert!(!settings.has_telegram());
        assert_eq!(settings.stocklist_source_url, "http://localhost:9000");
        assert_eq!(settings.yahoo_chart_url, DEFAULT_YAHOO_CHART_URL);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Settings::from_yaml_str("exchange: [").is_err());
    }
}
