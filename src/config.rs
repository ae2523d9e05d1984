use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_REGISTRY_BASE_URL: &str = "https://www.iana.org/domains/root/db/";
const DEFAULT_USER_AGENT: &str = "http-whois";
const WHOIS_PORT: u16 = 43;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub registry_base_url: String,
    pub default_user_agent: String,
    pub registry_timeout_seconds: u64,
    pub whois_port: u16,
    pub whois_timeout_seconds: u64,
    pub max_response_size: usize,
    pub read_buffer_size: usize,
    pub suffix_cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
    pub start_time: Instant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigData {
    pub port: u16,
    pub registry_base_url: String,
    pub default_user_agent: String,
    pub registry_timeout_seconds: u64,
    pub whois_port: u16,
    pub whois_timeout_seconds: u64,
    pub max_response_size: usize,
    pub read_buffer_size: usize,
    pub suffix_cache_enabled: bool,
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            port: 3000,
            registry_base_url: DEFAULT_REGISTRY_BASE_URL.to_string(),
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            registry_timeout_seconds: 15,
            whois_port: WHOIS_PORT,
            whois_timeout_seconds: 15,
            max_response_size: 1024 * 1024,
            read_buffer_size: 8192,
            suffix_cache_enabled: false,
            cache_ttl_seconds: 3600,
            cache_max_entries: 2000,
        }
    }
}

impl From<ConfigData> for Config {
    fn from(data: ConfigData) -> Self {
        Config {
            port: data.port,
            registry_base_url: data.registry_base_url,
            default_user_agent: data.default_user_agent,
            registry_timeout_seconds: data.registry_timeout_seconds,
            whois_port: data.whois_port,
            whois_timeout_seconds: data.whois_timeout_seconds,
            max_response_size: data.max_response_size,
            read_buffer_size: data.read_buffer_size,
            suffix_cache_enabled: data.suffix_cache_enabled,
            cache_ttl_seconds: data.cache_ttl_seconds,
            cache_max_entries: data.cache_max_entries,
            start_time: Instant::now(),
        }
    }
}

impl Default for Config {
    /// Built-in defaults, without consulting the environment.
    fn default() -> Self {
        ConfigData::default().into()
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = ConfigData::default();
        let timeout = if Self::is_production_environment() { 30 } else { 15 };

        let mut settings = config::Config::builder()
            .set_default("port", Self::get_default_port())?
            .set_default("registry_base_url", defaults.registry_base_url)?
            .set_default("default_user_agent", defaults.default_user_agent)?
            .set_default("registry_timeout_seconds", timeout)?
            .set_default("whois_port", defaults.whois_port)?
            .set_default("whois_timeout_seconds", timeout)?
            .set_default("max_response_size", defaults.max_response_size as i64)?
            .set_default("read_buffer_size", defaults.read_buffer_size as i64)?
            .set_default("suffix_cache_enabled", defaults.suffix_cache_enabled)?
            .set_default("cache_ttl_seconds", defaults.cache_ttl_seconds)?
            .set_default("cache_max_entries", defaults.cache_max_entries)?;

        settings = Self::apply_env_overrides(settings)?;

        let config_data: ConfigData = settings.build()?.try_deserialize()?;
        Ok(config_data.into())
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_seconds)
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois_timeout_seconds)
    }

    fn is_production_environment() -> bool {
        std::env::var("ENVIRONMENT")
            .or_else(|_| std::env::var("ENV"))
            .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
            .unwrap_or(false)
    }

    fn get_default_port() -> u16 {
        std::env::var("PORT")
            .or_else(|_| std::env::var("HTTP_PORT"))
            .or_else(|_| std::env::var("SERVER_PORT"))
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000)
    }

    fn apply_env_overrides(mut settings: config::ConfigBuilder<config::builder::DefaultState>) -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        let env_mappings = [
            ("PORT", "port"),
            ("REGISTRY_BASE_URL", "registry_base_url"),
            ("DEFAULT_USER_AGENT", "default_user_agent"),
            ("REGISTRY_TIMEOUT_SECONDS", "registry_timeout_seconds"),
            ("REGISTRY_TIMEOUT", "registry_timeout_seconds"),
            ("WHOIS_PORT", "whois_port"),
            ("WHOIS_TIMEOUT_SECONDS", "whois_timeout_seconds"),
            ("WHOIS_TIMEOUT", "whois_timeout_seconds"),
            ("MAX_RESPONSE_SIZE", "max_response_size"),
            ("READ_BUFFER_SIZE", "read_buffer_size"),
            ("BUFFER_SIZE", "read_buffer_size"),
            ("SUFFIX_CACHE_ENABLED", "suffix_cache_enabled"),
            ("CACHE_ENABLED", "suffix_cache_enabled"),
            ("CACHE_TTL_SECONDS", "cache_ttl_seconds"),
            ("CACHE_TTL", "cache_ttl_seconds"),
            ("CACHE_MAX_ENTRIES", "cache_max_entries"),
            ("CACHE_SIZE", "cache_max_entries"),
        ];

        for (env_var, config_key) in env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                settings = settings.set_override(config_key, value)?;
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_point_at_iana_and_port_43() {
        let config = Config::default();
        assert_eq!(config.registry_base_url, "https://www.iana.org/domains/root/db/");
        assert_eq!(config.default_user_agent, "http-whois");
        assert_eq!(config.whois_port, 43);
        assert!(!config.suffix_cache_enabled);
        assert_eq!(config.whois_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_load_produces_usable_config() {
        let config = tokio_test::assert_ok!(Config::load());
        assert!(config.read_buffer_size > 0);
        assert!(config.max_response_size >= config.read_buffer_size);
    }
}
