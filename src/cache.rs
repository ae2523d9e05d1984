use crate::config::Config;
use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Optional suffix → WHOIS server map. Entries expire after the configured
/// TTL and can be dropped at any time through the `invalidate` calls.
pub struct SuffixCache {
    cache: Cache<String, String>,
}

impl SuffixCache {
    pub fn new(config: &Config) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.cache_max_entries)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Self { cache }
    }

    /// Build the cache only when the configuration enables it.
    pub fn from_config(config: &Config) -> Option<Self> {
        config.suffix_cache_enabled.then(|| Self::new(config))
    }

    pub async fn get(&self, suffix: &str) -> Option<String> {
        let key = normalize_suffix(suffix);
        let hit = self.cache.get(&key).await;
        match hit {
            Some(_) => debug!("Suffix cache hit for '{}'", key),
            None => debug!("Suffix cache miss for '{}'", key),
        }
        hit
    }

    pub async fn set(&self, suffix: &str, server: &str) {
        let key = normalize_suffix(suffix);
        self.cache.insert(key, server.to_string()).await;
        debug!("Cached WHOIS server {} for '{}'", server, suffix);
    }

    pub async fn invalidate(&self, suffix: &str) {
        let key = normalize_suffix(suffix);
        self.cache.invalidate(&key).await;
        debug!("Invalidated suffix cache entry '{}'", key);
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        debug!("Invalidated all suffix cache entries");
    }
}

// TLDs are case-insensitive in the registry
fn normalize_suffix(suffix: &str) -> String {
    suffix.trim().to_ascii_lowercase()
}
