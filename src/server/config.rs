//! Configuration loading for tolld.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.tollgate/config.toml` (user)
//! 3. `/etc/tollgate/config.toml` (system)
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.tollgate/secrets.toml` (user, must be 0600)
//! 2. `/etc/tollgate/secrets.toml` (system, must be 0600)
//!
//! ```toml
//! [server]
//! address = "127.0.0.1:9742"
//!
//! [providers.openbb]
//! base_url = "https://data.example.com/v1"
//! budget_cap = "25.00"
//! period = "monthly"
//!
//! [providers.openbb.data_types.profile]
//! cost = "0.30"
//! ttl_secs = 86400
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::budget::{BudgetConfig, BudgetPeriod};
use crate::cache::CacheConfig;
use crate::confidence::{DEFAULT_BASE_CONFIDENCE, DEFAULT_CONFIDENCE_FLOOR};
use crate::gateway::{DEFAULT_MAX_CONCURRENT_UPSTREAM, EmbeddedGateway, Tollgate, TollgateBuilder};
use crate::providers::{DataTypePolicy, HttpDataProvider, ProviderSpec, RetryConfig};
use crate::{Result, TollgateError};

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub retry: RetrySection,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:9742).
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            limits: LimitsConfig::default(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:9742".to_string()
}

/// Resource limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum concurrent HTTP requests (default: 100).
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    /// Upstream call timeout in seconds, retries included (default: 30).
    #[serde(default = "default_timeout")]
    pub upstream_timeout_secs: u64,
    /// Upstream calls one batch may run at once (default: 8).
    #[serde(default = "default_max_concurrent_upstream")]
    pub max_concurrent_upstream: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_max_concurrent(),
            upstream_timeout_secs: default_timeout(),
            max_concurrent_upstream: default_max_concurrent_upstream(),
        }
    }
}

fn default_max_concurrent() -> usize {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_max_concurrent_upstream() -> usize {
    DEFAULT_MAX_CONCURRENT_UPSTREAM
}

/// `[cache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            confidence_floor: default_confidence_floor(),
        }
    }
}

fn default_max_entries() -> u64 {
    CacheConfig::default().max_entries
}

fn default_confidence_floor() -> f64 {
    DEFAULT_CONFIDENCE_FLOOR
}

/// `[retry]` section. Missing fields keep the [`RetryConfig`] defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        let mut config = RetryConfig::default();
        if let Some(n) = self.max_attempts {
            config = config.max_attempts(n);
        }
        if let Some(ms) = self.initial_delay_ms {
            config = config.initial_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            config = config.max_delay(Duration::from_millis(ms));
        }
        config
    }
}

/// `[providers.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Spend cap per period, e.g. `"25.00"`.
    pub budget_cap: Decimal,
    /// `daily`, `weekly`, `monthly` or `fixed`.
    #[serde(default)]
    pub period: Option<String>,
    /// Window length for `fixed` periods.
    #[serde(default)]
    pub period_secs: Option<u64>,
    #[serde(default)]
    pub data_types: BTreeMap<String, DataTypeConfig>,
}

/// `[providers.<name>.data_types.<type>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DataTypeConfig {
    /// Estimated cost reserved per call.
    pub cost: Decimal,
    pub ttl_secs: u64,
    #[serde(default)]
    pub default_confidence: Option<f64>,
}

/// Secrets configuration (API keys), one table per provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Secrets {
    providers: BTreeMap<String, ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.tollgate/config.toml`
    /// 3. `/etc/tollgate/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?;
        let content = fs::read_to_string(&path).map_err(|e| {
            TollgateError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| TollgateError::Configuration(format!("Invalid config file {path:?}: {e}")))
    }

    /// Parse a TOML document.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| TollgateError::Configuration(e.to_string()))
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(path.to_path_buf());
            }
            return Err(TollgateError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".tollgate").join("config.toml");
            if user_config.exists() {
                return Ok(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/tollgate/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }

        Err(TollgateError::Configuration(
            "No config file found. Create ~/.tollgate/config.toml or /etc/tollgate/config.toml"
                .to_string(),
        ))
    }

    /// Provider specs backed by [`HttpDataProvider`], keyed from `secrets`.
    pub fn provider_specs(&self, secrets: &Secrets) -> Result<Vec<ProviderSpec>> {
        self.providers
            .iter()
            .map(|(name, provider)| {
                let period = BudgetPeriod::from_config(provider.period.as_deref(), provider.period_secs)
                    .map_err(|e| match e {
                        TollgateError::Configuration(msg) => {
                            TollgateError::Configuration(format!("provider '{name}': {msg}"))
                        }
                        other => other,
                    })?;

                let mut http = HttpDataProvider::new(name.clone(), provider.base_url.clone())?;
                if let Some(key) = secrets.api_key(name) {
                    http = http.api_key(key);
                }

                let spec = provider.data_types.iter().fold(
                    ProviderSpec::new(Arc::new(http), BudgetConfig::new(provider.budget_cap, period)),
                    |spec, (data_type, dt)| {
                        let policy = DataTypePolicy::new(dt.cost, Duration::from_secs(dt.ttl_secs))
                            .default_confidence(dt.default_confidence.unwrap_or(DEFAULT_BASE_CONFIDENCE));
                        spec.data_type(data_type.clone(), policy)
                    },
                );
                Ok(spec)
            })
            .collect()
    }

    /// A gateway builder with every setting of this config applied.
    pub fn builder(&self, secrets: &Secrets) -> Result<TollgateBuilder> {
        let limits = &self.server.limits;
        let builder = Tollgate::builder()
            .timeout(Duration::from_secs(limits.upstream_timeout_secs))
            .max_concurrent_upstream(limits.max_concurrent_upstream)
            .retry(self.retry.to_retry_config())
            .cache(CacheConfig::new().max_entries(self.cache.max_entries))
            .confidence_floor(self.cache.confidence_floor);

        Ok(self
            .provider_specs(secrets)?
            .into_iter()
            .fold(builder, TollgateBuilder::provider))
    }

    /// Build the gateway this config describes.
    pub fn build_gateway(&self, secrets: &Secrets) -> Result<EmbeddedGateway> {
        self.builder(secrets)?.build()
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.tollgate/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/tollgate/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (providers may use env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".tollgate").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/tollgate/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load one secrets file, rejecting group- or world-readable files.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            TollgateError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            TollgateError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            TollgateError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(TollgateError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// API key for a provider, falling back to `<PROVIDER>_API_KEY`.
    pub fn api_key(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(env_var_for(provider)).ok())
    }
}

/// `open-bb` → `OPEN_BB_API_KEY`.
fn env_var_for(provider: &str) -> String {
    let stem: String = provider
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("{stem}_API_KEY")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:9742");
        assert_eq!(config.server.limits.max_concurrent_requests, 100);
        assert_eq!(config.server.limits.upstream_timeout_secs, 30);
        assert_eq!(config.cache.max_entries, 100_000);
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "0.0.0.0:9742"

            [server.limits]
            upstream_timeout_secs = 5

            [retry]
            max_attempts = 4

            [providers.openbb]
            base_url = "https://data.example.com/v1"
            budget_cap = "1.00"
            period = "monthly"

            [providers.openbb.data_types.profile]
            cost = "0.30"
            ttl_secs = 86400

            [providers.quotes]
            base_url = "https://quotes.example.com"
            budget_cap = 5
            period_secs = 3600

            [providers.quotes.data_types.price]
            cost = 0.02
            ttl_secs = 60
            default_confidence = 0.95
        "#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.limits.upstream_timeout_secs, 5);
        assert_eq!(config.server.limits.max_concurrent_requests, 100);
        assert_eq!(config.retry.to_retry_config().max_attempts, 4);

        let openbb = &config.providers["openbb"];
        assert_eq!(openbb.budget_cap, Decimal::ONE);
        assert_eq!(openbb.data_types["profile"].cost, Decimal::new(30, 2));

        let specs = config.provider_specs(&Secrets::default()).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].budget.period, BudgetPeriod::Monthly);
        assert_eq!(
            specs[1].budget.period,
            BudgetPeriod::Fixed(Duration::from_secs(3600))
        );
        assert_eq!(specs[1].data_types[0].1.default_confidence, 0.95);
    }

    #[test]
    fn bad_period_is_a_configuration_error() {
        let toml = r#"
            [providers.openbb]
            base_url = "http://localhost"
            budget_cap = "1"
            period = "fortnightly"
        "#;
        let config = Config::parse(toml).unwrap();
        assert!(matches!(
            config.provider_specs(&Secrets::default()),
            Err(TollgateError::Configuration(_))
        ));
    }

    #[test]
    fn parse_secrets() {
        let toml = r#"
            [openbb]
            api_key = "ob-test-key"
        "#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.api_key("openbb"), Some("ob-test-key".to_string()));
    }

    #[test]
    fn env_var_names() {
        assert_eq!(env_var_for("openbb"), "OPENBB_API_KEY");
        assert_eq!(env_var_for("open-bb"), "OPEN_BB_API_KEY");
    }

    #[test]
    fn config_not_found_returns_error() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }
}
