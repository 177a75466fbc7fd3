//! Configuration module
//!
//! Service configuration is read from the environment (after `.env` is loaded)
//! and validated once at startup. Origin credentials may additionally be
//! overridden per request; see [`OriginCredentials::resolve`].

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::constants::{
    BUNDLE_PATH_PREFIX, CACHE_MAX_ENTRIES, FILE_CACHE_TTL_SECS, MIRROR_CONCURRENCY,
    MIRROR_PATH_PREFIX, ORIGIN_TIMEOUT_SECS, TEMP_URL_CACHE_TTL_SECS, TEMP_URL_MAX_AGE_SECS,
};
use crate::error::AppError;
use crate::models::AttachmentFieldSet;
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 3000;
const MIN_SIGNING_SECRET_LEN: usize = 32;

/// Base configuration shared by the API and the CLI
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
}

/// Configured origin system access. Both values may be absent at startup.
#[derive(Clone, Debug, Default)]
pub struct OriginSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Per-request replacements for the configured origin settings.
#[derive(Clone, Debug, Default)]
pub struct OriginOverrides {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Origin base URL and API key that a request will actually use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OriginCredentials {
    pub base_url: String,
    pub api_key: String,
}

impl OriginCredentials {
    /// Combine configured settings with per-request overrides.
    ///
    /// Each override wins independently of the other. Fails with
    /// [`AppError::Configuration`] before any network activity if either value
    /// ends up missing.
    pub fn resolve(
        configured: &OriginSettings,
        overrides: &OriginOverrides,
    ) -> Result<Self, AppError> {
        let base_url = pick(overrides.base_url.as_deref(), configured.base_url.as_deref())
            .map(|base| base.trim_end_matches('/').to_string())
            .filter(|base| !base.is_empty())
            .ok_or_else(|| AppError::Configuration("origin base URL is not configured".into()))?;

        let api_key = pick(overrides.api_key.as_deref(), configured.api_key.as_deref())
            .map(str::to_string)
            .ok_or_else(|| AppError::Configuration("origin API key is not configured".into()))?;

        Ok(Self { base_url, api_key })
    }
}

fn pick<'a>(preferred: Option<&'a str>, fallback: Option<&'a str>) -> Option<&'a str> {
    preferred
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| fallback.map(str::trim).filter(|v| !v.is_empty()))
}

/// Lifetime and size bound for an in-process cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl CachePolicy {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self { ttl, max_entries }
    }
}

/// Attachment mirror service configuration
#[derive(Clone, Debug)]
pub struct MirrorServiceConfig {
    pub base: BaseConfig,
    pub origin: OriginSettings,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub local_storage_signing_secret: Option<String>,
    // Mirroring behavior
    pub mirror_path_prefix: String,
    pub mirror_concurrency: usize,
    pub attachment_fields: AttachmentFieldSet,
    pub bundle_path_prefix: String,
    // Cache lifetimes
    pub file_cache_ttl_secs: u64,
    pub temp_url_cache_ttl_secs: u64,
    pub temp_url_max_age_secs: u64,
    pub cache_max_entries: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MirrorServiceConfig>);

impl Config {
    fn as_mirror(&self) -> &MirrorServiceConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = MirrorServiceConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_mirror().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_mirror().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn server_port(&self) -> u16 {
        self.as_mirror().base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.as_mirror().base.environment
    }

    pub fn origin(&self) -> &OriginSettings {
        &self.as_mirror().origin
    }

    pub fn origin_timeout(&self) -> Duration {
        Duration::from_secs(self.as_mirror().origin.timeout_secs)
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_mirror().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_mirror().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_mirror().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_mirror().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_mirror().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_mirror().local_storage_base_url.as_deref()
    }

    pub fn local_storage_signing_secret(&self) -> Option<&str> {
        self.as_mirror().local_storage_signing_secret.as_deref()
    }

    pub fn mirror_path_prefix(&self) -> &str {
        &self.as_mirror().mirror_path_prefix
    }

    pub fn mirror_concurrency(&self) -> usize {
        self.as_mirror().mirror_concurrency
    }

    pub fn attachment_fields(&self) -> &AttachmentFieldSet {
        &self.as_mirror().attachment_fields
    }

    pub fn bundle_path_prefix(&self) -> &str {
        &self.as_mirror().bundle_path_prefix
    }

    pub fn file_cache_policy(&self) -> CachePolicy {
        let c = self.as_mirror();
        CachePolicy::new(
            Duration::from_secs(c.file_cache_ttl_secs),
            c.cache_max_entries,
        )
    }

    pub fn temp_url_cache_policy(&self) -> CachePolicy {
        let c = self.as_mirror();
        CachePolicy::new(
            Duration::from_secs(c.temp_url_cache_ttl_secs),
            c.cache_max_entries,
        )
    }

    pub fn temp_url_max_age(&self) -> Duration {
        Duration::from_secs(self.as_mirror().temp_url_max_age_secs)
    }
}

impl MirrorServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an explicit variable map (used by tests and embedders).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, anyhow::Error> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::Local,
        };

        let attachment_fields = match var("ATTACHMENT_FIELDS") {
            Some(list) => AttachmentFieldSet::from_list(&list),
            None => AttachmentFieldSet::default(),
        };

        let config = MirrorServiceConfig {
            base: BaseConfig {
                server_port: parse_or("PORT", var("PORT"), DEFAULT_PORT)?,
                environment,
            },
            origin: OriginSettings {
                base_url: var("ORIGIN_BASE_URL"),
                api_key: var("ORIGIN_API_KEY"),
                timeout_secs: parse_or(
                    "ORIGIN_TIMEOUT_SECS",
                    var("ORIGIN_TIMEOUT_SECS"),
                    ORIGIN_TIMEOUT_SECS,
                )?,
            },
            storage_backend,
            s3_bucket: var("S3_BUCKET"),
            s3_region: var("S3_REGION").or_else(|| var("AWS_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            local_storage_signing_secret: var("LOCAL_STORAGE_SIGNING_SECRET"),
            mirror_path_prefix: var("MIRROR_PATH_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| MIRROR_PATH_PREFIX.to_string()),
            mirror_concurrency: parse_or(
                "MIRROR_CONCURRENCY",
                var("MIRROR_CONCURRENCY"),
                MIRROR_CONCURRENCY,
            )?,
            attachment_fields,
            bundle_path_prefix: var("BUNDLE_PATH_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| BUNDLE_PATH_PREFIX.to_string()),
            file_cache_ttl_secs: parse_or(
                "FILE_CACHE_TTL_SECS",
                var("FILE_CACHE_TTL_SECS"),
                FILE_CACHE_TTL_SECS,
            )?,
            temp_url_cache_ttl_secs: parse_or(
                "TEMP_URL_CACHE_TTL_SECS",
                var("TEMP_URL_CACHE_TTL_SECS"),
                TEMP_URL_CACHE_TTL_SECS,
            )?,
            temp_url_max_age_secs: parse_or(
                "TEMP_URL_MAX_AGE_SECS",
                var("TEMP_URL_MAX_AGE_SECS"),
                TEMP_URL_MAX_AGE_SECS,
            )?,
            cache_max_entries: parse_or(
                "CACHE_MAX_ENTRIES",
                var("CACHE_MAX_ENTRIES"),
                CACHE_MAX_ENTRIES,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.mirror_concurrency == 0 {
            return Err(anyhow::anyhow!("MIRROR_CONCURRENCY must be at least 1"));
        }

        if self.file_cache_ttl_secs == 0 || self.temp_url_cache_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "FILE_CACHE_TTL_SECS and TEMP_URL_CACHE_TTL_SECS must be greater than zero"
            ));
        }

        if self.cache_max_entries == 0 {
            return Err(anyhow::anyhow!("CACHE_MAX_ENTRIES must be at least 1"));
        }

        // A cached temporary URL must never outlive its own validity.
        if self.temp_url_cache_ttl_secs >= self.temp_url_max_age_secs {
            return Err(anyhow::anyhow!(
                "TEMP_URL_CACHE_TTL_SECS ({}) must be less than TEMP_URL_MAX_AGE_SECS ({})",
                self.temp_url_cache_ttl_secs,
                self.temp_url_max_age_secs
            ));
        }

        if self.attachment_fields.is_empty() {
            return Err(anyhow::anyhow!(
                "ATTACHMENT_FIELDS must name at least one field"
            ));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                let secret = self.local_storage_signing_secret.as_deref().ok_or_else(|| {
                    anyhow::anyhow!(
                        "LOCAL_STORAGE_SIGNING_SECRET must be set when using local storage backend"
                    )
                })?;
                let env = self.base.environment.to_lowercase();
                if (env == "production" || env == "prod")
                    && secret.len() < MIN_SIGNING_SECRET_LEN
                {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_SIGNING_SECRET must be at least {} characters long in production",
                        MIN_SIGNING_SECRET_LEN
                    ));
                }
            }
        }

        Ok(())
    }
}

fn parse_or<T>(name: &str, value: Option<String>, default: T) -> Result<T, anyhow::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_vars() -> HashMap<String, String> {
        [
            ("LOCAL_STORAGE_PATH", "/tmp/mirror"),
            ("LOCAL_STORAGE_BASE_URL", "http://localhost:3000/files"),
            ("LOCAL_STORAGE_SIGNING_SECRET", "dev-secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn defaults_follow_policy_constants() {
        let config = Config(Box::new(MirrorServiceConfig::from_vars(&local_vars()).unwrap()));
        assert_eq!(config.server_port(), 3000);
        assert_eq!(config.storage_backend(), StorageBackend::Local);
        assert_eq!(config.mirror_concurrency(), 2);
        assert_eq!(config.mirror_path_prefix(), "origin-sync/preview");
        assert_eq!(config.file_cache_policy().ttl, Duration::from_secs(7200));
        assert_eq!(config.temp_url_cache_policy().ttl, Duration::from_secs(2700));
        assert_eq!(config.temp_url_max_age(), Duration::from_secs(3600));
        assert_eq!(config.origin_timeout(), Duration::from_secs(60));
        assert_eq!(config.attachment_fields().len(), 7);
        assert!(!config.is_production());
    }

    #[test]
    fn temp_url_cache_must_not_outlive_url() {
        let mut vars = local_vars();
        vars.insert("TEMP_URL_CACHE_TTL_SECS".into(), "3600".into());
        let err = MirrorServiceConfig::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("TEMP_URL_CACHE_TTL_SECS"));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut vars = local_vars();
        vars.insert("MIRROR_CONCURRENCY".into(), "0".into());
        assert!(MirrorServiceConfig::from_vars(&vars).is_err());
    }

    #[test]
    fn s3_requires_bucket_and_region() {
        let mut vars = HashMap::new();
        vars.insert("STORAGE_BACKEND".to_string(), "s3".to_string());
        let err = MirrorServiceConfig::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("S3_BUCKET"));

        vars.insert("S3_BUCKET".into(), "attachments".into());
        vars.insert("AWS_REGION".into(), "eu-west-1".into());
        let config = MirrorServiceConfig::from_vars(&vars).unwrap();
        assert_eq!(config.s3_region.as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn production_requires_long_signing_secret() {
        let mut vars = local_vars();
        vars.insert("ENVIRONMENT".into(), "production".into());
        assert!(MirrorServiceConfig::from_vars(&vars).is_err());

        vars.insert(
            "LOCAL_STORAGE_SIGNING_SECRET".into(),
            "0123456789abcdef0123456789abcdef".into(),
        );
        assert!(MirrorServiceConfig::from_vars(&vars).is_ok());
    }

    #[test]
    fn invalid_number_names_the_variable() {
        let mut vars = local_vars();
        vars.insert("PORT".into(), "eighty".into());
        let err = MirrorServiceConfig::from_vars(&vars).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn custom_attachment_fields() {
        let mut vars = local_vars();
        vars.insert("ATTACHMENT_FIELDS".into(), "photo_path, resume_path,".into());
        let config = MirrorServiceConfig::from_vars(&vars).unwrap();
        let names: Vec<&str> = config.attachment_fields.iter().collect();
        assert_eq!(names, vec!["photo_path", "resume_path"]);
    }

    #[test]
    fn overrides_take_precedence_independently() {
        let configured = OriginSettings {
            base_url: Some("https://origin.example.com/".into()),
            api_key: Some("configured-key".into()),
            timeout_secs: 60,
        };
        let overrides = OriginOverrides {
            base_url: Some("  https://staging.example.com//  ".into()),
            api_key: None,
        };
        let creds = OriginCredentials::resolve(&configured, &overrides).unwrap();
        assert_eq!(creds.base_url, "https://staging.example.com");
        assert_eq!(creds.api_key, "configured-key");
    }

    #[test]
    fn missing_credentials_are_configuration_errors() {
        let configured = OriginSettings::default();
        let err = OriginCredentials::resolve(&configured, &OriginOverrides::default()).unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref m) if m.contains("base URL")));

        let overrides = OriginOverrides {
            base_url: Some("https://origin.example.com".into()),
            api_key: Some("   ".into()),
        };
        let err = OriginCredentials::resolve(&configured, &overrides).unwrap_err();
        assert!(matches!(err, AppError::Configuration(ref m) if m.contains("API key")));
    }
}
