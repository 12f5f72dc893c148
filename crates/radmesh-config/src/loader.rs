//! Environment loading for [`MeshConfig`].
//!
//! # Design
//! - `from_env` seeds the process environment from `.env` (if present) and then
//!   delegates to `from_lookup`, which tests drive with an in-memory map.
//! - Empty values are treated as unset.
//! - `UPLOAD_DIR` is resolved against the working directory at load time; every
//!   path handed to the mesh engine derives from it.

use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{
    ArchiveLimits, HttpConfig, InvalidEntryPolicy, LoggingSettings, MeshConfig, RemoteConfig,
    StorageConfig, ValidationConfig,
};

const ENV_UPLOAD_DIR: &str = "UPLOAD_DIR";
const ENV_DICOMS_DIR: &str = "DICOMS_DIR";
const ENV_ROI_DIR: &str = "ROI_DIR";
const ENV_CT_DIR: &str = "CT_DIR";
const ENV_GENIE_API: &str = "GENIE_API";
const ENV_GENIE_PORT: &str = "GENIE_PORT";
const ENV_REMOTE_TIMEOUT_SECS: &str = "RADMESH_REMOTE_TIMEOUT_SECS";
const ENV_REMOTE_MAX_ATTEMPTS: &str = "RADMESH_REMOTE_MAX_ATTEMPTS";
const ENV_MAX_ARCHIVE_ENTRIES: &str = "RADMESH_MAX_ARCHIVE_ENTRIES";
const ENV_MAX_ARCHIVE_BYTES: &str = "RADMESH_MAX_ARCHIVE_BYTES";
const ENV_MAX_UPLOAD_BYTES: &str = "RADMESH_MAX_UPLOAD_BYTES";
const ENV_SPOOL_THRESHOLD_BYTES: &str = "RADMESH_SPOOL_THRESHOLD_BYTES";
const ENV_INVALID_ENTRY_POLICY: &str = "RADMESH_INVALID_ENTRY_POLICY";
const ENV_CASE_INSENSITIVE: &str = "RADMESH_DICOM_NAME_CASE_INSENSITIVE";
const ENV_BIND_ADDR: &str = "RADMESH_BIND_ADDR";
const ENV_HTTP_PORT: &str = "RADMESH_HTTP_PORT";
const ENV_LOG_LEVEL: &str = "RADMESH_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "RADMESH_LOG_FORMAT";

impl MeshConfig {
    /// Load configuration from the process environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when `UPLOAD_DIR` is unset and
    /// [`ConfigError::InvalidField`] when a value cannot be parsed.
    pub fn from_env() -> ConfigResult<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!(error = %err, "failed to read .env file; continuing with process environment");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] when `UPLOAD_DIR` is unset and
    /// [`ConfigError::InvalidField`] when a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let upload_dir = env.get(ENV_UPLOAD_DIR).ok_or(ConfigError::MissingEnv {
            name: ENV_UPLOAD_DIR,
        })?;
        let upload_dir = std::path::absolute(&upload_dir)
            .map_err(|_| ConfigError::invalid(ENV_UPLOAD_DIR, "unresolvable_path", &upload_dir))?;
        let storage = StorageConfig {
            upload_dir,
            dicoms_dir: env.dir_name(ENV_DICOMS_DIR, defaults::DICOMS_DIR)?,
            roi_dir: env.dir_name(ENV_ROI_DIR, defaults::ROI_DIR)?,
            ct_dir: env.dir_name(ENV_CT_DIR, defaults::CT_DIR)?,
        };

        let remote = RemoteConfig {
            base_url: env.genie_url()?,
            timeout: Duration::from_secs(
                env.positive(ENV_REMOTE_TIMEOUT_SECS)?
                    .unwrap_or(defaults::REMOTE_TIMEOUT_SECS),
            ),
            max_attempts: env
                .positive(ENV_REMOTE_MAX_ATTEMPTS)?
                .unwrap_or(defaults::REMOTE_MAX_ATTEMPTS),
        };

        let fallback = ArchiveLimits::default();
        let limits = ArchiveLimits {
            max_entries: env
                .positive(ENV_MAX_ARCHIVE_ENTRIES)?
                .unwrap_or(fallback.max_entries),
            max_total_bytes: env
                .positive(ENV_MAX_ARCHIVE_BYTES)?
                .unwrap_or(fallback.max_total_bytes),
            max_upload_bytes: env
                .positive(ENV_MAX_UPLOAD_BYTES)?
                .unwrap_or(fallback.max_upload_bytes),
            spool_threshold_bytes: env
                .parse(ENV_SPOOL_THRESHOLD_BYTES)?
                .unwrap_or(fallback.spool_threshold_bytes),
        };

        let on_invalid = match env.get(ENV_INVALID_ENTRY_POLICY) {
            Some(raw) => InvalidEntryPolicy::parse(&raw).ok_or_else(|| {
                ConfigError::invalid(ENV_INVALID_ENTRY_POLICY, "unknown_policy", &raw)
            })?,
            None => InvalidEntryPolicy::default(),
        };
        let validation = ValidationConfig {
            on_invalid,
            case_insensitive: env.flag(ENV_CASE_INSENSITIVE)?.unwrap_or(false),
        };

        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            bind_addr: env
                .parse::<IpAddr>(ENV_BIND_ADDR)?
                .unwrap_or(http_defaults.bind_addr),
            port: env.positive(ENV_HTTP_PORT)?.unwrap_or(http_defaults.port),
        };

        let format = env.get(ENV_LOG_FORMAT);
        if let Some(value) = format.as_deref() {
            if !matches!(value, "json" | "pretty") {
                return Err(ConfigError::invalid(ENV_LOG_FORMAT, "unknown_format", value));
            }
        }
        let logging = LoggingSettings {
            level: env
                .get(ENV_LOG_LEVEL)
                .unwrap_or_else(|| defaults::LOG_LEVEL.to_string()),
            format,
        };

        Ok(Self {
            storage,
            remote,
            limits,
            validation,
            http,
            logging,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, key: &'static str) -> ConfigResult<Option<T>> {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| ConfigError::invalid(key, "unparseable", &raw))
            })
            .transpose()
    }

    fn positive<T>(&self, key: &'static str) -> ConfigResult<Option<T>>
    where
        T: FromStr + Default + PartialEq,
    {
        match self.parse::<T>(key)? {
            Some(value) if value == T::default() => Err(ConfigError::InvalidField {
                field: key,
                reason: "zero",
                value: self.get(key),
            }),
            other => Ok(other),
        }
    }

    fn flag(&self, key: &'static str) -> ConfigResult<Option<bool>> {
        self.get(key)
            .map(|raw| match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::invalid(key, "not_a_boolean", &raw)),
            })
            .transpose()
    }

    fn dir_name(&self, key: &'static str, fallback: &str) -> ConfigResult<String> {
        let Some(value) = self.get(key) else {
            return Ok(fallback.to_string());
        };
        if value == "." || value == ".." || value.contains(['/', '\\']) {
            return Err(ConfigError::invalid(key, "not_a_directory_name", &value));
        }
        Ok(value)
    }

    fn genie_url(&self) -> ConfigResult<Url> {
        if let Some(raw) = self.get(ENV_GENIE_API) {
            let url =
                Url::parse(&raw).map_err(|_| ConfigError::invalid(ENV_GENIE_API, "invalid_url", &raw))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::invalid(ENV_GENIE_API, "unsupported_scheme", &raw));
            }
            return Ok(url);
        }

        let port = self
            .positive::<u16>(ENV_GENIE_PORT)?
            .unwrap_or(defaults::GENIE_PORT);
        let raw = format!("http://127.0.0.1:{port}");
        Url::parse(&raw).map_err(|_| ConfigError::invalid(ENV_GENIE_PORT, "invalid_url", &raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn load(pairs: &[(&str, &str)]) -> ConfigResult<MeshConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        MeshConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn missing_upload_dir_is_reported() {
        assert_eq!(
            load(&[]).err(),
            Some(ConfigError::MissingEnv { name: "UPLOAD_DIR" })
        );
    }

    #[test]
    fn relative_upload_dir_is_made_absolute() -> anyhow::Result<()> {
        let config = load(&[("UPLOAD_DIR", "./uploads")])?;
        let expected = std::env::current_dir()?.join("uploads");
        assert!(config.storage.upload_dir.is_absolute());
        assert_eq!(config.storage.upload_dir, expected);
        assert_eq!(config.storage.dicoms_root(), expected.join("dicoms"));
        Ok(())
    }

    #[test]
    fn defaults_apply_when_only_upload_dir_is_set() -> anyhow::Result<()> {
        let config = load(&[("UPLOAD_DIR", "/srv/uploads")])?;
        assert_eq!(
            config.storage.dicoms_root(),
            PathBuf::from("/srv/uploads/dicoms")
        );
        assert_eq!(config.remote.base_url.as_str(), "http://127.0.0.1:8001/");
        assert_eq!(config.remote.timeout, Duration::from_secs(300));
        assert_eq!(config.remote.max_attempts, 1);
        assert_eq!(config.limits, ArchiveLimits::default());
        assert_eq!(config.validation.on_invalid, InvalidEntryPolicy::Reject);
        assert!(!config.validation.case_insensitive);
        assert_eq!(config.http, HttpConfig::default());
        assert_eq!(config.logging, LoggingSettings::default());
        Ok(())
    }

    #[test]
    fn genie_port_builds_loopback_url() -> anyhow::Result<()> {
        let config = load(&[("UPLOAD_DIR", "/srv"), ("GENIE_PORT", "9100")])?;
        assert_eq!(config.remote.base_url.as_str(), "http://127.0.0.1:9100/");
        Ok(())
    }

    #[test]
    fn explicit_genie_api_wins_over_port() -> anyhow::Result<()> {
        let config = load(&[
            ("UPLOAD_DIR", "/srv"),
            ("GENIE_PORT", "9100"),
            ("GENIE_API", "http://genie.internal:7000/engine/"),
        ])?;
        assert_eq!(
            config.remote.base_url.as_str(),
            "http://genie.internal:7000/engine/"
        );
        Ok(())
    }

    #[test]
    fn overrides_are_parsed() -> anyhow::Result<()> {
        let config = load(&[
            ("UPLOAD_DIR", "/srv"),
            ("DICOMS_DIR", "plans"),
            ("RADMESH_REMOTE_TIMEOUT_SECS", "15"),
            ("RADMESH_REMOTE_MAX_ATTEMPTS", "3"),
            ("RADMESH_MAX_ARCHIVE_ENTRIES", "42"),
            ("RADMESH_MAX_ARCHIVE_BYTES", "1024"),
            ("RADMESH_SPOOL_THRESHOLD_BYTES", "0"),
            ("RADMESH_INVALID_ENTRY_POLICY", "warn"),
            ("RADMESH_DICOM_NAME_CASE_INSENSITIVE", "true"),
            ("RADMESH_BIND_ADDR", "0.0.0.0"),
            ("RADMESH_HTTP_PORT", "8080"),
            ("RADMESH_LOG_FORMAT", "json"),
        ])?;
        assert_eq!(config.storage.dicoms_root(), PathBuf::from("/srv/plans"));
        assert_eq!(config.remote.timeout, Duration::from_secs(15));
        assert_eq!(config.remote.max_attempts, 3);
        assert_eq!(config.limits.max_entries, 42);
        assert_eq!(config.limits.max_total_bytes, 1024);
        assert_eq!(config.limits.spool_threshold_bytes, 0);
        assert_eq!(config.validation.on_invalid, InvalidEntryPolicy::Warn);
        assert!(config.validation.case_insensitive);
        assert_eq!(config.http.socket_addr().to_string(), "0.0.0.0:8080");
        assert_eq!(config.logging.format.as_deref(), Some("json"));
        Ok(())
    }

    #[test]
    fn invalid_values_name_the_field() {
        let err = load(&[("UPLOAD_DIR", "/srv"), ("RADMESH_HTTP_PORT", "http")]).err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidField {
                field: "RADMESH_HTTP_PORT",
                reason: "unparseable",
                ..
            })
        ));

        let err = load(&[("UPLOAD_DIR", "/srv"), ("RADMESH_MAX_ARCHIVE_ENTRIES", "0")]).err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidField { reason: "zero", .. })
        ));

        let err = load(&[("UPLOAD_DIR", "/srv"), ("DICOMS_DIR", "../etc")]).err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidField {
                field: "DICOMS_DIR",
                ..
            })
        ));

        let err = load(&[("UPLOAD_DIR", "/srv"), ("GENIE_API", "ftp://genie")]).err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidField {
                reason: "unsupported_scheme",
                ..
            })
        ));

        let err = load(&[("UPLOAD_DIR", "/srv"), ("RADMESH_LOG_FORMAT", "xml")]).err();
        assert!(matches!(
            err,
            Some(ConfigError::InvalidField {
                field: "RADMESH_LOG_FORMAT",
                ..
            })
        ));
    }
}
