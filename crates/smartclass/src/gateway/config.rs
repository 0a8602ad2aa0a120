/// Configuration for the portal and its connection to the timetable service
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Environment variable that overrides `base_url`.
pub const API_URL_ENV: &str = "SMARTCLASS_API_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8001/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid base URL `{value}`: {message}")]
    InvalidUrl { value: String, message: String },

    #[error("Semester must be between 1 and 8, got {0}")]
    InvalidSemester(u8),
}

/// Portal settings, loaded from a JSON file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Root of the service API, e.g. `http://localhost:8001/api`
    pub base_url: String,
    pub connect_timeout_secs: u64,
    /// Upper bound on a whole request, so no fetch waits forever
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// How long a notice stays visible
    pub notice_ttl_secs: u64,
    /// Initial admin department selection
    pub default_department: String,
    /// Initial admin semester selection (1..=8)
    pub default_semester: u8,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            user_agent: format!("smartclass/{}", env!("CARGO_PKG_VERSION")),
            notice_ttl_secs: 3,
            default_department: "Computer Science".to_string(),
            default_semester: 3,
        }
    }
}

impl PortalConfig {
    /// Loads the config from a JSON file.
    ///
    /// # Arguments
    /// * `path` - Path to the JSON config file
    ///
    /// # Returns
    /// * `Ok(PortalConfig)` - Parsed and validated config
    /// * `Err` - If the file can't be read, parsed, or holds invalid values
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PortalConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the `SMARTCLASS_API_URL` override, if set.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = url;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api_base()?;
        if !(1..=8).contains(&self.default_semester) {
            return Err(ConfigError::InvalidSemester(self.default_semester));
        }
        Ok(())
    }

    /// Parsed base URL. Must be an absolute http(s) URL.
    pub fn api_base(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidUrl {
            value: self.base_url.clone(),
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                value: self.base_url.clone(),
                message: "expected an http(s) URL".to_string(),
            });
        }
        Ok(url)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_secs(self.notice_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "smartclass-{}-{name}",
            std::process::id()
        ));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let path = write_temp(
            "partial.json",
            r#"{ "base_url": "https://timetable.example.edu/api" }"#,
        );
        let config = PortalConfig::load_from_path(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.base_url, "https://timetable.example.edu/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.default_department, "Computer Science");
        assert_eq!(config.default_semester, 3);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_url = write_temp("bad-url.json", r#"{ "base_url": "not a url" }"#);
        let bad_sem = write_temp("bad-sem.json", r#"{ "default_semester": 9 }"#);
        let bad_json = write_temp("bad-json.json", "{ base_url");

        assert!(matches!(
            PortalConfig::load_from_path(&bad_url),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            PortalConfig::load_from_path(&bad_sem),
            Err(ConfigError::InvalidSemester(9))
        ));
        assert!(matches!(
            PortalConfig::load_from_path(&bad_json),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            PortalConfig::load_from_path(Path::new("/nonexistent/smartclass.json")),
            Err(ConfigError::Io { .. })
        ));

        for path in [bad_url, bad_sem, bad_json] {
            fs::remove_file(path).ok();
        }
    }

    #[test]
    fn test_env_override_replaces_base_url() {
        let config = PortalConfig::default().with_overrides(|key| {
            (key == API_URL_ENV).then(|| "http://10.0.0.5:8001/api".to_string())
        });
        assert_eq!(config.base_url, "http://10.0.0.5:8001/api");

        let untouched = PortalConfig::default().with_overrides(|_| Some("  ".to_string()));
        assert_eq!(untouched.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_non_http_base_is_rejected() {
        let config = PortalConfig {
            base_url: "mailto:admin@example.edu".to_string(),
            ..PortalConfig::default()
        };
        assert!(config.api_base().is_err());
        assert!(PortalConfig::default().validate().is_ok());
    }
}
