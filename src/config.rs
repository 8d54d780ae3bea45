//! Configuration for the availability checker

use crate::errors::{CheckerError, Result};
use crate::models::EndpointSpec;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Services to monitor, in report order
    pub services: Vec<EndpointSpec>,

    /// Per-probe timeout
    pub timeout: Duration,

    /// Ceiling on simultaneous outbound connections during a run
    pub max_connections: usize,

    /// Interval between periodic checks
    pub check_interval: Duration,

    /// Emit JSON log lines instead of plain text
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            timeout: Duration::from_secs(10),
            max_connections: 10,
            check_interval: Duration::from_secs(60),
            json_logs: true,
        }
    }
}

/// On-disk layout of a services file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    services: Vec<EndpointSpec>,
    timeout: Option<u64>,
    max_connections: Option<usize>,
    check_interval: Option<u64>,
    log_format: Option<String>,
}

impl Config {
    /// Load from `path` (falling back to `SERVICES_FILE`), then apply
    /// environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup("SERVICES_FILE").map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Config::default(),
        };

        if let Some(services) = lookup("SERVICES") {
            config.services = parse_services(&services)?;
        }

        if let Some(timeout) = lookup("CHECK_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(max_connections) = lookup("MAX_CONNECTIONS") {
            if let Ok(limit) = max_connections.parse() {
                config.max_connections = limit;
            }
        }

        if let Some(interval) = lookup("CHECK_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.check_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.json_logs = format.to_lowercase() != "text";
        }

        Ok(config)
    }

    /// Load configuration from a JSON services file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let file: FileConfig = serde_json::from_str(&contents)?;

        let mut config = Config {
            services: file.services,
            ..Config::default()
        };

        if let Some(seconds) = file.timeout {
            config.timeout = Duration::from_secs(seconds);
        }

        if let Some(limit) = file.max_connections {
            config.max_connections = limit;
        }

        if let Some(seconds) = file.check_interval {
            config.check_interval = Duration::from_secs(seconds);
        }

        if let Some(format) = file.log_format {
            config.json_logs = format.to_lowercase() != "text";
        }

        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// An empty roster is accepted.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.timeout.is_zero() {
            return Err("timeout must be greater than 0".to_string());
        }

        if self.max_connections == 0 {
            return Err("max_connections must be greater than 0".to_string());
        }

        if self.check_interval.is_zero() {
            return Err("check_interval must be greater than 0".to_string());
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(format!("service with url '{}' has an empty name", service.url));
            }

            if !seen.insert(service.name.as_str()) {
                return Err(format!("duplicate service name '{}'", service.name));
            }

            match Url::parse(&service.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => {
                    return Err(format!(
                        "service '{}' uses unsupported scheme '{}'",
                        service.name,
                        url.scheme()
                    ));
                }
                Err(e) => {
                    return Err(format!("service '{}' has invalid url: {}", service.name, e));
                }
            }
        }

        Ok(())
    }
}

/// Parse `name=url` pairs separated by commas
fn parse_services(raw: &str) -> Result<Vec<EndpointSpec>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .split_once('=')
                .map(|(name, url)| EndpointSpec::new(name.trim(), url.trim()))
                .ok_or_else(|| {
                    CheckerError::Config(format!("expected name=url, got '{}'", entry))
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_with(None, lookup_from(&[])).unwrap();

        assert!(config.services.is_empty());
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert!(config.json_logs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::load_with(
            None,
            lookup_from(&[
                ("SERVICES", "frontend=https://example.com/frontend, backend=https://example.com/backend"),
                ("CHECK_TIMEOUT_SECONDS", "5"),
                ("MAX_CONNECTIONS", "4"),
                ("CHECK_INTERVAL_SECONDS", "not-a-number"),
                ("LOG_FORMAT", "TEXT"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.services,
            vec![
                EndpointSpec::new("frontend", "https://example.com/frontend"),
                EndpointSpec::new("backend", "https://example.com/backend"),
            ]
        );
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert!(!config.json_logs);
    }

    #[test]
    fn test_malformed_services_variable() {
        let err = Config::load_with(None, lookup_from(&[("SERVICES", "frontend")])).unwrap_err();
        assert!(matches!(err, CheckerError::Config(_)));
    }

    #[test]
    fn test_services_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "services": [
                    {{"name": "Frontend", "url": "https://example.com/frontend"}},
                    {{"name": "AI Engine", "url": "https://example.com/ai"}}
                ],
                "timeout": 3,
                "check_interval": 30
            }}"#
        )
        .unwrap();

        let config = Config::load_with(
            None,
            lookup_from(&[("SERVICES_FILE", file.path().to_str().unwrap()), ("MAX_CONNECTIONS", "2")]),
        )
        .unwrap();

        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[1].name, "AI Engine");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.check_interval, Duration::from_secs(30));
        assert_eq!(config.max_connections, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_services_file_errors() {
        let missing = Config::from_file(Path::new("/nonexistent/services.json")).unwrap_err();
        assert!(matches!(missing, CheckerError::Io(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "services: [").unwrap();
        let malformed = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(malformed, CheckerError::Json(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = Config {
            services: vec![EndpointSpec::new("frontend", "https://example.com")],
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        config.services.push(EndpointSpec::new("frontend", "https://example.org"));
        assert!(config.validate().unwrap_err().contains("duplicate"));

        config.services = vec![EndpointSpec::new("", "https://example.com")];
        assert!(config.validate().is_err());

        config.services = vec![EndpointSpec::new("ftp", "ftp://example.com")];
        assert!(config.validate().unwrap_err().contains("scheme"));

        config.services = vec![EndpointSpec::new("broken", "not a url")];
        assert!(config.validate().is_err());

        config.services.clear();
        config.timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.timeout = Duration::from_secs(1);
        config.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
