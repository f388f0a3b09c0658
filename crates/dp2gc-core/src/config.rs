//! Configuration management
//!
//! Settings are read in this order of precedence:
//! 1. environment variables
//! 2. the `dp2gc.toml` config file
//! 3. built-in defaults
//!
//! `${VAR_NAME}` inside the config file is replaced by the environment
//! variable's value.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::quarter::{DateRange, QuarterTable, QuarterToken};
use crate::Error;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "dp2gc.toml";

/// Main configuration for dp2gc
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// University portal configuration
    pub portal: PortalConfig,

    /// Aggregation configuration
    pub aggregation: AggregationConfig,

    /// Quarter token to date range table
    pub quarters: QuarterTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Port for the HTTP server
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Login form endpoint
    #[serde(default = "default_login_url")]
    pub login_url: String,

    /// Calendar endpoint queried once per month
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent sent to the portal
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            api_url: default_api_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Scrape all months of a range at once
    #[serde(default)]
    pub concurrent: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    normalize_origins(vec![
        "https://dp2gc.vercel.app/".to_string(),
        "http://localhost:8000".to_string(),
        "http://localhost:3000".to_string(),
    ])
}

fn default_login_url() -> String {
    "https://portal.dhw.ac.jp/uprx/up/pk/pky001/Pky00101.xhtml".to_string()
}

fn default_api_url() -> String {
    "https://portal.dhw.ac.jp/uprx/up/bs/bsa001/Bsa00101.xhtml".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string()
}

/// Browsers send `Origin` without a trailing slash
fn normalize_origins(origins: Vec<String>) -> Vec<String> {
    origins
        .into_iter()
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

impl Config {
    /// Replace `${VAR_NAME}` with the environment variable's value.
    ///
    /// Unset variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                while let Some(c) = chars.next() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load settings from a TOML file, then apply environment overrides.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse TOML content (with `${VAR}` expansion). No env overrides.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let config: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Self::from_toml_config(config)
    }

    /// Load from `dp2gc.toml` if present, otherwise from the environment only
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Ok(Self::from_env())
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn from_toml_config(toml: TomlConfig) -> crate::Result<Self> {
        let server = toml.server.unwrap_or_default();
        let server_config = ServerConfig {
            host: server.host.unwrap_or_else(default_host),
            port: server.port.unwrap_or_else(default_port),
            allowed_origins: server
                .allowed_origins
                .map(normalize_origins)
                .unwrap_or_else(default_allowed_origins),
        };

        let portal = toml.portal.unwrap_or_default();
        let portal_config = PortalConfig {
            login_url: portal.login_url.unwrap_or_else(default_login_url),
            api_url: portal.api_url.unwrap_or_else(default_api_url),
            timeout_secs: portal.timeout_secs.unwrap_or_else(default_timeout_secs),
            user_agent: portal.user_agent.unwrap_or_else(default_user_agent),
        };

        let aggregation_config = AggregationConfig {
            concurrent: toml
                .aggregation
                .unwrap_or_default()
                .concurrent
                .unwrap_or(false),
        };

        // Tokens not listed keep their default range
        let mut quarters = QuarterTable::default();
        for entry in toml.quarters.unwrap_or_default() {
            let token: QuarterToken = entry
                .token
                .parse()
                .map_err(|_| Error::Config(format!("Unknown quarter token in config: {:?}", entry.token)))?;
            if entry.end < entry.start {
                return Err(Error::Config(format!(
                    "Quarter {} ends ({}) before it starts ({})",
                    token, entry.end, entry.start
                )));
            }
            quarters = quarters.with_entry(token, DateRange::new(entry.start, entry.end));
        }

        Ok(Config {
            server: server_config,
            portal: portal_config,
            aggregation: aggregation_config,
            quarters,
        })
    }

    /// Override settings from environment variables
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("API_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = std::env::var("API_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(origins) = std::env::var("API_ALLOWED_ORIGINS") {
            self.server.allowed_origins =
                normalize_origins(origins.split(',').map(|s| s.to_string()).collect());
        }

        if let Ok(url) = std::env::var("PORTAL_LOGIN_URL") {
            if !url.is_empty() {
                self.portal.login_url = url;
            }
        }
        if let Ok(url) = std::env::var("PORTAL_API_URL") {
            if !url.is_empty() {
                self.portal.api_url = url;
            }
        }
        if let Ok(timeout) = std::env::var("PORTAL_TIMEOUT_SECS") {
            if let Ok(t) = timeout.parse() {
                self.portal.timeout_secs = t;
            }
        }

        if let Ok(concurrent) = std::env::var("AGGREGATION_CONCURRENT") {
            self.aggregation.concurrent = parse_bool(&concurrent);
        }
    }
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    server: Option<TomlServerConfig>,
    portal: Option<TomlPortalConfig>,
    aggregation: Option<TomlAggregationConfig>,
    quarters: Option<Vec<TomlQuarterEntry>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlServerConfig {
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlPortalConfig {
    #[serde(default)]
    login_url: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    user_agent: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlAggregationConfig {
    #[serde(default)]
    concurrent: Option<bool>,
}

/// `[[quarters]]` entry. Dates are quoted ISO strings (`"2024-04-08"`).
#[derive(Debug, Deserialize)]
struct TomlQuarterEntry {
    token: String,
    start: NaiveDate,
    end: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
        assert_eq!(
            config.allowed_origins,
            vec![
                "https://dp2gc.vercel.app",
                "http://localhost:8000",
                "http://localhost:3000",
            ]
        );
    }

    #[test]
    fn test_portal_config_default() {
        let config = PortalConfig::default();
        assert!(config.login_url.ends_with("Pky00101.xhtml"));
        assert!(config.api_url.ends_with("Bsa00101.xhtml"));
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_aggregation_config_default() {
        assert!(!AggregationConfig::default().concurrent);
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("DP2GC_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${DP2GC_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${DP2GC_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("DP2GC_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("no_vars_here"), "no_vars_here");
        assert_eq!(Config::expand_env_vars("$HOME"), "$HOME");
    }

    #[test]
    fn test_normalize_origins() {
        let origins = normalize_origins(vec![
            " https://example.com/ ".to_string(),
            "".to_string(),
            "http://localhost:3000".to_string(),
        ]);
        assert_eq!(origins, vec!["https://example.com", "http://localhost:3000"]);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
[server]
host = "127.0.0.1"
port = 8080
allowed_origins = ["https://example.com/"]

[portal]
login_url = "http://localhost:9000/login"
api_url = "http://localhost:9000/calendar"
timeout_secs = 5

[aggregation]
concurrent = true

[[quarters]]
token = "1q"
start = "2024-04-08"
end = "2024-06-07"
"#;

        let config = Config::from_toml_str(toml_content).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.allowed_origins, vec!["https://example.com"]);

        assert_eq!(config.portal.login_url, "http://localhost:9000/login");
        assert_eq!(config.portal.api_url, "http://localhost:9000/calendar");
        assert_eq!(config.portal.timeout_secs, 5);
        assert_eq!(config.portal.user_agent, default_user_agent());

        assert!(config.aggregation.concurrent);

        let q1 = config.quarters.get(QuarterToken::First).unwrap();
        assert_eq!(q1.start, NaiveDate::from_ymd_opt(2024, 4, 8).unwrap());
        assert_eq!(q1.end, NaiveDate::from_ymd_opt(2024, 6, 7).unwrap());

        // Untouched tokens keep the default table
        assert_eq!(
            config.quarters.get(QuarterToken::Fourth),
            QuarterTable::default().get(QuarterToken::Fourth)
        );
    }

    #[test]
    fn test_toml_empty_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.quarters, QuarterTable::default());
    }

    #[test]
    fn test_toml_rejects_unknown_quarter() {
        let toml_content = r#"
[[quarters]]
token = "5q"
start = "2024-04-08"
end = "2024-06-07"
"#;
        let err = Config::from_toml_str(toml_content).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_toml_rejects_inverted_quarter() {
        let toml_content = r#"
[[quarters]]
token = "2q"
start = "2024-08-01"
end = "2024-06-01"
"#;
        assert!(Config::from_toml_str(toml_content).is_err());
    }

    #[test]
    fn test_toml_expands_env_vars() {
        unsafe {
            std::env::set_var("DP2GC_TEST_PORTAL_HOST", "portal.test");
        }

        let config = Config::from_toml_str(
            r#"
[portal]
login_url = "https://${DP2GC_TEST_PORTAL_HOST}/login"
"#,
        )
        .unwrap();
        assert_eq!(config.portal.login_url, "https://portal.test/login");

        unsafe {
            std::env::remove_var("DP2GC_TEST_PORTAL_HOST");
        }
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aggregation]\nconcurrent = true").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert!(config.aggregation.concurrent);
    }

    #[test]
    fn test_from_toml_file_missing() {
        let err = Config::from_toml_file("/nonexistent/dp2gc.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
