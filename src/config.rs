use crate::error::ConfigError;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Connection and scoping settings for one run against the IPAM backend
#[derive(Clone)]
pub struct BamConfig {
    /// Address Manager hostname, optionally with a port
    pub server: Option<String>,

    /// API user name
    pub username: Option<String>,

    /// API password (never logged)
    pub password: Option<String>,

    /// Configuration name every lookup is scoped under
    pub configuration: Option<String>,

    /// DNS View name, needed to resolve zone names
    pub view: Option<String>,

    /// Whether to talk HTTPS to the server
    pub use_https: bool,

    /// Whether to verify the server certificate
    pub verify_tls: bool,

    /// Timeout for each HTTP request
    pub timeout: Duration,

    /// Retries for idempotent calls after a transport failure (0 = never retry)
    pub retries: u32,

    /// Log level: a name or number (`WARNING`, `20`) or a tracing directive
    pub logging: String,
}

impl Default for BamConfig {
    fn default() -> Self {
        Self {
            server: None,
            username: None,
            password: None,
            configuration: None,
            view: None,
            use_https: true,
            verify_tls: true,
            timeout: Duration::from_secs(30),
            retries: 0,
            logging: "WARNING".to_string(),
        }
    }
}

impl fmt::Debug for BamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BamConfig")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("configuration", &self.configuration)
            .field("view", &self.view)
            .field("use_https", &self.use_https)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("logging", &self.logging)
            .finish()
    }
}

impl BamConfig {
    /// Create a BamConfig from environment variables on top of the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load a TOML file, then apply environment overrides
    pub fn from_file_and_env<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ParseError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let toml_value: toml::Value = toml::from_str(&content)?;

        let mut config = Self::default();
        config.apply_partial_update(&toml_value)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Settings file from `config_file`, else `BLUECAT_CONFIG_FILE`, then the environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        match config_file {
            Some(path) => Self::from_file_and_env(path),
            None => match env_non_empty("BLUECAT_CONFIG_FILE") {
                Some(path) => Self::from_file_and_env(path),
                None => Self::from_env(),
            },
        }
    }

    /// Override fields from `BLUECAT_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(server) = env_non_empty("BLUECAT_SERVER") {
            self.server = Some(server);
        }
        if let Some(username) = env_non_empty("BLUECAT_USERNAME") {
            self.username = Some(username);
        }
        if let Some(password) = env_non_empty("BLUECAT_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(configuration) = env_non_empty("BLUECAT_CONFIGURATION") {
            self.configuration = Some(configuration);
        }
        if let Some(view) = env_non_empty("BLUECAT_VIEW") {
            self.view = Some(view);
        }

        if let Ok(use_https) = std::env::var("BLUECAT_HTTPS") {
            self.use_https = parse_bool(&use_https, true);
        }

        if let Ok(verify_tls) = std::env::var("BLUECAT_VERIFY_TLS") {
            self.verify_tls = parse_bool(&verify_tls, true);
        }

        if let Ok(timeout_str) = std::env::var("BLUECAT_TIMEOUT") {
            self.timeout = parse_timeout(&timeout_str)?;
        }

        if let Ok(retries) = std::env::var("BLUECAT_RETRIES") {
            self.retries = retries
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidRetries(retries.clone()))?;
        }

        if let Some(logging) = env_non_empty("BLUECAT_LOGGING") {
            self.logging = logging;
        }

        Ok(())
    }

    /// Apply the keys present in a parsed TOML document, leaving the rest alone
    pub fn apply_partial_update(&mut self, value: &toml::Value) -> Result<(), ConfigError> {
        let table = value
            .as_table()
            .ok_or_else(|| ConfigError::ParseError("expected a TOML table".to_string()))?;

        for (key, item) in table {
            match key.as_str() {
                "server" => self.server = Some(toml_str(key, item)?),
                "username" => self.username = Some(toml_str(key, item)?),
                "password" => self.password = Some(toml_str(key, item)?),
                "configuration" => self.configuration = Some(toml_str(key, item)?),
                "view" => self.view = Some(toml_str(key, item)?),
                "logging" => self.logging = toml_str(key, item)?,
                "use_https" => self.use_https = toml_bool(key, item)?,
                "verify_tls" => self.verify_tls = toml_bool(key, item)?,
                "timeout" => {
                    let secs = toml_int(key, item)?;
                    self.timeout = parse_timeout(&secs.to_string())?;
                }
                "retries" => {
                    let retries = toml_int(key, item)?;
                    self.retries = u32::try_from(retries)
                        .map_err(|_| ConfigError::InvalidRetries(retries.to_string()))?;
                }
                other => {
                    return Err(ConfigError::ParseError(format!(
                        "unknown configuration key: {}",
                        other
                    )));
                }
            }
        }

        Ok(())
    }

    /// Validate the configuration before opening a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = self
            .server
            .as_deref()
            .ok_or(ConfigError::Missing("server"))?;
        if server.contains("://") || server.contains('/') || server.contains(char::is_whitespace)
        {
            return Err(ConfigError::InvalidServer(server.to_string()));
        }

        if self.username.is_none() {
            return Err(ConfigError::Missing("username"));
        }
        if self.password.is_none() {
            return Err(ConfigError::Missing("password"));
        }
        if self.configuration.is_none() {
            return Err(ConfigError::Missing("configuration"));
        }

        if self.timeout.is_zero() || self.timeout.as_secs() > 300 {
            return Err(ConfigError::InvalidTimeout(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if self.retries > 10 {
            return Err(ConfigError::InvalidRetries(
                "Retries too large (max 10)".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL of the REST service, e.g. `https://bam.example.com/Services/REST/v1/`
    pub fn base_url(&self) -> Option<String> {
        let scheme = if self.use_https { "https" } else { "http" };
        self.server
            .as_deref()
            .map(|server| format!("{}://{}/Services/REST/v1/", scheme, server))
    }

    /// Tracing filter directive for the configured log level
    pub fn log_filter(&self) -> String {
        log_filter(&self.logging)
    }
}

/// Map a level name or number to a tracing directive.
///
/// Unknown values pass through untouched so full `EnvFilter` directives work.
pub fn log_filter(level: &str) -> String {
    let level = level.trim();
    match level.to_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "50" | "ERROR" | "40" => "error".to_string(),
        "WARNING" | "WARN" | "30" => "warn".to_string(),
        "INFO" | "20" => "info".to_string(),
        "DEBUG" | "10" => "debug".to_string(),
        "TRACE" | "NOTSET" | "0" => "trace".to_string(),
        _ => level.to_string(),
    }
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_timeout(s: &str) -> Result<Duration, ConfigError> {
    let secs = s
        .trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(s.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidTimeout(
            "Timeout must be greater than 0".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn toml_str(key: &str, value: &toml::Value) -> Result<String, ConfigError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::ParseError(format!("{} must be a string", key)))
}

fn toml_bool(key: &str, value: &toml::Value) -> Result<bool, ConfigError> {
    value
        .as_bool()
        .ok_or_else(|| ConfigError::ParseError(format!("{} must be a boolean", key)))
}

fn toml_int(key: &str, value: &toml::Value) -> Result<i64, ConfigError> {
    value
        .as_integer()
        .ok_or_else(|| ConfigError::ParseError(format!("{} must be an integer", key)))
}
