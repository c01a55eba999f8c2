use anyhow::{Context, Result};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, read from the environment once at startup and
/// passed by reference into the store and gateway constructors.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream lemonade-server settings
    pub upstream: UpstreamConfig,

    /// Bind settings for the manager UI
    pub bind: BindConfig,

    /// Per-operation timeout tiers
    pub timeouts: TimeoutConfig,

    /// Paths of the two persisted documents
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the Lemonade Server instance
    pub base_url: String,

    /// Optional API key, attached as a bearer token to every request
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BindConfig {
    /// Host interface to bind the manager UI to
    pub host: String,

    /// Port for the manager UI
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Loading a model (minutes-scale)
    pub load: Duration,

    /// Stats/health/unload/delete (seconds-scale)
    pub light: Duration,

    /// Pulling a model (can take a long time)
    pub pull: Duration,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// The native lemonade-server configuration file (recipe_options.json)
    pub recipe_file: PathBuf,

    /// Local preferences for this manager (stores the 'disabled' list)
    pub prefs_file: PathBuf,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

fn default_load_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_light_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_pull_timeout() -> Duration {
    Duration::from_secs(3600)
}

fn default_prefs_file() -> PathBuf {
    PathBuf::from("manager_prefs.json")
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            load: default_load_timeout(),
            light: default_light_timeout(),
            pull: default_pull_timeout(),
        }
    }
}

impl Config {
    /// Load the full configuration from the environment.
    ///
    /// Unset and empty variables fall back to their defaults; a variable
    /// that is set but unparseable is a startup error.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            upstream: UpstreamConfig {
                base_url: env_string("LEMONADE_BASE").unwrap_or_else(default_base_url),
                api_key: env_string("LEMONADE_KEY"),
            },
            bind: BindConfig {
                host: env_string("MANAGER_HOST").unwrap_or_else(default_host),
                port: env_parse("MANAGER_PORT")?.unwrap_or_else(default_port),
            },
            timeouts: TimeoutConfig {
                load: env_duration("TIMEOUT_LOAD")?.unwrap_or_else(default_load_timeout),
                light: env_duration("TIMEOUT_LIGHT")?.unwrap_or_else(default_light_timeout),
                pull: env_duration("TIMEOUT_PULL")?.unwrap_or_else(default_pull_timeout),
            },
            storage: StorageConfig {
                recipe_file: match env_string("RECIPE_FILE") {
                    Some(path) => PathBuf::from(path),
                    None => default_recipe_file()?,
                },
                prefs_file: env_string("PREFS_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_prefs_file),
            },
        })
    }

    /// Get the server's cache directory: ~/.cache/lemonade/
    pub fn base_dir() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("USERPROFILE").map(PathBuf::from))
            .map_err(|_| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".cache").join("lemonade"))
    }
}

impl BindConfig {
    /// Resolve the bind address (hostnames allowed).
    pub fn addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("could not resolve bind host {}", self.host))
    }
}

/// Default path of the server-native options file: ~/.cache/lemonade/recipe_options.json
fn default_recipe_file() -> Result<PathBuf> {
    Ok(Config::base_dir()?.join("recipe_options.json"))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(key) {
        Some(raw) => {
            let value = raw
                .parse::<T>()
                .with_context(|| format!("invalid value for {}: {:?}", key, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Timeouts are given in seconds, fractions allowed.
fn env_duration(key: &str) -> Result<Option<Duration>> {
    match env_parse::<f64>(key)? {
        Some(secs) if secs.is_finite() && secs >= 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
        Some(secs) => Err(anyhow::anyhow!("invalid value for {}: {}", key, secs)),
        None => Ok(None),
    }
}
