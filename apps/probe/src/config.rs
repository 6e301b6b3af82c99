use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Args;
use crate::monitoring::Schedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: std::io::Error },

    #[error("Failed to write {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: std::io::Error },

    #[error("Failed to parse {path}: {source}")]
    ParseFailed { path: path::PathBuf, source: toml::de::Error },

    #[error("Failed to serialize configuration: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("No configuration directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub probe: ProbeSettings,
    pub resolver: ResolverSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Local database file, or a `libsql://` / `http(s)://` URL
    pub name: String,
    pub user: String,
    /// Auth token when `name` is a remote URL
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub interval_ms: u64,
    pub flush_every_n_ticks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub attempts: usize,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 0 = debug, 1 = info, 2 = warnings, 3 and up = errors only
    pub verbosity: u8,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { name: "dnsprobe".into(), user: "root".into(), password: String::new() }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self { interval_ms: 1000, flush_every_n_ticks: 4 }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self { attempts: 2, timeout_ms: 5000 }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { verbosity: 1 }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/dnsprobe/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("dnsprobe/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let password = if self.database.password.is_empty() { "<unset>" } else { "<set>" };

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Database")?;
        write_1(f, "Name", &self.database.name)?;
        write_1(f, "User", &self.database.user)?;
        write_1(f, "Password", &password)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Interval (ms)", &self.probe.interval_ms)?;
        write_1(f, "Flush every N ticks", &self.probe.flush_every_n_ticks)?;
        write_title_1(f, "Resolver")?;
        write_1(f, "Attempts", &self.resolver.attempts)?;
        write_1(f, "Timeout (ms)", &self.resolver.timeout_ms)?;
        write_title_1(f, "Logging")?;
        write_1(f, "Verbosity", &self.logging.verbosity)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/dnsprobe/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```ignore
    /// let cfg = config::Config::from_config(None::<&path::Path>)?;
    /// println!("{}", cfg);
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            toml::from_str(raw_string.as_str())
                .map_err(|source| ConfigError::ParseFailed { path: config_path, source })
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str).map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Command-line flags win over file values
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(name) = &args.database {
            self.database.name = name.clone();
        }
        if let Some(user) = &args.user {
            self.database.user = user.clone();
        }
        if let Some(password) = &args.password {
            self.database.password = password.clone();
        }
        if let Some(interval_ms) = args.probe_interval {
            self.probe.interval_ms = interval_ms;
        }
        if let Some(verbosity) = args.verbosity {
            self.logging.verbosity = verbosity;
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::new(Duration::from_millis(self.probe.interval_ms), self.probe.flush_every_n_ticks)
    }
}
