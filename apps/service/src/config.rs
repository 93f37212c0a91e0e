use std::{env, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::monitoring::types::{Target, TargetMode};
use crate::validation;

pub const MIN_INTERVAL_SECS: u64 = 1;
pub const MAX_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_INTERVAL_SECS: u64 = 10;

const INSTRUCTIONS_FILE_NAME: &str = "INSTRUCTIONS.md";

/// Configuration failures are never fatal to the process; the engine falls
/// back to an empty target list and surfaces the message to observers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not resolve a writable configuration directory")]
    PathUnavailable,
    #[error("config file I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("config file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Persistent settings: the monitored services plus global display options.
/// Unknown fields are ignored and missing fields fall back to defaults, so
/// older and newer files both load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    pub services: Vec<Target>,
    pub update_interval_seconds: u64,
    pub symbol_up: String,
    pub symbol_down: String,
    pub symbol_disabled: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            update_interval_seconds: DEFAULT_INTERVAL_SECS,
            symbol_up: "🟢".to_string(),
            symbol_down: "🔴".to_string(),
            symbol_disabled: "⚪".to_string(),
        }
    }
}

impl Configuration {
    pub fn clamp_interval(seconds: u64) -> u64 {
        seconds.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS)
    }

    /// Contents of the default file written on first run: one example target
    /// the user can edit in place.
    fn example() -> Self {
        Self {
            services: vec![Target {
                name: "Example".to_string(),
                url: "https://example.com/health".to_string(),
                mode: TargetMode::Enabled,
            }],
            ..Self::default()
        }
    }

    fn normalized(mut self) -> Self {
        self.update_interval_seconds = Self::clamp_interval(self.update_interval_seconds);
        self
    }
}

/// Loads and saves the configuration file; the single source of truth for
/// desired state. Callers serialize load/save through the engine.
#[derive(Debug)]
pub struct ConfigStore {
    config_path: path::PathBuf,
}

/// Used to ensure we are actually reading a json file
fn normalize_json_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "json").unwrap_or(true) {
        path.set_extension("json");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/pulsebar/config.json or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::PathUnavailable);
    };

    Ok(path.join("pulsebar/config.json"))
}

impl ConfigStore {
    /// Resolve the store against an explicit path, or the default location
    /// when none is given.
    pub fn new(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path = if let Some(path) = optional_path {
            normalize_json_path(path.as_ref())
        } else {
            default_config_path()?
        };

        Ok(Self { config_path })
    }

    pub fn path(&self) -> &path::Path {
        &self.config_path
    }

    /// Read the configuration file.
    ///
    /// An absent file is not an error: a default file with one example
    /// target is written and returned. A present but unreadable or
    /// malformed file is an error; the engine must surface it rather than
    /// display fabricated targets.
    pub fn load(&self) -> Result<Configuration, ConfigError> {
        if !self.config_path.exists() {
            let config = Configuration::example();
            self.save(&config)?;
            self.write_instructions();
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.config_path)?;
        let config: Configuration = serde_json::from_str(&raw)?;
        let config = config.normalized();

        for service in &config.services {
            validation::warn_on_suspect_target(service);
        }

        self.write_instructions();
        Ok(config)
    }

    /// Serialize and overwrite the configuration file.
    ///
    /// The write goes to a sibling temp file first and is renamed into
    /// place, so a crash mid-write cannot leave a truncated file.
    pub fn save(&self, config: &Configuration) -> Result<(), ConfigError> {
        let serialized = serde_json::to_string_pretty(config)?;

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let staging = self.config_path.with_extension("json.tmp");
        fs::write(&staging, serialized)?;
        fs::rename(&staging, &self.config_path)?;
        Ok(())
    }

    /// Rewrite the schema documentation next to the config file. Purely
    /// documentary; a failure here must not fail the load.
    fn write_instructions(&self) {
        let Some(parent) = self.config_path.parent() else { return };
        let instructions_path = parent.join(INSTRUCTIONS_FILE_NAME);
        if let Err(error) = fs::write(&instructions_path, SCHEMA_INSTRUCTIONS) {
            warn!(path = %instructions_path.display(), error = %error, "failed to write instructions file");
        }
    }
}

const SCHEMA_INSTRUCTIONS: &str = r#"# pulsebar configuration

Edit `config.json` in this directory to choose which services are monitored.
The file is reloaded on request from the status menu; it is never edited by
hand by the application except to persist changes you make in the menu.

```json
{
  "services": [
    { "name": "My API", "url": "https://api.example.com/health", "mode": "enabled" }
  ],
  "updateIntervalSeconds": 10,
  "symbolUp": "🟢",
  "symbolDown": "🔴",
  "symbolDisabled": "⚪"
}
```

- `services` - checked in order; order is display order.
  - `name` - display label.
  - `url` - HTTP or HTTPS endpoint; any 2xx response counts as up.
  - `mode` - `"enabled"` or `"disabled"`; omitted means enabled.
- `updateIntervalSeconds` - polling interval, clamped to 1..60. Default 10.
- `symbolUp` / `symbolDown` / `symbolDisabled` - display glyphs.

All fields except `services`, `name`, and `url` are optional. Unknown fields
are ignored.
"#;
