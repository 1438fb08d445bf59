use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::ConfigError;
use crate::pacing::Pacing;
use crate::plan::{StopCondition, DEFAULT_HOST, DEFAULT_PORT};
use crate::preset::{self, Preset};

pub const APP_NAME: &str = "spectra-emitter";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl TargetConfig {
    /// Merge command-line values over this target. Flags win; unset flags
    /// fall back to the config file, which itself falls back to the built-in
    /// defaults when it leaves a field out.
    pub fn resolve(&self, host: Option<String>, port: Option<u16>) -> TargetConfig {
        TargetConfig {
            host: host.unwrap_or_else(|| self.host.clone()),
            port: port.unwrap_or(self.port),
        }
    }
}

impl std::fmt::Display for TargetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Per-preset overrides. Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_mbps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_every: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_enter: Option<bool>,
}

impl PresetOverride {
    fn stop(&self, name: &str) -> Result<Option<StopCondition>, ConfigError> {
        match (self.count, self.duration_secs) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "preset '{}' sets both count and duration_secs",
                name
            ))),
            (Some(count), None) => Ok(Some(StopCondition::Count(count))),
            (None, Some(secs)) => Ok(Some(StopCondition::Duration(seconds(name, secs)?))),
            (None, None) => Ok(None),
        }
    }

    fn pacing(&self, name: &str) -> Result<Option<Pacing>, ConfigError> {
        match (self.interval_ms, self.rate_mbps) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(format!(
                "preset '{}' sets both interval_ms and rate_mbps",
                name
            ))),
            (Some(ms), None) => Ok(Some(Pacing::Fixed(seconds(name, ms / 1000.0)?))),
            (None, Some(mbps)) => Ok(Some(Pacing::from_mbps(mbps))),
            (None, None) => Ok(None),
        }
    }

    /// Apply on top of `base`, or build a new preset if there is no base
    pub fn apply(&self, name: &str, base: Option<Preset>) -> Result<Preset, ConfigError> {
        let stop = self.stop(name)?;
        let pacing = self.pacing(name)?;

        let mut preset = match base {
            Some(base) => base,
            None => {
                let (Some(stop), Some(pacing)) = (stop, pacing) else {
                    return Err(ConfigError::Invalid(format!(
                        "new preset '{}' needs a count or duration_secs and an interval_ms or rate_mbps",
                        name
                    )));
                };
                Preset {
                    name: name.to_string(),
                    description: String::new(),
                    instructions: Vec::new(),
                    stop,
                    pacing,
                    progress_every: 1000,
                    wait_for_enter: false,
                }
            }
        };

        if let Some(stop) = stop {
            preset.stop = stop;
        }
        if let Some(pacing) = pacing {
            preset.pacing = pacing;
        }
        if let Some(description) = &self.description {
            preset.description = description.clone();
        }
        if let Some(progress_every) = self.progress_every {
            preset.progress_every = progress_every;
        }
        if let Some(wait) = self.wait_for_enter {
            preset.wait_for_enter = wait;
        }

        preset
            .to_plan(DEFAULT_HOST, DEFAULT_PORT)
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("preset '{}': {}", name, e)))?;

        Ok(preset)
    }
}

fn seconds(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::Invalid(format!("preset '{}' has an invalid time value {}", name, secs))
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitterConfig {
    #[serde(default)]
    pub target: TargetConfig,

    /// Overrides and additions, keyed by preset name
    #[serde(default)]
    pub presets: BTreeMap<String, PresetOverride>,
}

impl EmitterConfig {
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields the built-in defaults; a missing
    /// explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        // Surface bad overrides at load time rather than when the preset is run
        config.presets()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(&self)?;
        fs::write(path, content)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Built-in presets with this config's overrides applied, plus any new ones
    pub fn presets(&self) -> Result<Vec<Preset>, ConfigError> {
        let mut presets = preset::builtin();

        for (name, overrides) in &self.presets {
            match presets.iter().position(|p| &p.name == name) {
                Some(idx) => {
                    let merged = overrides.apply(name, Some(presets[idx].clone()))?;
                    presets[idx] = merged;
                }
                None => presets.push(overrides.apply(name, None)?),
            }
        }

        Ok(presets)
    }
}
