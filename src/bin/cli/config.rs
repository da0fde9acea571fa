use super::{PivotArg, SynchronousArg};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Tunables that can come from flags, a profile or the `[defaults]` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub top_k: Option<usize>,
    pub info_interval: Option<u64>,
    pub pivot: Option<PivotArg>,
    pub neighbor_cache: Option<usize>,
    pub intern_cache: Option<usize>,
    pub batch_documents: Option<usize>,
    pub synchronous: Option<SynchronousArg>,
    pub dedup_edges: Option<bool>,
    pub defer_indexes: Option<bool>,
    pub time_limit_secs: Option<u64>,
    pub max_calls: Option<u64>,
}

impl Settings {
    /// Fills every unset field from `fallback`.
    pub fn or(self, fallback: &Settings) -> Settings {
        Settings {
            top_k: self.top_k.or(fallback.top_k),
            info_interval: self.info_interval.or(fallback.info_interval),
            pivot: self.pivot.or(fallback.pivot),
            neighbor_cache: self.neighbor_cache.or(fallback.neighbor_cache),
            intern_cache: self.intern_cache.or(fallback.intern_cache),
            batch_documents: self.batch_documents.or(fallback.batch_documents),
            synchronous: self.synchronous.or(fallback.synchronous),
            dedup_edges: self.dedup_edges.or(fallback.dedup_edges),
            defer_indexes: self.defer_indexes.or(fallback.defer_indexes),
            time_limit_secs: self.time_limit_secs.or(fallback.time_limit_secs),
            max_calls: self.max_calls.or(fallback.max_calls),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Settings::default()
    }

    /// `key = value` pairs for every set field, in config-file spelling.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        let mut push = |key: &'static str, value: Option<String>| {
            if let Some(value) = value {
                out.push((key, value));
            }
        };
        push("top_k", self.top_k.map(|v| v.to_string()));
        push("info_interval", self.info_interval.map(|v| v.to_string()));
        push("pivot", self.pivot.map(pivot_to_string));
        push("neighbor_cache", self.neighbor_cache.map(|v| v.to_string()));
        push("intern_cache", self.intern_cache.map(|v| v.to_string()));
        push("batch_documents", self.batch_documents.map(|v| v.to_string()));
        push("synchronous", self.synchronous.map(sync_to_string));
        push("dedup_edges", self.dedup_edges.map(|v| v.to_string()));
        push("defer_indexes", self.defer_indexes.map(|v| v.to_string()));
        push("time_limit_secs", self.time_limit_secs.map(|v| v.to_string()));
        push("max_calls", self.max_calls.map(|v| v.to_string()));
        out
    }
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub settings: Settings,
}

#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
    defaults: Settings,
    profiles: BTreeMap<String, Profile>,
}

impl CliConfig {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        let defaults = convert_settings("defaults", &data.defaults)?;
        let profiles = parse_profiles(&data)?;
        Ok(Self {
            path,
            data,
            defaults,
            profiles,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn defaults(&self) -> &Settings {
        &self.defaults
    }

    pub fn default_profile_name(&self) -> Option<&str> {
        self.data
            .default_profile
            .as_deref()
            .filter(|name| self.profiles.contains_key(*name))
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Resolves flag > profile > `[defaults]`; built-in defaults apply later.
    pub fn resolve(&self, flags: Settings, profile: Option<&str>) -> Result<Settings, ConfigError> {
        let selected = match profile {
            Some(name) => Some(self.profile(name).ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })?),
            None => self.default_profile_name().and_then(|name| self.profile(name)),
        };
        let flags = match selected {
            Some(profile) => flags.or(&profile.settings),
            None => flags,
        };
        Ok(flags.or(&self.defaults))
    }

    pub fn set_default_profile(&mut self, name: Option<&str>) -> Result<(), ConfigError> {
        if let Some(name) = name {
            if !self.profiles.contains_key(name) {
                return Err(ConfigError::ProfileNotFound {
                    name: name.to_string(),
                });
            }
            self.data.default_profile = Some(name.to_string());
        } else {
            self.data.default_profile = None;
        }
        Ok(())
    }

    pub fn upsert_profile(&mut self, name: &str, update: &Settings) -> Result<(), ConfigError> {
        let entry = self.data.profiles.entry(name.to_string()).or_default();
        let merged = convert_settings(name, entry)?;
        let merged = update.clone().or(&merged);
        *entry = RawSettings::from(&merged);
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }

    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let target = if let Some(path) = &self.path {
            path.clone()
        } else if let Some(default) = default_config_path() {
            default
        } else {
            return Err(ConfigError::NoConfigPath);
        };
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let serialized = toml::to_string_pretty(&self.data)
            .map_err(|source| ConfigError::Serialize { source })?;
        fs::write(&target, serialized).map_err(|source| ConfigError::Write {
            path: target.clone(),
            source,
        })?;
        Ok(target)
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<(), ConfigError> {
        if self.data.profiles.remove(name).is_none() {
            return Err(ConfigError::ProfileNotFound {
                name: name.to_string(),
            });
        }
        if self.data.default_profile.as_deref() == Some(name) {
            self.data.default_profile = None;
        }
        self.profiles = parse_profiles(&self.data)?;
        Ok(())
    }
}

fn sync_to_string(value: SynchronousArg) -> String {
    match value {
        SynchronousArg::Full => "full",
        SynchronousArg::Normal => "normal",
        SynchronousArg::Off => "off",
    }
    .to_string()
}

fn pivot_to_string(value: PivotArg) -> String {
    match value {
        PivotArg::First => "first",
        PivotArg::MaxCandidates => "max-candidates",
    }
    .to_string()
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_profiles(data: &RawConfig) -> Result<BTreeMap<String, Profile>, ConfigError> {
    let mut profiles = BTreeMap::new();
    for (name, raw) in &data.profiles {
        let profile = Profile {
            name: name.clone(),
            settings: convert_settings(name, raw)?,
        };
        profiles.insert(name.clone(), profile);
    }
    if let Some(default_name) = data.default_profile.as_ref() {
        if !profiles.contains_key(default_name) {
            return Err(ConfigError::ProfileNotFound {
                name: default_name.clone(),
            });
        }
    }
    Ok(profiles)
}

fn convert_settings(name: &str, raw: &RawSettings) -> Result<Settings, ConfigError> {
    let synchronous = match raw.synchronous.as_deref() {
        Some(value) => Some(SynchronousArg::from_str(value, true).map_err(|_| {
            ConfigError::InvalidValue {
                profile: name.to_string(),
                key: "synchronous",
                value: value.to_string(),
            }
        })?),
        None => None,
    };
    let pivot = match raw.pivot.as_deref() {
        Some(value) => Some(PivotArg::from_str(value, true).map_err(|_| {
            ConfigError::InvalidValue {
                profile: name.to_string(),
                key: "pivot",
                value: value.to_string(),
            }
        })?),
        None => None,
    };
    Ok(Settings {
        top_k: raw.top_k,
        info_interval: raw.info_interval,
        pivot,
        neighbor_cache: raw.neighbor_cache,
        intern_cache: raw.intern_cache,
        batch_documents: raw.batch_documents,
        synchronous,
        dedup_edges: raw.dedup_edges,
        defer_indexes: raw.defer_indexes,
        time_limit_secs: raw.time_limit_secs,
        max_calls: raw.max_calls,
    })
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    default_profile: Option<String>,
    #[serde(default)]
    defaults: RawSettings,
    #[serde(default)]
    profiles: BTreeMap<String, RawSettings>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct RawSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    info_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pivot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    neighbor_cache: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intern_cache: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    synchronous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dedup_edges: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defer_indexes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_limit_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_calls: Option<u64>,
}

impl From<&Settings> for RawSettings {
    fn from(value: &Settings) -> Self {
        Self {
            top_k: value.top_k,
            info_interval: value.info_interval,
            pivot: value.pivot.map(pivot_to_string),
            neighbor_cache: value.neighbor_cache,
            intern_cache: value.intern_cache,
            batch_documents: value.batch_documents,
            synchronous: value.synchronous.map(sync_to_string),
            dedup_edges: value.dedup_edges,
            defer_indexes: value.defer_indexes,
            time_limit_secs: value.time_limit_secs,
            max_calls: value.max_calls,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize CLI config: {source}")]
    Serialize { source: toml::ser::Error },
    #[error("failed to write CLI config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },
    #[error("profile '{profile}' {key} value '{value}' is invalid")]
    InvalidValue {
        profile: String,
        key: &'static str,
        value: String,
    },
    #[error("no config directory found; pass --config or set LINKCLIQUE_CONFIG")]
    NoConfigPath,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("linkclique").join("cli.toml"))
}
