use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Path tried when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "orbwatch.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub detect: DetectConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub palette: PaletteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_root")]
    pub root: PathBuf,

    #[serde(default = "default_element_max_age")]
    pub element_max_age_minutes: u64,

    #[serde(default = "default_feed_max_age")]
    pub feed_max_age_minutes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `{group}` is replaced by the URL-encoded group name
    #[serde(default = "default_element_url")]
    pub element_url: String,

    /// `{name}` is replaced by the URL-encoded object name
    #[serde(default = "default_famous_url")]
    pub famous_url: String,

    /// Objects always merged ahead of the group catalog; empty disables
    #[serde(default = "default_famous_names")]
    pub famous_names: Vec<String>,

    /// URL template per feed name; `{api_key}` is substituted
    #[serde(default = "default_feeds")]
    pub feeds: BTreeMap<String, String>,

    #[serde(default = "default_api_key")]
    pub api_key: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_group")]
    pub default_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectConfig {
    #[serde(default = "default_threshold_km")]
    pub threshold_km: f64,

    #[serde(default = "default_window_minutes")]
    pub window_minutes: u64,

    #[serde(default = "default_step_seconds")]
    pub step_seconds: u64,

    /// Cap on objects entering the pairwise search
    #[serde(default = "default_max_objects")]
    pub max_objects: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// JSON centroid model; classification is skipped when unset
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteConfig {
    #[serde(default = "default_famous_colors")]
    pub famous: HashMap<String, String>,

    /// Keyed by type label ("Payload", "Rocket Body", "Debris", "Unknown")
    #[serde(default = "default_type_colors")]
    pub types: HashMap<String, String>,

    #[serde(default = "default_fallback_color")]
    pub fallback: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_cache_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_element_max_age() -> u64 {
    180
}

fn default_feed_max_age() -> u64 {
    60
}

fn default_element_url() -> String {
    "https://celestrak.org/NORAD/elements/gp.php?GROUP={group}&FORMAT=tle".to_string()
}

fn default_famous_url() -> String {
    "https://celestrak.org/NORAD/elements/gp.php?NAME={name}&FORMAT=tle".to_string()
}

fn default_famous_names() -> Vec<String> {
    ["ISS (ZARYA)", "HUBBLE SPACE TELESCOPE", "LANDSAT 8", "SENTINEL-2A", "STARLINK-1130"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_feeds() -> BTreeMap<String, String> {
    [
        ("notifications", "https://api.nasa.gov/DONKI/notifications?api_key={api_key}"),
        ("neo", "https://api.nasa.gov/neo/rest/v1/feed/today?detailed=false&api_key={api_key}"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_api_key() -> String {
    "DEMO_KEY".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_group() -> String {
    "active".to_string()
}

fn default_threshold_km() -> f64 {
    10.0
}

fn default_window_minutes() -> u64 {
    60
}

fn default_step_seconds() -> u64 {
    30
}

fn default_max_objects() -> usize {
    60
}

fn default_famous_colors() -> HashMap<String, String> {
    [
        ("ISS (ZARYA)", "white"),
        ("HUBBLE SPACE TELESCOPE", "violet"),
        ("LANDSAT 8", "green"),
        ("SENTINEL-2A", "cyan"),
        ("STARLINK-1130", "blue"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_type_colors() -> HashMap<String, String> {
    [
        ("Payload", "#33e633"),
        ("Rocket Body", "#ffe633"),
        ("Debris", "#ff4d4d"),
        ("Unknown", "#cccccc"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_fallback_color() -> String {
    "red".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            cache: CacheConfig::default(),
            source: SourceConfig::default(),
            detect: DetectConfig::default(),
            classifier: ClassifierConfig::default(),
            palette: PaletteConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
            element_max_age_minutes: default_element_max_age(),
            feed_max_age_minutes: default_feed_max_age(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            element_url: default_element_url(),
            famous_url: default_famous_url(),
            famous_names: default_famous_names(),
            feeds: default_feeds(),
            api_key: default_api_key(),
            timeout_seconds: default_timeout_seconds(),
            default_group: default_group(),
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            threshold_km: default_threshold_km(),
            window_minutes: default_window_minutes(),
            step_seconds: default_step_seconds(),
            max_objects: default_max_objects(),
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            famous: default_famous_colors(),
            types: default_type_colors(),
            fallback: default_fallback_color(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load an explicit path (must exist), or the default path if present.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}
