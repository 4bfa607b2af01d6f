use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub airtable: AirtableConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Upper bound for a single remote refresh, in seconds
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
  /// Serve the built-in fixture projects when no remote data is available
  #[serde(default)]
  pub fixtures: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      airtable: AirtableConfig::default(),
      cache: CacheConfig::default(),
      request_timeout_secs: default_request_timeout_secs(),
      fixtures: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirtableConfig {
  #[serde(default = "default_api_url")]
  pub api_url: String,
  #[serde(default = "default_view")]
  pub view: String,
  #[serde(default)]
  pub tables: TablesConfig,
}

impl Default for AirtableConfig {
  fn default() -> Self {
    Self {
      api_url: default_api_url(),
      view: default_view(),
      tables: TablesConfig::default(),
    }
  }
}

/// Table names inside the base
#[derive(Debug, Clone, Deserialize)]
pub struct TablesConfig {
  #[serde(default = "default_projects_table")]
  pub projects: String,
  #[serde(default = "default_about_table")]
  pub about: String,
  #[serde(default = "default_research_ops_table")]
  pub research_ops: String,
}

impl Default for TablesConfig {
  fn default() -> Self {
    Self {
      projects: default_projects_table(),
      about: default_about_table(),
      research_ops: default_research_ops_table(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a cached entry stays fresh, in seconds
  #[serde(default = "default_fresh_for_secs")]
  pub fresh_for_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      fresh_for_secs: default_fresh_for_secs(),
    }
  }
}

fn default_api_url() -> String {
  "https://api.airtable.com/v0".to_string()
}

fn default_view() -> String {
  "Grid view".to_string()
}

fn default_projects_table() -> String {
  "Case Studies".to_string()
}

fn default_about_table() -> String {
  "About".to_string()
}

fn default_research_ops_table() -> String {
  "Research Ops".to_string()
}

/// Longest accepted freshness window (one year)
pub const MAX_FRESH_FOR_SECS: u64 = 365 * 24 * 60 * 60;

fn default_fresh_for_secs() -> u64 {
  5 * 60
}

fn default_request_timeout_secs() -> u64 {
  10
}

/// Personal access token and base id for the Airtable workspace
#[derive(Clone)]
pub struct Credentials {
  pub token: String,
  pub base_id: String,
}

impl std::fmt::Debug for Credentials {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Credentials")
      .field("token", &"***")
      .field("base_id", &self.base_id)
      .finish()
  }
}

impl Credentials {
  /// Base id shortened for log output
  pub fn base_id_hint(&self) -> String {
    let prefix: String = self.base_id.chars().take(8).collect();
    format!("{}...", prefix)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./folio.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/folio/config.yaml
  ///
  /// Without a file the built-in defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("folio.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("folio").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty document deserializes as unit, not as a map
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    let config: Self = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.cache.fresh_for_secs > MAX_FRESH_FOR_SECS {
      return Err(eyre!(
        "cache.fresh_for_secs out of range: {} (max {})",
        self.cache.fresh_for_secs,
        MAX_FRESH_FOR_SECS
      ));
    }
    Ok(())
  }

  /// Freshness window, capped at [`MAX_FRESH_FOR_SECS`].
  pub fn fresh_for(&self) -> chrono::Duration {
    let secs = self.cache.fresh_for_secs.min(MAX_FRESH_FOR_SECS) as i64;
    chrono::Duration::try_seconds(secs).unwrap_or_else(|| chrono::Duration::days(365))
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }

  /// Read Airtable credentials from the environment.
  ///
  /// Checks FOLIO_AIRTABLE_PAT / FOLIO_AIRTABLE_BASE_ID first, then
  /// AIRTABLE_PAT / AIRTABLE_BASE_ID. Returns `None` when either is unset
  /// or empty.
  pub fn credentials() -> Option<Credentials> {
    Self::credentials_from(|name| std::env::var(name).ok())
  }

  fn credentials_from(lookup: impl Fn(&str) -> Option<String>) -> Option<Credentials> {
    let read = |primary: &str, fallback: &str| {
      lookup(primary)
        .or_else(|| lookup(fallback))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    };

    let token = read("FOLIO_AIRTABLE_PAT", "AIRTABLE_PAT");
    let base_id = read("FOLIO_AIRTABLE_BASE_ID", "AIRTABLE_BASE_ID");

    match (token, base_id) {
      (Some(token), Some(base_id)) => Some(Credentials { token, base_id }),
      _ => None,
    }
  }
}
