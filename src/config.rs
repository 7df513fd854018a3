//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.purpose-dash.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".purpose-dash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Managed backend connection.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Sign-in settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Names of the reporting views.
    #[serde(default)]
    pub views: ViewsConfig,

    /// Report and export settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Managed backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    #[serde(default)]
    pub url: String,

    /// Public anonymous API key sent as the `apikey` header.
    #[serde(default)]
    pub anon_key: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// Magic-link sign-in settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Where the emailed link sends the browser after sign-in.
    #[serde(default = "default_redirect_url")]
    pub redirect_url: String,

    /// File holding the current session tokens.
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            redirect_url: default_redirect_url(),
            session_file: default_session_file(),
        }
    }
}

fn default_redirect_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_session_file() -> PathBuf {
    PathBuf::from(".purpose-dash-session.json")
}

/// Reporting view names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Per-program daily census rows.
    #[serde(default = "default_census_view")]
    pub daily_census: String,

    /// Discharge events.
    #[serde(default = "default_discharges_view")]
    pub discharges: String,
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            daily_census: default_census_view(),
            discharges: default_discharges_view(),
        }
    }
}

fn default_census_view() -> String {
    "vw_daily_census".to_string()
}

fn default_discharges_view() -> String {
    "vw_discharges".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Rows per page of the discharge table.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Default CSV export file.
    #[serde(default = "default_export_file")]
    pub export_file: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            export_file: default_export_file(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

fn default_export_file() -> PathBuf {
    PathBuf::from("kpi_data.csv")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(Path::new(CONFIG_FILE))
    }

    fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings, but only when actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.backend_url {
            self.backend.url = url.clone();
        }
        if let Some(ref key) = args.anon_key {
            self.backend.anon_key = key.clone();
        }
        if let Some(timeout) = args.timeout {
            self.backend.timeout_seconds = timeout;
        }
        if let Some(ref redirect) = args.redirect_url {
            self.auth.redirect_url = redirect.clone();
        }
        if let Some(ref session_file) = args.session_file {
            self.auth.session_file = session_file.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check the settings every backend call depends on.
    pub fn validate_backend(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if url.is_empty() {
            anyhow::bail!(
                "Backend URL is not configured. Set SUPABASE_URL, pass --backend-url, or add [backend] url to {}",
                CONFIG_FILE
            );
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("Backend URL must start with 'http://' or 'https://'");
        }
        if self.backend.timeout_seconds == 0 {
            anyhow::bail!("Backend timeout_seconds must be at least 1");
        }
        if self.backend.anon_key.trim().is_empty() {
            anyhow::bail!(
                "Backend API key is not configured. Set SUPABASE_ANON_KEY, pass --anon-key, or add [backend] anon_key to {}",
                CONFIG_FILE
            );
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
