use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub inventory: InventoryConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Worker threads for per-host processing. 0 = one per CPU.
    pub workers: usize,
    /// Exit non-zero when any host had to be skipped.
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Path or name of the knife executable.
    pub knife_bin: String,
    /// Extra arguments appended to every knife invocation,
    /// e.g. `["-c", "/etc/chef/knife.rb"]`.
    pub knife_args: Vec<String>,
    /// Role searched when none is given on the command line.
    pub default_role: String,
    /// Give up on the registry query after this many seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Print the probe's own guest_*_total figures under each host.
    pub show_probe_totals: bool,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { workers: 0, strict: false }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            knife_bin:    "knife".into(),
            knife_args:   Vec::new(),
            default_role: "kvm_host".into(),
            timeout_secs: 60,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { show_probe_totals: true }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    pub fn load() -> Self {
        match Config::config_path() {
            Some(path) => Config::load_from(&path),
            None       => Config::default(),
        }
    }

    /// Load `path`. A missing file gets the defaults written to it; a file
    /// that exists but doesn't parse is left alone and reported.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            // Write defaults on first run (best-effort)
            if let Err(e) = try_write_defaults(path) {
                tracing::debug!(path = %path.display(), error = %e, "could not write default config");
            }
            return Config::default();
        }
        match try_load(path) {
            Ok(c)  => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{:#}", e), "invalid config, using defaults");
                Config::default()
            }
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hvreport").join("hvreport.toml"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

fn try_load(path: &Path) -> Result<Config> {
    let text = fs::read_to_string(path)?;
    Config::parse(&text)
}

fn try_write_defaults(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# hvreport configuration\n# Generated on first run — edit freely\n\n{}", text))?;
    Ok(())
}
