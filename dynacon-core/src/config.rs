//! Runtime configuration.
//!
//! A [`Config`] starts from built-in defaults, can be read from a TOML file
//! and is finally overridden by environment variables:
//!
//! ```rust,no_run
//! use dynacon_core::Config;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::from_toml_file(Path::new("dynacon.toml"))?.with_env_overrides();
//! println!("BLAST database: {}", config.blast_db.display());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};

use crate::consts::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `blastp` executable
    pub blastp_path: PathBuf,
    /// prebuilt protein database of reference receptors
    pub blast_db: PathBuf,
    /// residue registry endpoint, the accession is appended to it
    pub registry_api: String,
    /// generic number assignment endpoint
    pub assign_numbers_api: String,
    /// folder holding cached registry responses
    pub cache_folder: PathBuf,
    /// root of all submission directories
    pub media_root: PathBuf,
    /// folder holding the ChEBI lookup tables
    pub chebi_folder: PathBuf,
    pub contacts_script: PathBuf,
    pub interpreter: PathBuf,
    pub contacts_cores: u32,
    pub aligner_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            blastp_path: PathBuf::from(DEFAULT_BLASTP),
            blast_db: PathBuf::from(DEFAULT_BLAST_DB),
            registry_api: DEFAULT_REGISTRY_API.to_string(),
            assign_numbers_api: DEFAULT_ASSIGN_API.to_string(),
            cache_folder: get_default_cache_folder(),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            chebi_folder: PathBuf::from(DEFAULT_CHEBI_FOLDER),
            contacts_script: PathBuf::from(DEFAULT_CONTACTS_SCRIPT),
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
            contacts_cores: DEFAULT_CONTACTS_CORES,
            aligner_timeout_secs: DEFAULT_ALIGNER_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    ///
    /// Read a configuration file. Keys missing from the file keep their defaults.
    ///
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config.expanded())
    }

    ///
    /// Apply `DYNACON_*` environment variables on top of this configuration.
    ///
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var(DYNACON_BLASTP_ENV) {
            self.blastp_path = PathBuf::from(val);
        }
        if let Ok(val) = env::var(DYNACON_BLAST_DB_ENV) {
            self.blast_db = PathBuf::from(val);
        }
        if let Ok(val) = env::var(DYNACON_REGISTRY_API_ENV) {
            self.registry_api = val;
        }
        if let Ok(val) = env::var(DYNACON_ASSIGN_API_ENV) {
            self.assign_numbers_api = val;
        }
        if let Ok(val) = env::var(DYNACON_CACHE_ENV) {
            self.cache_folder = PathBuf::from(val);
        }
        if let Ok(val) = env::var(DYNACON_MEDIA_ROOT_ENV) {
            self.media_root = PathBuf::from(val);
        }
        if let Ok(val) = env::var(DYNACON_CHEBI_ENV) {
            self.chebi_folder = PathBuf::from(val);
        }
        if let Ok(val) = env::var(DYNACON_WORKERS_ENV) {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => self.workers = n,
                _ => log::warn!("Ignoring invalid {}={}", DYNACON_WORKERS_ENV, val),
            }
        }
        self.expanded()
    }

    pub fn aligner_timeout(&self) -> Duration {
        Duration::from_secs(self.aligner_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    // expand `$VAR` / `~` in every path
    fn expanded(mut self) -> Self {
        self.blastp_path = expand_path(&self.blastp_path);
        self.blast_db = expand_path(&self.blast_db);
        self.cache_folder = expand_path(&self.cache_folder);
        self.media_root = expand_path(&self.media_root);
        self.chebi_folder = expand_path(&self.chebi_folder);
        self.contacts_script = expand_path(&self.contacts_script);
        self
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy().into_owned();
    let expanded = shellexpand::full(&raw)
        .unwrap_or_else(|_| raw.clone().into())
        .into_owned();
    PathBuf::from(expanded)
}

/// Get default cache folder from environment variable, if not available then create it in home folder
///
/// # Returns
/// - path to cache folder
pub fn get_default_cache_folder() -> PathBuf {
    if let Ok(val) = env::var(DYNACON_CACHE_ENV) {
        PathBuf::from(val)
    } else {
        let home = env::var("HOME")
            .or_else(|_| {
                home_dir()
                    .map(|p| p.to_string_lossy().into_owned())
                    .ok_or(env::VarError::NotPresent)
            })
            .unwrap_or_else(|_| "/tmp".to_string());

        let mut path = PathBuf::from(home);
        path.push(".dynacon/");
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    #[rstest]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "blast_db = \"/data/receptors\"").unwrap();
        writeln!(file, "aligner_timeout_secs = 5").unwrap();

        let config = Config::from_toml_file(file.path()).unwrap();
        assert_eq!(config.blast_db, PathBuf::from("/data/receptors"));
        assert_eq!(config.aligner_timeout(), Duration::from_secs(5));
        assert_eq!(config.registry_api, DEFAULT_REGISTRY_API);
        assert_eq!(config.workers, DEFAULT_WORKERS);
    }

    #[rstest]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers = \"many\"").unwrap();
        assert!(Config::from_toml_file(file.path()).is_err());
    }
}
