//! # FOTA Configuration Module
//!
//! Where the signing material lives and which external tools are used. The configuration is
//! stored as a TOML file (`FotaConfig.toml` by default) and handed explicitly to every operation
//! that needs the identity or the key, instead of a process-wide folder constant.
//!
//! ## Example
//! ```toml
//! keys_dir = ".fota-keys"
//! openssl = "openssl"
//! diff_tool = "bin/jdiff"
//! python = "python"
//! encoder_script = "encode_file.py"
//! update_certs_header = "UpdateCerts.h"
//! ```
//! Every key is optional; missing keys take the defaults above, except `encoder_script` which
//! selects the built-in parity encoder when absent.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::constants::{IDENTITY_FILE, KEY_FILE, LEGACY_IDENTITY_FILE, PUBLIC_KEY_FILE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "FotaConfig.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FotaConfig {
    pub keys_dir: PathBuf,
    pub openssl: String,
    pub diff_tool: PathBuf,
    pub python: String,
    pub encoder_script: Option<PathBuf>,
    pub update_certs_header: PathBuf,
}

impl Default for FotaConfig {
    fn default() -> Self {
        Self {
            keys_dir: PathBuf::from(".fota-keys"),
            openssl: "openssl".to_string(),
            diff_tool: Path::new("bin").join("jdiff"),
            python: "python".to_string(),
            encoder_script: None,
            update_certs_header: PathBuf::from("UpdateCerts.h"),
        }
    }
}

impl FotaConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FotaConfig> {
        read_toml_file(path.as_ref())
    }

    /// Loads the configuration, or the defaults when the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<FotaConfig> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(FotaConfig::default());
        }
        read_toml_file(path)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_toml_file(path.as_ref(), self)
    }

    pub fn key_path(&self) -> PathBuf {
        self.keys_dir.join(KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.keys_dir.join(PUBLIC_KEY_FILE)
    }

    pub fn identity_path(&self) -> PathBuf {
        self.keys_dir.join(IDENTITY_FILE)
    }

    pub fn legacy_identity_path(&self) -> PathBuf {
        self.keys_dir.join(LEGACY_IDENTITY_FILE)
    }
}

fn write_toml_file(path: &Path, config: &FotaConfig) -> Result<()> {
    let toml_string = toml::to_string(config).context("failed to serialize configuration")?;
    let mut file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(toml_string.as_bytes())?;
    Ok(())
}

fn read_toml_file(path: &Path) -> Result<FotaConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}
