//! # FOTA DeviceIdentity Module
//!
//! The identity of a product line: a manufacturer UUID and a device class UUID. It is written
//! once at provisioning time and copied into every manifest, where the device compares it
//! against the UUIDs compiled into its firmware.
//!
//! ## On-disk record
//! ```toml
//! manufacturer-uuid = "11111111-1111-1111-1111-111111111111"
//! device-class-uuid = "22222222-2222-2222-2222-222222222222"
//! ```
//! A legacy JSON record (`device-ids.json`) with the same keys is still accepted on load.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::super::constants::{UUID_SIZE, Uuid16};
use super::super::fota_errors::FotaError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceIdentity {
    #[serde(rename = "manufacturer-uuid")]
    pub manufacturer_uuid: Uuid,
    #[serde(rename = "device-class-uuid")]
    pub device_class_uuid: Uuid,
}

impl DeviceIdentity {
    pub fn new(manufacturer_uuid: Uuid, device_class_uuid: Uuid) -> Self {
        Self {
            manufacturer_uuid,
            device_class_uuid,
        }
    }

    /// Derives the identity from a domain name and a device model (UUIDv5, URL namespace).
    pub fn from_names(domain_name: &str, model: &str) -> Self {
        Self {
            manufacturer_uuid: Uuid::new_v5(&Uuid::NAMESPACE_URL, domain_name.as_bytes()),
            device_class_uuid: Uuid::new_v5(&Uuid::NAMESPACE_URL, model.as_bytes()),
        }
    }

    pub fn from_bytes(manufacturer: &Uuid16, device_class: &Uuid16) -> Self {
        Self {
            manufacturer_uuid: Uuid::from_bytes(*manufacturer),
            device_class_uuid: Uuid::from_bytes(*device_class),
        }
    }

    pub fn manufacturer_bytes(&self) -> &[u8; UUID_SIZE] {
        self.manufacturer_uuid.as_bytes()
    }

    pub fn device_class_bytes(&self) -> &[u8; UUID_SIZE] {
        self.device_class_uuid.as_bytes()
    }

    /// Loads the identity record, falling back to a legacy JSON record next to it.
    pub fn load<P: AsRef<Path>, L: AsRef<Path>>(path: P, legacy_path: L) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
            return toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()));
        }

        let legacy_path = legacy_path.as_ref();
        if legacy_path.exists() {
            tracing::debug!(path = %legacy_path.display(), "loading legacy identity record");
            let contents = fs::read_to_string(legacy_path).with_context(|| format!("failed to read {}", legacy_path.display()))?;
            return serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", legacy_path.display()));
        }

        Err(FotaError::MissingIdentity(path.to_path_buf()).into())
    }

    /// Writes the identity record. An existing record is never overwritten.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let toml_string = toml::to_string(self).context("failed to serialize identity")?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(FotaError::IdentityAlreadyExists(path.to_path_buf()).into());
            }
            Err(err) => return Err(err).with_context(|| format!("failed to create {}", path.display())),
        };
        file.write_all(toml_string.as_bytes())?;

        Ok(())
    }
}
