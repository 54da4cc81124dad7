//! # FOTA Manifest Module
//!
//! This module defines the `Manifest` trailer appended to a signed firmware image or diff. The
//! device reads the last 113 bytes of the received payload, checks the signature against its
//! compiled-in public key, compares both UUIDs with its own identity, refuses versions older than
//! the running one and uses the diff descriptor to choose a reconstruction path.
//!
//! ## Byte Layout
//! The encoded layout (total = 113 bytes):
//! ```text
//! [1 byte: signature length, unpadded]
//! [72 bytes: signature, zero padded]
//! [16 bytes: manufacturer uuid]
//! [16 bytes: device class uuid]
//! [4 bytes: version, little-endian unix seconds]
//! [4 bytes: diff descriptor]
//! ```
//!
//! ## Notes
//! - ECDSA signatures in DER encoding vary between 70 and 72 bytes, hence the length prefix.
//! - The trailer is not self-describing; callers locate it as the last 113 bytes of a file.
//! - Decoding never fails on fields a newer producer may have extended (see `ManifestWarning`).
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::super::constants::{
    DEVICE_CLASS_UUID_OFFSET, DIFF_DESCRIPTOR_OFFSET, DIFF_DESCRIPTOR_SIZE, MANIFEST_SIZE, MANUFACTURER_UUID_OFFSET, MIN_SIG_SIZE,
    PaddedSignature, SIG_FIELD_SIZE, SIGNATURE_OFFSET, UUID_SIZE, VERSION_OFFSET,
};
use super::super::fota_errors::{FotaError, ManifestWarning};
use super::super::utils::{current_time_as_u32, modified_time_as_u32};
use super::device_identity::DeviceIdentity;
use super::diff_descriptor::DiffDescriptor;
use anyhow::Result;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub signature: Vec<u8>, // unpadded, 70..=72 bytes
    pub identity: DeviceIdentity,
    pub version: u32,
    pub diff: DiffDescriptor,
}

/// A manifest as read back from a file, including findings that did not stop the decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedManifest {
    pub sig_length: u8,
    pub signature: Vec<u8>, // first `sig_length` bytes of the signature field
    pub identity: DeviceIdentity,
    pub version: u32,
    pub diff: Option<DiffDescriptor>,
    pub diff_bytes: [u8; DIFF_DESCRIPTOR_SIZE],
    pub warnings: Vec<ManifestWarning>,
}

impl Manifest {
    pub fn new(signature: &[u8], identity: DeviceIdentity, version: u32, diff: DiffDescriptor) -> Result<Self> {
        check_signature_length(signature)?;

        Ok(Self {
            signature: signature.to_vec(),
            identity,
            version,
            diff,
        })
    }

    /// Builds the manifest for `payload_file`. The version is the file's modification time, or
    /// the current time when `override_version` is set.
    pub fn for_file<P: AsRef<Path>>(
        payload_file: P,
        signature: &[u8],
        identity: DeviceIdentity,
        diff: DiffDescriptor,
        override_version: bool,
    ) -> Result<Self> {
        let version = if override_version {
            let now = current_time_as_u32()?;
            tracing::info!(version = now, "patch version (overridden)");
            now
        } else {
            let modified = modified_time_as_u32(&payload_file)?;
            tracing::info!(version = modified, "patch version");
            modified
        };

        Self::new(signature, identity, version, diff)
    }

    /// Signature right-padded with zeros to the fixed field width.
    pub fn padded_signature(&self) -> Result<PaddedSignature> {
        check_signature_length(&self.signature)?;

        let mut padded = [0u8; SIG_FIELD_SIZE];
        padded[..self.signature.len()].copy_from_slice(&self.signature);
        Ok(padded)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let padded = self.padded_signature()?;

        let mut encoded = Vec::with_capacity(MANIFEST_SIZE);

        encoded.push(self.signature.len() as u8);
        encoded.extend_from_slice(&padded);
        encoded.extend_from_slice(self.identity.manufacturer_bytes());
        encoded.extend_from_slice(self.identity.device_class_bytes());
        encoded.extend_from_slice(&self.version.to_le_bytes());
        encoded.extend_from_slice(&self.diff.to_bytes()?);

        Ok(encoded)
    }

    /// Decodes exactly one 113 byte trailer.
    pub fn from_bytes(data: &[u8]) -> Result<DecodedManifest> {
        if data.len() != MANIFEST_SIZE {
            return Err(FotaError::InvalidManifestLength(data.len()).into());
        }

        let mut warnings = Vec::new();

        let sig_length = data[0];
        let significant = if sig_length as usize > SIG_FIELD_SIZE {
            warnings.push(ManifestWarning::SignatureLengthOutOfRange(sig_length));
            SIG_FIELD_SIZE
        } else {
            sig_length as usize
        };
        let signature = data[SIGNATURE_OFFSET..SIGNATURE_OFFSET + significant].to_vec();

        let manufacturer: [u8; UUID_SIZE] = data[MANUFACTURER_UUID_OFFSET..DEVICE_CLASS_UUID_OFFSET].try_into()?;
        let device_class: [u8; UUID_SIZE] = data[DEVICE_CLASS_UUID_OFFSET..VERSION_OFFSET].try_into()?;
        let version = u32::from_le_bytes(data[VERSION_OFFSET..DIFF_DESCRIPTOR_OFFSET].try_into()?);
        let diff_bytes: [u8; DIFF_DESCRIPTOR_SIZE] = data[DIFF_DESCRIPTOR_OFFSET..].try_into()?;

        let diff = match DiffDescriptor::from_bytes(&diff_bytes) {
            Ok(diff) => Some(diff),
            Err(warning) => {
                tracing::warn!(%warning, "manifest diff descriptor");
                warnings.push(warning);
                None
            }
        };

        Ok(DecodedManifest {
            sig_length,
            signature,
            identity: DeviceIdentity::from_bytes(&manufacturer, &device_class),
            version,
            diff,
            diff_bytes,
            warnings,
        })
    }

    /// Decodes the trailer found at the end of a signed file's contents.
    pub fn from_file_tail(contents: &[u8]) -> Result<DecodedManifest> {
        if contents.len() < MANIFEST_SIZE {
            return Err(FotaError::TruncatedManifest(contents.len()).into());
        }
        Self::from_bytes(&contents[contents.len() - MANIFEST_SIZE..])
    }
}

fn check_signature_length(signature: &[u8]) -> Result<()> {
    if !(MIN_SIG_SIZE..=SIG_FIELD_SIZE).contains(&signature.len()) {
        return Err(FotaError::InvalidSignatureLength(signature.len()).into());
    }
    Ok(())
}
