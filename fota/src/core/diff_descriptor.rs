//! # FOTA DiffDescriptor Module
//!
//! The diff descriptor tells the device's update agent how to turn the received payload into a
//! firmware image: use it as is, apply a generic binary patch, or apply a patch produced by an
//! external pipeline with its own framing. The manifest only routes; it never interprets the payload.
//!
//! ## Byte Layout
//! ```text
//! [1 byte: tag (0 full, 1 generic diff, 2 external diff)]
//! [3 bytes: base image size, big-endian (bits 16-23, 8-15, 0-7)]
//! ```
//! A full image leaves the size bytes zero.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use super::super::constants::{DIFF_DESCRIPTOR_SIZE, DIFF_TAG_EXTERNAL, DIFF_TAG_FULL, DIFF_TAG_GENERIC, MAX_BASE_IMAGE_SIZE};
use super::super::fota_errors::{FotaError, ManifestWarning};
use anyhow::Result;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffDescriptor {
    Full,
    GenericDiff { base_image_size: u32 },
    ExternalDiff { base_image_size: u32 },
}

impl DiffDescriptor {
    /// Generic binary diff against a prior image of `base_image_size` bytes.
    pub fn generic(base_image_size: u64) -> Result<Self> {
        let base_image_size = check_base_image_size(base_image_size)?;
        Ok(Self::GenericDiff { base_image_size })
    }

    /// Diff produced by an external pipeline against a prior image of `base_image_size` bytes.
    pub fn external(base_image_size: u64) -> Result<Self> {
        let base_image_size = check_base_image_size(base_image_size)?;
        Ok(Self::ExternalDiff { base_image_size })
    }

    pub fn tag(&self) -> u8 {
        match self {
            Self::Full => DIFF_TAG_FULL,
            Self::GenericDiff { .. } => DIFF_TAG_GENERIC,
            Self::ExternalDiff { .. } => DIFF_TAG_EXTERNAL,
        }
    }

    pub fn base_image_size(&self) -> Option<u32> {
        match self {
            Self::Full => None,
            Self::GenericDiff { base_image_size } | Self::ExternalDiff { base_image_size } => Some(*base_image_size),
        }
    }

    /// Serialize to the 4 byte wire form.
    /// Fails when a hand-built variant carries a size wider than 24 bits.
    pub fn to_bytes(&self) -> Result<[u8; DIFF_DESCRIPTOR_SIZE]> {
        let size = match self.base_image_size() {
            Some(size) => check_base_image_size(size as u64)?,
            None => 0,
        };

        Ok([self.tag(), (size >> 16) as u8, (size >> 8) as u8, size as u8])
    }

    /// Parses the 4 byte wire form. Unknown tags are not an error, they come back as a warning.
    pub fn from_bytes(data: &[u8; DIFF_DESCRIPTOR_SIZE]) -> std::result::Result<Self, ManifestWarning> {
        let base_image_size = ((data[1] as u32) << 16) | ((data[2] as u32) << 8) | data[3] as u32;

        match data[0] {
            DIFF_TAG_FULL => Ok(Self::Full),
            DIFF_TAG_GENERIC => Ok(Self::GenericDiff { base_image_size }),
            DIFF_TAG_EXTERNAL => Ok(Self::ExternalDiff { base_image_size }),
            tag => Err(ManifestWarning::UnrecognizedDiffTag(tag)),
        }
    }
}

impl fmt::Display for DiffDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full binary, not a patch"),
            Self::GenericDiff { base_image_size } => write!(f, "generic diff patch against a {base_image_size} byte image"),
            Self::ExternalDiff { base_image_size } => write!(f, "external diff patch against a {base_image_size} byte image"),
        }
    }
}

fn check_base_image_size(size: u64) -> Result<u32> {
    if size > MAX_BASE_IMAGE_SIZE {
        return Err(FotaError::BaseImageTooLarge(size).into());
    }
    Ok(size as u32)
}
