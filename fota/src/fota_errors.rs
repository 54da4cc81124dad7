//! # FOTA Error Definitions Module
//!
//! All structured errors raised while building or inspecting an update live in `FotaError`.
//! Findings that must not abort a diagnostic read of a manifest are kept apart in
//! `ManifestWarning` and collected on the decoded manifest instead of being returned.
//!
//! ## Example
//! ```rust
//! use fota::fota_errors::FotaError;
//!
//! fn check_signature(signature: &[u8]) -> Result<(), FotaError> {
//!     if !(70..=72).contains(&signature.len()) {
//!         return Err(FotaError::InvalidSignatureLength(signature.len()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Categories
//! - **Provisioning**: missing or already existing identity records
//! - **Encoding**: signature length, base image size, fragment size
//! - **Collaborators**: non-zero exits and malformed encoder reports
//! - **Decoding**: truncated or wrongly sized manifests
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FotaError {
    #[error("{} does not exist, run provisioning (create-keypair) first", .0.display())]
    MissingIdentity(PathBuf),

    #[error("{} already exists, refusing to overwrite existing identity", .0.display())]
    IdentityAlreadyExists(PathBuf),

    #[error("{} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("signature length {0} is outside 70..=72 bytes")]
    InvalidSignatureLength(usize),

    #[error("base image of {0} bytes does not fit in 24 bits")]
    BaseImageTooLarge(u64),

    #[error("{tool} failed with status {status}")]
    EncoderInvocationFailed {
        tool: String,
        status: i32,
        stdout: String,
        stderr: String,
    },

    #[error("fragmentation header not found in encoder report")]
    HeaderNotFound,

    #[error("encoder report contains no fragments")]
    NoFragmentsProduced,

    #[error("invalid byte value `{0}` in encoder report")]
    InvalidReportToken(String),

    #[error("fragmentation header has {0} bytes, padding field missing")]
    MalformedFragmentationHeader(usize),

    #[error("fragment {0} is shorter than its index header")]
    MalformedFragment(usize),

    #[error("fragment size {0} must be within 1..=255")]
    InvalidFragmentSize(u16),

    #[error("{0} fragments exceed the 16-bit fragment counter")]
    TooManyFragments(usize),

    #[error("file of {0} bytes is shorter than a manifest")]
    TruncatedManifest(usize),

    #[error("manifest must be exactly 113 bytes, got {0}")]
    InvalidManifestLength(usize),

    #[error("root key must be 16 bytes, got {0}")]
    InvalidRootKeyLength(usize),
}

/// Non-fatal findings while decoding a manifest from a possibly newer producer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestWarning {
    #[error("the patch type {0} has not been recognised")]
    UnrecognizedDiffTag(u8),

    #[error("signature length {0} exceeds the 72 byte signature field")]
    SignatureLengthOutOfRange(u8),
}
