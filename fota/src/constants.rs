//! # FOTA Constants Module
//!
//! Wire sizes and markers shared by the manifest codec and the fragmentation framer.
//! Every value here is part of the contract with device firmware that cannot be patched
//! after shipping, so they are kept in one place and never computed ad hoc.
//!
//! Copyrights © 2025 FOTA Contributors. All rights reserved.

pub const SIG_LENGTH_SIZE: usize = 1;
pub const SIG_FIELD_SIZE: usize = 72;
pub const MIN_SIG_SIZE: usize = 70;
pub const UUID_SIZE: usize = 16;
pub const VERSION_SIZE: usize = 4;
pub const DIFF_DESCRIPTOR_SIZE: usize = 4;

pub const MANIFEST_SIZE: usize = SIG_LENGTH_SIZE + SIG_FIELD_SIZE + UUID_SIZE + UUID_SIZE + VERSION_SIZE + DIFF_DESCRIPTOR_SIZE;

// field offsets inside the manifest trailer
pub const SIGNATURE_OFFSET: usize = SIG_LENGTH_SIZE;
pub const MANUFACTURER_UUID_OFFSET: usize = SIGNATURE_OFFSET + SIG_FIELD_SIZE;
pub const DEVICE_CLASS_UUID_OFFSET: usize = MANUFACTURER_UUID_OFFSET + UUID_SIZE;
pub const VERSION_OFFSET: usize = DEVICE_CLASS_UUID_OFFSET + UUID_SIZE;
pub const DIFF_DESCRIPTOR_OFFSET: usize = VERSION_OFFSET + VERSION_SIZE;

/// Largest prior image a diff descriptor can describe (24 bits).
pub const MAX_BASE_IMAGE_SIZE: u64 = 0x00FF_FFFF;

pub const DIFF_TAG_FULL: u8 = 0;
pub const DIFF_TAG_GENERIC: u8 = 1;
pub const DIFF_TAG_EXTERNAL: u8 = 2;

pub const FRAG_HEADER_MARKER: &str = "Fragmentation header likely";
pub const FRAG_LINE_PREFIX: &str = "[8, ";
pub const FRAG_DATA_TAG: u8 = 8;
pub const FRAG_INDEX_SIZE: usize = 3; // (tag, fcnt, fcnt)
pub const FRAG_SESSION_SETUP_CID: u8 = 0x02;
pub const FRAG_PADDING_INDEX: usize = 6;

pub const ROOT_KEY_SIZE: usize = 16;

pub const KEY_FILE: &str = "update.key";
pub const PUBLIC_KEY_FILE: &str = "update.pub";
pub const IDENTITY_FILE: &str = "device-ids.toml";
pub const LEGACY_IDENTITY_FILE: &str = "device-ids.json";

pub type Uuid16 = [u8; UUID_SIZE];
pub type PaddedSignature = [u8; SIG_FIELD_SIZE];
pub type RootKey = [u8; ROOT_KEY_SIZE];
