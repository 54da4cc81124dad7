//! # FOTA Signing Toolkit
//!
//! Builds and inspects firmware updates for constrained LoRaWAN devices.
//!
//! The toolkit covers the parts of a firmware update over the air that end up on the device:
//!     1. a fixed 113 byte manifest trailer appended to a firmware image or binary diff, carrying
//!         the signature, the product identity, a version and a diff descriptor.
//!     2. the fragmentation header and fragments consumed by the device's multicast
//!         fragmentation session, including the corrections the firmware expects.
//!     3. the multicast root key derived from a device root key.
//!
//! Signing, diffing and fragmentation encoding are capabilities supplied by external tools
//! (see [`external`]), so the codecs themselves stay pure and easy to test.
//!
//! Copyrights © 2025 FOTA Contributors

pub mod config;
pub mod constants;
pub mod core;
pub mod external;
pub mod fota_errors;
pub mod output;
pub mod prelude;
pub mod update_tool;
pub mod utils;
