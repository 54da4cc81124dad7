pub mod device_identity;
pub mod diff_descriptor;
pub mod fragmentation;
pub mod manifest;
pub mod multicast_key;
pub mod parity_encoder;
