#![allow(unused_imports)]

pub use crate::config::*;
pub use crate::constants::*;
pub use crate::core::device_identity::*;
pub use crate::core::diff_descriptor::*;
pub use crate::core::fragmentation::*;
pub use crate::core::manifest::*;
pub use crate::core::multicast_key::*;
pub use crate::core::parity_encoder::*;
pub use crate::external::*;
pub use crate::fota_errors::*;
pub use crate::output::*;
pub use crate::update_tool::*;
pub use crate::utils::*;
