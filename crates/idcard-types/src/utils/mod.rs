//! Utility functions for encoding, parsing and display formatting.

pub mod constants;
pub mod conversion;
pub mod formatting;
pub mod helpers;
pub mod packed;

pub use constants::{DEFAULT_EXPIRY_WINDOW_BLOCKS, DEFAULT_MINT_PRICE_WEI, DEVNET_CHAIN_ID};
pub use conversion::parse_address;
pub use formatting::{format_wei, without_0x_prefix};
pub use helpers::current_timestamp;
pub use packed::PackedEncoder;
