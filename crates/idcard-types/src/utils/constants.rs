//! Protocol constants shared by the issuing and verifying sides.

/// Number of blocks an issued authorization stays valid for.
pub const DEFAULT_EXPIRY_WINDOW_BLOCKS: u64 = 20;

/// Minimum value attached to a mint: 0.01 ether.
pub const DEFAULT_MINT_PRICE_WEI: u128 = 10_000_000_000_000_000;

/// Chain id of the local development network.
pub const DEVNET_CHAIN_ID: u64 = 31337;
