//! Common types module for the IdentityCard authorization system.
//!
//! This module defines the core data types shared by the signing side
//! (account, issuer, service) and the verifying side (ledger). Keeping them
//! in one crate guarantees that both ends agree on field order and encoding.

/// API types for the HTTP signing endpoints.
pub mod api;
/// Authorization messages, scopes and signed authorizations.
pub mod authorization;
/// Block and chain snapshot types.
pub mod chain;
/// Event types emitted by the ledger.
pub mod events;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Redacting wrapper for private keys.
pub mod secret_string;
/// Storage keys for persisted collections.
pub mod storage;
/// Token records and ledger snapshots.
pub mod token;
/// Encoding and formatting helpers.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, U256};

pub use api::*;
pub use authorization::*;
pub use chain::*;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use storage::*;
pub use token::*;
pub use utils::{format_wei, parse_address, without_0x_prefix};
pub use validation::*;
