//! Storage-related types for the IdentityCard system.

/// Storage keys for different data collections.
///
/// Each key is a namespace; the file backend stores it as a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Snapshot of a ledger's state, keyed by contract address.
	LedgerState,
	/// Last authorization issued per recipient, keyed by recipient address.
	IssuedAuthorizations,
}

impl StorageKey {
	/// Namespace name used in storage keys and directory names.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::LedgerState => "ledger_state",
			StorageKey::IssuedAuthorizations => "issued_authorizations",
		}
	}
}
