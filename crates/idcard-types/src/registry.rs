//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable module (account, chain, storage) exposes a `Registry` struct
/// implementing this trait, so the service can map a configuration name to a
/// factory without hard-coding the list in several places.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// e.g. `"local"` for `[chain.implementations.local]` or `"file"` for
	/// `[storage.implementations.file]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
