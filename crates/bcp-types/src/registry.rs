//! Registry trait for self-registering implementations.
//!
//! Transports and signers are selected by name from configuration. Every
//! implementation module exposes a `Registry` unit struct implementing
//! [`ImplementationRegistry`] so the loader can map that name to a factory
//! without a hand-maintained match.

/// Name and factory of one pluggable implementation.
pub trait ImplementationRegistry {
	/// Name used in configuration files, e.g. `transport = "tendermint"`.
	const NAME: &'static str;

	/// Factory signature shared by all implementations of one component.
	type Factory;

	fn factory() -> Self::Factory;
}
