//! Registry of transport factories.
//!
//! Transports register themselves by name; a chain's configuration picks
//! one with its `transport` key.

use crate::commands::ServiceError;
use bcp_config::Config;
use bcp_connection::{ChainConnection, ConnectionOptions, TransportFactory};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Known transport factories by name.
pub struct FactoryRegistry {
	pub transport: HashMap<String, TransportFactory>,
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			transport: HashMap::new(),
		}
	}

	pub fn register_transport(&mut self, name: impl Into<String>, factory: TransportFactory) {
		self.transport.insert(name.into(), factory);
	}

	/// Opens a connection to the chain configured under `name`.
	pub async fn connect(&self, config: &Config, name: &str) -> Result<ChainConnection, ServiceError> {
		let chain = config.chain(name)?;
		let factory = self
			.transport
			.get(&chain.transport)
			.ok_or_else(|| ServiceError::UnknownTransport(chain.transport.clone()))?;

		let transport = factory(&chain.transport_config(&config.client))?;
		tracing::debug!(chain = %name, transport = %chain.transport, "Built transport");

		let options = ConnectionOptions {
			expected_chain_id: chain.expected_chain_id(),
			default_fee: chain.default_fee(),
		};
		Ok(ChainConnection::with_transport(transport, options).await?)
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// The process-wide registry with every built-in transport.
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in bcp_connection::get_all_implementations() {
			tracing::debug!("Registering transport implementation: {}", name);
			registry.register_transport(name, factory);
		}
		registry
	})
}
