//! Configuration for BCP clients.
//!
//! A configuration names the client, lists the chains it talks to and the
//! transport used for each, and optionally tunes the swap timeouts. Files
//! are TOML; `${VAR}` and `${VAR:-default}` are replaced from the
//! environment before parsing.

use bcp_types::{Amount, ChainId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, not the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub client: ClientConfig,
	/// Chains by local name.
	pub chains: HashMap<String, ChainConfig>,
	#[serde(default)]
	pub swap: SwapConfig,
}

/// Settings shared by every connection of this client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Name used in logs.
	pub id: String,
	/// How often polling transports look for new blocks.
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
	/// How long to wait for a posted transaction to be included.
	#[serde(default = "default_confirmation_timeout_secs")]
	pub confirmation_timeout_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
	500
}

fn default_confirmation_timeout_secs() -> u64 {
	120
}

impl ClientConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn confirmation_timeout(&self) -> Duration {
		Duration::from_secs(self.confirmation_timeout_secs)
	}
}

/// One chain the client connects to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Registered transport name, e.g. `tendermint` or `memory`.
	pub transport: String,
	/// Refuse to connect when the node reports a different chain id.
	pub expected_chain_id: Option<String>,
	/// Fee attached to transactions instead of the chain's minimum.
	pub default_fee: Option<FeeConfig>,
	/// Everything else is handed to the transport factory.
	#[serde(flatten)]
	pub settings: toml::Table,
}

impl ChainConfig {
	pub fn expected_chain_id(&self) -> Option<ChainId> {
		self.expected_chain_id.as_deref().map(ChainId::new)
	}

	pub fn default_fee(&self) -> Option<Amount> {
		self.default_fee.as_ref().map(FeeConfig::to_amount)
	}

	/// The table passed to the transport factory.
	///
	/// `poll_interval_ms` falls back to the client-wide value when the chain
	/// does not set its own.
	pub fn transport_config(&self, client: &ClientConfig) -> toml::Value {
		let mut settings = self.settings.clone();
		settings
			.entry("poll_interval_ms")
			.or_insert_with(|| toml::Value::Integer(client.poll_interval_ms as i64));
		toml::Value::Table(settings)
	}
}

/// A fee in atomic units.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeeConfig {
	pub quantity: u64,
	pub fractional_digits: u8,
	pub ticker: String,
}

impl FeeConfig {
	pub fn to_amount(&self) -> Amount {
		Amount::new(self.quantity, self.fractional_digits, self.ticker.clone())
	}
}

/// Timeouts used when this client takes part in an atomic swap.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwapConfig {
	/// Lifetime of the first offer.
	#[serde(default = "default_offer_timeout_secs")]
	pub offer_timeout_secs: u64,
	/// Lifetime of the counter offer. Must be shorter than the offer's.
	#[serde(default = "default_counter_offer_timeout_secs")]
	pub counter_offer_timeout_secs: u64,
}

fn default_offer_timeout_secs() -> u64 {
	3600
}

fn default_counter_offer_timeout_secs() -> u64 {
	1800
}

impl Default for SwapConfig {
	fn default() -> Self {
		Self {
			offer_timeout_secs: default_offer_timeout_secs(),
			counter_offer_timeout_secs: default_counter_offer_timeout_secs(),
		}
	}
}

/// Replaces `${VAR}` and `${VAR:-default}` with environment values.
///
/// Input is capped at 1MB to keep the regex pass bounded.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(name.as_str()) {
			Ok(value) => value,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name.as_str()
					)))
				},
			},
		};
		result.push_str(&input[last..full.start()]);
		result.push_str(&value);
		last = full.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Reads, resolves and validates a configuration file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read {}: {}", path.display(), e),
			))
		})?;
		content.parse()
	}

	/// Looks up a chain by its local name.
	pub fn chain(&self, name: &str) -> Result<&ChainConfig, ConfigError> {
		self.chains
			.get(name)
			.ok_or_else(|| ConfigError::Validation(format!("Unknown chain '{}'", name)))
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}
		if self.client.poll_interval_ms == 0 || self.client.poll_interval_ms > 60_000 {
			return Err(ConfigError::Validation(
				"Client poll_interval_ms must be between 1 and 60000".into(),
			));
		}
		if self.client.confirmation_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"Client confirmation_timeout_secs must be greater than 0".into(),
			));
		}

		if self.chains.is_empty() {
			return Err(ConfigError::Validation(
				"At least one chain must be configured".into(),
			));
		}
		for (name, chain) in &self.chains {
			if chain.transport.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Chain '{}' must name a transport",
					name
				)));
			}
			if matches!(&chain.expected_chain_id, Some(id) if id.is_empty()) {
				return Err(ConfigError::Validation(format!(
					"Chain '{}' has an empty expected_chain_id",
					name
				)));
			}
			if let Some(fee) = &chain.default_fee {
				if fee.ticker.is_empty() {
					return Err(ConfigError::Validation(format!(
						"Chain '{}' default_fee needs a ticker",
						name
					)));
				}
				if fee.fractional_digits > 18 {
					return Err(ConfigError::Validation(format!(
						"Chain '{}' default_fee fractional_digits cannot exceed 18",
						name
					)));
				}
			}
		}

		if self.swap.counter_offer_timeout_secs == 0 {
			return Err(ConfigError::Validation(
				"Swap counter_offer_timeout_secs must be greater than 0".into(),
			));
		}
		if self.swap.counter_offer_timeout_secs >= self.swap.offer_timeout_secs {
			return Err(ConfigError::Validation(format!(
				"Swap counter offer ({}s) must expire before the offer ({}s)",
				self.swap.counter_offer_timeout_secs, self.swap.offer_timeout_secs
			)));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const MINIMAL: &str = r#"
[client]
id = "test-client"

[chains.local]
transport = "memory"
chain_id = "test-chain-local"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("BCP_TEST_HOST", "localhost");
		std::env::set_var("BCP_TEST_PORT", "26657");

		let input = "url = \"http://${BCP_TEST_HOST}:${BCP_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "url = \"http://localhost:26657\"");

		std::env::remove_var("BCP_TEST_HOST");
		std::env::remove_var("BCP_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${BCP_MISSING_VAR:-fallback}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"fallback\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${BCP_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("BCP_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.client.poll_interval_ms, 500);
		assert_eq!(config.client.confirmation_timeout(), Duration::from_secs(120));
		assert_eq!(config.swap.offer_timeout_secs, 3600);
		assert_eq!(config.swap.counter_offer_timeout_secs, 1800);

		let chain = config.chain("local").unwrap();
		assert_eq!(chain.transport, "memory");
		assert!(chain.expected_chain_id().is_none());
		assert!(chain.default_fee().is_none());
		assert!(config.chain("other").is_err());
	}

	#[test]
	fn test_transport_settings_pass_through() {
		std::env::set_var("BCP_TEST_NODE_URL", "http://node.example:26657");
		let config: Config = r#"
[client]
id = "test-client"
poll_interval_ms = 250

[chains.bns]
transport = "tendermint"
url = "${BCP_TEST_NODE_URL}"
expected_chain_id = "iov-mainnet"
default_fee = { quantity = 10000000, fractional_digits = 9, ticker = "IOV" }

[chains.fast]
transport = "tendermint"
url = "http://localhost:26657"
poll_interval_ms = 50
"#
		.parse()
		.unwrap();
		std::env::remove_var("BCP_TEST_NODE_URL");

		let bns = config.chain("bns").unwrap();
		assert_eq!(bns.expected_chain_id(), Some(ChainId::new("iov-mainnet")));
		assert_eq!(bns.default_fee(), Some(Amount::new(10_000_000u64, 9, "IOV")));

		let settings = bns.transport_config(&config.client);
		assert_eq!(
			settings.get("url").and_then(|v| v.as_str()),
			Some("http://node.example:26657")
		);
		assert_eq!(
			settings.get("poll_interval_ms").and_then(|v| v.as_integer()),
			Some(250)
		);
		// Known keys are not forwarded.
		assert!(settings.get("transport").is_none());
		assert!(settings.get("default_fee").is_none());

		let fast = config.chain("fast").unwrap().transport_config(&config.client);
		assert_eq!(fast.get("poll_interval_ms").and_then(|v| v.as_integer()), Some(50));
	}

	#[test]
	fn test_counter_offer_must_expire_first() {
		let config = format!(
			"{}\n[swap]\noffer_timeout_secs = 600\ncounter_offer_timeout_secs = 600\n",
			MINIMAL
		);
		let err = config.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("must expire before the offer"));
	}

	#[test]
	fn test_empty_chains_rejected() {
		let err = "[client]\nid = \"c\"\n[chains]\n".parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("At least one chain"));
	}

	#[test]
	fn test_empty_client_id_rejected() {
		let config = MINIMAL.replace("test-client", "");
		let err = config.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Client ID"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let temp_dir = TempDir::new().unwrap();
		let path = temp_dir.path().join("bcp.toml");
		fs::write(&path, MINIMAL).unwrap();

		let config = Config::from_file(&path).await.unwrap();
		assert_eq!(config.client.id, "test-client");
		assert!(config.chains.contains_key("local"));
	}

	#[tokio::test]
	async fn test_from_missing_file() {
		let temp_dir = TempDir::new().unwrap();
		let result = Config::from_file(temp_dir.path().join("absent.toml")).await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
