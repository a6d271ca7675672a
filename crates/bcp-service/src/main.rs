//! Command line client for BNS chains.
//!
//! Reads chain definitions from a configuration file and runs one query
//! against the named chain. Results go to stdout as JSON; logs go to
//! stderr.

use clap::{Parser, Subcommand};
use commands::SearchFilter;
use std::path::PathBuf;

mod commands;
mod factory_registry;

/// Command-line arguments for the BCP client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "bcp.toml", env = "BCP_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "warn")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print the current block height.
	Height { chain: String },
	/// Print an account's balances, or null if it does not exist.
	Account { chain: String, address: String },
	/// Search committed transactions.
	Search {
		chain: String,
		#[arg(long)]
		id: Option<String>,
		/// Transactions sent from or to this address
		#[arg(long)]
		address: Option<String>,
		#[arg(long)]
		height: Option<u64>,
		#[arg(long)]
		min_height: Option<u64>,
		#[arg(long)]
		max_height: Option<u64>,
	},
	/// Follow an account, printing one line per change.
	WatchAccount {
		chain: String,
		address: String,
		/// Stop after this many lines
		#[arg(long)]
		count: Option<usize>,
	},
}

impl Command {
	fn chain(&self) -> &str {
		match self {
			Command::Height { chain }
			| Command::Account { chain, .. }
			| Command::Search { chain, .. }
			| Command::WatchAccount { chain, .. } => chain,
		}
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();

	let config = bcp_config::Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.client.id);

	let registry = factory_registry::initialize_registry();
	let connection = registry.connect(&config, args.command.chain()).await?;

	let output = match &args.command {
		Command::Height { .. } => Some(commands::height(&connection).await),
		Command::Account { address, .. } => Some(commands::account(&connection, address).await),
		Command::Search {
			id,
			address,
			height,
			min_height,
			max_height,
			..
		} => {
			let filter = SearchFilter {
				id: id.clone(),
				address: address.clone(),
				height: *height,
				min_height: *min_height,
				max_height: *max_height,
			};
			Some(commands::search(&connection, &filter).await)
		},
		Command::WatchAccount { address, count, .. } => {
			let mut stdout = std::io::stdout().lock();
			commands::watch_account(&connection, address, *count, &mut stdout).await?;
			None
		},
	};

	connection.disconnect().await;

	if let Some(output) = output {
		println!("{}", serde_json::to_string_pretty(&output?)?);
	}
	Ok(())
}
