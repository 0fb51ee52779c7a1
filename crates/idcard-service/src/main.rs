//! Main entry point for the IdentityCard authorization service.
//!
//! Issues authorizer signatures for IdentityCard mints and burns. Against
//! the built-in devnet it also hosts the ledger itself, which `simulate`
//! uses to walk through the authorization lifecycle.

use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use idcard_config::Config;
use idcard_types::AuthorizationScope;
use std::path::PathBuf;

mod apis;
mod factory_registry;
mod server;
mod simulate;

/// Hardhat development account #0, the default simulation caller.
const DEV_CALLER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// Command-line arguments for the service.
#[derive(Parser, Debug)]
#[command(name = "idcard", author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, global = true, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, global = true, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Issue one authorization and print it as JSON
	Sign {
		/// Account that will submit the mint or burn
		#[arg(long, value_parser = parse_address_arg)]
		recipient: Address,

		/// Verification id; selects the verified digest shape
		#[arg(long)]
		verification_id: Option<String>,
	},

	/// Run the mint/replay/burn scenario against the devnet ledger
	Simulate {
		/// Account submitting the calls
		#[arg(long, value_parser = parse_address_arg, default_value = DEV_CALLER)]
		caller: Address,

		/// Verification id attached to the mint
		#[arg(long)]
		verification_id: Option<String>,
	},

	/// Start the HTTP signing API
	Serve,
}

fn parse_address_arg(value: &str) -> Result<Address, String> {
	idcard_types::parse_address(value)
}

/// Main entry point for the service.
///
/// Parses arguments, installs logging, loads configuration, assembles the
/// components and runs the requested command.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or_else(|| format!("Config path is not valid UTF-8: {}", args.config.display()))?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let context = factory_registry::build_context(config).await?;
	let signer = context.account.get_address().await?;
	if signer != context.authorizer {
		tracing::warn!(
			signer = %signer,
			authorizer = %context.authorizer,
			"Signing account is not the ledger authorizer; issued signatures will be rejected"
		);
	}

	match args.command {
		Command::Sign {
			recipient,
			verification_id,
		} => {
			let signed = context
				.issuer
				.issue(
					recipient,
					AuthorizationScope::from_verification_id(verification_id),
				)
				.await?;
			println!("{}", serde_json::to_string_pretty(&signed)?);
		},
		Command::Simulate {
			caller,
			verification_id,
		} => {
			for outcome in simulate::run(&context, caller, verification_id).await? {
				println!("{}", serde_json::to_string(&outcome)?);
			}
		},
		Command::Serve => {
			let api_config = match context.config.api.clone() {
				Some(api) if api.enabled => api,
				_ => return Err("API server is not enabled in configuration ([api] enabled = true)".into()),
			};
			let state = server::AppState::from(&context);
			server::start_server(api_config, state).await?;
		},
	}

	tracing::info!("Stopped [{}]", context.config.service.id);
	Ok(())
}
