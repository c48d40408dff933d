use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wagate::Config;

#[derive(Parser, Debug)]
#[command(name = "wagate")]
#[command(about = "WhatsApp Web gateway - persistent session with a send/status API")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v gateway debug, -vv everything)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Directory for externally consumed artifacts (status JSON, QR text)
	#[arg(long, global = true, value_name = "DIR", default_value = "public")]
	pub public_dir: PathBuf,

	/// Browser profile directory holding the persisted session
	#[arg(long, global = true, value_name = "DIR", default_value = ".wagate/session")]
	pub user_data_dir: PathBuf,

	/// Run the browser with a visible window
	#[arg(long, global = true)]
	pub headful: bool,

	/// Country prefix prepended to bare national numbers
	#[arg(long, global = true, value_name = "DIGITS")]
	pub country_prefix: Option<String>,

	/// Number the session is expected to authenticate as
	/// (overrides WHATSAPP_SENDER_NUMBER)
	#[arg(long, global = true, value_name = "DIGITS")]
	pub expected_number: Option<String>,

	/// Reconnect attempt ceiling after a disconnect; 0 retries forever
	#[arg(long, global = true, value_name = "N")]
	pub max_reconnects: Option<u32>,

	#[command(subcommand)]
	pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Keep a session alive and serve the status/pairing artifacts (default)
	Run,
	/// Send one message and exit
	Send {
		/// Destination number or fully-qualified recipient
		to: String,
		/// Message body
		message: String,
	},
	/// Print the last persisted connection status as JSON
	Status,
}

impl Cli {
	/// Gateway configuration: environment defaults layered with flags.
	pub fn config(&self) -> Config {
		let mut config = Config::from_env();
		config.public_dir = self.public_dir.clone();
		config.user_data_dir = self.user_data_dir.clone();
		config.headless = !self.headful;

		if let Some(prefix) = &self.country_prefix {
			config.default_country_prefix = prefix.clone();
		}
		if let Some(number) = &self.expected_number {
			let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
			config.expected_number = (!digits.is_empty()).then_some(digits);
		}
		if let Some(max) = self.max_reconnects {
			config.reconnect.max_attempts = Some(max);
		}

		config
	}
}
