use clap::Parser;
use tracing::error;
use wagate_cli::{cli::Cli, commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	if let Err(err) = commands::dispatch(cli).await {
		error!(target = "wagate.cli", error = %err, "command failed");
		std::process::exit(1);
	}
}
