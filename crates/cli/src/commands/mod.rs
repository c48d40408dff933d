mod run;
mod send;
mod status;

use std::sync::Arc;

use anyhow::Result;

use wagate::SessionManager;
use wagate_runtime::{ChromiumClient, ExecutableLocator};

use crate::cli::{Cli, Command};

pub async fn dispatch(cli: Cli) -> Result<()> {
	let config = cli.config();

	match cli.command.unwrap_or(Command::Run) {
		Command::Run => run::execute(config).await,
		Command::Send { to, message } => send::execute(config, &to, &message).await,
		Command::Status => status::execute(&config),
	}
}

/// Wires the browser-backed client into a session manager.
fn build_manager(config: wagate::Config) -> Arc<SessionManager> {
	let locator = ExecutableLocator::new(ExecutableLocator::default_download_dir());
	let client = Arc::new(ChromiumClient::new(config.clone(), locator));
	SessionManager::new(config, client)
}
