use anyhow::Result;
use tracing::info;

use wagate::Config;

use super::build_manager;

pub async fn execute(config: Config, to: &str, message: &str) -> Result<()> {
	let manager = build_manager(config);
	manager.start().await?;

	info!(target = "wagate.cli", "waiting for the session to become ready");
	manager.send_message(to, message).await?;

	println!("message sent to {to}");
	Ok(())
}
