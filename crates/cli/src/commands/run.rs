use anyhow::Result;
use tracing::info;

use wagate::Config;

use super::build_manager;

pub async fn execute(config: Config) -> Result<()> {
	info!(target = "wagate.cli", "gateway starting; waiting for pairing if needed");
	info!(
		target = "wagate.cli",
		public_dir = %config.public_dir.display(),
		"status and pairing artifacts are published here"
	);

	let manager = build_manager(config);
	manager.start().await?;

	tokio::signal::ctrl_c().await?;
	info!(target = "wagate.cli", "shutting down");
	Ok(())
}
