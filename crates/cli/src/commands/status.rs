use anyhow::Result;

use wagate::{Config, StatusStore};

pub fn execute(config: &Config) -> Result<()> {
	let status = StatusStore::new(config.public_dir.clone()).read();
	println!("{}", serde_json::to_string_pretty(&status)?);
	Ok(())
}
