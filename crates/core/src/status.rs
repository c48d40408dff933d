//! On-disk status record and pairing artifact for external consumers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const STATUS_FILE_NAME: &str = "whatsapp-status.json";
pub const PAIRING_FILE_NAME: &str = "whatsapp-qr.txt";

/// Last-observed connection state. Last-write-wins, unversioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
	pub connected: bool,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub awaiting_scan: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl ConnectionStatus {
	pub fn awaiting_scan() -> Self {
		Self {
			connected: false,
			awaiting_scan: Some(true),
			..Self::default()
		}
	}

	pub fn connected(number: String) -> Self {
		Self {
			connected: true,
			number: Some(number),
			..Self::default()
		}
	}

	pub fn disconnected(reason: String) -> Self {
		Self {
			connected: false,
			reason: Some(reason),
			..Self::default()
		}
	}
}

/// Persists the status record and pairing artifact under the public
/// directory. All operations are best-effort: writes log on failure and
/// reads fall back to the disconnected default.
#[derive(Debug, Clone)]
pub struct StatusStore {
	public_dir: PathBuf,
}

impl StatusStore {
	pub fn new(public_dir: impl Into<PathBuf>) -> Self {
		Self {
			public_dir: public_dir.into(),
		}
	}

	pub fn status_path(&self) -> PathBuf {
		self.public_dir.join(STATUS_FILE_NAME)
	}

	pub fn pairing_path(&self) -> PathBuf {
		self.public_dir.join(PAIRING_FILE_NAME)
	}

	/// Best-effort write; failures are logged, never propagated.
	pub fn write(&self, status: &ConnectionStatus) {
		if let Err(err) = self.try_write(status) {
			warn!(
				target = "wagate.status",
				path = %self.status_path().display(),
				error = %err,
				"failed to persist status record"
			);
		}
	}

	fn try_write(&self, status: &ConnectionStatus) -> crate::error::Result<()> {
		fs::create_dir_all(&self.public_dir)?;
		let json = serde_json::to_string_pretty(status)?;
		fs::write(self.status_path(), json)?;
		Ok(())
	}

	/// Last written record, or the disconnected default when the file is
	/// absent or unparsable. Never fails.
	pub fn read(&self) -> ConnectionStatus {
		fs::read_to_string(self.status_path())
			.ok()
			.and_then(|raw| serde_json::from_str(&raw).ok())
			.unwrap_or_default()
	}

	/// Persists the scan code for pairing. Best-effort.
	pub fn save_pairing_code(&self, code: &str) {
		let path = self.pairing_path();
		let result = fs::create_dir_all(&self.public_dir).and_then(|_| fs::write(&path, code));
		match result {
			Ok(()) => debug!(
				target = "wagate.status",
				path = %path.display(),
				"pairing code saved"
			),
			Err(err) => warn!(
				target = "wagate.status",
				path = %path.display(),
				error = %err,
				"failed to save pairing code"
			),
		}
	}

	/// Removes a consumed pairing artifact. Best-effort.
	pub fn clear_pairing_code(&self) {
		let path = self.pairing_path();
		if path.exists() {
			if let Err(err) = fs::remove_file(&path) {
				warn!(
					target = "wagate.status",
					path = %path.display(),
					error = %err,
					"failed to remove stale pairing code"
				);
			}
		}
	}

	pub fn pairing_code_exists(&self) -> bool {
		self.pairing_path().exists()
	}

	pub fn public_dir(&self) -> &Path {
		&self.public_dir
	}
}

#[cfg(test)]
mod tests {
	use tempfile::tempdir;

	use super::*;

	#[test]
	fn write_then_read_round_trips() {
		let dir = tempdir().unwrap();
		let store = StatusStore::new(dir.path().join("public"));
		assert_eq!(store.public_dir(), dir.path().join("public").as_path());

		store.write(&ConnectionStatus::connected("5511999887766".into()));
		let read = store.read();
		assert!(read.connected);
		assert_eq!(read.number.as_deref(), Some("5511999887766"));
		assert!(read.awaiting_scan.is_none());
	}

	#[test]
	fn read_defaults_when_file_absent() {
		let dir = tempdir().unwrap();
		let store = StatusStore::new(dir.path());
		assert_eq!(store.read(), ConnectionStatus::default());
	}

	#[test]
	fn read_defaults_when_file_unparsable() {
		let dir = tempdir().unwrap();
		let store = StatusStore::new(dir.path());
		fs::create_dir_all(dir.path()).unwrap();
		fs::write(store.status_path(), "{not json").unwrap();
		assert_eq!(store.read(), ConnectionStatus::default());
	}

	#[test]
	fn status_json_uses_camel_case_fields() {
		let dir = tempdir().unwrap();
		let store = StatusStore::new(dir.path());
		store.write(&ConnectionStatus::awaiting_scan());

		let raw = fs::read_to_string(store.status_path()).unwrap();
		assert!(raw.contains("\"awaitingScan\": true"));
		assert!(!raw.contains("number"));
	}

	#[test]
	fn pairing_code_lifecycle() {
		let dir = tempdir().unwrap();
		let store = StatusStore::new(dir.path().join("public"));

		assert!(!store.pairing_code_exists());
		store.save_pairing_code("2@abc,def,ghi");
		assert!(store.pairing_code_exists());
		assert_eq!(
			fs::read_to_string(store.pairing_path()).unwrap(),
			"2@abc,def,ghi"
		);

		store.clear_pairing_code();
		assert!(!store.pairing_code_exists());
		// Clearing twice is harmless.
		store.clear_pairing_code();
	}
}
