//! Session lifecycle orchestration.
//!
//! States: `uninitialized → initializing → ready | failed`, with
//! `ready → disconnected → initializing` as the retry cycle. Disconnects
//! reconnect automatically with exponential backoff up to the configured
//! ceiling; authentication failures and connect errors are terminal.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::{ClientEvent, PlatformClient};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::readiness::Readiness;
use crate::recipient::normalize_recipient;
use crate::status::{ConnectionStatus, StatusStore};

/// Owns one platform client and drives its lifecycle.
///
/// All mutable state lives here explicitly: the readiness cell, the
/// initializing guard, and the reconnect counter. One manager, one
/// account, one active session.
pub struct SessionManager {
	weak: Weak<Self>,
	client: Arc<dyn PlatformClient>,
	config: Config,
	status: StatusStore,
	readiness: Readiness,
	initializing: AtomicBool,
	reconnects: AtomicU32,
}

enum Flow {
	Continue,
	Stop,
}

impl SessionManager {
	pub fn new(config: Config, client: Arc<dyn PlatformClient>) -> Arc<Self> {
		let status = StatusStore::new(config.public_dir.clone());
		Arc::new_cyclic(|weak| Self {
			weak: weak.clone(),
			client,
			config,
			status,
			readiness: Readiness::new(),
			initializing: AtomicBool::new(false),
			reconnects: AtomicU32::new(0),
		})
	}

	/// Connects the client and spawns the event loop. No-op while an
	/// initialization is already in flight.
	///
	/// A connect error (browser missing, launch failure) is fatal: the
	/// readiness cell fails terminally and the error is returned.
	pub async fn start(&self) -> Result<()> {
		if self.initializing.swap(true, Ordering::SeqCst) {
			debug!(target = "wagate.session", "initialization already in flight");
			return Ok(());
		}
		self.readiness.reset();

		match self.client.connect().await {
			Ok(events) => {
				if let Some(manager) = self.weak.upgrade() {
					tokio::spawn(manager.run_events(events));
				}
				Ok(())
			}
			Err(err) => {
				self.initializing.store(false, Ordering::SeqCst);
				self.readiness.set_failed(err.to_string());
				error!(target = "wagate.session", error = %err, "client initialization failed");
				Err(err)
			}
		}
	}

	/// Normalizes the destination, waits for readiness, and dispatches.
	///
	/// Validation errors surface before any waiting; a terminal readiness
	/// failure surfaces as [`Error::Unavailable`].
	pub async fn send_message(&self, destination: &str, body: &str) -> Result<()> {
		let recipient = normalize_recipient(destination, &self.config.default_country_prefix)?;

		self.readiness.wait().await?;

		if self.client.identity().is_none() {
			return Err(Error::NotConnected);
		}

		self.client.send_text(&recipient, body).await?;
		info!(
			target = "wagate.session",
			recipient = %recipient,
			"message dispatched"
		);
		Ok(())
	}

	/// Last persisted connection status; never fails.
	pub fn status(&self) -> ConnectionStatus {
		self.status.read()
	}

	/// Suspends until the session is ready or permanently failed.
	pub async fn wait_ready(&self) -> Result<()> {
		self.readiness.wait().await
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	async fn run_events(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ClientEvent>) {
		loop {
			match events.recv().await {
				Some(event) => {
					if let Flow::Stop = self.handle_event(event).await {
						return;
					}
				}
				None => {
					// The client dropped its end without a disconnect
					// event, e.g. the browser process died.
					self.handle_event(ClientEvent::Disconnected {
						reason: "event stream closed".to_string(),
					})
					.await;
					return;
				}
			}
		}
	}

	async fn handle_event(&self, event: ClientEvent) -> Flow {
		match event {
			ClientEvent::PairingCode(code) => {
				self.status.save_pairing_code(&code);
				self.status.write(&ConnectionStatus::awaiting_scan());
				info!(
					target = "wagate.session",
					path = %self.status.pairing_path().display(),
					"pairing required; scan the code saved to disk"
				);
				Flow::Continue
			}
			ClientEvent::Ready { number } => {
				self.status.clear_pairing_code();
				self.status.write(&ConnectionStatus::connected(number.clone()));

				if let Some(expected) = self.config.expected_number.as_deref() {
					if !number.is_empty() && number != expected {
						// Operational signal only; the session stays usable.
						warn!(
							target = "wagate.session",
							expected,
							connected = %number,
							"session authenticated as an unexpected number"
						);
					}
				}

				info!(target = "wagate.session", number = %number, "session ready");
				self.reconnects.store(0, Ordering::SeqCst);
				self.initializing.store(false, Ordering::SeqCst);
				self.readiness.set_ready();
				Flow::Continue
			}
			ClientEvent::AuthFailure(message) => {
				let reason = format!("authentication failed: {message}");
				error!(target = "wagate.session", %message, "authentication failure");
				self.status.write(&ConnectionStatus::disconnected(reason.clone()));
				self.initializing.store(false, Ordering::SeqCst);
				self.readiness.set_failed(reason);
				Flow::Stop
			}
			ClientEvent::Disconnected { reason } => {
				warn!(target = "wagate.session", %reason, "session disconnected");
				self.status.write(&ConnectionStatus::disconnected(reason.clone()));
				self.initializing.store(false, Ordering::SeqCst);
				self.schedule_reconnect();
				Flow::Stop
			}
		}
	}

	fn schedule_reconnect(&self) {
		let attempt = self.reconnects.fetch_add(1, Ordering::SeqCst) + 1;
		let policy = &self.config.reconnect;

		if policy.exhausted(attempt) {
			let reason = format!("reconnect ceiling reached after {} attempts", attempt - 1);
			error!(target = "wagate.session", %reason, "giving up on reconnection");
			self.readiness.set_failed(reason);
			return;
		}

		let delay = policy.delay_for(attempt);
		info!(
			target = "wagate.session",
			attempt,
			delay_ms = delay.as_millis() as u64,
			"scheduling reconnect"
		);

		let Some(manager) = self.weak.upgrade() else {
			return;
		};
		tokio::spawn(async move {
			tokio::time::sleep(delay).await;
			if let Err(err) = manager.start().await {
				// start() already settled the readiness cell.
				error!(target = "wagate.session", error = %err, "reconnect attempt failed");
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use tempfile::tempdir;

	use super::*;
	use crate::config::ReconnectPolicy;
	use crate::testing::MockClient;

	fn test_config(public_dir: std::path::PathBuf) -> Config {
		Config {
			public_dir,
			reconnect: ReconnectPolicy {
				initial_delay: Duration::from_millis(1),
				max_delay: Duration::from_millis(5),
				max_attempts: Some(10),
			},
			..Config::default()
		}
	}

	async fn wait_until(mut check: impl FnMut() -> bool) {
		for _ in 0..400 {
			if check() {
				return;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
		panic!("condition not reached within timeout");
	}

	#[tokio::test]
	async fn pairing_code_persists_artifact_and_status() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![ClientEvent::PairingCode("2@scan-me".into())]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client);
		manager.start().await.unwrap();

		let store = StatusStore::new(dir.path());
		wait_until(|| store.pairing_code_exists()).await;

		let status = manager.status();
		assert!(!status.connected);
		assert_eq!(status.awaiting_scan, Some(true));
	}

	#[tokio::test]
	async fn ready_clears_artifact_and_publishes_number() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![
			ClientEvent::PairingCode("2@scan-me".into()),
			ClientEvent::Ready {
				number: "5511999887766".into(),
			},
		]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client);
		manager.start().await.unwrap();
		manager.wait_ready().await.unwrap();

		let store = StatusStore::new(dir.path());
		wait_until(|| !store.pairing_code_exists()).await;

		let status = manager.status();
		assert!(status.connected);
		assert_eq!(status.number.as_deref(), Some("5511999887766"));
	}

	#[tokio::test]
	async fn unexpected_number_is_a_warning_not_an_error() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![ClientEvent::Ready {
			number: "4917612345678".into(),
		}]);

		let mut config = test_config(dir.path().to_path_buf());
		config.expected_number = Some("5511999887766".into());

		let manager = SessionManager::new(config, client);
		manager.start().await.unwrap();

		// Still reaches ready despite the mismatch.
		manager.wait_ready().await.unwrap();
		assert!(manager.status().connected);
	}

	#[tokio::test]
	async fn auth_failure_is_terminal_for_all_waiters() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![ClientEvent::AuthFailure("session rejected".into())]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client.clone());
		manager.start().await.unwrap();

		let a = {
			let m = Arc::clone(&manager);
			tokio::spawn(async move { m.wait_ready().await })
		};
		let b = {
			let m = Arc::clone(&manager);
			tokio::spawn(async move { m.wait_ready().await })
		};

		assert!(matches!(a.await.unwrap(), Err(Error::Unavailable(_))));
		assert!(matches!(b.await.unwrap(), Err(Error::Unavailable(_))));

		// No automatic re-attempt after an auth failure.
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert_eq!(client.connect_calls(), 1);
		assert!(!manager.status().connected);
	}

	#[tokio::test]
	async fn disconnect_reconnects_and_next_ready_unblocks_senders() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![
			ClientEvent::Ready {
				number: "5511999887766".into(),
			},
			ClientEvent::Disconnected {
				reason: "NAVIGATION".into(),
			},
		]);
		client.script_epoch(vec![ClientEvent::Ready {
			number: "5511999887766".into(),
		}]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client.clone());
		manager.start().await.unwrap();

		wait_until(|| client.connect_calls() >= 2).await;
		manager.wait_ready().await.unwrap();

		manager.send_message("11 98877-6655", "hello").await.unwrap();
		let sent = client.sent();
		assert_eq!(sent, vec![("5511988776655@c.us".into(), "hello".into())]);
	}

	#[tokio::test]
	async fn ready_arriving_on_the_live_stream_unblocks_waiters() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		// The epoch starts empty; readiness arrives later on the open stream.
		client.script_epoch(vec![]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client.clone());
		manager.start().await.unwrap();

		let waiter = {
			let m = Arc::clone(&manager);
			tokio::spawn(async move { m.wait_ready().await })
		};
		tokio::task::yield_now().await;

		client.emit(ClientEvent::Ready {
			number: "5511999887766".into(),
		});

		waiter.await.unwrap().unwrap();
		manager.send_message("5511988776655", "hello").await.unwrap();
		assert_eq!(client.sent().len(), 1);
	}

	#[tokio::test]
	async fn disconnect_status_carries_reason() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![
			ClientEvent::Ready {
				number: "5511999887766".into(),
			},
			ClientEvent::Disconnected {
				reason: "CONFLICT".into(),
			},
		]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client);
		manager.start().await.unwrap();

		let store = StatusStore::new(dir.path());
		wait_until(|| store.read().reason.as_deref() == Some("CONFLICT")).await;
		assert!(!store.read().connected);
	}

	#[tokio::test]
	async fn reconnect_ceiling_fails_waiting_senders() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		// Every epoch disconnects immediately; ceiling of one retry.
		client.script_epoch(vec![ClientEvent::Disconnected {
			reason: "drop".into(),
		}]);
		client.script_epoch(vec![ClientEvent::Disconnected {
			reason: "drop".into(),
		}]);

		let mut config = test_config(dir.path().to_path_buf());
		config.reconnect.max_attempts = Some(1);

		let manager = SessionManager::new(config, client.clone());
		manager.start().await.unwrap();

		let err = manager.wait_ready().await.unwrap_err();
		assert!(matches!(err, Error::Unavailable(reason) if reason.contains("reconnect ceiling")));
		// Initial connect plus exactly one retry.
		assert_eq!(client.connect_calls(), 2);
	}

	#[tokio::test]
	async fn start_is_idempotent_while_initializing() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client.clone());
		manager.start().await.unwrap();
		manager.start().await.unwrap();
		manager.start().await.unwrap();

		assert_eq!(client.connect_calls(), 1);
	}

	#[tokio::test]
	async fn send_validates_before_waiting() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client.clone());
		manager.start().await.unwrap();

		// The session never becomes ready, yet validation errors surface
		// immediately instead of suspending.
		assert!(matches!(
			manager.send_message("", "hi").await,
			Err(Error::EmptyRecipient)
		));
		assert!(matches!(
			manager.send_message("no digits here", "hi").await,
			Err(Error::InvalidRecipient(_))
		));
		assert!(client.sent().is_empty());
	}

	#[tokio::test]
	async fn send_requires_authenticated_identity() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.script_epoch(vec![ClientEvent::Ready {
			number: "5511999887766".into(),
		}]);

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client.clone());
		manager.start().await.unwrap();
		manager.wait_ready().await.unwrap();

		client.set_identity(None);
		assert!(matches!(
			manager.send_message("5511988776655", "hi").await,
			Err(Error::NotConnected)
		));
	}

	#[tokio::test]
	async fn connect_error_is_fatal_and_settles_readiness() {
		let dir = tempdir().unwrap();
		let client = MockClient::new();
		client.fail_next_connect("chromium missing");

		let manager = SessionManager::new(test_config(dir.path().to_path_buf()), client);
		assert!(manager.start().await.is_err());
		assert!(matches!(
			manager.wait_ready().await,
			Err(Error::Unavailable(_))
		));
	}
}
