//! Test doubles for exercising the session state machine without a browser.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::client::{ClientEvent, PlatformClient};
use crate::error::{Error, Result};

/// Scriptable [`PlatformClient`].
///
/// Each call to `connect` consumes one scripted epoch and replays its
/// events onto the returned stream. Epoch senders are retained so the
/// stream stays open until the mock is dropped; use [`MockClient::emit`]
/// to deliver further events mid-epoch.
pub struct MockClient {
	epochs: Mutex<VecDeque<Vec<ClientEvent>>>,
	senders: Mutex<Vec<mpsc::UnboundedSender<ClientEvent>>>,
	connect_calls: AtomicU32,
	connect_error: Mutex<Option<String>>,
	identity: Mutex<Option<String>>,
	sent: Mutex<Vec<(String, String)>>,
}

impl MockClient {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			epochs: Mutex::new(VecDeque::new()),
			senders: Mutex::new(Vec::new()),
			connect_calls: AtomicU32::new(0),
			connect_error: Mutex::new(None),
			identity: Mutex::new(None),
			sent: Mutex::new(Vec::new()),
		})
	}

	/// Queues the events replayed by the next `connect` call.
	pub fn script_epoch(&self, events: Vec<ClientEvent>) {
		self.epochs.lock().unwrap().push_back(events);
	}

	/// Makes the next `connect` call fail with a launch error.
	pub fn fail_next_connect(&self, message: impl Into<String>) {
		*self.connect_error.lock().unwrap() = Some(message.into());
	}

	/// Delivers an event on the most recent epoch's stream.
	pub fn emit(&self, event: ClientEvent) {
		self.track_identity(&event);
		let senders = self.senders.lock().unwrap();
		if let Some(sender) = senders.last() {
			let _ = sender.send(event);
		}
	}

	pub fn connect_calls(&self) -> u32 {
		self.connect_calls.load(Ordering::SeqCst)
	}

	pub fn set_identity(&self, identity: Option<String>) {
		*self.identity.lock().unwrap() = identity;
	}

	/// Messages dispatched through `send_text`, in order.
	pub fn sent(&self) -> Vec<(String, String)> {
		self.sent.lock().unwrap().clone()
	}

	fn track_identity(&self, event: &ClientEvent) {
		match event {
			ClientEvent::Ready { number } => {
				*self.identity.lock().unwrap() = Some(number.clone());
			}
			ClientEvent::AuthFailure(_) | ClientEvent::Disconnected { .. } => {
				*self.identity.lock().unwrap() = None;
			}
			ClientEvent::PairingCode(_) => {}
		}
	}
}

#[async_trait]
impl PlatformClient for MockClient {
	async fn connect(&self) -> Result<mpsc::UnboundedReceiver<ClientEvent>> {
		self.connect_calls.fetch_add(1, Ordering::SeqCst);

		if let Some(message) = self.connect_error.lock().unwrap().take() {
			return Err(Error::Launch(message));
		}

		let (tx, rx) = mpsc::unbounded_channel();
		let events = self.epochs.lock().unwrap().pop_front().unwrap_or_default();
		for event in events {
			self.track_identity(&event);
			let _ = tx.send(event);
		}
		self.senders.lock().unwrap().push(tx);
		Ok(rx)
	}

	fn identity(&self) -> Option<String> {
		self.identity.lock().unwrap().clone()
	}

	async fn send_text(&self, recipient: &str, body: &str) -> Result<()> {
		self.sent
			.lock()
			.unwrap()
			.push((recipient.to_string(), body.to_string()));
		Ok(())
	}
}
