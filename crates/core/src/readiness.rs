//! Readiness cell shared between the session event loop and senders.
//!
//! Replaces the deferred-promise-per-epoch pattern with an explicit state
//! cell on a watch channel: any number of waiters observe the same
//! settlement, and a reconnect rolls the cell back to `Pending` for the
//! next epoch instead of swapping in a fresh promise object.

use tokio::sync::watch;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyState {
	Pending,
	Ready,
	Failed(String),
}

#[derive(Debug)]
pub struct Readiness {
	tx: watch::Sender<ReadyState>,
}

impl Default for Readiness {
	fn default() -> Self {
		Self::new()
	}
}

impl Readiness {
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(ReadyState::Pending);
		Self { tx }
	}

	pub fn set_ready(&self) {
		// send_replace stores even with zero subscribers; plain send would
		// drop a settlement that lands while nobody is parked in wait().
		self.tx.send_replace(ReadyState::Ready);
	}

	pub fn set_failed(&self, reason: impl Into<String>) {
		self.tx.send_replace(ReadyState::Failed(reason.into()));
	}

	/// Opens a new epoch. Waiters that were parked before the reset simply
	/// keep waiting for the next settlement.
	pub fn reset(&self) {
		self.tx.send_replace(ReadyState::Pending);
	}

	pub fn state(&self) -> ReadyState {
		self.tx.borrow().clone()
	}

	/// Suspends until the cell settles. `Ready` resolves, `Failed` surfaces
	/// as [`Error::Unavailable`] carrying the failure reason.
	pub async fn wait(&self) -> Result<()> {
		let mut rx = self.tx.subscribe();
		loop {
			let state = rx.borrow_and_update().clone();
			match state {
				ReadyState::Ready => return Ok(()),
				ReadyState::Failed(reason) => return Err(Error::Unavailable(reason)),
				ReadyState::Pending => {
					rx.changed()
						.await
						.map_err(|_| Error::Unavailable("session closed".to_string()))?;
				}
			}
		}
	}
}
