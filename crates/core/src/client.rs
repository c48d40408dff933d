//! Seam between the session state machine and the browser-backed client.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// Lifecycle events emitted by a platform client.
///
/// The underlying automation stack delivers these sequentially on a single
/// stream; the session manager relies on that ordering and adds no locking
/// of its own around event handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
	/// The platform is asking the operator to link a device; the payload is
	/// the raw scan-code string.
	PairingCode(String),
	/// The session is authenticated and usable.
	Ready { number: String },
	/// Session restore was rejected. Terminal; no automatic re-attempt.
	AuthFailure(String),
	/// The platform dropped the session. Recoverable via reconnect.
	Disconnected { reason: String },
}

/// A logical connection to the messaging platform, backed by a driven
/// browser instance.
///
/// `connect` starts (or restarts) the underlying session and hands back the
/// event stream for this connection epoch. After a `Disconnected` event the
/// stream is spent; the session manager calls `connect` again.
#[async_trait]
pub trait PlatformClient: Send + Sync {
	async fn connect(&self) -> Result<mpsc::UnboundedReceiver<ClientEvent>>;

	/// Number the client is currently authenticated as, if any.
	fn identity(&self) -> Option<String>;

	/// Dispatches a text message to a fully-qualified recipient.
	async fn send_text(&self, recipient: &str, body: &str) -> Result<()>;
}
