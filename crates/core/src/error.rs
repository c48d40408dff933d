use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	/// No usable browser executable could be located. Fatal for the process;
	/// the message carries manual-installation instructions.
	#[error("no browser executable found: {0}")]
	BrowserNotFound(String),

	#[error("browser launch failed: {0}")]
	Launch(String),

	#[error("session error: {0}")]
	Session(String),

	/// The session never became ready, or its last settlement was a failure.
	#[error("client unavailable: {0}")]
	Unavailable(String),

	#[error("client is not authenticated")]
	NotConnected,

	#[error("empty destination number")]
	EmptyRecipient,

	#[error("destination contains no digits: {0:?}")]
	InvalidRecipient(String),

	#[error("message dispatch failed: {0}")]
	Send(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}
