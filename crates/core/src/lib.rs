//! Core session orchestration for the WhatsApp Web gateway.
//!
//! This crate owns everything that is not browser plumbing: the
//! [`SessionManager`] lifecycle state machine, the [`PlatformClient`] seam
//! that the browser-backed runtime implements, recipient normalization,
//! and the on-disk status/pairing artifacts consumed by other processes.

pub mod client;
pub mod config;
pub mod error;
pub mod readiness;
pub mod recipient;
pub mod session;
pub mod status;
pub mod testing;

pub use client::{ClientEvent, PlatformClient};
pub use config::{Config, ReconnectPolicy};
pub use error::{Error, Result};
pub use session::SessionManager;
pub use status::{ConnectionStatus, StatusStore};
