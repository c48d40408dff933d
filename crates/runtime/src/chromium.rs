//! chromiumoxide-backed [`PlatformClient`].
//!
//! Drives a headless Chromium profile pointed at WhatsApp Web and derives
//! lifecycle events from periodic page probes. Session/auth data lives in
//! the persistent user-data directory and is owned entirely by the browser.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use wagate::{ClientEvent, Config, Error, PlatformClient, Result};

use crate::js;
use crate::locator::ExecutableLocator;

const POLL_INTERVAL: Duration = Duration::from_millis(1500);

pub struct ChromiumClient {
	config: Config,
	locator: ExecutableLocator,
	state: tokio::sync::Mutex<Option<BrowserHandle>>,
	identity: Arc<Mutex<Option<String>>>,
}

struct BrowserHandle {
	browser: Browser,
	page: Page,
	tasks: Vec<JoinHandle<()>>,
}

/// Result shape of [`js::STATE_PROBE`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProbeState {
	ready: bool,
	qr: Option<String>,
	auth_error: bool,
	number: Option<String>,
}

impl ChromiumClient {
	pub fn new(config: Config, locator: ExecutableLocator) -> Self {
		Self {
			config,
			locator,
			state: tokio::sync::Mutex::new(None),
			identity: Arc::new(Mutex::new(None)),
		}
	}

	async fn launch(&self) -> Result<(Browser, JoinHandle<()>)> {
		let executable = self.locator.resolve().await?;
		tokio::fs::create_dir_all(&self.config.user_data_dir).await?;

		let mut builder = BrowserConfig::builder()
			.chrome_executable(&executable)
			.user_data_dir(&self.config.user_data_dir)
			.no_sandbox()
			.args(vec!["--disable-dev-shm-usage", "--disable-setuid-sandbox"]);
		if !self.config.headless {
			builder = builder.with_head();
		}
		let browser_config = builder.build().map_err(Error::Launch)?;

		let (browser, mut handler) = Browser::launch(browser_config)
			.await
			.map_err(|e| Error::Launch(e.to_string()))?;

		// The handler stream must be drained for the CDP connection to
		// make progress; it ends when the browser goes away.
		let handler_task = tokio::spawn(async move {
			while let Some(result) = handler.next().await {
				if result.is_err() {
					break;
				}
			}
			debug!(target = "wagate.chromium", "cdp handler stream ended");
		});

		Ok((browser, handler_task))
	}
}

#[async_trait]
impl PlatformClient for ChromiumClient {
	async fn connect(&self) -> Result<mpsc::UnboundedReceiver<ClientEvent>> {
		let mut state = self.state.lock().await;

		// A reconnect replaces the previous browser wholesale.
		if let Some(mut stale) = state.take() {
			// Close before aborting the handler task; the close command
			// still needs the CDP stream pumped.
			if let Err(err) = stale.browser.close().await {
				debug!(target = "wagate.chromium", error = %err, "stale browser close failed");
			}
			for task in &stale.tasks {
				task.abort();
			}
		}
		set_identity(&self.identity, None);

		let (browser, handler_task) = self.launch().await?;
		let page = browser
			.new_page(js::WHATSAPP_URL)
			.await
			.map_err(|e| Error::Launch(format!("failed to open {}: {e}", js::WHATSAPP_URL)))?;

		let (tx, rx) = mpsc::unbounded_channel();
		let watcher_task = tokio::spawn(watch_page(
			page.clone(),
			tx,
			Arc::clone(&self.identity),
		));

		*state = Some(BrowserHandle {
			browser,
			page,
			tasks: vec![handler_task, watcher_task],
		});
		Ok(rx)
	}

	fn identity(&self) -> Option<String> {
		match self.identity.lock() {
			Ok(guard) => guard.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	async fn send_text(&self, recipient: &str, body: &str) -> Result<()> {
		let page = {
			let state = self.state.lock().await;
			state
				.as_ref()
				.map(|handle| handle.page.clone())
				.ok_or(Error::NotConnected)?
		};

		let outcome = page
			.evaluate(js::send_expression(recipient, body))
			.await
			.map_err(|e| Error::Send(e.to_string()))?;

		if outcome.into_value::<bool>().unwrap_or(false) {
			Ok(())
		} else {
			Err(Error::Send(
				"page send helper reported failure".to_string(),
			))
		}
	}
}

fn set_identity(slot: &Mutex<Option<String>>, value: Option<String>) {
	match slot.lock() {
		Ok(mut guard) => *guard = value,
		Err(poisoned) => *poisoned.into_inner() = value,
	}
}

/// Polls the page and translates its state into lifecycle events. Ends
/// after any terminal event; the session manager reconnects by calling
/// `connect` again.
async fn watch_page(
	page: Page,
	events: mpsc::UnboundedSender<ClientEvent>,
	identity: Arc<Mutex<Option<String>>>,
) {
	let mut seen_ready = false;
	let mut last_qr: Option<String> = None;

	loop {
		tokio::time::sleep(POLL_INTERVAL).await;

		let probe = match probe_state(&page).await {
			Ok(probe) => probe,
			Err(err) => {
				set_identity(&identity, None);
				let _ = events.send(ClientEvent::Disconnected {
					reason: format!("page probe failed: {err}"),
				});
				return;
			}
		};

		if probe.auth_error {
			set_identity(&identity, None);
			let _ = events.send(ClientEvent::AuthFailure(
				"platform rejected the stored session".to_string(),
			));
			return;
		}

		if let Some(qr) = probe.qr {
			if seen_ready {
				// The pairing screen after ready means we were logged out.
				set_identity(&identity, None);
				let _ = events.send(ClientEvent::Disconnected {
					reason: "logged out".to_string(),
				});
				return;
			}
			if last_qr.as_deref() != Some(qr.as_str()) {
				let _ = events.send(ClientEvent::PairingCode(qr.clone()));
				last_qr = Some(qr);
			}
			continue;
		}

		if probe.ready && !seen_ready {
			seen_ready = true;
			last_qr = None;
			let number = probe.number.unwrap_or_default();
			set_identity(&identity, Some(number.clone()));
			install_send_helper(&page).await;
			let _ = events.send(ClientEvent::Ready { number });
		}
	}
}

async fn probe_state(page: &Page) -> Result<ProbeState> {
	let result = page
		.evaluate(js::STATE_PROBE)
		.await
		.map_err(|e| Error::Session(e.to_string()))?;
	result
		.into_value::<ProbeState>()
		.map_err(|e| Error::Session(format!("malformed state probe result: {e}")))
}

async fn install_send_helper(page: &Page) {
	match page.evaluate(js::INSTALL_SEND_HELPER).await {
		Ok(result) => {
			if !result.into_value::<bool>().unwrap_or(false) {
				warn!(
					target = "wagate.chromium",
					"send helper could not resolve page internals; sends will fail"
				);
			}
		}
		Err(err) => {
			warn!(
				target = "wagate.chromium",
				error = %err,
				"send helper installation failed"
			);
		}
	}
}
