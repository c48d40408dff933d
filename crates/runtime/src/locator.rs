//! Browser executable discovery.
//!
//! Resolves exactly one path to a usable Chromium-family executable,
//! memoized for the process lifetime. Search order:
//!
//! 1. `PUPPETEER_EXECUTABLE_PATH`, `CHROME_PATH`, `CHROMIUM_PATH`
//!    environment overrides (each may be a path-list)
//! 2. A browser previously fetched into the download directory
//! 3. A one-shot download through the chromiumoxide fetcher
//! 4. PATH probing and well-known per-platform install locations
//!
//! Exhausting the chain is fatal for the process; there is no retry loop.

use std::path::{Path, PathBuf};

use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use wagate::{Error, Result};

/// Environment variables consulted for executable overrides, in order.
pub const EXECUTABLE_ENV_VARS: &[&str] =
	&["PUPPETEER_EXECUTABLE_PATH", "CHROME_PATH", "CHROMIUM_PATH"];

/// Binary names probed on PATH before falling back to install locations.
const PATH_BINARY_NAMES: &[&str] = &[
	"google-chrome",
	"google-chrome-stable",
	"chromium",
	"chromium-browser",
	"msedge",
];

pub struct ExecutableLocator {
	overrides: Vec<PathBuf>,
	download_dir: PathBuf,
	cache: OnceCell<PathBuf>,
}

impl ExecutableLocator {
	/// Locator with overrides collected from the environment.
	pub fn new(download_dir: impl Into<PathBuf>) -> Self {
		Self::with_overrides(download_dir, env_override_candidates())
	}

	/// Locator with an explicit override candidate list.
	pub fn with_overrides(download_dir: impl Into<PathBuf>, overrides: Vec<PathBuf>) -> Self {
		Self {
			overrides,
			download_dir: download_dir.into(),
			cache: OnceCell::new(),
		}
	}

	/// Default directory for fetched browsers, under the user cache dir.
	pub fn default_download_dir() -> PathBuf {
		dirs::cache_dir()
			.unwrap_or_else(|| PathBuf::from(".cache"))
			.join("wagate")
			.join("chromium")
	}

	/// Resolves the executable, probing at most once per process. Concurrent
	/// first callers share the same pending probe.
	pub async fn resolve(&self) -> Result<PathBuf> {
		self.cache
			.get_or_try_init(|| self.probe())
			.await
			.cloned()
	}

	async fn probe(&self) -> Result<PathBuf> {
		for candidate in &self.overrides {
			if candidate.is_file() {
				info!(
					target = "wagate.locator",
					path = %candidate.display(),
					"using browser from environment override"
				);
				return Ok(candidate.clone());
			}
			debug!(
				target = "wagate.locator",
				path = %candidate.display(),
				"override candidate does not exist"
			);
		}

		if let Some(path) = fetched_executable(&self.download_dir) {
			debug!(
				target = "wagate.locator",
				path = %path.display(),
				"using previously fetched browser"
			);
			return Ok(path);
		}

		match self.download().await {
			Ok(path) if path.is_file() => {
				info!(
					target = "wagate.locator",
					path = %path.display(),
					"downloaded browser"
				);
				return Ok(path);
			}
			Ok(path) => {
				warn!(
					target = "wagate.locator",
					path = %path.display(),
					"fetcher reported success but the executable is missing"
				);
			}
			Err(err) => {
				warn!(target = "wagate.locator", error = %err, "browser download failed");
			}
		}

		for name in PATH_BINARY_NAMES {
			if let Ok(path) = which::which(name) {
				info!(
					target = "wagate.locator",
					path = %path.display(),
					"using browser found on PATH"
				);
				return Ok(path);
			}
		}

		for candidate in well_known_executables() {
			if candidate.is_file() {
				info!(
					target = "wagate.locator",
					path = %candidate.display(),
					"using browser from well-known install location"
				);
				return Ok(candidate);
			}
		}

		Err(Error::BrowserNotFound(
			"install Google Chrome or Chromium, or point CHROME_PATH at an executable"
				.to_string(),
		))
	}

	async fn download(&self) -> Result<PathBuf> {
		tokio::fs::create_dir_all(&self.download_dir).await?;
		info!(
			target = "wagate.locator",
			dir = %self.download_dir.display(),
			"no local browser found; downloading one"
		);

		let options = BrowserFetcherOptions::builder()
			.with_path(&self.download_dir)
			.build()
			.map_err(|e| Error::Launch(format!("fetcher configuration failed: {e}")))?;
		let fetcher = BrowserFetcher::new(options);
		let revision = fetcher
			.fetch()
			.await
			.map_err(|e| Error::Launch(format!("browser download failed: {e}")))?;

		Ok(revision.executable_path)
	}
}

/// Collects override candidates from the environment. Each variable may
/// hold several paths separated by the platform path-list separator; blank
/// segments are skipped.
pub fn env_override_candidates() -> Vec<PathBuf> {
	let mut candidates = Vec::new();
	for var in EXECUTABLE_ENV_VARS {
		if let Ok(value) = std::env::var(var) {
			candidates.extend(split_path_list(&value));
		}
	}
	candidates
}

pub(crate) fn split_path_list(value: &str) -> Vec<PathBuf> {
	let separator = if cfg!(windows) { ';' } else { ':' };
	value
		.split(separator)
		.map(str::trim)
		.filter(|segment| !segment.is_empty())
		.map(PathBuf::from)
		.collect()
}

/// Looks for an executable left behind by a previous fetch, e.g.
/// `<dir>/linux-1045629/chrome-linux/chrome`.
fn fetched_executable(download_dir: &Path) -> Option<PathBuf> {
	find_browser_binary(download_dir, 4)
}

fn find_browser_binary(dir: &Path, depth: u8) -> Option<PathBuf> {
	if depth == 0 {
		return None;
	}
	let entries = std::fs::read_dir(dir).ok()?;
	let mut subdirs = Vec::new();
	for entry in entries.flatten() {
		let path = entry.path();
		if path.is_file() {
			if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
				if matches!(name, "chrome" | "chrome.exe" | "Chromium") {
					return Some(path);
				}
			}
		} else if path.is_dir() {
			subdirs.push(path);
		}
	}
	for subdir in subdirs {
		if let Some(found) = find_browser_binary(&subdir, depth - 1) {
			return Some(found);
		}
	}
	None
}

fn well_known_executables() -> Vec<PathBuf> {
	if cfg!(target_os = "windows") {
		let program_files =
			std::env::var("PROGRAMFILES").unwrap_or_else(|_| "C:\\Program Files".to_string());
		let program_files_x86 = std::env::var("PROGRAMFILES(X86)")
			.unwrap_or_else(|_| "C:\\Program Files (x86)".to_string());
		let local_app_data = std::env::var("LOCALAPPDATA")
			.map(PathBuf::from)
			.unwrap_or_else(|_| {
				dirs::home_dir()
					.unwrap_or_default()
					.join("AppData")
					.join("Local")
			});

		return vec![
			Path::new(&program_files).join("Google\\Chrome\\Application\\chrome.exe"),
			Path::new(&program_files_x86).join("Google\\Chrome\\Application\\chrome.exe"),
			local_app_data.join("Google\\Chrome\\Application\\chrome.exe"),
			Path::new(&program_files).join("Microsoft\\Edge\\Application\\msedge.exe"),
			Path::new(&program_files_x86).join("Microsoft\\Edge\\Application\\msedge.exe"),
		];
	}

	if cfg!(target_os = "macos") {
		return vec![
			PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
			PathBuf::from("/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"),
		];
	}

	vec![
		PathBuf::from("/usr/bin/google-chrome"),
		PathBuf::from("/usr/bin/google-chrome-stable"),
		PathBuf::from("/usr/bin/chromium-browser"),
		PathBuf::from("/usr/bin/chromium"),
		PathBuf::from("/usr/bin/microsoft-edge"),
		PathBuf::from("/snap/bin/chromium"),
	]
}
