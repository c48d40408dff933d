use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming the number the session is expected to
/// authenticate as (digits only; anything else is stripped).
pub const EXPECTED_NUMBER_ENV: &str = "WHATSAPP_SENDER_NUMBER";

/// Reconnect schedule applied after a disconnect event.
///
/// Delays double from `initial_delay` up to `max_delay`. `max_attempts`
/// of `Some(0)` is normalized to `None` (retry forever).
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
	pub initial_delay: Duration,
	pub max_delay: Duration,
	pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
	fn default() -> Self {
		Self {
			initial_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(60),
			max_attempts: Some(10),
		}
	}
}

impl ReconnectPolicy {
	/// Delay before reconnect attempt `attempt` (1-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let shift = attempt.saturating_sub(1).min(31);
		self.initial_delay
			.saturating_mul(1u32 << shift)
			.min(self.max_delay)
	}

	/// True when `attempt` (1-based) exceeds the configured ceiling.
	pub fn exhausted(&self, attempt: u32) -> bool {
		match self.max_attempts {
			Some(max) if max > 0 => attempt > max,
			_ => false,
		}
	}
}

/// Explicit gateway configuration; nothing is read from hidden globals.
#[derive(Debug, Clone)]
pub struct Config {
	/// Directory for externally consumed artifacts (status JSON, QR text).
	pub public_dir: PathBuf,
	/// Browser profile directory; session/auth data in it is owned entirely
	/// by the browser.
	pub user_data_dir: PathBuf,
	/// Run the browser headless.
	pub headless: bool,
	/// Number the session is expected to authenticate as, digits only.
	/// A mismatch on ready is logged as a warning, never an error.
	pub expected_number: Option<String>,
	/// Country prefix prepended to bare national numbers.
	pub default_country_prefix: String,
	pub reconnect: ReconnectPolicy,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			public_dir: PathBuf::from("public"),
			user_data_dir: PathBuf::from(".wagate/session"),
			headless: true,
			expected_number: None,
			default_country_prefix: "55".to_string(),
			reconnect: ReconnectPolicy::default(),
		}
	}
}

impl Config {
	/// Defaults layered with the `WHATSAPP_SENDER_NUMBER` environment
	/// override.
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Ok(raw) = std::env::var(EXPECTED_NUMBER_ENV) {
			let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
			if !digits.is_empty() {
				config.expected_number = Some(digits);
			}
		}
		config
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delays_double_until_clamped() {
		let policy = ReconnectPolicy {
			initial_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(8),
			max_attempts: Some(10),
		};

		assert_eq!(policy.delay_for(1), Duration::from_secs(1));
		assert_eq!(policy.delay_for(2), Duration::from_secs(2));
		assert_eq!(policy.delay_for(3), Duration::from_secs(4));
		assert_eq!(policy.delay_for(4), Duration::from_secs(8));
		assert_eq!(policy.delay_for(9), Duration::from_secs(8));
	}

	#[test]
	fn huge_attempt_numbers_do_not_overflow() {
		let policy = ReconnectPolicy::default();
		assert_eq!(policy.delay_for(u32::MAX), policy.max_delay);
	}

	#[test]
	fn ceiling_of_zero_means_unbounded() {
		let unbounded = ReconnectPolicy {
			max_attempts: Some(0),
			..ReconnectPolicy::default()
		};
		assert!(!unbounded.exhausted(u32::MAX));

		let capped = ReconnectPolicy {
			max_attempts: Some(3),
			..ReconnectPolicy::default()
		};
		assert!(!capped.exhausted(3));
		assert!(capped.exhausted(4));
	}
}
