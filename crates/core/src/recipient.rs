//! Destination-number normalization.

use crate::error::{Error, Result};

/// Routing suffix for individual chats on the platform.
pub const RECIPIENT_SUFFIX: &str = "@c.us";

/// Normalizes a destination into fully-qualified recipient form.
///
/// Input already carrying the routing suffix is used as-is. Otherwise all
/// non-digit characters are stripped, `default_prefix` is prepended when the
/// digits do not already start with it, and the suffix is appended.
pub fn normalize_recipient(raw: &str, default_prefix: &str) -> Result<String> {
	let trimmed = raw.trim();
	if trimmed.is_empty() {
		return Err(Error::EmptyRecipient);
	}

	if trimmed.ends_with(RECIPIENT_SUFFIX) {
		return Ok(trimmed.to_string());
	}

	let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
	if digits.is_empty() {
		return Err(Error::InvalidRecipient(raw.to_string()));
	}

	let qualified = if digits.starts_with(default_prefix) {
		digits
	} else {
		format!("{default_prefix}{digits}")
	};

	Ok(format!("{qualified}{RECIPIENT_SUFFIX}"))
}
