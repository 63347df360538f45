//! String formatting utilities.
//!
//! Entity and update identifiers can be long (UUIDs, prefixed keys), so logs
//! show a shortened form.

/// Truncates an identifier for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((idx, _)) => format!("{}..", &id[..idx]),
		None => id.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_short_ids_are_untouched() {
		assert_eq!(truncate_id("order-1"), "order-1");
		assert_eq!(truncate_id("12345678"), "12345678");
	}

	#[test]
	fn test_long_ids_are_truncated() {
		assert_eq!(truncate_id("6f1c2a9e-0b7d"), "6f1c2a9e..");
	}
}
