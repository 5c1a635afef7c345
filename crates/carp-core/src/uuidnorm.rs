use uuid::Uuid;

/// Lenient UUID decode: strips everything but hex digits, then reinserts dashes at the
/// canonical 8-4-4-4-12 positions before parsing.
///
/// Kept for wire compatibility with callers that send UUIDs without dashes, or with
/// surrounding punctuation (braces, `urn:uuid:` prefixes stripped upstream, etc). Strict
/// callers should use `Uuid::parse_str` directly instead of this function.
pub fn parse_lenient(input: &str) -> Result<Uuid, uuid::Error> {
	let hex: String = input.chars().filter(char::is_ascii_hexdigit).collect();
	if hex.len() != 32 {
		// Not hex-normalizable; fall through to the strict parser so the caller still gets
		// uuid's own error message for genuinely malformed input.
		return Uuid::parse_str(input);
	}
	let dashed = format!(
		"{}-{}-{}-{}-{}",
		&hex[0..8],
		&hex[8..12],
		&hex[12..16],
		&hex[16..20],
		&hex[20..32]
	);
	Uuid::parse_str(&dashed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_canonical_dashed_form() {
		let u = parse_lenient("550e8400-e29b-41d4-a716-446655440000").unwrap();
		assert_eq!(u.to_string(), "550e8400-e29b-41d4-a716-446655440000");
	}

	#[test]
	fn accepts_bare_hex_without_dashes() {
		let u = parse_lenient("550e8400e29b41d4a716446655440000").unwrap();
		assert_eq!(u.to_string(), "550e8400-e29b-41d4-a716-446655440000");
	}

	#[test]
	fn accepts_punctuation_and_braces() {
		let u = parse_lenient("{550e8400-e29b-41d4-a716-446655440000}").unwrap();
		assert_eq!(u.to_string(), "550e8400-e29b-41d4-a716-446655440000");
	}

	#[test]
	fn rejects_wrong_length() {
		assert!(parse_lenient("not-a-uuid").is_err());
	}
}
