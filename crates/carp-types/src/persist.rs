use indexmap::IndexMap;

use crate::error::TypeError;

/// A flat, string-keyed property bag: the persistence format of §6. Composite types write
/// their children under numbered sub-prefixes (`elem.0.`, `elem.1.`, ...) plus a sibling
/// `<prefix>count` integer, preserving in-memory order on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyMap {
	entries: IndexMap<String, String>,
}

impl PropertyMap {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.entries.insert(key.into(), value.into());
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.entries.get(key).map(String::as_str)
	}

	pub fn require(&self, key: &str) -> Result<&str, TypeError> {
		self
			.get(key)
			.ok_or_else(|| TypeError::Persistence(format!("missing property {key:?}")))
	}

	pub fn require_usize(&self, key: &str) -> Result<usize, TypeError> {
		self
			.require(key)?
			.parse()
			.map_err(|_| TypeError::Persistence(format!("property {key:?} is not an integer")))
	}

	pub fn get_bool(&self, key: &str, default: bool) -> bool {
		match self.get(key) {
			Some("yes") => true,
			Some("no") => false,
			_ => default,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Serializes to the line-oriented `key=value` text form used by module files on disk.
	pub fn to_text(&self) -> String {
		let mut out = String::new();
		for (k, v) in &self.entries {
			out.push_str(k);
			out.push('=');
			out.push_str(v);
			out.push('\n');
		}
		out
	}

	pub fn from_text(text: &str) -> Result<Self, TypeError> {
		let mut map = Self::new();
		for (lineno, line) in text.lines().enumerate() {
			if line.trim().is_empty() {
				continue;
			}
			let (k, v) = line
				.split_once('=')
				.ok_or_else(|| TypeError::Persistence(format!("malformed property line {}", lineno + 1)))?;
			map.set(k, v);
		}
		Ok(map)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_text() {
		let mut map = PropertyMap::new();
		map.set("type", "struct");
		map.set("member.count", "2");
		let text = map.to_text();
		let back = PropertyMap::from_text(&text).unwrap();
		assert_eq!(map, back);
	}

	#[test]
	fn require_usize_parses_counts() {
		let mut map = PropertyMap::new();
		map.set("elem.count", "3");
		assert_eq!(map.require_usize("elem.count").unwrap(), 3);
	}
}
