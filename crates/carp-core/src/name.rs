use std::fmt;

use heck::{ToLowerCamelCase, ToPascalCase, ToShoutySnakeCase};
use serde::{Deserialize, Serialize};

/// A dotted, hyphen-aware identifier: a non-empty ordered sequence of *words*, where each word
/// matches `letter (letter|digit|hyphen)*`.
///
/// `foo.bar-baz` is two words, `["foo", "bar-baz"]`; the hyphen inside `bar-baz` marks a
/// sub-word boundary used only by the idiomatic-name projections, not by `parent`/`leaf`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExternalName {
	words: Vec<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
	#[error("external name must have at least one word")]
	Empty,
	#[error("invalid word {0:?}: must match letter (letter|digit|hyphen)*")]
	InvalidWord(String),
}

fn is_valid_word(word: &str) -> bool {
	let mut chars = word.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() => {},
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl ExternalName {
	/// Parses a `.`-separated dotted identifier, e.g. `"acme.bank.deposit-request"`.
	pub fn parse(s: &str) -> Result<Self, NameError> {
		let words: Vec<String> = s.split('.').map(str::to_owned).collect();
		Self::from_words(words)
	}

	pub fn from_words(words: Vec<String>) -> Result<Self, NameError> {
		if words.is_empty() {
			return Err(NameError::Empty);
		}
		for w in &words {
			if !is_valid_word(w) {
				return Err(NameError::InvalidWord(w.clone()));
			}
		}
		Ok(Self { words })
	}

	/// A single-word name. Panics on an invalid word; use [`Self::parse`] for untrusted input.
	pub fn single(word: impl Into<String>) -> Self {
		let word = word.into();
		assert!(is_valid_word(&word), "invalid word: {word:?}");
		Self { words: vec![word] }
	}

	pub fn words(&self) -> &[String] {
		&self.words
	}

	pub fn is_leaf(&self) -> bool {
		self.words.len() == 1
	}

	/// All but the last word. Empty if this name is already a leaf.
	pub fn parent(&self) -> Option<ExternalName> {
		if self.words.len() <= 1 {
			return None;
		}
		Some(ExternalName {
			words: self.words[..self.words.len() - 1].to_vec(),
		})
	}

	/// The last word, as its own single-word name.
	pub fn leaf(&self) -> ExternalName {
		ExternalName {
			words: vec![self.words.last().expect("non-empty by construction").clone()],
		}
	}

	/// Concatenates `self`'s words followed by `other`'s words.
	pub fn resolve(&self, other: &ExternalName) -> ExternalName {
		let mut words = self.words.clone();
		words.extend(other.words.iter().cloned());
		ExternalName { words }
	}

	fn subwords(&self) -> Vec<&str> {
		self.words.iter().flat_map(|w| w.split('-')).collect()
	}

	pub fn as_native_class_name(&self) -> String {
		self.subwords().join("-").to_pascal_case()
	}

	pub fn as_native_method_name(&self) -> String {
		self.subwords().join("-").to_lower_camel_case()
	}

	pub fn as_native_constant_name(&self) -> String {
		self.subwords().join("-").to_shouty_snake_case()
	}
}

impl fmt::Display for ExternalName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.words.join("."))
	}
}

impl PartialEq for ExternalName {
	fn eq(&self, other: &Self) -> bool {
		self.words == other.words
	}
}
impl Eq for ExternalName {}

impl PartialOrd for ExternalName {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}
impl Ord for ExternalName {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self.words.cmp(&other.words)
	}
}

impl std::hash::Hash for ExternalName {
	fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
		self.words.hash(state);
	}
}

impl std::str::FromStr for ExternalName {
	type Err = NameError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_dotted_hyphenated_names() {
		let n = ExternalName::parse("acme.bank-account.deposit-request").unwrap();
		assert_eq!(n.words(), &["acme", "bank-account", "deposit-request"]);
		assert!(!n.is_leaf());
	}

	#[test]
	fn rejects_invalid_words() {
		assert_eq!(
			ExternalName::parse("1foo").unwrap_err(),
			NameError::InvalidWord("1foo".into())
		);
		assert_eq!(
			ExternalName::parse("").unwrap_err(),
			NameError::InvalidWord("".into())
		);
	}

	#[test]
	fn parent_and_leaf() {
		let n = ExternalName::parse("acme.bank.deposit").unwrap();
		assert_eq!(n.leaf().to_string(), "deposit");
		assert_eq!(n.parent().unwrap().to_string(), "acme.bank");
		let leaf_only = ExternalName::single("deposit");
		assert_eq!(leaf_only.parent(), None);
		assert!(leaf_only.is_leaf());
	}

	#[test]
	fn resolve_concatenates() {
		let module = ExternalName::parse("acme.bank").unwrap();
		let local = ExternalName::single("deposit");
		assert_eq!(module.resolve(&local).to_string(), "acme.bank.deposit");
	}

	#[test]
	fn idiomatic_projections() {
		let n = ExternalName::single("words-with-hyphens");
		assert_eq!(n.as_native_class_name(), "WordsWithHyphens");
		assert_eq!(n.as_native_method_name(), "wordsWithHyphens");
		assert_eq!(n.as_native_constant_name(), "WORDS_WITH_HYPHENS");
	}

	#[test]
	fn ordering_is_lexicographic_over_words() {
		let a = ExternalName::parse("a.b").unwrap();
		let b = ExternalName::parse("a.c").unwrap();
		let c = ExternalName::parse("a.b.c").unwrap();
		assert!(a < b);
		assert!(a < c);
	}
}
