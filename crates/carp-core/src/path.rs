use std::fmt;

use uuid::Uuid;

/// A routing path: an ordered sequence of (possibly empty) string segments.
///
/// The empty sequence is the root path, `"/"`. Segments are preserved on the wire exactly
/// as split, including empty segments from repeated slashes — the PathMap decides what to
/// do with them, this type just carries them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
	segments: Vec<String>,
}

impl Path {
	pub fn root() -> Self {
		Self { segments: Vec::new() }
	}

	pub fn from_segments(segments: Vec<String>) -> Self {
		Self { segments }
	}

	/// Parses a `/`-separated path. A leading `/` is stripped; `""` and `"/"` both parse to root.
	pub fn parse(s: &str) -> Self {
		let s = s.strip_prefix('/').unwrap_or(s);
		if s.is_empty() {
			return Self::root();
		}
		Self {
			segments: s.split('/').map(str::to_owned).collect(),
		}
	}

	pub fn segments(&self) -> &[String] {
		&self.segments
	}

	pub fn is_root(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	/// Returns the first `n` segments as a path, and the rest as a path, without reallocating
	/// beyond the two halves.
	pub fn split_at(&self, n: usize) -> (Path, Path) {
		let (head, tail) = self.segments.split_at(n.min(self.segments.len()));
		(
			Path::from_segments(head.to_vec()),
			Path::from_segments(tail.to_vec()),
		)
	}

	pub fn join(&self, other: &Path) -> Path {
		let mut segments = self.segments.clone();
		segments.extend(other.segments.iter().cloned());
		Path { segments }
	}

	pub fn push(&mut self, segment: impl Into<String>) {
		self.segments.push(segment.into());
	}

	/// True if `self`'s segments are a prefix of `other`'s.
	pub fn is_prefix_of(&self, other: &Path) -> bool {
		self.segments.len() <= other.segments.len() && self.segments == other.segments[..self.segments.len()]
	}

	/// A fresh `anon/<uuid-v4>` path, used by `PathMap::recognize` when a receiver has no
	/// bound path yet.
	pub fn anonymous() -> Self {
		Self {
			segments: vec!["anon".to_owned(), Uuid::new_v4().to_string()],
		}
	}
}

impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "/{}", self.segments.join("/"))
	}
}

impl std::str::FromStr for Path {
	type Err = std::convert::Infallible;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::parse(s))
	}
}
