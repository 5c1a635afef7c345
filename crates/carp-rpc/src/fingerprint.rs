use std::collections::HashMap;

use parking_lot::Mutex;

/// Collaborator that looks up the opaque cryptographic fingerprint carp exchanges as
/// side-metadata for peers referenced by endpoints passed by reference (GLOSSARY
/// "Fingerprint"). Out of scope per `spec.md` §1 is *how* a fingerprint is computed or
/// verified (that's a transport/TLS concern); carp only carries it.
pub trait FingerprintRepository: Send + Sync {
	fn fingerprint_for(&self, peer: &str) -> Option<String>;

	/// Records a fingerprint observed on an inbound message, so a later outbound message
	/// to the same peer can carry it back. Advisory only: the spec does not say fingerprint
	/// mismatches should fail a call, so `Presence` only logs disagreements (see DESIGN.md).
	fn observe(&self, _peer: &str, _print: &str) {}
}

/// A process-local fingerprint table, sufficient for single-node deployments and tests.
#[derive(Default)]
pub struct InMemoryFingerprints {
	table: Mutex<HashMap<String, String>>,
}

impl InMemoryFingerprints {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, peer: impl Into<String>, print: impl Into<String>) {
		self.table.lock().insert(peer.into(), print.into());
	}
}

impl FingerprintRepository for InMemoryFingerprints {
	fn fingerprint_for(&self, peer: &str) -> Option<String> {
		self.table.lock().get(peer).cloned()
	}

	fn observe(&self, peer: &str, print: &str) {
		self.table.lock().insert(peer.to_owned(), print.to_owned());
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn observed_fingerprints_are_retrievable() {
		let repo = InMemoryFingerprints::new();
		assert_eq!(repo.fingerprint_for("host:1"), None);
		repo.observe("host:1", "abc123");
		assert_eq!(repo.fingerprint_for("host:1"), Some("abc123".to_owned()));
	}
}
