use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::receiver::{Receiver, ReceiverKey};

/// Short-term retention pool preventing immediate weak-reference collection of freshly
/// installed receivers (§9 "Pack-rat retention"). Two generations are kept; `retain`
/// always writes into whichever generation is current, chosen via a single atomic load —
/// no caller ever blocks on the generation swap itself. A receiver stays retained for
/// between one and two `window`s, never less.
pub struct PackRat {
	window: Duration,
	generations: [Mutex<HashMap<ReceiverKey, Receiver>>; 2],
	active: AtomicUsize,
}

impl PackRat {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			generations: [Mutex::new(HashMap::new()), Mutex::new(HashMap::new())],
			active: AtomicUsize::new(0),
		}
	}

	pub fn window(&self) -> Duration {
		self.window
	}

	pub fn retain(&self, receiver: &Receiver) {
		let idx = self.active.load(Ordering::Acquire) & 1;
		self.generations[idx].lock().insert(ReceiverKey::of(receiver), receiver.clone());
	}

	/// Advances the generation clock: clears the bucket that is about to become current
	/// (the one with the oldest retained entries), then flips the active index. Call this
	/// once per `window` from a single timer source (the `Runtime`'s reaper thread).
	pub fn tick(&self) {
		let current = self.active.load(Ordering::Acquire) & 1;
		let next = (current + 1) & 1;
		self.generations[next].lock().clear();
		self.active.store(next, Ordering::Release);
	}

	#[cfg(test)]
	fn contains(&self, receiver: &Receiver) -> bool {
		let key = ReceiverKey::of(receiver);
		self.generations.iter().any(|g| g.lock().contains_key(&key))
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	#[test]
	fn retained_receiver_survives_one_tick_but_not_three() {
		let pack_rat = PackRat::new(Duration::from_millis(1));
		let receiver: Receiver = Arc::new(42i32);
		pack_rat.retain(&receiver);
		assert!(pack_rat.contains(&receiver));
		pack_rat.tick();
		assert!(pack_rat.contains(&receiver));
		pack_rat.tick();
		pack_rat.tick();
		assert!(!pack_rat.contains(&receiver));
	}
}
