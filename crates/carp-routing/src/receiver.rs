use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// A native service object, reachable at some path. Wraps the caller's value opaquely (so
/// `carp-routing` doesn't need to know the concrete service types generated by
/// `carp_types::codegen`) and carries a list of cleanup hooks run when the last strong
/// reference is dropped — the mechanism backing the weak-reference discipline of §5,
/// since Rust has no built-in reference-queue notification the way the source's runtime
/// does.
pub struct TrackedReceiver {
	inner: Box<dyn std::any::Any + Send + Sync>,
	on_drop: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl TrackedReceiver {
	pub fn new<T: std::any::Any + Send + Sync>(inner: T) -> Arc<Self> {
		Arc::new(Self { inner: Box::new(inner), on_drop: Mutex::new(Vec::new()) })
	}

	pub fn downcast_ref<T: std::any::Any>(&self) -> Option<&T> {
		self.inner.downcast_ref()
	}

	pub(crate) fn add_cleanup(&self, action: Box<dyn FnOnce() + Send>) {
		self.on_drop.lock().push(action);
	}
}

impl Drop for TrackedReceiver {
	fn drop(&mut self) {
		for action in self.on_drop.get_mut().drain(..) {
			action();
		}
	}
}

pub type Receiver = Arc<TrackedReceiver>;
pub type WeakReceiver = Weak<TrackedReceiver>;

/// Identity of a receiver for indexing purposes: the address backing it, stable for the
/// receiver's lifetime and independent of the number of outstanding `Arc`s.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverKey(usize);

impl ReceiverKey {
	pub fn of(receiver: &Receiver) -> Self {
		Self(Arc::as_ptr(receiver) as usize)
	}

	pub fn of_weak(weak: &WeakReceiver) -> Self {
		Self(Weak::as_ptr(weak) as usize)
	}
}
