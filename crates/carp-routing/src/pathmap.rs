use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use carp_core::name::ExternalName;
use carp_core::path::Path;
use parking_lot::Mutex;

use crate::agency::Agency;
use crate::error::RoutingError;
use crate::receiver::{Receiver, ReceiverKey, WeakReceiver};
use crate::runtime::Runtime;
use crate::service::Service;

type DeferredCallback = Box<dyn FnOnce(&mut State) + Send>;

#[derive(Default)]
struct State {
	paths: HashMap<Path, Service>,
	receiver_index: HashMap<(ReceiverKey, ExternalName), Service>,
	agencies: HashMap<ReceiverKey, Arc<Agency>>,
	callback_queue: VecDeque<DeferredCallback>,
}

/// The result of `PathMap::resolve`: the matched receiver, the type under which it
/// resolved, the path prefix consumed to reach it, and whatever tail remains unconsumed.
pub struct Match {
	pub type_id: ExternalName,
	pub receiver: Receiver,
	pub head: Path,
	pub tail: Path,
}

/// A proxy installer handed to an agency during a deferred install: calling it enqueues a
/// closure rather than re-entering the map's lock (§4.3 "Deferred install queue").
pub struct Installer<'a> {
	queue: &'a mut VecDeque<DeferredCallback>,
}

impl<'a> Installer<'a> {
	pub fn enqueue(&mut self, action: impl FnOnce(&mut State) + Send + 'static) {
		self.queue.push_back(Box::new(action));
	}
}

/// Concurrent path↔receiver index (§4.3). All mutating operations acquire a single
/// monitor; the lock is never held while a user callback runs (callbacks are drained
/// before and after each operation instead).
pub struct PathMap {
	runtime: Arc<Runtime>,
	state: Arc<Mutex<State>>,
}

impl PathMap {
	pub fn new(runtime: Arc<Runtime>) -> Self {
		Self { runtime, state: Arc::new(Mutex::new(State::default())) }
	}

	fn drain(state: &mut State) {
		while let Some(cb) = state.callback_queue.pop_front() {
			cb(state);
		}
	}

	fn with_lock<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
		let mut guard = self.state.lock();
		Self::drain(&mut guard);
		let result = f(&mut guard);
		Self::drain(&mut guard);
		result
	}

	/// Installs `receiver` at `path` under `type_id`, reconciling dual indices per the
	/// four numbered rules in §4.3, and registers `agency` (if given) so `resolve` can
	/// delegate unconsumed tails to it. Retains `receiver` in the pack-rat for
	/// `packrat_window` before any external caller could have acquired a weak reference.
	#[tracing::instrument(level = "debug", skip_all, fields(path = %path, type_id = %type_id))]
	pub fn bind(&self, path: Path, type_id: ExternalName, receiver: Receiver, agency: Option<Arc<Agency>>) {
		self.bind_with_announcement(path, type_id, receiver, agency, |_, _| {});
	}

	/// As `bind`, but also lets the agency (or the receiver's own constructor) announce
	/// further sub-bindings synchronously, without reentering this map's lock. `announce`
	/// runs while the lock is held and may only enqueue work via `installer`; the enqueued
	/// closures run against live state once `announce` returns and before the lock is
	/// released (§4.3 rule 4, §9 "Deferred install queue").
	pub fn bind_with_announcement(
		&self,
		path: Path,
		type_id: ExternalName,
		receiver: Receiver,
		agency: Option<Arc<Agency>>,
		announce: impl FnOnce(&Receiver, &mut Installer),
	) {
		self.runtime.pack_rat().retain(&receiver);
		let weak = Arc::downgrade(&receiver);
		let receiver_key = ReceiverKey::of(&receiver);

		self.with_lock(|state| {
			install(state, path, type_id, weak.clone());
			if let Some(agency) = agency {
				state.agencies.insert(receiver_key, agency);
			}
			let mut installer = Installer { queue: &mut state.callback_queue };
			announce(&receiver, &mut installer);
		});

		self.schedule_cleanup(receiver_key, weak);
	}

	/// Schedules a reaper-thread action that removes `receiver`'s entries once it is
	/// actually collected, re-checking weak identity to avoid deleting a reused slot
	/// (§9 "Weak receivers + callback cleanup").
	fn schedule_cleanup(&self, receiver_key: ReceiverKey, weak: WeakReceiver) {
		// `TrackedReceiver::add_cleanup` only works while at least one strong ref is held;
		// acquire one just long enough to register the hook.
		if let Some(receiver) = weak.upgrade() {
			let runtime = self.runtime.clone();
			let state = self.state.clone();
			receiver.add_cleanup(Box::new(move || {
				runtime.enqueue_cleanup(Box::new(move || {
					reap_locked(&state, receiver_key);
				}));
			}));
		}
	}

	/// Removes every entry for `receiver_key` if its weak reference is indeed empty.
	pub fn reap(&self, receiver_key: ReceiverKey) {
		reap_locked(&self.state, receiver_key);
	}

	pub fn unbind_path(&self, path: &Path) {
		self.with_lock(|state| {
			if let Some(svc) = state.paths.remove(path) {
				state.receiver_index.remove(&(ReceiverKey::of_weak(&svc.receiver), svc.type_id));
			}
		});
	}

	pub fn unbind_type(&self, type_id: &ExternalName, receiver: &Receiver) {
		let key = ReceiverKey::of(receiver);
		self.with_lock(|state| {
			if let Some(svc) = state.receiver_index.remove(&(key, type_id.clone())) {
				state.paths.remove(&svc.path);
			}
		});
	}

	pub fn unbind_receiver(&self, receiver: &Receiver) {
		let key = ReceiverKey::of(receiver);
		self.reap(key);
	}

	pub fn locate(&self, type_id: &ExternalName, receiver: &Receiver) -> Option<Path> {
		let key = ReceiverKey::of(receiver);
		self.with_lock(|state| state.receiver_index.get(&(key, type_id.clone())).map(|svc| svc.path.clone()))
	}

	/// Reverse lookup, allocating an `anon/<uuid>` path if `receiver` is unbound under
	/// `type_id` (§4.3 `recognize`).
	pub fn recognize(&self, type_id: &ExternalName, receiver: &Receiver) -> Path {
		if let Some(path) = self.locate(type_id, receiver) {
			return path;
		}
		let path = Path::anonymous();
		self.bind(path.clone(), type_id.clone(), receiver.clone(), None);
		path
	}

	/// Longest-prefix match over `paths`, then recursive agency delegation (§4.3
	/// `resolve`). Returns `Ok(None)` if no prefix at all resolves.
	pub fn resolve(&self, path: &Path) -> Result<Option<Match>, RoutingError> {
		self.with_lock(|state| resolve_locked(state, path))
	}

	/// Snapshots the current bindings for introspection, sorted by path for stable
	/// output. Modelled on `StoreUpdater::dump` in the teacher's binding store: acquire
	/// the lock just long enough to clone what's needed, sort outside it.
	pub fn dump(&self) -> Vec<DumpEntry> {
		let mut entries: Vec<_> = self.with_lock(|state| {
			state
				.paths
				.values()
				.map(|svc| DumpEntry { path: svc.path.clone(), type_id: svc.type_id.clone(), alive: svc.receiver.upgrade().is_some() })
				.collect()
		});
		entries.sort_by(|a, b| a.path.cmp(&b.path));
		entries
	}
}

/// One row of a [`PathMap::dump`] snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpEntry {
	pub path: Path,
	pub type_id: ExternalName,
	pub alive: bool,
}

fn reap_locked(state: &Mutex<State>, receiver_key: ReceiverKey) {
	let mut guard = state.lock();
	PathMap::drain(&mut guard);
	guard.paths.retain(|_, svc| ReceiverKey::of_weak(&svc.receiver) != receiver_key || svc.receiver.upgrade().is_some());
	guard
		.receiver_index
		.retain(|(key, _), svc| *key != receiver_key || svc.receiver.upgrade().is_some());
	guard.agencies.remove(&receiver_key);
	PathMap::drain(&mut guard);
}

fn install(state: &mut State, path: Path, type_id: ExternalName, weak: WeakReceiver) {
	let key = ReceiverKey::of_weak(&weak);

	// Rule 2: a prior Service for the same receiver+type at a different path loses its
	// path entry.
	if let Some(prev) = state.receiver_index.get(&(key, type_id.clone())) {
		if prev.path != path {
			state.paths.remove(&prev.path);
		}
	}

	// Rule 3: a prior Service at the same path for a different receiver+type loses its
	// receiver-index entry.
	if let Some(prev) = state.paths.get(&path) {
		let prev_key = ReceiverKey::of_weak(&prev.receiver);
		if prev_key != key || prev.type_id != type_id {
			state.receiver_index.remove(&(prev_key, prev.type_id.clone()));
		}
	}

	let service = Service { type_id: type_id.clone(), receiver: weak, path: path.clone() };
	state.paths.insert(path, service.clone());
	state.receiver_index.insert((key, type_id), service);
}

fn resolve_locked(state: &State, path: &Path) -> Result<Option<Match>, RoutingError> {
	let segments = path.segments();
	for prefix_len in (0..=segments.len()).rev() {
		let (head, tail) = path.split_at(prefix_len);
		let Some(service) = state.paths.get(&head) else { continue };
		let Some(receiver) = service.receiver.upgrade() else { continue };

		let mut type_id = service.type_id.clone();
		let mut receiver = receiver;
		let mut head = head;
		let mut tail_segments: Vec<String> = tail.segments().to_vec();

		loop {
			if tail_segments.is_empty() {
				break;
			}
			let agency_key = ReceiverKey::of(&receiver);
			let Some(agency) = state.agencies.get(&agency_key) else { break };
			let Some(resolution) = agency.resolve(&receiver, &tail_segments) else { break };

			for seg in tail_segments.drain(..resolution.consumed) {
				head.push(seg);
			}
			type_id = resolution.type_id;
			receiver = resolution.receiver;
		}

		return Ok(Some(Match { type_id, receiver, head, tail: Path::from_segments(tail_segments) }));
	}
	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::agency::{Agency, IndexedAgent, UuidDiscriminator};
	use crate::receiver::TrackedReceiver;

	fn runtime() -> Arc<Runtime> {
		Runtime::with_packrat_window(std::time::Duration::from_secs(60))
	}

	#[test]
	fn bind_then_resolve_and_locate() {
		let map = PathMap::new(runtime());
		let receiver = TrackedReceiver::new("bank");
		let type_id = ExternalName::single("bank");
		let path = Path::parse("/a");

		map.bind(path.clone(), type_id.clone(), receiver.clone(), None);

		let matched = map.resolve(&path).unwrap().unwrap();
		assert!(Arc::ptr_eq(&matched.receiver, &receiver));
		assert!(matched.tail.is_root());
		assert_eq!(map.locate(&type_id, &receiver), Some(path));
	}

	#[test]
	fn unbind_removes_both_indices() {
		let map = PathMap::new(runtime());
		let receiver = TrackedReceiver::new("bank");
		let type_id = ExternalName::single("bank");
		let path = Path::parse("/a");
		map.bind(path.clone(), type_id.clone(), receiver.clone(), None);

		map.unbind_path(&path);

		assert!(map.resolve(&path).unwrap().is_none());
		assert_eq!(map.locate(&type_id, &receiver), None);
	}

	#[test]
	fn recognize_allocates_and_is_stable() {
		let map = PathMap::new(runtime());
		let receiver = TrackedReceiver::new("bank");
		let type_id = ExternalName::single("bank");

		let p1 = map.recognize(&type_id, &receiver);
		let p2 = map.recognize(&type_id, &receiver);
		assert_eq!(p1, p2);
		assert_eq!(p1.segments()[0], "anon");

		let matched = map.resolve(&p1).unwrap().unwrap();
		assert!(Arc::ptr_eq(&matched.receiver, &receiver));
	}

	#[test]
	fn rebind_reconciliation_moves_receiver_to_new_path() {
		let map = PathMap::new(runtime());
		let receiver = TrackedReceiver::new("bank");
		let type_id = ExternalName::single("bank");

		map.bind(Path::parse("/a"), type_id.clone(), receiver.clone(), None);
		map.bind(Path::parse("/b"), type_id.clone(), receiver.clone(), None);

		assert_eq!(map.locate(&type_id, &receiver), Some(Path::parse("/b")));
		assert!(map.resolve(&Path::parse("/a")).unwrap().is_none());
		assert!(map.resolve(&Path::parse("/b")).unwrap().is_some());
	}

	#[test]
	fn agency_dispatch_resolves_through_indexed_agent() {
		let map = PathMap::new(runtime());
		let directory = TrackedReceiver::new("directory");
		let directory_type = ExternalName::single("directory");
		map.bind(Path::parse("/d"), directory_type, directory.clone(), None);

		let agent = Arc::new(IndexedAgent::new_static(
			"acct",
			ExternalName::single("bank"),
			UuidDiscriminator,
			|_container, _key| TrackedReceiver::new("bank-instance"),
		));
		let agency = Arc::new(Agency::new().with_agent(agent));
		map.with_lock(|state| {
			state.agencies.insert(ReceiverKey::of(&directory), agency);
		});

		let uuid = uuid::Uuid::new_v4();
		let path = Path::parse(&format!("/d/acct/{uuid}"));
		let matched = map.resolve(&path).unwrap().unwrap();
		assert!(matched.tail.is_root());
		assert_eq!(matched.head, path);

		let matched_again = map.resolve(&path).unwrap().unwrap();
		assert!(Arc::ptr_eq(&matched.receiver, &matched_again.receiver));
	}

	#[test]
	fn dump_reports_bound_paths_sorted_by_path() {
		let map = PathMap::new(runtime());
		let bank = TrackedReceiver::new("bank");
		let ledger = TrackedReceiver::new("ledger");
		map.bind(Path::parse("/b"), ExternalName::single("bank"), bank.clone(), None);
		map.bind(Path::parse("/a"), ExternalName::single("ledger"), ledger.clone(), None);

		let entries = map.dump();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].path, Path::parse("/a"));
		assert_eq!(entries[0].type_id, ExternalName::single("ledger"));
		assert!(entries[0].alive);
		assert_eq!(entries[1].path, Path::parse("/b"));
		assert!(entries[1].alive);
	}
}
