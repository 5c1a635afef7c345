use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};

use carp_core::name::ExternalName;
use carp_core::path::Path;
use parking_lot::Mutex;

use crate::receiver::{Receiver, WeakReceiver};

/// What an `Agency::resolve` produces on a match (§4.2).
pub struct Resolution {
	pub receiver: Receiver,
	pub type_id: ExternalName,
	pub consumed: usize,
}

/// One rule mapping a URL-segment pattern to a family of sub-receivers.
pub trait Agent: Send + Sync {
	/// Attempts to resolve `tail` against `container` (the receiver the agency is rooted
	/// at). Returns `None` if this agent's pattern doesn't match the head of `tail`.
	fn try_resolve(&self, container: &Receiver, tail: &[String]) -> Option<Resolution>;
}

/// A (pattern, encode, decode) triple mapping a URL segment to a typed key.
pub trait Discriminator<K>: Send + Sync {
	fn decode(&self, segment: &str) -> Option<K>;
	fn encode(&self, key: &K) -> String;
}

/// Decodes/encodes a bare string segment as itself — the simplest discriminator.
pub struct StringDiscriminator;
impl Discriminator<String> for StringDiscriminator {
	fn decode(&self, segment: &str) -> Option<String> {
		Some(segment.to_owned())
	}
	fn encode(&self, key: &String) -> String {
		key.clone()
	}
}

/// Decodes/encodes a segment as a lenient-UUID key, per the wire-compat normalisation in
/// `carp_core::uuidnorm`.
pub struct UuidDiscriminator;
impl Discriminator<uuid::Uuid> for UuidDiscriminator {
	fn decode(&self, segment: &str) -> Option<uuid::Uuid> {
		carp_core::uuidnorm::parse_lenient(segment).ok()
	}
	fn encode(&self, key: &uuid::Uuid) -> String {
		key.to_string()
	}
}

/// A listener registered on an `IndexedAgent`'s catch-up protocol. Returns `true` to mean
/// "remove me" (§9 design note — verbatim one-shot semantics).
pub type Listener<K> = Box<dyn FnMut(&K, &Receiver) -> bool + Send>;

enum ContainerSource {
	/// One agent per call; the caller supplies the container (the receiver at the path
	/// prefix the agency is rooted at).
	Static,
	/// The agent is bound to a single, fixed container at construction.
	Bound(Receiver),
}

/// `Indexed`: one URL segment matches a discriminator pattern producing a key of type `K`;
/// the agent caches one receiver per `K`, held weakly, and replays catch-up to listeners
/// registered either before or after a given key's sub-receiver was created.
pub struct IndexedAgent<K: Eq + Hash + Clone + Send + Sync + 'static> {
	segment: String,
	type_id: ExternalName,
	container_source: ContainerSource,
	discriminator: Box<dyn Discriminator<K>>,
	construct: Box<dyn Fn(&Receiver, &K) -> Receiver + Send + Sync>,
	cache: Mutex<HashMap<K, WeakReceiver>>,
	listeners: Mutex<Vec<Listener<K>>>,
	/// Whether `try_resolve` should fire listener catch-up for freshly created entries —
	/// true for the static-indexed flavour, false for bound (§9 "static-indexed agent
	/// fires inform ... non-static indexed agent does not"; preserved verbatim).
	informs_on_create: bool,
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> IndexedAgent<K> {
	pub fn new_static(
		segment: impl Into<String>,
		type_id: ExternalName,
		discriminator: impl Discriminator<K> + 'static,
		construct: impl Fn(&Receiver, &K) -> Receiver + Send + Sync + 'static,
	) -> Self {
		Self {
			segment: segment.into(),
			type_id,
			container_source: ContainerSource::Static,
			discriminator: Box::new(discriminator),
			construct: Box::new(construct),
			cache: Mutex::new(HashMap::new()),
			listeners: Mutex::new(Vec::new()),
			informs_on_create: true,
		}
	}

	pub fn new_bound(
		segment: impl Into<String>,
		type_id: ExternalName,
		container: Receiver,
		discriminator: impl Discriminator<K> + 'static,
		construct: impl Fn(&Receiver, &K) -> Receiver + Send + Sync + 'static,
	) -> Self {
		Self {
			segment: segment.into(),
			type_id,
			container_source: ContainerSource::Bound(container),
			discriminator: Box::new(discriminator),
			construct: Box::new(construct),
			cache: Mutex::new(HashMap::new()),
			listeners: Mutex::new(Vec::new()),
			informs_on_create: false,
		}
	}

	/// Registers a catch-up listener: it is invoked once per already-cached entry, in
	/// insertion order, then retained for future creations until it returns `true`.
	pub fn listen(&self, mut listener: Listener<K>) {
		let cache = self.cache.lock();
		let mut done = false;
		for (k, weak) in cache.iter() {
			if let Some(r) = weak.upgrade() {
				done = listener(k, &r);
				if done {
					break;
				}
			}
		}
		drop(cache);
		if !done {
			self.listeners.lock().push(listener);
		}
	}

	fn inform(&self, key: &K, receiver: &Receiver) {
		let mut listeners = self.listeners.lock();
		listeners.retain_mut(|l| !l(key, receiver));
	}
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> Agent for IndexedAgent<K> {
	fn try_resolve(&self, container: &Receiver, tail: &[String]) -> Option<Resolution> {
		let head = tail.first()?;
		if head != &self.segment {
			return None;
		}
		let key_segment = tail.get(1)?;
		let key = self.discriminator.decode(key_segment)?;

		let effective_container = match &self.container_source {
			ContainerSource::Static => container,
			ContainerSource::Bound(c) => c,
		};

		let mut cache = self.cache.lock();
		if let Some(existing) = cache.get(&key).and_then(Weak::upgrade) {
			return Some(Resolution { receiver: existing, type_id: self.type_id.clone(), consumed: 2 });
		}
		let created = (self.construct)(effective_container, &key);
		cache.insert(key.clone(), Arc::downgrade(&created));
		drop(cache);

		if self.informs_on_create {
			self.inform(&key, &created);
		}

		Some(Resolution { receiver: created, type_id: self.type_id.clone(), consumed: 2 })
	}
}

/// `Singleton`: no segment match beyond a fixed literal; one receiver per container
/// (static) or one receiver overall (bound).
pub struct SingletonAgent {
	segment: String,
	type_id: ExternalName,
	container_source: ContainerSource,
	construct: Box<dyn Fn(&Receiver) -> Receiver + Send + Sync>,
	cache: Mutex<Option<WeakReceiver>>,
}

impl SingletonAgent {
	pub fn new_static(
		segment: impl Into<String>,
		type_id: ExternalName,
		construct: impl Fn(&Receiver) -> Receiver + Send + Sync + 'static,
	) -> Self {
		Self {
			segment: segment.into(),
			type_id,
			container_source: ContainerSource::Static,
			construct: Box::new(construct),
			cache: Mutex::new(None),
		}
	}

	pub fn new_bound(
		segment: impl Into<String>,
		type_id: ExternalName,
		container: Receiver,
		construct: impl Fn(&Receiver) -> Receiver + Send + Sync + 'static,
	) -> Self {
		Self {
			segment: segment.into(),
			type_id,
			container_source: ContainerSource::Bound(container),
			construct: Box::new(construct),
			cache: Mutex::new(None),
		}
	}
}

impl Agent for SingletonAgent {
	fn try_resolve(&self, container: &Receiver, tail: &[String]) -> Option<Resolution> {
		let head = tail.first()?;
		if head != &self.segment {
			return None;
		}
		let effective_container = match &self.container_source {
			ContainerSource::Static => container,
			ContainerSource::Bound(c) => c,
		};
		let mut cache = self.cache.lock();
		if let Some(existing) = cache.as_ref().and_then(Weak::upgrade) {
			return Some(Resolution { receiver: existing, type_id: self.type_id.clone(), consumed: 1 });
		}
		let created = (self.construct)(effective_container);
		*cache = Some(Arc::downgrade(&created));
		Some(Resolution { receiver: created, type_id: self.type_id.clone(), consumed: 1 })
	}
}

/// A collection of agents under a given receiver; tries each in turn, first match wins.
#[derive(Default)]
pub struct Agency {
	agents: Vec<Arc<dyn Agent>>,
}

impl Agency {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
		self.agents.push(agent);
		self
	}

	pub fn add_agent(&mut self, agent: Arc<dyn Agent>) {
		self.agents.push(agent);
	}

	pub fn resolve(&self, container: &Receiver, tail: &[String]) -> Option<Resolution> {
		self.agents.iter().find_map(|a| a.try_resolve(container, tail))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn dummy_receiver(tag: &'static str) -> Receiver {
		crate::receiver::TrackedReceiver::new(tag)
	}

	#[test]
	fn static_indexed_agent_caches_per_key_and_informs_on_create() {
		let agent = IndexedAgent::new_static(
			"acct",
			ExternalName::single("bank"),
			UuidDiscriminator,
			|_container, _key| dummy_receiver("account"),
		);
		let container = dummy_receiver("directory");
		let key = uuid::Uuid::new_v4();
		let segs = vec!["acct".to_owned(), key.to_string()];

		let mut informed = Vec::new();
		agent.listen(Box::new(move |k, _r| {
			informed.push(*k);
			false
		}));

		let r1 = agent.try_resolve(&container, &segs).unwrap();
		let r2 = agent.try_resolve(&container, &segs).unwrap();
		assert!(Arc::ptr_eq(&r1.receiver, &r2.receiver));
	}

	#[test]
	fn agency_tries_agents_in_order() {
		let mut agency = Agency::new();
		let agent = Arc::new(SingletonAgent::new_static("only", ExternalName::single("thing"), |_| dummy_receiver("x")));
		agency.add_agent(agent);
		let container = dummy_receiver("root");
		assert!(agency.resolve(&container, &["only".to_owned()]).is_some());
		assert!(agency.resolve(&container, &["other".to_owned()]).is_none());
	}
}
