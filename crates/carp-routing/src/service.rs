use carp_core::path::Path;

use crate::receiver::WeakReceiver;

/// `(type_id, receiver_weak, path)` — §3 "Service". Stored under both the path index and
/// the `(receiver, type_id)` index of a `PathMap`; the two copies always agree because
/// install/unbind update both atomically under the map's single monitor.
#[derive(Clone)]
pub struct Service {
	pub type_id: carp_core::name::ExternalName,
	pub receiver: WeakReceiver,
	pub path: Path,
}
