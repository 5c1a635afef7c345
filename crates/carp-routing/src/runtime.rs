use std::sync::Arc;
use std::time::Duration;

use crate::packrat::PackRat;
use crate::reaper::{CleanupAction, Reaper};

const DEFAULT_PACKRAT_WINDOW: Duration = Duration::from_secs(5);

/// Owns the pack-rat and the reaper thread; passed to each `PathMap` at construction
/// rather than living behind a process-wide singleton (§9 "Module-level state").
pub struct Runtime {
	pack_rat: Arc<PackRat>,
	reaper: Reaper,
}

impl Runtime {
	pub fn new() -> Arc<Self> {
		Self::with_packrat_window(DEFAULT_PACKRAT_WINDOW)
	}

	pub fn with_packrat_window(window: Duration) -> Arc<Self> {
		let pack_rat = Arc::new(PackRat::new(window));
		let tick_pack_rat = pack_rat.clone();
		let reaper = Reaper::spawn(move || tick_pack_rat.tick(), window);
		Arc::new(Self { pack_rat, reaper })
	}

	pub fn pack_rat(&self) -> &Arc<PackRat> {
		&self.pack_rat
	}

	pub fn enqueue_cleanup(&self, action: CleanupAction) {
		self.reaper.enqueue(action);
	}
}
