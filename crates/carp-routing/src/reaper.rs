use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver as ChannelReceiver, Sender};

/// A cleanup action enqueued when a weakly-held receiver is collected. It must re-check
/// weak identity before removing anything, per §9 "the lambda must re-check weak identity
/// before removing, to avoid deleting a re-used slot".
pub type CleanupAction = Box<dyn FnOnce() + Send>;

/// Polls a queue of deferred cleanup actions on a dedicated background thread, and ticks
/// the pack-rat clock. Runs cleanup lambdas without holding the `PathMap`'s monitor.
pub struct Reaper {
	sender: Sender<CleanupAction>,
	shutdown: Arc<AtomicBool>,
	handle: Option<std::thread::JoinHandle<()>>,
}

impl Reaper {
	pub fn spawn(pack_rat_tick: impl Fn() + Send + 'static, tick_interval: Duration) -> Self {
		let (sender, receiver): (Sender<CleanupAction>, ChannelReceiver<CleanupAction>) = crossbeam_channel::unbounded();
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let handle = std::thread::Builder::new()
			.name("carp-pathmap-reaper".into())
			.spawn(move || {
				while !shutdown_clone.load(Ordering::Relaxed) {
					match receiver.recv_timeout(tick_interval) {
						Ok(action) => action(),
						Err(crossbeam_channel::RecvTimeoutError::Timeout) => pack_rat_tick(),
						Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
					}
				}
			})
			.expect("failed to spawn reaper thread");

		Self { sender, shutdown, handle: Some(handle) }
	}

	pub fn enqueue(&self, action: CleanupAction) {
		if self.sender.send(action).is_err() {
			tracing::warn!("reaper channel closed, dropping cleanup action");
		}
	}
}

impl Drop for Reaper {
	fn drop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.handle.take() {
			let _ = handle.join();
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering as O};

	use super::*;

	#[test]
	fn enqueued_actions_run_off_the_caller_thread() {
		let reaper = Reaper::spawn(|| {}, Duration::from_secs(60));
		let ran = Arc::new(AtomicUsize::new(0));
		let ran_clone = ran.clone();
		reaper.enqueue(Box::new(move || {
			ran_clone.fetch_add(1, O::SeqCst);
		}));
		// Give the background thread a chance to drain the channel.
		std::thread::sleep(Duration::from_millis(50));
		assert_eq!(ran.load(O::SeqCst), 1);
	}
}
