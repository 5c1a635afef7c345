use std::future::Future;
use std::pin::Pin;

use crate::error::DispatchError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The matched response variant of a call that declares at least one response: the
/// generated response-union's leaf name and its field object, mirroring the
/// `Variant(serde_json::Value)` arms `carp_types::codegen::interface` emits for a native
/// response enum (§4.1 "For Interface"). A receiver picks its own variant simply by
/// constructing one, the same way returning `XResponse::Ok(...)` would in generated code.
#[derive(Clone, Debug, PartialEq)]
pub struct ResponseValue {
	pub variant: String,
	pub payload: serde_json::Value,
}

impl ResponseValue {
	pub fn new(variant: impl Into<String>, payload: serde_json::Value) -> Self {
		Self { variant: variant.into(), payload }
	}
}

/// The seam `ServerTranslator`/`ClientTranslator` invoke into: implemented by native
/// service receivers (wrapped in a `carp_routing::Receiver`) and by client-side proxies
/// alike, so both dispatch directions share one call surface.
///
/// `None` means a fire-and-forget call (no declared responses) completed; it is never
/// produced for a call that declares responses — `ServerTranslator` logs that case as
/// `DispatchError::ResponseMismatch` rather than silently dropping it (see `server.rs`).
pub trait Invocable: Send + Sync {
	fn invoke(&self, call: &str, args: serde_json::Value) -> BoxFuture<'_, Result<Option<ResponseValue>, DispatchError>>;
}

/// Dispatches fire-and-forget calls without making the caller wait (§5 "may dispatch
/// fire-and-forget calls to a bounded thread pool"). Failures are not surfaced to the
/// original caller; they are logged by whoever awaits the spawned future.
pub trait Executor: Send + Sync {
	fn spawn(&self, fut: BoxFuture<'static, ()>);
}

/// The default executor: hands fire-and-forget invocations to the ambient tokio runtime.
pub struct TokioExecutor;

impl Executor for TokioExecutor {
	fn spawn(&self, fut: BoxFuture<'static, ()>) {
		tokio::spawn(fut);
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicBool, Ordering};
	use std::sync::Arc;

	use super::*;

	#[tokio::test]
	async fn tokio_executor_runs_spawned_future() {
		let ran = Arc::new(AtomicBool::new(false));
		let ran_clone = ran.clone();
		TokioExecutor.spawn(Box::pin(async move {
			ran_clone.store(true, Ordering::SeqCst);
		}));
		tokio::task::yield_now().await;
		// give the spawned task a scheduling slot
		tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		assert!(ran.load(Ordering::SeqCst));
	}
}
