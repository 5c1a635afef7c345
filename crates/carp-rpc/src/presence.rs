use std::collections::HashMap;
use std::sync::Arc;

use carp_core::name::ExternalName;
use carp_core::path::Path;
use carp_routing::{PathMap, Runtime, TrackedReceiver};
use carp_types::codec::{Codec, DecodeContext, EncodeContext, Receiver as CodecReceiver};
use carp_types::nodes::Type;
use carp_types::TypeError;
use http::{Method, StatusCode};
use parking_lot::Mutex;
use serde_json::Value;

use crate::client::{ClientTranslator, HttpClient, ReqwestHttpClient};
use crate::error::DispatchError;
use crate::fingerprint::{FingerprintRepository, InMemoryFingerprints};
use crate::invocable::{Executor, Invocable, TokioExecutor};
use crate::server::ServerTranslator;
use crate::wire::RequestEnvelope;

/// A named type: its node (needed to resolve `Reference`s and relink codecs) plus, for an
/// `Interface` node, the cached `ServerTranslator` built from it. Non-interface types
/// (structures, enumerations, ...) that are only reachable as field types have `server:
/// None` — they never receive inbound calls, so there is nothing to flatten.
struct RegisteredType {
	node: Type,
	server: Option<Arc<ServerTranslator>>,
}

/// The orchestration facade (§5 "Presence"): owns the routing runtime, the type registry
/// needed to build/link translators, and the collaborators (`HttpClient`, `Executor`,
/// `FingerprintRepository`) that bridge `carp-routing`'s transport-agnostic object graph to
/// an actual JSON-over-HTTP wire.
///
/// A local receiver is bound into `path_map` as a `TrackedReceiver` wrapping an owned
/// `Arc<dyn Invocable>` — recovering it is a single `downcast_ref::<Arc<dyn Invocable>>`,
/// which sidesteps needing `carp-routing` to know anything about `Invocable` at all.
pub struct Presence {
	base_uri: String,
	local_short_circuit: bool,
	runtime: Arc<Runtime>,
	path_map: Arc<PathMap>,
	http: Arc<dyn HttpClient>,
	fingerprints: Arc<dyn FingerprintRepository>,
	executor: Arc<dyn Executor>,
	types: Mutex<HashMap<ExternalName, RegisteredType>>,
}

impl Presence {
	pub fn new(base_uri: impl Into<String>) -> Arc<Self> {
		Self::with_collaborators(
			base_uri,
			true,
			Runtime::new(),
			Arc::new(ReqwestHttpClient::new()),
			Arc::new(InMemoryFingerprints::new()),
			Arc::new(TokioExecutor),
		)
	}

	pub fn with_collaborators(
		base_uri: impl Into<String>,
		local_short_circuit: bool,
		runtime: Arc<Runtime>,
		http: Arc<dyn HttpClient>,
		fingerprints: Arc<dyn FingerprintRepository>,
		executor: Arc<dyn Executor>,
	) -> Arc<Self> {
		Arc::new(Self {
			base_uri: base_uri.into(),
			local_short_circuit,
			path_map: Arc::new(PathMap::new(runtime.clone())),
			runtime,
			http,
			fingerprints,
			executor,
			types: Mutex::new(HashMap::new()),
		})
	}

	pub fn path_map(&self) -> &Arc<PathMap> {
		&self.path_map
	}

	pub fn runtime(&self) -> &Arc<Runtime> {
		&self.runtime
	}

	/// Registers a named type node, so it can be resolved as a `Reference` target and (for
	/// an `Interface` node) dispatched into. Must be called, for every type a call/response
	/// can reach, before any `bind`/`expose` that names it and before any codec resolves a
	/// `Reference` to it.
	///
	/// For an `Interface` node this eagerly flattens ancestors into a `ServerTranslator`, so
	/// later binds never pay the ancestor-walk cost. Other node kinds (structures,
	/// enumerations, ...) are stored for reference resolution only — they have no call
	/// dispatch table of their own.
	pub fn register_type(&self, type_id: ExternalName, node: Type) -> Result<(), TypeError> {
		let server = match &node {
			Type::Interface { .. } => {
				Some(Arc::new(ServerTranslator::build(type_id.clone(), &node, &self.resolve_type_fn(), &self.link_fn())?))
			},
			_ => None,
		};
		self.types.lock().insert(type_id, RegisteredType { node, server });
		Ok(())
	}

	fn resolve_type_fn(&self) -> impl Fn(&ExternalName) -> Option<Type> + '_ {
		move |name| self.types.lock().get(name).map(|r| r.node.clone())
	}

	fn link_fn(&self) -> impl Fn(&ExternalName) -> Option<Codec> + '_ {
		move |name| {
			let guard = self.types.lock();
			let registered = guard.get(name)?;
			registered.node.get_codec(&|n| guard.get(n).and_then(|r| r.node.get_codec(&|_| None).ok())).ok()
		}
	}

	/// Publishes a local receiver at `path` under `type_id` (§4.3 `bind`). `type_id` must
	/// already be registered via [`Presence::register_type`].
	pub fn bind(&self, path: Path, type_id: ExternalName, receiver: Arc<dyn Invocable>) {
		let tracked = TrackedReceiver::new(receiver);
		self.path_map.bind(path, type_id, tracked, None);
	}

	pub fn unbind(&self, path: &Path) {
		self.path_map.unbind_path(path);
	}

	/// Exposes `receiver` anonymously and returns its externally callable URI (§4.3
	/// `recognize`), for handing a local object out by reference in a response.
	pub fn expose(&self, type_id: ExternalName, receiver: Arc<dyn Invocable>) -> String {
		let tracked = TrackedReceiver::new(receiver);
		let path = self.path_map.recognize(&type_id, &tracked);
		format!("{}{}", self.base_uri, path)
	}

	/// Obtains a native handle for `uri` under `type_id` (§4.5 `elaborate`, §8 scenario 5
	/// "short-circuit"): when `local_short_circuit` is enabled and `uri` names a receiver
	/// bound locally under this very `Presence`, the bound receiver is returned directly
	/// (identity-equal to whatever was passed to `bind`/`expose`) rather than wrapped in a
	/// `RemoteProxy` that would loop a call back through HTTP to reach itself.
	pub fn elaborate(&self, type_id: &ExternalName, uri: &str) -> Result<Arc<dyn Invocable>, DispatchError> {
		if self.local_short_circuit {
			if let Some(local) = self.short_circuit(type_id, uri) {
				return Ok(local);
			}
		}
		let node = self
			.types
			.lock()
			.get(type_id)
			.map(|r| r.node.clone())
			.ok_or_else(|| DispatchError::Internal(format!("no type registered for {type_id}")))?;
		let translator = ClientTranslator::build(uri.to_owned(), &node, &self.resolve_type_fn(), &self.link_fn())?;
		Ok(Arc::new(crate::client::RemoteProxy::new(translator, self.http.clone())))
	}

	/// Returns the locally bound receiver for `uri` if it is under `base_uri`, resolves
	/// through the path map to a live, fully-consumed match, and is actually registered
	/// under `type_id`; `None` otherwise, meaning the caller should build a proxy instead.
	fn short_circuit(&self, type_id: &ExternalName, uri: &str) -> Option<Arc<dyn Invocable>> {
		let rest = uri.strip_prefix(&self.base_uri)?;
		let path = Path::parse(rest);
		let matched = self.path_map.resolve(&path).ok()??;
		if !matched.tail.is_root() || matched.type_id != *type_id {
			return None;
		}
		matched.receiver.downcast_ref::<Arc<dyn Invocable>>().cloned()
	}

	fn server_for(&self, type_id: &ExternalName) -> Option<Arc<ServerTranslator>> {
		self.types.lock().get(type_id).and_then(|r| r.server.clone())
	}

	/// The HTTP entrypoint: `POST {base}/{path}` dispatches a call; anything else is `501`
	/// (§9 Open Question: unknown method). A routing miss or an unconsumed path tail is
	/// `404`; malformed envelopes and application failures fall through to
	/// `DispatchError::into_response` (§6, §7).
	pub async fn dispatch_http(&self, method: &Method, path: &Path, body: Value) -> (StatusCode, Value) {
		if method != Method::POST {
			return (
				StatusCode::NOT_IMPLEMENTED,
				serde_json::json!({ "error": "method-not-implemented", "message": format!("{method} is not supported") }),
			);
		}

		let matched = match self.path_map.resolve(path) {
			Ok(Some(m)) => m,
			Ok(None) => return not_found("no receiver bound at this path"),
			Err(e) => return DispatchError::from(e).into_response(),
		};
		if !matched.tail.is_root() {
			return not_found(&format!("unconsumed path tail {}", matched.tail));
		}

		let Some(invocable) = matched.receiver.downcast_ref::<Arc<dyn Invocable>>().cloned() else {
			return DispatchError::Internal("bound receiver is not an Invocable".into()).into_response();
		};
		let Some(server) = self.server_for(&matched.type_id) else {
			return DispatchError::Internal(format!("no translator registered for {}", matched.type_id)).into_response();
		};

		let envelope: RequestEnvelope = match serde_json::from_value(body) {
			Ok(e) => e,
			Err(e) => return DispatchError::BadRequest(format!("malformed request envelope: {e}")).into_response(),
		};
		for entry in &envelope.prints {
			self.fingerprints.observe(&entry.peer, &entry.print);
		}

		let mut decode_ctx = PresenceCodecContext { presence: self };
		let mut encode_ctx = PresenceCodecContext { presence: self };
		match server.invoke(invocable, self.executor.as_ref(), envelope, &mut decode_ctx, &mut encode_ctx).await {
			Ok(None) => (StatusCode::NO_CONTENT, Value::Null),
			Ok(Some(response)) => (StatusCode::OK, serde_json::to_value(response).unwrap_or(Value::Null)),
			Err(e) => e.into_response(),
		}
	}

	/// Calls a (possibly remote) interface by URI, building a fresh `ClientTranslator` per
	/// call — callers that invoke the same object repeatedly should cache one themselves.
	pub async fn call(&self, type_id: &ExternalName, uri: &str, call_name: &str, args: &Value) -> Result<Option<Value>, DispatchError> {
		let node = self
			.types
			.lock()
			.get(type_id)
			.map(|r| r.node.clone())
			.ok_or_else(|| DispatchError::Internal(format!("no type registered for {type_id}")))?;
		let translator = ClientTranslator::build(uri.to_owned(), &node, &self.resolve_type_fn(), &self.link_fn())?;
		let mut encode_ctx = PresenceCodecContext { presence: self };
		let mut decode_ctx = PresenceCodecContext { presence: self };
		let outcome = translator.call(self.http.as_ref(), call_name, args, &mut encode_ctx, &mut decode_ctx).await?;
		Ok(outcome.map(|o| o.payload))
	}
}

fn not_found(message: &str) -> (StatusCode, Value) {
	(StatusCode::NOT_FOUND, serde_json::json!({ "error": "not-found", "message": message }))
}

/// `EncodeContext`/`DecodeContext` implementation bridging `carp_types::codec`'s opaque
/// `Receiver = Arc<dyn Any + Send + Sync>` to routing's `TrackedReceiver`: encoding
/// publishes a local receiver anonymously and hands back its URI; decoding builds a
/// `RemoteProxy` wrapped the same way a local receiver would be, so both sides of an
/// `Interface`-typed field look identical to whatever dereferences them next.
struct PresenceCodecContext<'a> {
	presence: &'a Presence,
}

impl EncodeContext for PresenceCodecContext<'_> {
	fn establish_callback(&mut self, type_id: &str, receiver: CodecReceiver) -> String {
		let Ok(tracked) = receiver.downcast::<TrackedReceiver>() else {
			tracing::error!(type_id, "establish_callback received a non-TrackedReceiver handle");
			return String::new();
		};
		let Ok(type_id) = ExternalName::parse(type_id) else {
			tracing::error!(type_id, "establish_callback received a malformed type id");
			return String::new();
		};
		let path = self.presence.path_map.recognize(&type_id, &tracked);
		format!("{}{}", self.presence.base_uri, path)
	}
}

impl DecodeContext for PresenceCodecContext<'_> {
	fn resolve_proxy(&mut self, type_id: &str, uri: &str) -> CodecReceiver {
		let proxy: Arc<dyn Invocable> = match ExternalName::parse(type_id) {
			Ok(name) => match self.presence.types.lock().get(&name).map(|r| r.node.clone()) {
				Some(node) => match ClientTranslator::build(uri.to_owned(), &node, &self.presence.resolve_type_fn(), &self.presence.link_fn()) {
					Ok(translator) => Arc::new(crate::client::RemoteProxy::new(translator, self.presence.http.clone())),
					Err(e) => {
						tracing::error!(type_id, uri, error = %e, "failed to build a proxy translator");
						Arc::new(UnreachableProxy)
					},
				},
				None => {
					tracing::error!(type_id, uri, "resolve_proxy for an unregistered type");
					Arc::new(UnreachableProxy)
				},
			},
			Err(_) => Arc::new(UnreachableProxy),
		};
		TrackedReceiver::new(proxy)
	}
}

/// Stands in for a proxy that failed to build; any call against it reports `Internal`
/// rather than panicking, since a malformed decode shouldn't crash the process.
struct UnreachableProxy;
impl Invocable for UnreachableProxy {
	fn invoke(&self, _call: &str, _args: Value) -> crate::invocable::BoxFuture<'_, Result<Option<crate::invocable::ResponseValue>, DispatchError>> {
		Box::pin(async { Err(DispatchError::Internal("proxy was never resolved".into())) })
	}
}

#[cfg(test)]
mod tests {
	use carp_types::nodes::{Member, Members};
	use indexmap::IndexMap;

	use super::*;

	fn echo_interface() -> Type {
		let mut ok_params = Members::new();
		ok_params.insert("text".to_owned(), Member { type_node: Box::new(Type::String { pattern: None }), required: true });
		let mut responses = IndexMap::new();
		responses.insert("ok".to_owned(), Type::ResponseSpec { parameters: ok_params });

		let mut params = Members::new();
		params.insert("text".to_owned(), Member { type_node: Box::new(Type::String { pattern: None }), required: true });
		let mut calls = IndexMap::new();
		calls.insert("echo".to_owned(), Type::CallSpec { parameters: params, responses });
		Type::Interface { ancestors: Vec::new(), calls }
	}

	struct Echo;
	impl Invocable for Echo {
		fn invoke(&self, call: &str, args: Value) -> crate::invocable::BoxFuture<'_, Result<Option<crate::invocable::ResponseValue>, DispatchError>> {
			assert_eq!(call, "echo");
			Box::pin(async move { Ok(Some(crate::invocable::ResponseValue::new("ok", args))) })
		}
	}

	#[tokio::test]
	async fn dispatch_http_round_trips_a_call() {
		let presence = Presence::new("http://local");
		presence.register_type(ExternalName::single("echo"), echo_interface()).unwrap();
		presence.bind(Path::parse("/echo-1"), ExternalName::single("echo"), Arc::new(Echo));

		let body = serde_json::json!({"req-type": "echo", "req": {"text": "hi"}});
		let (status, resp) = presence.dispatch_http(&Method::POST, &Path::parse("/echo-1"), body).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(resp["rsp-type"], "ok");
		assert_eq!(resp["rsp"]["text"], "hi");
	}

	#[tokio::test]
	async fn dispatch_http_rejects_non_post_with_501() {
		let presence = Presence::new("http://local");
		let (status, _) = presence.dispatch_http(&Method::GET, &Path::parse("/echo-1"), Value::Null).await;
		assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
	}

	#[tokio::test]
	async fn dispatch_http_reports_404_for_unbound_path() {
		let presence = Presence::new("http://local");
		let (status, _) = presence.dispatch_http(&Method::POST, &Path::parse("/nowhere"), Value::Null).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn expose_returns_a_resolvable_uri() {
		let presence = Presence::new("http://local");
		presence.register_type(ExternalName::single("echo"), echo_interface()).unwrap();
		let uri = presence.expose(ExternalName::single("echo"), Arc::new(Echo));
		assert!(uri.starts_with("http://local/anon/"));
	}

	#[test]
	fn elaborate_short_circuits_to_the_identical_local_receiver() {
		let presence = Presence::with_collaborators(
			"http://local",
			true,
			Runtime::new(),
			Arc::new(ReqwestHttpClient::new()),
			Arc::new(InMemoryFingerprints::new()),
			Arc::new(TokioExecutor),
		);
		let type_id = ExternalName::single("echo");
		presence.register_type(type_id.clone(), echo_interface()).unwrap();
		let receiver: Arc<dyn Invocable> = Arc::new(Echo);
		presence.bind(Path::parse("/echo-1"), type_id.clone(), receiver.clone());

		let elaborated = presence.elaborate(&type_id, "http://local/echo-1").unwrap();
		assert!(Arc::ptr_eq(&elaborated, &receiver));
	}

	#[test]
	fn elaborate_without_short_circuit_builds_a_proxy_instead() {
		let presence = Presence::with_collaborators(
			"http://local",
			false,
			Runtime::new(),
			Arc::new(ReqwestHttpClient::new()),
			Arc::new(InMemoryFingerprints::new()),
			Arc::new(TokioExecutor),
		);
		let type_id = ExternalName::single("echo");
		presence.register_type(type_id.clone(), echo_interface()).unwrap();
		let receiver: Arc<dyn Invocable> = Arc::new(Echo);
		presence.bind(Path::parse("/echo-1"), type_id.clone(), receiver.clone());

		let elaborated = presence.elaborate(&type_id, "http://local/echo-1").unwrap();
		assert!(!Arc::ptr_eq(&elaborated, &receiver));
	}

	#[test]
	fn elaborate_ignores_short_circuit_for_a_uri_outside_base_uri() {
		let presence = Presence::new("http://local");
		let type_id = ExternalName::single("echo");
		presence.register_type(type_id.clone(), echo_interface()).unwrap();
		let receiver: Arc<dyn Invocable> = Arc::new(Echo);
		presence.bind(Path::parse("/echo-1"), type_id.clone(), receiver.clone());

		let elaborated = presence.elaborate(&type_id, "http://remote/echo-1").unwrap();
		assert!(!Arc::ptr_eq(&elaborated, &receiver));
	}
}
