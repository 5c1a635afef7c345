use std::sync::Arc;

use carp_core::name::ExternalName;
use carp_types::codec::{Codec, DecodeContext, EncodeContext, Receiver};
use carp_types::nodes::Type;
use carp_types::TypeError;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::DispatchError;
use crate::invocable::{BoxFuture, Invocable, ResponseValue};
use crate::server::collect_calls;
use crate::wire::{RequestEnvelope, ResponseEnvelope};

struct CallShape {
	parameters: Codec,
	responses: IndexMap<String, Codec>,
}

/// The client-side mirror of `ServerTranslator`: encodes a call's arguments into a
/// request envelope, posts it to the object's base URI via `HttpClient`, and decodes
/// whichever response variant comes back (§4.4, §6).
pub struct ClientTranslator {
	base_uri: String,
	calls: IndexMap<String, CallShape>,
}

impl ClientTranslator {
	pub fn build(
		base_uri: impl Into<String>,
		iface: &Type,
		resolve_type: &dyn Fn(&ExternalName) -> Option<Type>,
		link: &dyn Fn(&ExternalName) -> Option<Codec>,
	) -> Result<Self, TypeError> {
		let mut flattened = IndexMap::new();
		collect_calls(iface, resolve_type, &mut flattened)?;

		let mut calls = IndexMap::new();
		for (call_name, call_type) in flattened {
			let Type::CallSpec { parameters, responses } = call_type else {
				continue;
			};
			let parameters_codec = Type::Structure { members: parameters }.get_codec(link)?;
			let mut response_codecs = IndexMap::new();
			for (variant, rsp) in responses {
				response_codecs.insert(variant, rsp.get_codec(link)?);
			}
			calls.insert(call_name, CallShape { parameters: parameters_codec, responses: response_codecs });
		}
		Ok(Self { base_uri: base_uri.into(), calls })
	}

	/// Issues one call over `http`. `None` is returned for a fire-and-forget call once the
	/// POST completes (the server answers 204 and there is nothing to decode).
	pub async fn call(
		&self,
		http: &dyn HttpClient,
		call_name: &str,
		args: &Value,
		encode_ctx: &mut dyn EncodeContext,
		decode_ctx: &mut dyn DecodeContext,
	) -> Result<Option<ResponseValue>, DispatchError> {
		let shape = self
			.calls
			.get(call_name)
			.ok_or_else(|| DispatchError::UnknownCall(call_name.to_owned()))?;

		let encoded_args = shape.parameters.encode(args, encode_ctx)?;
		let envelope = RequestEnvelope { prints: Vec::new(), req_type: call_name.to_owned(), req: encoded_args };

		let raw = http.post(&self.base_uri, &envelope).await?;
		let Some(raw) = raw else {
			if !shape.responses.is_empty() {
				return Err(DispatchError::ResponseMismatch(call_name.to_owned()));
			}
			return Ok(None);
		};

		let response: ResponseEnvelope = serde_json::from_value(raw)
			.map_err(|e| DispatchError::Transport(format!("malformed response envelope: {e}")))?;
		let Some(codec) = shape.responses.get(&response.rsp_type) else {
			return Err(DispatchError::ResponseMismatch(response.rsp_type));
		};
		let payload = codec.decode(&response.rsp, decode_ctx)?;
		Ok(Some(ResponseValue::new(response.rsp_type, payload)))
	}
}

/// Transport seam between `ClientTranslator` and the wire. `Ok(None)` means the server
/// answered 204 (fire-and-forget accepted); `Ok(Some(body))` is the decoded JSON response
/// envelope for status 200. Not `async_trait` — this workspace hand-rolls boxed futures
/// the same way `carp_routing::Receiver`'s callbacks do, so the trait stays object-safe.
pub trait HttpClient: Send + Sync {
	fn post<'a>(&'a self, base_uri: &'a str, envelope: &'a RequestEnvelope) -> BoxFuture<'a, Result<Option<Value>, DispatchError>>;
}

/// The production `HttpClient`: posts `{base_uri}` as-is (callers build the full
/// `{base}/{path}` URI themselves, per §6) and maps transport/HTTP failures into
/// `DispatchError::Transport`.
pub struct ReqwestHttpClient {
	client: reqwest::Client,
}

impl ReqwestHttpClient {
	pub fn new() -> Self {
		Self { client: reqwest::Client::new() }
	}

	pub fn with_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

impl Default for ReqwestHttpClient {
	fn default() -> Self {
		Self::new()
	}
}

impl HttpClient for ReqwestHttpClient {
	fn post<'a>(&'a self, base_uri: &'a str, envelope: &'a RequestEnvelope) -> BoxFuture<'a, Result<Option<Value>, DispatchError>> {
		Box::pin(async move {
			let resp = self
				.client
				.post(base_uri)
				.json(envelope)
				.send()
				.await
				.map_err(|e| DispatchError::Transport(e.to_string()))?;
			let status = resp.status();
			if status == reqwest::StatusCode::NO_CONTENT {
				return Ok(None);
			}
			if !status.is_success() {
				let body = resp.text().await.unwrap_or_default();
				return Err(DispatchError::Transport(format!("http {status}: {body}")));
			}
			let value: Value = resp.json().await.map_err(|e| DispatchError::Transport(e.to_string()))?;
			Ok(Some(value))
		})
	}
}

/// Bridges an `Interface` proxy to `Invocable` so a remote object can be invoked the same
/// way a local receiver is (§4.1). Uses a trivial codec context: valid for calls whose
/// parameters/responses carry no further object-typed fields. `Presence` bypasses this and
/// calls `ClientTranslator::call` directly with its own fingerprint-aware context whenever
/// an Interface-typed field needs real proxy/callback bridging.
pub struct RemoteProxy {
	translator: ClientTranslator,
	http: Arc<dyn HttpClient>,
}

impl RemoteProxy {
	pub fn new(translator: ClientTranslator, http: Arc<dyn HttpClient>) -> Self {
		Self { translator, http }
	}
}

impl Invocable for RemoteProxy {
	fn invoke(&self, call: &str, args: Value) -> BoxFuture<'_, Result<Option<ResponseValue>, DispatchError>> {
		let call = call.to_owned();
		Box::pin(async move {
			let mut encode_ctx = TrivialCodecContext;
			let mut decode_ctx = TrivialCodecContext;
			self.translator.call(self.http.as_ref(), &call, &args, &mut encode_ctx, &mut decode_ctx).await
		})
	}
}

struct TrivialCodecContext;
impl EncodeContext for TrivialCodecContext {
	fn establish_callback(&mut self, _type_id: &str, _receiver: Receiver) -> String {
		String::new()
	}
}
impl DecodeContext for TrivialCodecContext {
	fn resolve_proxy(&mut self, _type_id: &str, _uri: &str) -> Receiver {
		Arc::new(())
	}
}

#[cfg(test)]
mod tests {
	use carp_types::nodes::{Member, Members};

	use super::*;

	fn ping_interface() -> Type {
		let mut ok_params = Members::new();
		ok_params.insert("reply".to_owned(), Member { type_node: Box::new(Type::String { pattern: None }), required: true });
		let mut responses = IndexMap::new();
		responses.insert("ok".to_owned(), Type::ResponseSpec { parameters: ok_params });

		let mut params = Members::new();
		params.insert("message".to_owned(), Member { type_node: Box::new(Type::String { pattern: None }), required: true });
		let mut calls = IndexMap::new();
		calls.insert("ping".to_owned(), Type::CallSpec { parameters: params, responses });
		Type::Interface { ancestors: Vec::new(), calls }
	}

	struct StubHttp {
		response: Value,
	}

	impl HttpClient for StubHttp {
		fn post<'a>(&'a self, _base_uri: &'a str, envelope: &'a RequestEnvelope) -> BoxFuture<'a, Result<Option<Value>, DispatchError>> {
			assert_eq!(envelope.req_type, "ping");
			let response = self.response.clone();
			Box::pin(async move { Ok(Some(response)) })
		}
	}

	fn dummy_link(_: &ExternalName) -> Option<Codec> {
		None
	}
	fn no_ancestors(_: &ExternalName) -> Option<Type> {
		None
	}

	#[tokio::test]
	async fn decodes_the_response_variant_the_server_sent() {
		let translator = ClientTranslator::build("http://x/obj/1", &ping_interface(), &no_ancestors, &dummy_link).unwrap();
		let http = StubHttp { response: serde_json::json!({"rsp-type": "ok", "rsp": {"reply": "pong"}}) };
		let mut encode_ctx = TrivialCodecContext;
		let mut decode_ctx = TrivialCodecContext;
		let out = translator
			.call(&http, "ping", &serde_json::json!({"message": "hi"}), &mut encode_ctx, &mut decode_ctx)
			.await
			.unwrap()
			.unwrap();
		assert_eq!(out.variant, "ok");
		assert_eq!(out.payload, serde_json::json!({"reply": "pong"}));
	}

	#[tokio::test]
	async fn unknown_response_variant_is_a_mismatch() {
		let translator = ClientTranslator::build("http://x/obj/1", &ping_interface(), &no_ancestors, &dummy_link).unwrap();
		let http = StubHttp { response: serde_json::json!({"rsp-type": "weird", "rsp": {}}) };
		let mut encode_ctx = TrivialCodecContext;
		let mut decode_ctx = TrivialCodecContext;
		let err = translator
			.call(&http, "ping", &serde_json::json!({"message": "hi"}), &mut encode_ctx, &mut decode_ctx)
			.await
			.unwrap_err();
		assert!(matches!(err, DispatchError::ResponseMismatch(_)));
	}

	#[tokio::test]
	async fn unknown_call_name_is_rejected_before_any_http_request() {
		let translator = ClientTranslator::build("http://x/obj/1", &ping_interface(), &no_ancestors, &dummy_link).unwrap();
		struct PanicIfCalled;
		impl HttpClient for PanicIfCalled {
			fn post<'a>(&'a self, _: &'a str, _: &'a RequestEnvelope) -> BoxFuture<'a, Result<Option<Value>, DispatchError>> {
				Box::pin(async { panic!("must not reach the network") })
			}
		}
		let mut encode_ctx = TrivialCodecContext;
		let mut decode_ctx = TrivialCodecContext;
		let err = translator
			.call(&PanicIfCalled, "pong", &serde_json::json!({}), &mut encode_ctx, &mut decode_ctx)
			.await
			.unwrap_err();
		assert!(matches!(err, DispatchError::UnknownCall(name) if name == "pong"));
	}
}
