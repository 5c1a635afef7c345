use std::sync::Arc;

use carp_core::name::ExternalName;
use carp_types::codec::{Codec, DecodeContext, EncodeContext};
use carp_types::nodes::Type;
use carp_types::TypeError;
use indexmap::IndexMap;

use crate::error::DispatchError;
use crate::invocable::{Executor, Invocable};
use crate::wire::{RequestEnvelope, ResponseEnvelope};

struct CallHandler {
	parameters: Codec,
	/// Empty exactly for fire-and-forget calls.
	responses: IndexMap<String, Codec>,
}

/// Per-interface-type dispatch table (§4.4): decodes a JSON request into arguments,
/// invokes the receiver, selects the matching response variant, and encodes the result.
pub struct ServerTranslator {
	type_id: ExternalName,
	calls: IndexMap<String, CallHandler>,
}

impl ServerTranslator {
	pub fn type_id(&self) -> &ExternalName {
		&self.type_id
	}

	/// Builds a translator from an `Interface` type node, flattening ancestor calls first
	/// so a call redeclared by `iface` itself takes precedence (§3 Interface "ancestors").
	/// `resolve_type` looks up a fully qualified name's `Type` (to walk ancestor chains);
	/// `link` resolves a fully qualified name to its `Codec` (for parameter/response
	/// members that are themselves references).
	pub fn build(
		type_id: ExternalName,
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
			calls.insert(call_name, CallHandler { parameters: parameters_codec, responses: response_codecs });
		}
		Ok(Self { type_id, calls })
	}

	/// Dispatches one inbound call. `Ok(None)` means the call was fire-and-forget and has
	/// already been handed to `executor`; the HTTP layer should answer 204. `receiver` is
	/// taken by `Arc` (rather than `&dyn Invocable`) so a fire-and-forget dispatch can move
	/// its own handle into the spawned `'static` future.
	pub async fn invoke(
		&self,
		receiver: Arc<dyn Invocable>,
		executor: &dyn Executor,
		envelope: RequestEnvelope,
		decode_ctx: &mut dyn DecodeContext,
		encode_ctx: &mut dyn EncodeContext,
	) -> Result<Option<ResponseEnvelope>, DispatchError> {
		let handler = self
			.calls
			.get(&envelope.req_type)
			.ok_or_else(|| DispatchError::UnknownCall(envelope.req_type.clone()))?;

		let args = handler.parameters.decode(&envelope.req, decode_ctx)?;

		if handler.responses.is_empty() {
			let call_name = envelope.req_type.clone();
			executor.spawn(Box::pin(async move {
				if let Err(err) = receiver.invoke(&call_name, args).await {
					tracing::warn!(call = %call_name, error = %err, "fire-and-forget call failed");
				}
			}));
			return Ok(None);
		}

		let Some(outcome) = receiver.invoke(&envelope.req_type, args).await? else {
			return Err(DispatchError::ResponseMismatch(envelope.req_type));
		};

		let Some(response_codec) = handler.responses.get(&outcome.variant) else {
			return Err(DispatchError::ResponseMismatch(outcome.variant));
		};
		let encoded = response_codec.encode(&outcome.payload, encode_ctx)?;
		Ok(Some(ResponseEnvelope { prints: Vec::new(), rsp_type: outcome.variant, rsp: encoded }))
	}
}

/// Walks ancestors depth-first, inserting ancestor calls before the interface's own
/// (later inserts of the same key win, matching override semantics). Shared with
/// `ClientTranslator::build`, which flattens ancestors the same way.
pub(crate) fn collect_calls(
	iface: &Type,
	resolve_type: &dyn Fn(&ExternalName) -> Option<Type>,
	out: &mut IndexMap<String, Type>,
) -> Result<(), TypeError> {
	let Type::Interface { ancestors, calls } = iface else {
		return Err(TypeError::NotNative("expected an Interface type node".into()));
	};
	for ancestor in ancestors {
		let parent = resolve_type(&ancestor.name).ok_or_else(|| TypeError::UnresolvedReference {
			name: ancestor.name.to_string(),
			source_site: ancestor.source_site.to_string(),
		})?;
		collect_calls(&parent, resolve_type, out)?;
	}
	for (name, call) in calls {
		out.insert(name.clone(), call.clone());
	}
	Ok(())
}
