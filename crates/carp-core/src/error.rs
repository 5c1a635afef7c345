use std::collections::BTreeMap;

use uuid::Uuid;

/// The cross-cutting error taxonomy shared by every layer. Layer-local error enums
/// (`carp_types::TypeError`, `carp_routing::RoutingError`, `carp_rpc::DispatchError`)
/// convert into this via `From`; this is the type the wire-format status mapping in
/// `carp-rpc` switches on.
#[derive(thiserror::Error, Debug)]
pub enum Error {
	#[error("name resolution failed: {name:?} (at {source_site})")]
	NameResolution { name: String, source_site: String },

	#[error("type model error: {0}")]
	TypeModel(String),

	#[error("codec encoding error: {0}")]
	CodecEncoding(String),

	#[error("codec decoding error: {0}")]
	CodecDecoding(String),

	#[error("routing: path not found")]
	RoutingNotFound,

	#[error("dispatch: unknown call {0:?}")]
	DispatchUnknownCall(String),

	#[error("dispatch: response mismatch for call {0:?}")]
	DispatchResponseMismatch(String),

	#[error("application error {app_error:?}: {message}")]
	ApplicationStructured {
		app_error: String,
		params: BTreeMap<String, String>,
		message: String,
	},

	#[error("internal error {id}")]
	Internal { id: Uuid },
}

impl Error {
	/// Builds an `Internal` variant with a fresh id, and logs it server-side at `error!`
	/// with the full underlying cause — the id is all that crosses the wire (§7).
	pub fn internal(cause: impl std::fmt::Display) -> Self {
		let id = Uuid::new_v4();
		tracing::error!(error.id = %id, cause = %cause, "internal error");
		Error::Internal { id }
	}

	pub fn application(
		app_error: impl Into<String>,
		params: BTreeMap<String, String>,
		message: impl Into<String>,
	) -> Self {
		Error::ApplicationStructured {
			app_error: app_error.into(),
			params,
			message: message.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn internal_carries_only_an_id_on_display() {
		let err = Error::internal("database connection reset");
		let rendered = err.to_string();
		assert!(rendered.starts_with("internal error "));
		assert!(!rendered.contains("database"));
	}
}
