use std::collections::BTreeMap;

use http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

/// Error taxonomy for the server/client translators and `Presence` (§7 `DispatchUnknownCall`,
/// `DispatchResponseMismatch`, `ApplicationStructured`, `Internal`; `RoutingNotFound` is
/// handled by `Presence` directly since it never reaches a translator).
#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
	#[error("unknown call {0:?}")]
	UnknownCall(String),

	#[error("bad request: {0}")]
	BadRequest(String),

	#[error("no response variant {0:?} declared for this call")]
	ResponseMismatch(String),

	#[error("application error {app_error:?}: {message}")]
	Application {
		app_error: String,
		params: BTreeMap<String, String>,
		message: String,
	},

	#[error("transport error: {0}")]
	Transport(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl From<carp_types::TypeError> for DispatchError {
	fn from(e: carp_types::TypeError) -> Self {
		DispatchError::BadRequest(e.to_string())
	}
}

impl From<carp_routing::RoutingError> for DispatchError {
	fn from(e: carp_routing::RoutingError) -> Self {
		DispatchError::Internal(e.to_string())
	}
}

impl DispatchError {
	pub fn application(
		app_error: impl Into<String>,
		params: BTreeMap<String, String>,
		message: impl Into<String>,
	) -> Self {
		DispatchError::Application { app_error: app_error.into(), params, message: message.into() }
	}

	/// Maps a dispatch error to its wire status code and body (§6, §7). `Internal`-shaped
	/// failures mint a fresh id and log the real cause server-side; only the id crosses the
	/// wire.
	pub fn into_response(self) -> (StatusCode, Value) {
		match self {
			DispatchError::UnknownCall(name) => (
				StatusCode::BAD_REQUEST,
				json!({ "error": "unknown-call", "message": format!("unknown call {name:?}") }),
			),
			DispatchError::BadRequest(msg) => {
				(StatusCode::BAD_REQUEST, json!({ "error": "bad-request", "message": msg }))
			},
			DispatchError::Application { app_error, params, message } => (
				StatusCode::UNPROCESSABLE_ENTITY,
				json!({ "app-error": app_error, "params": params, "message": message }),
			),
			DispatchError::ResponseMismatch(call) => {
				let id = Uuid::new_v4();
				tracing::error!(error.id = %id, call = %call, "no response variant matched the receiver's return value");
				(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": id.to_string() }))
			},
			DispatchError::Transport(msg) => {
				let id = Uuid::new_v4();
				tracing::error!(error.id = %id, cause = %msg, "transport error");
				(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": id.to_string() }))
			},
			DispatchError::Internal(msg) => {
				let id = Uuid::new_v4();
				tracing::error!(error.id = %id, cause = %msg, "internal dispatch error");
				(StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": id.to_string() }))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn application_error_maps_to_422_with_app_error_shape() {
		let mut params = BTreeMap::new();
		params.insert("code".to_owned(), "bad".to_owned());
		let err = DispatchError::application("bad-status-mod", params, "no");
		let (status, body) = err.into_response();
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["app-error"], "bad-status-mod");
		assert_eq!(body["message"], "no");
	}

	#[test]
	fn internal_error_body_carries_only_an_id() {
		let (status, body) = DispatchError::Internal("db on fire".into()).into_response();
		assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
		let id = body["error"].as_str().unwrap();
		assert!(Uuid::parse_str(id).is_ok());
		assert!(!body.to_string().contains("fire"));
	}

	#[test]
	fn unknown_call_and_bad_request_map_to_400() {
		assert_eq!(DispatchError::UnknownCall("x".into()).into_response().0, StatusCode::BAD_REQUEST);
		assert_eq!(DispatchError::BadRequest("x".into()).into_response().0, StatusCode::BAD_REQUEST);
	}
}
