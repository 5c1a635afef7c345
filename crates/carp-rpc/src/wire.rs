use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the `prints` side-table exchanged alongside every request/response (§6):
/// an opaque fingerprint for a peer referenced by an object endpoint in this message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrintEntry {
	pub peer: String,
	pub print: String,
}

/// `POST {base}/{path}` request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestEnvelope {
	#[serde(default)]
	pub prints: Vec<PrintEntry>,
	#[serde(rename = "req-type")]
	pub req_type: String,
	pub req: Value,
}

/// Response body for a call with at least one declared response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope {
	#[serde(default)]
	pub prints: Vec<PrintEntry>,
	#[serde(rename = "rsp-type")]
	pub rsp_type: String,
	pub rsp: Value,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn request_envelope_round_trips_through_json() {
		let env = RequestEnvelope {
			prints: vec![PrintEntry { peer: "host:1234".into(), print: "abc".into() }],
			req_type: "deposit".into(),
			req: serde_json::json!({"amount": 10}),
		};
		let text = serde_json::to_string(&env).unwrap();
		assert!(text.contains("\"req-type\":\"deposit\""));
		let back: RequestEnvelope = serde_json::from_str(&text).unwrap();
		assert_eq!(back.req_type, "deposit");
		assert_eq!(back.prints[0].peer, "host:1234");
	}

	#[test]
	fn request_envelope_defaults_prints_when_absent() {
		let text = r#"{"req-type":"ping","req":{}}"#;
		let env: RequestEnvelope = serde_json::from_str(text).unwrap();
		assert!(env.prints.is_empty());
	}
}
