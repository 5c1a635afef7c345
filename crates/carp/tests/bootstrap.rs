//! End-to-end coverage of the public facade: resolving configuration, picking a presence
//! flavour, loading a persisted module, and dispatching a call through it. Mirrors the
//! teacher's `tests/tests/smoke.rs` shape (one `#[tokio::test]` per scenario, no shared
//! harness crate).

use std::io::Write;

use carp::config::RawConfig;
use carp::{bootstrap, BootstrapError, ExternalName, Path, PresenceBuilder};
use http::{Method, StatusCode};

fn write_bank_module(dir: &tempfile::TempDir) -> std::path::PathBuf {
	let mut params = carp_types::nodes::Members::new();
	params.insert(
		"amount".to_owned(),
		carp_types::nodes::Member { type_node: Box::new(carp_types::nodes::Type::Integer { min: Some(0), max: None }), required: true },
	);
	let mut responses = indexmap::IndexMap::new();
	responses.insert("ok".to_owned(), carp_types::nodes::Type::ResponseSpec { parameters: carp_types::nodes::Members::new() });
	let mut calls = indexmap::IndexMap::new();
	calls.insert("deposit".to_owned(), carp_types::nodes::Type::CallSpec { parameters: params, responses });
	let bank = carp_types::nodes::Type::Interface { ancestors: Vec::new(), calls };

	let mut types = indexmap::IndexMap::new();
	types.insert("bank".to_owned(), bank);
	let module = carp_types::nodes::Type::Module { imports: indexmap::IndexMap::new(), types };

	let mut props = carp_types::persist::PropertyMap::new();
	module.describe("", &mut props);

	let path = dir.path().join("acme.module");
	let mut f = std::fs::File::create(&path).unwrap();
	f.write_all(props.to_text().as_bytes()).unwrap();
	path
}

struct Deposit;
impl carp::Invocable for Deposit {
	fn invoke(
		&self,
		call: &str,
		_args: serde_json::Value,
	) -> carp_rpc::BoxFuture<'_, Result<Option<carp_rpc::ResponseValue>, carp::DispatchError>> {
		assert_eq!(call, "deposit");
		Box::pin(async move { Ok(Some(carp_rpc::ResponseValue::new("ok", serde_json::json!({})))) })
	}
}

#[tokio::test]
async fn bootstrap_resolves_config_builds_a_presence_and_loads_a_module() {
	let dir = tempfile::tempdir().unwrap();
	let module_path = write_bank_module(&dir);

	let raw = RawConfig { modules: vec![module_path], ..Default::default() };
	let builder = PresenceBuilder::new();
	let presence = bootstrap(raw, &builder).unwrap();

	presence.bind(Path::parse("/bank-1"), ExternalName::parse("acme.bank").unwrap(), std::sync::Arc::new(Deposit));

	let body = serde_json::json!({"req-type": "deposit", "req": {"amount": 10}});
	let (status, resp) = presence.dispatch_http(&Method::POST, &Path::parse("/bank-1"), body).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(resp["rsp-type"], "ok");
}

#[tokio::test]
async fn bootstrap_surfaces_a_malformed_bind_addr_as_a_config_error() {
	let raw = RawConfig { bind_addr: Some("definitely-not-an-addr".to_owned()), ..Default::default() };
	let builder = PresenceBuilder::new();
	let err = bootstrap(raw, &builder).unwrap_err();
	assert!(matches!(err, BootstrapError::Config(_)));
}

#[tokio::test]
async fn bootstrap_surfaces_server_only_without_bind_addr_as_a_build_error() {
	let raw = RawConfig { role: Some(carp::PresenceRole::ServerOnly), ..Default::default() };
	let builder = PresenceBuilder::new();
	let err = bootstrap(raw, &builder).unwrap_err();
	assert!(matches!(err, BootstrapError::Build(_)));
}
