//! `carp`'s runtime binary: loads configuration and persisted type modules, builds a
//! `Presence`, and (when a bind address is configured) serves it over HTTP. The teacher's
//! own `agentgateway-app/src/main.rs` isn't in the retrieval pack this was built from, so
//! this binary is written independently against the same declared stack (`tokio`,
//! `tracing`/`tracing-subscriber`, `axum`, `clap`, `anyhow`) rather than adapted line for
//! line from a teacher source file; see DESIGN.md.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::Router;
use carp::{load_configured_modules, Presence, PresenceBuilder, PresenceConfig, RawConfig, Runtime};
use carp_core::Path as CarpPath;
use clap::Parser;
use tower_http::trace::TraceLayer;

#[derive(Parser, Debug)]
#[command(name = "carp", about = "Runs a CARP presence from a config file")]
struct Args {
	/// Path to a JSON config file matching `carp::config::RawConfig`. Defaults to an
	/// all-defaults config (client-only, no modules) when omitted.
	#[arg(long)]
	config: Option<PathBuf>,

	/// Overrides `bindAddr` from the config file, e.g. for ad hoc local runs.
	#[arg(long)]
	bind_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

	let args = Args::parse();
	let mut raw = match &args.config {
		Some(path) => {
			let text = std::fs::read_to_string(path).with_context(|| format!("reading config file {path:?}"))?;
			serde_json::from_str::<RawConfig>(&text).with_context(|| format!("parsing config file {path:?}"))?
		},
		None => RawConfig::default(),
	};
	if let Some(bind_addr) = args.bind_addr {
		raw.bind_addr = Some(bind_addr);
	}

	let config = raw.resolve().context("resolving configuration")?;
	let builder = PresenceBuilder::new();
	let runtime = Runtime::with_packrat_window(config.packrat_window);
	let presence_config = PresenceConfig::from_config(&config);
	let presence = builder.build(&presence_config, runtime).context("selecting a presence factory")?;
	load_configured_modules(&presence, &config).context("loading configured type modules")?;

	match config.bind_addr {
		Some(bind_addr) => serve(presence, bind_addr).await,
		None => {
			tracing::info!("no bindAddr configured; running client-only until interrupted");
			tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
			Ok(())
		},
	}
}

async fn serve(presence: Arc<Presence>, bind_addr: std::net::SocketAddr) -> anyhow::Result<()> {
	let app = Router::new()
		.route("/_carp/dump", axum::routing::get(dump))
		.fallback(dispatch)
		.with_state(presence)
		.layer(TraceLayer::new_for_http());
	let listener = tokio::net::TcpListener::bind(bind_addr).await.with_context(|| format!("binding {bind_addr}"))?;
	tracing::info!(%bind_addr, "serving presence");
	axum::serve(listener, app).await.context("serving http")?;
	Ok(())
}

async fn dispatch(State(presence): State<Arc<Presence>>, request: Request) -> axum::response::Response {
	let method = request.method().clone();
	let path = CarpPath::parse(request.uri().path());
	let body = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap_or_else(|_| Bytes::new());
	let payload: serde_json::Value = if body.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null) };

	let (status, resp) = presence.dispatch_http(&method, &path, payload).await;
	axum::response::IntoResponse::into_response((status, axum::Json(resp)))
}

#[derive(serde::Serialize)]
struct DumpRow {
	path: String,
	type_id: String,
	alive: bool,
}

/// Introspection endpoint over the routing table, modelled on `StoreUpdater::dump`.
async fn dump(State(presence): State<Arc<Presence>>) -> axum::Json<Vec<DumpRow>> {
	let rows = presence
		.path_map()
		.dump()
		.into_iter()
		.map(|e| DumpRow { path: e.path.to_string(), type_id: e.type_id.to_string(), alive: e.alive })
		.collect();
	axum::Json(rows)
}
