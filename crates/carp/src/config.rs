//! `RawConfig`/`Config` split (§6 "Configuration"), following the same shape the teacher
//! crate resolves its own `RawConfig` into `Config`: a mostly-`Option<T>` user-facing
//! surface that is validated and defaulted into a fully-resolved internal representation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URI: &str = "http://127.0.0.1:8080";
const DEFAULT_PACKRAT_WINDOW_SECS: u64 = 5;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
	#[error("invalid bind-addr {0:?}: {1}")]
	InvalidBindAddr(String, std::net::AddrParseError),
}

/// The user-facing config surface (e.g. loaded from a config file). Every field is
/// optional; [`RawConfig::resolve`] fills in defaults the same way the teacher's own
/// `RawConfig` → `Config` resolution does.
#[derive(Deserialize, Default, Clone, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
	/// Externally reachable base URI this presence advertises receivers under.
	pub base_uri: Option<String>,
	/// Address to bind the inbound HTTP server to, in `ip:port` form. Absent means this
	/// presence makes outbound calls only.
	pub bind_addr: Option<String>,
	/// Explicit flavour hint for [`crate::builder::PresenceFactory`] selection; `None`
	/// lets the builder infer one from `bind_addr`.
	pub role: Option<PresenceRole>,
	#[serde(default)]
	pub local_short_circuit: Option<bool>,
	/// Pack-rat retention window, in seconds (§9 "Pack-rat retention", default ~5s).
	pub packrat_window_secs: Option<u64>,
	/// Persisted type-module files (§6) to load and register at startup.
	#[serde(default)]
	pub modules: Vec<PathBuf>,
}

/// The fully-resolved, internally used configuration.
#[derive(Clone, Debug)]
pub struct Config {
	pub base_uri: String,
	pub bind_addr: Option<SocketAddr>,
	pub role: Option<PresenceRole>,
	pub local_short_circuit: bool,
	pub packrat_window: Duration,
	pub modules: Vec<PathBuf>,
}

impl RawConfig {
	pub fn resolve(self) -> Result<Config, ConfigError> {
		let bind_addr = self
			.bind_addr
			.map(|s| s.parse().map_err(|e| ConfigError::InvalidBindAddr(s.clone(), e)))
			.transpose()?;
		Ok(Config {
			base_uri: self.base_uri.unwrap_or_else(|| DEFAULT_BASE_URI.to_owned()),
			bind_addr,
			role: self.role,
			local_short_circuit: self.local_short_circuit.unwrap_or(true),
			packrat_window: Duration::from_secs(self.packrat_window_secs.unwrap_or(DEFAULT_PACKRAT_WINDOW_SECS)),
			modules: self.modules,
		})
	}
}

/// Which direction(s) a `Presence` should be built to serve (§4.5, §6): a hint for
/// [`crate::builder::PresenceFactory`] selection, mirroring the "client-only / server-only
/// / duplex" flavours the spec calls out.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceRole {
	ClientOnly,
	ServerOnly,
	Duplex,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolve_fills_in_defaults() {
		let raw = RawConfig::default();
		let cfg = raw.resolve().unwrap();
		assert_eq!(cfg.base_uri, DEFAULT_BASE_URI);
		assert_eq!(cfg.packrat_window, Duration::from_secs(5));
		assert!(cfg.local_short_circuit);
		assert!(cfg.bind_addr.is_none());
	}

	#[test]
	fn resolve_rejects_a_malformed_bind_addr() {
		let raw = RawConfig { bind_addr: Some("not-an-addr".to_owned()), ..Default::default() };
		assert!(raw.resolve().is_err());
	}

	#[test]
	fn resolve_parses_a_valid_bind_addr() {
		let raw = RawConfig { bind_addr: Some("127.0.0.1:9000".to_owned()), ..Default::default() };
		let cfg = raw.resolve().unwrap();
		assert_eq!(cfg.bind_addr, Some("127.0.0.1:9000".parse().unwrap()));
	}
}
