//! Builds a [`carp_rpc::Presence`] from a resolved [`Config`], choosing one of three
//! presence flavours (client-only, server-only, duplex) via a pluggable, ranked factory
//! (§6 "Builder produces one of three presence flavours ... chosen by a pluggable factory
//! ranked OKAY > SUBOPTIMAL > OVERKILL > UNMET"). The ranked-selection idiom mirrors the
//! teacher's enum-based policy composition (`BackendPolicies`/`LLMRequestPolicies` in
//! `store/binds.rs`), adapted here from a merge-by-precedence to a select-by-fitness rule
//! since the spec calls for choosing *one* factory rather than merging several.

use std::sync::Arc;

use carp_rpc::{Executor, FingerprintRepository, HttpClient, Presence};
use carp_routing::Runtime;

use crate::config::{Config, PresenceRole};

/// How well a [`PresenceFactory`] fits a [`PresenceConfig`]. Ordered so the derived `Ord`
/// matches the spec's literal ranking, `OKAY > SUBOPTIMAL > OVERKILL > UNMET`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Fitness {
	Unmet,
	Overkill,
	Suboptimal,
	Okay,
}

/// The collaborator bag a [`PresenceFactory`] builds a `Presence` from, mirroring §6's
/// `{clients, placement, fingerprints, asynchronous-executor, local-short-circuit}` bag.
pub struct PresenceConfig {
	pub base_uri: String,
	pub bind_addr: Option<std::net::SocketAddr>,
	pub role: Option<PresenceRole>,
	pub local_short_circuit: bool,
	pub http: Option<Arc<dyn HttpClient>>,
	pub fingerprints: Option<Arc<dyn FingerprintRepository>>,
	pub executor: Option<Arc<dyn Executor>>,
}

impl PresenceConfig {
	pub fn from_config(config: &Config) -> Self {
		Self {
			base_uri: config.base_uri.clone(),
			bind_addr: config.bind_addr,
			role: config.role,
			local_short_circuit: config.local_short_circuit,
			http: None,
			fingerprints: None,
			executor: None,
		}
	}
}

/// A pluggable way of building a `Presence`, ranked by how well it fits a given
/// [`PresenceConfig`] (§6). `carp` registers the three built-in flavours; callers can
/// register their own (e.g. a factory that insists on a caller-supplied `HttpClient`).
pub trait PresenceFactory: Send + Sync {
	fn name(&self) -> &'static str;
	fn fitness(&self, config: &PresenceConfig) -> Fitness;
	fn build(&self, config: &PresenceConfig, runtime: Arc<Runtime>) -> Arc<Presence>;
}

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
	#[error("no presence factory is registered")]
	NoFactories,
	#[error("no registered presence factory's requirements are met by this configuration")]
	UnmetRequirements,
}

/// Picks and invokes the best-fitting registered [`PresenceFactory`] for a configuration.
pub struct PresenceBuilder {
	factories: Vec<Arc<dyn PresenceFactory>>,
}

impl Default for PresenceBuilder {
	fn default() -> Self {
		Self {
			factories: vec![Arc::new(ClientOnlyFactory), Arc::new(ServerOnlyFactory), Arc::new(DuplexFactory)],
		}
	}
}

impl PresenceBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an additional factory, considered alongside the three built-in flavours.
	/// Ties (equal top fitness) favour whichever was registered last.
	pub fn register(&mut self, factory: Arc<dyn PresenceFactory>) -> &mut Self {
		self.factories.push(factory);
		self
	}

	pub fn build(&self, config: &PresenceConfig, runtime: Arc<Runtime>) -> Result<Arc<Presence>, BuildError> {
		let best = self
			.factories
			.iter()
			.max_by_key(|f| f.fitness(config))
			.ok_or(BuildError::NoFactories)?;
		if best.fitness(config) == Fitness::Unmet {
			return Err(BuildError::UnmetRequirements);
		}
		tracing::debug!(factory = best.name(), "selected presence factory");
		Ok(best.build(config, runtime))
	}
}

fn assemble(config: &PresenceConfig, runtime: Arc<Runtime>) -> Arc<Presence> {
	let http = config.http.clone().unwrap_or_else(|| Arc::new(carp_rpc::ReqwestHttpClient::new()));
	let fingerprints = config
		.fingerprints
		.clone()
		.unwrap_or_else(|| Arc::new(carp_rpc::InMemoryFingerprints::new()));
	let executor = config.executor.clone().unwrap_or_else(|| Arc::new(carp_rpc::TokioExecutor));
	Presence::with_collaborators(config.base_uri.clone(), config.local_short_circuit, runtime, http, fingerprints, executor)
}

/// Fits a config that only makes outbound calls: no `bind_addr`, so there is nothing to
/// serve inbound HTTP requests on (the resulting `Presence` can still `bind`/`expose`
/// in-process receivers; it just never gets an HTTP server mounted in front of it).
struct ClientOnlyFactory;
impl PresenceFactory for ClientOnlyFactory {
	fn name(&self) -> &'static str {
		"client-only"
	}
	fn fitness(&self, config: &PresenceConfig) -> Fitness {
		match config.role {
			Some(PresenceRole::ClientOnly) => Fitness::Okay,
			Some(_) => Fitness::Unmet,
			None if config.bind_addr.is_none() => Fitness::Okay,
			None => Fitness::Suboptimal,
		}
	}
	fn build(&self, config: &PresenceConfig, runtime: Arc<Runtime>) -> Arc<Presence> {
		assemble(config, runtime)
	}
}

/// Fits a config that wants to serve inbound calls at `bind_addr` and has no independent
/// need to call out (outbound calls are still possible through `Presence::call`; this
/// factory simply is not preferred when the caller hasn't asked to receive any).
struct ServerOnlyFactory;
impl PresenceFactory for ServerOnlyFactory {
	fn name(&self) -> &'static str {
		"server-only"
	}
	fn fitness(&self, config: &PresenceConfig) -> Fitness {
		match config.role {
			Some(PresenceRole::ServerOnly) if config.bind_addr.is_some() => Fitness::Okay,
			Some(PresenceRole::ServerOnly) => Fitness::Unmet,
			Some(_) => Fitness::Unmet,
			None if config.bind_addr.is_some() => Fitness::Suboptimal,
			None => Fitness::Unmet,
		}
	}
	fn build(&self, config: &PresenceConfig, runtime: Arc<Runtime>) -> Arc<Presence> {
		assemble(config, runtime)
	}
}

/// Fits a config that wants both directions. Functionally identical to the other two
/// (`Presence` itself doesn't distinguish flavours — the flavour only gates which HTTP
/// server the surrounding application mounts), so an explicit `Duplex` role is required
/// for `Okay`; otherwise this factory is `Overkill` relative to a narrower one that also
/// fits, since it provisions collaborators for a direction the config didn't ask for.
struct DuplexFactory;
impl PresenceFactory for DuplexFactory {
	fn name(&self) -> &'static str {
		"duplex"
	}
	fn fitness(&self, config: &PresenceConfig) -> Fitness {
		match config.role {
			Some(PresenceRole::Duplex) if config.bind_addr.is_some() => Fitness::Okay,
			Some(PresenceRole::Duplex) => Fitness::Unmet,
			Some(_) => Fitness::Overkill,
			None if config.bind_addr.is_some() => Fitness::Suboptimal,
			None => Fitness::Overkill,
		}
	}
	fn build(&self, config: &PresenceConfig, runtime: Arc<Runtime>) -> Arc<Presence> {
		assemble(config, runtime)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(role: Option<PresenceRole>, bind_addr: Option<&str>) -> PresenceConfig {
		PresenceConfig {
			base_uri: "http://local".to_owned(),
			bind_addr: bind_addr.map(|a| a.parse().unwrap()),
			role,
			local_short_circuit: true,
			http: None,
			fingerprints: None,
			executor: None,
		}
	}

	#[test]
	fn picks_client_only_with_no_bind_addr_and_no_role_hint() {
		let builder = PresenceBuilder::new();
		let runtime = Runtime::new();
		let cfg = config(None, None);
		assert!(builder.build(&cfg, runtime).is_ok());
	}

	#[test]
	fn server_only_role_without_a_bind_addr_is_unmet() {
		let builder = PresenceBuilder::new();
		let runtime = Runtime::new();
		let cfg = config(Some(PresenceRole::ServerOnly), None);
		assert!(matches!(builder.build(&cfg, runtime), Err(BuildError::UnmetRequirements)));
	}

	#[test]
	fn duplex_role_with_a_bind_addr_builds() {
		let builder = PresenceBuilder::new();
		let runtime = Runtime::new();
		let cfg = config(Some(PresenceRole::Duplex), Some("127.0.0.1:9000"));
		assert!(builder.build(&cfg, runtime).is_ok());
	}

	#[test]
	fn fitness_ranking_prefers_okay_over_suboptimal() {
		assert!(Fitness::Okay > Fitness::Suboptimal);
		assert!(Fitness::Suboptimal > Fitness::Overkill);
		assert!(Fitness::Overkill > Fitness::Unmet);
	}
}
