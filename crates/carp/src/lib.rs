//! `carp`: the facade crate tying together the type model (`carp-types`), the routing
//! table (`carp-routing`), and the server/client call dispatcher (`carp-rpc`) into a
//! single `Presence` an application constructs from configuration, loads persisted type
//! modules into, and then binds/calls through.

pub mod builder;
pub mod config;
pub mod module;

pub use builder::{BuildError, Fitness, PresenceBuilder, PresenceConfig, PresenceFactory};
pub use carp_core::{Error as CoreError, ExternalName, Path};
pub use carp_routing::Runtime;
pub use carp_rpc::{
	ClientTranslator, DispatchError, Executor, FingerprintRepository, HttpClient, InMemoryFingerprints, Invocable,
	Presence, ReqwestHttpClient, ServerTranslator, TokioExecutor,
};
pub use carp_types::TypeError;
pub use config::{Config, ConfigError, PresenceRole, RawConfig};
pub use module::{load_module_file, load_module_text, register_module, LoadedModule, ModuleError};

use std::sync::Arc;

/// Loads every module file named in `config.modules` and registers its types with
/// `presence`, in order. Convenience wrapper over [`module::load_module_file`] +
/// [`module::register_module`] for the common startup path.
pub fn load_configured_modules(presence: &Presence, config: &Config) -> Result<(), ModuleError> {
	for path in &config.modules {
		let module_name = module_name_for_path(path)?;
		let loaded = module::load_module_file(path, &module_name)?;
		module::register_module(presence, &loaded)?;
	}
	Ok(())
}

/// Derives a module's qualified name from its file's stem (§6: module files are named
/// after the module they define).
fn module_name_for_path(path: &std::path::Path) -> Result<ExternalName, ModuleError> {
	let stem = path
		.file_stem()
		.and_then(|s| s.to_str())
		.ok_or_else(|| TypeError::Persistence(format!("module path {path:?} has no usable file stem")))?;
	ExternalName::parse(stem).map_err(|e| TypeError::Persistence(format!("invalid module name {stem:?}: {e}")).into())
}

/// Builds a `Presence` from a raw config: resolves it, picks a presence flavour via
/// [`PresenceBuilder`], then loads and registers every configured module.
pub fn bootstrap(raw: RawConfig, builder: &PresenceBuilder) -> Result<Arc<Presence>, BootstrapError> {
	let config = raw.resolve()?;
	let runtime = Runtime::with_packrat_window(config.packrat_window);
	let presence_config = PresenceConfig::from_config(&config);
	let presence = builder.build(&presence_config, runtime)?;
	load_configured_modules(&presence, &config)?;
	Ok(presence)
}

#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Build(#[from] BuildError),
	#[error(transparent)]
	Module(#[from] ModuleError),
}
