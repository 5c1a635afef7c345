//! Loads persisted type-module files (§6 "Persisted type-model format") from disk,
//! qualifies their references, and registers the results with a [`carp_rpc::Presence`].
//! Grounded on `carp_types::persist`/`carp_types::nodes::Type::load`/`qualify` (already
//! implementing the wire format itself) plus `carp_types::qualify::ModuleQualificationContext`
//! (already implementing the import/local/builtin resolution order).

use std::path::{Path, PathBuf};

use carp_core::name::ExternalName;
use carp_rpc::Presence;
use carp_types::nodes::Type;
use carp_types::persist::PropertyMap;
use carp_types::qualify::{CollectingReporter, ModuleQualificationContext};
use carp_types::TypeError;
use indexmap::IndexMap;

#[derive(thiserror::Error, Debug)]
pub enum ModuleError {
	#[error("failed to read module file {0:?}: {1}")]
	Io(PathBuf, std::io::Error),
	#[error(transparent)]
	Type(#[from] TypeError),
	#[error("module {module} has {count} unresolved reference(s); first is {first_name:?} at {first_site}")]
	Unqualified { module: String, count: usize, first_name: String, first_site: String },
}

/// A module file's types, fully qualified (every `Reference` resolved to a qualified
/// name) but not yet registered with any particular `Presence`.
pub struct LoadedModule {
	pub name: ExternalName,
	/// Leaf name -> qualified type node.
	pub types: IndexMap<String, Type>,
}

/// Reads, parses, and qualifies a module file. `module_name` is the fully qualified name
/// the file's own top-level types are nested under (the persisted format doesn't carry
/// its own module name, matching §6's flat property-store description).
pub fn load_module_file(path: &Path, module_name: &ExternalName) -> Result<LoadedModule, ModuleError> {
	let text = std::fs::read_to_string(path).map_err(|e| ModuleError::Io(path.to_path_buf(), e))?;
	load_module_text(&text, module_name)
}

pub fn load_module_text(text: &str, module_name: &ExternalName) -> Result<LoadedModule, ModuleError> {
	let props = PropertyMap::from_text(text)?;
	let node = Type::load("", &props)?;
	let Type::Module { imports, types } = node else {
		return Err(TypeError::Persistence("module file does not contain a top-level module".into()).into());
	};

	let locals: IndexMap<String, ()> = types.keys().map(|k| (k.clone(), ())).collect();
	let qctx = ModuleQualificationContext { module_name, imports: &imports, locals: &locals };
	let mut reporter = CollectingReporter::default();

	let mut qualified = IndexMap::new();
	for (name, t) in &types {
		let q = t.qualify(Some(module_name), &qctx, &mut reporter);
		qualified.insert(name.clone(), q);
	}

	if let Some((first_name, first_site)) = reporter.diagnostics.first() {
		return Err(ModuleError::Unqualified {
			module: module_name.to_string(),
			count: reporter.diagnostics.len(),
			first_name: first_name.to_string(),
			first_site: first_site.to_string(),
		});
	}

	Ok(LoadedModule { name: module_name.clone(), types: qualified })
}

/// Registers every type in a loaded module with `presence`, under its fully qualified
/// name (`module_name.leaf`).
pub fn register_module(presence: &Presence, module: &LoadedModule) -> Result<(), TypeError> {
	for (leaf, node) in &module.types {
		let qualified_name = module.name.resolve(&ExternalName::single(leaf.clone()));
		presence.register_type(qualified_name, node.clone())?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use carp_types::nodes::{Member, Members};

	use super::*;

	fn bank_module_text() -> String {
		let mut props = PropertyMap::new();
		let mut params = Members::new();
		params.insert("amount".to_owned(), Member { type_node: Box::new(Type::Integer { min: Some(0), max: None }), required: true });
		let mut calls = IndexMap::new();
		calls.insert("deposit".to_owned(), Type::CallSpec { parameters: params, responses: IndexMap::new() });
		let bank = Type::Interface { ancestors: Vec::new(), calls };

		let mut types = IndexMap::new();
		types.insert("bank".to_owned(), bank);
		let module = Type::Module { imports: IndexMap::new(), types };
		module.describe("", &mut props);
		props.to_text()
	}

	#[test]
	fn loads_and_qualifies_a_module_with_no_external_references() {
		let text = bank_module_text();
		let module_name = ExternalName::parse("acme").unwrap();
		let loaded = load_module_text(&text, &module_name).unwrap();
		assert!(loaded.types.contains_key("bank"));
	}

	#[test]
	fn register_module_makes_types_resolvable_on_the_presence() {
		let text = bank_module_text();
		let module_name = ExternalName::parse("acme").unwrap();
		let loaded = load_module_text(&text, &module_name).unwrap();
		let presence = Presence::new("http://local");
		register_module(&presence, &loaded).unwrap();
		// a second registration of the same qualified name should still succeed (rebind).
		register_module(&presence, &loaded).unwrap();
	}
}
