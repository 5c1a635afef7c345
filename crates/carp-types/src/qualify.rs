use carp_core::name::ExternalName;

/// Receives diagnostics for references that fail to qualify, so the type model itself
/// doesn't need to depend on a concrete diagnostics sink (log, compiler error list, ...).
pub trait Reporter {
	fn unresolved(&mut self, name: &ExternalName, source_site: &SourceSite);
}

/// A `Reporter` that discards everything; useful when a caller only cares whether
/// qualification fully succeeded (check for remaining unresolved references itself).
pub struct NullReporter;
impl Reporter for NullReporter {
	fn unresolved(&mut self, _name: &ExternalName, _source_site: &SourceSite) {}
}

/// A `Reporter` that records every diagnostic for later inspection, e.g. by compiler
/// front-ends that need to print all errors, not just the first.
#[derive(Default)]
pub struct CollectingReporter {
	pub diagnostics: Vec<(ExternalName, SourceSite)>,
}
impl Reporter for CollectingReporter {
	fn unresolved(&mut self, name: &ExternalName, source_site: &SourceSite) {
		self.diagnostics.push((name.clone(), source_site.clone()));
	}
}

/// Where a `Reference` was written, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SourceSite {
	pub file: Option<String>,
	pub line: u32,
	pub column: u32,
}

impl std::fmt::Display for SourceSite {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match &self.file {
			Some(file) => write!(f, "{file}:{}:{}", self.line, self.column),
			None => write!(f, "{}:{}", self.line, self.column),
		}
	}
}

/// Maps a short (possibly leaf) name to a fully qualified `ExternalName`, used by
/// `Type::qualify` to resolve `Reference` nodes against imports, then local definitions
/// (module-name-prefixed), then built-ins.
pub trait QualificationContext {
	fn resolve_import(&self, leaf: &ExternalName) -> Option<ExternalName>;
	fn resolve_local(&self, leaf: &ExternalName) -> Option<ExternalName>;
	fn resolve_builtin(&self, leaf: &ExternalName) -> Option<ExternalName>;

	/// Tries imports, then locals, then built-ins, in that order, per §4.1.
	fn resolve(&self, leaf: &ExternalName) -> Option<ExternalName> {
		self
			.resolve_import(leaf)
			.or_else(|| self.resolve_local(leaf))
			.or_else(|| self.resolve_builtin(leaf))
	}
}

/// A straightforward map-backed `QualificationContext` built from a module's own
/// `imports` and `types` tables plus the enclosing module name.
pub struct ModuleQualificationContext<'a> {
	pub module_name: &'a ExternalName,
	pub imports: &'a indexmap::IndexMap<String, ExternalName>,
	pub locals: &'a indexmap::IndexMap<String, ()>,
}

impl<'a> QualificationContext for ModuleQualificationContext<'a> {
	fn resolve_import(&self, leaf: &ExternalName) -> Option<ExternalName> {
		if !leaf.is_leaf() {
			return None;
		}
		self.imports.get(leaf.to_string().as_str()).cloned()
	}

	fn resolve_local(&self, leaf: &ExternalName) -> Option<ExternalName> {
		if !leaf.is_leaf() {
			return None;
		}
		let key = leaf.to_string();
		if self.locals.contains_key(key.as_str()) {
			Some(self.module_name.resolve(leaf))
		} else {
			None
		}
	}

	fn resolve_builtin(&self, _leaf: &ExternalName) -> Option<ExternalName> {
		None
	}
}
