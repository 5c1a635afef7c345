use carp_core::name::ExternalName;
use indexmap::{IndexMap, IndexSet};

use crate::codec::{BitsetIndex, Codec};
use crate::error::TypeError;
use crate::persist::PropertyMap;
use crate::qualify::{QualificationContext, Reporter, SourceSite};

/// Decimal precision for a `Real` type node: a fixed digit count, or `infinite` meaning
/// arbitrary precision. Thresholds 7 and 16 pick `f32`/`f64`/bigdecimal at codegen time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
	Digits(u8),
	Infinite,
}

impl Precision {
	pub fn native_kind(self) -> NativeNumericKind {
		match self {
			Precision::Digits(d) if d <= 7 => NativeNumericKind::F32,
			Precision::Digits(d) if d <= 16 => NativeNumericKind::F64,
			_ => NativeNumericKind::BigDecimal,
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativeNumericKind {
	I8,
	I16,
	I32,
	I64,
	BigInteger,
	F32,
	F64,
	BigDecimal,
}

/// Picks the narrowest native integer representation compatible with an inclusive range.
pub fn narrowest_integer_kind(min: Option<i64>, max: Option<i64>) -> NativeNumericKind {
	match (min, max) {
		(Some(min), Some(max)) => {
			if min >= i8::MIN as i64 && max <= i8::MAX as i64 {
				NativeNumericKind::I8
			} else if min >= i16::MIN as i64 && max <= i16::MAX as i64 {
				NativeNumericKind::I16
			} else if min >= i32::MIN as i64 && max <= i32::MAX as i64 {
				NativeNumericKind::I32
			} else {
				NativeNumericKind::I64
			}
		},
		_ => NativeNumericKind::BigInteger,
	}
}

/// A structure/response/call member: its type and whether it is required.
#[derive(Clone, Debug, PartialEq)]
pub struct Member {
	pub type_node: Box<Type>,
	pub required: bool,
}

pub type Members = IndexMap<String, Member>;

/// A late-bound reference to a type by name, with the site it was written at for
/// diagnostics. Leaf names are resolved during qualification; already-qualified names
/// (dotted, multi-word) are resolved directly against the link context.
#[derive(Clone, Debug)]
pub struct Reference {
	pub name: ExternalName,
	pub source_site: SourceSite,
}

impl PartialEq for Reference {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name
	}
}

/// The closed type-node family (§3). Composites own their children directly; `Reference`
/// is the only node that defers resolution to qualification/linking.
///
/// `PartialEq` is hand-written, not derived: §3 requires member/response/call sequences to
/// compare *order-sensitively* (two `Structure`s with the same members in a different
/// declaration order are unequal), which an `IndexMap`'s own order-independent `PartialEq`
/// doesn't give us, while `Enumeration`'s constants stay set-equality (`IndexSet`'s own
/// `PartialEq`, which is already order-insensitive).
#[derive(Clone, Debug)]
pub enum Type {
	Boolean,
	Uuid,
	Integer {
		min: Option<i64>,
		max: Option<i64>,
	},
	Real {
		precision: Precision,
	},
	String {
		pattern: Option<String>,
	},
	Sequence {
		elem: Box<Type>,
	},
	Set {
		elem: Box<Type>,
	},
	Enumeration {
		constants: IndexSet<String>,
	},
	Structure {
		members: Members,
	},
	ResponseSpec {
		parameters: Members,
	},
	CallSpec {
		parameters: Members,
		responses: IndexMap<String, Type>,
	},
	Interface {
		ancestors: Vec<Reference>,
		calls: IndexMap<String, Type>,
	},
	Reference(Reference),
	Module {
		imports: IndexMap<String, ExternalName>,
		types: IndexMap<String, Type>,
	},
}

impl PartialEq for Type {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Type::Boolean, Type::Boolean) => true,
			(Type::Uuid, Type::Uuid) => true,
			(Type::Integer { min: a_min, max: a_max }, Type::Integer { min: b_min, max: b_max }) => a_min == b_min && a_max == b_max,
			(Type::Real { precision: a }, Type::Real { precision: b }) => a == b,
			(Type::String { pattern: a }, Type::String { pattern: b }) => a == b,
			(Type::Sequence { elem: a }, Type::Sequence { elem: b }) => a == b,
			(Type::Set { elem: a }, Type::Set { elem: b }) => a == b,
			// Enumeration constants compare as a set, per §3: `IndexSet::eq` is already
			// order-insensitive, so this is the one composite that can lean on the derive-like
			// default instead of the ordered-sequence helpers below.
			(Type::Enumeration { constants: a }, Type::Enumeration { constants: b }) => a == b,
			(Type::Structure { members: a }, Type::Structure { members: b }) => members_eq_ordered(a, b),
			(Type::ResponseSpec { parameters: a }, Type::ResponseSpec { parameters: b }) => members_eq_ordered(a, b),
			(
				Type::CallSpec { parameters: a_params, responses: a_resp },
				Type::CallSpec { parameters: b_params, responses: b_resp },
			) => members_eq_ordered(a_params, b_params) && type_map_eq_ordered(a_resp, b_resp),
			(
				Type::Interface { ancestors: a_ancestors, calls: a_calls },
				Type::Interface { ancestors: b_ancestors, calls: b_calls },
			) => a_ancestors == b_ancestors && type_map_eq_ordered(a_calls, b_calls),
			(Type::Reference(a), Type::Reference(b)) => a == b,
			(
				Type::Module { imports: a_imports, types: a_types },
				Type::Module { imports: b_imports, types: b_types },
			) => a_imports == b_imports && type_map_eq_ordered(a_types, b_types),
			_ => false,
		}
	}
}

/// Order-sensitive equality for a `Members` map: same length, and each (name, member) pair
/// in the same position, not merely present somewhere in the other map.
fn members_eq_ordered(a: &Members, b: &Members) -> bool {
	a.len() == b.len() && a.iter().zip(b.iter()).all(|((a_name, a_member), (b_name, b_member))| a_name == b_name && a_member == b_member)
}

/// As `members_eq_ordered`, for the `leafName -> Type` maps used by `CallSpec::responses`,
/// `Interface::calls`, and `Module::types`.
fn type_map_eq_ordered(a: &IndexMap<String, Type>, b: &IndexMap<String, Type>) -> bool {
	a.len() == b.len() && a.iter().zip(b.iter()).all(|((a_name, a_type), (b_name, b_type))| a_name == b_name && a_type == b_type)
}

impl Type {
	pub const fn must_define_in_native(&self) -> bool {
		matches!(self, Type::Enumeration { .. } | Type::Structure { .. } | Type::Interface { .. })
	}

	/// Writes this node's flat properties under `prefix` (§6 persistence format).
	pub fn describe(&self, prefix: &str, props: &mut PropertyMap) {
		let key = |suffix: &str| format!("{prefix}{suffix}");
		match self {
			Type::Boolean => props.set(key("type"), "bool"),
			Type::Uuid => props.set(key("type"), "uuid"),
			Type::Integer { min, max } => {
				props.set(key("type"), "int");
				if let Some(min) = min {
					props.set(key("min"), min.to_string());
				}
				if let Some(max) = max {
					props.set(key("max"), max.to_string());
				}
			},
			Type::Real { precision } => {
				props.set(key("type"), "real");
				match precision {
					Precision::Digits(d) => props.set(key("precision"), d.to_string()),
					Precision::Infinite => props.set(key("precision"), "infinite"),
				}
			},
			Type::String { pattern } => {
				props.set(key("type"), "string");
				if let Some(pattern) = pattern {
					props.set(key("pattern"), pattern.clone());
				}
			},
			Type::Sequence { elem } => {
				props.set(key("type"), "seq");
				elem.describe(&key("elem."), props);
			},
			Type::Set { elem } => {
				props.set(key("type"), "set");
				elem.describe(&key("elem."), props);
			},
			Type::Enumeration { constants } => {
				props.set(key("type"), "enum");
				props.set(key("const.count"), constants.len().to_string());
				for (i, c) in constants.iter().enumerate() {
					props.set(key(&format!("const.{i}")), c.clone());
				}
			},
			Type::Structure { members } => {
				props.set(key("type"), "struct");
				describe_members(&key(""), members, props);
			},
			Type::ResponseSpec { parameters } => {
				props.set(key("type"), "response");
				describe_members(&key(""), parameters, props);
			},
			Type::CallSpec { parameters, responses } => {
				props.set(key("type"), "call");
				describe_members(&format!("{prefix}param."), parameters, props);
				props.set(key("rsp.count"), responses.len().to_string());
				for (i, (name, rsp)) in responses.iter().enumerate() {
					props.set(key(&format!("rsp.{i}.name")), name.clone());
					rsp.describe(&key(&format!("rsp.{i}.")), props);
				}
			},
			Type::Interface { ancestors, calls } => {
				props.set(key("type"), "iface");
				props.set(key("ancestor.count"), ancestors.len().to_string());
				for (i, a) in ancestors.iter().enumerate() {
					props.set(key(&format!("ancestor.{i}")), a.name.to_string());
				}
				props.set(key("call.count"), calls.len().to_string());
				for (i, (name, call)) in calls.iter().enumerate() {
					props.set(key(&format!("call.{i}.name")), name.clone());
					call.describe(&key(&format!("call.{i}.")), props);
				}
			},
			Type::Reference(r) => {
				props.set(key("type"), "ref");
				props.set(key("name"), r.name.to_string());
			},
			Type::Module { imports, types } => {
				props.set(key("type"), "module");
				props.set(key("import.count"), imports.len().to_string());
				for (i, (leaf, qualified)) in imports.iter().enumerate() {
					props.set(key(&format!("import.{i}.name")), leaf.clone());
					props.set(key(&format!("import.{i}.qualified")), qualified.to_string());
				}
				props.set(key("type.count"), types.len().to_string());
				for (i, (name, t)) in types.iter().enumerate() {
					props.set(key(&format!("type.{i}.name")), name.clone());
					t.describe(&key(&format!("type.{i}.")), props);
				}
			},
		}
	}

	/// The inverse of `describe`.
	pub fn load(prefix: &str, props: &PropertyMap) -> Result<Type, TypeError> {
		let key = |suffix: &str| format!("{prefix}{suffix}");
		let tag = props.require(&key("type"))?;
		Ok(match tag {
			"bool" => Type::Boolean,
			"uuid" => Type::Uuid,
			"int" => Type::Integer {
				min: props.get(&key("min")).map(|s| s.parse()).transpose().map_err(int_err)?,
				max: props.get(&key("max")).map(|s| s.parse()).transpose().map_err(int_err)?,
			},
			"real" => Type::Real {
				precision: match props.require(&key("precision"))? {
					"infinite" => Precision::Infinite,
					d => Precision::Digits(d.parse().map_err(int_err)?),
				},
			},
			"string" => Type::String {
				pattern: props.get(&key("pattern")).map(str::to_owned),
			},
			"seq" => Type::Sequence {
				elem: Box::new(Type::load(&key("elem."), props)?),
			},
			"set" => Type::Set {
				elem: Box::new(Type::load(&key("elem."), props)?),
			},
			"enum" => {
				let count = props.require_usize(&key("const.count"))?;
				let mut constants = IndexSet::new();
				for i in 0..count {
					constants.insert(props.require(&key(&format!("const.{i}")))?.to_owned());
				}
				Type::Enumeration { constants }
			},
			"struct" => Type::Structure {
				members: load_members(&key(""), props)?,
			},
			"response" => Type::ResponseSpec {
				parameters: load_members(&key(""), props)?,
			},
			"call" => {
				let parameters = load_members(&format!("{prefix}param."), props)?;
				let count = props.require_usize(&key("rsp.count"))?;
				let mut responses = IndexMap::new();
				for i in 0..count {
					let name = props.require(&key(&format!("rsp.{i}.name")))?.to_owned();
					let rsp = Type::load(&key(&format!("rsp.{i}.")), props)?;
					responses.insert(name, rsp);
				}
				Type::CallSpec { parameters, responses }
			},
			"iface" => {
				let ancestor_count = props.require_usize(&key("ancestor.count"))?;
				let mut ancestors = Vec::new();
				for i in 0..ancestor_count {
					let name = props.require(&key(&format!("ancestor.{i}")))?;
					ancestors.push(Reference {
						name: ExternalName::parse(name).map_err(name_err)?,
						source_site: SourceSite::default(),
					});
				}
				let call_count = props.require_usize(&key("call.count"))?;
				let mut calls = IndexMap::new();
				for i in 0..call_count {
					let name = props.require(&key(&format!("call.{i}.name")))?.to_owned();
					let call = Type::load(&key(&format!("call.{i}.")), props)?;
					calls.insert(name, call);
				}
				Type::Interface { ancestors, calls }
			},
			"ref" => Type::Reference(Reference {
				name: ExternalName::parse(props.require(&key("name"))?).map_err(name_err)?,
				source_site: SourceSite::default(),
			}),
			"module" => {
				let import_count = props.require_usize(&key("import.count"))?;
				let mut imports = IndexMap::new();
				for i in 0..import_count {
					let leaf = props.require(&key(&format!("import.{i}.name")))?.to_owned();
					let qualified = props.require(&key(&format!("import.{i}.qualified")))?;
					imports.insert(leaf, ExternalName::parse(qualified).map_err(name_err)?);
				}
				let type_count = props.require_usize(&key("type.count"))?;
				let mut types = IndexMap::new();
				for i in 0..type_count {
					let name = props.require(&key(&format!("type.{i}.name")))?.to_owned();
					let t = Type::load(&key(&format!("type.{i}.")), props)?;
					types.insert(name, t);
				}
				Type::Module { imports, types }
			},
			other => return Err(TypeError::Persistence(format!("unknown type tag {other:?}"))),
		})
	}

	/// Resolves `Reference` nodes against `qctx`; recurses into composites. Returns a new
	/// node only where something changed, per the §4.1 invariant.
	pub fn qualify(&self, self_name: Option<&ExternalName>, qctx: &dyn QualificationContext, reporter: &mut dyn Reporter) -> Type {
		match self {
			Type::Reference(r) => {
				if let Some(qualified) = qctx.resolve(&r.name) {
					if qualified == r.name {
						self.clone()
					} else {
						Type::Reference(Reference { name: qualified, source_site: r.source_site.clone() })
					}
				} else {
					reporter.unresolved(&r.name, &r.source_site);
					self.clone()
				}
			},
			Type::Sequence { elem } => {
				let q = elem.qualify(self_name, qctx, reporter);
				if &q == elem.as_ref() {
					self.clone()
				} else {
					Type::Sequence { elem: Box::new(q) }
				}
			},
			Type::Set { elem } => {
				let q = elem.qualify(self_name, qctx, reporter);
				if &q == elem.as_ref() {
					self.clone()
				} else {
					Type::Set { elem: Box::new(q) }
				}
			},
			Type::Structure { members } => {
				let (changed, new_members) = qualify_members(members, self_name, qctx, reporter);
				if changed {
					Type::Structure { members: new_members }
				} else {
					self.clone()
				}
			},
			Type::ResponseSpec { parameters } => {
				let (changed, new_parameters) = qualify_members(parameters, self_name, qctx, reporter);
				if changed {
					Type::ResponseSpec { parameters: new_parameters }
				} else {
					self.clone()
				}
			},
			Type::CallSpec { parameters, responses } => {
				let (p_changed, new_parameters) = qualify_members(parameters, self_name, qctx, reporter);
				let mut r_changed = false;
				let mut new_responses = IndexMap::new();
				for (name, rsp) in responses {
					let q = rsp.qualify(self_name, qctx, reporter);
					r_changed |= &q != rsp;
					new_responses.insert(name.clone(), q);
				}
				if p_changed || r_changed {
					Type::CallSpec { parameters: new_parameters, responses: new_responses }
				} else {
					self.clone()
				}
			},
			Type::Interface { ancestors, calls } => {
				let mut a_changed = false;
				let new_ancestors: Vec<Reference> = ancestors
					.iter()
					.map(|a| {
						let qualified = qctx.resolve(&a.name);
						match qualified {
							Some(q) if q != a.name => {
								a_changed = true;
								Reference { name: q, source_site: a.source_site.clone() }
							},
							Some(_) => a.clone(),
							None => {
								reporter.unresolved(&a.name, &a.source_site);
								a.clone()
							},
						}
					})
					.collect();
				let mut c_changed = false;
				let mut new_calls = IndexMap::new();
				for (name, call) in calls {
					let q = call.qualify(self_name, qctx, reporter);
					c_changed |= &q != call;
					new_calls.insert(name.clone(), q);
				}
				if a_changed || c_changed {
					Type::Interface { ancestors: new_ancestors, calls: new_calls }
				} else {
					self.clone()
				}
			},
			Type::Module { imports, types } => {
				let mut changed = false;
				let mut new_types = IndexMap::new();
				for (name, t) in types {
					let local_name = self_name.map(|m| m.resolve(&ExternalName::single(name.clone())));
					let q = t.qualify(local_name.as_ref().or(self_name), qctx, reporter);
					changed |= &q != t;
					new_types.insert(name.clone(), q);
				}
				if changed {
					Type::Module { imports: imports.clone(), types: new_types }
				} else {
					self.clone()
				}
			},
			_ => self.clone(),
		}
	}

	/// Produces the pure encoder/decoder for this node. `link` resolves a fully-qualified
	/// `Reference` to the `Codec` of the type it names.
	pub fn get_codec(&self, link: &dyn Fn(&ExternalName) -> Option<Codec>) -> Result<Codec, TypeError> {
		Ok(match self {
			Type::Boolean => Codec::Boolean,
			Type::Uuid => Codec::Uuid,
			Type::Integer { min, max } => Codec::Integer { min: *min, max: *max },
			Type::Real { precision } => Codec::Real { precision: *precision },
			Type::String { pattern } => Codec::String {
				pattern: pattern
					.as_ref()
					.map(|p| regex::Regex::new(p).map(std::sync::Arc::new))
					.transpose()
					.map_err(|e| TypeError::Persistence(e.to_string()))?,
			},
			Type::Sequence { elem } => Codec::Sequence(Box::new(elem.get_codec(link)?)),
			Type::Set { elem } => {
				let bitset = match elem.as_ref() {
					Type::Integer { min, max } => BitsetIndex::eligible(*min, *max),
					_ => None,
				};
				Codec::Set { elem: Box::new(elem.get_codec(link)?), bitset }
			},
			Type::Enumeration { constants } => Codec::Enumeration(constants.iter().cloned().collect()),
			Type::Structure { members } | Type::ResponseSpec { parameters: members } => {
				Codec::Structure(members_codec(members, link)?)
			},
			Type::Reference(r) => {
				let target = link(&r.name).ok_or_else(|| TypeError::UnresolvedReference {
					name: r.name.to_string(),
					source_site: r.source_site.to_string(),
				})?;
				Codec::Reference(Box::new(target))
			},
			Type::Interface { .. } => Codec::Interface { type_id: String::new() },
			Type::CallSpec { .. } | Type::Module { .. } => {
				return Err(TypeError::NotNative("CallSpec/Module have no wire codec of their own".into()));
			},
		})
	}

	/// Emits edges from `referrer` to every `Reference` reachable within this node,
	/// without recursing through already-named types (the caller walks the module graph).
	pub fn gather_references(&self, referrer: &ExternalName, sink: &mut dyn FnMut(ExternalName, ExternalName)) {
		match self {
			Type::Reference(r) => sink(referrer.clone(), r.name.clone()),
			Type::Sequence { elem } | Type::Set { elem } => elem.gather_references(referrer, sink),
			Type::Structure { members } | Type::ResponseSpec { parameters: members } => {
				for m in members.values() {
					m.type_node.gather_references(referrer, sink);
				}
			},
			Type::CallSpec { parameters, responses } => {
				for m in parameters.values() {
					m.type_node.gather_references(referrer, sink);
				}
				for r in responses.values() {
					r.gather_references(referrer, sink);
				}
			},
			Type::Interface { ancestors, calls } => {
				for a in ancestors {
					sink(referrer.clone(), a.name.clone());
				}
				for c in calls.values() {
					c.gather_references(referrer, sink);
				}
			},
			Type::Module { types, .. } => {
				for (name, t) in types {
					t.gather_references(&referrer.resolve(&ExternalName::single(name.clone())), sink);
				}
			},
			Type::Boolean | Type::Uuid | Type::Integer { .. } | Type::Real { .. } | Type::String { .. } | Type::Enumeration { .. } => {},
		}
	}

	/// A fragment of native-language expression text computing a hash contribution for a
	/// value of this type bound to `accessor` (e.g. `self.x()`); used by the source
	/// generator to build `Structure`/`Interface` `hash` methods.
	pub fn hash_expr(&self, accessor: &str) -> String {
		match self {
			Type::Boolean | Type::Integer { .. } | Type::Enumeration { .. } => format!("{accessor}.hash()"),
			Type::Real { .. } => format!("{accessor}.to_bits().hash()"),
			Type::String { .. } | Type::Uuid => format!("{accessor}.hash()"),
			Type::Sequence { elem } | Type::Set { elem } => {
				format!("{accessor}.iter().map(|v| {}).hash()", elem.hash_expr("v"))
			},
			_ => format!("{accessor}.hash()"),
		}
	}

	/// A fragment of native-language expression text testing two accessors for inequality,
	/// used by the generated `equals`/`==` implementation (negated form, matching the
	/// source's "inequality expression" emitter framing).
	pub fn inequality_expr(&self, a: &str, b: &str) -> String {
		match self {
			Type::Sequence { .. } | Type::Set { .. } | Type::Structure { .. } => {
				format!("{a} != {b}")
			},
			_ => format!("{a} != {b}"),
		}
	}
}

fn describe_members(prefix: &str, members: &Members, props: &mut PropertyMap) {
	props.set(format!("{prefix}member.count"), members.len().to_string());
	for (i, (name, member)) in members.iter().enumerate() {
		props.set(format!("{prefix}member.{i}.name"), name.clone());
		if member.required {
			props.set(format!("{prefix}member.{i}.optional"), "no");
		} else {
			props.set(format!("{prefix}member.{i}.optional"), "yes");
		}
		member.type_node.describe(&format!("{prefix}member.{i}."), props);
	}
}

fn load_members(prefix: &str, props: &PropertyMap) -> Result<Members, TypeError> {
	let count = props.require_usize(&format!("{prefix}member.count"))?;
	let mut members = IndexMap::new();
	for i in 0..count {
		let name = props.require(&format!("{prefix}member.{i}.name"))?.to_owned();
		let required = !props.get_bool(&format!("{prefix}member.{i}.optional"), false);
		let type_node = Type::load(&format!("{prefix}member.{i}."), props)?;
		members.insert(name, Member { type_node: Box::new(type_node), required });
	}
	Ok(members)
}

fn qualify_members(
	members: &Members,
	self_name: Option<&ExternalName>,
	qctx: &dyn QualificationContext,
	reporter: &mut dyn Reporter,
) -> (bool, Members) {
	let mut changed = false;
	let mut out = IndexMap::new();
	for (name, member) in members {
		let q = member.type_node.qualify(self_name, qctx, reporter);
		changed |= &q != member.type_node.as_ref();
		out.insert(name.clone(), Member { type_node: Box::new(q), required: member.required });
	}
	(changed, out)
}

fn members_codec(members: &Members, link: &dyn Fn(&ExternalName) -> Option<Codec>) -> Result<IndexMap<String, (Box<Codec>, bool)>, TypeError> {
	let mut out = IndexMap::new();
	for (name, member) in members {
		out.insert(name.clone(), (Box::new(member.type_node.get_codec(link)?), member.required));
	}
	Ok(out)
}

fn int_err<E: std::fmt::Display>(e: E) -> TypeError {
	TypeError::Persistence(e.to_string())
}
fn name_err(e: carp_core::name::NameError) -> TypeError {
	TypeError::Persistence(e.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::qualify::NullReporter;

	fn dummy_link(_: &ExternalName) -> Option<Codec> {
		None
	}

	#[test]
	fn describe_load_round_trip_for_structure() {
		let mut members = Members::new();
		members.insert(
			"x".to_owned(),
			Member { type_node: Box::new(Type::Integer { min: Some(0), max: Some(100) }), required: true },
		);
		members.insert(
			"y".to_owned(),
			Member { type_node: Box::new(Type::Integer { min: Some(0), max: Some(100) }), required: false },
		);
		let t = Type::Structure { members };

		let mut props = PropertyMap::new();
		t.describe("", &mut props);
		let loaded = Type::load("", &props).unwrap();
		assert_eq!(t, loaded);
	}

	#[test]
	fn must_define_in_native_is_exactly_enum_struct_iface() {
		assert!(Type::Enumeration { constants: IndexSet::new() }.must_define_in_native());
		assert!(Type::Structure { members: Members::new() }.must_define_in_native());
		assert!(Type::Interface { ancestors: vec![], calls: IndexMap::new() }.must_define_in_native());
		assert!(!Type::Boolean.must_define_in_native());
		assert!(!Type::Sequence { elem: Box::new(Type::Boolean) }.must_define_in_native());
	}

	#[test]
	fn enumeration_equality_is_order_insensitive() {
		let a = Type::Enumeration { constants: IndexSet::from(["A".to_string(), "B".to_string()]) };
		let b = Type::Enumeration { constants: IndexSet::from(["B".to_string(), "A".to_string()]) };
		assert_eq!(a, b);
	}

	#[test]
	fn structure_equality_is_order_sensitive() {
		let x = || Member { type_node: Box::new(Type::Integer { min: Some(0), max: Some(100) }), required: true };
		let y = || Member { type_node: Box::new(Type::Integer { min: Some(0), max: Some(100) }), required: false };

		let a = Type::Structure {
			members: {
				let mut m = Members::new();
				m.insert("x".to_owned(), x());
				m.insert("y".to_owned(), y());
				m
			},
		};
		let b = Type::Structure {
			members: {
				let mut m = Members::new();
				m.insert("y".to_owned(), y());
				m.insert("x".to_owned(), x());
				m
			},
		};
		assert_ne!(a, b, "same members in a different declaration order must not compare equal");
	}

	#[test]
	fn qualify_is_idempotent_once_fully_resolved() {
		struct AllResolved;
		impl QualificationContext for AllResolved {
			fn resolve_import(&self, _leaf: &ExternalName) -> Option<ExternalName> {
				None
			}
			fn resolve_local(&self, leaf: &ExternalName) -> Option<ExternalName> {
				Some(ExternalName::parse("acme.bank").unwrap().resolve(leaf))
			}
			fn resolve_builtin(&self, _leaf: &ExternalName) -> Option<ExternalName> {
				None
			}
		}
		let t = Type::Reference(Reference { name: ExternalName::single("account"), source_site: SourceSite::default() });
		let ctx = AllResolved;
		let mut reporter = NullReporter;
		let once = t.qualify(None, &ctx, &mut reporter);
		let twice = once.qualify(None, &ctx, &mut reporter);
		assert_eq!(once, twice);
	}
}
