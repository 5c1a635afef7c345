use carp_core::name::ExternalName;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::nodes::{Members, Type};

use super::doc::render_doc_lines;

/// Resolves a qualified `ExternalName` to the native path/ident the generated code should
/// reference it by, and picks the narrower native numeric representations — supplied by
/// the caller (the out-of-scope CLI/build integration owns the target package layout).
pub trait NativeContext {
	fn native_path(&self, name: &ExternalName) -> TokenStream;
}

fn doc_attrs(doc: &str) -> TokenStream {
	let lines = render_doc_lines(doc).into_iter().map(|l| quote!(#[doc = #l]));
	quote!(#(#lines)*)
}

pub(super) fn member_native_type(m: &Type, ctx: &dyn NativeContext) -> TokenStream {
	match m {
		Type::Boolean => quote!(bool),
		Type::Uuid => quote!(uuid::Uuid),
		Type::Integer { min, max } => match crate::nodes::narrowest_integer_kind(*min, *max) {
			crate::nodes::NativeNumericKind::I8 => quote!(i8),
			crate::nodes::NativeNumericKind::I16 => quote!(i16),
			crate::nodes::NativeNumericKind::I32 => quote!(i32),
			crate::nodes::NativeNumericKind::I64 => quote!(i64),
			_ => quote!(i128),
		},
		Type::Real { precision } => match precision.native_kind() {
			crate::nodes::NativeNumericKind::F32 => quote!(f32),
			_ => quote!(f64),
		},
		Type::String { .. } => quote!(String),
		Type::Sequence { elem } => {
			let inner = member_native_type(elem, ctx);
			quote!(Vec<#inner>)
		},
		Type::Set { elem } => {
			let inner = member_native_type(elem, ctx);
			quote!(std::collections::BTreeSet<#inner>)
		},
		Type::Reference(r) => ctx.native_path(&r.name),
		_ => quote!(serde_json::Value),
	}
}

/// Emits an immutable product type for a `Structure`: private fields, public accessors,
/// and a fluent builder with a terminal `.build()`, per §4.1's code-emission rule.
pub fn emit_structure(name: &ExternalName, members: &Members, doc: &str, ctx: &dyn NativeContext) -> TokenStream {
	let type_ident = format_ident!("{}", name.as_native_class_name());
	let builder_ident = format_ident!("{}Builder", name.as_native_class_name());

	let fields = members.iter().map(|(field_name, member)| {
		let ident = format_ident!("{}", ExternalName::single(field_name.clone()).as_native_method_name());
		let ty = member_native_type(&member.type_node, ctx);
		let ty = if member.required { ty } else { quote!(Option<#ty>) };
		quote!(#ident: #ty)
	});

	let accessors = members.iter().map(|(field_name, member)| {
		let ident = format_ident!("{}", ExternalName::single(field_name.clone()).as_native_method_name());
		let ty = member_native_type(&member.type_node, ctx);
		let ty = if member.required { ty } else { quote!(Option<#ty>) };
		quote! {
			pub fn #ident(&self) -> &#ty {
				&self.#ident
			}
		}
	});

	let builder_setters = members.iter().map(|(field_name, member)| {
		let ident = format_ident!("{}", ExternalName::single(field_name.clone()).as_native_method_name());
		let ty = member_native_type(&member.type_node, ctx);
		if member.required {
			quote! {
				pub fn #ident(mut self, value: #ty) -> Self {
					self.#ident = Some(value);
					self
				}
			}
		} else {
			quote! {
				pub fn #ident(mut self, value: Option<#ty>) -> Self {
					self.#ident = value;
					self
				}
			}
		}
	});

	let builder_fields = members.iter().map(|(field_name, member)| {
		let ident = format_ident!("{}", ExternalName::single(field_name.clone()).as_native_method_name());
		let ty = member_native_type(&member.type_node, ctx);
		if member.required {
			quote!(#ident: Option<#ty>)
		} else {
			quote!(#ident: Option<#ty>)
		}
	});

	let field_idents: Vec<_> = members
		.keys()
		.map(|n| format_ident!("{}", ExternalName::single(n.clone()).as_native_method_name()))
		.collect();
	let required_checks = members.iter().filter(|(_, m)| m.required).map(|(n, _)| {
		let ident = format_ident!("{}", ExternalName::single(n.clone()).as_native_method_name());
		quote! {
			let #ident = self.#ident.ok_or_else(|| format!("missing required field {}", stringify!(#ident)))?;
		}
	});
	let optional_binds = members.iter().filter(|(_, m)| !m.required).map(|(n, _)| {
		let ident = format_ident!("{}", ExternalName::single(n.clone()).as_native_method_name());
		quote!(let #ident = self.#ident;)
	});

	let doc_attrs = doc_attrs(doc);

	quote! {
		#doc_attrs
		#[derive(Clone, Debug, PartialEq)]
		pub struct #type_ident {
			#(#fields),*
		}

		impl #type_ident {
			#(#accessors)*

			pub fn builder() -> #builder_ident {
				#builder_ident::default()
			}
		}

		#[derive(Clone, Debug, Default)]
		pub struct #builder_ident {
			#(#builder_fields),*
		}

		impl #builder_ident {
			#(#builder_setters)*

			pub fn build(self) -> Result<#type_ident, String> {
				#(#required_checks)*
				#(#optional_binds)*
				Ok(#type_ident { #(#field_idents),* })
			}
		}
	}
}

/// Emits a closed enumeration, constants ordered as declared.
pub fn emit_enumeration(name: &ExternalName, constants: &indexmap::IndexSet<String>, doc: &str) -> TokenStream {
	let type_ident = format_ident!("{}", name.as_native_class_name());
	let variants = constants.iter().map(|c| {
		let ident = format_ident!("{}", ExternalName::single(c.clone()).as_native_constant_name());
		quote!(#ident)
	});
	let idl_names = constants.iter().map(|c| c.as_str());
	let doc_attrs = doc_attrs(doc);
	quote! {
		#doc_attrs
		#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
		pub enum #type_ident {
			#(#variants),*
		}

		impl #type_ident {
			pub const IDL_NAMES: &'static [&'static str] = &[#(#idl_names),*];
		}
	}
}

/// Pretty-prints a generated item as full Rust source text via `prettyplease`, matching
/// the teacher's generator ecosystem (`proc-macro2`/`quote` inside `cel-derive`).
pub fn pretty_print(tokens: TokenStream) -> Result<String, String> {
	let file: syn::File = syn::parse2(tokens).map_err(|e| e.to_string())?;
	Ok(prettyplease::unparse(&file))
}
