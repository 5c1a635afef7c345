//! Native source emission for type nodes with `must_define_in_native() == true`
//! (`Enumeration`, `Structure`, `Interface`), using `proc-macro2`/`quote` to build token
//! trees and `prettyplease` to render them as formatted Rust source text.

pub mod doc;
pub mod emit;
mod interface;

pub use emit::{emit_enumeration, emit_structure, pretty_print, NativeContext};
pub use interface::emit_interface;
