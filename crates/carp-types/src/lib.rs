pub mod codec;
pub mod codegen;
pub mod error;
pub mod nodes;
pub mod persist;
pub mod qualify;

pub use codec::Codec;
pub use error::TypeError;
pub use nodes::{Member, Members, Precision, Reference, Type};
pub use persist::PropertyMap;
