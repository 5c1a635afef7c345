//! Common imports for downstream crates, mirroring `agent_core::prelude`.

pub use crate::bow::OwnedOrBorrowed;
pub use crate::error::Error;
pub use crate::name::{ExternalName, NameError};
pub use crate::path::Path;
pub use crate::uuidnorm::parse_lenient as parse_uuid_lenient;

pub type Result<T, E = Error> = std::result::Result<T, E>;
