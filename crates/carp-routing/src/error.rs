use carp_core::error::Error as CoreError;

#[derive(thiserror::Error, Debug)]
pub enum RoutingError {
	#[error("no receiver bound at this path")]
	NotFound,

	#[error("path tail {0:?} was not consumed by any agency")]
	UnconsumedTail(String),
}

impl From<RoutingError> for CoreError {
	fn from(_: RoutingError) -> Self {
		CoreError::RoutingNotFound
	}
}
