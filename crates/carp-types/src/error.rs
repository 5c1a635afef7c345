use carp_core::error::Error as CoreError;

#[derive(thiserror::Error, Debug)]
pub enum TypeError {
	#[error("unresolved reference {name:?} at {source_site}")]
	UnresolvedReference { name: String, source_site: String },

	#[error("malformed persisted type model: {0}")]
	Persistence(String),

	#[error("codec: {0}")]
	Codec(CodecKind, String),

	#[error("native type {0:?} is not an IDL-defined type")]
	NotNative(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
	Encoding,
	Decoding,
	MissingField,
}

impl From<TypeError> for CoreError {
	fn from(e: TypeError) -> Self {
		match e {
			TypeError::UnresolvedReference { name, source_site } => {
				CoreError::NameResolution { name, source_site }
			},
			TypeError::Persistence(msg) => CoreError::TypeModel(msg),
			TypeError::Codec(CodecKind::Encoding, msg) => CoreError::CodecEncoding(msg),
			TypeError::Codec(CodecKind::Decoding | CodecKind::MissingField, msg) => {
				CoreError::CodecDecoding(msg)
			},
			TypeError::NotNative(name) => CoreError::TypeModel(format!("not a native IDL type: {name}")),
		}
	}
}
