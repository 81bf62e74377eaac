use crate::property::PropertyKind;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PropertyError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("index {index} out of range for {name} (len {len})")]
    OutOfRange { name: String, index: usize, len: usize },
    #[error("kind mismatch: {name} is {found}, requested {requested}")]
    KindMismatch {
        name: String,
        found: PropertyKind,
        requested: &'static str,
    },
    #[error("value {value} does not fit {name} ({kind})")]
    Overflow {
        name: String,
        kind: PropertyKind,
        value: String,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PropertyError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PropertyError>;
