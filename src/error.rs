use thiserror::Error as ThisError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("dimension mismatch")]
    InvalidDim,
    #[error("radius out of range")]
    InvalidRadius,
    #[error("sub hash index out of range")]
    InvalidIndex,
    #[error("point collection is empty or exceeds the supported size")]
    InvalidPoints,
    #[error("hash function broke its bucket contract")]
    InvalidHashFunction,
    /// Reserved: hashers of different families compare unequal instead of
    /// producing this error. See DESIGN.md.
    #[error("hash functions of different families cannot be compared")]
    InvalidCompare,
    #[error("index is not fitted yet")]
    Unfitted,
    #[error("index is already fitted")]
    AlreadyFitted,
    #[error("operation is not implemented for this hash family")]
    NotImplemented,
    #[error("arithmetic overflow during hash evaluation")]
    ArithOverflow,
    #[error("allocation failed")]
    AllocationFailed,
    #[error("could not construct distinct hash functions")]
    ConstructionFailed,
    #[error(transparent)]
    SerializationFailed(#[from] std::boxed::Box<bincode::ErrorKind>),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
