//! Error types for the plant core

use thiserror::Error;

use crate::StemId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("leaf index {index} out of range ({len} leaves)")]
    LeafIndex { index: usize, len: usize },

    #[error("joint index {index} out of range ({len} joints)")]
    JointIndex { index: usize, len: usize },

    #[error("path index {index} out of range ({len} points)")]
    PathIndex { index: usize, len: usize },

    #[error("radius must not be negative, got {0}")]
    NegativeRadius(f32),

    #[error("no stem with handle {0:?}")]
    UnknownStem(StemId),

    #[error("no parameter node named {0:?}")]
    UnknownParameter(String),

    #[error("a sibling named {0:?} already exists")]
    DuplicateParameter(String),

    #[error("invalid parameter name {0:?}")]
    InvalidParameterName(String),
}
