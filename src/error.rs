//! Error taxonomy for the object store.
//!
//! One variant per error kind in the system's error taxonomy; everything
//! else bubbles up as [`Error::Io`].

use crate::oid::ObjectId;

/// Errors produced while reading the object database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not a repository: no ancestor of the start directory contains a .git directory")]
    NotARepository,

    #[error("object not found: {0}")]
    NotFound(ObjectId),

    #[error("invalid object: {0}")]
    InvalidObject(String),

    #[error("not a commit object: {0}")]
    NotACommit(ObjectId),

    #[error("invalid commit object {id}: {reason}")]
    InvalidCommit { id: ObjectId, reason: String },

    #[error("invalid idx file {path}: {reason}")]
    InvalidIdx { path: String, reason: String },

    #[error("invalid pack file {path}: {reason}")]
    InvalidPack { path: String, reason: String },

    #[error("delta entry at pack offset {offset} cannot be converted to an object directly")]
    CannotConvertToObject { offset: u64 },

    #[error("invalid src length reconstructing delta at pack offset {offset}: base is {base_len} bytes, delta declares {declared}")]
    InvalidSrcLength {
        offset: u64,
        base_len: usize,
        declared: u64,
    },

    #[error("invalid dst length reconstructing delta at pack offset {offset}: produced {produced} bytes, delta declares {declared}")]
    InvalidDstLength {
        offset: u64,
        produced: usize,
        declared: u64,
    },

    #[error("delta chain exceeded the maximum allowed depth ({max_depth}) resolving base for offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("history visitor failed: {0}")]
    Visitor(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    pub(crate) fn invalid_object(reason: impl Into<String>) -> Self {
        Error::InvalidObject(reason.into())
    }
}
