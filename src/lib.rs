//! A read-only reader for the on-disk object database of a Git-family
//! repository.
//!
//! Given a repository root, [`GitStore`] resolves a 20-byte content-
//! addressed identifier to its original payload — whether stored loose or
//! inside a packfile, possibly delta-compressed — classifies it into one
//! of {commit, tree, blob, tag}, parses commit payloads into a structured
//! [`commit::Commit`] record, and walks the commit-parent graph
//! breadth-first via [`GitStore::walk_history`].
//!
//! This crate does not write, stage, index, resolve references, speak the
//! network protocol, or inspect the working tree.

pub mod binary;
pub mod commit;
pub mod discover;
pub mod error;
pub mod loose;
pub mod object;
pub mod oid;
pub mod pack;
pub mod store;
pub mod walk;

pub use commit::Commit;
pub use discover::find_git_root;
pub use error::Error;
pub use object::{Kind, Object};
pub use oid::ObjectId;
pub use store::GitStore;
