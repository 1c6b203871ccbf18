//! Pack index and pack entry reading, plus the delta instruction interpreter.

pub mod delta;
pub mod entry;
pub mod index;

pub use entry::{EntryHeader, EntryKind, RawEntry};
pub use index::PackIndex;
