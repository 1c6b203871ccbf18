//! Reads a single entry's variable-length header and inflated body from a
//! `.pack` file at a known offset.

use std::io::{Read, Seek, SeekFrom};

use flate2::read::ZlibDecoder;

use crate::binary::decode_offset_encoding;
use crate::error::Error;
use crate::object::{self, Kind, Object};
use crate::oid::{self, ObjectId};

/// The pack entry type, decoded from bits 6..4 of the header's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Commit,
    Tree,
    Blob,
    Tag,
    OfsDelta { distance: u64 },
    RefDelta { base: ObjectId },
}

impl EntryKind {
    /// The object kind this entry materializes as, for non-delta entries.
    pub fn object_kind(&self) -> Option<Kind> {
        match self {
            EntryKind::Commit => Some(Kind::Commit),
            EntryKind::Tree => Some(Kind::Tree),
            EntryKind::Blob => Some(Kind::Blob),
            EntryKind::Tag => Some(Kind::Tag),
            EntryKind::OfsDelta { .. } | EntryKind::RefDelta { .. } => None,
        }
    }

    pub fn is_delta(&self) -> bool {
        matches!(self, EntryKind::OfsDelta { .. } | EntryKind::RefDelta { .. })
    }
}

/// The decoded variable-length entry header: type tag and declared
/// (post-inflation) size.
#[derive(Debug, Clone, Copy)]
pub struct EntryHeader {
    pub kind_tag: u8,
    pub declared_size: u64,
}

/// A pack entry read from disk: header, inflated body, and bookkeeping for
/// delta resolution.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub offset: u64,
    pub kind: EntryKind,
    pub declared_size: u64,
    /// For non-delta entries: the object payload. For delta entries: the
    /// inflated delta payload (size-encoded src/dst lengths + instructions).
    pub body: Vec<u8>,
}

impl RawEntry {
    /// Converts a non-delta entry directly into a materialized object,
    /// verifying its identity against `expected_id`.
    ///
    /// Returns `Error::CannotConvertToObject` if `self` is `ofs-delta` or
    /// `ref-delta` — those entries must be resolved against a base via
    /// [`crate::pack::delta::apply_delta`] instead.
    pub fn into_object(self, expected_id: ObjectId) -> Result<Object, Error> {
        let kind = self
            .kind
            .object_kind()
            .ok_or(Error::CannotConvertToObject { offset: self.offset })?;
        object::verify_identity(kind, &self.body, expected_id)?;
        Ok(Object {
            id: expected_id,
            kind,
            size: self.body.len(),
            payload: self.body,
        })
    }
}

fn decode_type_and_size(reader: &mut impl Read) -> std::io::Result<EntryHeader> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    let kind_tag = (byte[0] >> 4) & 0x07;
    let mut size = (byte[0] & 0x0f) as u64;
    let mut shift = 4u32;
    while byte[0] & 0x80 != 0 {
        reader.read_exact(&mut byte)?;
        size |= ((byte[0] & 0x7f) as u64) << shift;
        shift += 7;
    }
    Ok(EntryHeader {
        kind_tag,
        declared_size: size,
    })
}

/// Reads the entry at `offset` in `pack`, seeking there first.
///
/// `pack` is any seekable reader over the packfile — callers are
/// responsible for opening and closing the underlying file handle per the
/// store's scoped-acquisition resource model.
pub fn read_entry<R: Read + Seek>(pack: &mut R, offset: u64, path: &str) -> Result<RawEntry, Error> {
    let invalid = |reason: String| Error::InvalidPack {
        path: path.to_string(),
        reason,
    };

    pack.seek(SeekFrom::Start(offset)).map_err(|e| invalid(e.to_string()))?;
    let header = decode_type_and_size(pack).map_err(|e| invalid(e.to_string()))?;
    let declared_size = header.declared_size;

    let kind = match header.kind_tag {
        1 => EntryKind::Commit,
        2 => EntryKind::Tree,
        3 => EntryKind::Blob,
        4 => EntryKind::Tag,
        6 => {
            let (distance, _) = decode_offset_encoding(pack).map_err(|e| invalid(e.to_string()))?;
            EntryKind::OfsDelta { distance }
        }
        7 => {
            let mut base_bytes = [0u8; oid::SIZE];
            pack.read_exact(&mut base_bytes).map_err(|e| invalid(e.to_string()))?;
            EntryKind::RefDelta {
                base: ObjectId::from_bytes(base_bytes),
            }
        }
        other => return Err(invalid(format!("reserved or unknown entry type tag {other}"))),
    };

    let expected_len = if kind.is_delta() {
        // Delta bodies are src-length + dst-length + instructions; their
        // inflated length isn't known up front, so read to the stream's
        // natural end rather than a declared byte count.
        None
    } else {
        Some(declared_size as usize)
    };

    let mut body = Vec::new();
    let mut decoder = ZlibDecoder::new(pack);
    decoder.read_to_end(&mut body).map_err(|e| invalid(e.to_string()))?;

    if let Some(expected) = expected_len {
        if body.len() != expected {
            return Err(invalid(format!(
                "entry declared size {expected} but inflated to {} bytes",
                body.len()
            )));
        }
    }

    Ok(RawEntry {
        offset,
        kind,
        declared_size,
        body,
    })
}
