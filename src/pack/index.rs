//! Parses `.idx` pack index files (v1 and v2).

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt};
use sha1::{Digest, Sha1};

use crate::error::Error;
use crate::oid::{self, ObjectId};

const MAGIC: u32 = 0xff744f63;
const FANOUT_LEN: usize = 256;

/// A single identifier-to-offset mapping within a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: ObjectId,
    pub offset: u64,
}

/// A parsed pack index: the fan-out table plus the sorted entry table.
///
/// `entries` is sorted by identifier, matching the on-disk order, so
/// [`PackIndex::find`] can binary-search within the fan-out-bounded slice.
#[derive(Debug, Clone)]
pub struct PackIndex {
    fanout: [u32; FANOUT_LEN],
    entries: Vec<IndexEntry>,
    pub pack_checksum: ObjectId,
    pub idx_checksum: ObjectId,
}

impl PackIndex {
    /// Parses an entire `.idx` file already read into memory, verifying the
    /// trailing SHA-1 over every preceding byte.
    pub fn parse(bytes: &[u8], path: &str) -> Result<Self, Error> {
        let invalid = |reason: String| Error::InvalidIdx {
            path: path.to_string(),
            reason,
        };

        if bytes.len() < oid::SIZE * 2 {
            return Err(invalid("file too short to contain both trailers".into()));
        }

        let body_len = bytes.len() - oid::SIZE;
        let mut hasher = Sha1::new();
        hasher.update(&bytes[..body_len]);
        let computed = ObjectId::try_from(hasher.finalize().as_slice())?;
        let idx_checksum = ObjectId::try_from(&bytes[body_len..])?;
        if computed != idx_checksum {
            return Err(invalid("trailer SHA-1 does not match file contents".into()));
        }

        let mut cursor = Cursor::new(bytes);
        let first_word = cursor.read_u32::<BigEndian>().map_err(|e| invalid(e.to_string()))?;

        let mut parsed = if first_word == MAGIC {
            let version = cursor.read_u32::<BigEndian>().map_err(|e| invalid(e.to_string()))?;
            if version != 2 {
                return Err(invalid(format!("unsupported idx version {version}")));
            }
            parse_v2(&mut cursor, path)?
        } else {
            parse_v1(&mut cursor, first_word, path)?
        };

        // Pack trailer, then idx trailer; idx trailer already verified above.
        let mut pack_trailer = [0u8; oid::SIZE];
        cursor.read_exact(&mut pack_trailer).map_err(|e| invalid(e.to_string()))?;
        parsed.pack_checksum = ObjectId::try_from(&pack_trailer[..])?;
        parsed.idx_checksum = idx_checksum;

        Ok(parsed)
    }

    /// Binary-searches the fan-out-bounded bucket for `id`.
    pub fn find(&self, id: ObjectId) -> Option<IndexEntry> {
        let b = id.first_byte() as usize;
        let lo = if b == 0 { 0 } else { self.fanout[b - 1] as usize };
        let hi = self.fanout[b] as usize;
        self.entries[lo..hi]
            .binary_search_by(|entry| entry.id.cmp(&id))
            .ok()
            .map(|idx| self.entries[lo + idx])
    }

    /// Linear scan for the unique entry at `offset`, used only when
    /// resolving an `ofs-delta` base candidate.
    pub fn find_by_offset(&self, offset: u64) -> Option<IndexEntry> {
        self.entries.iter().copied().find(|entry| entry.offset == offset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read_fanout(cursor: &mut Cursor<&[u8]>) -> std::io::Result<[u32; FANOUT_LEN]> {
    let mut fanout = [0u32; FANOUT_LEN];
    for slot in fanout.iter_mut() {
        *slot = cursor.read_u32::<BigEndian>()?;
    }
    Ok(fanout)
}

fn parse_v1(cursor: &mut Cursor<&[u8]>, fanout_zero: u32, path: &str) -> Result<PackIndex, Error> {
    let invalid = |reason: String| Error::InvalidIdx {
        path: path.to_string(),
        reason,
    };

    let mut fanout = [0u32; FANOUT_LEN];
    fanout[0] = fanout_zero;
    for slot in fanout.iter_mut().skip(1) {
        *slot = cursor.read_u32::<BigEndian>().map_err(|e| invalid(e.to_string()))?;
    }

    let count = fanout[FANOUT_LEN - 1] as usize;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = cursor.read_u32::<BigEndian>().map_err(|e| invalid(e.to_string()))? as u64;
        let mut id_bytes = [0u8; oid::SIZE];
        cursor.read_exact(&mut id_bytes).map_err(|e| invalid(e.to_string()))?;
        entries.push(IndexEntry {
            id: ObjectId::from_bytes(id_bytes),
            offset,
        });
    }

    Ok(PackIndex {
        fanout,
        entries,
        pack_checksum: ObjectId::from_bytes([0; oid::SIZE]),
        idx_checksum: ObjectId::from_bytes([0; oid::SIZE]),
    })
}

fn parse_v2(cursor: &mut Cursor<&[u8]>, path: &str) -> Result<PackIndex, Error> {
    let invalid = |reason: String| Error::InvalidIdx {
        path: path.to_string(),
        reason,
    };

    let fanout = read_fanout(cursor).map_err(|e| invalid(e.to_string()))?;
    let count = fanout[FANOUT_LEN - 1] as usize;

    let mut ids = Vec::with_capacity(count);
    for _ in 0..count {
        let mut id_bytes = [0u8; oid::SIZE];
        cursor.read_exact(&mut id_bytes).map_err(|e| invalid(e.to_string()))?;
        ids.push(ObjectId::from_bytes(id_bytes));
    }

    // CRC32 table: present but not validated, nothing downstream needs it.
    for _ in 0..count {
        cursor.read_u32::<BigEndian>().map_err(|e| invalid(e.to_string()))?;
    }

    let mut raw_offsets = Vec::with_capacity(count);
    for _ in 0..count {
        raw_offsets.push(cursor.read_u32::<BigEndian>().map_err(|e| invalid(e.to_string()))?);
    }

    let large_offset_count = raw_offsets.iter().filter(|&&o| o & 0x8000_0000 != 0).count();
    let mut large_offsets = Vec::with_capacity(large_offset_count);
    for _ in 0..large_offset_count {
        large_offsets.push(cursor.read_u64::<BigEndian>().map_err(|e| invalid(e.to_string()))?);
    }

    let mut entries = Vec::with_capacity(count);
    for (id, raw) in ids.into_iter().zip(raw_offsets.into_iter()) {
        let offset = if raw & 0x8000_0000 != 0 {
            let large_index = (raw & 0x7fff_ffff) as usize;
            *large_offsets
                .get(large_index)
                .ok_or_else(|| invalid(format!("large offset index {large_index} out of range")))?
        } else {
            raw as u64
        };
        entries.push(IndexEntry { id, offset });
    }

    Ok(PackIndex {
        fanout,
        entries,
        pack_checksum: ObjectId::from_bytes([0; oid::SIZE]),
        idx_checksum: ObjectId::from_bytes([0; oid::SIZE]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_v2_idx(entries: &[(ObjectId, u32)]) -> Vec<u8> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|(id, _)| *id);

        let mut fanout = [0u32; FANOUT_LEN];
        for (id, _) in &sorted {
            for b in (id.first_byte() as usize)..FANOUT_LEN {
                fanout[b] += 1;
            }
        }

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC.to_be_bytes());
        bytes.extend_from_slice(&2u32.to_be_bytes());
        for count in fanout {
            bytes.extend_from_slice(&count.to_be_bytes());
        }
        for (id, _) in &sorted {
            bytes.extend_from_slice(id.as_bytes());
        }
        for _ in &sorted {
            bytes.extend_from_slice(&0u32.to_be_bytes());
        }
        for (_, offset) in &sorted {
            bytes.extend_from_slice(&offset.to_be_bytes());
        }
        bytes.extend_from_slice(&[0xaa; 20]); // pack trailer placeholder

        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        bytes.extend_from_slice(&hasher.finalize());
        bytes
    }

    #[test]
    fn parses_v2_and_finds_entries() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let b = ObjectId::from_bytes([0x02; 20]);
        let bytes = build_v2_idx(&[(a, 10), (b, 20)]);

        let idx = PackIndex::parse(&bytes, "test.idx").unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.find(a).unwrap().offset, 10);
        assert_eq!(idx.find(b).unwrap().offset, 20);
    }

    #[test]
    fn find_misses_without_matching_full_id() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let mut other = [0x01; 20];
        other[19] = 0xff;
        let miss = ObjectId::from_bytes(other);
        let bytes = build_v2_idx(&[(a, 10)]);

        let idx = PackIndex::parse(&bytes, "test.idx").unwrap();
        assert!(idx.find(miss).is_none());
    }

    #[test]
    fn find_by_offset_linear_scan() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let b = ObjectId::from_bytes([0x02; 20]);
        let bytes = build_v2_idx(&[(a, 10), (b, 20)]);

        let idx = PackIndex::parse(&bytes, "test.idx").unwrap();
        assert_eq!(idx.find_by_offset(20).unwrap().id, b);
        assert!(idx.find_by_offset(999).is_none());
    }

    #[test]
    fn rejects_corrupted_trailer() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let mut bytes = build_v2_idx(&[(a, 10)]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(PackIndex::parse(&bytes, "test.idx").is_err());
    }

    /// A v1 `.idx`: fan-out table (no magic/version prefix), then a packed
    /// array of `(4-byte offset, 20-byte identifier)` sorted by identifier,
    /// then the pack trailer, then the idx trailer.
    fn build_v1_idx(entries: &[(ObjectId, u32)]) -> Vec<u8> {
        let mut sorted = entries.to_vec();
        sorted.sort_by_key(|(id, _)| *id);

        let mut fanout = [0u32; FANOUT_LEN];
        for (id, _) in &sorted {
            for b in (id.first_byte() as usize)..FANOUT_LEN {
                fanout[b] += 1;
            }
        }

        let mut bytes = Vec::new();
        for count in fanout {
            bytes.extend_from_slice(&count.to_be_bytes());
        }
        for (id, offset) in &sorted {
            bytes.extend_from_slice(&offset.to_be_bytes());
            bytes.extend_from_slice(id.as_bytes());
        }
        bytes.extend_from_slice(&[0xbb; 20]); // pack trailer placeholder

        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        bytes.extend_from_slice(&hasher.finalize());
        bytes
    }

    #[test]
    fn parses_v1_and_finds_entries() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let b = ObjectId::from_bytes([0x02; 20]);
        let bytes = build_v1_idx(&[(a, 10), (b, 20)]);

        let idx = PackIndex::parse(&bytes, "test.idx").unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.find(a).unwrap().offset, 10);
        assert_eq!(idx.find(b).unwrap().offset, 20);
    }

    #[test]
    fn v1_find_misses_without_matching_full_id() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let mut other = [0x01; 20];
        other[19] = 0xff;
        let miss = ObjectId::from_bytes(other);
        let bytes = build_v1_idx(&[(a, 10)]);

        let idx = PackIndex::parse(&bytes, "test.idx").unwrap();
        assert!(idx.find(miss).is_none());
    }

    /// Exercises `parse()`'s `fanout[0] = fanout_zero` carry-over: the v1
    /// branch's zeroth fan-out count is the already-consumed first word of
    /// the file, read before `parse_v1` is even called.
    #[test]
    fn v1_fanout_zero_carries_over_first_word_correctly() {
        let zero_byte_id = ObjectId::from_bytes([0x00; 20]);
        let other = ObjectId::from_bytes([0x05; 20]);
        let bytes = build_v1_idx(&[(zero_byte_id, 1), (other, 2)]);

        let idx = PackIndex::parse(&bytes, "test.idx").unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.find(zero_byte_id).unwrap().offset, 1);
        assert_eq!(idx.find(other).unwrap().offset, 2);
    }

    #[test]
    fn v1_rejects_corrupted_trailer() {
        let a = ObjectId::from_bytes([0x01; 20]);
        let mut bytes = build_v1_idx(&[(a, 10)]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(PackIndex::parse(&bytes, "test.idx").is_err());
    }
}
