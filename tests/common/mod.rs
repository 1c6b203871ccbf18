use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use gitodb::ObjectId;
use sha1::{Digest, Sha1};

pub fn init_repo(dir: &Path) {
    std::fs::create_dir(dir.join(".git")).unwrap();
    std::fs::create_dir(dir.join(".git").join("objects")).unwrap();
}

fn deflate(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn encode_entry_header(kind_tag: u8, size: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut remaining = size >> 4;
    let mut first = (kind_tag << 4) | (size & 0x0f) as u8;
    if remaining > 0 {
        first |= 0x80;
    }
    out.push(first);
    while remaining > 0 {
        let mut byte = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining > 0 {
            byte |= 0x80;
        }
        out.push(byte);
    }
    out
}

/// A non-delta entry: header + deflated payload.
pub fn non_delta_entry(kind_tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = encode_entry_header(kind_tag, payload.len() as u64);
    bytes.extend(deflate(payload));
    bytes
}

/// A `ref-delta` entry: header (type 7) + 20-byte base id + deflated delta payload.
pub fn ref_delta_entry(base: ObjectId, delta_payload: &[u8]) -> Vec<u8> {
    let mut bytes = encode_entry_header(7, delta_payload.len() as u64);
    bytes.extend_from_slice(base.as_bytes());
    bytes.extend(deflate(delta_payload));
    bytes
}

pub fn object_id_of(kind: &str, payload: &[u8]) -> ObjectId {
    let header = format!("{kind} {}\0", payload.len());
    let mut hasher = Sha1::new();
    hasher.update(header.as_bytes());
    hasher.update(payload);
    ObjectId::try_from(hasher.finalize().as_slice()).unwrap()
}

/// Writes a pack file containing `entries` (already-encoded entry bytes)
/// and a sibling v2 `.idx` file, to `<git_dir>/objects/pack/pack-<name>.{pack,idx}`.
///
/// `ids_and_entries` pairs each entry's final object id with its encoded
/// bytes so the index can be built alongside the pack.
pub fn write_pack(git_dir: &Path, name: &str, ids_and_entries: &[(ObjectId, Vec<u8>)]) {
    let pack_dir = git_dir.join("objects").join("pack");
    std::fs::create_dir_all(&pack_dir).unwrap();

    let mut pack_body = Vec::new();
    pack_body.extend_from_slice(b"PACK");
    pack_body.extend_from_slice(&2u32.to_be_bytes());
    pack_body.extend_from_slice(&(ids_and_entries.len() as u32).to_be_bytes());

    let mut offsets = Vec::with_capacity(ids_and_entries.len());
    for (_, entry) in ids_and_entries {
        offsets.push(pack_body.len() as u64);
        pack_body.extend_from_slice(entry);
    }

    let mut hasher = Sha1::new();
    hasher.update(&pack_body);
    let pack_trailer = hasher.finalize();
    pack_body.extend_from_slice(&pack_trailer);

    std::fs::write(pack_dir.join(format!("pack-{name}.pack")), &pack_body).unwrap();

    let mut sorted: Vec<(ObjectId, u64)> = ids_and_entries
        .iter()
        .zip(offsets.iter())
        .map(|((id, _), &offset)| (*id, offset))
        .collect();
    sorted.sort_by_key(|(id, _)| *id);

    let mut fanout = [0u32; 256];
    for (id, _) in &sorted {
        for b in (id.first_byte() as usize)..256 {
            fanout[b] += 1;
        }
    }

    let mut idx_body = Vec::new();
    idx_body.extend_from_slice(&0xff744f63u32.to_be_bytes());
    idx_body.extend_from_slice(&2u32.to_be_bytes());
    for count in fanout {
        idx_body.extend_from_slice(&count.to_be_bytes());
    }
    for (id, _) in &sorted {
        idx_body.extend_from_slice(id.as_bytes());
    }
    for _ in &sorted {
        idx_body.extend_from_slice(&0u32.to_be_bytes());
    }
    for (_, offset) in &sorted {
        idx_body.extend_from_slice(&(*offset as u32).to_be_bytes());
    }
    idx_body.extend_from_slice(&pack_trailer);

    let mut idx_hasher = Sha1::new();
    idx_hasher.update(&idx_body);
    idx_body.extend_from_slice(&idx_hasher.finalize());

    std::fs::write(pack_dir.join(format!("pack-{name}.idx")), &idx_body).unwrap();
}
