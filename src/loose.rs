//! Reads a loose object file: `objects/<xx>/<rest>`, a zlib-compressed
//! stream of `"<kind> <size>\0<payload>"`.

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;

use crate::error::Error;
use crate::object::{self, Object};
use crate::oid::ObjectId;

pub fn loose_path(objects_dir: &Path, id: ObjectId) -> PathBuf {
    let hex = id.to_hex();
    objects_dir.join(&hex[..2]).join(&hex[2..])
}

/// Opens and decompresses the loose object for `id`, if present.
///
/// Returns `Ok(None)` exactly when the file does not exist — this is the
/// recoverable "loose not found" signal that the store falls through to
/// pack lookup on. Any other I/O error propagates.
pub fn get_loose_object(objects_dir: &Path, id: ObjectId) -> Result<Option<Object>, Error> {
    let path = loose_path(objects_dir, id);
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };

    let mut decoder = ZlibDecoder::new(file);
    let object = object::read_object(&mut decoder)?;
    Ok(Some(object))
}
