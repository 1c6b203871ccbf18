//! The top-level reader: combines loose-object lookup, pack lookup, and
//! delta resolution behind `get_object` and `walk_history`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::commit::Commit;
use crate::discover::find_git_root;
use crate::error::Error;
use crate::loose;
use crate::object::{self, Kind, Object};
use crate::oid::ObjectId;
use crate::pack::delta::apply_delta;
use crate::pack::entry::{read_entry, EntryKind};
use crate::pack::index::PackIndex;

/// Delta chains beyond this depth are treated as pathological and rejected
/// rather than recursed into indefinitely.
const MAX_DELTA_DEPTH: usize = 4096;

/// A discovered pack: its `.pack` path and (lazily loaded, then cached)
/// parsed `.idx` contents.
struct Pack {
    pack_path: PathBuf,
    idx_path: PathBuf,
}

/// The read-only reader over a single repository's object database.
pub struct GitStore {
    git_dir: PathBuf,
    objects_dir: PathBuf,
    packs: Vec<Pack>,
    idx_cache: RefCell<HashMap<PathBuf, Rc<PackIndex>>>,
}

impl GitStore {
    /// Locates the repository root starting from `start` and enumerates
    /// its pack indexes. Pack indexes are not eagerly loaded.
    pub fn new(start: impl AsRef<Path>) -> Result<Self, Error> {
        let root = find_git_root(start.as_ref())?;
        let git_dir = root.join(".git");
        let objects_dir = git_dir.join("objects");
        let pack_dir = objects_dir.join("pack");

        let mut packs = Vec::new();
        if pack_dir.is_dir() {
            for entry in std::fs::read_dir(&pack_dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("idx") {
                    let pack_path = path.with_extension("pack");
                    if pack_path.is_file() {
                        packs.push(Pack {
                            pack_path,
                            idx_path: path,
                        });
                    }
                }
            }
        }

        debug!(pack_count = packs.len(), git_dir = %git_dir.display(), "opened store");

        Ok(GitStore {
            git_dir,
            objects_dir,
            packs,
            idx_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn load_index(&self, pack: &Pack) -> Result<Rc<PackIndex>, Error> {
        if let Some(cached) = self.idx_cache.borrow().get(&pack.idx_path) {
            trace!(path = %pack.idx_path.display(), "index cache hit");
            return Ok(Rc::clone(cached));
        }

        debug!(path = %pack.idx_path.display(), "loading pack index");
        let bytes = std::fs::read(&pack.idx_path)?;
        let path_str = pack.idx_path.to_string_lossy().into_owned();
        let index = Rc::new(PackIndex::parse(&bytes, &path_str)?);
        debug!(path = %pack.idx_path.display(), entries = index.len(), "parsed pack index");
        self.idx_cache
            .borrow_mut()
            .insert(pack.idx_path.clone(), Rc::clone(&index));
        Ok(index)
    }

    /// Resolves `id` to its object, trying the loose path first and then
    /// every known pack.
    pub fn get_object(&self, id: ObjectId) -> Result<Object, Error> {
        trace!(%id, "get_object");
        if let Some(object) = loose::get_loose_object(&self.objects_dir, id)? {
            trace!(%id, "resolved via loose object");
            return Ok(object);
        }

        for pack in &self.packs {
            let index = self.load_index(pack)?;
            trace!(%id, pack = %pack.pack_path.display(), "checking pack index");
            if let Some(entry) = index.find(id) {
                debug!(%id, pack = %pack.pack_path.display(), offset = entry.offset, "found in pack index");
                let mut memo = HashMap::new();
                return self.materialize(pack, &index, entry.offset, id, &mut memo, 0);
            }
        }

        Err(Error::NotFound(id))
    }

    /// Materializes the entry at `offset` in `pack`, recursively resolving
    /// any delta chain. `expected_id` is the identifier the final object
    /// must carry (used to verify the fully-reconstructed payload).
    fn materialize(
        &self,
        pack: &Pack,
        index: &PackIndex,
        offset: u64,
        expected_id: ObjectId,
        memo: &mut HashMap<u64, Object>,
        depth: usize,
    ) -> Result<Object, Error> {
        if depth > MAX_DELTA_DEPTH {
            return Err(Error::DeltaChainTooDeep {
                offset,
                max_depth: MAX_DELTA_DEPTH,
            });
        }
        if let Some(cached) = memo.get(&offset) {
            trace!(offset, "delta memo hit");
            return Ok(cached.clone());
        }

        let mut file = File::open(&pack.pack_path)?;
        let path_str = pack.pack_path.to_string_lossy().into_owned();
        let raw = read_entry(&mut file, offset, &path_str)?;
        drop(file);
        trace!(offset, kind = ?raw.kind, depth, "materializing pack entry");

        let object = match raw.kind {
            EntryKind::Commit | EntryKind::Tree | EntryKind::Blob | EntryKind::Tag => {
                raw.into_object(expected_id)?
            }
            EntryKind::OfsDelta { distance } => {
                let base_offset = offset
                    .checked_sub(distance)
                    .ok_or_else(|| Error::InvalidPack {
                        path: path_str.clone(),
                        reason: format!("ofs-delta distance {distance} underflows offset {offset}"),
                    })?;
                trace!(offset, base_offset, depth, "resolving ofs-delta base");
                let base_entry = index.find_by_offset(base_offset).ok_or_else(|| Error::InvalidPack {
                    path: path_str.clone(),
                    reason: format!("no index entry at resolved base offset {base_offset}"),
                })?;
                let base = self.materialize(pack, index, base_offset, base_entry.id, memo, depth + 1)?;
                self.apply_delta_entry(&raw.body, &base, offset, expected_id)?
            }
            EntryKind::RefDelta { base } => {
                trace!(offset, base = %base, depth, "resolving ref-delta base");
                let base_object = self.get_object(base)?;
                self.apply_delta_entry(&raw.body, &base_object, offset, expected_id)?
            }
        };

        memo.insert(offset, object.clone());
        Ok(object)
    }

    fn apply_delta_entry(
        &self,
        delta_payload: &[u8],
        base: &Object,
        offset: u64,
        expected_id: ObjectId,
    ) -> Result<Object, Error> {
        trace!(offset, base_len = base.payload.len(), "applying delta against resolved base");
        let payload = apply_delta(delta_payload, &base.payload, offset)?;
        object::verify_identity(base.kind, &payload, expected_id)?;
        Ok(Object {
            id: expected_id,
            kind: base.kind,
            size: payload.len(),
            payload,
        })
    }

    /// Walks the commit-parent graph breadth-first from `start_id`,
    /// invoking `visitor` exactly once per reachable commit.
    pub fn walk_history<V, E>(&self, start_id: ObjectId, visitor: V) -> Result<(), Error>
    where
        V: FnMut(&Commit) -> Result<(), E>,
        E: std::error::Error + Send + Sync + 'static,
    {
        crate::walk::walk_history(self, start_id, visitor)
    }
}
