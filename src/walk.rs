//! Breadth-first traversal over the commit-parent graph, with cycle
//! suppression via a visited set.

use std::collections::{HashSet, VecDeque};

use crate::commit;
use crate::error::Error;
use crate::oid::ObjectId;
use crate::store::GitStore;

/// Seeds a queue with `start_id` and visits each reachable commit exactly
/// once, in breadth-first order, calling `visitor` once per commit.
///
/// Non-commit objects reachable via a `parent` line surface as
/// `Error::NotACommit`. If `visitor` returns an error, the walk aborts and
/// that error is surfaced (wrapped in `Error::Visitor`).
pub fn walk_history<V, E>(store: &GitStore, start_id: ObjectId, mut visitor: V) -> Result<(), Error>
where
    V: FnMut(&commit::Commit) -> Result<(), E>,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(start_id);

    while let Some(id) = queue.pop_front() {
        if !visited.insert(id) {
            continue;
        }

        let object = store.get_object(id)?;
        let parsed = commit::parse(&object)?;

        visitor(&parsed).map_err(|e| Error::Visitor(Box::new(e)))?;

        for parent in &parsed.parents {
            queue.push_back(*parent);
        }
    }

    Ok(())
}
