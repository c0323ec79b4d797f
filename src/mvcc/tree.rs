use log::warn;

use std::{
    collections::{BTreeMap, HashSet},
    ops::Bound,
};

use crate::{
    mvcc::{KeyIndex, Revision},
    Error, Result,
};

/// TreeIndex arranges [KeyIndex] records into an ordered key-space and
/// exposes the store-wide surface: point-in-time lookups, range and
/// range-since queries, compaction and the recovery entry points.
///
/// Ranges take the start key and an optional `end`: None is a point
/// lookup on the start key alone, an empty `end` is open-ended towards
/// the end of the key-space, otherwise the range is `[key, end)`.
///
/// TreeIndex is not internally synchronized, serialization is with the
/// caller.
#[derive(Clone, Default, Debug)]
pub struct TreeIndex {
    tree: BTreeMap<Vec<u8>, KeyIndex>,
}

impl TreeIndex {
    pub fn new() -> TreeIndex {
        TreeIndex {
            tree: BTreeMap::new(),
        }
    }

    /// Return number of keys in the index, deleted ones included until
    /// they are compacted away.
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Return the record for `key`, if any.
    pub fn as_key_index(&self, key: &[u8]) -> Option<&KeyIndex> {
        self.tree.get(key)
    }

    /// Append `rev` for `key`, creating the record on first write.
    pub fn put(&mut self, key: &[u8], rev: Revision) {
        match self.tree.get_mut(key) {
            Some(ki) => ki.put(rev),
            None => {
                let mut ki = KeyIndex::new(key.to_vec());
                ki.put(rev);
                self.tree.insert(key.to_vec(), ki);
            }
        }
    }

    /// Tombstone `key` at `rev`. Return [Error::RevisionNotFound] when
    /// the key is missing or already deleted.
    pub fn tombstone(&mut self, key: &[u8], rev: Revision) -> Result<()> {
        match self.tree.get_mut(key) {
            Some(ki) => ki.tombstone(rev),
            None => err_at!(RevisionNotFound, msg: "tombstone {} on missing key", rev),
        }
    }

    /// Point-in-time lookup for `key`, refer to [KeyIndex::get].
    pub fn get(&self, key: &[u8], at_rev: i64) -> Result<(Revision, Revision, i64)> {
        match self.tree.get(key) {
            Some(ki) => ki.get(at_rev),
            None => err_at!(RevisionNotFound, msg: "get at {} on missing key", at_rev),
        }
    }

    /// Latest revision at `at_rev` for every key live in the range, in
    /// key order, along with the total count of matches. At most `limit`
    /// revisions are returned, `limit` ZERO means unlimited; the count is
    /// not limited.
    pub fn revisions(
        &self,
        key: &[u8],
        end: Option<&[u8]>,
        at_rev: i64,
        limit: usize,
    ) -> (Vec<Revision>, usize) {
        let mut revs: Vec<Revision> = Vec::default();
        let mut total = 0;
        self.visit(key, end, |ki| {
            if let Ok((rev, _, _)) = ki.get(at_rev) {
                if limit == 0 || revs.len() < limit {
                    revs.push(rev);
                }
                total += 1;
            }
            true
        });
        (revs, total)
    }

    /// Count of keys live at `at_rev` in the range.
    pub fn count_revisions(&self, key: &[u8], end: Option<&[u8]>, at_rev: i64) -> usize {
        let mut total = 0;
        self.visit(key, end, |ki| {
            if ki.get(at_rev).is_ok() {
                total += 1;
            }
            true
        });
        total
    }

    /// Keys live at `at_rev` in the range, with the latest revision for
    /// each, both in key order.
    pub fn range(
        &self,
        key: &[u8],
        end: Option<&[u8]>,
        at_rev: i64,
    ) -> (Vec<Vec<u8>>, Vec<Revision>) {
        let mut keys: Vec<Vec<u8>> = Vec::default();
        let mut revs: Vec<Revision> = Vec::default();
        self.visit(key, end, |ki| {
            if let Ok((rev, _, _)) = ki.get(at_rev) {
                keys.push(ki.as_key().to_vec());
                revs.push(rev);
            }
            true
        });
        (keys, revs)
    }

    /// Every revision with `main >= rev` across the keys in the range,
    /// tombstones included, sorted by revision. Refer to
    /// [KeyIndex::since] for the per-key semantics.
    pub fn range_since(&self, key: &[u8], end: Option<&[u8]>, rev: i64) -> Vec<Revision> {
        let mut revs: Vec<Revision> = Vec::default();
        self.visit(key, end, |ki| {
            revs.extend(ki.since(rev));
            true
        });
        revs.sort();
        revs
    }

    /// Compact every record at `at_rev`, evicting keys whose history is
    /// fully gone. Return the set of revisions the caller must retain in
    /// its blob store, refer to [KeyIndex::compact].
    pub fn compact(&mut self, at_rev: i64) -> HashSet<Revision> {
        let mut available: HashSet<Revision> = HashSet::new();
        let mut evict: Vec<Vec<u8>> = Vec::default();
        for (key, ki) in self.tree.iter_mut() {
            ki.compact(at_rev, &mut available);
            if ki.is_empty() {
                evict.push(key.to_vec());
            }
        }
        for key in evict.into_iter() {
            self.tree.remove(&key);
        }
        available
    }

    /// The non-mutating dual of [TreeIndex::compact], refer to
    /// [KeyIndex::keep].
    pub fn keep(&self, at_rev: i64) -> HashSet<Revision> {
        let mut available: HashSet<Revision> = HashSet::new();
        for (_, ki) in self.tree.iter() {
            ki.keep(at_rev, &mut available);
        }
        available
    }

    /// Install a record for `key` replayed from persisted metadata,
    /// refer to [KeyIndex::restore]. A replay not newer than the record
    /// already present is ignored.
    pub fn restore(&mut self, key: &[u8], created: Revision, modified: Revision, ver: i64) {
        match self.tree.get_mut(key) {
            Some(ki) if ki.to_modified() >= modified => {
                warn!(target: "mvix", "stale restore {} for key {:?}", modified, key);
            }
            Some(ki) => ki.put(modified),
            None => {
                let mut ki = KeyIndex::new(key.to_vec());
                ki.restore(created, modified, ver);
                self.tree.insert(key.to_vec(), ki);
            }
        }
    }

    /// Install the record of a key known to be deleted, refer to
    /// [KeyIndex::restore_tombstone]. A replay not newer than the record
    /// already present is ignored.
    pub fn restore_tombstone(&mut self, key: &[u8], main: i64, sub: i64) {
        let rev = Revision::new(main, sub);
        match self.tree.get_mut(key) {
            Some(ki) if ki.to_modified() >= rev => {
                warn!(target: "mvix", "stale restore {} for key {:?}", rev, key);
            }
            Some(ki) => {
                if let Err(err) = ki.tombstone(rev) {
                    warn!(
                        target: "mvix",
                        "restore tombstone {} for key {:?}: {}", rev, key, err
                    );
                }
            }
            None => {
                let mut ki = KeyIndex::new(key.to_vec());
                ki.restore_tombstone(main, sub);
                self.tree.insert(key.to_vec(), ki);
            }
        }
    }

    fn visit<F>(&self, key: &[u8], end: Option<&[u8]>, mut f: F)
    where
        F: FnMut(&KeyIndex) -> bool,
    {
        match end {
            None => {
                if let Some(ki) = self.tree.get(key) {
                    f(ki);
                }
            }
            Some(end) => {
                let till = if end.is_empty() {
                    Bound::Unbounded
                } else {
                    Bound::Excluded(end)
                };
                let iter = self.tree.range::<[u8], _>((Bound::Included(key), till));
                for (_, ki) in iter {
                    if !f(ki) {
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
