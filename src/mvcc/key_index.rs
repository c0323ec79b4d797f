use cbordata::Cborize;
use log::{error, warn};

use std::collections::HashSet;

use crate::{
    mvcc::{Generation, Revision},
    Error, Result,
};

/// This value must change only when the shape of KeyIndex type changes.
const KEY_INDEX_VER: u32 = 0x00030001;

/// KeyIndex is the per-key record of a multi-version store: the user key,
/// the revision that last modified it, and the ordered history of its
/// generations, oldest first.
///
/// Every generation but the last is closed by a tombstone. The last one
/// is either open, while the key is live, or the empty placeholder, while
/// the key is deleted. For example, the sequence put 2.0, put 4.0,
/// tombstone 6.0, put 8.0 leaves:
///
/// ```notest
/// key: "beacon"
/// modified: 8.0
/// generations:
///     {created: 2.0, ver: 3, revs: [2.0, 4.0, 6.0(t)]}
///     {created: 8.0, ver: 1, revs: [8.0]}
/// ```
///
/// A KeyIndex owns its generations exclusively; the external ordered
/// container owns the KeyIndex lifetime and may evict it only once
/// [KeyIndex::is_empty] returns true.
#[derive(Clone, Debug, Eq, PartialEq, Cborize)]
pub struct KeyIndex {
    pub key: Vec<u8>,
    pub modified: Revision,
    pub generations: Vec<Generation>,
}

impl KeyIndex {
    pub const ID: u32 = KEY_INDEX_VER;

    /// Create a fresh record for `key`, with no history.
    pub fn new(key: Vec<u8>) -> KeyIndex {
        KeyIndex {
            key,
            modified: Revision::default(),
            generations: Vec::default(),
        }
    }

    /// Append a new revision to the current generation, starting a fresh
    /// generation when the previous one was closed by a tombstone.
    ///
    /// Panics
    /// ------
    /// Revisions must arrive in strictly increasing order; `rev` not
    /// greater than the last modification is a caller bug.
    pub fn put(&mut self, rev: Revision) {
        if rev <= self.modified {
            error!(
                target: "mvix",
                "put rev {} <= modified {} for key {:?}", rev, self.modified, self.key
            );
            panic!("put rev {} <= modified {}", rev, self.modified);
        }

        if self.generations.is_empty() {
            self.generations.push(Generation::default());
        }
        let n = self.generations.len() - 1;
        let g = &mut self.generations[n];
        if g.is_empty() {
            // key is (re)created with this revision.
            g.created = rev;
        }
        g.revs.push(rev);
        g.ver += 1;
        self.modified = rev;
    }

    /// Close the current generation with tombstone `rev` and open the
    /// placeholder for the key's next life-cycle.
    ///
    /// Return [Error::RevisionNotFound] when the key is already deleted,
    /// or was never written.
    pub fn tombstone(&mut self, rev: Revision) -> Result<()> {
        match self.generations.last() {
            Some(g) if g.is_empty() => {
                warn!(
                    target: "mvix",
                    "tombstone {} on deleted key {:?}", rev, self.key
                );
                err_at!(RevisionNotFound, msg: "tombstone {} on deleted key", rev)
            }
            None => {
                warn!(
                    target: "mvix",
                    "tombstone {} on missing key {:?}", rev, self.key
                );
                err_at!(RevisionNotFound, msg: "tombstone {} on missing key", rev)
            }
            Some(_) => {
                self.put(rev);
                self.generations.push(Generation::default());
                Ok(())
            }
        }
    }

    /// Point-in-time lookup. Return `(modified, created, ver)` for the
    /// key as of `at_rev`: the greatest revision at or below `at_rev`,
    /// the revision that created its generation, and the logical version
    /// of the key at that point.
    ///
    /// Return [Error::RevisionNotFound] when `at_rev` is below the
    /// visible history, beyond the last modification, in the gap after a
    /// tombstone, or when the key was deleted at `at_rev`.
    pub fn get(&self, at_rev: i64) -> Result<(Revision, Revision, i64)> {
        let g = match self.find_generation(at_rev) {
            Some(g) => g,
            None => return err_at!(RevisionNotFound, msg: "get at {}", at_rev),
        };
        match g.walk(|rev| rev.main > at_rev) {
            Some(n) => {
                let ver = g.ver - ((g.revs.len() - n - 1) as i64);
                Ok((g.revs[n], g.created, ver))
            }
            None => err_at!(RevisionNotFound, msg: "get at {}", at_rev),
        }
    }

    /// Return the generation whose revision span covers `at_rev`, None
    /// when `at_rev` falls before the oldest surviving revision, in the
    /// gap after a tombstone, or beyond the last modification.
    ///
    /// A closed generation does not cover its own tombstone revision; the
    /// tombstone terminates it.
    pub fn find_generation(&self, at_rev: i64) -> Option<&Generation> {
        let lastg = self.generations.len().checked_sub(1)?;

        for (cg, g) in self.generations.iter().enumerate().rev() {
            if g.revs.is_empty() {
                continue;
            }
            if cg != lastg && g.revs[g.revs.len() - 1].main <= at_rev {
                return None;
            }
            if g.revs[0].main <= at_rev {
                return Some(g);
            }
        }
        None
    }

    /// Return every revision with `main >= rev`, oldest first, across all
    /// generations. Ties on `main` collapse to the revision with the
    /// highest `sub`, a transaction's intermediate writes to the key are
    /// not visible outside.
    pub fn since(&self, rev: i64) -> Vec<Revision> {
        let since = Revision::new(rev, 0);

        // oldest generation that can hold revisions at or above `since`.
        let mut gi = self.generations.len().saturating_sub(1);
        while gi > 0 {
            let g = &self.generations[gi];
            if !g.is_empty() && since > g.created {
                break;
            }
            gi -= 1;
        }

        let mut revs: Vec<Revision> = Vec::default();
        let mut last: i64 = 0;
        for g in self.generations[gi..].iter() {
            for r in g.revs.iter() {
                if since > *r {
                    continue;
                }
                if r.main == last {
                    let n = revs.len() - 1;
                    revs[n] = *r;
                    continue;
                }
                revs.push(*r);
                last = r.main;
            }
        }
        revs
    }

    /// Remove history made obsolete by a compaction at `at_rev`,
    /// recording in `available` the revisions the caller must retain in
    /// its blob store.
    ///
    /// The greatest revision with `main <= at_rev` survives, a closed
    /// generation's tombstone included; everything before it in its
    /// generation, and every older generation, is dropped. A compaction
    /// strictly beyond a tombstone removes that whole generation. The
    /// last, open or placeholder, generation is always preserved and
    /// `modified` never changes.
    ///
    /// Panics
    /// ------
    /// Compacting a record with no history, or one already compacted
    /// down to the placeholder, is a caller bug.
    pub fn compact(&mut self, at_rev: i64, available: &mut HashSet<Revision>) {
        if self.generations.is_empty() || self.is_empty() {
            error!(
                target: "mvix",
                "compact {} on empty key index {:?}", at_rev, self.key
            );
            panic!("compact {} on empty key index", at_rev);
        }

        let (gen_idx, rev_index) = self.do_compact(at_rev, available);

        let g = &mut self.generations[gen_idx];
        if !g.is_empty() {
            // remove the previous contents.
            if let Some(n) = rev_index {
                g.revs.drain(..n);
            }
        }
        // remove the previous generations.
        self.generations.drain(..gen_idx);
    }

    /// Compute the same retained set as [KeyIndex::compact] would for
    /// `at_rev`, without mutating the index. A closed generation's
    /// tombstone is excluded: compaction retains it in the index, but the
    /// blob store need not pin it. No-op on a record with no history.
    pub fn keep(&self, at_rev: i64, available: &mut HashSet<Revision>) {
        if self.generations.is_empty() || self.is_empty() {
            return;
        }

        let (gen_idx, rev_index) = self.do_compact(at_rev, available);
        let g = &self.generations[gen_idx];
        if !g.is_empty() {
            // remove any tombstone
            if let Some(n) = rev_index {
                if n == g.revs.len() - 1 && gen_idx != self.generations.len() - 1 {
                    available.remove(&g.revs[n]);
                }
            }
        }
    }

    // Locate the survivor of a compaction at `at_rev`: the first
    // generation whose closing tombstone is at or after `at_rev`, and
    // within it the greatest revision with `main <= at_rev`. The survivor
    // is added to `available`. Return the generation's index and the
    // survivor's position, None when the generation holds nothing at or
    // below `at_rev`.
    fn do_compact(
        &self,
        at_rev: i64,
        available: &mut HashSet<Revision>,
    ) -> (usize, Option<usize>) {
        let mut gen_idx = 0;
        while gen_idx < self.generations.len() - 1 {
            let g = &self.generations[gen_idx];
            if g.revs[g.revs.len() - 1].main >= at_rev {
                break;
            }
            gen_idx += 1;
        }

        let rev_index = self.generations[gen_idx].walk(|rev| {
            if rev.main <= at_rev {
                available.insert(*rev);
                false
            } else {
                true
            }
        });

        (gen_idx, rev_index)
    }

    /// Reconstruct the record of a live key from persisted metadata: a
    /// single open generation holding its latest revision.
    ///
    /// Panics
    /// ------
    /// Restoring over a record that already has history is a caller bug.
    pub fn restore(&mut self, created: Revision, modified: Revision, ver: i64) {
        if !self.generations.is_empty() {
            error!(
                target: "mvix",
                "restore on non-empty key index {:?}", self.key
            );
            panic!("restore on non-empty key index");
        }

        self.modified = modified;
        let g = Generation {
            created,
            ver,
            revs: vec![modified],
        };
        self.generations.push(g);
    }

    /// Reconstruct the record of a key known to be deleted: one closed
    /// generation holding only the tombstone, and the trailing
    /// placeholder. Unknown earlier history is collapsed into the
    /// tombstone, a later compaction at its `main` shall keep it.
    pub fn restore_tombstone(&mut self, main: i64, sub: i64) {
        let rev = Revision::new(main, sub);
        self.restore(rev, rev, 1);
        self.generations.push(Generation::default());
    }

    /// Return whether the record holds no visible history, that is, the
    /// sole generation left is the placeholder. The owning container
    /// evicts such records.
    pub fn is_empty(&self) -> bool {
        self.generations.len() == 1 && self.generations[0].is_empty()
    }

    /// Total order by key bytes, the relation under which records sit in
    /// the external ordered container.
    #[inline]
    pub fn less(&self, other: &KeyIndex) -> bool {
        self.key < other.key
    }

    #[inline]
    pub fn as_key(&self) -> &[u8] {
        &self.key
    }

    #[inline]
    pub fn to_modified(&self) -> Revision {
        self.modified
    }
}

#[cfg(test)]
#[path = "key_index_test.rs"]
mod key_index_test;
