use cbordata::Cborize;

use crate::mvcc::Revision;

/// This value must change only when the shape of Generation type changes.
const GENERATION_VER: u32 = 0x00020001;

/// Generation spans one contiguous life-cycle of a key: the ordered
/// revisions from (re)creation up to, and including, the tombstone that
/// deletes it.
///
/// `created` is the revision at which the life-cycle began. `revs` hold
/// the generation's revisions in strictly increasing order; when the
/// generation is closed its last element is the tombstone. `ver` counts
/// the revisions appended to this generation, tombstone included. The
/// all-zero generation is the trailing placeholder of a currently deleted
/// key.
///
/// Generation state is mutated only by the owning [KeyIndex].
///
/// [KeyIndex]: crate::mvcc::KeyIndex
#[derive(Clone, Default, Debug, Eq, PartialEq, Cborize)]
pub struct Generation {
    pub ver: i64,
    pub created: Revision,
    pub revs: Vec<Revision>,
}

impl Generation {
    pub const ID: u32 = GENERATION_VER;

    /// Return whether this generation holds no revisions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.revs.is_empty()
    }

    /// Scan `revs` from the tail towards the head, return the largest
    /// index whose revision fails the predicate `f`. Return None when
    /// every revision satisfies `f`.
    pub fn walk<F>(&self, mut f: F) -> Option<usize>
    where
        F: FnMut(&Revision) -> bool,
    {
        for (i, rev) in self.revs.iter().enumerate().rev() {
            if !f(rev) {
                return Some(i);
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "generation_test.rs"]
mod generation_test;
