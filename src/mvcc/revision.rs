use cbordata::Cborize;

use std::fmt;

/// This value must change only when the shape of Revision type changes.
const REVISION_VER: u32 = 0x00010001;

/// Revision identify a single write within the store's revision log.
///
/// `main` is the transaction revision, globally monotonic across the
/// store. `sub` orders writes made to the key-space within one
/// transaction. Revisions are totally ordered, lexicographically on
/// `(main, sub)`. The zero revision stands for "absent".
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Cborize)]
pub struct Revision {
    pub main: i64,
    pub sub: i64,
}

impl Revision {
    pub const ID: u32 = REVISION_VER;

    #[inline]
    pub fn new(main: i64, sub: i64) -> Revision {
        Revision { main, sub }
    }

    /// Return whether this is the zero revision, the "absent" sentinel.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.main == 0 && self.sub == 0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.main, self.sub)
    }
}

impl<'a> arbitrary::Arbitrary<'a> for Revision {
    fn arbitrary(u: &mut arbitrary::Unstructured) -> arbitrary::Result<Self> {
        let main = i64::from(u.arbitrary::<u16>()?);
        let sub = i64::from(u.arbitrary::<u8>()? % 4);
        Ok(Revision { main, sub })
    }
}

#[cfg(test)]
#[path = "revision_test.rs"]
mod revision_test;
