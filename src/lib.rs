//! Package implement a multi-version key index for key,value storage
//! engines.
//!
//! Every mutation ingested by the store carries a [Revision], a
//! `(main, sub)` pair where `main` is the globally monotonic transaction
//! revision and `sub` orders writes within one transaction. For each
//! logical key, [KeyIndex] records the full ordered history of revisions
//! at which the key was written or deleted, grouped into [Generation]
//! values, one generation per life-cycle of the key. Deleting a key
//! appends a tombstone revision that closes the current generation and
//! opens an empty placeholder for the next one.
//!
//! [TreeIndex] arranges the per-key records into an ordered key-space and
//! is the entry point for point-in-time lookups, range and range-since
//! queries, and compaction across the whole store.
//!
//! Compaction
//! ----------
//!
//! Compacting at revision `R` discards, for every key, history that can no
//! longer be observed at or after `R`, and reports the set of surviving
//! revisions the caller must retain in its blob store. [KeyIndex::keep]
//! computes the same set without mutating the index, for callers that
//! stage blob-store pinning ahead of the actual compaction.
//!
//! The index performs no I/O and takes no locks; callers serialize writes
//! on a record and keep reads from overlapping them. [KeyIndex::restore]
//! and [KeyIndex::restore_tombstone] are the recovery entry points when
//! reloading persisted state.

use std::{error, fmt, result};

#[allow(unused_imports)]
use crate::mvcc::{Generation, KeyIndex, Revision, TreeIndex};

/// Type alias for Result returned by functions of this package.
pub type Result<T> = result::Result<T, Error>;

/// Error variants that can be returned by this package's API.
///
/// Each variant carries a prefix, typically identifying the error
/// location, followed by a message.
#[derive(Clone, Debug)]
pub enum Error {
    /// Requested revision is absent at the queried point: never written,
    /// fallen in the gap after a tombstone, compacted away, or shadowed
    /// by a tombstone.
    RevisionNotFound(String, String),
    /// Serialization or de-serialization failure.
    FailCbor(String, String),
    /// Fatal failure, breaking one of the index invariants.
    Fatal(String, String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        use Error::{FailCbor, Fatal, RevisionNotFound};

        match self {
            RevisionNotFound(p, msg) => write!(f, "{} RevisionNotFound: {}", p, msg),
            FailCbor(p, msg) => write!(f, "{} FailCbor: {}", p, msg),
            Fatal(p, msg) => write!(f, "{} Fatal: {}", p, msg),
        }
    }
}

impl error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        use Error::RevisionNotFound;

        match (self, other) {
            (RevisionNotFound(_, _), RevisionNotFound(_, _)) => true,
            _ => false,
        }
    }
}

/// Short form to compose Error values.
///
/// Here are few possible ways:
///
/// ```ignore
/// err_at!(RevisionNotFound, msg: "get at {}", at_rev)
/// ```
///
/// ```ignore
/// err_at!(FailCbor, cbor_value.encode(&mut buf))
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+) => {{
        let prefix = format!("{}:{}", file!(), line!());
        Err(Error::$v(prefix, format!($($arg),+)))
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                Err(Error::$v(prefix, format!("{}", err)))
            }
        }
    }};
    ($v:ident, $e:expr, $($arg:expr),+) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => {
                let prefix = format!("{}:{}", file!(), line!());
                let msg = format!($($arg),+);
                Err(Error::$v(prefix, format!("{} {}", err, msg)))
            }
        }
    }};
}

pub mod mvcc;
pub mod util;
