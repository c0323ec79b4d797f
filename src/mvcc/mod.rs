//! Module implement the Multi-Version-Concurrency-Control key index.
//!
//! For one user key, [KeyIndex] keeps the full history of revisions at
//! which the key was written or deleted, organized as a list of
//! [Generation] values. Each generation spans one life-cycle of the key,
//! from (re)creation up to the tombstone that deletes it; a trailing empty
//! generation marks a key that is currently deleted. [TreeIndex] maps the
//! whole key-space to its per-key records and exposes the store-wide
//! query and compaction surface.
//!
//! None of the types here are internally synchronized. The enclosing
//! storage engine is expected to serialize mutations and keep reads from
//! overlapping them, typically under a single writer lock around the
//! [TreeIndex].

mod generation;
mod key_index;
mod revision;
mod tree;

pub use generation::Generation;
pub use key_index::KeyIndex;
pub use revision::Revision;
pub use tree::TreeIndex;
