//! Field rule validation & semantic normalization engine.
//!
//! Pure, synchronous, in-memory: takes a document snapshot, a batch of
//! proposed updates, the rule catalog, and the allow-list, and returns a
//! new flat document plus a structured issue list. No I/O, no shared
//! state; persistence belongs to the store adapter.

pub mod flatten;
pub mod merge;
pub mod normalize;
pub mod rules;
