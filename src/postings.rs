//! Postings lists and the boolean/proximity merger.

pub mod list;
pub mod merge;

pub use self::list::{DocIdBounds, DocumentId, Posting, PostingsList, TermType};
pub use self::merge::{MergeParams, Operator, merge, should_short_circuit};
