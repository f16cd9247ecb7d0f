//! Index collaborators consumed by the search core.
//!
//! The on-disk index is an external component. The traits in [`traits`]
//! define what the search core consumes from it; [`memory::MemoryIndex`] is an
//! in-memory implementation used by tests, benches and the CLI.

pub mod memory;
pub mod stemmer;
pub mod traits;
pub mod types;
pub mod virtual_index;

pub use self::memory::{
    FieldSpec, MemoryCatalog, MemoryDocument, MemoryIndex, MemoryIndexBuilder, MemoryIndexSpec,
};
pub use self::traits::{
    DocumentStore, IndexInfo, IndexOpener, PostingsStore, SearchIndex, TermDictionary,
};
pub use self::types::{
    DocumentMetadata, FieldId, FieldOptions, IndexStats, ItemType, ItemValue, MatchMode,
    MetadataSelector, TermEntry,
};
pub use self::virtual_index::{DeclaredSortOrder, MemberSpec, VirtualIndexMember, VirtualIndexSpec};
