//! # searchcore
//!
//! Query execution core of a full-text search engine.
//!
//! ## Features
//!
//! - Term resolution with stemming, field scoping and dictionary expansion
//! - Boolean and proximity postings merges (AND, OR, IOR, XOR, NOT, ADJ, NEAR)
//! - Strict and relaxed operation modes
//! - Relevance feedback, inclusion and exclusion filters
//! - Relevance, rank, date and item sorting with pagination
//! - Federated search over virtual indices with early completion
//! - Term-level and query-level result caching

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod postings;
pub mod query;
pub mod report;
pub mod search;
pub mod util;

pub mod prelude {
    pub use crate::cache::{CacheStats, SearchCache};
    pub use crate::config::{OperationMode, SearchConfig, WeightNormalization};
    pub use crate::error::{Result, SearchError};
    pub use crate::index::{
        DeclaredSortOrder, MemoryDocument, MemoryIndex, MemoryIndexBuilder, SearchIndex,
        VirtualIndexSpec,
    };
    pub use crate::postings::{Operator, PostingsList};
    pub use crate::query::{ParsedQuery, SortField, SortOrder, SortSpec, Term, TermClusterNode};
    pub use crate::report::SearchReport;
    pub use crate::search::{DocumentHit, SearchRequest, SearchResponse, Searcher, SortKey};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
