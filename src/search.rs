//! Query evaluation and result assembly.
//!
//! A search runs per member index: terms are resolved ([`resolver`]) and
//! merged along the query tree ([`evaluator`]), feedback and filters are
//! applied ([`feedback`], [`filter`]), and candidates are ranked
//! ([`ranker`]). The [`federation`] controller drives this across the members
//! of a virtual index and assembles the [`response`].

pub mod evaluator;
pub mod federation;
pub mod feedback;
pub mod filter;
pub mod ranker;
pub mod resolver;
pub mod response;
pub mod sort_key;

pub use self::evaluator::QueryEvaluator;
pub use self::federation::{SearchRequest, Searcher};
pub use self::feedback::WeightArray;
pub use self::filter::DocumentFilters;
pub use self::ranker::{RankedResults, ShortResult};
pub use self::resolver::{ResolveOptions, TermResolver};
pub use self::response::{DocumentHit, SearchResponse};
pub use self::sort_key::{ResolvedSort, SortKey, SortType};

use crate::cache::SearchCache;
use crate::config::SearchConfig;
use crate::report::SearchReport;

/// State shared by the components of one search over one index.
#[derive(Debug)]
pub struct SearchContext<'a> {
    pub config: &'a SearchConfig,
    pub cache: Option<&'a SearchCache>,
    pub language: &'a str,
    pub report: SearchReport,
}

impl<'a> SearchContext<'a> {
    pub fn new(config: &'a SearchConfig, cache: Option<&'a SearchCache>, language: &'a str) -> Self {
        SearchContext {
            config,
            cache,
            language,
            report: SearchReport::new(),
        }
    }
}
