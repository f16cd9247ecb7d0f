//! Configuration for query evaluation, ranking and federation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// Default NEAR window when a cluster does not carry its own distance.
pub const DEFAULT_NEAR_DISTANCE: u32 = 10;

/// Weight used when nothing more specific is configured.
pub const DEFAULT_TERM_WEIGHT: f32 = 1.0;

/// How an empty operand of an AND/NOT/ADJ/NEAR chain is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Any empty non-stop operand empties the whole chain.
    #[default]
    Strict,
    /// Only an empty operand flagged as required empties the chain; other
    /// empty operands are skipped.
    Relaxed,
}

/// Document-length weight normalization applied by the ranker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightNormalization {
    /// Weights are used as-is.
    Raw,
    /// Weight scaled by average document length over document length.
    Average,
    /// Weight divided by `1 + ln(term_count)`.
    #[default]
    Log,
    /// Weight divided by `1 + log2(term_count)`.
    Log2,
}

impl WeightNormalization {
    /// Normalize `weight` for a document of `term_count` terms in an index
    /// whose average document holds `average_term_count` terms.
    pub fn apply(self, weight: f32, term_count: u32, average_term_count: f32) -> f32 {
        if term_count == 0 {
            return weight;
        }
        let length = term_count as f32;
        match self {
            WeightNormalization::Raw => weight,
            WeightNormalization::Average => {
                if average_term_count > 0.0 {
                    weight * (average_term_count / length)
                } else {
                    weight
                }
            }
            WeightNormalization::Log => weight / (1.0 + length.ln()),
            WeightNormalization::Log2 => weight / (1.0 + length.log2()),
        }
    }
}

/// Configuration for the search core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Configuration default term weight, used when neither the term nor the
    /// query sets one.
    pub default_term_weight: Option<f32>,

    /// Fraction of the collection a single term may cover before it is
    /// treated as frequent. Zero disables the check.
    pub frequent_term_coverage: f32,

    /// Multiplier applied to the posting weights of frequent terms.
    pub frequent_term_weight_factor: f32,

    /// NEAR distance used when a cluster does not carry one.
    pub near_default_distance: u32,

    /// Default boolean operation mode.
    pub operation_mode: OperationMode,

    /// Document-length weight normalization scheme.
    pub weight_normalization: WeightNormalization,

    /// Whether member indices of a virtual index are searched on a worker pool.
    pub parallel_federation: bool,

    /// Worker pool size for parallel federation.
    /// If None, uses the number of CPU cores.
    pub thread_pool_size: Option<usize>,

    /// Maximum number of term cache entries. Zero disables the term cache.
    pub term_cache_capacity: usize,

    /// Maximum number of query cache entries. Zero disables the query cache.
    pub query_cache_capacity: usize,

    /// Caller-level timeout, checked between member index searches.
    pub search_timeout: Option<Duration>,

    /// Unfielded search fields used when neither the query nor the index
    /// names any.
    pub default_unfielded_fields: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_term_weight: None,
            frequent_term_coverage: 0.0,
            frequent_term_weight_factor: 0.1,
            near_default_distance: DEFAULT_NEAR_DISTANCE,
            operation_mode: OperationMode::Strict,
            weight_normalization: WeightNormalization::Log,
            parallel_federation: false,
            thread_pool_size: None,
            term_cache_capacity: 4096,
            query_cache_capacity: 512,
            search_timeout: None,
            default_unfielded_fields: Vec::new(),
        }
    }
}

impl SearchConfig {
    /// Load a configuration from a JSON file. Missing keys take their default.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: SearchConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.frequent_term_coverage) {
            return Err(SearchError::config(format!(
                "frequent_term_coverage must be within [0, 1], got {}",
                self.frequent_term_coverage
            )));
        }
        if self.frequent_term_weight_factor < 0.0 {
            return Err(SearchError::config(
                "frequent_term_weight_factor must not be negative",
            ));
        }
        if self.near_default_distance == 0 {
            return Err(SearchError::config("near_default_distance must be positive"));
        }
        if let Some(weight) = self.default_term_weight {
            if weight <= 0.0 {
                return Err(SearchError::config(format!(
                    "default_term_weight must be positive, got {weight}"
                )));
            }
        }
        if self.thread_pool_size == Some(0) {
            return Err(SearchError::config("thread_pool_size must be positive"));
        }
        Ok(())
    }

    /// Set the frequent-term coverage threshold.
    pub fn with_frequent_term_coverage(mut self, coverage: f32) -> Self {
        self.frequent_term_coverage = coverage;
        self
    }

    /// Set the configuration default term weight.
    pub fn with_default_term_weight(mut self, weight: f32) -> Self {
        self.default_term_weight = Some(weight);
        self
    }

    /// Set the default operation mode.
    pub fn with_operation_mode(mut self, mode: OperationMode) -> Self {
        self.operation_mode = mode;
        self
    }

    /// Set the weight normalization scheme.
    pub fn with_weight_normalization(mut self, normalization: WeightNormalization) -> Self {
        self.weight_normalization = normalization;
        self
    }

    /// Enable or disable parallel federation.
    pub fn with_parallel_federation(mut self, parallel: bool) -> Self {
        self.parallel_federation = parallel;
        self
    }

    /// Set the cache capacities.
    pub fn with_cache_capacity(mut self, terms: usize, queries: usize) -> Self {
        self.term_cache_capacity = terms;
        self.query_cache_capacity = queries;
        self
    }

    /// Set the caller-level timeout.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = Some(timeout);
        self
    }

    /// Effective worker count for parallel federation.
    pub fn effective_thread_pool_size(&self) -> usize {
        self.thread_pool_size.unwrap_or_else(num_cpus::get)
    }
}
