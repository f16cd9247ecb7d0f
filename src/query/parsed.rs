//! Whole parsed query: tree, modifiers, sort, restrictions and filters.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::OperationMode;
use crate::postings::DocumentId;
use crate::query::cluster::TermClusterNode;
use crate::query::term::RangeComparison;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn reverse(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// Requested sort field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Whatever the engine defaults to (descending relevance).
    #[default]
    Default,
    Relevance,
    Rank,
    Date,
    /// Keep postings order.
    NoSort,
    /// A document item field, by name.
    Item(String),
}

impl SortField {
    /// Resolve a sort field name as written in a query.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "" | "default" => SortField::Default,
            "relevance" => SortField::Relevance,
            "rank" => SortField::Rank,
            "date" => SortField::Date,
            "none" | "nosort" => SortField::NoSort,
            _ => SortField::Item(name.to_string()),
        }
    }

    /// Canonical name, used to compare against declared index sort orders.
    /// The default field is relevance.
    pub fn name(&self) -> &str {
        match self {
            SortField::Default | SortField::Relevance => "relevance",
            SortField::Rank => "rank",
            SortField::Date => "date",
            SortField::NoSort => "none",
            SortField::Item(name) => name,
        }
    }

    /// Order applied when the query does not give one.
    pub fn default_order(&self) -> SortOrder {
        match self {
            SortField::Item(_) => SortOrder::Ascending,
            _ => SortOrder::Descending,
        }
    }
}

/// Sort field and order requested by the query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub order: Option<SortOrder>,
}

impl SortSpec {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        SortSpec {
            field,
            order: Some(order),
        }
    }

    pub fn effective_order(&self) -> SortOrder {
        self.order.unwrap_or_else(|| self.field.default_order())
    }
}

/// Query-level modifiers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryModifiers {
    /// Overrides the configured operation mode.
    pub operation_mode: Option<OperationMode>,
    /// Query-level term weight.
    pub term_weight: Option<f32>,
    /// Keep every term at full weight, disabling the frequent-term threshold.
    pub retain_terms: bool,
    /// Allow federation to stop before every member index is searched.
    pub early_completion: bool,
    /// Count only: results are discarded, the total is kept.
    pub suppress_results: bool,
    /// Attach the search report to the response.
    pub return_report: bool,
    /// Include the full normalized query rendering in the report.
    pub debug: bool,
}

/// A date constraint on documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRestriction {
    pub comparison: RangeComparison,
    pub date: NaiveDateTime,
}

impl DateRestriction {
    pub fn new(comparison: RangeComparison, date: NaiveDateTime) -> Self {
        DateRestriction { comparison, date }
    }

    pub fn accepts(&self, date: NaiveDateTime) -> bool {
        self.comparison.accepts(date.cmp(&self.date))
    }
}

/// Date and language restrictions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Restrictions {
    /// Every date restriction must pass.
    pub dates: Vec<DateRestriction>,
    /// Document language must match one entry.
    pub languages: Vec<String>,
}

impl Restrictions {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty() && self.languages.is_empty()
    }
}

/// A filter predicate, turned into a document bitmap per index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FilterPredicate {
    DocumentIds(Vec<DocumentId>),
    /// Resolved through the index key dictionary.
    DocumentKeys(Vec<String>),
    /// Documents matching a term-cluster tree.
    Query(TermClusterNode),
}

/// Predicates OR-combined into one inclusion group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterGroup(pub Vec<FilterPredicate>);

/// The parser's output for one query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedQuery {
    pub tree: Option<TermClusterNode>,
    /// Normalized rendering. It must render every modifier, restriction and
    /// filter, since it keys the query cache.
    pub normalized_text: String,
    /// Diagnostic rendering, reported in debug mode.
    pub full_normalized_text: Option<String>,
    pub modifiers: QueryModifiers,
    pub sort: SortSpec,
    pub restrictions: Restrictions,
    /// OR-combined: a document matching any predicate is excluded.
    pub exclusion_filters: Vec<FilterPredicate>,
    /// AND-combined across groups.
    pub inclusion_filters: Vec<FilterGroup>,
    /// Fields searched by unfielded terms.
    pub unfielded_fields: Vec<String>,
}

impl ParsedQuery {
    /// A query for the given tree.
    pub fn from_tree<S: Into<String>>(tree: TermClusterNode, normalized_text: S) -> Self {
        ParsedQuery {
            tree: Some(tree),
            normalized_text: normalized_text.into(),
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_modifiers(mut self, modifiers: QueryModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_restrictions(mut self, restrictions: Restrictions) -> Self {
        self.restrictions = restrictions;
        self
    }

    pub fn term_count(&self) -> usize {
        self.tree.as_ref().map_or(0, TermClusterNode::term_count)
    }

    pub fn has_filters(&self) -> bool {
        !self.exclusion_filters.is_empty() || !self.inclusion_filters.is_empty()
    }

    /// Dates, languages or filters without any terms.
    pub fn is_restriction_only(&self) -> bool {
        self.tree.is_none() && (!self.restrictions.is_empty() || self.has_filters())
    }
}
