//! Tagged sort keys and the comparators over them.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::query::{SortField, SortOrder};

/// Per-document sort key, one variant per sort field type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SortKey {
    /// Relevance weight.
    Float(f32),
    /// Document rank.
    UInt(u32),
    /// Date packed as `YYYYMMDDHHMMSS`.
    ULong(u64),
    /// Numeric item value.
    Double(f64),
    /// Text item value.
    Text(String),
    None,
}

impl SortKey {
    /// Ascending comparison. Keys of different variants compare equal.
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::UInt(a), SortKey::UInt(b)) => a.cmp(b),
            (SortKey::ULong(a), SortKey::ULong(b)) => a.cmp(b),
            (SortKey::Double(a), SortKey::Double(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    /// The larger of two optional keys.
    pub fn max_of(current: Option<SortKey>, candidate: &SortKey) -> Option<SortKey> {
        if *candidate == SortKey::None {
            return current;
        }
        match current {
            Some(key) if key.compare(candidate) != Ordering::Less => Some(key),
            _ => Some(candidate.clone()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Float(weight) => write!(f, "{weight:.3}"),
            SortKey::UInt(rank) => write!(f, "{rank}"),
            SortKey::ULong(packed) => write!(f, "{packed}"),
            SortKey::Double(value) => write!(f, "{value}"),
            SortKey::Text(text) => write!(f, "{text}"),
            SortKey::None => f.write_str("-"),
        }
    }
}

/// Pack a date into its `ULong` sort key form.
pub fn pack_date(date: NaiveDateTime) -> u64 {
    let day = date.year().max(0) as u64 * 10_000 + date.month() as u64 * 100 + date.day() as u64;
    let time = date.hour() as u64 * 10_000 + date.minute() as u64 * 100 + date.second() as u64;
    day * 1_000_000 + time
}

/// Comparator applied to short results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    FloatAsc,
    FloatDesc,
    UIntAsc,
    UIntDesc,
    ULongAsc,
    ULongDesc,
    DoubleAsc,
    DoubleDesc,
    TextAsc,
    TextDesc,
    /// Keep postings order.
    NoSort,
}

impl SortType {
    pub fn is_descending(self) -> bool {
        matches!(
            self,
            SortType::FloatDesc
                | SortType::UIntDesc
                | SortType::ULongDesc
                | SortType::DoubleDesc
                | SortType::TextDesc
        )
    }

    /// Compare two keys in this sort's direction.
    pub fn compare(self, a: &SortKey, b: &SortKey) -> Ordering {
        match self {
            SortType::NoSort => Ordering::Equal,
            _ if self.is_descending() => b.compare(a),
            _ => a.compare(b),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SortType::FloatAsc => "relevance ascending",
            SortType::FloatDesc => "relevance descending",
            SortType::UIntAsc => "rank ascending",
            SortType::UIntDesc => "rank descending",
            SortType::ULongAsc => "date ascending",
            SortType::ULongDesc => "date descending",
            SortType::DoubleAsc => "numeric item ascending",
            SortType::DoubleDesc => "numeric item descending",
            SortType::TextAsc => "text item ascending",
            SortType::TextDesc => "text item descending",
            SortType::NoSort => "no sort",
        }
    }
}

/// Sort resolved once for a whole federated query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSort {
    pub field: SortField,
    pub order: SortOrder,
    pub sort_type: SortType,
}

impl ResolvedSort {
    /// Descending relevance.
    pub fn relevance() -> Self {
        ResolvedSort {
            field: SortField::Relevance,
            order: SortOrder::Descending,
            sort_type: SortType::FloatDesc,
        }
    }

    pub fn no_sort() -> Self {
        ResolvedSort {
            field: SortField::NoSort,
            order: SortOrder::Ascending,
            sort_type: SortType::NoSort,
        }
    }

    pub fn is_relevance(&self) -> bool {
        matches!(self.sort_type, SortType::FloatAsc | SortType::FloatDesc)
    }
}
