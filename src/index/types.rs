//! Value types exchanged with the index collaborators.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::postings::{DocumentId, TermType};
use crate::query::RangeComparison;

/// Field identifier. Identifiers are 1-based.
pub type FieldId = u32;

/// Dictionary match mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchMode {
    /// Exact dictionary lookup; yields at most one entry.
    Regular,
    Wildcard,
    Soundex,
    Metaphone,
    Phonix,
    Typo,
    /// Every term comparing to the lookup text as requested.
    Range(RangeComparison),
}

/// A concrete dictionary term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub term: String,
    pub term_type: TermType,
    pub term_count: u32,
    pub document_count: u32,
}

impl TermEntry {
    pub fn new<S: Into<String>>(term: S, term_type: TermType, term_count: u32, document_count: u32) -> Self {
        TermEntry {
            term: term.into(),
            term_type,
            term_count,
            document_count,
        }
    }
}

/// Per-field indexing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldOptions {
    pub stemming: bool,
    pub stop_terms: bool,
    pub positions: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions {
            stemming: false,
            stop_terms: true,
            positions: true,
        }
    }
}

/// Scalar counts of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: u32,
    /// Sum of the term counts of all documents.
    pub total_term_count: u64,
    pub unique_term_count: u32,
    pub field_id_max: FieldId,
}

impl IndexStats {
    pub fn average_term_count(&self) -> f32 {
        if self.document_count == 0 {
            0.0
        } else {
            self.total_term_count as f32 / self.document_count as f32
        }
    }
}

/// Value type of a registered item field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Number,
    Text,
}

/// A document item value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    Number(f64),
    Text(String),
}

/// Which metadata fields a fetch needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataSelector {
    pub key_and_title: bool,
    pub rank: bool,
    pub term_count: bool,
    pub date: bool,
    pub language: bool,
    /// Item field, by name.
    pub item: Option<String>,
}

impl MetadataSelector {
    /// Everything except item values.
    pub fn all() -> Self {
        MetadataSelector {
            key_and_title: true,
            rank: true,
            term_count: true,
            date: true,
            language: true,
            item: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == MetadataSelector::default()
    }
}

/// Document metadata; fields not selected are left at their default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: DocumentId,
    pub key: String,
    pub title: String,
    pub rank: u32,
    pub term_count: u32,
    pub date: Option<NaiveDateTime>,
    pub language: Option<String>,
    pub item: Option<ItemValue>,
}
