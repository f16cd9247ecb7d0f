//! Search response types.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::postings::DocumentId;
use crate::search::sort_key::{SortKey, SortType};

/// A hydrated result document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHit {
    /// Physical index the document belongs to.
    pub index_name: String,
    pub document_id: DocumentId,
    /// Document key; `"index/key"` for virtual indices.
    pub key: String,
    pub title: String,
    pub rank: u32,
    pub term_count: u32,
    pub date: Option<NaiveDateTime>,
    pub language: Option<String>,
    pub sort_key: SortKey,
}

/// Result of one search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The requested window of results.
    pub hits: Vec<DocumentHit>,
    /// Total matching documents, possibly extrapolated.
    pub total_results: usize,
    /// Whether `total_results` is an early-completion estimate.
    pub estimated: bool,
    pub start_index: usize,
    pub end_index: usize,
    pub sort_type: SortType,
    pub max_sort_key: Option<SortKey>,
    pub elapsed: Duration,
    /// Search report, attached when the query asks for it.
    pub report: Option<String>,
    #[serde(skip)]
    report_text: String,
}

impl SearchResponse {
    pub(crate) fn new(
        hits: Vec<DocumentHit>,
        total_results: usize,
        start_index: usize,
        end_index: usize,
        sort_type: SortType,
    ) -> Self {
        SearchResponse {
            hits,
            total_results,
            estimated: false,
            start_index,
            end_index,
            sort_type,
            max_sort_key: None,
            elapsed: Duration::ZERO,
            report: None,
            report_text: String::new(),
        }
    }

    /// Attach the report text; exposed as `report` when `attach` is set.
    pub(crate) fn with_report(mut self, report: String, attach: bool) -> Self {
        if attach {
            self.report = Some(report.clone());
        }
        self.report_text = report;
        self
    }

    /// Full report text, whether or not it was attached.
    pub fn report_text(&self) -> &str {
        &self.report_text
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
