//! Postings list representation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Document identifier. Identifiers are 1-based; 0 never names a document.
pub type DocumentId = u32;

/// One occurrence of a term in a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// The document ID.
    pub document_id: DocumentId,
    /// Position of the occurrence within the document.
    pub term_position: u32,
    /// Weight contributed by this occurrence.
    pub weight: f32,
}

impl Posting {
    /// Create a new posting.
    pub fn new(document_id: DocumentId, term_position: u32, weight: f32) -> Self {
        Posting {
            document_id,
            term_position,
            weight,
        }
    }

    fn order(&self, other: &Posting) -> Ordering {
        self.document_id
            .cmp(&other.document_id)
            .then(self.term_position.cmp(&other.term_position))
    }
}

/// Classification of the term a postings list was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermType {
    #[default]
    Unknown,
    Regular,
    Stop,
    Frequent,
}

/// Inclusive document-ID range used to bound term resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocIdBounds {
    pub start: DocumentId,
    pub end: DocumentId,
}

impl DocIdBounds {
    /// Bounds covering every document.
    pub const UNBOUNDED: DocIdBounds = DocIdBounds {
        start: 0,
        end: DocumentId::MAX,
    };

    pub fn new(start: DocumentId, end: DocumentId) -> Self {
        DocIdBounds { start, end }
    }

    pub fn contains(&self, document_id: DocumentId) -> bool {
        self.start <= document_id && document_id <= self.end
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }
}

impl Default for DocIdBounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Postings sorted ascending by (document ID, term position).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostingsList {
    /// Type of the term (or merged terms) this list was produced for.
    pub term_type: TermType,
    /// Number of postings.
    pub term_count: u32,
    /// Number of distinct documents.
    pub document_count: u32,
    /// Whether the term was flagged as required by the query.
    pub required: bool,
    /// The dictionary has no entry for the term. Unlike emptiness this does
    /// not depend on the document-ID bounds the list was resolved in.
    #[serde(default)]
    pub absent: bool,
    postings: Vec<Posting>,
}

impl PostingsList {
    /// Create an empty list.
    pub fn empty(term_type: TermType) -> Self {
        PostingsList {
            term_type,
            ..Default::default()
        }
    }

    /// Create a list from postings in any order. The postings are sorted,
    /// duplicate (document, position) pairs collapsed and the counts computed.
    pub fn from_postings(term_type: TermType, postings: Vec<Posting>) -> Self {
        let mut list = PostingsList {
            term_type,
            postings,
            ..Default::default()
        };
        list.sort_and_dedup();
        list
    }

    /// Create a list from postings already sorted and free of duplicates.
    pub(crate) fn from_sorted(term_type: TermType, postings: Vec<Posting>) -> Self {
        debug_assert!(
            postings
                .windows(2)
                .all(|w| w[0].order(&w[1]) == Ordering::Less)
        );
        let mut list = PostingsList {
            term_type,
            postings,
            ..Default::default()
        };
        list.recount();
        list
    }

    /// Concatenate the lists of expanded terms into a single list.
    pub fn concat<I>(term_type: TermType, lists: I) -> Self
    where
        I: IntoIterator<Item = PostingsList>,
    {
        let mut postings = Vec::new();
        for list in lists {
            postings.extend(list.postings);
        }
        Self::from_postings(term_type, postings)
    }

    /// Sort by (document, position), keep the heavier of duplicate
    /// occurrences and recompute the counts.
    pub fn sort_and_dedup(&mut self) {
        self.postings.sort_by(|a, b| a.order(b));
        self.postings.dedup_by(|later, kept| {
            if later.document_id == kept.document_id && later.term_position == kept.term_position {
                kept.weight = kept.weight.max(later.weight);
                true
            } else {
                false
            }
        });
        self.recount();
    }

    /// Recompute the term count and the document count, the latter by
    /// counting document-ID run boundaries.
    pub fn recount(&mut self) {
        self.term_count = self.postings.len() as u32;
        self.document_count = self.documents().count() as u32;
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_absent(mut self, absent: bool) -> Self {
        self.absent = absent;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn is_stop(&self) -> bool {
        self.term_type == TermType::Stop
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    pub fn into_postings(self) -> Vec<Posting> {
        self.postings
    }

    /// Runs of postings sharing a document ID.
    pub fn documents(&self) -> impl Iterator<Item = &[Posting]> {
        self.postings
            .chunk_by(|a, b| a.document_id == b.document_id)
    }

    /// Distinct document IDs in ascending order.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.documents().map(|run| run[0].document_id).collect()
    }

    /// Per-document sum of the posting weights.
    pub fn document_weights(&self) -> Vec<(DocumentId, f32)> {
        self.documents()
            .map(|run| (run[0].document_id, run.iter().map(|p| p.weight).sum()))
            .collect()
    }

    /// First and last document ID, if the list is not empty.
    pub fn document_bounds(&self) -> Option<DocIdBounds> {
        match (self.postings.first(), self.postings.last()) {
            (Some(first), Some(last)) => Some(DocIdBounds::new(first.document_id, last.document_id)),
            _ => None,
        }
    }

    /// Multiply every posting weight by `factor`.
    pub fn scale_weights(&mut self, factor: f32) {
        for posting in &mut self.postings {
            posting.weight *= factor;
        }
    }

    /// Drop postings outside `bounds`.
    pub fn retain_bounds(&mut self, bounds: DocIdBounds) {
        if bounds.is_unbounded() {
            return;
        }
        self.postings.retain(|p| bounds.contains(p.document_id));
        self.recount();
    }
}
