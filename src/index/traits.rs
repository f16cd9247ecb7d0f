//! Collaborator traits.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::index::types::{
    DocumentMetadata, FieldId, FieldOptions, IndexStats, ItemType, MatchMode, MetadataSelector,
    TermEntry,
};
use crate::postings::{DocIdBounds, DocumentId, PostingsList};
use crate::util::Bitmap;

/// Term dictionary lookup.
pub trait TermDictionary {
    /// Dictionary terms matching `text` under `mode`, optionally restricted to
    /// the fields set in `fields`.
    ///
    /// Fails with [`SearchError::TermNotFound`](crate::error::SearchError::TermNotFound)
    /// when nothing matches and with
    /// [`SearchError::TermDoesNotOccur`](crate::error::SearchError::TermDoesNotOccur)
    /// when the term exists but not in the requested fields.
    fn lookup_terms(
        &self,
        text: &str,
        fields: Option<&Bitmap>,
        mode: MatchMode,
    ) -> Result<Vec<TermEntry>>;
}

/// Postings retrieval.
pub trait PostingsStore {
    /// Postings of a resolved term within `bounds`.
    fn postings(
        &self,
        entry: &TermEntry,
        fields: Option<&Bitmap>,
        bounds: DocIdBounds,
    ) -> Result<PostingsList>;
}

/// Document metadata and key dictionary.
pub trait DocumentStore {
    fn document(&self, document_id: DocumentId, selector: &MetadataSelector)
    -> Result<DocumentMetadata>;

    fn document_id_for_key(&self, key: &str) -> Result<Option<DocumentId>>;
}

/// Index metadata.
pub trait IndexInfo {
    fn name(&self) -> &str;

    fn stats(&self) -> IndexStats;

    fn field_id(&self, name: &str) -> Option<FieldId>;

    fn field_options(&self, field_id: FieldId) -> Option<FieldOptions>;

    /// Fields searched by unfielded terms when the query names none.
    fn default_unfielded_fields(&self) -> Vec<String>;

    /// Whether unfielded terms are stemmed.
    fn stemming_enabled(&self) -> bool;

    /// Stemmed form of a lower-case term, if the index has a stemmer.
    fn stem(&self, term: &str) -> Option<String>;

    fn language(&self) -> Option<&str> {
        None
    }

    fn stemmer_name(&self) -> Option<&str> {
        None
    }

    fn stop_list_name(&self) -> Option<&str> {
        None
    }

    /// Registered type of an item field.
    fn item_type(&self, name: &str) -> Option<ItemType>;
}

/// A physical index as seen by the search core. Implemented for every type
/// providing the collaborator traits.
pub trait SearchIndex:
    TermDictionary + PostingsStore + DocumentStore + IndexInfo + Send + Sync + Debug
{
}

impl<T> SearchIndex for T where
    T: TermDictionary + PostingsStore + DocumentStore + IndexInfo + Send + Sync + Debug
{
}

/// Opens physical indices by name.
pub trait IndexOpener {
    fn open(&self, name: &str) -> Result<Arc<dyn SearchIndex>>;
}
