//! In-memory index implementing every collaborator trait.
//!
//! Documents are tokenized into lower-case words. Stop words keep their
//! position but are not indexed; fields with stemming additionally index the
//! stemmed form at the same position. Posting weights are
//! `1 + ln(document_count / document_frequency)`.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, SearchError};
use crate::index::stemmer::{Stemmer, SuffixStemmer};
use crate::index::traits::{
    DocumentStore, IndexInfo, IndexOpener, PostingsStore, SearchIndex, TermDictionary,
};
use crate::index::types::{
    DocumentMetadata, FieldId, FieldOptions, IndexStats, ItemType, ItemValue, MatchMode,
    MetadataSelector, TermEntry,
};
use crate::postings::{DocIdBounds, DocumentId, Posting, PostingsList, TermType};
use crate::util::Bitmap;
use crate::util::levenshtein::{levenshtein_distance_threshold, typo_threshold};
use crate::util::soundex::soundex;

/// Position gap inserted between fields so proximity never spans two fields.
const FIELD_POSITION_GAP: u32 = 100;

/// A document to be indexed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryDocument {
    pub key: String,
    pub title: String,
    /// Searchable text by field name.
    pub fields: BTreeMap<String, String>,
    pub rank: u32,
    pub date: Option<NaiveDateTime>,
    pub language: Option<String>,
    pub items: BTreeMap<String, ItemValue>,
}

impl MemoryDocument {
    pub fn new<S: Into<String>>(key: S) -> Self {
        MemoryDocument {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_field<F: Into<String>, T: Into<String>>(mut self, field: F, text: T) -> Self {
        self.fields.insert(field.into(), text.into());
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_item<S: Into<String>>(mut self, name: S, value: ItemValue) -> Self {
        self.items.insert(name.into(), value);
        self
    }
}

/// A field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(flatten)]
    pub options: FieldOptions,
}

/// Serializable description of a whole in-memory index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryIndexSpec {
    pub name: String,
    pub fields: Vec<FieldSpec>,
    pub stop_words: Vec<String>,
    pub default_unfielded_fields: Vec<String>,
    pub language: Option<String>,
    /// Whether unfielded terms are stemmed.
    pub stemming: bool,
    pub items: BTreeMap<String, ItemType>,
    pub documents: Vec<MemoryDocument>,
}

/// Builder for [`MemoryIndex`].
#[derive(Debug, Clone, Default)]
pub struct MemoryIndexBuilder {
    spec: MemoryIndexSpec,
}

impl MemoryIndexBuilder {
    pub fn new<S: Into<String>>(name: S) -> Self {
        MemoryIndexBuilder {
            spec: MemoryIndexSpec {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    pub fn field<S: Into<String>>(mut self, name: S, options: FieldOptions) -> Self {
        self.spec.fields.push(FieldSpec {
            name: name.into(),
            options,
        });
        self
    }

    pub fn stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.stop_words.extend(words.into_iter().map(Into::into));
        self
    }

    pub fn default_unfielded_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.default_unfielded_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn language<S: Into<String>>(mut self, language: S) -> Self {
        self.spec.language = Some(language.into());
        self
    }

    pub fn stemming(mut self, stemming: bool) -> Self {
        self.spec.stemming = stemming;
        self
    }

    pub fn item<S: Into<String>>(mut self, name: S, item_type: ItemType) -> Self {
        self.spec.items.insert(name.into(), item_type);
        self
    }

    pub fn document(mut self, document: MemoryDocument) -> Self {
        self.spec.documents.push(document);
        self
    }

    pub fn documents<I>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = MemoryDocument>,
    {
        self.spec.documents.extend(documents);
        self
    }

    pub fn build(self) -> Result<MemoryIndex> {
        MemoryIndex::from_spec(self.spec)
    }
}

#[derive(Debug, Clone, Copy)]
struct Occurrence {
    document_id: DocumentId,
    field_id: FieldId,
    position: u32,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    key: String,
    title: String,
    rank: u32,
    term_count: u32,
    date: Option<NaiveDateTime>,
    language: Option<String>,
    items: BTreeMap<String, ItemValue>,
}

/// In-memory index.
#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    fields: Vec<FieldSpec>,
    field_ids: AHashMap<String, FieldId>,
    stop_words: AHashSet<String>,
    default_unfielded_fields: Vec<String>,
    language: Option<String>,
    stemming: bool,
    stemmer: SuffixStemmer,
    items: AHashMap<String, ItemType>,
    documents: Vec<StoredDocument>,
    keys: AHashMap<String, DocumentId>,
    /// Occurrences sorted by (document, position).
    dictionary: BTreeMap<String, Vec<Occurrence>>,
    total_term_count: u64,
}

impl MemoryIndex {
    /// Build an index from its description.
    pub fn from_spec(spec: MemoryIndexSpec) -> Result<Self> {
        if spec.name.is_empty() {
            return Err(SearchError::index("index name must not be empty"));
        }

        let mut index = MemoryIndex {
            name: spec.name,
            fields: Vec::new(),
            field_ids: AHashMap::new(),
            stop_words: spec.stop_words.iter().map(|w| w.to_lowercase()).collect(),
            default_unfielded_fields: spec.default_unfielded_fields,
            language: spec.language,
            stemming: spec.stemming,
            stemmer: SuffixStemmer::new(),
            items: spec.items.into_iter().collect(),
            documents: Vec::with_capacity(spec.documents.len()),
            keys: AHashMap::new(),
            dictionary: BTreeMap::new(),
            total_term_count: 0,
        };
        for field in spec.fields {
            index.declare_field(field.name, field.options)?;
        }
        for document in spec.documents {
            index.add_document(document)?;
        }
        Ok(index)
    }

    /// Load an index description from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let spec: MemoryIndexSpec = serde_json::from_str(&text)?;
        Self::from_spec(spec)
    }

    fn declare_field(&mut self, name: String, options: FieldOptions) -> Result<FieldId> {
        if self.field_ids.contains_key(&name) {
            return Err(SearchError::index(format!("field '{name}' declared twice")));
        }
        let id = self.fields.len() as FieldId + 1;
        self.field_ids.insert(name.clone(), id);
        self.fields.push(FieldSpec { name, options });
        Ok(id)
    }

    fn add_document(&mut self, document: MemoryDocument) -> Result<()> {
        let document_id = self.documents.len() as DocumentId + 1;
        if self.keys.insert(document.key.clone(), document_id).is_some() {
            return Err(SearchError::index(format!(
                "duplicate document key '{}'",
                document.key
            )));
        }

        let mut position = 0u32;
        let mut term_count = 0u32;
        for (field_name, text) in &document.fields {
            let field_id = match self.field_ids.get(field_name) {
                Some(id) => *id,
                None => self.declare_field(field_name.clone(), FieldOptions::default())?,
            };
            let options = self.fields[field_id as usize - 1].options;

            for word in text.unicode_words() {
                let lower = word.to_lowercase();
                term_count += 1;
                if options.stop_terms && self.stop_words.contains(&lower) {
                    position += 1;
                    continue;
                }
                let occurrence = Occurrence {
                    document_id,
                    field_id,
                    position,
                };
                if options.stemming {
                    let stem = self.stemmer.stem(&lower);
                    if stem != lower {
                        self.dictionary.entry(stem).or_default().push(occurrence);
                    }
                }
                self.dictionary.entry(lower).or_default().push(occurrence);
                position += 1;
            }
            position += FIELD_POSITION_GAP;
        }

        self.total_term_count += term_count as u64;
        self.documents.push(StoredDocument {
            key: document.key,
            title: document.title,
            rank: document.rank,
            term_count,
            date: document.date,
            language: document.language,
            items: document.items,
        });
        Ok(())
    }

    fn occurrences<'a>(
        &'a self,
        term: &'a str,
        fields: Option<&'a Bitmap>,
    ) -> impl Iterator<Item = &'a Occurrence> + 'a {
        self.dictionary
            .get(term)
            .into_iter()
            .flatten()
            .filter(move |o| fields.is_none_or(|f| f.contains(o.field_id)))
    }

    fn entry_for(&self, term: &str, fields: Option<&Bitmap>) -> Option<TermEntry> {
        let mut term_count = 0u32;
        let mut document_count = 0u32;
        let mut last_document = 0;
        for occurrence in self.occurrences(term, fields) {
            term_count += 1;
            if occurrence.document_id != last_document {
                document_count += 1;
                last_document = occurrence.document_id;
            }
        }
        (term_count > 0)
            .then(|| TermEntry::new(term, TermType::Regular, term_count, document_count))
    }

    fn expand<F>(&self, text: &str, fields: Option<&Bitmap>, matches: F) -> Result<Vec<TermEntry>>
    where
        F: Fn(&str) -> bool,
    {
        let entries: Vec<TermEntry> = self
            .dictionary
            .keys()
            .filter(|term| matches(term))
            .filter_map(|term| self.entry_for(term, fields))
            .collect();
        if entries.is_empty() {
            Err(SearchError::term_not_found(text))
        } else {
            Ok(entries)
        }
    }

    fn document_frequency(&self, term: &str) -> u32 {
        self.entry_for(term, None).map_or(0, |e| e.document_count)
    }
}

/// Compile a wildcard pattern (`*` any run, `?` one character, `\` escapes)
/// into an anchored regex.
fn compile_wildcard(pattern: &str) -> Result<Regex> {
    let mut regex_pattern = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => regex_pattern.push_str(&regex::escape(&escaped.to_string())),
                None => regex_pattern.push_str("\\\\"),
            },
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            c => regex_pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex_pattern.push('$');
    Regex::new(&regex_pattern)
        .map_err(|e| SearchError::dictionary(format!("invalid wildcard pattern: {e}")))
}

impl TermDictionary for MemoryIndex {
    fn lookup_terms(
        &self,
        text: &str,
        fields: Option<&Bitmap>,
        mode: MatchMode,
    ) -> Result<Vec<TermEntry>> {
        let lower = text.to_lowercase();
        match mode {
            MatchMode::Regular => {
                if self.stop_words.contains(&lower) {
                    return Ok(vec![TermEntry::new(lower, TermType::Stop, 0, 0)]);
                }
                if !self.dictionary.contains_key(&lower) {
                    return Err(SearchError::term_not_found(text));
                }
                match self.entry_for(&lower, fields) {
                    Some(entry) => Ok(vec![entry]),
                    None => Err(SearchError::term_does_not_occur(text)),
                }
            }
            MatchMode::Wildcard => {
                let regex = compile_wildcard(&lower)?;
                self.expand(text, fields, |term| regex.is_match(term))
            }
            MatchMode::Soundex => {
                let code = soundex(&lower).ok_or_else(|| SearchError::term_not_found(text))?;
                self.expand(text, fields, |term| soundex(term).as_ref() == Some(&code))
            }
            MatchMode::Typo => {
                let threshold = typo_threshold(&lower);
                self.expand(text, fields, |term| {
                    levenshtein_distance_threshold(term, &lower, threshold).is_some()
                })
            }
            MatchMode::Range(comparison) => {
                self.expand(text, fields, |term| comparison.accepts(term.cmp(lower.as_str())))
            }
            MatchMode::Metaphone | MatchMode::Phonix => Err(SearchError::unsupported(format!(
                "{mode:?} lookups are not provided by the in-memory index"
            ))),
        }
    }
}

impl PostingsStore for MemoryIndex {
    fn postings(
        &self,
        entry: &TermEntry,
        fields: Option<&Bitmap>,
        bounds: DocIdBounds,
    ) -> Result<PostingsList> {
        if entry.term_type == TermType::Stop {
            return Ok(PostingsList::empty(TermType::Stop));
        }
        let document_frequency = self.document_frequency(&entry.term);
        if document_frequency == 0 {
            return Err(SearchError::term_does_not_occur(entry.term.clone()));
        }
        let weight = 1.0 + (self.documents.len() as f32 / document_frequency as f32).ln();
        let postings = self
            .occurrences(&entry.term, fields)
            .filter(|o| bounds.contains(o.document_id))
            .map(|o| Posting::new(o.document_id, o.position, weight))
            .collect();
        Ok(PostingsList::from_postings(TermType::Regular, postings))
    }
}

impl DocumentStore for MemoryIndex {
    fn document(
        &self,
        document_id: DocumentId,
        selector: &MetadataSelector,
    ) -> Result<DocumentMetadata> {
        let stored = document_id
            .checked_sub(1)
            .and_then(|i| self.documents.get(i as usize))
            .ok_or_else(|| {
                SearchError::index(format!(
                    "document {document_id} does not exist in index '{}'",
                    self.name
                ))
            })?;

        let mut metadata = DocumentMetadata {
            document_id,
            ..Default::default()
        };
        if selector.key_and_title {
            metadata.key = stored.key.clone();
            metadata.title = stored.title.clone();
        }
        if selector.rank {
            metadata.rank = stored.rank;
        }
        if selector.term_count {
            metadata.term_count = stored.term_count;
        }
        if selector.date {
            metadata.date = stored.date;
        }
        if selector.language {
            metadata.language = stored.language.clone().or_else(|| self.language.clone());
        }
        if let Some(item) = &selector.item {
            metadata.item = stored.items.get(item).cloned();
        }
        Ok(metadata)
    }

    fn document_id_for_key(&self, key: &str) -> Result<Option<DocumentId>> {
        Ok(self.keys.get(key).copied())
    }
}

impl IndexInfo for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            document_count: self.documents.len() as u32,
            total_term_count: self.total_term_count,
            unique_term_count: self.dictionary.len() as u32,
            field_id_max: self.fields.len() as FieldId,
        }
    }

    fn field_id(&self, name: &str) -> Option<FieldId> {
        self.field_ids.get(name).copied()
    }

    fn field_options(&self, field_id: FieldId) -> Option<FieldOptions> {
        field_id
            .checked_sub(1)
            .and_then(|i| self.fields.get(i as usize))
            .map(|f| f.options)
    }

    fn default_unfielded_fields(&self) -> Vec<String> {
        self.default_unfielded_fields.clone()
    }

    fn stemming_enabled(&self) -> bool {
        self.stemming
    }

    fn stem(&self, term: &str) -> Option<String> {
        Some(self.stemmer.stem(term))
    }

    fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    fn stemmer_name(&self) -> Option<&str> {
        Some(self.stemmer.name())
    }

    fn stop_list_name(&self) -> Option<&str> {
        (!self.stop_words.is_empty()).then_some("custom")
    }

    fn item_type(&self, name: &str) -> Option<ItemType> {
        self.items.get(name).copied()
    }
}

/// Named in-memory indices, opened by name.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    indices: HashMap<String, Arc<MemoryIndex>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: MemoryIndex) -> Arc<MemoryIndex> {
        let index = Arc::new(index);
        self.indices
            .insert(index.name().to_string(), Arc::clone(&index));
        index
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.indices.keys().cloned().collect();
        names.sort();
        names
    }
}

impl IndexOpener for MemoryCatalog {
    fn open(&self, name: &str) -> Result<Arc<dyn SearchIndex>> {
        self.indices
            .get(name)
            .map(|index| Arc::clone(index) as Arc<dyn SearchIndex>)
            .ok_or_else(|| SearchError::index(format!("failed to open index '{name}'")))
    }
}
