//! Term resolution: one query term to one postings list.

use log::debug;

use crate::cache::{CachedTerm, TermCacheKey};
use crate::config::{DEFAULT_TERM_WEIGHT, OperationMode, SearchConfig};
use crate::error::{Result, SearchError};
use crate::index::{FieldId, MatchMode, SearchIndex, TermEntry};
use crate::postings::{DocIdBounds, PostingsList, TermType};
use crate::query::{ExpansionFunction, ParsedQuery, RangeComparison, Term, WILDCARD_FIELD};
use crate::search::SearchContext;
use crate::util::Bitmap;

/// Which form of the term text was looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseForm {
    Original,
    Lower,
    Stemmed,
}

/// Query-wide settings that affect every term.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    pub mode: OperationMode,
    /// Query-level weight modifier.
    pub query_weight: Option<f32>,
    /// Coverage above which a term is frequent. Zero disables the check.
    pub frequent_coverage: f32,
    /// Unfielded field names named by the query.
    pub unfielded_fields: Vec<String>,
}

impl ResolveOptions {
    pub fn from_query(query: &ParsedQuery, config: &SearchConfig) -> Self {
        let frequent_coverage = if query.term_count() > 1 && !query.modifiers.retain_terms {
            config.frequent_term_coverage
        } else {
            0.0
        };
        ResolveOptions {
            mode: query.modifiers.operation_mode.unwrap_or(config.operation_mode),
            query_weight: query.modifiers.term_weight,
            frequent_coverage,
            unfielded_fields: query.unfielded_fields.clone(),
        }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            mode: OperationMode::default(),
            query_weight: None,
            frequent_coverage: 0.0,
            unfielded_fields: Vec::new(),
        }
    }
}

/// Fields a term is searched in.
#[derive(Debug)]
struct FieldScope {
    fields: Option<Bitmap>,
    /// Field to read stemming options from.
    field_id: Option<FieldId>,
    cachable: bool,
}

/// Resolves terms against one index.
#[derive(Debug)]
pub struct TermResolver<'a> {
    index: &'a dyn SearchIndex,
    options: ResolveOptions,
}

impl<'a> TermResolver<'a> {
    pub fn new(index: &'a dyn SearchIndex, options: ResolveOptions) -> Self {
        TermResolver { index, options }
    }

    pub fn index(&self) -> &'a dyn SearchIndex {
        self.index
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Resolve `term` within `bounds`.
    ///
    /// Missing terms yield an empty list with a report note; any other
    /// dictionary failure is returned.
    pub fn resolve(
        &self,
        ctx: &mut SearchContext<'_>,
        term: &Term,
        bounds: DocIdBounds,
    ) -> Result<PostingsList> {
        let scope = self.field_scope(ctx, term);
        let (text, case) = self.lookup_form(term, &scope);

        let key = TermCacheKey {
            index: self.index.name().to_string(),
            language: ctx.language.to_string(),
            text: text.clone(),
            field: term.field.clone(),
            scope: scope.fields.as_ref().map(|fields| fields.ids().collect()),
            function: term.function,
            range: term.range,
            case,
            bounds,
        };

        let cached = if scope.cachable {
            ctx.cache.and_then(|cache| cache.get_term(&key))
        } else {
            None
        };

        let postings = match cached {
            Some(hit) => {
                debug!("term cache hit for '{}' in '{}'", term.text, self.index.name());
                ctx.report.replay(&hit.fragment);
                hit.postings
            }
            None => {
                let start = ctx.report.offset();
                let postings = self.lookup(ctx, term, &text, case, &scope, bounds)?;
                if scope.cachable {
                    if let Some(cache) = ctx.cache {
                        cache.put_term(
                            key,
                            CachedTerm {
                                postings: postings.clone(),
                                fragment: ctx.report.fragment_since(start),
                            },
                        );
                    }
                }
                postings
            }
        };

        Ok(self.apply_weights(ctx, term, postings))
    }

    fn field_scope(&self, ctx: &mut SearchContext<'_>, term: &Term) -> FieldScope {
        let field_id_max = self.index.stats().field_id_max;
        match term.field.as_deref() {
            Some(WILDCARD_FIELD) => {
                return FieldScope {
                    fields: None,
                    field_id: None,
                    cachable: true,
                };
            }
            Some(name) => match self.index.field_id(name) {
                Some(id) => {
                    return FieldScope {
                        fields: Some(Bitmap::from_ids(field_id_max, [id])),
                        field_id: Some(id),
                        cachable: true,
                    };
                }
                None => {
                    ctx.report.append(format!(
                        "Invalid field '{name}' for term '{}', searching unfielded",
                        term.text
                    ));
                    let mut scope = self.unfielded_scope(ctx);
                    scope.cachable = false;
                    return scope;
                }
            },
            None => {}
        }
        self.unfielded_scope(ctx)
    }

    fn unfielded_scope(&self, ctx: &SearchContext<'_>) -> FieldScope {
        let names = if !self.options.unfielded_fields.is_empty() {
            self.options.unfielded_fields.clone()
        } else {
            let defaults = self.index.default_unfielded_fields();
            if defaults.is_empty() {
                ctx.config.default_unfielded_fields.clone()
            } else {
                defaults
            }
        };

        let ids: Vec<FieldId> = names
            .iter()
            .filter_map(|name| self.index.field_id(name))
            .collect();
        if ids.is_empty() {
            return FieldScope {
                fields: None,
                field_id: None,
                cachable: false,
            };
        }
        let field_id = (ids.len() == 1).then(|| ids[0]);
        FieldScope {
            fields: Some(Bitmap::from_ids(self.index.stats().field_id_max, ids)),
            field_id,
            cachable: true,
        }
    }

    fn stemming_applies(&self, scope: &FieldScope) -> bool {
        match scope.field_id {
            Some(id) => self
                .index
                .field_options(id)
                .is_some_and(|options| options.stemming),
            None => self.index.stemming_enabled(),
        }
    }

    /// Text to look up and which case form it is.
    fn lookup_form(&self, term: &Term, scope: &FieldScope) -> (String, CaseForm) {
        if term.function == ExpansionFunction::Literal {
            return (term.text.clone(), CaseForm::Original);
        }
        let lower = term.lower_case();
        if term.is_expanded() || term.is_all_upper_case() || !self.stemming_applies(scope) {
            return (lower, CaseForm::Lower);
        }
        match self.index.stem(&lower) {
            Some(stem) if stem != lower => (stem, CaseForm::Stemmed),
            _ => (lower, CaseForm::Lower),
        }
    }

    fn lookup(
        &self,
        ctx: &mut SearchContext<'_>,
        term: &Term,
        text: &str,
        case: CaseForm,
        scope: &FieldScope,
        bounds: DocIdBounds,
    ) -> Result<PostingsList> {
        if term.has_misplaced_wildcard() {
            ctx.report.append(format!(
                "Wildcards are not allowed in {} terms: '{}'",
                term.function.name(),
                term.text
            ));
            return Ok(PostingsList::empty(TermType::Unknown).with_absent(true));
        }

        let fields = scope.fields.as_ref();
        let mode = match_mode(term);
        let mut entries = self.index.lookup_terms(text, fields, mode);

        // the stemmed form is preferred, the plain lower case form is the fallback
        if case == CaseForm::Stemmed
            && matches!(&entries, Err(e) if e.is_recoverable_term_error())
        {
            entries = self.index.lookup_terms(&term.lower_case(), fields, mode);
        }

        let entries = match entries {
            Ok(entries) => entries,
            Err(e) => return self.recover(ctx, e),
        };

        if term.is_expanded() {
            ctx.report.append(format!(
                "Term '{}' expanded to {} terms",
                term.text,
                entries.len()
            ));
        }
        if entries.is_empty() {
            return Ok(PostingsList::empty(TermType::Regular).with_absent(true));
        }
        match self.fetch_postings(&entries, fields, bounds) {
            Ok(postings) => Ok(postings),
            Err(e) => self.recover(ctx, e),
        }
    }

    /// "Not found" and "does not occur" become an absent, empty list.
    fn recover(&self, ctx: &mut SearchContext<'_>, error: SearchError) -> Result<PostingsList> {
        if !error.is_recoverable_term_error() {
            return Err(error);
        }
        debug!("{error} in '{}'", self.index.name());
        ctx.report.append(format!("{error}"));
        Ok(PostingsList::empty(TermType::Regular).with_absent(true))
    }

    fn fetch_postings(
        &self,
        entries: &[TermEntry],
        fields: Option<&Bitmap>,
        bounds: DocIdBounds,
    ) -> Result<PostingsList> {
        if let [entry] = entries {
            if entry.term_type == TermType::Stop {
                return Ok(PostingsList::empty(TermType::Stop));
            }
            return self.index.postings(entry, fields, bounds);
        }

        let mut lists = Vec::with_capacity(entries.len());
        for entry in entries.iter().filter(|e| e.term_type != TermType::Stop) {
            lists.push(self.index.postings(entry, fields, bounds)?);
        }
        Ok(PostingsList::concat(TermType::Regular, lists))
    }

    /// Term weight and frequent-term demotion. Applied after the cache so
    /// cached postings are shared across queries with different weights.
    fn apply_weights(
        &self,
        ctx: &mut SearchContext<'_>,
        term: &Term,
        mut postings: PostingsList,
    ) -> PostingsList {
        postings.required = term.required;
        if postings.is_stop() || postings.is_empty() {
            return postings;
        }

        let weight = term
            .explicit_weight()
            .or(self.options.query_weight)
            .or(ctx.config.default_term_weight)
            .unwrap_or(DEFAULT_TERM_WEIGHT);
        if weight != DEFAULT_TERM_WEIGHT {
            postings.scale_weights(weight);
        }

        if self.options.frequent_coverage > 0.0 {
            let document_count = self.index.stats().document_count as f32;
            if postings.document_count as f32 > self.options.frequent_coverage * document_count {
                postings.term_type = TermType::Frequent;
                postings.scale_weights(ctx.config.frequent_term_weight_factor);
                ctx.report.append(format!(
                    "Term '{}' occurs in {} documents and was treated as frequent",
                    term.text, postings.document_count
                ));
            }
        }
        postings
    }
}

fn match_mode(term: &Term) -> MatchMode {
    match term.function {
        ExpansionFunction::Soundex => MatchMode::Soundex,
        ExpansionFunction::Metaphone => MatchMode::Metaphone,
        ExpansionFunction::Phonix => MatchMode::Phonix,
        ExpansionFunction::Typo => MatchMode::Typo,
        ExpansionFunction::Range => {
            MatchMode::Range(term.range.unwrap_or(RangeComparison::Equal))
        }
        ExpansionFunction::Wildcard => MatchMode::Wildcard,
        ExpansionFunction::None | ExpansionFunction::Literal if term.wildcard => {
            MatchMode::Wildcard
        }
        ExpansionFunction::None | ExpansionFunction::Literal => MatchMode::Regular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SearchCache;
    use crate::index::{FieldOptions, MemoryDocument, MemoryIndex, MemoryIndexBuilder};

    fn index() -> MemoryIndex {
        MemoryIndexBuilder::new("docs")
            .field(
                "body",
                FieldOptions {
                    stemming: true,
                    ..Default::default()
                },
            )
            .field("title", FieldOptions::default())
            .default_unfielded_fields(["body"])
            .stop_words(["the"])
            .document(
                MemoryDocument::new("a")
                    .with_field("body", "searching the archive")
                    .with_field("title", "Archive"),
            )
            .document(MemoryDocument::new("b").with_field("body", "archive search"))
            .document(MemoryDocument::new("c").with_field("body", "nothing here"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_stemmed_lookup() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());

        let postings = resolver
            .resolve(&mut ctx, &Term::new("searches"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(postings.document_ids(), vec![1, 2]);

        // upper-case terms are not stemmed
        let postings = resolver
            .resolve(&mut ctx, &Term::new("SEARCHES"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!(postings.is_empty());
    }

    #[test]
    fn test_missing_term_is_reported() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());

        let postings = resolver
            .resolve(&mut ctx, &Term::new("zebra"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!(postings.is_empty());
        assert!(postings.absent);
        assert!(ctx.report.as_str().contains("zebra"));
    }

    #[test]
    fn test_bounded_empty_term_is_not_absent() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());

        let postings = resolver
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::new(3, 3))
            .unwrap();
        assert!(postings.is_empty());
        assert!(!postings.absent);
    }

    #[test]
    fn test_invalid_field_falls_back() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());

        let term = Term::new("archive").with_field("nope");
        let postings = resolver
            .resolve(&mut ctx, &term, DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(postings.document_ids(), vec![1, 2]);
        assert!(ctx.report.as_str().contains("Invalid field 'nope'"));

        let term = Term::new("archive").with_field("title");
        let postings = resolver
            .resolve(&mut ctx, &term, DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(postings.document_ids(), vec![1]);
    }

    #[test]
    fn test_weight_precedence() {
        let index = index();
        let config = SearchConfig::default().with_default_term_weight(3.0);
        let mut ctx = SearchContext::new(&config, None, "en");
        let plain = TermResolver::new(&index, ResolveOptions::default());
        let base = TermResolver::new(&index, ResolveOptions::default())
            .resolve(
                &mut SearchContext::new(&SearchConfig::default(), None, "en"),
                &Term::new("archive"),
                DocIdBounds::UNBOUNDED,
            )
            .unwrap()
            .postings()[0]
            .weight;

        let from_config = plain
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!((from_config.postings()[0].weight - base * 3.0).abs() < 1e-5);

        let options = ResolveOptions {
            query_weight: Some(2.0),
            ..Default::default()
        };
        let from_query = TermResolver::new(&index, options.clone())
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!((from_query.postings()[0].weight - base * 2.0).abs() < 1e-5);

        let from_term = TermResolver::new(&index, options)
            .resolve(
                &mut ctx,
                &Term::new("archive").with_weight(5.0),
                DocIdBounds::UNBOUNDED,
            )
            .unwrap();
        assert!((from_term.postings()[0].weight - base * 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_frequent_term_demotion() {
        let index = index();
        let config = SearchConfig::default().with_frequent_term_coverage(0.5);
        let mut ctx = SearchContext::new(&config, None, "en");
        let options = ResolveOptions {
            frequent_coverage: 0.5,
            ..Default::default()
        };
        let resolver = TermResolver::new(&index, options);
        let postings = resolver
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(postings.term_type, TermType::Frequent);

        let query = ParsedQuery::from_tree(Term::new("archive").into(), "archive");
        assert_eq!(ResolveOptions::from_query(&query, &config).frequent_coverage, 0.0);
    }

    #[test]
    fn test_misplaced_wildcard() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());
        let term = Term::new("arch*").with_function(ExpansionFunction::Soundex);
        let postings = resolver
            .resolve(&mut ctx, &term, DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!(postings.is_empty());
        assert!(ctx.report.as_str().contains("Wildcards are not allowed"));
    }

    #[test]
    fn test_wildcard_expansion() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());
        let postings = resolver
            .resolve(&mut ctx, &Term::new("search*"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(postings.document_ids(), vec![1, 2]);
        assert_eq!(postings.document_count, 2);
    }

    #[test]
    fn test_term_cache_replays_report() {
        let index = index();
        let config = SearchConfig::default();
        let cache = SearchCache::new(16, 16);
        let resolver = TermResolver::new(&index, ResolveOptions::default());

        let mut first = SearchContext::new(&config, Some(&cache), "en");
        let a = resolver
            .resolve(&mut first, &Term::new("zebra"), DocIdBounds::UNBOUNDED)
            .unwrap();
        let mut second = SearchContext::new(&config, Some(&cache), "en");
        let b = resolver
            .resolve(&mut second, &Term::new("zebra"), DocIdBounds::UNBOUNDED)
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(first.report.as_str(), second.report.as_str());
        assert_eq!(cache.stats().term_hits, 1);
    }

    #[test]
    fn test_term_cache_separates_unfielded_scopes() {
        let index = MemoryIndexBuilder::new("notes")
            .field("title", FieldOptions::default())
            .field("subject", FieldOptions::default())
            .document(MemoryDocument::new("a").with_field("title", "archive"))
            .document(MemoryDocument::new("b").with_field("subject", "archive"))
            .build()
            .unwrap();
        let config = SearchConfig::default();
        let cache = SearchCache::new(16, 16);
        let scoped = |field: &str| ResolveOptions {
            unfielded_fields: vec![field.to_string()],
            ..Default::default()
        };

        let mut ctx = SearchContext::new(&config, Some(&cache), "en");
        let title = TermResolver::new(&index, scoped("title"))
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(title.document_ids(), vec![1]);

        let mut ctx = SearchContext::new(&config, Some(&cache), "en");
        let subject = TermResolver::new(&index, scoped("subject"))
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(subject.document_ids(), vec![2]);
        assert_eq!(cache.stats().term_hits, 0);

        let mut ctx = SearchContext::new(&config, Some(&cache), "en");
        let again = TermResolver::new(&index, scoped("subject"))
            .resolve(&mut ctx, &Term::new("archive"), DocIdBounds::UNBOUNDED)
            .unwrap();
        assert_eq!(again, subject);
        assert_eq!(cache.stats().term_hits, 1);
    }
}
