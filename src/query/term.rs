//! Query terms.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Field name that searches every field.
pub const WILDCARD_FIELD: &str = "*";

/// How a term is turned into concrete dictionary terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionFunction {
    /// Plain term, possibly stemmed.
    #[default]
    None,
    /// Exact text, never stemmed or case folded.
    Literal,
    /// Every dictionary term satisfying the range comparison.
    Range,
    Wildcard,
    Soundex,
    Metaphone,
    Phonix,
    /// Terms within a small edit distance.
    Typo,
}

impl ExpansionFunction {
    /// Phonetic and typo functions, inside which wildcards are rejected.
    pub fn is_function(self) -> bool {
        matches!(
            self,
            ExpansionFunction::Soundex
                | ExpansionFunction::Metaphone
                | ExpansionFunction::Phonix
                | ExpansionFunction::Typo
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ExpansionFunction::None => "none",
            ExpansionFunction::Literal => "literal",
            ExpansionFunction::Range => "range",
            ExpansionFunction::Wildcard => "wildcard",
            ExpansionFunction::Soundex => "soundex",
            ExpansionFunction::Metaphone => "metaphone",
            ExpansionFunction::Phonix => "phonix",
            ExpansionFunction::Typo => "typo",
        }
    }
}

/// Comparison used by range terms and date restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeComparison {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl RangeComparison {
    /// Whether `ordering` (value compared to the bound) satisfies the comparison.
    pub fn accepts(self, ordering: Ordering) -> bool {
        match self {
            RangeComparison::Equal => ordering == Ordering::Equal,
            RangeComparison::NotEqual => ordering != Ordering::Equal,
            RangeComparison::Less => ordering == Ordering::Less,
            RangeComparison::LessOrEqual => ordering != Ordering::Greater,
            RangeComparison::Greater => ordering == Ordering::Greater,
            RangeComparison::GreaterOrEqual => ordering != Ordering::Less,
        }
    }
}

/// A single query term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Term {
    /// Term text as typed.
    pub text: String,
    /// Field restriction.
    pub field: Option<String>,
    /// Whether the term must be present.
    pub required: bool,
    /// Explicit weight; 0 means unset.
    pub weight: f32,
    /// Whether the text contains wildcard characters.
    pub wildcard: bool,
    pub function: ExpansionFunction,
    /// Comparison for range terms.
    pub range: Option<RangeComparison>,
}

impl Default for Term {
    fn default() -> Self {
        Term {
            text: String::new(),
            field: None,
            required: false,
            weight: 0.0,
            wildcard: false,
            function: ExpansionFunction::None,
            range: None,
        }
    }
}

impl Term {
    /// Create a plain term.
    pub fn new<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let wildcard = text.contains(['*', '?']);
        Term {
            text,
            wildcard,
            ..Default::default()
        }
    }

    pub fn with_field<S: Into<String>>(mut self, field: S) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_function(mut self, function: ExpansionFunction) -> Self {
        self.function = function;
        self
    }

    pub fn with_range(mut self, comparison: RangeComparison) -> Self {
        self.function = ExpansionFunction::Range;
        self.range = Some(comparison);
        self
    }

    /// Lower-case variant.
    pub fn lower_case(&self) -> String {
        self.text.to_lowercase()
    }

    /// True when the term has cased characters and all of them are upper case.
    pub fn is_all_upper_case(&self) -> bool {
        let mut cased = false;
        for c in self.text.chars() {
            if c.is_lowercase() {
                return false;
            }
            if c.is_uppercase() {
                cased = true;
            }
        }
        cased
    }

    /// Whether the term expands into several dictionary terms.
    pub fn is_expanded(&self) -> bool {
        self.wildcard
            || self.function == ExpansionFunction::Wildcard
            || self.function == ExpansionFunction::Range
            || self.function.is_function()
    }

    /// Wildcards are not allowed inside functions or ranges.
    pub fn has_misplaced_wildcard(&self) -> bool {
        self.wildcard
            && (self.function.is_function() || self.function == ExpansionFunction::Range)
    }

    /// Explicit weight, if one was set.
    pub fn explicit_weight(&self) -> Option<f32> {
        (self.weight != 0.0).then_some(self.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_detection() {
        assert!(Term::new("comp*").wildcard);
        assert!(Term::new("c?t").wildcard);
        assert!(!Term::new("cat").wildcard);
    }

    #[test]
    fn test_upper_case_detection() {
        assert!(Term::new("NASA").is_all_upper_case());
        assert!(Term::new("R2D2").is_all_upper_case());
        assert!(!Term::new("Nasa").is_all_upper_case());
        assert!(!Term::new("2024").is_all_upper_case());
    }

    #[test]
    fn test_misplaced_wildcard() {
        let term = Term::new("sm*th").with_function(ExpansionFunction::Soundex);
        assert!(term.has_misplaced_wildcard());

        let term = Term::new("b*").with_range(RangeComparison::Greater);
        assert!(term.has_misplaced_wildcard());

        let term = Term::new("sm*th");
        assert!(!term.has_misplaced_wildcard());
        assert!(term.is_expanded());
    }

    #[test]
    fn test_range_comparison() {
        assert!(RangeComparison::LessOrEqual.accepts(Ordering::Equal));
        assert!(!RangeComparison::Less.accepts(Ordering::Equal));
        assert!(RangeComparison::NotEqual.accepts(Ordering::Greater));
    }
}
