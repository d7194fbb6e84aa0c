//! Token source: the query grammar, the lexical context stack and the metatag
//! vocabulary that decides how a `name:value` pair is typed.

use std::collections::HashMap;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use pest_derive::Parser;
use regex::Regex;

use crate::ast::MetaType;
use crate::settings::MetatagSettings;

#[derive(Parser)]
#[grammar = "tagquery.pest"]
pub struct QueryParser;

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"^[0-9]+$").unwrap();
    static ref SIZE: Regex = Regex::new(r"(?i)^[0-9]+(\.[0-9]+)?(b|kb|mb|gb|tb)?$").unwrap();
}

/// Built-in vocabulary, mirrored by the embedded default settings.
pub const STRING_METATAGS: &[&str] = &["title", "author", "artist", "source", "rating", "uploader", "description"];
pub const INTEGER_METATAGS: &[&str] = &["likes", "views", "score", "width", "height", "favorites"];
pub const DATE_METATAGS: &[&str] = &["date", "created", "edited"];
pub const SIZE_METATAGS: &[&str] = &["size", "filesize"];

// ------------- Lexical contexts -------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Entered at `name:` and left once the value is consumed.
    MetatagValue,
    /// Entered at an opening quote and left at the closing one.
    QuotedString,
}

/// Stack of contexts the token source is currently inside. Empty means the
/// initial context.
#[derive(Debug, Default, Clone)]
pub struct LexicalContext {
    stack: Vec<ContextKind>,
}
impl LexicalContext {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn enter(&mut self, kind: ContextKind) {
        self.stack.push(kind);
    }
    /// Leaves `kind` only if it is the innermost context.
    pub fn leave(&mut self, kind: ContextKind) -> bool {
        if self.stack.last() == Some(&kind) {
            self.stack.pop();
            true
        } else {
            false
        }
    }
    pub fn current(&self) -> Option<ContextKind> {
        self.stack.last().copied()
    }
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
    pub fn is_initial(&self) -> bool {
        self.stack.is_empty()
    }
}

// ------------- Vocabulary -------------

/// Maps metatag names (case-insensitively) to the type of value they take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    kinds: HashMap<String, MetaType>,
}
impl Vocabulary {
    pub fn empty() -> Self {
        Self { kinds: HashMap::new() }
    }
    pub fn standard() -> Self {
        let mut vocabulary = Self::empty();
        vocabulary.extend(STRING_METATAGS, MetaType::String);
        vocabulary.extend(INTEGER_METATAGS, MetaType::Integer);
        vocabulary.extend(DATE_METATAGS, MetaType::Date);
        vocabulary.extend(SIZE_METATAGS, MetaType::Size);
        vocabulary
    }
    pub fn from_settings(settings: &MetatagSettings) -> Self {
        let mut vocabulary = Self::empty();
        vocabulary.extend(settings.string.as_slice(), MetaType::String);
        vocabulary.extend(settings.integer.as_slice(), MetaType::Integer);
        vocabulary.extend(settings.date.as_slice(), MetaType::Date);
        vocabulary.extend(settings.size.as_slice(), MetaType::Size);
        vocabulary
    }
    fn extend<S: AsRef<str>>(&mut self, names: &[S], kind: MetaType) {
        for name in names {
            self.insert(name.as_ref(), kind);
        }
    }
    /// Recall is not a named type and is ignored here.
    pub fn insert(&mut self, name: &str, kind: MetaType) {
        if kind != MetaType::Recall {
            self.kinds.insert(name.to_ascii_lowercase(), kind);
        }
    }
    pub fn classify(&self, name: &str) -> Option<MetaType> {
        self.kinds.get(&name.to_ascii_lowercase()).copied()
    }
    pub fn len(&self) -> usize {
        self.kinds.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
impl Default for Vocabulary {
    fn default() -> Self {
        Self::standard()
    }
}

// ------------- Scalar validation -------------

pub fn is_integer(text: &str) -> bool {
    INTEGER.is_match(text)
}

pub fn is_size(text: &str) -> bool {
    SIZE.is_match(text)
}

pub fn is_date(text: &str) -> bool {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

/// Scalar check for a metatag type; strings accept anything.
pub fn accepts(kind: MetaType, text: &str) -> bool {
    match kind {
        MetaType::Integer => is_integer(text),
        MetaType::Date => is_date(text),
        MetaType::Size => is_size(text),
        MetaType::String | MetaType::Recall => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_leaves_only_innermost() {
        let mut context = LexicalContext::new();
        context.enter(ContextKind::MetatagValue);
        context.enter(ContextKind::QuotedString);
        assert!(!context.leave(ContextKind::MetatagValue));
        assert_eq!(context.depth(), 2);
        assert!(context.leave(ContextKind::QuotedString));
        assert!(context.leave(ContextKind::MetatagValue));
        assert!(context.is_initial());
    }

    #[test]
    fn scalar_shapes() {
        assert!(is_integer("120"));
        assert!(!is_integer("1.5"));
        assert!(is_size("1.5MB"));
        assert!(is_size("300"));
        assert!(!is_size("3xb"));
        assert!(is_date("2024-02-29"));
        assert!(!is_date("2023-02-29"));
    }

    #[test]
    fn vocabulary_is_case_insensitive() {
        let vocabulary = Vocabulary::standard();
        assert_eq!(vocabulary.classify("Likes"), Some(MetaType::Integer));
        assert_eq!(vocabulary.classify("SIZE"), Some(MetaType::Size));
        assert_eq!(vocabulary.classify("nope"), None);
    }
}
