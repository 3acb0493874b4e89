//! Whole-word concept keyword counting over student queries.

#![allow(missing_docs)]

use regex::Regex;

use crate::core::errors::{Result, TutorError};
use crate::history::record::InteractionRecord;

/// Concept terms tracked when the config file does not override them.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "tuple",
    "unpacking",
    "list",
    "class",
    "function",
    "scope",
    "decorator",
    "variable",
    "loop",
    "dictionary",
    "string",
    "integer",
    "float",
    "boolean",
    "set",
    "module",
    "package",
    "exception",
    "file",
    "comprehension",
    "lambda",
    "iterator",
    "generator",
    "recursion",
    "inheritance",
    "polymorphism",
    "encapsulation",
    "abstraction",
    "method",
    "attribute",
    "namespace",
    "argument",
    "parameter",
    "default argument",
    "keyword argument",
    "mutable",
    "immutable",
    "type hint",
    "virtual environment",
    "debugging",
    "testing",
    "OOP",
    "functional programming",
    "data structure",
    "algorithm",
    "API",
    "library",
    "framework",
    "syntax",
    "semantics",
    "interpreter",
    "compiler",
    "PEP8",
    "docstring",
    "decorator",
    "context manager",
    "with statement",
    "async",
    "await",
    "threading",
    "multiprocessing",
    "git",
    "github",
    "version control",
    "Jupyter",
    "notebook",
    "pandas",
    "numpy",
    "matplotlib",
    "visualization",
    "data analysis",
    "data science",
    "machine learning",
    "AI",
    "artificial intelligence",
    "deep learning",
    "neural network",
    "tensorflow",
    "pytorch",
    "scikit-learn",
    "regression",
    "classification",
    "clustering",
    "natural language processing",
    "NLP",
    "Methods",
    "Functions",
    "Attributes",
    "Classes",
    "Objects",
];

#[derive(Debug, Clone)]
struct Term {
    keyword: String,
    pattern: Regex,
}

/// Case-insensitive set of tracked terms with precompiled word-boundary
/// patterns. Terms are lower-cased and deduplicated; the first occurrence
/// keeps its position, which is the tie-break order for rankings.
#[derive(Debug, Clone)]
pub struct KeywordVocabulary {
    terms: Vec<Term>,
}

impl KeywordVocabulary {
    pub fn new<I, S>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<Term> = Vec::new();
        for raw in keywords {
            let keyword = raw.as_ref().trim().to_lowercase();
            if keyword.is_empty() || terms.iter().any(|t| t.keyword == keyword) {
                continue;
            }
            let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(&keyword))).map_err(
                |e| TutorError::InvalidConfig {
                    details: format!("keyword {keyword:?} is not matchable: {e}"),
                },
            )?;
            terms.push(Term { keyword, pattern });
        }
        Ok(Self { terms })
    }

    /// Vocabulary built from [`DEFAULT_KEYWORDS`].
    pub fn builtin() -> Result<Self> {
        Self::new(DEFAULT_KEYWORDS)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|t| t.keyword.as_str())
    }
}

/// Mention totals per keyword, in vocabulary order. Zero counts are omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    entries: Vec<(String, u64)>,
}

impl KeywordCounts {
    pub fn get(&self, keyword: &str) -> Option<u64> {
        let keyword = keyword.to_lowercase();
        self.entries
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, n)| *n)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(k, n)| (k.as_str(), *n))
    }

    /// All keywords by count, highest first; ties keep vocabulary order.
    pub fn descending(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self.iter().collect();
        // Stable sort keeps vocabulary order among equal counts.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }

    /// The `n` most-mentioned keywords.
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut ranked = self.descending();
        ranked.truncate(n);
        ranked
    }
}

/// Count whole-word mentions of each vocabulary term in the lower-cased
/// `query` of every record. Response text is never scanned.
pub fn count_keywords(records: &[InteractionRecord], vocabulary: &KeywordVocabulary) -> KeywordCounts {
    let queries: Vec<String> = records.iter().map(|r| r.query().to_lowercase()).collect();

    let entries = vocabulary
        .terms
        .iter()
        .filter_map(|term| {
            let count: u64 = queries
                .iter()
                .map(|q| term.pattern.find_iter(q).count() as u64)
                .sum();
            (count > 0).then(|| (term.keyword.clone(), count))
        })
        .collect();
    KeywordCounts { entries }
}
