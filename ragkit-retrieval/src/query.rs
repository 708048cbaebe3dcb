//! Query pre-processing: cleaning, expansion, intent classification, and
//! strategy selection.
//!
//! [`QueryPreProcessor`] turns a raw query string into a [`ProcessedQuery`]
//! the [`Retriever`](crate::retriever::Retriever) and
//! [`QueryPostProcessor`](crate::postprocess::QueryPostProcessor) consume.
//! It never fails: malformed input degrades to neutral defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The classified intent of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    /// Asks for a fact (what/who/when/where/how many).
    Factual,
    /// Asks for analysis or explanation (why/how/analyze/compare/explain).
    Analytical,
    /// Asks to produce something (create/generate/write/make).
    Creative,
    /// Asks to locate something (find/search/look for).
    Search,
    /// Anything else.
    Conversational,
}

impl QueryType {
    /// Snake-case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::Factual => "factual",
            QueryType::Analytical => "analytical",
            QueryType::Creative => "creative",
            QueryType::Search => "search",
            QueryType::Conversational => "conversational",
        }
    }
}

/// The retrieval strategy to run for a query.
///
/// Dispatch over this enum is a `match`, so adding a variant is a compile
/// error at every dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalStrategy {
    /// Embedding-similarity search.
    Semantic,
    /// Lexical/keyword search.
    Keyword,
    /// Fused semantic + keyword search.
    Hybrid,
}

impl RetrievalStrategy {
    /// Snake-case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            RetrievalStrategy::Semantic => "semantic",
            RetrievalStrategy::Keyword => "keyword",
            RetrievalStrategy::Hybrid => "hybrid",
        }
    }
}

/// A pre-processed query, ready for strategy dispatch.
///
/// Transient: created per query and discarded with the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedQuery {
    /// The cleaned query text.
    pub processed_query: String,
    /// Synonym expansions of query terms; empty when expansion is disabled
    /// or nothing matched.
    pub expanded_terms: Vec<String>,
    /// Classified intent.
    pub query_type: QueryType,
    /// Recommended retrieval strategy.
    pub strategy: RetrievalStrategy,
    /// Free-form processing metadata (complexity, word count).
    pub metadata: HashMap<String, String>,
}

/// Punctuation preserved by cleaning; everything else non-alphanumeric is stripped.
const KEPT_PUNCTUATION: &str = ".?!,;:-()";

/// Fixed synonym table for query expansion. Keys are matched as exact,
/// case-insensitive whole words; iteration order is the literal order here,
/// so expansion output is deterministic.
const SYNONYM_TABLE: &[(&str, &[&str])] = &[
    ("ai", &["artificial intelligence", "machine learning", "deep learning"]),
    ("db", &["database", "data store"]),
    ("docs", &["documentation", "documents"]),
    ("k8s", &["kubernetes", "container orchestration"]),
    ("ml", &["machine learning", "neural networks"]),
    ("nlp", &["natural language processing", "text analysis"]),
    ("rag", &["retrieval augmented generation", "document retrieval"]),
];

const COMPLEX_WORDS: &[&str] = &["analyze", "compare", "synthesize", "evaluate", "relationship"];

/// Cleans, optionally expands, and classifies incoming queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryPreProcessor {
    expansion_enabled: bool,
}

impl Default for QueryPreProcessor {
    fn default() -> Self {
        Self { expansion_enabled: true }
    }
}

impl QueryPreProcessor {
    /// Create a pre-processor with expansion enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable synonym expansion.
    pub fn with_expansion(mut self, enabled: bool) -> Self {
        self.expansion_enabled = enabled;
        self
    }

    /// Process a raw query into a [`ProcessedQuery`].
    ///
    /// Steps, in order: clean, spell-check (pass-through), expand, classify
    /// intent, select strategy. Never fails; empty input yields a
    /// conversational/semantic result with empty expansions.
    pub fn process(&self, query: &str) -> ProcessedQuery {
        let cleaned = clean_query(query);
        let spell_checked = spell_check(&cleaned);

        let expanded_terms =
            if self.expansion_enabled { expand_terms(&spell_checked) } else { Vec::new() };

        let query_type = classify_intent(&spell_checked);
        let complexity = query_complexity(&spell_checked);
        let strategy = select_strategy(query_type, complexity);

        let mut metadata = HashMap::new();
        metadata.insert("complexity".to_string(), format!("{complexity:.3}"));
        metadata
            .insert("word_count".to_string(), spell_checked.split_whitespace().count().to_string());

        ProcessedQuery {
            processed_query: spell_checked,
            expanded_terms,
            query_type,
            strategy,
            metadata,
        }
    }
}

/// Trim, collapse internal whitespace, and strip disallowed punctuation.
fn clean_query(query: &str) -> String {
    let stripped: String = query
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Spell-check hook. Currently a pass-through.
fn spell_check(query: &str) -> String {
    query.to_string()
}

/// Expand query terms against the fixed synonym table.
///
/// Only exact case-insensitive whole-word matches expand. Output preserves
/// table order and drops duplicates.
fn expand_terms(query: &str) -> Vec<String> {
    let words: Vec<String> =
        query.split_whitespace().map(|w| w.trim_matches(is_word_trim).to_lowercase()).collect();

    let mut expanded = Vec::new();
    for (key, synonyms) in SYNONYM_TABLE {
        if words.iter().any(|w| w == key) {
            for synonym in *synonyms {
                if !expanded.iter().any(|e| e == synonym) {
                    expanded.push((*synonym).to_string());
                }
            }
        }
    }
    expanded
}

fn is_word_trim(c: char) -> bool {
    KEPT_PUNCTUATION.contains(c)
}

/// Classify intent by keyword presence, in fixed priority order.
fn classify_intent(query: &str) -> QueryType {
    let lower = query.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().map(|w| w.trim_matches(is_word_trim)).collect();
    let has_word = |w: &str| words.contains(&w);

    if has_word("what")
        || has_word("who")
        || has_word("when")
        || has_word("where")
        || lower.contains("how many")
    {
        QueryType::Factual
    } else if has_word("why")
        || has_word("how")
        || has_word("analyze")
        || has_word("compare")
        || has_word("explain")
    {
        QueryType::Analytical
    } else if has_word("create") || has_word("generate") || has_word("write") || has_word("make") {
        QueryType::Creative
    } else if has_word("find") || has_word("search") || lower.contains("look for") {
        QueryType::Search
    } else {
        QueryType::Conversational
    }
}

/// Complexity in `[0, 1]`: mean of length, complex-word, and question-mark factors.
fn query_complexity(query: &str) -> f32 {
    let lower = query.to_lowercase();
    let word_count = query.split_whitespace().count();

    let length_factor = (word_count as f32 / 20.0).min(1.0);
    let complex_matches = COMPLEX_WORDS.iter().filter(|w| lower.contains(**w)).count();
    let complex_factor = complex_matches as f32 / COMPLEX_WORDS.len() as f32;
    let question_factor = (query.matches('?').count() as f32 / 3.0).min(1.0);

    (length_factor + complex_factor + question_factor) / 3.0
}

/// Map intent and complexity to a retrieval strategy.
fn select_strategy(query_type: QueryType, complexity: f32) -> RetrievalStrategy {
    if matches!(query_type, QueryType::Factual | QueryType::Search) && complexity < 0.3 {
        RetrievalStrategy::Semantic
    } else if query_type == QueryType::Analytical || complexity > 0.5 {
        RetrievalStrategy::Hybrid
    } else {
        RetrievalStrategy::Semantic
    }
}
