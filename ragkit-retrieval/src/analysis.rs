//! Content classification for text spans.
//!
//! [`ContentAnalyzer`] feeds model and strategy selection by classifying a
//! span's dominant content type and language and scoring its complexity. It
//! is pure string analysis with no collaborators.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The dominant content type of a text span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Source code (function/class/import signatures).
    Code,
    /// Mathematical notation (LaTeX markers, math symbols).
    Math,
    /// Pipe-delimited tabular text.
    Table,
    /// Bulleted, numbered, or lettered lists.
    List,
    /// Plain prose; the default.
    Text,
}

/// The dominant language of a text span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Predominantly CJK characters.
    Zh,
    /// Predominantly Latin characters.
    En,
    /// Neither side dominates (including empty input).
    Mixed,
}

static CODE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\bfn\s+\w+\s*\(",
        r"\bdef\s+\w+\s*\(",
        r"\bfunction\s+\w+\s*\(",
        r"\bclass\s+\w+",
        r"\bimport\s+[\w.{]",
        r"#include\s*[<\x22]",
        r"\buse\s+\w+(::\w+)+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static MATH_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\\(frac|sum|int|sqrt|prod|lim|infty|alpha|beta|gamma|lambda)\b", r"\$[^$\n]+\$"]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static LIST_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(?:[-*•]\s+|\d+[.)]\s+|[a-zA-Z][.)]\s+)").unwrap());

const MATH_SYMBOLS: &str = "∫∑∏√±≤≥≠≈∞π×÷∂∇∈∉⊂⊆∪∩";

/// Classifies text spans by content type, language, and complexity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentAnalyzer;

impl ContentAnalyzer {
    /// Create a new analyzer.
    pub fn new() -> Self {
        Self
    }

    /// Classify a span's dominant content type.
    ///
    /// Checks are ordered — code, then math, then table, then list — and the
    /// first match wins; anything else is [`ContentType::Text`]. The result
    /// is a pure function of the input, so repeated calls agree.
    pub fn analyze_content_type(&self, text: &str) -> ContentType {
        if CODE_PATTERNS.iter().any(|p| p.is_match(text)) {
            return ContentType::Code;
        }
        if MATH_PATTERNS.iter().any(|p| p.is_match(text))
            || text.chars().any(|c| MATH_SYMBOLS.contains(c) || is_super_or_subscript(c))
        {
            return ContentType::Math;
        }
        if is_table(text) {
            return ContentType::Table;
        }
        if LIST_PATTERN.is_match(text) {
            return ContentType::List;
        }
        ContentType::Text
    }

    /// Detect the dominant language by counting CJK vs Latin characters.
    ///
    /// Ties (including input with neither script) resolve to
    /// [`Language::Mixed`].
    pub fn detect_language(&self, text: &str) -> Language {
        let mut cjk = 0usize;
        let mut latin = 0usize;
        for c in text.chars() {
            if ('\u{4e00}'..='\u{9fff}').contains(&c) {
                cjk += 1;
            } else if c.is_ascii_alphabetic() {
                latin += 1;
            }
        }
        if cjk > latin {
            Language::Zh
        } else if latin > cjk {
            Language::En
        } else {
            Language::Mixed
        }
    }

    /// Score text complexity in `[0, 1]`.
    ///
    /// The score averages normalized average sentence length (capped at 20
    /// words) and lexical diversity (unique/total word ratio). Empty input
    /// scores 0.0.
    pub fn calculate_complexity(&self, text: &str) -> f32 {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return 0.0;
        }

        let sentences = text.split(['.', '?', '!']).filter(|s| !s.trim().is_empty()).count().max(1);
        let avg_sentence_len = words.len() as f32 / sentences as f32;
        let length_factor = (avg_sentence_len / 20.0).min(1.0);

        let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        let diversity = unique.len() as f32 / words.len() as f32;

        ((length_factor + diversity) / 2.0).min(1.0)
    }
}

fn is_super_or_subscript(c: char) -> bool {
    matches!(c, '\u{2070}'..='\u{209f}' | '\u{00b2}' | '\u{00b3}' | '\u{00b9}')
}

fn is_table(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return false;
    }
    let piped = lines.iter().filter(|l| l.contains('|')).count();
    piped * 2 > lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_code_before_anything_else() {
        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.analyze_content_type("fn main() {}"), ContentType::Code);
        assert_eq!(analyzer.analyze_content_type("def handler(req):"), ContentType::Code);
        assert_eq!(analyzer.analyze_content_type("import numpy as np"), ContentType::Code);
        // Code check runs first even when list markers are present.
        assert_eq!(
            analyzer.analyze_content_type("- step one\nclass Foo:\n- step two"),
            ContentType::Code
        );
    }

    #[test]
    fn classifies_math() {
        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.analyze_content_type(r"\frac{a}{b} over x"), ContentType::Math);
        assert_eq!(analyzer.analyze_content_type("the area is $x^2$ here"), ContentType::Math);
        assert_eq!(analyzer.analyze_content_type("∑ of all terms"), ContentType::Math);
        assert_eq!(analyzer.analyze_content_type("E = mc²"), ContentType::Math);
    }

    #[test]
    fn classifies_table_by_pipe_density() {
        let analyzer = ContentAnalyzer::new();
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        assert_eq!(analyzer.analyze_content_type(table), ContentType::Table);
        let sparse = "one | pipe\nplain line\nanother plain\nlast plain";
        assert_ne!(analyzer.analyze_content_type(sparse), ContentType::Table);
    }

    #[test]
    fn classifies_lists() {
        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.analyze_content_type("- first\n- second"), ContentType::List);
        assert_eq!(analyzer.analyze_content_type("1. first\n2. second"), ContentType::List);
        assert_eq!(analyzer.analyze_content_type("a) first\nb) second"), ContentType::List);
    }

    #[test]
    fn defaults_to_text() {
        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.analyze_content_type("just a plain sentence"), ContentType::Text);
        assert_eq!(analyzer.analyze_content_type(""), ContentType::Text);
    }

    #[test]
    fn content_type_is_idempotent() {
        let analyzer = ContentAnalyzer::new();
        for text in ["fn main() {}", "| a | b |\n| 1 | 2 |", "plain words", "- item\n- item"] {
            assert_eq!(analyzer.analyze_content_type(text), analyzer.analyze_content_type(text));
        }
    }

    #[test]
    fn detects_language() {
        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.detect_language("hello world"), Language::En);
        assert_eq!(analyzer.detect_language("你好世界"), Language::Zh);
        assert_eq!(analyzer.detect_language("你好 hi"), Language::Mixed);
        assert_eq!(analyzer.detect_language("12345"), Language::Mixed);
    }

    #[test]
    fn complexity_is_clamped_and_zero_for_empty() {
        let analyzer = ContentAnalyzer::new();
        assert_eq!(analyzer.calculate_complexity(""), 0.0);
        let long = "one two three four five six seven eight nine ten eleven twelve thirteen \
                    fourteen fifteen sixteen seventeen eighteen nineteen twenty twentyone";
        let score = analyzer.calculate_complexity(long);
        assert!(score > 0.0 && score <= 1.0);
    }

    #[test]
    fn repeated_words_lower_complexity() {
        let analyzer = ContentAnalyzer::new();
        let diverse = analyzer.calculate_complexity("alpha beta gamma delta");
        let repetitive = analyzer.calculate_complexity("alpha alpha alpha alpha");
        assert!(diverse > repetitive);
    }
}
