//! Issues reported by an external analyzer against flattened text.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::document::Severity;
use crate::text_helpers::char_slice;

/// One reported problem, addressed by a char range into the flattened text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    pub start: usize,
    pub end: usize,
    /// The text the analyzer saw at `start..end`.
    pub original_text: SmolStr,
    pub suggestion: SmolStr,
    pub message: SmolStr,
    pub kind: SmolStr,
    pub severity: Severity,
}

impl Issue {
    pub fn new(range: Range<usize>, original_text: impl Into<SmolStr>) -> Self {
        Self {
            start: range.start,
            end: range.end,
            original_text: original_text.into(),
            ..Self::default()
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<SmolStr>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<SmolStr>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_kind(mut self, kind: impl Into<SmolStr>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Length in chars of the flagged range.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build an issue from a lint report against `text`.
    ///
    /// Suggestions identical to the flagged text are discarded, and the
    /// rest collapse to one suggestion under `policy`. Returns None when the
    /// span does not fit `text`.
    pub fn from_lint(text: &str, lint: &LintReport, policy: SuggestionPolicy) -> Option<Self> {
        let original = char_slice(text, lint.span.clone())?;
        let suggestions: Vec<&str> = lint
            .suggestions
            .iter()
            .map(SmolStr::as_str)
            .filter(|s| *s != original)
            .collect();
        let (kind, severity) = categorize(&lint.message).kind_and_severity();

        Some(
            Self::new(lint.span.clone(), original)
                .with_suggestion(policy.collapse(&suggestions))
                .with_message(lint.message.clone())
                .with_kind(kind)
                .with_severity(severity),
        )
    }
}

/// How several suggested replacements collapse into one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPolicy {
    /// Keep only the first suggestion.
    #[default]
    First,
    /// Join every suggestion with `", "`.
    Join,
}

impl SuggestionPolicy {
    pub fn collapse<S: AsRef<str>>(&self, suggestions: &[S]) -> SmolStr {
        match self {
            Self::First => suggestions
                .first()
                .map(|s| SmolStr::new(s.as_ref()))
                .unwrap_or_default(),
            Self::Join => {
                let parts: Vec<&str> = suggestions.iter().map(AsRef::as_ref).collect();
                SmolStr::new(parts.join(", "))
            }
        }
    }
}

/// A raw lint as returned by a grammar checker: a char span, a message and
/// zero or more replacement candidates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintReport {
    pub span: Range<usize>,
    pub message: SmolStr,
    pub suggestions: Vec<SmolStr>,
}

/// Broad family a lint message belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LintCategory {
    Spelling,
    Punctuation,
    Style,
    Grammar,
}

const SPELLING_KEYWORDS: &[&str] = &["misspelled", "spelling", "unknown word", "not found"];
const PUNCTUATION_KEYWORDS: &[&str] = &[
    "punctuation",
    "comma",
    "period",
    "apostrophe",
    "quotation",
    "semicolon",
    "colon",
];
const STYLE_KEYWORDS: &[&str] = &[
    "consider",
    "prefer",
    "style",
    "redundant",
    "wordy",
    "passive",
    "unclear",
    "awkward",
];

impl LintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spelling => "spelling",
            Self::Punctuation => "punctuation",
            Self::Style => "style",
            Self::Grammar => "grammar",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::Spelling | Self::Punctuation => Severity::Error,
            Self::Style => Severity::Suggestion,
            Self::Grammar => Severity::Warning,
        }
    }

    pub fn kind_and_severity(&self) -> (SmolStr, Severity) {
        (SmolStr::new_static(self.as_str()), self.severity())
    }
}

/// Classify a lint message by keyword. Checked in order spelling,
/// punctuation, style; anything else is grammar.
pub fn categorize(message: &str) -> LintCategory {
    let message = message.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| message.contains(k));

    if mentions(SPELLING_KEYWORDS) {
        LintCategory::Spelling
    } else if mentions(PUNCTUATION_KEYWORDS) {
        LintCategory::Punctuation
    } else if mentions(STYLE_KEYWORDS) {
        LintCategory::Style
    } else {
        LintCategory::Grammar
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("Did you mean to spell `teh` this way? Possibly misspelled."), LintCategory::Spelling);
        assert_eq!(categorize("Unknown word"), LintCategory::Spelling);
        assert_eq!(categorize("Missing COMMA before clause"), LintCategory::Punctuation);
        assert_eq!(categorize("Consider a shorter phrase"), LintCategory::Style);
        assert_eq!(categorize("Subject and verb disagree"), LintCategory::Grammar);
        assert_eq!(LintCategory::Style.severity(), Severity::Suggestion);
        assert_eq!(LintCategory::Grammar.severity(), Severity::Warning);
    }

    #[test]
    fn test_suggestion_policy() {
        let many = ["the", "tea", "ten"];
        assert_eq!(SuggestionPolicy::First.collapse(&many), "the");
        assert_eq!(SuggestionPolicy::Join.collapse(&many), "the, tea, ten");
        let none: [&str; 0] = [];
        assert_eq!(SuggestionPolicy::First.collapse(&none), "");
        assert_eq!(SuggestionPolicy::Join.collapse(&none), "");
    }

    #[test]
    fn test_from_lint() {
        let text = "Teh fox is happy.";
        let lint = LintReport {
            span: 0..3,
            message: "Possibly misspelled".into(),
            suggestions: vec!["Teh".into(), "The".into(), "Tea".into()],
        };

        let issue = Issue::from_lint(text, &lint, SuggestionPolicy::First).unwrap();
        assert_eq!(issue.original_text, "Teh");
        assert_eq!(issue.suggestion, "The");
        assert_eq!(issue.kind, "spelling");
        assert_eq!(issue.severity, Severity::Error);
        assert_eq!(issue.range(), 0..3);

        let out_of_range = LintReport {
            span: 10..40,
            ..lint
        };
        assert!(Issue::from_lint(text, &out_of_range, SuggestionPolicy::Join).is_none());
    }

    #[test]
    fn test_issue_json_is_camel_case() {
        let issue: Issue = serde_json::from_str(
            r#"{"start":4,"end":9,"originalText":"quick","suggestion":"fast","severity":"suggestion"}"#,
        )
        .unwrap();
        assert_eq!(issue.original_text, "quick");
        assert_eq!(issue.severity, Severity::Suggestion);
        assert_eq!(issue.len(), 5);
        assert!(issue.kind.is_empty());
    }
}
