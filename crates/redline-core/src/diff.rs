//! Turn a "fixed" rewrite of a text into a change region.

use std::ops::Range;

use smol_str::SmolStr;

use crate::document::Severity;
use crate::issue::Issue;

/// One changed region between an original text and its rewrite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextDifference {
    /// Char range in the original text.
    pub range: Range<usize>,
    pub original: SmolStr,
    pub suggestion: SmolStr,
}

impl TextDifference {
    /// An issue replacing `original` with `suggestion`.
    pub fn into_issue(self, message: impl Into<SmolStr>, kind: impl Into<SmolStr>) -> Issue {
        Issue::new(self.range, self.original)
            .with_suggestion(self.suggestion)
            .with_message(message)
            .with_kind(kind)
            .with_severity(Severity::Suggestion)
    }
}

/// Find the changed region between `original` and `fixed`.
///
/// Strips the longest common prefix and then the longest common suffix
/// that does not run into it. Produces at most one difference; identical
/// texts produce none.
pub fn text_differences(original: &str, fixed: &str) -> Vec<TextDifference> {
    let a: Vec<char> = original.chars().collect();
    let b: Vec<char> = fixed.chars().collect();

    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    if prefix == a.len() && prefix == b.len() {
        return Vec::new();
    }

    let mut a_end = a.len();
    let mut b_end = b.len();
    while a_end > prefix && b_end > prefix && a[a_end - 1] == b[b_end - 1] {
        a_end -= 1;
        b_end -= 1;
    }

    vec![TextDifference {
        range: prefix..a_end,
        original: a[prefix..a_end].iter().collect::<String>().into(),
        suggestion: b[prefix..b_end].iter().collect::<String>().into(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical() {
        assert!(text_differences("same", "same").is_empty());
        assert!(text_differences("", "").is_empty());
    }

    #[test]
    fn test_replacement_in_middle() {
        let diffs = text_differences("It is very big.", "It is huge.");
        assert_eq!(
            diffs,
            vec![TextDifference {
                range: 6..14,
                original: "very big".into(),
                suggestion: "huge".into(),
            }]
        );
    }

    #[test]
    fn test_pure_insertion_has_empty_range() {
        let diffs = text_differences("abc", "abXc");
        assert_eq!(diffs[0].range, 2..2);
        assert_eq!(diffs[0].suggestion, "X");
    }

    #[test]
    fn test_repeated_chars_do_not_cross() {
        let diffs = text_differences("aaa", "aa");
        assert_eq!(diffs[0].range, 2..3);
        assert_eq!(diffs[0].suggestion, "");
    }

    #[test]
    fn test_into_issue() {
        let issue = text_differences("Teh fox", "The fox")
            .remove(0)
            .into_issue("Spelling", "spelling");
        assert_eq!(issue.range(), 1..3);
        assert_eq!(issue.original_text, "eh");
        assert_eq!(issue.suggestion, "he");
        assert_eq!(issue.severity, Severity::Suggestion);
    }
}
