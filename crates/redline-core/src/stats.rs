//! Word counts and a Flesch-style readability estimate.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Summary statistics for a piece of flattened text.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStats {
    pub word_count: usize,
    /// Length in chars.
    pub character_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    /// Rounded to one decimal place.
    pub average_words_per_sentence: f64,
    /// Flesch reading ease, clamped to 0..=100.
    pub readability_score: u8,
}

impl TextStats {
    pub fn compute(text: &str) -> Self {
        let words = words(text);
        let sentence_count = count_sentences(text);
        let word_count = words.len();

        let words_per_sentence = if sentence_count > 0 {
            word_count as f64 / sentence_count as f64
        } else {
            0.0
        };
        let syllables_per_word = if word_count > 0 {
            words.iter().map(|w| syllables(w)).sum::<usize>() as f64 / word_count as f64
        } else {
            0.0
        };
        let score = (206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word).clamp(0.0, 100.0);

        Self {
            word_count,
            character_count: text.chars().count(),
            sentence_count,
            paragraph_count: count_paragraphs(text),
            average_words_per_sentence: (words_per_sentence * 10.0).round() / 10.0,
            readability_score: score.round() as u8,
        }
    }

    pub fn readability_label(&self) -> &'static str {
        readability_label(self.readability_score)
    }
}

/// Human label for a reading-ease score.
pub fn readability_label(score: u8) -> &'static str {
    match score {
        90.. => "Very Easy",
        80..=89 => "Easy",
        70..=79 => "Fairly Easy",
        60..=69 => "Standard",
        50..=59 => "Fairly Difficult",
        30..=49 => "Difficult",
        _ => "Very Difficult",
    }
}

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9A-Za-z_]+").unwrap());
static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());
static PARAGRAPH_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());
static VOWEL_GROUP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[aeiouy]+").unwrap());

/// Maximal runs of ASCII word characters.
fn words(text: &str) -> Vec<&str> {
    WORD_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Runs of sentence-ending punctuation; `?!` counts once.
fn count_sentences(text: &str) -> usize {
    SENTENCE_END_RE.find_iter(text).count()
}

/// Non-blank pieces between blank-line breaks.
fn count_paragraphs(text: &str) -> usize {
    PARAGRAPH_BREAK_RE
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .count()
}

/// Vowel-group heuristic with a silent-e adjustment.
fn syllables(word: &str) -> usize {
    let word = word.to_ascii_lowercase();
    if word.len() <= 3 {
        return 1;
    }

    let mut count = VOWEL_GROUP_RE.find_iter(&word).count().max(1);
    if word.ends_with('e') {
        count -= 1;
    }
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syllables() {
        assert_eq!(syllables("the"), 1);
        assert_eq!(syllables("table"), 1);
        assert_eq!(syllables("reading"), 2);
        assert_eq!(syllables("beautiful"), 3);
        assert_eq!(syllables("rhythm"), 1);
        assert_eq!(syllables("xyzzz"), 1);
    }

    #[test]
    fn test_counts() {
        let stats = TextStats::compute("The cat sat. The dog ran!\n\nIt rained?!\n  \nEnd");
        assert_eq!(stats.word_count, 9);
        assert_eq!(stats.sentence_count, 3);
        assert_eq!(stats.paragraph_count, 3);
        assert_eq!(stats.average_words_per_sentence, 3.0);
    }

    #[test]
    fn test_word_pattern_is_ascii() {
        // accented letters split words, as the ASCII word class does
        assert_eq!(words("café au lait_2"), vec!["caf", "au", "lait_2"]);
        assert_eq!(count_paragraphs("one\n \t\ntwo\n\n\n"), 2);
        assert_eq!(count_sentences("Wait... what?! No"), 2);
    }

    #[test]
    fn test_empty_text() {
        let stats = TextStats::compute("");
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.paragraph_count, 0);
        assert_eq!(stats.readability_score, 100);
        assert_eq!(stats.readability_label(), "Very Easy");
    }

    #[test]
    fn test_short_words_read_easily() {
        let stats = TextStats::compute("The cat sat on the mat.");
        // six one-syllable words in one sentence
        assert_eq!(stats.readability_score, 100);
    }

    #[test]
    fn test_labels() {
        assert_eq!(readability_label(95), "Very Easy");
        assert_eq!(readability_label(80), "Easy");
        assert_eq!(readability_label(65), "Standard");
        assert_eq!(readability_label(55), "Fairly Difficult");
        assert_eq!(readability_label(30), "Difficult");
        assert_eq!(readability_label(10), "Very Difficult");
    }
}
