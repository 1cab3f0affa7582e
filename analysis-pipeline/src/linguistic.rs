//! Rule-based linguistic features. No model involved, so these are
//! computed once per source row regardless of which classifiers run.

use std::sync::LazyLock;

use regex::Regex;

const FIRST_PERSON_PRONOUNS: [&str; 10] = [
    "i", "me", "my", "mine", "myself", "we", "us", "our", "ours", "ourselves",
];

/// Texts under this many words produce an all-zero snapshot rather than
/// meaningless ratios.
const MIN_WORDS: usize = 5;

#[allow(clippy::expect_used)]
static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinguisticSnapshot {
    pub flesch_reading_ease: f64,
    pub avg_sentence_length: f64,
    pub lexical_diversity: f64,
    pub first_person_ratio: f64,
    pub exclamation_count: usize,
    pub question_count: usize,
}

pub fn linguistic_features(text: &str) -> LinguisticSnapshot {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered.split_whitespace().collect();
    let total_words = words.len();
    if total_words < MIN_WORDS {
        return LinguisticSnapshot::default();
    }

    let unique_words = {
        let mut sorted = words.clone();
        sorted.sort_unstable();
        sorted.dedup();
        sorted.len()
    };

    let num_sentences = SENTENCE_SPLIT
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);

    let first_person = words
        .iter()
        .filter(|word| FIRST_PERSON_PRONOUNS.contains(word))
        .count();

    LinguisticSnapshot {
        flesch_reading_ease: flesch_reading_ease(&words, num_sentences),
        avg_sentence_length: total_words as f64 / num_sentences as f64,
        lexical_diversity: unique_words as f64 / total_words as f64,
        first_person_ratio: first_person as f64 / total_words as f64,
        exclamation_count: text.matches('!').count(),
        question_count: text.matches('?').count(),
    }
}

/// 206.835 − 1.015·(words/sentences) − 84.6·(syllables/words), with a
/// heuristic syllable counter standing in for a pronunciation dictionary.
fn flesch_reading_ease(words: &[&str], num_sentences: usize) -> f64 {
    let total_syllables: usize = words.iter().map(|word| syllable_count(word)).sum();
    let words_per_sentence = words.len() as f64 / num_sentences as f64;
    let syllables_per_word = total_syllables as f64 / words.len() as f64;

    206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word
}

/// Vowel-group counting with a silent-e adjustment, clamped to at least
/// one syllable per word.
fn syllable_count(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 1;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut groups = 0;
    let mut in_group = false;
    for &letter in &letters {
        if is_vowel(letter) {
            if !in_group {
                groups += 1;
            }
            in_group = true;
        } else {
            in_group = false;
        }
    }

    if groups > 1 && letters.ends_with(&['e']) && !letters.ends_with(&['l', 'e']) {
        groups -= 1;
    }
    groups.max(1)
}
