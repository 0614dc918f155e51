//! Text normalization for the stylistic classifier.
//!
//! Non-letters become spaces, words are lowercased, English stop words are
//! dropped, and the rest are stemmed. The output is a pure function of the
//! input and matches the preprocessing the classifier was trained with.

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::sync::OnceLock;

/// English stop words (the NLTK list the model was trained against)
const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

/// Normalize `content` into the space-separated stem sequence the
/// classifier expects.
pub fn normalize(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }

    let stemmer = Stemmer::create(Algorithm::English);
    let letters_only: String = content
        .chars()
        .map(|c| if c.is_ascii_alphabetic() { c.to_ascii_lowercase() } else { ' ' })
        .collect();

    letters_only
        .split_whitespace()
        .filter(|w| !is_stop_word(w))
        .map(|w| stemmer.stem(w).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized form of a title plus optional body, as the classifier sees it.
pub fn normalize_item(title: &str, text: &str) -> String {
    normalize(&format!("{} {}", title, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_non_letters_and_case() {
        assert_eq!(normalize("BREAKING!!! 100% Shocking"), "break shock");
    }

    #[test]
    fn test_drops_stop_words() {
        assert_eq!(normalize("the and of it"), "");
        assert!(is_stop_word("the"));
        assert!(!is_stop_word("senate"));
    }

    #[test]
    fn test_stems_words() {
        assert_eq!(normalize("running runs"), "run run");
    }

    #[test]
    fn test_is_deterministic() {
        let input = "Senate passes the new climate bill after a long debate";
        assert_eq!(normalize(input), normalize(input));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("1234 !!"), "");
    }

    #[test]
    fn test_normalize_item_joins_title_and_text() {
        assert_eq!(normalize_item("Senate", "votes"), normalize("Senate votes"));
    }
}
