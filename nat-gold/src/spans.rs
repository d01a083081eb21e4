//! Span text normalization and matching
//!
//! Two workers rarely highlight exactly the same characters. Spans are
//! compared after normalization: lowercase, punctuation removed, split on
//! whitespace.

use std::collections::HashSet;

/// English stop words ignored when deciding whether two spans agree
pub const STOP_WORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for",
    "with", "about", "against", "between", "into", "through", "during", "before", "after",
    "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where", "why", "how", "all",
    "any", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor", "not",
    "only", "own", "same", "so", "than", "too", "very", "can", "will", "just", "don", "should",
    "now",
];

/// Shared tokens two spans need before they count as the same span
pub const MIN_SHARED_TOKENS: usize = 2;

/// Context tokens kept on each side of an intersection
pub const DEFAULT_PAD: usize = 2;

/// Lowercase, drop everything except word characters and whitespace, trim
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text).split_whitespace().map(str::to_string).collect()
}

fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Whether the spans share at least [`MIN_SHARED_TOKENS`] tokens
pub fn shares_tokens(a: &str, b: &str) -> bool {
    token_set(a).intersection(&token_set(b)).count() >= MIN_SHARED_TOKENS
}

/// Same as [`shares_tokens`] with [`STOP_WORDS`] removed from both sides
pub fn shares_content_tokens(a: &str, b: &str) -> bool {
    let content = |text: &str| -> HashSet<String> {
        token_set(text)
            .into_iter()
            .filter(|t| !STOP_WORDS.contains(&t.as_str()))
            .collect()
    };
    content(a).intersection(&content(b)).count() >= MIN_SHARED_TOKENS
}

/// Two worker spans refer to the same passage
///
/// One normalized span must contain the other, and they must share enough
/// content tokens that a containment on a couple of stop words does not count.
pub fn spans_match(a: &str, b: &str) -> bool {
    let (na, nb) = (normalize(a), normalize(b));
    (na.contains(&nb) || nb.contains(&na)) && shares_content_tokens(a, b)
}

/// Common core of two spans widened by `pad` tokens of context
///
/// The window is taken from whichever span yields the shorter text. Returns
/// `None` when the spans share no token.
pub fn padded_intersection(a: &str, b: &str, pad: usize) -> Option<String> {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    let shared: HashSet<&str> = tokens_a
        .iter()
        .filter(|t| tokens_b.contains(t))
        .map(String::as_str)
        .collect();
    if shared.is_empty() {
        return None;
    }

    let window = |tokens: &[String]| -> Option<String> {
        let first = tokens.iter().position(|t| shared.contains(t.as_str()))?;
        let last = tokens.iter().rposition(|t| shared.contains(t.as_str()))?;
        let start = first.saturating_sub(pad);
        let end = (last + pad + 1).min(tokens.len());
        Some(tokens[start..end].join(" "))
    };

    match (window(&tokens_a), window(&tokens_b)) {
        (Some(wa), Some(wb)) => Some(if wa.len() <= wb.len() { wa } else { wb }),
        (wa, wb) => wa.or(wb),
    }
}
