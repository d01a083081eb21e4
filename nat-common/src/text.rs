//! Article text processing
//!
//! Pure functions used to render articles and validate worker input:
//! - Paragraph segmentation for long article bodies
//! - Title capitalization
//! - Word and character counting

/// Minimum words in a paragraph before a break may be inserted
pub const PARAGRAPH_MIN_WORDS: usize = 150;

/// Lowercase minor words left uncapitalized in titles (exact, case-sensitive match)
pub const TITLE_MINOR_WORDS: &[&str] = &[
    "a", "to", "off", "over", "from", "into", "with", "yet", "so", "an", "and", "as", "at", "but",
    "by", "for", "in", "nor", "of", "on", "or", "the", "up",
];

/// Split an article body into display paragraphs
///
/// Tokens are accumulated until a token both brings the paragraph to at
/// least [`PARAGRAPH_MIN_WORDS`] words and ends with a period, provided
/// the token is not inside a quoted span. A token containing an odd number
/// of `"` characters toggles the quoted-span flag.
///
/// The quote tracking is a per-token heuristic: quotes split unusually
/// across tokens can be mis-tracked. Concatenating the tokens of all
/// returned paragraphs always reproduces the input token sequence.
pub fn segment_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut inside_quote = false;

    for token in text.split_whitespace() {
        current.push(token);

        if token.matches('"').count() % 2 == 1 {
            inside_quote = !inside_quote;
        }

        if current.len() >= PARAGRAPH_MIN_WORDS && token.ends_with('.') && !inside_quote {
            paragraphs.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }

    paragraphs
}

/// Capitalize a headline for display
///
/// Splits on single spaces and forces the first character of each token to
/// uppercase, leaving the remainder of the token untouched. Tokens exactly
/// matching a [`TITLE_MINOR_WORDS`] entry stay as they are, except the first
/// token which is always capitalized.
pub fn capitalize_title(title: &str) -> String {
    title
        .split(' ')
        .enumerate()
        .map(|(position, token)| {
            if position > 0 && TITLE_MINOR_WORDS.contains(&token) {
                token.to_string()
            } else {
                capitalize_first(token)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize_first(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Count whitespace-delimited words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Count characters of the trimmed text (Unicode scalar values)
pub fn count_characters(text: &str) -> usize {
    text.trim().chars().count()
}
