//! Sentence-level splitting of transcript text.

/// A trimmed, non-empty sentence of the transcript with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub index: usize,
    pub text: String,
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '?' | '!')
}

/// Split text after every `.`, `?` or `!` that is followed by whitespace.
///
/// Spans are trimmed and empty pieces are dropped; text without any
/// terminator is a single span.
pub fn split_spans(text: &str) -> Vec<Span> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        if let Some(&(next_pos, next)) = chars.peek() {
            if next.is_whitespace() {
                pieces.push(&text[start..next_pos]);
                start = next_pos;
            }
        }
    }
    pieces.push(&text[start..]);

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(index, text)| Span {
            index,
            text: text.to_string(),
        })
        .collect()
}

/// Text embedded for each span: the span together with `buffer_size`
/// neighbours on either side.
///
/// Smoothing over neighbours keeps a single off-topic sentence from
/// producing two boundaries.
pub fn combine_with_neighbours(spans: &[Span], buffer_size: usize) -> Vec<String> {
    (0..spans.len())
        .map(|i| {
            let from = i.saturating_sub(buffer_size);
            let to = (i + buffer_size + 1).min(spans.len());
            join_spans(&spans[from..to])
        })
        .collect()
}

/// Reconstitute plain text from consecutive spans.
pub fn join_spans(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
