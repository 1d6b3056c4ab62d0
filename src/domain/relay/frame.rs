/// One unit of client-visible output, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Incremental answer content
    Delta(String),
    /// Terminal frame carrying `finish_reason = stop`
    Finish,
    /// The `[DONE]` sentinel
    Done,
}

impl StreamFrame {
    pub fn delta(content: impl Into<String>) -> Self {
        Self::Delta(content.into())
    }
}

/// Split text into pieces of at most `size` characters.
///
/// Splits on `char` boundaries so multi-byte text is never cut mid-rune.
pub fn split_runes(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let mut pieces = Vec::with_capacity(text.len() / size + 1);
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        current.push(ch);
        count += 1;
        if count == size {
            pieces.push(std::mem::take(&mut current));
            count = 0;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }

    pieces
}
