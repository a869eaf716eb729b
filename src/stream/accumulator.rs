//! The growing answer text for one question

/// Append-only answer buffer
///
/// Tokens are appended whole, so any reader observes a prefix-consistent
/// value. The buffer is only ever emptied by [`Accumulator::reset`] at the
/// start of a new question.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Accumulator {
    text: String,
    tokens: usize,
}

impl Accumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token and return the full answer so far
    pub fn append(&mut self, token: &str) -> &str {
        self.text.push_str(token);
        self.tokens += 1;
        &self.text
    }

    /// Empty the answer for a new question
    pub fn reset(&mut self) {
        self.text.clear();
        self.tokens = 0;
    }

    /// The full answer so far
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of tokens appended since the last reset
    pub fn token_count(&self) -> usize {
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut acc = Accumulator::new();
        let tokens = ["The ", "quick", " brown", "", " fox\n", "```"];

        let mut expected = String::new();
        for token in tokens {
            expected.push_str(token);
            assert_eq!(acc.append(token), expected);
        }

        assert_eq!(acc.as_str(), tokens.concat());
        assert_eq!(acc.token_count(), tokens.len());
    }

    #[test]
    fn test_reset() {
        let mut acc = Accumulator::new();
        acc.append("Hello");
        acc.reset();

        assert!(acc.is_empty());
        assert_eq!(acc.len(), 0);
        assert_eq!(acc.token_count(), 0);
        assert_eq!(acc.append("again"), "again");
    }
}
