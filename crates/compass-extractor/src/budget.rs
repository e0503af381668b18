//! Token-budget guard
//!
//! Token counts are estimated as `chars / chars_per_token`. Text over the
//! ceiling is cut to the first `max_tokens * chars_per_token` characters, so
//! the same input always yields the same truncated text.

use std::borrow::Cow;

/// Input ceiling for one extraction call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    max_tokens: usize,
    chars_per_token: usize,
}

/// Text that fits the budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fitted<'a> {
    /// Text to send
    pub text: Cow<'a, str>,
    /// Estimated tokens before truncation
    pub original_tokens: usize,
    /// Estimated tokens after truncation
    pub kept_tokens: usize,
}

impl Fitted<'_> {
    /// Whether the text had to be cut
    pub fn truncated(&self) -> bool {
        matches!(self.text, Cow::Owned(_))
    }
}

impl TokenBudget {
    /// Create a budget; a zero `chars_per_token` is treated as 1
    pub fn new(max_tokens: usize, chars_per_token: usize) -> Self {
        Self {
            max_tokens,
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Ceiling in tokens
    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Estimated token count of `text`
    pub fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_token
    }

    /// Truncate `text` if its estimate exceeds the ceiling
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_extractor::TokenBudget;
    ///
    /// let budget = TokenBudget::new(2, 4);
    /// let fitted = budget.fit("abcdefghijklmnop");
    /// assert!(fitted.truncated());
    /// assert_eq!(fitted.text, "abcdefgh");
    ///
    /// assert!(!budget.fit("short").truncated());
    /// ```
    pub fn fit<'a>(&self, text: &'a str) -> Fitted<'a> {
        let original_tokens = self.estimate_tokens(text);
        if original_tokens <= self.max_tokens {
            return Fitted {
                text: Cow::Borrowed(text),
                original_tokens,
                kept_tokens: original_tokens,
            };
        }

        let max_chars = self.max_tokens.saturating_mul(self.chars_per_token);
        let cut = text
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(text.len());
        let kept = text[..cut].to_string();
        let kept_tokens = self.estimate_tokens(&kept);

        Fitted {
            text: Cow::Owned(kept),
            original_tokens,
            kept_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_estimate_is_len_over_four() {
        let budget = TokenBudget::new(100, 4);
        assert_eq!(budget.estimate_tokens(""), 0);
        assert_eq!(budget.estimate_tokens("abcdefgh"), 2);
        assert_eq!(budget.estimate_tokens("abcdefghi"), 2);
    }

    #[test]
    fn test_exactly_at_ceiling_is_untouched() {
        let budget = TokenBudget::new(2, 4);
        let fitted = budget.fit("abcdefghi");
        assert!(!fitted.truncated());
    }

    #[test]
    fn test_multibyte_text_cuts_on_char_boundary() {
        let budget = TokenBudget::new(1, 4);
        let fitted = budget.fit("€€€€€€€€");
        assert_eq!(fitted.text, "€€€€");
        assert_eq!(fitted.kept_tokens, 1);
    }

    proptest! {
        #[test]
        fn prop_fit_respects_ceiling_and_is_deterministic(
            text in "\\PC{0,400}",
            max in 1usize..50,
        ) {
            let budget = TokenBudget::new(max, 4);
            let a = budget.fit(&text);
            let b = budget.fit(&text);
            prop_assert_eq!(&a, &b);
            prop_assert!(a.kept_tokens <= max);
            prop_assert!(text.starts_with(a.text.as_ref()));
        }
    }
}
