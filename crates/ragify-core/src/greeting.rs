//! Greeting fast-path.
//!
//! Inputs that look like a greeting get a canned welcome reply without
//! touching the embedder, the store, or the model.

use serde::Deserialize;

/// Keywords recognised as greetings unless configured otherwise.
pub const DEFAULT_GREETING_KEYWORDS: &[&str] = &["hello", "hi", "hey", "hola"];

/// How keywords are matched against the lower-cased input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GreetingMatch {
    /// Keyword appears anywhere in the input ("this" contains "hi").
    #[default]
    Substring,
    /// Keyword equals one alphanumeric word of the input.
    Word,
}

#[derive(Debug, Clone)]
pub struct GreetingFilter {
    keywords: Vec<String>,
    mode: GreetingMatch,
}

impl GreetingFilter {
    pub fn new<I, S>(keywords: I, mode: GreetingMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            mode,
        }
    }

    pub fn is_greeting(&self, input: &str) -> bool {
        let input = input.to_lowercase();
        match self.mode {
            GreetingMatch::Substring => self.keywords.iter().any(|k| input.contains(k.as_str())),
            GreetingMatch::Word => input
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| self.keywords.iter().any(|k| k == word)),
        }
    }
}

impl Default for GreetingFilter {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING_KEYWORDS, GreetingMatch::Substring)
    }
}
