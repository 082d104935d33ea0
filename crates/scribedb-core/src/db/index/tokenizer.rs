use scribedb_config::{TextConfig, TokenizerKind};
use std::{collections::BTreeMap, fmt::Write as _};
use xxhash_rust::xxh3::xxh3_64;

/// Separates the kept prefix of an oversized token from its digest.
/// Never produced by tokenization, so digested tokens cannot collide
/// with plain ones.
const DIGEST_SEPARATOR: char = '#';
const DIGEST_HEX_LEN: usize = 16;

///
/// Tokenizer
///
/// Deterministic text splitter shared by index build and query evaluation.
/// Both modes split on non-alphanumeric characters and lowercase.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tokenizer {
    mode: Mode,
    max_token_bytes: usize,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Word,
    NGram(usize),
}

impl Tokenizer {
    pub const DEFAULT_MAX_TOKEN_BYTES: usize = 64;

    #[must_use]
    pub const fn word() -> Self {
        Self {
            mode: Mode::Word,
            max_token_bytes: Self::DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    /// Overlapping character n-grams per word; words shorter than `n`
    /// are kept whole.
    #[must_use]
    pub const fn ngram(n: usize) -> Self {
        Self {
            mode: Mode::NGram(if n == 0 { 1 } else { n }),
            max_token_bytes: Self::DEFAULT_MAX_TOKEN_BYTES,
        }
    }

    #[must_use]
    pub const fn with_max_token_bytes(mut self, max: usize) -> Self {
        self.max_token_bytes = max;
        self
    }

    #[must_use]
    pub fn from_config(config: &TextConfig) -> Self {
        let base = match config.tokenizer {
            TokenizerKind::Word => Self::word(),
            TokenizerKind::Ngram => Self::ngram(config.ngram_size),
        };

        base.with_max_token_bytes(config.max_token_bytes)
    }

    /// Token sequence in text order, repeats included.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();

        for word in words(text) {
            match self.mode {
                Mode::Word => out.push(self.bound(word)),
                Mode::NGram(n) => {
                    let chars: Vec<char> = word.chars().collect();
                    if chars.len() <= n {
                        out.push(self.bound(word));
                    } else {
                        out.extend(
                            chars
                                .windows(n)
                                .map(|w| self.bound(w.iter().collect::<String>())),
                        );
                    }
                }
            }
        }

        out
    }

    /// Distinct tokens with their frequencies, in token order.
    #[must_use]
    pub fn term_frequencies(&self, text: &str) -> BTreeMap<String, u32> {
        let mut freqs = BTreeMap::new();
        for token in self.tokenize(text) {
            let tf = freqs.entry(token).or_insert(0u32);
            *tf = tf.saturating_add(1);
        }

        freqs
    }

    // Oversized tokens keep a char-aligned prefix followed by an xxh3 digest
    // of the full token.
    fn bound(&self, token: String) -> String {
        if token.len() <= self.max_token_bytes {
            return token;
        }

        let budget = self
            .max_token_bytes
            .saturating_sub(DIGEST_HEX_LEN + DIGEST_SEPARATOR.len_utf8());
        let mut cut = budget.min(token.len());
        while !token.is_char_boundary(cut) {
            cut -= 1;
        }

        let mut out = String::with_capacity(self.max_token_bytes);
        out.push_str(&token[..cut]);
        out.push(DIGEST_SEPARATOR);
        let _ = write!(out, "{:016x}", xxh3_64(token.as_bytes()));

        out
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::word()
    }
}

// Maximal alphanumeric runs, lowercased.
fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

///
/// TESTS
///
