//! Token sorting text utility.
//!
//! Reads a file into memory, splits it into tokens on a terminator
//! character, sorts the tokens under a configurable comparison policy
//! (forward or reversed character order, case-insensitive, ignoring a fixed
//! set of punctuation characters), and writes tokens or raw text back out.
//! Unrelated to the tree engine; it shares only the error type.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::instrument;

use crate::domain::error::TreeResult;

/// Characters skipped during comparison unless the caller overrides them.
pub const IGNORED_CHARS: &str = " ,.;:'\"-!?`~()[]{}";

/// Direction tokens are compared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Compare characters from the start of each token.
    #[default]
    StartToEnd,
    /// Compare characters from the end of each token (rhyme order).
    EndToStart,
}

/// A file's content split into terminator-separated tokens.
#[derive(Debug)]
pub struct Text {
    raw: String,
    tokens: Vec<String>,
    terminator: char,
}

impl Text {
    #[instrument(level = "debug")]
    pub fn from_file(path: &Path, terminator: char) -> TreeResult<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_string(raw, terminator))
    }

    pub fn from_string(raw: String, terminator: char) -> Self {
        let tokens = raw.split(terminator).map(str::to_string).collect();
        Self {
            raw,
            tokens,
            terminator,
        }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Sorts tokens case-insensitively, skipping `ignored` characters,
    /// forward or reversed per `order`.
    #[instrument(level = "debug", skip(self))]
    pub fn sort_tokens(&mut self, order: SortOrder, ignored: &str) {
        let reversed = order == SortOrder::EndToStart;
        self.tokens
            .sort_by_cached_key(|token| sort_key(token, reversed, ignored));
    }

    /// Writes one token per line, skipping empty tokens.
    pub fn write_tokens<W: Write>(&self, out: &mut W) -> TreeResult<()> {
        for token in &self.tokens {
            if token.is_empty() {
                continue;
            }
            out.write_all(token.as_bytes())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Writes the raw text unchanged.
    pub fn write_raw<W: Write>(&self, out: &mut W) -> TreeResult<()> {
        out.write_all(self.raw.as_bytes())?;
        Ok(())
    }

    pub fn terminator(&self) -> char {
        self.terminator
    }
}

fn sort_key(token: &str, reversed: bool, ignored: &str) -> Vec<char> {
    let significant = |c: &char| !ignored.contains(*c);
    if reversed {
        token
            .chars()
            .rev()
            .filter(significant)
            .flat_map(char::to_lowercase)
            .collect()
    } else {
        token
            .chars()
            .filter(significant)
            .flat_map(char::to_lowercase)
            .collect()
    }
}
