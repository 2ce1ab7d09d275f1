//! Textual round-trip format: parenthesized prefix notation.
//!
//! ```text
//! node := "(" SEP value SEP node SEP node SEP ")"
//! node := "nil"
//! ```
//!
//! Tokens are joined by a single configurable separator character; an absent
//! child is the literal `nil`. Printing a verified tree and reading the
//! stream back reproduces the same shape and payload values.

use std::fs;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use generational_arena::Index;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, TreeResult};
use crate::domain::tree::{Tree, TreeRenderer};
use crate::domain::value::Value;

impl Tree {
    /// Serializes the tree to `out`: verify first, and on failure emit a
    /// best-effort diagnostic dump before returning the original error.
    #[instrument(level = "debug", skip(self, out, renderer))]
    pub fn print_to<W: Write>(
        &mut self,
        out: &mut W,
        separator: char,
        renderer: Option<&mut dyn TreeRenderer>,
    ) -> TreeResult<()> {
        if let Err(err) = self.verify() {
            if let Some(r) = renderer {
                if let Err(dump_err) = self.dump(r) {
                    debug!("diagnostic dump failed: {}", dump_err);
                }
            }
            return Err(err);
        }
        let root = self.root().ok_or(DomainError::NoRoot)?;
        let mut tokens = Vec::new();
        self.collect_tokens(Some(root), &mut tokens)?;
        let sep = separator.to_string();
        writeln!(out, "{}", tokens.iter().join(&sep))?;
        Ok(())
    }

    /// [`Tree::print_to`] into a freshly created file.
    pub fn print_to_file(
        &mut self,
        path: &Path,
        separator: char,
        renderer: Option<&mut dyn TreeRenderer>,
    ) -> TreeResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.print_to(&mut out, separator, renderer)?;
        out.flush()?;
        Ok(())
    }

    fn collect_tokens(&self, node: Option<Index>, tokens: &mut Vec<String>) -> TreeResult<()> {
        match node {
            None => tokens.push("nil".to_string()),
            Some(idx) => {
                let rec = self.node(idx)?;
                tokens.push("(".to_string());
                tokens.push(rec.value.to_string());
                self.collect_tokens(rec.left, tokens)?;
                self.collect_tokens(rec.right, tokens)?;
                tokens.push(")".to_string());
            }
        }
        Ok(())
    }

    /// Parses a serialized tree from `text`. The parsed root binds into a
    /// fresh tree, which is then verified; on verification failure a
    /// best-effort dump is emitted before the error is returned.
    #[instrument(level = "debug", skip(text, renderer))]
    pub fn read_from_str(
        text: &str,
        separator: char,
        max_size: u64,
        renderer: Option<&mut dyn TreeRenderer>,
    ) -> TreeResult<Tree> {
        let tokens: Vec<&str> = text
            .split(separator)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        let mut stream = TokenStream {
            tokens,
            pos: 0,
            depth: 0,
            max_depth: max_size,
        };
        let mut tree = Tree::new(max_size);
        let root = match stream.parse_child(&mut tree)? {
            Some(root) => root,
            None => return Err(DomainError::NoRoot),
        };
        if stream.pos != stream.tokens.len() {
            return Err(DomainError::Syntax {
                pos: stream.pos,
                found: stream.tokens[stream.pos].to_string(),
                expected: "end of input",
            });
        }
        tree.bind_root(root)?;
        if let Err(err) = tree.verify() {
            if let Some(r) = renderer {
                if let Err(dump_err) = tree.dump(r) {
                    debug!("diagnostic dump failed: {}", dump_err);
                }
            }
            return Err(err);
        }
        debug!(nodes = tree.len(), "tree read");
        Ok(tree)
    }

    /// Reads a serialized tree from a file. The content is loaded whole and
    /// scope-owned, so neither the handle nor the buffer can outlive the
    /// call on any path.
    pub fn read_from_file(
        path: &Path,
        separator: char,
        max_size: u64,
        renderer: Option<&mut dyn TreeRenderer>,
    ) -> TreeResult<Tree> {
        let text = fs::read_to_string(path)?;
        Self::read_from_str(&text, separator, max_size, renderer)
    }
}

/// Recursive-descent state over the separator-split token list.
struct TokenStream<'a> {
    tokens: Vec<&'a str>,
    pos: usize,
    depth: u64,
    max_depth: u64,
}

impl<'a> TokenStream<'a> {
    fn next(&mut self, expected: &'static str) -> TreeResult<&'a str> {
        match self.tokens.get(self.pos) {
            Some(&tok) => {
                self.pos += 1;
                Ok(tok)
            }
            None => Err(DomainError::Syntax {
                pos: self.pos,
                found: "<end of input>".to_string(),
                expected,
            }),
        }
    }

    /// One `node` production: a token containing `(` opens a node, a token
    /// containing `nil` is an absent child, anything else is a syntax error.
    fn parse_child(&mut self, tree: &mut Tree) -> TreeResult<Option<Index>> {
        let tok = self.next("'(' or 'nil'")?;
        if tok.contains('(') {
            self.parse_node(tree).map(Some)
        } else if tok.contains("nil") {
            Ok(None)
        } else {
            Err(DomainError::Syntax {
                pos: self.pos - 1,
                found: tok.to_string(),
                expected: "'(' or 'nil'",
            })
        }
    }

    fn parse_node(&mut self, tree: &mut Tree) -> TreeResult<Index> {
        // Nesting bound: the factory only allocates at the closing paren,
        // so unclosed-open floods must be caught by depth, not node count.
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(DomainError::SizeExceeded {
                size: self.depth,
                max: self.max_depth,
            });
        }

        let tok = self.next("a value")?;
        let value = Value::parse_token(tok).ok_or_else(|| DomainError::Syntax {
            pos: self.pos - 1,
            found: tok.to_string(),
            expected: "a value",
        })?;
        let left = self.parse_child(tree)?;
        let right = self.parse_child(tree)?;
        let close = self.next("')'")?;
        if !close.contains(')') {
            return Err(DomainError::Syntax {
                pos: self.pos - 1,
                found: close.to_string(),
                expected: "')'",
            });
        }
        self.depth -= 1;
        // Counts are established here, bottom-up, by the ordinary factory.
        tree.new_node(value, left, right)
    }
}
