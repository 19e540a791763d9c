//! Parser combinators over an immutable source cursor.
//!
//! A `Parser<T>` is a pure function from a cursor to an optional
//! `(value, next cursor)` pair; failure is simply "produced nothing at this
//! cursor", so alternatives can be retried from the same position without any
//! backtracking machinery. The kernel is deliberately small: a regex-matching
//! primitive plus `constant`, `or`, `many`, `maybe`, `bind`, `and` and `map`
//! are enough to express the whole grammar.

use crate::error::{CompileError, CompileResult};
use regex::Regex;
use std::cell::RefCell;
use std::rc::Rc;

/// Immutable position within the source text. Advancing creates a new cursor;
/// existing cursors are never touched.
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
  text: &'a str,
  index: usize,
}

impl<'a> Source<'a> {
  pub fn new(text: &'a str) -> Self {
    Self { text, index: 0 }
  }

  pub fn index(&self) -> usize {
    self.index
  }

  pub fn at_end(&self) -> bool {
    self.index == self.text.len()
  }

  /// Match `regex` anchored at the current position. Returns the matched text
  /// and a cursor advanced past it, or `None` when the pattern does not match
  /// here or the cursor is already at end of input.
  pub fn matches(&self, regex: &Regex) -> Option<Parsed<'a, String>> {
    if self.index >= self.text.len() {
      return None;
    }
    let found = regex.find(&self.text[self.index..])?;
    Some(Parsed {
      value: found.as_str().to_string(),
      rest: Source {
        text: self.text,
        index: self.index + found.end(),
      },
    })
  }
}

/// Successful parse: the produced value plus the cursor just past it.
#[derive(Debug, Clone)]
pub struct Parsed<'a, T> {
  pub value: T,
  pub rest: Source<'a>,
}

type Run<T> = dyn for<'a> Fn(Source<'a>) -> Option<Parsed<'a, T>>;

pub struct Parser<T> {
  run: Rc<Run<T>>,
}

impl<T> Clone for Parser<T> {
  fn clone(&self) -> Self {
    Self {
      run: Rc::clone(&self.run),
    }
  }
}

impl<T: 'static> Parser<T> {
  pub fn new(run: impl for<'a> Fn(Source<'a>) -> Option<Parsed<'a, T>> + 'static) -> Self {
    Self { run: Rc::new(run) }
  }

  pub fn parse<'a>(&self, source: Source<'a>) -> Option<Parsed<'a, T>> {
    (self.run)(source)
  }

  /// Always succeeds with a copy of `value`, consuming nothing.
  pub fn constant(value: T) -> Self
  where
    T: Clone,
  {
    Self::new(move |source| {
      Some(Parsed {
        value: value.clone(),
        rest: source,
      })
    })
  }

  /// Left-biased choice: the first alternative to succeed at the current
  /// cursor wins; `other` is only tried when `self` produced nothing.
  pub fn or(self, other: Parser<T>) -> Parser<T> {
    Parser::new(move |source| self.parse(source).or_else(|| other.parse(source)))
  }

  /// Zero or more repetitions. Always succeeds; stops at the first failure of
  /// the inner parser and yields the cursor after the last success.
  pub fn many(self) -> Parser<Vec<T>> {
    Parser::new(move |source| {
      let mut values = Vec::new();
      let mut current = source;
      while let Some(parsed) = self.parse(current) {
        values.push(parsed.value);
        current = parsed.rest;
      }
      Some(Parsed {
        value: values,
        rest: current,
      })
    })
  }

  /// Zero or one. On failure yields `None` at the original cursor.
  pub fn maybe(self) -> Parser<Option<T>> {
    Parser::new(move |source| match self.parse(source) {
      Some(parsed) => Some(Parsed {
        value: Some(parsed.value),
        rest: parsed.rest,
      }),
      None => Some(Parsed {
        value: None,
        rest: source,
      }),
    })
  }

  /// Run `self`, then feed its value to `callback` and run the parser it
  /// returns at the advanced cursor.
  pub fn bind<U: 'static>(self, callback: impl Fn(T) -> Parser<U> + 'static) -> Parser<U> {
    Parser::new(move |source| {
      let parsed = self.parse(source)?;
      callback(parsed.value).parse(parsed.rest)
    })
  }

  /// Sequence two parsers, discarding the first value.
  pub fn and<U: 'static>(self, next: Parser<U>) -> Parser<U> {
    self.bind(move |_| next.clone())
  }

  pub fn map<U: Clone + 'static>(self, callback: impl Fn(T) -> U + 'static) -> Parser<U> {
    self.bind(move |value| Parser::constant(callback(value)))
  }

  /// Forward declaration for mutually recursive productions. The returned
  /// parser delegates to whatever the slot is later defined as.
  ///
  /// Invoking the parser before the slot is defined is a programmer bug and
  /// panics.
  pub fn forward() -> (Parser<T>, ForwardSlot<T>) {
    let cell: Rc<RefCell<Option<Parser<T>>>> = Rc::new(RefCell::new(None));
    let parser = Parser::new({
      let cell = Rc::clone(&cell);
      move |source| {
        let defined = cell.borrow().clone();
        match defined {
          Some(parser) => parser.parse(source),
          None => panic!("forward parser invoked before it was defined"),
        }
      }
    });
    (parser, ForwardSlot { cell })
  }

  /// Run from the start of `text` and demand that the entire input is
  /// consumed, reporting the stuck byte index and the start of the remaining
  /// tail otherwise.
  pub fn parse_to_completion(&self, text: &str) -> CompileResult<T> {
    let Some(parsed) = self.parse(Source::new(text)) else {
      return Err(CompileError::at(text, 0, "no grammar rule matched the input"));
    };
    if !parsed.rest.at_end() {
      let index = parsed.rest.index();
      let preview: String = text[index..].chars().take(32).collect();
      return Err(CompileError::at(
        text,
        index,
        format!("parse error at index {index}, remaining input starts with {preview:?}"),
      ));
    }
    Ok(parsed.value)
  }
}

/// Write-once cell backing a forward-declared parser.
pub struct ForwardSlot<T> {
  cell: Rc<RefCell<Option<Parser<T>>>>,
}

impl<T> ForwardSlot<T> {
  pub fn define(self, parser: Parser<T>) {
    *self.cell.borrow_mut() = Some(parser);
  }
}

/// Parser for a regular expression anchored at the cursor. A leading `^` in
/// `pattern` is stripped; the match is always anchored regardless.
///
/// Panics when the pattern does not compile – grammar patterns are fixed at
/// build time, so this is a programmer error rather than a parse failure.
pub fn regexp(pattern: &str) -> Parser<String> {
  let anchored = format!("^{}", pattern.strip_prefix('^').unwrap_or(pattern));
  let regex = match Regex::new(&anchored) {
    Ok(regex) => regex,
    Err(err) => panic!("invalid pattern {pattern:?}: {err}"),
  };
  Parser::new(move |source| source.matches(&regex))
}
