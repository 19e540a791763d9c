//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – parse errors point at the
//! offending byte with a caret under the source line, emission errors are
//! plain messages. Nothing is ever recovered; the first error aborts the
//! compilation.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// Parse-time failure anchored at a byte offset in the source.
  #[snafu(display("{snippet}\n{marker} {message}"))]
  Syntax {
    snippet: String,
    marker: String,
    message: String,
  },

  /// `Id` or an assignment referenced a name the current function never bound.
  #[snafu(display("undefined variable: {name}"))]
  UndefinedVariable { name: String },

  #[snafu(display("call to '{callee}' passes {count} arguments, at most 4 are supported"))]
  TooManyArguments { callee: String, count: usize },

  #[snafu(display("function '{name}' declares {count} parameters, at most 4 are supported"))]
  TooManyParameters { name: String, count: usize },
}

impl CompileError {
  /// Construct a syntax error anchored at a specific byte offset, quoting the
  /// line that contains it.
  pub fn at(source: &str, loc: usize, message: impl Into<String>) -> Self {
    let safe_loc = loc.min(source.len());
    let line_start = source[..safe_loc].rfind('\n').map_or(0, |i| i + 1);
    let line_end = source[safe_loc..]
      .find('\n')
      .map_or(source.len(), |i| safe_loc + i);
    let column = source[line_start..safe_loc].chars().count();
    Self::Syntax {
      snippet: source[line_start..line_end].to_string(),
      marker: format!("{}^", " ".repeat(column)),
      message: message.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_points_at_the_offending_column() {
    let err = CompileError::at("var x = @;", 8, "unexpected character");
    assert_eq!(err.to_string(), "var x = @;\n        ^ unexpected character");
  }

  #[test]
  fn caret_quotes_only_the_line_containing_the_offset() {
    let source = "function f() {\n  oops here\n}\n";
    let loc = source.find("oops").unwrap();
    let rendered = CompileError::at(source, loc, "no rule matched").to_string();
    assert!(rendered.starts_with("  oops here\n"), "rendered:\n{rendered}");
    assert!(rendered.contains("^ no rule matched"), "rendered:\n{rendered}");
  }

  #[test]
  fn offset_past_the_end_is_clamped() {
    let rendered = CompileError::at("ab", 99, "ran out").to_string();
    assert_eq!(rendered, "ab\n  ^ ran out");
  }
}
