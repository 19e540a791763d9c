//! Crate root: wires together the compilation pipeline.
//!
//! The stages are intentionally small and composable so they can be evolved
//! independently:
//! - `combinator` provides the source cursor and the parser combinator kernel.
//! - `grammar` owns all syntactic knowledge and returns the program AST.
//! - `ast` defines the tree the grammar builds and the emitter walks.
//! - `codegen` lowers the parsed program into 32-bit ARM assembly.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod ast;
pub mod combinator;
pub mod error;
pub mod grammar;

mod codegen;

pub use error::{CompileError, CompileResult};

/// Compile a source program into 32-bit ARM assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  let program = grammar::parse(source)?;
  codegen::generate(&program)
}

#[cfg(test)]
mod tests {
  use super::*;

  // Self-testing program: each passing assertion prints '.', each failing
  // one prints 'F'.
  const DEMO: &str = r#"
    function main() {
      assert(1);
      assert(!0);
      assert(42 == 4 + 2 * (12 - 2) + 3 * (5 + 1));
      assert(return42() == 42);
      assert1234(1, 2, 3, 4);
      assert(factorial(5) == 120);

      var x = 4 + 2 * (12 - 2);
      var y = 3 * (5 + 1);
      var z = x + y;
      assert(z == 42);

      var i = 0;
      while (i != 3) {
        i = i + 1;
      }
      assert(i == 3);

      if (0) {
        assert(0);
      } else {
        assert(1);
      }

      putchar(10);
    }

    function return42() { return 42; }

    function assert(x) {
      if (x) {
        putchar(46);
      } else {
        putchar(70);
      }
    }

    function assert1234(a, b, c, d) {
      assert(a == 1);
      assert(b == 2);
      assert(c == 3);
      assert(d == 4);
    }

    function factorial(n) {
      if (n == 0) {
        return 1;
      } else {
        return n * factorial(n - 1);
      }
    }
  "#;

  #[test]
  fn demo_program_compiles_end_to_end() {
    let asm = generate_assembly(DEMO).unwrap();
    for symbol in [
      ".global main",
      ".global return42",
      ".global assert",
      ".global assert1234",
      ".global factorial",
    ] {
      assert!(asm.contains(symbol), "missing {symbol}; asm:\n{asm}");
    }
    assert!(asm.contains("  bl putchar"), "asm:\n{asm}");
    assert!(asm.contains("  bl factorial"), "asm:\n{asm}");
  }

  #[test]
  fn parse_errors_surface_through_the_pipeline() {
    let err = generate_assembly("function f() { return 1 }").unwrap_err();
    assert!(matches!(err, CompileError::Syntax { .. }), "err: {err}");
  }

  #[test]
  fn emission_errors_surface_through_the_pipeline() {
    let err = generate_assembly("function f() { return nope; }").unwrap_err();
    assert!(
      matches!(err, CompileError::UndefinedVariable { ref name } if name == "nope"),
      "err: {err}"
    );
  }
}
