//! Grammar: tokens, the expression precedence ladder, and the statement
//! forms, assembled from the combinator kernel.
//!
//! A token is a pattern followed by trailing ignorables (whitespace and
//! comments), so productions never deal with spacing. Keywords carry a `\b`
//! guard to avoid swallowing the head of an identifier. The expression and
//! statement productions are mutually recursive; the cycle is broken with
//! forward slots defined once the ladder is built.

use crate::ast::{Ast, Combine};
use crate::combinator::{Parser, regexp};
use crate::error::CompileResult;

/// Parse a whole program into a `Block` of top-level statements, requiring
/// the entire input to be consumed.
pub fn parse(source: &str) -> CompileResult<Ast> {
  Grammar::new().program.parse_to_completion(source)
}

/// The constructed parsers for one compilation. `expression` and `statement`
/// are exposed alongside `program` so sub-grammars can be driven directly.
pub struct Grammar {
  pub program: Parser<Ast>,
  pub expression: Parser<Ast>,
  pub statement: Parser<Ast>,
}

impl Grammar {
  pub fn new() -> Self {
    let whitespace = regexp(r"[ \n\r\t]+");
    let comments = regexp(r"//.*").or(regexp(r"(?s)/\*.*?\*/"));
    let ignored = whitespace.or(comments).many();

    // token <- pattern ignored*; the value is the text before the ignorables
    let token = {
      let ignored = ignored.clone();
      move |pattern: &str| {
        let ignored = ignored.clone();
        regexp(pattern).bind(move |text| ignored.clone().and(Parser::constant(text)))
      }
    };

    let function_kw = token(r"function\b");
    let if_kw = token(r"if\b");
    let while_kw = token(r"while\b");
    let else_kw = token(r"else\b");
    let return_kw = token(r"return\b");
    let var_kw = token(r"var\b");

    let comma = token(r",");
    let semicolon = token(r";");
    let left_paren = token(r"\(");
    let right_paren = token(r"\)");
    let left_brace = token(r"\{");
    let right_brace = token(r"\}");

    let number =
      token(r"[0-9]+").map(|digits| Ast::number(digits.parse().unwrap_or(i32::MAX)));
    let identifier = token(r"[a-zA-Z_][a-zA-Z0-9_]*");
    let id_atom = identifier.clone().map(|name| Ast::id(name));

    // Binary operator tokens parse to the combining function they stand for.
    let not_op = token(r"!");
    let equal_op = token(r"==").map(|_| Ast::equal as Combine);
    let not_equal_op = token(r"!=").map(|_| Ast::not_equal as Combine);
    let plus = token(r"\+").map(|_| Ast::add as Combine);
    let minus = token(r"-").map(|_| Ast::subtract as Combine);
    let star = token(r"\*").map(|_| Ast::multiply as Combine);
    let slash = token(r"/").map(|_| Ast::divide as Combine);
    let assign_op = token(r"=");

    let (expression, expression_slot) = Parser::forward();
    let (statement, statement_slot) = Parser::forward();

    // args <- (expression (',' expression)*)?
    let args = {
      let rest = comma.clone().and(expression.clone()).many();
      expression
        .clone()
        .bind(move |first: Ast| {
          rest.clone().map(move |more| {
            let mut all = vec![first.clone()];
            all.extend(more);
            all
          })
        })
        .or(Parser::constant(Vec::new()))
    };

    // call <- ID '(' args ')'; a one-argument call to `__assert` is rewritten
    // to the assertion intrinsic here, during parsing
    let call = {
      let left_paren = left_paren.clone();
      let right_paren = right_paren.clone();
      identifier.clone().bind(move |callee| {
        let right_paren = right_paren.clone();
        left_paren
          .clone()
          .and(args.clone())
          .bind(move |mut arguments| {
            let node = if callee == "__assert" && arguments.len() == 1 {
              Ast::assert(arguments.remove(0))
            } else {
              Ast::call(callee.clone(), arguments)
            };
            right_paren.clone().and(Parser::constant(node))
          })
      })
    };

    // atom <- call / ID / NUMBER / '(' expression ')'
    let atom = call.or(id_atom).or(number).or({
      let right_paren = right_paren.clone();
      left_paren
        .clone()
        .and(expression.clone())
        .bind(move |inner| right_paren.clone().and(Parser::constant(inner)))
    });

    // unary <- '!'? atom
    let unary = not_op.maybe().bind(move |not| {
      atom.clone().map(move |term| {
        if not.is_some() { Ast::not(term) } else { term }
      })
    });

    // product <- unary (('*' / '/') unary)*
    let product = infix(star.or(slash), unary);
    // sum <- product (('+' / '-') product)*
    let sum = infix(plus.or(minus), product);
    // comparison <- sum (('==' / '!=') sum)*
    let comparison = infix(equal_op.or(not_equal_op), sum);
    expression_slot.define(comparison);

    // return <- 'return' expression ';'
    let return_stmt = {
      let semicolon = semicolon.clone();
      return_kw
        .and(expression.clone())
        .bind(move |term| semicolon.clone().and(Parser::constant(Ast::ret(term))))
    };

    // if <- 'if' '(' expression ')' statement 'else' statement
    // `else` is mandatory; a lone `if` does not parse.
    let if_stmt = {
      let right_paren = right_paren.clone();
      let statement: Parser<Ast> = statement.clone();
      if_kw
        .and(left_paren.clone())
        .and(expression.clone())
        .bind(move |conditional| {
          let else_branch = else_kw.clone().and(statement.clone());
          right_paren
            .clone()
            .and(statement.clone())
            .bind(move |consequence| {
              let conditional = conditional.clone();
              else_branch.clone().map(move |alternative| {
                Ast::if_stmt(conditional.clone(), consequence.clone(), alternative)
              })
            })
        })
    };

    // while <- 'while' '(' expression ')' statement
    let while_stmt = {
      let right_paren = right_paren.clone();
      let statement = statement.clone();
      while_kw
        .and(left_paren.clone())
        .and(expression.clone())
        .bind(move |conditional| {
          right_paren
            .clone()
            .and(statement.clone())
            .map(move |body| Ast::while_stmt(conditional.clone(), body))
        })
    };

    // var <- 'var' ID '=' expression ';'
    let var_stmt = {
      let assign_op = assign_op.clone();
      let expression = expression.clone();
      let semicolon = semicolon.clone();
      var_kw.and(identifier.clone()).bind(move |name| {
        let semicolon = semicolon.clone();
        assign_op.clone().and(expression.clone()).bind(move |value| {
          semicolon
            .clone()
            .and(Parser::constant(Ast::var(name.clone(), value)))
        })
      })
    };

    // assignment <- ID '=' expression ';'
    let assignment_stmt = {
      let expression = expression.clone();
      let semicolon = semicolon.clone();
      identifier.clone().bind(move |name| {
        let semicolon = semicolon.clone();
        assign_op.clone().and(expression.clone()).bind(move |value| {
          semicolon
            .clone()
            .and(Parser::constant(Ast::assign(name.clone(), value)))
        })
      })
    };

    // block <- '{' statement* '}'
    let block_stmt = left_brace.and(statement.clone().many()).bind(move |statements| {
      right_brace
        .clone()
        .and(Parser::constant(Ast::block(statements)))
    });

    // params <- (ID (',' ID)*)?
    let parameters = {
      let rest = comma.and(identifier.clone()).many();
      identifier
        .clone()
        .bind(move |first: String| {
          rest.clone().map(move |more| {
            let mut all = vec![first.clone()];
            all.extend(more);
            all
          })
        })
        .or(Parser::constant(Vec::new()))
    };

    // function <- 'function' ID '(' params ')' block; a function named
    // `__main` is rewritten to the program entry
    let function_stmt = {
      let block_stmt = block_stmt.clone();
      function_kw.and(identifier).bind(move |name| {
        let right_paren = right_paren.clone();
        let block_stmt = block_stmt.clone();
        left_paren.clone().and(parameters.clone()).bind(move |params| {
          let name = name.clone();
          right_paren
            .clone()
            .and(block_stmt.clone())
            .map(move |block| match block {
              Ast::Block { statements } if name == "__main" => Ast::main(statements),
              body => Ast::function(name.clone(), params.clone(), body),
            })
        })
      })
    };

    // expr-statement <- expression ';'
    let expression_stmt = expression
      .clone()
      .bind(move |term| semicolon.clone().and(Parser::constant(term)));

    // Keyword-led forms come before the ID-led forms so `if (…)` is never
    // mistaken for the start of an assignment or call.
    statement_slot.define(
      return_stmt
        .or(function_stmt)
        .or(if_stmt)
        .or(while_stmt)
        .or(var_stmt)
        .or(assignment_stmt)
        .or(block_stmt)
        .or(expression_stmt),
    );

    // program <- ignored statement*
    let program = ignored.and(statement.clone().many()).map(Ast::block);

    Self {
      program,
      expression,
      statement,
    }
  }
}

/// Left-associative binary level: one term, then zero or more
/// (operator, term) pairs folded into a left-leaning tree.
fn infix(operator: Parser<Combine>, term: Parser<Ast>) -> Parser<Ast> {
  let tail = {
    let term = term.clone();
    operator
      .bind(move |op| term.clone().map(move |right| (op, right)))
      .many()
  };
  term.bind(move |first| {
    tail.clone().map(move |pairs| {
      pairs
        .into_iter()
        .fold(first.clone(), |left, (op, right)| op(left, right))
    })
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse_expression(source: &str) -> Ast {
    Grammar::new()
      .expression
      .parse_to_completion(source)
      .unwrap()
  }

  fn parse_statement(source: &str) -> Ast {
    Grammar::new()
      .statement
      .parse_to_completion(source)
      .unwrap()
  }

  #[test]
  fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
      parse_expression("1 + 2 * 3"),
      Ast::add(
        Ast::number(1),
        Ast::multiply(Ast::number(2), Ast::number(3))
      )
    );
    assert_eq!(
      parse_expression("1 * 2 + 3"),
      Ast::add(
        Ast::multiply(Ast::number(1), Ast::number(2)),
        Ast::number(3)
      )
    );
  }

  #[test]
  fn binary_levels_are_left_associative() {
    assert_eq!(
      parse_expression("1 - 2 - 3"),
      Ast::subtract(
        Ast::subtract(Ast::number(1), Ast::number(2)),
        Ast::number(3)
      )
    );
    assert_eq!(
      parse_expression("1 == 2 == 3"),
      Ast::equal(Ast::equal(Ast::number(1), Ast::number(2)), Ast::number(3))
    );
  }

  #[test]
  fn parentheses_override_precedence() {
    assert_eq!(
      parse_expression("(1 + 2) * 3"),
      Ast::multiply(Ast::add(Ast::number(1), Ast::number(2)), Ast::number(3))
    );
  }

  #[test]
  fn overflowing_literals_saturate() {
    assert_eq!(
      parse_expression("99999999999"),
      Ast::Number { value: i32::MAX }
    );
    assert_eq!(parse_expression("2147483647"), Ast::number(i32::MAX));
  }

  #[test]
  fn unary_not_wraps_a_single_atom() {
    assert_eq!(parse_expression("!0"), Ast::not(Ast::number(0)));
    assert_eq!(
      parse_expression("!(1 == 2)"),
      Ast::not(Ast::equal(Ast::number(1), Ast::number(2)))
    );
  }

  #[test]
  fn calls_collect_comma_separated_arguments() {
    assert_eq!(
      parse_expression("f(1, x, g())"),
      Ast::call(
        "f",
        vec![Ast::number(1), Ast::id("x"), Ast::call("g", vec![])]
      )
    );
  }

  #[test]
  fn keyword_prefixed_identifier_is_not_a_keyword() {
    assert_eq!(parse_expression("ifoo"), Ast::id("ifoo"));
    assert_eq!(
      parse_statement("if (1) a = 1; else b = 2;"),
      Ast::if_stmt(
        Ast::number(1),
        Ast::assign("a", Ast::number(1)),
        Ast::assign("b", Ast::number(2))
      )
    );
  }

  #[test]
  fn assert_calls_are_rewritten_during_parsing() {
    assert_eq!(
      parse_expression("__assert(1 == 2)"),
      Ast::assert(Ast::equal(Ast::number(1), Ast::number(2)))
    );
  }

  #[test]
  fn assert_with_other_arities_stays_an_ordinary_call() {
    assert_eq!(
      parse_expression("__assert(1, 2)"),
      Ast::call("__assert", vec![Ast::number(1), Ast::number(2)])
    );
    assert_eq!(parse_expression("__assert()"), Ast::call("__assert", vec![]));
  }

  #[test]
  fn main_functions_are_rewritten_during_parsing() {
    assert_eq!(
      parse("function __main() { f(); }").unwrap(),
      Ast::block(vec![Ast::main(vec![Ast::call("f", vec![])])])
    );
  }

  #[test]
  fn functions_keep_their_name_parameters_and_body() {
    assert_eq!(
      parse("function add(a, b) { return a + b; }").unwrap(),
      Ast::block(vec![Ast::function(
        "add",
        vec!["a".to_string(), "b".to_string()],
        Ast::block(vec![Ast::ret(Ast::add(Ast::id("a"), Ast::id("b")))])
      )])
    );
  }

  #[test]
  fn else_is_mandatory() {
    let grammar = Grammar::new();
    assert!(grammar.statement.parse_to_completion("if (1) f();").is_err());
  }

  #[test]
  fn var_and_assignment_statements() {
    assert_eq!(
      parse_statement("var x = 1 + 2;"),
      Ast::var("x", Ast::add(Ast::number(1), Ast::number(2)))
    );
    assert_eq!(
      parse_statement("x = f(x);"),
      Ast::assign("x", Ast::call("f", vec![Ast::id("x")]))
    );
  }

  #[test]
  fn while_statement_wraps_its_body() {
    assert_eq!(
      parse_statement("while (x != 3) x = x + 1;"),
      Ast::while_stmt(
        Ast::not_equal(Ast::id("x"), Ast::number(3)),
        Ast::assign("x", Ast::add(Ast::id("x"), Ast::number(1)))
      )
    );
  }

  #[test]
  fn whitespace_and_comments_are_transparent() {
    let bare = parse("function f(a) { return a; }").unwrap();
    let spaced = parse("  \n\t function f ( a ) \r\n { return a ; } \n").unwrap();
    let commented = parse(
      "// leading comment\nfunction /* inline */ f(a) { // trailing\n  return /* multi\n line */ a;\n}",
    )
    .unwrap();
    assert_eq!(bare, spaced);
    assert_eq!(bare, commented);
  }

  #[test]
  fn unconsumed_input_is_a_parse_error() {
    let err = parse("function f() {}\n@@@").unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("index 16"), "rendered:\n{rendered}");
    assert!(rendered.contains("@@@"), "rendered:\n{rendered}");
  }

  #[test]
  fn empty_input_parses_to_an_empty_program() {
    assert_eq!(parse("").unwrap(), Ast::block(vec![]));
    assert_eq!(parse("  // just a comment\n").unwrap(), Ast::block(vec![]));
  }
}
