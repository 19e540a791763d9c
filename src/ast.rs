//! Abstract syntax tree: a closed sum of node variants.
//!
//! Nodes are built once by the grammar and consumed once by the code
//! generator; structural equality is pointwise on payloads.

/// Signature shared by the binary-operator constructors so operator tokens
/// can carry them as first-class combining functions.
pub type Combine = fn(Ast, Ast) -> Ast;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
  /// Integer literal. Non-negative; the grammar has no negation.
  Number { value: i32 },
  /// Variable read.
  Id { name: String },
  /// Logical negation, normalizing to 0 or 1.
  Not { term: Box<Ast> },
  Equal { left: Box<Ast>, right: Box<Ast> },
  NotEqual { left: Box<Ast>, right: Box<Ast> },
  Add { left: Box<Ast>, right: Box<Ast> },
  Subtract { left: Box<Ast>, right: Box<Ast> },
  Multiply { left: Box<Ast>, right: Box<Ast> },
  /// Unsigned division.
  Divide { left: Box<Ast>, right: Box<Ast> },
  Call { callee: String, args: Vec<Ast> },
  Return { term: Box<Ast> },
  /// Ordered statement sequence.
  Block { statements: Vec<Ast> },
  /// Two-armed conditional; the grammar makes `else` mandatory.
  If {
    conditional: Box<Ast>,
    consequence: Box<Ast>,
    alternative: Box<Ast>,
  },
  While { conditional: Box<Ast>, body: Box<Ast> },
  /// Update of an existing local.
  Assign { name: String, value: Box<Ast> },
  /// Declaration and initialisation of a new local.
  Var { name: String, value: Box<Ast> },
  Function {
    name: String,
    parameters: Vec<String>,
    body: Box<Ast>,
  },
  /// Program entry, produced for a function named `__main`. Same payload as
  /// `Block` but triggers the entry prologue instead of a regular frame.
  Main { statements: Vec<Ast> },
  /// Assertion intrinsic, produced for a call to `__assert`.
  Assert { condition: Box<Ast> },
}

impl Ast {
  pub fn number(value: i32) -> Self {
    Self::Number { value }
  }

  pub fn id(name: impl Into<String>) -> Self {
    Self::Id { name: name.into() }
  }

  pub fn not(term: Ast) -> Self {
    Self::Not {
      term: Box::new(term),
    }
  }

  pub fn equal(left: Ast, right: Ast) -> Self {
    Self::Equal {
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn not_equal(left: Ast, right: Ast) -> Self {
    Self::NotEqual {
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn add(left: Ast, right: Ast) -> Self {
    Self::Add {
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn subtract(left: Ast, right: Ast) -> Self {
    Self::Subtract {
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn multiply(left: Ast, right: Ast) -> Self {
    Self::Multiply {
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn divide(left: Ast, right: Ast) -> Self {
    Self::Divide {
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn call(callee: impl Into<String>, args: Vec<Ast>) -> Self {
    Self::Call {
      callee: callee.into(),
      args,
    }
  }

  pub fn ret(term: Ast) -> Self {
    Self::Return {
      term: Box::new(term),
    }
  }

  pub fn block(statements: Vec<Ast>) -> Self {
    Self::Block { statements }
  }

  pub fn if_stmt(conditional: Ast, consequence: Ast, alternative: Ast) -> Self {
    Self::If {
      conditional: Box::new(conditional),
      consequence: Box::new(consequence),
      alternative: Box::new(alternative),
    }
  }

  pub fn while_stmt(conditional: Ast, body: Ast) -> Self {
    Self::While {
      conditional: Box::new(conditional),
      body: Box::new(body),
    }
  }

  pub fn assign(name: impl Into<String>, value: Ast) -> Self {
    Self::Assign {
      name: name.into(),
      value: Box::new(value),
    }
  }

  pub fn var(name: impl Into<String>, value: Ast) -> Self {
    Self::Var {
      name: name.into(),
      value: Box::new(value),
    }
  }

  pub fn function(name: impl Into<String>, parameters: Vec<String>, body: Ast) -> Self {
    Self::Function {
      name: name.into(),
      parameters,
      body: Box::new(body),
    }
  }

  pub fn main(statements: Vec<Ast>) -> Self {
    Self::Main { statements }
  }

  pub fn assert(condition: Ast) -> Self {
    Self::Assert {
      condition: Box::new(condition),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn equality_is_structural() {
    let a = Ast::add(Ast::number(1), Ast::multiply(Ast::number(2), Ast::id("x")));
    let b = Ast::add(Ast::number(1), Ast::multiply(Ast::number(2), Ast::id("x")));
    assert_eq!(a, b);
  }

  #[test]
  fn equality_distinguishes_variants_with_identical_payloads() {
    assert_ne!(
      Ast::add(Ast::number(1), Ast::number(2)),
      Ast::subtract(Ast::number(1), Ast::number(2))
    );
    assert_ne!(
      Ast::block(vec![Ast::number(1)]),
      Ast::main(vec![Ast::number(1)])
    );
  }

  #[test]
  fn equality_compares_children_deeply() {
    assert_ne!(
      Ast::call("f", vec![Ast::number(1), Ast::number(2)]),
      Ast::call("f", vec![Ast::number(1), Ast::number(3)])
    );
  }

  #[test]
  fn binary_constructors_coerce_to_combining_functions() {
    let combine: Combine = Ast::subtract;
    assert_eq!(
      combine(Ast::number(1), Ast::number(2)),
      Ast::subtract(Ast::number(1), Ast::number(2))
    );
  }
}
