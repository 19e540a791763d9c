//! Code generation: lower the AST into 32-bit ARM assembly.
//!
//! The emitter is a straightforward tree walk. Every expression leaves its
//! result in `r0`; binary operators spill the left operand with
//! `push {r0, ip}` (the dummy `ip` word keeps the stack 8-byte aligned),
//! evaluate the right operand, then `pop {r1, ip}` and combine. Locals and
//! parameters live on the frame and are addressed relative to `fp`.

use crate::ast::Ast;
use crate::error::{CompileError, CompileResult};
use std::collections::HashMap;
use std::fmt;

const MAX_CALL_ARGS: usize = 4;

/// Emit assembly for a parsed program, one directive or instruction per
/// line. Instructions are indented two spaces; labels and directives are
/// not.
pub fn generate(program: &Ast) -> CompileResult<String> {
  let mut codegen = CodeGen::new();
  codegen.emit_node(program, &mut Environment::new())?;
  Ok(codegen.finish())
}

/// Compile-time map from local name to its signed frame offset, plus the
/// offset the next `var` will land at. Fresh per function; never shared.
struct Environment {
  locals: HashMap<String, i64>,
  next_local_offset: i64,
}

impl Environment {
  fn new() -> Self {
    Self {
      locals: HashMap::new(),
      next_local_offset: 0,
    }
  }

  /// Environment at function entry: the prologue has spilled `r0`–`r3`, so
  /// parameter `i` lives at `[fp, #(4*i - 16)]` and the first local lands
  /// below the spill area.
  fn for_function(parameters: &[String]) -> Self {
    let mut locals = HashMap::new();
    for (i, parameter) in parameters.iter().enumerate() {
      locals.insert(parameter.clone(), 4 * i as i64 - 16);
    }
    Self {
      locals,
      next_local_offset: -20,
    }
  }

  fn lookup(&self, name: &str) -> CompileResult<i64> {
    self
      .locals
      .get(name)
      .copied()
      .ok_or_else(|| CompileError::UndefinedVariable {
        name: name.to_string(),
      })
  }

  /// Bind `name` to the slot the enclosing `push {r0, ip}` just wrote. Each
  /// push is 8 bytes; the value sits in the lower word. Rebinding a name
  /// leaks the old slot, which is safe.
  fn declare(&mut self, name: &str) {
    self.locals.insert(name.to_string(), self.next_local_offset - 4);
    self.next_local_offset -= 8;
  }
}

/// Compiler-generated branch target, unique within one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Label(usize);

impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, ".L{}", self.0)
  }
}

/// Line sink plus the label counter. Both are scoped to one `generate` call,
/// so repeated compilations each start from `.L0` and concurrent
/// compilations stay independent.
struct CodeGen {
  lines: Vec<String>,
  next_label: usize,
}

impl CodeGen {
  fn new() -> Self {
    Self {
      lines: Vec::new(),
      next_label: 0,
    }
  }

  fn emit(&mut self, line: impl Into<String>) {
    self.lines.push(line.into());
  }

  fn new_label(&mut self) -> Label {
    let label = Label(self.next_label);
    self.next_label += 1;
    label
  }

  fn finish(self) -> String {
    if self.lines.is_empty() {
      return String::new();
    }
    let mut output = self.lines.join("\n");
    output.push('\n');
    output
  }

  fn emit_node(&mut self, node: &Ast, env: &mut Environment) -> CompileResult<()> {
    match node {
      Ast::Number { value } => {
        self.emit(format!("  ldr r0, ={value}"));
      }
      Ast::Id { name } => {
        let offset = env.lookup(name)?;
        self.emit(format!("  ldr r0, [fp, #{offset}]"));
      }
      Ast::Not { term } => {
        self.emit_node(term, env)?;
        self.emit("  cmp r0, #0");
        self.emit("  moveq r0, #1");
        self.emit("  movne r0, #0");
      }
      Ast::Equal { left, right } => {
        self.emit_operands(left, right, env)?;
        self.emit("  cmp r0, r1");
        self.emit("  moveq r0, #1");
        self.emit("  movne r0, #0");
      }
      Ast::NotEqual { left, right } => {
        self.emit_operands(left, right, env)?;
        self.emit("  cmp r0, r1");
        self.emit("  movne r0, #1");
        self.emit("  moveq r0, #0");
      }
      Ast::Add { left, right } => {
        self.emit_operands(left, right, env)?;
        self.emit("  add r0, r1, r0");
      }
      Ast::Subtract { left, right } => {
        self.emit_operands(left, right, env)?;
        self.emit("  sub r0, r1, r0");
      }
      Ast::Multiply { left, right } => {
        self.emit_operands(left, right, env)?;
        self.emit("  mul r0, r1, r0");
      }
      Ast::Divide { left, right } => {
        self.emit_operands(left, right, env)?;
        self.emit("  udiv r0, r1, r0");
      }
      Ast::Call { callee, args } => {
        self.emit_call(callee, args, env)?;
      }
      Ast::Return { term } => {
        self.emit_node(term, env)?;
        self.emit("  mov sp, fp");
        self.emit("  pop {fp, pc}");
      }
      Ast::Block { statements } => {
        for statement in statements {
          self.emit_node(statement, env)?;
        }
      }
      Ast::If {
        conditional,
        consequence,
        alternative,
      } => {
        let if_false = self.new_label();
        let end_if = self.new_label();
        self.emit_node(conditional, env)?;
        self.emit("  cmp r0, #0");
        self.emit(format!("  beq {if_false}"));
        self.emit_node(consequence, env)?;
        self.emit(format!("  b {end_if}"));
        self.emit(format!("{if_false}:"));
        self.emit_node(alternative, env)?;
        self.emit(format!("{end_if}:"));
      }
      Ast::While { conditional, body } => {
        let loop_start = self.new_label();
        let loop_end = self.new_label();
        self.emit(format!("{loop_start}:"));
        self.emit_node(conditional, env)?;
        self.emit("  cmp r0, #0");
        self.emit(format!("  beq {loop_end}"));
        self.emit_node(body, env)?;
        self.emit(format!("  b {loop_start}"));
        self.emit(format!("{loop_end}:"));
      }
      Ast::Assign { name, value } => {
        self.emit_node(value, env)?;
        let offset = env.lookup(name)?;
        self.emit(format!("  str r0, [fp, #{offset}]"));
      }
      Ast::Var { name, value } => {
        self.emit_node(value, env)?;
        self.emit("  push {r0, ip}");
        env.declare(name);
      }
      Ast::Function {
        name,
        parameters,
        body,
      } => {
        self.emit_function(name, parameters, body)?;
      }
      Ast::Main { statements } => {
        self.emit_main(statements, env)?;
      }
      Ast::Assert { condition } => {
        self.emit_node(condition, env)?;
        self.emit("  cmp r0, #1");
        self.emit("  moveq r0, #'.'");
        self.emit("  movne r0, #'F'");
        self.emit("  bl putchar");
      }
    }
    Ok(())
  }

  /// Evaluate `left` then `right`, leaving the left value in `r1` and the
  /// right value in `r0`.
  fn emit_operands(&mut self, left: &Ast, right: &Ast, env: &mut Environment) -> CompileResult<()> {
    self.emit_node(left, env)?;
    self.emit("  push {r0, ip}");
    self.emit_node(right, env)?;
    self.emit("  pop {r1, ip}");
    Ok(())
  }

  /// Arguments are evaluated strictly left to right. With two or more, each
  /// value is parked in a 16-byte scratch area and the argument registers
  /// are loaded in one `pop` just before the branch.
  fn emit_call(&mut self, callee: &str, args: &[Ast], env: &mut Environment) -> CompileResult<()> {
    match args.len() {
      0 => {}
      1 => {
        self.emit_node(&args[0], env)?;
      }
      2..=MAX_CALL_ARGS => {
        self.emit("  sub sp, sp, #16");
        for (i, arg) in args.iter().enumerate() {
          self.emit_node(arg, env)?;
          self.emit(format!("  str r0, [sp, #{}]", 4 * i));
        }
        self.emit("  pop {r0, r1, r2, r3}");
      }
      count => {
        return Err(CompileError::TooManyArguments {
          callee: callee.to_string(),
          count,
        });
      }
    }
    self.emit(format!("  bl {callee}"));
    Ok(())
  }

  fn emit_function(&mut self, name: &str, parameters: &[String], body: &Ast) -> CompileResult<()> {
    if parameters.len() > MAX_CALL_ARGS {
      return Err(CompileError::TooManyParameters {
        name: name.to_string(),
        count: parameters.len(),
      });
    }

    self.emit("");
    self.emit(format!(".global {name}"));
    self.emit(format!("{name}:"));

    // prologue: frame the stack and spill the argument registers
    self.emit("  push {fp, lr}");
    self.emit("  mov fp, sp");
    self.emit("  push {r0, r1, r2, r3}");

    let mut env = Environment::for_function(parameters);
    self.emit_node(body, &mut env)?;

    // fall-through epilogue with a default return value; an explicit
    // `return` has already torn the frame down and never reaches this
    self.emit("  mov sp, fp");
    self.emit("  mov r0, #0");
    self.emit("  pop {fp, pc}");
    Ok(())
  }

  /// Program entry. Unlike a regular function there is no `mov fp, sp` and
  /// no register spill, so entry code inherits the caller's `fp` and must
  /// not use locals or parameters.
  fn emit_main(&mut self, statements: &[Ast], env: &mut Environment) -> CompileResult<()> {
    self.emit(".global main");
    self.emit("main:");
    self.emit("  push {fp, lr}");
    for statement in statements {
      self.emit_node(statement, env)?;
    }
    self.emit("  mov r0, #0");
    self.emit("  pop {fp, pc}");
    Ok(())
  }
}
