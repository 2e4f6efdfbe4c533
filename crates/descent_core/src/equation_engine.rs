//! Safe expression evaluation.
//!
//! User text is tokenized, parsed into an [`Expr`] tree over a fixed grammar,
//! and compiled into [`Bytecode`] for a small stack machine. Nothing here
//! ever hands user text to a general-purpose interpreter.

use crate::config::Mode;
use crate::error::{CompileError, EvaluationError};
use crate::traits::Objective;
use std::collections::HashMap;
use std::fmt;

/// Whitelisted single-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Log2,
    Sqrt,
    Abs,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            "asin" => Function::Asin,
            "acos" => Function::Acos,
            "atan" => Function::Atan,
            "sinh" => Function::Sinh,
            "cosh" => Function::Cosh,
            "tanh" => Function::Tanh,
            "exp" => Function::Exp,
            "ln" | "log" => Function::Ln,
            "log10" => Function::Log10,
            "log2" => Function::Log2,
            "sqrt" => Function::Sqrt,
            "abs" => Function::Abs,
            _ => return None,
        };
        Some(function)
    }

    fn apply(self, a: f64) -> Result<f64, EvaluationError> {
        let value = match self {
            Function::Sin => a.sin(),
            Function::Cos => a.cos(),
            Function::Tan => a.tan(),
            Function::Asin | Function::Acos if a.abs() > 1.0 => {
                return Err(EvaluationError::domain(format!(
                    "inverse sine/cosine of {a} is outside [-1, 1]"
                )));
            }
            Function::Asin => a.asin(),
            Function::Acos => a.acos(),
            Function::Atan => a.atan(),
            Function::Sinh => a.sinh(),
            Function::Cosh => a.cosh(),
            Function::Tanh => a.tanh(),
            Function::Exp => a.exp(),
            Function::Ln | Function::Log10 | Function::Log2 if a <= 0.0 => {
                return Err(EvaluationError::domain(format!(
                    "logarithm of non-positive value {a}"
                )));
            }
            Function::Ln => a.ln(),
            Function::Log10 => a.log10(),
            Function::Log2 => a.log2(),
            Function::Sqrt if a < 0.0 => {
                return Err(EvaluationError::domain(format!(
                    "square root of negative value {a}"
                )));
            }
            Function::Sqrt => a.sqrt(),
            Function::Abs => a.abs(),
        };
        finite(value)
    }
}

/// OpCodes for the stack machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpCode {
    /// Pushes a constant onto the stack.
    LoadConst(f64),
    /// Pushes the coordinate at the given index (0 = x, 1 = y).
    LoadVar(usize),
    /// Pops b, a; pushes a + b.
    Add,
    /// Pops b, a; pushes a - b.
    Sub,
    /// Pops b, a; pushes a * b.
    Mul,
    /// Pops b, a; pushes a / b.
    Div,
    /// Pops b, a; pushes a ^ b.
    Pow,
    /// Pops a; pushes -a.
    Neg,
    /// Pops a; pushes f(a).
    Call(Function),
}

impl OpCode {
    /// Net change in stack depth, and the depth required before the op runs.
    fn stack_effect(self) -> (isize, usize) {
        match self {
            OpCode::LoadConst(_) | OpCode::LoadVar(_) => (1, 0),
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow => (-1, 2),
            OpCode::Neg | OpCode::Call(_) => (0, 1),
        }
    }
}

/// A validated sequence of operations.
///
/// Construction checks that the program never underflows and leaves exactly
/// one value, so execution only has to deal with numeric failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    ops: Vec<OpCode>,
    max_depth: usize,
}

impl Bytecode {
    pub fn new(ops: Vec<OpCode>) -> Result<Self, CompileError> {
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for op in &ops {
            let (delta, required) = op.stack_effect();
            if depth < required {
                return Err(CompileError::syntax("malformed program: stack underflow"));
            }
            depth = (depth as isize + delta) as usize;
            max_depth = max_depth.max(depth);
        }
        if depth != 1 {
            return Err(CompileError::syntax(
                "malformed program: expected a single result",
            ));
        }
        Ok(Self { ops, max_depth })
    }

    pub fn ops(&self) -> &[OpCode] {
        &self.ops
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

fn finite(value: f64) -> Result<f64, EvaluationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvaluationError::NonFinite)
    }
}

// Validated programs never underflow; NaN would surface as NonFinite anyway.
fn pop(stack: &mut Vec<f64>) -> f64 {
    stack.pop().unwrap_or(f64::NAN)
}

/// Stack-based virtual machine for evaluating compiled expressions.
pub struct VM;

impl VM {
    /// Executes `bytecode` with the given coordinates, using `stack` as scratch space.
    pub fn execute(
        bytecode: &Bytecode,
        vars: &[f64],
        stack: &mut Vec<f64>,
    ) -> Result<f64, EvaluationError> {
        stack.clear();

        for op in &bytecode.ops {
            let value = match *op {
                OpCode::LoadConst(val) => val,
                OpCode::LoadVar(idx) => {
                    let val = vars.get(idx).copied().ok_or_else(|| {
                        EvaluationError::domain(format!("missing coordinate {idx}"))
                    })?;
                    finite(val)?
                }
                OpCode::Add => {
                    let b = pop(stack);
                    let a = pop(stack);
                    finite(a + b)?
                }
                OpCode::Sub => {
                    let b = pop(stack);
                    let a = pop(stack);
                    finite(a - b)?
                }
                OpCode::Mul => {
                    let b = pop(stack);
                    let a = pop(stack);
                    finite(a * b)?
                }
                OpCode::Div => {
                    let b = pop(stack);
                    let a = pop(stack);
                    if b == 0.0 {
                        return Err(EvaluationError::domain("division by zero"));
                    }
                    finite(a / b)?
                }
                OpCode::Pow => {
                    let b = pop(stack);
                    let a = pop(stack);
                    let result = a.powf(b);
                    if result.is_nan() {
                        return Err(EvaluationError::domain(format!(
                            "{a} raised to {b} is undefined"
                        )));
                    }
                    finite(result)?
                }
                OpCode::Neg => -pop(stack),
                OpCode::Call(function) => function.apply(pop(stack))?,
            };
            stack.push(value);
        }

        finite(pop(stack))
    }
}

// --- AST & Parser ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Abstract syntax tree for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(String),
    Binary(Box<Expr>, BinaryOp, Box<Expr>),
    Neg(Box<Expr>),
    Call(String, Vec<Expr>),
}

/// Compiles an [`Expr`] into [`Bytecode`], resolving variable names to indices.
pub struct Compiler {
    pub var_map: HashMap<String, usize>,
}

impl Compiler {
    pub fn new(var_names: &[&str]) -> Self {
        let var_map = var_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();
        Self { var_map }
    }

    pub fn for_mode(mode: Mode) -> Self {
        Self::new(mode.variables())
    }

    pub fn compile(&self, expr: &Expr) -> Result<Bytecode, CompileError> {
        let mut ops = Vec::new();
        self.compile_recursive(expr, &mut ops)?;
        Bytecode::new(ops)
    }

    fn compile_recursive(&self, expr: &Expr, ops: &mut Vec<OpCode>) -> Result<(), CompileError> {
        match expr {
            Expr::Number(n) => ops.push(OpCode::LoadConst(*n)),
            Expr::Variable(name) => {
                if let Some(&idx) = self.var_map.get(name) {
                    ops.push(OpCode::LoadVar(idx));
                } else if let Some(value) = constant(name) {
                    ops.push(OpCode::LoadConst(value));
                } else {
                    let mut allowed: Vec<&str> = self.var_map.keys().map(String::as_str).collect();
                    allowed.sort_unstable();
                    return Err(CompileError::syntax(format!(
                        "unknown variable `{name}` (allowed: {})",
                        allowed.join(", ")
                    )));
                }
            }
            Expr::Binary(left, op, right) => {
                self.compile_recursive(left, ops)?;
                self.compile_recursive(right, ops)?;
                ops.push(match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Pow => OpCode::Pow,
                });
            }
            Expr::Neg(operand) => {
                self.compile_recursive(operand, ops)?;
                ops.push(OpCode::Neg);
            }
            Expr::Call(name, args) => {
                if name == "pow" {
                    expect_arity(name, args, 2)?;
                    self.compile_recursive(&args[0], ops)?;
                    self.compile_recursive(&args[1], ops)?;
                    ops.push(OpCode::Pow);
                    return Ok(());
                }
                let function = Function::from_name(name)
                    .ok_or_else(|| CompileError::UnsupportedFunction { name: name.clone() })?;
                expect_arity(name, args, 1)?;
                self.compile_recursive(&args[0], ops)?;
                ops.push(OpCode::Call(function));
            }
        }
        Ok(())
    }
}

fn constant(name: &str) -> Option<f64> {
    match name {
        "pi" | "PI" => Some(std::f64::consts::PI),
        "e" | "E" => Some(std::f64::consts::E),
        _ => None,
    }
}

fn expect_arity(name: &str, args: &[Expr], expected: usize) -> Result<(), CompileError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(CompileError::syntax(format!(
            "{name} expects {expected} argument(s), got {}",
            args.len()
        )))
    }
}

/// Longest accepted expression, in tokens. Bounds the depth of the tree.
pub const MAX_TOKENS: usize = 1024;

/// Deepest accepted nesting of parentheses, calls, signs and exponents.
pub const MAX_NESTING: usize = 100;

/// Parses a string expression into an AST.
pub fn parse(input: &str) -> Result<Expr, CompileError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CompileError::syntax("expression is empty"));
    }
    if tokens.len() > MAX_TOKENS {
        return Err(CompileError::syntax(format!(
            "expression is too long ({} tokens, at most {MAX_TOKENS})",
            tokens.len()
        )));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(CompileError::syntax(format!("unexpected {token}"))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Identifier(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "number {n}"),
            Token::Identifier(name) => write!(f, "identifier `{name}`"),
            Token::Plus => f.write_str("`+`"),
            Token::Minus => f.write_str("`-`"),
            Token::Star => f.write_str("`*`"),
            Token::Slash => f.write_str("`/`"),
            Token::Caret => f.write_str("`^`"),
            Token::LParen => f.write_str("`(`"),
            Token::RParen => f.write_str("`)`"),
            Token::Comma => f.write_str("`,`"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            // Exponent only when followed by digits, so `2e` stays `2` then `e`.
            if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text
                .parse::<f64>()
                .map_err(|_| CompileError::syntax(format!("malformed number `{text}`")))?;
            tokens.push(Token::Number(value));
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = read_identifier(&chars, &mut i);
            // Accept the `Math.` namespace of JavaScript-style input.
            if ident == "Math" && chars.get(i) == Some(&'.') {
                i += 1;
                ident = read_identifier(&chars, &mut i);
                if ident.is_empty() {
                    return Err(CompileError::syntax("expected a name after `Math.`"));
                }
            }
            tokens.push(Token::Identifier(ident));
        } else {
            let token = match c {
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' if chars.get(i + 1) == Some(&'*') => {
                    i += 1;
                    Token::Caret
                }
                '*' => Token::Star,
                '/' => Token::Slash,
                '^' => Token::Caret,
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                other => {
                    return Err(CompileError::syntax(format!(
                        "unexpected character `{other}` at position {i}"
                    )));
                }
            };
            tokens.push(token);
            i += 1;
        }
    }
    Ok(tokens)
}

fn read_identifier(chars: &[char], i: &mut usize) -> String {
    let mut ident = String::new();
    while let Some(&d) = chars.get(*i) {
        if d.is_alphanumeric() || d == '_' {
            ident.push(d);
            *i += 1;
        } else {
            break;
        }
    }
    ident
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Active `parse_unary` frames; every recursive cycle passes through it.
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn consume(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), CompileError> {
        match self.consume() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(CompileError::syntax(format!("expected `)`, found {other}"))),
            None => Err(CompileError::syntax("expected `)`, found end of input")),
        }
    }

    fn parse_expression(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.consume();
            let right = self.parse_term()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.consume();
            let right = self.parse_unary()?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, CompileError> {
        if self.depth >= MAX_NESTING {
            return Err(CompileError::syntax("expression is nested too deeply"));
        }
        self.depth += 1;
        let result = self.parse_signed();
        self.depth -= 1;
        result
    }

    fn parse_signed(&mut self) -> Result<Expr, CompileError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.consume();
                let operand = self.parse_unary()?;
                Ok(Expr::Neg(Box::new(operand)))
            }
            Some(Token::Plus) => {
                self.consume();
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // Right-associative; the exponent may carry its own sign (`2^-1`).
    fn parse_power(&mut self) -> Result<Expr, CompileError> {
        let base = self.parse_primary()?;
        if let Some(Token::Caret) = self.peek() {
            self.consume();
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary(Box::new(base), BinaryOp::Pow, Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, CompileError> {
        match self.consume() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Identifier(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.consume();
                    let mut args = vec![self.parse_expression()?];
                    while let Some(Token::Comma) = self.peek() {
                        self.consume();
                        args.push(self.parse_expression()?);
                    }
                    self.expect_rparen()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Variable(name))
                }
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect_rparen()?;
                Ok(expr)
            }
            Some(other) => Err(CompileError::syntax(format!("unexpected {other}"))),
            None => Err(CompileError::syntax("unexpected end of input")),
        }
    }
}

// --- Compiled functions ---

/// An expression compiled for a specific mode; evaluable at 1 or 2 coordinates.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    source: String,
    mode: Mode,
    bytecode: Bytecode,
}

impl CompiledFunction {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }
}

impl Objective for CompiledFunction {
    fn dimension(&self) -> usize {
        self.mode.dimension()
    }

    fn evaluate(&self, point: &[f64]) -> Result<f64, EvaluationError> {
        if point.len() != self.dimension() {
            return Err(EvaluationError::domain(format!(
                "expected {} coordinate(s), got {}",
                self.dimension(),
                point.len()
            )));
        }
        let mut stack = Vec::with_capacity(self.bytecode.max_depth);
        VM::execute(&self.bytecode, point, &mut stack)
    }
}

/// Compiles `text` into a function of the variables allowed by `mode`.
pub fn compile(text: &str, mode: Mode) -> Result<CompiledFunction, CompileError> {
    let expr = parse(text)?;
    let bytecode = Compiler::for_mode(mode).compile(&expr)?;
    Ok(CompiledFunction {
        source: text.trim().to_string(),
        mode,
        bytecode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, point: &[f64]) -> f64 {
        let mode = if point.len() == 1 { Mode::Curve } else { Mode::Surface };
        compile(text, mode)
            .expect("expression should compile")
            .evaluate(point)
            .expect("expression should evaluate")
    }

    fn assert_syntax_err(text: &str, mode: Mode, needle: &str) {
        match compile(text, mode) {
            Err(CompileError::InvalidSyntax { message }) => assert!(
                message.contains(needle),
                "expected message to contain \"{needle}\", got \"{message}\""
            ),
            other => panic!("expected InvalidSyntax for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3", &[0.0]), 7.0);
        assert_eq!(eval("(1 + 2) * 3", &[0.0]), 9.0);
        assert_eq!(eval("2 ^ 3 ^ 2", &[0.0]), 512.0);
        assert_eq!(eval("-x^2", &[3.0]), -9.0);
        assert_eq!(eval("2^-1", &[0.0]), 0.5);
        assert_eq!(eval("8 / 4 / 2", &[0.0]), 1.0);
        assert_eq!(eval("10 - 4 - 3", &[0.0]), 3.0);
        assert_eq!(eval("--x", &[2.0]), 2.0);
    }

    #[test]
    fn deep_nesting_is_rejected_without_overflow() {
        let parens = |d: usize| format!("{}x{}", "(".repeat(d), ")".repeat(d));
        assert_eq!(eval(&parens(50), &[3.0]), 3.0);
        assert_syntax_err(&parens(150), Mode::Curve, "nested too deeply");
        assert_syntax_err(&parens(10_000), Mode::Curve, "too long");
        assert_syntax_err(&format!("{}x", "-".repeat(150)), Mode::Curve, "nested too deeply");
        assert_syntax_err(&format!("{}x", "-".repeat(10_000)), Mode::Curve, "too long");
        assert_syntax_err(&format!("{}2", "2^".repeat(150)), Mode::Curve, "nested too deeply");
        assert_syntax_err(&format!("{}x", "sin(".repeat(150)), Mode::Curve, "nested too deeply");
    }

    #[test]
    fn long_flat_sums_are_bounded() {
        let sum = vec!["x"; 500].join(" + ");
        assert_eq!(eval(&sum, &[1.0]), 500.0);
        assert_syntax_err(&vec!["x"; 5_000].join(" + "), Mode::Curve, "too long");
    }

    #[test]
    fn javascript_style_input_is_accepted() {
        assert_eq!(eval("x**2", &[3.0]), 9.0);
        assert!((eval("Math.sin(Math.PI / 2)", &[0.0]) - 1.0).abs() < 1e-12);
        assert!((eval("Math.E", &[0.0]) - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn numbers_and_constants() {
        assert_eq!(eval("1.5e2", &[0.0]), 150.0);
        assert_eq!(eval("2.5E-1", &[0.0]), 0.25);
        assert_eq!(eval(".5", &[0.0]), 0.5);
        assert!((eval("pi", &[0.0]) - std::f64::consts::PI).abs() < 1e-15);
        assert_syntax_err("1.2.3", Mode::Curve, "malformed number");
        assert_syntax_err("2e", Mode::Curve, "unexpected identifier");
    }

    #[test]
    fn whitelisted_functions_evaluate() {
        assert!((eval("sqrt(x) + abs(-2)", &[9.0]) - 5.0).abs() < 1e-12);
        assert!((eval("ln(e) + log10(100) + log2(8)", &[0.0]) - 6.0).abs() < 1e-12);
        assert!((eval("exp(0) + cos(0) + tanh(0)", &[0.0]) - 2.0).abs() < 1e-12);
        assert!((eval("pow(x, 3)", &[2.0]) - 8.0).abs() < 1e-12);
        assert!((eval("x^2 + y^2", &[3.0, 4.0]) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_unknown_identifiers_for_mode() {
        assert_syntax_err("x + y", Mode::Curve, "unknown variable `y`");
        assert_syntax_err("z", Mode::Surface, "allowed: x, y");
        assert!(compile("x + y", Mode::Surface).is_ok());
    }

    #[test]
    fn rejects_unsupported_functions() {
        let err = compile("gamma(x)", Mode::Curve).expect_err("gamma is not whitelisted");
        assert_eq!(
            err,
            CompileError::UnsupportedFunction {
                name: "gamma".to_string()
            }
        );
        let err = compile("x(2)", Mode::Curve).expect_err("variables are not callable");
        assert!(matches!(err, CompileError::UnsupportedFunction { .. }));
    }

    #[test]
    fn rejects_malformed_syntax() {
        assert_syntax_err("", Mode::Curve, "empty");
        assert_syntax_err("   ", Mode::Curve, "empty");
        assert_syntax_err("1 +", Mode::Curve, "end of input");
        assert_syntax_err("(x + 1", Mode::Curve, "expected `)`");
        assert_syntax_err("x + 1)", Mode::Curve, "unexpected `)`");
        assert_syntax_err("x; alert(1)", Mode::Curve, "unexpected character `;`");
        assert_syntax_err("x => x", Mode::Curve, "unexpected character `=`");
        assert_syntax_err("sin(x, 2)", Mode::Curve, "expects 1 argument");
        assert_syntax_err("pow(x)", Mode::Curve, "expects 2 argument");
        assert_syntax_err("Math.", Mode::Curve, "after `Math.`");
    }

    #[test]
    fn evaluation_failures_are_typed() {
        let f = compile("1 / x", Mode::Curve).expect("compiles");
        assert!(matches!(
            f.evaluate(&[0.0]),
            Err(EvaluationError::DomainError { .. })
        ));
        let f = compile("ln(x)", Mode::Curve).expect("compiles");
        assert!(matches!(
            f.evaluate(&[-1.0]),
            Err(EvaluationError::DomainError { .. })
        ));
        let f = compile("sqrt(x)", Mode::Curve).expect("compiles");
        assert!(matches!(
            f.evaluate(&[-4.0]),
            Err(EvaluationError::DomainError { .. })
        ));
        let f = compile("asin(x)", Mode::Curve).expect("compiles");
        assert!(matches!(
            f.evaluate(&[2.0]),
            Err(EvaluationError::DomainError { .. })
        ));
        let f = compile("x ^ 0.5", Mode::Curve).expect("compiles");
        assert!(matches!(
            f.evaluate(&[-2.0]),
            Err(EvaluationError::DomainError { .. })
        ));
        let f = compile("exp(x)", Mode::Curve).expect("compiles");
        assert_eq!(f.evaluate(&[1000.0]), Err(EvaluationError::NonFinite));
        assert_eq!(f.evaluate(&[f64::NAN]), Err(EvaluationError::NonFinite));
    }

    #[test]
    fn dimension_mismatch_is_reported() {
        let f = compile("x", Mode::Surface).expect("compiles");
        assert_eq!(f.dimension(), 2);
        assert!(matches!(
            f.evaluate(&[1.0]),
            Err(EvaluationError::DomainError { .. })
        ));
    }

    #[test]
    fn bytecode_rejects_malformed_programs() {
        assert!(Bytecode::new(vec![OpCode::Add]).is_err());
        assert!(Bytecode::new(vec![OpCode::LoadConst(1.0), OpCode::LoadConst(2.0)]).is_err());
        assert!(Bytecode::new(Vec::new()).is_err());
        let code = Bytecode::new(vec![
            OpCode::LoadConst(1.0),
            OpCode::LoadVar(0),
            OpCode::Add,
        ])
        .expect("valid program");
        assert_eq!(code.max_depth(), 2);
    }

    #[test]
    fn compiled_function_keeps_source_and_mode() {
        let f = compile("  x^2 ", Mode::Curve).expect("compiles");
        assert_eq!(f.source(), "x^2");
        assert_eq!(f.mode(), Mode::Curve);
        assert_eq!(
            f.bytecode().ops(),
            &[OpCode::LoadVar(0), OpCode::LoadConst(2.0), OpCode::Pow]
        );
    }
}
