//! Expression parser for spreadsheet formulas.
//!
//! This module implements a recursive descent parser for formulas and a tree
//! evaluator over the resulting AST. Operator precedence is carried by the
//! grammar, so evaluation is a single walk of the tree.
//!
//! # BNF Grammar
//!
//! ```bnf
//! Formula        ::= List EOF
//! List           ::= Addition ( "," Addition )*
//! Addition       ::= Multiplication ( ( "+" | "-" ) Multiplication )*
//! Multiplication ::= Primary ( ( "*" | "/" ) Primary )*
//! Primary        ::= Number | Range | CellRef | FunctionCall | Group | Name
//! FunctionCall   ::= Identifier "(" List? ")"
//! Group          ::= "(" List? ")"
//! Range          ::= CellRef ":" CellRef
//! CellRef        ::= [A-J] [1-9] [0-9]?
//! Number         ::= [0-9]* "."? [0-9]+
//! Identifier     ::= [A-Z] [A-Z0-9_]*
//! ```
//!
//! Letters are case-insensitive in cell references and function names. There are
//! no unary operators: `-5` is not a formula. A group is a call to the function
//! with the empty name, which returns its arguments unchanged.
//!
//! Formulas nested deeper than [`MAX_NESTING_DEPTH`] or with more than
//! [`MAX_OPERATORS`] operators are rejected, which keeps both parsing and
//! evaluation within a bounded stack.

use tracing::{debug, trace};

use super::arithmetic::{self, BinaryOp};
use super::errors::{DomainError, DomainResult};
use super::functions::FunctionRegistry;
use super::models::{CellId, CellLookup, Value};

/// Deepest nesting of parentheses and calls a formula may use.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Most binary operators a single formula may contain.
pub const MAX_OPERATORS: usize = 1024;

/// Represents a token in the expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Number(f64),
    CellRef(CellId),
    Identifier(String),

    // Operators
    Plus,
    Minus,
    Multiply,
    Divide,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Colon,

    // End of input
    Eof,
}

/// Represents an Abstract Syntax Tree node for expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    CellRef(CellId),
    Range(CellId, CellId),
    /// An identifier that is neither a cell reference nor called like a function.
    Name(String),

    Binary {
        left: Box<Expr>,
        operator: BinaryOp,
        right: Box<Expr>,
    },

    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },

    /// Comma-separated items at the top level of a formula.
    List(Vec<Expr>),
}

impl Expr {
    /// True for a number or a list of numbers, i.e. nothing left to compute.
    pub fn is_literal(&self) -> bool {
        match self {
            Expr::Number(_) => true,
            Expr::List(items) => items.iter().all(|item| matches!(item, Expr::Number(_))),
            _ => false,
        }
    }

    /// Cells the expression reads directly, ranges expanded.
    pub fn cell_references(&self) -> Vec<CellId> {
        let mut references = Vec::new();
        self.collect_references(&mut references);
        references
    }

    fn collect_references(&self, references: &mut Vec<CellId>) {
        match self {
            Expr::CellRef(id) => references.push(*id),
            Expr::Range(start, end) => references.extend(CellId::span(*start, *end)),
            Expr::Binary { left, right, .. } => {
                left.collect_references(references);
                right.collect_references(references);
            }
            Expr::FunctionCall { args: items, .. } | Expr::List(items) => {
                for item in items {
                    item.collect_references(references);
                }
            }
            Expr::Number(_) | Expr::Name(_) => {}
        }
    }
}

/// Lexical analyzer for tokenizing expressions.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_digits(&mut self, into: &mut String) {
        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                into.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Reads a number token (integer or decimal).
    fn read_number(&mut self) -> DomainResult<f64> {
        let mut number_str = String::new();

        self.read_digits(&mut number_str);
        if self.current_char == Some('.') {
            number_str.push('.');
            self.advance();
            self.read_digits(&mut number_str);
        }

        number_str
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidFormula(format!("Invalid number: {}", number_str)))
    }

    /// Reads an identifier (function name or cell reference).
    fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        identifier
    }

    fn single(&mut self, token: Token) -> DomainResult<Token> {
        self.advance();
        Ok(token)
    }

    /// Gets the next token from the input.
    pub fn next_token(&mut self) -> DomainResult<Token> {
        self.skip_whitespace();

        match self.current_char {
            None => Ok(Token::Eof),

            Some(ch) => match ch {
                '0'..='9' | '.' => Ok(Token::Number(self.read_number()?)),

                'A'..='Z' | 'a'..='z' => {
                    let identifier = self.read_identifier();
                    Ok(match CellId::parse(&identifier) {
                        Some(id) => Token::CellRef(id),
                        None => Token::Identifier(identifier),
                    })
                }

                '+' => self.single(Token::Plus),
                '-' => self.single(Token::Minus),
                '*' => self.single(Token::Multiply),
                '/' => self.single(Token::Divide),
                '(' => self.single(Token::LeftParen),
                ')' => self.single(Token::RightParen),
                ',' => self.single(Token::Comma),
                ':' => self.single(Token::Colon),

                _ => Err(DomainError::InvalidFormula(format!(
                    "Unexpected character: '{}'",
                    ch
                ))),
            },
        }
    }
}

/// Recursive descent parser for spreadsheet expressions.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    depth: usize,
    operators: usize,
}

impl Parser {
    /// Creates a new parser for the given expression.
    pub fn new(input: &str) -> DomainResult<Self> {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token()?;

        Ok(Self {
            lexer,
            current_token,
            depth: 0,
            operators: 0,
        })
    }

    fn advance(&mut self) -> DomainResult<()> {
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> DomainResult<()> {
        if self.current_token == expected {
            self.advance()
        } else {
            Err(DomainError::InvalidFormula(format!(
                "Expected {:?}, found {:?}",
                expected, self.current_token
            )))
        }
    }

    /// Parses the whole input as a formula.
    pub fn parse(&mut self) -> DomainResult<Expr> {
        let mut items = self.parse_list()?;

        if self.current_token != Token::Eof {
            return Err(DomainError::InvalidFormula(format!(
                "Unexpected token at end: {:?}",
                self.current_token
            )));
        }

        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::List(items)
        })
    }

    fn parse_list(&mut self) -> DomainResult<Vec<Expr>> {
        let mut items = vec![self.parse_addition()?];

        while self.current_token == Token::Comma {
            self.advance()?;
            items.push(self.parse_addition()?);
        }

        Ok(items)
    }

    fn count_operator(&mut self) -> DomainResult<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(DomainError::InvalidFormula(format!(
                "More than {} operators",
                MAX_OPERATORS
            )));
        }
        Ok(())
    }

    fn binary_operator(&self) -> Option<BinaryOp> {
        match self.current_token {
            Token::Plus => Some(BinaryOp::Add),
            Token::Minus => Some(BinaryOp::Subtract),
            Token::Multiply => Some(BinaryOp::Multiply),
            Token::Divide => Some(BinaryOp::Divide),
            _ => None,
        }
    }

    /// Parses addition and subtraction expressions.
    fn parse_addition(&mut self) -> DomainResult<Expr> {
        let mut left = self.parse_multiplication()?;

        while let Some(operator) = self.binary_operator().filter(|op| !op.is_high_precedence()) {
            self.count_operator()?;
            self.advance()?;
            let right = self.parse_multiplication()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Parses multiplication and division expressions.
    fn parse_multiplication(&mut self) -> DomainResult<Expr> {
        let mut left = self.parse_primary()?;

        while let Some(operator) = self.binary_operator().filter(|op| op.is_high_precedence()) {
            self.count_operator()?;
            self.advance()?;
            let right = self.parse_primary()?;
            left = Expr::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> DomainResult<Expr> {
        match &self.current_token {
            Token::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Expr::Number(value))
            }

            Token::CellRef(cell) => {
                let cell = *cell;
                self.advance()?;

                if self.current_token != Token::Colon {
                    return Ok(Expr::CellRef(cell));
                }

                self.advance()?;
                if let Token::CellRef(end_cell) = self.current_token {
                    self.advance()?;
                    Ok(Expr::Range(cell, end_cell))
                } else {
                    Err(DomainError::InvalidFormula(
                        "Expected cell reference after ':'".to_string(),
                    ))
                }
            }

            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;

                if self.current_token == Token::LeftParen {
                    let args = self.parse_call_arguments()?;
                    Ok(Expr::FunctionCall { name, args })
                } else {
                    Ok(Expr::Name(name))
                }
            }

            Token::LeftParen => {
                let args = self.parse_call_arguments()?;
                Ok(Expr::FunctionCall {
                    name: String::new(),
                    args,
                })
            }

            _ => Err(DomainError::InvalidFormula(format!(
                "Unexpected token: {:?}",
                self.current_token
            ))),
        }
    }

    /// Parses `( List? )` starting at the opening parenthesis.
    fn parse_call_arguments(&mut self) -> DomainResult<Vec<Expr>> {
        self.expect(Token::LeftParen)?;

        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(DomainError::InvalidFormula(format!(
                "Nested deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }

        let args = if self.current_token == Token::RightParen {
            Vec::new()
        } else {
            self.parse_list()?
        };

        self.expect(Token::RightParen)?;
        self.depth -= 1;
        Ok(args)
    }
}

/// Expression evaluator that walks the AST and computes results.
pub struct ExpressionEvaluator<'a, L: CellLookup + ?Sized> {
    lookup: &'a L,
    function_registry: &'a FunctionRegistry,
}

impl<'a, L: CellLookup + ?Sized> ExpressionEvaluator<'a, L> {
    /// Creates a new expression evaluator.
    pub fn new(lookup: &'a L, function_registry: &'a FunctionRegistry) -> Self {
        Self {
            lookup,
            function_registry,
        }
    }

    /// Evaluates an expression AST.
    ///
    /// Fails only when a referenced cell is missing from the lookup.
    pub fn evaluate(&self, expr: &Expr) -> DomainResult<Value> {
        match expr {
            Expr::Number(value) => Ok(Value::Number(*value)),

            Expr::CellRef(id) => Ok(Value::Text(self.cell_text(*id)?)),

            Expr::Range(start, end) => {
                let cells = CellId::span(*start, *end);
                if cells.is_empty() {
                    return Ok(Value::List(Vec::new()));
                }

                let texts = cells
                    .into_iter()
                    .map(|id| self.cell_text(id))
                    .collect::<DomainResult<Vec<_>>>()?;
                Ok(Value::Text(texts.join(",")))
            }

            Expr::Name(name) => Ok(Value::Unresolved(name.clone())),

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val = self.evaluate(left)?;
                let right_val = self.evaluate(right)?;
                Ok(arithmetic::combine(*operator, left_val, right_val))
            }

            Expr::FunctionCall { name, args } => self.evaluate_call(name, args),

            Expr::List(items) => {
                let values = self.evaluate_all(items)?;
                Ok(join_values(values))
            }
        }
    }

    fn cell_text(&self, id: CellId) -> DomainResult<String> {
        self.lookup
            .cell_text(id)
            .ok_or_else(|| DomainError::MissingCell(id.to_string()))
    }

    fn evaluate_all(&self, exprs: &[Expr]) -> DomainResult<Vec<Value>> {
        exprs.iter().map(|expr| self.evaluate(expr)).collect()
    }

    fn evaluate_call(&self, name: &str, args: &[Expr]) -> DomainResult<Value> {
        let values = self.evaluate_all(args)?;
        let verbatim = || Value::Unresolved(format!("{}({})", name, render_joined(&values)));

        if values.iter().any(Value::is_unresolved) {
            return Ok(verbatim());
        }

        let Some(func) = self.function_registry.get_function(name) else {
            debug!(function = name, "unknown function left unevaluated");
            return Ok(verbatim());
        };

        let numbers: Vec<f64> = values
            .iter()
            .filter_map(Value::to_numbers)
            .flatten()
            .collect();
        trace!(function = name, arguments = numbers.len(), "applying function");

        Ok(func(&numbers))
    }
}

fn render_joined(values: &[Value]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Joins top-level list items, keeping text as text so it renders unchanged.
fn join_values(values: Vec<Value>) -> Value {
    if values.iter().any(Value::is_unresolved) {
        return Value::Unresolved(render_joined(&values));
    }
    if values.iter().any(|value| matches!(value, Value::Text(_))) {
        return Value::Text(render_joined(&values));
    }

    Value::List(values.iter().filter_map(Value::to_numbers).flatten().collect())
}
