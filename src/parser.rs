use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    code_gen::CodeGen,
    constant_pool::{Constant, ConstantPool},
    ir::{Address, InstrKind, Label, NameGen, OpCode, Program},
    scanner::Scanner,
    token::{Site, Spanned, Token, TokenKind},
    type_checker::{self, check_binary, check_unary, BinaryOp, Construct, UnaryOp},
    types::{SymbolTable, Type},
    util::TokenStreamExt,
};

type Result<T, E = ()> = std::result::Result<T, E>;

pub type ParseResult<T> = Result<T, (T, Vec<Spanned<Error>>)>;

/// Everything a compilation produces.
#[derive(Debug)]
pub struct Output {
    pub program: Program,
    pub pool: ConstantPool,
    pub symbols: SymbolTable,
}

/// Scans and parses `src` in one go.
///
/// On failure the partially built output is returned along with every
/// diagnostic that was recorded.
pub fn compile(src: &str) -> ParseResult<Output> {
    let mut parser = Parser::new();
    parser.pull_tokens(&mut Scanner::new(src));
    parser.parse();
    parser.finish()
}

/// Whether errors are currently being reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Mode {
    Normal,
    /// An error was just reported. Further reports are dropped until the next
    /// token is consumed.
    Recovering,
}

/// The typed value of an expression.
#[derive(Clone, Debug)]
struct Value {
    address: Address,
    ty: Type,
}

/// A single-pass parser: checks types and emits instructions as it goes.
pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    eof: Token,
    /// Position of the most recently consumed token. Instructions are tagged
    /// with it.
    prev: Site,
    code: CodeGen,
    symbols: SymbolTable,
    names: NameGen,
    mode: Mode,
    error_occurred: bool,
    aborted: bool,
    errors: Vec<Spanned<Error>>,
    block_depth: u32,
}

impl Parser {
    pub fn new() -> Parser {
        let eof = Token::dummy(TokenKind::Eof);
        Parser {
            tokens: Vec::new(),
            cursor: 0,
            prev: eof.site(),
            eof,
            code: CodeGen::new(),
            symbols: SymbolTable::with_capacity(64),
            names: NameGen::new(),
            mode: Mode::Normal,
            error_occurred: false,
            aborted: false,
            errors: Vec::with_capacity(8),
            block_depth: 0,
        }
    }

    /// Supplies the next token.
    pub fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    /// Pulls tokens from `scanner` up to (and including) the end of input.
    pub fn pull_tokens(&mut self, scanner: &mut Scanner<'_>) {
        for token in scanner.by_ref().until_eof() {
            self.add_token(token);
        }
    }

    /// Parses every supplied token. Returns `true` if no error occurred.
    pub fn parse(&mut self) -> bool {
        debug!(tokens = self.tokens.len(), "parsing");
        self.skip_error_tokens();
        while !self.peek().is_eof() && !self.aborted {
            self.declaration();
        }
        if !self.aborted && !self.tokens.last().is_some_and(Token::is_eof) {
            let error = self.prev.wrap(Error::MissingEndOfInput);
            self.error(error);
        }
        debug!(
            instructions = self.code.size(),
            constants = self.code.pool().len(),
            errors = self.errors.len(),
            "parsed"
        );
        !self.error_occurred
    }

    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }

    pub fn errors(&self) -> &[Spanned<Error>] {
        &self.errors
    }

    pub fn program(&self) -> &Program {
        self.code.program()
    }

    pub fn pool(&self) -> &ConstantPool {
        self.code.pool()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn finish(self) -> ParseResult<Output> {
        let (program, pool) = self.code.into_parts();
        let output = Output {
            program,
            pool,
            symbols: self.symbols,
        };
        if self.error_occurred {
            Err((output, self.errors))
        } else {
            Ok(output)
        }
    }
}

// Declarations and statements.
impl Parser {
    fn declaration(&mut self) {
        let start = self.cursor;
        let result = if matches!(self.peek().kind, TokenKind::Primitive { .. }) {
            self.var_declaration()
        } else {
            self.statement()
        };
        if result.is_err() && !self.aborted {
            self.synchronize();
            if self.cursor == start {
                self.advance();
            }
        }
    }

    /// `type IDENT [= expr];`
    fn var_declaration(&mut self) -> Result<()> {
        let TokenKind::Primitive { ty, .. } = self.advance().kind else {
            unreachable!("caller checked for a type name");
        };
        let ty = Type::from(ty);
        let (name, name_site) = self.consume_identifier()?;
        let target = Address::named(&name);
        if self.symbols.contains(&target) {
            self.error(name_site.wrap(Error::Redeclaration(name)));
            return Err(());
        }
        trace!(%target, %ty, "declaring");

        let value = if self.take(&TokenKind::Equal) {
            let eq_site = self.prev;
            let Ok(value) = self.expression() else {
                self.symbols.insert(target, ty);
                return Err(());
            };
            self.coerce_for_assignment(&name, ty, value, eq_site)
        } else {
            Some(self.constant(Constant::default_of(ty)))
        };
        if let Some(value) = value {
            self.emit_pure_into(target.clone(), OpCode::Id, vec![value.address]);
        }
        self.symbols.insert(target, ty);

        self.consume(&TokenKind::Semicolon)?;
        Ok(())
    }

    fn statement(&mut self) -> Result<()> {
        match self.peek().kind {
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Print => self.print_statement(),
            TokenKind::LeftBrace => self.block(),
            _ => self.expression_statement(),
        }
    }

    /// Parses the body of `if`, `else` or `while`, which can't be a bare
    /// declaration.
    fn body(&mut self, keyword: &'static str) -> Result<()> {
        let current = self.peek();
        if matches!(current.kind, TokenKind::Primitive { .. }) {
            let error = current.site().wrap(Error::DeclarationNotAllowed(keyword));
            self.abort(error);
            return Err(());
        }
        self.statement()
    }

    fn if_statement(&mut self) -> Result<()> {
        self.advance(); // if
        let suffix = self.names.fresh_suffix();
        let label = |part| Label::if_branch(suffix, part);

        let cond = self.condition(Construct::If)?;
        self.emit_impure(
            OpCode::Br,
            vec![cond.address],
            vec![label("true"), label("false")],
        );
        self.emit_label(label("true"));
        self.body("if")?;

        if self.take(&TokenKind::Else) {
            self.emit_impure(OpCode::Jmp, vec![], vec![label("exit")]);
            self.emit_label(label("false"));
            self.body("else")?;
            self.emit_label(label("exit"));
        } else {
            self.emit_label(label("false"));
        }
        Ok(())
    }

    fn while_statement(&mut self) -> Result<()> {
        self.advance(); // while
        let suffix = self.names.fresh_suffix();
        let label = |part| Label::while_loop(suffix, part);

        self.emit_label(label("cond"));
        let cond = self.condition(Construct::While)?;
        self.emit_impure(
            OpCode::Br,
            vec![cond.address],
            vec![label("true"), label("exit")],
        );
        self.emit_label(label("true"));
        self.body("while")?;
        self.emit_impure(OpCode::Jmp, vec![], vec![label("cond")]);
        self.emit_label(label("exit"));
        Ok(())
    }

    /// `( expr )`, which must be a boolean. A non-boolean condition is
    /// reported but doesn't stop the statement from being lowered.
    fn condition(&mut self, construct: Construct) -> Result<Value> {
        self.consume(&TokenKind::LeftParen)?;
        let site = self.peek().site();
        let cond = self.expression()?;
        self.consume(&TokenKind::RightParen)?;
        if let Err(error) = type_checker::check_condition(construct, cond.ty) {
            self.error(site.wrap(error.into()));
        }
        Ok(cond)
    }

    fn print_statement(&mut self) -> Result<()> {
        self.advance(); // print
        let value = self.expression()?;
        self.consume(&TokenKind::Semicolon)?;
        self.emit_impure(OpCode::Print, vec![value.address], vec![]);
        Ok(())
    }

    fn block(&mut self) -> Result<()> {
        self.advance(); // {
        self.block_depth += 1;
        while !self.is(&TokenKind::RightBrace) && !self.peek().is_eof() && !self.aborted {
            self.declaration();
        }
        self.block_depth -= 1;
        if self.aborted {
            return Err(());
        }
        self.consume(&TokenKind::RightBrace)?;
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.consume(&TokenKind::Semicolon)?;
        Ok(())
    }
}

// Expressions.
impl Parser {
    fn expression(&mut self) -> Result<Value> {
        self.assignment()
    }

    /// `IDENT = assignment`, right-associative.
    fn assignment(&mut self) -> Result<Value> {
        let is_assignment = matches!(self.peek().kind, TokenKind::Identifier(_))
            && self.peek_next().kind == TokenKind::Equal;
        if !is_assignment {
            return self.logic_or();
        }

        let (name, name_site) = self.consume_identifier()?;
        self.advance(); // =
        let eq_site = self.prev;
        let value = self.assignment()?;

        let target = Address::named(&name);
        let Some(expected) = self.symbols.get(&target) else {
            self.error(name_site.wrap(Error::AssignToUndeclared(name)));
            return Err(());
        };
        if let Some(value) = self.coerce_for_assignment(&name, expected, value, eq_site) {
            self.emit_pure_into(target.clone(), OpCode::Id, vec![value.address]);
        }
        Ok(Value {
            address: target,
            ty: expected,
        })
    }

    fn logic_or(&mut self) -> Result<Value> {
        self.left_assoc(Parser::logic_and, |kind| match kind {
            TokenKind::Or => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn logic_and(&mut self) -> Result<Value> {
        self.left_assoc(Parser::equality, |kind| match kind {
            TokenKind::And => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn equality(&mut self) -> Result<Value> {
        self.left_assoc(Parser::comparison, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOp::Eq),
            TokenKind::BangEqual => Some(BinaryOp::Neq),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Value> {
        self.left_assoc(Parser::term, |kind| match kind {
            TokenKind::Greater => Some(BinaryOp::Gt),
            TokenKind::GreaterEqual => Some(BinaryOp::Geq),
            TokenKind::Less => Some(BinaryOp::Lt),
            TokenKind::LessEqual => Some(BinaryOp::Leq),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Value> {
        self.left_assoc(Parser::factor, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn factor(&mut self) -> Result<Value> {
        self.left_assoc(Parser::unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            _ => None,
        })
    }

    /// Parses `operand (operator operand)*`, emitting each operation as soon as
    /// its right operand is parsed.
    fn left_assoc(
        &mut self,
        operand: fn(&mut Self) -> Result<Value>,
        operator: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> Result<Value> {
        let mut lhs = operand(self)?;
        while let Some(op) = operator(&self.peek().kind) {
            let site = self.advance().site();
            let rhs = operand(self)?;
            lhs = self.binary(op, lhs, rhs, site);
        }
        Ok(lhs)
    }

    fn binary(&mut self, op: BinaryOp, lhs: Value, rhs: Value, site: Site) -> Value {
        match check_binary(op, lhs.ty, rhs.ty) {
            Ok(typing) => {
                let lhs = if typing.coerce_lhs {
                    self.widen(lhs)
                } else {
                    lhs
                };
                let rhs = if typing.coerce_rhs {
                    self.widen(rhs)
                } else {
                    rhs
                };
                self.emit_pure(typing.opcode, typing.result, vec![lhs.address, rhs.address])
            }
            Err(error) => {
                self.error(site.wrap(error.into()));
                let ty = match op {
                    BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                        numeric_fallback(&[lhs.ty, rhs.ty])
                    }
                    _ => Type::Bool,
                };
                self.poisoned(ty)
            }
        }
    }

    fn unary(&mut self) -> Result<Value> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.primary(),
        };
        let site = self.advance().site();
        let operand = self.unary()?;

        match check_unary(op, operand.ty) {
            Ok((opcode, ty)) if op == UnaryOp::Negate => {
                let zero = if ty == Type::Real {
                    Constant::Real(0.0)
                } else {
                    Constant::Int(0)
                };
                let zero = self.constant(zero);
                Ok(self.emit_pure(opcode, ty, vec![zero.address, operand.address]))
            }
            Ok((opcode, ty)) => Ok(self.emit_pure(opcode, ty, vec![operand.address])),
            Err(error) => {
                self.error(site.wrap(error.into()));
                let ty = match op {
                    UnaryOp::Negate => numeric_fallback(&[operand.ty]),
                    UnaryOp::Not => Type::Bool,
                };
                Ok(self.poisoned(ty))
            }
        }
    }

    fn primary(&mut self) -> Result<Value> {
        let current = self.peek();
        let constant = match current.kind {
            TokenKind::Int(value) => Constant::Int(value),
            TokenKind::Real(value) => Constant::Real(value),
            TokenKind::Char(value) => Constant::Char(value),
            TokenKind::True => Constant::Bool(true),
            TokenKind::False => Constant::Bool(false),
            TokenKind::Identifier(_) => return self.variable(),
            TokenKind::Quote => return self.string(),
            TokenKind::LeftParen => {
                self.advance();
                let value = self.expression()?;
                self.consume(&TokenKind::RightParen)?;
                return Ok(value);
            }
            _ => {
                let error = current.site().wrap(Error::ExpectedExpression {
                    actual: current.kind.clone(),
                });
                self.error(error);
                return Err(());
            }
        };
        self.advance();
        Ok(self.constant(constant))
    }

    fn variable(&mut self) -> Result<Value> {
        let (name, site) = self.consume_identifier()?;
        let address = Address::named(&name);
        match self.symbols.get(&address) {
            Some(ty) => Ok(Value { address, ty }),
            None => {
                self.error(site.wrap(Error::UndefinedVariable(name)));
                Err(())
            }
        }
    }

    /// `" (TEXT | ${ expr })* "`
    ///
    /// Each part becomes a string value (through `TO_STRING` when needed), and
    /// parts are joined from left to right with `CONCAT`.
    fn string(&mut self) -> Result<Value> {
        self.advance(); // "
        let mut joined: Option<Value> = None;
        loop {
            let current = self.peek();
            let part = match &current.kind {
                TokenKind::Text(text) => {
                    let text = text.clone();
                    self.advance();
                    self.constant(Constant::Str(text))
                }
                TokenKind::DollarBrace => {
                    self.advance();
                    let value = self.expression()?;
                    self.consume(&TokenKind::RightBrace)?;
                    if value.ty == Type::Str {
                        value
                    } else {
                        self.emit_pure(OpCode::ToString, Type::Str, vec![value.address])
                    }
                }
                TokenKind::Quote => {
                    self.advance();
                    break;
                }
                other => {
                    let error = current.site().wrap(Error::Unexpected {
                        expected: TokenKind::Quote,
                        actual: other.clone(),
                    });
                    self.error(error);
                    return Err(());
                }
            };
            joined = Some(match joined {
                None => part,
                Some(prefix) => {
                    self.emit_pure(OpCode::Concat, Type::Str, vec![prefix.address, part.address])
                }
            });
        }
        Ok(joined.unwrap_or_else(|| self.constant(Constant::Str("".into()))))
    }

    /// Applies the assignment rules for storing `value` into `name`. Returns
    /// the (possibly widened) value to bind, or `None` after reporting a type
    /// error.
    fn coerce_for_assignment(
        &mut self,
        name: &str,
        expected: Type,
        value: Value,
        site: Site,
    ) -> Option<Value> {
        match type_checker::check_assignment(name, expected, value.ty) {
            Ok(true) => Some(self.widen(value)),
            Ok(false) => Some(value),
            Err(error) => {
                self.error(site.wrap(error.into()));
                None
            }
        }
    }
}

// Emission helpers. Every instruction is tagged with the position of the last
// consumed token, and every temporary enters the symbol table right after the
// instruction defining it.
impl Parser {
    fn emit(&mut self, kind: InstrKind) {
        let Site { line, col, .. } = self.prev;
        self.code.add_instruction(kind, line, col);
    }

    fn emit_label(&mut self, label: Label) {
        self.emit(InstrKind::Label(label));
    }

    fn emit_impure(&mut self, op: OpCode, args: Vec<Address>, labels: Vec<Label>) {
        self.emit(InstrKind::Impure { op, args, labels });
    }

    /// Emits `op` into a fresh temporary of type `ty`.
    fn emit_pure(&mut self, op: OpCode, ty: Type, args: Vec<Address>) -> Value {
        let dest = self.names.fresh_temp();
        self.emit_pure_into(dest.clone(), op, args);
        self.symbols.insert(dest.clone(), ty);
        Value { address: dest, ty }
    }

    fn emit_pure_into(&mut self, dest: Address, op: OpCode, args: Vec<Address>) {
        self.emit(InstrKind::Pure { op, dest, args });
    }

    /// Loads `value` into a fresh temporary.
    fn constant(&mut self, value: Constant) -> Value {
        let ty = value.ty();
        let dest = self.names.fresh_temp();
        let Site { line, col, .. } = self.prev;
        self.code
            .add_constant_instruction(dest.clone(), value, line, col);
        self.symbols.insert(dest.clone(), ty);
        Value { address: dest, ty }
    }

    fn widen(&mut self, value: Value) -> Value {
        debug_assert_eq!(value.ty, Type::Int);
        self.emit_pure(OpCode::I2F, Type::Real, vec![value.address])
    }

    /// A temporary standing for an ill-typed expression. Nothing defines it;
    /// it only lets parsing carry on.
    fn poisoned(&mut self, ty: Type) -> Value {
        let dest = self.names.fresh_temp();
        self.symbols.insert(dest.clone(), ty);
        Value { address: dest, ty }
    }
}

/// The type an ill-typed arithmetic operation is assumed to have, so that
/// enclosing operators don't report the same operand again.
fn numeric_fallback(operands: &[Type]) -> Type {
    if operands.contains(&Type::Real) {
        Type::Real
    } else {
        Type::Int
    }
}

// Token cursor.
impl Parser {
    /// Records an error. While recovering, only the sticky flag is set.
    fn error(&mut self, error: Spanned<Error>) {
        self.error_occurred = true;
        if self.mode == Mode::Recovering {
            trace!(%error, "suppressed");
            return;
        }
        self.mode = Mode::Recovering;
        debug!(%error, "recorded");
        self.errors.push(error);
    }

    /// Records an error that stops the parse altogether.
    fn abort(&mut self, error: Spanned<Error>) {
        debug!(%error, "aborting");
        self.error_occurred = true;
        self.aborted = true;
        self.errors.push(error);
    }

    /// Returns the current token.
    fn peek(&self) -> &Token {
        self.tokens.get(self.cursor).unwrap_or(&self.eof)
    }

    /// Returns the token after the current one.
    fn peek_next(&self) -> &Token {
        self.tokens.get(self.cursor + 1).unwrap_or(&self.eof)
    }

    /// Returns the current token and advances, reporting (and skipping) any
    /// error tokens on the way. Consuming a token ends recovery.
    fn advance(&mut self) -> Token {
        let c = self.peek().clone();
        self.mode = Mode::Normal;
        self.prev = c.site();
        if self.cursor < self.tokens.len() {
            self.cursor += 1;
        }
        self.skip_error_tokens();
        c
    }

    fn skip_error_tokens(&mut self) {
        while let Some(token) = self.tokens.get(self.cursor) {
            let TokenKind::Error(message) = &token.kind else {
                break;
            };
            let error = token.site().wrap(Error::Lexical(message.clone()));
            self.prev = token.site();
            self.cursor += 1;
            self.error(error);
        }
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: &TokenKind) -> bool {
        self.peek().kind == *expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: &TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one. If not, records
    /// an error.
    fn consume(&mut self, expect: &TokenKind) -> Result<Token> {
        if self.is(expect) {
            return Ok(self.advance());
        }
        let c = self.peek();
        let error = c.site().wrap(Error::Unexpected {
            actual: c.kind.clone(),
            expected: expect.clone(),
        });
        self.error(error);
        Err(())
    }

    fn consume_identifier(&mut self) -> Result<(Box<str>, Site)> {
        let c = self.peek();
        if let TokenKind::Identifier(name) = &c.kind {
            let name = name.clone();
            let site = self.advance().site();
            return Ok((name, site));
        }
        let error = c.site().wrap(Error::ExpectedIdentifier {
            actual: c.kind.clone(),
        });
        self.error(error);
        Err(())
    }

    /// Skips tokens after a failed declaration: past the next `;`, or up to
    /// the next token that starts a statement, or up to the `}` closing the
    /// current block.
    fn synchronize(&mut self) {
        loop {
            let c = &self.peek().kind;
            if *c == TokenKind::Eof
                || c.starts_statement()
                || (self.block_depth > 0 && *c == TokenKind::RightBrace)
            {
                return;
            }
            let was_semicolon = *c == TokenKind::Semicolon;
            self.advance();
            if was_semicolon {
                return;
            }
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum Error {
    #[error("Expected {expected}, found {actual}.")]
    Unexpected {
        expected: TokenKind,
        actual: TokenKind,
    },
    #[error("Expected a variable name, found {actual}.")]
    ExpectedIdentifier { actual: TokenKind },
    #[error("Expected an expression, found {actual}.")]
    ExpectedExpression { actual: TokenKind },
    /// Carried by an error token.
    #[error("{0}")]
    Lexical(Box<str>),
    #[error(transparent)]
    Type(#[from] type_checker::Error),
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(Box<str>),
    #[error("Cannot assign to undeclared variable '{0}'.")]
    AssignToUndeclared(Box<str>),
    #[error("Variable '{0}' is already declared.")]
    Redeclaration(Box<str>),
    #[error("A declaration can't be the body of '{0}'.")]
    DeclarationNotAllowed(&'static str),
    #[error("Expected end of input.")]
    MissingEndOfInput,
}

impl fmt::Display for Spanned<Error> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error: {}", self.line, self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scanner::scan_in_new,
        util::test_utils::{ir_tests, run_pipeline},
    };
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    ir_tests!(
        fn single_literal() {
            let src = "12;";
            let ir_ok = "
                %t1 = CONST #0 (12)
            ";
        }

        fn mixed_arithmetic_widens_to_real() {
            let src = "10 * 7.0 / 5 - 2 + 3;";
            let ir_ok = "
                %t1 = CONST #0 (10)
                %t2 = CONST #1 (7.0)
                %t3 = I2F %t1
                %t4 = FMULT %t3, %t2
                %t5 = CONST #2 (5)
                %t6 = I2F %t5
                %t7 = FDIV %t4, %t6
                %t8 = CONST #3 (2)
                %t9 = I2F %t8
                %t10 = FSUB %t7, %t9
                %t11 = CONST #4 (3)
                %t12 = I2F %t11
                %t13 = FADD %t10, %t12
            ";
        }

        fn same_type_operands_skip_coercion() {
            let src = "1 + 2 * 3; 1.5 < 2.5;";
            let ir_ok = "
                %t1 = CONST #0 (1)
                %t2 = CONST #1 (2)
                %t3 = CONST #2 (3)
                %t4 = MULT %t2, %t3
                %t5 = ADD %t1, %t4
                %t6 = CONST #3 (1.5)
                %t7 = CONST #4 (2.5)
                %t8 = FLT %t6, %t7
            ";
        }

        fn variables_are_used_directly() {
            let src = "int a = 5; int b = 6; a + b;";
            let ir_ok = "
                %t1 = CONST #0 (5)
                a = ID %t1
                %t2 = CONST #1 (6)
                b = ID %t2
                %t3 = ADD a, b
            ";
        }

        fn declarations_without_initializer_get_defaults() {
            let src = "int i; real r; char c; bool b;";
            let ir_ok = "
                %t1 = CONST #0 (0)
                i = ID %t1
                %t2 = CONST #1 (0.0)
                r = ID %t2
                %t3 = CONST #2 ('\\0')
                c = ID %t3
                %t4 = CONST #3 (false)
                b = ID %t4
            ";
        }

        fn int_initializer_for_real_is_widened() {
            let src = "real r = 3; r = 4;";
            let ir_ok = "
                %t1 = CONST #0 (3)
                %t2 = I2F %t1
                r = ID %t2
                %t3 = CONST #1 (4)
                %t4 = I2F %t3
                r = ID %t4
            ";
        }

        fn assignment_is_right_associative() {
            let src = "int a; int b; a = b = 7;";
            let ir_ok = "
                %t1 = CONST #0 (0)
                a = ID %t1
                %t2 = CONST #0 (0)
                b = ID %t2
                %t3 = CONST #1 (7)
                b = ID %t3
                a = ID b
            ";
        }

        fn if_else() {
            let src = "int a = 1; int b = 2; if (a == b) print 1; else print 2;";
            let ir_ok = "
                %t1 = CONST #0 (1)
                a = ID %t1
                %t2 = CONST #1 (2)
                b = ID %t2
                %t3 = EQ a, b
                BR %t3, .if_0.true, .if_0.false
                .if_0.true:
                %t4 = CONST #0 (1)
                PRINT %t4
                JMP .if_0.exit
                .if_0.false:
                %t5 = CONST #1 (2)
                PRINT %t5
                .if_0.exit:
            ";
        }

        fn if_without_else() {
            let src = "if (true) { print 'x'; }";
            let ir_ok = "
                %t1 = CONST #0 (true)
                BR %t1, .if_0.true, .if_0.false
                .if_0.true:
                %t2 = CONST #1 ('x')
                PRINT %t2
                .if_0.false:
            ";
        }

        fn while_loop() {
            let src = "int i = 0; while (i < 3) i = i + 1;";
            let ir_ok = "
                %t1 = CONST #0 (0)
                i = ID %t1
                .while_0.cond:
                %t2 = CONST #1 (3)
                %t3 = LT i, %t2
                BR %t3, .while_0.true, .while_0.exit
                .while_0.true:
                %t4 = CONST #2 (1)
                %t5 = ADD i, %t4
                i = ID %t5
                JMP .while_0.cond
                .while_0.exit:
            ";
        }

        fn sibling_constructs_get_distinct_labels() {
            let src = "if (true) print 1; while (false) print 2; if (true) print 3;";
            let ir_ok = "
                %t1 = CONST #0 (true)
                BR %t1, .if_0.true, .if_0.false
                .if_0.true:
                %t2 = CONST #1 (1)
                PRINT %t2
                .if_0.false:
                .while_1.cond:
                %t3 = CONST #2 (false)
                BR %t3, .while_1.true, .while_1.exit
                .while_1.true:
                %t4 = CONST #3 (2)
                PRINT %t4
                JMP .while_1.cond
                .while_1.exit:
                %t5 = CONST #0 (true)
                BR %t5, .if_2.true, .if_2.false
                .if_2.true:
                %t6 = CONST #4 (3)
                PRINT %t6
                .if_2.false:
            ";
        }

        fn negation_subtracts_from_zero() {
            let src = "-4; -2.5; !true;";
            let ir_ok = "
                %t1 = CONST #0 (4)
                %t2 = CONST #1 (0)
                %t3 = SUB %t2, %t1
                %t4 = CONST #2 (2.5)
                %t5 = CONST #3 (0.0)
                %t6 = FSUB %t5, %t4
                %t7 = CONST #4 (true)
                %t8 = NOT %t7
            ";
        }

        fn logic_and_equality() {
            let src = "true and false or 1.0 != 2.0;";
            let ir_ok = "
                %t1 = CONST #0 (true)
                %t2 = CONST #1 (false)
                %t3 = AND %t1, %t2
                %t4 = CONST #2 (1.0)
                %t5 = CONST #3 (2.0)
                %t6 = FNEQ %t4, %t5
                %t7 = OR %t3, %t6
            ";
        }

        fn string_interpolation() {
            let src = r#"int n = 2; print "n is ${n}!";"#;
            let ir_ok = r#"
                %t1 = CONST #0 (2)
                n = ID %t1
                %t2 = CONST #1 ("n is ")
                %t3 = TO_STRING n
                %t4 = CONCAT %t2, %t3
                %t5 = CONST #2 ("!")
                %t6 = CONCAT %t4, %t5
                PRINT %t6
            "#;
        }

        fn nested_strings_are_not_converted() {
            let src = r#"print "a${"b"}";"#;
            let ir_ok = r#"
                %t1 = CONST #0 ("a")
                %t2 = CONST #1 ("b")
                %t3 = CONCAT %t1, %t2
                PRINT %t3
            "#;
        }

        fn empty_string() {
            let src = r#"print "";"#;
            let ir_ok = r#"
                %t1 = CONST #0 ("")
                PRINT %t1
            "#;
        }

        fn blocks_and_comments() {
            let src = "
                /* setup */
                int x = 1;
                {
                    // inner
                    x = x * 2;
                }
            ";
            let ir_ok = "
                %t1 = CONST #0 (1)
                x = ID %t1
                %t2 = CONST #1 (2)
                %t3 = MULT x, %t2
                x = ID %t3
            ";
        }

        fn unterminated_string() {
            let src = r#""abc"#;
            let expected_errors = &["[line 1] Error: Unterminated string."];
        }

        fn mismatched_operands_are_reported_and_parsing_continues() {
            let src = "1 == 1.0; print 'c' + 1; print 7;";
            let ir_error = "
                %t1 = CONST #0 (1)
                %t2 = CONST #1 (1.0)
                %t4 = CONST #2 ('c')
                %t5 = CONST #0 (1)
                PRINT %t6
                %t7 = CONST #3 (7)
                PRINT %t7
            ";
            let expected_errors = &[
                "[line 1] Error: Operands of '==' must have the same type, got int and real.",
                "[line 1] Error: Operands of '+' must be numbers, got char and int.",
            ];
        }

        fn ill_typed_arithmetic_is_reported_once() {
            let src = "true + 1 + 2;";
            let expected_errors = &[
                "[line 1] Error: Operands of '+' must be numbers, got bool and int.",
            ];
        }

        fn ill_typed_negation_is_reported_once() {
            let src = "-true + 1;";
            let expected_errors = &["[line 1] Error: Operand of '-' must be a number, got bool."];
        }

        fn ill_typed_not_is_reported_once() {
            let src = "!1 and true;";
            let expected_errors = &["[line 1] Error: Operand of '!' must be bool, got int."];
        }

        fn ill_typed_comparison_is_reported_once() {
            let src = "1 < true or false;";
            let expected_errors = &[
                "[line 1] Error: Operands of '<' must be numbers, got int and bool.",
            ];
        }

        fn ill_typed_real_arithmetic_keeps_its_real_type() {
            let src = "real r = 'c' * 2.5 + 1.5;";
            let expected_errors = &[
                "[line 1] Error: Operands of '*' must be numbers, got char and real.",
            ];
        }

        fn failed_initializer_still_declares_the_variable() {
            let src = "int a = ;\nprint a;\na = 3;";
            let expected_errors = &["[line 1] Error: Expected an expression, found ';'."];
        }

        fn undefined_initializer_still_declares_the_variable() {
            let src = "int a = b;\nprint a;";
            let expected_errors = &["[line 1] Error: Undefined variable 'b'."];
        }

        fn real_into_int_is_an_error() {
            let src = "int a = 2.5;";
            let expected_errors = &[
                "[line 1] Error: Cannot assign a value of type real to 'a' of type int.",
            ];
        }

        fn undefined_and_undeclared_variables() {
            let src = "print x;\ny = 1;";
            let expected_errors = &[
                "[line 1] Error: Undefined variable 'x'.",
                "[line 2] Error: Cannot assign to undeclared variable 'y'.",
            ];
        }

        fn redeclaration() {
            let src = "int a; bool a;";
            let expected_errors = &["[line 1] Error: Variable 'a' is already declared."];
        }

        fn condition_must_be_bool() {
            let src = "while (1) print 1;";
            let ir_error = "
                .while_0.cond:
                %t1 = CONST #0 (1)
                BR %t1, .while_0.true, .while_0.exit
                .while_0.true:
                %t2 = CONST #0 (1)
                PRINT %t2
                JMP .while_0.cond
                .while_0.exit:
            ";
            let expected_errors = &["[line 1] Error: Condition of 'while' must be bool, got int."];
        }

        fn syntax_errors_recover_at_the_next_statement() {
            let src = "
                print (1;
                int a = ;
                print 2 3;
                print 4;
            ";
            let ir_error = "
                %t1 = CONST #0 (1)
                %t2 = CONST #1 (2)
                %t3 = CONST #2 (4)
                PRINT %t3
            ";
            let expected_errors = &[
                "[line 2] Error: Expected ')', found ';'.",
                "[line 3] Error: Expected an expression, found ';'.",
                "[line 4] Error: Expected ';', found integer 3.",
            ];
        }

        fn recovery_stops_at_the_end_of_a_block() {
            let src = "{ print 1 2 } print 3;";
            let ir_error = "
                %t1 = CONST #0 (1)
                %t2 = CONST #1 (3)
                PRINT %t2
            ";
            let expected_errors = &["[line 1] Error: Expected ';', found integer 2."];
        }

        fn declaration_as_body_is_fatal() {
            let src = "if (true) int a = 1; print 2;";
            let ir_error = "
                %t1 = CONST #0 (true)
                BR %t1, .if_0.true, .if_0.false
                .if_0.true:
            ";
            let expected_errors = &["[line 1] Error: A declaration can't be the body of 'if'."];
        }

        fn lexical_errors_are_reported_once_per_recovery() {
            let src = "print 1 @ @;\nprint 5.;";
            let expected_errors = &[
                "[line 1] Error: Unexpected character.",
                "[line 2] Error: Expected a digit after decimal in literal.",
            ];
        }
    );

    #[test]
    fn pushed_tokens_without_eof() {
        let mut parser = Parser::new();
        for token in scan_in_new("print 1;") {
            if !token.is_eof() {
                parser.add_token(token);
            }
        }
        assert!(!parser.parse());
        assert!(parser.error_occurred());
        let errors: Vec<_> = parser.errors().iter().map(ToString::to_string).collect();
        assert_eq!(errors, ["[line 1] Error: Expected end of input."]);
        // What was parsed is kept.
        assert_eq!(parser.program().len(), 2);
    }

    #[test]
    fn pulled_tokens() {
        let mut scanner = Scanner::new("bool b = 1 < 2;");
        let mut parser = Parser::default();
        parser.pull_tokens(&mut scanner);
        assert!(parser.parse());

        let Output {
            program,
            pool,
            symbols,
        } = parser.finish().unwrap();
        assert_eq!(program.len(), 4);
        assert_eq!(pool.len(), 2);
        assert_eq!(symbols.get(&Address::named("b")), Some(Type::Bool));
        assert_eq!(symbols.get(&Address::temp(3)), Some(Type::Bool));
    }

    #[test]
    fn every_operand_has_a_type() {
        let src = r#"
            int i = 0;
            real r = 1.5;
            while (i < 10) {
                if (r > 2.0 and !(i == 3)) print "r=${r}";
                else r = r + i * 2;
                i = i + 1;
            }
        "#;
        let output = compile(src).unwrap();
        for instruction in &output.program {
            let operands: &[Address] = match &instruction.kind {
                InstrKind::Pure { args, .. } | InstrKind::Impure { args, .. } => args,
                _ => &[],
            };
            for operand in operands {
                assert!(output.symbols.contains(operand), "{operand} has no type");
            }
            if let Some(dest) = instruction.kind.dest() {
                assert!(output.symbols.contains(dest), "{dest} has no type");
            }
        }
    }

    #[test]
    fn instructions_are_tagged_with_positions() {
        let output = compile("int a;\n  a = 1 + 2;").unwrap();
        let positions: Vec<_> = output
            .program
            .iter()
            .map(|instruction| (instruction.line, instruction.col))
            .collect();
        assert_eq!(positions, [(1, 5), (1, 5), (2, 7), (2, 11), (2, 11), (2, 11)]);
    }

    #[test]
    fn pipeline_returns_the_raw_listing() {
        let (listing, errors) = run_pipeline("print 1;");
        assert_eq!(listing.trim(), "%t1 = CONST #0 (1)\n  PRINT %t1");
        assert!(errors.is_empty());
    }

    proptest! {
        #[test]
        fn temporaries_are_never_reused(values in prop::collection::vec((0..1000_i32, 0..4_u8), 1..24)) {
            let src: String = values
                .iter()
                .map(|(value, op)| {
                    let op = ["+", "-", "*", "/"][usize::from(*op)];
                    format!("{value} {op} {value}.5;\n")
                })
                .collect();
            let output = compile(&src).unwrap();
            let mut seen = std::collections::HashSet::new();
            for instruction in &output.program {
                if let Some(dest) = instruction.kind.dest() {
                    prop_assert!(dest.is_temp());
                    prop_assert!(seen.insert(dest.clone()), "{} defined twice", dest);
                }
            }
        }
    }
}
