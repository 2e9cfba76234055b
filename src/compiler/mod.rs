//! The single-pass Pratt compiler: tokens in, bytecode out, no AST between.

pub mod scope;

use std::mem;
use std::rc::Rc;

use maki_vm::chunk::Function;
use maki_vm::core::value::Value;
use maki_vm::error::{Error, Result};
use maki_vm::vm::opcode::OpCode;

use crate::scanner::{Scanner, Token, TokenKind};
use scope::Scope;

const FUNCTION_MAIN: &str = "MAIN";

/// The public compiler. It persists across `compile` calls so a REPL keeps
/// one global registry; each call produces a fresh `MAIN` function.
pub struct Compiler {
    scope: Scope,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            scope: Scope::new(),
        }
    }

    pub fn compile(&mut self, source: &str) -> Result<Function> {
        self.scope.reset_locals();

        let mut emitter = Emitter {
            parser: Parser::new(source),
            scope: &mut self.scope,
            function: Function::new(FUNCTION_MAIN),
        };

        emitter.advance()?;
        loop {
            emitter.skip_separators()?;
            if emitter.check(TokenKind::Eof) {
                break;
            }
            emitter.declaration()?;
        }
        emitter.emit_op(OpCode::Terminate);

        Ok(emitter.function)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-token lookahead over the lazy scanner.
struct Parser<'src> {
    scanner: Scanner<'src>,
    previous: Token,
    current: Token,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        let before_start = Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line: 0,
        };
        Self {
            scanner: Scanner::new(source),
            previous: before_start.clone(),
            current: before_start,
        }
    }
}

/// Operator precedence, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // ()
    Primary,
}

impl Precedence {
    /// One level up; binary operators parse their right operand here, which
    /// keeps them left-associative.
    fn higher(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call | Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn = fn(&mut Emitter<'_>, bool) -> Result<()>;

struct Rule {
    prefix: Option<ParseFn>,
    infix: Option<ParseFn>,
    precedence: Precedence,
}

impl Rule {
    fn none() -> Rule {
        Rule {
            prefix: None,
            infix: None,
            precedence: Precedence::None,
        }
    }

    fn prefix(handler: ParseFn) -> Rule {
        Rule {
            prefix: Some(handler),
            infix: None,
            precedence: Precedence::None,
        }
    }

    fn infix(handler: ParseFn, precedence: Precedence) -> Rule {
        Rule {
            prefix: None,
            infix: Some(handler),
            precedence,
        }
    }
}

fn rule(kind: TokenKind) -> Rule {
    match kind {
        TokenKind::LeftParen => Rule {
            prefix: Some(|e, b| Emitter::grouping(e, b)),
            infix: Some(|e, b| Emitter::call(e, b)),
            precedence: Precedence::Call,
        },
        TokenKind::LeftSquare => Rule::prefix(|e, b| Emitter::array(e, b)),
        TokenKind::Minus => Rule {
            prefix: Some(|e, b| Emitter::unary(e, b)),
            infix: Some(|e, b| Emitter::binary(e, b)),
            precedence: Precedence::Term,
        },
        TokenKind::Plus => Rule::infix(|e, b| Emitter::binary(e, b), Precedence::Term),
        TokenKind::Slash | TokenKind::Star => {
            Rule::infix(|e, b| Emitter::binary(e, b), Precedence::Factor)
        }
        TokenKind::Not => Rule::prefix(|e, b| Emitter::unary(e, b)),
        TokenKind::EqualEqual | TokenKind::NotEqual => {
            Rule::infix(|e, b| Emitter::binary(e, b), Precedence::Equality)
        }
        TokenKind::Greater
        | TokenKind::GreaterEqual
        | TokenKind::Less
        | TokenKind::LessEqual => {
            Rule::infix(|e, b| Emitter::binary(e, b), Precedence::Comparison)
        }
        TokenKind::And => Rule::infix(|e, b| Emitter::and(e, b), Precedence::And),
        TokenKind::Or => Rule::infix(|e, b| Emitter::or(e, b), Precedence::Or),
        TokenKind::Identifier => Rule::prefix(|e, b| Emitter::identifier(e, b)),
        TokenKind::String => Rule::prefix(|e, b| Emitter::string(e, b)),
        TokenKind::Number => Rule::prefix(|e, b| Emitter::number(e, b)),
        TokenKind::False | TokenKind::True | TokenKind::Nil => {
            Rule::prefix(|e, b| Emitter::literal(e, b))
        }
        _ => Rule::none(),
    }
}

/// One compilation pass: drives the parser and writes bytecode straight into
/// the function under construction. Nested `fun` declarations swap
/// `function` out and back.
struct Emitter<'a> {
    parser: Parser<'a>,
    scope: &'a mut Scope,
    function: Function,
}

impl<'a> Emitter<'a> {
    // ---- token plumbing ----

    fn advance(&mut self) -> Result<()> {
        let next = self.parser.scanner.scan_token()?;
        self.parser.previous = mem::replace(&mut self.parser.current, next);
        Ok(())
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.parser.current.kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> Result<bool> {
        if self.check(kind) {
            self.advance()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<()> {
        if self.check(kind) {
            return self.advance();
        }
        Err(Error::compile(message, self.parser.current.line))
    }

    /// Stray semicolons and newlines between declarations mean nothing.
    fn skip_separators(&mut self) -> Result<()> {
        while self.check(TokenKind::Semicolon) || self.check(TokenKind::NewLine) {
            self.advance()?;
        }
        Ok(())
    }

    /// Statement terminator: `;` or newline, or — left for the caller —
    /// `}` in trailing position or end of input.
    fn terminator(&mut self) -> Result<()> {
        if self.matches(TokenKind::Semicolon)? || self.matches(TokenKind::NewLine)? {
            return Ok(());
        }
        if self.check(TokenKind::Eof) || self.check(TokenKind::RightBrace) {
            return Ok(());
        }
        Err(Error::compile(
            "expected ';' or newline after statement",
            self.parser.current.line,
        ))
    }

    // ---- declarations and statements ----

    fn declaration(&mut self) -> Result<()> {
        if self.matches(TokenKind::Assert)? {
            return self.assert_statement();
        }
        if self.matches(TokenKind::Print)? {
            return self.print_statement();
        }
        if self.matches(TokenKind::Var)? {
            return self.variable_declaration(true);
        }
        if self.matches(TokenKind::Let)? {
            return self.variable_declaration(false);
        }
        if self.matches(TokenKind::Fun)? {
            return self.function_declaration();
        }
        if self.matches(TokenKind::If)? {
            return self.if_statement();
        }
        if self.matches(TokenKind::While)? {
            return self.while_statement();
        }
        if self.matches(TokenKind::For)? {
            return self.for_statement();
        }
        if self.matches(TokenKind::Return)? {
            return self.return_statement();
        }
        if self.matches(TokenKind::LeftBrace)? {
            return self.block();
        }
        self.expression_statement()
    }

    /// A statement in body position (loop bodies) may start on its own line.
    fn statement(&mut self) -> Result<()> {
        self.skip_separators()?;
        self.declaration()
    }

    fn assert_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.terminator()?;
        self.emit_op(OpCode::Assert);
        Ok(())
    }

    fn print_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.terminator()?;
        self.emit_op(OpCode::Print);
        Ok(())
    }

    fn return_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.terminator()?;
        self.emit_op(OpCode::Return);
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<()> {
        self.expression()?;
        self.terminator()?;
        self.emit_op(OpCode::Pop);
        Ok(())
    }

    /// `var`/`let`: one declarator, or a brace-enclosed list separated by
    /// newlines.
    fn variable_declaration(&mut self, modifiable: bool) -> Result<()> {
        if self.matches(TokenKind::LeftBrace)? {
            loop {
                self.skip_separators()?;
                if self.check(TokenKind::RightBrace) || self.check(TokenKind::Eof) {
                    break;
                }
                self.declarator(modifiable)?;
            }
            return self.consume(TokenKind::RightBrace, "expected '}' after declarations");
        }
        self.declarator(modifiable)
    }

    fn declarator(&mut self, modifiable: bool) -> Result<()> {
        self.consume(TokenKind::Identifier, "expected identifier")?;
        let name = self.parser.previous.lexeme.clone();
        let line = self.parser.previous.line;

        if self.scope.is_local() {
            self.scope.add_local(&name, modifiable, line)?;
        } else if self.scope.is_global_declared(&name) {
            return Err(Error::compile(
                format!("variable '{}' is already defined in this scope", name),
                line,
            ));
        }

        if self.matches(TokenKind::Equal)? {
            self.expression()?;
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.terminator()?;

        if self.scope.is_local() {
            // The initializer stays on the stack as the local's slot.
            return Ok(());
        }

        let name_index = self.identifier_constant(&name)?;
        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(name_index);
        self.scope.declare_global(&name, modifiable);
        Ok(())
    }

    fn function_declaration(&mut self) -> Result<()> {
        self.consume(TokenKind::Identifier, "expected function name")?;
        let name = self.parser.previous.lexeme.clone();
        let line = self.parser.previous.line;

        if self.scope.is_global_declared(&name) {
            return Err(Error::compile(
                format!("variable '{}' is already defined in this scope", name),
                line,
            ));
        }

        let enclosing = mem::replace(&mut self.function, Function::new(&name));
        self.scope.begin();

        self.consume(TokenKind::LeftParen, "expected '(' after function name")?;
        if !self.check(TokenKind::RightParen) {
            loop {
                // a stray 'var' before a parameter is tolerated
                self.matches(TokenKind::Var)?;
                self.consume(TokenKind::Identifier, "expected parameter name")?;
                let parameter = self.parser.previous.lexeme.clone();
                let parameter_line = self.parser.previous.line;
                self.scope.add_local(&parameter, true, parameter_line)?;
                if self.function.arity == u8::MAX {
                    return Err(Error::compile("too many parameters", parameter_line));
                }
                self.function.arity += 1;
                if !self.matches(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameters")?;

        self.consume(TokenKind::LeftBrace, "expected '{' before function body")?;
        self.block()?;
        self.end_scope();

        // Every function returns, even without an explicit 'return'.
        let nil_index = self.make_constant(Value::Nil)?;
        self.emit_op(OpCode::Value);
        self.emit_byte(nil_index);
        self.emit_op(OpCode::Return);

        let compiled = mem::replace(&mut self.function, enclosing);
        let function_index = self.make_constant(Value::Function(Rc::new(compiled)))?;
        self.emit_op(OpCode::Value);
        self.emit_byte(function_index);

        let name_index = self.identifier_constant(&name)?;
        self.emit_op(OpCode::DefineGlobal);
        self.emit_byte(name_index);
        self.scope.declare_global(&name, false);
        Ok(())
    }

    fn if_statement(&mut self) -> Result<()> {
        self.expression()?;
        let then_skip = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);

        self.consume(TokenKind::LeftBrace, "expected '{' after condition")?;
        self.block()?;

        let else_skip = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_skip)?;
        self.emit_op(OpCode::Pop);

        if self.matches(TokenKind::Else)? {
            self.consume(TokenKind::LeftBrace, "expected '{' after 'else'")?;
            self.block()?;
        }
        self.patch_jump(else_skip)?;
        Ok(())
    }

    fn while_statement(&mut self) -> Result<()> {
        let start = self.function.chunk.code.len();
        self.expression()?;

        let exit = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement()?;
        self.emit_loop(start)?;
        self.patch_jump(exit)?;
        Ok(())
    }

    fn for_statement(&mut self) -> Result<()> {
        self.scope.begin();
        self.statement()?; // initializer

        let condition = self.function.chunk.code.len();
        self.expression()?;
        self.consume(TokenKind::Semicolon, "expected ';' after loop condition")?;

        let exit = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        let body_jump = self.emit_jump(OpCode::Jump);

        let increment = self.function.chunk.code.len();
        self.expression()?;
        self.emit_op(OpCode::Pop);
        self.emit_loop(condition)?;

        self.patch_jump(body_jump)?;
        self.statement()?; // body
        self.emit_loop(increment)?;

        self.patch_jump(exit)?;
        self.emit_op(OpCode::Pop);
        self.end_scope();
        Ok(())
    }

    /// `{` has already been consumed.
    fn block(&mut self) -> Result<()> {
        self.scope.begin();
        loop {
            self.skip_separators()?;
            if self.check(TokenKind::RightBrace) || self.check(TokenKind::Eof) {
                break;
            }
            self.declaration()?;
        }
        self.consume(TokenKind::RightBrace, "expected '}' after block")?;
        self.end_scope();
        Ok(())
    }

    fn end_scope(&mut self) {
        self.scope.end();
        for _ in 0..self.scope.drop_to_depth() {
            self.emit_op(OpCode::Pop);
        }
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<()> {
        self.parse_precedence(Precedence::Assignment)
    }

    fn parse_precedence(&mut self, precedence: Precedence) -> Result<()> {
        let last = self.parser.previous.lexeme.clone();
        self.advance()?;

        let Some(prefix) = rule(self.parser.previous.kind).prefix else {
            return Err(Error::compile(
                format!("expected expression after '{}'", last),
                self.parser.current.line,
            ));
        };

        let assignable = precedence <= Precedence::Assignment;
        prefix(self, assignable)?;

        while precedence <= rule(self.parser.current.kind).precedence {
            self.advance()?;
            if let Some(infix) = rule(self.parser.previous.kind).infix {
                infix(self, false)?;
            }
        }

        if assignable && self.check(TokenKind::Equal) {
            return Err(Error::compile(
                "invalid assignment target",
                self.parser.current.line,
            ));
        }
        Ok(())
    }

    fn binary(&mut self, _assignable: bool) -> Result<()> {
        let kind = self.parser.previous.kind;
        self.parse_precedence(rule(kind).precedence.higher())?;

        let op = match kind {
            TokenKind::Plus => OpCode::Add,
            TokenKind::Minus => OpCode::Subtract,
            TokenKind::Star => OpCode::Multiply,
            TokenKind::Slash => OpCode::Divide,
            TokenKind::EqualEqual => OpCode::EqualEqual,
            TokenKind::NotEqual => OpCode::NotEqual,
            TokenKind::Greater => OpCode::Greater,
            TokenKind::GreaterEqual => OpCode::GreaterEqual,
            TokenKind::Less => OpCode::Less,
            TokenKind::LessEqual => OpCode::LessEqual,
            _ => {
                return Err(Error::compile(
                    "invalid binary operator",
                    self.parser.previous.line,
                ));
            }
        };
        self.emit_op(op);
        Ok(())
    }

    fn unary(&mut self, _assignable: bool) -> Result<()> {
        let kind = self.parser.previous.kind;
        self.parse_precedence(Precedence::Unary)?;

        match kind {
            TokenKind::Minus => self.emit_op(OpCode::Minus),
            TokenKind::Not => self.emit_op(OpCode::Not),
            _ => {
                return Err(Error::compile(
                    "invalid unary operator",
                    self.parser.previous.line,
                ));
            }
        }
        Ok(())
    }

    fn grouping(&mut self, _assignable: bool) -> Result<()> {
        self.expression()?;
        self.consume(TokenKind::RightParen, "expected ')' after expression")
    }

    fn literal(&mut self, _assignable: bool) -> Result<()> {
        match self.parser.previous.kind {
            TokenKind::False => self.emit_constant(Value::Bool(false)),
            TokenKind::True => self.emit_constant(Value::Bool(true)),
            _ => {
                self.emit_op(OpCode::Nil);
                Ok(())
            }
        }
    }

    fn number(&mut self, _assignable: bool) -> Result<()> {
        let line = self.parser.previous.line;
        let n: f64 = self
            .parser
            .previous
            .lexeme
            .parse()
            .map_err(|_| Error::compile(format!("invalid number '{}'", self.parser.previous.lexeme), line))?;
        self.emit_constant(Value::Number(n))
    }

    fn string(&mut self, _assignable: bool) -> Result<()> {
        let value = Value::String(Rc::from(self.parser.previous.lexeme.as_str()));
        self.emit_constant(value)
    }

    /// Short-circuit: a falsy left operand stays on the stack as the result.
    fn and(&mut self, _assignable: bool) -> Result<()> {
        let end = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And)?;
        self.patch_jump(end)
    }

    /// Short-circuit: a truthy left operand stays on the stack as the result.
    fn or(&mut self, _assignable: bool) -> Result<()> {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump)?;
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or)?;
        self.patch_jump(end)
    }

    fn call(&mut self, _assignable: bool) -> Result<()> {
        let mut argc: usize = 0;
        if !self.check(TokenKind::RightParen) {
            loop {
                self.expression()?;
                argc += 1;
                if !self.matches(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after arguments")?;

        if argc > u8::MAX as usize {
            return Err(Error::compile(
                "too many arguments",
                self.parser.previous.line,
            ));
        }
        self.emit_op(OpCode::Call);
        self.emit_byte(argc as u8);
        Ok(())
    }

    fn array(&mut self, _assignable: bool) -> Result<()> {
        let mut count: usize = 0;
        if !self.check(TokenKind::RightSquare) {
            loop {
                self.expression()?;
                count += 1;
                if !self.matches(TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightSquare, "expected ']' after array elements")?;

        if count > u8::MAX as usize {
            return Err(Error::compile(
                "too many elements in array literal",
                self.parser.previous.line,
            ));
        }
        self.emit_op(OpCode::Array);
        self.emit_byte(count as u8);
        Ok(())
    }

    /// Bare, indexed, read and write forms of a name, local or global.
    fn identifier(&mut self, assignable: bool) -> Result<()> {
        let name = self.parser.previous.lexeme.clone();

        let resolved = self.scope.resolve(&name);
        let modifiable = match resolved {
            Some((_, modifiable)) => modifiable,
            None => self.scope.global_modifiable(&name).unwrap_or(true),
        };

        let indexed = if self.matches(TokenKind::LeftSquare)? {
            self.expression()?;
            self.consume(TokenKind::RightSquare, "expected ']' after index")?;
            true
        } else {
            false
        };

        let assigning = assignable && self.check(TokenKind::Equal);
        if assigning {
            if !modifiable {
                return Err(Error::compile(
                    format!("cannot assign expression to constant '{}'", name),
                    self.parser.current.line,
                ));
            }
            self.advance()?;
            self.expression()?;
        }

        let op = match (resolved.is_some(), indexed, assigning) {
            (true, false, false) => OpCode::GetLocal,
            (true, false, true) => OpCode::SetLocal,
            (true, true, false) => OpCode::GetLocalIndex,
            (true, true, true) => OpCode::SetLocalIndex,
            (false, false, false) => OpCode::GetGlobal,
            (false, false, true) => OpCode::SetGlobal,
            (false, true, false) => OpCode::GetGlobalIndex,
            (false, true, true) => OpCode::SetGlobalIndex,
        };
        self.emit_op(op);

        match resolved {
            Some((slot, _)) => self.emit_byte(slot),
            None => {
                let name_index = self.identifier_constant(&name)?;
                self.emit_byte(name_index);
            }
        }
        Ok(())
    }

    // ---- emission ----

    fn line(&self) -> u32 {
        self.parser.previous.line
    }

    fn emit_op(&mut self, op: OpCode) {
        let line = self.line();
        self.function.chunk.write_op(op, line);
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.line();
        self.function.chunk.write(byte, line);
    }

    fn emit_constant(&mut self, value: Value) -> Result<()> {
        let index = self.make_constant(value)?;
        self.emit_op(OpCode::Value);
        self.emit_byte(index);
        Ok(())
    }

    fn make_constant(&mut self, value: Value) -> Result<u8> {
        let line = self.line();
        self.function
            .chunk
            .add_constant(value)
            .ok_or_else(|| Error::compile("too many constants in one chunk", line))
    }

    fn identifier_constant(&mut self, name: &str) -> Result<u8> {
        self.make_constant(Value::String(Rc::from(name)))
    }

    /// Emit a jump with a placeholder operand; returns the operand's offset
    /// for `patch_jump`.
    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0);
        self.function.chunk.code.len() - 1
    }

    /// Point the jump at `index` to the current end of code. Offsets are a
    /// single byte, which bounds how far a jump can reach.
    fn patch_jump(&mut self, index: usize) -> Result<()> {
        let distance = self.function.chunk.code.len() - index + 1;
        if distance > u8::MAX as usize {
            return Err(Error::compile("jump offset out of range", self.line()));
        }
        self.function.chunk.patch(index, distance as u8);
        Ok(())
    }

    fn emit_loop(&mut self, start: usize) -> Result<()> {
        self.emit_op(OpCode::Loop);
        let offset = self.function.chunk.code.len() - start - 1;
        if offset > u8::MAX as usize {
            return Err(Error::compile("jump offset out of range", self.line()));
        }
        self.emit_byte(offset as u8);
        Ok(())
    }
}
