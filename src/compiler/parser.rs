//! Recursive descent parser for the behavior definition language.
//!
//! The parser builds a [`BehaviorNet`] directly while walking the token
//! stream; there is no intermediate tree for the net structure itself, only
//! for `where` constraint expressions. Expressions are type checked as they
//! are parsed: identifiers are integers, operators dictate their operand
//! types, and every constraint must come out boolean.

use std::collections::HashMap;

use crate::ast::{BinaryOp, Expression, ExpressionType, UnaryOp};
use crate::compiler::lexer::{Token, TokenKind};
use crate::error::{BehaviorError, Result};
use crate::net::{ApiCallGuard, BehaviorNet, PlaceId, TransitionId};

/// Builds a net from a token stream. One-shot: consumed by [`Parser::parse`].
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    net: BehaviorNet,
    nodes: HashMap<String, NodeRef>,
}

#[derive(Clone, Copy)]
enum NodeRef {
    Place(PlaceId),
    Transition(TransitionId),
}

/// An expression together with its static type and source position.
struct Typed {
    expr: Expression,
    ty: ExpressionType,
    line: u32,
    column: u32,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            net: BehaviorNet::new(),
            nodes: HashMap::new(),
        }
    }

    /// Parses a full `behavior { ... }` declaration.
    pub fn parse(mut self) -> Result<BehaviorNet> {
        self.expect(TokenKind::Behavior)?;

        if matches!(
            self.peek(),
            Some(TokenKind::Ident(_) | TokenKind::Quoted(_))
        ) {
            let name = self.qualified_name()?;
            self.net = BehaviorNet::with_name(name);
        }

        self.expect(TokenKind::LeftBrace)?;
        while !matches!(self.peek(), Some(TokenKind::RightBrace) | None) {
            self.declaration()?;
        }
        self.expect(TokenKind::RightBrace)?;

        if let Some(kind) = self.peek() {
            let found = kind.describe();
            return Err(self.syntax_error(format!("unexpected {found} after closing brace")));
        }

        Ok(self.net)
    }

    fn declaration(&mut self) -> Result<()> {
        match self.peek() {
            Some(TokenKind::Place) => self.place_declaration(),
            Some(TokenKind::Transition) => self.transition_declaration(),
            Some(TokenKind::Ident(_) | TokenKind::Quoted(_)) => self.edge_chain(),
            _ => Err(self.syntax_error("expected a place, transition, or edge declaration")),
        }
    }

    // place a | place [a b c], optionally followed by `accepting`
    fn place_declaration(&mut self) -> Result<()> {
        self.expect(TokenKind::Place)?;

        let mut names = Vec::new();
        if self.eat(&TokenKind::LeftBracket) {
            while !matches!(self.peek(), Some(TokenKind::RightBracket) | None) {
                names.push(self.identifier()?);
            }
            self.expect(TokenKind::RightBracket)?;
        } else {
            names.push(self.identifier()?);
        }

        let accepting = self.eat(&TokenKind::Accepting);

        for (name, line, column) in names {
            let place = self.net.add_place(name.clone());
            self.net.set_accepting(place, accepting);
            self.register(name, NodeRef::Place(place), line, column)?;
        }

        Ok(())
    }

    // transition t { Api(a, _, b) -> r in process p thread q where e, e }
    // All body clauses are optional; an empty body keeps the identity guard.
    fn transition_declaration(&mut self) -> Result<()> {
        self.expect(TokenKind::Transition)?;
        let (name, line, column) = self.identifier()?;
        let transition = self.net.add_transition(name.clone()).id();
        self.register(name, NodeRef::Transition(transition), line, column)?;

        self.expect(TokenKind::LeftBrace)?;
        if !matches!(self.peek(), Some(TokenKind::RightBrace)) {
            let guard = self.condition()?;
            self.net.set_guard(transition, guard.into());
        }
        self.expect(TokenKind::RightBrace)?;

        Ok(())
    }

    fn condition(&mut self) -> Result<ApiCallGuard> {
        let (api_name, _, _) = self.identifier()?;
        let mut guard = ApiCallGuard::new(api_name);

        self.expect(TokenKind::LeftParen)?;
        let mut index = 0;
        while !matches!(self.peek(), Some(TokenKind::RightParen) | None) {
            if index > 0 {
                self.expect(TokenKind::Comma)?;
            }
            if let Some(capture) = self.argument()? {
                guard = guard.capture_argument(index, capture);
            } else {
                guard = guard.with_argument_count(index + 1);
            }
            index += 1;
        }
        self.expect(TokenKind::RightParen)?;

        if self.eat(&TokenKind::Arrow) {
            if let Some(capture) = self.argument()? {
                guard = guard.capture_return(capture);
            }
        }

        if self.eat(&TokenKind::In) {
            let mut any = false;
            if self.eat(&TokenKind::Process) {
                guard = guard.capture_process(self.identifier()?.0);
                any = true;
            }
            if self.eat(&TokenKind::Thread) {
                guard = guard.capture_thread(self.identifier()?.0);
                any = true;
            }
            if !any {
                return Err(self.syntax_error("expected `process` or `thread`"));
            }
        }

        if self.eat(&TokenKind::Where) {
            loop {
                let constraint = self.expression()?;
                self.expect_type(ExpressionType::Boolean, &constraint)?;
                guard = guard.with_constraint(constraint.expr);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(guard)
    }

    /// A capture position: a named variable or `_` for "ignore".
    fn argument(&mut self) -> Result<Option<String>> {
        if self.eat(&TokenKind::Underscore) {
            Ok(None)
        } else {
            Ok(Some(self.identifier()?.0))
        }
    }

    // a -> t -> b, strictly alternating places and transitions
    fn edge_chain(&mut self) -> Result<()> {
        let (first, line, column) = self.identifier()?;
        let mut previous = (self.lookup(&first, line, column)?, first);

        self.expect(TokenKind::Arrow)?;
        loop {
            let (name, line, column) = self.identifier()?;
            let next = (self.lookup(&name, line, column)?, name);

            match (previous.0, next.0) {
                (NodeRef::Place(place), NodeRef::Transition(transition)) => {
                    self.net.add_input_arc(place, transition);
                }
                (NodeRef::Transition(transition), NodeRef::Place(place)) => {
                    self.net.add_output_arc(transition, place);
                }
                _ => {
                    return Err(BehaviorError::InvalidEdge {
                        from: previous.1,
                        to: next.1,
                        line,
                        column,
                    });
                }
            }

            previous = next;
            if !self.eat(&TokenKind::Arrow) {
                return Ok(());
            }
        }
    }

    // Expressions, lowest precedence first.

    fn expression(&mut self) -> Result<Typed> {
        self.or_expression()
    }

    fn or_expression(&mut self) -> Result<Typed> {
        let mut left = self.and_expression()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expression()?;
            self.expect_type(ExpressionType::Boolean, &left)?;
            self.expect_type(ExpressionType::Boolean, &right)?;
            left = Typed {
                expr: Expression::binary(left.expr, BinaryOp::Or, right.expr),
                ty: ExpressionType::Boolean,
                line: left.line,
                column: left.column,
            };
        }
        Ok(left)
    }

    fn and_expression(&mut self) -> Result<Typed> {
        let mut left = self.in_expression()?;
        while self.eat(&TokenKind::And) {
            let right = self.in_expression()?;
            self.expect_type(ExpressionType::Boolean, &left)?;
            self.expect_type(ExpressionType::Boolean, &right)?;
            left = Typed {
                expr: Expression::binary(left.expr, BinaryOp::And, right.expr),
                ty: ExpressionType::Boolean,
                line: left.line,
                column: left.column,
            };
        }
        Ok(left)
    }

    fn in_expression(&mut self) -> Result<Typed> {
        let left = self.relational_expression()?;
        if !self.eat(&TokenKind::In) {
            return Ok(left);
        }
        let right = self.relational_expression()?;
        Ok(Typed {
            expr: Expression::binary(left.expr, BinaryOp::In, right.expr),
            ty: ExpressionType::Boolean,
            line: left.line,
            column: left.column,
        })
    }

    fn relational_expression(&mut self) -> Result<Typed> {
        let left = self.bitwise_expression()?;
        let op = match self.peek() {
            Some(TokenKind::EqEq) => BinaryOp::Eq,
            Some(TokenKind::NotEq) => BinaryOp::Ne,
            Some(TokenKind::Le) => BinaryOp::Le,
            Some(TokenKind::Ge) => BinaryOp::Ge,
            Some(TokenKind::Lt) => BinaryOp::Lt,
            Some(TokenKind::Gt) => BinaryOp::Gt,
            _ => return Ok(left),
        };
        self.advance();

        let right = self.bitwise_expression()?;

        // Operand types must agree, except that strings may be compared
        // against captures of unknown runtime type.
        if left.ty != ExpressionType::String && right.ty != ExpressionType::String {
            self.expect_type(left.ty, &right)?;
        }

        Ok(Typed {
            expr: Expression::binary(left.expr, op, right.expr),
            ty: ExpressionType::Boolean,
            line: left.line,
            column: left.column,
        })
    }

    fn bitwise_expression(&mut self) -> Result<Typed> {
        let mut left = self.additive_expression()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Amp) => BinaryOp::BitAnd,
                Some(TokenKind::Pipe) => BinaryOp::BitOr,
                Some(TokenKind::Caret) => BinaryOp::BitXor,
                _ => return Ok(left),
            };
            self.advance();

            let right = self.additive_expression()?;
            self.expect_type(ExpressionType::Integer, &left)?;
            self.expect_type(ExpressionType::Integer, &right)?;
            left = Typed {
                expr: Expression::binary(left.expr, op, right.expr),
                ty: ExpressionType::Integer,
                line: left.line,
                column: left.column,
            };
        }
    }

    fn additive_expression(&mut self) -> Result<Typed> {
        let mut left = self.multiplicative_expression()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();

            let right = self.multiplicative_expression()?;
            self.expect_type(ExpressionType::Integer, &left)?;
            self.expect_type(ExpressionType::Integer, &right)?;
            left = Typed {
                expr: Expression::binary(left.expr, op, right.expr),
                ty: ExpressionType::Integer,
                line: left.line,
                column: left.column,
            };
        }
    }

    fn multiplicative_expression(&mut self) -> Result<Typed> {
        let mut left = self.unary_expression()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.advance();

            let right = self.unary_expression()?;
            self.expect_type(ExpressionType::Integer, &left)?;
            self.expect_type(ExpressionType::Integer, &right)?;
            left = Typed {
                expr: Expression::binary(left.expr, op, right.expr),
                ty: ExpressionType::Integer,
                line: left.line,
                column: left.column,
            };
        }
    }

    fn unary_expression(&mut self) -> Result<Typed> {
        let (line, column) = self.position();

        if self.eat(&TokenKind::Minus) {
            let operand = self.unary_expression()?;
            return Ok(Typed {
                expr: Expression::unary(UnaryOp::Neg, operand.expr),
                ty: ExpressionType::Integer,
                line,
                column,
            });
        }

        if self.eat(&TokenKind::Tilde) {
            let operand = self.unary_expression()?;
            // `~` is logical not on booleans and bitwise complement on
            // integers; the operand's type carries through.
            let ty = operand.ty;
            return Ok(Typed {
                expr: Expression::unary(UnaryOp::Not, operand.expr),
                ty,
                line,
                column,
            });
        }

        self.primary_expression()
    }

    fn primary_expression(&mut self) -> Result<Typed> {
        let (line, column) = self.position();

        let (expr, ty) = match self.peek() {
            Some(TokenKind::Number(value)) => {
                let value = *value;
                self.advance();
                (Expression::literal(value), ExpressionType::Integer)
            }
            Some(TokenKind::Quoted(text)) => {
                let text = text.clone();
                self.advance();
                (Expression::literal(text), ExpressionType::String)
            }
            Some(TokenKind::True) => {
                self.advance();
                (Expression::literal(true), ExpressionType::Boolean)
            }
            Some(TokenKind::False) => {
                self.advance();
                (Expression::literal(false), ExpressionType::Boolean)
            }
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.advance();
                (Expression::variable(name), ExpressionType::Integer)
            }
            Some(TokenKind::LeftParen) => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RightParen)?;
                (inner.expr, inner.ty)
            }
            Some(TokenKind::LeftBracket) => {
                self.advance();
                let start = self.expression()?;
                self.expect(TokenKind::DotDot)?;
                let end = self.expression()?;
                self.expect(TokenKind::RightBracket)?;
                self.expect_type(ExpressionType::Integer, &start)?;
                self.expect_type(ExpressionType::Integer, &end)?;
                (Expression::range(start.expr, end.expr), ExpressionType::Range)
            }
            _ => return Err(self.syntax_error("expected an expression")),
        };

        Ok(Typed {
            expr,
            ty,
            line,
            column,
        })
    }

    // Token stream helpers.

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.syntax_error(format!("expected {}", kind.describe())))
        }
    }

    /// A bare or quoted identifier with its position.
    fn identifier(&mut self) -> Result<(String, u32, u32)> {
        let (line, column) = self.position();
        match self.peek() {
            Some(TokenKind::Ident(name) | TokenKind::Quoted(name)) => {
                let name = name.clone();
                self.advance();
                Ok((name, line, column))
            }
            _ => Err(self.syntax_error("expected an identifier")),
        }
    }

    /// Dot-separated identifiers joined back into one name.
    fn qualified_name(&mut self) -> Result<String> {
        let mut name = self.identifier()?.0;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.identifier()?.0);
        }
        Ok(name)
    }

    fn register(&mut self, name: String, node: NodeRef, line: u32, column: u32) -> Result<()> {
        if self.nodes.insert(name.clone(), node).is_some() {
            return Err(BehaviorError::DuplicateName { name, line, column });
        }
        Ok(())
    }

    fn lookup(&self, name: &str, line: u32, column: u32) -> Result<NodeRef> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| BehaviorError::UnknownName {
                name: name.to_string(),
                line,
                column,
            })
    }

    /// Position of the current token, or just past the last one at EOF.
    fn position(&self) -> (u32, u32) {
        match self.tokens.get(self.pos) {
            Some(token) => (token.line, token.column),
            None => match self.tokens.last() {
                Some(token) => (token.line, token.column + 1),
                None => (1, 1),
            },
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> BehaviorError {
        let (line, column) = self.position();
        BehaviorError::Syntax {
            line,
            column,
            message: message.into(),
        }
    }

    fn expect_type(&self, expected: ExpressionType, found: &Typed) -> Result<()> {
        if found.ty == expected {
            Ok(())
        } else {
            Err(BehaviorError::TypeMismatch {
                line: found.line,
                column: found.column,
                expected,
                found: found.ty,
            })
        }
    }
}
