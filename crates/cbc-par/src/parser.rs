//! Operator-precedence parser and emitter. Every production builds a
//! [`Fragment`]/[`LValue`] directly; there is no intermediate AST.

use cbc_ir::{Fragment, Opcode, SymbolId, SymbolMinter};
use cbc_lex::{Token, TokenAt};

use crate::lvalue::{Expr, LValue};

/// Failure during parsing or emission. Covers both grammar mismatches
/// (token stream doesn't fit the grammar) and the semantic checks the
/// grammar can't express structurally (lvalue-ness, duplicate labels,
/// unresolved nested-function symbols).
#[derive(thiserror::Error, Debug, Clone)]
pub enum ParseError {
    #[error("{message}")]
    Parse { message: String, line: u32 },
    #[error("{message}")]
    Semantic { message: String, line: u32 },
    #[error("{message}")]
    Link { message: String },
}

impl ParseError {
    pub fn parse(message: impl Into<String>, line: u32) -> Self {
        ParseError::Parse { message: message.into(), line }
    }

    pub fn semantic(message: impl Into<String>, line: u32) -> Self {
        ParseError::Semantic { message: message.into(), line }
    }

    pub fn link(message: impl Into<String>) -> Self {
        ParseError::Link { message: message.into() }
    }
}

impl From<ParseError> for cbc_util::CompileError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Parse { message, line } => cbc_util::CompileError::parse(message, line),
            ParseError::Semantic { message, line } => cbc_util::CompileError::semantic(message, line),
            ParseError::Link { message } => cbc_util::CompileError::link(message),
        }
    }
}

/// Parses a complete token stream and emits its top-level [`Fragment`].
pub struct Parser {
    tokens: Vec<TokenAt>,
    pos: usize,
    minter: SymbolMinter,
    for_counter: u64,
}

impl Parser {
    pub fn new(tokens: Vec<TokenAt>) -> Self {
        Self { tokens, pos: 0, minter: SymbolMinter::new(), for_counter: 0 }
    }

    // --- token-stream plumbing ---------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_at(&self, n: usize) -> &Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].token
    }

    fn current_line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::parse(
                format!("expected {:?}, found {:?}", expected, self.peek()),
                self.current_line(),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let line = self.current_line();
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(ParseError::parse(format!("expected identifier, found {:?}", other), line)),
        }
    }

    /// Appends two fragments, turning a duplicate-label collision into
    /// the "two labels with the same name" semantic error (§7.3).
    fn append(&self, a: Fragment, b: Fragment) -> Result<Fragment, ParseError> {
        a.append(b).map_err(|cbc_ir::FragmentError::DuplicateSymbol(sym)| {
            ParseError::semantic(format!("duplicate label `{sym:?}`"), self.current_line())
        })
    }

    // --- entry point ---------------------------------------------------

    pub fn parse_program(mut self) -> Result<Fragment, ParseError> {
        let mut frag = Fragment::empty();
        while self.peek() != &Token::Eof {
            let stmt = self.parse_statement()?;
            frag = self.append(frag, stmt)?;
        }
        Ok(frag)
    }

    // --- statements ------------------------------------------------------

    fn parse_block(&mut self) -> Result<Fragment, ParseError> {
        self.expect(Token::LBrace)?;
        let mut frag = Fragment::empty();
        while self.peek() != &Token::RBrace {
            let stmt = self.parse_statement()?;
            frag = self.append(frag, stmt)?;
        }
        self.expect(Token::RBrace)?;
        Ok(frag)
    }

    fn parse_statement(&mut self) -> Result<Fragment, ParseError> {
        let line = self.current_line();
        match self.peek().clone() {
            Token::LBrace => self.parse_block(),
            Token::If => self.parse_if(),
            Token::While => self.parse_while(),
            Token::For => self.parse_for(),
            Token::Try => self.parse_try(),
            Token::Return => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(e.get().concat(Fragment::op(Opcode::Return)))
            }
            Token::Throw => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(e.get().concat(Fragment::op(Opcode::Raise)))
            }
            Token::Yield => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                Ok(e.get().concat(Fragment::op(Opcode::Yield)))
            }
            Token::Continue => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Fragment::jump(Opcode::Jump, SymbolId::LoopContinue))
            }
            Token::Break => {
                self.advance();
                self.expect(Token::Semicolon)?;
                Ok(Fragment::jump(Opcode::Jump, SymbolId::LoopBreak))
            }
            Token::Goto => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(Token::Semicolon)?;
                Ok(Fragment::jump(Opcode::Jump, SymbolId::Named(name)))
            }
            Token::Del => {
                self.advance();
                let e = self.parse_expr()?;
                self.expect(Token::Semicolon)?;
                let lv = e
                    .into_lvalue()
                    .ok_or_else(|| ParseError::semantic("lhs must be an lvalue", line))?;
                Ok(lv.delete())
            }
            Token::Semicolon => {
                self.advance();
                Ok(Fragment::empty())
            }
            Token::Ident(name) if self.peek_at(1) == &Token::Colon => {
                self.advance();
                self.advance();
                Ok(Fragment::label(SymbolId::Named(name)))
            }
            _ => self.parse_expr_statement(line),
        }
    }

    fn parse_expr_statement(&mut self, line: u32) -> Result<Fragment, ParseError> {
        let e = self.parse_expr()?;
        let op = match self.peek() {
            Token::Assign => None,
            Token::PlusEq => Some(Opcode::OpAdd),
            Token::MinusEq => Some(Opcode::OpSub),
            Token::StarEq => Some(Opcode::OpMul),
            Token::SlashEq => Some(Opcode::OpDiv),
            Token::PercentEq => Some(Opcode::OpMod),
            Token::AmpEq => Some(Opcode::OpBitAnd),
            Token::PipeEq => Some(Opcode::OpBitOr),
            Token::CaretEq => Some(Opcode::OpBitXor),
            _ => {
                self.expect(Token::Semicolon)?;
                return Ok(e.get().concat(Fragment::op(Opcode::StPop)));
            }
        };
        let is_plain_assign = op.is_none();
        self.advance();
        let rhs = self.parse_expr()?;
        self.expect(Token::Semicolon)?;
        let lv = e.into_lvalue().ok_or_else(|| ParseError::semantic("lhs must be an lvalue", line))?;
        if is_plain_assign {
            Ok(lv.set(rhs.get()))
        } else {
            Ok(lv.set_update(rhs.get(), op.unwrap()))
        }
    }

    fn parse_if(&mut self) -> Result<Fragment, ParseError> {
        self.expect(Token::If)?;
        let end = self.minter.mint();
        let body = self.parse_if_tail(&end)?;
        Ok(body.concat(Fragment::label(end)))
    }

    /// Parses one `if`/`elif` head (condition + parenthesized body) and
    /// recurses into whatever follows (`elif`, `else`, or nothing), all
    /// sharing the same `end` symbol.
    fn parse_if_tail(&mut self, end: &SymbolId) -> Result<Fragment, ParseError> {
        self.expect(Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen)?;
        let tail_sym = self.minter.mint();
        let then_body = self.parse_block()?;

        let mut frag = cond
            .get()
            .concat(Fragment::op(Opcode::OpNot))
            .concat(Fragment::jump(Opcode::JumpIf, tail_sym.clone()));
        frag = self.append(frag, then_body)?;
        frag = frag.concat(Fragment::jump(Opcode::Jump, end.clone())).concat(Fragment::label(tail_sym));

        let tail = match self.peek() {
            Token::Elif => {
                self.advance();
                self.parse_if_tail(end)?
            }
            Token::Else => {
                self.advance();
                self.parse_block()?
            }
            _ => Fragment::empty(),
        };
        self.append(frag, tail)
    }

    fn parse_while(&mut self) -> Result<Fragment, ParseError> {
        self.expect(Token::While)?;
        let start = self.minter.mint();
        let end = self.minter.mint();
        self.expect(Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;

        let mut frag = Fragment::label(start.clone())
            .concat(cond.get())
            .concat(Fragment::op(Opcode::OpNot))
            .concat(Fragment::jump(Opcode::JumpIf, end.clone()));
        frag = self.append(frag, body)?;
        let mut frag =
            frag.concat(Fragment::jump(Opcode::Jump, start.clone())).concat(Fragment::label(end.clone()));

        frag.retarget(&SymbolId::LoopContinue, &start);
        frag.retarget(&SymbolId::LoopBreak, &end);
        Ok(frag)
    }

    fn parse_for(&mut self) -> Result<Fragment, ParseError> {
        self.expect(Token::For)?;
        let var_name = self.expect_ident()?;
        self.expect(Token::In)?;
        let iter_expr = self.parse_expr()?;
        let body = self.parse_block()?;

        self.for_counter += 1;
        let iter_local = format!("__for_{}", self.for_counter);
        let start = self.minter.mint();
        let catch = self.minter.mint();
        let end = self.minter.mint();

        let no_args_call = |receiver: Fragment| {
            receiver.concat(Fragment::op(Opcode::TupleN)).concat(Fragment::uleb(0)).concat(Fragment::op(Opcode::Call))
        };

        let init = LValue::local(&iter_local)
            .set(no_args_call(LValue::attr(iter_expr.get(), "__iter__").get()));

        let bind_next =
            LValue::local(&var_name).set(no_args_call(LValue::attr(LValue::local(&iter_local).get(), "__next__").get()));

        let mut frag = init
            .concat(Fragment::label(start.clone()))
            .concat(Fragment::jump(Opcode::Try, catch.clone()))
            .concat(bind_next)
            .concat(Fragment::op(Opcode::TryEnd));
        frag = self.append(frag, body)?;
        let mut frag = frag
            .concat(Fragment::jump(Opcode::Jump, start.clone()))
            .concat(Fragment::label(catch))
            .concat(Fragment::op(Opcode::RaiseIfNotStop))
            .concat(Fragment::label(end.clone()));

        frag.retarget(&SymbolId::LoopContinue, &start);
        frag.retarget(&SymbolId::LoopBreak, &end);
        Ok(frag)
    }

    fn parse_try(&mut self) -> Result<Fragment, ParseError> {
        self.expect(Token::Try)?;
        let catch_sym = self.minter.mint();
        let end = self.minter.mint();
        let body = self.parse_block()?;
        self.expect(Token::Catch)?;
        let var_name = self.expect_ident()?;
        let handler = self.parse_block()?;

        let mut frag = Fragment::jump(Opcode::Try, catch_sym.clone());
        frag = self.append(frag, body)?;
        frag = frag
            .concat(Fragment::op(Opcode::TryEnd))
            .concat(Fragment::jump(Opcode::Jump, end.clone()))
            .concat(Fragment::label(catch_sym))
            .concat(Fragment::lit_bytes(var_name.as_bytes()))
            .concat(Fragment::op(Opcode::StSwap))
            .concat(Fragment::op(Opcode::SetLocal));
        frag = self.append(frag, handler)?;
        Ok(frag.concat(Fragment::label(end)))
    }

    // --- expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.peek() == &Token::Or {
            self.advance();
            let right = self.parse_and()?;
            let end = self.minter.mint();
            let frag = left
                .get()
                .concat(Fragment::op(Opcode::StDup))
                .concat(Fragment::jump(Opcode::JumpIf, end.clone()))
                .concat(Fragment::op(Opcode::StPop))
                .concat(right.get())
                .concat(Fragment::label(end));
            left = Expr::Value(frag);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitor()?;
        while self.peek() == &Token::And {
            self.advance();
            let right = self.parse_bitor()?;
            let end = self.minter.mint();
            let frag = left
                .get()
                .concat(Fragment::op(Opcode::StDup))
                .concat(Fragment::op(Opcode::OpNot))
                .concat(Fragment::jump(Opcode::JumpIf, end.clone()))
                .concat(Fragment::op(Opcode::StPop))
                .concat(right.get())
                .concat(Fragment::label(end));
            left = Expr::Value(frag);
        }
        Ok(left)
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_xor()?;
        while self.peek() == &Token::Pipe {
            self.advance();
            let right = self.parse_xor()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(Opcode::OpBitOr)));
        }
        Ok(left)
    }

    fn parse_xor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitand()?;
        while self.peek() == &Token::Caret {
            self.advance();
            let right = self.parse_bitand()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(Opcode::OpBitXor)));
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.peek() == &Token::Amp {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(Opcode::OpBitAnd)));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => Opcode::OpEq,
                Token::Ne => Opcode::OpNe,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(op)));
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.peek() {
                Token::Lt => Opcode::OpLt,
                Token::Gt => Opcode::OpGt,
                Token::Le => Opcode::OpLe,
                Token::Ge => Opcode::OpGe,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(op)));
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Shl => Opcode::OpShl,
                Token::Shr => Opcode::OpShr,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(op)));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => Opcode::OpAdd,
                Token::Minus => Opcode::OpSub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(op)));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => Opcode::OpMul,
                Token::Slash => Opcode::OpDiv,
                Token::Percent => Opcode::OpMod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Value(left.get().concat(right.get()).concat(Fragment::op(op)));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                let e = self.parse_unary()?;
                Ok(Expr::Value(e.get().concat(Fragment::op(Opcode::OpNeg))))
            }
            Token::Bang => {
                self.advance();
                let e = self.parse_unary()?;
                Ok(Expr::Value(e.get().concat(Fragment::op(Opcode::OpNot))))
            }
            Token::Tilde => {
                self.advance();
                let e = self.parse_unary()?;
                Ok(Expr::Value(e.get().concat(Fragment::op(Opcode::OpInv))))
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            Token::Spawn => self.parse_spawn(),
            _ => self.parse_postfix(),
        }
    }

    fn parse_spawn(&mut self) -> Result<Expr, ParseError> {
        self.expect(Token::Spawn)?;
        let callee = self.parse_callee()?;
        self.expect(Token::LParen)?;
        let args = self.parse_args()?;
        self.expect(Token::RParen)?;
        let argc = args.len();
        let mut frag = callee.get();
        for a in args {
            frag = frag.concat(a.get());
        }
        frag = frag
            .concat(Fragment::op(Opcode::TupleN))
            .concat(Fragment::uleb(argc as u64))
            .concat(Fragment::op(Opcode::Spawn));
        Ok(Expr::Value(frag))
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.parse_expr()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        Ok(args)
    }

    /// A primary expression followed by any number of `.attr` / `[idx]`
    /// / `[a:b]` steps, but *not* a trailing call — used both as the
    /// general postfix parse and, via [`Self::parse_callee`], as the
    /// callee half of a `spawn` expression (whose own call must emit
    /// `SPAWN` rather than `CALL`).
    fn parse_callee(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    expr = Expr::Place(LValue::attr(expr.get(), &name));
                }
                Token::LBracket => {
                    expr = self.parse_index(expr)?;
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_callee()?;
        while self.peek() == &Token::LParen {
            self.advance();
            let args = self.parse_args()?;
            self.expect(Token::RParen)?;
            let argc = args.len();
            let mut frag = expr.get();
            for a in args {
                frag = frag.concat(a.get());
            }
            frag = frag
                .concat(Fragment::op(Opcode::TupleN))
                .concat(Fragment::uleb(argc as u64))
                .concat(Fragment::op(Opcode::Call));
            expr = Expr::Value(frag);
            // A call's result may itself be indexed/accessed, e.g. `f().x`.
            loop {
                match self.peek() {
                    Token::Dot => {
                        self.advance();
                        let name = self.expect_ident()?;
                        expr = Expr::Place(LValue::attr(expr.get(), &name));
                    }
                    Token::LBracket => {
                        expr = self.parse_index(expr)?;
                    }
                    _ => break,
                }
            }
        }
        Ok(expr)
    }

    fn parse_index(&mut self, expr: Expr) -> Result<Expr, ParseError> {
        self.expect(Token::LBracket)?;
        if self.peek() == &Token::Colon {
            self.advance();
            let stop = self.parse_slice_bound()?;
            self.expect(Token::RBracket)?;
            return Ok(Expr::Place(LValue::slice(expr.get(), None, stop)));
        }
        let first = self.parse_expr()?;
        if self.peek() == &Token::Colon {
            self.advance();
            let stop = self.parse_slice_bound()?;
            self.expect(Token::RBracket)?;
            Ok(Expr::Place(LValue::slice(expr.get(), Some(first.get()), stop)))
        } else {
            self.expect(Token::RBracket)?;
            Ok(Expr::Place(LValue::item(expr.get(), first.get())))
        }
    }

    fn parse_slice_bound(&mut self) -> Result<Option<Fragment>, ParseError> {
        if self.peek() == &Token::RBracket {
            Ok(None)
        } else {
            Ok(Some(self.parse_expr()?.get()))
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let line = self.current_line();
        match self.advance() {
            Token::Int(v) => Ok(Expr::Value(Fragment::lit_int(v))),
            Token::Float(v) => Ok(Expr::Value(Fragment::lit_float(v))),
            Token::Bytes(b) => Ok(Expr::Value(Fragment::lit_bytes(&b))),
            Token::True => Ok(Expr::Value(Fragment::op(Opcode::LitTrue))),
            Token::False => Ok(Expr::Value(Fragment::op(Opcode::LitFalse))),
            Token::None => Ok(Expr::Value(Fragment::op(Opcode::LitNone))),
            Token::Ident(name) => Ok(Expr::Place(LValue::local(&name))),
            Token::LParen => {
                let e = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(e)
            }
            Token::LBracket => self.parse_list_literal(),
            Token::Fn => self.parse_fn_literal(),
            Token::Class => self.parse_class_literal(),
            other => Err(ParseError::parse(format!("unexpected token {other:?}"), line)),
        }
    }

    fn parse_list_literal(&mut self) -> Result<Expr, ParseError> {
        let mut elems = Vec::new();
        if self.peek() != &Token::RBracket {
            loop {
                elems.push(self.parse_expr()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RBracket)?;
        let argc = elems.len();
        let mut frag = Fragment::empty();
        for e in elems {
            frag = frag.concat(e.get());
        }
        frag = frag.concat(Fragment::op(Opcode::TupleN)).concat(Fragment::uleb(argc as u64));
        Ok(Expr::Value(frag))
    }

    fn parse_params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                params.push(self.expect_ident()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_fn_literal(&mut self) -> Result<Expr, ParseError> {
        let params = self.parse_params()?;

        let captures = if self.peek() == &Token::LBracket {
            self.advance();
            let mut caps = Vec::new();
            if self.peek() != &Token::RBracket {
                loop {
                    caps.push(self.expect_ident()?);
                    if self.peek() == &Token::Comma {
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
            self.expect(Token::RBracket)?;
            Some(caps)
        } else {
            None
        };

        let body = self.parse_block()?;

        let mut prologue = Fragment::empty();
        for (i, param) in params.iter().enumerate() {
            let bind = Fragment::lit_bytes(param.as_bytes())
                .concat(Fragment::op(Opcode::LoadArgs))
                .concat(Fragment::lit_int(i as i64))
                .concat(Fragment::op(Opcode::GetItem))
                .concat(Fragment::op(Opcode::SetLocal));
            prologue = prologue.concat(bind);
        }
        let full_body = self.append(prologue, body)?;

        // Linked eagerly: this seals the function's own label scope, so
        // a `goto`/`continue`/`break` left dangling inside the body is
        // caught here rather than escaping into the enclosing fragment.
        let linked = cbc_link::link(&full_body)
            .map_err(|e| ParseError::link(format!("in function literal: {e}")))?;

        let mut frag = Fragment::lit_bytes(&linked);
        frag = frag.concat(match &captures {
            None => Fragment::op(Opcode::Closure),
            Some(_) => Fragment::op(Opcode::ClosureBind),
        });
        if let Some(caps) = captures {
            frag = frag.concat(Fragment::uleb(caps.len() as u64));
            for cap in caps {
                frag = frag.concat(Fragment::uleb(cap.len() as u64)).concat(Fragment::bytes(cap.into_bytes()));
            }
        }
        Ok(Expr::Value(frag))
    }

    fn parse_class_literal(&mut self) -> Result<Expr, ParseError> {
        let name = self.expect_ident()?;
        self.expect(Token::LParen)?;
        let base = self.expect_ident()?;
        self.expect(Token::RParen)?;
        self.expect(Token::LBrace)?;

        let mut frag = Fragment::lit_bytes(name.as_bytes())
            .concat(LValue::local(&base).get())
            .concat(Fragment::op(Opcode::EmptyDict));

        while self.peek() != &Token::RBrace {
            let member = self.expect_ident()?;
            self.expect(Token::Assign)?;
            let value = self.parse_expr()?;
            self.expect(Token::Semicolon)?;
            frag = frag
                .concat(Fragment::op(Opcode::StDup))
                .concat(Fragment::lit_bytes(member.as_bytes()))
                .concat(value.get())
                .concat(Fragment::op(Opcode::SetItem));
        }
        self.expect(Token::RBrace)?;
        frag = frag.concat(Fragment::op(Opcode::Class));
        Ok(Expr::Value(frag))
    }
}
