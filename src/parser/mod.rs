//! Recursive-descent, one-token-lookahead, Pratt-style parser (§4.2).

use crate::ast::{BinOp, CaseBranch, CompoundOp, MatchAtom, MethodDef, Node, UnOp};
use crate::errors::{ErrorKind, JayError, JayResult};
use crate::lexer::{Keyword, Lexer, Token, TokenKind, TokenPayload};
use crate::value::Value;

/// Parser recursion guard: unbounded nesting in a tree-walker blows the
/// Rust stack before it becomes a language error, so we fail cleanly well
/// before that.
const MAX_DEPTH: usize = 512;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    file: String,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, file: impl Into<String>) -> JayResult<Self> {
        let file = file.into();
        let mut lexer = Lexer::new(src, file.clone());
        let current = lexer.next_token()?;
        Ok(Self { lexer, current, file, depth: 0 })
    }

    fn enter(&mut self) -> JayResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.err(ErrorKind::StackOverflow));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn err(&self, kind: ErrorKind) -> JayError {
        JayError::new(self.file.clone(), self.current.line, kind)
    }

    fn advance(&mut self) -> JayResult<Token> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        self.current.kind == TokenKind::Keyword(kw)
    }

    fn accept(&mut self, kind: TokenKind) -> JayResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> JayResult<Token> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.err(ErrorKind::ExpectedToken { expected: what.to_string(), got: self.current.describe() }))
        }
    }

    fn expect_ident(&mut self) -> JayResult<String> {
        if self.check(TokenKind::Ident) {
            let t = self.advance()?;
            Ok(t.text().to_string())
        } else {
            Err(self.err(ErrorKind::ExpectedToken { expected: "identifier".into(), got: self.current.describe() }))
        }
    }

    /// Swallows any stray separators between statements.
    fn skip_terminators(&mut self) -> JayResult<()> {
        while self.check(TokenKind::Semicolon) {
            self.advance()?;
        }
        Ok(())
    }

    pub fn parse_program(&mut self) -> JayResult<Vec<Node>> {
        let mut out = Vec::new();
        self.skip_terminators()?;
        while !self.check(TokenKind::Eof) {
            out.push(self.parse_statement()?);
            self.skip_terminators()?;
        }
        Ok(out)
    }

    // ---- statements ----------------------------------------------------

    fn parse_statement(&mut self) -> JayResult<Node> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> JayResult<Node> {
        if self.check_kw(Keyword::Export) {
            self.advance()?;
            return self.parse_statement();
        }
        if self.check_kw(Keyword::Import) {
            return self.parse_import();
        }
        if self.check_kw(Keyword::If) {
            return self.parse_if();
        }
        if self.check_kw(Keyword::While) {
            return self.parse_while();
        }
        if self.check_kw(Keyword::For) {
            return self.parse_for();
        }
        if self.check_kw(Keyword::Class) {
            return self.parse_class();
        }
        if self.check_kw(Keyword::Func) {
            return self.parse_function_decl();
        }
        if self.check_kw(Keyword::Const) || self.check_kw(Keyword::Let) {
            return self.parse_decl();
        }
        if self.check_kw(Keyword::Return) {
            self.advance()?;
            if self.at_statement_end() {
                return Ok(Node::Return(None));
            }
            let value = self.parse_expr()?;
            return Ok(Node::Return(Some(Box::new(value))));
        }
        if self.check_kw(Keyword::Break) {
            self.advance()?;
            return Ok(Node::Break);
        }
        if self.check_kw(Keyword::Continue) {
            self.advance()?;
            return Ok(Node::Continue);
        }
        if self.check_kw(Keyword::Case) {
            return self.parse_case();
        }
        if self.check(TokenKind::LBrace) {
            return self.parse_block();
        }
        self.parse_expr_statement()
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof)
    }

    fn parse_import(&mut self) -> JayResult<Node> {
        self.advance()?; // 'import'
        let path = if self.check(TokenKind::String) {
            self.advance()?.text().to_string()
        } else {
            self.expect_ident()?
        };
        let default_alias = std::path::Path::new(&path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.clone());
        let alias = if self.check_kw(Keyword::As) {
            self.advance()?;
            self.expect_ident()?
        } else {
            default_alias
        };
        Ok(Node::Import { path, alias })
    }

    fn parse_block(&mut self) -> JayResult<Node> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        self.skip_terminators()?;
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            stmts.push(self.parse_statement()?);
            self.skip_terminators()?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Node::Block(stmts))
    }

    fn parse_if(&mut self) -> JayResult<Node> {
        self.advance()?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.check_kw(Keyword::Else) {
            self.advance()?;
            if self.check_kw(Keyword::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                Some(Box::new(self.parse_block()?))
            }
        } else {
            None
        };
        Ok(Node::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch })
    }

    fn parse_while(&mut self) -> JayResult<Node> {
        self.advance()?;
        self.expect(TokenKind::LParen, "'('")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Node::While { cond: Box::new(cond), body: Box::new(body) })
    }

    /// Distinguishes `for (x in iter)` / `for (x, i in iter)` (range-for)
    /// from `for (init; cond; update)` (counted-for) by looking at what
    /// follows the first identifier, per §4.2.
    fn parse_for(&mut self) -> JayResult<Node> {
        self.advance()?;
        self.expect(TokenKind::LParen, "'('")?;

        if self.check(TokenKind::Ident) {
            let first = self.current.text().to_string();
            // `for (x in iter)` / `for (x, i in iter)` vs. `for (x = ...; ...)`:
            // decided by what follows the first identifier.
            self.advance()?;
            if self.check_kw(Keyword::In) {
                self.advance()?;
                let iterable = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                let body = self.parse_block()?;
                return Ok(Node::RangeFor { item: first, index: None, iterable: Box::new(iterable), body: Box::new(body) });
            }
            if self.check(TokenKind::Comma) {
                self.advance()?;
                let index = self.expect_ident()?;
                self.expect(TokenKind::Keyword(Keyword::In), "'in'")?;
                let iterable = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                let body = self.parse_block()?;
                return Ok(Node::RangeFor { item: first, index: Some(index), iterable: Box::new(iterable), body: Box::new(body) });
            }
            // Counted-for whose init is `name = expr`.
            if self.check(TokenKind::Assign) {
                self.advance()?;
                let value = self.parse_expr()?;
                let init = Node::Assign { name: first, value: Box::new(value), is_const: false };
                self.expect(TokenKind::Semicolon, "';'")?;
                let cond = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
                self.expect(TokenKind::Semicolon, "';'")?;
                let update = if self.check(TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
                self.expect(TokenKind::RParen, "')'")?;
                let body = self.parse_block()?;
                return Ok(Node::CountedFor {
                    init: Some(Box::new(init)),
                    cond,
                    update: update.map(Box::new),
                    body: Box::new(body),
                });
            }
            return Err(self.err(ErrorKind::UnexpectedToken(self.current.describe())));
        }

        // `for (const i = 0; ...)` / `for (;;)`
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if self.check_kw(Keyword::Const) || self.check_kw(Keyword::Let) {
            Some(Box::new(self.parse_decl_expr()?))
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let cond = if self.check(TokenKind::Semicolon) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::Semicolon, "';'")?;
        let update = if self.check(TokenKind::RParen) { None } else { Some(self.parse_expr()?) };
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;
        Ok(Node::CountedFor { init, cond, update: update.map(Box::new), body: Box::new(body) })
    }

    /// Parses `const`/`let` as an expression node (used inside a C-style
    /// for's init clause), without requiring a trailing separator.
    fn parse_decl_expr(&mut self) -> JayResult<Node> {
        let is_const = self.check_kw(Keyword::Const);
        self.advance()?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expr()?;
        Ok(Node::Assign { name, value: Box::new(value), is_const })
    }

    fn parse_decl(&mut self) -> JayResult<Node> {
        self.parse_decl_expr()
    }

    fn parse_function_decl(&mut self) -> JayResult<Node> {
        self.advance()?; // func/fn/function
        let name = if self.check(TokenKind::Ident) { Some(self.expect_ident()?) } else { None };
        let params = self.parse_params()?;
        let body = self.parse_block_stmts()?;
        Ok(Node::Function { name, params, body })
    }

    fn parse_params(&mut self) -> JayResult<Vec<String>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            params.push(self.expect_ident()?);
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_block_stmts(&mut self) -> JayResult<Vec<Node>> {
        match self.parse_block()? {
            Node::Block(stmts) => Ok(stmts),
            _ => unreachable!(),
        }
    }

    fn parse_class(&mut self) -> JayResult<Node> {
        self.advance()?;
        let name = self.expect_ident()?;
        let parent = if self.check_kw(Keyword::Extends) {
            self.advance()?;
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut methods = Vec::new();
        self.skip_terminators()?;
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let mname = self.expect_ident()?;
            let params = self.parse_params()?;
            let body = self.parse_block_stmts()?;
            methods.push(MethodDef { name: mname, params, body });
            self.skip_terminators()?;
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Node::Class { name, parent, methods })
    }

    fn parse_case(&mut self) -> JayResult<Node> {
        self.advance()?;
        self.expect(TokenKind::LParen, "'('")?;
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut branches = Vec::new();
        self.skip_terminators()?;
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let atoms = if self.check_kw(Keyword::Default) {
                self.advance()?;
                None
            } else {
                let mut atoms = Vec::new();
                loop {
                    let lo = self.parse_ternary()?;
                    if self.check(TokenKind::DotDot) {
                        self.advance()?;
                        let hi = self.parse_ternary()?;
                        atoms.push(MatchAtom::Range(lo, hi));
                    } else {
                        atoms.push(MatchAtom::Value(lo));
                    }
                    if !self.accept(TokenKind::Comma)? {
                        break;
                    }
                }
                Some(atoms)
            };
            self.expect(TokenKind::Colon, "':'")?;
            let mut body = Vec::new();
            loop {
                if self.check(TokenKind::RBrace) || self.check(TokenKind::Eof) {
                    break;
                }
                if self.is_case_label_ahead()? {
                    break;
                }
                body.push(self.parse_statement()?);
                self.skip_terminators()?;
            }
            branches.push(CaseBranch { atoms, body });
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Node::Case { scrutinee: Box::new(scrutinee), branches })
    }

    /// Scans forward (on a cloned lexer, without disturbing real parser
    /// state) to decide whether the upcoming tokens form a new case label
    /// (`<atoms> :`) rather than the continuation of the current branch's
    /// body. A label can't contain a top-level statement keyword, brace, or
    /// semicolon before its colon.
    fn is_case_label_ahead(&self) -> JayResult<bool> {
        if self.check_kw(Keyword::Default) {
            return Ok(true);
        }
        let mut lexer = self.lexer.clone();
        let mut tok = self.current.clone();
        let mut depth: i32 = 0;
        loop {
            match tok.kind {
                TokenKind::Colon if depth == 0 => return Ok(true),
                TokenKind::Semicolon if depth == 0 => return Ok(false),
                TokenKind::LBrace | TokenKind::RBrace if depth == 0 => return Ok(false),
                TokenKind::Eof => return Ok(false),
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                TokenKind::Keyword(k)
                    if depth == 0
                        && matches!(
                            k,
                            Keyword::If
                                | Keyword::While
                                | Keyword::For
                                | Keyword::Return
                                | Keyword::Break
                                | Keyword::Continue
                                | Keyword::Const
                                | Keyword::Let
                                | Keyword::Case
                                | Keyword::Func
                                | Keyword::Class
                                | Keyword::Import
                        ) =>
                {
                    return Ok(false);
                }
                _ => {}
            }
            tok = lexer.next_token()?;
        }
    }

    fn parse_expr_statement(&mut self) -> JayResult<Node> {
        let expr = self.parse_expr()?;
        let node = match &expr {
            Node::Variable(name) => {
                if self.check_assign_op() {
                    return self.parse_assignment_from_name(name.clone());
                }
                Node::ExprStatement(Box::new(expr))
            }
            Node::Index { .. } | Node::Member { .. } => {
                if self.check(TokenKind::Assign) {
                    self.advance()?;
                    let value = self.parse_expr()?;
                    let node = match expr {
                        Node::Index { .. } => Node::IndexAssign { target: Box::new(expr), value: Box::new(value) },
                        Node::Member { .. } => Node::MemberAssign { target: Box::new(expr), value: Box::new(value) },
                        _ => unreachable!(),
                    };
                    node
                } else {
                    Node::ExprStatement(Box::new(expr))
                }
            }
            _ => Node::ExprStatement(Box::new(expr)),
        };
        Ok(node)
    }

    fn check_assign_op(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Assign | TokenKind::PlusAssign | TokenKind::MinusAssign | TokenKind::StarAssign
                | TokenKind::SlashAssign | TokenKind::PercentAssign
        )
    }

    fn parse_assignment_from_name(&mut self, name: String) -> JayResult<Node> {
        let op_kind = self.current.kind;
        self.advance()?;
        let value = self.parse_expr()?;
        let node = match op_kind {
            TokenKind::Assign => Node::Assign { name, value: Box::new(value), is_const: false },
            TokenKind::PlusAssign => Node::CompoundAssign { op: CompoundOp::Add, name, value: Box::new(value) },
            TokenKind::MinusAssign => Node::CompoundAssign { op: CompoundOp::Sub, name, value: Box::new(value) },
            TokenKind::StarAssign => Node::CompoundAssign { op: CompoundOp::Mul, name, value: Box::new(value) },
            TokenKind::SlashAssign => Node::CompoundAssign { op: CompoundOp::Div, name, value: Box::new(value) },
            TokenKind::PercentAssign => Node::CompoundAssign { op: CompoundOp::Mod, name, value: Box::new(value) },
            _ => unreachable!(),
        };
        Ok(node)
    }

    // ---- expressions (precedence climbing, low to high) -----------------

    pub fn parse_expr(&mut self) -> JayResult<Node> {
        self.enter()?;
        let r = self.parse_ternary();
        self.leave();
        r
    }

    fn parse_ternary(&mut self) -> JayResult<Node> {
        let cond = self.parse_or()?;
        if self.check(TokenKind::Question) {
            self.advance()?;
            let then_branch = self.parse_expr()?;
            self.expect(TokenKind::Colon, "':'")?;
            let else_branch = self.parse_expr()?;
            return Ok(Node::Ternary { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch: Box::new(else_branch) });
        }
        Ok(cond)
    }

    fn parse_or(&mut self) -> JayResult<Node> {
        let mut node = self.parse_and()?;
        while self.check(TokenKind::OrOr) {
            self.advance()?;
            let right = self.parse_and()?;
            node = Node::Binary { op: BinOp::Or, left: Box::new(node), right: Box::new(right) };
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> JayResult<Node> {
        let mut node = self.parse_equality()?;
        while self.check(TokenKind::AndAnd) {
            self.advance()?;
            let right = self.parse_equality()?;
            node = Node::Binary { op: BinOp::And, left: Box::new(node), right: Box::new(right) };
        }
        Ok(node)
    }

    fn parse_equality(&mut self) -> JayResult<Node> {
        let mut node = self.parse_comparison()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Eq => BinOp::EqEq,
                TokenKind::NotEq => BinOp::NotEq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_comparison()?;
            node = Node::Binary { op, left: Box::new(node), right: Box::new(right) };
        }
        Ok(node)
    }

    fn parse_comparison(&mut self) -> JayResult<Node> {
        let mut node = self.parse_additive()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            node = Node::Binary { op, left: Box::new(node), right: Box::new(right) };
        }
        Ok(node)
    }

    fn parse_additive(&mut self) -> JayResult<Node> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            node = Node::Binary { op, left: Box::new(node), right: Box::new(right) };
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> JayResult<Node> {
        let mut node = self.parse_exponent()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_exponent()?;
            node = Node::Binary { op, left: Box::new(node), right: Box::new(right) };
        }
        Ok(node)
    }

    /// Right-associative, per §4.2.
    fn parse_exponent(&mut self) -> JayResult<Node> {
        let node = self.parse_unary()?;
        if self.check(TokenKind::StarStar) {
            self.advance()?;
            let right = self.parse_exponent()?;
            return Ok(Node::Binary { op: BinOp::Pow, left: Box::new(node), right: Box::new(right) });
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> JayResult<Node> {
        let op = match self.current.kind {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Plus => Some(UnOp::Plus),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::PlusPlus => Some(UnOp::PreInc),
            TokenKind::MinusMinus => Some(UnOp::PreDec),
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Node::Unary { op, operand: Box::new(operand) });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> JayResult<Node> {
        let mut node = self.parse_primary()?;
        loop {
            match self.current.kind {
                TokenKind::LBracket => {
                    self.advance()?;
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    node = Node::Index { base: Box::new(node), index: Box::new(index) };
                }
                TokenKind::Dot => {
                    self.advance()?;
                    let name = self.expect_ident()?;
                    node = Node::Member { base: Box::new(node), name };
                }
                TokenKind::LParen => {
                    self.advance()?;
                    let mut args = Vec::new();
                    while !self.check(TokenKind::RParen) && !self.check(TokenKind::Eof) {
                        args.push(self.parse_expr()?);
                        if !self.accept(TokenKind::Comma)? {
                            break;
                        }
                    }
                    self.expect(TokenKind::RParen, "')'")?;
                    node = Node::Call { callee: Box::new(node), args };
                }
                TokenKind::PlusPlus => {
                    self.advance()?;
                    node = Node::Unary { op: UnOp::PostInc, operand: Box::new(node) };
                }
                TokenKind::MinusMinus => {
                    self.advance()?;
                    node = Node::Unary { op: UnOp::PostDec, operand: Box::new(node) };
                }
                _ => break,
            }
        }
        Ok(node)
    }

    /// Looks past a balanced paren group (or a bare identifier) for a
    /// following `=>`, per §4.2's arrow-function disambiguation rule. Since
    /// our lexer has no backtracking buffer, we scan the raw source text
    /// directly to decide, then reparse normally through the token stream.
    fn looks_like_arrow(&self) -> bool {
        match self.current.kind {
            TokenKind::LParen => self.scan_for_arrow_after_parens(),
            TokenKind::Ident => self.scan_for_arrow_after_ident(),
            _ => false,
        }
    }

    /// `self.current` is the opening `(` itself; the lexer has already
    /// consumed it, so `remaining_source` starts right after it and the
    /// running paren depth begins at 1.
    fn scan_for_arrow_after_parens(&self) -> bool {
        let rest = self.lexer_remaining();
        let bytes = rest.as_bytes();
        let mut depth = 1i32;
        let mut i = 0usize;
        while i < bytes.len() && depth > 0 {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
            i += 1;
        }
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        bytes[i..].starts_with(b"=>")
    }

    fn scan_for_arrow_after_ident(&self) -> bool {
        let rest = self.lexer_remaining();
        let trimmed = rest.trim_start();
        trimmed.starts_with("=>")
    }

    fn lexer_remaining(&self) -> &str {
        self.lexer.remaining_source()
    }

    fn parse_primary(&mut self) -> JayResult<Node> {
        self.enter()?;
        let r = self.parse_primary_inner();
        self.leave();
        r
    }

    fn parse_primary_inner(&mut self) -> JayResult<Node> {
        if self.looks_like_arrow() {
            return self.parse_arrow();
        }
        match self.current.kind {
            TokenKind::Number => {
                let n = match self.advance()?.payload {
                    TokenPayload::Number(n) => n,
                    _ => unreachable!(),
                };
                Ok(Node::Literal(narrow_number(n)))
            }
            TokenKind::String => {
                let s = self.advance()?.text().to_string();
                Ok(Node::Literal(Value::str(s)))
            }
            TokenKind::Template => {
                let tok = self.advance()?;
                match tok.payload {
                    TokenPayload::Template(parts) => Ok(Node::Template(parts)),
                    _ => unreachable!(),
                }
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(Node::Literal(Value::Bool(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(Node::Literal(Value::Bool(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(Node::Literal(Value::Null))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(Node::This)
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance()?;
                Ok(Node::Super)
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance()?;
                let class_name = self.expect_ident()?;
                self.expect(TokenKind::LParen, "'('")?;
                let mut args = Vec::new();
                while !self.check(TokenKind::RParen) {
                    args.push(self.parse_expr()?);
                    if !self.accept(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Node::New { class_name, args })
            }
            TokenKind::Keyword(Keyword::Func) => self.parse_anonymous_function(),
            TokenKind::Ident => {
                let name = self.advance()?.text().to_string();
                Ok(Node::Variable(name))
            }
            TokenKind::LParen => {
                self.advance()?;
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            _ => Err(self.err(ErrorKind::UnexpectedToken(self.current.describe()))),
        }
    }

    fn parse_anonymous_function(&mut self) -> JayResult<Node> {
        self.advance()?; // func
        let name = if self.check(TokenKind::Ident) { Some(self.expect_ident()?) } else { None };
        let params = self.parse_params()?;
        let body = self.parse_block_stmts()?;
        Ok(Node::Function { name, params, body })
    }

    fn parse_arrow(&mut self) -> JayResult<Node> {
        let params = if self.check(TokenKind::LParen) {
            self.parse_params()?
        } else {
            vec![self.expect_ident()?]
        };
        self.expect(TokenKind::FatArrow, "'=>'")?;
        let body = if self.check(TokenKind::LBrace) {
            self.parse_block_stmts()?
        } else {
            let expr = self.parse_expr()?;
            vec![Node::Return(Some(Box::new(expr)))]
        };
        Ok(Node::Arrow { params, body })
    }

    fn parse_array_literal(&mut self) -> JayResult<Node> {
        self.advance()?;
        let mut items = Vec::new();
        while !self.check(TokenKind::RBracket) {
            items.push(self.parse_expr()?);
            if !self.accept(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Node::Array(items))
    }

    fn parse_object_literal(&mut self) -> JayResult<Node> {
        self.advance()?;
        let mut items = Vec::new();
        self.skip_terminators()?;
        while !self.check(TokenKind::RBrace) {
            let key = if self.check(TokenKind::String) {
                self.advance()?.text().to_string()
            } else {
                self.expect_ident()?
            };
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_expr()?;
            items.push((key, value));
            if !self.accept(TokenKind::Comma)? {
                break;
            }
            self.skip_terminators()?;
        }
        self.skip_terminators()?;
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Node::Object(items))
    }
}

/// Numeric narrowing per §8: an integral value that fits exactly in i64
/// becomes `Int`; anything with a fractional part or outside range stays
/// `Float`.
fn narrow_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_223_372_036_854_775_000.0 {
        Value::Int(n as i64)
    } else {
        Value::Float(n)
    }
}

pub fn parse(src: &str, file: impl Into<String>) -> JayResult<Vec<Node>> {
    let mut p = Parser::new(src, file)?;
    p.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arithmetic_with_precedence() {
        let prog = parse("1 + 2 * 3;", "<test>").unwrap();
        assert_eq!(prog.len(), 1);
        match &prog[0] {
            Node::ExprStatement(e) => match e.as_ref() {
                Node::Binary { op: BinOp::Add, right, .. } => {
                    assert!(matches!(right.as_ref(), Node::Binary { op: BinOp::Mul, .. }));
                }
                other => panic!("expected addition, got {other:?}"),
            },
            other => panic!("expected expr statement, got {other:?}"),
        }
    }

    #[test]
    fn exponent_is_right_associative() {
        let prog = parse("2 ** 3 ** 2;", "<test>").unwrap();
        match &prog[0] {
            Node::ExprStatement(e) => match e.as_ref() {
                Node::Binary { op: BinOp::Pow, right, .. } => {
                    assert!(matches!(right.as_ref(), Node::Binary { op: BinOp::Pow, .. }));
                }
                other => panic!("expected power, got {other:?}"),
            },
            other => panic!("expected expr statement, got {other:?}"),
        }
    }

    #[test]
    fn distinguishes_range_for_from_counted_for() {
        let prog = parse("for (x in xs) { print(x); }", "<test>").unwrap();
        assert!(matches!(prog[0], Node::RangeFor { .. }));

        let prog = parse("for (i = 0; i < 10; i += 1) { print(i); }", "<test>").unwrap();
        assert!(matches!(prog[0], Node::CountedFor { .. }));
    }

    #[test]
    fn parenthesized_arrow_params_parse_as_arrow() {
        let prog = parse("const add = (a, b) => a + b;", "<test>").unwrap();
        match &prog[0] {
            Node::Assign { value, .. } => assert!(matches!(value.as_ref(), Node::Arrow { .. })),
            other => panic!("expected const assignment, got {other:?}"),
        }
    }

    #[test]
    fn bare_ident_arrow_param_parses_as_arrow() {
        let prog = parse("const double = x => x * 2;", "<test>").unwrap();
        match &prog[0] {
            Node::Assign { value, .. } => match value.as_ref() {
                Node::Arrow { params, .. } => assert_eq!(params, &vec!["x".to_string()]),
                other => panic!("expected arrow, got {other:?}"),
            },
            other => panic!("expected const assignment, got {other:?}"),
        }
    }

    #[test]
    fn parenthesized_expression_is_not_mistaken_for_arrow() {
        let prog = parse("(1 + 2) * 3;", "<test>").unwrap();
        match &prog[0] {
            Node::ExprStatement(e) => assert!(matches!(e.as_ref(), Node::Binary { op: BinOp::Mul, .. })),
            other => panic!("expected expr statement, got {other:?}"),
        }
    }

    #[test]
    fn case_statement_parses_multiple_branches_and_default() {
        let src = r#"
            case (x) {
                1, 2: print("low");
                3..5: print("mid");
                default: print("other");
            }
        "#;
        let prog = parse(src, "<test>").unwrap();
        match &prog[0] {
            Node::Case { branches, .. } => {
                assert_eq!(branches.len(), 3);
                assert!(branches[0].atoms.is_some());
                assert!(branches[2].atoms.is_none());
            }
            other => panic!("expected case statement, got {other:?}"),
        }
    }

    #[test]
    fn class_with_extends_collects_methods() {
        let src = "class Dog extends Animal { init(name) { this.name = name; } speak() { return \"woof\"; } }";
        let prog = parse(src, "<test>").unwrap();
        match &prog[0] {
            Node::Class { name, parent, methods } => {
                assert_eq!(name, "Dog");
                assert_eq!(parent.as_deref(), Some("Animal"));
                assert_eq!(methods.len(), 2);
            }
            other => panic!("expected class, got {other:?}"),
        }
    }

    #[test]
    fn member_and_index_assignment_targets() {
        let prog = parse("obj.field = 1; arr[0] = 2;", "<test>").unwrap();
        assert!(matches!(prog[0], Node::MemberAssign { .. }));
        assert!(matches!(prog[1], Node::IndexAssign { .. }));
    }

    #[test]
    fn compound_assignment_parses_to_dedicated_node() {
        let prog = parse("x += 1;", "<test>").unwrap();
        match &prog[0] {
            Node::CompoundAssign { op: CompoundOp::Add, name, .. } => assert_eq!(name, "x"),
            other => panic!("expected compound assign, got {other:?}"),
        }
    }

    #[test]
    fn deeply_nested_parens_trip_the_recursion_guard() {
        let src = format!("{}1{}", "(".repeat(MAX_DEPTH + 10), ")".repeat(MAX_DEPTH + 10));
        assert!(parse(&src, "<test>").is_err());
    }
}
