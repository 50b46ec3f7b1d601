//! A recursive-descent parser over the token stream produced by
//! [`crate::lexer::Lexer`], realizing the "external parser" contract spec
//! §6 assumes: `parse(code_text) -> Result<Vec<Node>>`, one-based line
//! numbers on every node, and a syntax-failure signaled as an
//! [`AnalysisError::Parse`] rather than a panic.

use crate::lexer::{Lexer, Spanned, Token};
use crate::nodes::Node;
use taint_core::{AnalysisError, Result};

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

/// Parses a full PHP snippet (including its `<?php ... ?>` tags) into a
/// flat top-level statement list, the shape the tracer's back-slices are
/// built from.
pub fn parse(source: &str) -> Result<Vec<Node>> {
    let tokens = Lexer::new(source).tokenize();
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_program()
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_line(&self) -> u32 {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Spanned {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn expect(&mut self, expected: Token) -> Result<Spanned> {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(&expected) {
            Ok(self.advance())
        } else {
            Err(AnalysisError::parse(format!(
                "expected {:?}, found {:?} at line {}",
                expected,
                self.peek(),
                self.peek_line()
            )))
        }
    }

    fn eat_ident(&mut self, word: &str) -> bool {
        if let Token::Ident(name) = self.peek() {
            if name.eq_ignore_ascii_case(word) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn peek_ident_is(&self, word: &str) -> bool {
        matches!(self.peek(), Token::Ident(name) if name.eq_ignore_ascii_case(word))
    }

    fn parse_program(&mut self) -> Result<Vec<Node>> {
        let mut stmts = Vec::new();
        while !self.at_eof() {
            stmts.push(self.parse_statement()?);
        }
        Ok(stmts)
    }

    /// One statement or brace-delimited block, as used after `if (...)`,
    /// `for (...)`, `while (...)`. PHP allows the single-statement form
    /// without braces; both are supported.
    fn parse_block(&mut self) -> Result<Vec<Node>> {
        if matches!(self.peek(), Token::LBrace) {
            self.advance();
            let mut stmts = Vec::new();
            while !matches!(self.peek(), Token::RBrace) {
                if self.at_eof() {
                    return Err(AnalysisError::parse("unterminated block"));
                }
                stmts.push(self.parse_statement()?);
            }
            self.advance();
            Ok(stmts)
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    fn parse_statement(&mut self) -> Result<Node> {
        let line = self.peek_line();
        match self.peek().clone() {
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("function") => {
                self.parse_function(false)
            }
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("class") => self.parse_class(),
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("if") => self.parse_if(),
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("for") => self.parse_for(),
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("while") => self.parse_while(),
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("echo") => self.parse_echo(),
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("print") => self.parse_print(),
            Token::Ident(ref kw) if kw.eq_ignore_ascii_case("return") => self.parse_return(),
            Token::Ident(ref kw)
                if ["include", "include_once", "require", "require_once"]
                    .iter()
                    .any(|k| kw.eq_ignore_ascii_case(k)) =>
            {
                self.parse_include()
            }
            Token::LBrace => Ok(Node::Block {
                stmts: self.parse_block()?,
                line,
            }),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_expr_statement(&mut self) -> Result<Node> {
        let line = self.peek_line();
        let expr = self.parse_expr()?;
        let node = if matches!(self.peek(), Token::Assign) {
            self.advance();
            let rhs = self.parse_expr()?;
            Node::Assignment {
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
                line,
            }
        } else {
            expr
        };
        if matches!(self.peek(), Token::Semicolon) {
            self.advance();
        }
        Ok(node)
    }

    fn parse_params(&mut self) -> Result<Vec<Node>> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        while !matches!(self.peek(), Token::RParen) {
            let line = self.peek_line();
            let Token::Variable(name) = self.advance().token else {
                return Err(AnalysisError::parse("expected parameter name"));
            };
            let default = if matches!(self.peek(), Token::Assign) {
                self.advance();
                Some(Box::new(self.parse_expr()?))
            } else {
                None
            };
            params.push(Node::FormalParameter {
                name,
                default,
                line,
            });
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            }
        }
        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_function(&mut self, in_class: bool) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "function"
        let Token::Ident(name) = self.advance().token else {
            return Err(AnalysisError::parse("expected function name"));
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        Ok(if in_class {
            Node::Method {
                name,
                params,
                body,
                line,
            }
        } else {
            Node::Function {
                name,
                params,
                body,
                line,
            }
        })
    }

    fn parse_class(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "class"
        let Token::Ident(name) = self.advance().token else {
            return Err(AnalysisError::parse("expected class name"));
        };
        // Skip an optional "extends Parent" / "implements X" clause.
        while self.eat_ident("extends") || self.eat_ident("implements") {
            self.advance();
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                self.advance();
            }
        }
        self.expect(Token::LBrace)?;
        let mut members = Vec::new();
        while !matches!(self.peek(), Token::RBrace) {
            if self.at_eof() {
                return Err(AnalysisError::parse("unterminated class body"));
            }
            // Skip visibility/static modifiers.
            while matches!(self.peek(), Token::Ident(w) if ["public", "private", "protected", "static", "final", "abstract"].contains(&w.to_ascii_lowercase().as_str()))
            {
                self.advance();
            }
            if self.peek_ident_is("function") {
                members.push(self.parse_function(true)?);
            } else {
                // A property declaration or something we don't model; skip
                // to the next semicolon defensively.
                while !matches!(self.peek(), Token::Semicolon | Token::RBrace) && !self.at_eof() {
                    self.advance();
                }
                if matches!(self.peek(), Token::Semicolon) {
                    self.advance();
                }
            }
        }
        self.advance(); // "}"
        Ok(Node::Class {
            name,
            members,
            line,
        })
    }

    fn parse_if(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "if"
        self.expect(Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen)?;
        let then = self.parse_block()?;
        let mut elseifs = Vec::new();
        let mut otherwise = None;
        loop {
            if self.peek_ident_is("elseif") {
                self.advance();
                self.expect(Token::LParen)?;
                let c = self.parse_expr()?;
                self.expect(Token::RParen)?;
                let b = self.parse_block()?;
                elseifs.push((c, b));
            } else if self.peek_ident_is("else") {
                self.advance();
                if self.peek_ident_is("if") {
                    self.advance();
                    self.expect(Token::LParen)?;
                    let c = self.parse_expr()?;
                    self.expect(Token::RParen)?;
                    let b = self.parse_block()?;
                    elseifs.push((c, b));
                } else {
                    otherwise = Some(self.parse_block()?);
                    break;
                }
            } else {
                break;
            }
        }
        Ok(Node::If {
            cond: Box::new(cond),
            then,
            elseifs,
            otherwise,
            line,
        })
    }

    fn parse_expr_list_until(&mut self, terminator: &Token) -> Result<Vec<Node>> {
        let mut out = Vec::new();
        while std::mem::discriminant(self.peek()) != std::mem::discriminant(terminator) {
            out.push(self.parse_expr()?);
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(out)
    }

    fn parse_for(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "for"
        self.expect(Token::LParen)?;
        let init = self.parse_expr_list_until(&Token::Semicolon)?;
        self.expect(Token::Semicolon)?;
        let cond = self.parse_expr_list_until(&Token::Semicolon)?;
        self.expect(Token::Semicolon)?;
        let step = self.parse_expr_list_until(&Token::RParen)?;
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Node::For {
            init,
            cond,
            step,
            body,
            line,
        })
    }

    fn parse_while(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "while"
        self.expect(Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Node::While {
            cond: Box::new(cond),
            body,
            line,
        })
    }

    fn parse_echo(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "echo"
        let mut exprs = vec![self.parse_expr()?];
        while matches!(self.peek(), Token::Comma) {
            self.advance();
            exprs.push(self.parse_expr()?);
        }
        if matches!(self.peek(), Token::Semicolon) {
            self.advance();
        }
        Ok(Node::Echo { exprs, line })
    }

    fn parse_print(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "print"
        let expr = self.parse_expr()?;
        if matches!(self.peek(), Token::Semicolon) {
            self.advance();
        }
        Ok(Node::Print {
            expr: Box::new(expr),
            line,
        })
    }

    fn parse_return(&mut self) -> Result<Node> {
        let line = self.peek_line();
        self.advance(); // "return"
        let expr = if matches!(self.peek(), Token::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        if matches!(self.peek(), Token::Semicolon) {
            self.advance();
        }
        Ok(Node::Return { expr, line })
    }

    fn parse_include(&mut self) -> Result<Node> {
        let line = self.peek_line();
        let Token::Ident(kw) = self.advance().token else {
            unreachable!()
        };
        let require = kw.to_ascii_lowercase().starts_with("require");
        let once = kw.to_ascii_lowercase().ends_with("_once");
        let had_paren = matches!(self.peek(), Token::LParen);
        if had_paren {
            self.advance();
        }
        let path = self.parse_expr()?;
        if had_paren {
            self.expect(Token::RParen)?;
        }
        if matches!(self.peek(), Token::Semicolon) {
            self.advance();
        }
        Ok(Node::Include {
            path: Box::new(path),
            once,
            require,
            line,
        })
    }

    fn parse_expr(&mut self) -> Result<Node> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Node> {
        let line = self.peek_line();
        let cond = self.parse_binary()?;
        if matches!(self.peek(), Token::BinOp(op) if op == "?:") {
            self.advance();
            let otherwise = self.parse_ternary()?;
            return Ok(Node::TernaryOp {
                cond: Box::new(cond),
                then: None,
                otherwise: Box::new(otherwise),
                line,
            });
        }
        if matches!(self.peek(), Token::Question) {
            self.advance();
            let then = self.parse_ternary()?;
            self.expect(Token::Colon)?;
            let otherwise = self.parse_ternary()?;
            return Ok(Node::TernaryOp {
                cond: Box::new(cond),
                then: Some(Box::new(then)),
                otherwise: Box::new(otherwise),
                line,
            });
        }
        Ok(cond)
    }

    /// A single left-associative precedence tier covering every binary
    /// operator the lexer produces. The tracer only needs expression
    /// *structure* (which variables feed a sink), not PHP's exact operator
    /// precedence, so one tier is sufficient here.
    fn parse_binary(&mut self) -> Result<Node> {
        let line = self.peek_line();
        let mut left = self.parse_unary()?;
        while let Token::BinOp(op) = self.peek().clone() {
            if op == "?:" {
                break;
            }
            self.advance();
            let right = self.parse_unary()?;
            left = Node::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                line,
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node> {
        let line = self.peek_line();
        match self.peek().clone() {
            Token::At => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Node::Silence {
                    expr: Box::new(expr),
                    line,
                })
            }
            Token::Cast(kind) => {
                self.advance();
                let expr = self.parse_unary()?;
                Ok(Node::Cast {
                    kind,
                    expr: Box::new(expr),
                    line,
                })
            }
            Token::BinOp(op) if op == "!" || op == "-" => {
                self.advance();
                // Unary not/minus: taint-irrelevant, fold into a Cast-like
                // wrapper so the tracer's transparent Cast unwrap still sees
                // the inner expression.
                let expr = self.parse_unary()?;
                Ok(Node::Cast {
                    kind: op,
                    expr: Box::new(expr),
                    line,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Node> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek().clone() {
                Token::LBracket => {
                    let line = self.peek_line();
                    self.advance();
                    let key = if matches!(self.peek(), Token::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()?))
                    };
                    self.expect(Token::RBracket)?;
                    expr = Node::ArrayOffset {
                        base: Box::new(expr),
                        key,
                        line,
                    };
                }
                Token::Arrow => {
                    let line = self.peek_line();
                    self.advance();
                    let Token::Ident(name) = self.advance().token else {
                        return Err(AnalysisError::parse("expected property/method name after ->"));
                    };
                    if matches!(self.peek(), Token::LParen) {
                        let args = self.parse_args()?;
                        expr = Node::MethodCall {
                            target: Box::new(expr),
                            method: name,
                            args,
                            line,
                        };
                    } else {
                        expr = Node::ObjectProperty {
                            base: Box::new(expr),
                            prop: name,
                            line,
                        };
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_args(&mut self) -> Result<Vec<Node>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while !matches!(self.peek(), Token::RParen) {
            let mut expr = self.parse_expr()?;
            if matches!(self.peek(), Token::DoubleArrow) {
                let line = self.peek_line();
                self.advance();
                let value = self.parse_expr()?;
                expr = Node::BinaryOp {
                    op: "=>".into(),
                    left: Box::new(expr),
                    right: Box::new(value),
                    line,
                };
            }
            args.push(expr);
            if matches!(self.peek(), Token::Comma) {
                self.advance();
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let line = self.peek_line();
        match self.advance().token {
            Token::Variable(name) => Ok(Node::Variable { name, line }),
            Token::Number(n) => Ok(Node::Literal { value: n, line }),
            Token::Str(s) => Ok(Node::Literal { value: s, line }),
            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(name) if name.eq_ignore_ascii_case("new") => {
                let Token::Ident(class_name) = self.advance().token else {
                    return Err(AnalysisError::parse("expected class name after 'new'"));
                };
                let args = if matches!(self.peek(), Token::LParen) {
                    self.parse_args()?
                } else {
                    Vec::new()
                };
                Ok(Node::New {
                    class_name,
                    args,
                    line,
                })
            }
            Token::Ident(name) if name.eq_ignore_ascii_case("eval") => {
                let args = self.parse_args()?;
                let expr = args.into_iter().next().ok_or_else(|| {
                    AnalysisError::parse("eval() requires exactly one argument")
                })?;
                Ok(Node::Eval {
                    expr: Box::new(expr),
                    line,
                })
            }
            Token::Ident(name) if matches!(self.peek(), Token::LParen) => {
                let args = self.parse_args()?;
                Ok(Node::FunctionCall { name, args, line })
            }
            Token::Ident(name) => Ok(Node::Constant { name, line }),
            other => Err(AnalysisError::parse(format!(
                "unexpected token {:?} at line {}",
                other, line
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direct_taint_scenario() {
        let nodes = parse("<?php $x = $_GET['id']; eval($x); ?>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(matches!(nodes[0], Node::Assignment { .. }));
        assert!(matches!(nodes[1], Node::Eval { .. }));
    }

    #[test]
    fn parses_function_definition_and_call() {
        let nodes =
            parse("<?php function f($a){ return $a; } $y = f($_POST['u']); echo $y; ?>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[0], Node::Function { .. }));
        assert!(matches!(nodes[2], Node::Echo { .. }));
    }

    #[test]
    fn parses_array_literal_with_keys() {
        let nodes =
            parse("<?php $arr = array('k' => $_COOKIE['c']); eval($arr['k']); ?>").unwrap();
        assert!(matches!(nodes[0], Node::Assignment { .. }));
        if let Node::Assignment { rhs, .. } = &nodes[0] {
            assert!(matches!(rhs.as_ref(), Node::FunctionCall { .. }));
        }
    }

    #[test]
    fn parses_include_statement() {
        let nodes = parse("<?php include 'a.php'; eval($g); ?>").unwrap();
        assert!(matches!(nodes[0], Node::Include { .. }));
    }

    #[test]
    fn malformed_input_yields_parse_error() {
        let result = parse("<?php $x = ; ?>");
        assert!(result.is_err());
    }
}
