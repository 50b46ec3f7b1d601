//! A small PHP lexer. Only the subset of PHP syntax spec §1 keeps in scope
//! is tokenized: no string interpolation, heredocs, namespaces, traits,
//! closures, match expressions or attributes.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Variable(String),
    Ident(String),
    Number(String),
    Str(String),
    // Punctuation / operators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Assign,
    Arrow,      // ->
    DoubleArrow, // =>
    Question,
    Colon,
    At,             // @ (silence)
    BinOp(String),  // ., +, -, *, /, ==, ===, !=, <, >, <=, >=, &&, ||, %
    Cast(String),   // (int), (string), (bool), (array), (float)
    Eof,
}

#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub line: u32,
}

pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
}

const CASTS: &[&str] = &["int", "integer", "string", "bool", "boolean", "array", "float", "double"];

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        // Strip the PHP open/close tags; everything else is treated as PHP.
        // Test inputs are always fully-enclosed `<?php ... ?>` snippets.
        let inner = source
            .trim_start()
            .strip_prefix("<?php")
            .or_else(|| source.trim_start().strip_prefix("<?"))
            .unwrap_or(source);
        let inner = inner.strip_suffix("?>").unwrap_or(inner);
        Self {
            chars: inner.chars().peekable(),
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(&c) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') => {
                    let mut clone = self.chars.clone();
                    clone.next();
                    match clone.peek() {
                        Some('/') => {
                            while let Some(&c) = self.chars.peek() {
                                if c == '\n' {
                                    break;
                                }
                                self.bump();
                            }
                        }
                        Some('*') => {
                            self.bump();
                            self.bump();
                            let mut prev = ' ';
                            while let Some(c) = self.bump() {
                                if prev == '*' && c == '/' {
                                    break;
                                }
                                prev = c;
                            }
                        }
                        _ => break,
                    }
                }
                _ => break,
            }
        }
    }

    pub fn tokenize(mut self) -> Vec<Spanned> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let line = self.line;
            let Some(&c) = self.chars.peek() else {
                out.push(Spanned {
                    token: Token::Eof,
                    line,
                });
                break;
            };
            let token = match c {
                '$' => {
                    self.bump();
                    let mut name = String::from("$");
                    while let Some(&c) = self.chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            name.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    Token::Variable(name)
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    Token::Ident(ident)
                }
                c if c.is_ascii_digit() => {
                    let mut num = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c.is_ascii_digit() || c == '.' {
                            num.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    Token::Number(num)
                }
                '\'' | '"' => {
                    let quote = c;
                    self.bump();
                    let mut s = String::new();
                    while let Some(&c) = self.chars.peek() {
                        if c == quote {
                            self.bump();
                            break;
                        }
                        if c == '\\' {
                            self.bump();
                            if let Some(escaped) = self.bump() {
                                s.push(escaped);
                            }
                            continue;
                        }
                        s.push(c);
                        self.bump();
                    }
                    Token::Str(s)
                }
                '(' => {
                    self.bump();
                    // Lookahead for a cast: "(" ident ")" with no intervening space tokens.
                    let mut lookahead = self.chars.clone();
                    let mut word = String::new();
                    while let Some(&c) = lookahead.peek() {
                        if c.is_alphabetic() {
                            word.push(c);
                            lookahead.next();
                        } else {
                            break;
                        }
                    }
                    if lookahead.peek() == Some(&')') && CASTS.contains(&word.as_str()) {
                        for _ in 0..word.len() {
                            self.bump();
                        }
                        self.bump(); // consume ')'
                        Token::Cast(word)
                    } else {
                        Token::LParen
                    }
                }
                ')' => {
                    self.bump();
                    Token::RParen
                }
                '{' => {
                    self.bump();
                    Token::LBrace
                }
                '}' => {
                    self.bump();
                    Token::RBrace
                }
                '[' => {
                    self.bump();
                    Token::LBracket
                }
                ']' => {
                    self.bump();
                    Token::RBracket
                }
                ';' => {
                    self.bump();
                    Token::Semicolon
                }
                ',' => {
                    self.bump();
                    Token::Comma
                }
                '@' => {
                    self.bump();
                    Token::At
                }
                '?' => {
                    self.bump();
                    if self.chars.peek() == Some(&':') {
                        self.bump();
                        Token::BinOp("?:".into())
                    } else {
                        Token::Question
                    }
                }
                ':' => {
                    self.bump();
                    Token::Colon
                }
                '-' => {
                    self.bump();
                    if self.chars.peek() == Some(&'>') {
                        self.bump();
                        Token::Arrow
                    } else {
                        Token::BinOp("-".into())
                    }
                }
                '=' => {
                    self.bump();
                    match self.chars.peek() {
                        Some('=') => {
                            self.bump();
                            if self.chars.peek() == Some(&'=') {
                                self.bump();
                                Token::BinOp("===".into())
                            } else {
                                Token::BinOp("==".into())
                            }
                        }
                        Some('>') => {
                            self.bump();
                            Token::DoubleArrow
                        }
                        _ => Token::Assign,
                    }
                }
                '.' => {
                    self.bump();
                    Token::BinOp(".".into())
                }
                '+' | '*' | '/' | '%' => {
                    self.bump();
                    Token::BinOp(c.to_string())
                }
                '!' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        Token::BinOp("!=".into())
                    } else {
                        Token::BinOp("!".into())
                    }
                }
                '<' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        Token::BinOp("<=".into())
                    } else {
                        Token::BinOp("<".into())
                    }
                }
                '>' => {
                    self.bump();
                    if self.chars.peek() == Some(&'=') {
                        self.bump();
                        Token::BinOp(">=".into())
                    } else {
                        Token::BinOp(">".into())
                    }
                }
                '&' => {
                    self.bump();
                    if self.chars.peek() == Some(&'&') {
                        self.bump();
                    }
                    Token::BinOp("&&".into())
                }
                '|' => {
                    self.bump();
                    if self.chars.peek() == Some(&'|') {
                        self.bump();
                    }
                    Token::BinOp("||".into())
                }
                other => {
                    self.bump();
                    tracing::warn!(char = %other, "lexer: skipping unrecognized character");
                    continue;
                }
            };
            out.push(Spanned { token, line });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_simple_assignment() {
        let tokens = Lexer::new("<?php $x = $_GET['id']; ?>").tokenize();
        assert_eq!(tokens[0].token, Token::Variable("$x".into()));
        assert_eq!(tokens[1].token, Token::Assign);
        assert_eq!(tokens[2].token, Token::Variable("$_GET".into()));
        assert_eq!(tokens[3].token, Token::LBracket);
    }

    #[test]
    fn recognizes_cast() {
        let tokens = Lexer::new("<?php (int)$x; ?>").tokenize();
        assert_eq!(tokens[0].token, Token::Cast("int".into()));
    }
}
