//! Expression language for template code.
//!
//! ```text
//! script     = { statement ( ";" | newline ) }
//! statement  = "let" ident "=" expr | expr
//! expr       = postfix { "+" postfix }
//! postfix    = primary { "." ident | "[" expr "]" }
//! primary    = string | number | "true" | "false" | "null"
//!            | ident [ "(" args ")" ] | "(" expr ")"
//!            | "{" [ key ":" expr { "," key ":" expr } ] "}"
//!            | "[" [ expr { "," expr } ] "]"
//! ```
//!
//! `//` starts a comment running to the end of the line. Line breaks inside
//! brackets are insignificant.

use serde_json::{Map, Number, Value};

/// Syntax error with its line, relative to the whole template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Map(Vec<(String, Expr)>),
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(String, Expr),
    Expr(Expr),
}

/// A sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script {
    pub stmts: Vec<Stmt>,
}

/// Parse statements. `line` is the template line the code starts on.
pub fn parse_script(code: &str, line: usize) -> Result<Script, SyntaxError> {
    let tokens = lex(code, line)?;
    let mut parser = Parser::new(tokens);
    let mut stmts = Vec::new();
    loop {
        parser.skip_separators();
        if parser.at_end() {
            break;
        }
        stmts.push(parser.statement()?);
        if !parser.at_end() && !parser.eat_separator() {
            return Err(parser.unexpected());
        }
    }
    Ok(Script { stmts })
}

/// Parse a single expression, as used by interpolations.
pub fn parse_expr(code: &str, line: usize) -> Result<Expr, SyntaxError> {
    let tokens = lex(code, line)?;
    let mut parser = Parser::new(tokens);
    parser.skip_separators();
    let expr = parser.expr()?;
    parser.skip_separators();
    if !parser.at_end() {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Num(Number),
    Punct(char),
    Newline,
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

fn lex(code: &str, first_line: usize) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut line = first_line;
    let mut depth = 0usize;
    let mut chars = code.char_indices().peekable();
    let err = |line, message: String| SyntaxError { line, message };

    while let Some((start, c)) = chars.next() {
        match c {
            '\n' => {
                if depth == 0 {
                    tokens.push(Token { tok: Tok::Newline, line });
                }
                line += 1;
            }
            c if c.is_whitespace() => {}
            '/' if chars.peek().is_some_and(|&(_, n)| n == '/') => {
                while chars.peek().is_some_and(|&(_, n)| n != '\n') {
                    chars.next();
                }
            }
            '"' | '\'' => {
                let mut text = String::new();
                loop {
                    let Some((_, ch)) = chars.next() else {
                        return Err(err(line, "unterminated string".into()));
                    };
                    match ch {
                        ch if ch == c => break,
                        '\n' => return Err(err(line, "unterminated string".into())),
                        '\\' => {
                            let Some((_, escaped)) = chars.next() else {
                                return Err(err(line, "unterminated string".into()));
                            };
                            text.push(match escaped {
                                'n' => '\n',
                                't' => '\t',
                                'r' => '\r',
                                '0' => '\0',
                                other => other,
                            });
                        }
                        other => text.push(other),
                    }
                }
                tokens.push(Token { tok: Tok::Str(text), line });
            }
            c if c.is_ascii_digit() => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, n)) = chars.peek() {
                    if n.is_ascii_digit() || n == '.' {
                        end = i + n.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let text = &code[start..end];
                let number = match text.parse::<i64>() {
                    Ok(int) => Number::from(int),
                    Err(_) => text
                        .parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .ok_or_else(|| err(line, format!("invalid number `{text}`")))?,
                };
                tokens.push(Token { tok: Tok::Num(number), line });
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let mut ident = String::from(c);
                while let Some(&(_, n)) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' || n == '$' {
                        ident.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { tok: Tok::Ident(ident), line });
            }
            '(' | '[' | '{' => {
                depth += 1;
                tokens.push(Token { tok: Tok::Punct(c), line });
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                tokens.push(Token { tok: Tok::Punct(c), line });
            }
            '.' | ',' | ':' | ';' | '+' | '=' => {
                tokens.push(Token { tok: Tok::Punct(c), line });
            }
            other => return Err(err(line, format!("unexpected character `{other}`"))),
        }
    }

    tokens.push(Token { tok: Tok::Eof, line });
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn next(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), Tok::Eof)
    }

    fn is_punct(&self, c: char) -> bool {
        matches!(self.peek(), Tok::Punct(p) if *p == c)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        let found = self.is_punct(c);
        if found {
            self.next();
        }
        found
    }

    fn expect_punct(&mut self, c: char) -> Result<(), SyntaxError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`, found {}", describe(self.peek()))))
        }
    }

    fn eat_separator(&mut self) -> bool {
        let found = matches!(self.peek(), Tok::Newline | Tok::Punct(';'));
        if found {
            self.skip_separators();
        }
        found
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Tok::Newline | Tok::Punct(';')) {
            self.next();
        }
    }

    fn error(&self, message: String) -> SyntaxError {
        SyntaxError {
            line: self.line(),
            message,
        }
    }

    fn unexpected(&self) -> SyntaxError {
        self.error(format!("unexpected {}", describe(self.peek())))
    }

    fn ident(&mut self) -> Result<String, SyntaxError> {
        match self.next() {
            Tok::Ident(name) => Ok(name),
            other => Err(self.error(format!("expected a name, found {}", describe(&other)))),
        }
    }

    fn statement(&mut self) -> Result<Stmt, SyntaxError> {
        if matches!(self.peek(), Tok::Ident(kw) if kw == "let") {
            self.next();
            let name = self.ident()?;
            self.expect_punct('=')?;
            return Ok(Stmt::Let(name, self.expr()?));
        }
        Ok(Stmt::Expr(self.expr()?))
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut left = self.postfix()?;
        while self.eat_punct('+') {
            let right = self.postfix()?;
            left = Expr::Add(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_punct('.') {
                let field = self.ident()?;
                expr = Expr::Member(Box::new(expr), field);
            } else if self.eat_punct('[') {
                let index = self.expr()?;
                self.expect_punct(']')?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.next() {
            Tok::Str(text) => Ok(Expr::Literal(Value::String(text))),
            Tok::Num(number) => Ok(Expr::Literal(Value::Number(number))),
            Tok::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "let" => Err(self.error("`let` is only allowed as a statement".into())),
                _ if self.eat_punct('(') => {
                    let args = self.list(')')?;
                    Ok(Expr::Call(name, args))
                }
                _ => Ok(Expr::Var(name)),
            },
            Tok::Punct('(') => {
                let inner = self.expr()?;
                self.expect_punct(')')?;
                Ok(inner)
            }
            Tok::Punct('[') => Ok(Expr::List(self.list(']')?)),
            Tok::Punct('{') => self.map(),
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }

    /// Comma-separated expressions up to `close`; a trailing comma is allowed.
    fn list(&mut self, close: char) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        while !self.eat_punct(close) {
            items.push(self.expr()?);
            if !self.eat_punct(',') {
                self.expect_punct(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn map(&mut self) -> Result<Expr, SyntaxError> {
        let mut entries = Vec::new();
        while !self.eat_punct('}') {
            let key = match self.next() {
                Tok::Ident(key) | Tok::Str(key) => key,
                other => {
                    return Err(self.error(format!("expected a key, found {}", describe(&other))));
                }
            };
            self.expect_punct(':')?;
            entries.push((key, self.expr()?));
            if !self.eat_punct(',') {
                self.expect_punct('}')?;
                break;
            }
        }
        Ok(Expr::Map(entries))
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(name) => format!("`{name}`"),
        Tok::Str(_) => "a string".to_string(),
        Tok::Num(n) => format!("`{n}`"),
        Tok::Punct(c) => format!("`{c}`"),
        Tok::Newline => "end of line".to_string(),
        Tok::Eof => "end of code".to_string(),
    }
}

/// Build a map value from evaluated entries.
pub fn object(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
    Value::Object(entries.into_iter().collect::<Map<String, Value>>())
}
