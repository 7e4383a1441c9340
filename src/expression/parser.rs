//! Recursive-descent parser and evaluator for condition expressions

use crate::context::ExecutionContext;
use crate::expression::{ExpressionError, ExpressionEvaluator};

/// Built-in condition evaluator.
///
/// Selectors: `request.method`, `request.path`, `request.path_info`,
/// `request.host`, `request.headers['name']`, `request.params['name']`,
/// `request.path_params['name']`, `response.status`. Missing headers and
/// parameters resolve to the empty string; an unknown selector is a hard
/// error.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleExpressionEvaluator;

impl SimpleExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for SimpleExpressionEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        ctx: &ExecutionContext,
    ) -> Result<bool, ExpressionError> {
        let tokens = tokenize(expression)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            ctx,
        };
        let value = parser.expression()?;
        parser.expect_end()?;
        Ok(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Literal(String),
    Eq,
    Ne,
    Matches,
    And,
    Or,
    Not,
    LParen,
    RParen,
    Dot,
    LBracket,
    RBracket,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '\'' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                for (_, lc) in chars.by_ref() {
                    if lc == '\'' {
                        closed = true;
                        break;
                    }
                    literal.push(lc);
                }
                if !closed {
                    return Err(ExpressionError::Syntax(format!(
                        "unterminated string literal at offset {pos}"
                    )));
                }
                tokens.push(Token::Literal(literal));
            }
            '=' => {
                chars.next();
                match chars.peek().map(|&(_, c2)| c2) {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Eq);
                    }
                    Some('~') => {
                        chars.next();
                        tokens.push(Token::Matches);
                    }
                    _ => {
                        return Err(ExpressionError::Syntax(format!(
                            "expected '==' or '=~' at offset {pos}"
                        )))
                    }
                }
            }
            '!' => {
                chars.next();
                if chars.peek().map(|&(_, c2)| c2) == Some('=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Not);
                }
            }
            '&' => {
                chars.next();
                if chars.peek().map(|&(_, c2)| c2) == Some('&') {
                    chars.next();
                    tokens.push(Token::And);
                } else {
                    return Err(ExpressionError::Syntax(format!(
                        "expected '&&' at offset {pos}"
                    )));
                }
            }
            '|' => {
                chars.next();
                if chars.peek().map(|&(_, c2)| c2) == Some('|') {
                    chars.next();
                    tokens.push(Token::Or);
                } else {
                    return Err(ExpressionError::Syntax(format!(
                        "expected '||' at offset {pos}"
                    )));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&(_, ic)) = chars.peek() {
                    if ic.is_ascii_alphanumeric() || ic == '_' || ic == '-' {
                        ident.push(ic);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(ExpressionError::Syntax(format!(
                    "unexpected character {other:?} at offset {pos}"
                )));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ctx: &'a ExecutionContext,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ExpressionError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(ExpressionError::Syntax(format!(
                "expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ExpressionError::Syntax(format!(
                "unexpected trailing token {token:?}"
            ))),
        }
    }

    fn expression(&mut self) -> Result<bool, ExpressionError> {
        let mut value = self.conjunction()?;
        while self.eat(&Token::Or) {
            // No short-circuit: the right side must still be well-formed.
            let rhs = self.conjunction()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn conjunction(&mut self) -> Result<bool, ExpressionError> {
        let mut value = self.term()?;
        while self.eat(&Token::And) {
            let rhs = self.term()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<bool, ExpressionError> {
        if self.eat(&Token::Not) {
            return Ok(!self.term()?);
        }
        if self.eat(&Token::LParen) {
            let value = self.expression()?;
            self.expect(Token::RParen)?;
            return Ok(value);
        }
        if matches!(self.peek(), Some(Token::Ident(word)) if word == "true") {
            self.pos += 1;
            return Ok(true);
        }
        if matches!(self.peek(), Some(Token::Ident(word)) if word == "false") {
            self.pos += 1;
            return Ok(false);
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<bool, ExpressionError> {
        let left = self.selector()?;
        let op = match self.next() {
            Some(Token::Eq) => Token::Eq,
            Some(Token::Ne) => Token::Ne,
            Some(Token::Matches) => Token::Matches,
            other => {
                return Err(ExpressionError::Syntax(format!(
                    "expected comparison operator, found {other:?}"
                )))
            }
        };
        let right = match self.next() {
            Some(Token::Literal(s)) => s.clone(),
            other => {
                return Err(ExpressionError::Syntax(format!(
                    "expected string literal, found {other:?}"
                )))
            }
        };
        match op {
            Token::Eq => Ok(left == right),
            Token::Ne => Ok(left != right),
            Token::Matches => {
                let re = regex::Regex::new(&right).map_err(|source| {
                    ExpressionError::InvalidRegex {
                        pattern: right.clone(),
                        source,
                    }
                })?;
                Ok(re.is_match(&left))
            }
            _ => unreachable!("op restricted above"),
        }
    }

    fn selector(&mut self) -> Result<String, ExpressionError> {
        let mut parts = Vec::new();
        loop {
            match self.next() {
                Some(Token::Ident(word)) => parts.push(word.clone()),
                other => {
                    return Err(ExpressionError::Syntax(format!(
                        "expected selector, found {other:?}"
                    )))
                }
            }
            if !self.eat(&Token::Dot) {
                break;
            }
        }
        let key = if self.eat(&Token::LBracket) {
            let key = match self.next() {
                Some(Token::Literal(s)) => s.clone(),
                other => {
                    return Err(ExpressionError::Syntax(format!(
                        "expected string key, found {other:?}"
                    )))
                }
            };
            self.expect(Token::RBracket)?;
            Some(key)
        } else {
            None
        };
        self.resolve(&parts, key.as_deref())
    }

    fn resolve(&self, parts: &[String], key: Option<&str>) -> Result<String, ExpressionError> {
        let path: Vec<&str> = parts.iter().map(String::as_str).collect();
        let request = self.ctx.request();
        match (path.as_slice(), key) {
            (["request", "method"], None) => Ok(request.method().as_str().to_string()),
            (["request", "path"], None) => Ok(request.path().to_string()),
            (["request", "path_info"], None) => Ok(request.path_info().to_string()),
            (["request", "host"], None) => Ok(request.host().unwrap_or("").to_string()),
            (["request", "headers"], Some(name)) => Ok(request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()),
            (["request", "params"], Some(name)) => {
                Ok(request.parameters().get(name).unwrap_or("").to_string())
            }
            (["request", "path_params"], Some(name)) => {
                Ok(request.path_parameters().get(name).unwrap_or("").to_string())
            }
            (["response", "status"], None) => {
                Ok(self.ctx.response().status().as_u16().to_string())
            }
            _ => {
                let mut rendered = path.join(".");
                if let Some(name) = key {
                    rendered.push_str(&format!("['{name}']"));
                }
                Err(ExpressionError::UnknownSelector(rendered))
            }
        }
    }
}
