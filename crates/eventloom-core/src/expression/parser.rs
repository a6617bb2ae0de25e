//! Lexer and recursive descent parser for inline expressions

use serde_json::Value;

use super::{BinaryOp, Expr, ExprError, Function, UnaryOp};

type Result<T> = std::result::Result<T, ExprError>;

/// Deepest expression tree the parser builds. Evaluation recurses once per
/// level, so this also bounds the evaluator's stack use.
pub const MAX_DEPTH: usize = 128;

/// Parse expression source into an [`Expr`]
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_ternary()?;
    if parser.peek() != &Token::Eof {
        return Err(ExprError::parse(
            format!("unexpected token after expression: {}", parser.peek()),
            parser.position(),
        ));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Question,
    DoubleQuestion,
    Colon,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    Eof,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "'{}'", s),
            Token::Bool(b) => write!(f, "{}", b),
            Token::Null => write!(f, "null"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Percent => write!(f, "'%'"),
            Token::EqEq => write!(f, "'=='"),
            Token::Ne => write!(f, "'!='"),
            Token::Lt => write!(f, "'<'"),
            Token::Le => write!(f, "'<='"),
            Token::Gt => write!(f, "'>'"),
            Token::Ge => write!(f, "'>='"),
            Token::AndAnd => write!(f, "'&&'"),
            Token::OrOr => write!(f, "'||'"),
            Token::Bang => write!(f, "'!'"),
            Token::Question => write!(f, "'?'"),
            Token::DoubleQuestion => write!(f, "'??'"),
            Token::Colon => write!(f, "':'"),
            Token::Dot => write!(f, "'.'"),
            Token::Comma => write!(f, "','"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Eof => write!(f, "end of expression"),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        loop {
            let (token, pos) = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, pos));
            if done {
                return Ok(tokens);
            }
        }
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(i, _)| *i)
            .unwrap_or(self.input.len())
    }

    /// Consume `next` if it is the upcoming character
    fn eat(&mut self, next: char) -> bool {
        if let Some(&(_, c)) = self.chars.peek() {
            if c == next {
                self.chars.next();
                return true;
            }
        }
        false
    }

    fn next_token(&mut self) -> Result<(Token, usize)> {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }

        let Some((pos, ch)) = self.chars.next() else {
            return Ok((Token::Eof, self.input.len()));
        };

        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            ':' => Token::Colon,
            '.' => Token::Dot,
            ',' => Token::Comma,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '?' => {
                if self.eat('?') {
                    Token::DoubleQuestion
                } else {
                    Token::Question
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::EqEq
                } else {
                    return Err(ExprError::parse("expected '==' for equality", pos));
                }
            }
            '!' => {
                if self.eat('=') {
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                if self.eat('&') {
                    Token::AndAnd
                } else {
                    return Err(ExprError::parse("expected '&&'", pos));
                }
            }
            '|' => {
                if self.eat('|') {
                    Token::OrOr
                } else {
                    return Err(ExprError::parse("expected '||'", pos));
                }
            }
            '\'' | '"' => Token::Str(self.string(ch, pos)?),
            c if c.is_ascii_digit() => self.number(pos)?,
            c if c.is_alphabetic() || c == '_' => {
                let end = self.take_while(|c| c.is_alphanumeric() || c == '_');
                match &self.input[pos..end] {
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "null" => Token::Null,
                    ident => Token::Ident(ident.to_string()),
                }
            }
            other => {
                return Err(ExprError::parse(
                    format!("unexpected character '{}'", other),
                    pos,
                ));
            }
        };

        Ok((token, pos))
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> usize {
        while let Some(&(_, c)) = self.chars.peek() {
            if pred(c) {
                self.chars.next();
            } else {
                break;
            }
        }
        self.offset()
    }

    fn string(&mut self, quote: char, start: usize) -> Result<String> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, c)) if c == quote => return Ok(s),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, 'r')) => s.push('\r'),
                    Some((_, c)) => s.push(c),
                    None => break,
                },
                Some((_, c)) => s.push(c),
                None => break,
            }
        }
        Err(ExprError::parse("unclosed string literal", start))
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        let mut end = self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;

        // A dot only continues the number when a digit follows it
        if self.input[end..].starts_with('.')
            && self.input[end + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        {
            self.chars.next();
            end = self.take_while(|c| c.is_ascii_digit());
            is_float = true;
        }

        let text = &self.input[start..end];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| ExprError::parse(format!("invalid number '{}'", text), start))
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| ExprError::parse(format!("integer out of range '{}'", text), start))
        }
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn peek_next(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .map(|(t, _)| t)
            .unwrap_or(&Token::Eof)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, p)| *p)
            .unwrap_or(0)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Count one more level of tree depth, failing past [`MAX_DEPTH`]
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ExprError::parse(
                "expression nested too deeply",
                self.position(),
            ));
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.peek() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(ExprError::parse(
                format!("expected {}, found {}", expected, self.peek()),
                self.position(),
            ))
        }
    }

    /// ternary = coalesce ("?" ternary ":" ternary)?
    fn parse_ternary(&mut self) -> Result<Expr> {
        self.descend()?;
        let result = self.parse_ternary_inner();
        self.depth -= 1;
        result
    }

    fn parse_ternary_inner(&mut self) -> Result<Expr> {
        let condition = self.parse_coalesce()?;
        if self.peek() == &Token::Question {
            self.advance();
            let then_expr = self.parse_ternary()?;
            self.expect(Token::Colon)?;
            let else_expr = self.parse_ternary()?;
            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            });
        }
        Ok(condition)
    }

    /// coalesce = or ("??" or)*
    fn parse_coalesce(&mut self) -> Result<Expr> {
        let first = self.parse_or()?;
        if self.peek() != &Token::DoubleQuestion {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.peek() == &Token::DoubleQuestion {
            self.advance();
            exprs.push(self.parse_or()?);
        }
        Ok(Expr::Coalesce(exprs))
    }

    /// or = and ("||" and)*
    fn parse_or(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_and()?;
        while self.peek() == &Token::OrOr {
            self.advance();
            self.descend()?;
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        self.depth = depth;
        Ok(left)
    }

    /// and = comparison ("&&" comparison)*
    fn parse_and(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_comparison()?;
        while self.peek() == &Token::AndAnd {
            self.advance();
            self.descend()?;
            let right = self.parse_comparison()?;
            left = binary(left, BinaryOp::And, right);
        }
        self.depth = depth;
        Ok(left)
    }

    /// comparison = additive (op additive)?
    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        let op = match self.peek() {
            Token::EqEq => BinaryOp::Eq,
            Token::Ne => BinaryOp::Ne,
            Token::Lt => BinaryOp::Lt,
            Token::Le => BinaryOp::Le,
            Token::Gt => BinaryOp::Gt,
            Token::Ge => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Ok(binary(left, op, right))
    }

    /// additive = term (("+" | "-") term)*
    fn parse_additive(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_term()?;
            left = binary(left, op, right);
        }
        self.depth = depth;
        Ok(left)
    }

    /// term = unary (("*" | "/" | "%") unary)*
    fn parse_term(&mut self) -> Result<Expr> {
        let depth = self.depth;
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            self.descend()?;
            let right = self.parse_unary()?;
            left = binary(left, op, right);
        }
        self.depth = depth;
        Ok(left)
    }

    /// unary = ("-" | "!") unary | primary
    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang => UnaryOp::Not,
            _ => return self.parse_primary(),
        };
        self.advance();
        self.descend()?;
        let expr = self.parse_unary();
        self.depth -= 1;
        let expr = expr?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let position = self.position();
        match self.advance() {
            Token::LParen => {
                let expr = self.parse_ternary()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Token::Int(n) => Ok(Expr::Literal(Value::from(n))),
            Token::Float(n) => Ok(Expr::Literal(Value::from(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::Bool(b) => Ok(Expr::Literal(Value::Bool(b))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => self.parse_identifier(name, position),
            other => Err(ExprError::parse(
                format!("unexpected {}", other),
                position,
            )),
        }
    }

    fn parse_identifier(&mut self, name: String, position: usize) -> Result<Expr> {
        match self.peek() {
            Token::LParen => {
                let func = Function::lookup(&name).ok_or_else(|| {
                    ExprError::parse(format!("unknown function '{}'", name), position)
                })?;
                self.advance();
                let args = self.parse_arguments()?;
                let (min, max) = func.arity();
                if args.len() < min || args.len() > max {
                    return Err(ExprError::parse(
                        format!(
                            "function '{}' does not accept {} argument(s)",
                            func.name(),
                            args.len()
                        ),
                        position,
                    ));
                }
                Ok(Expr::Call { func, args })
            }
            Token::LBracket if name == "input" => {
                self.advance();
                let field = match self.advance() {
                    Token::Str(s) => s,
                    other => {
                        return Err(ExprError::parse(
                            format!("expected quoted field name, found {}", other),
                            self.position(),
                        ));
                    }
                };
                self.expect(Token::RBracket)?;
                Ok(Expr::Field(field))
            }
            Token::Dot if name == "input" => {
                if let Token::Ident(field) = self.peek_next().clone() {
                    self.advance();
                    self.advance();
                    Ok(Expr::Field(field))
                } else {
                    self.advance();
                    Err(ExprError::parse(
                        "expected field name after 'input.'",
                        self.position(),
                    ))
                }
            }
            _ => Ok(Expr::Field(name)),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_ternary()?);
            match self.advance() {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                other => {
                    return Err(ExprError::parse(
                        format!("expected ',' or ')', found {}", other),
                        self.position(),
                    ));
                }
            }
        }
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}
