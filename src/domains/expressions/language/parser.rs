//! Recursive-descent parser producing an [`Expr`] tree.

use super::EvalError;
use super::lexer::{Spanned, Token};
use super::value::Value;

/// Deepest nesting the parser accepts before giving up.
pub const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    /// Operators of one precedence level applied left to right:
    /// `first op1 rhs1 op2 rhs2 ...`. Kept flat so a long chain adds one
    /// level to the tree rather than one per operator.
    Chain(Box<Expr>, Vec<(BinaryOp, Expr)>),
}

pub fn parse(tokens: &[Spanned], source_len: usize) -> Result<Expr, EvalError> {
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
        end: source_len,
    };
    let expr = parser.or()?;
    match parser.peek() {
        None => Ok(expr),
        Some(extra) => Err(EvalError::syntax(
            extra.pos,
            format!("unexpected {}", describe(&extra.token)),
        )),
    }
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    cursor: usize,
    depth: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.cursor)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.cursor);
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    /// Consume the next token when it maps to one of the operators of a
    /// precedence level.
    fn operator(&mut self, table: &[(Token, BinaryOp)]) -> Option<BinaryOp> {
        let next = &self.peek()?.token;
        let op = table.iter().find(|(t, _)| t == next).map(|(_, op)| *op)?;
        self.cursor += 1;
        Some(op)
    }

    fn binary_level(
        &mut self,
        table: &[(Token, BinaryOp)],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let first = next(self)?;
        let mut rest = Vec::new();
        while let Some(op) = self.operator(table) {
            rest.push((op, next(self)?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Chain(Box::new(first), rest))
        }
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[(Token::Or, BinaryOp::Or)], Self::and)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[(Token::And, BinaryOp::And)], Self::equality)
    }

    fn equality(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek().map(|s| &s.token) {
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Not) => UnaryOp::Not,
            _ => return self.primary(),
        };
        self.cursor += 1;
        self.nested(|p| {
            let operand = p.unary()?;
            Ok(Expr::Unary(op, Box::new(operand)))
        })
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let end = self.end;
        let Some(spanned) = self.advance() else {
            return Err(EvalError::syntax(end, "unexpected end of expression"));
        };
        let pos = spanned.pos;

        match spanned.token.clone() {
            Token::Int(i) => Ok(Expr::Literal(Value::Int(i))),
            Token::Float(f) => Ok(Expr::Literal(Value::Float(f))),
            Token::Str(s) => Ok(Expr::Literal(Value::Str(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => {
                if matches!(self.peek().map(|s| &s.token), Some(Token::LParen)) {
                    return Err(EvalError::syntax(
                        pos,
                        format!("function calls are not supported ('{name}')"),
                    ));
                }
                Ok(Expr::Variable(name))
            }
            Token::LParen => self.nested(|p| {
                let inner = p.or()?;
                match p.advance() {
                    Some(Spanned {
                        token: Token::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(EvalError::syntax(
                        other.pos,
                        format!("expected ')' but found {}", describe(&other.token)),
                    )),
                    None => Err(EvalError::syntax(end, "missing closing ')'")),
                }
            }),
            other => Err(EvalError::syntax(pos, format!("unexpected {}", describe(&other)))),
        }
    }

    fn nested<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(EvalError::TooDeep(MAX_DEPTH));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Int(i) => format!("number {i}"),
        Token::Float(f) => format!("number {f}"),
        Token::Str(_) => "string literal".to_string(),
        Token::Ident(name) => format!("identifier '{name}'"),
        Token::True => "'true'".to_string(),
        Token::False => "'false'".to_string(),
        Token::Null => "'null'".to_string(),
        Token::Plus => "'+'".to_string(),
        Token::Minus => "'-'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Slash => "'/'".to_string(),
        Token::Percent => "'%'".to_string(),
        Token::EqEq => "'=='".to_string(),
        Token::NotEq => "'!='".to_string(),
        Token::Lt => "'<'".to_string(),
        Token::Le => "'<='".to_string(),
        Token::Gt => "'>'".to_string(),
        Token::Ge => "'>='".to_string(),
        Token::And => "'&&'".to_string(),
        Token::Or => "'||'".to_string(),
        Token::Not => "'!'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
    }
}
