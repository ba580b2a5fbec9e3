//! Tokenizer for expression text.

use super::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    LParen,
    RParen,
}

/// A token together with the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let token = match c {
            b'0'..=b'9' => {
                let (token, end) = number(source, start)?;
                i = end;
                token
            }
            b'\'' | b'"' => {
                let (text, end) = string(source, start)?;
                i = end;
                Token::Str(text)
            }
            b'#' => {
                let end = ident_end(bytes, start + 1);
                if end == start + 1 {
                    return Err(EvalError::syntax(start, "expected a variable name after '#'"));
                }
                i = end;
                Token::Ident(source[start + 1..end].to_string())
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let end = ident_end(bytes, start);
                i = end;
                match &source[start..end] {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    word => Token::Ident(word.to_string()),
                }
            }
            _ => {
                let next = bytes.get(i + 1).copied();
                let (token, width) = match (c, next) {
                    (b'=', Some(b'=')) => (Token::EqEq, 2),
                    (b'!', Some(b'=')) => (Token::NotEq, 2),
                    (b'<', Some(b'=')) => (Token::Le, 2),
                    (b'>', Some(b'=')) => (Token::Ge, 2),
                    (b'&', Some(b'&')) => (Token::And, 2),
                    (b'|', Some(b'|')) => (Token::Or, 2),
                    (b'<', _) => (Token::Lt, 1),
                    (b'>', _) => (Token::Gt, 1),
                    (b'!', _) => (Token::Not, 1),
                    (b'+', _) => (Token::Plus, 1),
                    (b'-', _) => (Token::Minus, 1),
                    (b'*', _) => (Token::Star, 1),
                    (b'/', _) => (Token::Slash, 1),
                    (b'%', _) => (Token::Percent, 1),
                    (b'(', _) => (Token::LParen, 1),
                    (b')', _) => (Token::RParen, 1),
                    _ => {
                        let ch = source[start..].chars().next().unwrap_or('?');
                        return Err(EvalError::syntax(start, format!("unexpected character '{ch}'")));
                    }
                };
                i += width;
                token
            }
        };

        tokens.push(Spanned { token, pos: start });
    }

    Ok(tokens)
}

fn ident_end(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    i
}

fn number(source: &str, start: usize) -> Result<(Token, usize), EvalError> {
    let bytes = source.as_bytes();
    let mut i = start;
    let mut is_float = false;

    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
        is_float = true;
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            is_float = true;
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }

    let text = &source[start..i];
    let token = if is_float {
        Token::Float(
            text.parse()
                .map_err(|_| EvalError::syntax(start, format!("invalid number '{text}'")))?,
        )
    } else {
        Token::Int(
            text.parse()
                .map_err(|_| EvalError::syntax(start, format!("integer '{text}' is out of range")))?,
        )
    };
    Ok((token, i))
}

fn string(source: &str, start: usize) -> Result<(String, usize), EvalError> {
    let mut chars = source[start..].char_indices();
    let Some((_, quote)) = chars.next() else {
        return Err(EvalError::syntax(start, "expected a string"));
    };
    let mut text = String::new();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    '\\' | '\'' | '"' => escaped,
                    other => {
                        return Err(EvalError::syntax(
                            start + offset,
                            format!("unknown escape '\\{other}'"),
                        ));
                    }
                });
            }
            c if c == quote => return Ok((text, start + offset + c.len_utf8())),
            c => text.push(c),
        }
    }

    Err(EvalError::syntax(start, "unterminated string literal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_arithmetic_tokens() {
        assert_eq!(
            kinds("a * (b + 2.5)"),
            vec![
                Token::Ident("a".into()),
                Token::Star,
                Token::LParen,
                Token::Ident("b".into()),
                Token::Plus,
                Token::Float(2.5),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_hash_variables_and_keywords() {
        assert_eq!(
            kinds("#a >= 1 and not #b"),
            vec![
                Token::Ident("a".into()),
                Token::Ge,
                Token::Int(1),
                Token::And,
                Token::Not,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(kinds(r#"'it\'s' "a\tb""#), vec![
            Token::Str("it's".into()),
            Token::Str("a\tb".into()),
        ]);
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("'open").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn test_unexpected_character_reports_position() {
        let err = tokenize("a $ b").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { pos: 2, .. }));
    }

    #[test]
    fn test_integer_overflow_is_syntax_error() {
        assert!(tokenize("99999999999999999999").is_err());
    }
}
