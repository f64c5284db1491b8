//! Tokenizer for rule expressions.

use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

use crate::rules::value::BinaryOp;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Integer(i64),
    Float(f64),
    /// A dot-free name: variable, function or boolean literal.
    Ident(String),
    /// A dotted port path, optionally followed by `[start:end]`.
    Path {
        path: String,
        slice: Option<(usize, usize)>,
    },
    Op(BinaryOp),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
}

/// A lexeme that could not be turned into a token.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("unexpected '{token}' at offset {offset}")]
pub struct LexError {
    pub token: String,
    pub offset: usize,
}

/// Splits an expression into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer {
        source,
        chars: source.char_indices().peekable(),
    }
    .run()
}

struct Lexer<'s> {
    source: &'s str,
    chars: Peekable<CharIndices<'s>>,
}

impl<'s> Lexer<'s> {
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(&(offset, c)) = self.chars.peek() {
            let token = match c {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '{' => self.single(Token::LBrace),
                '}' => self.single(Token::RBrace),
                ',' => self.single(Token::Comma),
                c if c.is_ascii_digit() => self.number(offset)?,
                '-' if !ends_operand(tokens.last()) && self.digit_after(offset) => {
                    self.number(offset)?
                }
                c if c.is_ascii_alphabetic() || c == '_' => self.word(offset)?,
                _ => self.operator(offset)?,
            };
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    /// Consumes characters while `accept` holds and returns the end offset.
    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> usize {
        while let Some(&(_, c)) = self.chars.peek() {
            if !accept(c) {
                break;
            }
            self.chars.next();
        }
        self.chars.peek().map_or(self.source.len(), |&(i, _)| i)
    }

    fn error(&self, start: usize, end: usize) -> LexError {
        LexError {
            token: self.source[start..end].to_string(),
            offset: start,
        }
    }

    fn digit_after(&self, offset: usize) -> bool {
        self.source[offset + 1..].starts_with(|c: char| c.is_ascii_digit())
    }

    /// A number, with the leading `-` of a negative literal if present.
    fn number(&mut self, start: usize) -> Result<Token, LexError> {
        let source = self.source;
        if source[start..].starts_with('-') {
            self.chars.next();
        }
        let end = self.take_while(|c| c.is_ascii_digit() || c == '.');
        let text = &source[start..end];
        let token = if text.contains('.') {
            text.parse().map(Token::Float).ok()
        } else {
            text.parse().map(Token::Integer).ok()
        };
        token.ok_or_else(|| self.error(start, end))
    }

    fn word(&mut self, start: usize) -> Result<Token, LexError> {
        let source = self.source;
        let end = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        let text = &source[start..end];

        if !text.contains('.') {
            if matches!(self.chars.peek(), Some(&(_, '['))) {
                let end = self.take_while(|c| c != ']');
                return Err(self.error(start, end));
            }
            return Ok(Token::Ident(text.to_string()));
        }

        if text.split('.').any(str::is_empty) {
            return Err(self.error(start, end));
        }

        let slice = match self.chars.peek() {
            Some(&(open, '[')) => {
                self.chars.next();
                let close = self.take_while(|c| c != ']');
                if self.chars.next().is_none() {
                    return Err(self.error(start, close));
                }
                match parse_range(&source[open + 1..close]) {
                    Some(range) => Some(range),
                    None => return Err(self.error(start, close + 1)),
                }
            }
            _ => None,
        };

        Ok(Token::Path {
            path: text.to_string(),
            slice,
        })
    }

    fn operator(&mut self, start: usize) -> Result<Token, LexError> {
        let source = self.source;
        let mut chars = source[start..].chars();
        let first = chars.next().unwrap_or_default();
        let second = chars.next();

        let (op, width) = match (first, second) {
            ('=', Some('=')) => (BinaryOp::Eq, 2),
            ('!', Some('=')) => (BinaryOp::Ne, 2),
            ('<', Some('=')) => (BinaryOp::Le, 2),
            ('>', Some('=')) => (BinaryOp::Ge, 2),
            ('&', Some('&')) => (BinaryOp::And, 2),
            ('|', Some('|')) => (BinaryOp::Or, 2),
            ('<', _) => (BinaryOp::Lt, 1),
            ('>', _) => (BinaryOp::Gt, 1),
            ('+', _) => (BinaryOp::Add, 1),
            ('-', _) => (BinaryOp::Sub, 1),
            ('*', _) => (BinaryOp::Mul, 1),
            ('/', _) => (BinaryOp::Div, 1),
            ('%', _) => (BinaryOp::Rem, 1),
            _ => return Err(self.error(start, start + first.len_utf8())),
        };

        for _ in 0..width {
            self.chars.next();
        }
        Ok(Token::Op(op))
    }
}

/// A `-` after one of these is subtraction.
fn ends_operand(last: Option<&Token>) -> bool {
    matches!(
        last,
        Some(
            Token::Integer(_)
                | Token::Float(_)
                | Token::Ident(_)
                | Token::Path { .. }
                | Token::RParen
                | Token::RBrace
        )
    )
}

/// Parses `start:end` with `start <= end`.
fn parse_range(text: &str) -> Option<(usize, usize)> {
    let (start, end) = text.split_once(':')?;
    let start: usize = start.trim().parse().ok()?;
    let end: usize = end.trim().parse().ok()?;
    (start <= end).then_some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_tokens() {
        let tokens = tokenize("2 + 3*4 % 5").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Integer(2),
                Token::Op(BinaryOp::Add),
                Token::Integer(3),
                Token::Op(BinaryOp::Mul),
                Token::Integer(4),
                Token::Op(BinaryOp::Rem),
                Token::Integer(5),
            ]
        );
    }

    #[test]
    fn test_two_char_operators() {
        let tokens = tokenize("a<=b!=c&&d||e>=f==g").unwrap();
        let ops: Vec<BinaryOp> = tokens
            .into_iter()
            .filter_map(|t| match t {
                Token::Op(op) => Some(op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                BinaryOp::Le,
                BinaryOp::Ne,
                BinaryOp::And,
                BinaryOp::Or,
                BinaryOp::Ge,
                BinaryOp::Eq
            ]
        );
    }

    #[test]
    fn test_paths_and_slices() {
        let tokens = tokenize("sum(top.proc.out[0:3]) > top.gen.out").unwrap();
        assert_eq!(tokens[0], Token::Ident("sum".into()));
        assert_eq!(
            tokens[2],
            Token::Path {
                path: "top.proc.out".into(),
                slice: Some((0, 3)),
            }
        );
        assert_eq!(
            tokens[5],
            Token::Path {
                path: "top.gen.out".into(),
                slice: None,
            }
        );
    }

    #[test]
    fn test_literal_array_and_floats() {
        let tokens = tokenize("{1, 2.5}").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::LBrace,
                Token::Integer(1),
                Token::Comma,
                Token::Float(2.5),
                Token::RBrace
            ]
        );
    }

    #[test]
    fn test_negative_literals() {
        assert_eq!(
            tokenize("x > -1").unwrap(),
            vec![Token::Ident("x".into()), Token::Op(BinaryOp::Gt), Token::Integer(-1)]
        );
        assert_eq!(
            tokenize("{-1, -2.5}").unwrap(),
            vec![
                Token::LBrace,
                Token::Integer(-1),
                Token::Comma,
                Token::Float(-2.5),
                Token::RBrace
            ]
        );
        assert_eq!(
            tokenize("3-1").unwrap(),
            vec![Token::Integer(3), Token::Op(BinaryOp::Sub), Token::Integer(1)]
        );
        assert_eq!(
            tokenize("(2)-1").unwrap()[3],
            Token::Op(BinaryOp::Sub)
        );
        assert_eq!(tokenize("2*-3").unwrap()[2], Token::Integer(-3));
        assert_eq!(tokenize("- x").unwrap()[0], Token::Op(BinaryOp::Sub));
    }

    #[test]
    fn test_rejected_lexemes() {
        assert_eq!(tokenize("a = b").unwrap_err().token, "=");
        assert_eq!(tokenize("1.2.3").unwrap_err().token, "1.2.3");
        assert_eq!(tokenize("top..out").unwrap_err().token, "top..out");
        assert_eq!(tokenize("top.out[3:1]").unwrap_err().token, "top.out[3:1]");
        assert_eq!(tokenize("top.out[0:2").unwrap_err().offset, 0);
        assert!(tokenize("x[0:1]").is_err());
        assert!(tokenize("a # b").is_err());
    }
}
