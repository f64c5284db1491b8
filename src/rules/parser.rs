//! Precedence-climbing parser producing typed expression trees.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr      := unary (binop unary)*        binop tiers: || &&, comparisons, + -, * / %
//! unary     := ("sum" | "max" | "min") unary | primary
//! primary   := integer | float | "true" | "false" | variable
//!            | path | path "[" start ":" end "]"
//!            | "{" number ("," number)* "}" | "(" expr ")"
//! ```
//!
//! Port paths and variable names are resolved while parsing, so a parsed
//! [`Expr`] never refers to anything unknown.

use thiserror::Error;

use crate::coupled::PortLocator;
use crate::event::Value;
use crate::rules::lexer::Token;
use crate::rules::value::{Aggregate, BinaryOp};

/// A parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Value),
    Port {
        path: String,
        locator: PortLocator,
    },
    Slice {
        path: String,
        locator: PortLocator,
        start: usize,
        end: usize,
    },
    Var(String),
    Aggregate {
        function: Aggregate,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Names of the variables this expression reads.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'e>(&'e self, names: &mut Vec<&'e str>) {
        match self {
            Expr::Var(name) => names.push(name),
            Expr::Aggregate { operand, .. } => operand.collect_variables(names),
            Expr::Binary { left, right, .. } => {
                left.collect_variables(names);
                right.collect_variables(names);
            }
            Expr::Literal(_) | Expr::Port { .. } | Expr::Slice { .. } => {}
        }
    }
}

/// Names an expression may refer to.
pub trait Scope {
    fn is_variable(&self, name: &str) -> bool;

    fn locate_port(&self, path: &str) -> Option<PortLocator>;
}

/// Why an expression could not be parsed.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// A name that is neither a literal, a function nor a known variable.
    #[error("unknown name '{0}'")]
    UnknownName(String),
    /// A port path that does not resolve against the model tree.
    #[error("port '{0}' not found")]
    UnresolvedPort(String),
    /// Anything else: misplaced or missing tokens.
    #[error("{0}")]
    Syntax(String),
}

/// Parses a token stream into an [`Expr`].
pub fn parse(tokens: &[Token], scope: &dyn Scope) -> Result<Expr, ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        scope,
    };
    let expr = parser.expression(1)?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(ParseError::Syntax(format!("unexpected {:?}", token))),
    }
}

struct Parser<'t, 's> {
    tokens: &'t [Token],
    pos: usize,
    scope: &'s dyn Scope,
}

impl<'t> Parser<'t, '_> {
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, context: &str) -> Result<(), ParseError> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(ParseError::Syntax(format!(
                "expected {:?} {}, found {:?}",
                expected, context, token
            ))),
            None => Err(ParseError::Syntax(format!(
                "expected {:?} {}, found end of expression",
                expected, context
            ))),
        }
    }

    /// Binary operators of the same tier associate to the left.
    fn expression(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        while let Some(Token::Op(op)) = self.peek() {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let right = self.expression(precedence + 1)?;
            left = Expr::Binary {
                op: *op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(Token::Ident(name)) = self.peek() {
            if let Some(function) = Aggregate::from_name(name) {
                self.pos += 1;
                let operand = self.unary()?;
                return Ok(Expr::Aggregate {
                    function,
                    operand: Box::new(operand),
                });
            }
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self
            .next()
            .ok_or_else(|| ParseError::Syntax("unexpected end of expression".into()))?;

        match token {
            Token::Integer(v) => Ok(Expr::Literal(Value::Integer(*v))),
            Token::Float(v) => Ok(Expr::Literal(Value::Float(*v))),
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::Literal(Value::Boolean(true))),
                "false" => Ok(Expr::Literal(Value::Boolean(false))),
                _ if self.scope.is_variable(name) => Ok(Expr::Var(name.clone())),
                _ => Err(ParseError::UnknownName(name.clone())),
            },
            Token::Path { path, slice } => {
                let locator = self
                    .scope
                    .locate_port(path)
                    .ok_or_else(|| ParseError::UnresolvedPort(path.clone()))?;
                Ok(match *slice {
                    Some((start, end)) => Expr::Slice {
                        path: path.clone(),
                        locator,
                        start,
                        end,
                    },
                    None => Expr::Port {
                        path: path.clone(),
                        locator,
                    },
                })
            }
            Token::LParen => {
                let inner = self.expression(1)?;
                self.expect(&Token::RParen, "to close '('")?;
                Ok(inner)
            }
            Token::LBrace => self.array_literal(),
            other => Err(ParseError::Syntax(format!("unexpected {:?}", other))),
        }
    }

    /// The opening brace has been consumed. The array is an integer array
    /// when every element is an integer, a float array otherwise.
    fn array_literal(&mut self) -> Result<Expr, ParseError> {
        let mut integers = Vec::new();
        let mut floats = Vec::new();
        let mut all_integers = true;

        if let Some(Token::RBrace) = self.peek() {
            self.pos += 1;
            return Ok(Expr::Literal(Value::IntegerArray(Vec::new())));
        }

        loop {
            match self.next() {
                Some(Token::Integer(v)) => {
                    integers.push(*v);
                    floats.push(*v as f64);
                }
                Some(Token::Float(v)) => {
                    all_integers = false;
                    floats.push(*v);
                }
                other => {
                    return Err(ParseError::Syntax(format!(
                        "expected a number in array literal, found {:?}",
                        other
                    )));
                }
            }
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RBrace) => break,
                other => {
                    return Err(ParseError::Syntax(format!(
                        "expected ',' or '}}' in array literal, found {:?}",
                        other
                    )));
                }
            }
        }

        Ok(Expr::Literal(if all_integers {
            Value::IntegerArray(integers)
        } else {
            Value::FloatArray(floats)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortId;
    use crate::rules::lexer::tokenize;

    /// Knows the variable `v` and every path ending in `.out`.
    struct TestScope;

    impl Scope for TestScope {
        fn is_variable(&self, name: &str) -> bool {
            name == "v"
        }

        fn locate_port(&self, path: &str) -> Option<PortLocator> {
            path.ends_with(".out").then(|| PortLocator {
                route: vec![0],
                port: PortId::output(0),
            })
        }
    }

    fn parse_str(source: &str) -> Result<Expr, ParseError> {
        parse(&tokenize(source).unwrap(), &TestScope)
    }

    fn lit(v: i64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Integer(v)))
    }

    #[test]
    fn test_multiplication_binds_tighter() {
        assert_eq!(
            parse_str("2+3*4").unwrap(),
            Expr::Binary {
                op: BinaryOp::Add,
                left: lit(2),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: lit(3),
                    right: lit(4),
                }),
            }
        );
    }

    #[test]
    fn test_same_tier_is_left_associative() {
        assert_eq!(
            parse_str("8-4-2").unwrap(),
            Expr::Binary {
                op: BinaryOp::Sub,
                left: Box::new(Expr::Binary {
                    op: BinaryOp::Sub,
                    left: lit(8),
                    right: lit(4),
                }),
                right: lit(2),
            }
        );
    }

    #[test]
    fn test_parentheses_override() {
        let expr = parse_str("(2+3)*4").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_aggregate_binds_tightest() {
        let expr = parse_str("sum a.out[0:2] * 2").unwrap();
        match expr {
            Expr::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::Mul);
                assert!(matches!(*left, Expr::Aggregate { function: Aggregate::Sum, .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_array_literal_kinds() {
        assert_eq!(
            parse_str("{1,2,3}").unwrap(),
            Expr::Literal(Value::IntegerArray(vec![1, 2, 3]))
        );
        assert_eq!(
            parse_str("{1,2.5}").unwrap(),
            Expr::Literal(Value::FloatArray(vec![1.0, 2.5]))
        );
        assert!(parse_str("{1,}").is_err());
    }

    #[test]
    fn test_names_are_resolved() {
        assert_eq!(parse_str("v").unwrap(), Expr::Var("v".into()));
        assert_eq!(parse_str("true").unwrap(), Expr::Literal(Value::Boolean(true)));
        assert_eq!(parse_str("w + 1"), Err(ParseError::UnknownName("w".into())));
        assert_eq!(
            parse_str("a.in == 1"),
            Err(ParseError::UnresolvedPort("a.in".into()))
        );
        assert_eq!(parse_str("v + a.out").unwrap().variables(), vec!["v"]);
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(parse_str("1 +"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse_str("(1 + 2"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse_str("1 2"), Err(ParseError::Syntax(_))));
        assert!(matches!(parse_str(""), Err(ParseError::Syntax(_))));
    }
}
