//! Runtime invariant checks over live port values.
//!
//! A [`RulesConfig`] names variables and rules written in a small expression
//! language. [`RuleEvaluator::new`] compiles every expression once against
//! the model tree, resolving each port path to a [`PortLocator`]. After
//! that, [`RuleEvaluator::check_rules`] runs once per simulation cycle
//! against any [`PortSource`].
//!
//! # Expression Language
//!
//! | Form | Example |
//! |------|---------|
//! | Numbers and booleans | `3`, `-2.5`, `true` |
//! | Literal arrays | `{1,2,3}` |
//! | Port values | `top.proc.out` |
//! | Slices | `top.proc.out[0:3]` |
//! | Aggregates | `sum top.proc.out[0:3]`, `max(v)` |
//! | Arithmetic | `+ - * / %` |
//! | Comparison and logic | `== != < <= > >= && \|\|` |
//! | Variables | any name declared earlier under `vars` |
//!
//! # Failure Modes
//!
//! Problems found while compiling are fatal and name the offending item.
//! Problems found while evaluating only skip that item for the current
//! cycle. An empty port is logged at `debug`, anything else (mismatched
//! types, bad slices) at `warn`. A true `error` rule stops the run.
//!
//! Integer literals widen to floats when mixed with float values, arrays
//! included, so `{1,2} == {1.0,2.0}` holds. A `-` directly before a number
//! is part of the literal unless it follows an operand: `x > -1` compares
//! against minus one, `x -1` subtracts.

pub mod lexer;
pub mod parser;
pub mod value;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RulesConfig, Severity};
use crate::coupled::{Coupled, PortLocator, PortSource};
use crate::event::Value;

pub use lexer::{tokenize, LexError, Token};
pub use parser::{parse, Expr, ParseError, Scope};
pub use value::{apply_binary, Aggregate, BinaryOp, EvalError};

/// Errors raised while compiling or checking rules.
#[derive(Error, Debug)]
pub enum RuleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown token '{token}' in '{item}'")]
    UnknownToken { item: String, token: String },

    #[error("port '{path}' in '{item}' does not exist")]
    UnresolvedPort { item: String, path: String },

    #[error("syntax error in '{item}': {message}")]
    Syntax { item: String, message: String },

    #[error("cannot evaluate '{item}': {source}")]
    Evaluation {
        item: String,
        #[source]
        source: EvalError,
    },

    #[error("rule '{rule}' violated: {expr}")]
    Violation { rule: String, expr: String },
}

/// What one call to [`RuleEvaluator::check_rules`] observed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RuleReport {
    /// Info rules that evaluated to `true`
    pub triggered: Vec<String>,
    /// Variables and rules that could not be evaluated this cycle
    pub skipped: Vec<String>,
}

#[derive(Debug)]
struct CompiledRule {
    source: String,
    expr: Expr,
    severity: Severity,
}

#[derive(Debug)]
struct CompiledVar {
    expr: Expr,
}

/// Compiled variables and rules plus the per-cycle variable cache.
#[derive(Debug, Default)]
pub struct RuleEvaluator {
    vars: IndexMap<String, CompiledVar>,
    rules: IndexMap<String, CompiledRule>,
    values: IndexMap<String, Value>,
}

/// Name lookup while compiling: the variables declared so far and the
/// ports of the model tree.
struct CompileScope<'m> {
    model: Option<&'m Coupled>,
    visible: &'m [&'m str],
}

impl Scope for CompileScope<'_> {
    fn is_variable(&self, name: &str) -> bool {
        self.visible.contains(&name)
    }

    fn locate_port(&self, path: &str) -> Option<PortLocator> {
        self.model?.locate_port(path)
    }
}

fn compile(source: &str, item: &str, scope: &dyn Scope) -> Result<Expr, RuleError> {
    let tokens = tokenize(source).map_err(|e| RuleError::UnknownToken {
        item: item.to_string(),
        token: e.token,
    })?;
    parse(&tokens, scope).map_err(|e| match e {
        ParseError::UnknownName(token) => RuleError::UnknownToken {
            item: item.to_string(),
            token,
        },
        ParseError::UnresolvedPort(path) => RuleError::UnresolvedPort {
            item: item.to_string(),
            path,
        },
        ParseError::Syntax(message) => RuleError::Syntax {
            item: item.to_string(),
            message,
        },
    })
}

impl RuleEvaluator {
    /// Validates the document and compiles every expression against `model`.
    pub fn new(config: &RulesConfig, model: &Coupled) -> Result<Self, RuleError> {
        config.validate()?;

        let mut declared: Vec<&str> = Vec::with_capacity(config.vars.len());
        let mut vars = IndexMap::with_capacity(config.vars.len());
        for (name, source) in &config.vars {
            let scope = CompileScope {
                model: Some(model),
                visible: &declared,
            };
            let expr = compile(source, name, &scope)?;
            vars.insert(name.clone(), CompiledVar { expr });
            declared.push(name);
        }

        let mut rules = IndexMap::new();
        let scope = CompileScope {
            model: Some(model),
            visible: &declared,
        };
        for (name, spec) in config.rules.iter().flatten() {
            // validate() guarantees both fields
            let (Some(source), Some(severity)) = (spec.expr.as_ref(), spec.severity()) else {
                continue;
            };
            let expr = compile(source, name, &scope)?;
            rules.insert(
                name.clone(),
                CompiledRule {
                    source: source.clone(),
                    expr,
                    severity,
                },
            );
        }

        debug!(vars = vars.len(), rules = rules.len(), "compiled rule document");
        Ok(Self {
            vars,
            rules,
            values: IndexMap::new(),
        })
    }

    pub fn has_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// The value a variable took in the most recent cycle, if it could be
    /// evaluated.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Evaluates every variable, then every rule, in document order.
    ///
    /// Returns [`RuleError::Violation`] for the first `error` rule that
    /// holds; later rules are not evaluated in that cycle.
    pub fn check_rules<P: PortSource + ?Sized>(&mut self, ports: &P) -> Result<RuleReport, RuleError> {
        let mut report = RuleReport::default();
        if !self.has_rules() {
            return Ok(report);
        }

        self.values.clear();
        for (name, var) in &self.vars {
            match evaluate(&var.expr, ports, &self.values) {
                Ok(value) => {
                    self.values.insert(name.clone(), value);
                }
                Err(err) if err.is_transient() => {
                    debug!(variable = %name, error = %err, "variable skipped");
                    report.skipped.push(name.clone());
                }
                Err(err) => {
                    warn!(variable = %name, error = %err, "variable skipped");
                    report.skipped.push(name.clone());
                }
            }
        }

        for (name, rule) in &self.rules {
            let holds = match evaluate(&rule.expr, ports, &self.values) {
                Ok(Value::Boolean(holds)) => holds,
                Ok(other) => {
                    warn!(rule = %name, kind = %other.kind(), "rule did not produce a boolean");
                    report.skipped.push(name.clone());
                    continue;
                }
                Err(err) if err.is_transient() => {
                    debug!(rule = %name, error = %err, "rule skipped");
                    report.skipped.push(name.clone());
                    continue;
                }
                Err(err) => {
                    warn!(rule = %name, error = %err, "rule skipped");
                    report.skipped.push(name.clone());
                    continue;
                }
            };

            if !holds {
                continue;
            }
            match rule.severity {
                Severity::Info => {
                    info!(rule = %name, expr = %rule.source, "rule triggered");
                    report.triggered.push(name.clone());
                }
                Severity::Error => {
                    return Err(RuleError::Violation {
                        rule: name.clone(),
                        expr: rule.source.clone(),
                    });
                }
            }
        }

        Ok(report)
    }
}

/// Compiles and evaluates an expression that reads no ports and no
/// variables.
pub fn evaluate_constant(source: &str) -> Result<Value, RuleError> {
    let scope = CompileScope {
        model: None,
        visible: &[],
    };
    let expr = compile(source, source, &scope)?;
    evaluate(&expr, &NoPorts, &IndexMap::new()).map_err(|source_err| RuleError::Evaluation {
        item: source.to_string(),
        source: source_err,
    })
}

struct NoPorts;

impl PortSource for NoPorts {
    fn port_at(&self, _locator: &PortLocator) -> Option<&crate::port::Port> {
        None
    }
}

/// Evaluates a compiled expression against live ports and the variables
/// computed so far this cycle.
pub fn evaluate<P: PortSource + ?Sized>(
    expr: &Expr,
    ports: &P,
    vars: &IndexMap<String, Value>,
) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(name) => vars
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnavailableVariable(name.clone())),
        Expr::Port { path, locator } => read_port(ports, path, locator).cloned(),
        Expr::Slice {
            path,
            locator,
            start,
            end,
        } => {
            let value = read_port(ports, path, locator)?;
            let len = value.len().ok_or_else(|| EvalError::NotAnArray {
                context: format!("slice of '{}'", path),
                kind: value.kind(),
            })?;
            value.slice(*start, *end).ok_or(EvalError::SliceOutOfRange {
                path: path.clone(),
                start: *start,
                end: *end,
                len,
            })
        }
        Expr::Aggregate { function, operand } => {
            let operand = evaluate(operand, ports, vars)?;
            function.apply(&operand)
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, ports, vars)?;
            match (op, &left) {
                (BinaryOp::And, Value::Boolean(false)) => return Ok(Value::Boolean(false)),
                (BinaryOp::Or, Value::Boolean(true)) => return Ok(Value::Boolean(true)),
                _ => {}
            }
            let right = evaluate(right, ports, vars)?;
            apply_binary(*op, &left, &right)
        }
    }
}

/// The first value on the port this cycle.
fn read_port<'p, P: PortSource + ?Sized>(
    ports: &'p P,
    path: &str,
    locator: &PortLocator,
) -> Result<&'p Value, EvalError> {
    ports
        .port_at(locator)
        .and_then(|port| port.values().first())
        .map(|event| event.value())
        .ok_or_else(|| EvalError::EmptyPort(path.to_string()))
}
