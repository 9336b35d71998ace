//! Expression evaluation.
//!
//! Evaluation is pluggable through [`Evaluate`]; [`EvalContext`] is the
//! built-in implementation backed by named values, probe readings and the
//! usual physical constants. Anything it cannot resolve (an unknown name,
//! probe or function) evaluates to [`Evaluation::Unresolved`] rather than
//! an error, so callers can leave such expressions symbolic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::functions::eval_function;

/// A scalar or a vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Real(f64),
    Vector(Vec<f64>),
}

impl Value {
    /// Scalar view: a vector reads as its first element, an empty one as 0.
    pub fn as_real(&self) -> f64 {
        match self {
            Value::Real(v) => *v,
            Value::Vector(v) => v.first().copied().unwrap_or(0.0),
        }
    }

    pub fn elements(&self) -> &[f64] {
        match self {
            Value::Real(v) => std::slice::from_ref(v),
            Value::Vector(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.elements().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Real(v) => Value::Real(f(*v)),
            Value::Vector(v) => Value::Vector(v.iter().copied().map(f).collect()),
        }
    }

    /// Combine elementwise; a scalar is broadcast against a vector.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> Result<Value, EvalError> {
        Ok(match (self, other) {
            (Value::Real(a), Value::Real(b)) => Value::Real(f(*a, *b)),
            (Value::Real(a), Value::Vector(b)) => {
                Value::Vector(b.iter().map(|&y| f(*a, y)).collect())
            }
            (Value::Vector(a), Value::Real(b)) => {
                Value::Vector(a.iter().map(|&x| f(x, *b)).collect())
            }
            (Value::Vector(a), Value::Vector(b)) => {
                if a.len() != b.len() {
                    return Err(EvalError::LengthMismatch(a.len(), b.len()));
                }
                Value::Vector(a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect())
            }
        })
    }

    fn truthy(&self) -> bool {
        self.as_real() != 0.0
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

/// Outcome of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Resolved(Value),
    /// The expression references something the evaluator does not know.
    Unresolved,
}

impl Evaluation {
    /// Scalar result, if resolved.
    pub fn real(&self) -> Option<f64> {
        match self {
            Evaluation::Resolved(v) => Some(v.as_real()),
            Evaluation::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Evaluation::Resolved(_))
    }
}

/// Something that can fold an expression tree to a value.
pub trait Evaluate {
    fn evaluate(&self, expr: &Expr) -> Result<Evaluation, EvalError>;
}

/// Built-in constants, looked up case-insensitively.
pub fn constant(name: &str) -> Option<f64> {
    let value = match name.to_ascii_lowercase().as_str() {
        "pi" => std::f64::consts::PI,
        "e" => std::f64::consts::E,
        "c" => 299_792_458.0,
        "kelvin" => -273.15,
        "echarge" => 1.602_176_634e-19,
        "boltz" => 1.380_649e-23,
        "planck" => 6.626_070_15e-34,
        "yes" | "true" => 1.0,
        "no" | "false" => 0.0,
        _ => return None,
    };
    Some(value)
}

/// Context for expression evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Named values by uppercase name, including probe readings such as
    /// `V(OUT)` and the simulation time `TIME`.
    values: HashMap<String, Value>,
}

impl EvalContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a named scalar.
    pub fn set_real(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_uppercase(), Value::Real(value));
    }

    /// Set a named vector.
    pub fn set_vector(&mut self, name: &str, values: Vec<f64>) {
        self.values.insert(name.to_uppercase(), Value::Vector(values));
    }

    /// Set a node voltage, read back through `v(node)`.
    pub fn set_voltage(&mut self, node: &str, voltage: f64) {
        self.values
            .insert(format!("V({})", node.to_uppercase()), Value::Real(voltage));
    }

    /// Set a branch current, read back through `i(source)`.
    pub fn set_current(&mut self, source: &str, current: f64) {
        self.values
            .insert(format!("I({})", source.to_uppercase()), Value::Real(current));
    }

    /// Set the simulation time.
    pub fn set_time(&mut self, time: f64) {
        self.set_real("time", time);
    }

    /// Look up a name: user values first, then constants.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.values
            .get(&name.to_uppercase())
            .cloned()
            .or_else(|| constant(name).map(Value::Real))
    }

    fn probe(&self, func: &str, args: &[Expr]) -> Option<Value> {
        let nodes: Vec<String> = args
            .iter()
            .map(|a| match a {
                Expr::Str(s) | Expr::Name(s) => s.to_uppercase(),
                other => other.to_string().to_uppercase(),
            })
            .collect();
        let func = func.to_uppercase();
        let key = format!("{}({})", func, nodes.join(","));
        if let Some(v) = self.values.get(&key) {
            return Some(v.clone());
        }
        // v(a, b) falls back to v(a) - v(b).
        if func == "V" && nodes.len() == 2 {
            let a = self.values.get(&format!("V({})", nodes[0]))?;
            let b = self.values.get(&format!("V({})", nodes[1]))?;
            return a.zip_with(b, |x, y| x - y).ok();
        }
        None
    }

    fn eval(&self, expr: &Expr) -> Result<Option<Value>, EvalError> {
        Ok(match expr {
            Expr::Number(v) => Some(Value::Real(*v)),
            Expr::Name(name) => self.get(name),
            Expr::Str(s) => {
                return Err(EvalError::Unsupported(format!("string \"{s}\"")));
            }
            Expr::Unary { op, operand } => {
                let Some(v) = self.eval(operand)? else {
                    return Ok(None);
                };
                Some(match op {
                    UnaryOp::Neg => v.map(|x| -x),
                    UnaryOp::Not => v.map(|x| if x == 0.0 { 1.0 } else { 0.0 }),
                })
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right)?,
            Expr::Call { func, args } if expr.is_probe() => self.probe(func, args),
            Expr::Call { func, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let Some(v) = self.eval(arg)? else {
                        return Ok(None);
                    };
                    values.push(v);
                }
                eval_function(func, &values)?
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let Some(c) = self.eval(cond)? else {
                    return Ok(None);
                };
                if c.truthy() {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }
        })
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Option<Value>, EvalError> {
        match op {
            BinaryOp::Comma => {
                return Err(EvalError::Unsupported("comma outside a call".to_string()));
            }
            BinaryOp::Range => return self.eval_range(left, right),
            _ => {}
        }

        let Some(l) = self.eval(left)? else {
            return Ok(None);
        };
        let Some(r) = self.eval(right)? else {
            return Ok(None);
        };

        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let value = match op {
            BinaryOp::Add => l.zip_with(&r, |a, b| a + b)?,
            BinaryOp::Sub => l.zip_with(&r, |a, b| a - b)?,
            BinaryOp::Mul => l.zip_with(&r, |a, b| a * b)?,
            BinaryOp::Div | BinaryOp::Mod => {
                if r.elements().contains(&0.0) {
                    return Err(EvalError::DivideByZero);
                }
                if op == BinaryOp::Div {
                    l.zip_with(&r, |a, b| a / b)?
                } else {
                    l.zip_with(&r, |a, b| a % b)?
                }
            }
            BinaryOp::Pow => l.zip_with(&r, f64::powf)?,
            BinaryOp::Eq => l.zip_with(&r, |a, b| flag(a == b))?,
            BinaryOp::Ne => l.zip_with(&r, |a, b| flag(a != b))?,
            BinaryOp::Gt => l.zip_with(&r, |a, b| flag(a > b))?,
            BinaryOp::Lt => l.zip_with(&r, |a, b| flag(a < b))?,
            BinaryOp::Ge => l.zip_with(&r, |a, b| flag(a >= b))?,
            BinaryOp::Le => l.zip_with(&r, |a, b| flag(a <= b))?,
            BinaryOp::And => l.zip_with(&r, |a, b| flag(a != 0.0 && b != 0.0))?,
            BinaryOp::Or => l.zip_with(&r, |a, b| flag(a != 0.0 || b != 0.0))?,
            BinaryOp::Index => {
                let i = index(r.as_real(), l.len())?;
                Value::Real(l.elements()[i])
            }
            BinaryOp::Range | BinaryOp::Comma => {
                return Err(EvalError::Unsupported(format!("{op:?} operands")));
            }
        };
        Ok(Some(value))
    }

    /// `v[[lo, hi]]`: elements `lo..=hi`, reversed when `lo > hi`.
    fn eval_range(&self, left: &Expr, right: &Expr) -> Result<Option<Value>, EvalError> {
        let (lo_expr, hi_expr) = match right {
            Expr::Binary {
                op: BinaryOp::Comma,
                left,
                right,
            } => (left.as_ref(), right.as_ref()),
            single => (single, single),
        };
        let Some(v) = self.eval(left)? else {
            return Ok(None);
        };
        let Some(lo) = self.eval(lo_expr)? else {
            return Ok(None);
        };
        let Some(hi) = self.eval(hi_expr)? else {
            return Ok(None);
        };
        let lo = index(lo.as_real(), v.len())?;
        let hi = index(hi.as_real(), v.len())?;
        let elements = v.elements();
        let slice: Vec<f64> = if lo <= hi {
            elements[lo..=hi].to_vec()
        } else {
            elements[hi..=lo].iter().rev().copied().collect()
        };
        Ok(Some(Value::Vector(slice)))
    }
}

/// Validate a 0-based index; fractions truncate.
fn index(i: f64, len: usize) -> Result<usize, EvalError> {
    let t = i.trunc();
    if t < 0.0 || t >= len as f64 || t.is_nan() {
        return Err(EvalError::Index { index: i, len });
    }
    Ok(t as usize)
}

impl Evaluate for EvalContext {
    fn evaluate(&self, expr: &Expr) -> Result<Evaluation, EvalError> {
        let result = self.eval(expr)?;
        log::debug!("evaluate {} -> {:?}", expr, result);
        Ok(match result {
            Some(v) => Evaluation::Resolved(v),
            None => Evaluation::Unresolved,
        })
    }
}
