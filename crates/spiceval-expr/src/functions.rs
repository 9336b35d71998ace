//! Built-in function evaluation.

use crate::error::EvalError;
use crate::eval::Value;

/// Longest vector `vector(n)` may build.
pub const MAX_VECTOR_LEN: usize = 1 << 20;

/// Evaluate a built-in function.
///
/// Scalar functions apply elementwise when their first argument is a
/// vector. Returns `Ok(None)` when `name` is not a built-in.
pub fn eval_function(name: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    let name_upper = name.to_uppercase();
    let value = match name_upper.as_str() {
        // Reductions over every element of every argument
        "MIN" => reduce(&name_upper, args, f64::INFINITY, f64::min)?,
        "MAX" => reduce(&name_upper, args, f64::NEG_INFINITY, f64::max)?,
        "SUM" => reduce(&name_upper, args, 0.0, |a, b| a + b)?,
        "MEAN" | "AVG" => {
            let n: usize = args.iter().map(Value::len).sum();
            if n == 0 {
                return Err(bad_argument(&name_upper, "no elements"));
            }
            let total = reduce(&name_upper, args, 0.0, |a, b| a + b)?;
            Value::Real(total.as_real() / n as f64)
        }
        "LENGTH" => Value::Real(first(&name_upper, args)?.len() as f64),
        "VECTOR" => {
            let n = first(&name_upper, args)?.as_real();
            if !(n >= 0.0) {
                return Err(bad_argument(&name_upper, "length must be non-negative"));
            }
            if n > MAX_VECTOR_LEN as f64 {
                return Err(bad_argument(
                    &name_upper,
                    &format!("length exceeds {MAX_VECTOR_LEN}"),
                ));
            }
            Value::Vector((0..n as usize).map(|i| i as f64).collect())
        }

        // Two-argument functions
        "ATAN2" => binary(&name_upper, args, f64::atan2)?,
        "POW" | "PWR" => binary(&name_upper, args, f64::powf)?,
        "LIMIT" => {
            // limit(x, lo, hi) clamps x to [lo, hi]
            let lo = arg_real(&name_upper, args, 1)?;
            let hi = arg_real(&name_upper, args, 2)?;
            if lo > hi {
                return Err(bad_argument(&name_upper, "lower bound exceeds upper bound"));
            }
            first(&name_upper, args)?.map(|x| x.clamp(lo, hi))
        }
        "IF" => {
            // if(cond, then, else)
            let cond = arg_real(&name_upper, args, 0)?;
            let then_val = arg(&name_upper, args, 1)?;
            let else_val = arg(&name_upper, args, 2)?;
            if cond != 0.0 { then_val.clone() } else { else_val.clone() }
        }

        _ => match unary_function(&name_upper) {
            Some(f) => first(&name_upper, args)?.map(f),
            None => return Ok(None),
        },
    };
    Ok(Some(value))
}

/// Single-argument functions, applied elementwise.
fn unary_function(name_upper: &str) -> Option<fn(f64) -> f64> {
    let f: fn(f64) -> f64 = match name_upper {
        // Trigonometric
        "SIN" => f64::sin,
        "COS" => f64::cos,
        "TAN" => f64::tan,
        "ASIN" => f64::asin,
        "ACOS" => f64::acos,
        "ATAN" => f64::atan,
        "SINH" => f64::sinh,
        "COSH" => f64::cosh,
        "TANH" => f64::tanh,

        // Exponential/logarithmic
        "EXP" => f64::exp,
        "LOG" | "LN" => |x| if x > 0.0 { x.ln() } else { -1e30 },
        "LOG10" => |x| if x > 0.0 { x.log10() } else { -1e30 },
        "DB" => |x| {
            let m = x.abs();
            if m > 0.0 { 20.0 * m.log10() } else { -1e30 }
        },
        "SQRT" => |x| if x >= 0.0 { x.sqrt() } else { 0.0 },

        // Absolute value and sign
        "ABS" | "MAG" => f64::abs,
        "SGN" | "SIGN" => |x| {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        },

        // u(x) = 0 for x < 0, 1 for x >= 0
        "U" | "STEP" => |x| if x >= 0.0 { 1.0 } else { 0.0 },
        // uramp(x) = 0 for x < 0, x for x >= 0
        "URAMP" => |x| if x >= 0.0 { x } else { 0.0 },

        "FLOOR" => f64::floor,
        "CEIL" => f64::ceil,
        "ROUND" => f64::round,
        "INT" => f64::trunc,
        _ => return None,
    };
    Some(f)
}

fn bad_argument(function: &str, message: &str) -> EvalError {
    EvalError::BadArgument {
        function: function.to_lowercase(),
        message: message.to_string(),
    }
}

fn arg<'a>(name: &str, args: &'a [Value], index: usize) -> Result<&'a Value, EvalError> {
    args.get(index)
        .ok_or_else(|| bad_argument(name, &format!("missing argument {}", index + 1)))
}

fn first<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, EvalError> {
    arg(name, args, 0)
}

fn arg_real(name: &str, args: &[Value], index: usize) -> Result<f64, EvalError> {
    Ok(arg(name, args, index)?.as_real())
}

fn binary(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    let a = arg(name, args, 0)?;
    let b = arg(name, args, 1)?;
    a.zip_with(b, f)
}

fn reduce(name: &str, args: &[Value], init: f64, f: fn(f64, f64) -> f64) -> Result<Value, EvalError> {
    if args.is_empty() {
        return Err(bad_argument(name, "no arguments"));
    }
    let total = args
        .iter()
        .flat_map(|a| a.elements().iter().copied())
        .fold(init, f);
    Ok(Value::Real(total))
}
