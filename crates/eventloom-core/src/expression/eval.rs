//! Evaluator for inline expressions
//!
//! Values are JSON values. Input fields evaluate to strings (or `null` when
//! the column is absent). `+` concatenates as soon as either side is a
//! string; the other arithmetic operators accept numbers and numeric strings.
//! `null` propagates through arithmetic and string functions, so
//! `input['x'] + '!' ?? 'none'` falls back when `x` is missing.

use serde_json::{Number, Value};

use super::{BinaryOp, Expr, ExprError, Function, UnaryOp};
use crate::format::{format_timestamp, parse_bool, parse_float, parse_timestamp};
use crate::record::InputRecord;

type Result<T> = std::result::Result<T, ExprError>;

/// Numeric view of a value
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(n) => n,
        }
    }
}

/// Evaluate an expression against an input record
pub fn evaluate(expr: &Expr, input: &InputRecord) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Field(name) => Ok(input
            .get(name)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null)),

        Expr::Unary { op, expr } => {
            let value = evaluate(expr, input)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!is_truthy(&value))),
                UnaryOp::Neg => match value {
                    Value::Null => Ok(Value::Null),
                    other => match to_num(&other)? {
                        Num::Int(n) => n
                            .checked_neg()
                            .map(Value::from)
                            .ok_or_else(|| ExprError::eval("integer overflow")),
                        Num::Float(n) => float_value(-n),
                    },
                },
            }
        }

        Expr::Binary { left, op, right } => match op {
            BinaryOp::And => {
                let l = evaluate(left, input)?;
                if !is_truthy(&l) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(is_truthy(&evaluate(right, input)?)))
            }
            BinaryOp::Or => {
                let l = evaluate(left, input)?;
                if is_truthy(&l) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(is_truthy(&evaluate(right, input)?)))
            }
            _ => {
                let l = evaluate(left, input)?;
                let r = evaluate(right, input)?;
                eval_binary(&l, *op, &r)
            }
        },

        Expr::Ternary {
            condition,
            then_expr,
            else_expr,
        } => {
            if is_truthy(&evaluate(condition, input)?) {
                evaluate(then_expr, input)
            } else {
                evaluate(else_expr, input)
            }
        }

        Expr::Coalesce(exprs) => {
            for e in exprs {
                let value = evaluate(e, input)?;
                if !value.is_null() {
                    return Ok(value);
                }
            }
            Ok(Value::Null)
        }

        Expr::Call { func, args } => {
            let values = args
                .iter()
                .map(|a| evaluate(a, input))
                .collect::<Result<Vec<_>>>()?;
            call(*func, &values)
        }
    }
}

fn eval_binary(left: &Value, op: BinaryOp, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            compare(left, op, right).map(Value::Bool)
        }
        BinaryOp::Add if left.is_string() || right.is_string() => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            Ok(Value::String(format!(
                "{}{}",
                to_display(left),
                to_display(right)
            )))
        }
        _ => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            arithmetic(to_num(left)?, op, to_num(right)?)
        }
    }
}

fn arithmetic(left: Num, op: BinaryOp, right: Num) -> Result<Value> {
    if let (Num::Int(a), Num::Int(b)) = (left, right) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div | BinaryOp::Rem if b == 0 => {
                return Err(ExprError::eval("division by zero"));
            }
            BinaryOp::Rem => a.checked_rem(b),
            // Inexact integer division yields a float
            BinaryOp::Div if a.checked_rem(b).is_some_and(|r| r != 0) => {
                return float_value(a as f64 / b as f64);
            }
            BinaryOp::Div => a.checked_div(b),
            _ => return Err(ExprError::eval(format!("'{}' is not arithmetic", op))),
        };
        return result
            .map(Value::from)
            .ok_or_else(|| ExprError::eval("integer overflow"));
    }

    let (a, b) = (left.as_f64(), right.as_f64());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => {
            return Err(ExprError::eval("division by zero"));
        }
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => return Err(ExprError::eval(format!("'{}' is not arithmetic", op))),
    };
    float_value(result)
}

fn values_equal(left: &Value, right: &Value) -> bool {
    if left.is_number() || right.is_number() {
        if let (Ok(a), Ok(b)) = (to_num(left), to_num(right)) {
            return match (a, b) {
                (Num::Int(a), Num::Int(b)) => a == b,
                (a, b) => a.as_f64() == b.as_f64(),
            };
        }
    }
    left == right
}

fn compare(left: &Value, op: BinaryOp, right: &Value) -> Result<bool> {
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Null, _) | (_, Value::Null) => return Ok(false),
        _ => {
            let (a, b) = (to_num(left)?.as_f64(), to_num(right)?.as_f64());
            a.partial_cmp(&b)
                .ok_or_else(|| ExprError::eval("values cannot be ordered"))?
        }
    };
    Ok(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    })
}

fn call(func: Function, args: &[Value]) -> Result<Value> {
    let Some(arg) = args.first() else {
        return Err(ExprError::eval(format!("{}() needs an argument", func.name())));
    };

    match func {
        Function::Concat => Ok(Value::String(args.iter().map(to_display).collect())),
        Function::Len => Ok(Value::from(to_display(arg).chars().count() as i64)),
        _ if arg.is_null() => Ok(Value::Null),
        Function::Str => Ok(Value::String(to_display(arg))),
        Function::Upper => Ok(Value::String(to_display(arg).to_uppercase())),
        Function::Lower => Ok(Value::String(to_display(arg).to_lowercase())),
        Function::Trim => Ok(Value::String(to_display(arg).trim().to_string())),
        Function::Int => match to_num(arg)? {
            Num::Int(n) => Ok(Value::from(n)),
            Num::Float(n) if n.is_finite() && n.abs() < i64::MAX as f64 => {
                Ok(Value::from(n.trunc() as i64))
            }
            Num::Float(n) => Err(ExprError::eval(format!("{} does not fit an integer", n))),
        },
        Function::Float => float_value(to_num(arg)?.as_f64()),
        Function::Bool => match arg {
            Value::String(s) => parse_bool(s).map(Value::Bool).map_err(ExprError::eval),
            other => Ok(Value::Bool(is_truthy(other))),
        },
        Function::Timestamp => {
            let pattern = match args.get(1) {
                Some(Value::String(p)) => Some(p.as_str()),
                Some(other) => {
                    return Err(ExprError::eval(format!(
                        "timestamp pattern must be a string, got {}",
                        type_name(other)
                    )));
                }
                None => None,
            };
            parse_timestamp(&to_display(arg), pattern)
                .map(|dt| Value::String(format_timestamp(&dt)))
                .map_err(|e| ExprError::eval(format!("timestamp(): {}", e)))
        }
    }
}

fn to_num(value: &Value) -> Result<Num> {
    match value {
        Value::Number(n) => Ok(number_to_num(n)),
        Value::Bool(b) => Ok(Num::Int(i64::from(*b))),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Num::Int(n));
            }
            match parse_float(trimmed) {
                Ok(Value::Number(n)) => Ok(number_to_num(&n)),
                _ => Err(ExprError::eval(format!("'{}' is not a number", s))),
            }
        }
        other => Err(ExprError::eval(format!(
            "{} cannot be used as a number",
            type_name(other)
        ))),
    }
}

fn number_to_num(n: &Number) -> Num {
    match n.as_i64() {
        Some(i) => Num::Int(i),
        None => Num::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn float_value(n: f64) -> Result<Value> {
    Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| ExprError::eval("result is not a finite number"))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
