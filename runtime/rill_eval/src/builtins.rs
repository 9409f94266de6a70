//! The standard global bindings.
//!
//! Natives use the fixed calling convention: evaluated argument values
//! in, a value or an error out, no access to the machine. The errors
//! they construct carry no span; the machine stamps the call site on.
//!
//! `call_cc`, `amb`, `require`, and `pause` are installed here but
//! intercepted at apply time: they reshape the machine itself and
//! cannot be expressed through the native convention.

use rill_ir::StringInterner;

use crate::environment::Frame;
use crate::errors::{operand_type, user_raised, EvalError};
use crate::value::BuiltinKind;
use crate::Value;

/// Install the standard builtins into `globals` as constants.
pub fn install(globals: &Frame, interner: &StringInterner) {
    let define = |name: &'static str, value: Value| {
        globals.define(interner.intern(name), value, true);
    };

    define("display", Value::native("display", Some(1), display));
    define("error", Value::native("error", Some(1), raise));
    define("stringify", Value::native("stringify", Some(1), stringify));

    define("math_abs", Value::native("math_abs", Some(1), math_abs));
    define("math_floor", Value::native("math_floor", Some(1), math_floor));
    define("math_sqrt", Value::native("math_sqrt", Some(1), math_sqrt));
    define("math_max", Value::native("math_max", None, math_max));
    define("math_min", Value::native("math_min", None, math_min));

    define("pair", Value::native("pair", Some(2), pair));
    define("head", Value::native("head", Some(1), head));
    define("tail", Value::native("tail", Some(1), tail));
    define("is_null", Value::native("is_null", Some(1), is_null));
    define("is_pair", Value::native("is_pair", Some(1), is_pair));
    define("list", Value::native("list", None, list));

    define("call_cc", Value::primitive("call_cc", Some(1), BuiltinKind::CallCc));
    define("amb", Value::primitive("amb", None, BuiltinKind::Amb));
    define("require", Value::primitive("require", Some(1), BuiltinKind::Require));
    define("pause", Value::primitive("pause", Some(0), BuiltinKind::Pause));
}

fn arg(args: &[Value], index: usize) -> Value {
    // Arity was checked by the machine before dispatch.
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn display(args: &[Value]) -> Result<Value, EvalError> {
    let value = arg(args, 0);
    tracing::info!(target: "rill::display", "{value}");
    Ok(value)
}

fn raise(args: &[Value]) -> Result<Value, EvalError> {
    Err(user_raised(arg(args, 0).to_string()))
}

fn stringify(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::text(arg(args, 0).to_string()))
}

fn number_arg(name: &'static str, args: &[Value], index: usize) -> Result<f64, EvalError> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(operand_type(name, "a number", other.type_name().to_owned())),
        None => Err(operand_type(name, "a number", "nothing".to_owned())),
    }
}

fn math_abs(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(number_arg("math_abs", args, 0)?.abs()))
}

fn math_floor(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(number_arg("math_floor", args, 0)?.floor()))
}

fn math_sqrt(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Number(number_arg("math_sqrt", args, 0)?.sqrt()))
}

fn math_max(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("math_max", args, f64::NEG_INFINITY, f64::max)
}

fn math_min(args: &[Value]) -> Result<Value, EvalError> {
    fold_numbers("math_min", args, f64::INFINITY, f64::min)
}

fn fold_numbers(
    name: &'static str,
    args: &[Value],
    init: f64,
    f: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    let mut acc = init;
    for index in 0..args.len() {
        acc = f(acc, number_arg(name, args, index)?);
    }
    Ok(Value::Number(acc))
}

fn pair(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::pair(arg(args, 0), arg(args, 1)))
}

fn head(args: &[Value]) -> Result<Value, EvalError> {
    match args.first() {
        Some(Value::Pair(p)) => Ok(p.0.clone()),
        other => Err(operand_type(
            "head",
            "a pair",
            other.map_or("nothing", |v| v.type_name()).to_owned(),
        )),
    }
}

fn tail(args: &[Value]) -> Result<Value, EvalError> {
    match args.first() {
        Some(Value::Pair(p)) => Ok(p.1.clone()),
        other => Err(operand_type(
            "tail",
            "a pair",
            other.map_or("nothing", |v| v.type_name()).to_owned(),
        )),
    }
}

fn is_null(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args.first(), Some(Value::Null))))
}

fn is_pair(args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(matches!(args.first(), Some(Value::Pair(_)))))
}

fn list(args: &[Value]) -> Result<Value, EvalError> {
    let mut chain = Value::Null;
    for value in args.iter().rev() {
        chain = Value::pair(value.clone(), chain);
    }
    Ok(chain)
}
