//! Binary and unary operator semantics.
//!
//! Operators are strict about operand kinds: there is no implicit
//! coercion anywhere. `+` is overloaded for numbers and texts; the
//! relational operators work on two numbers or two texts; everything
//! arithmetic wants numbers. Equality is the strict value/identity
//! comparison from [`Value::strict_eq`] and accepts any pair of kinds.
//!
//! Errors produced here carry no span; the machine attaches the
//! operator node's span before surfacing them.

use rill_ir::{BinaryOp, UnaryOp};

use crate::errors::{operand_type, EvalError};
use crate::Value;

/// Apply a binary operator to two evaluated operands.
pub fn evaluate_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => match (lhs, rhs) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Text(a), Value::Text(b)) => {
                let mut joined = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Ok(Value::text(joined))
            }
            _ => Err(mismatch(op, "two numbers or two texts", lhs, rhs)),
        },
        BinaryOp::Sub => numeric(op, lhs, rhs, |a, b| a - b),
        BinaryOp::Mul => numeric(op, lhs, rhs, |a, b| a * b),
        // IEEE semantics: dividing by zero yields an infinity, not an
        // error.
        BinaryOp::Div => numeric(op, lhs, rhs, |a, b| a / b),
        BinaryOp::Rem => numeric(op, lhs, rhs, |a, b| a % b),
        BinaryOp::Eq => Ok(Value::Bool(lhs.strict_eq(rhs))),
        BinaryOp::NotEq => Ok(Value::Bool(!lhs.strict_eq(rhs))),
        BinaryOp::Lt => ordered(op, lhs, rhs, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LtEq => ordered(op, lhs, rhs, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Gt => ordered(op, lhs, rhs, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GtEq => ordered(op, lhs, rhs, |o| o != std::cmp::Ordering::Less),
    }
}

/// Apply a unary operator to an evaluated operand.
pub fn evaluate_unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Neg, other) => Err(operand_type(
            op.symbol(),
            "a number",
            other.type_name().to_owned(),
        )),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Not, other) => Err(operand_type(
            op.symbol(),
            "a boolean",
            other.type_name().to_owned(),
        )),
    }
}

fn numeric(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
    f: impl FnOnce(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(*a, *b))),
        _ => Err(mismatch(op, "two numbers", lhs, rhs)),
    }
}

fn ordered(
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
    f: impl FnOnce(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => {
            // NaN compares false under every ordering.
            Ok(Value::Bool(a.partial_cmp(b).is_some_and(f)))
        }
        (Value::Text(a), Value::Text(b)) => Ok(Value::Bool(f(a.as_ref().cmp(b.as_ref())))),
        _ => Err(mismatch(op, "two numbers or two texts", lhs, rhs)),
    }
}

fn mismatch(op: BinaryOp, expected: &'static str, lhs: &Value, rhs: &Value) -> EvalError {
    operand_type(
        op.symbol(),
        expected,
        format!("{} and {}", lhs.type_name(), rhs.type_name()),
    )
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::errors::EvalErrorKind;

    #[test]
    fn arithmetic_on_numbers() {
        assert_eq!(
            evaluate_binary(BinaryOp::Add, &Value::number(2.0), &Value::number(3.0)).unwrap(),
            Value::number(5.0)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::Rem, &Value::number(7.0), &Value::number(4.0)).unwrap(),
            Value::number(3.0)
        );
    }

    #[test]
    fn add_concatenates_texts() {
        assert_eq!(
            evaluate_binary(BinaryOp::Add, &Value::text("ab"), &Value::text("cd")).unwrap(),
            Value::text("abcd")
        );
    }

    #[test]
    fn add_rejects_mixed_kinds() {
        let err = evaluate_binary(BinaryOp::Add, &Value::number(1.0), &Value::text("x"))
            .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::OperandType { op: "+", .. }));
    }

    #[test]
    fn division_by_zero_is_infinity() {
        let Value::Number(n) =
            evaluate_binary(BinaryOp::Div, &Value::number(1.0), &Value::number(0.0)).unwrap()
        else {
            panic!("expected a number");
        };
        assert!(n.is_infinite());
    }

    #[test]
    fn relational_on_texts_is_lexicographic() {
        assert_eq!(
            evaluate_binary(BinaryOp::Lt, &Value::text("apple"), &Value::text("banana")).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::GtEq, &Value::text("b"), &Value::text("b")).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn relational_rejects_mixed_kinds() {
        let err =
            evaluate_binary(BinaryOp::Lt, &Value::number(1.0), &Value::text("1")).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::OperandType { .. }));
    }

    #[test]
    fn equality_is_strict_across_kinds() {
        assert_eq!(
            evaluate_binary(BinaryOp::Eq, &Value::number(1.0), &Value::Bool(true)).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::NotEq, &Value::Null, &Value::Undefined).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn nan_orders_as_false() {
        let nan = Value::number(f64::NAN);
        assert_eq!(
            evaluate_binary(BinaryOp::Lt, &nan, &Value::number(1.0)).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            evaluate_binary(BinaryOp::GtEq, &nan, &nan).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn unary_negation_and_not() {
        assert_eq!(
            evaluate_unary(UnaryOp::Neg, &Value::number(4.0)).unwrap(),
            Value::number(-4.0)
        );
        assert_eq!(
            evaluate_unary(UnaryOp::Not, &Value::Bool(false)).unwrap(),
            Value::Bool(true)
        );
        let err = evaluate_unary(UnaryOp::Not, &Value::number(0.0)).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::OperandType { op: "!", .. }));
    }
}
