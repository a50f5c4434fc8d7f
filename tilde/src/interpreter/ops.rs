use crate::ast::{AssignOp, BinaryOp, UnaryOp};
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{ScalarType, Value};

pub(crate) fn binary(op: BinaryOp, left: &Value, right: &Value) -> RuntimeResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_binary(op, *a, *b),
        (Value::String(a), Value::String(b)) => match op {
            BinaryOp::Eq => Ok(Value::Bool(a == b)),
            BinaryOp::NotEq => Ok(Value::Bool(a != b)),
            _ => Err(RuntimeError::InvalidOperator {
                op: op.symbol(),
                operand: "string",
            }),
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::And => Ok(Value::Bool(*a && *b)),
            BinaryOp::Or => Ok(Value::Bool(*a || *b)),
            BinaryOp::Eq => Ok(Value::Bool(a == b)),
            BinaryOp::NotEq => Ok(Value::Bool(a != b)),
            _ => Err(RuntimeError::InvalidOperator {
                op: op.symbol(),
                operand: "bool",
            }),
        },
        _ => match (as_float(left), as_float(right)) {
            (Some(a), Some(b)) => float_binary(op, a, b),
            _ => Err(RuntimeError::InvalidOperands {
                left: left.type_name(),
                right: right.type_name(),
            }),
        },
    }
}

pub(crate) fn unary(op: UnaryOp, value: Value) -> RuntimeResult<Value> {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
        (op, value) => Err(RuntimeError::InvalidUnary {
            op: op.symbol(),
            operand: value.type_name(),
        }),
    }
}

/// Converts `value` for storage in a binding of type `ty` (plain `=`).
/// Ints widen into float bindings, floats truncate toward zero into int
/// bindings, everything else must match exactly.
pub(crate) fn coerce(name: &str, ty: ScalarType, value: Value) -> RuntimeResult<Value> {
    match (ty, value) {
        (ScalarType::Int, Value::Int(v)) => Ok(Value::Int(v)),
        (ScalarType::Int, Value::Float(v)) => Ok(Value::Int(v as i64)),
        (ScalarType::Float, Value::Float(v)) => Ok(Value::Float(v)),
        (ScalarType::Float, Value::Int(v)) => Ok(Value::Float(v as f64)),
        (ScalarType::String, Value::String(v)) => Ok(Value::String(v)),
        (ScalarType::Bool, Value::Bool(v)) => Ok(Value::Bool(v)),
        (ty, value) => Err(RuntimeError::TypeMismatch {
            name: name.to_string(),
            expected: ty,
            found: value.type_name(),
        }),
    }
}

/// Computes the new content of binding `name` after `name <op> value`.
pub(crate) fn assign(
    name: &str,
    ty: ScalarType,
    current: Option<&Value>,
    op: AssignOp,
    value: Value,
) -> RuntimeResult<Value> {
    let Some(arith) = op.binary() else {
        return coerce(name, ty, value);
    };
    let Some(current) = current else {
        return Err(RuntimeError::CompoundOnUndefined {
            op: op.symbol(),
            name: name.to_string(),
        });
    };

    match (current, &value) {
        (Value::Int(c), Value::Int(v)) => int_arith(arith, *c, *v).map(Value::Int),
        (Value::Int(c), Value::Float(v)) => {
            float_arith(arith, *c as f64, *v).map(|result| Value::Int(result as i64))
        }
        (Value::Float(c), Value::Int(v)) => float_arith(arith, *c, *v as f64).map(Value::Float),
        (Value::Float(c), Value::Float(v)) => float_arith(arith, *c, *v).map(Value::Float),
        (Value::String(_), Value::String(_)) => Err(RuntimeError::AssignOnly(ScalarType::String)),
        (Value::Bool(_), Value::Bool(_)) => Err(RuntimeError::AssignOnly(ScalarType::Bool)),
        _ => Err(RuntimeError::TypeMismatch {
            name: name.to_string(),
            expected: ty,
            found: value.type_name(),
        }),
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    }
}

fn int_binary(op: BinaryOp, a: i64, b: i64) -> RuntimeResult<Value> {
    if let Some(result) = compare(op, &a, &b) {
        return Ok(Value::Bool(result));
    }
    int_arith(op, a, b).map(Value::Int)
}

fn float_binary(op: BinaryOp, a: f64, b: f64) -> RuntimeResult<Value> {
    if let Some(result) = compare(op, &a, &b) {
        return Ok(Value::Bool(result));
    }
    float_arith(op, a, b).map(Value::Float)
}

fn compare<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> Option<bool> {
    let result = match op {
        BinaryOp::Eq => a == b,
        BinaryOp::NotEq => a != b,
        BinaryOp::Greater => a > b,
        BinaryOp::GreaterEq => a >= b,
        BinaryOp::Less => a < b,
        BinaryOp::LessEq => a <= b,
        _ => return None,
    };
    Some(result)
}

fn int_arith(op: BinaryOp, a: i64, b: i64) -> RuntimeResult<i64> {
    match op {
        BinaryOp::Add => Ok(a.wrapping_add(b)),
        BinaryOp::Sub => Ok(a.wrapping_sub(b)),
        BinaryOp::Mul => Ok(a.wrapping_mul(b)),
        BinaryOp::Div if b == 0 => Err(RuntimeError::DivisionByZero),
        BinaryOp::Div => Ok(a.wrapping_div(b)),
        BinaryOp::Mod if b == 0 => Err(RuntimeError::DivisionByZero),
        BinaryOp::Mod => Ok(a.wrapping_rem(b)),
        _ => Err(RuntimeError::InvalidOperator {
            op: op.symbol(),
            operand: "numeric values",
        }),
    }
}

fn float_arith(op: BinaryOp, a: f64, b: f64) -> RuntimeResult<f64> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Mod => Err(RuntimeError::FloatModulo),
        _ => Err(RuntimeError::InvalidOperator {
            op: op.symbol(),
            operand: "numeric values",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: BinaryOp, left: impl Into<Value>, right: impl Into<Value>) -> RuntimeResult<Value> {
        binary(op, &left.into(), &right.into())
    }

    #[test]
    fn integer_arithmetic_matches_native_semantics() {
        assert_eq!(eval(BinaryOp::Div, 7_i64, 2_i64), Ok(Value::Int(3)));
        assert_eq!(eval(BinaryOp::Div, -7_i64, 2_i64), Ok(Value::Int(-3)));
        assert_eq!(eval(BinaryOp::Mod, -7_i64, 2_i64), Ok(Value::Int(-1)));
        assert_eq!(
            eval(BinaryOp::Add, i64::MAX, 1_i64),
            Ok(Value::Int(i64::MIN))
        );
        assert_eq!(eval(BinaryOp::LessEq, 2_i64, 2_i64), Ok(Value::Bool(true)));
    }

    #[test]
    fn integer_division_by_zero_is_an_error() {
        assert_eq!(
            eval(BinaryOp::Div, 1_i64, 0_i64),
            Err(RuntimeError::DivisionByZero)
        );
        assert_eq!(
            eval(BinaryOp::Mod, 1_i64, 0_i64),
            Err(RuntimeError::DivisionByZero)
        );
    }

    #[test]
    fn mixed_operands_promote_to_float() {
        assert_eq!(eval(BinaryOp::Add, 1_i64, 0.5), Ok(Value::Float(1.5)));
        assert_eq!(eval(BinaryOp::Greater, 2.5, 2_i64), Ok(Value::Bool(true)));
        assert_eq!(
            eval(BinaryOp::Div, 1.0, 0_i64),
            Ok(Value::Float(f64::INFINITY))
        );
    }

    #[test]
    fn float_modulo_is_always_rejected() {
        assert_eq!(eval(BinaryOp::Mod, 4.0, 2.0), Err(RuntimeError::FloatModulo));
        assert_eq!(
            eval(BinaryOp::Mod, 4_i64, 2.0),
            Err(RuntimeError::FloatModulo)
        );
    }

    #[test]
    fn strings_and_bools_support_only_their_operators() {
        assert_eq!(eval(BinaryOp::Eq, "a", "a"), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::NotEq, "a", "b"), Ok(Value::Bool(true)));
        let err = eval(BinaryOp::Add, "a", "b").expect_err("string + should fail");
        assert_eq!(err.to_string(), "'+' operator cannot be applied to string");

        assert_eq!(eval(BinaryOp::Or, false, true), Ok(Value::Bool(true)));
        let err = eval(BinaryOp::Less, false, true).expect_err("bool < should fail");
        assert_eq!(err.to_string(), "'<' operator cannot be applied to bool");
    }

    #[test]
    fn mismatched_operands_report_both_types() {
        let err = eval(BinaryOp::Add, 1_i64, "x").expect_err("int + string should fail");
        assert_eq!(
            err.to_string(),
            "unexpected types in binary: left: int, right: string"
        );
    }

    #[test]
    fn unary_operators() {
        assert_eq!(unary(UnaryOp::Neg, Value::Int(3)), Ok(Value::Int(-3)));
        assert_eq!(unary(UnaryOp::Not, Value::Bool(true)), Ok(Value::Bool(false)));
        let err = unary(UnaryOp::Not, Value::Int(1)).expect_err("not int should fail");
        assert_eq!(err.to_string(), "'not' unary operator cannot be applied to int");
    }

    #[test]
    fn coercion_between_numeric_bindings() {
        assert_eq!(
            coerce("f", ScalarType::Float, Value::Int(3)),
            Ok(Value::Float(3.0))
        );
        assert_eq!(
            coerce("i", ScalarType::Int, Value::Float(-2.7)),
            Ok(Value::Int(-2))
        );
        let err = coerce("s", ScalarType::String, Value::Int(1)).expect_err("should fail");
        assert_eq!(err.to_string(), "variable 's' type error: 'string', 'int'");
    }

    #[test]
    fn compound_assignment_rules() {
        let current = Value::Int(5);
        assert_eq!(
            assign("i", ScalarType::Int, Some(&current), AssignOp::Add, Value::Float(1.5)),
            Ok(Value::Int(6))
        );
        assert_eq!(
            assign("i", ScalarType::Int, Some(&current), AssignOp::Div, Value::Int(0)),
            Err(RuntimeError::DivisionByZero)
        );

        let current = Value::Float(1.0);
        assert_eq!(
            assign("f", ScalarType::Float, Some(&current), AssignOp::Mod, Value::Int(2)),
            Err(RuntimeError::FloatModulo)
        );

        let err = assign("i", ScalarType::Int, None, AssignOp::Sub, Value::Int(1))
            .expect_err("compound on undefined should fail");
        assert_eq!(err.to_string(), "invalid '-=' operator for undefined 'i' variable");

        let current = Value::from("a");
        let err = assign(
            "s",
            ScalarType::String,
            Some(&current),
            AssignOp::Add,
            Value::from("b"),
        )
        .expect_err("string += should fail");
        assert_eq!(err.to_string(), "strings can only get = operator");
    }
}
