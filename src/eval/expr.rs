//! Recursive evaluator for constraint expressions.

use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::error::{BehaviorError, Result};
use crate::event::EventValue;
use crate::eval::Token;

/// Evaluates an expression against the variable bindings of a token.
///
/// Referencing a variable that is absent (or bound to an unresolved value) is
/// an error: constraints are expected to only name variables captured by the
/// same or an always-preceding guard, so an undefined variable indicates a
/// defect in the compiled net rather than a per-event condition.
///
/// `and`/`or` short-circuit: the right operand is not evaluated when the left
/// operand decides the result, which keeps references to not-yet-bound
/// variables legal behind a guard like `flag == 0 or handle > 0`.
pub fn evaluate(expression: &Expression, bindings: &Token) -> Result<EventValue> {
    match expression {
        Expression::Literal(value) => Ok(value.clone()),
        Expression::Variable(name) => match bindings.get(name) {
            Some(value) if !value.is_unresolved() => Ok(value.clone()),
            _ => Err(BehaviorError::UndefinedVariable(name.clone())),
        },
        Expression::Binary { left, op, right } => evaluate_binary(left, *op, right, bindings),
        Expression::Unary { op, operand } => {
            let value = evaluate(operand, bindings)?;
            match op {
                UnaryOp::Neg => Ok(EventValue::UInt(value.as_uint()?.wrapping_neg())),
                UnaryOp::Not => match value {
                    EventValue::Bool(b) => Ok(EventValue::Bool(!b)),
                    other => Ok(EventValue::UInt(!other.as_uint()?)),
                },
            }
        }
        Expression::Range { start, end } => {
            let start = evaluate(start, bindings)?.as_uint()?;
            let end = evaluate(end, bindings)?.as_uint()?;
            Ok(EventValue::Range(start, end))
        }
    }
}

fn evaluate_binary(
    left: &Expression,
    op: BinaryOp,
    right: &Expression,
    bindings: &Token,
) -> Result<EventValue> {
    // Boolean operators first: they must not evaluate the right operand
    // when the left operand already decides the result.
    match op {
        BinaryOp::And => {
            if !evaluate(left, bindings)?.as_bool()? {
                return Ok(EventValue::Bool(false));
            }
            return Ok(EventValue::Bool(evaluate(right, bindings)?.as_bool()?));
        }
        BinaryOp::Or => {
            if evaluate(left, bindings)?.as_bool()? {
                return Ok(EventValue::Bool(true));
            }
            return Ok(EventValue::Bool(evaluate(right, bindings)?.as_bool()?));
        }
        _ => {}
    }

    let lhs = evaluate(left, bindings)?;
    let rhs = evaluate(right, bindings)?;

    let result = match op {
        BinaryOp::Eq => EventValue::Bool(lhs == rhs),
        BinaryOp::Ne => EventValue::Bool(lhs != rhs),
        BinaryOp::Gt => EventValue::Bool(lhs.as_uint()? > rhs.as_uint()?),
        BinaryOp::Ge => EventValue::Bool(lhs.as_uint()? >= rhs.as_uint()?),
        BinaryOp::Lt => EventValue::Bool(lhs.as_uint()? < rhs.as_uint()?),
        BinaryOp::Le => EventValue::Bool(lhs.as_uint()? <= rhs.as_uint()?),
        // Arithmetic wraps in unsigned 64-bit space. Existing behavior
        // definitions rely on subtraction underflow wrapping around.
        BinaryOp::Add => EventValue::UInt(lhs.as_uint()?.wrapping_add(rhs.as_uint()?)),
        BinaryOp::Sub => EventValue::UInt(lhs.as_uint()?.wrapping_sub(rhs.as_uint()?)),
        BinaryOp::Mul => EventValue::UInt(lhs.as_uint()?.wrapping_mul(rhs.as_uint()?)),
        BinaryOp::Div => {
            let divisor = rhs.as_uint()?;
            if divisor == 0 {
                return Err(BehaviorError::DivisionByZero);
            }
            EventValue::UInt(lhs.as_uint()? / divisor)
        }
        BinaryOp::Rem => {
            let divisor = rhs.as_uint()?;
            if divisor == 0 {
                return Err(BehaviorError::DivisionByZero);
            }
            EventValue::UInt(lhs.as_uint()? % divisor)
        }
        BinaryOp::BitAnd => EventValue::UInt(lhs.as_uint()? & rhs.as_uint()?),
        BinaryOp::BitOr => EventValue::UInt(lhs.as_uint()? | rhs.as_uint()?),
        BinaryOp::BitXor => EventValue::UInt(lhs.as_uint()? ^ rhs.as_uint()?),
        BinaryOp::In => evaluate_in(lhs, rhs)?,
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    };

    Ok(result)
}

/// Membership has two disjoint forms: substring containment when the needle
/// is a string, and half-open range inclusion (`start <= needle < end`) when
/// the needle is an integer.
fn evaluate_in(needle: EventValue, haystack: EventValue) -> Result<EventValue> {
    if let EventValue::Str(needle) = &needle {
        return Ok(EventValue::Bool(match &haystack {
            EventValue::Str(haystack) => haystack.contains(needle.as_str()),
            _ => false,
        }));
    }

    let needle = needle.as_uint()?;
    match haystack {
        EventValue::Range(start, end) => Ok(EventValue::Bool(needle >= start && needle < end)),
        other => Err(BehaviorError::InvalidInOperand(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression as E;

    fn expect(expected: impl Into<EventValue>, bindings: &Token, expression: E) {
        assert_eq!(evaluate(&expression, bindings).unwrap(), expected.into());
    }

    #[test]
    fn literal() {
        expect(123u64, &Token::empty(), E::literal(123u64));
    }

    #[test]
    fn existing_variable() {
        let bindings = Token::empty().set("x", 123u64).set("y", 456u64);
        expect(123u64, &bindings, E::variable("x"));
        expect(456u64, &bindings, E::variable("y"));
    }

    #[test]
    fn missing_variable_is_an_error() {
        let result = evaluate(&E::variable("nonexisting"), &Token::empty());
        assert_eq!(
            result,
            Err(BehaviorError::UndefinedVariable("nonexisting".to_string()))
        );
    }

    #[test]
    fn unresolved_variable_is_an_error() {
        let bindings = Token::empty().set("x", EventValue::Unresolved);
        assert!(evaluate(&E::variable("x"), &bindings).is_err());
    }

    #[test]
    fn comparison_operators() {
        let cases = [
            (123u64, BinaryOp::Eq, 123u64, true),
            (123, BinaryOp::Eq, 456, false),
            (123, BinaryOp::Ne, 123, false),
            (123, BinaryOp::Ne, 456, true),
            (1, BinaryOp::Lt, 2, true),
            (2, BinaryOp::Lt, 1, false),
            (1, BinaryOp::Le, 1, true),
            (2, BinaryOp::Le, 1, false),
            (1, BinaryOp::Gt, 1, false),
            (2, BinaryOp::Gt, 1, true),
            (1, BinaryOp::Ge, 1, true),
            (1, BinaryOp::Ge, 2, false),
        ];
        for (left, op, right, result) in cases {
            expect(
                result,
                &Token::empty(),
                E::binary(E::literal(left), op, E::literal(right)),
            );
        }
    }

    #[test]
    fn arithmetic_and_bitwise_operators() {
        let cases = [
            (2u64, BinaryOp::Add, 1u64, 3u64),
            (2, BinaryOp::Sub, 1, 1),
            (2, BinaryOp::Mul, 4, 8),
            (8, BinaryOp::Div, 4, 2),
            (7, BinaryOp::Rem, 4, 3),
            (0x12345678, BinaryOp::BitAnd, 0xFF00FF00, 0x12005600),
            (0x12340000, BinaryOp::BitOr, 0x5678, 0x12345678),
            (0x12340000, BinaryOp::BitXor, 0x5678, 0x12345678),
            (0x12345678, BinaryOp::BitXor, 0x12345678, 0),
        ];
        for (left, op, right, result) in cases {
            expect(
                result,
                &Token::empty(),
                E::binary(E::literal(left), op, E::literal(right)),
            );
        }
    }

    #[test]
    fn subtraction_wraps_around() {
        expect(
            u64::MAX,
            &Token::empty(),
            E::binary(E::literal(0u64), BinaryOp::Sub, E::literal(1u64)),
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let expr = E::binary(E::literal(1u64), BinaryOp::Div, E::literal(0u64));
        assert_eq!(
            evaluate(&expr, &Token::empty()),
            Err(BehaviorError::DivisionByZero)
        );
    }

    #[test]
    fn and_short_circuits() {
        expect(
            false,
            &Token::empty(),
            E::binary(E::literal(false), BinaryOp::And, E::variable("nonexisting")),
        );
    }

    #[test]
    fn or_short_circuits() {
        expect(
            true,
            &Token::empty(),
            E::binary(E::literal(true), BinaryOp::Or, E::variable("nonexisting")),
        );
    }

    #[test]
    fn unary_negate_is_twos_complement() {
        expect(
            (-123i64) as u64,
            &Token::empty(),
            E::unary(UnaryOp::Neg, E::literal(123u64)),
        );
    }

    #[test]
    fn unary_not_on_booleans_and_integers() {
        expect(true, &Token::empty(), E::unary(UnaryOp::Not, E::literal(false)));
        expect(false, &Token::empty(), E::unary(UnaryOp::Not, E::literal(true)));
        expect(
            !0x0Fu64,
            &Token::empty(),
            E::unary(UnaryOp::Not, E::literal(0x0Fu64)),
        );
    }

    #[test]
    fn in_integer_range_is_half_open() {
        let cases = [
            (4u64, 5u64, 10u64, false),
            (5, 5, 10, true),
            (5, 0, 10, true),
            (9, 0, 10, true),
            (10, 0, 10, false),
            (11, 0, 10, false),
        ];
        for (needle, start, end, result) in cases {
            let bindings = Token::empty()
                .set("x", needle)
                .set("s", start)
                .set("e", end);
            expect(
                result,
                &bindings,
                E::binary(
                    E::variable("x"),
                    BinaryOp::In,
                    E::range(E::variable("s"), E::variable("e")),
                ),
            );
        }
    }

    #[test]
    fn in_string_is_substring_containment() {
        let cases = [
            ("a", "bcd", false),
            ("a", "abcd", true),
            ("", "abcd", true),
            ("abcd", "", false),
        ];
        for (needle, haystack, result) in cases {
            let bindings = Token::empty().set("x", haystack);
            expect(
                result,
                &bindings,
                E::binary(E::literal(needle), BinaryOp::In, E::variable("x")),
            );
        }
    }

    #[test]
    fn in_string_needle_against_non_string_is_false() {
        expect(
            false,
            &Token::empty(),
            E::binary(E::literal("a"), BinaryOp::In, E::literal(123u64)),
        );
    }
}
