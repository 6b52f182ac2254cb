//! Arithmetic operators and reduction functions.
//!
//! # Semantics
//!
//! - `/` and `%` by a zero right operand return typed errors
//!   ([`EvalError::DivisionByZero`] / [`EvalError::ModuloByZero`]) instead of
//!   raising, so one bad tick cannot abort a whole expression tree.
//! - `+%` computes `left + left * right / 100`, `-%` the decrease. IEEE-754
//!   f64 throughout.
//! - Any symbol outside the enumerated set is [`EvalError::UnknownOperator`],
//!   never a silent zero.
//! - `max`/`min` over an empty operand set is [`EvalError::EmptyOperandSet`].

use crate::domain::error::EvalError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary arithmetic operator attached to a composite expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    IncreaseByPercent,
    DecreaseByPercent,
}

impl Operator {
    pub fn from_symbol(symbol: &str) -> Result<Self, EvalError> {
        match symbol {
            "+" => Ok(Operator::Add),
            "-" => Ok(Operator::Subtract),
            "*" => Ok(Operator::Multiply),
            "/" => Ok(Operator::Divide),
            "%" => Ok(Operator::Modulo),
            "+%" => Ok(Operator::IncreaseByPercent),
            "-%" => Ok(Operator::DecreaseByPercent),
            other => Err(EvalError::UnknownOperator {
                symbol: other.to_string(),
            }),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "%",
            Operator::IncreaseByPercent => "+%",
            Operator::DecreaseByPercent => "-%",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl TryFrom<String> for Operator {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Operator::from_symbol(&value)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.symbol().to_string()
    }
}

/// N-ary reduction function over a non-empty operand set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReduceFn {
    Max,
    Min,
}

impl ReduceFn {
    pub fn name(&self) -> &'static str {
        match self {
            ReduceFn::Max => "max",
            ReduceFn::Min => "min",
        }
    }
}

impl fmt::Display for ReduceFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a composite expression applies to its reduced children: either an
/// arithmetic operator folded left-to-right, or a reduction function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Combinator {
    Op(Operator),
    Fn(ReduceFn),
}

impl Combinator {
    pub fn from_symbol(symbol: &str) -> Result<Self, EvalError> {
        match symbol {
            "max" => Ok(Combinator::Fn(ReduceFn::Max)),
            "min" => Ok(Combinator::Fn(ReduceFn::Min)),
            other => Operator::from_symbol(other).map(Combinator::Op),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Combinator::Op(op) => op.symbol(),
            Combinator::Fn(f) => f.name(),
        }
    }
}

impl TryFrom<String> for Combinator {
    type Error = EvalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Combinator::from_symbol(&value)
    }
}

impl From<Combinator> for String {
    fn from(c: Combinator) -> Self {
        c.symbol().to_string()
    }
}

pub fn increase_by_percentage(value: f64, percent: f64) -> f64 {
    value + value * percent / 100.0
}

pub fn decrease_by_percentage(value: f64, percent: f64) -> f64 {
    value - value * percent / 100.0
}

/// Apply one binary operator. Division and modulo by zero surface as typed
/// errors for the caller to propagate.
pub fn evaluate_operation(left: f64, right: f64, op: Operator) -> Result<f64, EvalError> {
    match op {
        Operator::Add => Ok(left + right),
        Operator::Subtract => Ok(left - right),
        Operator::Multiply => Ok(left * right),
        Operator::Divide => {
            if right == 0.0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(left / right)
            }
        }
        Operator::Modulo => {
            if right == 0.0 {
                Err(EvalError::ModuloByZero)
            } else {
                Ok(left % right)
            }
        }
        Operator::IncreaseByPercent => Ok(increase_by_percentage(left, right)),
        Operator::DecreaseByPercent => Ok(decrease_by_percentage(left, right)),
    }
}

/// Convenience entry for callers holding a raw operator symbol: parses, then
/// evaluates.
pub fn apply_symbol(left: f64, right: f64, symbol: &str) -> Result<f64, EvalError> {
    evaluate_operation(left, right, Operator::from_symbol(symbol)?)
}

/// Reduce a non-empty value sequence. The result is independent of input
/// order for both functions.
pub fn evaluate_function(values: &[f64], function: ReduceFn) -> Result<f64, EvalError> {
    if values.is_empty() {
        return Err(EvalError::EmptyOperandSet {
            function: function.name().to_string(),
        });
    }
    let reduced = match function {
        ReduceFn::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ReduceFn::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
    };
    Ok(reduced)
}

/// Fold an operator across reduced operand values, left-to-right. A single
/// value is returned unchanged; an empty sequence is `EmptyOperandSet`.
pub fn fold_operation(values: &[f64], op: Operator) -> Result<f64, EvalError> {
    let (first, rest) = values.split_first().ok_or_else(|| EvalError::EmptyOperandSet {
        function: op.symbol().to_string(),
    })?;
    let mut acc = *first;
    for value in rest {
        acc = evaluate_operation(acc, *value, op)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn add_subtract_multiply() {
        assert_eq!(evaluate_operation(2.0, 3.0, Operator::Add), Ok(5.0));
        assert_eq!(evaluate_operation(2.0, 3.0, Operator::Subtract), Ok(-1.0));
        assert_eq!(evaluate_operation(2.0, 3.0, Operator::Multiply), Ok(6.0));
    }

    #[test]
    fn divide_normal() {
        assert_eq!(evaluate_operation(9.0, 3.0, Operator::Divide), Ok(3.0));
    }

    #[test]
    fn divide_by_zero_is_typed_error() {
        assert_eq!(
            evaluate_operation(9.0, 0.0, Operator::Divide),
            Err(EvalError::DivisionByZero)
        );
        assert_eq!(
            evaluate_operation(-123.45, 0.0, Operator::Divide),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn modulo_normal() {
        assert_eq!(evaluate_operation(9.0, 4.0, Operator::Modulo), Ok(1.0));
    }

    #[test]
    fn modulo_by_zero_is_typed_error() {
        assert_eq!(
            evaluate_operation(9.0, 0.0, Operator::Modulo),
            Err(EvalError::ModuloByZero)
        );
    }

    #[test]
    fn percentage_increase() {
        let result = evaluate_operation(200.0, 5.0, Operator::IncreaseByPercent).unwrap();
        assert_relative_eq!(result, 210.0);
    }

    #[test]
    fn percentage_decrease() {
        let result = evaluate_operation(200.0, 5.0, Operator::DecreaseByPercent).unwrap();
        assert_relative_eq!(result, 190.0);
    }

    #[test]
    fn percentage_of_negative_base() {
        assert_relative_eq!(increase_by_percentage(-100.0, 10.0), -110.0);
        assert_relative_eq!(decrease_by_percentage(-100.0, 10.0), -90.0);
    }

    #[test]
    fn unknown_symbol_rejected() {
        assert_eq!(
            Operator::from_symbol("^"),
            Err(EvalError::UnknownOperator { symbol: "^".into() })
        );
        assert_eq!(
            apply_symbol(1.0, 2.0, "**"),
            Err(EvalError::UnknownOperator {
                symbol: "**".into()
            })
        );
    }

    #[test]
    fn symbol_round_trip() {
        for op in [
            Operator::Add,
            Operator::Subtract,
            Operator::Multiply,
            Operator::Divide,
            Operator::Modulo,
            Operator::IncreaseByPercent,
            Operator::DecreaseByPercent,
        ] {
            assert_eq!(Operator::from_symbol(op.symbol()), Ok(op));
        }
    }

    #[test]
    fn apply_symbol_parses_then_evaluates() {
        assert_eq!(apply_symbol(10.0, 4.0, "-"), Ok(6.0));
        assert_relative_eq!(apply_symbol(100.0, 10.0, "+%").unwrap(), 110.0);
    }

    #[test]
    fn max_min_of_values() {
        let values = [3.0, -1.0, 7.5, 2.0];
        assert_eq!(evaluate_function(&values, ReduceFn::Max), Ok(7.5));
        assert_eq!(evaluate_function(&values, ReduceFn::Min), Ok(-1.0));
    }

    #[test]
    fn max_min_single_value() {
        assert_eq!(evaluate_function(&[4.2], ReduceFn::Max), Ok(4.2));
        assert_eq!(evaluate_function(&[4.2], ReduceFn::Min), Ok(4.2));
    }

    #[test]
    fn empty_operand_set_is_error() {
        assert_eq!(
            evaluate_function(&[], ReduceFn::Max),
            Err(EvalError::EmptyOperandSet {
                function: "max".into()
            })
        );
        assert_eq!(
            evaluate_function(&[], ReduceFn::Min),
            Err(EvalError::EmptyOperandSet {
                function: "min".into()
            })
        );
    }

    #[test]
    fn fold_left_to_right() {
        // (((100 - 10) - 5) - 1) = 84, order matters for subtraction
        assert_eq!(
            fold_operation(&[100.0, 10.0, 5.0, 1.0], Operator::Subtract),
            Ok(84.0)
        );
    }

    #[test]
    fn fold_single_value_is_identity() {
        assert_eq!(fold_operation(&[42.0], Operator::Divide), Ok(42.0));
    }

    #[test]
    fn fold_empty_is_error() {
        assert_eq!(
            fold_operation(&[], Operator::Add),
            Err(EvalError::EmptyOperandSet {
                function: "+".into()
            })
        );
    }

    #[test]
    fn fold_propagates_division_by_zero() {
        assert_eq!(
            fold_operation(&[10.0, 0.0, 3.0], Operator::Divide),
            Err(EvalError::DivisionByZero)
        );
    }

    #[test]
    fn combinator_parses_functions_and_operators() {
        assert_eq!(
            Combinator::from_symbol("max"),
            Ok(Combinator::Fn(ReduceFn::Max))
        );
        assert_eq!(
            Combinator::from_symbol("+%"),
            Ok(Combinator::Op(Operator::IncreaseByPercent))
        );
        assert!(Combinator::from_symbol("avg").is_err());
    }

    #[test]
    fn combinator_serde_uses_symbols() {
        let json = serde_json::to_string(&Combinator::Op(Operator::Divide)).unwrap();
        assert_eq!(json, "\"/\"");
        let parsed: Combinator = serde_json::from_str("\"min\"").unwrap();
        assert_eq!(parsed, Combinator::Fn(ReduceFn::Min));
        assert!(serde_json::from_str::<Combinator>("\"pow\"").is_err());
    }
}
