//! Conjunctive filtering of limits records.
//!
//! A [`Criterion`] pairs a resolved [`Field`] with a predicate. A record
//! survives [`filter`] only when it satisfies every criterion. Comparisons
//! follow IEEE semantics, so a NaN value fails every test except `!=`.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{CalcError, CalcResult};
use crate::fields::Field;
use crate::limits::LimitsRecord;

/// Operators in the order they are tried when parsing text criteria.
const OPERATOR_TOKENS: [&str; 6] = [">=", "<=", "==", "!=", ">", "<"];

const VALID_OPERATORS: &str = ">, >=, <, <=, ==, !=, between";

const CRITERION_FORMAT: &str = "'<field> <op> <value>' or '<field> between <lo>,<hi>'";

const BETWEEN_TOKEN: &str = " between ";

/// Byte offset of `" between "`, ignoring ASCII case.
///
/// The token is pure ASCII, so both ends of a match are char boundaries of `s`.
fn find_between(s: &str) -> Option<usize> {
    s.as_bytes()
        .windows(BETWEEN_TOKEN.len())
        .position(|w| w.eq_ignore_ascii_case(BETWEEN_TOKEN.as_bytes()))
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `between`, inclusive at both ends
    Between,
}

impl FromStr for Operator {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "between" => Ok(Operator::Between),
            _ => Err(CalcError::invalid_filter("operator", s, VALID_OPERATORS)),
        }
    }
}

impl Operator {
    /// Scalar comparison this operator stands for; `None` for `between`.
    pub fn comparison(self) -> Option<Comparison> {
        match self {
            Operator::Gt => Some(Comparison::Gt),
            Operator::Ge => Some(Comparison::Ge),
            Operator::Lt => Some(Comparison::Lt),
            Operator::Le => Some(Comparison::Le),
            Operator::Eq => Some(Comparison::Eq),
            Operator::Ne => Some(Comparison::Ne),
            Operator::Between => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Between => "between",
        };
        f.write_str(s)
    }
}

/// Scalar comparison: every operator except `between`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
    /// `!=`
    Ne,
}

impl From<Comparison> for Operator {
    fn from(cmp: Comparison) -> Self {
        match cmp {
            Comparison::Gt => Operator::Gt,
            Comparison::Ge => Operator::Ge,
            Comparison::Lt => Operator::Lt,
            Comparison::Le => Operator::Le,
            Comparison::Eq => Operator::Eq,
            Comparison::Ne => Operator::Ne,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Operator::from(*self).fmt(f)
    }
}

/// Right-hand side of a criterion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Single value for comparison operators
    Scalar(f64),
    /// Inclusive `(lo, hi)` range for `between`
    Range(f64, f64),
}

/// Predicate over a single value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Comparison against a scalar
    Compare(Comparison, f64),
    /// `lo <= value <= hi`
    Between(f64, f64),
}

impl Predicate {
    /// Build a predicate, rejecting operator/operand mismatches.
    pub fn new(operator: Operator, operand: Operand) -> CalcResult<Self> {
        match (operator.comparison(), operand) {
            (None, Operand::Range(lo, hi)) => Ok(Predicate::Between(lo, hi)),
            (None, Operand::Scalar(v)) => Err(CalcError::invalid_filter(
                "operand",
                v.to_string(),
                "between takes a (lo, hi) pair",
            )),
            (Some(cmp), Operand::Scalar(v)) => Ok(Predicate::Compare(cmp, v)),
            (Some(cmp), Operand::Range(lo, hi)) => Err(CalcError::invalid_filter(
                "operand",
                format!("({lo}, {hi})"),
                format!("'{cmp}' takes a single value"),
            )),
        }
    }

    /// Evaluate against a value.
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Predicate::Compare(Comparison::Gt, v) => value > v,
            Predicate::Compare(Comparison::Ge, v) => value >= v,
            Predicate::Compare(Comparison::Lt, v) => value < v,
            Predicate::Compare(Comparison::Le, v) => value <= v,
            Predicate::Compare(Comparison::Eq, v) => value == v,
            Predicate::Compare(Comparison::Ne, v) => value != v,
            Predicate::Between(lo, hi) => lo <= value && value <= hi,
        }
    }

    /// Equivalent polars expression over `column`.
    pub fn expr(&self, column: &str) -> Expr {
        let c = col(column);
        match *self {
            Predicate::Compare(Comparison::Gt, v) => c.gt(lit(v)),
            Predicate::Compare(Comparison::Ge, v) => c.gt_eq(lit(v)),
            Predicate::Compare(Comparison::Lt, v) => c.lt(lit(v)),
            Predicate::Compare(Comparison::Le, v) => c.lt_eq(lit(v)),
            Predicate::Compare(Comparison::Eq, v) => c.eq(lit(v)),
            Predicate::Compare(Comparison::Ne, v) => c.neq(lit(v)),
            Predicate::Between(lo, hi) => c.clone().gt_eq(lit(lo)).and(c.lt_eq(lit(hi))),
        }
    }
}

/// One filter criterion on a limits-table column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Column the criterion applies to
    pub field: Field,
    /// Test applied to the column value
    pub predicate: Predicate,
}

impl Criterion {
    /// Build a criterion from a field name (canonical or alias), an operator
    /// token and an operand.
    pub fn new(field: &str, operator: &str, operand: Operand) -> CalcResult<Self> {
        let field = Field::resolve(field)
            .ok_or_else(|| CalcError::invalid_filter("field", field, Field::valid_names()))?;
        let operator: Operator = operator.parse()?;
        Ok(Self {
            field,
            predicate: Predicate::new(operator, operand)?,
        })
    }

    /// Does `record` satisfy this criterion?
    pub fn matches(&self, record: &LimitsRecord) -> bool {
        self.predicate.matches(self.field.value(record))
    }

    /// Polars expression over the canonical column.
    pub fn expr(&self) -> Expr {
        self.predicate.expr(self.field.canonical())
    }
}

impl FromStr for Criterion {
    type Err = CalcError;

    /// Parses `"Cl/Cd_max > 100"` or `"cl_i between 0.3,0.8"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CalcError::invalid_filter("criterion", s, CRITERION_FORMAT);

        if let Some(pos) = find_between(s) {
            let field = &s[..pos];
            let bounds: Vec<&str> = s[pos + BETWEEN_TOKEN.len()..].split(',').collect();
            let [lo, hi] = bounds.as_slice() else {
                return Err(invalid());
            };
            let lo: f64 = lo.trim().parse().map_err(|_| invalid())?;
            let hi: f64 = hi.trim().parse().map_err(|_| invalid())?;
            return Criterion::new(field, "between", Operand::Range(lo, hi));
        }

        for op in OPERATOR_TOKENS {
            if let Some((field, value)) = s.split_once(op) {
                let Ok(value) = value.trim().parse::<f64>() else {
                    continue;
                };
                return Criterion::new(field, op, Operand::Scalar(value));
            }
        }
        Err(invalid())
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.predicate {
            Predicate::Compare(op, v) => write!(f, "{} {} {}", self.field, op, v),
            Predicate::Between(lo, hi) => write!(f, "{} between {},{}", self.field, lo, hi),
        }
    }
}

/// Records satisfying every criterion, in input order.
pub fn filter(records: &[LimitsRecord], criteria: &[Criterion]) -> Vec<LimitsRecord> {
    records
        .iter()
        .filter(|record| criteria.iter().all(|c| c.matches(record)))
        .cloned()
        .collect()
}

/// AND-combined predicate for a limits DataFrame, `None` without criteria.
pub fn combined_expr(criteria: &[Criterion]) -> Option<Expr> {
    criteria
        .iter()
        .map(Criterion::expr)
        .reduce(|acc, e| acc.and(e))
}
