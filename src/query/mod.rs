pub mod filter;
pub mod format;
pub mod statement;

use std::fmt::Display;

use crate::{
    registry::ColumnDescriptor,
    value::{
        Value,
        marshal::{Dialect, marshal},
    },
};

/// Accumulates the text of one SQL statement.
#[derive(Debug, Clone)]
pub struct SqlWriter {
    sql: String,
    dialect: Dialect,
}

impl SqlWriter {
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            sql: String::new(),
            dialect,
        }
    }

    pub fn push(&mut self, sql: impl Display) -> &mut Self {
        self.sql.push_str(&sql.to_string());
        self
    }

    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn into_sql(self) -> String {
        self.sql
    }
}

pub trait PushToQuery {
    /// Render the object at the end of the writer.
    fn push_to(&self, writer: &mut SqlWriter);

    /// Render the object on its own.
    fn to_sql(&self, dialect: Dialect) -> String {
        let mut writer = SqlWriter::new(dialect);
        self.push_to(&mut writer);
        writer.into_sql()
    }
}

impl<T: PushToQuery + ?Sized> PushToQuery for &T {
    fn push_to(&self, writer: &mut SqlWriter) {
        (**self).push_to(writer);
    }
}

impl<T: PushToQuery + ?Sized> PushToQuery for Box<T> {
    fn push_to(&self, writer: &mut SqlWriter) {
        (**self).push_to(writer);
    }
}

/// Comparison applied by a [`Predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    Equal,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Like,
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Equal => "=",
                Self::Greater => ">",
                Self::GreaterOrEqual => ">=",
                Self::Less => "<",
                Self::LessOrEqual => "<=",
                Self::Like => "LIKE",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    And,
    Or,
}

impl Display for BooleanOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::And => "AND",
                Self::Or => "OR",
            }
        )
    }
}

/// A leaf of a filter: `<column> <operator> <value>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    pub negated: bool,
    pub column: ColumnDescriptor,
}

impl Predicate {
    /// # Panics
    ///
    /// If `value` does not fit the column kind, see [`marshal`].
    #[must_use]
    pub fn new(column: ColumnDescriptor, operator: Operator, value: Value) -> Self {
        let _ = marshal(&value, &column);

        Self {
            field: column.logical_name.clone(),
            operator,
            value,
            negated: false,
            column,
        }
    }

    #[must_use]
    pub const fn negated(mut self, negated: bool) -> Self {
        self.negated = negated;
        self
    }
}

impl PushToQuery for Predicate {
    fn push_to(&self, writer: &mut SqlWriter) {
        let column = &self.column.physical_name;

        if self.value.is_null() && self.operator == Operator::Equal {
            writer.push(format_args!(
                "{column} {}",
                if self.negated { "IS NOT NULL" } else { "IS NULL" }
            ));
            return;
        }

        let literal = marshal(&self.value, &self.column).render(writer.dialect());
        if self.negated {
            writer.push(format_args!("NOT ({column} {} {literal})", self.operator));
        } else {
            writer.push(format_args!("{column} {} {literal}", self.operator));
        }
    }
}

/// An internal node of a filter. A missing right side stands for the literal `TRUE`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub left: Expr,
    pub operator: BooleanOperator,
    pub right: Option<Expr>,
}

/// A boolean expression tree over [`Predicate`] leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Predicate(Predicate),
    Binary(Box<BinaryExpr>),
    Literal(bool),
    Not(Box<Expr>),
}

impl Expr {
    #[must_use]
    pub fn binary(left: impl Into<Self>, operator: BooleanOperator, right: Option<Self>) -> Self {
        Self::Binary(Box::new(BinaryExpr {
            left: left.into(),
            operator,
            right,
        }))
    }

    #[must_use]
    pub fn and(self, other: impl Into<Self>) -> Self {
        Self::binary(self, BooleanOperator::And, Some(other.into()))
    }

    #[must_use]
    pub fn or(self, other: impl Into<Self>) -> Self {
        Self::binary(self, BooleanOperator::Or, Some(other.into()))
    }

    /// Render as an operand of a binary node, parenthesizing sub-trees.
    fn push_operand(&self, writer: &mut SqlWriter) {
        if matches!(self, Self::Binary(_)) {
            writer.push("(");
            self.push_to(writer);
            writer.push(")");
        } else {
            self.push_to(writer);
        }
    }
}

impl From<Predicate> for Expr {
    fn from(value: Predicate) -> Self {
        Self::Predicate(value)
    }
}

impl PushToQuery for Expr {
    fn push_to(&self, writer: &mut SqlWriter) {
        match self {
            Self::Predicate(e) => e.push_to(writer),
            Self::Binary(e) => {
                e.left.push_operand(writer);
                writer.push(format_args!(" {} ", e.operator));
                match &e.right {
                    Some(right) => right.push_operand(writer),
                    None => {
                        writer.push("TRUE");
                    }
                }
            }
            Self::Literal(true) => {
                writer.push("TRUE");
            }
            Self::Literal(false) => {
                writer.push("FALSE");
            }
            Self::Not(e) => {
                writer.push("NOT (");
                e.push_to(writer);
                writer.push(")");
            }
        }
    }
}

#[cfg(test)]
mod test {
    use crate::value::ValueKind;

    use super::*;

    fn predicate(name: &str, value: i64) -> Predicate {
        Predicate::new(
            ColumnDescriptor::new(name, ValueKind::Number),
            Operator::Equal,
            Value::Integer(value),
        )
    }

    #[test]
    fn test_nested_binary_is_parenthesized() {
        let expr = Expr::from(predicate("a", 1))
            .and(predicate("b", 2))
            .or(Expr::binary(predicate("c", 3), BooleanOperator::And, None));

        assert_eq!(
            expr.to_sql(Dialect::MySql),
            "(a = 1 AND b = 2) OR (c = 3 AND TRUE)"
        );
    }

    #[test]
    fn test_null_and_negation() {
        let column = ColumnDescriptor::new("endRegistration", ValueKind::Date).nullable(true);
        let is_null = Predicate::new(column, Operator::Equal, Value::Null);

        assert_eq!(is_null.to_sql(Dialect::MySql), "end_registration IS NULL");
        assert_eq!(
            is_null.negated(true).to_sql(Dialect::MySql),
            "end_registration IS NOT NULL"
        );

        let greater = Predicate {
            operator: Operator::Greater,
            ..predicate("credits", 4)
        }
        .negated(true);
        assert_eq!(greater.to_sql(Dialect::MySql), "NOT (credits > 4)");
    }

    #[test]
    #[should_panic(expected = "expects a number")]
    fn test_predicate_validates_value() {
        let _ = Predicate::new(
            ColumnDescriptor::new("credits", ValueKind::Number),
            Operator::Equal,
            Value::from("four"),
        );
    }
}
