//! Typed filters over one entity.
//!
//! Filters built from a list of fields group their predicates two at a time, in input order:
//! `{a, b, c}` compiles to `(a = 1 AND b = 2) AND (c = 3 AND TRUE)`. The odd predicate out is
//! paired with `TRUE`, and the pairs are folded from the left with `AND`. The grouping is stable
//! and callers may rely on the compiled shape.

use std::{fmt::Debug, marker::PhantomData};

use crate::{
    entity::{Entity, column::ColumnType},
    value::{Value, marshal::Dialect},
};

use super::{BooleanOperator, Expr, Operator, Predicate, PushToQuery};

pub struct Filter<E: Entity> {
    condition: Option<Expr>,
    marker: PhantomData<fn() -> E>,
}

impl<E: Entity> Filter<E> {
    const fn new(condition: Option<Expr>) -> Self {
        Self {
            condition,
            marker: PhantomData,
        }
    }

    /// Match every row. Reads issue no `WHERE` clause at all.
    #[must_use]
    pub const fn all() -> Self {
        Self::new(None)
    }

    /// Match no row, through an explicit `FALSE` literal.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Some(Expr::Literal(false)))
    }

    /// Build a predicate on a column of `E`.
    ///
    /// # Panics
    ///
    /// If `field` has no column descriptor on `E`, or if `value` does not fit its kind.
    #[must_use]
    pub fn field_predicate(
        field: &str,
        value: impl Into<Value>,
        operator: Operator,
        negated: bool,
    ) -> Predicate {
        let column = E::metadata().column(field).clone();
        Predicate::new(column, operator, value.into()).negated(negated)
    }

    /// A single `field = value` predicate.
    ///
    /// # Panics
    ///
    /// See [`Filter::field_predicate`].
    #[must_use]
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::field_predicate(field, value, Operator::Equal, false).into()
    }

    /// A single predicate with an explicit operator.
    ///
    /// # Panics
    ///
    /// See [`Filter::field_predicate`].
    #[must_use]
    pub fn predicate(field: &str, operator: Operator, value: impl Into<Value>) -> Self {
        Self::field_predicate(field, value, operator, false).into()
    }

    /// Equality on the primary key.
    #[must_use]
    pub fn by_key(key: &E::Key) -> Self {
        Self::by_key_value(key.to_value())
    }

    /// # Panics
    ///
    /// If `E` has no primary key, or if `value` does not fit its kind.
    #[must_use]
    pub fn by_key_value(value: Value) -> Self {
        let column = E::metadata().primary_key_column().clone();
        Predicate::new(column, Operator::Equal, value).into()
    }

    /// Equality predicates for every entry whose field is a column of `E`, grouped as described
    /// in the [module documentation](self). Entries without a column are skipped, and an empty
    /// input yields [`Filter::all`].
    ///
    /// # Panics
    ///
    /// If a value does not fit the kind of its column.
    #[must_use]
    pub fn from_map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let metadata = E::metadata();

        Self::from_predicates(entries.into_iter().filter_map(|(field, value)| {
            let column = metadata.columns().get(field.as_ref())?;
            Some(Predicate::new(
                column.clone(),
                Operator::Equal,
                value.into(),
            ))
        }))
    }

    /// Group explicit predicates the same way as [`Filter::from_map`].
    #[must_use]
    pub fn from_predicates(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let mut predicates = predicates.into_iter();
        let mut pairs = vec![];

        while let Some(left) = predicates.next() {
            pairs.push(Expr::binary(
                left,
                BooleanOperator::And,
                predicates.next().map(Expr::from),
            ));
        }

        Self::new(pairs.into_iter().reduce(Expr::and))
    }

    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self.condition, other.condition) {
            (Some(left), Some(right)) => Self::new(Some(left.and(right))),
            (left, right) => Self::new(left.or(right)),
        }
    }

    /// Either filter. An empty side matches every row, and so does the result.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match (self.condition, other.condition) {
            (Some(left), Some(right)) => Self::new(Some(left.or(right))),
            _ => Self::all(),
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self.condition {
            Some(condition) => Self::new(Some(Expr::Not(Box::new(condition)))),
            None => Self::none(),
        }
    }

    #[must_use]
    pub const fn condition(&self) -> Option<&Expr> {
        self.condition.as_ref()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.condition.is_none()
    }

    /// Compile for MySQL. An empty filter compiles to `TRUE`.
    #[must_use]
    pub fn compile(&self) -> String {
        self.compile_for(Dialect::MySql)
    }

    #[must_use]
    pub fn compile_for(&self, dialect: Dialect) -> String {
        self.condition
            .as_ref()
            .map_or_else(|| "TRUE".to_string(), |e| e.to_sql(dialect))
    }
}

impl<E: Entity> Default for Filter<E> {
    fn default() -> Self {
        Self::all()
    }
}

impl<E: Entity> Clone for Filter<E> {
    fn clone(&self) -> Self {
        Self::new(self.condition.clone())
    }
}

impl<E: Entity> Debug for Filter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("entity", &std::any::type_name::<E>())
            .field("condition", &self.condition)
            .finish()
    }
}

impl<E: Entity> From<Predicate> for Filter<E> {
    fn from(value: Predicate) -> Self {
        Self::new(Some(value.into()))
    }
}

impl<E: Entity> From<Expr> for Filter<E> {
    fn from(value: Expr) -> Self {
        Self::new(Some(value))
    }
}
