/* Copyright 2025 The ModelarDB Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Implementation of the logical [`Query`] sent to the store. A [`Query`] is a plain value: it is
//! never shared between sub-queries, so rewriting one is done on a clone.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use datafusion::scalar::ScalarValue;

/// Operator of a [`Comparison`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
    Like,
    NotLike,
}

impl Display for ConditionOperator {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let operator = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        };

        write!(f, "{operator}")
    }
}

/// Right-hand side of a [`Comparison`].
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Scalar(ScalarValue),
    List(Vec<ScalarValue>),
}

impl From<ScalarValue> for Literal {
    fn from(value: ScalarValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<ScalarValue>> for Literal {
    fn from(values: Vec<ScalarValue>) -> Self {
        Self::List(values)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Scalar(value) => write!(f, "{value}"),
            Self::List(values) => {
                let values: Vec<String> = values.iter().map(|value| value.to_string()).collect();
                write!(f, "({})", values.join(", "))
            }
        }
    }
}

/// A `field operator literal` condition.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    pub field: String,
    pub operator: ConditionOperator,
    pub literal: Literal,
}

/// A node in the condition tree of a [`Query`]. The top-level conditions of a [`Query`] are
/// combined with AND while the conditions in an [`Or`](Condition::Or) are combined with OR.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Comparison(Comparison),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn comparison(
        field: impl Into<String>,
        operator: ConditionOperator,
        literal: impl Into<Literal>,
    ) -> Self {
        Self::Comparison(Comparison {
            field: field.into(),
            operator,
            literal: literal.into(),
        })
    }

    /// Return [`true`] if the condition is a [`Comparison`] on exactly `field` and `operator`.
    pub fn is_comparison_on(&self, field: &str, operator: ConditionOperator) -> bool {
        match self {
            Self::Comparison(comparison) => {
                comparison.field == field && comparison.operator == operator
            }
            Self::Or(_) => false,
        }
    }

    fn collect_columns(&self, columns: &mut BTreeSet<String>) {
        match self {
            Self::Comparison(comparison) => {
                columns.insert(comparison.field.clone());
            }
            Self::Or(conditions) => {
                for condition in conditions {
                    condition.collect_columns(columns);
                }
            }
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Self::Comparison(comparison) => write!(
                f,
                "{} {} {}",
                comparison.field, comparison.operator, comparison.literal
            ),
            Self::Or(conditions) => {
                let conditions: Vec<String> =
                    conditions.iter().map(|condition| condition.to_string()).collect();
                write!(f, "({})", conditions.join(" OR "))
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    CountDistinct,
    Sum,
    Min,
    Max,
    Avg,
}

/// An aggregate computed over `column`, or over all rows if `column` is [`None`], and returned
/// as `alias`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Aggregation {
    pub function: AggregateFunction,
    pub column: Option<String>,
    pub alias: String,
}

impl Aggregation {
    pub fn new(function: AggregateFunction, column: Option<&str>, alias: &str) -> Self {
        Self {
            function,
            column: column.map(str::to_owned),
            alias: alias.to_owned(),
        }
    }
}

/// The logical body of a request: the selected columns, the conditions, the grouping and
/// aggregations, the ordering, and the pagination. The data source is assigned by the plan
/// builder once a storage has been chosen.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    data_source: Option<String>,
    selected_columns: Vec<String>,
    conditions: Vec<Condition>,
    group_by: Vec<String>,
    aggregations: Vec<Aggregation>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Query {
    pub fn new(selected_columns: &[&str]) -> Self {
        Self {
            selected_columns: selected_columns.iter().map(|column| column.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_group_by(mut self, group_by: &[&str]) -> Self {
        self.group_by = group_by.iter().map(|column| column.to_string()).collect();
        self
    }

    pub fn with_aggregations(mut self, aggregations: Vec<Aggregation>) -> Self {
        self.aggregations = aggregations;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    pub fn set_data_source(&mut self, data_source: &str) {
        self.data_source = Some(data_source.to_owned());
    }

    pub fn selected_columns(&self) -> &[String] {
        &self.selected_columns
    }

    pub fn set_selected_columns(&mut self, selected_columns: Vec<String>) {
        self.selected_columns = selected_columns;
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn set_conditions(&mut self, conditions: Vec<Condition>) {
        self.conditions = conditions;
    }

    pub fn add_conditions(&mut self, conditions: impl IntoIterator<Item = Condition>) {
        self.conditions.extend(conditions);
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn aggregations(&self) -> &[Aggregation] {
        &self.aggregations
    }

    pub fn order_by(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = Some(limit);
    }

    /// Return the offset of the query, an absent offset is equivalent to an offset of zero.
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = Some(offset);
    }

    /// Return the literal of the first top-level [`Comparison`] on `field` with `operator`.
    pub fn find_condition(&self, field: &str, operator: ConditionOperator) -> Option<&Literal> {
        self.conditions.iter().find_map(|condition| match condition {
            Condition::Comparison(comparison)
                if comparison.field == field && comparison.operator == operator =>
            {
                Some(&comparison.literal)
            }
            _ => None,
        })
    }

    /// Replace the literal of every top-level [`Comparison`] on `field` with `operator` by
    /// `literal`. Nothing is added if the query has no such [`Comparison`].
    pub fn replace_condition(&mut self, field: &str, operator: ConditionOperator, literal: Literal) {
        for condition in &mut self.conditions {
            if let Condition::Comparison(comparison) = condition {
                if comparison.field == field && comparison.operator == operator {
                    comparison.literal = literal.clone();
                }
            }
        }
    }

    /// Return [`true`] if the first element of the ordering is `column` sorted in `direction`.
    pub fn is_ordered_by(&self, column: &str, direction: SortDirection) -> bool {
        self.order_by
            .first()
            .is_some_and(|order_by| order_by.column == column && order_by.direction == direction)
    }

    /// Return the names of all columns referenced by the query, i.e., the selected columns and
    /// the columns used in the conditions, grouping, aggregations, and ordering.
    pub fn all_referenced_columns(&self) -> BTreeSet<String> {
        let mut columns: BTreeSet<String> = self.selected_columns.iter().cloned().collect();

        for condition in &self.conditions {
            condition.collect_columns(&mut columns);
        }

        columns.extend(self.group_by.iter().cloned());
        columns.extend(
            self.aggregations
                .iter()
                .filter_map(|aggregation| aggregation.column.clone()),
        );
        columns.extend(self.order_by.iter().map(|order_by| order_by.column.clone()));

        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests for Query.
    #[test]
    fn test_absent_offset_is_zero() {
        let query = Query::new(&["event_id"]);
        assert_eq!(query.offset(), 0);
        assert_eq!(query.limit(), None);
    }

    #[test]
    fn test_find_condition_requires_exact_field_and_operator() {
        let query = query_with_time_range();

        assert_eq!(
            query.find_condition("timestamp", ConditionOperator::GtEq),
            Some(&Literal::Scalar(ScalarValue::Int64(Some(0))))
        );
        assert!(query.find_condition("timestamp", ConditionOperator::Gt).is_none());
        assert!(query.find_condition("received", ConditionOperator::GtEq).is_none());
    }

    #[test]
    fn test_replace_condition() {
        let mut query = query_with_time_range();
        query.replace_condition(
            "timestamp",
            ConditionOperator::Lt,
            Literal::Scalar(ScalarValue::Int64(Some(5))),
        );

        assert_eq!(
            query.find_condition("timestamp", ConditionOperator::Lt),
            Some(&Literal::Scalar(ScalarValue::Int64(Some(5))))
        );
        assert_eq!(
            query.find_condition("timestamp", ConditionOperator::GtEq),
            Some(&Literal::Scalar(ScalarValue::Int64(Some(0))))
        );
    }

    #[test]
    fn test_replace_missing_condition_adds_nothing() {
        let mut query = query_with_time_range();
        query.replace_condition(
            "project_id",
            ConditionOperator::In,
            Literal::List(vec![ScalarValue::UInt64(Some(1))]),
        );

        assert_eq!(query.conditions().len(), 3);
        assert!(query.find_condition("project_id", ConditionOperator::In).is_none());
    }

    #[test]
    fn test_replace_condition_ignores_nested_conditions() {
        let nested = Condition::Or(vec![Condition::comparison(
            "timestamp",
            ConditionOperator::Lt,
            ScalarValue::Int64(Some(1)),
        )]);
        let mut query = Query::new(&["event_id"]).with_conditions(vec![nested.clone()]);

        query.replace_condition(
            "timestamp",
            ConditionOperator::Lt,
            Literal::Scalar(ScalarValue::Int64(Some(2))),
        );

        assert_eq!(query.conditions(), &[nested]);
    }

    #[test]
    fn test_is_ordered_by_only_checks_first_element() {
        let query = Query::new(&["event_id"]).with_order_by(vec![
            OrderBy::ascending("project_id"),
            OrderBy::descending("timestamp"),
        ]);

        assert!(query.is_ordered_by("project_id", SortDirection::Ascending));
        assert!(!query.is_ordered_by("timestamp", SortDirection::Descending));
        assert!(!Query::default().is_ordered_by("timestamp", SortDirection::Descending));
    }

    #[test]
    fn test_all_referenced_columns() {
        let query = query_with_time_range()
            .with_conditions(vec![Condition::Or(vec![
                Condition::comparison("level", ConditionOperator::Eq, ScalarValue::from("error")),
                Condition::comparison("message", ConditionOperator::Like, ScalarValue::from("%a%")),
            ])])
            .with_group_by(&["project_id"])
            .with_aggregations(vec![Aggregation::new(
                AggregateFunction::Max,
                Some("received"),
                "last_seen",
            )])
            .with_order_by(vec![OrderBy::descending("timestamp")]);

        let columns: Vec<String> = query.all_referenced_columns().into_iter().collect();
        assert_eq!(
            columns,
            vec![
                "event_id",
                "level",
                "message",
                "payload",
                "project_id",
                "received",
                "timestamp"
            ]
        );
    }

    #[test]
    fn test_display_condition() {
        let condition = Condition::Or(vec![
            Condition::comparison("project_id", ConditionOperator::In, vec![
                ScalarValue::UInt64(Some(1)),
                ScalarValue::UInt64(Some(2)),
            ]),
            Condition::comparison("level", ConditionOperator::NotEq, ScalarValue::from("info")),
        ]);

        assert_eq!(condition.to_string(), "(project_id IN (1, 2) OR level != info)");
    }

    fn query_with_time_range() -> Query {
        Query::new(&["event_id", "payload"]).with_conditions(vec![
            Condition::comparison("timestamp", ConditionOperator::GtEq, ScalarValue::Int64(Some(0))),
            Condition::comparison("timestamp", ConditionOperator::Lt, ScalarValue::Int64(Some(10))),
            Condition::comparison("project_id", ConditionOperator::Eq, ScalarValue::UInt64(Some(1))),
        ])
    }
}
