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

//! The [`QueryRunner`] used by the execution strategies to send a single query to the store, and
//! [`DataFusionQueryRunner`] which executes queries against tables registered with Apache
//! DataFusion.

use std::sync::Arc;

use arrow::compute;
use async_trait::async_trait;
use datafusion::functions_aggregate::expr_fn::{avg, count, count_distinct, max, min, sum};
use datafusion::logical_expr::{Expr, SortExpr};
use datafusion::prelude::{SessionContext, ident, lit};
use modelardb_types::query::{
    AggregateFunction, Aggregation, Comparison, Condition, ConditionOperator, Literal, Query,
    SortDirection,
};
use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;

use crate::error::{ModelarDbPlannerError, Result};

/// Sends one query to the store and returns the rows. A [`QueryRunner`] is allowed to modify
/// `request` while executing it, so callers that need the request afterwards must pass a clone.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, request: &mut Request) -> Result<RawQueryResult>;
}

/// A [`QueryRunner`] that executes queries against the tables registered in a [`SessionContext`].
/// The data source of the query is used as the name of the table.
pub struct DataFusionQueryRunner {
    /// Main interface for Apache DataFusion.
    session_context: SessionContext,
}

impl DataFusionQueryRunner {
    pub fn new(session_context: SessionContext) -> Self {
        Self { session_context }
    }
}

#[async_trait]
impl QueryRunner for DataFusionQueryRunner {
    async fn run(&self, request: &mut Request) -> Result<RawQueryResult> {
        let query = &request.query;
        let data_source = query.data_source().ok_or_else(|| {
            ModelarDbPlannerError::InvalidArgument("The query has no data source.".to_owned())
        })?;

        let mut data_frame = self.session_context.table(data_source).await?;

        if let Some(filter) = conditions_to_expr(query.conditions())? {
            data_frame = data_frame.filter(filter)?;
        }

        // Columns that are not grouped on or aggregated are not available after aggregation, so
        // the output of an aggregate query is the group by columns followed by the aggregates.
        let is_aggregate = !query.group_by().is_empty() || !query.aggregations().is_empty();
        if is_aggregate {
            let group_by = query.group_by().iter().map(ident).collect();
            let aggregations = query
                .aggregations()
                .iter()
                .map(aggregation_to_expr)
                .collect::<Result<Vec<Expr>>>()?;

            data_frame = data_frame.aggregate(group_by, aggregations)?;
        }

        if !query.order_by().is_empty() {
            data_frame = data_frame.sort(order_by_to_sort_exprs(query))?;
        }

        if query.limit().is_some() || query.offset() > 0 {
            data_frame = data_frame.limit(query.offset(), query.limit())?;
        }

        if !is_aggregate && !query.selected_columns().is_empty() {
            let selected_columns: Vec<&str> =
                query.selected_columns().iter().map(String::as_str).collect();
            data_frame = data_frame.select_columns(&selected_columns)?;
        }

        let logical_schema = Arc::new(data_frame.schema().as_arrow().clone());
        let record_batches = data_frame.collect().await?;

        // The physical schema is used if possible as it may differ in nullability.
        let schema = record_batches
            .first()
            .map_or(logical_schema, |record_batch| record_batch.schema());

        let data = compute::concat_batches(&schema, &record_batches)?;
        Ok(RawQueryResult::new(data))
    }
}

/// Combine `conditions` with AND into a single [`Expr`]. If there are no conditions, [`None`] is
/// returned, and if a condition is malformed, [`ModelarDbPlannerError`] is returned.
fn conditions_to_expr(conditions: &[Condition]) -> Result<Option<Expr>> {
    let exprs = conditions
        .iter()
        .map(condition_to_expr)
        .collect::<Result<Vec<Expr>>>()?;

    Ok(exprs.into_iter().reduce(Expr::and))
}

fn condition_to_expr(condition: &Condition) -> Result<Expr> {
    match condition {
        Condition::Comparison(comparison) => comparison_to_expr(comparison),
        Condition::Or(conditions) => {
            let exprs = conditions
                .iter()
                .map(condition_to_expr)
                .collect::<Result<Vec<Expr>>>()?;

            // An empty disjunction is false.
            Ok(exprs.into_iter().reduce(Expr::or).unwrap_or(lit(false)))
        }
    }
}

fn comparison_to_expr(comparison: &Comparison) -> Result<Expr> {
    let column = ident(&comparison.field);

    let expr = match (comparison.operator, &comparison.literal) {
        (ConditionOperator::In, Literal::List(values)) => {
            column.in_list(values.iter().cloned().map(lit).collect(), false)
        }
        (ConditionOperator::NotIn, Literal::List(values)) => {
            column.in_list(values.iter().cloned().map(lit).collect(), true)
        }
        (ConditionOperator::Eq, Literal::Scalar(value)) => column.eq(lit(value.clone())),
        (ConditionOperator::NotEq, Literal::Scalar(value)) => column.not_eq(lit(value.clone())),
        (ConditionOperator::Lt, Literal::Scalar(value)) => column.lt(lit(value.clone())),
        (ConditionOperator::LtEq, Literal::Scalar(value)) => column.lt_eq(lit(value.clone())),
        (ConditionOperator::Gt, Literal::Scalar(value)) => column.gt(lit(value.clone())),
        (ConditionOperator::GtEq, Literal::Scalar(value)) => column.gt_eq(lit(value.clone())),
        (ConditionOperator::Like, Literal::Scalar(value)) => column.like(lit(value.clone())),
        (ConditionOperator::NotLike, Literal::Scalar(value)) => {
            column.not_like(lit(value.clone()))
        }
        (operator, literal) => {
            return Err(ModelarDbPlannerError::InvalidArgument(format!(
                "{literal} is not a valid literal for {operator}."
            )));
        }
    };

    Ok(expr)
}

fn aggregation_to_expr(aggregation: &Aggregation) -> Result<Expr> {
    let expr = match (aggregation.function, &aggregation.column) {
        (AggregateFunction::Count, None) => count(lit(1)),
        (AggregateFunction::Count, Some(column)) => count(ident(column)),
        (AggregateFunction::CountDistinct, Some(column)) => count_distinct(ident(column)),
        (AggregateFunction::Sum, Some(column)) => sum(ident(column)),
        (AggregateFunction::Min, Some(column)) => min(ident(column)),
        (AggregateFunction::Max, Some(column)) => max(ident(column)),
        (AggregateFunction::Avg, Some(column)) => avg(ident(column)),
        (function, None) => {
            return Err(ModelarDbPlannerError::InvalidArgument(format!(
                "{function:?} requires a column."
            )));
        }
    };

    Ok(expr.alias(&aggregation.alias))
}

fn order_by_to_sort_exprs(query: &Query) -> Vec<SortExpr> {
    query
        .order_by()
        .iter()
        .map(|order_by| {
            let ascending = order_by.direction == SortDirection::Ascending;
            ident(&order_by.column).sort(ascending, false)
        })
        .collect()
}
