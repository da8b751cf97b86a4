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

//! Implementation of [`ColumnSplitQueryStrategy`] which executes queries that select many columns
//! in two phases. First the rows are identified by executing the query with only the columns in a
//! [`ColumnSplitSpec`], then all of the selected columns are read for only those rows.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::Array;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::scalar::ScalarValue;
use modelardb_types::functions;
use modelardb_types::query::{Condition, ConditionOperator, Literal, Query};
use modelardb_types::request::Request;
use modelardb_types::result::RawQueryResult;
use modelardb_types::types::{MICROSECONDS_PER_SECOND, Timestamp};
use tracing::debug;

use crate::configuration::{self, ConfigurationProvider, TIMESTAMP_GRANULARITY_SECONDS};
use crate::error::{ModelarDbPlannerError, Result};
use crate::runner::QueryRunner;
use crate::split::{self, SplitStrategy};

/// Default granularity in seconds of the stored timestamps.
const DEFAULT_TIMESTAMP_GRANULARITY_SECONDS: i64 = 1;

/// The columns that together identify a row well enough for it to be read again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSplitSpec {
    id_column: String,
    project_column: String,
    timestamp_column: String,
}

impl ColumnSplitSpec {
    pub fn new(id_column: &str, project_column: &str, timestamp_column: &str) -> Self {
        Self {
            id_column: id_column.to_owned(),
            project_column: project_column.to_owned(),
            timestamp_column: timestamp_column.to_owned(),
        }
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn project_column(&self) -> &str {
        &self.project_column
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Return the columns selected by the first query.
    pub fn min_columns(&self) -> Vec<String> {
        vec![
            self.id_column.clone(),
            self.project_column.clone(),
            self.timestamp_column.clone(),
        ]
    }

    /// Check that all of the columns exist in `schema`. If a column is missing,
    /// [`ModelarDbPlannerError::Configuration`] is returned.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        for column in self.min_columns() {
            if schema.field_with_name(&column).is_err() {
                return Err(ModelarDbPlannerError::Configuration(format!(
                    "The column split column '{column}' is not in the schema."
                )));
            }
        }

        Ok(())
    }
}

/// Splits queries that select more columns than the columns in the [`ColumnSplitSpec`] into a
/// query that identifies the rows and a query that reads all selected columns for those rows in
/// the time range the rows are in.
pub struct ColumnSplitQueryStrategy {
    column_split_spec: ColumnSplitSpec,
    configuration: Arc<dyn ConfigurationProvider>,
}

impl ColumnSplitQueryStrategy {
    /// Create a [`ColumnSplitQueryStrategy`] for a storage with `schema`. If a column in
    /// `column_split_spec` is not in `schema`, [`ModelarDbPlannerError::Configuration`] is
    /// returned.
    pub fn try_new(
        column_split_spec: ColumnSplitSpec,
        schema: &Schema,
        configuration: Arc<dyn ConfigurationProvider>,
    ) -> Result<Self> {
        column_split_spec.validate(schema)?;

        Ok(Self {
            column_split_spec,
            configuration,
        })
    }

    /// Return a copy of `request` that only reads the rows identified by `minimal_result`.
    fn full_request(&self, request: &Request, minimal_result: &RawQueryResult) -> Result<Request> {
        let spec = &self.column_split_spec;
        let data = &minimal_result.data;

        let ids = distinct_values(data, &spec.id_column)?;
        let project_ids = distinct_values(data, &spec.project_column)?;
        let (min_timestamp, max_timestamp) = timestamp_range(data, &spec.timestamp_column)?;

        // The end of the time range is exclusive, so the granularity the timestamps are stored
        // with is added to include the rows with the largest timestamp.
        let granularity = configuration::get_positive_config(
            &*self.configuration,
            TIMESTAMP_GRANULARITY_SECONDS,
            DEFAULT_TIMESTAMP_GRANULARITY_SECONDS,
        )?
        .saturating_mul(MICROSECONDS_PER_SECOND);
        let to_date = max_timestamp.saturating_add(granularity);

        let mut full_request = request.clone();
        let query = &mut full_request.query;

        query.set_offset(0);
        query.set_limit(ids.len());
        query.add_conditions([Condition::comparison(
            &spec.id_column,
            ConditionOperator::In,
            ids,
        )]);

        set_condition(
            query,
            &spec.project_column,
            ConditionOperator::In,
            Literal::List(project_ids.clone()),
        );
        set_condition(
            query,
            &spec.timestamp_column,
            ConditionOperator::GtEq,
            Literal::Scalar(functions::timestamp_to_scalar(min_timestamp)),
        );
        set_condition(
            query,
            &spec.timestamp_column,
            ConditionOperator::Lt,
            Literal::Scalar(functions::timestamp_to_scalar(to_date)),
        );

        full_request.mirror_project_ids(project_ids);
        full_request.mirror_time_range(min_timestamp, to_date);

        Ok(full_request)
    }
}

#[async_trait]
impl SplitStrategy for ColumnSplitQueryStrategy {
    fn name(&self) -> &str {
        "ColumnSplitQueryStrategy"
    }

    fn can_execute(&self, request: &Request) -> bool {
        let query = &request.query;

        if !split::is_query_splittable(query, &*self.configuration)
            || query.selected_columns().is_empty()
            || !query.aggregations().is_empty()
        {
            return false;
        }

        let mut minimal_query = query.clone();
        minimal_query.set_selected_columns(self.column_split_spec.min_columns());

        query.all_referenced_columns().len() > minimal_query.all_referenced_columns().len()
    }

    async fn run_split(
        &self,
        request: &Request,
        runner: &dyn QueryRunner,
    ) -> Result<Option<RawQueryResult>> {
        let mut minimal_request = request.clone();
        minimal_request
            .query
            .set_selected_columns(self.column_split_spec.min_columns());

        let minimal_result = runner.run(&mut minimal_request).await?;
        drop(minimal_request);

        if minimal_result.is_empty() {
            debug!("The minimal query returned no rows.");
            return Ok(Some(minimal_result));
        }

        let mut full_request = self.full_request(request, &minimal_result)?;
        debug!(
            "The minimal query returned {} rows, reading all columns for them.",
            minimal_result.num_rows()
        );

        runner.run(&mut full_request).await.map(Some)
    }
}

/// Replace the literal of the condition on `field` with `operator` in `query` or add the condition
/// if `query` does not have it.
fn set_condition(query: &mut Query, field: &str, operator: ConditionOperator, literal: Literal) {
    if query.find_condition(field, operator).is_some() {
        query.replace_condition(field, operator, literal);
    } else {
        query.add_conditions([Condition::comparison(field, operator, literal)]);
    }
}

/// Return the distinct non-null values in `column` in the order they first occur.
fn distinct_values(data: &RecordBatch, column: &str) -> Result<Vec<ScalarValue>> {
    let array = result_column(data, column)?;

    let mut seen = HashSet::new();
    let mut values = vec![];
    for index in 0..array.len() {
        let value = ScalarValue::try_from_array(array, index)?;
        if !value.is_null() && seen.insert(value.clone()) {
            values.push(value);
        }
    }

    Ok(values)
}

/// Return the smallest and largest non-null timestamp in `column`.
fn timestamp_range(data: &RecordBatch, column: &str) -> Result<(Timestamp, Timestamp)> {
    let array = result_column(data, column)?;

    let mut range: Option<(Timestamp, Timestamp)> = None;
    for index in 0..array.len() {
        let value = ScalarValue::try_from_array(array, index)?;
        if value.is_null() {
            continue;
        }

        let timestamp = functions::timestamp_from_scalar(&value)?;
        range = Some(range.map_or((timestamp, timestamp), |(min, max)| {
            (min.min(timestamp), max.max(timestamp))
        }));
    }

    range.ok_or_else(|| {
        ModelarDbPlannerError::InvalidArgument(format!("The column '{column}' has no timestamps."))
    })
}

fn result_column<'a>(data: &'a RecordBatch, column: &str) -> Result<&'a dyn Array> {
    data.column_by_name(column)
        .map(|array| array.as_ref())
        .ok_or_else(|| {
            ModelarDbPlannerError::InvalidArgument(format!(
                "The column '{column}' is not in the result."
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use arrow::array::StringArray;
    use modelardb_test::{EVENTS_SCHEMA, HOUR_IN_MICROSECONDS, SECOND_IN_MICROSECONDS, T0};
    use modelardb_types::query::{AggregateFunction, Aggregation, OrderBy};
    use modelardb_types::request::{
        FROM_DATE, PROJECT, PROJECT_EXTENSION, TIMESERIES_EXTENSION, TO_DATE,
    };

    use crate::configuration::{ConfigurationManager, USE_SPLIT};
    use crate::test::{self, FailingQueryRunner, RecordingQueryRunner};

    // Tests for ColumnSplitSpec.
    #[test]
    fn test_min_columns() {
        assert_eq!(
            column_split_spec().min_columns(),
            vec!["event_id", "project_id", "timestamp"]
        );
    }

    #[test]
    fn test_validate_with_missing_column() {
        let spec = ColumnSplitSpec::new("group_id", "project_id", "timestamp");

        let result = spec.validate(&EVENTS_SCHEMA);

        assert!(matches!(result, Err(ModelarDbPlannerError::Configuration(_))));
    }

    #[test]
    fn test_try_new_with_missing_column() {
        let spec = ColumnSplitSpec::new("event_id", "project_id", "received");

        let result = ColumnSplitQueryStrategy::try_new(spec, &EVENTS_SCHEMA, test::configuration(1));

        assert!(result.is_err());
    }

    // Tests for ColumnSplitQueryStrategy.
    #[test]
    fn test_can_execute() {
        let strategy = column_split_strategy();
        let request = column_split_request(&["event_id", "payload"], 2, 0);

        assert!(strategy.can_execute(&request));
    }

    #[test]
    fn test_cannot_execute_with_min_columns() {
        let strategy = column_split_strategy();
        let request = column_split_request(&["event_id", "timestamp"], 2, 0);

        assert!(!strategy.can_execute(&request));
    }

    #[test]
    fn test_cannot_execute_without_selected_columns() {
        let strategy = column_split_strategy();
        let request = column_split_request(&[], 2, 0);

        assert!(!strategy.can_execute(&request));
    }

    #[test]
    fn test_cannot_execute_with_aggregations() {
        let strategy = column_split_strategy();
        let mut request = column_split_request(&["event_id", "payload"], 2, 0);
        request.query = request.query.clone().with_aggregations(vec![Aggregation::new(
            AggregateFunction::Max,
            Some("timestamp"),
            "last_seen",
        )]);

        assert!(!strategy.can_execute(&request));
    }

    #[tokio::test]
    async fn test_execute_in_two_phases() {
        let strategy = column_split_strategy();
        let runner = RecordingQueryRunner::new(test::events_runner(&event_timestamps()));
        let request = column_split_request(&["event_id", "payload"], 2, 1);

        let result = strategy.execute(&request, &runner).await.unwrap().unwrap();

        let event_ids = modelardb_test::array!(result.data, 0, StringArray);
        let payloads = modelardb_test::array!(result.data, 1, StringArray);
        assert_eq!(event_ids.iter().flatten().collect::<Vec<_>>(), ["event_3", "event_1"]);
        assert_eq!(payloads.iter().flatten().collect::<Vec<_>>(), ["payload_3", "payload_1"]);

        let requests = runner.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].query.selected_columns(),
            column_split_spec().min_columns()
        );

        let full_query = &requests[1].query;
        assert_eq!(full_query.selected_columns(), ["event_id", "payload"]);
        assert_eq!(full_query.offset(), 0);
        assert_eq!(full_query.limit(), Some(2));
        assert_eq!(
            full_query.find_condition("event_id", ConditionOperator::In),
            Some(&Literal::List(vec![
                ScalarValue::from("event_3"),
                ScalarValue::from("event_1")
            ]))
        );
        assert_eq!(
            full_query.find_condition("project_id", ConditionOperator::In),
            Some(&Literal::List(vec![ScalarValue::from(1_u64), ScalarValue::from(2_u64)]))
        );
        assert_eq!(
            full_query.find_condition("timestamp", ConditionOperator::GtEq),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(
                T0 + 10 * SECOND_IN_MICROSECONDS
            )))
        );
        assert_eq!(
            full_query.find_condition("timestamp", ConditionOperator::Lt),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(
                T0 + 31 * SECOND_IN_MICROSECONDS
            )))
        );
    }

    #[tokio::test]
    async fn test_execute_returns_same_rows_as_direct_execution() {
        let strategy = column_split_strategy();
        let request = column_split_request(&["event_id", "payload"], 2, 1);

        let runner = test::events_runner(&event_timestamps());
        let split_result = strategy.execute(&request, &runner).await.unwrap().unwrap();
        let direct_result = runner.run(&mut request.clone()).await.unwrap();

        assert_eq!(split_result, direct_result);
    }

    #[tokio::test]
    async fn test_execute_mirrors_extensions() {
        let strategy = column_split_strategy();
        let runner = RecordingQueryRunner::new(test::events_runner(&event_timestamps()));
        let request = column_split_request(&["event_id", "payload"], 2, 1);

        strategy.execute(&request, &runner).await.unwrap();

        let full_request = &runner.requests()[1];
        assert_eq!(
            full_request.extension(PROJECT_EXTENSION, PROJECT),
            Some(&Literal::List(vec![ScalarValue::from(1_u64), ScalarValue::from(2_u64)]))
        );
        assert_eq!(
            full_request.extension(TIMESERIES_EXTENSION, FROM_DATE),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(
                T0 + 10 * SECOND_IN_MICROSECONDS
            )))
        );
        assert_eq!(
            full_request.extension(TIMESERIES_EXTENSION, TO_DATE),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(
                T0 + 31 * SECOND_IN_MICROSECONDS
            )))
        );
    }

    #[tokio::test]
    async fn test_execute_without_rows() {
        let strategy = column_split_strategy();
        let runner = RecordingQueryRunner::new(test::events_runner(&[]));
        let request = column_split_request(&["event_id", "payload"], 2, 0);

        let result = strategy.execute(&request, &runner).await.unwrap().unwrap();

        assert!(result.is_empty());
        assert_eq!(runner.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_does_not_modify_request() {
        let strategy = column_split_strategy();
        let runner = RecordingQueryRunner::new(test::events_runner(&event_timestamps())).modifying();
        let request = column_split_request(&["event_id", "payload"], 2, 1);
        let expected_request = request.clone();

        strategy.execute(&request, &runner).await.unwrap().unwrap();

        assert_eq!(runner.requests().len(), 2);
        assert_eq!(request, expected_request);
    }

    #[tokio::test]
    async fn test_execute_propagates_runner_error() {
        let strategy = column_split_strategy();
        let request = column_split_request(&["event_id", "payload"], 2, 0);

        let result = strategy.execute(&request, &FailingQueryRunner).await;

        assert!(matches!(result, Err(ModelarDbPlannerError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_execute_with_configured_timestamp_granularity() {
        let configuration_manager = ConfigurationManager::new();
        configuration_manager.set_config(USE_SPLIT, 1);
        configuration_manager.set_config(TIMESTAMP_GRANULARITY_SECONDS, 60);

        let strategy = ColumnSplitQueryStrategy::try_new(
            column_split_spec(),
            &EVENTS_SCHEMA,
            Arc::new(configuration_manager),
        )
        .unwrap();

        let runner = RecordingQueryRunner::new(test::events_runner(&event_timestamps()));
        let request = column_split_request(&["event_id", "payload"], 2, 1);

        strategy.execute(&request, &runner).await.unwrap();

        assert_eq!(
            runner.requests()[1]
                .query
                .find_condition("timestamp", ConditionOperator::Lt),
            Some(&Literal::Scalar(functions::timestamp_to_scalar(
                T0 + 90 * SECOND_IN_MICROSECONDS
            )))
        );
    }

    fn column_split_spec() -> ColumnSplitSpec {
        ColumnSplitSpec::new("event_id", "project_id", "timestamp")
    }

    fn column_split_strategy() -> ColumnSplitQueryStrategy {
        ColumnSplitQueryStrategy::try_new(column_split_spec(), &EVENTS_SCHEMA, test::configuration(1))
            .unwrap()
    }

    /// Events with project ids 1, 2, 3, 1, and 2 ten seconds apart.
    fn event_timestamps() -> Vec<Timestamp> {
        (0..5).map(|index| T0 + index * 10 * SECOND_IN_MICROSECONDS).collect()
    }

    fn column_split_request(columns: &[&str], limit: usize, offset: usize) -> Request {
        let mut request = test::events_request(columns);

        request.query = request
            .query
            .clone()
            .with_conditions(vec![
                Condition::comparison(
                    "project_id",
                    ConditionOperator::In,
                    vec![ScalarValue::from(1_u64), ScalarValue::from(2_u64)],
                ),
                Condition::comparison(
                    "timestamp",
                    ConditionOperator::GtEq,
                    functions::timestamp_to_scalar(T0),
                ),
                Condition::comparison(
                    "timestamp",
                    ConditionOperator::Lt,
                    functions::timestamp_to_scalar(T0 + HOUR_IN_MICROSECONDS),
                ),
            ])
            .with_order_by(vec![OrderBy::descending("timestamp")])
            .with_limit(limit)
            .with_offset(offset);

        request
            .with_extension(
                PROJECT_EXTENSION,
                PROJECT,
                Literal::List(vec![ScalarValue::from(1_u64), ScalarValue::from(2_u64)]),
            )
            .with_extension(
                TIMESERIES_EXTENSION,
                FROM_DATE,
                Literal::Scalar(functions::timestamp_to_scalar(T0)),
            )
    }
}
